//! Seams between the pipeline and the remote dashboards.
//!
//! Implementations own the HTTP session (login, cookies, throttling) and hand back parsed JSON
//! bodies. Everything past that point, including the shape checks, happens in the pipeline.

use crate::api::Error;
use async_trait::async_trait;
use serde_json::Value;

/// Dashboard exposing one paginated listing of all inverters across plants.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch listing page `page`, counting from 1.
    async fn listing_page(&self, page: u32) -> Result<Value, Error>;
}

/// Dashboard exposing plants one by one, with a detail endpoint per inverter.
#[async_trait]
pub trait PlantSource: Send + Sync {
    async fn plants(&self) -> Result<Value, Error>;

    async fn summary(&self, plant_slug: &str) -> Result<Value, Error>;

    async fn live(&self, plant_slug: &str) -> Result<Value, Error>;

    async fn device_detail(&self, plant_slug: &str, device: &str) -> Result<Value, Error>;
}
