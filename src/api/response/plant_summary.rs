use super::text;
use crate::api::Error;
use crate::model::{Location, PlantInfo, PlantSnapshot};
use crate::normalize::{self, CAPACITY_UNIT};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct PlantSummary {
    #[serde(default)]
    pub plant_slug: Value,
    #[serde(default)]
    pub plant_name: Value,
    #[serde(default)]
    pub latitude: Value,
    #[serde(default)]
    pub longitude: Value,
    #[serde(default)]
    pub plant_capacity: Value,
}

impl PlantSummary {
    /// Seed an empty snapshot for `slug` from the summary. Telemetry and inverters are filled in
    /// by later steps.
    pub fn into_snapshot(self, slug: &str) -> Result<PlantSnapshot, Error> {
        let id = text(&self.plant_slug).unwrap_or_else(|| slug.to_owned());
        if id != slug {
            return Err(Error::UnexpectedApiResponse(format!(
                "summary for {} describes plant {}",
                slug, id
            )));
        }

        let location = match (
            normalize::quantity(&self.latitude, ""),
            normalize::quantity(&self.longitude, ""),
        ) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        };

        let info = PlantInfo {
            name: text(&self.plant_name).unwrap_or_else(|| id.clone()),
            location,
            power_capacity: normalize::quantity(&self.plant_capacity, CAPACITY_UNIT),
        };

        Ok(PlantSnapshot::new(id, info))
    }
}
