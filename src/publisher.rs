//! Outbound publishing of envelopes and the policy applied when the downstream link fails.
//!
//! There is no durable outbox. When publishing keeps failing the error is handed back to the
//! pipeline, which stops; the binary then terminates the process.

use crate::api::{endpoint, map_api_err, Error};
use crate::envelope::Envelope;
use async_trait::async_trait;
use reqwest::Response;
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait Publish: Send + Sync {
    /// Announce the geospaces this agent is going to publish to.
    async fn register(&self, geospace: &[String]) -> Result<(), Error>;

    async fn publish(&self, geospace: &[String], envelope: &Envelope) -> Result<(), Error>;
}

/// HTTP client of the downstream mesh endpoint.
#[derive(Debug, Clone)]
pub struct MeshClient {
    url: String,
    client: reqwest::Client,
}

impl MeshClient {
    pub fn new(url: String) -> Result<Self, Error> {
        let client = reqwest::ClientBuilder::new()
            .build()
            .or(Err(Error::InternalError))?;

        Ok(MeshClient { url, client })
    }

    async fn post(&self, endpoint: &endpoint::Endpoint, body: serde_json::Value) -> Result<(), Error> {
        self.client
            .post(format!("{}{}", self.url, endpoint))
            .json(&body)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map(|_| ())
            .map_err(|e| Error::PublishError(map_api_err(e).to_string()))
    }
}

#[async_trait]
impl Publish for MeshClient {
    async fn register(&self, geospace: &[String]) -> Result<(), Error> {
        self.post(endpoint::MESH_REGISTER, json!({ "geospace": geospace }))
            .await
    }

    async fn publish(&self, geospace: &[String], envelope: &Envelope) -> Result<(), Error> {
        self.post(
            endpoint::MESH_PUBLISH,
            json!({ "geospace": geospace, "message": envelope }),
        )
        .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Give up after the first failed attempt.
    Terminate,
    /// Try `attempts` times in total, waiting `backoff` between attempts.
    Retry { attempts: u32, backoff: Duration },
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Terminate
    }
}

impl FailurePolicy {
    fn attempts(&self) -> u32 {
        match self {
            FailurePolicy::Terminate => 1,
            FailurePolicy::Retry { attempts, .. } => (*attempts).max(1),
        }
    }
}

/// Publishes envelopes of one pipeline to its geospaces and remembers the last one delivered.
pub struct Publisher<P> {
    transport: P,
    geospace: Vec<String>,
    policy: FailurePolicy,
    last: Mutex<Option<Envelope>>,
}

impl<P: Publish> Publisher<P> {
    pub fn new(transport: P, geospace: Vec<String>, policy: FailurePolicy) -> Self {
        Publisher {
            transport,
            geospace,
            policy,
            last: Mutex::new(None),
        }
    }

    pub fn transport(&self) -> &P {
        &self.transport
    }

    pub async fn register(&self) -> Result<(), Error> {
        self.transport.register(&self.geospace).await?;
        log::info!("registered to publish on {:?}", self.geospace);
        Ok(())
    }

    pub async fn publish(&self, envelope: Envelope) -> Result<(), Error> {
        log::info!("publishing for: {:?}", envelope.station_names());

        let attempts = self.policy.attempts();
        let mut attempt = 1;
        loop {
            match self.transport.publish(&self.geospace, &envelope).await {
                Ok(()) => {
                    if let Ok(mut last) = self.last.lock() {
                        *last = Some(envelope);
                    } else {
                        log::trace!("Unable to lock last envelope mutex")
                    }
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    log::warn!("publish attempt {}/{} failed: {}", attempt, attempts, e);
                    if let FailurePolicy::Retry { backoff, .. } = self.policy {
                        tokio::time::sleep(backoff).await;
                    }
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("publish failed after {} attempt(s): {}", attempt, e);
                    return Err(match e {
                        Error::PublishError(_) => e,
                        other => Error::PublishError(other.to_string()),
                    });
                }
            }
        }
    }

    pub fn last_published(&self) -> Option<Envelope> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}
