use config::{Config, ConfigError};
use pvpoll_rs::model::Api;
use pvpoll_rs::publisher::FailurePolicy;
use std::time::Duration;

const PUBLISH_URL: &str = "http://rpc.pravah.io:5555";
const GEOSPACE: &str = "/in/delhi";
const GROWATT_URL: &str = "https://oss.growatt.com";
const DATAGLEN_URL: &str = "https://dataglen.com";

#[derive(Clone, Debug, serde::Deserialize)]
pub struct PollerConfig {
    publish_url: String,
    geospace: String,
    idle_delay: u64,
    download_delay_ms: u64,
    max_pages: u32,
    publish_failure: String,
    publish_retries: u32,
    publish_backoff: u64,
    growatt_url: String,
    growatt_username: Option<String>,
    growatt_password: Option<String>,
    dataglen_url: String,
    dataglen_username: Option<String>,
    dataglen_password: Option<String>,
}

/// Read `PVPOLL_*` environment variables on top of the defaults.
pub fn read_settings() -> Result<PollerConfig, ConfigError> {
    let mut settings = Config::default();
    settings
        .set_default("publish_url", PUBLISH_URL)?
        .set_default("geospace", GEOSPACE)?
        .set_default("idle_delay", 10i64)?
        .set_default("download_delay_ms", 300i64)?
        .set_default("max_pages", 64i64)?
        .set_default("publish_failure", "terminate")?
        .set_default("publish_retries", 3i64)?
        .set_default("publish_backoff", 5i64)?
        .set_default("growatt_url", GROWATT_URL)?
        .set_default("dataglen_url", DATAGLEN_URL)?
        .merge(config::Environment::with_prefix("PVPOLL"))?;

    let settings: PollerConfig = settings.try_into()?;
    settings.failure_policy()?;
    Ok(settings)
}

fn credentials(url: &str, username: &Option<String>, password: &Option<String>) -> Option<Api> {
    match (username, password) {
        (Some(username), Some(password)) => Some(Api {
            api_url: url.trim_end_matches('/').to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
        }),
        _ => None,
    }
}

impl PollerConfig {
    pub fn publish_url(&self) -> String {
        self.publish_url.trim_end_matches('/').to_owned()
    }

    pub fn geospace(&self) -> Vec<String> {
        self.geospace
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_secs(self.idle_delay)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn failure_policy(&self) -> Result<FailurePolicy, ConfigError> {
        match self.publish_failure.trim().to_lowercase().as_str() {
            "terminate" => Ok(FailurePolicy::Terminate),
            "retry" => Ok(FailurePolicy::Retry {
                attempts: self.publish_retries,
                backoff: Duration::from_secs(self.publish_backoff),
            }),
            other => Err(ConfigError::Message(format!(
                "unknown publish_failure policy `{}` (expected `terminate` or `retry`)",
                other
            ))),
        }
    }

    pub fn growatt(&self) -> Option<Api> {
        credentials(
            &self.growatt_url,
            &self.growatt_username,
            &self.growatt_password,
        )
    }

    pub fn dataglen(&self) -> Option<Api> {
        credentials(
            &self.dataglen_url,
            &self.dataglen_username,
            &self.dataglen_password,
        )
    }
}
