//! Growatt OSS session: cookie based login followed by the paginated inverter listing.

use super::{endpoint, map_api_err, read_json, Error, Throttle};
use crate::model::Api;
use crate::source::ListingSource;
use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct Growatt {
    api: Api,
    client: reqwest::Client,
    throttle: Throttle,
    session: Mutex<Option<String>>,
}

/// First cookie set by the login page, as `name=value`.
fn extract_session_cookie(response: &Response) -> Result<String, Error> {
    response
        .cookies()
        .next()
        .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
        .ok_or_else(|| {
            Error::LoginError(format!(
                "No session cookie received (server responded {})",
                response.status()
            ))
        })
}

impl Growatt {
    pub fn new(api: Api, download_delay: Duration) -> Result<Self, Error> {
        let client = reqwest::ClientBuilder::new()
            .build()
            .or(Err(Error::InternalError))?;

        Ok(Growatt {
            api,
            client,
            throttle: Throttle::new(download_delay),
            session: Mutex::new(None),
        })
    }

    async fn login(&self) -> Result<String, Error> {
        let url = format!("{}{}", self.api.api_url, endpoint::GROWATT_LOGIN);

        self.throttle.wait().await;
        let landing = self.client.get(&url).send().await.map_err(map_api_err)?;
        let cookie = extract_session_cookie(&landing)?;

        let form = [
            ("userName", self.api.username.as_str()),
            ("password", self.api.password.as_str()),
        ];

        self.throttle.wait().await;
        self.client
            .post(&url)
            .header(COOKIE, cookie.as_str())
            .form(&form)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| Error::LoginError(e.to_string()))?;

        log::info!("logged in to Growatt as {}", self.api.username);
        Ok(cookie)
    }

    /// Current session cookie, logging in first when there is none.
    async fn session(&self) -> Result<String, Error> {
        let mut session = self.session.lock().await;
        match &*session {
            Some(cookie) => Ok(cookie.clone()),
            None => {
                let cookie = self.login().await?;
                *session = Some(cookie.clone());
                Ok(cookie)
            }
        }
    }

    async fn forget_session_on(&self, error: &Error) {
        if error.invalidates_session() {
            log::warn!("dropping Growatt session after: {}", error);
            *self.session.lock().await = None;
        }
    }
}

#[async_trait]
impl ListingSource for Growatt {
    async fn listing_page(&self, page: u32) -> Result<Value, Error> {
        let cookie = self.session().await?;
        let url = format!("{}{}", self.api.api_url, endpoint::GROWATT_INVERTER_LIST);
        let form = [
            ("page", page.to_string()),
            ("order", String::from("1")),
            ("lineType", String::from("0")),
            ("deviceStatus", String::new()),
        ];

        self.throttle.wait().await;
        let result = match self
            .client
            .post(url)
            .header(COOKIE, format!("{}; lang=en", cookie))
            .form(&form)
            .send()
            .await
        {
            Ok(response) => read_json(response).await,
            Err(e) => Err(map_api_err(e)),
        };

        if let Err(e) = &result {
            self.forget_session_on(e).await;
        }
        result
    }
}
