//! Dataglen session: Django form login guarded by a CSRF token, then per-plant JSON endpoints.

use super::{endpoint, map_api_err, read_json, Error, Throttle};
use crate::model::Api;
use crate::source::PlantSource;
use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::Response;
use scraper::{Html, Selector};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

const CSRF_FIELD: &str = "csrfmiddlewaretoken";

pub struct Dataglen {
    api: Api,
    client: reqwest::Client,
    throttle: Throttle,
    logged_in: Mutex<bool>,
}

/// Pull the value of the hidden `csrfmiddlewaretoken` input out of the login form.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(&format!("input[name=\"{}\"]", CSRF_FIELD)).ok()?;

    document
        .select(&selector)
        .filter_map(|input| input.value().attr("value"))
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(String::from)
}

impl Dataglen {
    pub fn new(api: Api, download_delay: Duration) -> Result<Self, Error> {
        let client = reqwest::ClientBuilder::new()
            .cookie_store(true)
            .build()
            .or(Err(Error::InternalError))?;

        Ok(Dataglen {
            api,
            client,
            throttle: Throttle::new(download_delay),
            logged_in: Mutex::new(false),
        })
    }

    async fn login(&self) -> Result<(), Error> {
        let url = format!("{}{}", self.api.api_url, endpoint::DATAGLEN_LOGIN);

        self.throttle.wait().await;
        let page = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(map_api_err)?
            .text()
            .await
            .map_err(|e| Error::LoginError(e.to_string()))?;

        let token = extract_csrf_token(&page)
            .ok_or_else(|| Error::LoginError(String::from("No CSRF token in login form")))?;

        let form = [
            (CSRF_FIELD, token.as_str()),
            ("username", self.api.username.as_str()),
            ("password", self.api.password.as_str()),
        ];

        self.throttle.wait().await;
        self.client
            .post(&url)
            .header(REFERER, url.as_str())
            .form(&form)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| Error::LoginError(e.to_string()))?;

        log::info!("logged in to Dataglen as {}", self.api.username);
        Ok(())
    }

    async fn get_json(&self, path: &str) -> Result<Value, Error> {
        {
            let mut logged_in = self.logged_in.lock().await;
            if !*logged_in {
                self.login().await?;
                *logged_in = true;
            }
        }

        let url = format!("{}{}", self.api.api_url, path);

        self.throttle.wait().await;
        let result = match self
            .client
            .get(url)
            .query(&[("format", "json")])
            .send()
            .await
        {
            Ok(response) => read_json(response).await,
            Err(e) => Err(map_api_err(e)),
        };

        if let Err(e) = &result {
            if e.invalidates_session() {
                log::warn!("dropping Dataglen session after: {}", e);
                *self.logged_in.lock().await = false;
            }
        }
        result
    }
}

#[async_trait]
impl PlantSource for Dataglen {
    async fn plants(&self) -> Result<Value, Error> {
        self.get_json(endpoint::DATAGLEN_PLANTS).await
    }

    async fn summary(&self, plant_slug: &str) -> Result<Value, Error> {
        self.get_json(&endpoint::dataglen_summary(plant_slug)).await
    }

    async fn live(&self, plant_slug: &str) -> Result<Value, Error> {
        self.get_json(&endpoint::dataglen_live(plant_slug)).await
    }

    async fn device_detail(&self, plant_slug: &str, device: &str) -> Result<Value, Error> {
        self.get_json(&endpoint::dataglen_inverter(plant_slug, device))
            .await
    }
}
