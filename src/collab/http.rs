//! HTTP clients for the catalogue and the sub-intent channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;

use super::traits::{Catalogue, CatalogueRecord, IntentChannel, SubIntent};
use crate::error::{Result, ScaffoldrError};

/// Best-practice catalogue served over HTTP.
///
/// `GET {base_url}/domains/{domain}?version={version}`
pub struct HttpCatalogue {
    client: Client,
    base_url: Url,
}

impl HttpCatalogue {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| ScaffoldrError::collaborator("catalogue", format!("bad base URL {}: {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScaffoldrError::collaborator("catalogue", e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// The domain is one percent-encoded path segment.
    fn url(&self, domain: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ScaffoldrError::collaborator("catalogue", format!("base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .push("domains")
            .push(domain.trim());
        Ok(url)
    }
}

#[async_trait]
impl Catalogue for HttpCatalogue {
    async fn fetch(&self, domain: &str, version: &str) -> Result<CatalogueRecord> {
        let err = |e: reqwest::Error| ScaffoldrError::collaborator("catalogue", e.to_string());

        let response = self
            .client
            .get(self.url(domain)?)
            .query(&[("version", version)])
            .send()
            .await
            .map_err(err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScaffoldrError::collaborator(
                "catalogue",
                format!("HTTP {} for domain {}", status.as_u16(), domain),
            ));
        }

        response.json::<CatalogueRecord>().await.map_err(err)
    }
}

/// Sub-intent channel that POSTs envelopes to the router.
pub struct HttpIntentChannel {
    client: Client,
    endpoint: String,
}

impl HttpIntentChannel {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScaffoldrError::collaborator("intent channel", e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl IntentChannel for HttpIntentChannel {
    async fn send(&self, intent: SubIntent) -> Result<Value> {
        let err = |e: reqwest::Error| ScaffoldrError::collaborator("intent channel", e.to_string());

        let mut request = self.client.post(&self.endpoint).json(&intent);
        if let Some(jwt) = &intent.jwt {
            request = request.bearer_auth(jwt);
        }

        let response = request.send().await.map_err(err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScaffoldrError::collaborator(
                "intent channel",
                format!("HTTP {} for {}", status.as_u16(), intent.intent),
            ));
        }

        response.json::<Value>().await.map_err(err)
    }
}
