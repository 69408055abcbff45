use super::{Credentials, RegistrationApi};
use crate::config::Config;
use crate::error::ApiError;
use crate::types::{ApprovalRequest, ListRegistrationsResponse, Registration, SiteStateRequest};
use async_trait::async_trait;
use log::debug;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, Url};

/// Registration API over HTTPS + JSON.
pub struct HttpRegistrationApi {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl HttpRegistrationApi {
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self, ApiError> {
        let raw = config.api_base(credentials.tenant());
        let base_url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: raw,
                reason: "not a hierarchical URL".into(),
            });
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Appends `segments` below the system namespace, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // base_url is checked to be hierarchical in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["register", "namespaces", "system"])
                .extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .header(AUTHORIZATION, self.credentials.authorization())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl RegistrationApi for HttpRegistrationApi {
    async fn list_registrations(&self, site: &str) -> Result<Vec<Registration>, ApiError> {
        let url = self.url(&["listregistrationsbysite", site]);
        debug!("Fetching registrations from {}", url);

        let body = self.send(self.client.get(url)).await?.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let list: ListRegistrationsResponse = serde_json::from_str(&body)?;
        Ok(list.items)
    }

    async fn approve(&self, request: &ApprovalRequest) -> Result<(), ApiError> {
        let url = self.url(&["registration", request.name(), "approve"]);
        debug!("Approving registration via {}", url);
        self.send(self.client.post(url).json(request)).await?;
        Ok(())
    }

    async fn set_site_state(&self, request: &SiteStateRequest) -> Result<(), ApiError> {
        let url = self.url(&["site", request.name(), "state"]);
        debug!("Setting site state via {}", url);
        self.send(self.client.post(url).json(request)).await?;
        Ok(())
    }
}
