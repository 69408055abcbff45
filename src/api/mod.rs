use std::fmt;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{ApprovalRequest, Registration, SiteStateRequest};

pub mod http;
pub use http::HttpRegistrationApi;

#[async_trait]
pub trait RegistrationApi {
    /// Fetch the registrations of a site in the order the service returns them.
    async fn list_registrations(&self, site: &str) -> Result<Vec<Registration>, ApiError>;

    async fn approve(&self, request: &ApprovalRequest) -> Result<(), ApiError>;

    async fn set_site_state(&self, request: &SiteStateRequest) -> Result<(), ApiError>;
}

/// Tenant and API token used for every call.
#[derive(Clone)]
pub struct Credentials {
    tenant: String,
    token: String,
}

impl Credentials {
    pub fn new(tenant: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            token: token.into(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub(crate) fn authorization(&self) -> String {
        format!("APIToken {}", self.token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant", &self.tenant)
            .field("token", &"<redacted>")
            .finish()
    }
}
