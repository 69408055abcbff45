use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder in `api_url` replaced by the tenant name.
const TENANT_PLACEHOLDER: &str = "{tenant}";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the registration API, `{tenant}` is substituted.
    pub api_url: String,
    /// How long the approval loop keeps polling.
    pub timeout_secs: u64,
    /// Pause between polls.
    pub poll_interval_secs: u64,
    /// Upper bound for a single HTTP request.
    pub request_timeout_secs: u64,
    /// Exit non-zero when the approval loop runs out of time.
    pub fail_on_timeout: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://{tenant}.console.ves.volterra.io/api".into(),
            timeout_secs: 300,
            poll_interval_secs: 30,
            request_timeout_secs: 30,
            fail_on_timeout: false,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("site-registration.toml"))
            .merge(Json::file("site-registration.json"))
            .merge(Env::prefixed("SITEREG_"))
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        if config.api_url.trim().is_empty() {
            anyhow::bail!("Invalid configuration: api_url must not be empty");
        }
        if config.poll_interval_secs == 0 {
            anyhow::bail!("Invalid configuration: poll_interval_secs must be greater than 0");
        }
        if config.request_timeout_secs == 0 {
            anyhow::bail!("Invalid configuration: request_timeout_secs must be greater than 0");
        }

        Ok(config)
    }

    /// Applies command line overrides on top of the loaded layers.
    pub fn with_overrides(
        mut self,
        timeout_secs: Option<u64>,
        poll_interval_secs: Option<u64>,
    ) -> Self {
        if let Some(secs) = timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(secs) = poll_interval_secs {
            self.poll_interval_secs = secs;
        }
        self
    }

    pub fn api_base(&self, tenant: &str) -> String {
        self.api_url
            .replace(TENANT_PLACEHOLDER, tenant)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
