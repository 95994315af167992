use std::{env, time::Duration};

use crate::consts::{DEFAULT_PRIMARY_TYPE_SUFFIX, LOCAL_API_URL, SCHEMA_PATH};
use crate::prelude::Result;
use crate::Error;

pub const ENV_SERVICE_URL: &str = "ACTION_SERVICE_URL";
pub const ENV_SCHEMA_PATH: &str = "ACTION_SCHEMA_PATH";
pub const ENV_PRIMARY_TYPE_SUFFIX: &str = "ACTION_PRIMARY_TYPE_SUFFIX";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ACTION_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceUrl {
    #[default]
    Localhost,
    Custom(String),
}

impl ServiceUrl {
    pub fn get_url(&self) -> String {
        match self {
            ServiceUrl::Localhost => LOCAL_API_URL.to_string(),
            ServiceUrl::Custom(url) => url.trim_end_matches('/').to_string(),
        }
    }
}

/// How the top-level EIP-712 type is named when the schema response does not
/// carry a `primaryType` field itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryTypeRule {
    /// `<actionName><suffix>`, e.g. `create` + `Account` = `createAccount`.
    ActionNameSuffix(String),
    /// The same primary type for every action.
    Fixed(String),
}

impl Default for PrimaryTypeRule {
    fn default() -> Self {
        PrimaryTypeRule::ActionNameSuffix(DEFAULT_PRIMARY_TYPE_SUFFIX.to_string())
    }
}

impl PrimaryTypeRule {
    pub fn primary_type_for(&self, action_name: &str) -> String {
        match self {
            PrimaryTypeRule::ActionNameSuffix(suffix) => format!("{action_name}{suffix}"),
            PrimaryTypeRule::Fixed(name) => name.clone(),
        }
    }
}

/// Settings shared by the schema fetcher and the submitter.
///
/// Defaults: `http://localhost:5050`, schema path `/getEIP712Types`,
/// primary type `<action>Account`, no request timeout beyond reqwest's own.
/// The signing step is never subject to `request_timeout`.
#[derive(Debug, Clone, Default)]
pub struct ActionClientConfig {
    pub base_url: ServiceUrl,
    pub schema_path: Option<String>,
    pub primary_type: PrimaryTypeRule,
    pub request_timeout: Option<Duration>,
}

impl ActionClientConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = ServiceUrl::Custom(url.into());
        self
    }

    pub fn with_schema_path(mut self, path: impl Into<String>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    pub fn with_primary_type(mut self, rule: PrimaryTypeRule) -> Self {
        self.primary_type = rule;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn schema_path(&self) -> String {
        let path = self.schema_path.as_deref().unwrap_or(SCHEMA_PATH);
        format!("/{}", path.trim_matches('/'))
    }

    /// Reads overrides from the process environment. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = ActionClientConfig::default();

        if let Some(url) = lookup(ENV_SERVICE_URL) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "{ENV_SERVICE_URL} must be an http(s) URL, got {url:?}"
                )));
            }
            config = config.with_base_url(url);
        }
        if let Some(path) = lookup(ENV_SCHEMA_PATH) {
            config = config.with_schema_path(path);
        }
        if let Some(suffix) = lookup(ENV_PRIMARY_TYPE_SUFFIX) {
            config = config.with_primary_type(PrimaryTypeRule::ActionNameSuffix(suffix));
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::Config(format!(
                    "{ENV_REQUEST_TIMEOUT_SECS} must be a whole number of seconds, got {secs:?}"
                ))
            })?;
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(|e| Error::Config(e.to_string()))
    }
}
