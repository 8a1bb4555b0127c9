use crate::error::{TransformError, TransformResult};
use reqwest::Url;

pub const DEFAULT_CDN_BASE_URL: &str = "https://cdn.filestackcontent.com";

pub const ENV_API_KEY: &str = "CDNCHAIN_API_KEY";
pub const ENV_POLICY: &str = "CDNCHAIN_POLICY";
pub const ENV_SIGNATURE: &str = "CDNCHAIN_SIGNATURE";
pub const ENV_CDN_URL: &str = "CDNCHAIN_CDN_URL";

/// A signed access policy. Signing happens elsewhere; this only carries the result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Security {
    policy: String,
    signature: String,
}

impl Security {
    pub fn new(policy: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            signature: signature.into(),
        }
    }

    pub fn policy(&self) -> &str {
        &self.policy
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CdnConfig {
    pub api_key: Option<String>,
    pub security: Option<Security>,
    pub cdn_base_url: String,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            security: None,
            cdn_base_url: DEFAULT_CDN_BASE_URL.to_string(),
        }
    }
}

impl CdnConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::default().with_api_key(api_key)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = Some(security);
        self
    }

    pub fn with_cdn_base_url(mut self, cdn_base_url: impl Into<String>) -> Self {
        self.cdn_base_url = cdn_base_url.into();
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from a variable lookup. Blank values count as unset, and the
    /// security credential is only used when both policy and signature are present.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let security = match (read(ENV_POLICY), read(ENV_SIGNATURE)) {
            (Some(policy), Some(signature)) => Some(Security::new(policy, signature)),
            _ => None,
        };

        Self {
            api_key: read(ENV_API_KEY),
            security,
            cdn_base_url: read(ENV_CDN_URL).unwrap_or_else(|| DEFAULT_CDN_BASE_URL.to_string()),
        }
    }

    pub fn base_url(&self) -> TransformResult<Url> {
        let url = Url::parse(&self.cdn_base_url).map_err(|err| {
            TransformError::Config(format!(
                "invalid cdn base url '{}': {err}",
                self.cdn_base_url
            ))
        })?;
        if url.cannot_be_a_base() {
            return Err(TransformError::Config(format!(
                "cdn base url '{}' cannot carry a path",
                self.cdn_base_url
            )));
        }
        Ok(url)
    }
}
