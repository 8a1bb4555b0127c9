use crate::backend::{CdnBackend, join_segments};
use crate::config::CdnConfig;
use crate::error::TransformResult;
use crate::task::TaskChain;
use crate::transform::ImageTransform;
use reqwest::Url;

/// Reference to a file stored behind the CDN.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileLink {
    config: CdnConfig,
    handle: String,
}

impl FileLink {
    pub fn new(config: CdnConfig, handle: impl Into<String>) -> Self {
        Self {
            config,
            handle: handle.into(),
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn config(&self) -> &CdnConfig {
        &self.config
    }

    /// Plain fetch URL for the file, prefixed with the security task when the link
    /// carries a signed policy.
    pub fn cdn_url(&self) -> TransformResult<Url> {
        let base_url = self.config.base_url()?;
        let security = TaskChain::seeded(self.config.security.as_ref());
        if security.is_empty() {
            return join_segments(&base_url, &[self.handle.as_str()]);
        }
        let security = security.render()?;
        join_segments(&base_url, &[security.as_str(), self.handle.as_str()])
    }

    /// Starts a new transformation chain over this file.
    pub fn image_transform<B: CdnBackend>(&self, backend: B) -> ImageTransform<B> {
        ImageTransform::for_handle(self.config.clone(), backend, self.handle.clone())
    }
}
