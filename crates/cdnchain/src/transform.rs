use crate::backend::{CdnBackend, CdnResponse};
use crate::config::CdnConfig;
use crate::error::{TransformError, TransformResult};
use crate::link::FileLink;
use crate::storage::StorageOptions;
use crate::task::{Task, TaskChain};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Index of the handle in a store response URL split on `/`:
/// `["https:", "", "<host>", "<handle>", ...]`.
pub const STORE_URL_HANDLE_INDEX: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceRef {
    Handle(String),
    External(String),
}

impl SourceRef {
    pub fn identifier(&self) -> &str {
        match self {
            Self::Handle(handle) => handle,
            Self::External(url) => url,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Handle(_) => "handle",
            Self::External(_) => "external",
        }
    }
}

/// Body of a successful store call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreResponse {
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, rename = "type")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

/// Extracts the new file handle from a store response URL.
///
/// The handle is the segment at [`STORE_URL_HANDLE_INDEX`] after splitting on `/`,
/// whatever the total depth of the URL. A URL without a non-empty segment there is
/// rejected as an unparsable response.
pub fn resolve_store_handle(url: &str) -> TransformResult<&str> {
    url.split('/')
        .nth(STORE_URL_HANDLE_INDEX)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| {
            TransformError::Io(format!(
                "store response url '{url}' has no handle at segment {STORE_URL_HANDLE_INDEX}"
            ))
        })
}

/// A transformation chain bound to one source and one backend.
pub struct ImageTransform<B> {
    config: CdnConfig,
    backend: B,
    source: SourceRef,
    chain: TaskChain,
}

impl<B: CdnBackend> ImageTransform<B> {
    /// External sources need `config.api_key`. The chain starts with the security task
    /// when `config.security` is set.
    pub fn new(config: CdnConfig, backend: B, source: SourceRef) -> TransformResult<Self> {
        if source.is_external() && config.api_key.is_none() {
            return Err(TransformError::InvalidArgument(
                "an api key is required to transform an external url".to_string(),
            ));
        }
        let chain = TaskChain::seeded(config.security.as_ref());
        Ok(Self {
            config,
            backend,
            source,
            chain,
        })
    }

    pub fn for_handle(config: CdnConfig, backend: B, handle: impl Into<String>) -> Self {
        let chain = TaskChain::seeded(config.security.as_ref());
        Self {
            config,
            backend,
            source: SourceRef::Handle(handle.into()),
            chain,
        }
    }

    pub fn for_external(
        config: CdnConfig,
        backend: B,
        url: impl Into<String>,
    ) -> TransformResult<Self> {
        Self::new(config, backend, SourceRef::External(url.into()))
    }

    pub fn config(&self) -> &CdnConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn chain(&self) -> &TaskChain {
        &self.chain
    }

    /// Appends a task. Tasks run in the order they are added.
    pub fn add_task(&mut self, task: Task) -> TransformResult<&mut Self> {
        self.chain.push(task)?;
        Ok(self)
    }

    pub fn tasks_string(&self) -> TransformResult<String> {
        self.chain.render()
    }

    /// Asks the CDN to explain the chain without running it. Returns the report as sent.
    pub async fn debug(&self) -> TransformResult<Value> {
        let tasks = self.chain.render()?;
        tracing::debug!(source = self.source.kind(), %tasks, "debugging transform");

        let response = match &self.source {
            SourceRef::Handle(handle) => self.backend.transform_debug(&tasks, handle).await,
            SourceRef::External(url) => {
                self.backend
                    .transform_debug_ext(self.api_key()?, &tasks, url)
                    .await
            }
        };

        let body = checked_body("debug", response)?;
        match serde_json::from_str::<Value>(&body) {
            Ok(report @ Value::Object(_)) => Ok(report),
            Ok(other) => Err(io_failure(
                "debug",
                format!("debug report is not a json object: {other}"),
            )),
            Err(err) => Err(io_failure(
                "debug",
                format!("debug report decode failed: {err}"),
            )),
        }
    }

    /// Runs the chain and stores the output as a new file.
    ///
    /// `None` means `StorageOptions::default()`. The `store` task is appended to the chain
    /// before the request is sent and stays there, so later calls carry it too.
    pub async fn store(&mut self, options: Option<StorageOptions>) -> TransformResult<FileLink> {
        self.store_with_response(options)
            .await
            .map(|(link, _)| link)
    }

    pub async fn store_with_response(
        &mut self,
        options: Option<StorageOptions>,
    ) -> TransformResult<(FileLink, StoreResponse)> {
        let options = options.unwrap_or_default();
        self.chain.push_store_task(&options);

        let tasks = self.chain.render()?;
        tracing::debug!(source = self.source.kind(), %tasks, "storing transform");

        let response = match &self.source {
            SourceRef::Handle(handle) => self.backend.transform_store(&tasks, handle).await,
            SourceRef::External(url) => {
                self.backend
                    .transform_store_ext(self.api_key()?, &tasks, url)
                    .await
            }
        };

        let body = checked_body("store", response)?;
        let stored: StoreResponse = serde_json::from_str(&body)
            .map_err(|err| io_failure("store", format!("store response decode failed: {err}")))?;
        let handle = resolve_store_handle(&stored.url)
            .inspect_err(|err| tracing::warn!(error = %err, "store response without handle"))?
            .to_string();

        tracing::debug!(%handle, "stored transform result");
        Ok((FileLink::new(self.config.clone(), handle), stored))
    }

    /// Fetch URL for the transformed file, with the chain's `/` separators left
    /// unescaped. External sources are not supported and yield `None`.
    pub fn url(&self) -> TransformResult<Option<String>> {
        let SourceRef::Handle(handle) = &self.source else {
            return Ok(None);
        };
        let tasks = self.chain.render()?;
        let url = self.backend.transform_url(&tasks, handle)?;
        Ok(Some(url.as_str().replace("%2F", "/")))
    }

    fn api_key(&self) -> TransformResult<&str> {
        self.config.api_key.as_deref().ok_or_else(|| {
            TransformError::InvalidArgument(
                "an api key is required to transform an external url".to_string(),
            )
        })
    }
}

fn checked_body(
    operation: &'static str,
    response: TransformResult<CdnResponse>,
) -> TransformResult<String> {
    response
        .and_then(|response| response.into_body())
        .inspect_err(|err| tracing::warn!(operation, error = %err, "cdn call failed"))
}

fn io_failure(operation: &'static str, message: String) -> TransformError {
    tracing::warn!(operation, %message, "unparsable cdn response");
    TransformError::Io(message)
}
