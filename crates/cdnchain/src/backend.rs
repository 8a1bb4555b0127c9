use crate::config::CdnConfig;
use crate::error::{TransformError, TransformResult};
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;

/// Raw outcome of one CDN round trip. Non-success statuses are data here; they become
/// errors in [`CdnResponse::into_body`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CdnResponse {
    pub status: u16,
    pub message: String,
    pub body: Option<String>,
}

impl CdnResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            message: "OK".to_string(),
            body: Some(body.into()),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            message: String::new(),
            body: None,
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            body: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Classifies the response: a failure status is `Http`, a success without a body
    /// is `Io`.
    pub fn into_body(self) -> TransformResult<String> {
        if !self.is_success() {
            let message = match self.body {
                Some(body) if !body.trim().is_empty() => body,
                _ => self.message,
            };
            return Err(TransformError::Http {
                status: self.status,
                message,
            });
        }
        self.body
            .filter(|body| !body.trim().is_empty())
            .ok_or_else(|| {
                TransformError::Io(format!("cdn returned status {} without a body", self.status))
            })
    }
}

/// The CDN transformation entry points. Internal variants take a stored file handle,
/// external variants take the API key and a public URL.
#[async_trait]
pub trait CdnBackend: Send + Sync {
    async fn transform_debug(&self, tasks: &str, handle: &str) -> TransformResult<CdnResponse>;

    async fn transform_debug_ext(
        &self,
        api_key: &str,
        tasks: &str,
        url: &str,
    ) -> TransformResult<CdnResponse>;

    async fn transform_store(&self, tasks: &str, handle: &str) -> TransformResult<CdnResponse>;

    async fn transform_store_ext(
        &self,
        api_key: &str,
        tasks: &str,
        url: &str,
    ) -> TransformResult<CdnResponse>;

    /// URL that fetches the transformed file. Builds the request only, no I/O.
    fn transform_url(&self, tasks: &str, handle: &str) -> TransformResult<Url>;
}

#[async_trait]
impl<T> CdnBackend for Arc<T>
where
    T: CdnBackend + ?Sized,
{
    async fn transform_debug(&self, tasks: &str, handle: &str) -> TransformResult<CdnResponse> {
        (**self).transform_debug(tasks, handle).await
    }

    async fn transform_debug_ext(
        &self,
        api_key: &str,
        tasks: &str,
        url: &str,
    ) -> TransformResult<CdnResponse> {
        (**self).transform_debug_ext(api_key, tasks, url).await
    }

    async fn transform_store(&self, tasks: &str, handle: &str) -> TransformResult<CdnResponse> {
        (**self).transform_store(tasks, handle).await
    }

    async fn transform_store_ext(
        &self,
        api_key: &str,
        tasks: &str,
        url: &str,
    ) -> TransformResult<CdnResponse> {
        (**self).transform_store_ext(api_key, tasks, url).await
    }

    fn transform_url(&self, tasks: &str, handle: &str) -> TransformResult<Url> {
        (**self).transform_url(tasks, handle)
    }
}

#[derive(Clone, Debug)]
pub struct ReqwestCdnBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestCdnBackend {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Uses a caller-built client, which is where timeouts and TLS settings belong.
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(config: &CdnConfig) -> TransformResult<Self> {
        Ok(Self::new(config.base_url()?))
    }

    pub fn from_env() -> TransformResult<Self> {
        Self::from_config(&CdnConfig::from_env())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> TransformResult<Url> {
        join_segments(&self.base_url, segments)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> TransformResult<CdnResponse> {
        let response = request
            .send()
            .await
            .map_err(|err| TransformError::Io(format!("http request failed: {err}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| TransformError::Io(format!("http read body failed: {err}")))?;
        Ok(CdnResponse {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
            body: (!text.is_empty()).then_some(text),
        })
    }

    async fn get(&self, segments: &[&str]) -> TransformResult<CdnResponse> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "cdn GET");
        self.send(self.client.get(url)).await
    }

    async fn post(&self, segments: &[&str]) -> TransformResult<CdnResponse> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "cdn POST");
        self.send(self.client.post(url)).await
    }
}

#[async_trait]
impl CdnBackend for ReqwestCdnBackend {
    async fn transform_debug(&self, tasks: &str, handle: &str) -> TransformResult<CdnResponse> {
        self.get(&["debug", tasks, handle]).await
    }

    async fn transform_debug_ext(
        &self,
        api_key: &str,
        tasks: &str,
        url: &str,
    ) -> TransformResult<CdnResponse> {
        self.get(&[api_key, "debug", tasks, url]).await
    }

    async fn transform_store(&self, tasks: &str, handle: &str) -> TransformResult<CdnResponse> {
        self.post(&[tasks, handle]).await
    }

    async fn transform_store_ext(
        &self,
        api_key: &str,
        tasks: &str,
        url: &str,
    ) -> TransformResult<CdnResponse> {
        self.post(&[api_key, tasks, url]).await
    }

    fn transform_url(&self, tasks: &str, handle: &str) -> TransformResult<Url> {
        self.endpoint(&[tasks, handle])
    }
}

/// Appends each segment to the base path, percent-encoding it as a single segment.
pub(crate) fn join_segments(base_url: &Url, segments: &[&str]) -> TransformResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            TransformError::Config(format!("cdn base url '{base_url}' cannot carry a path"))
        })?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> ReqwestCdnBackend {
        ReqwestCdnBackend::new(Url::parse("https://cdn.example.com").unwrap())
    }

    #[test]
    fn into_body_classifies_responses() {
        assert_eq!(CdnResponse::ok("{}").into_body().unwrap(), "{}");

        let error = CdnResponse::error(400, "Bad Request").into_body().unwrap_err();
        assert!(matches!(
            error,
            TransformError::Http { status: 400, ref message } if message == "Bad Request"
        ));

        let error = CdnResponse::empty(200).into_body().unwrap_err();
        assert!(matches!(error, TransformError::Io(_)));
    }

    #[test]
    fn error_body_wins_over_reason_phrase() {
        let response = CdnResponse {
            status: 403,
            message: "Forbidden".to_string(),
            body: Some("policy expired".to_string()),
        };
        let error = response.into_body().unwrap_err();
        assert_eq!(error.to_string(), "http error 403: policy expired");
    }

    #[test]
    fn tasks_are_encoded_as_one_path_segment() {
        let url = backend()
            .transform_url("resize=w:100/rotate=deg:90", "FILE1")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://cdn.example.com/resize=w:100%2Frotate=deg:90/FILE1"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let backend = ReqwestCdnBackend::new(Url::parse("http://127.0.0.1:9000/cdn/").unwrap());
        let url = backend.endpoint(&["debug", "flip", "FILE1"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/cdn/debug/flip/FILE1");
    }
}
