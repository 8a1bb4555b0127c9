use crate::backend::{CdnBackend, CdnResponse, join_segments};
use crate::error::{TransformError, TransformResult};
use async_trait::async_trait;
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const MOCK_CDN_BASE_URL: &str = "https://cdn.example.com";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CdnCall {
    Debug {
        tasks: String,
        handle: String,
    },
    DebugExt {
        api_key: String,
        tasks: String,
        url: String,
    },
    Store {
        tasks: String,
        handle: String,
    },
    StoreExt {
        api_key: String,
        tasks: String,
        url: String,
    },
}

impl CdnCall {
    pub fn tasks(&self) -> &str {
        match self {
            Self::Debug { tasks, .. }
            | Self::DebugExt { tasks, .. }
            | Self::Store { tasks, .. }
            | Self::StoreExt { tasks, .. } => tasks,
        }
    }
}

/// In-memory backend that records every call and replays queued responses in order.
#[derive(Clone, Debug)]
pub struct MockCdn {
    base_url: Url,
    inner: Arc<Mutex<MockCdnState>>,
}

#[derive(Debug, Default)]
struct MockCdnState {
    responses: VecDeque<TransformResult<CdnResponse>>,
    calls: Vec<CdnCall>,
}

impl Default for MockCdn {
    fn default() -> Self {
        Self::with_base_url(Url::parse(MOCK_CDN_BASE_URL).expect("mock base url"))
    }
}

impl MockCdn {
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            inner: Arc::default(),
        }
    }

    pub fn push_response(&self, response: CdnResponse) -> &Self {
        self.lock().responses.push_back(Ok(response));
        self
    }

    pub fn push_failure(&self, error: TransformError) -> &Self {
        self.lock().responses.push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<CdnCall> {
        self.lock().calls.clone()
    }

    pub fn last_call(&self) -> Option<CdnCall> {
        self.lock().calls.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockCdnState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: CdnCall) -> TransformResult<CdnResponse> {
        let mut state = self.lock();
        state.calls.push(call);
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(TransformError::Io("mock cdn has no queued response".to_string())))
    }
}

#[async_trait]
impl CdnBackend for MockCdn {
    async fn transform_debug(&self, tasks: &str, handle: &str) -> TransformResult<CdnResponse> {
        self.record(CdnCall::Debug {
            tasks: tasks.to_string(),
            handle: handle.to_string(),
        })
    }

    async fn transform_debug_ext(
        &self,
        api_key: &str,
        tasks: &str,
        url: &str,
    ) -> TransformResult<CdnResponse> {
        self.record(CdnCall::DebugExt {
            api_key: api_key.to_string(),
            tasks: tasks.to_string(),
            url: url.to_string(),
        })
    }

    async fn transform_store(&self, tasks: &str, handle: &str) -> TransformResult<CdnResponse> {
        self.record(CdnCall::Store {
            tasks: tasks.to_string(),
            handle: handle.to_string(),
        })
    }

    async fn transform_store_ext(
        &self,
        api_key: &str,
        tasks: &str,
        url: &str,
    ) -> TransformResult<CdnResponse> {
        self.record(CdnCall::StoreExt {
            api_key: api_key.to_string(),
            tasks: tasks.to_string(),
            url: url.to_string(),
        })
    }

    fn transform_url(&self, tasks: &str, handle: &str) -> TransformResult<Url> {
        join_segments(&self.base_url, &[tasks, handle])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn replays_queued_responses_in_order() {
        let cdn = MockCdn::default();
        cdn.push_response(CdnResponse::ok("{\"a\":1}"))
            .push_response(CdnResponse::error(500, "boom"));

        let first = cdn.transform_debug("flip", "H1").await.unwrap();
        let second = cdn.transform_store("flip", "H1").await.unwrap();
        let third = cdn.transform_store("flip", "H1").await;

        assert_eq!(first.body.as_deref(), Some("{\"a\":1}"));
        assert_eq!(second.status, 500);
        assert!(matches!(third, Err(TransformError::Io(_))));
        assert_eq!(cdn.calls().len(), 3);
    }
}
