#![doc = r#"
Task-chain transformations against a CDN transformation service.

Operation mapping:

| Method | CDN route | Source |
| --- | --- | --- |
| `ImageTransform::debug` | `GET /debug/{tasks}/{handle}` | stored handle |
| `ImageTransform::debug` | `GET /{apikey}/debug/{tasks}/{url}` | external url |
| `ImageTransform::store` | `POST /{tasks}/{handle}` | stored handle |
| `ImageTransform::store` | `POST /{apikey}/{tasks}/{url}` | external url |
| `ImageTransform::url` | `/{tasks}/{handle}` (built, never sent) | stored handle |

Implementation notes:
- The rendered chain travels as one path segment, so its `/` separators are sent as `%2F`.
  `url()` decodes them back for readability.
- A `security` task is seeded first whenever the config carries a signed policy.
- `store` appends a `store` task to the chain before sending; it is never removed.
- The new handle is the fourth `/`-delimited segment of the store response URL.
"#]

pub mod backend;
pub mod config;
pub mod error;
pub mod link;
pub mod storage;
pub mod task;
pub mod testing;
pub mod transform;

pub use backend::{CdnBackend, CdnResponse, ReqwestCdnBackend};
pub use config::{CdnConfig, DEFAULT_CDN_BASE_URL, Security};
pub use error::{TransformError, TransformResult};
pub use link::FileLink;
pub use storage::{StorageAccess, StorageLocation, StorageOptions, StorageOptionsBuilder};
pub use task::{OptionValue, Task, TaskChain, TaskOption};
pub use testing::{CdnCall, MockCdn};
pub use transform::{ImageTransform, SourceRef, StoreResponse, resolve_store_handle};
