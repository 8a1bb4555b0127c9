use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const STORE_TASK: &str = "store";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    S3,
    Gcs,
    Azure,
    Dropbox,
    Rackspace,
}

impl StorageLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Gcs => "gcs",
            Self::Azure => "azure",
            Self::Dropbox => "dropbox",
            Self::Rackspace => "rackspace",
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageAccess {
    Public,
    Private,
}

impl StorageAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for StorageAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how the output of `store` is persisted. Unset fields are left to the CDN.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageOptions {
    pub location: Option<StorageLocation>,
    pub region: Option<String>,
    pub container: Option<String>,
    pub path: Option<String>,
    pub filename: Option<String>,
    pub access: Option<StorageAccess>,
    pub base64decode: Option<bool>,
    pub mimetype: Option<String>,
}

impl StorageOptions {
    pub fn builder() -> StorageOptionsBuilder {
        StorageOptionsBuilder::default()
    }

    pub fn as_task(&self) -> Task {
        let mut task = Task::new(STORE_TASK);
        if let Some(location) = self.location {
            task.add_option("location", location.as_str());
        }
        if let Some(region) = &self.region {
            task.add_option("region", region);
        }
        if let Some(container) = &self.container {
            task.add_option("container", container);
        }
        if let Some(path) = &self.path {
            task.add_option("path", path);
        }
        if let Some(filename) = &self.filename {
            task.add_option("filename", filename);
        }
        if let Some(access) = self.access {
            task.add_option("access", access.as_str());
        }
        if let Some(base64decode) = self.base64decode {
            task.add_option("base64decode", base64decode);
        }
        if let Some(mimetype) = &self.mimetype {
            task.add_option("mimetype", mimetype);
        }
        task
    }
}

#[derive(Clone, Debug, Default)]
pub struct StorageOptionsBuilder {
    options: StorageOptions,
}

impl StorageOptionsBuilder {
    pub fn location(mut self, location: StorageLocation) -> Self {
        self.options.location = Some(location);
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.options.region = Some(region.into());
        self
    }

    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.options.container = Some(container.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.options.path = Some(path.into());
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.options.filename = Some(filename.into());
        self
    }

    pub fn access(mut self, access: StorageAccess) -> Self {
        self.options.access = Some(access);
        self
    }

    pub fn base64decode(mut self, base64decode: bool) -> Self {
        self.options.base64decode = Some(base64decode);
        self
    }

    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.options.mimetype = Some(mimetype.into());
        self
    }

    pub fn build(self) -> StorageOptions {
        self.options
    }
}
