//! S3客户端工厂

use std::sync::Arc;

use crate::config::Credentials;
use crate::storage::{ObjectStorage, StorageConnector, StorageError};
use super::config::S3ClientConfig;
use super::driver::S3Storage;

/// S3客户端工厂，每棵树按解析后的凭证创建一个客户端
#[derive(Debug, Clone, Default)]
pub struct S3Connector {
    config: S3ClientConfig,
}

impl S3Connector {
    pub fn new(config: S3ClientConfig) -> Self {
        Self { config }
    }
}

impl StorageConnector for S3Connector {
    fn connector_type(&self) -> &'static str {
        "s3"
    }

    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ObjectStorage>, StorageError> {
        Ok(Arc::new(S3Storage::new(self.config.clone(), credentials)?))
    }
}
