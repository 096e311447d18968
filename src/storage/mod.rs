use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Credentials;

/// Key delimiter used to fold deeper keys into common prefixes / 键分隔符
pub const DELIMITER: &str = "/";

/// Failure reported by a storage backend / 存储后端错误
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object or bucket not found")]
    NotFound,

    #[error("access denied")]
    Forbidden,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One object from a listing / 列表中的单个对象
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
    pub storage_class: String,
}

/// Result of a single delimiter listing / 单次分隔符列表结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Common prefixes, in response order / 公共前缀
    pub common_prefixes: Vec<String>,
    /// Objects directly under the prefix, in response order / 对象
    pub contents: Vec<ObjectEntry>,
}

impl Listing {
    /// Number of keys the backend matched (prefixes and objects) / 匹配键数量
    pub fn key_count(&self) -> usize {
        self.common_prefixes.len() + self.contents.len()
    }
}

/// Object storage interface (provides only primitive operations) / 对象存储接口
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Backend name / 后端名称
    fn name(&self) -> &str;

    /// Probe that the bucket exists and is accessible / 检查存储桶
    async fn head_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// List one level below `prefix` / 列出前缀下一层
    async fn list(
        &self,
        bucket: &str,
        delimiter: &str,
        prefix: &str,
    ) -> Result<Listing, StorageError>;

    /// Fetch a whole object / 获取对象内容
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// Builds storage clients scoped to a set of credentials / 存储客户端工厂
pub trait StorageConnector: Send + Sync {
    /// Connector type name / 类型名称
    fn connector_type(&self) -> &'static str;

    /// Create a client. Must not touch the network / 创建客户端（不发起网络请求）
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ObjectStorage>, StorageError>;
}
