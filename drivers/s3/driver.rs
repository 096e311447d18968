//! S3存储后端核心实现
//!
//! 设计原则：
//! - 只提供原语（head_bucket, list, get_object）
//! - 每次调用只发一个请求，不分页、不重试
//! - 404/403 映射为 NotFound/Forbidden，其余错误原样传递

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3::bucket::Bucket;
use s3::creds::Credentials as S3Credentials;
use s3::error::S3Error;
use s3::Region;

use crate::config::Credentials;
use crate::storage::{Listing, ObjectEntry, ObjectStorage, StorageError};
use super::config::S3ClientConfig;

const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// S3存储后端
pub struct S3Storage {
    config: S3ClientConfig,
    credentials: S3Credentials,
}

impl S3Storage {
    /// 创建新的S3后端实例（不发起网络请求）
    pub fn new(config: S3ClientConfig, credentials: &Credentials) -> Result<Self, StorageError> {
        let credentials = S3Credentials::new(
            Some(&credentials.access_key_id),
            Some(&credentials.secret_access_key),
            credentials.session_token.as_deref(),
            None,
            None,
        )
        .map_err(|e| anyhow!("创建S3凭证失败: {}", e))?;

        Ok(Self { config, credentials })
    }

    /// 创建S3 Bucket客户端
    fn bucket(&self, name: &str) -> Result<Box<Bucket>, StorageError> {
        let region = Region::Custom {
            region: self.config.region.clone(),
            endpoint: self.config.resolved_endpoint(),
        };

        let bucket = Bucket::new(name, region, self.credentials.clone())
            .map_err(|e| anyhow!("创建S3 Bucket失败: {}", e))?;

        let bucket = if self.config.force_path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(bucket)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn name(&self) -> &str {
        "S3"
    }

    async fn head_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let client = self.bucket(bucket)?;

        // 只取一个键，用于判断存储桶是否存在及是否有权限
        client
            .list_page(String::new(), None, None, None, Some(1))
            .await
            .map_err(map_s3_error)?;

        Ok(())
    }

    async fn list(
        &self,
        bucket: &str,
        delimiter: &str,
        prefix: &str,
    ) -> Result<Listing, StorageError> {
        let client = self.bucket(bucket)?;

        let (result, _) = client
            .list_page(prefix.to_string(), Some(delimiter.to_string()), None, None, None)
            .await
            .map_err(map_s3_error)?;

        if result.is_truncated {
            tracing::debug!("S3列表被截断，只返回第一页: bucket={}, prefix={}", bucket, prefix);
        }

        let common_prefixes = result
            .common_prefixes
            .unwrap_or_default()
            .into_iter()
            .map(|cp| cp.prefix)
            .collect();

        let contents = result
            .contents
            .into_iter()
            .map(|obj| {
                entry_from_parts(
                    obj.key,
                    obj.e_tag,
                    &obj.last_modified,
                    obj.size as u64,
                    obj.storage_class,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Listing { common_prefixes, contents })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let client = self.bucket(bucket)?;

        let response = client.get_object(key).await.map_err(map_s3_error)?;

        // rust-s3返回完整响应
        Ok(response.bytes().to_vec())
    }
}

/// 将HTTP状态映射为存储错误
fn map_s3_error(err: S3Error) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound,
        S3Error::HttpFailWithBody(403, _) => StorageError::Forbidden,
        other => StorageError::Other(anyhow!("{}", other)),
    }
}

fn entry_from_parts(
    key: String,
    etag: Option<String>,
    last_modified: &str,
    size: u64,
    storage_class: Option<String>,
) -> Result<ObjectEntry, StorageError> {
    let last_modified = DateTime::parse_from_rfc3339(last_modified)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| anyhow!("解析LastModified失败: {}: {}", last_modified, e))?;

    Ok(ObjectEntry {
        key,
        etag: etag.unwrap_or_default(),
        last_modified,
        size,
        storage_class: storage_class.unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string()),
    })
}
