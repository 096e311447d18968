//! In-memory object storage / 内存对象存储
//!
//! Emulates the listing semantics of S3: keys are kept sorted, and keys with
//! the delimiter after the prefix fold into one common prefix each.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::config::Credentials;
use crate::storage::{
    Listing, ObjectEntry, ObjectStorage, StorageConnector, StorageError,
};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    etag: String,
    last_modified: DateTime<Utc>,
    storage_class: String,
}

#[derive(Debug, Default)]
struct MemoryBucket {
    objects: BTreeMap<String, StoredObject>,
    forbidden: bool,
    /// Every call fails with this message / 所有调用都以此错误失败
    failure: Option<String>,
    /// Only listing fails with this message / 仅列表调用失败
    list_failure: Option<String>,
}

impl MemoryBucket {
    fn check(&self) -> Result<(), StorageError> {
        if let Some(message) = &self.failure {
            return Err(StorageError::Other(anyhow!("{}", message)));
        }
        if self.forbidden {
            return Err(StorageError::Forbidden);
        }
        Ok(())
    }
}

/// Buckets kept in process memory / 内存中的存储桶
#[derive(Debug, Default)]
pub struct MemoryStorage {
    buckets: RwLock<HashMap<String, MemoryBucket>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty bucket; existing buckets are kept / 创建存储桶
    pub fn create_bucket(&self, bucket: &str) {
        self.buckets.write().entry(bucket.to_string()).or_default();
    }

    /// Make every request against `bucket` answer "forbidden" / 拒绝访问
    pub fn deny_bucket(&self, bucket: &str) {
        self.buckets.write().entry(bucket.to_string()).or_default().forbidden = true;
    }

    /// Make every request against `bucket` fail with an unrecognized error
    pub fn fail_bucket(&self, bucket: &str, message: &str) {
        self.buckets.write().entry(bucket.to_string()).or_default().failure = Some(message.to_string());
    }

    /// Make only listings of `bucket` fail; the probe and reads still work
    pub fn fail_listing(&self, bucket: &str, message: &str) {
        self.buckets.write().entry(bucket.to_string()).or_default().list_failure = Some(message.to_string());
    }

    pub fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write();
        let bucket = buckets.get_mut(bucket).ok_or(StorageError::NotFound)?;

        let etag = format!("\"{:x}\"", md5::compute(&data));
        bucket.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                etag,
                last_modified: Utc::now(),
                storage_class: "STANDARD".to_string(),
            },
        );
        Ok(())
    }

    pub fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write();
        let bucket = buckets.get_mut(bucket).ok_or(StorageError::NotFound)?;
        bucket.objects.remove(key);
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn head_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let buckets = self.buckets.read();
        buckets.get(bucket).ok_or(StorageError::NotFound)?.check()
    }

    async fn list(
        &self,
        bucket: &str,
        delimiter: &str,
        prefix: &str,
    ) -> Result<Listing, StorageError> {
        let buckets = self.buckets.read();
        let bucket = buckets.get(bucket).ok_or(StorageError::NotFound)?;
        bucket.check()?;
        if let Some(message) = &bucket.list_failure {
            return Err(StorageError::Other(anyhow!("{}", message)));
        }

        let mut listing = Listing::default();
        let matching = bucket
            .objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix));

        for (key, object) in matching {
            let rest = &key[prefix.len()..];
            match rest.find(delimiter).filter(|_| !delimiter.is_empty()) {
                Some(pos) => {
                    let common = &key[..prefix.len() + pos + delimiter.len()];
                    // keys are sorted, so a repeated prefix is always the last one pushed
                    if listing.common_prefixes.last().map(String::as_str) != Some(common) {
                        listing.common_prefixes.push(common.to_string());
                    }
                }
                None => listing.contents.push(ObjectEntry {
                    key: key.clone(),
                    etag: object.etag.clone(),
                    last_modified: object.last_modified,
                    size: object.data.len() as u64,
                    storage_class: object.storage_class.clone(),
                }),
            }
        }

        Ok(listing)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let buckets = self.buckets.read();
        let bucket = buckets.get(bucket).ok_or(StorageError::NotFound)?;
        bucket.check()?;

        bucket
            .objects
            .get(key)
            .map(|object| object.data.clone())
            .ok_or(StorageError::NotFound)
    }
}

/// Hands out one shared [`MemoryStorage`] and remembers who asked / 内存后端工厂
#[derive(Debug, Default)]
pub struct MemoryConnector {
    storage: Arc<MemoryStorage>,
    sessions: Mutex<Vec<Credentials>>,
}

impl MemoryConnector {
    pub fn new(storage: Arc<MemoryStorage>) -> Self {
        Self {
            storage,
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn storage(&self) -> &Arc<MemoryStorage> {
        &self.storage
    }

    /// Credentials of every `connect` call, oldest first / 每次连接使用的凭证
    pub fn sessions(&self) -> Vec<Credentials> {
        self.sessions.lock().clone()
    }
}

impl StorageConnector for MemoryConnector {
    fn connector_type(&self) -> &'static str {
        "memory"
    }

    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ObjectStorage>, StorageError> {
        self.sessions.lock().push(credentials.clone());
        Ok(self.storage.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.create_bucket("dummy-bucket");
        for key in ["b.txt", "a/1.txt", "a/2.txt", "a/deep/3.txt", "c/", "ab.txt"] {
            storage.put_object("dummy-bucket", key, key.as_bytes().to_vec()).unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn test_list_root() {
        let listing = storage().list("dummy-bucket", "/", "").await.unwrap();
        assert_eq!(listing.common_prefixes, vec!["a/", "c/"]);
        let keys: Vec<&str> = listing.contents.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["ab.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_list_prefix() {
        let listing = storage().list("dummy-bucket", "/", "a/").await.unwrap();
        assert_eq!(listing.common_prefixes, vec!["a/deep/"]);
        let keys: Vec<&str> = listing.contents.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a/1.txt", "a/2.txt"]);
        assert_eq!(listing.contents[0].size, 7);
    }

    #[tokio::test]
    async fn test_list_marker_object() {
        let listing = storage().list("dummy-bucket", "/", "c/").await.unwrap();
        assert_eq!(listing.key_count(), 1);
        assert_eq!(listing.contents[0].key, "c/");
    }

    #[tokio::test]
    async fn test_errors() {
        let storage = storage();
        assert!(matches!(storage.head_bucket("nope").await, Err(StorageError::NotFound)));
        assert!(matches!(
            storage.get_object("dummy-bucket", "missing").await,
            Err(StorageError::NotFound)
        ));

        storage.deny_bucket("private");
        assert!(matches!(storage.head_bucket("private").await, Err(StorageError::Forbidden)));

        storage.fail_bucket("broken", "connection reset");
        match storage.head_bucket("broken").await {
            Err(StorageError::Other(e)) => assert_eq!(e.to_string(), "connection reset"),
            other => panic!("unexpected: {:?}", other),
        }

        storage.fail_listing("dummy-bucket", "throttled");
        assert!(storage.head_bucket("dummy-bucket").await.is_ok());
        assert!(storage.get_object("dummy-bucket", "b.txt").await.is_ok());
        assert!(matches!(
            storage.list("dummy-bucket", "/", "").await,
            Err(StorageError::Other(_))
        ));
    }

    #[test]
    fn test_etag_is_md5() {
        let storage = MemoryStorage::new();
        storage.create_bucket("b");
        storage.put_object("b", "k", b"hello".to_vec()).unwrap();
        let buckets = storage.buckets.read();
        assert_eq!(
            buckets["b"].objects["k"].etag,
            "\"5d41402abc4b2a76b9719d911017c592\""
        );
    }

    #[test]
    fn test_connector_records_sessions() {
        let connector = MemoryConnector::new(Arc::new(MemoryStorage::new()));
        connector.connect(&Credentials::new("a", "b")).unwrap();
        assert_eq!(connector.sessions(), vec![Credentials::new("a", "b")]);
    }
}
