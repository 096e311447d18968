//! Tree nodes / 树节点
//!
//! A node wraps one listing entry plus a weak handle to the context of the
//! tree that produced it. The handle is enough to go back to storage
//! (`Directory::descend`, `File::read`) without keeping the client alive.

use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::storage::{ObjectEntry, StorageError};
use crate::tree::{S3Tree, TreeContext};
use crate::utils::{basename, humanize_size};

/// A child of a tree: a common prefix or an object / 目录或文件
#[derive(Debug, Clone)]
pub enum Node {
    Directory(Directory),
    File(File),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Directory(d) => d.name(),
            Node::File(f) => f.name(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Node::Directory(d) => d.path(),
            Node::File(f) => f.path(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Node::Directory(d) => Some(d),
            Node::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Node::File(f) => Some(f),
            Node::Directory(_) => None,
        }
    }

    /// JSON record of this node, same shape as its `Serialize` output / 节点的JSON记录
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::Directory(d) => d.serialize(serializer),
            Node::File(f) => f.serialize(serializer),
        }
    }
}

/// A common prefix / 目录（公共前缀）
#[derive(Debug, Clone)]
pub struct Directory {
    path: String,
    name: String,
    tree: Weak<TreeContext>,
}

#[derive(Serialize)]
struct DirectoryRecord<'a> {
    name: &'a str,
    path: &'a str,
}

impl Directory {
    pub(crate) fn new(prefix: String, tree: Weak<TreeContext>) -> Self {
        let name = basename(&prefix).to_string();
        Self { path: prefix, name, tree }
    }

    /// Basename without the trailing delimiter / 目录名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full prefix, always ending with the delimiter / 完整前缀
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Open the tree rooted at this directory, with the bucket, credentials
    /// and client of the tree this node came from / 进入子目录
    ///
    /// Fails with [`Error::DirectoryNotFound`] if the prefix was deleted
    /// after the parent listing.
    #[doc(alias = "get_tree")]
    pub async fn descend(&self) -> Result<S3Tree> {
        let context = upgrade(&self.tree, &self.path)?;
        S3Tree::open_in(context, Some(self.path.as_str())).await
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for Directory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        DirectoryRecord { name: &self.name, path: &self.path }.serialize(serializer)
    }
}

/// An object / 文件（对象）
#[derive(Debug, Clone)]
pub struct File {
    path: String,
    name: String,
    size_in_bytes: u64,
    etag: String,
    last_modified: DateTime<Utc>,
    storage_class: String,
    size: OnceCell<String>,
    tree: Weak<TreeContext>,
}

#[derive(Serialize)]
struct FileRecord<'a> {
    name: &'a str,
    path: &'a str,
    etag: &'a str,
    size_in_bytes: u64,
    size: &'a str,
    last_modified: String,
}

impl File {
    pub(crate) fn new(entry: ObjectEntry, tree: Weak<TreeContext>) -> Self {
        let name = basename(&entry.key).to_string();
        Self {
            path: entry.key,
            name,
            size_in_bytes: entry.size,
            etag: entry.etag,
            last_modified: entry.last_modified,
            storage_class: entry.storage_class,
            size: OnceCell::new(),
            tree,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.size_in_bytes
    }

    /// Human readable size, computed on first use / 可读大小（首次调用时计算）
    pub fn size(&self) -> &str {
        self.size.get_or_init(|| humanize_size(self.size_in_bytes))
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn storage_class(&self) -> &str {
        &self.storage_class
    }

    /// Fetch the raw content. Never cached / 读取原始内容（不缓存）
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        let context = upgrade(&self.tree, &self.path)?;
        tracing::debug!("get object: bucket={}, key={}", context.bucket(), self.path);

        match context.client().get_object(context.bucket(), &self.path).await {
            Ok(data) => Ok(data),
            Err(StorageError::NotFound) => Err(Error::FileNotFound(self.path.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch the content as UTF-8 text / 读取文本内容
    pub async fn read(&self) -> Result<String> {
        let data = self.read_bytes().await?;
        String::from_utf8(data).map_err(|source| Error::InvalidUtf8 {
            path: self.path.clone(),
            source,
        })
    }

    fn record(&self) -> FileRecord<'_> {
        FileRecord {
            name: &self.name,
            path: &self.path,
            etag: &self.etag,
            size_in_bytes: self.size_in_bytes,
            size: self.size(),
            last_modified: self.last_modified.to_rfc3339(),
        }
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for File {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record().serialize(serializer)
    }
}

fn upgrade(tree: &Weak<TreeContext>, path: &str) -> Result<Arc<TreeContext>> {
    tree.upgrade().ok_or_else(|| Error::TreeReleased(path.to_string()))
}
