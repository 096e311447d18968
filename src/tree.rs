//! Lazy one-level tree over a bucket prefix / 存储桶前缀上的单层惰性树
//!
//! Opening a tree probes the bucket, lists once with the delimiter and
//! materializes the result: directories first, then files, each in the
//! order the backend returned them. The sequence never changes afterwards.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::config::{resolve_credentials, Credentials, S3TreeConfig};
use crate::drivers::s3::S3Connector;
use crate::error::{Error, Result};
use crate::models::{Directory, File, Node};
use crate::storage::{Listing, ObjectStorage, StorageConnector, StorageError, DELIMITER};
use crate::utils::normalize_path;

/// What a tree and its nodes need to go back to storage / 树上下文
pub struct TreeContext {
    bucket: String,
    credentials: Credentials,
    client: Arc<dyn ObjectStorage>,
}

impl TreeContext {
    pub(crate) fn new(bucket: String, credentials: Credentials, client: Arc<dyn ObjectStorage>) -> Self {
        Self { bucket, credentials, client }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn client(&self) -> &Arc<dyn ObjectStorage> {
        &self.client
    }
}

impl fmt::Debug for TreeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeContext")
            .field("bucket", &self.bucket)
            .field("credentials", &self.credentials)
            .field("client", &self.client.name())
            .finish()
    }
}

/// The directories and files directly below one prefix / 某前缀下的目录与文件
///
/// ```no_run
/// # async fn demo() -> s3tree::Result<()> {
/// let config = s3tree::S3TreeConfig::new().with_credentials("key", "secret");
/// let tree = s3tree::S3Tree::builder("demo").path("/static/js").config(&config).open().await?;
/// for node in &tree {
///     println!("{}", node);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct S3Tree {
    context: Arc<TreeContext>,
    path: String,
    nodes: Vec<Node>,
    num_directories: usize,
}

impl S3Tree {
    pub fn builder<'a>(bucket: impl Into<String>) -> TreeBuilder<'a> {
        TreeBuilder::new(bucket.into())
    }

    /// Open with the default S3 backend and the credentials in `config`
    pub async fn open(config: &S3TreeConfig, bucket: &str, path: Option<&str>) -> Result<Self> {
        let mut builder = Self::builder(bucket).config(config);
        if let Some(path) = path {
            builder = builder.path(path);
        }
        builder.open().await
    }

    /// Probe, list and materialize / 检查存储桶、列出并构建节点
    pub(crate) async fn open_in(context: Arc<TreeContext>, path: Option<&str>) -> Result<Self> {
        ensure_bucket_exists(&context).await?;

        let path = normalize_path(path);
        let listing = fetch_tree(&context, &path).await?;

        let (nodes, num_directories) = prepare_tree(&context, listing);
        tracing::debug!(
            "tree opened: bucket={}, path={:?}, directories={}, files={}",
            context.bucket,
            path,
            num_directories,
            nodes.len() - num_directories
        );

        Ok(Self { context, path, nodes, num_directories })
    }

    pub fn bucket(&self) -> &str {
        &self.context.bucket
    }

    /// Normalized base path ("" for the bucket root) / 规范化后的基路径
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn context(&self) -> &Arc<TreeContext> {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at `index` / 按位置取节点
    pub fn get(&self, index: usize) -> Result<&Node> {
        self.nodes.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.nodes.len(),
        })
    }

    /// Walk the materialized sequence. No storage call / 遍历（不访问存储）
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn num_directories(&self) -> usize {
        self.num_directories
    }

    pub fn num_files(&self) -> usize {
        self.nodes.len() - self.num_directories
    }

    pub fn directories(&self) -> impl Iterator<Item = &Directory> {
        self.nodes[..self.num_directories].iter().filter_map(Node::as_directory)
    }

    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.nodes[self.num_directories..].iter().filter_map(Node::as_file)
    }

    /// One JSON record per node, directories first / 每个节点一条JSON记录
    pub fn to_values(&self) -> serde_json::Result<Vec<serde_json::Value>> {
        self.nodes.iter().map(Node::to_value).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Index<usize> for S3Tree {
    type Output = Node;

    fn index(&self, index: usize) -> &Node {
        &self.nodes[index]
    }
}

impl<'a> IntoIterator for &'a S3Tree {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl Serialize for S3Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.nodes)
    }
}

/// Check the bucket exists and the credentials can reach it / 检查存储桶是否存在且可访问
async fn ensure_bucket_exists(context: &TreeContext) -> Result<()> {
    match context.client.head_bucket(&context.bucket).await {
        Ok(()) => Ok(()),
        Err(StorageError::NotFound) => Err(Error::BucketNotFound(context.bucket.clone())),
        Err(StorageError::Forbidden) => Err(Error::BucketAccessDenied(context.bucket.clone())),
        Err(e) => Err(e.into()),
    }
}

async fn fetch_tree(context: &TreeContext, path: &str) -> Result<Listing> {
    tracing::debug!("list: bucket={}, prefix={:?}", context.bucket, path);
    let listing = context.client.list(&context.bucket, DELIMITER, path).await?;

    // an empty listing is only fine at the bucket root
    if listing.key_count() == 0 && !path.is_empty() {
        return Err(Error::DirectoryNotFound(path.to_string()));
    }

    Ok(listing)
}

fn prepare_tree(context: &Arc<TreeContext>, listing: Listing) -> (Vec<Node>, usize) {
    let handle = Arc::downgrade(context);
    let mut nodes = Vec::with_capacity(listing.key_count());

    for prefix in listing.common_prefixes {
        nodes.push(Node::Directory(Directory::new(prefix, handle.clone())));
    }
    let num_directories = nodes.len();

    for entry in listing.contents {
        nodes.push(Node::File(File::new(entry, handle.clone())));
    }

    (nodes, num_directories)
}

/// Collects what is needed to open a tree / 打开树的构建器
pub struct TreeBuilder<'a> {
    bucket: String,
    path: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
    config: Option<&'a S3TreeConfig>,
}

impl<'a> TreeBuilder<'a> {
    fn new(bucket: String) -> Self {
        Self {
            bucket,
            path: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            config: None,
        }
    }

    /// Base path; leading "/" is optional / 基路径
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn access_key_id(mut self, value: impl Into<String>) -> Self {
        self.access_key_id = Some(value.into());
        self
    }

    pub fn secret_access_key(mut self, value: impl Into<String>) -> Self {
        self.secret_access_key = Some(value.into());
        self
    }

    pub fn session_token(mut self, value: impl Into<String>) -> Self {
        self.session_token = Some(value.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.access_key_id = Some(credentials.access_key_id);
        self.secret_access_key = Some(credentials.secret_access_key);
        self.session_token = credentials.session_token;
        self
    }

    /// Defaults used for anything not set explicitly / 默认配置
    pub fn config(mut self, config: &'a S3TreeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Open against S3 using the client settings of the config / 使用S3后端打开
    pub async fn open(self) -> Result<S3Tree> {
        let connector = S3Connector::new(self.config.map(|c| c.s3.clone()).unwrap_or_default());
        self.open_with(&connector).await
    }

    /// Open with any storage backend / 使用指定后端打开
    pub async fn open_with(self, connector: &dyn StorageConnector) -> Result<S3Tree> {
        let credentials = resolve_credentials(
            self.access_key_id.as_deref(),
            self.secret_access_key.as_deref(),
            self.session_token.as_deref(),
            self.config,
        )?;

        let client = connector.connect(&credentials)?;
        tracing::debug!(
            "connected {} client for bucket {}",
            connector.connector_type(),
            self.bucket
        );

        let context = Arc::new(TreeContext::new(self.bucket, credentials, client));
        S3Tree::open_in(context, self.path.as_deref()).await
    }
}
