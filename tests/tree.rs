use std::sync::Arc;

use s3tree::drivers::memory::{MemoryConnector, MemoryStorage};
use s3tree::storage::{ObjectStorage, StorageError, DELIMITER};
use s3tree::{Credentials, Error, Node, S3Tree, S3TreeConfig};

const DUMMY_BUCKET_NAME: &str = "dummy-bucket";
const DUMMY_ACCESS_KEY_ID: &str = "dummy-key";
const DUMMY_SECRET_ACCESS_KEY: &str = "dummy-secret";

// The root holds 7 entries: 3 directories (cache, css, js) and 4 files.
// Listing order is lexicographic by key, so `cache` comes first and
// `index.js` last.
const FILES: &[&str] = &[
    "index.js",
    "avatar.jpg",
    "__init__.py",
    "Makefile",
    "css/app.less",
    "css/base.css",
    "js/vendor/angular.js",
    "js/vendor/angular.min.js",
    "js/vendor/latest/react.js",
    "cache/foo.rb",
    "cache/staticfiles/latest/index.js",
    "cache/staticfiles/dummy.txt",
    "cache/staticfiles/logs.txt",
];

fn content_for(key: &str) -> String {
    format!("{} abcdefghijklmnopqrstuvwxyz", key)
}

fn dummy_connector() -> MemoryConnector {
    let storage = Arc::new(MemoryStorage::new());
    storage.create_bucket(DUMMY_BUCKET_NAME);
    for key in FILES {
        storage
            .put_object(DUMMY_BUCKET_NAME, key, content_for(key).into_bytes())
            .unwrap();
    }
    MemoryConnector::new(storage)
}

fn dummy_config() -> S3TreeConfig {
    S3TreeConfig::new().with_credentials(DUMMY_ACCESS_KEY_ID, DUMMY_SECRET_ACCESS_KEY)
}

async fn open(connector: &MemoryConnector, path: Option<&str>) -> s3tree::Result<S3Tree> {
    let config = dummy_config();
    let mut builder = S3Tree::builder(DUMMY_BUCKET_NAME).config(&config);
    if let Some(path) = path {
        builder = builder.path(path);
    }
    builder.open_with(connector).await
}

#[tokio::test]
async fn test_improperly_configured() {
    let connector = dummy_connector();
    let result = S3Tree::builder(DUMMY_BUCKET_NAME).open_with(&connector).await;
    assert!(matches!(result, Err(Error::ImproperlyConfigured)));
    assert!(connector.sessions().is_empty());
}

#[tokio::test]
async fn test_works_with_default_config() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();
    assert_eq!(tree.len(), 7);
    assert_eq!(
        connector.sessions(),
        vec![Credentials::new(DUMMY_ACCESS_KEY_ID, DUMMY_SECRET_ACCESS_KEY)]
    );
}

#[tokio::test]
async fn test_explicit_credentials_win() {
    let connector = dummy_connector();
    let config = dummy_config();
    let tree = S3Tree::builder(DUMMY_BUCKET_NAME)
        .config(&config)
        .credentials(Credentials::new("other-key", "other-secret"))
        .open_with(&connector)
        .await
        .unwrap();

    assert_eq!(connector.sessions(), vec![Credentials::new("other-key", "other-secret")]);
    assert_eq!(tree.context().credentials(), &Credentials::new("other-key", "other-secret"));

    // the child tree keeps the credentials it was opened with
    let child = tree[0].as_directory().unwrap().descend().await.unwrap();
    assert_eq!(child.context().credentials().access_key_id, "other-key");
}

#[tokio::test]
async fn test_bucket_not_found() {
    let connector = dummy_connector();
    let config = dummy_config();
    let result = S3Tree::builder("foo").config(&config).open_with(&connector).await;
    match result {
        Err(Error::BucketNotFound(bucket)) => assert_eq!(bucket, "foo"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_bucket_access_denied() {
    let connector = dummy_connector();
    connector.storage().deny_bucket("private");
    let config = dummy_config();
    let result = S3Tree::builder("private").config(&config).open_with(&connector).await;
    assert!(matches!(result, Err(Error::BucketAccessDenied(b)) if b == "private"));
}

#[tokio::test]
async fn test_unknown_backend_error_propagates() {
    let connector = dummy_connector();
    connector.storage().fail_bucket("flaky", "slow down");
    let config = dummy_config();
    let result = S3Tree::builder("flaky").config(&config).open_with(&connector).await;
    match result {
        Err(Error::Storage(StorageError::Other(e))) => assert_eq!(e.to_string(), "slow down"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_list_error_propagates() {
    let connector = dummy_connector();
    connector.storage().fail_listing(DUMMY_BUCKET_NAME, "throttled");
    match open(&connector, None).await {
        Err(Error::Storage(StorageError::Other(e))) => assert_eq!(e.to_string(), "throttled"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_descend_list_error_propagates() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();

    connector.storage().fail_listing(DUMMY_BUCKET_NAME, "throttled");
    let cache = tree[0].as_directory().unwrap();
    match cache.descend().await {
        Err(Error::Storage(StorageError::Other(e))) => assert_eq!(e.to_string(), "throttled"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_read_error_propagates() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();

    connector.storage().fail_bucket(DUMMY_BUCKET_NAME, "connection reset");
    let file = tree.files().find(|f| f.name() == "index.js").unwrap();
    match file.read().await {
        Err(Error::Storage(StorageError::Other(e))) => assert_eq!(e.to_string(), "connection reset"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_directory_not_found() {
    let connector = dummy_connector();
    let result = open(&connector, Some("/does/not/exist")).await;
    match result {
        Err(Error::DirectoryNotFound(path)) => assert_eq!(path, "does/not/exist/"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_bucket_root_is_empty_tree() {
    let storage = Arc::new(MemoryStorage::new());
    storage.create_bucket("empty");
    let connector = MemoryConnector::new(storage);
    let config = dummy_config();

    for path in [None, Some(""), Some("/")] {
        let mut builder = S3Tree::builder("empty").config(&config);
        if let Some(path) = path {
            builder = builder.path(path);
        }
        let tree = builder.open_with(&connector).await.unwrap();
        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert_eq!(tree.path(), "");
    }
}

#[tokio::test]
async fn test_root_tree() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();

    assert_eq!(tree.bucket(), DUMMY_BUCKET_NAME);
    assert_eq!(tree.path(), "");
    assert_eq!(tree.len(), 7);
    assert_eq!(tree.num_directories(), 3);
    assert_eq!(tree.num_files(), 4);
    assert_eq!(tree.len(), tree.num_directories() + tree.num_files());

    let first = tree.get(0).unwrap();
    assert!(first.is_dir());
    assert_eq!(first.name(), "cache");
    assert_eq!(first.path(), "cache/");

    let last = &tree[tree.len() - 1];
    assert!(!last.is_dir());
    assert_eq!(last.name(), "index.js");

    let directories: Vec<&str> = tree.directories().map(|d| d.name()).collect();
    assert_eq!(directories, vec!["cache", "css", "js"]);
    let files: Vec<&str> = tree.files().map(|f| f.name()).collect();
    assert_eq!(files, vec!["Makefile", "__init__.py", "avatar.jpg", "index.js"]);
}

#[tokio::test]
async fn test_index_out_of_range() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();
    assert!(matches!(
        tree.get(7),
        Err(Error::IndexOutOfRange { index: 7, len: 7 })
    ));
}

#[tokio::test]
async fn test_iteration_is_restartable() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();

    let first: Vec<String> = tree.iter().map(|n| n.to_string()).collect();
    let second: Vec<String> = (&tree).into_iter().map(|n| n.to_string()).collect();
    assert_eq!(first.len(), 7);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_path_is_normalized() {
    let connector = dummy_connector();
    let tree = open(&connector, Some("/js/vendor")).await.unwrap();
    assert_eq!(tree.path(), "js/vendor/");
    assert_eq!(tree.num_directories(), 1);
    assert_eq!(tree.num_files(), 2);
    assert_eq!(tree[0].name(), "latest");
}

#[tokio::test]
async fn test_directory_marker_is_a_file() {
    let connector = dummy_connector();
    connector.storage().put_object(DUMMY_BUCKET_NAME, "css/", Vec::new()).unwrap();

    let listing = connector.storage().list(DUMMY_BUCKET_NAME, DELIMITER, "css/").await.unwrap();
    let tree = open(&connector, Some("css")).await.unwrap();
    assert_eq!(tree.len(), listing.contents.len() + listing.common_prefixes.len());
    assert_eq!(tree.num_files(), 3);

    let marker = tree.get(0).unwrap().as_file().unwrap();
    assert_eq!(marker.path(), "css/");
    assert_eq!(marker.size_in_bytes(), 0);

    // the marker folds into the `css/` prefix at the root
    let root = open(&connector, None).await.unwrap();
    assert_eq!(root.len(), 7);
}

#[tokio::test]
async fn test_marker_only_prefix() {
    let storage = Arc::new(MemoryStorage::new());
    storage.create_bucket("markers");
    storage.put_object("markers", "empty/", Vec::new()).unwrap();
    let connector = MemoryConnector::new(storage);
    let config = dummy_config();

    let tree = S3Tree::builder("markers")
        .config(&config)
        .path("empty")
        .open_with(&connector)
        .await
        .unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.num_directories(), 0);
    assert_eq!(tree[0].path(), "empty/");
}

#[tokio::test]
async fn test_descend() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();

    let cache = tree[0].as_directory().unwrap();
    let child = cache.descend().await.unwrap();
    assert_eq!(child.path(), "cache/");
    assert_eq!(child.len(), 2);
    assert_eq!(child[0].name(), "staticfiles");
    assert_eq!(child[1].name(), "foo.rb");

    // the child reuses the parent's client and credentials
    assert!(Arc::ptr_eq(child.context(), tree.context()));
    assert_eq!(connector.sessions().len(), 1);

    let grandchild = child[0].as_directory().unwrap().descend().await.unwrap();
    assert_eq!(grandchild.len(), 3);
}

#[tokio::test]
async fn test_descend_after_prefix_deleted() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();

    for key in ["css/app.less", "css/base.css"] {
        connector.storage().delete_object(DUMMY_BUCKET_NAME, key).unwrap();
    }

    let css = tree.directories().find(|d| d.name() == "css").unwrap();
    assert!(matches!(css.descend().await, Err(Error::DirectoryNotFound(p)) if p == "css/"));
}

#[tokio::test]
async fn test_read() {
    let connector = dummy_connector();
    let tree = open(&connector, Some("css")).await.unwrap();

    let file = tree.files().find(|f| f.name() == "app.less").unwrap();
    assert_eq!(file.read().await.unwrap(), content_for("css/app.less"));
    assert_eq!(file.size_in_bytes(), content_for("css/app.less").len() as u64);

    // not cached: a rewrite is visible on the next read
    connector
        .storage()
        .put_object(DUMMY_BUCKET_NAME, "css/app.less", b"body {}".to_vec())
        .unwrap();
    assert_eq!(file.read().await.unwrap(), "body {}");
}

#[tokio::test]
async fn test_read_deleted_file() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();

    connector.storage().delete_object(DUMMY_BUCKET_NAME, "index.js").unwrap();
    let file = tree.files().find(|f| f.name() == "index.js").unwrap();
    assert!(matches!(file.read().await, Err(Error::FileNotFound(p)) if p == "index.js"));
}

#[tokio::test]
async fn test_read_binary() {
    let connector = dummy_connector();
    connector
        .storage()
        .put_object(DUMMY_BUCKET_NAME, "logo.png", vec![0x89, 0x50, 0xff, 0xfe])
        .unwrap();
    let tree = open(&connector, None).await.unwrap();

    let file = tree.files().find(|f| f.name() == "logo.png").unwrap();
    assert_eq!(file.read_bytes().await.unwrap(), vec![0x89, 0x50, 0xff, 0xfe]);
    assert!(matches!(file.read().await, Err(Error::InvalidUtf8 { .. })));
}

#[tokio::test]
async fn test_nodes_do_not_keep_tree_alive() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();
    let node: Node = tree[0].clone();
    drop(tree);

    let directory = node.as_directory().unwrap();
    assert!(matches!(directory.descend().await, Err(Error::TreeReleased(p)) if p == "cache/"));
}

#[tokio::test]
async fn test_serialization() {
    let connector = dummy_connector();
    let tree = open(&connector, None).await.unwrap();

    let records: Vec<serde_json::Value> = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
    assert_eq!(records.len(), tree.len());
    assert_eq!(records, tree.to_values().unwrap());

    // directories first, then files
    for record in &records[..3] {
        assert_eq!(record.as_object().unwrap().len(), 2);
    }
    for record in &records[3..] {
        assert!(record.get("etag").is_some());
        assert!(record.get("size_in_bytes").is_some());
    }
    assert_eq!(records[0]["name"], "cache");
    assert_eq!(records[6]["name"], "index.js");

    // Serialize and to_json agree
    let serialized = serde_json::to_value(&tree).unwrap();
    assert_eq!(serialized, serde_json::Value::Array(records));
}
