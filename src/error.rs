//! Error types / 错误类型

use std::string::FromUtf8Error;

use thiserror::Error;

use crate::storage::StorageError;

/// Result type alias for tree operations / 结果类型别名
pub type Result<T> = std::result::Result<T, Error>;

/// Tree error types / 错误类型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid path provided. Path must be a string, or None.")]
    InvalidPath,

    #[error(
        "aws_access_key_id and aws_secret_access_key must be provided, either while \
         opening an S3Tree, or in the default configuration. Couldn't find either of them."
    )]
    ImproperlyConfigured,

    #[error("Could not find the bucket: {0}")]
    BucketNotFound(String),

    #[error("Permission to access denied for the bucket: {0}")]
    BucketAccessDenied(String),

    #[error("Directory could not be found: {0}")]
    DirectoryNotFound(String),

    #[error("File could not be found: {0}")]
    FileNotFound(String),

    #[error("Index {index} out of range for a tree of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Every tree sharing the node's context has been dropped / 所属树已释放
    #[error("The tree that listed {0} has been released")]
    TreeReleased(String),

    #[error("File {path} is not valid UTF-8")]
    InvalidUtf8 {
        path: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend failure the tree does not interpret / 未识别的存储错误，原样传递
    #[error(transparent)]
    Storage(#[from] StorageError),
}
