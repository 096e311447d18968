//! S3对象存储后端（基于 rust-s3）

pub mod config;
pub mod driver;
pub mod factory;

pub use config::S3ClientConfig;
pub use driver::S3Storage;
pub use factory::S3Connector;
