// Storage backends / 存储后端
pub mod memory;
pub mod s3;
