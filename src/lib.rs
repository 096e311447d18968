//! Browse an S3 bucket as a lazy, one-level directory tree.
//!
//! Open an [`S3Tree`] at a prefix, index or iterate its [`Node`]s, read
//! [`File`]s and descend into [`Directory`]s.

pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tree;
pub mod utils;

// Storage backends (point to project root drivers via path attribute) / 存储后端
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use config::{Credentials, S3TreeConfig};
pub use error::{Error, Result};
pub use models::{Directory, File, Node};
pub use tree::{S3Tree, TreeBuilder, TreeContext};
pub use utils::{humanize_size, normalize_path, normalize_path_value};
