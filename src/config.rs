//! Configuration module / 配置模块
//!
//! Default credentials and client settings are an explicit value the host
//! builds once and passes to every tree it opens. Nothing here is global.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::drivers::s3::S3ClientConfig;
use crate::error::{Error, Result};

/// Resolved credentials for one tree / 已解析的凭证
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Default configuration consulted when a tree is opened without explicit
/// credentials / 默认配置
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct S3TreeConfig {
    #[serde(default)]
    pub aws_access_key_id: Option<String>,
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,
    #[serde(default)]
    pub aws_session_token: Option<String>,
    /// S3 client settings / S3客户端设置
    #[serde(default)]
    pub s3: S3ClientConfig,
}

impl fmt::Debug for S3TreeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3TreeConfig")
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &self.aws_secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("aws_session_token", &self.aws_session_token.as_ref().map(|_| "<redacted>"))
            .field("s3", &self.s3)
            .finish()
    }
}

impl S3TreeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set default credentials / 设置默认凭证
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.aws_access_key_id = Some(access_key_id.into());
        self.aws_secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Load configuration from a JSON file / 从JSON文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

        let config: S3TreeConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file {:?}: {}", path, e)))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Build configuration from the process environment / 从环境变量构建配置
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut s3 = S3ClientConfig::default();
        if let Some(region) = non_empty(lookup("AWS_REGION")) {
            s3.region = region;
        }
        if let Some(endpoint) = non_empty(lookup("S3TREE_ENDPOINT")) {
            s3.endpoint = endpoint;
        }
        if let Some(flag) = lookup("S3TREE_FORCE_PATH_STYLE") {
            s3.force_path_style = matches!(flag.trim(), "1" | "true" | "TRUE" | "yes");
        }

        Self {
            aws_access_key_id: non_empty(lookup("AWS_ACCESS_KEY_ID")),
            aws_secret_access_key: non_empty(lookup("AWS_SECRET_ACCESS_KEY")),
            aws_session_token: non_empty(lookup("AWS_SESSION_TOKEN")),
            s3,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Resolve credentials field by field: explicit values win over the
/// configured defaults. Empty strings count as missing.
/// 逐字段解析凭证：显式参数优先于默认配置
pub fn resolve_credentials(
    access_key_id: Option<&str>,
    secret_access_key: Option<&str>,
    session_token: Option<&str>,
    defaults: Option<&S3TreeConfig>,
) -> Result<Credentials> {
    let pick = |explicit: Option<&str>, fallback: Option<&String>| -> Option<String> {
        explicit
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| fallback.filter(|v| !v.is_empty()).cloned())
    };

    let access_key_id = pick(access_key_id, defaults.and_then(|c| c.aws_access_key_id.as_ref()));
    let secret_access_key = pick(
        secret_access_key,
        defaults.and_then(|c| c.aws_secret_access_key.as_ref()),
    );
    let session_token = pick(session_token, defaults.and_then(|c| c.aws_session_token.as_ref()));

    match (access_key_id, secret_access_key) {
        (Some(access_key_id), Some(secret_access_key)) => Ok(Credentials {
            access_key_id,
            secret_access_key,
            session_token,
        }),
        _ => Err(Error::ImproperlyConfigured),
    }
}
