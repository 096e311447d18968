//! S3客户端配置

use serde::{Deserialize, Serialize};

/// S3客户端配置（凭证单独解析）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3ClientConfig {
    /// 区域
    #[serde(default = "default_region")]
    pub region: String,
    /// S3端点地址，留空则使用 https://s3.{region}.amazonaws.com
    /// MinIO: http://localhost:9000
    #[serde(default)]
    pub endpoint: String,
    /// 强制使用路径风格（而非虚拟主机风格）
    /// MinIO等需要设置为true
    #[serde(default)]
    pub force_path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for S3ClientConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: String::new(),
            force_path_style: false,
        }
    }
}

impl S3ClientConfig {
    /// 实际使用的端点
    pub fn resolved_endpoint(&self) -> String {
        if self.endpoint.is_empty() {
            format!("https://s3.{}.amazonaws.com", self.region)
        } else {
            self.endpoint.trim_end_matches('/').to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_endpoint() {
        assert_eq!(
            S3ClientConfig::default().resolved_endpoint(),
            "https://s3.us-east-1.amazonaws.com"
        );

        let minio = S3ClientConfig {
            endpoint: "http://localhost:9000/".to_string(),
            force_path_style: true,
            ..Default::default()
        };
        assert_eq!(minio.resolved_endpoint(), "http://localhost:9000");
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: S3ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, S3ClientConfig::default());
    }
}
