//! Path and size helpers / 路径与大小工具函数

use serde_json::Value;

use crate::error::{Error, Result};
use crate::storage::DELIMITER;

const SIZE_UNITS: [&str; 9] = ["bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Normalize a user path into a storage key prefix / 规范化路径为存储键前缀
/// 1. No path, "" or "/" is the bucket root: "" / 空路径即根前缀
/// 2. Leading "/" are stripped, keys never start with one / 去掉开头的 /
/// 3. Exactly one trailing "/" so only direct children match / 以 / 结尾
pub fn normalize_path(path: Option<&str>) -> String {
    let path = match path {
        Some(p) => p.trim_start_matches(DELIMITER),
        None => return String::new(),
    };

    if path.is_empty() {
        return String::new();
    }

    if path.ends_with(DELIMITER) {
        path.to_string()
    } else {
        format!("{}{}", path, DELIMITER)
    }
}

/// Normalize a dynamically typed path (JSON null or string) / 规范化JSON路径
pub fn normalize_path_value(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(normalize_path(None)),
        Value::String(s) => Ok(normalize_path(Some(s.as_str()))),
        _ => Err(Error::InvalidPath),
    }
}

/// Last segment of a key, ignoring a trailing delimiter / 获取键的最后一段
pub fn basename(key: &str) -> &str {
    let trimmed = key.trim_end_matches(DELIMITER);
    trimmed.rsplit(DELIMITER).next().unwrap_or(trimmed)
}

/// Human readable size on a base-1024 ladder / 格式化文件大小
pub fn humanize_size(bytes: u64) -> String {
    let order = if bytes == 0 {
        0
    } else {
        // floor(log2(bytes)) / 10
        ((63 - bytes.leading_zeros()) / 10) as usize
    };
    let order = order.min(SIZE_UNITS.len() - 1);

    let value = bytes as f64 / 1024f64.powi(order as i32);
    format!("{} {}", format_significant(value, 4), SIZE_UNITS[order])
}

/// Up to `digits` significant digits, no exponent, trailing zeros trimmed
fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let int_digits = (value.abs().log10().floor() as i64 + 1).max(1) as usize;
    let decimals = digits.saturating_sub(int_digits);
    let formatted = format!("{:.*}", decimals, value);

    if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        formatted
    }
}
