//! 错误类型转换实现

use super::ProviderError;

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Backend(format!("failed to parse registry response: {}", err))
    }
}
