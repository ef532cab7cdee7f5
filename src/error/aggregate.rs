//! 聚合错误
//!
//! 逐项收集失败而不中断批处理，一个服务失败不会掩盖其他服务的失败

use super::BoxError;
use std::fmt;

/// 多个底层错误的有序集合
///
/// 渲染时按插入顺序以 `"; "` 连接；空集合渲染为空字符串
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<BoxError>,
}

impl AggregateError {
    /// 创建空的聚合错误
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个错误
    pub fn add(&mut self, error: impl Into<BoxError>) {
        self.errors.push(error.into());
    }

    /// 是否存在错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// 按插入顺序遍历底层错误
    pub fn errors(&self) -> impl Iterator<Item = &(dyn std::error::Error + Send + Sync + 'static)> {
        self.errors.iter().map(|e| e.as_ref())
    }

    /// 无错误时返回 `Ok(())`，否则返回自身
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

impl<E: Into<BoxError>> FromIterator<E> for AggregateError {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<E: Into<BoxError>> Extend<E> for AggregateError {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        self.errors.extend(iter.into_iter().map(Into::into));
    }
}
