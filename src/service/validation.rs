//! 服务校验
//!
//! 基础校验总是最先执行；后端可以追加自定义校验器

use super::Service;
use thiserror::Error;

/// 校验错误，消息中包含出错字段
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field \"name\" is required")]
    MissingName,

    #[error("field \"address\" is required")]
    MissingAddress,

    #[error("field \"node\" is required")]
    MissingNode,

    #[error("field \"node.node\" is required")]
    MissingNodeName,

    #[error("field \"node.address\" is required")]
    MissingNodeAddress,

    /// 后端自定义校验失败
    #[error("{0}")]
    Custom(String),
}

impl ValidationError {
    pub fn custom(msg: impl Into<String>) -> Self {
        ValidationError::Custom(msg.into())
    }

    /// 出错字段名（自定义错误返回 None）
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::MissingName => Some("name"),
            ValidationError::MissingAddress => Some("address"),
            ValidationError::MissingNode => Some("node"),
            ValidationError::MissingNodeName => Some("node.node"),
            ValidationError::MissingNodeAddress => Some("node.address"),
            ValidationError::Custom(_) => None,
        }
    }
}

/// 后端自定义校验器
pub trait ServiceValidator: Send + Sync {
    fn validate(&self, service: &Service) -> Result<(), ValidationError>;
}

impl<F> ServiceValidator for F
where
    F: Fn(&Service) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, service: &Service) -> Result<(), ValidationError> {
        self(service)
    }
}

/// 要求服务携带节点信息（节点粒度注册的后端使用）
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireNode;

impl ServiceValidator for RequireNode {
    fn validate(&self, service: &Service) -> Result<(), ValidationError> {
        if service.node.is_none() {
            return Err(ValidationError::MissingNode);
        }
        Ok(())
    }
}

/// 基础校验，遇到第一个错误立即返回
///
/// 顺序：name → address → node.node → node.address
pub fn validate(service: &Service) -> Result<(), ValidationError> {
    if service.name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    if service.address.is_empty() {
        return Err(ValidationError::MissingAddress);
    }
    if let Some(node) = &service.node {
        if node.node.is_empty() {
            return Err(ValidationError::MissingNodeName);
        }
        if node.address.is_empty() {
            return Err(ValidationError::MissingNodeAddress);
        }
    }
    Ok(())
}

/// 先执行基础校验，再按顺序执行自定义校验器
pub fn validate_with(
    service: &Service,
    validators: &[&dyn ServiceValidator],
) -> Result<(), ValidationError> {
    validate(service)?;
    for validator in validators {
        validator.validate(service)?;
    }
    Ok(())
}
