//! 签名核心统一错误类型
//!
//! 所有错误都向调用方暴露，核心内部不吞错、不重试

use thiserror::Error;

/// 稳定的错误码（与前端/服务层对齐）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreErrorCode {
    // 输入校验
    InvalidPrivateKey,
    InvalidPublicKey,
    InvalidAddress,
    InvalidPayload,
    DerivationError,

    // 能力
    UnsupportedOperation,
    NotImplemented,
    NetworkNotSupported,

    // 凭证与硬件
    CredentialUnavailable,
    Cancelled,
    UserRejected,
    TransportTimeout,

    // 其他
    SigningFailed,
    Config,
}

impl CoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoreErrorCode::InvalidPrivateKey => "invalid_private_key",
            CoreErrorCode::InvalidPublicKey => "invalid_public_key",
            CoreErrorCode::InvalidAddress => "invalid_address",
            CoreErrorCode::InvalidPayload => "invalid_payload",
            CoreErrorCode::DerivationError => "derivation_error",
            CoreErrorCode::UnsupportedOperation => "unsupported_operation",
            CoreErrorCode::NotImplemented => "not_implemented",
            CoreErrorCode::NetworkNotSupported => "network_not_supported",
            CoreErrorCode::CredentialUnavailable => "credential_unavailable",
            CoreErrorCode::Cancelled => "cancelled",
            CoreErrorCode::UserRejected => "user_rejected",
            CoreErrorCode::TransportTimeout => "transport_timeout",
            CoreErrorCode::SigningFailed => "signing_failed",
            CoreErrorCode::Config => "config",
        }
    }

    /// 校验类错误：必须在任何密码学计算之前抛出
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreErrorCode::InvalidPrivateKey
                | CoreErrorCode::InvalidPublicKey
                | CoreErrorCode::InvalidAddress
                | CoreErrorCode::InvalidPayload
                | CoreErrorCode::DerivationError
        )
    }
}

/// 签名核心错误
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Derivation error: {0}")]
    DerivationError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Network not supported: {0}")]
    NetworkNotSupported(String),

    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Rejected by user on device")]
    UserRejected,

    #[error("Hardware transport timed out")]
    TransportTimeout,

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn code(&self) -> CoreErrorCode {
        match self {
            CoreError::InvalidPrivateKey(_) => CoreErrorCode::InvalidPrivateKey,
            CoreError::InvalidPublicKey(_) => CoreErrorCode::InvalidPublicKey,
            CoreError::InvalidAddress(_) => CoreErrorCode::InvalidAddress,
            CoreError::InvalidPayload(_) => CoreErrorCode::InvalidPayload,
            CoreError::DerivationError(_) => CoreErrorCode::DerivationError,
            CoreError::UnsupportedOperation(_) => CoreErrorCode::UnsupportedOperation,
            CoreError::NotImplemented(_) => CoreErrorCode::NotImplemented,
            CoreError::NetworkNotSupported(_) => CoreErrorCode::NetworkNotSupported,
            CoreError::CredentialUnavailable(_) => CoreErrorCode::CredentialUnavailable,
            CoreError::Cancelled => CoreErrorCode::Cancelled,
            CoreError::UserRejected => CoreErrorCode::UserRejected,
            CoreError::TransportTimeout => CoreErrorCode::TransportTimeout,
            CoreError::SigningFailed(_) => CoreErrorCode::SigningFailed,
            CoreError::Config(_) => CoreErrorCode::Config,
        }
    }

    pub fn invalid_private_key(msg: impl Into<String>) -> Self {
        Self::InvalidPrivateKey(msg.into())
    }

    pub fn invalid_public_key(msg: impl Into<String>) -> Self {
        Self::InvalidPublicKey(msg.into())
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    pub fn derivation(msg: impl Into<String>) -> Self {
        Self::DerivationError(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    pub fn network_not_supported(msg: impl Into<String>) -> Self {
        Self::NetworkNotSupported(msg.into())
    }

    pub fn credential_unavailable(msg: impl Into<String>) -> Self {
        Self::CredentialUnavailable(msg.into())
    }

    pub fn signing_failed(msg: impl Into<String>) -> Self {
        Self::SigningFailed(msg.into())
    }
}

// 从 serde_json 错误转换（载荷解析失败）
impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_payload(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CoreError::invalid_private_key("bad").code().as_str(),
            "invalid_private_key"
        );
        assert_eq!(CoreError::Cancelled.code(), CoreErrorCode::Cancelled);
        assert!(CoreErrorCode::DerivationError.is_validation());
        assert!(!CoreErrorCode::CredentialUnavailable.is_validation());
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::not_implemented("scdo signTransaction");
        assert_eq!(err.to_string(), "Not implemented: scdo signTransaction");
    }
}
