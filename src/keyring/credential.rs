//! 凭证提供方契约
//!
//! 核心从不持久化、也不解密凭证；解密由实现方负责

use async_trait::async_trait;
use thiserror::Error;

use crate::crypto::{CurveName, PrivateKeyMaterial, PrivateKeysMap, SeedMaterial};
use crate::domain::CredentialQuery;
use crate::error::CoreError;

/// 凭证提供方错误
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential not found: {0}")]
    NotFound(String),

    #[error("credential rejected: {0}")]
    Rejected(String),

    #[error("credential store locked")]
    Locked,

    #[error("credential request cancelled")]
    Cancelled,

    #[error("credential backend error: {0}")]
    Backend(String),

    /// 路径无法解析或派生失败
    #[error("credential derivation failed: {0}")]
    Derivation(String),
}

impl From<CredentialError> for CoreError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Cancelled => CoreError::Cancelled,
            CredentialError::Derivation(msg) => CoreError::derivation(msg),
            other => CoreError::credential_unavailable(other.to_string()),
        }
    }
}

/// 凭证提供方
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// 导入凭证的默认私钥
    async fn get_default_private_key(
        &self,
        query: &CredentialQuery,
    ) -> Result<PrivateKeyMaterial, CredentialError>;

    /// 按路径返回私钥（HD 凭证逐路径派生，导入凭证返回单个）
    async fn get_private_keys_map(
        &self,
        query: &CredentialQuery,
        curve: CurveName,
    ) -> Result<PrivateKeysMap, CredentialError>;

    /// HD 种子
    async fn get_hd_seed(&self, query: &CredentialQuery) -> Result<SeedMaterial, CredentialError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreErrorCode;

    #[test]
    fn test_error_mapping() {
        let err: CoreError = CredentialError::Cancelled.into();
        assert_eq!(err.code(), CoreErrorCode::Cancelled);

        let err: CoreError = CredentialError::Rejected("wrong password".into()).into();
        assert_eq!(err.code(), CoreErrorCode::CredentialUnavailable);

        let err: CoreError = CredentialError::Locked.into();
        assert_eq!(err.code(), CoreErrorCode::CredentialUnavailable);

        let err: CoreError = CredentialError::Derivation("bad path".into()).into();
        assert_eq!(err.code(), CoreErrorCode::DerivationError);
    }
}
