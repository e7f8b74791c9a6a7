//! 密钥环
//!
//! 按凭证来源（导入私钥 / HD / 观察 / 硬件）解析密钥材料。
//! 软件密钥环的私钥只存在于一次作用域获取之内（见 [`scoped`]）。

pub mod credential;
pub mod hardware;
pub mod hd;
pub mod imported;
pub mod scoped;
pub mod watching;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::PrivateKeysMap;
use crate::domain::{Account, KeyringKind, SignedMessage, SignedTx, UnsignedMessage, UnsignedTx};
use crate::error::CoreResult;

pub use credential::{CredentialError, CredentialProvider};
pub use hardware::{HardwareError, HardwareKeyring, HardwareSession, HardwareTransport};
pub use hd::HdKeyring;
pub use imported::ImportedKeyring;
pub use watching::WatchingKeyring;

/// 签名相关超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningSettings {
    pub credential_timeout: Duration,
    pub hardware_timeout: Duration,
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            credential_timeout: Duration::from_secs(30),
            hardware_timeout: Duration::from_secs(120),
        }
    }
}

/// 账户准备参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareAccountsParams {
    #[serde(default)]
    pub credential_id: Option<String>,
    /// HD / 硬件账户索引
    #[serde(default)]
    pub indexes: Vec<u32>,
    /// 路径模板，缺省使用链的默认模板
    #[serde(default)]
    pub template: Option<String>,
    /// 观察账户地址
    #[serde(default)]
    pub address: Option<String>,
    /// 观察账户公钥
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub account_version: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

impl PrepareAccountsParams {
    pub fn imported(credential_id: impl Into<String>) -> Self {
        Self {
            credential_id: Some(credential_id.into()),
            ..Default::default()
        }
    }

    pub fn hd(credential_id: impl Into<String>, indexes: Vec<u32>) -> Self {
        Self {
            credential_id: Some(credential_id.into()),
            indexes,
            ..Default::default()
        }
    }

    pub fn watching_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }

    pub fn watching_public_key(public_key: impl Into<String>) -> Self {
        Self {
            public_key: Some(public_key.into()),
            ..Default::default()
        }
    }

    pub fn hardware(device_id: impl Into<String>, indexes: Vec<u32>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            indexes,
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.account_version = Some(version.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }
}

/// 密钥环契约
#[async_trait]
pub trait Keyring: Send + Sync {
    fn kind(&self) -> KeyringKind;

    async fn prepare_accounts(&self, params: &PrepareAccountsParams) -> CoreResult<Vec<Account>>;

    async fn get_private_keys(&self, account: &Account) -> CoreResult<PrivateKeysMap>;

    async fn get_exported_secret_key(&self, account: &Account) -> CoreResult<Zeroizing<String>>;

    async fn sign_transaction(&self, account: &Account, tx: &UnsignedTx) -> CoreResult<SignedTx>;

    async fn sign_message(
        &self,
        account: &Account,
        message: &UnsignedMessage,
    ) -> CoreResult<SignedMessage>;
}
