//! ironkeys - 多链钱包账户与签名核心
//!
//! 非托管模式：核心不持久化私钥或助记词，秘密材料只在单次操作内存在

pub mod chains;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod error_map;
pub mod infrastructure;
pub mod keyring;
pub mod utils;
pub mod vault;

// 重新导出常用类型
pub use error::{CoreError, CoreErrorCode, CoreResult};

// 统一模块导出
pub mod prelude {
    pub use crate::{
        chains::{ChainApi, ChainApiRegistry},
        domain::{
            Account, AddressRecord, EncodedTx, KeyringKind, NetworkId, SignedTx, UnsignedMessage,
            UnsignedTx,
        },
        error::{CoreError, CoreErrorCode, CoreResult},
        keyring::{CredentialProvider, Keyring, PrepareAccountsParams, SigningSettings},
        vault::{AccountStore, Vault, VaultFactory},
    };
}
