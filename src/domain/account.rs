//! 账户领域模型
//!
//! 账户只包含公开信息；核心只读，持久化由外部 AccountStore 负责

use serde::{Deserialize, Serialize};

use crate::domain::network::NetworkId;
use crate::error::{CoreError, CoreResult};

const ID_SEPARATOR: &str = "--";

/// 密钥环类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyringKind {
    /// 导入的单私钥
    Imported,
    /// 助记词 HD 派生
    Hd,
    /// 观察账户（无私钥）
    WatchOnly,
    /// 硬件钱包
    Hardware,
}

impl KeyringKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyringKind::Imported => "imported",
            KeyringKind::Hd => "hd",
            KeyringKind::WatchOnly => "watching",
            KeyringKind::Hardware => "hw",
        }
    }

    /// 是否由软件持有私钥
    pub fn holds_secrets(&self) -> bool {
        matches!(self, KeyringKind::Imported | KeyringKind::Hd)
    }
}

/// 账户（公开信息）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub network_id: NetworkId,
    pub keyring_kind: KeyringKind,
    /// HD / 硬件账户的派生路径；导入和观察账户为空串
    #[serde(default)]
    pub path: String,
    pub address: String,
    pub public_key: String,
    /// 凭证ID（导入私钥或助记词）
    #[serde(default)]
    pub credential_id: Option<String>,
    /// 钱包合约版本（例如 TON 的 v4r2）
    #[serde(default)]
    pub account_version: Option<String>,
    /// 硬件设备ID
    #[serde(default)]
    pub device_id: Option<String>,
}

impl Account {
    /// 生成账户ID: `<kind>--<owner>--<path|address>[--<version>]`
    pub fn make_id(
        kind: KeyringKind,
        owner: &str,
        locator: &str,
        account_version: Option<&str>,
    ) -> String {
        let mut id = format!(
            "{}{sep}{}{sep}{}",
            kind.as_str(),
            owner,
            locator,
            sep = ID_SEPARATOR
        );
        if let Some(version) = account_version {
            id.push_str(ID_SEPARATOR);
            id.push_str(version);
        }
        id
    }

    pub fn credential_id(&self) -> CoreResult<&str> {
        self.credential_id.as_deref().ok_or_else(|| {
            CoreError::credential_unavailable(format!("account {} has no credential", self.id))
        })
    }

    pub fn device_id(&self) -> CoreResult<&str> {
        self.device_id
            .as_deref()
            .ok_or_else(|| CoreError::unsupported(format!("account {} has no device", self.id)))
    }
}
