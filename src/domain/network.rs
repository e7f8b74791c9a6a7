//! 网络标识与链实现族
//!
//! NetworkId 形如 `<impl>--<chainId>`，前缀决定链实现族

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::CurveName;
use crate::error::{CoreError, CoreResult};

const SEPARATOR: &str = "--";

/// 链实现族（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainImpl {
    Evm,
    Btc,
    Sol,
    Ton,
    Scdo,
    Ada,
}

impl ChainImpl {
    pub const ALL: [ChainImpl; 6] = [
        ChainImpl::Evm,
        ChainImpl::Btc,
        ChainImpl::Sol,
        ChainImpl::Ton,
        ChainImpl::Scdo,
        ChainImpl::Ada,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainImpl::Evm => "evm",
            ChainImpl::Btc => "btc",
            ChainImpl::Sol => "sol",
            ChainImpl::Ton => "ton",
            ChainImpl::Scdo => "scdo",
            ChainImpl::Ada => "ada",
        }
    }

    /// 每个实现族固定一条曲线
    pub fn curve(&self) -> CurveName {
        match self {
            ChainImpl::Evm | ChainImpl::Btc | ChainImpl::Scdo => CurveName::Secp256k1,
            ChainImpl::Sol | ChainImpl::Ton | ChainImpl::Ada => CurveName::Ed25519,
        }
    }

    /// SLIP-44 coin type
    pub fn coin_type(&self) -> u32 {
        match self {
            ChainImpl::Evm => 60,
            ChainImpl::Btc => 0,
            ChainImpl::Sol => 501,
            ChainImpl::Ton => 607,
            ChainImpl::Scdo => 541,
            ChainImpl::Ada => 1815,
        }
    }

    /// 默认 HD 路径模板（ed25519 链全部硬化）
    pub fn default_path_template(&self) -> &'static str {
        match self {
            ChainImpl::Evm => "m/44'/60'/0'/0/$$INDEX$$",
            ChainImpl::Btc => "m/84'/0'/0'/0/$$INDEX$$",
            ChainImpl::Sol => "m/44'/501'/$$INDEX$$'/0'",
            ChainImpl::Ton => "m/44'/607'/$$INDEX$$'",
            ChainImpl::Scdo => "m/44'/541'/0'/0/$$INDEX$$",
            ChainImpl::Ada => "m/1852'/1815'/$$INDEX$$'",
        }
    }
}

impl fmt::Display for ChainImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainImpl {
    type Err = CoreError;

    fn from_str(value: &str) -> CoreResult<Self> {
        ChainImpl::ALL
            .iter()
            .copied()
            .find(|imp| imp.as_str() == value)
            .ok_or_else(|| CoreError::network_not_supported(format!("unknown chain impl: {}", value)))
    }
}

/// 网络标识（不可变查找键）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkId {
    raw: String,
    chain_impl: ChainImpl,
}

impl NetworkId {
    pub fn new(chain_impl: ChainImpl, chain_id: &str) -> Self {
        Self {
            raw: format!("{}{}{}", chain_impl.as_str(), SEPARATOR, chain_id),
            chain_impl,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn chain_impl(&self) -> ChainImpl {
        self.chain_impl
    }

    /// `--` 之后的链内 ID
    pub fn chain_id(&self) -> &str {
        self.raw
            .split_once(SEPARATOR)
            .map(|(_, id)| id)
            .unwrap_or_default()
    }

    pub fn curve(&self) -> CurveName {
        self.chain_impl.curve()
    }
}

impl FromStr for NetworkId {
    type Err = CoreError;

    fn from_str(value: &str) -> CoreResult<Self> {
        let (prefix, chain_id) = value
            .split_once(SEPARATOR)
            .ok_or_else(|| CoreError::network_not_supported(format!("malformed network id: {}", value)))?;
        if chain_id.is_empty() || chain_id.contains(SEPARATOR) {
            return Err(CoreError::network_not_supported(format!(
                "malformed network id: {}",
                value
            )));
        }
        let chain_impl: ChainImpl = prefix.parse()?;
        Ok(Self::new(chain_impl, chain_id))
    }
}

impl TryFrom<String> for NetworkId {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        value.parse()
    }
}

impl From<NetworkId> for String {
    fn from(id: NetworkId) -> Self {
        id.raw
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
