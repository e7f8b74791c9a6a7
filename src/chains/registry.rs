//! 链 API 注册表
//!
//! 启动时构建一次，之后只读；同一 NetworkId 重复注册直接报错

use std::collections::HashMap;
use std::sync::Arc;

use crate::chains::ada::AdaChainApi;
use crate::chains::btc::BtcChainApi;
use crate::chains::evm::EvmChainApi;
use crate::chains::scdo::ScdoChainApi;
use crate::chains::sol::SolChainApi;
use crate::chains::ton::TonChainApi;
use crate::chains::ChainApi;
use crate::domain::{ChainImpl, NetworkId};
use crate::error::{CoreError, CoreResult};

/// 默认启用的网络
pub const DEFAULT_NETWORKS: &[&str] = &[
    "evm--1",
    "evm--56",
    "evm--137",
    "btc--0",
    "sol--101",
    "ton--mainnet",
    "scdo--main",
    "ada--0",
];

/// 按实现族创建链 API
pub fn create_chain_api(network_id: NetworkId) -> CoreResult<Arc<dyn ChainApi>> {
    let api: Arc<dyn ChainApi> = match network_id.chain_impl() {
        ChainImpl::Evm => Arc::new(EvmChainApi::new(network_id)),
        ChainImpl::Btc => Arc::new(BtcChainApi::new(network_id)?),
        ChainImpl::Sol => Arc::new(SolChainApi::new(network_id)),
        ChainImpl::Ton => Arc::new(TonChainApi::new(network_id)),
        ChainImpl::Scdo => Arc::new(ScdoChainApi::new(network_id)),
        ChainImpl::Ada => Arc::new(AdaChainApi::new(network_id)),
    };
    Ok(api)
}

/// 不可变注册表
pub struct ChainApiRegistry {
    apis: HashMap<NetworkId, Arc<dyn ChainApi>>,
}

impl ChainApiRegistry {
    pub fn builder() -> ChainApiRegistryBuilder {
        ChainApiRegistryBuilder::default()
    }

    /// 注册给定网络列表
    pub fn from_network_ids<S: AsRef<str>>(network_ids: &[S]) -> CoreResult<Self> {
        let mut builder = Self::builder();
        for id in network_ids {
            let network_id: NetworkId = id.as_ref().parse()?;
            builder = builder.register(create_chain_api(network_id)?)?;
        }
        Ok(builder.build())
    }

    pub fn with_defaults() -> CoreResult<Self> {
        Self::from_network_ids(DEFAULT_NETWORKS)
    }

    pub fn get(&self, network_id: &NetworkId) -> CoreResult<Arc<dyn ChainApi>> {
        self.apis
            .get(network_id)
            .cloned()
            .ok_or_else(|| CoreError::network_not_supported(network_id.to_string()))
    }

    pub fn contains(&self, network_id: &NetworkId) -> bool {
        self.apis.contains_key(network_id)
    }

    /// 已注册网络（排序后）
    pub fn network_ids(&self) -> Vec<&NetworkId> {
        let mut ids: Vec<&NetworkId> = self.apis.keys().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn len(&self) -> usize {
        self.apis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }
}

#[derive(Default)]
pub struct ChainApiRegistryBuilder {
    apis: HashMap<NetworkId, Arc<dyn ChainApi>>,
}

impl ChainApiRegistryBuilder {
    pub fn register(mut self, api: Arc<dyn ChainApi>) -> CoreResult<Self> {
        let network_id = api.network_id().clone();
        if self.apis.contains_key(&network_id) {
            return Err(CoreError::Config(format!(
                "chain api already registered for {}",
                network_id
            )));
        }
        self.apis.insert(network_id, api);
        Ok(self)
    }

    pub fn build(self) -> ChainApiRegistry {
        tracing::debug!(networks = self.apis.len(), "chain api registry built");
        ChainApiRegistry { apis: self.apis }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_impl() {
        let registry = ChainApiRegistry::with_defaults().unwrap();
        assert_eq!(registry.len(), DEFAULT_NETWORKS.len());
        for imp in ChainImpl::ALL {
            assert!(registry
                .network_ids()
                .iter()
                .any(|id| id.chain_impl() == imp));
        }
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let id: NetworkId = "evm--1".parse().unwrap();
        let result = ChainApiRegistry::builder()
            .register(create_chain_api(id.clone()).unwrap())
            .unwrap()
            .register(create_chain_api(id).unwrap());
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_lookup_of_unknown_network() {
        let registry = ChainApiRegistry::from_network_ids(&["evm--1"]).unwrap();
        let missing: NetworkId = "evm--10".parse().unwrap();
        assert!(matches!(
            registry.get(&missing).err().unwrap(),
            CoreError::NetworkNotSupported(_)
        ));
        assert!(registry.get(&"evm--1".parse().unwrap()).is_ok());
    }

    #[test]
    fn test_unknown_bitcoin_network_fails() {
        assert!(create_chain_api("btc--99".parse().unwrap()).is_err());
    }
}
