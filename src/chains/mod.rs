//! 链 API 能力契约
//!
//! 每个网络实现必须满足 [`ChainApi`]。地址派生与签名是纯同步计算，
//! 只有凭证获取是异步的。签名方法只接收已获取的私钥映射，
//! 获取作用域由密钥环负责。

pub mod ada;
pub mod btc;
pub mod evm;
pub mod registry;
pub mod scdo;
pub mod sol;
pub mod ton;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::crypto::{
    curve_for, derive_key_pair, CurveName, PrivateKeyMaterial, PrivateKeysMap, SeedMaterial,
};
use crate::domain::derivation_path::parse_all;
use crate::domain::{
    Account, AddressRecord, CredentialQuery, HdDerivationQuery, NetworkId, SignedTx,
    UnsignedMessage, UnsignedTx,
};
use crate::error::{CoreError, CoreResult};
use crate::keyring::credential::CredentialProvider;
use crate::utils::hex_utils::decode_hex;

pub use registry::{ChainApiRegistry, ChainApiRegistryBuilder};

/// 链 API
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// 本实现注册的网络
    fn network_id(&self) -> &NetworkId;

    /// 链曲线（由实现族固定）
    fn curve(&self) -> CurveName {
        self.network_id().curve()
    }

    /// 公钥 -> 地址（纯函数）
    fn get_address_from_public(
        &self,
        public_key_hex: &str,
        account_version: Option<&str>,
    ) -> CoreResult<AddressRecord>;

    /// 校验地址，返回规范化形式
    fn validate_address(&self, address: &str) -> CoreResult<String>;

    /// 私钥 -> 地址
    fn get_address_from_private(
        &self,
        private_key_hex: &str,
        account_version: Option<&str>,
    ) -> CoreResult<AddressRecord> {
        let private_key = PrivateKeyMaterial::from_hex(private_key_hex, self.curve())?;
        let public_key = curve_for(self.curve()).public_from_private(&private_key)?;
        drop(private_key);
        self.get_address_from_public(&hex::encode(public_key), account_version)
    }

    /// 从种子批量派生地址
    ///
    /// 所有路径先整体校验，任一不合法则整批失败且不做任何派生
    fn get_addresses_from_hd(
        &self,
        seed: &SeedMaterial,
        query: &HdDerivationQuery,
        account_version: Option<&str>,
    ) -> CoreResult<Vec<AddressRecord>> {
        if query.curve != self.curve() {
            return Err(CoreError::derivation(format!(
                "curve {} does not match {} ({})",
                query.curve,
                self.network_id(),
                self.curve()
            )));
        }
        let paths = parse_all(&query.paths)?;

        paths
            .iter()
            .map(|path| {
                let pair = derive_key_pair(seed, path, self.curve())?;
                let mut record =
                    self.get_address_from_public(&hex::encode(&pair.public_key), account_version)?;
                record.path = Some(path.to_string());
                Ok(record)
            })
            .collect()
    }

    /// 委托凭证提供方获取私钥，并按链曲线校验长度
    async fn get_private_keys(
        &self,
        provider: &dyn CredentialProvider,
        query: &CredentialQuery,
    ) -> CoreResult<PrivateKeysMap> {
        let keys = provider.get_private_keys_map(query, self.curve()).await?;
        for key in keys.values() {
            key.ensure_curve(self.curve())?;
        }
        Ok(keys)
    }

    /// 导出私钥的外部表示（调用方负责授权）
    async fn get_exported_secret_key(
        &self,
        provider: &dyn CredentialProvider,
        query: &CredentialQuery,
    ) -> CoreResult<Zeroizing<String>> {
        let keys = self.get_private_keys(provider, query).await?;
        let key = query
            .paths
            .first()
            .and_then(|path| keys.get(path))
            .or_else(|| single_key(&keys))
            .ok_or_else(|| {
                CoreError::credential_unavailable(format!(
                    "no key returned for credential {}",
                    query.credential_id
                ))
            })?;
        self.export_private_key(key)
    }

    /// 私钥的规范外部编码（默认 hex）
    fn export_private_key(&self, private_key: &PrivateKeyMaterial) -> CoreResult<Zeroizing<String>> {
        private_key.ensure_curve(self.curve())?;
        Ok(private_key.to_hex())
    }

    /// 预签名钩子：返回新的未签名交易，不修改输入
    fn prepare_unsigned_tx(&self, tx: &UnsignedTx, _account: &Account) -> CoreResult<UnsignedTx> {
        Ok(tx.clone())
    }

    fn sign_transaction(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        tx: &UnsignedTx,
    ) -> CoreResult<SignedTx>;

    fn sign_message(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        message: &UnsignedMessage,
    ) -> CoreResult<String>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 各实现共用的辅助函数
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn single_key(keys: &PrivateKeysMap) -> Option<&PrivateKeyMaterial> {
    if keys.len() == 1 {
        keys.values().next()
    } else {
        None
    }
}

/// 取账户对应的私钥：先按路径查找，导入账户只有一个私钥时直接使用
pub(crate) fn key_for_account<'a>(
    keys: &'a PrivateKeysMap,
    account: &Account,
) -> CoreResult<&'a PrivateKeyMaterial> {
    keys.get(&account.path)
        .or_else(|| single_key(keys))
        .ok_or_else(|| {
            CoreError::credential_unavailable(format!("no private key for account {}", account.id))
        })
}

/// 解码 hex 公钥
pub(crate) fn decode_public_key(public_key_hex: &str) -> CoreResult<Vec<u8>> {
    decode_hex(public_key_hex)
        .ok_or_else(|| CoreError::invalid_public_key(format!("not hex: {}", public_key_hex)))
}

/// 私钥推导出的公钥必须与账户记录一致
pub(crate) fn ensure_key_matches_account(
    curve: CurveName,
    private_key: &PrivateKeyMaterial,
    account: &Account,
) -> CoreResult<Vec<u8>> {
    let public_key = curve_for(curve).public_from_private(private_key)?;
    let expected = decode_public_key(&account.public_key)?;
    let normalized = curve_for(curve)
        .transform_public_key(&expected, crate::crypto::PublicKeyForm::Compressed)?;
    if normalized != public_key {
        return Err(CoreError::invalid_private_key(format!(
            "private key does not belong to account {}",
            account.id
        )));
    }
    Ok(public_key)
}

/// 交易 from 地址必须是账户地址
pub(crate) fn ensure_from_address(
    chain: &dyn ChainApi,
    from: &str,
    account: &Account,
) -> CoreResult<()> {
    let from = chain.validate_address(from)?;
    let own = chain.validate_address(&account.address)?;
    if from != own {
        return Err(CoreError::invalid_payload(format!(
            "from address {} does not match account {}",
            from, account.address
        )));
    }
    Ok(())
}

/// 32 字节哈希消息
pub(crate) fn decode_hash_message(message: &UnsignedMessage) -> CoreResult<[u8; 32]> {
    let bytes = decode_hex(&message.message)
        .ok_or_else(|| CoreError::invalid_payload("hash message must be hex"))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CoreError::invalid_payload(format!("hash must be 32 bytes, got {}", bytes.len())))
}

pub(crate) fn message_bytes(message: &UnsignedMessage) -> CoreResult<Vec<u8>> {
    message
        .bytes()
        .ok_or_else(|| CoreError::invalid_payload("message is not valid hex"))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryCredentialStore;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_export_falls_back_to_single_imported_key() {
        let store = InMemoryCredentialStore::with_iterations("pw", 1_000);
        let credential_id = store.import_private_key(KEY).await.unwrap();
        let chain = evm::EvmChainApi::new("evm--1".parse().unwrap());

        // 导入凭证的私钥存于空路径下，查询路径不命中时仍应导出
        let query = CredentialQuery {
            credential_id,
            network_id: chain.network_id().clone(),
            paths: vec!["m/44'/60'/0'/0/0".to_string()],
        };
        let exported = chain.get_exported_secret_key(&store, &query).await.unwrap();
        assert_eq!(exported.as_str(), KEY);
    }
}
