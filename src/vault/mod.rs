//! Vault：一个账户 + 一个密钥环 + 一个链 API
//!
//! 调用方的所有操作都经过 Vault。构造时校验账户网络已注册、
//! 曲线一致、密钥环类型匹配；之后把账户元数据（路径、版本）原样转发。

use std::sync::Arc;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::chains::{ChainApi, ChainApiRegistry};
use crate::crypto::{PrivateKeysMap, SeedMaterial};
use crate::domain::{
    Account, AddressRecord, HdDerivationQuery, KeyringKind, NetworkId, SignedMessage, SignedTx,
    UnsignedMessage, UnsignedTx,
};
use crate::error::{CoreError, CoreResult};
use crate::infrastructure::log_redact::SensitiveRedact;
use crate::keyring::{
    CredentialProvider, HardwareKeyring, HardwareTransport, HdKeyring, ImportedKeyring, Keyring,
    PrepareAccountsParams, SigningSettings, WatchingKeyring,
};

/// 账户存储（外部持久化）
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, account_id: &str) -> CoreResult<Option<Account>>;
}

pub struct Vault {
    account: Account,
    chain: Arc<dyn ChainApi>,
    keyring: Arc<dyn Keyring>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("account", &self.account.id)
            .field("network", &self.account.network_id)
            .field("keyring", &self.keyring.kind())
            .finish()
    }
}

impl Vault {
    pub fn new(
        account: Account,
        chain: Arc<dyn ChainApi>,
        keyring: Arc<dyn Keyring>,
    ) -> CoreResult<Self> {
        if chain.network_id() != &account.network_id {
            return Err(CoreError::network_not_supported(format!(
                "account {} is on {}, chain api serves {}",
                account.id,
                account.network_id,
                chain.network_id()
            )));
        }
        if keyring.kind() != account.keyring_kind {
            return Err(CoreError::unsupported(format!(
                "account {} is {}, keyring is {}",
                account.id,
                account.keyring_kind.as_str(),
                keyring.kind().as_str()
            )));
        }
        Ok(Self {
            account,
            chain,
            keyring,
        })
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn network_id(&self) -> &NetworkId {
        &self.account.network_id
    }

    fn account_version(&self) -> Option<&str> {
        self.account.account_version.as_deref()
    }

    pub fn validate_address(&self, address: &str) -> CoreResult<String> {
        self.chain.validate_address(address)
    }

    pub fn get_address_from_public(&self, public_key_hex: &str) -> CoreResult<AddressRecord> {
        self.chain
            .get_address_from_public(public_key_hex, self.account_version())
    }

    pub fn get_address_from_private(&self, private_key_hex: &str) -> CoreResult<AddressRecord> {
        self.chain
            .get_address_from_private(private_key_hex, self.account_version())
    }

    pub fn get_addresses_from_hd(
        &self,
        seed: &SeedMaterial,
        query: &HdDerivationQuery,
    ) -> CoreResult<Vec<AddressRecord>> {
        if query.network_id != self.account.network_id {
            return Err(CoreError::network_not_supported(format!(
                "query for {} sent to {} vault",
                query.network_id, self.account.network_id
            )));
        }
        self.chain
            .get_addresses_from_hd(seed, query, self.account_version())
    }

    pub async fn prepare_accounts(&self, params: &PrepareAccountsParams) -> CoreResult<Vec<Account>> {
        self.keyring.prepare_accounts(params).await
    }

    pub async fn get_private_keys(&self) -> CoreResult<PrivateKeysMap> {
        tracing::info!(
            "Private keys requested: network={}, account={}",
            self.account.network_id,
            self.account.id
        );
        self.keyring.get_private_keys(&self.account).await
    }

    pub async fn get_exported_secret_key(&self) -> CoreResult<Zeroizing<String>> {
        tracing::info!(
            "Secret key export requested: network={}, account={}",
            self.account.network_id,
            self.account.id
        );
        self.keyring.get_exported_secret_key(&self.account).await
    }

    pub async fn sign_transaction(&self, tx: &UnsignedTx) -> CoreResult<SignedTx> {
        tracing::info!(
            "Signing transaction: network={}, account={}, kind={}",
            self.account.network_id,
            self.account.id,
            tx.encoded_tx.kind()
        );
        let signed = self.keyring.sign_transaction(&self.account, tx).await?;
        tracing::info!(
            "Transaction signed: network={}, tx={}",
            self.account.network_id,
            signed.redact()
        );
        Ok(signed)
    }

    pub async fn sign_message(&self, message: &UnsignedMessage) -> CoreResult<SignedMessage> {
        tracing::info!(
            "Signing message: network={}, account={}",
            self.account.network_id,
            self.account.id
        );
        self.keyring.sign_message(&self.account, message).await
    }
}

/// 按账户组装 Vault
pub struct VaultFactory {
    registry: Arc<ChainApiRegistry>,
    accounts: Arc<dyn AccountStore>,
    credentials: Arc<dyn CredentialProvider>,
    hardware: Option<Arc<dyn HardwareTransport>>,
    settings: SigningSettings,
}

impl VaultFactory {
    pub fn new(
        registry: Arc<ChainApiRegistry>,
        accounts: Arc<dyn AccountStore>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            registry,
            accounts,
            credentials,
            hardware: None,
            settings: SigningSettings::default(),
        }
    }

    pub fn with_hardware(mut self, transport: Arc<dyn HardwareTransport>) -> Self {
        self.hardware = Some(transport);
        self
    }

    pub fn with_settings(mut self, settings: SigningSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &ChainApiRegistry {
        &self.registry
    }

    pub fn keyring_for(
        &self,
        kind: KeyringKind,
        network_id: &NetworkId,
    ) -> CoreResult<Arc<dyn Keyring>> {
        let chain = self.registry.get(network_id)?;
        let keyring: Arc<dyn Keyring> = match kind {
            KeyringKind::Imported => Arc::new(ImportedKeyring::new(
                chain,
                Arc::clone(&self.credentials),
                self.settings,
            )),
            KeyringKind::Hd => Arc::new(HdKeyring::new(
                chain,
                Arc::clone(&self.credentials),
                self.settings,
            )),
            KeyringKind::WatchOnly => Arc::new(WatchingKeyring::new(chain)),
            KeyringKind::Hardware => {
                let transport = self
                    .hardware
                    .as_ref()
                    .ok_or_else(|| CoreError::unsupported("no hardware transport configured"))?;
                Arc::new(HardwareKeyring::new(
                    chain,
                    Arc::clone(transport),
                    self.settings,
                ))
            }
        };
        Ok(keyring)
    }

    /// 为已有账户构建 Vault
    pub fn vault_for(&self, account: Account) -> CoreResult<Vault> {
        let chain = self.registry.get(&account.network_id)?;
        let keyring = self.keyring_for(account.keyring_kind, &account.network_id)?;
        Vault::new(account, chain, keyring)
    }

    /// 按账户ID从存储加载并构建 Vault
    pub async fn open(&self, account_id: &str) -> CoreResult<Vault> {
        let account = self
            .accounts
            .get_account(account_id)
            .await?
            .ok_or_else(|| CoreError::invalid_payload(format!("unknown account: {}", account_id)))?;
        tracing::debug!("Opening vault: {}", account.redact());
        self.vault_for(account)
    }

    pub async fn prepare_accounts(
        &self,
        kind: KeyringKind,
        network_id: &NetworkId,
        params: &PrepareAccountsParams,
    ) -> CoreResult<Vec<Account>> {
        self.keyring_for(kind, network_id)?
            .prepare_accounts(params)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::evm::EvmChainApi;

    fn watch_account(network: &str) -> Account {
        Account {
            id: "watching--evm--1--0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".into(),
            network_id: network.parse().unwrap(),
            keyring_kind: KeyringKind::WatchOnly,
            path: String::new(),
            address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".into(),
            public_key: String::new(),
            credential_id: None,
            account_version: None,
            device_id: None,
        }
    }

    #[test]
    fn test_vault_rejects_network_mismatch() {
        let chain: Arc<dyn ChainApi> = Arc::new(EvmChainApi::new("evm--1".parse().unwrap()));
        let keyring: Arc<dyn Keyring> = Arc::new(WatchingKeyring::new(Arc::clone(&chain)));
        let err = Vault::new(watch_account("evm--56"), chain, keyring).unwrap_err();
        assert!(matches!(err, CoreError::NetworkNotSupported(_)));
    }

    #[test]
    fn test_vault_rejects_keyring_kind_mismatch() {
        let chain: Arc<dyn ChainApi> = Arc::new(EvmChainApi::new("evm--1".parse().unwrap()));
        let keyring: Arc<dyn Keyring> = Arc::new(WatchingKeyring::new(Arc::clone(&chain)));
        let mut account = watch_account("evm--1");
        account.keyring_kind = KeyringKind::Imported;
        let err = Vault::new(account, chain, keyring).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_vault_forwards_address_queries() {
        let chain: Arc<dyn ChainApi> = Arc::new(EvmChainApi::new("evm--1".parse().unwrap()));
        let keyring: Arc<dyn Keyring> = Arc::new(WatchingKeyring::new(Arc::clone(&chain)));
        let vault = Vault::new(watch_account("evm--1"), chain, keyring).unwrap();
        let record = vault
            .get_address_from_private(
                "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            )
            .unwrap();
        assert_eq!(record.address, vault.account().address);
        assert!(vault.validate_address("0x1234").is_err());
    }
}
