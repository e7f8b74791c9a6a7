//! 测试辅助模块
//! 提供可观测的凭证提供方与硬件传输层替身

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ironkeys::chains::ChainApiRegistry;
use ironkeys::crypto::{
    derive_key_pair, CurveName, PrivateKeyMaterial, PrivateKeysMap, SeedMaterial,
};
use ironkeys::domain::{
    Account, CredentialQuery, DerivationPath, NetworkId, SignedMessage, SignedTx,
    UnsignedMessage, UnsignedTx,
};
use ironkeys::infrastructure::{InMemoryAccountStore, InMemoryCredentialStore};
use ironkeys::keyring::{
    CredentialError, CredentialProvider, HardwareError, HardwareSession, HardwareTransport,
    SigningSettings,
};
use ironkeys::vault::VaultFactory;

pub const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub const HARDHAT_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// 记录调用次数的凭证提供方
pub struct RecordingProvider {
    pub inner: InMemoryCredentialStore,
    calls: AtomicUsize,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self {
            inner: InMemoryCredentialStore::with_iterations("test-password", 1_000),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialProvider for RecordingProvider {
    async fn get_default_private_key(
        &self,
        query: &CredentialQuery,
    ) -> Result<PrivateKeyMaterial, CredentialError> {
        self.record();
        self.inner.get_default_private_key(query).await
    }

    async fn get_private_keys_map(
        &self,
        query: &CredentialQuery,
        curve: CurveName,
    ) -> Result<PrivateKeysMap, CredentialError> {
        self.record();
        self.inner.get_private_keys_map(query, curve).await
    }

    async fn get_hd_seed(&self, query: &CredentialQuery) -> Result<SeedMaterial, CredentialError> {
        self.record();
        self.inner.get_hd_seed(query).await
    }
}

/// 行为固定的凭证提供方
pub enum ScriptedProvider {
    Reject,
    Cancel,
    Hang,
}

impl ScriptedProvider {
    async fn respond<T>(&self) -> Result<T, CredentialError> {
        match self {
            ScriptedProvider::Reject => Err(CredentialError::Rejected("wrong password".into())),
            ScriptedProvider::Cancel => Err(CredentialError::Cancelled),
            ScriptedProvider::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(CredentialError::Backend("unreachable".into()))
            }
        }
    }
}

#[async_trait]
impl CredentialProvider for ScriptedProvider {
    async fn get_default_private_key(
        &self,
        _query: &CredentialQuery,
    ) -> Result<PrivateKeyMaterial, CredentialError> {
        self.respond().await
    }

    async fn get_private_keys_map(
        &self,
        _query: &CredentialQuery,
        _curve: CurveName,
    ) -> Result<PrivateKeysMap, CredentialError> {
        self.respond().await
    }

    async fn get_hd_seed(&self, _query: &CredentialQuery) -> Result<SeedMaterial, CredentialError> {
        self.respond().await
    }
}

/// 先取出私钥、再拒绝签名的凭证提供方；私钥释放时计数
pub struct LateRejectProvider {
    released: Arc<AtomicUsize>,
}

/// 随私钥一同释放的观察者
struct ReleaseObserver {
    key: PrivateKeyMaterial,
    released: Arc<AtomicUsize>,
}

impl Drop for ReleaseObserver {
    fn drop(&mut self) {
        assert!(!self.key.is_empty());
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl LateRejectProvider {
    pub fn new() -> Self {
        Self {
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn load_then_reject<T>(&self) -> Result<T, CredentialError> {
        let key = PrivateKeyMaterial::from_hex(HARDHAT_KEY, CurveName::Secp256k1)
            .map_err(|e| CredentialError::Backend(e.to_string()))?;
        let observer = ReleaseObserver {
            key,
            released: self.released.clone(),
        };
        drop(observer);
        Err(CredentialError::Rejected("user declined after unlock".into()))
    }
}

#[async_trait]
impl CredentialProvider for LateRejectProvider {
    async fn get_default_private_key(
        &self,
        _query: &CredentialQuery,
    ) -> Result<PrivateKeyMaterial, CredentialError> {
        self.load_then_reject()
    }

    async fn get_private_keys_map(
        &self,
        _query: &CredentialQuery,
        _curve: CurveName,
    ) -> Result<PrivateKeysMap, CredentialError> {
        self.load_then_reject()
    }

    async fn get_hd_seed(&self, _query: &CredentialQuery) -> Result<SeedMaterial, CredentialError> {
        self.load_then_reject()
    }
}

/// 硬件设备行为
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceBehavior {
    Approve,
    Reject,
    Hang,
}

/// 模拟硬件设备：公钥由测试助记词派生，签名请求按行为响应
pub struct MockTransport {
    behavior: DeviceBehavior,
    seed: SeedMaterial,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub last_tx: Mutex<Option<UnsignedTx>>,
}

impl MockTransport {
    pub fn new(behavior: DeviceBehavior) -> Self {
        Self {
            behavior,
            seed: SeedMaterial::from_mnemonic(MNEMONIC, "").unwrap(),
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            last_tx: Mutex::new(None),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    async fn confirm(&self) -> Result<(), HardwareError> {
        match self.behavior {
            DeviceBehavior::Approve => Ok(()),
            DeviceBehavior::Reject => Err(HardwareError::UserRejected),
            DeviceBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(HardwareError::Timeout)
            }
        }
    }
}

#[async_trait]
impl HardwareTransport for MockTransport {
    async fn open_session(&self, device_id: &str) -> Result<HardwareSession, HardwareError> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(HardwareSession {
            id: format!("session-{}", n),
            device_id: device_id.to_string(),
        })
    }

    async fn get_public_keys(
        &self,
        _session: &HardwareSession,
        network_id: &NetworkId,
        paths: &[String],
    ) -> Result<Vec<String>, HardwareError> {
        paths
            .iter()
            .map(|p| {
                let path: DerivationPath =
                    p.parse().map_err(|_| HardwareError::Device("bad path".into()))?;
                let pair = derive_key_pair(&self.seed, &path, network_id.curve())
                    .map_err(|e| HardwareError::Device(e.to_string()))?;
                Ok(hex::encode(pair.public_key))
            })
            .collect()
    }

    async fn sign_transaction(
        &self,
        _session: &HardwareSession,
        _account: &Account,
        tx: &UnsignedTx,
    ) -> Result<SignedTx, HardwareError> {
        *self.last_tx.lock().unwrap() = Some(tx.clone());
        self.confirm().await?;
        Ok(SignedTx {
            txid: "device-txid".into(),
            raw_tx: tx.raw_tx_unsigned.clone().unwrap_or_default(),
            signature: None,
            encoded_tx: Some(tx.encoded_tx.clone()),
        })
    }

    async fn sign_message(
        &self,
        _session: &HardwareSession,
        _account: &Account,
        _message: &UnsignedMessage,
    ) -> Result<SignedMessage, HardwareError> {
        self.confirm().await?;
        Ok("device-signature".into())
    }

    async fn close_session(&self, _session: &HardwareSession) -> Result<(), HardwareError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn fast_settings() -> SigningSettings {
    SigningSettings {
        credential_timeout: Duration::from_millis(200),
        hardware_timeout: Duration::from_millis(200),
    }
}

/// 默认网络 + 内存账户存储 + 给定凭证提供方
pub fn factory_with(
    credentials: Arc<dyn CredentialProvider>,
    accounts: Arc<InMemoryAccountStore>,
) -> VaultFactory {
    let registry = Arc::new(ChainApiRegistry::with_defaults().unwrap());
    VaultFactory::new(registry, accounts, credentials).with_settings(fast_settings())
}
