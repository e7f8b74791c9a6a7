//! 硬件钱包密钥环
//!
//! 私钥永不离开设备。每次操作打开一个会话，结束时无论成功、失败
//! 还是被取消都关闭会话。设备错误不重试。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::chains::ChainApi;
use crate::crypto::PrivateKeysMap;
use crate::domain::{
    Account, KeyringKind, NetworkId, PathTemplate, SignedMessage, SignedTx, UnsignedMessage,
    UnsignedTx,
};
use crate::error::{CoreError, CoreResult};
use crate::infrastructure::log_redact::scrub_secrets;
use crate::keyring::{Keyring, PrepareAccountsParams, SigningSettings};

/// 设备会话
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareSession {
    pub id: String,
    pub device_id: String,
}

/// 传输层错误
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("rejected on device")]
    UserRejected,

    #[error("transport timed out")]
    Timeout,

    #[error("device disconnected: {0}")]
    Disconnected(String),

    #[error("device error: {0}")]
    Device(String),
}

impl From<HardwareError> for CoreError {
    fn from(err: HardwareError) -> Self {
        match err {
            HardwareError::UserRejected => CoreError::UserRejected,
            HardwareError::Timeout | HardwareError::Disconnected(_) => CoreError::TransportTimeout,
            HardwareError::Device(msg) => CoreError::signing_failed(format!("device: {}", msg)),
        }
    }
}

/// 硬件传输层
#[async_trait]
pub trait HardwareTransport: Send + Sync {
    async fn open_session(&self, device_id: &str) -> Result<HardwareSession, HardwareError>;

    /// 按路径返回 hex 公钥，顺序与 `paths` 一致
    async fn get_public_keys(
        &self,
        session: &HardwareSession,
        network_id: &NetworkId,
        paths: &[String],
    ) -> Result<Vec<String>, HardwareError>;

    /// 设备接收的是已经过预签名钩子的未签名交易
    async fn sign_transaction(
        &self,
        session: &HardwareSession,
        account: &Account,
        tx: &UnsignedTx,
    ) -> Result<SignedTx, HardwareError>;

    async fn sign_message(
        &self,
        session: &HardwareSession,
        account: &Account,
        message: &UnsignedMessage,
    ) -> Result<SignedMessage, HardwareError>;

    async fn close_session(&self, session: &HardwareSession) -> Result<(), HardwareError>;
}

/// 会话守卫：正常路径显式关闭；future 被丢弃时在运行时上补发关闭
struct SessionGuard {
    transport: Arc<dyn HardwareTransport>,
    session: HardwareSession,
    closed: bool,
}

impl SessionGuard {
    fn session(&self) -> &HardwareSession {
        &self.session
    }

    async fn close(mut self) {
        if let Err(e) = self.transport.close_session(&self.session).await {
            tracing::warn!("Failed to close hardware session {}: {}", self.session.id, e);
        }
        self.closed = true;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        tracing::debug!("Hardware session {} dropped before close", self.session.id);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let transport = Arc::clone(&self.transport);
            let session = self.session.clone();
            handle.spawn(async move {
                let _ = transport.close_session(&session).await;
            });
        }
    }
}

pub struct HardwareKeyring {
    chain: Arc<dyn ChainApi>,
    transport: Arc<dyn HardwareTransport>,
    settings: SigningSettings,
}

impl HardwareKeyring {
    pub fn new(
        chain: Arc<dyn ChainApi>,
        transport: Arc<dyn HardwareTransport>,
        settings: SigningSettings,
    ) -> Self {
        Self {
            chain,
            transport,
            settings,
        }
    }

    async fn open(&self, device_id: &str) -> CoreResult<SessionGuard> {
        let session = bounded(
            self.settings.hardware_timeout,
            self.transport.open_session(device_id),
        )
        .await?;
        tracing::debug!("Hardware session opened: device={}, session={}", device_id, session.id);
        Ok(SessionGuard {
            transport: Arc::clone(&self.transport),
            session,
            closed: false,
        })
    }
}

/// 设备调用限时；超时与设备错误都直接返回
async fn bounded<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, HardwareError>>,
) -> CoreResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(CoreError::from),
        Err(_) => Err(CoreError::TransportTimeout),
    }
}

#[async_trait]
impl Keyring for HardwareKeyring {
    fn kind(&self) -> KeyringKind {
        KeyringKind::Hardware
    }

    async fn prepare_accounts(&self, params: &PrepareAccountsParams) -> CoreResult<Vec<Account>> {
        let device_id = params
            .device_id
            .as_deref()
            .ok_or_else(|| CoreError::invalid_payload("device_id is required"))?;
        if params.indexes.is_empty() {
            return Err(CoreError::invalid_payload("indexes must not be empty"));
        }
        let network_id = self.chain.network_id().clone();
        let template = match &params.template {
            Some(template) => PathTemplate::new(template.clone()),
            None => PathTemplate::new(network_id.chain_impl().default_path_template()),
        };
        let paths: Vec<String> = template
            .build_all(&params.indexes)?
            .iter()
            .map(|p| p.to_string())
            .collect();

        let guard = self.open(device_id).await?;
        let result = bounded(
            self.settings.hardware_timeout,
            self.transport
                .get_public_keys(guard.session(), &network_id, &paths),
        )
        .await;
        guard.close().await;
        let public_keys = result?;

        if public_keys.len() != paths.len() {
            return Err(CoreError::invalid_public_key(format!(
                "device returned {} public keys for {} paths",
                public_keys.len(),
                paths.len()
            )));
        }

        let version = params.account_version.as_deref();
        paths
            .into_iter()
            .zip(public_keys)
            .map(|(path, public_key)| {
                let record = self.chain.get_address_from_public(&public_key, version)?;
                Ok(Account {
                    id: Account::make_id(KeyringKind::Hardware, device_id, &path, version),
                    network_id: network_id.clone(),
                    keyring_kind: KeyringKind::Hardware,
                    path,
                    address: record.address,
                    public_key: record.public_key,
                    credential_id: None,
                    account_version: params.account_version.clone(),
                    device_id: Some(device_id.to_string()),
                })
            })
            .collect()
    }

    async fn get_private_keys(&self, _account: &Account) -> CoreResult<PrivateKeysMap> {
        Err(CoreError::unsupported("hardware keys never leave the device"))
    }

    async fn get_exported_secret_key(&self, _account: &Account) -> CoreResult<Zeroizing<String>> {
        Err(CoreError::unsupported("hardware keys never leave the device"))
    }

    async fn sign_transaction(&self, account: &Account, tx: &UnsignedTx) -> CoreResult<SignedTx> {
        let device_id = account.device_id()?;
        let prepared = self.chain.prepare_unsigned_tx(tx, account)?;

        let guard = self.open(device_id).await?;
        let result = bounded(
            self.settings.hardware_timeout,
            self.transport
                .sign_transaction(guard.session(), account, &prepared),
        )
        .await;
        guard.close().await;

        if let Err(e) = &result {
            tracing::warn!(
                "Hardware sign_transaction failed: network={}, account={}, error={}",
                account.network_id,
                account.id,
                scrub_secrets(&e.to_string())
            );
        }
        result
    }

    async fn sign_message(
        &self,
        account: &Account,
        message: &UnsignedMessage,
    ) -> CoreResult<SignedMessage> {
        let device_id = account.device_id()?;

        let guard = self.open(device_id).await?;
        let result = bounded(
            self.settings.hardware_timeout,
            self.transport
                .sign_message(guard.session(), account, message),
        )
        .await;
        guard.close().await;

        if let Err(e) = &result {
            tracing::warn!(
                "Hardware sign_message failed: network={}, account={}, error={}",
                account.network_id,
                account.id,
                scrub_secrets(&e.to_string())
            );
        }
        result
    }
}
