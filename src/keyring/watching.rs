//! 观察账户密钥环：只有地址或公钥，任何私钥操作都不查询凭证

use std::sync::Arc;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::chains::ChainApi;
use crate::crypto::PrivateKeysMap;
use crate::domain::{Account, KeyringKind, SignedMessage, SignedTx, UnsignedMessage, UnsignedTx};
use crate::error::{CoreError, CoreResult};
use crate::keyring::{Keyring, PrepareAccountsParams};

pub struct WatchingKeyring {
    chain: Arc<dyn ChainApi>,
}

impl WatchingKeyring {
    pub fn new(chain: Arc<dyn ChainApi>) -> Self {
        Self { chain }
    }

    fn unsupported(&self, operation: &str, account: &Account) -> CoreError {
        tracing::warn!(
            "Rejected {} on watch-only account: network={}, account={}",
            operation,
            account.network_id,
            account.id
        );
        CoreError::unsupported(format!("{} is not available for watch-only accounts", operation))
    }
}

#[async_trait]
impl Keyring for WatchingKeyring {
    fn kind(&self) -> KeyringKind {
        KeyringKind::WatchOnly
    }

    async fn prepare_accounts(&self, params: &PrepareAccountsParams) -> CoreResult<Vec<Account>> {
        let version = params.account_version.as_deref();
        let (address, public_key) = match (&params.public_key, &params.address) {
            (Some(public_key), _) => {
                let record = self.chain.get_address_from_public(public_key, version)?;
                (record.address, record.public_key)
            }
            (None, Some(address)) => (self.chain.validate_address(address)?, String::new()),
            (None, None) => {
                return Err(CoreError::invalid_payload(
                    "watch-only account needs an address or a public key",
                ))
            }
        };

        let network_id = self.chain.network_id().clone();
        Ok(vec![Account {
            id: Account::make_id(KeyringKind::WatchOnly, network_id.as_str(), &address, version),
            network_id,
            keyring_kind: KeyringKind::WatchOnly,
            path: String::new(),
            address,
            public_key,
            credential_id: None,
            account_version: params.account_version.clone(),
            device_id: None,
        }])
    }

    async fn get_private_keys(&self, account: &Account) -> CoreResult<PrivateKeysMap> {
        Err(self.unsupported("get_private_keys", account))
    }

    async fn get_exported_secret_key(&self, account: &Account) -> CoreResult<Zeroizing<String>> {
        Err(self.unsupported("get_exported_secret_key", account))
    }

    async fn sign_transaction(&self, account: &Account, _tx: &UnsignedTx) -> CoreResult<SignedTx> {
        Err(self.unsupported("sign_transaction", account))
    }

    async fn sign_message(
        &self,
        account: &Account,
        _message: &UnsignedMessage,
    ) -> CoreResult<SignedMessage> {
        Err(self.unsupported("sign_message", account))
    }
}
