//! 导入私钥密钥环

use std::sync::Arc;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::chains::ChainApi;
use crate::crypto::{curve_for, PrivateKeysMap};
use crate::domain::{
    Account, CredentialQuery, KeyringKind, SignedMessage, SignedTx, UnsignedMessage, UnsignedTx,
};
use crate::error::{CoreError, CoreResult};
use crate::keyring::credential::CredentialProvider;
use crate::keyring::{scoped, Keyring, PrepareAccountsParams, SigningSettings};

pub struct ImportedKeyring {
    chain: Arc<dyn ChainApi>,
    credentials: Arc<dyn CredentialProvider>,
    settings: SigningSettings,
}

impl ImportedKeyring {
    pub fn new(
        chain: Arc<dyn ChainApi>,
        credentials: Arc<dyn CredentialProvider>,
        settings: SigningSettings,
    ) -> Self {
        Self {
            chain,
            credentials,
            settings,
        }
    }
}

#[async_trait]
impl Keyring for ImportedKeyring {
    fn kind(&self) -> KeyringKind {
        KeyringKind::Imported
    }

    async fn prepare_accounts(&self, params: &PrepareAccountsParams) -> CoreResult<Vec<Account>> {
        let credential_id = params
            .credential_id
            .as_deref()
            .ok_or_else(|| CoreError::invalid_payload("credential_id is required"))?;
        let network_id = self.chain.network_id().clone();
        let query = CredentialQuery {
            credential_id: credential_id.to_string(),
            network_id: network_id.clone(),
            paths: Vec::new(),
        };
        let curve = self.chain.curve();
        let version = params.account_version.as_deref();

        let record = scoped::with_default_private_key(
            self.credentials.as_ref(),
            &query,
            self.settings.credential_timeout,
            |key| {
                key.ensure_curve(curve)?;
                let public_key = curve_for(curve).public_from_private(key)?;
                self.chain
                    .get_address_from_public(&hex::encode(public_key), version)
            },
        )
        .await?;

        tracing::info!(
            "Imported account prepared: network={}, credential={}",
            network_id,
            credential_id
        );

        Ok(vec![Account {
            id: Account::make_id(KeyringKind::Imported, credential_id, network_id.as_str(), version),
            network_id,
            keyring_kind: KeyringKind::Imported,
            path: String::new(),
            address: record.address,
            public_key: record.public_key,
            credential_id: Some(credential_id.to_string()),
            account_version: params.account_version.clone(),
            device_id: None,
        }])
    }

    async fn get_private_keys(&self, account: &Account) -> CoreResult<PrivateKeysMap> {
        scoped::get_private_keys(
            self.chain.as_ref(),
            self.credentials.as_ref(),
            account,
            self.settings.credential_timeout,
        )
        .await
    }

    async fn get_exported_secret_key(&self, account: &Account) -> CoreResult<Zeroizing<String>> {
        scoped::get_exported_secret_key(
            self.chain.as_ref(),
            self.credentials.as_ref(),
            account,
            self.settings.credential_timeout,
        )
        .await
    }

    async fn sign_transaction(&self, account: &Account, tx: &UnsignedTx) -> CoreResult<SignedTx> {
        scoped::sign_transaction(
            self.chain.as_ref(),
            self.credentials.as_ref(),
            account,
            tx,
            self.settings.credential_timeout,
        )
        .await
    }

    async fn sign_message(
        &self,
        account: &Account,
        message: &UnsignedMessage,
    ) -> CoreResult<SignedMessage> {
        scoped::sign_message(
            self.chain.as_ref(),
            self.credentials.as_ref(),
            account,
            message,
            self.settings.credential_timeout,
        )
        .await
    }
}
