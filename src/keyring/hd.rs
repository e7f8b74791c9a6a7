//! HD 密钥环
//!
//! 账户路径由模板展开；所有路径在获取种子之前整体校验。

use std::sync::Arc;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::chains::ChainApi;
use crate::crypto::PrivateKeysMap;
use crate::domain::{
    Account, CredentialQuery, HdDerivationQuery, KeyringKind, PathTemplate, SignedMessage,
    SignedTx, UnsignedMessage, UnsignedTx,
};
use crate::error::{CoreError, CoreResult};
use crate::keyring::credential::CredentialProvider;
use crate::keyring::{scoped, Keyring, PrepareAccountsParams, SigningSettings};

pub struct HdKeyring {
    chain: Arc<dyn ChainApi>,
    credentials: Arc<dyn CredentialProvider>,
    settings: SigningSettings,
}

impl HdKeyring {
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

    fn template(&self, params: &PrepareAccountsParams) -> PathTemplate {
        match &params.template {
            Some(template) => PathTemplate::new(template.clone()),
            None => PathTemplate::new(self.chain.network_id().chain_impl().default_path_template()),
        }
    }
}

#[async_trait]
impl Keyring for HdKeyring {
    fn kind(&self) -> KeyringKind {
        KeyringKind::Hd
    }

    async fn prepare_accounts(&self, params: &PrepareAccountsParams) -> CoreResult<Vec<Account>> {
        let credential_id = params
            .credential_id
            .as_deref()
            .ok_or_else(|| CoreError::invalid_payload("credential_id is required"))?;
        if params.indexes.is_empty() {
            return Err(CoreError::invalid_payload("indexes must not be empty"));
        }

        // 先展开并校验全部路径，失败时不触碰种子
        let paths: Vec<String> = self
            .template(params)
            .build_all(&params.indexes)?
            .iter()
            .map(|p| p.to_string())
            .collect();

        let network_id = self.chain.network_id().clone();
        let query = CredentialQuery {
            credential_id: credential_id.to_string(),
            network_id: network_id.clone(),
            paths: paths.clone(),
        };
        let hd_query = HdDerivationQuery {
            network_id: network_id.clone(),
            paths,
            curve: self.chain.curve(),
        };
        let version = params.account_version.as_deref();

        let records = scoped::with_seed(
            self.credentials.as_ref(),
            &query,
            self.settings.credential_timeout,
            |seed| self.chain.get_addresses_from_hd(seed, &hd_query, version),
        )
        .await?;

        tracing::info!(
            "HD accounts prepared: network={}, credential={}, count={}",
            network_id,
            credential_id,
            records.len()
        );

        records
            .into_iter()
            .map(|record| {
                let path = record.path.ok_or_else(|| {
                    CoreError::derivation("derived address is missing its path")
                })?;
                Ok(Account {
                    id: Account::make_id(KeyringKind::Hd, credential_id, &path, version),
                    network_id: network_id.clone(),
                    keyring_kind: KeyringKind::Hd,
                    path,
                    address: record.address,
                    public_key: record.public_key,
                    credential_id: Some(credential_id.to_string()),
                    account_version: params.account_version.clone(),
                    device_id: None,
                })
            })
            .collect()
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
