//! 内存账户存储

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::Account;
use crate::error::CoreResult;
use crate::vault::AccountStore;

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存账户（同 ID 覆盖）
    pub async fn insert(&self, account: Account) {
        self.accounts
            .write()
            .await
            .insert(account.id.clone(), account);
    }

    pub async fn insert_all(&self, accounts: impl IntoIterator<Item = Account>) {
        let mut guard = self.accounts.write().await;
        for account in accounts {
            guard.insert(account.id.clone(), account);
        }
    }

    pub async fn remove(&self, account_id: &str) -> Option<Account> {
        self.accounts.write().await.remove(account_id)
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get_account(&self, account_id: &str) -> CoreResult<Option<Account>> {
        Ok(self.accounts.read().await.get(account_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::KeyringKind;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryAccountStore::new();
        let account = Account {
            id: "watching--evm--1--0xabc".into(),
            network_id: "evm--1".parse().unwrap(),
            keyring_kind: KeyringKind::WatchOnly,
            path: String::new(),
            address: "0xabc".into(),
            public_key: String::new(),
            credential_id: None,
            account_version: None,
            device_id: None,
        };
        store.insert(account.clone()).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get_account("watching--evm--1--0xabc").await.unwrap(),
            Some(account)
        );
        assert_eq!(store.get_account("nope").await.unwrap(), None);
    }
}
