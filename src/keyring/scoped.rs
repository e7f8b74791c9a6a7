//! 作用域密钥获取
//!
//! 获取 -> 使用 -> 丢弃。私钥映射与种子在作用域结束时 Drop 并清零，
//! 无论闭包成功、出错还是外层 future 被取消。

use std::future::Future;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::chains::ChainApi;
use crate::crypto::{PrivateKeyMaterial, PrivateKeysMap, SeedMaterial};
use crate::domain::{Account, CredentialQuery, SignedMessage, SignedTx, UnsignedMessage, UnsignedTx};
use crate::error::{CoreError, CoreResult};
use crate::keyring::credential::CredentialProvider;

/// 带超时的凭证获取；超时视为凭证不可用
pub async fn acquire<T, F>(timeout: Duration, fut: F) -> CoreResult<T>
where
    F: Future<Output = CoreResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "credential fetch timed out");
            Err(CoreError::credential_unavailable(format!(
                "credential fetch timed out after {}ms",
                timeout.as_millis()
            )))
        }
    }
}

/// 账户对应的凭证查询
pub fn credential_query(account: &Account) -> CoreResult<CredentialQuery> {
    Ok(CredentialQuery {
        credential_id: account.credential_id()?.to_string(),
        network_id: account.network_id.clone(),
        paths: vec![account.path.clone()],
    })
}

pub async fn with_private_keys<T, F>(
    chain: &dyn ChainApi,
    provider: &dyn CredentialProvider,
    query: &CredentialQuery,
    timeout: Duration,
    f: F,
) -> CoreResult<T>
where
    F: FnOnce(&PrivateKeysMap) -> CoreResult<T>,
{
    let keys = acquire(timeout, chain.get_private_keys(provider, query)).await?;
    let result = f(&keys);
    drop(keys);
    result
}

pub async fn with_default_private_key<T, F>(
    provider: &dyn CredentialProvider,
    query: &CredentialQuery,
    timeout: Duration,
    f: F,
) -> CoreResult<T>
where
    F: FnOnce(&PrivateKeyMaterial) -> CoreResult<T>,
{
    let key = acquire(timeout, async {
        provider
            .get_default_private_key(query)
            .await
            .map_err(CoreError::from)
    })
    .await?;
    let result = f(&key);
    drop(key);
    result
}

pub async fn with_seed<T, F>(
    provider: &dyn CredentialProvider,
    query: &CredentialQuery,
    timeout: Duration,
    f: F,
) -> CoreResult<T>
where
    F: FnOnce(&SeedMaterial) -> CoreResult<T>,
{
    let seed = acquire(timeout, async {
        provider.get_hd_seed(query).await.map_err(CoreError::from)
    })
    .await?;
    let result = f(&seed);
    drop(seed);
    result
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 软件密钥环（导入 / HD）共用流程
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_private_keys(
    chain: &dyn ChainApi,
    provider: &dyn CredentialProvider,
    account: &Account,
    timeout: Duration,
) -> CoreResult<PrivateKeysMap> {
    let query = credential_query(account)?;
    acquire(timeout, chain.get_private_keys(provider, &query)).await
}

pub async fn get_exported_secret_key(
    chain: &dyn ChainApi,
    provider: &dyn CredentialProvider,
    account: &Account,
    timeout: Duration,
) -> CoreResult<Zeroizing<String>> {
    let query = credential_query(account)?;
    acquire(timeout, chain.get_exported_secret_key(provider, &query)).await
}

/// 预签名钩子 -> 作用域获取私钥 -> 链签名
pub async fn sign_transaction(
    chain: &dyn ChainApi,
    provider: &dyn CredentialProvider,
    account: &Account,
    tx: &UnsignedTx,
    timeout: Duration,
) -> CoreResult<SignedTx> {
    let prepared = chain.prepare_unsigned_tx(tx, account)?;
    let query = credential_query(account)?;
    with_private_keys(chain, provider, &query, timeout, |keys| {
        chain.sign_transaction(keys, account, &prepared)
    })
    .await
}

pub async fn sign_message(
    chain: &dyn ChainApi,
    provider: &dyn CredentialProvider,
    account: &Account,
    message: &UnsignedMessage,
    timeout: Duration,
) -> CoreResult<SignedMessage> {
    let query = credential_query(account)?;
    with_private_keys(chain, provider, &query, timeout, |keys| {
        chain.sign_message(keys, account, message)
    })
    .await
}
