//! 内存凭证存储
//!
//! 私钥与 HD 种子以 AES-256-GCM 加密存放，加密密钥由口令经 PBKDF2 派生。
//! 锁定后密钥清零，所有读取返回 `Locked`。

use std::collections::HashMap;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use tokio::sync::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{derive_private_key, CurveName, PrivateKeyMaterial, PrivateKeysMap, SeedMaterial};
use crate::domain::{CredentialQuery, DerivationPath};
use crate::error::{CoreError, CoreResult};
use crate::keyring::credential::{CredentialError, CredentialProvider};
use crate::utils::hex_utils::decode_hex;

/// PBKDF2 密钥派生参数
pub const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

/// 加密密钥（使用Zeroize保护）
#[derive(Zeroize, ZeroizeOnDrop)]
struct EncryptionKey {
    key: [u8; KEY_LENGTH],
}

impl EncryptionKey {
    fn derive(password: &str, salt: &[u8], iterations: u32) -> Self {
        let mut key = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
        Self { key }
    }

    fn as_slice(&self) -> &[u8] {
        &self.key
    }
}

/// 加密数据，返回 nonce (12字节) + ciphertext
fn encrypt_data(data: &[u8], key: &EncryptionKey) -> CoreResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| CoreError::credential_unavailable(format!("Invalid key: {}", e)))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|e| CoreError::credential_unavailable(format!("Encryption failed: {}", e)))?;

    let mut result = nonce.to_vec();
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

fn decrypt_data(
    encrypted: &[u8],
    key: &EncryptionKey,
) -> Result<Zeroizing<Vec<u8>>, CredentialError> {
    if encrypted.len() < NONCE_LENGTH {
        return Err(CredentialError::Backend("Encrypted data too short".into()));
    }
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| CredentialError::Backend(format!("Invalid key: {}", e)))?;

    let nonce = Nonce::from_slice(&encrypted[..NONCE_LENGTH]);
    let plaintext = cipher
        .decrypt(nonce, &encrypted[NONCE_LENGTH..])
        .map_err(|_| CredentialError::Rejected("decryption failed".into()))?;
    Ok(Zeroizing::new(plaintext))
}

/// 凭证类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    PrivateKey,
    HdSeed,
}

struct StoredCredential {
    kind: CredentialKind,
    ciphertext: Vec<u8>,
}

struct StoreState {
    key: Option<EncryptionKey>,
    entries: HashMap<String, StoredCredential>,
}

pub struct InMemoryCredentialStore {
    salt: [u8; SALT_LENGTH],
    iterations: u32,
    state: RwLock<StoreState>,
}

impl InMemoryCredentialStore {
    pub fn new(password: &str) -> Self {
        Self::with_iterations(password, PBKDF2_ITERATIONS)
    }

    pub fn with_iterations(password: &str, iterations: u32) -> Self {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let key = EncryptionKey::derive(password, &salt, iterations);
        Self {
            salt,
            iterations,
            state: RwLock::new(StoreState {
                key: Some(key),
                entries: HashMap::new(),
            }),
        }
    }

    /// 导入 hex 私钥，返回凭证ID
    pub async fn import_private_key(&self, private_key_hex: &str) -> CoreResult<String> {
        let bytes = Zeroizing::new(
            decode_hex(private_key_hex)
                .ok_or_else(|| CoreError::invalid_private_key("Invalid private key."))?,
        );
        if bytes.len() != 32 {
            return Err(CoreError::invalid_private_key(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        self.insert(CredentialKind::PrivateKey, &bytes).await
    }

    /// 导入助记词（只保存种子），返回凭证ID
    pub async fn import_mnemonic(&self, phrase: &str, passphrase: &str) -> CoreResult<String> {
        let seed = SeedMaterial::from_mnemonic(phrase, passphrase)?;
        self.insert(CredentialKind::HdSeed, seed.as_bytes()).await
    }

    async fn insert(&self, kind: CredentialKind, plaintext: &[u8]) -> CoreResult<String> {
        let mut state = self.state.write().await;
        let key = state
            .key
            .as_ref()
            .ok_or_else(|| CoreError::credential_unavailable("credential store locked"))?;
        let ciphertext = encrypt_data(plaintext, key)?;
        let id = uuid::Uuid::new_v4().to_string();
        state
            .entries
            .insert(id.clone(), StoredCredential { kind, ciphertext });
        tracing::info!("Credential stored: id={}, kind={:?}", id, kind);
        Ok(id)
    }

    pub async fn remove(&self, credential_id: &str) -> bool {
        self.state.write().await.entries.remove(credential_id).is_some()
    }

    pub async fn kind(&self, credential_id: &str) -> Option<CredentialKind> {
        self.state
            .read()
            .await
            .entries
            .get(credential_id)
            .map(|c| c.kind)
    }

    /// 锁定：丢弃加密密钥
    pub async fn lock(&self) {
        self.state.write().await.key = None;
        tracing::info!("Credential store locked");
    }

    /// 解锁：重新派生密钥，并用任一已存凭证验证口令
    pub async fn unlock(&self, password: &str) -> CoreResult<()> {
        let key = EncryptionKey::derive(password, &self.salt, self.iterations);
        let mut state = self.state.write().await;
        if let Some(entry) = state.entries.values().next() {
            decrypt_data(&entry.ciphertext, &key)?;
        }
        state.key = Some(key);
        Ok(())
    }

    async fn decrypt(
        &self,
        credential_id: &str,
        expected: CredentialKind,
    ) -> Result<Zeroizing<Vec<u8>>, CredentialError> {
        let state = self.state.read().await;
        let key = state.key.as_ref().ok_or(CredentialError::Locked)?;
        let entry = state
            .entries
            .get(credential_id)
            .ok_or_else(|| CredentialError::NotFound(credential_id.to_string()))?;
        if entry.kind != expected {
            return Err(CredentialError::Rejected(format!(
                "credential {} is {:?}, expected {:?}",
                credential_id, entry.kind, expected
            )));
        }
        decrypt_data(&entry.ciphertext, key)
    }
}

#[async_trait]
impl CredentialProvider for InMemoryCredentialStore {
    async fn get_default_private_key(
        &self,
        query: &CredentialQuery,
    ) -> Result<PrivateKeyMaterial, CredentialError> {
        let bytes = self
            .decrypt(&query.credential_id, CredentialKind::PrivateKey)
            .await?;
        Ok(PrivateKeyMaterial::new(bytes.to_vec()))
    }

    async fn get_private_keys_map(
        &self,
        query: &CredentialQuery,
        curve: CurveName,
    ) -> Result<PrivateKeysMap, CredentialError> {
        let kind = self
            .kind(&query.credential_id)
            .await
            .ok_or_else(|| CredentialError::NotFound(query.credential_id.clone()))?;

        let mut keys = PrivateKeysMap::new();
        match kind {
            CredentialKind::PrivateKey => {
                let key = self.get_default_private_key(query).await?;
                keys.insert(String::new(), key);
            }
            CredentialKind::HdSeed => {
                let seed = self.get_hd_seed(query).await?;
                for raw in &query.paths {
                    let path: DerivationPath = raw
                        .parse()
                        .map_err(|e: CoreError| CredentialError::Derivation(e.to_string()))?;
                    let key = derive_private_key(&seed, &path, curve)
                        .map_err(|e| CredentialError::Derivation(e.to_string()))?;
                    keys.insert(raw.clone(), key);
                }
            }
        }
        Ok(keys)
    }

    async fn get_hd_seed(&self, query: &CredentialQuery) -> Result<SeedMaterial, CredentialError> {
        let bytes = self
            .decrypt(&query.credential_id, CredentialKind::HdSeed)
            .await?;
        Ok(SeedMaterial::new(bytes.to_vec()))
    }
}
