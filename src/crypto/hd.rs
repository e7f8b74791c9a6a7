//! HD 派生
//!
//! - secp256k1: BIP32 (coins-bip32)
//! - ed25519: SLIP-0010，仅支持硬化路径

use coins_bip32::path::DerivationPath as Bip32Path;
use coins_bip32::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::crypto::curve::{curve_for, CurveName};
use crate::crypto::secret::{PrivateKeyMaterial, SeedMaterial};
use crate::domain::derivation_path::DerivationPath;
use crate::error::{CoreError, CoreResult};

type HmacSha512 = Hmac<Sha512>;

const ED25519_SEED_KEY: &[u8] = b"ed25519 seed";

/// 派生出的密钥对
#[derive(Debug)]
pub struct DerivedKeyPair {
    pub path: DerivationPath,
    pub private_key: PrivateKeyMaterial,
    /// secp256k1 为压缩公钥；ed25519 为 32 字节公钥
    pub public_key: Vec<u8>,
}

/// 按曲线从种子派生私钥
pub fn derive_private_key(
    seed: &SeedMaterial,
    path: &DerivationPath,
    curve: CurveName,
) -> CoreResult<PrivateKeyMaterial> {
    match curve {
        CurveName::Secp256k1 => derive_secp256k1(seed, path),
        CurveName::Ed25519 => derive_ed25519(seed, path),
    }
}

/// 派生私钥并计算公钥
pub fn derive_key_pair(
    seed: &SeedMaterial,
    path: &DerivationPath,
    curve: CurveName,
) -> CoreResult<DerivedKeyPair> {
    let private_key = derive_private_key(seed, path, curve)?;
    let public_key = curve_for(curve).public_from_private(&private_key)?;
    Ok(DerivedKeyPair {
        path: path.clone(),
        private_key,
        public_key,
    })
}

fn derive_secp256k1(seed: &SeedMaterial, path: &DerivationPath) -> CoreResult<PrivateKeyMaterial> {
    use k256::ecdsa::SigningKey;

    // 解析派生路径
    let bip32_path = path
        .to_string()
        .parse::<Bip32Path>()
        .map_err(|e| CoreError::derivation(format!("Invalid derivation path: {}", e)))?;

    // 从种子派生密钥
    let master_key = XPriv::root_from_seed(seed.as_bytes(), None)
        .map_err(|e| CoreError::derivation(format!("Failed to derive master key: {}", e)))?;

    let derived_key = master_key
        .derive_path(&bip32_path)
        .map_err(|e| CoreError::derivation(format!("Failed to derive key: {}", e)))?;

    // XPriv 实现 AsRef<SigningKey>
    let signing_key: &SigningKey = derived_key.as_ref();
    let bytes = Zeroizing::new(signing_key.to_bytes());
    Ok(PrivateKeyMaterial::new(bytes.to_vec()))
}

/// SLIP-0010 ed25519 派生
fn derive_ed25519(seed: &SeedMaterial, path: &DerivationPath) -> CoreResult<PrivateKeyMaterial> {
    if !path.is_fully_hardened() {
        return Err(CoreError::derivation(format!(
            "ed25519 only supports hardened derivation: {}",
            path
        )));
    }

    let mut mac = HmacSha512::new_from_slice(ED25519_SEED_KEY)
        .map_err(|e| CoreError::derivation(format!("hmac: {}", e)))?;
    mac.update(seed.as_bytes());
    let master = Zeroizing::new(mac.finalize().into_bytes().to_vec());

    let mut key = Zeroizing::new(master[..32].to_vec());
    let mut chain_code = Zeroizing::new(master[32..].to_vec());

    for segment in path.segments() {
        let mut mac = HmacSha512::new_from_slice(&chain_code)
            .map_err(|e| CoreError::derivation(format!("hmac: {}", e)))?;
        mac.update(&[0u8]);
        mac.update(&key);
        mac.update(&segment.raw_index().to_be_bytes());
        let child = Zeroizing::new(mac.finalize().into_bytes().to_vec());

        key = Zeroizing::new(child[..32].to_vec());
        chain_code = Zeroizing::new(child[32..].to_vec());
    }

    Ok(PrivateKeyMaterial::new(key.to_vec()))
}
