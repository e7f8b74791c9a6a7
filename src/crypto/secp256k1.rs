//! secp256k1 曲线实现
//!
//! ECDSA 使用 RFC-6979 确定性签名（带恢复ID）；Schnorr (BIP-340) 使用随机辅助数据

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::{rngs::OsRng, RngCore};

use crate::crypto::curve::{Curve, CurveName, CurveSignature, PublicKeyForm};
use crate::crypto::secret::PrivateKeyMaterial;
use crate::error::{CoreError, CoreResult};

pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 65;
pub const DIGEST_LEN: usize = 32;

pub struct Secp256k1;

impl Secp256k1 {
    fn signing_key(private_key: &PrivateKeyMaterial) -> CoreResult<SigningKey> {
        private_key.ensure_curve(CurveName::Secp256k1)?;
        SigningKey::from_slice(private_key.as_bytes())
            .map_err(|_| CoreError::invalid_private_key("secp256k1 scalar out of range"))
    }

    fn ensure_public_key_len(public_key: &[u8]) -> CoreResult<()> {
        match public_key.len() {
            COMPRESSED_PUBLIC_KEY_LEN | UNCOMPRESSED_PUBLIC_KEY_LEN => Ok(()),
            len => Err(CoreError::invalid_public_key(format!(
                "secp256k1 public key must be 33 or 65 bytes, got {}",
                len
            ))),
        }
    }

    fn ensure_digest_len(digest: &[u8]) -> CoreResult<()> {
        if digest.len() != DIGEST_LEN {
            return Err(CoreError::invalid_payload(format!(
                "secp256k1 digest must be 32 bytes, got {}",
                digest.len()
            )));
        }
        Ok(())
    }

    /// 非压缩公钥（65字节，0x04 开头）
    pub fn uncompressed_public_key(&self, private_key: &PrivateKeyMaterial) -> CoreResult<Vec<u8>> {
        let signing_key = Self::signing_key(private_key)?;
        Ok(signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec())
    }

    /// BIP-340 Schnorr 签名（每次使用新的随机辅助数据，结果不确定）
    pub fn sign_schnorr(&self, private_key: &PrivateKeyMaterial, message: &[u8]) -> CoreResult<Vec<u8>> {
        private_key.ensure_curve(CurveName::Secp256k1)?;
        let signing_key = k256::schnorr::SigningKey::from_bytes(private_key.as_bytes())
            .map_err(|_| CoreError::invalid_private_key("secp256k1 scalar out of range"))?;

        let mut aux_rand = [0u8; 32];
        OsRng.fill_bytes(&mut aux_rand);

        let signature = signing_key
            .sign_raw(message, &aux_rand)
            .map_err(|e| CoreError::signing_failed(format!("schnorr: {}", e)))?;
        Ok(signature.to_bytes().to_vec())
    }

    /// x-only 公钥（32字节，BIP-340）
    pub fn x_only_public_key(&self, private_key: &PrivateKeyMaterial) -> CoreResult<Vec<u8>> {
        private_key.ensure_curve(CurveName::Secp256k1)?;
        let signing_key = k256::schnorr::SigningKey::from_bytes(private_key.as_bytes())
            .map_err(|_| CoreError::invalid_private_key("secp256k1 scalar out of range"))?;
        Ok(signing_key.verifying_key().to_bytes().to_vec())
    }

    pub fn verify_schnorr(&self, x_only_public_key: &[u8], message: &[u8], signature: &[u8]) -> CoreResult<bool> {
        if x_only_public_key.len() != 32 {
            return Err(CoreError::invalid_public_key("x-only public key must be 32 bytes"));
        }
        let verifying_key = k256::schnorr::VerifyingKey::from_bytes(x_only_public_key)
            .map_err(|_| CoreError::invalid_public_key("invalid x-only public key"))?;
        let signature = match k256::schnorr::Signature::try_from(signature) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify_raw(message, &signature).is_ok())
    }

    /// BIP-341 密钥路径调整（无脚本树）
    ///
    /// d' = (P.y 为奇数 ? n - d : d) + H_TapTweak(P.x)
    pub fn tap_tweak_private_key(&self, private_key: &PrivateKeyMaterial) -> CoreResult<PrivateKeyMaterial> {
        use k256::elliptic_curve::ops::Reduce;
        use k256::elliptic_curve::Field;
        use k256::elliptic_curve::point::AffineCoordinates;
        use k256::{ProjectivePoint, Scalar, U256};

        private_key.ensure_curve(CurveName::Secp256k1)?;
        let secret = k256::SecretKey::from_slice(private_key.as_bytes())
            .map_err(|_| CoreError::invalid_private_key("secp256k1 scalar out of range"))?;

        let mut scalar: Scalar = *secret.to_nonzero_scalar();
        let point = (ProjectivePoint::GENERATOR * scalar).to_affine();
        if bool::from(point.y_is_odd()) {
            scalar = -scalar;
        }

        let tweak = tagged_hash(b"TapTweak", &point.x());
        let tweaked = scalar + <Scalar as Reduce<U256>>::reduce_bytes(&tweak);
        if bool::from(tweaked.is_zero()) {
            return Err(CoreError::signing_failed("tweaked key is zero"));
        }
        Ok(PrivateKeyMaterial::new(tweaked.to_bytes().to_vec()))
    }

    /// 从摘要和签名恢复压缩公钥
    pub fn recover_public_key(&self, digest: &[u8], signature: &[u8], recovery_id: u8) -> CoreResult<Vec<u8>> {
        Self::ensure_digest_len(digest)?;
        let signature = Signature::from_slice(signature)
            .map_err(|_| CoreError::invalid_payload("invalid ECDSA signature"))?;
        let recovery_id = RecoveryId::from_byte(recovery_id)
            .ok_or_else(|| CoreError::invalid_payload("invalid recovery id"))?;
        let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|e| CoreError::invalid_payload(format!("recovery failed: {}", e)))?;
        Ok(verifying_key.to_encoded_point(true).as_bytes().to_vec())
    }

    /// 转为 DER 编码（Bitcoin 脚本签名使用）
    pub fn signature_to_der(&self, signature: &[u8]) -> CoreResult<Vec<u8>> {
        let signature = Signature::from_slice(signature)
            .map_err(|_| CoreError::invalid_payload("invalid ECDSA signature"))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

/// BIP-340 tagged hash
fn tagged_hash(tag: &[u8], data: &[u8]) -> k256::FieldBytes {
    use sha2::{Digest, Sha256};

    let tag_hash = Sha256::digest(tag);
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    hasher.update(data);
    hasher.finalize()
}

impl Curve for Secp256k1 {
    fn name(&self) -> CurveName {
        CurveName::Secp256k1
    }

    fn generate_private_key(&self) -> PrivateKeyMaterial {
        let signing_key = SigningKey::random(&mut OsRng);
        PrivateKeyMaterial::new(signing_key.to_bytes().to_vec())
    }

    fn public_from_private(&self, private_key: &PrivateKeyMaterial) -> CoreResult<Vec<u8>> {
        let signing_key = Self::signing_key(private_key)?;
        Ok(signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec())
    }

    fn sign(&self, private_key: &PrivateKeyMaterial, digest: &[u8]) -> CoreResult<CurveSignature> {
        Self::ensure_digest_len(digest)?;
        let signing_key = Self::signing_key(private_key)?;
        let (signature, recovery_id) = signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CoreError::signing_failed(format!("ecdsa: {}", e)))?;

        Ok(CurveSignature {
            bytes: signature.to_bytes().to_vec(),
            recovery_id: Some(recovery_id.to_byte()),
        })
    }

    fn verify(&self, public_key: &[u8], digest: &[u8], signature: &[u8]) -> CoreResult<bool> {
        Self::ensure_public_key_len(public_key)?;
        Self::ensure_digest_len(digest)?;
        let verifying_key = VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|_| CoreError::invalid_public_key("not a secp256k1 point"))?;
        let signature = match Signature::from_slice(signature) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify_prehash(digest, &signature).is_ok())
    }

    fn transform_public_key(&self, public_key: &[u8], form: PublicKeyForm) -> CoreResult<Vec<u8>> {
        Self::ensure_public_key_len(public_key)?;
        let point = k256::PublicKey::from_sec1_bytes(public_key)
            .map_err(|_| CoreError::invalid_public_key("not a secp256k1 point"))?;
        let compress = form == PublicKeyForm::Compressed;
        Ok(point.to_encoded_point(compress).as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_key() -> PrivateKeyMaterial {
        PrivateKeyMaterial::new(vec![0x11; 32])
    }

    #[test]
    fn test_compressed_and_uncompressed_forms() {
        let curve = Secp256k1;
        let compressed = curve.public_from_private(&fixed_key()).unwrap();
        assert_eq!(compressed.len(), 33);
        assert!(compressed[0] == 0x02 || compressed[0] == 0x03);

        let uncompressed = curve
            .transform_public_key(&compressed, PublicKeyForm::Uncompressed)
            .unwrap();
        assert_eq!(uncompressed.len(), 65);
        assert_eq!(uncompressed[0], 0x04);
        assert_eq!(uncompressed, curve.uncompressed_public_key(&fixed_key()).unwrap());

        let back = curve
            .transform_public_key(&uncompressed, PublicKeyForm::Compressed)
            .unwrap();
        assert_eq!(back, compressed);
    }

    #[test]
    fn test_rejects_bad_lengths_before_math() {
        let curve = Secp256k1;
        let err = curve
            .transform_public_key(&[2u8; 20], PublicKeyForm::Compressed)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPublicKey(_)));

        let err = curve
            .public_from_private(&PrivateKeyMaterial::new(vec![1u8; 31]))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPrivateKey(_)));

        let err = curve.sign(&fixed_key(), &[0u8; 31]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload(_)));
    }

    #[test]
    fn test_zero_scalar_is_invalid_private_key() {
        let err = Secp256k1
            .public_from_private(&PrivateKeyMaterial::new(vec![0u8; 32]))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPrivateKey(_)));
    }

    #[test]
    fn test_ecdsa_is_deterministic_and_recoverable() {
        let curve = Secp256k1;
        let digest = [0x42u8; 32];
        let first = curve.sign(&fixed_key(), &digest).unwrap();
        let second = curve.sign(&fixed_key(), &digest).unwrap();
        assert_eq!(first, second);

        let recovered = curve
            .recover_public_key(&digest, &first.bytes, first.recovery_id.unwrap())
            .unwrap();
        assert_eq!(recovered, curve.public_from_private(&fixed_key()).unwrap());
    }

    #[test]
    fn test_tap_tweak_bip86_vector() {
        // BIP-86 第一个账户 m/86'/0'/0'/0/0 的内部公钥与输出公钥
        let seed = crate::crypto::SeedMaterial::from_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            "",
        )
        .unwrap();
        let path = "m/86'/0'/0'/0/0".parse().unwrap();
        let private_key =
            crate::crypto::derive_private_key(&seed, &path, CurveName::Secp256k1).unwrap();
        let curve = Secp256k1;
        assert_eq!(
            hex::encode(curve.x_only_public_key(&private_key).unwrap()),
            "cc8a4bc64d897bddc5fbc2f670f7a8ba0b386779106cf1223c6fc5d7cd6fc115"
        );
        let tweaked = curve.tap_tweak_private_key(&private_key).unwrap();
        assert_eq!(
            hex::encode(curve.x_only_public_key(&tweaked).unwrap()),
            "a60869f0dbcf1dc659c9cecbaf8050135ea9e8cdc487053f1dc6880949dc684c"
        );
    }

    #[test]
    fn test_schnorr_is_randomized_but_verifies() {
        let curve = Secp256k1;
        let message = [0x24u8; 32];
        let first = curve.sign_schnorr(&fixed_key(), &message).unwrap();
        let second = curve.sign_schnorr(&fixed_key(), &message).unwrap();
        assert_ne!(first, second);

        let x_only = curve.x_only_public_key(&fixed_key()).unwrap();
        assert!(curve.verify_schnorr(&x_only, &message, &first).unwrap());
        assert!(curve.verify_schnorr(&x_only, &message, &second).unwrap());
    }
}
