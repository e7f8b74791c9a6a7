//! ed25519 曲线实现（确定性签名）

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use crate::crypto::curve::{Curve, CurveName, CurveSignature, PublicKeyForm};
use crate::crypto::secret::PrivateKeyMaterial;
use crate::error::{CoreError, CoreResult};

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

pub struct Ed25519;

impl Ed25519 {
    fn signing_key(private_key: &PrivateKeyMaterial) -> CoreResult<SigningKey> {
        private_key.ensure_curve(CurveName::Ed25519)?;
        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(private_key.as_bytes());
        Ok(SigningKey::from_bytes(&seed))
    }

    fn verifying_key(public_key: &[u8]) -> CoreResult<VerifyingKey> {
        let bytes: [u8; PUBLIC_KEY_LEN] = public_key.try_into().map_err(|_| {
            CoreError::invalid_public_key(format!(
                "ed25519 public key must be 32 bytes, got {}",
                public_key.len()
            ))
        })?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|_| CoreError::invalid_public_key("not an ed25519 point"))
    }
}

impl Curve for Ed25519 {
    fn name(&self) -> CurveName {
        CurveName::Ed25519
    }

    fn generate_private_key(&self) -> PrivateKeyMaterial {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut seed[..]);
        PrivateKeyMaterial::new(seed.to_vec())
    }

    fn public_from_private(&self, private_key: &PrivateKeyMaterial) -> CoreResult<Vec<u8>> {
        let signing_key = Self::signing_key(private_key)?;
        Ok(signing_key.verifying_key().to_bytes().to_vec())
    }

    fn sign(&self, private_key: &PrivateKeyMaterial, message: &[u8]) -> CoreResult<CurveSignature> {
        let signing_key = Self::signing_key(private_key)?;
        let signature = signing_key.sign(message);
        Ok(CurveSignature {
            bytes: signature.to_bytes().to_vec(),
            recovery_id: None,
        })
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> CoreResult<bool> {
        let verifying_key = Self::verifying_key(public_key)?;
        let bytes: [u8; SIGNATURE_LEN] = match signature.try_into() {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };
        let signature = Signature::from_bytes(&bytes);
        Ok(verifying_key.verify_strict(message, &signature).is_ok())
    }

    /// ed25519 只有一种编码形态，校验后原样返回
    fn transform_public_key(&self, public_key: &[u8], _form: PublicKeyForm) -> CoreResult<Vec<u8>> {
        let verifying_key = Self::verifying_key(public_key)?;
        Ok(verifying_key.to_bytes().to_vec())
    }
}
