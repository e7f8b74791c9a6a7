//! 椭圆曲线抽象
//!
//! 无状态原语：公钥推导、签名、验签、公钥形态转换。
//! 长度错误的输入在进入曲线运算之前即被拒绝。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::{ed25519::Ed25519, secp256k1::Secp256k1};
use crate::crypto::secret::PrivateKeyMaterial;
use crate::error::CoreResult;

/// 加密曲线类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveName {
    /// secp256k1 曲线 (Bitcoin, EVM, SCDO)
    Secp256k1,
    /// ed25519 曲线 (Solana, TON, Cardano)
    Ed25519,
}

impl CurveName {
    pub fn private_key_len(&self) -> usize {
        32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CurveName::Secp256k1 => "secp256k1",
            CurveName::Ed25519 => "ed25519",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "secp256k1" => Some(CurveName::Secp256k1),
            "ed25519" => Some(CurveName::Ed25519),
            _ => None,
        }
    }
}

impl fmt::Display for CurveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 公钥目标形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKeyForm {
    Compressed,
    Uncompressed,
}

/// 曲线签名结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveSignature {
    /// secp256k1: r||s (64字节)；ed25519: R||S (64字节)
    pub bytes: Vec<u8>,
    /// secp256k1 ECDSA 的恢复ID
    pub recovery_id: Option<u8>,
}

impl CurveSignature {
    /// r||s||v 形式（v 为原始恢复ID）
    pub fn to_rsv(&self) -> Vec<u8> {
        let mut out = self.bytes.clone();
        if let Some(v) = self.recovery_id {
            out.push(v);
        }
        out
    }
}

/// 曲线原语 trait
pub trait Curve: Send + Sync {
    fn name(&self) -> CurveName;

    /// 生成随机私钥
    fn generate_private_key(&self) -> PrivateKeyMaterial;

    /// 私钥推导公钥（secp256k1 返回压缩格式）
    fn public_from_private(&self, private_key: &PrivateKeyMaterial) -> CoreResult<Vec<u8>>;

    /// 签名
    ///
    /// secp256k1 的输入为 32 字节摘要；ed25519 的输入为原始消息
    fn sign(&self, private_key: &PrivateKeyMaterial, data: &[u8]) -> CoreResult<CurveSignature>;

    /// 验签
    fn verify(&self, public_key: &[u8], data: &[u8], signature: &[u8]) -> CoreResult<bool>;

    /// 公钥形态转换（压缩 <-> 非压缩）
    fn transform_public_key(&self, public_key: &[u8], form: PublicKeyForm) -> CoreResult<Vec<u8>>;
}

static SECP256K1: Secp256k1 = Secp256k1;
static ED25519: Ed25519 = Ed25519;

/// 根据曲线名获取实现
pub fn curve_for(name: CurveName) -> &'static dyn Curve {
    match name {
        CurveName::Secp256k1 => &SECP256K1,
        CurveName::Ed25519 => &ED25519,
    }
}
