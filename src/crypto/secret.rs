//! 私钥/种子材料
//!
//! 所有秘密字节在 Drop 时清零（Zeroize），不实现 Clone，Debug 输出脱敏

use std::collections::HashMap;
use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::curve::CurveName;
use crate::error::{CoreError, CoreResult};

/// 私钥材料（使用Zeroize保护）
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeyMaterial {
    bytes: Vec<u8>,
}

impl PrivateKeyMaterial {
    /// 直接包装原始字节（不做长度校验）
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// 按曲线要求校验长度后包装
    pub fn for_curve(bytes: Vec<u8>, curve: CurveName) -> CoreResult<Self> {
        let key = Self::new(bytes);
        key.ensure_curve(curve)?;
        Ok(key)
    }

    /// 从 hex 字符串解析（允许 0x 前缀）
    pub fn from_hex(hex_str: &str, curve: CurveName) -> CoreResult<Self> {
        let stripped = crate::utils::hex_utils::strip_hex_prefix(hex_str);
        if !crate::utils::hex_utils::is_hex_string(stripped) {
            return Err(CoreError::invalid_private_key("Invalid private key."));
        }
        let bytes = Zeroizing::new(
            hex::decode(stripped)
                .map_err(|_| CoreError::invalid_private_key("Invalid private key."))?,
        );
        Self::for_curve(bytes.to_vec(), curve)
    }

    /// 长度不匹配即为硬错误，绝不截断或补齐
    pub fn ensure_curve(&self, curve: CurveName) -> CoreResult<()> {
        if self.bytes.len() != curve.private_key_len() {
            return Err(CoreError::invalid_private_key(format!(
                "{} private key must be {} bytes, got {}",
                curve,
                curve.private_key_len(),
                self.bytes.len()
            )));
        }
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 导出为 hex（调用方负责后续保管）
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.bytes))
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKeyMaterial(***, {} bytes)", self.bytes.len())
    }
}

/// HD 种子材料（BIP39 seed，64字节）
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SeedMaterial {
    bytes: Vec<u8>,
}

impl SeedMaterial {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// 从 BIP39 助记词生成种子
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> CoreResult<Self> {
        let mnemonic = bip39::Mnemonic::parse_in(bip39::Language::English, phrase)
            .map_err(|e| CoreError::derivation(format!("Invalid mnemonic: {}", e)))?;
        let seed = Zeroizing::new(mnemonic.to_seed(passphrase));
        Ok(Self::new(seed.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SeedMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeedMaterial(***)")
    }
}

/// 路径（或地址）到私钥的映射；整体 Drop 时逐个清零
pub type PrivateKeysMap = HashMap<String, PrivateKeyMaterial>;
