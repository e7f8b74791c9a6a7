//! 日志脱敏
//!
//! 地址和十六进制载荷只显示首尾；自由文本中的 32 字节十六进制串
//! （私钥、种子片段）一律替换。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::domain::{Account, SignedTx};

/// 可脱敏trait
pub trait SensitiveRedact {
    fn redact(&self) -> String;
}

/// 可能是私钥的 64 位十六进制串（可带 0x），更长的串也会被截获
static SECRET_HEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:0x)?[0-9a-fA-F]{64,}").unwrap()
});

/// 脱敏十六进制字符串（显示前缀和后缀）
pub fn redact_hex_string(hex: &str, show_chars: usize) -> String {
    if hex.len() <= show_chars * 2 {
        return "*".repeat(hex.len());
    }

    let prefix = &hex[..show_chars];
    let suffix = &hex[hex.len() - show_chars..];
    format!("{}...{}", prefix, suffix)
}

/// 脱敏地址（显示前6位和后4位）
pub fn redact_address(address: &str) -> String {
    if address.len() < 10 || !address.is_ascii() {
        return "*".repeat(address.chars().count());
    }

    let prefix = &address[..6];
    let suffix = &address[address.len() - 4..];
    format!("{}...{}", prefix, suffix)
}

/// 替换文本中所有疑似秘密的十六进制串
pub fn scrub_secrets(text: &str) -> String {
    SECRET_HEX.replace_all(text, "[REDACTED]").into_owned()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 领域类型脱敏
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize)]
struct RedactedAccount<'a> {
    id: &'a str,
    network_id: &'a str,
    keyring: &'static str,
    address: String,
}

impl SensitiveRedact for Account {
    fn redact(&self) -> String {
        serde_json::to_string(&RedactedAccount {
            id: &self.id,
            network_id: self.network_id.as_str(),
            keyring: self.keyring_kind.as_str(),
            address: redact_address(&self.address),
        })
        .unwrap_or_else(|_| "{ redacted }".to_string())
    }
}

#[derive(Debug, Serialize)]
struct RedactedSignedTx<'a> {
    txid: &'a str,
    raw_tx: String, // 只显示前后10个字符
}

impl SensitiveRedact for SignedTx {
    fn redact(&self) -> String {
        serde_json::to_string(&RedactedSignedTx {
            txid: &self.txid,
            raw_tx: redact_hex_string(&self.raw_tx, 10),
        })
        .unwrap_or_else(|_| "{ redacted }".to_string())
    }
}
