//! 签名载荷
//!
//! 未签名交易、已签名交易、消息以及派生查询的数据形态

use serde::{Deserialize, Serialize};

use crate::crypto::CurveName;
use crate::domain::network::NetworkId;

/// 地址记录（一次产出后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: String,
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// HD 批量派生查询（逐路径一条记录，保持顺序）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdDerivationQuery {
    pub network_id: NetworkId,
    pub paths: Vec<String>,
    pub curve: CurveName,
}

/// 凭证查询
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialQuery {
    pub credential_id: String,
    pub network_id: NetworkId,
    /// HD 凭证需要派生的路径；导入凭证为单个账户路径
    #[serde(default)]
    pub paths: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 各链交易形态
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// EVM 交易（legacy 或 EIP-1559，由是否携带 max_fee_per_gas 决定）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmTx {
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    /// 十进制或 0x 十六进制 wei
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    pub nonce: u64,
    pub gas_limit: u64,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub max_fee_per_gas: Option<String>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<String>,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcInput {
    pub txid: String,
    pub vout: u32,
    /// 被花费输出的金额（聪）
    pub value: u64,
    /// 被花费输出的地址（必须属于当前账户）
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcOutput {
    pub address: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcTx {
    pub inputs: Vec<BtcInput>,
    pub outputs: Vec<BtcOutput>,
    #[serde(default)]
    pub lock_time: u32,
}

/// Solana 交易：已序列化的 message（base58）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolTx {
    pub fee_payer: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TonMessage {
    pub to_address: String,
    /// nanoton，十进制
    pub amount: String,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub state_init: Option<String>,
    #[serde(default)]
    pub send_mode: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TonTx {
    pub from_address: String,
    pub sequence_no: u32,
    pub messages: Vec<TonMessage>,
    #[serde(default)]
    pub expire_at: Option<u64>,
}

/// Cardano 交易：CBOR 编码的交易体（hex）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaTx {
    pub change_address: String,
    pub body: String,
}

/// 按链族区分的编码交易
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EncodedTx {
    Evm(EvmTx),
    Btc(BtcTx),
    Sol(SolTx),
    Ton(TonTx),
    Ada(AdaTx),
    /// 原始 hex，仅硬件透传
    Raw { hex: String },
}

impl EncodedTx {
    pub fn kind(&self) -> &'static str {
        match self {
            EncodedTx::Evm(_) => "evm",
            EncodedTx::Btc(_) => "btc",
            EncodedTx::Sol(_) => "sol",
            EncodedTx::Ton(_) => "ton",
            EncodedTx::Ada(_) => "ada",
            EncodedTx::Raw { .. } => "raw",
        }
    }
}

/// 未签名交易
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTx {
    pub encoded_tx: EncodedTx,
    /// 预签名序列化结果（hex），由链的预处理钩子填充
    #[serde(default)]
    pub raw_tx_unsigned: Option<String>,
}

impl UnsignedTx {
    pub fn new(encoded_tx: EncodedTx) -> Self {
        Self {
            encoded_tx,
            raw_tx_unsigned: None,
        }
    }
}

/// 已签名交易
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTx {
    pub txid: String,
    pub raw_tx: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_tx: Option<EncodedTx>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 消息
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// 带链前缀的个人消息（EIP-191、Bitcoin Signed Message 等）
    Personal,
    /// 直接签 32 字节哈希
    Hash,
    /// TON sign-data
    TonSignData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TonSignData {
    pub schema_crc: u32,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedMessage {
    pub kind: MessageKind,
    /// UTF-8 文本，或 0x 前缀的 hex 字节
    pub message: String,
    #[serde(default)]
    pub ton_sign_data: Option<TonSignData>,
}

impl UnsignedMessage {
    pub fn personal(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Personal,
            message: message.into(),
            ton_sign_data: None,
        }
    }

    pub fn hash(hash_hex: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Hash,
            message: hash_hex.into(),
            ton_sign_data: None,
        }
    }

    /// 消息字节：`0x` 前缀视为 hex，否则 UTF-8
    pub fn bytes(&self) -> Option<Vec<u8>> {
        if self.message.starts_with("0x") || self.message.starts_with("0X") {
            crate::utils::hex_utils::decode_hex(&self.message)
        } else {
            Some(self.message.as_bytes().to_vec())
        }
    }
}

/// 已签名消息（链相关编码）
pub type SignedMessage = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_tx_tagged_serde() {
        let json = r#"{"type":"sol","fee_payer":"abc","message":"3yZe7d"}"#;
        let tx: EncodedTx = serde_json::from_str(json).unwrap();
        assert_eq!(tx.kind(), "sol");

        let unsigned = UnsignedTx::new(tx);
        let back = serde_json::to_string(&unsigned).unwrap();
        assert!(back.contains("\"type\":\"sol\""));
    }

    #[test]
    fn test_message_bytes() {
        assert_eq!(UnsignedMessage::personal("hi").bytes(), Some(b"hi".to_vec()));
        assert_eq!(UnsignedMessage::personal("0x0102").bytes(), Some(vec![1, 2]));
        assert_eq!(UnsignedMessage::personal("0xzz").bytes(), None);
    }
}
