//! TON 链实现
//!
//! 地址依赖钱包合约版本：`sha256(version || subwallet_id || pubkey)` 作为账户哈希，
//! 按 user-friendly 格式编码（tag、workchain、hash、crc16，base64url）。
//! 签名消息同样依赖版本，因此由预签名钩子按账户版本生成并写入 `raw_tx_unsigned`。

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::chains::{
    decode_hash_message, decode_public_key, ensure_from_address, ensure_key_matches_account,
    key_for_account, message_bytes, ChainApi,
};
use crate::crypto::ed25519::Ed25519;
use crate::crypto::{curve_for, Curve, CurveName, PrivateKeysMap, PublicKeyForm};
use crate::domain::{
    Account, AddressRecord, EncodedTx, MessageKind, NetworkId, SignedTx, TonTx, UnsignedMessage,
    UnsignedTx,
};
use crate::error::{CoreError, CoreResult};
use crate::utils::hex_utils::decode_hex;

const DEFAULT_SUBWALLET_ID: u32 = 698_983_191;
const DEFAULT_TTL_SECS: i64 = 600;
const MAX_MESSAGES: usize = 4;
const DEFAULT_SEND_MODE: u8 = 3;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET_FLAG: u8 = 0x80;
const FRIENDLY_LEN: usize = 36;

const SAFE_SIGN_MAGIC: &[u8] = b"ton-safe-sign-magic";

/// 钱包合约版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TonWalletVersion {
    V3R1,
    V3R2,
    V4R2,
}

impl TonWalletVersion {
    pub fn parse(version: Option<&str>) -> CoreResult<Self> {
        match version.map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("v4r2") => Ok(TonWalletVersion::V4R2),
            Some("v3r2") => Ok(TonWalletVersion::V3R2),
            Some("v3r1") => Ok(TonWalletVersion::V3R1),
            Some(other) => Err(CoreError::invalid_payload(format!(
                "unknown ton wallet version: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TonWalletVersion::V3R1 => "v3r1",
            TonWalletVersion::V3R2 => "v3r2",
            TonWalletVersion::V4R2 => "v4r2",
        }
    }

    /// v4 在 seqno 之后带一个操作码字节
    fn has_op_code(&self) -> bool {
        matches!(self, TonWalletVersion::V4R2)
    }
}

/// CRC16-XMODEM
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// (workchain, 账户哈希) 编码为 bounceable user-friendly 地址
fn encode_friendly(workchain: i8, hash: &[u8; 32], testnet: bool) -> String {
    let mut bytes = Vec::with_capacity(FRIENDLY_LEN);
    let tag = if testnet {
        TAG_BOUNCEABLE | TAG_TESTNET_FLAG
    } else {
        TAG_BOUNCEABLE
    };
    bytes.push(tag);
    bytes.push(workchain as u8);
    bytes.extend_from_slice(hash);
    bytes.extend_from_slice(&crc16(&bytes).to_be_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 解析 user-friendly 或 raw (`0:<hex>`) 地址
fn decode_address(address: &str) -> CoreResult<(i8, [u8; 32])> {
    if let Some((workchain, hash_hex)) = address.split_once(':') {
        let workchain: i8 = workchain
            .parse()
            .map_err(|_| CoreError::invalid_address(format!("ton workchain: {}", address)))?;
        let hash: [u8; 32] = decode_hex(hash_hex)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| CoreError::invalid_address(format!("ton raw address: {}", address)))?;
        return Ok((workchain, hash));
    }

    let normalized = address.replace('+', "-").replace('/', "_");
    let bytes = URL_SAFE_NO_PAD
        .decode(normalized.trim_end_matches('='))
        .map_err(|_| CoreError::invalid_address(format!("ton address not base64: {}", address)))?;
    if bytes.len() != FRIENDLY_LEN {
        return Err(CoreError::invalid_address(format!(
            "ton address must be {} bytes, got {}",
            FRIENDLY_LEN,
            bytes.len()
        )));
    }
    let tag = bytes[0] & !TAG_TESTNET_FLAG;
    if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
        return Err(CoreError::invalid_address(format!("ton address tag: {:#x}", bytes[0])));
    }
    let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
    if crc16(&bytes[..34]) != expected {
        return Err(CoreError::invalid_address(format!("ton address checksum: {}", address)));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[2..34]);
    Ok((bytes[1] as i8, hash))
}

pub struct TonChainApi {
    network_id: NetworkId,
    subwallet_id: u32,
}

impl TonChainApi {
    pub fn new(network_id: NetworkId) -> Self {
        Self {
            network_id,
            subwallet_id: DEFAULT_SUBWALLET_ID,
        }
    }

    fn is_testnet(&self) -> bool {
        self.network_id.chain_id() == "testnet"
    }

    fn account_hash(&self, version: TonWalletVersion, public_key: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(version.as_str().as_bytes());
        hasher.update(self.subwallet_id.to_be_bytes());
        hasher.update(public_key);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        hash
    }

    /// 按钱包版本序列化签名消息
    pub fn serialize_signing_message(
        &self,
        tx: &TonTx,
        version: TonWalletVersion,
    ) -> CoreResult<Vec<u8>> {
        if tx.messages.is_empty() || tx.messages.len() > MAX_MESSAGES {
            return Err(CoreError::invalid_payload(format!(
                "ton transaction carries 1..={} messages, got {}",
                MAX_MESSAGES,
                tx.messages.len()
            )));
        }

        let expire_at = match tx.expire_at {
            Some(expire_at) => expire_at,
            None => (chrono::Utc::now().timestamp() + DEFAULT_TTL_SECS) as u64,
        };
        let expire_at = u32::try_from(expire_at)
            .map_err(|_| CoreError::invalid_payload("expire_at out of range"))?;

        let mut out = Vec::with_capacity(16 + tx.messages.len() * 83);
        out.extend_from_slice(&self.subwallet_id.to_be_bytes());
        out.extend_from_slice(&expire_at.to_be_bytes());
        out.extend_from_slice(&tx.sequence_no.to_be_bytes());
        if version.has_op_code() {
            out.push(0);
        }

        for message in &tx.messages {
            let (workchain, hash) = decode_address(&message.to_address)?;
            let amount: u128 = message.amount.parse().map_err(|_| {
                CoreError::invalid_payload(format!("ton amount: {}", message.amount))
            })?;
            out.push(message.send_mode.unwrap_or(DEFAULT_SEND_MODE));
            out.push(workchain as u8);
            out.extend_from_slice(&hash);
            out.extend_from_slice(&amount.to_be_bytes());
            out.extend_from_slice(&Sha256::digest(message.payload.as_deref().unwrap_or("").as_bytes()));
            out.extend_from_slice(&Sha256::digest(
                message.state_init.as_deref().unwrap_or("").as_bytes(),
            ));
        }
        Ok(out)
    }
}

impl ChainApi for TonChainApi {
    fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    fn get_address_from_public(
        &self,
        public_key_hex: &str,
        account_version: Option<&str>,
    ) -> CoreResult<AddressRecord> {
        let version = TonWalletVersion::parse(account_version)?;
        let public_key = decode_public_key(public_key_hex)?;
        let public_key =
            curve_for(CurveName::Ed25519).transform_public_key(&public_key, PublicKeyForm::Compressed)?;
        let hash = self.account_hash(version, &public_key);
        Ok(AddressRecord {
            address: encode_friendly(0, &hash, self.is_testnet()),
            public_key: hex::encode(public_key),
            path: None,
        })
    }

    /// 规范化为 bounceable user-friendly 形式
    fn validate_address(&self, address: &str) -> CoreResult<String> {
        let (workchain, hash) = decode_address(address)?;
        if workchain != 0 && workchain != -1 {
            return Err(CoreError::invalid_address(format!("ton workchain {}", workchain)));
        }
        Ok(encode_friendly(workchain, &hash, self.is_testnet()))
    }

    /// 合并账户的钱包版本，生成签名消息；过期时间在此固定，签名时可复算
    fn prepare_unsigned_tx(&self, tx: &UnsignedTx, account: &Account) -> CoreResult<UnsignedTx> {
        let EncodedTx::Ton(ton_tx) = &tx.encoded_tx else {
            return Err(CoreError::invalid_payload(format!(
                "expected ton transaction, got {}",
                tx.encoded_tx.kind()
            )));
        };
        let mut pinned = ton_tx.clone();
        pinned.expire_at = Some(
            ton_tx
                .expire_at
                .unwrap_or_else(|| (chrono::Utc::now().timestamp() + DEFAULT_TTL_SECS) as u64),
        );
        let version = TonWalletVersion::parse(account.account_version.as_deref())?;
        let signing_message = self.serialize_signing_message(&pinned, version)?;
        Ok(UnsignedTx {
            encoded_tx: EncodedTx::Ton(pinned),
            raw_tx_unsigned: Some(hex::encode(signing_message)),
        })
    }

    fn sign_transaction(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        tx: &UnsignedTx,
    ) -> CoreResult<SignedTx> {
        let EncodedTx::Ton(ton_tx) = &tx.encoded_tx else {
            return Err(CoreError::invalid_payload(format!(
                "expected ton transaction, got {}",
                tx.encoded_tx.kind()
            )));
        };
        ensure_from_address(self, &ton_tx.from_address, account)?;

        // 签名消息总是由 encoded_tx 复算；预处理结果必须与之逐字节一致
        let version = TonWalletVersion::parse(account.account_version.as_deref())?;
        let signing_message = self.serialize_signing_message(ton_tx, version)?;
        if let Some(raw) = tx.raw_tx_unsigned.as_deref() {
            let prepared = decode_hex(raw)
                .ok_or_else(|| CoreError::invalid_payload("raw_tx_unsigned is not hex"))?;
            if prepared != signing_message {
                return Err(CoreError::invalid_payload(
                    "raw_tx_unsigned does not match the encoded transaction",
                ));
            }
        }

        let private_key = key_for_account(keys, account)?;
        ensure_key_matches_account(CurveName::Ed25519, private_key, account)?;
        let signature = Ed25519.sign(private_key, &Sha256::digest(&signing_message))?;

        let mut raw = signature.bytes.clone();
        raw.extend_from_slice(&signing_message);
        Ok(SignedTx {
            txid: hex::encode(Sha256::digest(&raw)),
            raw_tx: STANDARD.encode(&raw),
            signature: Some(hex::encode(&signature.bytes)),
            encoded_tx: Some(tx.encoded_tx.clone()),
        })
    }

    fn sign_message(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        message: &UnsignedMessage,
    ) -> CoreResult<String> {
        let digest: Vec<u8> = match message.kind {
            MessageKind::Personal => {
                let mut hasher = Sha256::new();
                hasher.update([0xff, 0xff]);
                hasher.update(SAFE_SIGN_MAGIC);
                hasher.update(Sha256::digest(message_bytes(message)?));
                hasher.finalize().to_vec()
            }
            MessageKind::Hash => decode_hash_message(message)?.to_vec(),
            MessageKind::TonSignData => {
                let sign_data = message
                    .ton_sign_data
                    .ok_or_else(|| CoreError::invalid_payload("ton_sign_data is required"))?;
                let mut hasher = Sha256::new();
                hasher.update(sign_data.schema_crc.to_be_bytes());
                hasher.update(sign_data.timestamp.to_be_bytes());
                hasher.update(Sha256::digest(message_bytes(message)?));
                hasher.finalize().to_vec()
            }
        };

        let private_key = key_for_account(keys, account)?;
        ensure_key_matches_account(CurveName::Ed25519, private_key, account)?;
        let signature = Ed25519.sign(private_key, &digest)?;
        Ok(STANDARD.encode(signature.bytes))
    }
}
