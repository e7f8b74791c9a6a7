//! Cardano 链实现
//!
//! - 地址: enterprise 地址，header || blake2b-224(pubkey)，bech32 (`addr` / `addr_test`)
//! - 交易: ed25519 签 blake2b-256(交易体)，输出带 vkey 见证的完整 CBOR 交易
//! - 消息签名尚未支持

use bech32::{Bech32, Hrp};
use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};

use crate::chains::{
    decode_public_key, ensure_from_address, ensure_key_matches_account, key_for_account, ChainApi,
};
use crate::crypto::ed25519::Ed25519;
use crate::crypto::{curve_for, Curve, CurveName, PrivateKeysMap, PublicKeyForm};
use crate::domain::{
    Account, AddressRecord, EncodedTx, NetworkId, SignedTx, UnsignedMessage, UnsignedTx,
};
use crate::error::{CoreError, CoreResult};
use crate::utils::hex_utils::decode_hex;

type Blake2b224 = Blake2b<U28>;
type Blake2b256 = Blake2b<U32>;

const ENTERPRISE_HEADER: u8 = 0x60;
const KEY_HASH_LEN: usize = 28;

pub struct AdaChainApi {
    network_id: NetworkId,
    /// 1 = mainnet, 0 = testnet
    network_tag: u8,
}

impl AdaChainApi {
    pub fn new(network_id: NetworkId) -> Self {
        let network_tag = match network_id.chain_id() {
            "preprod" | "preview" | "testnet" => 0,
            _ => 1,
        };
        Self {
            network_id,
            network_tag,
        }
    }

    fn hrp(&self) -> &'static str {
        if self.network_tag == 1 {
            "addr"
        } else {
            "addr_test"
        }
    }

    fn encode_address(&self, key_hash: &[u8]) -> CoreResult<String> {
        let hrp = Hrp::parse(self.hrp())
            .map_err(|e| CoreError::invalid_address(format!("hrp: {}", e)))?;
        let mut data = Vec::with_capacity(1 + KEY_HASH_LEN);
        data.push(ENTERPRISE_HEADER | self.network_tag);
        data.extend_from_slice(key_hash);
        bech32::encode::<Bech32>(hrp, &data)
            .map_err(|e| CoreError::invalid_address(format!("bech32: {}", e)))
    }
}

/// CBOR 字节串头（长度 < 65536）
fn cbor_bytes_header(out: &mut Vec<u8>, len: usize) {
    match len {
        0..=23 => out.push(0x40 | len as u8),
        24..=0xff => {
            out.push(0x58);
            out.push(len as u8);
        }
        _ => {
            out.push(0x59);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
    }
}

/// `[body, {0: [[vkey, signature]]}, true, null]`
fn assemble_signed_tx(body: &[u8], public_key: &[u8], signature: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 110);
    out.push(0x84);
    out.extend_from_slice(body);
    out.extend_from_slice(&[0xa1, 0x00, 0x81, 0x82]);
    cbor_bytes_header(&mut out, public_key.len());
    out.extend_from_slice(public_key);
    cbor_bytes_header(&mut out, signature.len());
    out.extend_from_slice(signature);
    out.push(0xf5);
    out.push(0xf6);
    out
}

impl ChainApi for AdaChainApi {
    fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    fn get_address_from_public(
        &self,
        public_key_hex: &str,
        _account_version: Option<&str>,
    ) -> CoreResult<AddressRecord> {
        let public_key = decode_public_key(public_key_hex)?;
        let public_key =
            curve_for(CurveName::Ed25519).transform_public_key(&public_key, PublicKeyForm::Compressed)?;
        let key_hash = Blake2b224::digest(&public_key);
        Ok(AddressRecord {
            address: self.encode_address(&key_hash)?,
            public_key: hex::encode(public_key),
            path: None,
        })
    }

    fn validate_address(&self, address: &str) -> CoreResult<String> {
        let (hrp, data) = bech32::decode(address)
            .map_err(|e| CoreError::invalid_address(format!("{}: {}", address, e)))?;
        if hrp.as_str() != self.hrp() {
            return Err(CoreError::invalid_address(format!(
                "expected {} prefix: {}",
                self.hrp(),
                address
            )));
        }
        match data.first() {
            Some(header) if header & 0x0f == self.network_tag => {}
            _ => return Err(CoreError::invalid_address(format!("network mismatch: {}", address))),
        }
        Ok(address.to_ascii_lowercase())
    }

    fn sign_transaction(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        tx: &UnsignedTx,
    ) -> CoreResult<SignedTx> {
        let EncodedTx::Ada(ada_tx) = &tx.encoded_tx else {
            return Err(CoreError::invalid_payload(format!(
                "expected ada transaction, got {}",
                tx.encoded_tx.kind()
            )));
        };
        ensure_from_address(self, &ada_tx.change_address, account)?;
        let body = decode_hex(&ada_tx.body)
            .ok_or_else(|| CoreError::invalid_payload("ada body is not hex"))?;
        // 交易体必须是 CBOR map
        if body.first().map(|b| b >> 5) != Some(5) {
            return Err(CoreError::invalid_payload("ada body is not a CBOR map"));
        }

        let tx_hash = Blake2b256::digest(&body);
        let private_key = key_for_account(keys, account)?;
        let public_key = ensure_key_matches_account(CurveName::Ed25519, private_key, account)?;
        let signature = Ed25519.sign(private_key, &tx_hash)?;

        Ok(SignedTx {
            txid: hex::encode(tx_hash),
            raw_tx: hex::encode(assemble_signed_tx(&body, &public_key, &signature.bytes)),
            signature: Some(hex::encode(&signature.bytes)),
            encoded_tx: Some(tx.encoded_tx.clone()),
        })
    }

    fn sign_message(
        &self,
        _keys: &PrivateKeysMap,
        _account: &Account,
        _message: &UnsignedMessage,
    ) -> CoreResult<String> {
        Err(CoreError::not_implemented("ada sign_message"))
    }
}
