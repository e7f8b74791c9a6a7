//! Solana 链实现
//!
//! 地址为 base58(ed25519 公钥)。交易签名对象是已序列化的 message，
//! 输出 base58 编码的线格式交易（签名数组 + message）。

use zeroize::Zeroizing;

use crate::chains::{
    decode_public_key, ensure_key_matches_account, key_for_account, message_bytes, ChainApi,
};
use crate::crypto::ed25519::{Ed25519, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::crypto::{curve_for, Curve, CurveName, PrivateKeyMaterial, PrivateKeysMap, PublicKeyForm};
use crate::domain::{
    Account, AddressRecord, EncodedTx, MessageKind, NetworkId, SignedTx, UnsignedMessage,
    UnsignedTx,
};
use crate::error::{CoreError, CoreResult};

const VERSIONED_MESSAGE_FLAG: u8 = 0x80;

pub struct SolChainApi {
    network_id: NetworkId,
}

/// 解析后的 message 头部
#[derive(Debug)]
struct MessageHeader {
    num_required_signatures: usize,
    signer_keys: Vec<[u8; 32]>,
}

impl SolChainApi {
    pub fn new(network_id: NetworkId) -> Self {
        Self { network_id }
    }
}

/// compact-u16 解码，返回 (值, 占用字节数)
fn decode_short_vec_len(bytes: &[u8]) -> CoreResult<(usize, usize)> {
    let mut value = 0usize;
    for (i, byte) in bytes.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CoreError::invalid_payload("malformed compact-u16"))
}

fn encode_short_vec_len(out: &mut Vec<u8>, mut value: usize) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

fn parse_header(message: &[u8]) -> CoreResult<MessageHeader> {
    let mut offset = 0;
    if message.first().is_some_and(|b| b & VERSIONED_MESSAGE_FLAG != 0) {
        offset += 1;
    }
    let header = message
        .get(offset..offset + 3)
        .ok_or_else(|| CoreError::invalid_payload("solana message too short"))?;
    let num_required_signatures = header[0] as usize;
    offset += 3;

    let (num_keys, used) = decode_short_vec_len(&message[offset..])?;
    offset += used;
    if num_required_signatures == 0 || num_required_signatures > num_keys {
        return Err(CoreError::invalid_payload("invalid solana signer count"));
    }

    let signer_keys = (0..num_required_signatures)
        .map(|i| {
            let start = offset + i * PUBLIC_KEY_LEN;
            message
                .get(start..start + PUBLIC_KEY_LEN)
                .and_then(|slice| slice.try_into().ok())
                .ok_or_else(|| CoreError::invalid_payload("solana account keys truncated"))
        })
        .collect::<CoreResult<Vec<[u8; 32]>>>()?;

    Ok(MessageHeader {
        num_required_signatures,
        signer_keys,
    })
}

fn decode_base58(value: &str, what: &str) -> CoreResult<Vec<u8>> {
    bs58::decode(value)
        .into_vec()
        .map_err(|e| CoreError::invalid_payload(format!("{} is not base58: {}", what, e)))
}

impl ChainApi for SolChainApi {
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
        Ok(AddressRecord {
            address: bs58::encode(&public_key).into_string(),
            public_key: hex::encode(public_key),
            path: None,
        })
    }

    /// 32 字节 base58；不要求落在曲线上（PDA 也是合法地址）
    fn validate_address(&self, address: &str) -> CoreResult<String> {
        let bytes = bs58::decode(address)
            .into_vec()
            .map_err(|_| CoreError::invalid_address(format!("not base58: {}", address)))?;
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(CoreError::invalid_address(format!(
                "solana address must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(bs58::encode(bytes).into_string())
    }

    /// base58(私钥种子 32 字节 || 公钥 32 字节)
    fn export_private_key(&self, private_key: &PrivateKeyMaterial) -> CoreResult<Zeroizing<String>> {
        let public_key = Ed25519.public_from_private(private_key)?;
        let mut keypair = Zeroizing::new(Vec::with_capacity(64));
        keypair.extend_from_slice(private_key.as_bytes());
        keypair.extend_from_slice(&public_key);
        Ok(Zeroizing::new(bs58::encode(keypair.as_slice()).into_string()))
    }

    fn sign_transaction(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        tx: &UnsignedTx,
    ) -> CoreResult<SignedTx> {
        let EncodedTx::Sol(sol_tx) = &tx.encoded_tx else {
            return Err(CoreError::invalid_payload(format!(
                "expected sol transaction, got {}",
                tx.encoded_tx.kind()
            )));
        };
        let fee_payer = self.validate_address(&sol_tx.fee_payer)?;
        let message = decode_base58(&sol_tx.message, "message")?;
        let header = parse_header(&message)?;

        let fee_payer_bytes = decode_base58(&fee_payer, "fee payer")?;
        if header.signer_keys[0].as_slice() != fee_payer_bytes.as_slice() {
            return Err(CoreError::invalid_payload("fee payer is not the first signer"));
        }
        let own_key = decode_public_key(&account.public_key)?;
        let signer_index = header
            .signer_keys
            .iter()
            .position(|key| key.as_slice() == own_key.as_slice())
            .ok_or_else(|| {
                CoreError::invalid_payload(format!("account {} is not a signer", account.address))
            })?;

        let private_key = key_for_account(keys, account)?;
        ensure_key_matches_account(CurveName::Ed25519, private_key, account)?;
        let signature = Ed25519.sign(private_key, &message)?;

        // 其他签名者的位置留空
        let mut wire = Vec::with_capacity(1 + header.num_required_signatures * SIGNATURE_LEN + message.len());
        encode_short_vec_len(&mut wire, header.num_required_signatures);
        for index in 0..header.num_required_signatures {
            if index == signer_index {
                wire.extend_from_slice(&signature.bytes);
            } else {
                wire.extend_from_slice(&[0u8; SIGNATURE_LEN]);
            }
        }
        wire.extend_from_slice(&message);

        let signature_b58 = bs58::encode(&signature.bytes).into_string();
        Ok(SignedTx {
            // 交易ID 即首个签名
            txid: if signer_index == 0 {
                signature_b58.clone()
            } else {
                String::new()
            },
            raw_tx: bs58::encode(wire).into_string(),
            signature: Some(signature_b58),
            encoded_tx: Some(tx.encoded_tx.clone()),
        })
    }

    fn sign_message(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        message: &UnsignedMessage,
    ) -> CoreResult<String> {
        if message.kind == MessageKind::TonSignData {
            return Err(CoreError::invalid_payload("ton sign-data is not a solana message"));
        }
        let bytes = message_bytes(message)?;
        let private_key = key_for_account(keys, account)?;
        ensure_key_matches_account(CurveName::Ed25519, private_key, account)?;
        let signature = Ed25519.sign(private_key, &bytes)?;
        Ok(bs58::encode(signature.bytes).into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::test_support::{imported_account, MNEMONIC};
    use crate::crypto::SeedMaterial;
    use crate::domain::{HdDerivationQuery, SolTx};

    fn chain() -> SolChainApi {
        SolChainApi::new("sol--101".parse().unwrap())
    }

    /// 最小 legacy message：header + 账户列表 + blockhash + 0 指令
    fn message_with_signers(signers: &[Vec<u8>], readonly: usize) -> Vec<u8> {
        let mut message = vec![signers.len() as u8, 0, readonly as u8];
        encode_short_vec_len(&mut message, signers.len() + readonly);
        for key in signers {
            message.extend_from_slice(key);
        }
        for _ in 0..readonly {
            message.extend_from_slice(&[0u8; 32]);
        }
        message.extend_from_slice(&[7u8; 32]);
        encode_short_vec_len(&mut message, 0);
        message
    }

    #[test]
    fn test_phantom_compatible_derivation() {
        let seed = SeedMaterial::from_mnemonic(MNEMONIC, "").unwrap();
        let query = HdDerivationQuery {
            network_id: "sol--101".parse().unwrap(),
            paths: vec!["m/44'/501'/0'/0'".to_string(), "m/44'/501'/1'/0'".to_string()],
            curve: CurveName::Ed25519,
        };
        let records = chain().get_addresses_from_hd(&seed, &query, None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, "HAgk14JpMQLgt6rVgv7cBQFJWFto5Dqxi472uT3DKpqk");
        assert_ne!(records[0].address, records[1].address);
    }

    #[test]
    fn test_hd_rejects_wrong_curve_and_soft_paths() {
        let seed = SeedMaterial::from_mnemonic(MNEMONIC, "").unwrap();
        let mut query = HdDerivationQuery {
            network_id: "sol--101".parse().unwrap(),
            paths: vec!["m/44'/501'/0'/0'".to_string()],
            curve: CurveName::Secp256k1,
        };
        let err = chain().get_addresses_from_hd(&seed, &query, None).unwrap_err();
        assert!(matches!(err, CoreError::DerivationError(_)));

        query.curve = CurveName::Ed25519;
        query.paths = vec!["m/44'/501'/0'/0".to_string()];
        let err = chain().get_addresses_from_hd(&seed, &query, None).unwrap_err();
        assert!(matches!(err, CoreError::DerivationError(_)));
    }

    #[test]
    fn test_validate_address() {
        let api = chain();
        assert!(api.validate_address("11111111111111111111111111111111").is_ok());
        assert!(api.validate_address("0OIl").is_err());
        assert!(api.validate_address("3yZe7d").is_err());
    }

    #[test]
    fn test_export_keypair() {
        let api = chain();
        let (_, keys) = imported_account(&api, 0x05, None);
        let exported = api.export_private_key(keys.values().next().unwrap()).unwrap();
        let bytes = bs58::decode(exported.as_str()).into_vec().unwrap();
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[..32], &[0x05; 32]);
    }

    #[test]
    fn test_sign_transaction_produces_wire_format() {
        let api = chain();
        let (account, keys) = imported_account(&api, 0x05, None);
        let own = hex::decode(&account.public_key).unwrap();
        let message = message_with_signers(&[own.clone()], 1);
        let tx = UnsignedTx::new(EncodedTx::Sol(SolTx {
            fee_payer: account.address.clone(),
            message: bs58::encode(&message).into_string(),
        }));

        let signed = api.sign_transaction(&keys, &account, &tx).unwrap();
        let wire = bs58::decode(&signed.raw_tx).into_vec().unwrap();
        assert_eq!(wire[0], 1);
        assert_eq!(&wire[1 + 64..], message.as_slice());
        assert!(Ed25519.verify(&own, &message, &wire[1..65]).unwrap());
        assert_eq!(Some(signed.txid.clone()), signed.signature);
    }

    #[test]
    fn test_sign_transaction_leaves_other_signer_slots_empty() {
        let api = chain();
        let (account, keys) = imported_account(&api, 0x05, None);
        let own = hex::decode(&account.public_key).unwrap();
        let payer = vec![9u8; 32];
        let message = message_with_signers(&[payer.clone(), own], 0);
        let tx = UnsignedTx::new(EncodedTx::Sol(SolTx {
            fee_payer: bs58::encode(&payer).into_string(),
            message: bs58::encode(&message).into_string(),
        }));

        let signed = api.sign_transaction(&keys, &account, &tx).unwrap();
        let wire = bs58::decode(&signed.raw_tx).into_vec().unwrap();
        assert_eq!(wire[0], 2);
        assert_eq!(&wire[1..65], &[0u8; 64]);
        assert!(signed.txid.is_empty());
    }

    #[test]
    fn test_sign_transaction_requires_account_as_signer() {
        let api = chain();
        let (account, keys) = imported_account(&api, 0x05, None);
        let payer = vec![9u8; 32];
        let message = message_with_signers(&[payer.clone()], 0);
        let tx = UnsignedTx::new(EncodedTx::Sol(SolTx {
            fee_payer: bs58::encode(&payer).into_string(),
            message: bs58::encode(&message).into_string(),
        }));
        let err = api.sign_transaction(&keys, &account, &tx).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload(_)));
    }

    #[test]
    fn test_sign_message() {
        let api = chain();
        let (account, keys) = imported_account(&api, 0x05, None);
        let signed = api
            .sign_message(&keys, &account, &UnsignedMessage::personal("hello solana"))
            .unwrap();
        let signature = bs58::decode(signed).into_vec().unwrap();
        let own = hex::decode(&account.public_key).unwrap();
        assert!(Ed25519.verify(&own, b"hello solana", &signature).unwrap());
    }
}
