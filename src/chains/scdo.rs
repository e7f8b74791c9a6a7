//! SCDO 链实现
//!
//! secp256k1 曲线，地址带分片号：
//! 非压缩公钥去掉格式字节 -> RLP -> keccak256 -> 取后 20 字节，
//! 首字节写分片号，末字节低 4 位写 1，渲染为 `1S<hex>`。
//! 交易与消息签名尚未支持。

use sha3::{Digest, Keccak256};

use crate::chains::{decode_public_key, ChainApi};
use crate::crypto::{curve_for, CurveName, PrivateKeysMap, PublicKeyForm};
use crate::domain::{Account, AddressRecord, NetworkId, SignedTx, UnsignedMessage, UnsignedTx};
use crate::error::{CoreError, CoreResult};

const SHARD: u8 = 1;
const ADDRESS_LEN: usize = 20;

pub struct ScdoChainApi {
    network_id: NetworkId,
}

impl ScdoChainApi {
    pub fn new(network_id: NetworkId) -> Self {
        Self { network_id }
    }
}

/// 公钥（33 或 65 字节）-> SCDO 地址
pub fn public_key_to_address(public_key: &[u8]) -> CoreResult<String> {
    let uncompressed =
        curve_for(CurveName::Secp256k1).transform_public_key(public_key, PublicKeyForm::Uncompressed)?;
    let encoded = rlp::encode(&uncompressed[1..].to_vec());
    let hash = Keccak256::digest(&encoded);

    let mut address = [0u8; ADDRESS_LEN];
    address.copy_from_slice(&hash[hash.len() - ADDRESS_LEN..]);
    address[0] = SHARD;
    address[ADDRESS_LEN - 1] = (address[ADDRESS_LEN - 1] & 0xf0) | 1;
    Ok(format!("{}S{}", SHARD, hex::encode(address)))
}

impl ChainApi for ScdoChainApi {
    fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    fn get_address_from_public(
        &self,
        public_key_hex: &str,
        _account_version: Option<&str>,
    ) -> CoreResult<AddressRecord> {
        let public_key = decode_public_key(public_key_hex)?;
        Ok(AddressRecord {
            address: public_key_to_address(&public_key)?,
            public_key: hex::encode(&public_key),
            path: None,
        })
    }

    fn validate_address(&self, address: &str) -> CoreResult<String> {
        let body = address
            .strip_prefix(&format!("{}S", SHARD))
            .ok_or_else(|| CoreError::invalid_address(format!("scdo prefix: {}", address)))?;
        let bytes = hex::decode(body)
            .map_err(|_| CoreError::invalid_address(format!("scdo hex: {}", address)))?;
        if bytes.len() != ADDRESS_LEN {
            return Err(CoreError::invalid_address(format!(
                "scdo address must be {} bytes, got {}",
                ADDRESS_LEN,
                bytes.len()
            )));
        }
        if bytes[0] != SHARD {
            return Err(CoreError::invalid_address(format!("scdo shard byte: {}", bytes[0])));
        }
        if bytes[ADDRESS_LEN - 1] & 0x0f != 1 {
            return Err(CoreError::invalid_address("scdo version nibble"));
        }
        Ok(format!("{}S{}", SHARD, hex::encode(bytes)))
    }

    fn sign_transaction(
        &self,
        _keys: &PrivateKeysMap,
        _account: &Account,
        _tx: &UnsignedTx,
    ) -> CoreResult<SignedTx> {
        Err(CoreError::not_implemented("scdo sign_transaction"))
    }

    fn sign_message(
        &self,
        _keys: &PrivateKeysMap,
        _account: &Account,
        _message: &UnsignedMessage,
    ) -> CoreResult<String> {
        Err(CoreError::not_implemented("scdo sign_message"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::test_support::imported_account;

    fn chain() -> ScdoChainApi {
        ScdoChainApi::new("scdo--main".parse().unwrap())
    }

    #[test]
    fn test_rlp_prefix_for_64_byte_key() {
        let encoded = rlp::encode(&vec![0u8; 64]);
        assert_eq!(&encoded[..2], &[0xb8, 0x40]);
        assert_eq!(encoded.len(), 66);
    }

    #[test]
    fn test_compressed_key_gives_shard_address() {
        let curve = curve_for(CurveName::Secp256k1);
        // 找一个 0x03 开头的压缩公钥
        let (private_key, compressed) = (1u8..=255)
            .map(|b| crate::crypto::PrivateKeyMaterial::new(vec![b; 32]))
            .map(|k| {
                let public_key = curve.public_from_private(&k).unwrap();
                (k, public_key)
            })
            .find(|(_, public_key)| public_key[0] == 0x03)
            .unwrap();

        let record = chain()
            .get_address_from_public(&hex::encode(&compressed), None)
            .unwrap();
        assert!(record.address.starts_with("1S"));
        assert_eq!(record.address.len(), 2 + 40);
        assert!(record.address[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(record.address[2..].starts_with("01"));
        assert!(record.address.ends_with('1'));
        assert_eq!(chain().validate_address(&record.address).unwrap(), record.address);

        // 非压缩公钥结果一致
        let uncompressed = curve
            .transform_public_key(&compressed, PublicKeyForm::Uncompressed)
            .unwrap();
        let again = chain()
            .get_address_from_public(&hex::encode(uncompressed), None)
            .unwrap();
        assert_eq!(again.address, record.address);

        // 私钥路径
        let from_private = chain()
            .get_address_from_private(&hex::encode(private_key.as_bytes()), None)
            .unwrap();
        assert_eq!(from_private.address, record.address);
    }

    #[test]
    fn test_address_matches_manual_codec() {
        let curve = curve_for(CurveName::Secp256k1);
        let key = crate::crypto::PrivateKeyMaterial::new(vec![0x07; 32]);
        let uncompressed = curve
            .transform_public_key(&curve.public_from_private(&key).unwrap(), PublicKeyForm::Uncompressed)
            .unwrap();

        let mut encoded = vec![0xb8, 0x40];
        encoded.extend_from_slice(&uncompressed[1..]);
        let hash = Keccak256::digest(&encoded);
        let mut expected = hash[12..].to_vec();
        expected[0] = 1;
        expected[19] = (expected[19] & 0xf0) | 1;

        let record = chain()
            .get_address_from_public(&hex::encode(&uncompressed), None)
            .unwrap();
        assert_eq!(record.address, format!("1S{}", hex::encode(expected)));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let api = chain();
        assert!(matches!(
            api.get_address_from_public(&hex::encode([2u8; 20]), None).unwrap_err(),
            CoreError::InvalidPublicKey(_)
        ));
        assert!(matches!(
            api.get_address_from_private("not-hex", None).unwrap_err(),
            CoreError::InvalidPrivateKey(_)
        ));
        assert!(api.validate_address("2S0100000000000000000000000000000000000001").is_err());
        assert!(api.validate_address("1S0200000000000000000000000000000000000001").is_err());
        assert!(api.validate_address("1S0100000000000000000000000000000000000002").is_err());
        assert!(api.validate_address("1S01").is_err());
        assert!(api.validate_address("1S0100000000000000000000000000000000000001").is_ok());
    }

    #[test]
    fn test_signing_not_implemented() {
        let api = chain();
        let (account, keys) = imported_account(&api, 0x07, None);
        let err = api
            .sign_message(&keys, &account, &UnsignedMessage::personal("hi"))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotImplemented(_)));
        let tx = UnsignedTx::new(crate::domain::EncodedTx::Raw { hex: "00".into() });
        let err = api.sign_transaction(&keys, &account, &tx).unwrap_err();
        assert!(matches!(err, CoreError::NotImplemented(_)));
    }
}
