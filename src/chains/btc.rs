//! Bitcoin 链实现
//!
//! - 地址: P2WPKH（默认）或 P2TR（账户版本 `p2tr`，BIP-86 密钥路径）
//! - 交易: 逐输入计算 sighash；P2WPKH 使用 ECDSA (DER + sighash 字节)，
//!   P2TR 使用 BIP-340 Schnorr（随机辅助数据，签名不确定）
//! - 消息: Bitcoin Signed Message，base64 可恢复签名
//! - 私钥导出: WIF

use std::str::FromStr;

use base64::Engine;
use bitcoin::absolute::LockTime;
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::secp256k1::{PublicKey as SecpPublicKey, Secp256k1 as SecpContext};
use bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, Network, OutPoint, PrivateKey, PublicKey, ScriptBuf, Sequence, Transaction,
    TxIn, TxOut, Txid, Witness,
};
use zeroize::Zeroizing;

use crate::chains::{
    decode_hash_message, decode_public_key, ensure_from_address, ensure_key_matches_account,
    key_for_account, message_bytes, ChainApi,
};
use crate::crypto::secp256k1::Secp256k1;
use crate::crypto::{curve_for, Curve, CurveName, PrivateKeyMaterial, PrivateKeysMap, PublicKeyForm};
use crate::domain::{
    Account, AddressRecord, BtcTx, EncodedTx, MessageKind, NetworkId, SignedTx, UnsignedMessage,
    UnsignedTx,
};
use crate::error::{CoreError, CoreResult};

const SIGNED_MESSAGE_PREFIX: &[u8] = b"Bitcoin Signed Message:\n";

/// 地址类型（账户版本）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtcAddressType {
    P2wpkh,
    P2tr,
}

impl BtcAddressType {
    pub fn parse(version: Option<&str>) -> CoreResult<Self> {
        match version.map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("p2wpkh") => Ok(BtcAddressType::P2wpkh),
            Some("p2tr") => Ok(BtcAddressType::P2tr),
            Some(other) => Err(CoreError::invalid_payload(format!(
                "unknown btc address type: {}",
                other
            ))),
        }
    }
}

pub struct BtcChainApi {
    network_id: NetworkId,
    network: Network,
}

impl BtcChainApi {
    pub fn new(network_id: NetworkId) -> CoreResult<Self> {
        let network = match network_id.chain_id() {
            "0" | "mainnet" => Network::Bitcoin,
            "1" | "testnet" => Network::Testnet,
            "signet" => Network::Signet,
            "regtest" => Network::Regtest,
            other => {
                return Err(CoreError::network_not_supported(format!(
                    "unknown bitcoin network: {}",
                    other
                )))
            }
        };
        Ok(Self {
            network_id,
            network,
        })
    }

    fn parse_address(&self, address: &str) -> CoreResult<Address> {
        Address::from_str(address)
            .map_err(|e| CoreError::invalid_address(format!("{}: {}", address, e)))?
            .require_network(self.network)
            .map_err(|e| CoreError::invalid_address(format!("{}: {}", address, e)))
    }

    fn address_for(&self, compressed: &[u8], address_type: BtcAddressType) -> CoreResult<Address> {
        let secp_key = SecpPublicKey::from_slice(compressed)
            .map_err(|_| CoreError::invalid_public_key("not a secp256k1 point"))?;
        match address_type {
            BtcAddressType::P2wpkh => Address::p2wpkh(&PublicKey::new(secp_key), self.network)
                .map_err(|e| CoreError::invalid_public_key(format!("p2wpkh: {}", e))),
            BtcAddressType::P2tr => {
                let secp = SecpContext::verification_only();
                let (internal_key, _parity) = secp_key.x_only_public_key();
                Ok(Address::p2tr(&secp, internal_key, None, self.network))
            }
        }
    }

    fn build_transaction(&self, tx: &BtcTx) -> CoreResult<Transaction> {
        let input = tx
            .inputs
            .iter()
            .map(|input| {
                let txid = Txid::from_str(&input.txid)
                    .map_err(|_| CoreError::invalid_payload(format!("invalid txid: {}", input.txid)))?;
                Ok(TxIn {
                    previous_output: OutPoint::new(txid, input.vout),
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                    witness: Witness::new(),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let output = tx
            .outputs
            .iter()
            .map(|output| {
                Ok(TxOut {
                    value: Amount::from_sat(output.value),
                    script_pubkey: self.parse_address(&output.address)?.script_pubkey(),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Transaction {
            version: Version::TWO,
            lock_time: LockTime::from_consensus(tx.lock_time),
            input,
            output,
        })
    }

    /// 计算各输入的见证数据
    fn sign_inputs(
        &self,
        unsigned: &Transaction,
        tx: &BtcTx,
        own_script: &ScriptBuf,
        private_key: &PrivateKeyMaterial,
        public_key: &[u8],
    ) -> CoreResult<Vec<Witness>> {
        let curve = Secp256k1;
        let prevouts: Vec<TxOut> = tx
            .inputs
            .iter()
            .map(|input| TxOut {
                value: Amount::from_sat(input.value),
                script_pubkey: own_script.clone(),
            })
            .collect();

        let mut cache = SighashCache::new(unsigned);
        let mut witnesses = Vec::with_capacity(tx.inputs.len());

        if own_script.is_p2tr() {
            let tweaked = curve.tap_tweak_private_key(private_key)?;
            for index in 0..tx.inputs.len() {
                let sighash = cache
                    .taproot_key_spend_signature_hash(
                        index,
                        &Prevouts::All(&prevouts),
                        TapSighashType::Default,
                    )
                    .map_err(|e| CoreError::signing_failed(format!("taproot sighash: {}", e)))?;
                let signature = curve.sign_schnorr(&tweaked, sighash.as_byte_array())?;
                witnesses.push(Witness::from_slice(&[signature]));
            }
        } else {
            let pubkey = PublicKey::from_slice(public_key)
                .map_err(|_| CoreError::invalid_public_key("not a secp256k1 point"))?;
            let script_code = ScriptBuf::new_p2pkh(&pubkey.pubkey_hash());
            for (index, input) in tx.inputs.iter().enumerate() {
                let sighash = cache
                    .segwit_signature_hash(
                        index,
                        &script_code,
                        Amount::from_sat(input.value),
                        EcdsaSighashType::All,
                    )
                    .map_err(|e| CoreError::signing_failed(format!("segwit sighash: {}", e)))?;
                let signature = curve.sign(private_key, sighash.as_byte_array())?;
                let mut der = curve.signature_to_der(&signature.bytes)?;
                der.push(EcdsaSighashType::All.to_u32() as u8);
                witnesses.push(Witness::from_slice(&[der, public_key.to_vec()]));
            }
        }
        Ok(witnesses)
    }
}

/// Bitcoin varint
/// 金额求和；溢出视为非法载荷
fn checked_total(mut values: impl Iterator<Item = u64>) -> CoreResult<u64> {
    values
        .try_fold(0u64, |acc, v| acc.checked_add(v))
        .ok_or_else(|| CoreError::invalid_payload("btc amount overflow"))
}

fn write_varint(out: &mut Vec<u8>, value: usize) {
    match value {
        0..=0xfc => out.push(value as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
        _ => {
            out.push(0xfe);
            out.extend_from_slice(&(value as u32).to_le_bytes());
        }
    }
}

/// Bitcoin Signed Message 摘要
pub fn signed_message_hash(message: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + message.len() + 10);
    write_varint(&mut data, SIGNED_MESSAGE_PREFIX.len());
    data.extend_from_slice(SIGNED_MESSAGE_PREFIX);
    write_varint(&mut data, message.len());
    data.extend_from_slice(message);
    sha256d::Hash::hash(&data).to_byte_array()
}

impl ChainApi for BtcChainApi {
    fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    fn get_address_from_public(
        &self,
        public_key_hex: &str,
        account_version: Option<&str>,
    ) -> CoreResult<AddressRecord> {
        let address_type = BtcAddressType::parse(account_version)?;
        let public_key = decode_public_key(public_key_hex)?;
        let compressed =
            curve_for(CurveName::Secp256k1).transform_public_key(&public_key, PublicKeyForm::Compressed)?;
        let address = self.address_for(&compressed, address_type)?;
        Ok(AddressRecord {
            address: address.to_string(),
            public_key: hex::encode(compressed),
            path: None,
        })
    }

    fn validate_address(&self, address: &str) -> CoreResult<String> {
        Ok(self.parse_address(address)?.to_string())
    }

    fn export_private_key(&self, private_key: &PrivateKeyMaterial) -> CoreResult<Zeroizing<String>> {
        private_key.ensure_curve(CurveName::Secp256k1)?;
        let wif = PrivateKey::from_slice(private_key.as_bytes(), self.network)
            .map_err(|e| CoreError::invalid_private_key(format!("wif: {}", e)))?;
        Ok(Zeroizing::new(wif.to_wif()))
    }

    fn sign_transaction(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        tx: &UnsignedTx,
    ) -> CoreResult<SignedTx> {
        let EncodedTx::Btc(btc_tx) = &tx.encoded_tx else {
            return Err(CoreError::invalid_payload(format!(
                "expected btc transaction, got {}",
                tx.encoded_tx.kind()
            )));
        };
        if btc_tx.inputs.is_empty() || btc_tx.outputs.is_empty() {
            return Err(CoreError::invalid_payload("btc transaction needs inputs and outputs"));
        }
        for input in &btc_tx.inputs {
            ensure_from_address(self, &input.address, account)?;
        }
        let total_in = checked_total(btc_tx.inputs.iter().map(|i| i.value))?;
        let total_out = checked_total(btc_tx.outputs.iter().map(|o| o.value))?;
        if total_out > total_in {
            return Err(CoreError::invalid_payload(format!(
                "outputs {} exceed inputs {}",
                total_out, total_in
            )));
        }

        let own_script = self.parse_address(&account.address)?.script_pubkey();
        let mut transaction = self.build_transaction(btc_tx)?;

        let private_key = key_for_account(keys, account)?;
        let public_key = ensure_key_matches_account(CurveName::Secp256k1, private_key, account)?;
        let witnesses =
            self.sign_inputs(&transaction, btc_tx, &own_script, private_key, &public_key)?;
        for (input, witness) in transaction.input.iter_mut().zip(witnesses) {
            input.witness = witness;
        }

        Ok(SignedTx {
            txid: transaction.txid().to_string(),
            raw_tx: bitcoin::consensus::encode::serialize_hex(&transaction),
            signature: None,
            encoded_tx: Some(tx.encoded_tx.clone()),
        })
    }

    /// 头字节: P2WPKH 为 39 + recid（BIP-137），其他为 31 + recid（压缩公钥）
    fn sign_message(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        message: &UnsignedMessage,
    ) -> CoreResult<String> {
        let digest = match message.kind {
            MessageKind::Personal => signed_message_hash(&message_bytes(message)?),
            MessageKind::Hash => decode_hash_message(message)?,
            MessageKind::TonSignData => {
                return Err(CoreError::invalid_payload("ton sign-data is not a btc message"))
            }
        };

        let private_key = key_for_account(keys, account)?;
        ensure_key_matches_account(CurveName::Secp256k1, private_key, account)?;
        let signature = Secp256k1.sign(private_key, &digest)?;
        let recovery_id = signature
            .recovery_id
            .ok_or_else(|| CoreError::signing_failed("missing recovery id"))?;

        let header_base = if self.parse_address(&account.address)?.script_pubkey().is_p2wpkh() {
            39
        } else {
            31
        };
        let mut out = Vec::with_capacity(65);
        out.push(header_base + recovery_id);
        out.extend_from_slice(&signature.bytes);
        Ok(base64::engine::general_purpose::STANDARD.encode(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::test_support::{imported_account, MNEMONIC};
    use crate::crypto::SeedMaterial;
    use crate::domain::{BtcInput, BtcOutput, HdDerivationQuery};

    fn chain() -> BtcChainApi {
        BtcChainApi::new("btc--0".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_bip173_p2wpkh_address() {
        let key = format!("{}01", "00".repeat(31));
        let record = chain().get_address_from_private(&key, None).unwrap();
        assert_eq!(record.address, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
        assert_eq!(
            record.public_key,
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    #[test]
    fn test_bip86_taproot_address() {
        let seed = SeedMaterial::from_mnemonic(MNEMONIC, "").unwrap();
        let query = HdDerivationQuery {
            network_id: "btc--0".parse().unwrap(),
            paths: vec!["m/86'/0'/0'/0/0".to_string()],
            curve: CurveName::Secp256k1,
        };
        let records = chain().get_addresses_from_hd(&seed, &query, Some("p2tr")).unwrap();
        assert_eq!(
            records[0].address,
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
    }

    #[test]
    fn test_bip84_first_address() {
        let seed = SeedMaterial::from_mnemonic(MNEMONIC, "").unwrap();
        let query = HdDerivationQuery {
            network_id: "btc--0".parse().unwrap(),
            paths: vec!["m/84'/0'/0'/0/0".to_string()],
            curve: CurveName::Secp256k1,
        };
        let records = chain().get_addresses_from_hd(&seed, &query, None).unwrap();
        assert_eq!(records[0].address, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
        assert_eq!(records[0].path.as_deref(), Some("m/84'/0'/0'/0/0"));
    }

    #[test]
    fn test_validate_address() {
        let api = chain();
        assert!(api.validate_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").is_ok());
        assert!(api.validate_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5").is_err());
        // 测试网地址不属于主网
        assert!(api.validate_address("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx").is_err());
    }

    #[test]
    fn test_export_wif() {
        let key = PrivateKeyMaterial::new(
            [vec![0u8; 31], vec![1u8]].concat(),
        );
        let wif = chain().export_private_key(&key).unwrap();
        assert_eq!(wif.as_str(), "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn");
    }

    fn spend(account: &Account) -> UnsignedTx {
        UnsignedTx::new(EncodedTx::Btc(BtcTx {
            inputs: vec![
                BtcInput {
                    txid: "a".repeat(64),
                    vout: 0,
                    value: 50_000,
                    address: account.address.clone(),
                },
                BtcInput {
                    txid: "b".repeat(64),
                    vout: 1,
                    value: 20_000,
                    address: account.address.clone(),
                },
            ],
            outputs: vec![BtcOutput {
                address: "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".to_string(),
                value: 60_000,
            }],
            lock_time: 0,
        }))
    }

    #[test]
    fn test_p2wpkh_inputs_are_signed_with_ecdsa() {
        let api = chain();
        let (account, keys) = imported_account(&api, 0x21, None);
        let signed = api.sign_transaction(&keys, &account, &spend(&account)).unwrap();

        let raw = hex::decode(&signed.raw_tx).unwrap();
        let decoded: Transaction = bitcoin::consensus::deserialize(&raw).unwrap();
        assert_eq!(decoded.txid().to_string(), signed.txid);
        assert_eq!(decoded.input.len(), 2);

        let public_key = hex::decode(&account.public_key).unwrap();
        let script_code =
            ScriptBuf::new_p2pkh(&PublicKey::from_slice(&public_key).unwrap().pubkey_hash());
        let mut cache = SighashCache::new(&decoded);
        for (index, value) in [50_000u64, 20_000].into_iter().enumerate() {
            let witness: Vec<Vec<u8>> = decoded.input[index].witness.to_vec();
            assert_eq!(witness.len(), 2);
            assert_eq!(witness[1], public_key);
            let der = &witness[0];
            assert_eq!(*der.last().unwrap(), 0x01);
            let signature = k256::ecdsa::Signature::from_der(&der[..der.len() - 1]).unwrap();

            let sighash = cache
                .segwit_signature_hash(index, &script_code, Amount::from_sat(value), EcdsaSighashType::All)
                .unwrap();
            assert!(Secp256k1
                .verify(&public_key, sighash.as_byte_array(), &signature.to_bytes())
                .unwrap());
        }

        // ECDSA 确定性
        let again = api.sign_transaction(&keys, &account, &spend(&account)).unwrap();
        assert_eq!(again.raw_tx, signed.raw_tx);
    }

    #[test]
    fn test_amount_overflow_is_rejected() {
        let api = chain();
        let (account, keys) = imported_account(&api, 0x21, None);
        let mut tx = spend(&account);
        if let EncodedTx::Btc(btc_tx) = &mut tx.encoded_tx {
            btc_tx.inputs[0].value = u64::MAX;
            btc_tx.inputs[1].value = 2;
        }
        let err = api.sign_transaction(&keys, &account, &tx).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload(_)));

        let mut tx = spend(&account);
        if let EncodedTx::Btc(btc_tx) = &mut tx.encoded_tx {
            btc_tx.outputs.push(BtcOutput {
                address: "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".to_string(),
                value: u64::MAX,
            });
        }
        let err = api.sign_transaction(&keys, &account, &tx).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload(_)));
    }

    #[test]
    fn test_p2tr_inputs_are_signed_with_schnorr() {
        let api = chain();
        let (account, keys) = imported_account(&api, 0x21, Some("p2tr"));
        assert!(account.address.starts_with("bc1p"));

        let signed = api.sign_transaction(&keys, &account, &spend(&account)).unwrap();
        let again = api.sign_transaction(&keys, &account, &spend(&account)).unwrap();
        // Schnorr 辅助随机数使签名不同，但 txid 不含见证
        assert_ne!(again.raw_tx, signed.raw_tx);
        assert_eq!(again.txid, signed.txid);

        let raw = hex::decode(&signed.raw_tx).unwrap();
        let decoded: Transaction = bitcoin::consensus::deserialize(&raw).unwrap();
        let own_script = api.parse_address(&account.address).unwrap().script_pubkey();
        let output_key = &own_script.as_bytes()[2..];
        let prevouts = vec![
            TxOut { value: Amount::from_sat(50_000), script_pubkey: own_script.clone() },
            TxOut { value: Amount::from_sat(20_000), script_pubkey: own_script.clone() },
        ];
        let mut cache = SighashCache::new(&decoded);
        for index in 0..2 {
            let witness = decoded.input[index].witness.to_vec();
            assert_eq!(witness.len(), 1);
            assert_eq!(witness[0].len(), 64);
            let sighash = cache
                .taproot_key_spend_signature_hash(index, &Prevouts::All(&prevouts), TapSighashType::Default)
                .unwrap();
            assert!(Secp256k1
                .verify_schnorr(output_key, sighash.as_byte_array(), &witness[0])
                .unwrap());
        }
    }

    #[test]
    fn test_rejects_foreign_inputs_and_overspend() {
        let api = chain();
        let (account, keys) = imported_account(&api, 0x21, None);

        let mut tx = spend(&account);
        if let EncodedTx::Btc(btc) = &mut tx.encoded_tx {
            btc.inputs[1].address = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".to_string();
        }
        let err = api.sign_transaction(&keys, &account, &tx).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload(_)));

        let mut tx = spend(&account);
        if let EncodedTx::Btc(btc) = &mut tx.encoded_tx {
            btc.outputs[0].value = 1_000_000;
        }
        let err = api.sign_transaction(&keys, &account, &tx).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload(_)));
    }

    #[test]
    fn test_signed_message_recovers_to_signer() {
        let api = chain();
        let (account, keys) = imported_account(&api, 0x21, None);
        let encoded = api
            .sign_message(&keys, &account, &UnsignedMessage::personal("hello bitcoin"))
            .unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(bytes.len(), 65);
        let recovery_id = bytes[0] - 39;
        assert!(recovery_id < 4);

        let digest = signed_message_hash(b"hello bitcoin");
        let recovered = Secp256k1
            .recover_public_key(&digest, &bytes[1..], recovery_id)
            .unwrap();
        assert_eq!(hex::encode(recovered), account.public_key);
    }
}
