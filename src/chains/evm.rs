//! EVM 链实现
//!
//! - 地址: keccak256(非压缩公钥[1..]) 后 20 字节，EIP-55 校验和
//! - 交易: legacy / EIP-1559，使用 ethers 签名与 RLP 编码
//! - 消息: EIP-191 personal_sign 或直接签 32 字节哈希

use std::str::FromStr;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, TransactionRequest, H256, U256};
use ethers::utils::{hash_message, to_checksum};
use sha3::{Digest, Keccak256};

use crate::chains::{
    decode_hash_message, decode_public_key, ensure_from_address, ensure_key_matches_account,
    key_for_account, message_bytes, ChainApi,
};
use crate::crypto::{curve_for, CurveName, PrivateKeyMaterial, PrivateKeysMap, PublicKeyForm};
use crate::domain::{
    Account, AddressRecord, EncodedTx, EvmTx, MessageKind, NetworkId, SignedTx, UnsignedMessage,
    UnsignedTx,
};
use crate::error::{CoreError, CoreResult};
use crate::utils::hex_utils::{decode_hex, strip_hex_prefix};

pub struct EvmChainApi {
    network_id: NetworkId,
}

impl EvmChainApi {
    pub fn new(network_id: NetworkId) -> Self {
        Self { network_id }
    }

    fn wallet(&self, private_key: &PrivateKeyMaterial) -> CoreResult<LocalWallet> {
        private_key.ensure_curve(CurveName::Secp256k1)?;
        LocalWallet::from_bytes(private_key.as_bytes())
            .map_err(|e| CoreError::invalid_private_key(format!("evm wallet: {}", e)))
    }

    /// 网络 chainId（非数字的链内 ID 不做校验）
    fn expected_chain_id(&self) -> Option<u64> {
        self.network_id.chain_id().parse().ok()
    }

    fn build_typed_tx(&self, tx: &EvmTx) -> CoreResult<TypedTransaction> {
        if let Some(expected) = self.expected_chain_id() {
            if expected != tx.chain_id {
                return Err(CoreError::invalid_payload(format!(
                    "chain_id {} does not match network {}",
                    tx.chain_id, self.network_id
                )));
            }
        }

        let from = parse_address(&tx.from)?;
        let to = tx.to.as_deref().map(parse_address).transpose()?;
        let value = tx.value.as_deref().map(parse_quantity).transpose()?.unwrap_or_default();
        let data: Bytes = match tx.data.as_deref() {
            Some(data) if !strip_hex_prefix(data).is_empty() => decode_hex(data)
                .ok_or_else(|| CoreError::invalid_payload("data is not hex"))?
                .into(),
            _ => Bytes::default(),
        };

        let typed: TypedTransaction = match tx.max_fee_per_gas.as_deref() {
            Some(max_fee) => {
                let mut request = Eip1559TransactionRequest::new()
                    .from(from)
                    .nonce(tx.nonce)
                    .gas(tx.gas_limit)
                    .value(value)
                    .data(data)
                    .chain_id(tx.chain_id)
                    .max_fee_per_gas(parse_quantity(max_fee)?);
                if let Some(tip) = tx.max_priority_fee_per_gas.as_deref() {
                    request = request.max_priority_fee_per_gas(parse_quantity(tip)?);
                }
                if let Some(to) = to {
                    request = request.to(to);
                }
                request.into()
            }
            None => {
                let gas_price = tx.gas_price.as_deref().ok_or_else(|| {
                    CoreError::invalid_payload("gas_price or max_fee_per_gas is required")
                })?;
                let mut request = TransactionRequest::new()
                    .from(from)
                    .nonce(tx.nonce)
                    .gas(tx.gas_limit)
                    .gas_price(parse_quantity(gas_price)?)
                    .value(value)
                    .data(data)
                    .chain_id(tx.chain_id);
                if let Some(to) = to {
                    request = request.to(to);
                }
                request.into()
            }
        };
        Ok(typed)
    }
}

fn parse_address(address: &str) -> CoreResult<Address> {
    Address::from_str(address)
        .map_err(|_| CoreError::invalid_address(format!("evm address: {}", address)))
}

/// 十进制或 0x 十六进制数量
fn parse_quantity(value: &str) -> CoreResult<U256> {
    let trimmed = value.trim();
    let parsed = if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        U256::from_str_radix(strip_hex_prefix(trimmed), 16).ok()
    } else {
        U256::from_dec_str(trimmed).ok()
    };
    parsed.ok_or_else(|| CoreError::invalid_payload(format!("invalid quantity: {}", value)))
}

/// 公钥（33 或 65 字节）-> 校验和地址
pub fn public_key_to_address(public_key: &[u8]) -> CoreResult<String> {
    let uncompressed =
        curve_for(CurveName::Secp256k1).transform_public_key(public_key, PublicKeyForm::Uncompressed)?;
    let hash = Keccak256::digest(&uncompressed[1..]);
    let address = Address::from_slice(&hash[12..]);
    Ok(to_checksum(&address, None))
}

impl ChainApi for EvmChainApi {
    fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    fn get_address_from_public(
        &self,
        public_key_hex: &str,
        _account_version: Option<&str>,
    ) -> CoreResult<AddressRecord> {
        let public_key = decode_public_key(public_key_hex)?;
        let compressed =
            curve_for(CurveName::Secp256k1).transform_public_key(&public_key, PublicKeyForm::Compressed)?;
        Ok(AddressRecord {
            address: public_key_to_address(&compressed)?,
            public_key: hex::encode(compressed),
            path: None,
        })
    }

    /// 全小写或全大写地址直接接受；大小写混合必须符合 EIP-55
    fn validate_address(&self, address: &str) -> CoreResult<String> {
        let body = address
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::invalid_address(format!("missing 0x prefix: {}", address)))?;
        if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::invalid_address(format!("evm address: {}", address)));
        }

        let parsed = parse_address(address)?;
        let checksummed = to_checksum(&parsed, None);
        let is_mixed_case = body.chars().any(|c| c.is_ascii_uppercase())
            && body.chars().any(|c| c.is_ascii_lowercase());
        if is_mixed_case && checksummed != address {
            return Err(CoreError::invalid_address(format!(
                "EIP-55 checksum mismatch: {}",
                address
            )));
        }
        Ok(checksummed)
    }

    fn sign_transaction(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        tx: &UnsignedTx,
    ) -> CoreResult<SignedTx> {
        let EncodedTx::Evm(evm_tx) = &tx.encoded_tx else {
            return Err(CoreError::invalid_payload(format!(
                "expected evm transaction, got {}",
                tx.encoded_tx.kind()
            )));
        };
        ensure_from_address(self, &evm_tx.from, account)?;
        let typed = self.build_typed_tx(evm_tx)?;

        let private_key = key_for_account(keys, account)?;
        ensure_key_matches_account(CurveName::Secp256k1, private_key, account)?;
        let wallet = self.wallet(private_key)?.with_chain_id(evm_tx.chain_id);

        let signature = wallet
            .sign_transaction_sync(&typed)
            .map_err(|e| CoreError::signing_failed(format!("evm: {}", e)))?;
        let raw = typed.rlp_signed(&signature);
        let txid = H256::from(ethers::utils::keccak256(&raw));

        Ok(SignedTx {
            txid: format!("{:#x}", txid),
            raw_tx: format!("0x{}", hex::encode(&raw)),
            signature: Some(format!("0x{}", hex::encode(signature.to_vec()))),
            encoded_tx: Some(tx.encoded_tx.clone()),
        })
    }

    fn sign_message(
        &self,
        keys: &PrivateKeysMap,
        account: &Account,
        message: &UnsignedMessage,
    ) -> CoreResult<String> {
        let digest = match message.kind {
            MessageKind::Personal => hash_message(message_bytes(message)?),
            MessageKind::Hash => H256::from(decode_hash_message(message)?),
            MessageKind::TonSignData => {
                return Err(CoreError::invalid_payload("ton sign-data is not an evm message"))
            }
        };

        let private_key = key_for_account(keys, account)?;
        ensure_key_matches_account(CurveName::Secp256k1, private_key, account)?;
        let signature = self
            .wallet(private_key)?
            .sign_hash(digest)
            .map_err(|e| CoreError::signing_failed(format!("evm: {}", e)))?;
        Ok(format!("0x{}", hex::encode(signature.to_vec())))
    }
}
