//! Domain 模块
//!
//! 网络、账户、派生路径与签名载荷

pub mod account;
pub mod derivation_path;
pub mod network;
pub mod payload;

// 重新导出常用类型
pub use account::{Account, KeyringKind};
pub use derivation_path::{DerivationPath, PathTemplate};
pub use network::{ChainImpl, NetworkId};
pub use payload::{
    AddressRecord, AdaTx, BtcInput, BtcOutput, BtcTx, CredentialQuery, EncodedTx, EvmTx,
    HdDerivationQuery, MessageKind, SignedMessage, SignedTx, SolTx, TonMessage, TonSignData,
    TonTx, UnsignedMessage, UnsignedTx,
};
