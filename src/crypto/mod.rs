//! 密码学原语模块
//!
//! 纯函数、无 I/O：曲线运算、HD 派生、秘密材料包装

pub mod curve;
pub mod ed25519;
pub mod hd;
pub mod secp256k1;
pub mod secret;

pub use curve::{curve_for, Curve, CurveName, CurveSignature, PublicKeyForm};
pub use hd::{derive_key_pair, derive_private_key, DerivedKeyPair};
pub use secret::{PrivateKeyMaterial, PrivateKeysMap, SeedMaterial};
