pub mod hex_utils;
pub mod network_normalizer;

pub use hex_utils::{decode_hex, is_hex_string, strip_hex_prefix};
pub use network_normalizer::normalize_network_id;
