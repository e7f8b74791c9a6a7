//! 十六进制工具

/// 去掉 `0x` / `0X` 前缀
pub fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

/// 非空、偶数长度、全部为十六进制字符
pub fn is_hex_string(input: &str) -> bool {
    !input.is_empty() && input.len() % 2 == 0 && input.chars().all(|c| c.is_ascii_hexdigit())
}

/// 解码 hex（允许前缀），失败返回 None
pub fn decode_hex(input: &str) -> Option<Vec<u8>> {
    let stripped = strip_hex_prefix(input.trim());
    if !is_hex_string(stripped) {
        return None;
    }
    hex::decode(stripped).ok()
}

/// 编码为带 `0x` 前缀的小写 hex
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
