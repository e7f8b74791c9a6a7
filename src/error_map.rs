use std::collections::HashMap;

use crate::error::CoreErrorCode;

pub fn error_map() -> HashMap<&'static str, &'static str> {
    // 与前端强类型/文案对齐的签名错误映射
    HashMap::from([
        ("invalid_private_key", "私钥格式错误"),
        ("invalid_public_key", "公钥格式错误"),
        ("invalid_address", "地址格式错误"),
        ("invalid_payload", "交易数据不合法"),
        ("derivation_error", "派生路径错误"),
        ("unsupported_operation", "当前账户不支持该操作"),
        ("not_implemented", "该网络暂不支持此操作"),
        ("network_not_supported", "不支持的网络"),
        ("credential_unavailable", "无法获取凭证，请解锁钱包后重试"),
        ("cancelled", "操作已取消"),
        ("user_rejected", "已在硬件设备上拒绝"),
        ("transport_timeout", "硬件设备连接超时"),
        ("signing_failed", "签名失败"),
        ("config", "配置错误"),
    ])
}

/// 获取用户可读文案
pub fn user_message(code: CoreErrorCode) -> &'static str {
    error_map()
        .get(code.as_str())
        .copied()
        .unwrap_or("未知错误")
}
