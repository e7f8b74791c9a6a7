//! 网络标识标准化
//!
//! 接受别名（`ETH`、`bitcoin`、`1` 等）或规范 NetworkId（`evm--1`），
//! 统一返回规范 NetworkId 字符串

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// 网络别名配置
#[derive(Debug, Clone)]
pub struct NetworkAlias {
    /// 规范 NetworkId
    pub network_id: &'static str,
    /// 符号（大写）
    pub symbol: &'static str,
    /// 全称
    pub full_name: &'static str,
    /// 别名列表（大小写不敏感）
    pub aliases: &'static [&'static str],
}

/// 别名注册表（静态初始化，只读）
static ALIAS_TABLE: Lazy<HashMap<String, NetworkAlias>> = Lazy::new(|| {
    let networks = vec![
        NetworkAlias {
            network_id: "evm--1",
            symbol: "ETH",
            full_name: "Ethereum Mainnet",
            aliases: &["eth", "ethereum", "1"],
        },
        NetworkAlias {
            network_id: "evm--56",
            symbol: "BNB",
            full_name: "BNB Smart Chain",
            aliases: &["bsc", "binance", "bnb", "56"],
        },
        NetworkAlias {
            network_id: "evm--137",
            symbol: "MATIC",
            full_name: "Polygon",
            aliases: &["polygon", "matic", "137"],
        },
        NetworkAlias {
            network_id: "evm--42161",
            symbol: "ETH",
            full_name: "Arbitrum One",
            aliases: &["arbitrum", "arb", "42161"],
        },
        NetworkAlias {
            network_id: "btc--0",
            symbol: "BTC",
            full_name: "Bitcoin",
            aliases: &["btc", "bitcoin"],
        },
        NetworkAlias {
            network_id: "sol--101",
            symbol: "SOL",
            full_name: "Solana",
            aliases: &["sol", "solana", "501"],
        },
        NetworkAlias {
            network_id: "ton--mainnet",
            symbol: "TON",
            full_name: "The Open Network",
            aliases: &["ton", "607"],
        },
        NetworkAlias {
            network_id: "scdo--main",
            symbol: "SCDO",
            full_name: "SCDO",
            aliases: &["scdo"],
        },
        NetworkAlias {
            network_id: "ada--0",
            symbol: "ADA",
            full_name: "Cardano",
            aliases: &["ada", "cardano", "1815"],
        },
    ];

    let mut table = HashMap::new();
    for network in networks {
        table.insert(network.network_id.to_string(), network.clone());
        for alias in network.aliases {
            table.insert(alias.to_ascii_lowercase(), network.clone());
        }
    }
    table
});

/// 标准化网络标识
///
/// 已是 `<impl>--<chainId>` 形式的输入原样返回（不要求在别名表中），
/// 否则按别名查表
pub fn normalize_network_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some((prefix, chain_id)) = trimmed.split_once("--") {
        if !prefix.is_empty() && !chain_id.is_empty() {
            return Some(format!("{}--{}", prefix.to_ascii_lowercase(), chain_id));
        }
        return None;
    }
    ALIAS_TABLE
        .get(&trimmed.to_ascii_lowercase())
        .map(|network| network.network_id.to_string())
}

/// 查询别名配置
pub fn lookup(input: &str) -> Option<&'static NetworkAlias> {
    ALIAS_TABLE.get(&input.trim().to_ascii_lowercase())
}

/// 网络符号
pub fn network_symbol(input: &str) -> Option<&'static str> {
    lookup(input).map(|network| network.symbol)
}
