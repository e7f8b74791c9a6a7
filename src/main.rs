//! ironkeys 命令行入口
//!
//! 用法:
//!   ironkeys address <network> <public_key_hex> [account_version]
//!   ironkeys validate <network> <address>
//!   ironkeys networks

use anyhow::{bail, Context, Result};
use ironkeys::{
    chains::ChainApiRegistry, config::Config, domain::NetworkId, error_map::user_message,
    infrastructure::logging::init_logging, utils::normalize_network_id,
};

fn usage() -> &'static str {
    "usage:\n  ironkeys address <network> <public_key_hex> [account_version]\n  ironkeys validate <network> <address>\n  ironkeys networks"
}

/// 校验结果的 JSON 输出
fn validated_json(address: &str) -> serde_json::Result<String> {
    serde_json::to_string(&serde_json::json!({ "address": address }))
}

fn main() -> Result<()> {
    // 1. 加载环境变量
    dotenvy::dotenv().ok();

    // 2. 加载配置
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate()?;

    // 3. 初始化日志
    let _log_guard = init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // 4. 构建链注册表
    let registry = ChainApiRegistry::from_network_ids(&config.networks.enabled)
        .context("Failed to build chain registry")?;
    tracing::info!("Chain registry ready: {} networks", registry.len());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(usage());
    };

    match command.as_str() {
        "networks" => {
            for network_id in registry.network_ids() {
                println!("{}", network_id);
            }
        }
        "address" | "validate" => {
            let (Some(network), Some(value)) = (args.get(1), args.get(2)) else {
                bail!(usage());
            };
            let network_id: NetworkId = normalize_network_id(network)
                .with_context(|| format!("Unknown network: {}", network))?
                .parse()?;
            let chain = registry.get(&network_id)?;

            let result = if command == "address" {
                chain
                    .get_address_from_public(value, args.get(3).map(String::as_str))
                    .map(|record| serde_json::to_string_pretty(&record))
            } else {
                chain
                    .validate_address(value)
                    .map(|address| validated_json(&address))
            };

            match result {
                Ok(json) => println!("{}", json?),
                Err(e) => bail!("{} ({})", user_message(e.code()), e),
            }
        }
        other => bail!("unknown command: {}\n{}", other, usage()),
    }

    Ok(())
}
