//! # 泛型依赖注入演示程序
//!
//! 装配示例容器，然后解析命令行给出的类型键。

use anyhow::Context;
use clap::Parser;
use di_abstractions::{DiContainer, ServiceResolver, TypeKey};
use di_impl::Container;
use generic_di_demo::configure_samples;
use infrastructure_common::ContainerConfig;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "generic-di-demo")]
#[command(about = "解析开放泛型服务的演示程序")]
struct Args {
    /// 容器配置文件路径（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 以 JSON 格式输出日志和解析结果
    #[arg(long)]
    json: bool,

    /// 要解析的类型键，例如 `IGenericService<int>`
    keys: Vec<String>,
}

/// 单个类型键的解析结果
#[derive(Debug, Serialize)]
struct ResolutionReport {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    implementation: Option<TypeKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

const DEFAULT_KEYS: [&str; 5] = [
    "ISampleService",
    "IGenericService<int>",
    "IGenericService<float>",
    "GenericCaller<int>",
    "IMoreInTypeService<int>",
];

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = ContainerConfig::load(args.config.as_deref()).context("加载容器配置失败")?;
    info!("容器配置: {:?}", config);

    let mut container = Container::with_config(config);
    let scanner = container.convention_scanner();
    container
        .configure(|services| configure_samples(services, &scanner))
        .context("配置容器失败")?;

    let keys: Vec<String> = if args.keys.is_empty() {
        DEFAULT_KEYS.iter().map(ToString::to_string).collect()
    } else {
        args.keys.clone()
    };

    for key in keys {
        let report = resolve_key(&container, key);
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            match (&report.implementation, &report.error) {
                (Some(implementation), _) => println!("{} => {}", report.key, implementation),
                (None, Some(error)) => println!("{} !! {}", report.key, error),
                (None, None) => println!("{}", report.key),
            }
        }
    }

    let stats = container.stats();
    info!(
        "注册 {} 个，解析 {} 次，单例 {} 个，错误 {} 次",
        stats.registered_components,
        stats.resolved_components,
        stats.active_singletons,
        stats.resolution_errors
    );
    Ok(())
}

fn resolve_key(container: &Container, key: String) -> ResolutionReport {
    match container.resolve_str(&key) {
        Ok(instance) => ResolutionReport {
            key,
            implementation: Some(instance.implementation().clone()),
            error: None,
        },
        Err(error) => {
            warn!("无法解析 {}: {}", key, error);
            ResolutionReport {
                key,
                implementation: None,
                error: Some(error.to_string()),
            }
        }
    }
}

/// 初始化日志系统
fn init_logging(args: &Args) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&args.log_level)
        .with_context(|| format!("无效的日志级别: {}", args.log_level))?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if args.json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| anyhow::anyhow!("日志初始化失败: {}", e))?;

    Ok(())
}
