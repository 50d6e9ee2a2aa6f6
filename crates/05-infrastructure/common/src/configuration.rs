//! 容器配置
//!
//! 配置来源依次为可选的 TOML 文件和带前缀的环境变量，后者覆盖前者。

use crate::errors::{ConfigError, ConfigResult};
use crate::lifecycle::Lifetime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "DI";

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 是否校验作用域（根容器解析作用域组件时报错）
    pub validate_scopes: bool,
    /// 约定扫描配置
    pub scan: ScanConfig,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: 100,
            validate_scopes: true,
            scan: ScanConfig::default(),
        }
    }
}

/// 约定扫描配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 实现类型名称后缀
    pub suffix: String,
    /// 契约名称前缀
    pub contract_prefix: String,
    /// 发现的注册使用的生命周期
    pub lifetime: Lifetime,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            suffix: "Service".to_string(),
            contract_prefix: "I".to_string(),
            lifetime: Lifetime::Transient,
        }
    }
}

impl ContainerConfig {
    /// 从可选的 TOML 文件和默认前缀的环境变量加载配置
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_prefix(path, DEFAULT_ENV_PREFIX)
    }

    /// 从可选的 TOML 文件和指定前缀的环境变量加载配置
    ///
    /// 环境变量使用 `__` 分隔层级，例如 `DI__SCAN__SUFFIX`。
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("加载容器配置文件: {}", path.display());
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_resolution_depth 必须大于 0".to_string(),
            });
        }
        if self.scan.suffix.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "scan.suffix 不能为空".to_string(),
            });
        }
        Ok(())
    }
}
