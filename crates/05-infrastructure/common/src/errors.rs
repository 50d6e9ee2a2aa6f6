//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(error: config::ConfigError) -> Self {
        Self::ParseError {
            source: Box::new(error),
        }
    }
}

/// 依赖注入错误类型
///
/// 所有错误都只影响单次解析调用，不会破坏注册表状态。
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("组件未注册: {type_name}")]
    ComponentNotRegistered { type_name: String },

    #[error("泛型参数不足: {implementation} 需要未绑定的类型参数 [{}]", unbound.join(", "))]
    AmbiguousGenericArguments {
        implementation: String,
        unbound: Vec<String>,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("容器已构建，不能再修改注册")]
    ContainerAlreadyBuilt,

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("作用域不匹配: 期望 {expected}, 实际 {actual}")]
    ScopeMismatch { expected: String, actual: String },

    #[error("解析深度超过上限 {depth}: {type_name}")]
    MaxDepthExceeded { depth: usize, type_name: String },

    #[error("类型键无效: {input}, 原因: {message}")]
    InvalidTypeKey { input: String, message: String },
}

impl DependencyError {
    /// 创建组件未注册错误
    pub fn not_registered(type_name: impl Into<String>) -> Self {
        Self::ComponentNotRegistered {
            type_name: type_name.into(),
        }
    }

    /// 创建组件创建失败错误
    pub fn creation_failed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::ComponentCreationFailed {
            type_name: type_name.into(),
            source: message.into(),
        }
    }

    /// 是否为泛型参数不足错误
    pub fn is_ambiguous_generic_arguments(&self) -> bool {
        matches!(self, Self::AmbiguousGenericArguments { .. })
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
