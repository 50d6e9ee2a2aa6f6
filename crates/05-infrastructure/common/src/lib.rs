//! # Infrastructure Common
//!
//! 依赖注入核心的公共类型。
//!
//! ## 核心组件
//!
//! - [`DependencyError`] - 解析和注册失败的错误类型
//! - [`Lifetime`] - 组件生命周期
//! - [`ComponentConventions`] - 按命名约定发现契约的规则
//! - [`ContainerConfig`] - 容器配置

pub mod configuration;
pub mod conventions;
pub mod errors;
pub mod lifecycle;

pub use configuration::*;
pub use conventions::*;
pub use errors::*;
pub use lifecycle::*;
