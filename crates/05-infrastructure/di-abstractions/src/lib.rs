//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义类型键、组件注册和依赖解析的核心接口。
//!
//! ## 核心接口
//!
//! - [`TypeKey`] - 区分具体类型、开放泛型和封闭泛型的服务键
//! - [`ServiceRegistry`] - 服务注册表接口
//! - [`ContractScanner`] - 按约定发现契约的扫描器接口
//! - [`ServiceResolver`] - 依赖解析器接口
//! - [`DiContainer`] - 先配置后解析的容器接口

pub mod container;
pub mod discovery;
pub mod factory;
pub mod key;
pub mod registry;
pub mod resolver;
pub mod scanner;

pub use container::*;
pub use discovery::*;
pub use factory::*;
pub use key::*;
pub use registry::*;
pub use resolver::*;
pub use scanner::*;
