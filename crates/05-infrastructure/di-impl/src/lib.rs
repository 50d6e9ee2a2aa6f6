//! # 依赖注入具体实现
//!
//! 提供支持开放泛型的服务集合、约定扫描器、解析引擎和容器门面。
//!
//! ```ignore
//! let container = Container::build(ContainerConfig::default(), |services| {
//!     services.add_transient(
//!         TypeKey::open("IGenericService", ["T"]),
//!         ImplementationDescriptor::new(TypeKey::open("GenericService", ["T"]), |_| Ok(GenericService)),
//!     )
//! })?;
//! let service = container.resolve_str("IGenericService<int>")?;
//! ```

pub mod container;
pub mod registry;
pub mod resolver;
pub mod scanner;

pub use container::{Container, ContainerScope};
pub use registry::ServiceCollection;
pub use resolver::Resolver;
pub use scanner::ConventionScanner;
