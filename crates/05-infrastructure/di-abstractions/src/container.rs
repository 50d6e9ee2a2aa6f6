//! 依赖注入容器抽象
//!
//! 容器的生命周期分为配置和解析两个阶段：配置阶段单线程写注册表，
//! 冻结后注册表只读，可被任意数量的线程并发解析。

use crate::registry::ServiceRegistry;
use crate::resolver::ServiceResolver;
use infrastructure_common::DependencyResult;

/// 依赖注入容器 trait
pub trait DiContainer: ServiceResolver {
    /// 注册表类型
    type Registry: ServiceRegistry;

    /// 运行配置例程后冻结注册表
    ///
    /// 容器只能配置一次，再次调用返回 `ContainerAlreadyBuilt`。
    fn configure<F>(&mut self, setup: F) -> DependencyResult<()>
    where
        F: FnOnce(&mut Self::Registry) -> DependencyResult<()>;

    /// 只读访问注册表
    fn registry(&self) -> &Self::Registry;

    /// 是否已完成配置
    fn is_built(&self) -> bool;
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 已注册组件数量
    pub registered_components: usize,
    /// 成功解析次数（含依赖）
    pub resolved_components: usize,
    /// 已创建的单例数量
    pub active_singletons: usize,
    /// 解析错误数量
    pub resolution_errors: usize,
}
