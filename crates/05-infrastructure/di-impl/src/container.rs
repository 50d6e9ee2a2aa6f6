//! 依赖注入容器实现

use crate::registry::ServiceCollection;
use crate::resolver::{InstanceCache, Resolver};
use crate::scanner::ConventionScanner;
use di_abstractions::{
    ContainerStats, DiContainer, ResolvedInstance, ServiceRegistry, ServiceResolver, TypeKey,
};
use infrastructure_common::{ContainerConfig, DependencyError, DependencyResult, Scope};
use tracing::{debug, info};

/// 依赖注入容器
///
/// 显式创建、显式持有，不存在全局注册表。先通过 [`DiContainer::configure`]
/// 配置一次，之后注册表冻结，容器可以在线程间共享并发解析。
#[derive(Debug)]
pub struct Container {
    config: ContainerConfig,
    registry: ServiceCollection,
    resolver: Resolver,
    built: bool,
}

impl Container {
    /// 使用默认配置创建容器
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// 使用指定配置创建容器
    pub fn with_config(config: ContainerConfig) -> Self {
        let resolver = Resolver::new(&config);
        Self {
            config,
            registry: ServiceCollection::new(),
            resolver,
            built: false,
        }
    }

    /// 创建并配置容器
    pub fn build<F>(config: ContainerConfig, setup: F) -> DependencyResult<Self>
    where
        F: FnOnce(&mut ServiceCollection) -> DependencyResult<()>,
    {
        let mut container = Self::with_config(config);
        container.configure(setup)?;
        Ok(container)
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 按配置的约定创建扫描器
    pub fn convention_scanner(&self) -> ConventionScanner {
        ConventionScanner::from_config(&self.config.scan)
    }

    /// 创建新的解析作用域
    pub fn create_scope(&self, name: impl Into<String>) -> ContainerScope<'_> {
        let scope = Scope::new(name);
        debug!("创建作用域: {}", scope);
        ContainerScope {
            container: self,
            scope,
            instances: InstanceCache::default(),
        }
    }

    /// 统计信息
    pub fn stats(&self) -> ContainerStats {
        let mut stats = self.resolver.stats();
        stats.registered_components = self.registry.len();
        stats
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl DiContainer for Container {
    type Registry = ServiceCollection;

    fn configure<F>(&mut self, setup: F) -> DependencyResult<()>
    where
        F: FnOnce(&mut Self::Registry) -> DependencyResult<()>,
    {
        if self.built {
            return Err(DependencyError::ContainerAlreadyBuilt);
        }

        // 配置例程失败时不保留部分注册
        let mut registry = ServiceCollection::new();
        setup(&mut registry)?;
        registry.freeze();

        self.registry = registry;
        self.built = true;
        info!("构建容器完成，注册了 {} 个组件", self.registry.len());
        Ok(())
    }

    fn registry(&self) -> &Self::Registry {
        &self.registry
    }

    fn is_built(&self) -> bool {
        self.built
    }
}

impl ServiceResolver for Container {
    fn resolve(&self, key: &TypeKey) -> DependencyResult<ResolvedInstance> {
        self.resolver.resolve(&self.registry, key, None)
    }

    fn resolve_all(&self, key: &TypeKey) -> DependencyResult<Vec<ResolvedInstance>> {
        self.resolver.resolve_all(&self.registry, key, None)
    }

    fn can_resolve(&self, key: &TypeKey) -> bool {
        self.registry.is_registered(key)
    }
}

/// 解析作用域
///
/// 作用域组件在同一作用域内共享实例，单例仍由容器缓存。
#[derive(Debug)]
pub struct ContainerScope<'a> {
    container: &'a Container,
    scope: Scope,
    instances: InstanceCache,
}

impl<'a> ContainerScope<'a> {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn container(&self) -> &'a Container {
        self.container
    }
}

impl ServiceResolver for ContainerScope<'_> {
    fn resolve(&self, key: &TypeKey) -> DependencyResult<ResolvedInstance> {
        self.container
            .resolver
            .resolve(&self.container.registry, key, Some(&self.instances))
    }

    fn resolve_all(&self, key: &TypeKey) -> DependencyResult<Vec<ResolvedInstance>> {
        self.container
            .resolver
            .resolve_all(&self.container.registry, key, Some(&self.instances))
    }

    fn can_resolve(&self, key: &TypeKey) -> bool {
        self.container.can_resolve(key)
    }
}

impl Drop for ContainerScope<'_> {
    fn drop(&mut self) {
        debug!("释放作用域: {}", self.scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::ImplementationDescriptor;
    use infrastructure_common::Lifetime;

    #[derive(Debug)]
    struct RequestContext;

    #[derive(Debug)]
    struct Handler;

    fn request_context() -> TypeKey {
        TypeKey::concrete("RequestContext")
    }

    fn handler() -> TypeKey {
        TypeKey::concrete("Handler")
    }

    fn scoped_container(config: ContainerConfig) -> Container {
        Container::build(config, |services| {
            services.add_self(
                ImplementationDescriptor::new(request_context(), |_| Ok(RequestContext)),
                Lifetime::Scoped,
            )?;
            services.add_singleton(
                handler(),
                ImplementationDescriptor::new(handler(), |_| Ok(Handler))
                    .with_dependency(request_context()),
            )
        })
        .unwrap()
    }

    #[test]
    fn test_configure_twice_is_rejected() {
        let mut container = Container::new();
        container.configure(|_| Ok(())).unwrap();

        assert!(container.is_built());
        assert!(matches!(
            container.configure(|_| Ok(())),
            Err(DependencyError::ContainerAlreadyBuilt)
        ));
        assert!(container.registry().is_frozen());
    }

    #[test]
    fn test_failed_configure_keeps_nothing() {
        let mut container = Container::new();
        let result = container.configure(|services| {
            services.add_self(
                ImplementationDescriptor::new(handler(), |_| Ok(Handler)),
                Lifetime::Transient,
            )?;
            Err(DependencyError::creation_failed("setup", "配置失败"))
        });

        assert!(result.is_err());
        assert!(!container.is_built());
        assert!(container.registry().is_empty());
    }

    #[test]
    fn test_scoped_instances_are_shared_within_scope_only() {
        let container = scoped_container(ContainerConfig::default());

        let first = container.create_scope("request-1");
        let a = first.resolve(&request_context()).unwrap();
        let b = first.resolve(&request_context()).unwrap();
        assert!(a.ptr_eq(&b));

        let second = container.create_scope("request-2");
        let c = second.resolve(&request_context()).unwrap();
        assert!(!a.ptr_eq(&c));
        assert_ne!(first.scope().id, second.scope().id);
    }

    #[test]
    fn test_scoped_from_root_is_rejected_when_validating() {
        let container = scoped_container(ContainerConfig::default());

        assert!(matches!(
            container.resolve(&request_context()),
            Err(DependencyError::ScopeMismatch { .. })
        ));
        // 单例捕获作用域组件同样被拒绝
        let scope = container.create_scope("request");
        assert!(matches!(
            scope.resolve(&handler()),
            Err(DependencyError::ScopeMismatch { .. })
        ));
    }

    #[test]
    fn test_root_acts_as_scope_without_validation() {
        let config = ContainerConfig {
            validate_scopes: false,
            ..ContainerConfig::default()
        };
        let container = scoped_container(config);

        let a = container.resolve(&request_context()).unwrap();
        let b = container.resolve(&request_context()).unwrap();
        assert!(a.ptr_eq(&b));
        assert!(container.resolve(&handler()).is_ok());
    }

    #[test]
    fn test_stats_track_resolutions() {
        let container = scoped_container(ContainerConfig {
            validate_scopes: false,
            ..ContainerConfig::default()
        });

        container.resolve(&handler()).unwrap();
        container.resolve(&handler()).unwrap();
        let _ = container.resolve(&TypeKey::concrete("Missing"));

        let stats = container.stats();
        assert_eq!(stats.registered_components, 2);
        assert_eq!(stats.active_singletons, 2);
        assert_eq!(stats.resolution_errors, 1);
        assert!(stats.resolved_components >= 3);
    }
}
