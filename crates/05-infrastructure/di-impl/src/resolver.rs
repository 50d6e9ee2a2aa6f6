//! 依赖解析引擎
//!
//! 单次解析请求的流程：查找注册 -> 开放泛型时替换类型参数 -> 按构造参数顺序
//! 递归解析依赖 -> 调用工厂实例化。引擎只读注册表，唯一的可变状态是
//! 实例缓存和激活计划缓存。
//!
//! 实例化前先遍历封闭的依赖图，循环、缺失注册和泛型参数不足都在进入任何
//! 实例缓存单元之前报告。因此等待其他线程构造单例时，等待关系沿无环的依赖图
//! 单向传递，不会互相阻塞。
//!
//! 激活计划和实例缓存只保留构造成功的条目，缓存大小以成功解析过的封闭键数量为上限。

use crate::registry::ServiceCollection;
use dashmap::DashMap;
use di_abstractions::{
    Activation, Bindings, ContainerStats, Lookup, RegistrationEntry, ResolveContext,
    ResolveOptions, ResolvedInstance, ServiceRegistry, TypeKey,
};
use infrastructure_common::{ContainerConfig, DependencyError, DependencyResult, Lifetime};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

type CacheKey = (TypeKey, usize);

/// 实例缓存
///
/// 按（请求键，注册序号）缓存。同一键的首次构造最多执行一次，
/// 并发的其他调用方阻塞等待胜出者的实例；构造失败时单元保持为空，下次调用重试。
#[derive(Debug, Default)]
pub(crate) struct InstanceCache {
    cells: DashMap<CacheKey, Arc<OnceCell<ResolvedInstance>>>,
}

impl InstanceCache {
    fn get_or_create<F>(&self, key: &TypeKey, id: usize, create: F) -> DependencyResult<ResolvedInstance>
    where
        F: FnOnce() -> DependencyResult<ResolvedInstance>,
    {
        // 分片锁在初始化前释放，递归解析不会在同一分片上死锁
        let cache_key = (key.clone(), id);
        let cell = Arc::clone(self.cells.entry(cache_key.clone()).or_default().value());
        let result = cell.get_or_try_init(create).cloned();
        if result.is_err() {
            // 只有缓存表和当前调用持有单元时才移除，仍在等待的调用方会在原单元上重试
            self.cells.remove_if(&cache_key, |_, cached| {
                cached.get().is_none() && Arc::strong_count(cached) <= 2
            });
        }
        result
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.iter().filter(|cell| cell.value().get().is_some()).count()
    }
}

/// 激活计划：封闭的实现类型键和替换后的依赖键
#[derive(Debug)]
struct ActivationPlan {
    implementation: TypeKey,
    dependencies: Vec<TypeKey>,
}

/// 解析引擎
#[derive(Debug)]
pub struct Resolver {
    options: ResolveOptions,
    validate_scopes: bool,
    singletons: InstanceCache,
    plans: DashMap<CacheKey, Arc<ActivationPlan>>,
    stats: Mutex<ContainerStats>,
}

impl Resolver {
    pub fn new(config: &ContainerConfig) -> Self {
        Self {
            options: ResolveOptions {
                max_depth: config.max_resolution_depth,
            },
            validate_scopes: config.validate_scopes,
            singletons: InstanceCache::default(),
            plans: DashMap::new(),
            stats: Mutex::new(ContainerStats::default()),
        }
    }

    /// 解析单个组件
    pub(crate) fn resolve(
        &self,
        registry: &ServiceCollection,
        key: &TypeKey,
        scope: Option<&InstanceCache>,
    ) -> DependencyResult<ResolvedInstance> {
        debug!("解析组件: {}", key);
        let result = self.verify(registry, key).and_then(|()| {
            let mut context = ResolveContext::with_options(self.options.clone());
            self.resolve_key(registry, key, scope, &mut context)
        });
        self.record_outcome(key, result.as_ref().err());
        result
    }

    /// 按注册顺序解析全部注册
    pub(crate) fn resolve_all(
        &self,
        registry: &ServiceCollection,
        key: &TypeKey,
        scope: Option<&InstanceCache>,
    ) -> DependencyResult<Vec<ResolvedInstance>> {
        debug!("解析全部组件: {}", key);
        let mut context = ResolveContext::with_options(self.options.clone());
        let result = Self::ensure_closed(key)
            .and_then(|()| self.verify_all(registry, key))
            .and_then(|()| context.push_type(key))
            .and_then(|()| {
                let instances: DependencyResult<Vec<_>> = registry
                    .lookup_all(key)
                    .into_iter()
                    .map(|found| self.activate(registry, key, found, scope, &mut context))
                    .collect();
                context.pop_type();
                instances
            });
        self.record_outcome(key, result.as_ref().err());
        result
    }

    /// 统计快照
    pub(crate) fn stats(&self) -> ContainerStats {
        let mut stats = self.stats.lock().clone();
        stats.active_singletons = self.singletons.len();
        stats
    }

    fn record_outcome(&self, key: &TypeKey, error: Option<&DependencyError>) {
        if let Some(error) = error {
            warn!("解析 {} 失败: {}", key, error);
            self.stats.lock().resolution_errors += 1;
        }
    }

    /// 遍历请求键的封闭依赖图，不创建任何实例
    fn verify(&self, registry: &ServiceCollection, key: &TypeKey) -> DependencyResult<()> {
        let mut context = ResolveContext::with_options(self.options.clone());
        let mut verified = HashSet::new();
        self.verify_key(registry, key, &mut context, &mut verified)
    }

    /// 遍历全部注册各自的依赖图
    fn verify_all(&self, registry: &ServiceCollection, key: &TypeKey) -> DependencyResult<()> {
        let mut context = ResolveContext::with_options(self.options.clone());
        let mut verified = HashSet::new();
        context.push_type(key)?;
        for found in registry.lookup_all(key) {
            self.verify_dependencies(registry, key, found, &mut context, &mut verified)?;
        }
        context.pop_type();
        Ok(())
    }

    fn verify_key(
        &self,
        registry: &ServiceCollection,
        key: &TypeKey,
        context: &mut ResolveContext,
        verified: &mut HashSet<TypeKey>,
    ) -> DependencyResult<()> {
        Self::ensure_closed(key)?;
        context.push_type(key)?;
        if verified.contains(key) {
            context.pop_type();
            return Ok(());
        }

        let result = match registry.lookup(key) {
            Some(found) => self.verify_dependencies(registry, key, found, context, verified),
            None => Err(DependencyError::not_registered(key.to_string())),
        };
        context.pop_type();
        if result.is_ok() {
            verified.insert(key.clone());
        }
        result
    }

    fn verify_dependencies(
        &self,
        registry: &ServiceCollection,
        key: &TypeKey,
        found: Lookup<'_>,
        context: &mut ResolveContext,
        verified: &mut HashSet<TypeKey>,
    ) -> DependencyResult<()> {
        let plan = self.plan(key, found)?;
        trace!("依赖图 {} -> {:?}", plan.implementation, plan.dependencies);
        for dependency in &plan.dependencies {
            self.verify_key(registry, dependency, context, verified)?;
        }
        Ok(())
    }

    fn ensure_closed(key: &TypeKey) -> DependencyResult<()> {
        if key.is_closed() {
            return Ok(());
        }
        Err(DependencyError::AmbiguousGenericArguments {
            implementation: key.to_string(),
            unbound: key.parameters().into_iter().map(str::to_string).collect(),
        })
    }

    fn resolve_key(
        &self,
        registry: &ServiceCollection,
        key: &TypeKey,
        scope: Option<&InstanceCache>,
        context: &mut ResolveContext,
    ) -> DependencyResult<ResolvedInstance> {
        Self::ensure_closed(key)?;
        context.push_type(key)?;
        let result = match registry.lookup(key) {
            Some(found) => self.activate(registry, key, found, scope, context),
            None => Err(DependencyError::not_registered(key.to_string())),
        };
        context.pop_type();
        result
    }

    fn activate(
        &self,
        registry: &ServiceCollection,
        key: &TypeKey,
        found: Lookup<'_>,
        scope: Option<&InstanceCache>,
        context: &mut ResolveContext,
    ) -> DependencyResult<ResolvedInstance> {
        let entry = found.entry();
        let instance = match (entry.lifetime, scope) {
            (Lifetime::Transient, _) => self.construct(registry, key, found, scope, context),
            (Lifetime::Scoped, Some(instances)) => instances.get_or_create(key, entry.id, || {
                self.construct(registry, key, found, scope, context)
            }),
            (Lifetime::Scoped, None) if self.validate_scopes => Err(DependencyError::ScopeMismatch {
                expected: format!("作用域内解析 {key}"),
                actual: "根容器".to_string(),
            }),
            // 单例的依赖不在任何作用域内解析；关闭作用域校验时根容器充当作用域
            (Lifetime::Singleton | Lifetime::Scoped, _) => {
                self.singletons.get_or_create(key, entry.id, || {
                    let instance = self.construct(registry, key, found, None, context)?;
                    debug!("创建单例: {} -> {}", key, instance.implementation());
                    Ok(instance)
                })
            }
        }?;

        self.stats.lock().resolved_components += 1;
        Ok(instance)
    }

    fn construct(
        &self,
        registry: &ServiceCollection,
        key: &TypeKey,
        found: Lookup<'_>,
        scope: Option<&InstanceCache>,
        context: &mut ResolveContext,
    ) -> DependencyResult<ResolvedInstance> {
        let entry = found.entry();
        let plan = self.plan(key, found)?;

        let mut dependencies = Vec::with_capacity(plan.dependencies.len());
        for dependency in &plan.dependencies {
            dependencies.push(self.resolve_key(registry, dependency, scope, context)?);
        }

        let value = entry
            .implementation
            .create(Activation::new(plan.implementation.clone(), dependencies))?;
        debug!("实例化组件: {} -> {}", key, plan.implementation);

        self.plans
            .entry((key.clone(), entry.id))
            .or_insert_with(|| Arc::clone(&plan));
        Ok(ResolvedInstance::new(plan.implementation.clone(), value))
    }

    /// 获取缓存的或计算新的激活计划
    ///
    /// 实现类型或构造参数引入了请求未提供的类型参数时失败。
    /// 新计划在组件构造成功后才写入缓存。
    fn plan(&self, key: &TypeKey, found: Lookup<'_>) -> DependencyResult<Arc<ActivationPlan>> {
        let entry = found.entry();
        if let Some(plan) = self.plans.get(&(key.clone(), entry.id)) {
            return Ok(Arc::clone(plan.value()));
        }

        let bindings = match found {
            Lookup::Exact(_) => Bindings::new(),
            Lookup::OpenGeneric(entry) => entry
                .contract
                .unify(key)
                .ok_or_else(|| DependencyError::not_registered(key.to_string()))?,
        };

        let unbound: Vec<String> = entry
            .implementation
            .type_parameters()
            .into_iter()
            .filter(|param| !bindings.contains_key(*param))
            .map(str::to_string)
            .collect();
        if !unbound.is_empty() {
            return Err(Self::underspecified(entry, unbound));
        }

        let close = |template: &TypeKey| {
            template
                .substitute(&bindings)
                .map_err(|unbound| Self::underspecified(entry, unbound))
        };
        Ok(Arc::new(ActivationPlan {
            implementation: close(entry.implementation.key())?,
            dependencies: entry
                .implementation
                .dependencies()
                .iter()
                .map(close)
                .collect::<DependencyResult<_>>()?,
        }))
    }

    fn underspecified(entry: &RegistrationEntry, unbound: Vec<String>) -> DependencyError {
        DependencyError::AmbiguousGenericArguments {
            implementation: format!("{} (契约 {})", entry.implementation.key(), entry.contract),
            unbound,
        }
    }
}
