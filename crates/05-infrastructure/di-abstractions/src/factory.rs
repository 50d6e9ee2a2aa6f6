//! 实现描述符与组件工厂
//!
//! 实现描述符标识一个可构造的类型及其构造参数契约列表。构造参数可以包含
//! 未绑定的泛型参数，解析时由请求键提供的类型参数替换。

use crate::key::TypeKey;
use infrastructure_common::{DependencyError, DependencyResult};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// 组件实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 组件工厂函数类型
pub type ComponentFactoryFn = Arc<dyn Fn(Activation) -> DependencyResult<Instance> + Send + Sync>;

/// 已解析的组件实例
///
/// 同时携带封闭的实现类型键，调用方不必向下转型即可判断实例的实现类型。
#[derive(Clone)]
pub struct ResolvedInstance {
    implementation: TypeKey,
    value: Instance,
}

impl ResolvedInstance {
    pub fn new(implementation: TypeKey, value: Instance) -> Self {
        Self {
            implementation,
            value,
        }
    }

    /// 封闭的实现类型键，例如 `GenericService<int>`
    pub fn implementation(&self) -> &TypeKey {
        &self.implementation
    }

    pub fn value(&self) -> &Instance {
        &self.value
    }

    /// 实例是否为指定的 Rust 类型
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// 向下转型为指定的 Rust 类型
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// 两个实例是否为同一个对象
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for ResolvedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedInstance")
            .field("implementation", &self.implementation)
            .field("value", &"<instance>")
            .finish()
    }
}

/// 组件激活上下文
///
/// 传给工厂函数：封闭的实现类型键，以及按构造参数顺序解析好的依赖。
#[derive(Debug)]
pub struct Activation {
    implementation: TypeKey,
    dependencies: Vec<ResolvedInstance>,
}

impl Activation {
    pub fn new(implementation: TypeKey, dependencies: Vec<ResolvedInstance>) -> Self {
        Self {
            implementation,
            dependencies,
        }
    }

    pub fn implementation(&self) -> &TypeKey {
        &self.implementation
    }

    /// 实现类型的封闭类型参数
    pub fn type_args(&self) -> &[TypeKey] {
        self.implementation.args()
    }

    pub fn type_arg(&self, index: usize) -> DependencyResult<&TypeKey> {
        self.type_args().get(index).ok_or_else(|| {
            DependencyError::creation_failed(
                self.implementation.to_string(),
                format!("缺少第 {index} 个类型参数"),
            )
        })
    }

    pub fn dependencies(&self) -> &[ResolvedInstance] {
        &self.dependencies
    }

    pub fn dependency(&self, index: usize) -> DependencyResult<&ResolvedInstance> {
        self.dependencies.get(index).ok_or_else(|| {
            DependencyError::creation_failed(
                self.implementation.to_string(),
                format!("缺少第 {index} 个构造依赖"),
            )
        })
    }

    /// 获取依赖并向下转型
    pub fn dependency_as<T: Any + Send + Sync>(&self, index: usize) -> DependencyResult<Arc<T>> {
        let dependency = self.dependency(index)?;
        dependency.downcast::<T>().ok_or_else(|| {
            DependencyError::creation_failed(
                self.implementation.to_string(),
                format!(
                    "第 {index} 个构造依赖 {} 不是 {}",
                    dependency.implementation(),
                    type_name::<T>()
                ),
            )
        })
    }

    pub fn into_dependencies(self) -> Vec<ResolvedInstance> {
        self.dependencies
    }
}

/// 实现描述符
#[derive(Clone)]
pub struct ImplementationDescriptor {
    key: TypeKey,
    dependencies: Vec<TypeKey>,
    factory: ComponentFactoryFn,
}

impl ImplementationDescriptor {
    /// 用返回具体值的工厂创建描述符
    pub fn new<T, F>(key: TypeKey, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Activation) -> DependencyResult<T> + Send + Sync + 'static,
    {
        Self::from_factory(
            key,
            Arc::new(move |activation: Activation| -> DependencyResult<Instance> {
                Ok(Arc::new(factory(activation)?) as Instance)
            }),
        )
    }

    /// 用原始工厂函数创建描述符
    pub fn from_factory(key: TypeKey, factory: ComponentFactoryFn) -> Self {
        Self {
            key,
            dependencies: Vec::new(),
            factory,
        }
    }

    /// 添加构造参数契约
    pub fn with_dependency(mut self, dependency: TypeKey) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// 添加多个构造参数契约
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = TypeKey>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// 实现类型键（可能含泛型参数）
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// 构造参数契约列表
    pub fn dependencies(&self) -> &[TypeKey] {
        &self.dependencies
    }

    /// 实现类型和构造参数中出现的所有泛型参数
    pub fn type_parameters(&self) -> Vec<&str> {
        let mut params = Vec::new();
        self.key.collect_parameters(&mut params);
        for dependency in &self.dependencies {
            dependency.collect_parameters(&mut params);
        }
        params
    }

    /// 调用工厂创建实例
    pub fn create(&self, activation: Activation) -> DependencyResult<Instance> {
        (self.factory)(activation)
    }
}

impl fmt::Debug for ImplementationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplementationDescriptor")
            .field("key", &self.key)
            .field("dependencies", &self.dependencies)
            .field("factory", &"<function>")
            .finish()
    }
}
