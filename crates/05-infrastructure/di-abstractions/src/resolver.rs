//! 组件解析器抽象接口
//!
//! 提供依赖解析和组件实例化的能力

use crate::factory::ResolvedInstance;
use crate::key::TypeKey;
use infrastructure_common::{DependencyError, DependencyResult};
use std::any::{type_name, Any};
use std::sync::Arc;
use tracing::trace;

/// 组件解析器 trait
///
/// 负责解析组件依赖并创建组件实例
pub trait ServiceResolver: Send + Sync {
    /// 解析指定类型键的组件
    fn resolve(&self, key: &TypeKey) -> DependencyResult<ResolvedInstance>;

    /// 按注册顺序解析指定类型键的全部注册
    fn resolve_all(&self, key: &TypeKey) -> DependencyResult<Vec<ResolvedInstance>>;

    /// 检查是否存在可用的注册
    fn can_resolve(&self, key: &TypeKey) -> bool;

    /// 按契约标识符和类型参数解析
    fn resolve_generic(
        &self,
        base: &str,
        type_args: impl IntoIterator<Item = TypeKey>,
    ) -> DependencyResult<ResolvedInstance>
    where
        Self: Sized,
    {
        self.resolve(&TypeKey::generic(base, type_args))
    }

    /// 解析字符串形式的类型键，例如 `IGenericService<int>`
    fn resolve_str(&self, key: &str) -> DependencyResult<ResolvedInstance>
    where
        Self: Sized,
    {
        self.resolve(&key.parse::<TypeKey>()?)
    }

    /// 解析并向下转型为指定的 Rust 类型
    fn resolve_as<T>(&self, key: &TypeKey) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
        Self: Sized,
    {
        let instance = self.resolve(key)?;
        instance.downcast::<T>().ok_or_else(|| {
            DependencyError::creation_failed(
                key.to_string(),
                format!("实现 {} 不是 {}", instance.implementation(), type_name::<T>()),
            )
        })
    }
}

/// 解析上下文
///
/// 每个解析请求一个，沿调用链记录正在解析的类型键。
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    pub resolution_chain: Vec<TypeKey>,
    /// 解析选项
    pub options: ResolveOptions,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new() -> Self {
        Self::with_options(ResolveOptions::default())
    }

    pub fn with_options(options: ResolveOptions) -> Self {
        Self {
            resolution_chain: Vec::new(),
            options,
        }
    }

    /// 添加类型到解析链
    pub fn push_type(&mut self, key: &TypeKey) -> DependencyResult<()> {
        if self.resolution_chain.contains(key) {
            let chain = self
                .resolution_chain
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(DependencyError::CircularDependency {
                dependency_chain: format!("{chain} -> {key}"),
            });
        }
        if self.resolution_chain.len() >= self.options.max_depth {
            return Err(DependencyError::MaxDepthExceeded {
                depth: self.options.max_depth,
                type_name: key.to_string(),
            });
        }
        trace!("解析链深度 {}: {}", self.resolution_chain.len(), key);
        self.resolution_chain.push(key.clone());
        Ok(())
    }

    /// 从解析链中移除类型
    pub fn pop_type(&mut self) {
        self.resolution_chain.pop();
    }

    /// 当前解析深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析选项
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// 最大递归深度
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}
