//! 服务注册表抽象接口

use crate::factory::ImplementationDescriptor;
use crate::key::TypeKey;
use infrastructure_common::{DependencyResult, Lifetime};

/// 注册项
///
/// 配置阶段创建，由注册表独占持有，配置结束后不再修改。
#[derive(Debug, Clone)]
pub struct RegistrationEntry {
    /// 注册序号，按添加顺序递增
    pub id: usize,
    /// 契约类型键（开放泛型注册时为模板）
    pub contract: TypeKey,
    /// 实现描述符
    pub implementation: ImplementationDescriptor,
    /// 生命周期
    pub lifetime: Lifetime,
}

impl RegistrationEntry {
    /// 是否为开放泛型模板注册
    pub fn is_open_generic(&self) -> bool {
        !self.contract.is_closed()
    }
}

/// 查找结果
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    /// 精确匹配请求键
    Exact(&'a RegistrationEntry),
    /// 回退到同一泛型定义下的开放泛型模板
    OpenGeneric(&'a RegistrationEntry),
}

impl<'a> Lookup<'a> {
    pub fn entry(&self) -> &'a RegistrationEntry {
        match self {
            Self::Exact(entry) | Self::OpenGeneric(entry) => entry,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }
}

/// 服务注册表 trait
///
/// 配置阶段只写，冻结后只读。查找优先级：
/// 1. 请求键的精确匹配（具体类型、显式注册的封闭泛型）
/// 2. 请求键为封闭泛型时，回退到同一基础标识符和元数的开放泛型模板
pub trait ServiceRegistry {
    /// 注册并覆盖同一契约已有的注册（后注册者生效）
    fn add(
        &mut self,
        contract: TypeKey,
        implementation: ImplementationDescriptor,
        lifetime: Lifetime,
    ) -> DependencyResult<()>;

    /// 仅当同一契约尚无注册时注册，返回是否新增
    ///
    /// 扫描器使用此方法，因此先配置的显式注册优先于约定发现的注册；
    /// 若扫描先执行，则约定注册生效，直到后续的 [`ServiceRegistry::add`] 覆盖它。
    fn add_if_absent(
        &mut self,
        contract: TypeKey,
        implementation: ImplementationDescriptor,
        lifetime: Lifetime,
    ) -> DependencyResult<bool>;

    /// 查找生效的注册
    fn lookup(&self, key: &TypeKey) -> Option<Lookup<'_>>;

    /// 按注册顺序查找全部注册
    ///
    /// 有精确注册时只返回精确注册，否则返回所有可合一的开放泛型模板。
    fn lookup_all(&self, key: &TypeKey) -> Vec<Lookup<'_>>;

    /// 冻结注册表
    fn freeze(&mut self);

    /// 是否已冻结
    fn is_frozen(&self) -> bool;

    /// 检查是否可以找到注册
    fn is_registered(&self, key: &TypeKey) -> bool {
        self.lookup(key).is_some()
    }

    /// 注册瞬时组件
    fn add_transient(
        &mut self,
        contract: TypeKey,
        implementation: ImplementationDescriptor,
    ) -> DependencyResult<()> {
        self.add(contract, implementation, Lifetime::Transient)
    }

    /// 注册单例组件
    fn add_singleton(
        &mut self,
        contract: TypeKey,
        implementation: ImplementationDescriptor,
    ) -> DependencyResult<()> {
        self.add(contract, implementation, Lifetime::Singleton)
    }

    /// 注册作用域组件
    fn add_scoped(
        &mut self,
        contract: TypeKey,
        implementation: ImplementationDescriptor,
    ) -> DependencyResult<()> {
        self.add(contract, implementation, Lifetime::Scoped)
    }

    /// 尚无注册时注册瞬时组件
    fn try_add_transient(
        &mut self,
        contract: TypeKey,
        implementation: ImplementationDescriptor,
    ) -> DependencyResult<bool> {
        self.add_if_absent(contract, implementation, Lifetime::Transient)
    }

    /// 尚无注册时注册单例组件
    fn try_add_singleton(
        &mut self,
        contract: TypeKey,
        implementation: ImplementationDescriptor,
    ) -> DependencyResult<bool> {
        self.add_if_absent(contract, implementation, Lifetime::Singleton)
    }

    /// 以实现类型自身作为契约注册
    fn add_self(
        &mut self,
        implementation: ImplementationDescriptor,
        lifetime: Lifetime,
    ) -> DependencyResult<()> {
        let contract = implementation.key().clone();
        self.add(contract, implementation, lifetime)
    }
}
