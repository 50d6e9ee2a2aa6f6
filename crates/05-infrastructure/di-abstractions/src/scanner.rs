//! 组件扫描器抽象接口
//!
//! 扫描器从候选类型描述符中按约定发现契约 -> 实现对。扫描是发现而不是验证：
//! 不符合约定的候选类型被静默跳过。

use crate::factory::ImplementationDescriptor;
use crate::key::TypeKey;
use infrastructure_common::Lifetime;

/// 候选类型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// 可实例化的类型
    Class,
    /// 抽象类型
    AbstractClass,
    /// 接口（契约）
    Interface,
}

/// 候选类型描述符
///
/// 由外部发现协作者提供：名称、实现的契约、构造参数契约和工厂。
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// 类型键
    pub key: TypeKey,
    /// 类型种类
    pub kind: TypeKind,
    /// 实现的契约列表
    pub contracts: Vec<TypeKey>,
    /// 实现描述符（仅可实例化类型）
    pub implementation: Option<ImplementationDescriptor>,
}

impl TypeDescriptor {
    /// 可实例化的类型
    pub fn class(implementation: ImplementationDescriptor) -> Self {
        Self {
            key: implementation.key().clone(),
            kind: TypeKind::Class,
            contracts: Vec::new(),
            implementation: Some(implementation),
        }
    }

    /// 抽象类型
    pub fn abstract_class(key: TypeKey) -> Self {
        Self {
            key,
            kind: TypeKind::AbstractClass,
            contracts: Vec::new(),
            implementation: None,
        }
    }

    /// 接口
    pub fn interface(key: TypeKey) -> Self {
        Self {
            key,
            kind: TypeKind::Interface,
            contracts: Vec::new(),
            implementation: None,
        }
    }

    /// 添加实现的契约
    pub fn implements(mut self, contract: TypeKey) -> Self {
        self.contracts.push(contract);
        self
    }

    /// 简单名称（基础标识符）
    pub fn name(&self) -> &str {
        self.key.base()
    }

    /// 是否可实例化
    pub fn is_instantiable(&self) -> bool {
        self.kind == TypeKind::Class && self.implementation.is_some()
    }
}

/// 发现的注册
#[derive(Debug, Clone)]
pub struct DiscoveredRegistration {
    pub contract: TypeKey,
    pub implementation: ImplementationDescriptor,
    pub lifetime: Lifetime,
}

/// 组件扫描器 trait
pub trait ContractScanner: Send + Sync {
    /// 从候选类型中发现契约 -> 实现对，空结果是合法的
    fn discover(&self, candidates: &[TypeDescriptor]) -> Vec<DiscoveredRegistration>;

    /// 获取扫描器名称
    fn name(&self) -> &str;
}
