//! 类型目录
//!
//! 扫描器的输入来源。核心只消费已经物化的候选描述符序列，
//! 与具体的模块加载机制解耦。

use crate::scanner::TypeDescriptor;

/// 类型目录 trait
pub trait TypeCatalog: Send + Sync {
    /// 获取目录名称
    fn name(&self) -> &str;

    /// 目录中的候选类型
    fn types(&self) -> &[TypeDescriptor];
}

/// 内存中的静态类型目录
#[derive(Debug, Clone, Default)]
pub struct StaticTypeCatalog {
    name: String,
    types: Vec<TypeDescriptor>,
}

impl StaticTypeCatalog {
    /// 创建新的类型目录
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    /// 添加候选类型
    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.types.push(descriptor);
        self
    }

    /// 添加候选类型
    pub fn add_type(&mut self, descriptor: TypeDescriptor) {
        self.types.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeCatalog for StaticTypeCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }
}

impl FromIterator<TypeDescriptor> for StaticTypeCatalog {
    fn from_iter<I: IntoIterator<Item = TypeDescriptor>>(iter: I) -> Self {
        Self {
            name: "static".to_string(),
            types: iter.into_iter().collect(),
        }
    }
}
