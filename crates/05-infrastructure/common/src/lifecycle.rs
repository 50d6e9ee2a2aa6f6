//! 组件生命周期定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 组件生命周期类型
///
/// 生命周期只决定实例是否被缓存，不影响对象图的构建方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// 单例模式 - 每个服务键最多创建一次实例
    Singleton,
    /// 作用域模式 - 在同一作用域内共享实例
    Scoped,
    /// 瞬时模式 - 每次请求都创建新实例
    #[default]
    Transient,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Singleton => "singleton",
            Self::Scoped => "scoped",
            Self::Transient => "transient",
        };
        f.write_str(name)
    }
}

/// 组件作用域
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: uuid::Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Scope {
    /// 创建新作用域
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// 创建根作用域
    pub fn root() -> Self {
        Self::new("root")
    }

    /// 创建子作用域
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self::new(format!("{}.{}", self.name, name.into()))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}
