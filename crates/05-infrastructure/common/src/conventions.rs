//! 约定规范定义
//!
//! 提供按命名约定发现服务契约的规则

use crate::lifecycle::Lifetime;

/// 约定规则
///
/// 实现类型名称匹配 `pattern` 时，期望的契约名称为 `contract_prefix` 加上实现名称，
/// 例如 `SampleService` 对应 `ISampleService`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionRule {
    /// 名称模式，支持单个 `*` 通配符
    pub pattern: String,
    /// 契约名称前缀
    pub contract_prefix: String,
    /// 发现的注册使用的生命周期
    pub lifetime: Lifetime,
    /// 优先级
    pub priority: i32,
}

impl ConventionRule {
    /// 创建新的约定规则
    pub fn new(
        pattern: impl Into<String>,
        contract_prefix: impl Into<String>,
        lifetime: Lifetime,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            contract_prefix: contract_prefix.into(),
            lifetime,
            priority: 0,
        }
    }

    /// 按后缀创建约定规则
    pub fn with_suffix(
        suffix: impl AsRef<str>,
        contract_prefix: impl Into<String>,
        lifetime: Lifetime,
    ) -> Self {
        Self::new(format!("*{}", suffix.as_ref()), contract_prefix, lifetime)
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 检查类型名称是否匹配此规则
    pub fn matches(&self, name: &str) -> bool {
        self.pattern_matches(name)
    }

    /// 推导期望的契约名称
    pub fn expected_contract_name(&self, implementation_name: &str) -> String {
        format!("{}{}", self.contract_prefix, implementation_name)
    }

    /// 检查模式是否匹配
    fn pattern_matches(&self, name: &str) -> bool {
        if self.pattern.contains('*') {
            // 简单的通配符匹配
            let pattern_parts: Vec<&str> = self.pattern.split('*').collect();

            if pattern_parts.len() == 2 {
                let prefix = pattern_parts[0];
                let suffix = pattern_parts[1];

                name.len() >= prefix.len() + suffix.len()
                    && name.starts_with(prefix)
                    && name.ends_with(suffix)
            } else {
                false
            }
        } else {
            name == self.pattern
        }
    }
}

/// 组件约定规范
#[derive(Debug, Clone)]
pub struct ComponentConventions {
    rules: Vec<ConventionRule>,
}

impl ComponentConventions {
    /// 创建空的约定规范
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// 创建带默认约定的规范
    pub fn new() -> Self {
        let mut conventions = Self::empty();
        conventions.register_default_conventions();
        conventions
    }

    /// 注册默认约定
    fn register_default_conventions(&mut self) {
        // 服务组件约定: SampleService -> ISampleService
        self.add_convention(
            ConventionRule::with_suffix("Service", "I", Lifetime::Transient).with_priority(90),
        );
    }

    /// 添加约定规则
    pub fn add_convention(&mut self, rule: ConventionRule) {
        self.rules.push(rule);
        // 按优先级排序，稳定排序保留同优先级的添加顺序
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// 获取所有约定规则
    pub fn get_convention_rules(&self) -> &[ConventionRule] {
        &self.rules
    }

    /// 根据类型名称查找匹配的规则
    pub fn find_rule(&self, name: &str) -> Option<&ConventionRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }
}

impl Default for ComponentConventions {
    fn default() -> Self {
        Self::new()
    }
}
