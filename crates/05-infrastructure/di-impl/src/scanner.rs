//! 约定扫描器
//!
//! 候选类型可实例化、名称匹配约定规则，并且实现了名为 `前缀 + 类型名` 的契约时，
//! 产生一个契约 -> 实现对。

use di_abstractions::{ContractScanner, DiscoveredRegistration, TypeDescriptor};
use infrastructure_common::{ComponentConventions, ConventionRule, ScanConfig};
use tracing::{debug, trace};

/// 按命名约定发现契约的扫描器
#[derive(Debug, Clone)]
pub struct ConventionScanner {
    conventions: ComponentConventions,
}

impl ConventionScanner {
    /// 使用默认约定（`*Service` -> `I{Name}`，瞬时）
    pub fn new() -> Self {
        Self::with_conventions(ComponentConventions::new())
    }

    /// 使用指定的约定规范
    pub fn with_conventions(conventions: ComponentConventions) -> Self {
        Self { conventions }
    }

    /// 由扫描配置创建
    pub fn from_config(config: &ScanConfig) -> Self {
        let mut conventions = ComponentConventions::empty();
        conventions.add_convention(ConventionRule::with_suffix(
            &config.suffix,
            config.contract_prefix.clone(),
            config.lifetime,
        ));
        Self::with_conventions(conventions)
    }

    pub fn conventions(&self) -> &ComponentConventions {
        &self.conventions
    }

    fn match_candidate(&self, candidate: &TypeDescriptor) -> Option<DiscoveredRegistration> {
        if !candidate.is_instantiable() {
            return None;
        }

        let name = candidate.name();
        let rule = self.conventions.find_rule(name)?;
        let expected = rule.expected_contract_name(name);
        let Some(contract) = candidate
            .contracts
            .iter()
            .find(|contract| contract.base() == expected)
        else {
            trace!("{} 未实现约定契约 {}，跳过", name, expected);
            return None;
        };

        let implementation = candidate.implementation.clone()?;
        debug!("约定发现: {} -> {}", contract, implementation.key());
        Some(DiscoveredRegistration {
            contract: contract.clone(),
            implementation,
            lifetime: rule.lifetime,
        })
    }
}

impl Default for ConventionScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractScanner for ConventionScanner {
    fn discover(&self, candidates: &[TypeDescriptor]) -> Vec<DiscoveredRegistration> {
        candidates
            .iter()
            .filter_map(|candidate| self.match_candidate(candidate))
            .collect()
    }

    fn name(&self) -> &str {
        "convention"
    }
}
