//! 服务注册表实现

use di_abstractions::{
    ContractScanner, GenericDefinition, ImplementationDescriptor, Lookup, RegistrationEntry,
    ServiceRegistry, TypeCatalog, TypeKey,
};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime};
use std::collections::HashMap;
use tracing::{debug, info};

/// 服务集合
///
/// 精确注册表按完整类型键索引；开放泛型模板按泛型定义（基础标识符 + 元数）索引。
/// 每个键保留全部注册的添加顺序，最后一个注册生效。
#[derive(Debug, Default)]
pub struct ServiceCollection {
    exact: HashMap<TypeKey, Vec<RegistrationEntry>>,
    open: HashMap<GenericDefinition, Vec<RegistrationEntry>>,
    next_id: usize,
    frozen: bool,
}

impl ServiceCollection {
    /// 创建空的服务集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册项总数
    pub fn len(&self) -> usize {
        self.next_id
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }

    /// 按注册顺序列出全部注册项
    pub fn registrations(&self) -> Vec<&RegistrationEntry> {
        let mut entries: Vec<&RegistrationEntry> = self
            .exact
            .values()
            .chain(self.open.values())
            .flatten()
            .collect();
        entries.sort_by_key(|entry| entry.id);
        entries
    }

    /// 扫描类型目录，按约定发现的注册以“不存在时添加”方式写入
    ///
    /// 返回新增的注册数量。
    pub fn scan<S, C>(&mut self, scanner: &S, catalog: &C) -> DependencyResult<usize>
    where
        S: ContractScanner + ?Sized,
        C: TypeCatalog + ?Sized,
    {
        self.ensure_writable()?;

        let discovered = scanner.discover(catalog.types());
        let found = discovered.len();
        let mut added = 0;
        for registration in discovered {
            if self.add_if_absent(
                registration.contract,
                registration.implementation,
                registration.lifetime,
            )? {
                added += 1;
            }
        }

        info!(
            "扫描 {} 完成 ({}): 发现 {} 个约定注册，新增 {} 个",
            catalog.name(),
            scanner.name(),
            found,
            added
        );
        Ok(added)
    }

    fn ensure_writable(&self) -> DependencyResult<()> {
        if self.frozen {
            return Err(DependencyError::ContainerAlreadyBuilt);
        }
        Ok(())
    }

    fn definition_of(contract: &TypeKey) -> DependencyResult<GenericDefinition> {
        contract
            .definition()
            .ok_or_else(|| DependencyError::InvalidTypeKey {
                input: contract.to_string(),
                message: "契约不能是裸泛型参数".to_string(),
            })
    }

    fn has_registration(&self, contract: &TypeKey) -> bool {
        if contract.is_closed() {
            return self.exact.get(contract).is_some_and(|entries| !entries.is_empty());
        }

        // 开放泛型模板按定义比较，参数名不同的模板视为同一契约
        let Some(definition) = contract.definition() else {
            return false;
        };
        self.open.get(&definition).is_some_and(|entries| {
            entries.iter().any(|entry| {
                entry.contract == *contract
                    || (entry.contract.is_open_generic() && contract.is_open_generic())
            })
        })
    }

    fn insert(
        &mut self,
        contract: TypeKey,
        implementation: ImplementationDescriptor,
        lifetime: Lifetime,
    ) -> DependencyResult<()> {
        let definition = Self::definition_of(&contract)?;

        debug!(
            "注册组件: {} -> {} ({})",
            contract,
            implementation.key(),
            lifetime
        );

        let entry = RegistrationEntry {
            id: self.next_id,
            contract,
            implementation,
            lifetime,
        };
        self.next_id += 1;

        if entry.contract.is_closed() {
            self.exact
                .entry(entry.contract.clone())
                .or_default()
                .push(entry);
        } else {
            self.open.entry(definition).or_default().push(entry);
        }
        Ok(())
    }

    fn open_candidates<'a>(
        &'a self,
        key: &TypeKey,
    ) -> impl DoubleEndedIterator<Item = &'a RegistrationEntry> + 'a {
        let key = key.clone();
        key.definition()
            .filter(|_| key.is_closed_generic())
            .and_then(|definition| self.open.get(&definition))
            .into_iter()
            .flatten()
            .filter(move |entry| entry.contract.unify(&key).is_some())
    }
}

impl ServiceRegistry for ServiceCollection {
    fn add(
        &mut self,
        contract: TypeKey,
        implementation: ImplementationDescriptor,
        lifetime: Lifetime,
    ) -> DependencyResult<()> {
        self.ensure_writable()?;
        self.insert(contract, implementation, lifetime)
    }

    fn add_if_absent(
        &mut self,
        contract: TypeKey,
        implementation: ImplementationDescriptor,
        lifetime: Lifetime,
    ) -> DependencyResult<bool> {
        self.ensure_writable()?;
        if self.has_registration(&contract) {
            debug!("已存在注册，跳过: {}", contract);
            return Ok(false);
        }
        self.insert(contract, implementation, lifetime)?;
        Ok(true)
    }

    fn lookup(&self, key: &TypeKey) -> Option<Lookup<'_>> {
        if let Some(entry) = self.exact.get(key).and_then(|entries| entries.last()) {
            return Some(Lookup::Exact(entry));
        }
        self.open_candidates(key).next_back().map(Lookup::OpenGeneric)
    }

    fn lookup_all(&self, key: &TypeKey) -> Vec<Lookup<'_>> {
        match self.exact.get(key) {
            Some(entries) if !entries.is_empty() => entries.iter().map(Lookup::Exact).collect(),
            _ => self.open_candidates(key).map(Lookup::OpenGeneric).collect(),
        }
    }

    fn freeze(&mut self) {
        if !self.frozen {
            info!("注册表已冻结，共 {} 个注册", self.len());
        }
        self.frozen = true;
    }

    fn is_frozen(&self) -> bool {
        self.frozen
    }
}
