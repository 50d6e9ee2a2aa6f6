//! # 泛型依赖注入演示
//!
//! 示例服务和演示容器的装配例程，供演示程序和集成测试共用。

pub mod samples;

use di_abstractions::{ContractScanner, ServiceRegistry, TypeKey};
use di_impl::ServiceCollection;
use infrastructure_common::DependencyResult;
use tracing::info;

/// 装配演示容器
///
/// 先按约定扫描示例目录，再显式注册 `IGenericService<int>` 的专用实现
/// 和自注册的 `GenericCaller<T>`。
pub fn configure_samples<S>(services: &mut ServiceCollection, scanner: &S) -> DependencyResult<()>
where
    S: ContractScanner + ?Sized,
{
    let added = services.scan(scanner, &samples::catalog())?;
    info!("约定扫描新增 {} 个注册", added);

    services.add_transient(
        TypeKey::generic("IGenericService", [samples::int()]),
        samples::explicit_service(),
    )?;
    services.add_transient(
        TypeKey::open("GenericCaller", ["T"]),
        samples::generic_caller(),
    )?;
    Ok(())
}
