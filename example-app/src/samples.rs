//! 示例服务
//!
//! 契约以 trait 对象的形式保存在实例中（`Box<dyn Summation>`、
//! `Box<dyn Equality<T>>`），实现类型通过解析结果的实现键区分。

use di_abstractions::{
    Activation, ImplementationDescriptor, Instance, StaticTypeCatalog, TypeDescriptor, TypeKey,
};
use infrastructure_common::{DependencyError, DependencyResult};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// `ISampleService` 契约
pub trait Summation: Send + Sync + Debug {
    fn sum(&self, a: i32, b: i32) -> i32;
}

/// `IGenericService<T>` 契约
pub trait Equality<T>: Send + Sync + Debug {
    fn equal(&self, a: T, b: T) -> bool;
}

/// `ISampleService` 的约定实现
#[derive(Debug, Default)]
pub struct SampleService;

impl Summation for SampleService {
    fn sum(&self, a: i32, b: i32) -> i32 {
        a + b
    }
}

/// `IGenericService<T>` 的开放泛型实现
#[derive(Debug)]
pub struct GenericService<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for GenericService<T> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: PartialEq + Debug> Equality<T> for GenericService<T> {
    fn equal(&self, a: T, b: T) -> bool {
        a == b
    }
}

/// `IGenericService<int>` 的显式实现
#[derive(Debug, Default)]
pub struct ExplicitService;

impl Equality<i32> for ExplicitService {
    fn equal(&self, a: i32, b: i32) -> bool {
        a == b
    }
}

/// 依赖 `IGenericService<T>` 的泛型调用方
#[derive(Debug)]
pub struct GenericCaller<T> {
    serv: Arc<Box<dyn Equality<T>>>,
    serv_implementation: TypeKey,
}

impl<T> GenericCaller<T> {
    pub fn equal(&self, a: T, b: T) -> bool {
        self.serv.equal(a, b)
    }

    /// 注入的 `IGenericService<T>` 的实现类型
    pub fn serv_implementation(&self) -> &TypeKey {
        &self.serv_implementation
    }
}

/// 实现类型比契约多一个类型参数，无法从请求推断
#[derive(Debug)]
pub struct MoreInTypeService {
    pub type_args: Vec<TypeKey>,
}

pub fn sample_contract() -> TypeKey {
    TypeKey::concrete("ISampleService")
}

pub fn generic_contract() -> TypeKey {
    TypeKey::open("IGenericService", ["T"])
}

pub fn more_in_type_contract() -> TypeKey {
    TypeKey::open("IMoreInTypeService", ["T"])
}

pub fn int() -> TypeKey {
    TypeKey::concrete("int")
}

pub fn float() -> TypeKey {
    TypeKey::concrete("float")
}

pub fn sample_service() -> ImplementationDescriptor {
    ImplementationDescriptor::new(TypeKey::concrete("SampleService"), |_| {
        Ok(Box::new(SampleService) as Box<dyn Summation>)
    })
}

pub fn generic_service() -> ImplementationDescriptor {
    ImplementationDescriptor::from_factory(
        TypeKey::open("GenericService", ["T"]),
        Arc::new(|activation: Activation| -> DependencyResult<Instance> {
            let instance: Instance = match activation.type_arg(0)?.base() {
                "int" => Arc::new(Box::new(GenericService::<i32>::default()) as Box<dyn Equality<i32>>),
                "float" => Arc::new(Box::new(GenericService::<f32>::default()) as Box<dyn Equality<f32>>),
                "string" => Arc::new(
                    Box::new(GenericService::<String>::default()) as Box<dyn Equality<String>>
                ),
                other => return Err(unsupported(&activation, other)),
            };
            Ok(instance)
        }),
    )
}

pub fn explicit_service() -> ImplementationDescriptor {
    ImplementationDescriptor::new(TypeKey::concrete("ExplicitService"), |_| {
        Ok(Box::new(ExplicitService) as Box<dyn Equality<i32>>)
    })
}

pub fn generic_caller() -> ImplementationDescriptor {
    ImplementationDescriptor::from_factory(
        TypeKey::open("GenericCaller", ["T"]),
        Arc::new(|activation: Activation| -> DependencyResult<Instance> {
            let instance: Instance = match activation.type_arg(0)?.base() {
                "int" => Arc::new(caller::<i32>(&activation)?),
                "float" => Arc::new(caller::<f32>(&activation)?),
                "string" => Arc::new(caller::<String>(&activation)?),
                other => return Err(unsupported(&activation, other)),
            };
            Ok(instance)
        }),
    )
    .with_dependency(generic_contract())
}

pub fn more_in_type_service() -> ImplementationDescriptor {
    ImplementationDescriptor::new(TypeKey::open("MoreInTypeService", ["T", "U"]), |activation| {
        Ok(MoreInTypeService {
            type_args: activation.type_args().to_vec(),
        })
    })
}

fn caller<T: 'static>(activation: &Activation) -> DependencyResult<GenericCaller<T>> {
    let dependency = activation.dependency(0)?;
    Ok(GenericCaller {
        serv: activation.dependency_as::<Box<dyn Equality<T>>>(0)?,
        serv_implementation: dependency.implementation().clone(),
    })
}

fn unsupported(activation: &Activation, type_arg: &str) -> DependencyError {
    DependencyError::creation_failed(
        activation.implementation().to_string(),
        format!("不支持的类型参数 {type_arg}"),
    )
}

/// 示例程序集的类型目录
pub fn catalog() -> StaticTypeCatalog {
    StaticTypeCatalog::new("samples")
        .with_type(TypeDescriptor::interface(sample_contract()))
        .with_type(TypeDescriptor::class(sample_service()).implements(sample_contract()))
        .with_type(TypeDescriptor::interface(generic_contract()))
        .with_type(TypeDescriptor::class(generic_service()).implements(generic_contract()))
        .with_type(
            TypeDescriptor::class(explicit_service())
                .implements(TypeKey::generic("IGenericService", [int()])),
        )
        .with_type(TypeDescriptor::class(generic_caller()))
        .with_type(TypeDescriptor::interface(more_in_type_contract()))
        .with_type(TypeDescriptor::class(more_in_type_service()).implements(more_in_type_contract()))
        .with_type(
            TypeDescriptor::abstract_class(TypeKey::concrete("ServiceBase"))
                .implements(TypeKey::concrete("IServiceBase")),
        )
}
