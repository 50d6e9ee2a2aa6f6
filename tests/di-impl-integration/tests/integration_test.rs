//! di-impl 集成测试
//!
//! 覆盖约定扫描、开放泛型回退、显式封闭注册优先、嵌套泛型依赖、
//! 泛型参数不足、生命周期和循环依赖。

use di_abstractions::{
    DiContainer, ImplementationDescriptor, ServiceRegistry, ServiceResolver, TypeKey,
};
use di_impl::{Container, ConventionScanner, ServiceCollection};
use generic_di_demo::configure_samples;
use generic_di_demo::samples::{
    self, float, generic_contract, int, more_in_type_contract, sample_contract, Equality,
    GenericCaller, Summation,
};
use infrastructure_common::{ContainerConfig, DependencyError, DependencyResult, Lifetime};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Once};
use std::thread;
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

/// 初始化测试日志系统（只初始化一次）
fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn container<F>(setup: F) -> Container
where
    F: FnOnce(&mut ServiceCollection) -> DependencyResult<()>,
{
    init_test_logger();
    Container::build(ContainerConfig::default(), setup).unwrap()
}

fn generic_int() -> TypeKey {
    TypeKey::generic("IGenericService", [int()])
}

fn generic_float() -> TypeKey {
    TypeKey::generic("IGenericService", [float()])
}

#[test]
fn test_simple_registration_resolves() {
    let container = container(|services| {
        services.add_transient(sample_contract(), samples::sample_service())
    });

    let service = container
        .resolve_as::<Box<dyn Summation>>(&sample_contract())
        .unwrap();
    assert_eq!(service.sum(1, 2), 3);
}

#[test]
fn test_unregistered_contract_fails() {
    let container = container(|_| Ok(()));

    let error = container.resolve(&sample_contract()).unwrap_err();
    assert!(matches!(error, DependencyError::ComponentNotRegistered { .. }));
    assert!(!container.can_resolve(&sample_contract()));
}

#[test]
fn test_convention_scan_registers_service_types() {
    let container = container(|services| {
        services
            .scan(&ConventionScanner::new(), &samples::catalog())
            .map(|_| ())
    });

    let service = container.resolve(&sample_contract()).unwrap();
    assert_eq!(service.implementation(), &TypeKey::concrete("SampleService"));
    let service = service.downcast::<Box<dyn Summation>>().unwrap();
    assert_eq!(service.sum(1, 2), 3);

    // ExplicitService 不符合命名约定，IGenericService<int> 走开放泛型回退
    let generic = container.resolve(&generic_int()).unwrap();
    assert_eq!(
        generic.implementation(),
        &TypeKey::generic("GenericService", [int()])
    );
    assert!(!container.can_resolve(&TypeKey::open("GenericCaller", ["T"])));
}

#[test]
fn test_scan_does_not_override_explicit_registration() {
    let container = container(|services| {
        services.add_transient(
            sample_contract(),
            ImplementationDescriptor::new(TypeKey::concrete("ExplicitSampleService"), |_| {
                Ok(Box::new(samples::SampleService) as Box<dyn Summation>)
            }),
        )?;
        let added = services.scan(&ConventionScanner::new(), &samples::catalog())?;
        assert_eq!(added, 2);
        Ok(())
    });

    let service = container.resolve(&sample_contract()).unwrap();
    assert_eq!(
        service.implementation(),
        &TypeKey::concrete("ExplicitSampleService")
    );
}

#[test]
fn test_explicit_registration_after_scan_overrides_convention() {
    let container = container(|services| {
        services.scan(&ConventionScanner::new(), &samples::catalog())?;
        services.add_transient(
            sample_contract(),
            ImplementationDescriptor::new(TypeKey::concrete("ExplicitSampleService"), |_| {
                Ok(Box::new(samples::SampleService) as Box<dyn Summation>)
            }),
        )
    });

    let service = container.resolve(&sample_contract()).unwrap();
    assert_eq!(
        service.implementation(),
        &TypeKey::concrete("ExplicitSampleService")
    );
    assert_eq!(container.resolve_all(&sample_contract()).unwrap().len(), 2);
}

#[test]
fn test_open_generic_registration_closes_over_request() {
    let container = container(|services| {
        services.add_transient(generic_contract(), samples::generic_service())
    });

    let service = container.resolve_generic("IGenericService", [int()]).unwrap();
    assert_eq!(
        service.implementation(),
        &TypeKey::generic("GenericService", [int()])
    );
    let service = service.downcast::<Box<dyn Equality<i32>>>().unwrap();
    assert!(service.equal(3, 3));
    assert!(!service.equal(3, 4));
}

#[test]
fn test_explicit_closed_registration_wins_over_open_template() {
    // 两种注册顺序结果一致：精确匹配优先于开放泛型，与顺序无关
    let explicit_first = container(|services| {
        services.add_transient(generic_int(), samples::explicit_service())?;
        services.add_transient(generic_contract(), samples::generic_service())
    });
    let open_first = container(|services| {
        services.add_transient(generic_contract(), samples::generic_service())?;
        services.add_transient(generic_int(), samples::explicit_service())
    });

    for container in [explicit_first, open_first] {
        let service = container.resolve(&generic_int()).unwrap();
        assert_eq!(service.implementation(), &TypeKey::concrete("ExplicitService"));
        assert!(service.is::<Box<dyn Equality<i32>>>());

        let service = container.resolve(&generic_float()).unwrap();
        assert_eq!(
            service.implementation(),
            &TypeKey::generic("GenericService", [float()])
        );
        let service = service.downcast::<Box<dyn Equality<f32>>>().unwrap();
        assert!(service.equal(3.0, 3.0));
    }
}

#[test]
fn test_generic_caller_dependency_narrows_to_explicit_registration() {
    let container = container(|services| {
        services.add_transient(generic_contract(), samples::generic_service())?;
        services.add_transient(generic_int(), samples::explicit_service())?;
        services.add_self(samples::generic_caller(), Lifetime::Transient)
    });

    let caller = container
        .resolve_as::<GenericCaller<i32>>(&TypeKey::generic("GenericCaller", [int()]))
        .unwrap();
    assert_eq!(caller.serv_implementation(), &TypeKey::concrete("ExplicitService"));
    assert!(caller.equal(3, 3));

    let caller = container
        .resolve_as::<GenericCaller<f32>>(&TypeKey::generic("GenericCaller", [float()]))
        .unwrap();
    assert_eq!(
        caller.serv_implementation(),
        &TypeKey::generic("GenericService", [float()])
    );
}

#[test]
fn test_underspecified_generic_arguments_fail() {
    let container = container(|services| {
        services.add_transient(more_in_type_contract(), samples::more_in_type_service())
    });

    let error = container
        .resolve(&TypeKey::generic("IMoreInTypeService", [int()]))
        .unwrap_err();
    assert!(error.is_ambiguous_generic_arguments());
    match error {
        DependencyError::AmbiguousGenericArguments { unbound, .. } => {
            assert_eq!(unbound, vec!["U".to_string()]);
        }
        other => panic!("期望泛型参数不足错误，实际: {other}"),
    }

    // 失败不影响其他解析
    assert!(container.can_resolve(&TypeKey::generic("IMoreInTypeService", [int()])));
}

#[test]
fn test_open_request_is_rejected() {
    let container = container(|services| {
        services.add_transient(generic_contract(), samples::generic_service())
    });

    let error = container.resolve_str("IGenericService<>").unwrap_err();
    assert!(error.is_ambiguous_generic_arguments());
    assert!(matches!(
        container.resolve_str("IGenericService<int"),
        Err(DependencyError::InvalidTypeKey { .. })
    ));
}

#[test]
fn test_transient_creates_new_instances_and_singleton_shares_one() {
    let container = container(|services| {
        services.add_transient(sample_contract(), samples::sample_service())?;
        services.add_singleton(generic_contract(), samples::generic_service())
    });

    let a = container.resolve(&sample_contract()).unwrap();
    let b = container.resolve(&sample_contract()).unwrap();
    assert!(!a.ptr_eq(&b));

    let a = container.resolve(&generic_int()).unwrap();
    let b = container.resolve(&generic_int()).unwrap();
    assert!(a.ptr_eq(&b));

    // 每个封闭类型各有一个单例
    let c = container.resolve(&generic_float()).unwrap();
    assert!(!a.ptr_eq(&c));
    assert_eq!(container.stats().active_singletons, 2);
}

#[derive(Debug)]
struct Node;

fn node(name: &str, dependencies: &[&str]) -> ImplementationDescriptor {
    ImplementationDescriptor::new(TypeKey::concrete(name), |_| Ok(Node))
        .with_dependencies(dependencies.iter().map(|dependency| TypeKey::concrete(*dependency)))
}

#[test]
fn test_cyclic_dependency_is_detected() {
    let container = container(|services| {
        services.add_self(node("A", &["B"]), Lifetime::Singleton)?;
        services.add_self(node("B", &["A"]), Lifetime::Transient)
    });

    match container.resolve(&TypeKey::concrete("A")).unwrap_err() {
        DependencyError::CircularDependency { dependency_chain } => {
            assert_eq!(dependency_chain, "A -> B -> A");
        }
        other => panic!("期望循环依赖错误，实际: {other}"),
    }
    // 循环失败后单例缓存保持为空
    assert_eq!(container.stats().active_singletons, 0);
}

#[test]
fn test_concurrent_cyclic_singletons_report_cycle() {
    init_test_logger();
    for _ in 0..100 {
        let container = Arc::new(container(|services| {
            services.add_self(node("A", &["B"]), Lifetime::Singleton)?;
            services.add_self(node("B", &["A"]), Lifetime::Singleton)
        }));
        let barrier = Arc::new(Barrier::new(2));
        let (sender, receiver) = mpsc::channel();

        for name in ["A", "B"] {
            let container = Arc::clone(&container);
            let barrier = Arc::clone(&barrier);
            let sender = sender.clone();
            thread::spawn(move || {
                barrier.wait();
                let result = container.resolve(&TypeKey::concrete(name));
                sender.send(result.map(|_| ())).ok();
            });
        }

        for _ in 0..2 {
            let result = receiver
                .recv_timeout(Duration::from_secs(3))
                .expect("两个线程解析循环单例时互相阻塞");
            assert!(matches!(
                result,
                Err(DependencyError::CircularDependency { .. })
            ));
        }
    }
}

#[test]
fn test_generic_self_cycle_is_detected() {
    let container = container(|services| {
        services.add_self(
            ImplementationDescriptor::new(TypeKey::open("Loop", ["T"]), |_| Ok(Node))
                .with_dependency(TypeKey::open("Loop", ["T"])),
            Lifetime::Transient,
        )
    });

    let error = container
        .resolve(&TypeKey::generic("Loop", [int()]))
        .unwrap_err();
    assert!(matches!(error, DependencyError::CircularDependency { .. }));
}

#[test]
fn test_resolution_depth_is_limited() {
    init_test_logger();
    let config = ContainerConfig {
        max_resolution_depth: 2,
        ..ContainerConfig::default()
    };
    let container = Container::build(config, |services| {
        services.add_self(node("A", &["B"]), Lifetime::Transient)?;
        services.add_self(node("B", &["C"]), Lifetime::Transient)?;
        services.add_self(node("C", &[]), Lifetime::Transient)
    })
    .unwrap();

    assert!(matches!(
        container.resolve(&TypeKey::concrete("A")),
        Err(DependencyError::MaxDepthExceeded { depth: 2, .. })
    ));
    assert!(container.resolve(&TypeKey::concrete("B")).is_ok());
}

#[test]
fn test_container_is_configured_once() {
    let mut container = container(|services| {
        services.add_transient(sample_contract(), samples::sample_service())
    });

    let result = container.configure(|services| {
        services.add_transient(generic_contract(), samples::generic_service())
    });
    assert!(matches!(result, Err(DependencyError::ContainerAlreadyBuilt)));
    assert!(container.resolve(&sample_contract()).is_ok());
    assert!(!container.can_resolve(&generic_int()));
}

#[test]
fn test_resolve_all_returns_every_registration_in_order() {
    let container = container(|services| {
        services.add_transient(sample_contract(), samples::sample_service())?;
        services.add_transient(
            sample_contract(),
            ImplementationDescriptor::new(TypeKey::concrete("OtherSampleService"), |_| {
                Ok(Box::new(samples::SampleService) as Box<dyn Summation>)
            }),
        )
    });

    let all = container.resolve_all(&sample_contract()).unwrap();
    let implementations: Vec<String> = all
        .iter()
        .map(|instance| instance.implementation().to_string())
        .collect();
    assert_eq!(implementations, vec!["SampleService", "OtherSampleService"]);

    // 单个解析取最后一个注册
    let last = container.resolve(&sample_contract()).unwrap();
    assert_eq!(last.implementation(), &TypeKey::concrete("OtherSampleService"));
    assert!(container.resolve_all(&generic_int()).unwrap().is_empty());
}

#[test]
fn test_failed_singleton_construction_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let container = container(move |services| {
        services.add_singleton(
            TypeKey::concrete("IFlaky"),
            ImplementationDescriptor::new(TypeKey::concrete("Flaky"), move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(DependencyError::creation_failed("Flaky", "首次创建失败"));
                }
                Ok(Node)
            }),
        )
    });

    assert!(matches!(
        container.resolve(&TypeKey::concrete("IFlaky")),
        Err(DependencyError::ComponentCreationFailed { .. })
    ));
    let first = container.resolve(&TypeKey::concrete("IFlaky")).unwrap();
    let second = container.resolve(&TypeKey::concrete("IFlaky")).unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(container.stats().resolution_errors, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_singleton_is_constructed_once_under_concurrency() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructions);
    let container = Arc::new(container(move |services| {
        services.add_singleton(
            generic_contract(),
            ImplementationDescriptor::new(TypeKey::open("SlowService", ["T"]), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(Node)
            }),
        )
    }));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let container = Arc::clone(&container);
            tokio::task::spawn_blocking(move || container.resolve(&generic_int()))
        })
        .collect();

    let mut instances = Vec::new();
    for handle in handles {
        instances.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transient_resolution_is_independent() {
    let container = Arc::new(container(|services| {
        services.add_transient(generic_contract(), samples::generic_service())?;
        services.add_transient(generic_int(), samples::explicit_service())
    }));

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let container = Arc::clone(&container);
            tokio::task::spawn_blocking(move || {
                let key = if index % 2 == 0 { generic_int() } else { generic_float() };
                container.resolve(&key).map(|instance| instance.implementation().clone())
            })
        })
        .collect();

    for (index, handle) in handles.into_iter().enumerate() {
        let implementation = handle.await.unwrap().unwrap();
        if index % 2 == 0 {
            assert_eq!(implementation, TypeKey::concrete("ExplicitService"));
        } else {
            assert_eq!(implementation, TypeKey::generic("GenericService", [float()]));
        }
    }
}

#[test]
fn test_convention_lifetime_comes_from_config() {
    init_test_logger();
    let config = ContainerConfig::from_toml_str(
        r#"
        [scan]
        lifetime = "singleton"
        "#,
    )
    .unwrap();

    let mut container = Container::with_config(config);
    let scanner = container.convention_scanner();
    container
        .configure(|services| services.scan(&scanner, &samples::catalog()).map(|_| ()))
        .unwrap();

    let a = container.resolve(&sample_contract()).unwrap();
    let b = container.resolve(&sample_contract()).unwrap();
    assert!(a.ptr_eq(&b));
}

#[test]
fn test_demo_configuration_resolves_sample_keys() {
    init_test_logger();
    let mut container = Container::new();
    let scanner = container.convention_scanner();
    container
        .configure(|services| configure_samples(services, &scanner))
        .unwrap();

    let expected = [
        ("ISampleService", "SampleService"),
        ("IGenericService<int>", "ExplicitService"),
        ("IGenericService<float>", "GenericService<float>"),
        ("GenericCaller<int>", "GenericCaller<int>"),
    ];
    for (key, implementation) in expected {
        let instance = container.resolve_str(key).unwrap();
        assert_eq!(instance.implementation().to_string(), implementation);
    }

    assert!(container
        .resolve_str("IMoreInTypeService<int>")
        .unwrap_err()
        .is_ambiguous_generic_arguments());
}
