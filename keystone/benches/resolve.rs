#![allow(missing_docs)]

use keystone::{Container, ContainerBuilder, Inject, Resolver, error::Error};

use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;

use std::sync::{Arc, RwLock};

fn container() -> Container {
    let mut builder = ContainerBuilder::new();
    builder.register_singleton(Counter::default());
    builder.register_scoped_default::<Cache>();
    builder.register_transient_default::<Transient>();
    builder.register_transient::<Handler>();
    builder.build()
}

fn benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let container = container();

    c.bench_function("singleton", |b| b.to_async(&rt).iter(
        || async { black_box(container.resolve_shared::<Counter>().await.unwrap()) }
    ));
    c.bench_function("scoped", |b| b.to_async(&rt).iter(|| async {
        let scope = container.create_scope();
        black_box(scope.resolve_shared::<Cache>().await.unwrap());
        black_box(scope.resolve_shared::<Cache>().await.unwrap());
    }));
    c.bench_function("transient", |b| b.to_async(&rt).iter(
        || async { black_box(container.resolve_shared::<Transient>().await.unwrap()) }
    ));
    c.bench_function("graph", |b| b.to_async(&rt).iter(
        || async { black_box(container.resolve_shared::<Handler>().await.unwrap()) }
    ));
}

criterion_group!(benches, benchmark);
criterion_main!(benches);

#[derive(Default, Clone, Debug)]
struct Counter(Arc<RwLock<i32>>);

#[derive(Default, Clone, Debug)]
struct Cache(Arc<RwLock<Vec<i32>>>);

#[derive(Default, Clone, Debug)]
struct Transient;

#[allow(dead_code)]
struct Handler {
    counter: Arc<Counter>,
    cache: Arc<Cache>,
    transient: Arc<Transient>,
}

impl Inject for Handler {
    async fn inject(resolver: &Resolver) -> Result<Self, Error> {
        Ok(Self {
            counter: resolver.resolve_shared::<Counter>().await?,
            cache: resolver.resolve_shared::<Cache>().await?,
            transient: resolver.resolve_shared::<Transient>().await?,
        })
    }
}
