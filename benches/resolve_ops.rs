//! Benchmarks for the resolution hot paths.

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use corium::entity::EntityDescriptor;
use corium::module::Module;
use corium::resolver::{Resolver, collection_of};

fn model_resolver(entities: usize) -> Arc<Resolver> {
    let resolver = Arc::new(Resolver::new());
    for i in 0..entities {
        let location = format!("models.entity_{i}");
        let name = format!("Entity{i}");
        let descriptor = EntityDescriptor::new(&location, &name);
        let exported_location = location.clone();
        resolver.register_module(location.clone(), move || {
            Ok(Module::new(exported_location.clone()).export_entity(&descriptor))
        });
        resolver.register_lazy_import(name, location, format!("Entity{i}"));
    }
    resolver
}

fn bench_cached_resolve(c: &mut Criterion) {
    let resolver = model_resolver(1);
    resolver.resolve_lazy_import("Entity0").unwrap();

    c.bench_function("resolve_cached", |bench| {
        bench.iter(|| black_box(resolver.resolve_lazy_import("Entity0").unwrap()))
    });
}

fn bench_direct_resolve(c: &mut Criterion) {
    let resolver = model_resolver(1);

    c.bench_function("resolve_direct", |bench| {
        bench.iter(|| black_box(resolver.lazy_import("models.entity_0", "Entity0").unwrap()))
    });
}

fn bench_sweep_100(c: &mut Criterion) {
    let resolver = model_resolver(100);
    for i in 0..100 {
        let value = resolver
            .resolve_lazy_import(&format!("Entity{i}"))
            .unwrap();
        let owner = corium::entity::as_entity(&value).unwrap();
        let target = format!("Entity{}", (i + 1) % 100);
        resolver.register_relationship(owner, "peers", collection_of(&resolver, &target));
    }

    c.bench_function("sweep_100", |bench| {
        bench.iter(|| black_box(resolver.resolve_lazy_relationships()))
    });
}

criterion_group!(
    benches,
    bench_cached_resolve,
    bench_direct_resolve,
    bench_sweep_100
);
criterion_main!(benches);
