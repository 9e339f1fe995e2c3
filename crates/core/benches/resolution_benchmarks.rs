//! Resolution benchmarks
//!
//! Measures cold graph construction, cached lookups, and teardown composition
//! for tagged collections of increasing width.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use wirebox_core::container::{BindingOptions, Recipe, Release};
use wirebox_core::{BoxError, Container};

trait Handler: Send + Sync {
    fn id(&self) -> usize;
}

trait Router: Send + Sync {
    fn routes(&self) -> usize;
}

struct Route(usize);

impl Handler for Route {
    fn id(&self) -> usize {
        self.0
    }
}

impl Release for Route {
    fn release(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

struct Table(Vec<Arc<dyn Handler>>);

impl Router for Table {
    fn routes(&self) -> usize {
        self.0.iter().map(|handler| handler.id()).count()
    }
}

/// Container with `width` handlers tagged "routes" and a router consuming them
fn wired_container(width: usize) -> Container {
    let mut container = Container::new();

    for i in 0..width {
        container
            .register::<dyn Handler, _, _>(
                Recipe::new(move |_| Ok(Route(i))).releasable(),
                |route| route as Arc<dyn Handler>,
                BindingOptions::new().tag("routes"),
            )
            .unwrap();
    }

    container
        .register::<dyn Router, _, _>(
            Recipe::new(|args| Ok(Table(args.tagged::<dyn Handler>()?)))
                .tagged::<dyn Handler>("routes"),
            |table| table as Arc<dyn Router>,
            BindingOptions::new(),
        )
        .unwrap();

    container
}

fn benchmark_cold_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_resolution");

    for width in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("tagged_width", width), width, |b, &width| {
            b.iter_batched(
                || wired_container(width),
                |mut container| black_box(container.resolve::<dyn Router>().unwrap().routes()),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_cached_resolution(c: &mut Criterion) {
    let mut container = wired_container(100);
    container.resolve::<dyn Router>().unwrap();

    c.bench_function("cached_resolution", |b| {
        b.iter(|| black_box(container.resolve::<dyn Router>().unwrap()));
    });
}

fn benchmark_teardown(c: &mut Criterion) {
    let mut group = c.benchmark_group("teardown");

    for width in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("compose_and_run", width), width, |b, &width| {
            b.iter_batched(
                || {
                    let mut container = wired_container(width);
                    container.resolve_with_teardown::<dyn Router>().unwrap().1
                },
                |mut teardown| teardown.run().unwrap(),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_validation(c: &mut Criterion) {
    let container = wired_container(1000);

    c.bench_function("validate_tagged_1000", |b| {
        b.iter(|| black_box(container.validate().unwrap()));
    });
}

criterion_group!(
    benches,
    benchmark_cold_resolution,
    benchmark_cached_resolution,
    benchmark_teardown,
    benchmark_validation
);
criterion_main!(benches);
