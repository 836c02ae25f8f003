use criterion::{black_box, criterion_group, criterion_main, Criterion};
use setbench::adapter::{visit_registry, AdapterVisitor, SetAdapter, TunableVariant};
use setbench::{Distribution, Workload, WorkloadGenerator};

fn bench_adapter<A: SetAdapter>(c: &mut Criterion, adapter: A, a: &Workload, b: &Workload) {
    let variant = TunableVariant::threshold(4096);
    let mut group = c.benchmark_group(adapter.name());
    let sa = adapter.build(a, &variant);
    let sb = adapter.build(b, &variant);

    group.bench_function("build", |bench| {
        bench.iter(|| black_box(adapter.build(black_box(a), &variant)))
    });

    group.bench_function("intersect", |bench| {
        bench.iter(|| black_box(adapter.intersect(black_box(&sa), black_box(&sb))))
    });

    group.bench_function("union", |bench| {
        bench.iter(|| black_box(adapter.union(black_box(&sa), black_box(&sb))))
    });

    group.finish();
}

/// Benches every adapter it is handed against the same pair of workloads.
struct Benches<'a> {
    c: &'a mut Criterion,
    a: &'a Workload,
    b: &'a Workload,
}

impl AdapterVisitor for Benches<'_> {
    fn visit<A: SetAdapter + 'static>(&mut self, adapter: A) {
        bench_adapter(self.c, adapter, self.a, self.b);
    }
}

fn bench_sets(c: &mut Criterion) {
    let mut generator = WorkloadGenerator::new(1_000_000, 42, 1.0).unwrap();
    let a = generator.generate(0.01, Distribution::Uniform).unwrap();
    let b = generator.generate(0.01, Distribution::Zipfian).unwrap();

    visit_registry(&mut Benches { c, a: &a, b: &b });
}

criterion_group!(benches, bench_sets);
criterion_main!(benches);
