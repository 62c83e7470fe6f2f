use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mixfit::prelude::*;

fn objective() -> MixtureObjective {
    let data = sample_mixture(Key::new(0), &[1.0, 5.0], &[-2.0, 5.0], &[1.1, 2.0], 6000)
        .expect("valid mixture");
    MixtureObjective::new(data, DirichletPrior::symmetric(2, 2.0).expect("valid prior"))
}

/// Benchmark the loss and its gradient on 6000 observations
fn benchmark_posterior(c: &mut Criterion) {
    let objective = objective();
    let params = random_params(Key::new(1), 2).expect("valid parameters");

    c.bench_function("negative_log_posterior", |b| {
        b.iter(|| objective.cost(black_box(&params)))
    });
    c.bench_function("negative_log_posterior_gradient", |b| {
        b.iter(|| objective.gradient(black_box(&params)))
    });
}

/// Benchmark 100 Adam iterations, single run and eight runs in parallel
fn benchmark_driver(c: &mut Criterion) {
    let objective = objective();
    let driver = Driver::new(&objective, Adam::new(0.5));
    let states: Vec<_> = Key::new(2)
        .split(8)
        .into_iter()
        .map(|key| driver.initialize(random_params(key, 2).expect("valid parameters")))
        .collect();

    c.bench_function("run", |b| {
        b.iter(|| driver.run(black_box(states[0].clone()), 100))
    });
    c.bench_function("run_many", |b| {
        b.iter(|| driver.run_many(black_box(states.clone()), 100))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(20)
        .noise_threshold(0.10); // Performance changes less than 10% will be ignored
    targets = benchmark_posterior, benchmark_driver
}
criterion_main!(benches);
