use criterion::{black_box, criterion_group, criterion_main, Criterion};
use phiflow::prelude::*;

fn mass_benchmark(c: &mut Criterion) {
    let track1 = Track::from_momentum(0.8, 0.1, 0.3, 1);
    let track2 = Track::from_momentum(0.6, -0.2, 0.2, -1);

    c.bench_function("Invariant mass", |b| {
        b.iter(|| {
            let result = invariant_mass(black_box(&track1), black_box(&track2));
            black_box(result);
        })
    });
    c.bench_function("Candidate pair", |b| {
        b.iter(|| {
            let result = CandidatePair::new(black_box(&track1), black_box(&track2));
            black_box(result);
        })
    });
}

criterion_group!(benches, mass_benchmark,);
criterion_main!(benches);
