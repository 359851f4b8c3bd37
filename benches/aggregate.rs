use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use livemap::libs::worker::{aggregate, Job, Mode};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_walks(traces: usize, bins: usize) -> Vec<Vec<Option<[f64; 3]>>> {
    let mut rng = SmallRng::seed_from_u64(42);
    (0..traces)
        .map(|_| {
            let mut p = [0.0f64; 3];
            (0..bins)
                .map(|_| {
                    for c in p.iter_mut() {
                        *c += rng.gen_range(-50.0..50.0);
                    }
                    // a few holes, as real traces have
                    if rng.gen_bool(0.02) {
                        None
                    } else {
                        Some(p)
                    }
                })
                .collect()
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    group.sample_size(20);

    for bins in [64, 256] {
        let lists = random_walks(100, bins);
        let contact = Job::new(Mode::Contact, bins, &lists, 256.0).unwrap();
        let distance = Job::new(Mode::Distance, bins, &lists, 0.0).unwrap();

        group.bench_with_input(BenchmarkId::new("contact", bins), &contact, |b, job| {
            b.iter(|| aggregate(job).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("distance", bins), &distance, |b, job| {
            b.iter(|| aggregate(job).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
