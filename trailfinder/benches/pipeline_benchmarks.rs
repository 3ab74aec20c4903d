use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::io::Cursor;
use std::num::NonZeroUsize;
use trailfinder::{filter_trails_parallel, Criteria, Field, FinderConfig, Trail, TrailFinder};

fn create_trails(count: usize) -> Vec<Trail> {
    (0..count)
        .map(|i| {
            Trail::with_values([
                (Field::AccessName, format!("Trail {}", i).as_str()),
                (Field::Restrooms, if i % 3 == 0 { "Yes" } else { "No" }),
                (Field::Picnic, if i % 2 == 0 { "Yes" } else { "No" }),
                (Field::ThLeash, "Leash Required"),
            ])
        })
        .collect()
}

fn create_csv(rows: usize) -> Vec<u8> {
    let mut csv = String::from("OBJECTID,AccessName,RESTROOMS,PICNIC,THLeash\n");
    for i in 0..rows {
        let restrooms = if i % 3 == 0 { "Yes" } else { "No" };
        let row = format!("{i},Trail {i},{restrooms},Yes,Leash Required\n");
        csv.push_str(&row);
    }
    csv.into_bytes()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_trails_parallel");
    let criteria = Criteria::new()
        .with("RESTROOMS", "yes")
        .with("PICNIC", "yes");

    for size in [100, 1_000, 10_000] {
        let trails = create_trails(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &trails, |b, trails| {
            b.iter(|| filter_trails_parallel(black_box(trails), black_box(&criteria)))
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let csv = create_csv(10_000);
    let criteria = Criteria::new().with("RESTROOMS", "yes");

    for batch_size in [10, 100, 1_000] {
        let finder = TrailFinder::new(FinderConfig {
            batch_size: NonZeroUsize::new(batch_size).unwrap(),
            ..Default::default()
        })
        .unwrap();

        group.bench_with_input(
            BenchmarkId::new("batch_size", batch_size),
            &csv,
            |b, csv| {
                b.iter(|| {
                    finder
                        .find_in(Cursor::new(csv.clone()), black_box(&criteria))
                        .unwrap()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_filter, bench_pipeline);
criterion_main!(benches);
