//! Fusion and Batch Benchmarks
//!
//! Measures RRF merging at realistic fan-out sizes and memory-provider batch
//! upserts on a simulated clock.
//!
//! Run with: `cargo bench --bench fusion`

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use vecbridge::batch::BatchWriter;
use vecbridge::dst::{DeterministicRng, SimClock};
use vecbridge::fusion::{rrf_merge, RrfParams};
use vecbridge::provider::{MemoryProvider, VectorProvider};
use vecbridge::types::{IndexConfig, Metric, SearchResult, VectorRecord};

// =============================================================================
// Helper Functions
// =============================================================================

/// Two rankings over overlapping id ranges, shuffled deterministically.
fn rankings(size: usize, seed: u64) -> (Vec<SearchResult>, Vec<SearchResult>) {
    let mut rng = DeterministicRng::new(seed);
    let mut dense: Vec<usize> = (0..size).collect();
    let mut sparse: Vec<usize> = (size / 2..size + size / 2).collect();
    rng.shuffle(&mut dense);
    rng.shuffle(&mut sparse);

    let to_results = |ids: Vec<usize>| -> Vec<SearchResult> {
        ids.into_iter()
            .enumerate()
            .map(|(rank, id)| SearchResult::new(format!("doc-{id}"), 1.0 / (rank as f32 + 1.0)))
            .collect()
    };
    (to_results(dense), to_results(sparse))
}

fn records(count: usize, dimension: usize, seed: u64) -> Vec<VectorRecord> {
    let mut rng = DeterministicRng::new(seed);
    (0..count)
        .map(|i| {
            let values = (0..dimension).map(|_| rng.next_float() as f32).collect();
            VectorRecord::dense(format!("doc-{i}"), values)
        })
        .collect()
}

// =============================================================================
// Benchmark: RRF Merge
// =============================================================================

fn bench_rrf_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("rrf_merge");

    for size in [20, 200, 2_000] {
        let (dense, sparse) = rankings(size, 42);
        group.throughput(Throughput::Elements((dense.len() + sparse.len()) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| rrf_merge(&dense, &sparse, size / 2, RrfParams::default()));
        });
    }

    group.finish();
}

// =============================================================================
// Benchmark: Batch Upsert
// =============================================================================

fn bench_batch_upsert(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("memory_batch_upsert");
    group.measurement_time(Duration::from_secs(10));

    for batch_size in [16, 100, 500] {
        let input = records(1_000, 128, 7);
        group.throughput(Throughput::Elements(input.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.to_async(&rt).iter(|| async {
                    let provider = MemoryProvider::default()
                        .with_batch_writer(BatchWriter::simulated(SimClock::new(), 1));
                    provider.setup().await.unwrap();
                    provider
                        .create_index(&IndexConfig::dense("dense", 128, Metric::Cosine))
                        .await
                        .unwrap();
                    provider
                        .batch_upsert_vectors("dense", &input, batch_size, None)
                        .await
                        .unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_rrf_merge, bench_batch_upsert);
criterion_main!(benches);
