//! Performance benchmarks for the benchmark history store

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;
use tokio::runtime::Runtime;

use benchhist_store::{
    codec, Bench, BenchmarkHistoryStore, Commit, MemoryBackend, Person, Run, StoreConfig, SuiteHistory, SuiteId,
    Tool, WriteMode,
};

/// Create a run with nine latency benches, the shape of a real suite
fn create_benchmark_run(date: u64) -> Run {
    let person = Person::new("vibhansa", "vibhansa@microsoft.com").with_username("vibhansa-msft");
    Run {
        commit: Commit {
            author: person.clone(),
            committer: person,
            distinct: Some(true),
            id: "03e72e47d37985e5c28051c0ff17bdc0c7315e74".to_string(),
            message: "Correcting code for cache cleanup".to_string(),
            timestamp: "2025-03-07T23:48:22-08:00".to_string(),
            tree_id: Some("5b69276c81c0c728ae2dd3889b9743194fdcc990".to_string()),
            url: Some(
                "https://github.com/Azure/azure-storage-fuse/commit/03e72e47d37985e5c28051c0ff17bdc0c7315e74"
                    .to_string(),
            ),
        },
        date,
        tool: Tool::SmallerIsBetter,
        benches: (0..9)
            .map(|i| Bench::new(format!("random_read_{}_threads", i), 147.849 + i as f64 * 0.37, "milliseconds"))
            .collect(),
    }
}

fn create_benchmark_history(runs: usize) -> SuiteHistory {
    let mut history = SuiteHistory::new("https://github.com/Azure/azure-storage-fuse");
    for i in 0..runs {
        history.push_run(create_benchmark_run(1741426022487 + i as u64 * 86_400_000));
    }
    history
}

/// Benchmark data.js encoding and decoding
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for runs in &[10, 100, 1000] {
        let history = create_benchmark_history(*runs);
        let content = codec::encode(&history).unwrap();
        group.throughput(Throughput::Bytes(content.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", runs), &history, |b, history| {
            b.iter(|| black_box(codec::encode(history).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("decode", runs), &content, |b, content| {
            b.iter(|| black_box(codec::decode(content).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark appends through each write mode
fn bench_append(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("append");
    group.sample_size(20);

    for mode in [WriteMode::WriteThrough, WriteMode::Deferred] {
        group.bench_function(BenchmarkId::new("file", format!("{:?}", mode)), |b| {
            let temp_dir = TempDir::new().unwrap();
            let mut config = StoreConfig::default();
            config.storage.root_path = temp_dir.path().to_path_buf();
            config.storage.write_mode = mode;
            config.metrics.enabled = false;

            let store = BenchmarkHistoryStore::open(&config).unwrap();
            let suite = SuiteId::new("X86/premium/latency/read").unwrap();
            let mut date = 1741426022487u64;

            b.to_async(&rt).iter(|| {
                date += 1;
                let run = create_benchmark_run(date);
                let store = &store;
                let suite = &suite;
                async move { black_box(store.append_run(suite, run).await.unwrap()) }
            });
        });
    }

    group.finish();
}

/// Benchmark series extraction over growing suites
fn bench_series(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("series");

    for runs in &[100, 1000, 5000] {
        group.throughput(Throughput::Elements(*runs as u64));

        let store = rt.block_on(async {
            let backend = Arc::new(MemoryBackend::new());
            let suite = SuiteId::new("premium/latency/read").unwrap();
            backend
                .put_raw(&suite, codec::encode(&create_benchmark_history(*runs)).unwrap())
                .await;
            BenchmarkHistoryStore::with_backend(backend, &StoreConfig::default()).unwrap()
        });
        let suite = SuiteId::new("premium/latency/read").unwrap();

        group.bench_with_input(BenchmarkId::new("collect", runs), runs, |b, _| {
            b.to_async(&rt).iter(|| async {
                let series = store.get_series(&suite, "random_read_4_threads").await.unwrap();
                black_box(series.iter().map(|point| point.value).sum::<f64>())
            });
        });
    }

    group.finish();
}

/// Benchmark contended appends to one suite
fn bench_concurrent_appends(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("concurrent_appends");
    group.sample_size(10);

    for tasks in &[4, 16] {
        group.bench_with_input(BenchmarkId::new("memory", tasks), tasks, |b, &tasks| {
            b.to_async(&rt).iter(|| async move {
                let store = Arc::new(
                    BenchmarkHistoryStore::with_backend(Arc::new(MemoryBackend::new()), &StoreConfig::default())
                        .unwrap(),
                );
                let suite = SuiteId::new("standard/latency/write").unwrap();

                let handles: Vec<_> = (0..tasks)
                    .map(|i| {
                        let store = store.clone();
                        let suite = suite.clone();
                        tokio::spawn(async move { store.append_run(&suite, create_benchmark_run(1 + i as u64)).await })
                    })
                    .collect();

                let results = futures::future::join_all(handles).await;
                for result in results {
                    black_box(result.unwrap().unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_append, bench_series, bench_concurrent_appends);

criterion_main!(benches);
