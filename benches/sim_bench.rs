//! Benchmarks for the hot paths: LRU set churn and a full sequential
//! sweep through the simulator.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tiersim::mem::LruSet;
use tiersim::traffic::{TraceGenConfig, TraceGenerator};
use tiersim::{SimConfig, Simulator};

fn bench_lru_churn(c: &mut Criterion) {
    c.bench_function("lru_insert_touch_evict_4k", |b| {
        b.iter(|| {
            let mut set = LruSet::new(4096);
            for key in 0..16_384u64 {
                if set.contains(key % 6000) {
                    set.touch(key % 6000);
                } else {
                    set.insert(key % 6000);
                }
            }
            black_box(set.len());
        })
    });
}

fn bench_sequential_sweep(c: &mut Criterion) {
    let config = SimConfig {
        t1_total_lines: 4096,
        num_t1_banks: 4,
        t2_total_lines: 65536,
        num_t2_banks: 16,
        ..SimConfig::default()
    };
    let gen_config = TraceGenConfig {
        kind: "strided".to_string(),
        stride_lines: 1,
        count: 8192,
        ..TraceGenConfig::default()
    };
    let ops = TraceGenerator::new(&gen_config).generate();

    c.bench_function("sequential_sweep_8k_reads", |b| {
        b.iter(|| {
            let sim = Simulator::new(config.clone()).unwrap();
            let metrics = sim.run(black_box(&ops)).unwrap();
            black_box(metrics.total_cycles());
        })
    });
}

criterion_group!(benches, bench_lru_churn, bench_sequential_sweep);
criterion_main!(benches);
