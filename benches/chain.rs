use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use ampstack::chain::build_chain;
use ampstack::module::{ModuleKind, Modules};

const SAMPLE_RATE: f32 = 48_000.0;
const BUFFER_SIZE: usize = 128;

fn bench_sample_vs_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sample vs Block Processing");

    let modules = Modules::new();

    group.bench_function("sample-by-sample", |b| {
        let mut chain = build_chain(&modules, false, SAMPLE_RATE);
        let input: Vec<f32> = vec![0.5f32; BUFFER_SIZE];

        b.iter(|| {
            for &sample in &input {
                black_box(chain.process(black_box(sample)));
            }
        });
    });

    group.bench_function("block", |b| {
        let mut chain = build_chain(&modules, false, SAMPLE_RATE);
        let mut buffer: Vec<f32> = vec![0.5f32; BUFFER_SIZE];

        b.iter(|| {
            chain.process_block(black_box(&mut buffer));
            black_box(&buffer);
        });
    });

    group.finish();
}

fn bench_module_combinations(c: &mut Criterion) {
    let mut group = c.benchmark_group("Chain Configurations");

    let cases = [
        ("closing-only", vec![]),
        ("amp", vec![ModuleKind::Amp]),
        ("amp+cabinet", vec![ModuleKind::Amp, ModuleKind::Cabinet]),
        (
            "full",
            vec![ModuleKind::Pedal, ModuleKind::Amp, ModuleKind::Cabinet],
        ),
    ];

    for (label, enabled) in cases {
        group.bench_with_input(BenchmarkId::new("block", label), &enabled, |b, enabled| {
            let mut modules = Modules::new();
            for kind in ModuleKind::ALL {
                modules.set_enabled(kind, enabled.contains(&kind));
            }
            let mut chain = build_chain(&modules, false, SAMPLE_RATE);
            let mut buffer: Vec<f32> = vec![0.5f32; BUFFER_SIZE];

            b.iter(|| {
                chain.process_block(black_box(&mut buffer));
                black_box(&buffer);
            });
        });
    }

    group.finish();
}

fn bench_rebuild(c: &mut Criterion) {
    c.bench_function("build_chain full", |b| {
        let modules = Modules::new();
        b.iter(|| black_box(build_chain(&modules, false, SAMPLE_RATE)));
    });
}

criterion_group!(
    benches,
    bench_sample_vs_block,
    bench_module_combinations,
    bench_rebuild
);
criterion_main!(benches);
