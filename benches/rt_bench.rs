use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rtspectral::harness::RtHarness;
use rtspectral::{
    AnalysisRequest, PlanCache, ProcessorConfig, ProcessorFactory, SpectralAnalyzer,
};
use std::sync::Arc;

fn bench_process_block(c: &mut Criterion) {
    let factory = ProcessorFactory::default();
    let config = ProcessorConfig::default().with_block_size(1024).with_window_size(1024);
    let mut harness = RtHarness::new(&factory, config).unwrap();
    let left: Vec<f64> = (0..1024).map(|i| (i as f64 * 0.01).sin()).collect();
    let right: Vec<f64> = (0..1024).map(|i| (i as f64 * 0.02).cos()).collect();
    let mut out_mul = vec![0.0; 1024];
    let mut out_add = vec![0.0; 1024];

    c.bench_function("process_block_1024", |b| {
        b.iter(|| {
            harness
                .processor
                .process(black_box(&left), black_box(&right), &mut out_mul, &mut out_add);
            black_box(&out_mul);
        })
    });
}

fn bench_analyze(c: &mut Criterion) {
    let mut analyzer = SpectralAnalyzer::new(Arc::new(PlanCache::new(4)));
    let samples: Vec<f64> = (0..256).map(|i| (i as f64 * 0.1).sin()).collect();
    let request = AnalysisRequest::new(samples.into_boxed_slice(), 0);

    c.bench_function("analyze_256", |b| {
        b.iter(|| black_box(analyzer.analyze(black_box(&request)).unwrap()))
    });
}

criterion_group!(benches, bench_process_block, bench_analyze);
criterion_main!(benches);
