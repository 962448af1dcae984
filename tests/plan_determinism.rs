use rtspectral::harness::RtHarness;
use rtspectral::{
    AnalysisRequest, AnalyzerConfig, Direction, PlanCache, ProcessorConfig, ProcessorFactory,
    SpectralAnalyzer, SpectralError,
};
use std::sync::Arc;
use std::thread;

fn request(n: usize, generation: u64) -> AnalysisRequest {
    let samples: Vec<f64> = (0..n).map(|i| (i % 3) as f64).collect();
    AnalysisRequest::new(samples.into_boxed_slice(), generation)
}

#[test]
fn repeated_analysis_plans_once_per_direction() {
    let mut analyzer = SpectralAnalyzer::new(Arc::new(PlanCache::new(16)));
    for generation in 0..20 {
        analyzer.analyze(&request(256, generation)).unwrap();
    }
    let plans = analyzer.plan_cache();
    assert_eq!(plans.plans_created(), 2);
    assert!(plans.contains(256, Direction::Forward));
    assert!(plans.contains(256, Direction::Inverse));

    analyzer.analyze(&request(512, 20)).unwrap();
    assert_eq!(analyzer.plan_cache().plans_created(), 4);
}

#[test]
fn instances_from_one_factory_share_plans() {
    let factory = ProcessorFactory::new(AnalyzerConfig::default());
    let config = ProcessorConfig::default().with_block_size(16).with_window_size(64);
    let mut first = RtHarness::new(&factory, config.clone()).unwrap();
    let mut second = RtHarness::new(&factory, config).unwrap();

    let signal: Vec<f64> = (0..64).map(|i| (i as f64 * 0.2).sin()).collect();
    assert!(first.analyze_signal(&signal).is_some());
    assert_eq!(factory.plan_cache().plans_created(), 2);
    assert!(second.analyze_signal(&signal).is_some());
    assert_eq!(factory.plan_cache().plans_created(), 2);
}

#[test]
fn concurrent_lookups_build_one_plan() {
    let cache = Arc::new(PlanCache::new(4));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.plan(1024, Direction::Forward).unwrap())
        })
        .collect();
    let plans: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(cache.plans_created(), 1);
    assert!(plans.windows(2).all(|w| w[0].same_plan(&w[1])));
}

#[test]
fn full_cache_reports_exhaustion() {
    let cache = PlanCache::new(1);
    cache.plan(8, Direction::Forward).unwrap();
    assert_eq!(
        cache.plan(8, Direction::Inverse).unwrap_err(),
        SpectralError::ResourceExhausted {
            resource: "transform plan cache"
        }
    );
    assert!(cache.plan(8, Direction::Forward).is_ok());
}
