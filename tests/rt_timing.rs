use rtspectral::harness::RtHarness;
use rtspectral::{ProcessorConfig, ProcessorFactory, TriggerPolicy};
use std::num::NonZeroU32;
use std::time::Instant;

#[test]
fn rt_timing_stability() {
    let factory = ProcessorFactory::default();
    let config = ProcessorConfig::default()
        .with_block_size(64)
        .with_window_size(1024)
        .with_trigger(TriggerPolicy::EveryBlocks(NonZeroU32::new(16).unwrap()));
    let mut h = RtHarness::new(&factory, config).unwrap();

    let left: Vec<f64> = (0..64).map(|i| (i as f64 * 0.05).sin()).collect();
    let right = vec![0.5; 64];
    let start = Instant::now();
    for _ in 0..1000 {
        h.run_block(&left, &right);
    }
    let duration = start.elapsed();
    // Assert bounded: less than 1 second for 1000 blocks
    assert!(duration.as_millis() < 1000, "Execution took too long: {:?}", duration);
}
