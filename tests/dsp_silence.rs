use rtspectral::harness::RtHarness;
use rtspectral::invariant_rt::INV_OUTPUT_SANITIZED;
use rtspectral::rt::render_offline;
use rtspectral::{ProcessorConfig, ProcessorFactory};

fn harness() -> RtHarness {
    let factory = ProcessorFactory::default();
    let config = ProcessorConfig::default().with_block_size(64).with_window_size(64);
    RtHarness::new(&factory, config).unwrap()
}

#[test]
fn dsp_silence_propagation() {
    let mut h = harness();
    let silence = vec![0.0; 640];
    let (m, a) = render_offline(&mut h.processor, &silence, &silence);
    assert_eq!(m.len(), 640);
    assert!(m.iter().all(|&s| s == 0.0), "Silence should propagate");
    assert!(a.iter().all(|&s| s == 0.0), "Silence should propagate");
}

#[test]
fn hazards_never_reach_the_outputs() {
    let mut h = harness();
    let hazards = [
        f64::NAN,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::MIN_POSITIVE / 2.0,
        -f64::MIN_POSITIVE / 4.0,
        f64::MAX,
    ];
    let left: Vec<f64> = hazards.iter().cycle().take(64).copied().collect();
    let right: Vec<f64> = hazards.iter().rev().cycle().take(64).copied().collect();
    let (m, a) = h.run_block(&left, &right);
    for &s in m.iter().chain(a.iter()) {
        assert!(s.is_finite());
        assert!(s == 0.0 || s.abs() >= f64::MIN_POSITIVE);
    }
    assert!(h
        .control
        .drain_invariant_signals()
        .contains(&INV_OUTPUT_SANITIZED));
}

#[test]
fn overflowing_product_is_flushed() {
    let mut h = harness();
    let big = vec![1.0e200; 64];
    let (m, a) = h.run_block(&big, &big);
    assert!(m.iter().all(|&s| s == 0.0));
    assert!(a.iter().all(|&s| s == 2.0e200));
}
