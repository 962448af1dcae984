use proptest::prelude::*;
use rtspectral::harness::RtHarness;
use rtspectral::sanitize::sanitize;
use rtspectral::{ProcessorConfig, ProcessorFactory};

fn harness(block: usize) -> RtHarness {
    let factory = ProcessorFactory::default();
    let config = ProcessorConfig::default().with_block_size(block).with_window_size(4);
    RtHarness::new(&factory, config).unwrap()
}

#[test]
fn product_and_sum_of_mirrored_ramps() {
    let mut h = harness(4);
    let (m, a) = h.run_block(&[1.0, 2.0, 3.0, 4.0], &[4.0, 3.0, 2.0, 1.0]);
    assert_eq!(m, &[4.0, 6.0, 6.0, 4.0]);
    assert_eq!(a, &[5.0, 5.0, 5.0, 5.0]);
}

#[test]
fn outputs_are_independent_of_previous_blocks() {
    let mut h = harness(4);
    h.run_block(&[100.0; 4], &[-3.0; 4]);
    let (m, a) = h.run_block(&[0.5; 4], &[2.0; 4]);
    assert_eq!(m, &[1.0; 4]);
    assert_eq!(a, &[2.5; 4]);
}

proptest! {
    #[test]
    fn finite_inputs_follow_the_arithmetic(
        pairs in prop::collection::vec((-1.0e6f64..1.0e6, -1.0e6f64..1.0e6), 16)
    ) {
        let mut h = harness(16);
        let left: Vec<f64> = pairs.iter().map(|p| p.0).collect();
        let right: Vec<f64> = pairs.iter().map(|p| p.1).collect();
        let (m, a) = h.run_block(&left, &right);
        for i in 0..16 {
            prop_assert_eq!(m[i], sanitize(left[i] * right[i]));
            prop_assert_eq!(a[i], sanitize(left[i] + right[i]));
        }
    }
}
