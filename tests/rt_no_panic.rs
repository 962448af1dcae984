use proptest::prelude::*;
use rtspectral::harness::RtHarness;
use rtspectral::rt::process_block_safe;
use rtspectral::{ProcessorConfig, ProcessorFactory};

fn any_sample() -> impl Strategy<Value = f64> {
    prop_oneof![
        any::<f64>(),
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        Just(f64::MIN_POSITIVE / 3.0),
    ]
}

proptest! {
    #[test]
    fn rt_no_panic_fuzz(
        left in prop::collection::vec(any_sample(), 32),
        right in prop::collection::vec(any_sample(), 32),
        trigger in any::<bool>(),
    ) {
        let factory = ProcessorFactory::default();
        let config = ProcessorConfig::default().with_block_size(32).with_window_size(32);
        let mut h = RtHarness::new(&factory, config).unwrap();
        if trigger {
            h.trigger();
        }
        // This should not panic
        let (m, a) = h.run_block(&left, &right);
        prop_assert!(m.iter().chain(a).all(|s| s.is_finite()));
        h.step_analysis();
    }

    #[test]
    fn short_blocks_are_contained(len in 0usize..64) {
        let factory = ProcessorFactory::default();
        let config = ProcessorConfig::default().with_block_size(32).with_window_size(32);
        let mut h = RtHarness::new(&factory, config).unwrap();
        let input = vec![1.0; len];
        let mut m = vec![7.0; 32];
        let mut a = vec![7.0; 32];
        process_block_safe(&mut h.processor, &input, &input, &mut m, &mut a);
        if len == 32 {
            prop_assert!(m.iter().all(|&s| s == 1.0));
        } else if cfg!(debug_assertions) {
            prop_assert!(m.iter().chain(&a).all(|&s| s == 0.0));
        } else {
            prop_assert!(m.iter().chain(&a).all(|&s| s == 7.0));
        }
    }
}
