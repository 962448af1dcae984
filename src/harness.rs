//! RT proof harness: drives one instance synchronously for tests and benches.
//!
//! The analysis service is stepped on the calling thread, so every run is
//! deterministic.

use crate::analyzer::{AnalysisService, StepOutcome};
use crate::config::ProcessorConfig;
use crate::control::ControlHandle;
use crate::error::SpectralError;
use crate::factory::ProcessorFactory;
use crate::handoff::AnalysisResult;
use crate::monitor::ResultMonitor;
use crate::rt::{process_block_safe, BlockProcessor};

/// Harness for RT proofs: runs blocks through `process_block_safe` with
/// preallocated buffers.
pub struct RtHarness {
    pub processor: BlockProcessor,
    pub service: AnalysisService,
    pub monitor: ResultMonitor,
    pub control: ControlHandle,
    out_mul: Vec<f64>,
    out_add: Vec<f64>,
}

impl RtHarness {
    /// Build an instance from `factory`.
    pub fn new(factory: &ProcessorFactory, config: ProcessorConfig) -> Result<Self, SpectralError> {
        let block_size = config.block_size;
        let instance = factory.instantiate(config)?;
        Ok(Self {
            processor: instance.processor,
            service: instance.service,
            monitor: instance.monitor,
            control: instance.control,
            out_mul: vec![0.0; block_size],
            out_add: vec![0.0; block_size],
        })
    }

    /// Process one block; returns `(out_mul, out_add)`.
    pub fn run_block(&mut self, left: &[f64], right: &[f64]) -> (&[f64], &[f64]) {
        process_block_safe(
            &mut self.processor,
            left,
            right,
            &mut self.out_mul,
            &mut self.out_add,
        );
        (&self.out_mul, &self.out_add)
    }

    /// Mark an analysis as pending on the processor.
    pub fn trigger(&mut self) {
        self.processor.request_analysis();
    }

    /// Step the analysis service once on this thread.
    pub fn step_analysis(&mut self) -> StepOutcome {
        self.service.step()
    }

    pub fn poll_result(&mut self) -> Option<AnalysisResult> {
        self.monitor.poll()
    }

    /// Feed `left` through the processor block by block (right channel
    /// silent), trigger once at the end, and run the analysis.
    pub fn analyze_signal(&mut self, left: &[f64]) -> Option<AnalysisResult> {
        let block_size = self.processor.block_size();
        let silence = vec![0.0; block_size];
        let mut chunks = left.chunks_exact(block_size).peekable();
        while let Some(chunk) = chunks.next() {
            if chunks.peek().is_none() {
                self.trigger();
            }
            self.run_block(chunk, &silence);
        }
        self.service.run_until_idle();
        self.poll_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_basic() {
        let factory = ProcessorFactory::default();
        let config = ProcessorConfig::default().with_block_size(4).with_window_size(8);
        let mut harness = RtHarness::new(&factory, config).unwrap();

        let (m, a) = harness.run_block(&[1.0, 2.0, 3.0, 4.0], &[4.0, 3.0, 2.0, 1.0]);
        assert_eq!(m, &[4.0, 6.0, 6.0, 4.0]);
        assert_eq!(a, &[5.0; 4]);

        let signal: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let result = harness.analyze_signal(&signal).unwrap();
        assert_eq!(result.generation, 0);
        assert_eq!(result.window_size(), 8);
    }
}
