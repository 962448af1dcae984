//! Instance construction.
//!
//! One `ProcessorFactory` per process (or per host plugin registration). It
//! owns the shared plan cache and wires up every channel an instance needs.

use crate::analyzer::{AnalysisService, AnalysisWorker, SpectralAnalyzer};
use crate::config::{AnalyzerConfig, ProcessorConfig};
use crate::control::{new_control_queue, ControlHandle};
use crate::error::SpectralError;
use crate::handoff;
use crate::invariant_rt::new_invariant_queue;
use crate::monitor::ResultMonitor;
use crate::plan::PlanCache;
use crate::rt::BlockProcessor;
use std::sync::Arc;

/// Builds processor instances that share one plan cache.
pub struct ProcessorFactory {
    plans: Arc<PlanCache>,
    config: AnalyzerConfig,
}

/// Everything one instance is made of, split by the thread that owns it.
pub struct Instance {
    /// Goes to the RT callback.
    pub processor: BlockProcessor,
    /// Goes to an analysis thread (see `AnalysisWorker`), or is stepped by hand.
    pub service: AnalysisService,
    /// Stays on the control thread.
    pub monitor: ResultMonitor,
    /// Stays on the control thread.
    pub control: ControlHandle,
    analyzer_config: AnalyzerConfig,
}

impl Instance {
    /// Move the service onto its own thread, polling at the factory's
    /// configured interval.
    pub fn spawn_worker(
        self,
    ) -> Result<(BlockProcessor, AnalysisWorker, ResultMonitor, ControlHandle), SpectralError> {
        let worker = AnalysisWorker::spawn(self.service, &self.analyzer_config)?;
        Ok((self.processor, worker, self.monitor, self.control))
    }

    /// Analyzer settings inherited from the factory.
    pub fn analyzer_config(&self) -> &AnalyzerConfig {
        &self.analyzer_config
    }
}

impl ProcessorFactory {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            plans: Arc::new(PlanCache::new(config.max_cached_plans)),
            config,
        }
    }

    /// Validate `config` and build a fresh instance.
    ///
    /// Allocates the history, the snapshot buffer and every queue; call off
    /// the RT thread.
    pub fn instantiate(&self, config: ProcessorConfig) -> Result<Instance, SpectralError> {
        config.validate()?;

        let (rt_handoff, worker_handoff, receiver) = handoff::channel(config.window_size);
        let (control_tx, control_rx) = new_control_queue();
        let (invariant_tx, invariant_rx) = new_invariant_queue();

        let processor = BlockProcessor::new(&config, rt_handoff, control_rx, invariant_tx);
        let analyzer = SpectralAnalyzer::new(Arc::clone(&self.plans));
        let service = AnalysisService::new(analyzer, worker_handoff, config.window_size);

        log::info!(
            "instance ready: block {} samples, window {} samples, sample rate {} Hz",
            config.block_size,
            config.window_size,
            config.sample_rate
        );

        Ok(Instance {
            processor,
            service,
            monitor: ResultMonitor::new(receiver),
            control: ControlHandle::new(control_tx, invariant_rx),
            analyzer_config: self.config.clone(),
        })
    }

    pub fn plan_cache(&self) -> &Arc<PlanCache> {
        &self.plans
    }

    pub fn analyzer_config(&self) -> &AnalyzerConfig {
        &self.config
    }
}

impl Default for ProcessorFactory {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Direction;
    use std::time::Duration;

    #[test]
    fn rejects_invalid_config() {
        let factory = ProcessorFactory::default();
        let err = factory
            .instantiate(ProcessorConfig::default().with_window_size(100))
            .err();
        assert_eq!(err, Some(SpectralError::InvalidWindowSize(100)));

        let err = factory
            .instantiate(ProcessorConfig::default().with_block_size(0))
            .err();
        assert_eq!(err, Some(SpectralError::InvalidBlockSize(0)));
    }

    #[test]
    fn instances_share_the_plan_cache() {
        let factory = ProcessorFactory::default();
        let config = ProcessorConfig::default().with_block_size(4).with_window_size(4);
        let a = factory.instantiate(config.clone()).unwrap();
        let b = factory.instantiate(config).unwrap();
        assert!(Arc::ptr_eq(a.service.analyzer().plan_cache(), factory.plan_cache()));
        assert!(Arc::ptr_eq(b.service.analyzer().plan_cache(), factory.plan_cache()));
        assert!(!factory.plan_cache().contains(4, Direction::Forward));
    }

    #[test]
    fn instance_inherits_analyzer_config() {
        let interval = Duration::from_millis(7);
        let factory =
            ProcessorFactory::new(AnalyzerConfig::default().with_poll_interval(interval));
        let instance = factory.instantiate(ProcessorConfig::default()).unwrap();
        assert_eq!(instance.analyzer_config().poll_interval, interval);

        let (_processor, worker, _monitor, _control) = instance.spawn_worker().unwrap();
        assert!(worker.shutdown().is_some());
    }
}
