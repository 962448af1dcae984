//! Construction-time configuration for processors and the analyzer.

use crate::error::SpectralError;
use crate::invariant_ppt::{assert_invariant, CONFIG_VALIDATED, WINDOW_VALIDATED};
use std::num::NonZeroU32;
use std::time::Duration;

/// Smallest accepted analysis window.
pub const MIN_WINDOW_SIZE: usize = 2;

/// Largest accepted analysis window.
pub const MAX_WINDOW_SIZE: usize = 1 << 16;

/// Largest accepted host block.
pub const MAX_BLOCK_SIZE: usize = 8192;

/// When the processor issues analysis requests on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerPolicy {
    /// Only explicit requests (message or control queue) trigger analysis.
    #[default]
    OnDemand,
    /// Additionally request an analysis every `n` processed blocks.
    EveryBlocks(NonZeroU32),
}

/// Per-instance processor configuration.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Samples per host block (default: 64).
    pub block_size: usize,

    /// Analysis window length N (default: 256).
    /// Must be a power of two in `MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE`.
    pub window_size: usize,

    /// Host sample rate in Hz (default: 44100.0).
    /// Only used to label analysis bins.
    pub sample_rate: f64,

    /// Automatic trigger policy (default: `OnDemand`).
    pub trigger: TriggerPolicy,

    /// Emit the stored scalar immediately on int/float input (default: false).
    pub emit_on_update: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            block_size: 64,
            window_size: 256,
            sample_rate: 44_100.0,
            trigger: TriggerPolicy::OnDemand,
            emit_on_update: false,
        }
    }
}

impl ProcessorConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerPolicy) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_emit_on_update(mut self, emit: bool) -> Self {
        self.emit_on_update = emit;
        self
    }

    /// Check every field; called once by the factory before anything is allocated.
    pub fn validate(&self) -> Result<(), SpectralError> {
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(SpectralError::InvalidBlockSize(self.block_size));
        }
        validate_window_size(self.window_size)?;
        assert_invariant(
            CONFIG_VALIDATED,
            true,
            "processor config validated",
            Some("ProcessorConfig::validate"),
        );
        Ok(())
    }
}

/// Analyzer-side configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Upper bound on cached plans before `ResourceExhausted` (default: 16).
    pub max_cached_plans: usize,

    /// How long an idle worker parks between polls (default: 2 ms).
    pub poll_interval: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_cached_plans: 16,
            poll_interval: Duration::from_millis(2),
        }
    }
}

impl AnalyzerConfig {
    pub fn with_max_cached_plans(mut self, max: usize) -> Self {
        self.max_cached_plans = max;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Accepted window sizes: powers of two within the supported range.
pub fn validate_window_size(n: usize) -> Result<(), SpectralError> {
    let ok = (MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&n) && n.is_power_of_two();
    if !ok {
        return Err(SpectralError::InvalidWindowSize(n));
    }
    assert_invariant(WINDOW_VALIDATED, ok, "window size accepted", None);
    Ok(())
}
