//! Real-time-safe block processing with off-thread spectral analysis.
//!
//! The RT callback (`rt::BlockProcessor`) turns two input blocks into their
//! product and sum, keeps a history of the left input and, when triggered,
//! hands a window snapshot to an analysis worker over a capacity-1 lock-free
//! channel. The worker runs a cached forward/inverse FFT and publishes the
//! result for a control-thread `monitor::ResultMonitor`.

pub mod analyzer;
pub mod config;
pub mod control;
pub mod error;
pub mod factory;
pub mod handoff;
#[doc(hidden)]
pub mod harness;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod invariant_rt;
pub mod monitor;
pub mod plan;
pub mod rt;
pub mod sanitize;
pub mod state;

pub use analyzer::{AnalysisService, AnalysisWorker, SpectralAnalyzer, StepOutcome};
pub use config::{AnalyzerConfig, ProcessorConfig, TriggerPolicy};
pub use control::{ControlHandle, ControlMsg};
pub use error::SpectralError;
pub use factory::{Instance, ProcessorFactory};
pub use handoff::{AnalysisFailure, AnalysisRequest, AnalysisResult};
pub use monitor::{DiagnosticSink, LogSink, ResultMonitor};
pub use plan::{Direction, PlanCache};
pub use rt::BlockProcessor;
pub use state::{Emission, Message, Scalar, ScalarOutlet, Symbol};
