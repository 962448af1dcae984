//! Error taxonomy for the block pipeline and the spectral analyzer.
//!
//! Nothing in here ever crosses the real-time boundary: the RT path only
//! returns sanitized blocks or drops a handoff push. These errors surface on
//! the configuration, analysis and worker paths.

use thiserror::Error;

/// Errors raised off the real-time thread.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpectralError {
    /// Block or array lengths do not match the configured block size.
    #[error("block length contract violated: expected {expected} samples, got {actual}")]
    ContractViolation {
        /// Configured block size.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// Window size is not an accepted transform length.
    #[error("invalid window size {0}: expected a power of two in {min}..={max}", min = crate::config::MIN_WINDOW_SIZE, max = crate::config::MAX_WINDOW_SIZE)]
    InvalidWindowSize(usize),

    /// Block size is zero or above the supported maximum.
    #[error("invalid block size {0}: expected 1..={max}", max = crate::config::MAX_BLOCK_SIZE)]
    InvalidBlockSize(usize),

    /// A transform plan or buffer could not be obtained.
    #[error("resource exhausted: {resource}")]
    ResourceExhausted {
        /// What ran out.
        resource: &'static str,
    },

    /// The analysis worker thread could not be started.
    #[error("failed to spawn analysis worker: {0}")]
    WorkerSpawn(String),
}

impl From<std::io::Error> for SpectralError {
    fn from(err: std::io::Error) -> Self {
        SpectralError::WorkerSpawn(err.to_string())
    }
}
