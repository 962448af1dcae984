//! Handoff channel between the RT callback and the analysis worker.
//!
//! Three lock-free SPSC lanes built on `rtrb`:
//! - requests, capacity 1: RT → worker, window snapshots
//! - results, capacity 1: worker → monitor, finished analyses
//! - recycle, capacity 1: worker → RT, the snapshot buffer coming home
//!
//! Plus a small failure lane (worker → monitor) for diagnostics.
//!
//! Each instance owns exactly one snapshot buffer. The RT side must hold it
//! to issue a request and only gets it back once the worker is done, so at
//! most one analysis is ever outstanding and triggers that fire meanwhile are
//! dropped instead of queued. Nothing on the RT side allocates or frees.

use crate::error::SpectralError;
use crate::invariant_ppt::{assert_invariant, REQUEST_SLOT_RELEASED, SNAPSHOT_BUFFER_SIZED};
use rtrb::{Consumer, Producer, RingBuffer};
use rustfft::num_complex::Complex64;

/// In-flight request capacity.
pub const REQUEST_SLOTS: usize = 1;

/// In-flight result capacity.
pub const RESULT_SLOTS: usize = 1;

/// Failure diagnostics kept until the monitor drains them.
pub const FAILURE_QUEUE_CAPACITY: usize = 16;

/// A snapshot of exactly N samples, oldest first.
#[derive(Debug)]
pub struct AnalysisRequest {
    samples: Box<[f64]>,
    generation: u64,
}

impl AnalysisRequest {
    pub fn new(samples: Box<[f64]>, generation: u64) -> Self {
        Self {
            samples,
            generation,
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Give the snapshot buffer back for recycling.
    pub fn into_samples(self) -> Box<[f64]> {
        self.samples
    }
}

/// Forward spectrum and normalized reconstruction of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Unnormalized forward DFT, DC first.
    pub forward: Vec<Complex64>,
    /// Inverse DFT of `forward`, divided by N.
    pub inverse: Vec<Complex64>,
    /// Generation of the originating request.
    pub generation: u64,
}

impl AnalysisResult {
    pub fn window_size(&self) -> usize {
        self.forward.len()
    }

    /// Magnitude of every forward bin.
    pub fn magnitudes(&self) -> Vec<f64> {
        self.forward.iter().map(|c| c.norm()).collect()
    }

    /// Real part of the reconstruction, i.e. the original window.
    pub fn reconstructed(&self) -> Vec<f64> {
        self.inverse.iter().map(|c| c.re).collect()
    }

    /// Centre frequency of bin `k` in Hz.
    pub fn bin_frequency(&self, k: usize, sample_rate: f64) -> f64 {
        if self.forward.is_empty() {
            return 0.0;
        }
        k as f64 * sample_rate / self.forward.len() as f64
    }
}

/// An analysis that was abandoned.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFailure {
    pub generation: u64,
    pub error: SpectralError,
}

/// RT end: pushes requests, holds the snapshot buffer between analyses.
pub struct RtHandoff {
    requests: Producer<AnalysisRequest>,
    recycled: Consumer<Box<[f64]>>,
    spare: Option<Box<[f64]>>,
    window_size: usize,
}

/// Worker end: pops requests, recycles buffers, publishes outcomes.
pub struct WorkerHandoff {
    requests: Consumer<AnalysisRequest>,
    recycle: Producer<Box<[f64]>>,
    results: Producer<AnalysisResult>,
    failures: Producer<AnalysisFailure>,
}

/// Consumer end for results and failures.
pub struct ResultReceiver {
    results: Consumer<AnalysisResult>,
    failures: Consumer<AnalysisFailure>,
}

/// Build the channel set for one instance with a window of `window_size`.
///
/// Allocates the single snapshot buffer; call off the RT thread.
pub fn channel(window_size: usize) -> (RtHandoff, WorkerHandoff, ResultReceiver) {
    let (req_tx, req_rx) = RingBuffer::new(REQUEST_SLOTS);
    let (recycle_tx, recycle_rx) = RingBuffer::new(1);
    let (res_tx, res_rx) = RingBuffer::new(RESULT_SLOTS);
    let (fail_tx, fail_rx) = RingBuffer::new(FAILURE_QUEUE_CAPACITY);

    let rt = RtHandoff {
        requests: req_tx,
        recycled: recycle_rx,
        spare: Some(vec![0.0; window_size].into_boxed_slice()),
        window_size,
    };
    let worker = WorkerHandoff {
        requests: req_rx,
        recycle: recycle_tx,
        results: res_tx,
        failures: fail_tx,
    };
    let receiver = ResultReceiver {
        results: res_rx,
        failures: fail_rx,
    };
    (rt, worker, receiver)
}

impl RtHandoff {
    /// Non-blocking push. `Err` hands the request back when the slot is taken.
    #[inline]
    pub fn try_push(&mut self, req: AnalysisRequest) -> Result<(), AnalysisRequest> {
        self.requests.push(req).map_err(|rtrb::PushError::Full(req)| req)
    }

    /// Take the snapshot buffer if no analysis is outstanding.
    #[inline]
    pub fn take_buffer(&mut self) -> Option<Box<[f64]>> {
        match self.spare.take() {
            Some(buf) => Some(buf),
            None => self.recycled.pop().ok(),
        }
    }

    /// Return a buffer that was taken but not sent.
    #[inline]
    pub fn restore_buffer(&mut self, buf: Box<[f64]>) {
        debug_assert!(self.spare.is_none(), "snapshot buffer restored twice");
        self.spare = Some(buf);
    }

    /// True when the snapshot buffer is home, i.e. nothing is outstanding.
    pub fn is_idle(&self) -> bool {
        self.spare.is_some() || !self.recycled.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }
}

impl WorkerHandoff {
    /// Non-blocking pop of the pending request, if any.
    pub fn try_pop(&mut self) -> Option<AnalysisRequest> {
        self.requests.pop().ok()
    }

    /// Send the snapshot buffer back, releasing the request slot.
    pub fn recycle(&mut self, buf: Box<[f64]>, window_size: usize) {
        assert_invariant(
            SNAPSHOT_BUFFER_SIZED,
            buf.len() == window_size,
            "recycled snapshot buffer changed size",
            Some("WorkerHandoff::recycle"),
        );
        let released = self.recycle.push(buf).is_ok();
        assert_invariant(
            REQUEST_SLOT_RELEASED,
            released,
            "recycle lane already held a buffer",
            Some("WorkerHandoff::recycle"),
        );
    }

    /// Non-blocking publish. `Err` hands the result back when the slot is taken.
    pub fn try_push_result(&mut self, result: AnalysisResult) -> Result<(), AnalysisResult> {
        self.results
            .push(result)
            .map_err(|rtrb::PushError::Full(result)| result)
    }

    /// Report a failure; dropped with a warning if nobody is draining.
    pub fn push_failure(&mut self, failure: AnalysisFailure) {
        if let Err(rtrb::PushError::Full(failure)) = self.failures.push(failure) {
            log::warn!(
                "failure queue full, dropping diagnostic for generation {}",
                failure.generation
            );
        }
    }

    /// True when the result slot is free.
    pub fn result_slot_free(&self) -> bool {
        !self.results.is_full()
    }
}

impl ResultReceiver {
    /// Non-blocking pop of the published result, if any.
    pub fn try_pop_result(&mut self) -> Option<AnalysisResult> {
        self.results.pop().ok()
    }

    pub fn try_pop_failure(&mut self) -> Option<AnalysisFailure> {
        self.failures.pop().ok()
    }
}
