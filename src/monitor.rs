//! Consumer side of the result channel.
//!
//! `ResultMonitor` lives on a non-RT thread, filters stale generations and
//! hands results and failures to a `DiagnosticSink`.

use crate::handoff::{AnalysisFailure, AnalysisResult, ResultReceiver};
use crate::invariant_ppt::{assert_invariant, STALE_RESULT_DISCARDED};
use std::thread;
use std::time::{Duration, Instant};

/// Where finished analyses end up.
pub trait DiagnosticSink {
    fn on_result(&mut self, result: &AnalysisResult);
    fn on_failure(&mut self, failure: &AnalysisFailure);
}

/// Writes analyses to the `log` facade.
///
/// A one-line summary goes out at `info`; with `dump_bins` every forward bin
/// and reconstructed sample is also written at `debug`.
#[derive(Debug, Clone)]
pub struct LogSink {
    sample_rate: f64,
    dump_bins: bool,
}

impl LogSink {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            dump_bins: false,
        }
    }

    pub fn with_bin_dump(mut self, dump: bool) -> Self {
        self.dump_bins = dump;
        self
    }
}

impl DiagnosticSink for LogSink {
    fn on_result(&mut self, result: &AnalysisResult) {
        let n = result.window_size();
        // Only the non-negative half of a real signal's spectrum is unique.
        let half = result.forward.get(..n / 2 + 1).unwrap_or(&[]);
        let peak = half
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(k, c)| (k, c.norm()));
        match peak {
            Some((k, mag)) => log::info!(
                "analysis {}: N = {}, peak bin {} ({:.1} Hz, |X| = {:.3})",
                result.generation,
                n,
                k,
                result.bin_frequency(k, self.sample_rate),
                mag
            ),
            None => log::info!("analysis {}: empty window", result.generation),
        }

        if self.dump_bins && log::log_enabled!(log::Level::Debug) {
            for (i, c) in result.forward.iter().enumerate() {
                log::debug!("fft[{}] = {{ {:2.2}, {:2.2} }}", i, c.re, c.im);
            }
            for (i, c) in result.inverse.iter().enumerate() {
                log::debug!("ifft[{}] = {{ {:2.2}, {:2.2} }}", i, c.re, c.im);
            }
        }
    }

    fn on_failure(&mut self, failure: &AnalysisFailure) {
        log::error!("analysis {} failed: {}", failure.generation, failure.error);
    }
}

/// Polls the result slot and drops anything older than what it already saw.
pub struct ResultMonitor {
    receiver: ResultReceiver,
    last_generation: Option<u64>,
    stale_discarded: u64,
}

impl ResultMonitor {
    pub fn new(receiver: ResultReceiver) -> Self {
        Self {
            receiver,
            last_generation: None,
            stale_discarded: 0,
        }
    }

    /// Newest unseen result, if one is waiting. Never blocks.
    pub fn poll(&mut self) -> Option<AnalysisResult> {
        while let Some(result) = self.receiver.try_pop_result() {
            let fresh = self.last_generation.map_or(true, |last| result.generation > last);
            if fresh {
                self.last_generation = Some(result.generation);
                return Some(result);
            }
            self.stale_discarded += 1;
            assert_invariant(
                STALE_RESULT_DISCARDED,
                !fresh,
                "discarded a result that was not stale",
                Some("ResultMonitor::poll"),
            );
            log::debug!(
                "discarding stale result {} (already delivered {:?})",
                result.generation,
                self.last_generation
            );
        }
        None
    }

    /// Next failure diagnostic, if any.
    pub fn poll_failure(&mut self) -> Option<AnalysisFailure> {
        self.receiver.try_pop_failure()
    }

    /// Poll until a result arrives or `timeout` elapses.
    ///
    /// Sleeps between polls; for control threads and tests only.
    pub fn wait_for_result(&mut self, timeout: Duration) -> Option<AnalysisResult> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(result) = self.poll() {
                return Some(result);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Deliver everything pending to `sink`; returns how many items went out.
    pub fn drain_into(&mut self, sink: &mut dyn DiagnosticSink) -> usize {
        let mut delivered = 0;
        while let Some(failure) = self.poll_failure() {
            sink.on_failure(&failure);
            delivered += 1;
        }
        while let Some(result) = self.poll() {
            sink.on_result(&result);
            delivered += 1;
        }
        delivered
    }

    pub fn last_generation(&self) -> Option<u64> {
        self.last_generation
    }

    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded
    }
}
