//! Spectral analysis off the RT thread.
//!
//! `SpectralAnalyzer` runs the forward/inverse round trip on one window,
//! `AnalysisService` connects it to the handoff channel, and `AnalysisWorker`
//! runs a service on its own thread.

use crate::config::{validate_window_size, AnalyzerConfig};
use crate::error::SpectralError;
use crate::handoff::{AnalysisFailure, AnalysisRequest, AnalysisResult, WorkerHandoff};
use crate::invariant_ppt::{assert_invariant, INVERSE_NORMALIZED, RESULT_GENERATION_TAGGED};
use crate::plan::{Direction, PlanCache};
use rustfft::num_complex::Complex64;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

fn reserve_buffer(n: usize) -> Result<Vec<Complex64>, SpectralError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(n)
        .map_err(|_| SpectralError::ResourceExhausted {
            resource: "transform buffer",
        })?;
    Ok(buf)
}

/// Forward + inverse DFT over one window, with cached plans.
pub struct SpectralAnalyzer {
    plans: Arc<PlanCache>,
    scratch: Vec<Complex64>,
}

impl SpectralAnalyzer {
    pub fn new(plans: Arc<PlanCache>) -> Self {
        Self {
            plans,
            scratch: Vec::new(),
        }
    }

    pub fn plan_cache(&self) -> &Arc<PlanCache> {
        &self.plans
    }

    /// Analyze one snapshot.
    ///
    /// # Errors
    /// `InvalidWindowSize` before any plan lookup; `ResourceExhausted` when
    /// a plan or buffer cannot be obtained.
    pub fn analyze(&mut self, req: &AnalysisRequest) -> Result<AnalysisResult, SpectralError> {
        let n = req.len();
        validate_window_size(n)?;

        let forward_plan = self.plans.plan(n, Direction::Forward)?;
        let inverse_plan = self.plans.plan(n, Direction::Inverse)?;

        let scratch_len = forward_plan.scratch_len().max(inverse_plan.scratch_len());
        if self.scratch.len() < scratch_len {
            self.scratch
                .try_reserve_exact(scratch_len - self.scratch.len())
                .map_err(|_| SpectralError::ResourceExhausted {
                    resource: "transform scratch",
                })?;
            self.scratch.resize(scratch_len, ZERO);
        }

        let mut forward = reserve_buffer(n)?;
        forward.extend(req.samples().iter().map(|&s| Complex64::new(s, 0.0)));
        forward_plan.execute(&mut forward, &mut self.scratch[..forward_plan.scratch_len()]);

        let mut inverse = reserve_buffer(n)?;
        inverse.extend_from_slice(&forward);
        inverse_plan.execute(&mut inverse, &mut self.scratch[..inverse_plan.scratch_len()]);

        // rustfft is unnormalized: forward then inverse scales by N.
        let scale = 1.0 / n as f64;
        for c in inverse.iter_mut() {
            *c *= scale;
        }
        assert_invariant(
            INVERSE_NORMALIZED,
            inverse.len() == n && forward.len() == n,
            "round trip produced a window of the wrong length",
            Some("SpectralAnalyzer::analyze"),
        );

        let result = AnalysisResult {
            forward,
            inverse,
            generation: req.generation(),
        };
        assert_invariant(
            RESULT_GENERATION_TAGGED,
            result.generation == req.generation(),
            "result lost its generation",
            None,
        );
        Ok(result)
    }
}

/// What a single `AnalysisService::step` did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// No request was pending.
    Idle,
    /// A result was published (or parked until the slot frees).
    Completed { generation: u64 },
    /// The analysis was abandoned; the slot has been released.
    Failed {
        generation: u64,
        error: SpectralError,
    },
}

/// Worker side of one instance: drains requests and publishes outcomes.
pub struct AnalysisService {
    analyzer: SpectralAnalyzer,
    handoff: WorkerHandoff,
    window_size: usize,
    parked: Option<AnalysisResult>,
    completed: u64,
    failed: u64,
}

impl AnalysisService {
    pub fn new(analyzer: SpectralAnalyzer, handoff: WorkerHandoff, window_size: usize) -> Self {
        Self {
            analyzer,
            handoff,
            window_size,
            parked: None,
            completed: 0,
            failed: 0,
        }
    }

    /// Handle at most one pending request. Never blocks.
    pub fn step(&mut self) -> StepOutcome {
        self.flush_parked();

        let Some(req) = self.handoff.try_pop() else {
            return StepOutcome::Idle;
        };
        let generation = req.generation();

        // A request that does not carry this instance's snapshot buffer is
        // rejected and its buffer dropped here, never sent to the RT side.
        if req.len() != self.window_size {
            let error = SpectralError::InvalidWindowSize(req.len());
            log::error!(
                "analysis {} rejected: window of {} samples, expected {}",
                generation,
                req.len(),
                self.window_size
            );
            return self.fail(generation, error);
        }

        let outcome = self.analyzer.analyze(&req);

        // Release the slot whatever happened, so the next trigger can go through.
        self.handoff.recycle(req.into_samples(), self.window_size);

        match outcome {
            Ok(result) => {
                log::debug!(
                    "analysis {} done: N = {}, plans created so far = {}",
                    generation,
                    result.window_size(),
                    self.analyzer.plan_cache().plans_created()
                );
                self.completed += 1;
                self.publish(result);
                StepOutcome::Completed { generation }
            }
            Err(error) => {
                log::error!("analysis {} abandoned: {}", generation, error);
                self.fail(generation, error)
            }
        }
    }

    fn fail(&mut self, generation: u64, error: SpectralError) -> StepOutcome {
        self.failed += 1;
        self.handoff.push_failure(AnalysisFailure {
            generation,
            error: error.clone(),
        });
        StepOutcome::Failed { generation, error }
    }

    /// Step until no request is pending; returns how many were handled.
    pub fn run_until_idle(&mut self) -> usize {
        let mut handled = 0;
        while self.step() != StepOutcome::Idle {
            handled += 1;
        }
        handled
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// True when a finished result is waiting for the result slot.
    pub fn has_parked_result(&self) -> bool {
        self.parked.is_some()
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    fn publish(&mut self, result: AnalysisResult) {
        if let Err(result) = self.handoff.try_push_result(result) {
            let generation = result.generation;
            if let Some(stale) = self.parked.replace(result) {
                log::warn!(
                    "result {} superseded by {} before delivery",
                    stale.generation,
                    generation
                );
            } else {
                log::warn!("result slot busy, parking result {}", generation);
            }
        }
    }

    fn flush_parked(&mut self) {
        if let Some(result) = self.parked.take() {
            if let Err(result) = self.handoff.try_push_result(result) {
                self.parked = Some(result);
            }
        }
    }
}

/// Runs an `AnalysisService` on a dedicated thread until dropped.
pub struct AnalysisWorker {
    handle: Option<JoinHandle<AnalysisService>>,
    stop: Arc<AtomicBool>,
}

impl AnalysisWorker {
    /// Spawn the worker. It polls every `config.poll_interval` while idle.
    pub fn spawn(service: AnalysisService, config: &AnalyzerConfig) -> Result<Self, SpectralError> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let interval = config.poll_interval;

        let handle = thread::Builder::new()
            .name("spectral-analysis".into())
            .spawn(move || {
                let mut service = service;
                log::info!("analysis worker started (poll every {:?})", interval);
                while !flag.load(Ordering::Acquire) {
                    if service.step() == StepOutcome::Idle {
                        thread::park_timeout(interval);
                    }
                }
                log::info!(
                    "analysis worker stopped ({} completed, {} failed)",
                    service.completed(),
                    service.failed()
                );
                service
            })?;

        Ok(Self {
            handle: Some(handle),
            stop,
        })
    }

    /// Stop the thread and take the service back.
    pub fn shutdown(mut self) -> Option<AnalysisService> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Option<AnalysisService> {
        self.stop.store(true, Ordering::Release);
        let handle = self.handle.take()?;
        handle.thread().unpark();
        match handle.join() {
            Ok(service) => Some(service),
            Err(_) => {
                log::error!("analysis worker panicked");
                None
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
