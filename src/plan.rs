//! Plan module: build and cache transform plans.
//!
//! A plan is expensive to build and free to reuse, so each (length,
//! direction) pair is planned exactly once per cache. The cache is shared by
//! every instance a `ProcessorFactory` creates and is only ever locked off
//! the RT thread.

use crate::error::SpectralError;
use crate::invariant_ppt::{assert_invariant, PLAN_CACHE_BOUNDED, PLAN_CREATED_ONCE};
use parking_lot::Mutex;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Transform direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Forward,
    Inverse,
}

impl From<Direction> for FftDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Forward => FftDirection::Forward,
            Direction::Inverse => FftDirection::Inverse,
        }
    }
}

/// Cache key: one plan per (length, direction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanKey {
    pub len: usize,
    pub direction: Direction,
}

/// A reusable, unnormalized transform of a fixed length and direction.
#[derive(Clone)]
pub struct TransformPlan {
    key: PlanKey,
    fft: Arc<dyn Fft<f64>>,
}

impl TransformPlan {
    pub fn key(&self) -> PlanKey {
        self.key
    }

    pub fn len(&self) -> usize {
        self.key.len
    }

    pub fn is_empty(&self) -> bool {
        self.key.len == 0
    }

    /// Scratch length required by `execute`.
    pub fn scratch_len(&self) -> usize {
        self.fft.get_inplace_scratch_len()
    }

    /// Transform `buffer` in place.
    ///
    /// `buffer.len()` must equal `len()`, `scratch` at least `scratch_len()`.
    pub fn execute(
        &self,
        buffer: &mut [rustfft::num_complex::Complex64],
        scratch: &mut [rustfft::num_complex::Complex64],
    ) {
        self.fft.process_with_scratch(buffer, scratch);
    }

    /// True when both handles point at the same cached plan.
    pub fn same_plan(&self, other: &TransformPlan) -> bool {
        Arc::ptr_eq(&self.fft, &other.fft)
    }
}

impl fmt::Debug for TransformPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPlan").field("key", &self.key).finish()
    }
}

/// Lazily populated, size-keyed plan cache.
pub struct PlanCache {
    plans: Mutex<HashMap<PlanKey, TransformPlan>>,
    max_plans: usize,
    created: AtomicUsize,
}

impl PlanCache {
    /// Create an empty cache holding at most `max_plans` plans.
    pub fn new(max_plans: usize) -> Self {
        Self {
            plans: Mutex::new(HashMap::new()),
            max_plans,
            created: AtomicUsize::new(0),
        }
    }

    /// Look up the plan for `(len, direction)`, building it on first use.
    pub fn plan(&self, len: usize, direction: Direction) -> Result<TransformPlan, SpectralError> {
        let key = PlanKey { len, direction };
        let mut plans = self.plans.lock();
        if let Some(plan) = plans.get(&key) {
            return Ok(plan.clone());
        }
        if plans.len() >= self.max_plans {
            log::warn!(
                "plan cache full ({} plans), cannot plan {:?}",
                self.max_plans,
                key
            );
            return Err(SpectralError::ResourceExhausted {
                resource: "transform plan cache",
            });
        }

        // Only the plan is kept; the planner is dropped after each miss.
        let fft = FftPlanner::<f64>::new().plan_fft(len, direction.into());
        let plan = TransformPlan { key, fft };
        let previous = plans.insert(key, plan.clone());
        assert_invariant(
            PLAN_CREATED_ONCE,
            previous.is_none(),
            "plan built twice for the same key",
            Some("PlanCache::plan"),
        );
        assert_invariant(
            PLAN_CACHE_BOUNDED,
            plans.len() <= self.max_plans,
            "plan cache exceeded its bound",
            Some("PlanCache::plan"),
        );
        drop(plans);

        let total = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("planned {:?} (plans created: {})", key, total);
        Ok(plan)
    }

    /// Number of plans ever built by this cache.
    pub fn plans_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of plans currently cached.
    pub fn len(&self) -> usize {
        self.plans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, len: usize, direction: Direction) -> bool {
        self.plans.lock().contains_key(&PlanKey { len, direction })
    }

    pub fn capacity(&self) -> usize {
        self.max_plans
    }
}

impl fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<PlanKey> = self.plans.lock().keys().copied().collect();
        keys.sort();
        f.debug_struct("PlanCache")
            .field("plans", &keys)
            .field("max_plans", &self.max_plans)
            .field("created", &self.plans_created())
            .finish()
    }
}
