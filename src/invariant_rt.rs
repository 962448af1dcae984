//! RT-safe invariant signaling for the block callback.
//!
//! Two tiers:
//! - **Tier 1 (RT-safe)**: lock-free signaling of invariant IDs from `process`
//! - **Tier 2 (Non-RT)**: draining and contract checks on the control thread
//!
//! RT code **signals facts**. Non-RT code **judges correctness**.
//!
//! # Example
//!
//! ```ignore
//! signal_invariant(&mut invariant_tx, INV_BLOCK_PROCESSED);
//!
//! let signals = drain_invariant_signals(&mut invariant_rx);
//! assert!(signals.contains(&INV_BLOCK_PROCESSED));
//! ```

use rtrb::{Consumer, Producer, RingBuffer};

// ============================================================================
// RT-Safe Invariant IDs (Tier 1)
// ============================================================================

/// A block went through the arithmetic pipeline.
pub const INV_BLOCK_PROCESSED: u8 = 1;

/// At least one output sample was flushed by the sanitizer.
pub const INV_OUTPUT_SANITIZED: u8 = 2;

/// The `left` block was appended to the analysis history.
pub const INV_HISTORY_WRITTEN: u8 = 3;

/// A window snapshot was accepted by the handoff channel.
pub const INV_ANALYSIS_REQUESTED: u8 = 4;

/// A trigger was dropped because an analysis was still outstanding.
pub const INV_ANALYSIS_DROPPED: u8 = 5;

/// A control message was drained and applied.
pub const INV_CONTROL_MSG_PROCESSED: u8 = 6;

/// Block lengths did not match the configured block size.
pub const INV_BLOCK_CONTRACT_VIOLATED: u8 = 7;

// ============================================================================
// Invariant Signal Queue
// ============================================================================

/// Capacity for invariant signal queue.
/// Large enough for several callbacks between drains.
pub const INVARIANT_QUEUE_CAPACITY: usize = 256;

/// Creates a new invariant signal queue pair.
///
/// Returns (producer for RT, consumer for the control thread).
pub fn new_invariant_queue() -> (Producer<u8>, Consumer<u8>) {
    RingBuffer::new(INVARIANT_QUEUE_CAPACITY)
}

/// Signals an invariant from the RT path.
///
/// # RT Safety
/// No allocation, no locking, no panics. A full queue drops the signal.
#[inline]
pub fn signal_invariant(tx: &mut Producer<u8>, id: u8) {
    let _ = tx.push(id);
}

// ============================================================================
// Non-RT Verification (Tier 2)
// ============================================================================

/// Drains all pending invariant signals from the queue.
pub fn drain_invariant_signals(rx: &mut Consumer<u8>) -> Vec<u8> {
    let mut signals = Vec::with_capacity(rx.slots());
    while let Ok(id) = rx.pop() {
        signals.push(id);
    }
    signals
}

/// Counts occurrences of each invariant ID in a signal list.
pub fn count_invariant_signals(signals: &[u8]) -> [usize; 256] {
    let mut counts = [0usize; 256];
    for &id in signals {
        counts[id as usize] += 1;
    }
    counts
}

/// Contract verification: asserts that required invariants were signaled.
///
/// # Panics
/// Panics if any required invariant was not signaled at least once.
pub fn contract_test_rt(contract_name: &str, signals: &[u8], required: &[u8]) {
    let counts = count_invariant_signals(signals);
    let missing: Vec<&str> = required
        .iter()
        .filter(|&&id| counts[id as usize] == 0)
        .map(|&id| invariant_name(id))
        .collect();

    if !missing.is_empty() {
        let present: Vec<&str> = signals
            .iter()
            .map(|&id| invariant_name(id))
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        panic!(
            "RT Contract '{}' missing invariants: {:?}. Present: {:?}",
            contract_name, missing, present
        );
    }
}

/// Maps invariant ID to human-readable name (for diagnostics only).
pub const fn invariant_name(id: u8) -> &'static str {
    match id {
        INV_BLOCK_PROCESSED => "BLOCK_PROCESSED",
        INV_OUTPUT_SANITIZED => "OUTPUT_SANITIZED",
        INV_HISTORY_WRITTEN => "HISTORY_WRITTEN",
        INV_ANALYSIS_REQUESTED => "ANALYSIS_REQUESTED",
        INV_ANALYSIS_DROPPED => "ANALYSIS_DROPPED",
        INV_CONTROL_MSG_PROCESSED => "CONTROL_MSG_PROCESSED",
        INV_BLOCK_CONTRACT_VIOLATED => "BLOCK_CONTRACT_VIOLATED",
        _ => "UNKNOWN",
    }
}
