//! RT module: the per-block callback.

// IMPORTANT: Do not call assert_invariant, log macros, or anything that allocates
// or locks from `process`. Signal facts through `invariant_rt` instead.

use crate::config::{ProcessorConfig, TriggerPolicy};
use crate::control::ControlMsg;
use crate::error::SpectralError;
use crate::handoff::{AnalysisRequest, RtHandoff};
use crate::invariant_rt::{
    signal_invariant, INV_ANALYSIS_DROPPED, INV_ANALYSIS_REQUESTED, INV_BLOCK_CONTRACT_VIOLATED,
    INV_BLOCK_PROCESSED, INV_CONTROL_MSG_PROCESSED, INV_HISTORY_WRITTEN, INV_OUTPUT_SANITIZED,
};
use crate::sanitize::{needs_flush, sanitize};
use crate::state::{Emission, Message, SignalState};
use rtrb::{Consumer, Producer};

/// Two-in, two-out block processor: `L*R` and `L+R`, plus window snapshots.
pub struct BlockProcessor {
    block_size: usize,
    sample_rate: f64,
    emit_on_update: bool,
    trigger: TriggerPolicy,
    state: SignalState,
    handoff: RtHandoff,
    control_rx: Consumer<ControlMsg>,
    invariant_tx: Producer<u8>,
    analysis_pending: bool,
    blocks_since_trigger: u32,
    next_generation: u64,
    blocks_processed: u64,
}

impl BlockProcessor {
    /// Build a processor. Allocates; call off the RT thread.
    pub(crate) fn new(
        config: &ProcessorConfig,
        handoff: RtHandoff,
        control_rx: Consumer<ControlMsg>,
        invariant_tx: Producer<u8>,
    ) -> Self {
        Self {
            block_size: config.block_size,
            sample_rate: config.sample_rate,
            emit_on_update: config.emit_on_update,
            trigger: config.trigger,
            state: SignalState::new(config.window_size),
            handoff,
            control_rx,
            invariant_tx,
            analysis_pending: false,
            blocks_since_trigger: 0,
            next_generation: 0,
            blocks_processed: 0,
        }
    }

    /// Process one block.
    ///
    /// All four slices must be exactly `block_size()` long. A mismatch panics
    /// in debug builds; in release builds the call returns without touching
    /// the outputs.
    pub fn process(&mut self, left: &[f64], right: &[f64], out_mul: &mut [f64], out_add: &mut [f64]) {
        self.process_frames(left, right, out_mul, out_add, left.len());
    }

    /// `process`, but only the first `valid` samples of `left` reach the
    /// history. Used for zero-padded tail blocks.
    fn process_frames(
        &mut self,
        left: &[f64],
        right: &[f64],
        out_mul: &mut [f64],
        out_add: &mut [f64],
        valid: usize,
    ) {
        if let Err(violation) = self.check_lengths(left, right, out_mul, out_add) {
            if cfg!(debug_assertions) {
                panic!("{}", violation);
            }
            signal_invariant(&mut self.invariant_tx, INV_BLOCK_CONTRACT_VIOLATED);
            return;
        }

        self.drain_control();

        let mut flushed = 0usize;
        for (((&l, &r), m), a) in left
            .iter()
            .zip(right)
            .zip(out_mul.iter_mut())
            .zip(out_add.iter_mut())
        {
            let product = l * r;
            let sum = l + r;
            flushed += needs_flush(product) as usize + needs_flush(sum) as usize;
            *m = sanitize(product);
            *a = sanitize(sum);
        }

        self.state.history.write(&left[..valid.min(left.len())]);
        signal_invariant(&mut self.invariant_tx, INV_HISTORY_WRITTEN);

        self.blocks_processed += 1;
        self.tick_trigger();
        if self.analysis_pending {
            self.try_issue_request();
        }

        if flushed > 0 {
            signal_invariant(&mut self.invariant_tx, INV_OUTPUT_SANITIZED);
        }
        signal_invariant(&mut self.invariant_tx, INV_BLOCK_PROCESSED);
    }

    /// Handle a discrete message. Returns what should go out on the two
    /// scalar outputs, if anything.
    pub fn handle_message(&mut self, msg: Message) -> Option<Emission> {
        if matches!(msg, Message::Analyze) {
            self.request_analysis();
            return None;
        }
        self.state.apply(&msg, self.emit_on_update)
    }

    /// Mark an analysis as pending; it is issued on the next primed block.
    pub fn request_analysis(&mut self) {
        self.analysis_pending = true;
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn window_size(&self) -> usize {
        self.handoff.window_size()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn state(&self) -> &SignalState {
        &self.state
    }

    pub fn trigger_policy(&self) -> TriggerPolicy {
        self.trigger
    }

    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed
    }

    /// Generation the next accepted request will carry.
    pub fn next_generation(&self) -> u64 {
        self.next_generation
    }

    pub fn analysis_pending(&self) -> bool {
        self.analysis_pending
    }

    /// True while a snapshot is with the analyzer.
    pub fn analysis_in_flight(&self) -> bool {
        !self.handoff.is_idle()
    }

    fn check_lengths(
        &self,
        left: &[f64],
        right: &[f64],
        out_mul: &[f64],
        out_add: &[f64],
    ) -> Result<(), SpectralError> {
        let expected = self.block_size;
        for actual in [left.len(), right.len(), out_mul.len(), out_add.len()] {
            if actual != expected {
                return Err(SpectralError::ContractViolation { expected, actual });
            }
        }
        Ok(())
    }

    fn drain_control(&mut self) {
        while let Ok(msg) = self.control_rx.pop() {
            match msg {
                ControlMsg::RequestAnalysis => self.analysis_pending = true,
                ControlMsg::SetTriggerPolicy(policy) => {
                    self.trigger = policy;
                    self.blocks_since_trigger = 0;
                }
                ControlMsg::ClearHistory => self.state.history.clear(),
            }
            signal_invariant(&mut self.invariant_tx, INV_CONTROL_MSG_PROCESSED);
        }
    }

    fn tick_trigger(&mut self) {
        if let TriggerPolicy::EveryBlocks(every) = self.trigger {
            self.blocks_since_trigger += 1;
            if self.blocks_since_trigger >= every.get() {
                self.blocks_since_trigger = 0;
                self.analysis_pending = true;
            }
        }
    }

    /// Snapshot the window into the handoff. Drops the trigger if an
    /// analysis is still outstanding; waits if the history is not primed yet.
    fn try_issue_request(&mut self) {
        if !self.state.history.is_primed() {
            return;
        }
        self.analysis_pending = false;

        let Some(mut buf) = self.handoff.take_buffer() else {
            signal_invariant(&mut self.invariant_tx, INV_ANALYSIS_DROPPED);
            return;
        };
        self.state.history.snapshot_into(&mut buf);

        match self
            .handoff
            .try_push(AnalysisRequest::new(buf, self.next_generation))
        {
            Ok(()) => {
                self.next_generation += 1;
                signal_invariant(&mut self.invariant_tx, INV_ANALYSIS_REQUESTED);
            }
            Err(rejected) => {
                self.handoff.restore_buffer(rejected.into_samples());
                signal_invariant(&mut self.invariant_tx, INV_ANALYSIS_DROPPED);
            }
        }
    }
}

/// Render arbitrary-length input offline, block by block.
///
/// The last partial block is zero-padded and the padding trimmed from the
/// output; the padding never enters the analysis history. Allocates; not for
/// the RT thread.
pub fn render_offline(processor: &mut BlockProcessor, left: &[f64], right: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let frames = left.len().min(right.len());
    let block_size = processor.block_size();
    let mut out_mul = Vec::with_capacity(frames);
    let mut out_add = Vec::with_capacity(frames);

    let mut in_l = vec![0.0; block_size];
    let mut in_r = vec![0.0; block_size];
    let mut blk_mul = vec![0.0; block_size];
    let mut blk_add = vec![0.0; block_size];

    let mut offset = 0;
    while offset < frames {
        let end = (offset + block_size).min(frames);
        let len = end - offset;
        in_l.fill(0.0);
        in_r.fill(0.0);
        in_l[..len].copy_from_slice(&left[offset..end]);
        in_r[..len].copy_from_slice(&right[offset..end]);
        processor.process_frames(&in_l, &in_r, &mut blk_mul, &mut blk_add, len);
        out_mul.extend_from_slice(&blk_mul[..len]);
        out_add.extend_from_slice(&blk_add[..len]);
        offset = end;
    }
    (out_mul, out_add)
}

/// Run `process` with panic containment: on panic both outputs are silenced.
pub fn process_block_safe(
    processor: &mut BlockProcessor,
    left: &[f64],
    right: &[f64],
    out_mul: &mut [f64],
    out_add: &mut [f64],
) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        processor.process(left, right, out_mul, out_add);
    }));
    if result.is_err() {
        // Fail closed: silence output
        out_mul.fill(0.0);
        out_add.fill(0.0);
    }
}
