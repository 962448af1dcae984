//! Control message types for main → RT communication.
//!
//! Messages travel over a lock-free SPSC queue and are drained at the start
//! of every block. All messages are:
//! - Fixed-size (no heap allocation)
//! - Copy (can be sent across threads)
//! - Self-contained (no references or pointers)

use crate::config::TriggerPolicy;
use crate::invariant_rt::drain_invariant_signals;
use rtrb::{Consumer, Producer, PushError, RingBuffer};

/// Capacity for control message queue.
pub const CONTROL_QUEUE_CAPACITY: usize = 64;

/// Creates a new control message queue pair.
///
/// Returns (producer for the control thread, consumer for RT).
pub fn new_control_queue() -> (Producer<ControlMsg>, Consumer<ControlMsg>) {
    RingBuffer::new(CONTROL_QUEUE_CAPACITY)
}

/// Control messages sent to the RT callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    /// Analyze the current window as soon as the history is primed.
    RequestAnalysis,

    /// Replace the automatic trigger policy.
    SetTriggerPolicy(TriggerPolicy),

    /// Forget the analysis history (the next window starts empty).
    ClearHistory,
}

impl ControlMsg {
    /// Returns a human-readable description (for debugging).
    pub fn description(&self) -> &'static str {
        match self {
            ControlMsg::RequestAnalysis => "RequestAnalysis",
            ControlMsg::SetTriggerPolicy(_) => "SetTriggerPolicy",
            ControlMsg::ClearHistory => "ClearHistory",
        }
    }
}

/// Control-thread handle for one processor instance.
pub struct ControlHandle {
    control_tx: Producer<ControlMsg>,
    invariant_rx: Consumer<u8>,
}

impl ControlHandle {
    pub(crate) fn new(control_tx: Producer<ControlMsg>, invariant_rx: Consumer<u8>) -> Self {
        Self {
            control_tx,
            invariant_rx,
        }
    }

    /// Queue a message for the next block. Hands it back if the queue is full.
    pub fn send(&mut self, msg: ControlMsg) -> Result<(), ControlMsg> {
        self.control_tx.push(msg).map_err(|PushError::Full(msg)| {
            log::warn!("control queue full, dropping {}", msg.description());
            msg
        })
    }

    /// Ask for an analysis of the newest window.
    pub fn request_analysis(&mut self) -> bool {
        self.send(ControlMsg::RequestAnalysis).is_ok()
    }

    /// Collect every RT invariant signal since the last drain.
    pub fn drain_invariant_signals(&mut self) -> Vec<u8> {
        drain_invariant_signals(&mut self.invariant_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    #[test]
    fn test_control_msg_is_copy() {
        let msg = ControlMsg::SetTriggerPolicy(TriggerPolicy::OnDemand);
        let msg2 = msg;
        assert_eq!(msg, msg2);
    }

    #[test]
    fn test_control_queue_roundtrip() {
        let (mut tx, mut rx) = new_control_queue();
        let every = NonZeroU32::new(4).unwrap();

        tx.push(ControlMsg::RequestAnalysis).unwrap();
        tx.push(ControlMsg::SetTriggerPolicy(TriggerPolicy::EveryBlocks(every)))
            .unwrap();

        assert_eq!(rx.pop().unwrap(), ControlMsg::RequestAnalysis);
        assert_eq!(
            rx.pop().unwrap(),
            ControlMsg::SetTriggerPolicy(TriggerPolicy::EveryBlocks(every))
        );
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_send_reports_full_queue() {
        let (tx, _rx) = new_control_queue();
        let (_inv_tx, inv_rx) = crate::invariant_rt::new_invariant_queue();
        let mut handle = ControlHandle::new(tx, inv_rx);
        for _ in 0..CONTROL_QUEUE_CAPACITY {
            assert!(handle.request_analysis());
        }
        assert_eq!(handle.send(ControlMsg::ClearHistory), Err(ControlMsg::ClearHistory));
    }
}
