//! Per-instance signal state: the last discrete value and the analysis history.

// IMPORTANT: `History::write` and `History::snapshot_into` run on the RT thread.
// Keep them allocation-free.

use std::fmt;
use std::sync::Arc;

/// A cheaply clonable symbol. Cloning never allocates.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Symbol(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

/// A type-tagged discrete value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i64),
    FloatingPoint(f64),
    Symbolic(Symbol),
}

impl Scalar {
    /// Deliver this value to an outlet, choosing the typed entry point.
    pub fn dispatch<O: ScalarOutlet + ?Sized>(&self, outlet: &mut O) {
        match self {
            Scalar::Integer(n) => outlet.emit_int(*n),
            Scalar::FloatingPoint(f) => outlet.emit_float(*f),
            Scalar::Symbolic(s) => outlet.emit_symbol(s),
        }
    }
}

/// Output stage for discrete values.
pub trait ScalarOutlet {
    fn emit_int(&mut self, value: i64);
    fn emit_float(&mut self, value: f64);
    fn emit_symbol(&mut self, value: &Symbol);
}

/// Discrete (non-block) input messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Int(i64),
    Float(f64),
    Symbol(Symbol),
    /// Emit the stored value on both outputs.
    Bang,
    /// Request a spectral analysis of the current window.
    Analyze,
}

/// The pair of values produced on the two scalar outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub left: Scalar,
    pub right: Scalar,
}

impl Emission {
    fn duplicate(value: &Scalar) -> Self {
        Emission {
            left: value.clone(),
            right: value.clone(),
        }
    }

    /// Deliver to both outlets, left first.
    pub fn deliver<L, R>(&self, left: &mut L, right: &mut R)
    where
        L: ScalarOutlet + ?Sized,
        R: ScalarOutlet + ?Sized,
    {
        self.left.dispatch(left);
        self.right.dispatch(right);
    }
}

/// Pure scalar handler: `(last, message) -> (last', emission)`.
///
/// `Analyze` does not touch the scalar slot; the processor handles it.
pub fn apply_scalar(
    last: Option<Scalar>,
    msg: &Message,
    emit_on_update: bool,
) -> (Option<Scalar>, Option<Emission>) {
    match msg {
        Message::Int(n) => {
            let next = Scalar::Integer(*n);
            let out = emit_on_update.then(|| Emission::duplicate(&next));
            (Some(next), out)
        }
        Message::Float(f) => {
            let next = Scalar::FloatingPoint(*f);
            let out = emit_on_update.then(|| Emission::duplicate(&next));
            (Some(next), out)
        }
        Message::Symbol(s) => (Some(Scalar::Symbolic(s.clone())), None),
        Message::Bang => {
            let out = last.as_ref().map(Emission::duplicate);
            (last, out)
        }
        Message::Analyze => (last, None),
    }
}

/// Circular buffer of the most recent `capacity` raw samples.
#[derive(Debug, Clone)]
pub struct History {
    buf: Box<[f64]>,
    write_pos: usize,
    filled: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity].into_boxed_slice(),
            write_pos: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of valid samples, saturating at capacity.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// True once a full window has been written.
    pub fn is_primed(&self) -> bool {
        self.filled == self.buf.len()
    }

    /// Append samples, overwriting the oldest.
    pub fn write(&mut self, block: &[f64]) {
        let cap = self.buf.len();
        if cap == 0 {
            return;
        }
        // Only the newest `cap` samples can survive.
        let block = if block.len() > cap {
            &block[block.len() - cap..]
        } else {
            block
        };
        let first = block.len().min(cap - self.write_pos);
        self.buf[self.write_pos..self.write_pos + first].copy_from_slice(&block[..first]);
        let rest = block.len() - first;
        self.buf[..rest].copy_from_slice(&block[first..]);
        self.write_pos = (self.write_pos + block.len()) % cap;
        self.filled = (self.filled + block.len()).min(cap);
    }

    /// Copy the window into `out`, oldest sample first.
    ///
    /// `out` must be exactly `capacity()` long. Unwritten slots read as zero.
    pub fn snapshot_into(&self, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.buf.len());
        if out.len() != self.buf.len() {
            return;
        }
        let tail = self.buf.len() - self.write_pos;
        out[..tail].copy_from_slice(&self.buf[self.write_pos..]);
        out[tail..].copy_from_slice(&self.buf[..self.write_pos]);
    }

    pub fn clear(&mut self) {
        self.buf.fill(0.0);
        self.write_pos = 0;
        self.filled = 0;
    }
}

/// Everything a processor instance remembers between calls.
#[derive(Debug, Clone)]
pub struct SignalState {
    pub last_value: Option<Scalar>,
    pub history: History,
}

impl SignalState {
    pub fn new(window_size: usize) -> Self {
        Self {
            last_value: None,
            history: History::new(window_size),
        }
    }

    /// Run a discrete message through `apply_scalar`.
    pub fn apply(&mut self, msg: &Message, emit_on_update: bool) -> Option<Emission> {
        let (next, out) = apply_scalar(self.last_value.take(), msg, emit_on_update);
        self.last_value = next;
        out
    }
}
