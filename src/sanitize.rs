//! Denormal / NaN flushing for the output bus.
//!
//! Subnormal floats stall the FPU on most hardware and a single NaN poisons
//! every downstream feedback path, so neither may reach the outputs.

/// Magnitudes below this are flushed to zero (smallest normal `f64`).
pub const DENORMAL_THRESHOLD: f64 = f64::MIN_POSITIVE;

/// Returns `x`, or exactly `0.0` if `x` is NaN, infinite or subnormal.
#[inline(always)]
pub fn sanitize(x: f64) -> f64 {
    if x.is_finite() && x.abs() >= DENORMAL_THRESHOLD {
        x
    } else {
        0.0
    }
}

/// True when `sanitize` would change the value (zero is left alone).
#[inline(always)]
pub fn needs_flush(x: f64) -> bool {
    x != 0.0 && sanitize(x) == 0.0
}

/// Sanitizes a block in place, returning how many samples were flushed.
pub fn sanitize_block(block: &mut [f64]) -> usize {
    let mut flushed = 0;
    for s in block.iter_mut() {
        if needs_flush(*s) {
            *s = 0.0;
            flushed += 1;
        }
    }
    flushed
}
