//! Numeric helpers shared by the matcher and the post-processor.

/// One full turn in radians.
pub(crate) const TAU: f64 = std::f64::consts::TAU;

/// Slack added before flooring a fractional sample shift so that exact
/// multiples computed in floating point do not round down a whole sample.
const SHIFT_EPS: f64 = 1e-9;

/// Maps a rotation angle in radians onto a sample shift within a ring of
/// `len` samples, aligned down to a multiple of `stride`.
pub(crate) fn rotation_shift(theta: f64, len: usize, stride: usize) -> usize {
    debug_assert!(len > 0 && stride > 0);
    let turn = theta / TAU;
    let raw = (turn * len as f64 + SHIFT_EPS).floor().max(0.0) as usize;
    (raw - raw % stride) % len
}

/// Normalizes an 8-bit channel to `[0, 1]`.
#[inline]
pub(crate) fn unit_channel(value: u8) -> f32 {
    value as f32 / 255.0
}
