//! Rotation-invariant dissimilarity between ring vectors.
//!
//! A rotation of the pattern about the ring center moves samples along each
//! ring, so it is modelled as a cyclic shift of the flat sample array. The
//! sweep walks candidate angles in `rotation_stride` steps; every angle is
//! quantized per ring to a whole-pixel shift and rings whose shift did not
//! change since the previous angle reuse their cached partial sums. The score
//! is the root of the smallest mean squared error over all angles.

use crate::util::math::{rotation_shift, TAU};
use crate::util::{RingMatchError, RingMatchResult};
use crate::vector::RingVector;

/// Mean squared error at or below which a rotation counts as a perfect match
/// and the sweep stops.
pub const PERFECT_MATCH_MSE: f32 = 0.000025;

/// Resolved comparison parameters for one reference vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiffParams {
    rotation_stride: f64,
    matching_stride: usize,
    matching_offset: usize,
}

impl DiffParams {
    /// Validates the raw parameters against `reference` and raises the
    /// rotation stride to the finest angle any of its rings can resolve.
    pub fn resolve(
        rotation_stride: f32,
        matching_stride: usize,
        matching_offset: usize,
        reference: &RingVector,
    ) -> RingMatchResult<Self> {
        if !rotation_stride.is_finite() {
            return Err(RingMatchError::InvalidConfig {
                reason: "rotation_stride must be finite",
            });
        }
        if matching_stride == 0 {
            return Err(RingMatchError::InvalidConfig {
                reason: "matching_stride must be > 0",
            });
        }
        let shortest = reference
            .rings()
            .iter()
            .map(|ring| ring.len())
            .min()
            .ok_or(RingMatchError::InvalidGeometry {
                reason: "reference vector has no rings",
            })?;
        if matching_offset >= shortest {
            return Err(RingMatchError::InvalidConfig {
                reason: "matching_offset must be smaller than the shortest ring",
            });
        }

        let finest = reference
            .rings()
            .iter()
            .map(|ring| TAU * ring.stride() as f64 / ring.len() as f64)
            .fold(TAU, f64::min);
        Ok(Self {
            rotation_stride: (rotation_stride as f64).max(finest),
            matching_stride,
            matching_offset,
        })
    }

    /// Effective angular step in radians.
    pub fn rotation_stride(&self) -> f64 {
        self.rotation_stride
    }

    /// Step between compared sample indices.
    pub fn matching_stride(&self) -> usize {
        self.matching_stride
    }

    /// First compared sample index within each ring.
    pub fn matching_offset(&self) -> usize {
        self.matching_offset
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct RingDiff {
    base: Option<usize>,
    sum: f32,
    count: usize,
}

/// Per-ring memo of the last shift evaluated during one comparison.
///
/// Workers keep one cache and reuse its allocation across pixels; it is reset
/// at the start of every comparison.
#[derive(Clone, Debug, Default)]
pub struct RingDiffCache {
    slots: Vec<RingDiff>,
}

impl RingDiffCache {
    /// Creates a cache with one slot per ring.
    pub fn new(rings: usize) -> Self {
        Self {
            slots: vec![RingDiff::default(); rings],
        }
    }

    fn reset(&mut self, rings: usize) {
        self.slots.clear();
        self.slots.resize(rings, RingDiff::default());
    }
}

/// Computes the rotation-invariant RMS difference of `probe` against
/// `reference`. Zero means the probe equals the reference at some rotation.
///
/// Both vectors must have the same shape (see [`RingVector::empty_clone`]).
pub fn ring_vector_diff(
    reference: &RingVector,
    probe: &RingVector,
    params: &DiffParams,
    cache: &mut RingDiffCache,
) -> f32 {
    let rings = reference.rings();
    debug_assert_eq!(rings.len(), probe.rings().len());
    cache.reset(rings.len());

    let mut best = f32::INFINITY;
    let mut step = 0usize;
    loop {
        let theta = step as f64 * params.rotation_stride;
        if theta >= TAU {
            break;
        }

        let mut total = 0.0f32;
        let mut total_count = 0usize;
        for ((a, b), slot) in rings.iter().zip(probe.rings()).zip(cache.slots.iter_mut()) {
            let base = rotation_shift(theta, a.len(), a.stride());
            if slot.base != Some(base) {
                let (sum, count) = shifted_sq_diff(
                    a.samples(),
                    b.samples(),
                    base,
                    params.matching_stride,
                    params.matching_offset,
                );
                *slot = RingDiff {
                    base: Some(base),
                    sum,
                    count,
                };
            }
            total += slot.sum;
            total_count += slot.count;
        }

        let mse = total / total_count as f32;
        if mse < best {
            best = mse;
        }
        if best <= PERFECT_MATCH_MSE {
            break;
        }
        step += 1;
    }
    best.sqrt()
}

/// Sum of squared differences between `a[i]` and `b[(base + i) % len]` over
/// `i = offset, offset + stride, ...`, with the number of compared samples.
#[inline]
fn shifted_sq_diff(a: &[f32], b: &[f32], base: usize, stride: usize, offset: usize) -> (f32, usize) {
    let len = a.len();
    debug_assert_eq!(len, b.len());
    let mut j = (base + offset) % len;
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for &va in a.iter().skip(offset).step_by(stride) {
        let d = va - b[j];
        sum += d * d;
        count += 1;
        j += stride;
        if j >= len {
            j %= len;
        }
    }
    (sum, count)
}

impl RingVector {
    /// Convenience wrapper around [`ring_vector_diff`] with a fresh cache.
    pub fn diff(&self, probe: &RingVector, params: &DiffParams) -> f32 {
        let mut cache = RingDiffCache::new(self.rings().len());
        ring_vector_diff(self, probe, params, &mut cache)
    }
}
