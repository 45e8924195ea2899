//! Ring vectors: concentric circular samples around an image point.
//!
//! A ring stores its samples as a flat `[r, g, b, r, g, b, ...]` array aligned
//! with the rasterized offsets of its radius, so sample `i * 3 + c` is channel
//! `c` of the pixel at offset `i`. Rings inside a vector are ordered by
//! increasing radius.

mod source;

pub use source::{RingLayout, RingSource};

use crate::circle::{CircleCache, Offset};
use crate::trace::{trace_event, trace_span};
use crate::util::{RingMatchError, RingMatchResult};
use serde::{Deserialize, Serialize};

/// Geometry of a reference vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorParams {
    /// Radius of the innermost ring.
    pub radius: usize,
    /// Number of rings.
    pub count: usize,
    /// Radius step between consecutive rings.
    pub radius_inc: usize,
}

impl Default for VectorParams {
    fn default() -> Self {
        Self {
            radius: 4,
            count: 1,
            radius_inc: 2,
        }
    }
}

impl VectorParams {
    /// Rejects zero radius, ring count or increment, and outer radii that
    /// overflow.
    pub fn validate(&self) -> RingMatchResult<()> {
        if self.radius == 0 {
            return Err(RingMatchError::InvalidGeometry {
                reason: "radius must be > 0",
            });
        }
        if self.count == 0 {
            return Err(RingMatchError::InvalidGeometry {
                reason: "ring count must be > 0",
            });
        }
        if self.radius_inc == 0 {
            return Err(RingMatchError::InvalidGeometry {
                reason: "radius increment must be > 0",
            });
        }
        // Offsets are stored as i32, so the outer ring must fit one.
        match self.checked_max_radius() {
            Some(r) if i32::try_from(r).is_ok() => Ok(()),
            _ => Err(RingMatchError::InvalidGeometry {
                reason: "outer radius overflows",
            }),
        }
    }

    /// Radius of the outermost ring.
    ///
    /// Saturates at `usize::MAX` for geometry that `validate` rejects.
    pub fn max_radius(&self) -> usize {
        self.checked_max_radius().unwrap_or(usize::MAX)
    }

    fn checked_max_radius(&self) -> Option<usize> {
        self.count
            .saturating_sub(1)
            .checked_mul(self.radius_inc)?
            .checked_add(self.radius)
    }
}

/// One circle's worth of normalized color samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    radius: usize,
    stride: usize,
    samples: Vec<f32>,
}

impl Ring {
    /// Channels stored per sampled pixel.
    pub const CHANNELS: usize = 3;

    /// Allocates a zeroed ring sized for `radius`.
    pub fn new(radius: usize, circles: &CircleCache) -> Self {
        Self {
            radius,
            stride: Self::CHANNELS,
            samples: vec![0.0; circles.point_count(radius) * Self::CHANNELS],
        }
    }

    /// Returns the ring radius.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Returns the number of samples per pixel.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the flat sample array.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Returns the number of samples (pixels times channels).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the ring holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples `src` at every offset around `(cx, cy)`.
    ///
    /// `offsets` must be the rasterization of this ring's radius and the whole
    /// ring must lie inside `src`.
    #[inline]
    pub fn load_samples<S: RingSource + ?Sized>(
        &mut self,
        offsets: &[Offset],
        src: &S,
        cx: usize,
        cy: usize,
    ) {
        debug_assert_eq!(offsets.len() * self.stride, self.samples.len());
        for (dst, &(dx, dy)) in self.samples.chunks_exact_mut(self.stride).zip(offsets) {
            let x = (cx as isize + dx as isize) as usize;
            let y = (cy as isize + dy as isize) as usize;
            dst.copy_from_slice(&src.channels_at(x, y));
        }
    }

    fn zeroed_like(&self) -> Self {
        Self {
            radius: self.radius,
            stride: self.stride,
            samples: vec![0.0; self.samples.len()],
        }
    }
}

/// Multi-radius fingerprint of an image point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingVector {
    min_radius: usize,
    max_radius: usize,
    total_sample_count: usize,
    rings: Vec<Ring>,
}

impl RingVector {
    /// Allocates a zeroed vector with the geometry in `params`.
    pub fn new(params: &VectorParams, circles: &CircleCache) -> RingMatchResult<Self> {
        params.validate()?;
        let rings: Vec<Ring> = (0..params.count)
            .map(|idx| Ring::new(params.radius + idx * params.radius_inc, circles))
            .collect();
        let total_sample_count = rings.iter().map(Ring::len).sum();
        Ok(Self {
            min_radius: params.radius,
            max_radius: params.max_radius(),
            total_sample_count,
            rings,
        })
    }

    /// Builds a reference vector by sampling `src` around `(x, y)`.
    pub fn from_image<S: RingSource + ?Sized>(
        params: &VectorParams,
        circles: &CircleCache,
        src: &S,
        x: usize,
        y: usize,
    ) -> RingMatchResult<Self> {
        let _span = trace_span!("build_reference", x = x, y = y).entered();
        params.validate()?;
        center_fits(params.max_radius(), src.width(), src.height(), x, y)?;
        let mut vector = Self::new(params, circles)?;
        let layout = RingLayout::for_vector(&vector, circles);
        vector.load(&layout, src, x, y);
        trace_event!(
            "reference_built",
            rings = vector.rings.len(),
            samples = vector.total_sample_count
        );
        Ok(vector)
    }

    /// Returns a same-shaped vector with zeroed, independently owned samples.
    pub fn empty_clone(&self) -> Self {
        Self {
            min_radius: self.min_radius,
            max_radius: self.max_radius,
            total_sample_count: self.total_sample_count,
            rings: self.rings.iter().map(Ring::zeroed_like).collect(),
        }
    }

    /// Re-samples every ring around `(x, y)`.
    #[inline]
    pub fn load<S: RingSource + ?Sized>(
        &mut self,
        layout: &RingLayout,
        src: &S,
        x: usize,
        y: usize,
    ) {
        for (idx, ring) in self.rings.iter_mut().enumerate() {
            ring.load_samples(layout.ring(idx), src, x, y);
        }
    }

    /// Mean of all samples across all rings.
    pub fn average(&self) -> f32 {
        let sum: f32 = self.rings.iter().flat_map(|r| r.samples.iter()).sum();
        sum / self.total_sample_count as f32
    }

    /// Fails unless every ring around `(x, y)` stays inside a
    /// `width` x `height` image.
    pub fn check_center(&self, width: usize, height: usize, x: usize, y: usize) -> RingMatchResult<()> {
        center_fits(self.max_radius, width, height, x, y)
    }

    /// Checks that a vector (typically deserialized) matches the shape the
    /// rasterizer produces for its radii.
    pub fn validate(&self, circles: &CircleCache) -> RingMatchResult<()> {
        let first = self.rings.first().ok_or_else(|| RingMatchError::ShapeMismatch {
            reason: "vector has no rings".to_string(),
        })?;
        let last = &self.rings[self.rings.len() - 1];
        if first.radius != self.min_radius || last.radius != self.max_radius {
            return Err(RingMatchError::ShapeMismatch {
                reason: format!(
                    "radius range {}..={} disagrees with rings {}..={}",
                    self.min_radius, self.max_radius, first.radius, last.radius
                ),
            });
        }

        if first.radius == 0 || i32::try_from(last.radius).is_err() {
            return Err(RingMatchError::ShapeMismatch {
                reason: format!("radius range {}..={} is out of range", first.radius, last.radius),
            });
        }

        let step = self.rings.get(1).map(|second| second.radius.wrapping_sub(first.radius));
        let mut prev_radius: Option<usize> = None;
        let mut total = 0usize;
        for ring in &self.rings {
            if let Some(prev) = prev_radius {
                if ring.radius <= prev || Some(ring.radius - prev) != step {
                    return Err(RingMatchError::ShapeMismatch {
                        reason: format!(
                            "ring radius {} breaks the fixed increment after {prev}",
                            ring.radius
                        ),
                    });
                }
            }
            if ring.stride != Ring::CHANNELS {
                return Err(RingMatchError::ShapeMismatch {
                    reason: format!("ring {} has stride {}", ring.radius, ring.stride),
                });
            }
            let expected = circles.point_count(ring.radius) * Ring::CHANNELS;
            if ring.samples.len() != expected {
                return Err(RingMatchError::ShapeMismatch {
                    reason: format!(
                        "ring {} holds {} samples, expected {expected}",
                        ring.radius,
                        ring.samples.len()
                    ),
                });
            }
            prev_radius = Some(ring.radius);
            total += ring.samples.len();
        }

        if total != self.total_sample_count {
            return Err(RingMatchError::ShapeMismatch {
                reason: format!(
                    "total sample count {} disagrees with rings ({total})",
                    self.total_sample_count
                ),
            });
        }
        Ok(())
    }

    /// Radius of the innermost ring.
    pub fn min_radius(&self) -> usize {
        self.min_radius
    }

    /// Radius of the outermost ring.
    pub fn max_radius(&self) -> usize {
        self.max_radius
    }

    /// Sum of all ring sample counts.
    pub fn total_sample_count(&self) -> usize {
        self.total_sample_count
    }

    /// Rings ordered by increasing radius.
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }
}

/// Valid iff a ring of radius `r` around `(x, y)` stays inside the image.
fn center_fits(r: usize, width: usize, height: usize, x: usize, y: usize) -> RingMatchResult<()> {
    let fits = x >= r && y >= r && x < width.saturating_sub(r) && y < height.saturating_sub(r);
    if fits {
        return Ok(());
    }
    Err(RingMatchError::RingOutOfBounds {
        x,
        y,
        radius: r,
        img_width: width,
        img_height: height,
    })
}
