//! Pixel sources that rings can be sampled from.

use crate::circle::{CircleCache, Offset};
use crate::image::{ImageView, Rgba};
use crate::util::math::unit_channel;
use crate::vector::RingVector;
use std::sync::Arc;

/// An image that yields three normalized channels per pixel.
///
/// Implementations index without bounds checks beyond the slice's own; the
/// caller keeps every sampled ring inside the image.
pub trait RingSource: Sync {
    /// Image width in pixels.
    fn width(&self) -> usize;
    /// Image height in pixels.
    fn height(&self) -> usize;
    /// Returns the R, G and B values at `(x, y)` in `[0, 1]`.
    fn channels_at(&self, x: usize, y: usize) -> [f32; 3];
}

impl RingSource for ImageView<'_, Rgba> {
    fn width(&self) -> usize {
        ImageView::width(self)
    }

    fn height(&self) -> usize {
        ImageView::height(self)
    }

    #[inline]
    fn channels_at(&self, x: usize, y: usize) -> [f32; 3] {
        let px = self.at(x, y);
        [unit_channel(px[0]), unit_channel(px[1]), unit_channel(px[2])]
    }
}

/// Gray surfaces replicate their single value into all three channels.
impl RingSource for ImageView<'_, f32> {
    fn width(&self) -> usize {
        ImageView::width(self)
    }

    fn height(&self) -> usize {
        ImageView::height(self)
    }

    #[inline]
    fn channels_at(&self, x: usize, y: usize) -> [f32; 3] {
        let v = *self.at(x, y);
        [v, v, v]
    }
}

/// Rasterized offsets for every ring of a vector, resolved once per worker.
#[derive(Clone, Debug)]
pub struct RingLayout {
    offsets: Vec<Arc<[Offset]>>,
}

impl RingLayout {
    /// Looks up the offsets of each ring in `vector`.
    pub fn for_vector(vector: &RingVector, circles: &CircleCache) -> Self {
        let offsets = vector
            .rings()
            .iter()
            .map(|ring| circles.points_for(ring.radius()))
            .collect();
        Self { offsets }
    }

    /// Returns the offsets of ring `idx`.
    pub fn ring(&self, idx: usize) -> &[Offset] {
        &self.offsets[idx]
    }
}
