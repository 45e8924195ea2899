//! Ringmatch is a rotation-invariant, multi-ring template matcher.
//!
//! A reference "ring vector" samples concentric digitized circles around a
//! chosen image point. The matcher re-samples the same rings around every
//! other pixel, compares them against the reference over all rotations, and
//! renders the best-rotation dissimilarity as a grayscale heat map. Rows are
//! scanned in parallel via the `rayon` feature and runs can be cancelled
//! cooperatively.
//!
//! ```no_run
//! use ringmatch::{CircleCache, ImageView, Matcher, RingVector, VectorParams};
//!
//! # fn main() -> ringmatch::RingMatchResult<()> {
//! let pixels = vec![[128u8, 64, 32, 255]; 64 * 64];
//! let image = ImageView::from_slice(&pixels, 64, 64)?;
//! let circles = CircleCache::new();
//! let reference = RingVector::from_image(&VectorParams::default(), &circles, &image, 32, 32)?;
//! let heat = Matcher::new(reference).run(image)?;
//! assert_eq!(heat.image.width(), 64);
//! # Ok(())
//! # }
//! ```

pub mod circle;
pub mod diff;
pub mod image;
pub mod lowlevel;
pub mod postprocess;
pub mod search;
mod trace;
pub mod util;
pub mod vector;

#[cfg(feature = "image-io")]
pub use image::io;

pub use circle::CircleCache;
pub use image::{ImageView, OwnedImage, Rgba};
pub use search::{CancelToken, HeatMap, MatchConfig, MatchStatus, Matcher, RowReport};
pub use util::{RingMatchError, RingMatchResult};
pub use vector::{Ring, RingVector, VectorParams};
