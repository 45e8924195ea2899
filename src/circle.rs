//! Digitized circle geometry.
//!
//! Circles are rasterized with the midpoint algorithm over the first octant
//! (from angle 0 up to the diagonal) and unfolded into the remaining seven
//! octants in angular order. The resulting offsets walk the circle once with a
//! monotonically increasing angle `atan2(dy, dx)`, so a cyclic shift of the
//! sequence approximates a rotation about the center.
//!
//! Offsets shared by neighbouring octants (the axis points and the diagonal)
//! are emitted exactly once.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Integer pixel offset `(dx, dy)` relative to a ring center.
pub type Offset = (i32, i32);

/// Computes the ordered boundary offsets of a circle with the given radius.
///
/// Radius 0 yields the single center offset.
pub fn circle_offsets(radius: usize) -> Vec<Offset> {
    if radius == 0 {
        return vec![(0, 0)];
    }
    let octant = first_octant(radius as i32);

    let mut out = Vec::with_capacity(octant.len() * 8);
    let asc = octant.iter().copied();
    let desc = octant.iter().rev().copied();

    // Even octants run away from an axis, odd octants run back towards one.
    // Each skips the point it shares with the octant before it.
    out.extend(asc.clone());
    out.extend(desc.clone().filter(|&(a, b)| a != b).map(|(a, b)| (b, a)));
    out.extend(asc.clone().filter(|&(_, b)| b != 0).map(|(a, b)| (-b, a)));
    out.extend(desc.clone().filter(|&(a, b)| a != b).map(|(a, b)| (-a, b)));
    out.extend(asc.clone().filter(|&(_, b)| b != 0).map(|(a, b)| (-a, -b)));
    out.extend(desc.clone().filter(|&(a, b)| a != b).map(|(a, b)| (-b, -a)));
    out.extend(asc.filter(|&(_, b)| b != 0).map(|(a, b)| (b, -a)));
    out.extend(desc.filter(|&(a, b)| a != b && b != 0).map(|(a, b)| (a, -b)));
    out
}

/// Midpoint walk over the octant `0 <= b <= a`, ordered by increasing angle.
fn first_octant(radius: i32) -> Vec<Offset> {
    let mut points = Vec::new();
    let mut x = 0i32;
    let mut y = radius;
    let mut d = 3 - 2 * radius;
    while x <= y {
        points.push((y, x));
        if d <= 0 {
            d += 4 * x + 6;
        } else {
            d += 4 * (x - y) + 10;
            y -= 1;
        }
        x += 1;
    }
    points
}

/// Per-radius memo of rasterized circles.
///
/// The cache is append-only: each radius is rasterized once and shared through
/// an `Arc` afterwards, so concurrent readers only contend on first use.
#[derive(Debug, Default)]
pub struct CircleCache {
    rings: RwLock<HashMap<usize, Arc<[Offset]>>>,
}

impl CircleCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ordered offsets for `radius`, rasterizing it on first use.
    pub fn points_for(&self, radius: usize) -> Arc<[Offset]> {
        {
            let rings = self.rings.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(points) = rings.get(&radius) {
                return Arc::clone(points);
            }
        }
        let computed: Arc<[Offset]> = circle_offsets(radius).into();
        let mut rings = self.rings.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(rings.entry(radius).or_insert(computed))
    }

    /// Returns the number of boundary pixels for `radius`.
    pub fn point_count(&self, radius: usize) -> usize {
        self.points_for(radius).len()
    }

    /// Returns how many radii have been rasterized so far.
    pub fn len(&self) -> usize {
        self.rings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no radius has been rasterized yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
