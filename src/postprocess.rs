//! Smoothing and rendering of dissimilarity surfaces.
//!
//! Circular sampling leaves ring-shaped artifacts around strong features. The
//! defect-fix pass blends every scanned value with the mean of a same-shaped
//! ring vector sampled from the raw surface itself. Rendering then maps
//! dissimilarity `y` to brightness `(1 - y)^gamma` and blacks out anything
//! under the threshold.

use crate::circle::CircleCache;
use crate::image::{ImageView, OwnedImage, Rgba};
use crate::search::rows::scan_rows;
use crate::search::{CancelToken, RowReport, ScanRegion};
use crate::trace::{trace_event, trace_span};
use crate::util::RingMatchResult;
use crate::vector::{RingLayout, RingVector};

/// Average bias below which the defect-fix pass is skipped.
pub const MIN_AVERAGE_BIAS: f32 = 0.001;

/// Blends each scan-region value of `raw` with the mean of `shape`'s rings
/// sampled around it: `bias * mean + (1 - bias) * raw`.
///
/// Values outside the scan region are copied unchanged. `shape` only
/// provides ring geometry; its samples are not read.
pub fn fix_circle_defects(
    raw: ImageView<'_, f32>,
    shape: &RingVector,
    circles: &CircleCache,
    average_bias: f32,
    parallel: bool,
    cancel: &CancelToken,
) -> RingMatchResult<(OwnedImage<f32>, RowReport)> {
    let _span = trace_span!("fix_circle_defects", bias = average_bias).entered();
    let bias = average_bias.clamp(0.0, 1.0);
    let width = raw.width();
    let region = ScanRegion::with_margin(width, raw.height(), shape.max_radius())?;
    let layout = RingLayout::for_vector(shape, circles);

    let mut out = OwnedImage::from_view(raw)?;
    let report = scan_rows(out.data_mut(), width, region, parallel, None, cancel, || {
        let mut probe = shape.empty_clone();
        let layout = &layout;
        move |x: usize, y: usize| {
            probe.load(layout, &raw, x, y);
            bias * probe.average() + (1.0 - bias) * *raw.at(x, y)
        }
    });
    trace_event!("defects_fixed", completed = report.completed);
    Ok((out, report))
}

/// Renders a dissimilarity surface as an opaque grayscale RGBA image.
pub fn render_heat_map(
    surface: ImageView<'_, f32>,
    gamma: f32,
    threshold: f32,
) -> RingMatchResult<OwnedImage<Rgba>> {
    let threshold = threshold.max(0.0);
    let mut data = Vec::with_capacity(surface.width() * surface.height());
    for y in 0..surface.height() {
        for &value in surface.row(y).into_iter().flatten() {
            let level = heat_level(value, gamma, threshold);
            data.push([level, level, level, 255]);
        }
    }
    OwnedImage::new(data, surface.width(), surface.height())
}

#[inline]
fn heat_level(value: f32, gamma: f32, threshold: f32) -> u8 {
    let v = (1.0 - value).clamp(0.0, 1.0).powf(gamma).clamp(0.0, 1.0);
    if v < threshold {
        return 0;
    }
    (v * 255.0) as u8
}
