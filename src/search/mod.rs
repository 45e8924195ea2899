//! Heat map computation over a whole image.
//!
//! `Matcher` owns a reference ring vector and scans every pixel whose rings
//! fit inside the image, one worker per row. Each worker keeps a private probe
//! vector that it re-samples per column and compares against the shared,
//! read-only reference. The resulting dissimilarity surface is optionally
//! smoothed and then rendered to an opaque grayscale RGBA image.

pub(crate) mod rows;

pub use rows::{ProgressFn, RowReport, ScanRegion};

use crate::circle::CircleCache;
use crate::diff::{ring_vector_diff, DiffParams, RingDiffCache};
use crate::image::{ImageView, OwnedImage, Rgba};
use crate::postprocess::{fix_circle_defects, render_heat_map, MIN_AVERAGE_BIAS};
use crate::trace::{trace_event, trace_span};
use crate::util::{RingMatchError, RingMatchResult};
use crate::vector::{RingLayout, RingVector};
use rows::scan_rows;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Matching and rendering parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Exponent applied to `1 - dissimilarity` when rendering.
    pub gamma: f32,
    /// Weight of the local ring average in the defect-fix pass, clamped to
    /// `[0, 1]`. Values below `MIN_AVERAGE_BIAS` skip the pass.
    pub average_bias: f32,
    /// Requested angular step in radians; raised to the finest step the
    /// reference rings can resolve.
    pub rotation_stride: f32,
    /// Step between compared sample indices (3 compares a single channel).
    pub matching_stride: usize,
    /// First compared sample index (0 = red, 1 = green, 2 = blue).
    pub matching_offset: usize,
    /// Rendered intensities below this value are drawn black.
    pub threshold: f32,
    /// Run row workers on the rayon pool when available.
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            average_bias: 0.0,
            rotation_stride: 0.001,
            matching_stride: 1,
            matching_offset: 0,
            threshold: 0.4,
            parallel: true,
        }
    }
}

impl MatchConfig {
    /// Rejects non-finite or non-positive rendering parameters.
    pub fn validate(&self) -> RingMatchResult<()> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(RingMatchError::InvalidConfig {
                reason: "gamma must be finite and > 0",
            });
        }
        if !self.average_bias.is_finite() {
            return Err(RingMatchError::InvalidConfig {
                reason: "average_bias must be finite",
            });
        }
        if !self.threshold.is_finite() {
            return Err(RingMatchError::InvalidConfig {
                reason: "threshold must be finite",
            });
        }
        Ok(())
    }

    /// Average bias clamped to `[0, 1]`.
    pub fn clamped_average_bias(&self) -> f32 {
        self.average_bias.clamp(0.0, 1.0)
    }
}

/// Shared flag that asks running workers to stop.
///
/// Workers poll it between pixels; a pixel already being computed finishes.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; later calls have no further effect.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once `cancel` has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Outcome of a heat map run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStatus {
    /// Every row of every pass was computed.
    Completed,
    /// The run stopped early; the output holds whatever was computed.
    Cancelled,
}

/// Rendered heat map plus the raw surface it came from.
#[derive(Clone, Debug)]
pub struct HeatMap {
    /// Opaque grayscale RGBA rendering, same size as the input.
    pub image: OwnedImage<Rgba>,
    /// Dissimilarity per pixel (after the defect-fix pass, if it ran).
    pub surface: OwnedImage<f32>,
    /// Whether the run completed or was cancelled.
    pub status: MatchStatus,
    /// Row accounting of the scan pass.
    pub report: RowReport,
}

/// Rotation-invariant heat map matcher for one reference vector.
pub struct Matcher {
    reference: RingVector,
    circles: Arc<CircleCache>,
    cfg: MatchConfig,
}

impl Matcher {
    /// Creates a matcher with a private circle cache and default config.
    pub fn new(reference: RingVector) -> Self {
        Self {
            reference,
            circles: Arc::new(CircleCache::new()),
            cfg: MatchConfig::default(),
        }
    }

    /// Replaces the matching configuration.
    pub fn with_config(mut self, cfg: MatchConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Shares an existing circle cache, e.g. the one the reference was built with.
    pub fn with_circles(mut self, circles: Arc<CircleCache>) -> Self {
        self.circles = circles;
        self
    }

    /// Returns the reference vector.
    pub fn reference(&self) -> &RingVector {
        &self.reference
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Computes the heat map without progress reporting or cancellation.
    pub fn run(&self, image: ImageView<'_, Rgba>) -> RingMatchResult<HeatMap> {
        self.run_with(image, None, &CancelToken::new())
    }

    /// Computes the heat map, reporting the completed row fraction to
    /// `progress` and stopping early once `cancel` fires.
    ///
    /// All validation happens before any worker starts; a cancelled run is
    /// not an error and returns `MatchStatus::Cancelled`.
    pub fn run_with(
        &self,
        image: ImageView<'_, Rgba>,
        progress: Option<ProgressFn<'_>>,
        cancel: &CancelToken,
    ) -> RingMatchResult<HeatMap> {
        let width = image.width();
        let height = image.height();
        let _span = trace_span!("heat_map", width = width, height = height).entered();

        self.cfg.validate()?;
        self.reference.validate(&self.circles)?;
        let params = DiffParams::resolve(
            self.cfg.rotation_stride,
            self.cfg.matching_stride,
            self.cfg.matching_offset,
            &self.reference,
        )?;
        let region = ScanRegion::with_margin(width, height, self.reference.max_radius())?;
        trace_event!(
            "scan_region",
            rows = region.rows(),
            cols = region.cols(),
            rotation_stride = params.rotation_stride()
        );

        let mut surface = OwnedImage::filled(width, height, 0.0f32)?;
        let layout = RingLayout::for_vector(&self.reference, &self.circles);
        let reference = &self.reference;
        let report = scan_rows(
            surface.data_mut(),
            width,
            region,
            self.cfg.parallel,
            progress,
            cancel,
            || {
                let mut probe = reference.empty_clone();
                let mut cache = RingDiffCache::new(reference.rings().len());
                let layout = &layout;
                move |x: usize, y: usize| {
                    probe.load(layout, &image, x, y);
                    ring_vector_diff(reference, &probe, &params, &mut cache)
                }
            },
        );
        trace_event!(
            "scan_done",
            completed = report.completed,
            cancelled = report.cancelled
        );

        let mut status = if report.is_complete() {
            MatchStatus::Completed
        } else {
            MatchStatus::Cancelled
        };

        let bias = self.cfg.clamped_average_bias();
        if status == MatchStatus::Completed && bias >= MIN_AVERAGE_BIAS {
            let (smoothed, fix_report) = fix_circle_defects(
                surface.view(),
                &self.reference,
                &self.circles,
                bias,
                self.cfg.parallel,
                cancel,
            )?;
            if !fix_report.is_complete() {
                status = MatchStatus::Cancelled;
            }
            surface = smoothed;
        }

        let image = render_heat_map(surface.view(), self.cfg.gamma, self.cfg.threshold)?;
        Ok(HeatMap {
            image,
            surface,
            status,
            report,
        })
    }
}
