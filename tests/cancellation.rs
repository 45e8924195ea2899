use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringmatch::lowlevel::ScanRegion;
use ringmatch::{
    CancelToken, CircleCache, ImageView, MatchConfig, MatchStatus, Matcher, RingVector, Rgba,
    VectorParams,
};
use std::sync::atomic::{AtomicUsize, Ordering};

fn make_tall_image(width: usize, height: usize) -> Vec<Rgba> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..width * height)
        .map(|_| [rng.random(), rng.random(), rng.random(), 255])
        .collect()
}

fn cancel_after_first_row(parallel: bool) {
    let (width, height) = (60, 400);
    let data = make_tall_image(width, height);
    let image = ImageView::from_slice(&data, width, height).unwrap();
    let circles = CircleCache::new();
    let params = VectorParams {
        radius: 4,
        count: 3,
        radius_inc: 3,
    };
    let reference = RingVector::from_image(&params, &circles, &image, 30, 30).unwrap();
    let margin = reference.max_radius();
    let matcher = Matcher::new(reference).with_config(MatchConfig {
        parallel,
        average_bias: 0.5,
        ..MatchConfig::default()
    });

    let cancel = CancelToken::new();
    let calls = AtomicUsize::new(0);
    let progress = |_fraction: f32| {
        calls.fetch_add(1, Ordering::Relaxed);
        cancel.cancel();
    };
    let heat = matcher.run_with(image, Some(&progress), &cancel).unwrap();

    assert_eq!(heat.status, MatchStatus::Cancelled);
    let report = heat.report;
    let region = ScanRegion::with_margin(width, height, margin).unwrap();
    assert_eq!(report.dispatched, region.rows());
    assert_eq!(report.completed + report.cancelled, report.dispatched);
    assert!(report.completed >= 1);
    assert!(report.cancelled >= 1);
    // Progress is only reported for completed rows.
    assert_eq!(calls.load(Ordering::Relaxed), report.completed);

    // Some row never reached its last column.
    let surface = heat.surface.data();
    let unfinished = (region.y0..region.y1)
        .filter(|&y| surface[y * width + region.x1 - 1] == 0.0)
        .count();
    assert!(unfinished >= 1);

    // The output is still a full-size, opaque rendering.
    assert_eq!(heat.image.width(), width);
    assert_eq!(heat.image.height(), height);
    assert!(heat.image.data().iter().all(|px| px[3] == 255));
}

#[test]
fn cancelling_a_sequential_run_stops_early() {
    cancel_after_first_row(false);
}

#[test]
fn cancelling_a_parallel_run_stops_early() {
    cancel_after_first_row(true);
}

#[test]
fn cancelled_before_start_still_returns_a_heat_map() {
    let (width, height) = (40, 40);
    let data = make_tall_image(width, height);
    let image = ImageView::from_slice(&data, width, height).unwrap();
    let circles = CircleCache::new();
    let reference =
        RingVector::from_image(&VectorParams::default(), &circles, &image, 20, 20).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let heat = Matcher::new(reference)
        .run_with(image, None, &cancel)
        .unwrap();

    assert_eq!(heat.status, MatchStatus::Cancelled);
    assert_eq!(heat.report.completed, 0);
    assert_eq!(heat.report.cancelled, heat.report.dispatched);
    assert!(heat.surface.data().iter().all(|&v| v == 0.0));
}

#[test]
fn cancelling_after_the_scan_skips_the_defect_fix() {
    let (width, height) = (40, 36);
    let data = make_tall_image(width, height);
    let image = ImageView::from_slice(&data, width, height).unwrap();
    let circles = CircleCache::new();
    let params = VectorParams {
        radius: 2,
        count: 2,
        radius_inc: 2,
    };
    let reference = RingVector::from_image(&params, &circles, &image, 20, 18).unwrap();
    let cfg = MatchConfig {
        parallel: false,
        ..MatchConfig::default()
    };
    let raw = Matcher::new(reference.clone())
        .with_config(cfg.clone())
        .run(image)
        .unwrap();

    // Cancel from the last progress report, i.e. once every scan row is done.
    let cancel = CancelToken::new();
    let progress = |fraction: f32| {
        if fraction >= 1.0 {
            cancel.cancel();
        }
    };
    let heat = Matcher::new(reference)
        .with_config(MatchConfig {
            average_bias: 0.5,
            ..cfg
        })
        .run_with(image, Some(&progress), &cancel)
        .unwrap();

    assert_eq!(heat.status, MatchStatus::Cancelled);
    assert!(heat.report.is_complete());
    assert_eq!(heat.report.completed, heat.report.dispatched);
    assert_eq!(heat.report.cancelled, 0);
    // The smoothing pass wrote nothing, so the raw scan surface survives.
    assert_eq!(heat.surface, raw.surface);
    assert_eq!(heat.image, raw.image);
}
