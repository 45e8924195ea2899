use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringmatch::lowlevel::ScanRegion;
use ringmatch::{
    CircleCache, ImageView, MatchConfig, MatchStatus, Matcher, RingMatchError, RingVector, Rgba,
    VectorParams,
};
use std::sync::Arc;

fn make_textured(width: usize, height: usize, seed: u64) -> Vec<Rgba> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height)
        .map(|_| {
            let v: u8 = rng.random();
            [v, v / 2, 255 - v, 255]
        })
        .collect()
}

#[test]
fn flat_image_matches_everywhere() {
    let (width, height) = (50, 50);
    let data = vec![[90u8, 140, 200, 255]; width * height];
    let image = ImageView::from_slice(&data, width, height).unwrap();
    let circles = Arc::new(CircleCache::new());
    let params = VectorParams {
        radius: 4,
        count: 1,
        radius_inc: 2,
    };
    let reference = RingVector::from_image(&params, &circles, &image, 25, 25).unwrap();

    let matcher = Matcher::new(reference)
        .with_circles(Arc::clone(&circles))
        .with_config(MatchConfig {
            gamma: 1.0,
            threshold: 0.4,
            ..MatchConfig::default()
        });
    let heat = matcher.run(image).unwrap();

    assert_eq!(heat.status, MatchStatus::Completed);
    assert_eq!(heat.report.dispatched, 42);
    assert!(heat.surface.data().iter().all(|&v| v == 0.0));
    assert!(heat
        .image
        .data()
        .iter()
        .all(|&px| px == [255u8, 255, 255, 255]));
}

#[test]
fn reference_location_is_the_best_match() {
    let (width, height) = (64, 56);
    let data = make_textured(width, height, 3);
    let image = ImageView::from_slice(&data, width, height).unwrap();
    let circles = CircleCache::new();
    let params = VectorParams {
        radius: 2,
        count: 3,
        radius_inc: 2,
    };
    let (rx, ry) = (31, 27);
    let reference = RingVector::from_image(&params, &circles, &image, rx, ry).unwrap();
    let max_radius = reference.max_radius();

    let heat = Matcher::new(reference).run(image).unwrap();
    let surface = heat.surface.data();
    let region = ScanRegion::with_margin(width, height, max_radius).unwrap();

    let best = surface[ry * width + rx];
    assert!(best < 0.01);
    for y in region.y0..region.y1 {
        for x in region.x0..region.x1 {
            if (x, y) != (rx, ry) {
                assert!(surface[y * width + x] > best, "({x}, {y}) beat the reference");
            }
        }
    }
    assert_eq!(heat.image.data()[ry * width + rx][0], 255);
}

#[test]
fn margins_are_never_scanned() {
    let circles = CircleCache::new();
    let params = VectorParams {
        radius: 3,
        count: 2,
        radius_inc: 2,
    };
    // The smallest legal image has exactly one scan position.
    let side = 2 * params.max_radius() + 1;
    let data = make_textured(side, side, 9);
    let image = ImageView::from_slice(&data, side, side).unwrap();
    let c = params.max_radius();
    let reference = RingVector::from_image(&params, &circles, &image, c, c).unwrap();

    let heat = Matcher::new(reference.clone()).run(image).unwrap();
    assert_eq!(heat.report.dispatched, 1);
    assert_eq!(heat.report.completed, 1);

    let too_small = make_textured(side - 1, side + 4, 9);
    let small_view = ImageView::from_slice(&too_small, side - 1, side + 4).unwrap();
    let err = Matcher::new(reference).run(small_view).err().unwrap();
    assert!(matches!(err, RingMatchError::RingOutOfBounds { .. }));
}

#[test]
fn invalid_config_fails_before_scanning() {
    let (width, height) = (30, 30);
    let data = make_textured(width, height, 1);
    let image = ImageView::from_slice(&data, width, height).unwrap();
    let circles = CircleCache::new();
    let reference =
        RingVector::from_image(&VectorParams::default(), &circles, &image, 15, 15).unwrap();

    for cfg in [
        MatchConfig {
            matching_stride: 0,
            ..MatchConfig::default()
        },
        MatchConfig {
            gamma: 0.0,
            ..MatchConfig::default()
        },
        MatchConfig {
            threshold: f32::NAN,
            ..MatchConfig::default()
        },
        MatchConfig {
            matching_offset: 10_000,
            ..MatchConfig::default()
        },
    ] {
        let err = Matcher::new(reference.clone())
            .with_config(cfg)
            .run(image)
            .err()
            .unwrap();
        assert!(matches!(err, RingMatchError::InvalidConfig { .. }));
    }
}

#[test]
fn average_bias_smooths_the_surface() {
    let (width, height) = (48, 48);
    let data = make_textured(width, height, 17);
    let image = ImageView::from_slice(&data, width, height).unwrap();
    let circles = CircleCache::new();
    let params = VectorParams {
        radius: 2,
        count: 2,
        radius_inc: 2,
    };
    let reference = RingVector::from_image(&params, &circles, &image, 24, 24).unwrap();

    let raw = Matcher::new(reference.clone()).run(image).unwrap();
    let smoothed = Matcher::new(reference)
        .with_config(MatchConfig {
            average_bias: 1.5,
            ..MatchConfig::default()
        })
        .run(image)
        .unwrap();
    assert_eq!(smoothed.status, MatchStatus::Completed);

    // Bias is clamped to 1, so the reference pixel takes its ring mean and
    // loses its perfect score.
    let idx = 24 * width + 24;
    assert!(raw.surface.data()[idx] < 0.01);
    assert!(smoothed.surface.data()[idx] > raw.surface.data()[idx]);

    let variance = |values: &[f32]| {
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32
    };
    let region = ScanRegion::with_margin(width, height, 2 * 4).unwrap();
    let inner = |surface: &[f32]| -> Vec<f32> {
        (region.y0..region.y1)
            .flat_map(|y| (region.x0..region.x1).map(move |x| (x, y)))
            .map(|(x, y)| surface[y * width + x])
            .collect()
    };
    assert!(variance(&inner(smoothed.surface.data())) < variance(&inner(raw.surface.data())));
}

#[test]
fn progress_reaches_one_and_never_decreases() {
    let (width, height) = (30, 40);
    let data = make_textured(width, height, 2);
    let image = ImageView::from_slice(&data, width, height).unwrap();
    let circles = CircleCache::new();
    let reference =
        RingVector::from_image(&VectorParams::default(), &circles, &image, 15, 20).unwrap();

    let seen = std::sync::Mutex::new(Vec::new());
    let progress = |fraction: f32| seen.lock().unwrap().push(fraction);
    let heat = Matcher::new(reference)
        .run_with(image, Some(&progress), &ringmatch::CancelToken::new())
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.len(), heat.report.dispatched);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert!(seen.iter().all(|&f| (0.0..=1.0).contains(&f)));
    assert_eq!(seen.last().copied(), Some(1.0));
}
