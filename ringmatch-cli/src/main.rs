use clap::Parser;
use ringmatch::io::{load_rgba_image, save_rgba_image};
use ringmatch::lowlevel::ScanRegion;
use ringmatch::{
    CancelToken, CircleCache, HeatMap, MatchConfig, MatchStatus, Matcher, RingVector,
    VectorParams,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Ringmatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output, including scan progress.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct VectorConfigJson {
    /// Reference center in the input image.
    x: usize,
    y: usize,
    radius: usize,
    count: usize,
    radius_inc: usize,
    /// Load a previously saved vector instead of sampling one.
    load_path: Option<String>,
    /// Save the reference vector after building or loading it.
    save_path: Option<String>,
}

impl Default for VectorConfigJson {
    fn default() -> Self {
        let params = VectorParams::default();
        Self {
            x: 0,
            y: 0,
            radius: params.radius,
            count: params.count,
            radius_inc: params.radius_inc,
            load_path: None,
            save_path: None,
        }
    }
}

impl VectorConfigJson {
    fn params(&self) -> VectorParams {
        VectorParams {
            radius: self.radius,
            count: self.count,
            radius_inc: self.radius_inc,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    image_path: String,
    output_path: Option<String>,
    summary_path: Option<String>,
    vector: VectorConfigJson,
    #[serde(rename = "match")]
    match_cfg: MatchConfig,
}

#[derive(Debug, Serialize)]
struct BestRecord {
    x: usize,
    y: usize,
    score: f32,
}

#[derive(Debug, Serialize)]
struct Output {
    completed: bool,
    rows_dispatched: usize,
    rows_completed: usize,
    rows_cancelled: usize,
    best: Option<BestRecord>,
}

/// Output path for the heat map; defaults to `<image_path>.heat.png`.
fn heat_map_path(image_path: &str, output_path: Option<&str>) -> String {
    match output_path {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => format!("{image_path}.heat.png"),
    }
}

/// Lowest dissimilarity inside the scan region, ignoring the reference center.
fn best_match(heat: &HeatMap, margin: usize, skip: (usize, usize)) -> Option<BestRecord> {
    let width = heat.surface.width();
    let region = ScanRegion::with_margin(width, heat.surface.height(), margin).ok()?;
    let surface = heat.surface.data();
    let mut best: Option<BestRecord> = None;
    for y in region.y0..region.y1 {
        for x in region.x0..region.x1 {
            if (x, y) == skip {
                continue;
            }
            let score = surface[y * width + x];
            if best.as_ref().map_or(true, |b| score < b.score) {
                best = Some(BestRecord { x, y, score });
            }
        }
    }
    best
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("ringmatch=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_path.is_empty() {
        return Err("image_path must be set in the config".into());
    }
    let output_path = heat_map_path(&config.image_path, config.output_path.as_deref());
    if config.output_path.is_none() {
        tracing::info!(path = %output_path, "no output_path set, using default");
    }

    let image = load_rgba_image(&config.image_path)?;
    let circles = Arc::new(CircleCache::new());
    let reference = match &config.vector.load_path {
        Some(path) => {
            let vector: RingVector = serde_json::from_str(&fs::read_to_string(path)?)?;
            vector.validate(&circles)?;
            vector
        }
        None => RingVector::from_image(
            &config.vector.params(),
            &circles,
            &image.view(),
            config.vector.x,
            config.vector.y,
        )?,
    };
    if let Some(path) = &config.vector.save_path {
        fs::write(path, serde_json::to_string_pretty(&reference)?)?;
    }

    let margin = reference.max_radius();
    let matcher = Matcher::new(reference)
        .with_circles(circles)
        .with_config(config.match_cfg);

    let last_decile = AtomicUsize::new(0);
    let progress = |fraction: f32| {
        let decile = (fraction * 10.0) as usize;
        if decile > last_decile.fetch_max(decile, Ordering::Relaxed) {
            tracing::info!(percent = decile * 10, "scan progress");
        }
    };
    let heat = matcher.run_with(image.view(), Some(&progress), &CancelToken::new())?;
    save_rgba_image(&output_path, &heat.image)?;

    let skip = match config.vector.load_path {
        Some(_) => (usize::MAX, usize::MAX),
        None => (config.vector.x, config.vector.y),
    };
    let output = Output {
        completed: heat.status == MatchStatus::Completed,
        rows_dispatched: heat.report.dispatched,
        rows_completed: heat.report.completed,
        rows_cancelled: heat.report.cancelled,
        best: best_match(&heat, margin, skip),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.summary_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
