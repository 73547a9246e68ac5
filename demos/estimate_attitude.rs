//! Horizon Attitude Estimator
//!
//! Runs one or more horizon images through the attitude pipeline with a chosen
//! method and prints pitch, roll and the nadir vector for each frame. When a
//! 44-byte metadata record is given per image, camera parameters are taken from
//! it and the angular error against its nadir vector is reported.
//!
//! Supported methods: chord, algebraic, conic, ray_search
//!
//! Usage:
//! ```bash
//! cargo run --example estimate_attitude -- \
//!   --method algebraic \
//!   --image samples/frame_000.png --metadata samples/frame_000.hrz \
//!   --csv output/attitude.csv
//! ```

use std::path::PathBuf;

use clap::Parser;
use horizon_attitude::camera::{CameraParams, FrameMetadata, EARTH_RADIUS_KM};
use horizon_attitude::edge::{EdgeDetectorConfig, GradientKernel};
use horizon_attitude::pipeline::{BatchItem, FitMethod, HorizonPipeline, PipelineConfig};
use horizon_attitude::{BarrelDistortion, Frame};
use log::info;

/// Horizon-based attitude estimation tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Horizon images (any format the image crate reads)
    #[arg(short = 'i', long, required = true, num_args = 1..)]
    image: Vec<PathBuf>,

    /// Metadata records, one per image, in the same order
    #[arg(short = 'm', long, num_args = 1..)]
    metadata: Vec<PathBuf>,

    /// Camera parameters YAML, used when no metadata is given
    #[arg(short = 'c', long)]
    camera: Option<String>,

    /// Estimation method (chord, algebraic, conic, ray_search)
    #[arg(long, default_value = "algebraic")]
    method: String,

    /// Use Prewitt instead of Sobel gradients
    #[arg(long)]
    prewitt: bool,

    /// First-order barrel distortion percentage to remove from edge points
    #[arg(long)]
    distortion: Option<f64>,

    /// Seed of the randomized chord fit
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Write per-frame results to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write per-frame results and a summary to this JSON file
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.metadata.is_empty() && cli.metadata.len() != cli.image.len() {
        return Err(format!(
            "got {} images but {} metadata records",
            cli.image.len(),
            cli.metadata.len()
        )
        .into());
    }

    let method: FitMethod = cli.method.parse()?;
    let config = PipelineConfig {
        method,
        edge: EdgeDetectorConfig {
            kernel: if cli.prewitt {
                GradientKernel::Prewitt
            } else {
                GradientKernel::Sobel
            },
            ..Default::default()
        },
        distortion: cli
            .distortion
            .map(|percentage| BarrelDistortion::FirstOrder { percentage }),
        seed: cli.seed,
        ..Default::default()
    };

    let records = cli
        .metadata
        .iter()
        .map(FrameMetadata::load)
        .collect::<Result<Vec<_>, _>>()?;
    let params = match (records.first(), &cli.camera) {
        (Some(record), _) => CameraParams::from_metadata(record, EARTH_RADIUS_KM)?,
        (None, Some(path)) => CameraParams::load_from_yaml(path)?,
        (None, None) => CameraParams::default(),
    };
    info!("Camera parameters: {:?}", params);

    let items = cli
        .image
        .iter()
        .enumerate()
        .map(|(i, path)| {
            Ok(BatchItem {
                name: path.display().to_string(),
                frame: Frame::load(path)?,
                truth: records.get(i).map(|r| r.nadir_vector()),
            })
        })
        .collect::<Result<Vec<_>, horizon_attitude::HorizonError>>()?;

    println!("🛰️  HORIZON ATTITUDE ESTIMATION");
    println!("==============================");
    println!("Method: {}", method);
    println!("Frames: {}\n", items.len());

    let pipeline = HorizonPipeline::new(params, config)?;
    let report = pipeline.run_batch(&items);

    println!(
        "{:<32} | {:>10} | {:>10} | {:>28} | {:>10}",
        "Frame", "Pitch (°)", "Roll (°)", "Nadir", "Error (°)"
    );
    println!("{:-<32}-+-{:-<10}-+-{:-<10}-+-{:-<28}-+-{:-<10}", "", "", "", "", "");
    for entry in &report.entries {
        match (&entry.error, entry.pitch, entry.roll) {
            (None, Some(pitch), Some(roll)) => println!(
                "{:<32} | {:>10.3} | {:>10.3} | ({:>7.4}, {:>7.4}, {:>7.4}) | {:>10}",
                entry.name,
                pitch.to_degrees(),
                roll.to_degrees(),
                entry.nadir_x.unwrap_or(f64::NAN),
                entry.nadir_y.unwrap_or(f64::NAN),
                entry.nadir_z.unwrap_or(f64::NAN),
                entry
                    .angular_error
                    .map_or("-".to_string(), |e| format!("{:.3}", e.to_degrees())),
            ),
            (error, _, _) => println!(
                "{:<32} | ❌ {}",
                entry.name,
                error.as_deref().unwrap_or("unknown failure")
            ),
        }
    }

    let summary = report.summary();
    println!(
        "\n✅ {} succeeded, ❌ {} failed",
        summary.successes, summary.failures
    );
    if let (Some(mean), Some(max)) = (summary.mean_angular_error, summary.max_angular_error) {
        println!(
            "Nadir error: mean {:.3}°, max {:.3}°",
            mean.to_degrees(),
            max.to_degrees()
        );
    }

    if let Some(path) = &cli.csv {
        report.write_csv(path)?;
        println!("📄 CSV written to {:?}", path);
    }
    if let Some(path) = &cli.json {
        report.write_json(path)?;
        println!("📄 JSON written to {:?}", path);
    }
    Ok(())
}
