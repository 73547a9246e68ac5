//! Synthetic Horizon Sweep
//!
//! Rasterizes horizon disks over a grid of roll angles and vertex depths,
//! runs every estimation method on each frame and reports the nadir error
//! against the closed-form attitude of the true circle.
//!
//! Usage:
//! ```bash
//! cargo run --example synthetic_sweep -- --radius 90 --steps 8
//! ```

use std::path::PathBuf;

use clap::Parser;
use horizon_attitude::geometry::rasterize_horizon;
use horizon_attitude::pipeline::{BatchItem, FitMethod, HorizonPipeline, PipelineConfig};
use horizon_attitude::{AttitudeSolver, CameraParams, CircleModel};
use log::info;
use nalgebra::{Point2, Vector2};

/// Compare all estimation methods on synthetic horizons
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Horizon radius in pixels
    #[arg(short = 'r', long, default_value = "90.0")]
    radius: f64,

    /// Number of roll angles in the sweep
    #[arg(short = 's', long, default_value = "8")]
    steps: usize,

    /// Vertex offsets to sweep, pixels; positive puts the image center on Earth
    #[arg(long, num_args = 1.., default_values_t = vec![-50.0, -20.0, 15.0])]
    depths: Vec<f64>,

    /// Seed of the randomized chord fit
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Directory for per-method CSV reports
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let params = CameraParams::default();
    let solver = AttitudeSolver::new(params.clone())?;
    let (width, height) = (
        params.resolution.width as usize,
        params.resolution.height as usize,
    );

    let mut items = Vec::new();
    for step in 0..cli.steps {
        let roll = -0.6 + 1.2 * step as f64 / cli.steps.max(2).saturating_sub(1) as f64;
        for &depth in &cli.depths {
            // Disk center sits below the vertex along the roll direction.
            let direction = Vector2::new(-roll.sin(), -roll.cos());
            let center = Point2::from(direction * (cli.radius - depth));
            let circle = CircleModel::new(center, cli.radius)?;
            let truth = solver.solve_circle(&circle)?;
            items.push(BatchItem {
                name: format!("roll{:+.2}_depth{:+.0}", roll, depth),
                frame: rasterize_horizon(width, height, &center, cli.radius, 200.0, 0.0),
                truth: Some(truth.nadir),
            });
        }
    }
    info!("Generated {} synthetic frames", items.len());

    println!("🌍 SYNTHETIC HORIZON SWEEP");
    println!("==========================");
    println!("Frames: {}, radius {} px\n", items.len(), cli.radius);
    println!(
        "{:<18} | {:>8} | {:>8} | {:>14} | {:>13}",
        "Method", "Success", "Failed", "Mean err (°)", "Max err (°)"
    );
    println!("{:-<18}-+-{:-<8}-+-{:-<8}-+-{:-<14}-+-{:-<13}", "", "", "", "", "");

    for method in FitMethod::ALL {
        let config = PipelineConfig {
            seed: cli.seed,
            ..PipelineConfig::with_method(method)
        };
        let pipeline = HorizonPipeline::new(params.clone(), config)?;
        let report = pipeline.run_batch(&items);
        let summary = report.summary();
        let fmt = |v: Option<f64>| v.map_or("-".to_string(), |e| format!("{:.4}", e.to_degrees()));
        println!(
            "{:<18} | {:>8} | {:>8} | {:>14} | {:>13}",
            method.name(),
            summary.successes,
            summary.failures,
            fmt(summary.mean_angular_error),
            fmt(summary.max_angular_error)
        );

        if let Some(dir) = &cli.output {
            std::fs::create_dir_all(dir)?;
            report.write_csv(dir.join(format!("sweep_{}.csv", method.name())))?;
        }
    }
    Ok(())
}
