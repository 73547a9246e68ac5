//! End-to-end attitude estimation over frames.
//!
//! A [`HorizonPipeline`] owns validated camera parameters and a
//! [`PipelineConfig`]. Circle and conic methods run edge extraction, optional
//! distortion removal, a [`HorizonFit`] estimator and the [`AttitudeSolver`];
//! the ray-search method runs directly on an Earth/space threshold of the frame.
//!
//! Frames are independent: [`HorizonPipeline::process_batch`] reports one
//! `Result` per frame and runs on the `rayon` pool when the `parallel` feature
//! is enabled.

use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub mod report;

pub use report::{BatchEntry, BatchReport, BatchSummary};

use crate::attitude::{angular_error, Attitude, AttitudeSolver};
use crate::camera::{CameraParams, HorizonError};
use crate::distortion::BarrelDistortion;
use crate::edge::{EdgeDetector, EdgeDetectorConfig, ThresholdClassifier};
use crate::fit::{
    AlgebraicCircleFit, ConicFit, FitQuality, HorizonFit, HorizonModel, RandomizedChordFit,
};
use crate::frame::Frame;
use crate::ray_search::{RaySearchConfig, RaySearchLocator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    RandomizedChord,
    #[default]
    Algebraic,
    Conic,
    RaySearch,
}

impl FitMethod {
    pub const ALL: [FitMethod; 4] = [
        FitMethod::RandomizedChord,
        FitMethod::Algebraic,
        FitMethod::Conic,
        FitMethod::RaySearch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FitMethod::RandomizedChord => "randomized_chord",
            FitMethod::Algebraic => "algebraic",
            FitMethod::Conic => "conic",
            FitMethod::RaySearch => "ray_search",
        }
    }
}

impl fmt::Display for FitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FitMethod {
    type Err = HorizonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chord" | "randomized_chord" => Ok(FitMethod::RandomizedChord),
            "ls" | "algebraic" => Ok(FitMethod::Algebraic),
            "conic" | "hyperbola" => Ok(FitMethod::Conic),
            "ray" | "ray_search" | "vsearch" => Ok(FitMethod::RaySearch),
            _ => Err(HorizonError::InvalidParameters(format!(
                "unsupported fit method: {s}. Supported methods: chord, algebraic, conic, ray_search"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub method: FitMethod,
    pub edge: EdgeDetectorConfig,
    pub ray_search: RaySearchConfig,
    /// Applied to edge points before fitting; unused by the ray search.
    pub distortion: Option<BarrelDistortion>,
    /// Seed of the randomized chord fit.
    pub seed: u64,
    /// Pixels brighter than this are Earth for the ray search.
    pub earth_level: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            method: FitMethod::default(),
            edge: EdgeDetectorConfig::default(),
            ray_search: RaySearchConfig::default(),
            distortion: None,
            seed: 0,
            earth_level: 0.0,
        }
    }
}

impl PipelineConfig {
    pub fn with_method(method: FitMethod) -> Self {
        PipelineConfig {
            method,
            ..Default::default()
        }
    }

    pub fn validate_params(&self) -> Result<(), HorizonError> {
        self.edge.validate_params()?;
        self.ray_search.validate_params()?;
        if let Some(distortion) = &self.distortion {
            distortion.validate_params()?;
        }
        if !self.earth_level.is_finite() {
            return Err(HorizonError::InvalidParameters(format!(
                "earth_level must be finite, got {}",
                self.earth_level
            )));
        }
        Ok(())
    }
}

/// Attitude of one frame together with the intermediate results that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttitudeEstimate {
    pub method: FitMethod,
    pub attitude: Attitude,
    /// Fitted horizon; `None` for the ray search.
    pub model: Option<HorizonModel>,
    /// Residual statistics of circle fits.
    pub quality: Option<FitQuality>,
    pub edge_points: usize,
    /// Rays cast by the ray search.
    pub rays_cast: Option<usize>,
}

/// An estimate compared against a ground-truth nadir vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedEstimate {
    pub estimate: AttitudeEstimate,
    pub truth: Vector3<f64>,
    /// `acos(dot(predicted, truth))`, radians.
    pub angular_error: f64,
}

/// Attaches the angular error between the estimated and true nadir vectors.
pub fn validate(estimate: AttitudeEstimate, truth: &Vector3<f64>) -> ValidatedEstimate {
    let error = angular_error(&estimate.attitude.nadir, truth);
    ValidatedEstimate {
        estimate,
        truth: *truth,
        angular_error: error,
    }
}

/// One frame of a batch, with an optional ground-truth nadir vector.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub name: String,
    pub frame: Frame,
    pub truth: Option<Vector3<f64>>,
}

#[derive(Debug, Clone)]
pub struct HorizonPipeline {
    params: CameraParams,
    config: PipelineConfig,
    detector: EdgeDetector,
    solver: AttitudeSolver,
    locator: RaySearchLocator,
}

impl HorizonPipeline {
    /// # Errors
    ///
    /// [`HorizonError::InvalidParameters`] when the camera parameters or the
    /// configuration fail validation.
    pub fn new(params: CameraParams, config: PipelineConfig) -> Result<Self, HorizonError> {
        config.validate_params()?;
        let detector = EdgeDetector::new(config.edge.clone())?;
        let solver = AttitudeSolver::new(params.clone())?;
        let locator = RaySearchLocator::new(config.ray_search.clone())?;
        Ok(HorizonPipeline {
            params,
            config,
            detector,
            solver,
            locator,
        })
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The estimator behind a curve-fitting method, `None` for the ray search.
    pub fn estimator(&self) -> Option<Box<dyn HorizonFit + Send + Sync>> {
        match self.config.method {
            FitMethod::RandomizedChord => {
                Some(Box::new(RandomizedChordFit::with_seed(self.config.seed)))
            }
            FitMethod::Algebraic => Some(Box::new(AlgebraicCircleFit)),
            FitMethod::Conic => Some(Box::new(ConicFit)),
            FitMethod::RaySearch => None,
        }
    }

    /// Estimates the attitude of a single frame.
    ///
    /// # Errors
    ///
    /// * [`HorizonError::InvalidParameters`] if the frame size differs from the
    ///   camera resolution.
    /// * [`HorizonError::NoEdgeFound`], [`HorizonError::DegenerateGeometry`] or
    ///   [`HorizonError::NonConvergence`] from the selected method.
    pub fn estimate(&self, frame: &Frame) -> Result<AttitudeEstimate, HorizonError> {
        let resolution = self.params.resolution;
        if frame.width() != resolution.width as usize || frame.height() != resolution.height as usize
        {
            return Err(HorizonError::InvalidParameters(format!(
                "frame is {}x{} but the camera resolution is {}x{}",
                frame.width(),
                frame.height(),
                resolution.width,
                resolution.height
            )));
        }

        let Some(estimator) = self.estimator() else {
            let classifier = ThresholdClassifier::new(frame, self.config.earth_level);
            let (attitude, search) = self.locator.estimate(&classifier, &self.params)?;
            return Ok(AttitudeEstimate {
                method: self.config.method,
                attitude,
                model: None,
                quality: None,
                edge_points: 0,
                rays_cast: Some(search.rays_cast),
            });
        };

        let mut points = self.detector.extract_points(frame)?;
        if let Some(distortion) = &self.config.distortion {
            points = distortion.correct_points(&points, &resolution);
        }
        let model = estimator.fit(&points)?;
        let attitude = self.solver.solve(&model)?;
        let quality = model
            .as_circle()
            .map(|circle| FitQuality::evaluate(&points, circle))
            .transpose()?;
        debug!(
            "{} fit on {} edge points: pitch {:.4}, roll {:.4}",
            estimator.name(),
            points.len(),
            attitude.pitch,
            attitude.roll
        );

        Ok(AttitudeEstimate {
            method: self.config.method,
            attitude,
            model: Some(model),
            quality,
            edge_points: points.len(),
            rays_cast: None,
        })
    }

    /// Estimates a frame and compares it to its ground-truth nadir vector.
    pub fn estimate_validated(
        &self,
        frame: &Frame,
        truth: &Vector3<f64>,
    ) -> Result<ValidatedEstimate, HorizonError> {
        self.estimate(frame).map(|estimate| validate(estimate, truth))
    }

    /// Estimates every frame independently; one failure never stops the others.
    pub fn process_batch(&self, frames: &[Frame]) -> Vec<Result<AttitudeEstimate, HorizonError>> {
        map_items(frames, |frame| self.estimate(frame))
    }

    /// Runs a named batch and collects a [`BatchReport`], logging each failure.
    pub fn run_batch(&self, items: &[BatchItem]) -> BatchReport {
        let entries = map_items(items, |item| match self.estimate(&item.frame) {
            Ok(estimate) => {
                let error = item
                    .truth
                    .map(|truth| angular_error(&estimate.attitude.nadir, &truth));
                BatchEntry::success(&item.name, &estimate, error)
            }
            Err(err) => {
                warn!("{}: {}", item.name, err);
                BatchEntry::failure(&item.name, self.config.method, &err)
            }
        });

        let report = BatchReport::new(entries);
        let summary = report.summary();
        info!(
            "Batch of {} frames with {}: {} succeeded, {} failed",
            items.len(),
            self.config.method,
            summary.successes,
            summary.failures
        );
        report
    }
}

fn map_items<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        items.par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        items.iter().map(f).collect()
    }
}
