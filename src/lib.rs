//! Horizon Attitude Library
//!
//! Estimates the attitude of an Earth-observing camera (pitch, roll and the
//! nadir vector in the camera frame) from a single image of the Earth's horizon.
//! The library provides:
//! - Canny-style horizon edge extraction with Sobel or Prewitt gradients
//! - Randomized chord, algebraic least-squares and orthogonal conic horizon fits
//! - Closed-form attitude from the fitted horizon vertex
//! - A fitting-free ray-search locator that bisects directly on the image
//! - Fit quality statistics, barrel distortion removal and batch reporting
//!
//! All image geometry downstream of [`frame`] uses centered, y-up coordinates.

pub mod attitude;
pub mod camera;
pub mod distortion;
pub mod edge;
pub mod fit;
pub mod frame;
pub mod geometry;
pub mod pipeline;
pub mod ray_search;

// Re-export commonly used types
pub use attitude::{angular_error, Attitude, AttitudeSolver};
pub use camera::{CameraParams, FrameMetadata, HorizonError, Resolution};
pub use distortion::BarrelDistortion;
pub use edge::{
    EdgeDetector, EdgeDetectorConfig, EdgeMap, GradientKernel, PixelClassifier,
    ThresholdClassifier,
};
pub use fit::{
    AlgebraicCircleFit, CircleModel, ConicFit, ConicModel, FitQuality, HorizonFit, HorizonModel,
    RandomizedChordFit,
};
pub use frame::Frame;
pub use pipeline::{
    AttitudeEstimate, BatchItem, BatchReport, FitMethod, HorizonPipeline, PipelineConfig,
};
pub use ray_search::{RaySearchConfig, RaySearchLocator, VertexSearch};
