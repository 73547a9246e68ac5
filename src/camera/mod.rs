//! Camera and orbit parameters shared by every stage of the horizon pipeline.
//!
//! This module provides [`CameraParams`] (field of view, orbital altitude,
//! Earth radius and sensor [`Resolution`]), the crate-wide [`HorizonError`]
//! taxonomy and YAML persistence of the parameters. The binary frame metadata
//! record lives in [`metadata`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use yaml_rust::{Yaml, YamlLoader};

pub mod metadata;

pub use metadata::FrameMetadata;

/// Horizontal field of view of the reference camera, in degrees.
pub const DEFAULT_FOV_DEG: f64 = 57.0;
/// Nominal orbital altitude in kilometres.
pub const DEFAULT_ALTITUDE_KM: f64 = 500.0;
/// Equatorial Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6378.136;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Resolution { width, height }
    }

    pub fn half_width(&self) -> f64 {
        0.5 * self.width as f64
    }

    pub fn half_height(&self) -> f64 {
        0.5 * self.height as f64
    }

    /// Squared distance from the image center to a corner, in pixels².
    pub fn corner_radius_sq(&self) -> f64 {
        self.half_width().powi(2) + self.half_height().powi(2)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution {
            width: 160,
            height: 120,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HorizonError {
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("No horizon edge found: {0}")]
    NoEdgeFound(String),
    #[error("{stage} did not converge after {iterations} iterations")]
    NonConvergence {
        stage: &'static str,
        iterations: usize,
    },
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Failed to load YAML: {0}")]
    YamlError(String),
    #[error("Invalid frame metadata: {0}")]
    MetadataError(String),
    #[error("Image error: {0}")]
    ImageError(String),
    #[error("IO Error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for HorizonError {
    fn from(err: std::io::Error) -> Self {
        HorizonError::IoError(err.to_string())
    }
}

impl From<yaml_rust::ScanError> for HorizonError {
    fn from(err: yaml_rust::ScanError) -> Self {
        HorizonError::YamlError(err.to_string())
    }
}

impl From<image::ImageError> for HorizonError {
    fn from(err: image::ImageError) -> Self {
        HorizonError::ImageError(err.to_string())
    }
}

impl From<serde_json::Error> for HorizonError {
    fn from(err: serde_json::Error) -> Self {
        HorizonError::IoError(err.to_string())
    }
}

impl From<csv::Error> for HorizonError {
    fn from(err: csv::Error) -> Self {
        HorizonError::IoError(err.to_string())
    }
}

/// Camera and orbit parameters needed to turn horizon geometry into attitude.
///
/// `fov` is the full horizontal field of view in radians, so the pixel-to-angle
/// mapping always scales by the half *width* of the sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    /// Full horizontal field of view, radians.
    pub fov: f64,
    /// Orbital altitude above the surface, km.
    pub altitude: f64,
    /// Earth radius, km.
    pub earth_radius: f64,
    pub resolution: Resolution,
}

impl Default for CameraParams {
    fn default() -> Self {
        CameraParams {
            fov: DEFAULT_FOV_DEG.to_radians(),
            altitude: DEFAULT_ALTITUDE_KM,
            earth_radius: EARTH_RADIUS_KM,
            resolution: Resolution::default(),
        }
    }
}

impl CameraParams {
    /// Creates validated parameters.
    ///
    /// # Errors
    ///
    /// [`HorizonError::InvalidParameters`] if any scalar is non-positive or
    /// non-finite, the field of view is not below π, or the resolution is empty.
    pub fn new(
        fov: f64,
        altitude: f64,
        earth_radius: f64,
        resolution: Resolution,
    ) -> Result<Self, HorizonError> {
        let params = CameraParams {
            fov,
            altitude,
            earth_radius,
            resolution,
        };
        params.validate_params()?;
        Ok(params)
    }

    /// Builds parameters from a frame metadata record, keeping the given Earth radius.
    pub fn from_metadata(
        metadata: &FrameMetadata,
        earth_radius: f64,
    ) -> Result<Self, HorizonError> {
        let width = u32::try_from(metadata.h_res).map_err(|_| {
            HorizonError::InvalidParameters(format!("negative width {}", metadata.h_res))
        })?;
        let height = u32::try_from(metadata.v_res).map_err(|_| {
            HorizonError::InvalidParameters(format!("negative height {}", metadata.v_res))
        })?;
        CameraParams::new(
            metadata.fov_h as f64,
            metadata.altitude as f64,
            earth_radius,
            Resolution::new(width, height),
        )
    }

    pub fn validate_params(&self) -> Result<(), HorizonError> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(HorizonError::InvalidParameters(format!(
                    "{name} must be positive and finite, got {value}"
                )))
            }
        };
        positive("fov", self.fov)?;
        positive("altitude", self.altitude)?;
        positive("earth_radius", self.earth_radius)?;
        if self.fov >= std::f64::consts::PI {
            return Err(HorizonError::InvalidParameters(format!(
                "fov must be below pi, got {}",
                self.fov
            )));
        }
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(HorizonError::InvalidParameters(
                "resolution must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Angular radius of the Earth disk seen from orbit: `asin(R / (R + h))`.
    pub fn earth_angular_radius(&self) -> f64 {
        (self.earth_radius / (self.earth_radius + self.altitude)).asin()
    }

    /// Maps a signed pixel offset from the image center to an angle off boresight.
    pub fn offset_to_angle(&self, offset: f64) -> f64 {
        ((offset / self.resolution.half_width()) * (0.5 * self.fov).tan()).atan()
    }

    /// Loads parameters from a YAML file.
    ///
    /// Expected layout:
    ///
    /// ```yaml
    /// camera:
    ///   fov: 0.994838
    ///   altitude: 500.0
    ///   earth_radius: 6378.136
    ///   resolution: [160, 120]
    /// ```
    ///
    /// # Errors
    ///
    /// * [`HorizonError::IoError`] if the file cannot be read.
    /// * [`HorizonError::YamlError`] for malformed YAML or missing fields.
    /// * [`HorizonError::InvalidParameters`] if the loaded values fail validation.
    pub fn load_from_yaml(path: &str) -> Result<Self, HorizonError> {
        let contents = fs::read_to_string(path)?;
        let docs = YamlLoader::load_from_str(&contents)?;
        let doc = docs
            .first()
            .ok_or_else(|| HorizonError::YamlError("empty YAML document".to_string()))?;
        let camera = &doc["camera"];

        let field = |name: &str| {
            yaml_f64(&camera[name]).ok_or_else(|| {
                HorizonError::YamlError(format!("Invalid {name}: missing or not a number"))
            })
        };

        let resolution_yaml = camera["resolution"].as_vec().ok_or_else(|| {
            HorizonError::YamlError("YAML missing 'resolution' or not an array".to_string())
        })?;
        if resolution_yaml.len() != 2 {
            return Err(HorizonError::YamlError(
                "'resolution' must hold [width, height]".to_string(),
            ));
        }
        let dimension = |value: &Yaml, name: &str| {
            value
                .as_i64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| {
                    HorizonError::YamlError(format!("Invalid {name}: not a non-negative integer"))
                })
        };

        let params = CameraParams {
            fov: field("fov")?,
            altitude: field("altitude")?,
            earth_radius: field("earth_radius")?,
            resolution: Resolution {
                width: dimension(&resolution_yaml[0], "width")?,
                height: dimension(&resolution_yaml[1], "height")?,
            },
        };
        params.validate_params()?;
        Ok(params)
    }

    /// Saves parameters to a YAML file readable by [`CameraParams::load_from_yaml`].
    pub fn save_to_yaml(&self, path: &str) -> Result<(), HorizonError> {
        let to_yaml = |e: serde_yaml::Error| HorizonError::YamlError(e.to_string());
        let key = |name: &str| serde_yaml::Value::String(name.to_string());

        let camera = serde_yaml::Mapping::from_iter([
            (key("fov"), serde_yaml::to_value(self.fov).map_err(to_yaml)?),
            (
                key("altitude"),
                serde_yaml::to_value(self.altitude).map_err(to_yaml)?,
            ),
            (
                key("earth_radius"),
                serde_yaml::to_value(self.earth_radius).map_err(to_yaml)?,
            ),
            (
                key("resolution"),
                serde_yaml::to_value(vec![self.resolution.width, self.resolution.height])
                    .map_err(to_yaml)?,
            ),
        ]);
        let yaml = serde_yaml::Mapping::from_iter([(
            key("camera"),
            serde_yaml::Value::Mapping(camera),
        )]);

        let yaml_string = serde_yaml::to_string(&yaml).map_err(to_yaml)?;
        let mut file = fs::File::create(path)?;
        file.write_all(yaml_string.as_bytes())?;
        Ok(())
    }
}

/// Reads a YAML scalar as `f64`, accepting integer literals.
fn yaml_f64(value: &Yaml) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|v| v as f64))
}
