//! Per-frame batch results and their CSV / JSON export.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AttitudeEstimate, FitMethod};
use crate::camera::HorizonError;

/// One row of a batch report. Attitude columns are empty for failed frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub name: String,
    pub method: FitMethod,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub nadir_x: Option<f64>,
    pub nadir_y: Option<f64>,
    pub nadir_z: Option<f64>,
    pub edge_points: Option<usize>,
    pub rays_cast: Option<usize>,
    pub rmse: Option<f64>,
    /// Angle to the ground-truth nadir, radians.
    pub angular_error: Option<f64>,
    pub error: Option<String>,
}

impl BatchEntry {
    pub fn success(name: &str, estimate: &AttitudeEstimate, angular_error: Option<f64>) -> Self {
        let nadir = estimate.attitude.nadir;
        BatchEntry {
            name: name.to_string(),
            method: estimate.method,
            pitch: Some(estimate.attitude.pitch),
            roll: Some(estimate.attitude.roll),
            nadir_x: Some(nadir.x),
            nadir_y: Some(nadir.y),
            nadir_z: Some(nadir.z),
            edge_points: Some(estimate.edge_points),
            rays_cast: estimate.rays_cast,
            rmse: estimate.quality.map(|q| q.rmse),
            angular_error,
            error: None,
        }
    }

    pub fn failure(name: &str, method: FitMethod, err: &HorizonError) -> Self {
        BatchEntry {
            name: name.to_string(),
            method,
            pitch: None,
            roll: None,
            nadir_x: None,
            nadir_y: None,
            nadir_z: None,
            edge_points: None,
            rays_cast: None,
            rmse: None,
            angular_error: None,
            error: Some(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub successes: usize,
    pub failures: usize,
    /// Over successful frames with ground truth, radians.
    pub mean_angular_error: Option<f64>,
    pub max_angular_error: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn new(entries: Vec<BatchEntry>) -> Self {
        BatchReport { entries }
    }

    pub fn summary(&self) -> BatchSummary {
        let successes = self.entries.iter().filter(|e| e.is_success()).count();
        let errors: Vec<f64> = self
            .entries
            .iter()
            .filter_map(|e| e.angular_error)
            .collect();
        let (mean_angular_error, max_angular_error) = if errors.is_empty() {
            (None, None)
        } else {
            (
                Some(errors.iter().sum::<f64>() / errors.len() as f64),
                Some(errors.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
            )
        };
        BatchSummary {
            successes,
            failures: self.entries.len() - successes,
            mean_angular_error,
            max_angular_error,
        }
    }

    /// Writes one CSV row per frame, with a header.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), HorizonError> {
        let mut writer = csv::Writer::from_path(path)?;
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, HorizonError> {
        #[derive(Serialize)]
        struct Document<'a> {
            summary: BatchSummary,
            entries: &'a [BatchEntry],
        }
        Ok(serde_json::to_string_pretty(&Document {
            summary: self.summary(),
            entries: &self.entries,
        })?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), HorizonError> {
        let mut file = File::create(path)?;
        file.write_all(self.to_json()?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attitude::Attitude;
    use nalgebra::Vector3;

    fn estimate() -> AttitudeEstimate {
        AttitudeEstimate {
            method: FitMethod::Algebraic,
            attitude: Attitude {
                pitch: 0.8,
                roll: -0.1,
                nadir: Vector3::new(0.0, -0.7, -0.7).normalize(),
            },
            model: None,
            quality: None,
            edge_points: 250,
            rays_cast: None,
        }
    }

    fn report() -> BatchReport {
        BatchReport::new(vec![
            BatchEntry::success("a.png", &estimate(), Some(0.02)),
            BatchEntry::success("b.png", &estimate(), Some(0.04)),
            BatchEntry::failure(
                "c.png",
                FitMethod::Algebraic,
                &HorizonError::NoEdgeFound("blank".to_string()),
            ),
        ])
    }

    #[test]
    fn test_summary() {
        let summary = report().summary();
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.failures, 1);
        assert!((summary.mean_angular_error.unwrap() - 0.03).abs() < 1e-12);
        assert_eq!(summary.max_angular_error, Some(0.04));
    }

    #[test]
    fn test_csv_export() {
        let path = std::env::temp_dir().join("horizon_attitude_report_test.csv");
        report().write_csv(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("name,method,pitch,roll"));
        assert!(lines[1].starts_with("a.png,algebraic,0.8,-0.1"));
        assert!(lines[3].contains("No horizon edge found: blank"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_json_export() {
        let json = report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["successes"], 2);
        assert_eq!(value["entries"][2]["error"], "No horizon edge found: blank");
        assert!(value["entries"][2]["pitch"].is_null());
    }
}
