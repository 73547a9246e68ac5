//! Per-frame metadata record written alongside each horizon image.
//!
//! The record is a packed little-endian 44-byte structure:
//!
//! | offset | field | type |
//! |---|---|---|
//! | 0 | altitude (km) | f32 |
//! | 4 | horizontal field of view (rad, full angle) | f32 |
//! | 8 | horizontal resolution | i32 |
//! | 12 | vertical resolution | i32 |
//! | 16 | attitude quaternion w, x, y, z | 4 × f32 |
//! | 32 | ground-truth nadir x, y, z | 3 × f32 |

use nalgebra::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::HorizonError;

/// Size of one metadata record in bytes.
pub const RECORD_SIZE: usize = 44;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub altitude: f32,
    pub fov_h: f32,
    pub h_res: i32,
    pub v_res: i32,
    /// Attitude quaternion as `[w, x, y, z]`.
    pub quaternion: [f32; 4],
    /// Ground-truth nadir direction in the camera frame.
    pub nadir: [f32; 3],
}

impl FrameMetadata {
    /// Parses a record from the first [`RECORD_SIZE`] bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// [`HorizonError::MetadataError`] if fewer than [`RECORD_SIZE`] bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HorizonError> {
        if bytes.len() < RECORD_SIZE {
            return Err(HorizonError::MetadataError(format!(
                "record needs {RECORD_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let word = |index: usize| -> [u8; 4] {
            let start = index * 4;
            [
                bytes[start],
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ]
        };
        let float = |index: usize| f32::from_le_bytes(word(index));
        let int = |index: usize| i32::from_le_bytes(word(index));

        Ok(FrameMetadata {
            altitude: float(0),
            fov_h: float(1),
            h_res: int(2),
            v_res: int(3),
            quaternion: [float(4), float(5), float(6), float(7)],
            nadir: [float(8), float(9), float(10)],
        })
    }

    /// Serialises the record back into its 44-byte layout.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        let words: [[u8; 4]; 11] = [
            self.altitude.to_le_bytes(),
            self.fov_h.to_le_bytes(),
            self.h_res.to_le_bytes(),
            self.v_res.to_le_bytes(),
            self.quaternion[0].to_le_bytes(),
            self.quaternion[1].to_le_bytes(),
            self.quaternion[2].to_le_bytes(),
            self.quaternion[3].to_le_bytes(),
            self.nadir[0].to_le_bytes(),
            self.nadir[1].to_le_bytes(),
            self.nadir[2].to_le_bytes(),
        ];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words.iter()) {
            chunk.copy_from_slice(word);
        }
        out
    }

    /// Reads the record at the start of a metadata file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HorizonError> {
        let mut buffer = [0u8; RECORD_SIZE];
        let mut file = File::open(path)?;
        file.read_exact(&mut buffer).map_err(|e| {
            HorizonError::MetadataError(format!("failed to read {RECORD_SIZE}-byte record: {e}"))
        })?;
        Self::from_bytes(&buffer)
    }

    pub fn attitude_quaternion(&self) -> Quaternion<f64> {
        let [w, x, y, z] = self.quaternion;
        Quaternion::new(w as f64, x as f64, y as f64, z as f64)
    }

    pub fn nadir_vector(&self) -> Vector3<f64> {
        let [x, y, z] = self.nadir;
        Vector3::new(x as f64, y as f64, z as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> FrameMetadata {
        FrameMetadata {
            altitude: 500.0,
            fov_h: 57.0_f32.to_radians(),
            h_res: 160,
            v_res: 120,
            quaternion: [1.0, 0.0, 0.0, 0.0],
            nadir: [0.0, -0.5, -0.8660254],
        }
    }

    #[test]
    fn test_parse_known_layout() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&500.0_f32.to_le_bytes());
        bytes.extend_from_slice(&1.0_f32.to_le_bytes());
        bytes.extend_from_slice(&160_i32.to_le_bytes());
        bytes.extend_from_slice(&120_i32.to_le_bytes());
        for q in [0.5_f32, 0.5, 0.5, 0.5] {
            bytes.extend_from_slice(&q.to_le_bytes());
        }
        for n in [0.0_f32, 0.0, -1.0] {
            bytes.extend_from_slice(&n.to_le_bytes());
        }
        assert_eq!(bytes.len(), RECORD_SIZE);

        let record = FrameMetadata::from_bytes(&bytes).unwrap();
        assert_eq!(record.altitude, 500.0);
        assert_eq!(record.fov_h, 1.0);
        assert_eq!(record.h_res, 160);
        assert_eq!(record.v_res, 120);
        assert_eq!(record.quaternion, [0.5; 4]);
        assert_eq!(record.nadir_vector(), Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_bytes_layout_is_stable() {
        let record = sample_record();
        let bytes = record.to_bytes();
        assert_eq!(&bytes[8..12], &160_i32.to_le_bytes());
        assert_eq!(FrameMetadata::from_bytes(&bytes).unwrap(), record);
    }

    #[test]
    fn test_short_record_is_rejected() {
        let bytes = [0u8; RECORD_SIZE - 1];
        assert!(matches!(
            FrameMetadata::from_bytes(&bytes),
            Err(HorizonError::MetadataError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("horizon_attitude_test.hrz");
        std::fs::write(&path, sample_record().to_bytes()).unwrap();
        let loaded = FrameMetadata::load(&path).unwrap();
        assert_eq!(loaded.h_res, 160);
        assert_eq!(loaded.attitude_quaternion().w, 1.0);
    }
}
