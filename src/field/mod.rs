//! # Field Module
//!
//! Solenoidal magnetic field of the central barrel. The field is uniform
//! along z; its strength is read once per run from the run's global
//! parameters file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StudyError;
use crate::types::Vec3;

/// Global run parameters relevant to tracking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Solenoid field along z (kG)
    #[serde(default)]
    pub bz_kgauss: Option<f64>,
}

impl FieldConfig {
    pub fn new(bz_kgauss: f64) -> Self {
        Self {
            bz_kgauss: Some(bz_kgauss),
        }
    }

    /// Load from a JSON parameters file
    pub fn load(path: &Path) -> Result<Self, StudyError> {
        let text = std::fs::read_to_string(path).map_err(|source| StudyError::MissingInput {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StudyError::MalformedInput {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Uniform solenoidal field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagneticField {
    bz: f64,
}

impl MagneticField {
    /// Uniform field of `bz` kG along z
    pub fn uniform(bz: f64) -> Self {
        Self { bz }
    }

    /// Build from the run parameters; a missing or non-finite value is fatal
    pub fn from_config(config: &FieldConfig) -> Result<Self, StudyError> {
        match config.bz_kgauss {
            Some(bz) if bz.is_finite() => {
                info!(bz_kgauss = bz, "magnetic field loaded");
                Ok(Self::uniform(bz))
            }
            Some(bz) => Err(StudyError::MissingField(format!("non-finite Bz value {bz}"))),
            None => Err(StudyError::MissingField("bz_kgauss not set".into())),
        }
    }

    /// Field z component at a point (kG)
    pub fn bz_at(&self, _position: Vec3) -> f64 {
        self.bz
    }

    /// Field z component at the nominal interaction point (kG)
    pub fn bz(&self) -> f64 {
        self.bz
    }

    /// Field in Tesla
    pub fn tesla(&self) -> f64 {
        self.bz * 0.1
    }
}
