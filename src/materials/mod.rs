//! # Materials Module
//!
//! Material budget seen by a track between two points, and the mean energy
//! loss it causes.
//!
//! ## Models
//!
//! - [`NoMaterial`]: vacuum everywhere
//! - [`RadialLut`]: mean density binned in transverse radius, integrated
//!   along the segment
//! - [`LayeredMaterial`]: discrete crossings of the barrel layers, with the
//!   path length through each layer corrected for the inclination of the
//!   segment
//!
//! ## Energy loss
//!
//! Bethe-Bloch with the Sternheimer density correction, parametrised for
//! silicon-like solids:
//!
//! -dE/dx = K Z/A (1/β²) [½ ln(2mₑβ²γ²T_max/I²) - β² - δ/2]

use crate::constants::*;
use crate::geometry::BarrelGeometry;
use crate::types::{MaterialCorrection, Vec3};

/// Detector materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    /// Beam pipe
    Beryllium,
    /// Sensors
    Silicon,
    /// Mechanical supports
    CarbonFiber,
    /// Field cage foils
    Kapton,
    /// Gaps between layers
    Air,
}

impl Material {
    /// Density (g/cm³)
    pub fn density(&self) -> f64 {
        match self {
            Material::Beryllium => 1.848,
            Material::Silicon => 2.329,
            Material::CarbonFiber => 1.80,
            Material::Kapton => 1.42,
            Material::Air => 1.205e-3,
        }
    }

    /// Radiation length (cm)
    pub fn radiation_length(&self) -> f64 {
        match self {
            Material::Beryllium => 35.28,
            Material::Silicon => 9.37,
            Material::CarbonFiber => 23.7,
            Material::Kapton => 28.57,
            Material::Air => 30_390.0,
        }
    }
}

/// Integrated material along a segment
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MaterialBudget {
    /// Segment length (cm)
    pub length: f64,
    /// Areal density traversed (g/cm²)
    pub x_rho: f64,
    /// Radiation lengths traversed
    pub x_over_x0: f64,
}

impl MaterialBudget {
    /// Mean density along the segment (g/cm³)
    pub fn mean_rho(&self) -> f64 {
        if self.length > 0.0 {
            self.x_rho / self.length
        } else {
            0.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x_rho == 0.0 && self.x_over_x0 == 0.0
    }
}

/// Anything that can report the material between two points
pub trait MaterialModel: std::fmt::Debug {
    fn budget(&self, from: Vec3, to: Vec3) -> MaterialBudget;
}

/// Vacuum
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMaterial;

impl MaterialModel for NoMaterial {
    fn budget(&self, from: Vec3, to: Vec3) -> MaterialBudget {
        MaterialBudget {
            length: (to - from).mag(),
            ..MaterialBudget::default()
        }
    }
}

/// Mean material per unit length binned in transverse radius
#[derive(Debug, Clone)]
pub struct RadialLut {
    bin_width: f64,
    /// g/cm³ per bin
    rho: Vec<f64>,
    /// 1/X0 per bin (1/cm)
    inv_x0: Vec<f64>,
}

impl RadialLut {
    /// Smear each layer of a geometry uniformly over the bins it overlaps
    pub fn from_geometry(geometry: &BarrelGeometry, r_max: f64, n_bins: usize) -> Self {
        let bin_width = r_max / n_bins as f64;
        let mut rho = vec![0.0; n_bins];
        let mut inv_x0 = vec![0.0; n_bins];

        for layer in geometry.layers() {
            let lo = layer.radius - 0.5 * layer.thickness;
            let hi = layer.radius + 0.5 * layer.thickness;
            for bin in 0..n_bins {
                let b_lo = bin as f64 * bin_width;
                let b_hi = b_lo + bin_width;
                let overlap = hi.min(b_hi) - lo.max(b_lo);
                if overlap > 0.0 {
                    let fraction = overlap / bin_width;
                    rho[bin] += fraction * layer.material.density();
                    inv_x0[bin] += fraction / layer.material.radiation_length();
                }
            }
        }

        Self { bin_width, rho, inv_x0 }
    }

    fn bin(&self, r: f64) -> Option<usize> {
        let bin = (r / self.bin_width).floor();
        if bin >= 0.0 && (bin as usize) < self.rho.len() {
            Some(bin as usize)
        } else {
            None
        }
    }

    /// Mean density at transverse radius `r`, zero outside the table
    pub fn density_at(&self, r: f64) -> f64 {
        self.bin(r).map(|b| self.rho[b]).unwrap_or(0.0)
    }
}

impl Default for RadialLut {
    fn default() -> Self {
        Self::from_geometry(&BarrelGeometry::central_barrel(), 100.0, 400)
    }
}

impl MaterialModel for RadialLut {
    fn budget(&self, from: Vec3, to: Vec3) -> MaterialBudget {
        let delta = to - from;
        let length = delta.mag();
        if length == 0.0 {
            return MaterialBudget::default();
        }

        // Midpoint integration with sub-steps shorter than half a bin
        let n_sub = ((length / (0.5 * self.bin_width)).ceil() as usize).max(1);
        let dl = length / n_sub as f64;
        let mut x_rho = 0.0;
        let mut x_over_x0 = 0.0;
        for i in 0..n_sub {
            let t = (i as f64 + 0.5) / n_sub as f64;
            let p = from + delta * t;
            if let Some(b) = self.bin(p.perp()) {
                x_rho += self.rho[b] * dl;
                x_over_x0 += self.inv_x0[b] * dl;
            }
        }

        MaterialBudget {
            length,
            x_rho,
            x_over_x0,
        }
    }
}

/// Discrete crossings of the barrel layers
#[derive(Debug, Clone, Default)]
pub struct LayeredMaterial {
    geometry: BarrelGeometry,
}

impl LayeredMaterial {
    pub fn new(geometry: BarrelGeometry) -> Self {
        Self { geometry }
    }
}

impl MaterialModel for LayeredMaterial {
    fn budget(&self, from: Vec3, to: Vec3) -> MaterialBudget {
        let length = (to - from).mag();
        let dr = (to.perp() - from.perp()).abs();
        if length == 0.0 || dr == 0.0 {
            return MaterialBudget {
                length,
                ..MaterialBudget::default()
            };
        }

        // Path length per unit of radial distance
        let inclination = length / dr;
        let mut budget = MaterialBudget {
            length,
            ..MaterialBudget::default()
        };
        for layer in self.geometry.crossed_by_segment(from, to) {
            if layer.thickness <= 0.0 {
                continue;
            }
            // Path through the layer relative to normal incidence
            let scale = (layer.thickness * inclination).min(length) / layer.thickness;
            budget.x_rho += layer.x_rho() * scale;
            budget.x_over_x0 += layer.x_over_x0() * scale;
        }
        budget
    }
}

/// Material model implementing a correction policy
pub fn model_for(policy: MaterialCorrection) -> Box<dyn MaterialModel> {
    match policy {
        MaterialCorrection::None => Box::new(NoMaterial),
        MaterialCorrection::Lut => Box::new(RadialLut::default()),
        MaterialCorrection::Geometry => Box::new(LayeredMaterial::default()),
    }
}

/// Mean energy loss per areal density (GeV cm²/g) at a given βγ
pub fn bethe_bloch_solid(bg: f64) -> f64 {
    let x0 = BB_X0 * 2.303;
    let x1 = BB_X1 * 2.303;
    let bg2 = bg * bg;
    let max_t = 2.0 * M_ELECTRON * bg2;

    // Density effect
    let x = bg.ln();
    let lhw_i = (28.816e-9 * (BB_RHO * BB_Z_OVER_A).sqrt() / BB_MEAN_EXCITATION).ln();
    let d2 = if x > x1 {
        lhw_i + x - 0.5
    } else if x > x0 {
        let r = (x1 - x) / (x1 - x0);
        lhw_i + x - 0.5 + (0.5 - lhw_i - x0) * r * r * r
    } else {
        0.0
    };

    BB_K * BB_Z_OVER_A * (1.0 + bg2) / bg2
        * (0.5 * (2.0 * M_ELECTRON * bg2 * max_t / (BB_MEAN_EXCITATION * BB_MEAN_EXCITATION)).ln()
            - bg2 / (1.0 + bg2)
            - d2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vacuum_has_no_budget() {
        let b = NoMaterial.budget(Vec3::zero(), Vec3::new(3.0, 4.0, 0.0));
        assert!(b.is_empty());
        assert!((b.length - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_layered_normal_incidence() {
        let model = LayeredMaterial::default();
        // Radial segment through the beam pipe only
        let b = model.budget(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let expected = 0.080 * Material::Beryllium.density();
        assert!((b.x_rho - expected).abs() < 1e-12);
        assert!((b.mean_rho() - expected).abs() < 1e-12);
        let barrel = BarrelGeometry::central_barrel();
        let pipe = &barrel.layers()[0];
        assert!((b.x_over_x0 - pipe.x_over_x0()).abs() < 1e-12);
    }

    #[test]
    fn test_layered_inclined_crossing_is_longer() {
        let model = LayeredMaterial::default();
        let normal = model.budget(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let inclined = model.budget(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 1.0));
        assert!(inclined.x_rho > normal.x_rho);
        assert!((inclined.x_rho / normal.x_rho - 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_lut_tracks_layered_total() {
        let lut = RadialLut::default();
        let layered = LayeredMaterial::default();
        let from = Vec3::new(0.5, 0.0, 0.0);
        let to = Vec3::new(45.0, 0.0, 0.0);
        let a = lut.budget(from, to);
        let b = layered.budget(from, to);
        assert!(a.x_rho > 0.0);
        assert!((a.x_rho - b.x_rho).abs() / b.x_rho < 0.05);
    }

    #[test]
    fn test_lut_empty_gap() {
        let lut = RadialLut::default();
        assert_eq!(lut.density_at(60.0), 0.0);
        assert!(lut.density_at(1.9) > 0.0);
        assert_eq!(lut.density_at(500.0), 0.0);
        let b = lut.budget(Vec3::new(50.0, 0.0, 0.0), Vec3::new(70.0, 0.0, 0.0));
        assert!(b.is_empty());
    }

    #[test]
    fn test_bethe_bloch_minimum_ionising() {
        // About 1.66 MeV cm²/g near βγ ≈ 3.5 for silicon
        let dedx = bethe_bloch_solid(3.5);
        assert!(dedx > 1.4e-3 && dedx < 1.9e-3, "dedx = {dedx}");
        // Slow particles lose more
        assert!(bethe_bloch_solid(0.5) > dedx);
    }

    #[test]
    fn test_model_for_policy() {
        let far = Vec3::new(10.0, 0.0, 0.0);
        assert!(model_for(MaterialCorrection::None).budget(Vec3::zero(), far).is_empty());
        assert!(!model_for(MaterialCorrection::Lut).budget(Vec3::zero(), far).is_empty());
        assert!(!model_for(MaterialCorrection::Geometry).budget(Vec3::zero(), far).is_empty());
    }
}
