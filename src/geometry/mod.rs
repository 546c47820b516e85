//! # Geometry Module
//!
//! Barrel detector described as coaxial cylindrical layers around the beam
//! line. Only what material accounting needs is modelled: radius, thickness
//! and material of each layer.

use crate::materials::Material;
use crate::types::Vec3;

/// One thin cylindrical layer
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorLayer {
    /// Layer name
    pub name: &'static str,
    /// Mean radius (cm)
    pub radius: f64,
    /// Radial thickness (cm)
    pub thickness: f64,
    /// Bulk material
    pub material: Material,
}

impl DetectorLayer {
    pub const fn new(name: &'static str, radius: f64, thickness: f64, material: Material) -> Self {
        Self {
            name,
            radius,
            thickness,
            material,
        }
    }

    /// Areal density at normal incidence (g/cm²)
    pub fn x_rho(&self) -> f64 {
        self.thickness * self.material.density()
    }

    /// Thickness in radiation lengths at normal incidence
    pub fn x_over_x0(&self) -> f64 {
        self.thickness / self.material.radiation_length()
    }
}

/// Ordered set of barrel layers
#[derive(Debug, Clone, PartialEq)]
pub struct BarrelGeometry {
    layers: Vec<DetectorLayer>,
}

impl BarrelGeometry {
    /// Build from layers in any order
    pub fn new(mut layers: Vec<DetectorLayer>) -> Self {
        layers.sort_by(|a, b| a.radius.total_cmp(&b.radius));
        Self { layers }
    }

    /// Beam pipe, seven silicon layers with their supports and the outer
    /// tracker's inner field cage
    pub fn central_barrel() -> Self {
        use Material::*;
        Self::new(vec![
            DetectorLayer::new("beam-pipe", 1.90, 0.080, Beryllium),
            DetectorLayer::new("inner-0", 2.34, 0.0050, Silicon),
            DetectorLayer::new("inner-1", 3.15, 0.0050, Silicon),
            DetectorLayer::new("inner-2", 3.93, 0.0050, Silicon),
            DetectorLayer::new("inner-barrel-shell", 4.75, 0.0200, CarbonFiber),
            DetectorLayer::new("middle-0", 19.61, 0.0100, Silicon),
            DetectorLayer::new("middle-1", 24.55, 0.0100, Silicon),
            DetectorLayer::new("middle-support", 29.40, 0.0800, CarbonFiber),
            DetectorLayer::new("outer-0", 34.39, 0.0100, Silicon),
            DetectorLayer::new("outer-1", 39.34, 0.0100, Silicon),
            DetectorLayer::new("outer-barrel-shell", 43.50, 0.1000, CarbonFiber),
            DetectorLayer::new("field-cage-inner", 78.80, 0.1500, Kapton),
        ])
    }

    pub fn layers(&self) -> &[DetectorLayer] {
        &self.layers
    }

    /// Layers whose mean radius lies between two transverse radii.
    ///
    /// A layer exactly at the end radius counts as crossed, one exactly at
    /// the start radius does not.
    pub fn crossed(&self, r_from: f64, r_to: f64) -> impl Iterator<Item = &DetectorLayer> {
        self.layers.iter().filter(move |l| {
            if r_to > r_from {
                l.radius > r_from && l.radius <= r_to
            } else if r_to < r_from {
                l.radius < r_from && l.radius >= r_to
            } else {
                false
            }
        })
    }

    /// Layers crossed by the straight segment between two global points
    pub fn crossed_by_segment(&self, from: Vec3, to: Vec3) -> impl Iterator<Item = &DetectorLayer> {
        self.crossed(from.perp(), to.perp())
    }

    /// Outermost layer radius (cm)
    pub fn outer_radius(&self) -> f64 {
        self.layers
            .last()
            .map(|l| l.radius + 0.5 * l.thickness)
            .unwrap_or(0.0)
    }
}

impl Default for BarrelGeometry {
    fn default() -> Self {
        Self::central_barrel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_are_sorted() {
        let geo = BarrelGeometry::new(vec![
            DetectorLayer::new("b", 5.0, 0.1, Material::Silicon),
            DetectorLayer::new("a", 2.0, 0.1, Material::Silicon),
        ]);
        assert_eq!(geo.layers()[0].name, "a");
        assert!((geo.outer_radius() - 5.05).abs() < 1e-12);
    }

    #[test]
    fn test_crossing_outward_and_inward() {
        let geo = BarrelGeometry::central_barrel();
        let outward: Vec<&str> = geo.crossed(1.0, 4.0).map(|l| l.name).collect();
        assert_eq!(outward, vec!["beam-pipe", "inner-0", "inner-1", "inner-2"]);

        let inward = geo.crossed(4.0, 1.0).count();
        assert_eq!(inward, 4);

        assert_eq!(geo.crossed(50.0, 70.0).count(), 0);
        assert_eq!(geo.crossed(10.0, 10.0).count(), 0);
    }

    #[test]
    fn test_segment_crossing_uses_transverse_radius() {
        let geo = BarrelGeometry::central_barrel();
        let from = Vec3::new(0.0, 0.0, -50.0);
        let to = Vec3::new(3.0, 4.0, 50.0); // r = 5
        assert_eq!(geo.crossed_by_segment(from, to).count(), 5);
    }

    #[test]
    fn test_layer_budget() {
        let layer = DetectorLayer::new("si", 10.0, 0.0937, Material::Silicon);
        assert!((layer.x_over_x0() - 0.01).abs() < 1e-4);
        assert!(layer.x_rho() > 0.2 && layer.x_rho() < 0.23);
    }
}
