//! # Propagation Module
//!
//! Transport of track parameters to a fixed local x in a uniform solenoidal
//! field, with optional mean energy loss in material.
//!
//! ## Helix step
//!
//! With curvature k = q/pt · Bz · B2C and step dx, the sine of the local
//! azimuth advances linearly, snp' = snp + k·dx. The transverse offset and
//! the arc length follow from the chord between the two directions:
//!
//! dy = dx (f₁ + f₂)/(r₁ + r₂),  r = √(1 - f²)
//!
//! and z advances by tgl times the transverse arc length.

use tracing::trace;

use crate::constants::*;
use crate::field::MagneticField;
use crate::materials::{bethe_bloch_solid, model_for, MaterialModel};
use crate::types::{MaterialCorrection, StudyConfig, TrackParams};

/// Why a transport attempt stopped
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropagationFailure {
    /// The local direction would turn past 90°
    SnpOverflow { snp: f64 },
    /// The local direction exceeded the configured limit
    SnpLimit { snp: f64, x: f64 },
    /// Straight or degenerate track
    ZeroCurvature,
    /// The particle would lose too much energy, or stop
    EnergyLoss { d_e: f64 },
    /// Non-finite parameters, or a start or target beyond the transport range
    InvalidState { x: f64, x_target: f64 },
}

/// Anything that can move a track to a given local x
pub trait Propagator {
    /// Transport `track` to local `x`.
    ///
    /// On success the track sits at `x` and `true` is returned. On failure
    /// `false` is returned and the track is left untouched.
    fn propagate_to_x(&self, track: &mut TrackParams, x: f64) -> bool;
}

/// Stepping propagator for a uniform field
#[derive(Debug)]
pub struct TrackPropagator {
    field: MagneticField,
    max_snp: f64,
    max_step: f64,
    mass: f64,
    material: Box<dyn MaterialModel>,
    correct_material: bool,
}

impl TrackPropagator {
    /// Propagator without material effects
    pub fn new(field: MagneticField) -> Self {
        Self {
            field,
            max_snp: MAX_SNP,
            max_step: MAX_STEP,
            mass: M_PION,
            material: model_for(MaterialCorrection::None),
            correct_material: false,
        }
    }

    /// Propagator following the study configuration
    pub fn from_config(field: MagneticField, config: &StudyConfig) -> Self {
        Self {
            field,
            max_snp: config.max_snp,
            max_step: config.max_step,
            mass: config.track_mass,
            material: model_for(config.material),
            correct_material: config.material != MaterialCorrection::None,
        }
    }

    /// Replace the material model
    pub fn with_material(mut self, material: Box<dyn MaterialModel>) -> Self {
        self.material = material;
        self.correct_material = true;
        self
    }

    pub fn field(&self) -> &MagneticField {
        &self.field
    }

    /// Transport a copy of `track` to `x`, reporting why it failed if it did
    pub fn transport(&self, track: &TrackParams, x_target: f64) -> Result<TrackParams, PropagationFailure> {
        let in_range = |x: f64| x.abs() <= MAX_TRANSPORT_X;
        if !track.is_finite() || !in_range(track.x) || !in_range(x_target) {
            return Err(PropagationFailure::InvalidState { x: track.x, x_target });
        }

        let mut t = *track;
        let mut dx = x_target - t.x;
        let dir = if dx > 0.0 { 1.0 } else { -1.0 };

        while dx.abs() > X_EPSILON {
            let step = dx.abs().min(self.max_step) * dir;
            let x_next = t.x + step;
            let start = t.global_position();

            let bz = self.field.bz_at(start);
            helix_step(&mut t, x_next, bz)?;

            if t.snp.abs() >= self.max_snp {
                return Err(PropagationFailure::SnpLimit { snp: t.snp, x: t.x });
            }

            if self.correct_material {
                let budget = self.material.budget(start, t.global_position());
                if budget.x_rho > 0.0 {
                    // Outward steps lose energy, inward steps restore it
                    correct_for_energy_loss(&mut t, -dir * budget.x_rho, self.mass)?;
                }
            }

            dx = x_target - t.x;
        }

        t.x = x_target;
        Ok(t)
    }
}

impl Propagator for TrackPropagator {
    fn propagate_to_x(&self, track: &mut TrackParams, x: f64) -> bool {
        match self.transport(track, x) {
            Ok(done) => {
                *track = done;
                true
            }
            Err(reason) => {
                trace!(?reason, from = track.x, to = x, "propagation failed");
                false
            }
        }
    }
}

/// Advance the parameters to `x_new` along a helix in field `bz`
pub fn helix_step(track: &mut TrackParams, x_new: f64, bz: f64) -> Result<(), PropagationFailure> {
    let dx = x_new - track.x;
    if dx.abs() < X_EPSILON {
        track.x = x_new;
        return Ok(());
    }

    let crv = track.curvature(bz);
    let x2r = crv * dx;
    let f1 = track.snp;
    let f2 = f1 + x2r;
    if f1.abs() > ALMOST_ONE || f2.abs() > ALMOST_ONE {
        return Err(PropagationFailure::SnpOverflow { snp: f2 });
    }
    if track.q2pt.abs() < ALMOST_ZERO {
        return Err(PropagationFailure::ZeroCurvature);
    }
    let r1 = ((1.0 - f1) * (1.0 + f1)).sqrt();
    let r2 = ((1.0 - f2) * (1.0 + f2)).sqrt();
    if r1.abs() < ALMOST_ZERO || r2.abs() < ALMOST_ZERO {
        return Err(PropagationFailure::SnpOverflow { snp: f2 });
    }

    let dy2dx = (f1 + f2) / (r1 + r2);
    let arc = if x2r.abs() < ARC_THRESHOLD {
        dx * (r2 + f2 * dy2dx)
    } else {
        // Exact transverse arc for larger bends
        let mut rot = (r1 * f2 - r2 * f1).asin();
        if f1 * f1 + f2 * f2 > 1.0 && f1 * f2 < 0.0 {
            rot = if f2 > 0.0 {
                std::f64::consts::PI - rot
            } else {
                -std::f64::consts::PI - rot
            };
        }
        rot / crv
    };

    track.x = x_new;
    track.y += dx * dy2dx;
    track.z += arc * track.tgl;
    track.snp += x2r;
    Ok(())
}

/// Apply a mean energy change for areal density `x_rho` (g/cm², negative
/// when the particle moves into the material).
pub fn correct_for_energy_loss(track: &mut TrackParams, x_rho: f64, mass: f64) -> Result<(), PropagationFailure> {
    let p2 = track.p2();
    let m2 = mass * mass;
    let e = (p2 + m2).sqrt();
    let bg = p2.sqrt() / mass;
    let d_e = bethe_bloch_solid(bg) * x_rho;

    if d_e.abs() > MAX_ELOSS_FRACTION * e {
        return Err(PropagationFailure::EnergyLoss { d_e });
    }
    let p2_new = p2 + d_e * (d_e + 2.0 * e);
    if p2_new <= 0.0 {
        return Err(PropagationFailure::EnergyLoss { d_e });
    }
    track.q2pt *= (p2 / p2_new).sqrt();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::LayeredMaterial;
    use crate::types::Vec3;

    const BZ: f64 = -5.00668;

    fn radial_track(pt: f64, charge: i32) -> TrackParams {
        TrackParams::from_global(Vec3::new(5.0, 0.0, 0.0), Vec3::new(pt, 0.0, 0.3 * pt), charge)
    }

    fn propagator() -> TrackPropagator {
        TrackPropagator::new(MagneticField::uniform(BZ))
    }

    #[test]
    fn test_reaches_reference_x() {
        let mut t = radial_track(1.0, 1);
        assert!(propagator().propagate_to_x(&mut t, REFERENCE_X));
        assert!((t.x - REFERENCE_X).abs() < 1e-12);
        assert!(t.snp.abs() < MAX_SNP);
        assert!(t.z > 0.0);
        // Helix transport conserves pt
        assert!((t.pt() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_straight_line_in_zero_field_fails() {
        let prop = TrackPropagator::new(MagneticField::uniform(0.0));
        let mut t = radial_track(1.0, 1);
        t.q2pt = 0.0;
        let before = t;
        assert!(!prop.propagate_to_x(&mut t, 20.0));
        assert_eq!(t, before);
    }

    #[test]
    fn test_bending_matches_circle() {
        // Compare y at the target with the exact circle through the start
        let pt = 2.0;
        let mut t = radial_track(pt, 1);
        assert!(propagator().propagate_to_x(&mut t, 45.0));

        let radius = pt / (BZ * B2C).abs(); // cm
        let dx: f64 = 40.0;
        let sag = radius - (radius * radius - dx * dx).sqrt();
        assert!((t.y.abs() - sag).abs() < 1e-6, "y = {} sag = {}", t.y, sag);
        assert!((t.snp.abs() - dx / radius).abs() < 1e-9);
    }

    #[test]
    fn test_opposite_charges_bend_opposite_ways() {
        let mut pos = radial_track(1.0, 1);
        let mut neg = radial_track(1.0, -1);
        assert!(propagator().propagate_to_x(&mut pos, 40.0));
        assert!(propagator().propagate_to_x(&mut neg, 40.0));
        assert!(pos.y * neg.y < 0.0);
        assert!((pos.y + neg.y).abs() < 1e-9);
    }

    #[test]
    fn test_low_pt_track_fails_and_is_untouched() {
        // Radius ~ 53 cm: turns over before 70 cm
        let mut t = radial_track(0.08, 1);
        let before = t;
        assert!(!propagator().propagate_to_x(&mut t, REFERENCE_X));
        assert_eq!(t, before);
        assert!((t.x - REFERENCE_X).abs() > 1.0);
    }

    #[test]
    fn test_failure_reason_is_snp_limit() {
        let t = radial_track(0.08, -1);
        match propagator().transport(&t, REFERENCE_X) {
            Err(PropagationFailure::SnpLimit { snp, .. }) => assert!(snp.abs() >= MAX_SNP),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_track_is_rejected() {
        let p = propagator();
        let mut t = radial_track(1.0, 1);
        t.x = f64::NAN;
        assert!(matches!(p.transport(&t, REFERENCE_X), Err(PropagationFailure::InvalidState { .. })));

        let mut t = radial_track(1.0, 1);
        t.snp = f64::INFINITY;
        let before = t;
        assert!(!p.propagate_to_x(&mut t, REFERENCE_X));
        assert_eq!(t.x, before.x);
        assert!(t.snp.is_infinite());
    }

    #[test]
    fn test_target_beyond_transport_range_is_rejected() {
        let p = propagator();
        let t = radial_track(1.0, 1);
        for target in [1e9, -1e9, f64::NAN, MAX_TRANSPORT_X + 1.0] {
            assert!(
                matches!(p.transport(&t, target), Err(PropagationFailure::InvalidState { .. })),
                "target {target}"
            );
        }
    }

    #[test]
    fn test_inward_propagation() {
        let mut t = radial_track(1.5, 1);
        let p = propagator();
        assert!(p.propagate_to_x(&mut t, 80.0));
        assert!(p.propagate_to_x(&mut t, 5.0));
        assert!((t.y).abs() < 1e-6);
        assert!((t.snp).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let p = propagator();
        let mut a = radial_track(0.7, 1);
        let mut b = radial_track(0.7, 1);
        assert_eq!(p.propagate_to_x(&mut a, 60.0), p.propagate_to_x(&mut b, 60.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_material_reduces_momentum_outward() {
        let field = MagneticField::uniform(BZ);
        let config = StudyConfig {
            material: MaterialCorrection::Geometry,
            ..StudyConfig::k0s_pions()
        };
        let with = TrackPropagator::from_config(field, &config);
        let without = TrackPropagator::new(field);

        let mut a = TrackParams::from_global(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0), 1);
        let mut b = a;
        assert!(with.propagate_to_x(&mut a, 60.0));
        assert!(without.propagate_to_x(&mut b, 60.0));
        assert!(a.pt() < b.pt());
        assert!(b.pt() - a.pt() < 0.01);
    }

    #[test]
    fn test_energy_loss_limit() {
        let mut t = radial_track(0.05, 1);
        let before = t;
        let err = correct_for_energy_loss(&mut t, -50.0, M_PION).unwrap_err();
        assert!(matches!(err, PropagationFailure::EnergyLoss { .. }));
        assert_eq!(t, before);
    }

    #[test]
    fn test_custom_material_model() {
        let prop = TrackPropagator::new(MagneticField::uniform(BZ)).with_material(Box::new(LayeredMaterial::default()));
        let mut t = radial_track(1.0, 1);
        assert!(prop.propagate_to_x(&mut t, 50.0));
        assert!(t.pt() < 1.0);
    }
}
