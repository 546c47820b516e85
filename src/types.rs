//! # Core Types
//!
//! Fundamental types shared by the matching study: vectors, labels, track
//! states and the study configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::StudyError;

// ============================================================================
// VECTOR TYPES (3D)
// ============================================================================

/// 3D vector for positions and momenta
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Create new vector
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    /// Magnitude squared
    pub fn mag_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Magnitude
    pub fn mag(&self) -> f64 {
        self.mag_squared().sqrt()
    }

    /// Length of the transverse (x, y) projection
    pub fn perp(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Azimuthal angle of the transverse projection
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Dot product
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

// ============================================================================
// LABELS
// ============================================================================

/// Provenance of a reconstructed track: the simulated particle it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label {
    /// Event index within the run
    pub event: i32,
    /// Particle index within the event
    pub track: i32,
}

impl Label {
    pub const fn new(event: i32, track: i32) -> Self {
        Self { event, track }
    }

    /// Noise and unset labels carry a negative track id
    pub fn is_valid(&self) -> bool {
        self.event >= 0 && self.track >= 0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.event, self.track)
    }
}

/// Label as stored next to a track, with the fidelity verdict of the
/// hit-to-particle assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct McLabel {
    pub event: i32,
    pub track: i32,
    #[serde(default)]
    pub fake: bool,
}

impl McLabel {
    pub const fn new(event: i32, track: i32, fake: bool) -> Self {
        Self { event, track, fake }
    }

    pub fn label(&self) -> Label {
        Label::new(self.event, self.track)
    }

    pub fn fidelity(&self) -> Fidelity {
        if self.fake {
            Fidelity::Fake
        } else {
            Fidelity::Genuine
        }
    }
}

/// Whether a track was built from hits of a single particle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    #[default]
    Genuine,
    Fake,
}

impl Fidelity {
    pub fn is_fake(&self) -> bool {
        matches!(self, Fidelity::Fake)
    }
}

/// Route by which a track entered the merged stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    /// Regular inner-outer matching
    #[default]
    Standard,
    /// Low-confidence afterburner association
    Afterburner,
}

/// Reconstruction stream a track belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stream {
    /// Inner silicon tracker
    First,
    /// Outer gaseous tracker
    Second,
    /// Combined inner-outer tracks
    Merged,
}

impl Stream {
    pub const ALL: [Stream; 3] = [Stream::First, Stream::Second, Stream::Merged];

    pub fn name(&self) -> &'static str {
        match self {
            Stream::First => "first",
            Stream::Second => "second",
            Stream::Merged => "merged",
        }
    }
}

// ============================================================================
// TRACK STATE
// ============================================================================

/// Track parameters in the local frame rotated by `alpha`
///
/// `x` is the radial coordinate along the rotated axis, `y` and `z` the
/// transverse and longitudinal offsets, `snp` the sine of the local azimuth,
/// `tgl` the dip-angle tangent and `q2pt` the signed inverse pt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackParams {
    pub x: f64,
    pub alpha: f64,
    pub y: f64,
    pub z: f64,
    pub snp: f64,
    pub tgl: f64,
    pub q2pt: f64,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            x: 0.0,
            alpha: 0.0,
            y: 0.0,
            z: 0.0,
            snp: 0.0,
            tgl: 0.0,
            q2pt: RESET_Q2PT,
        }
    }
}

impl TrackParams {
    /// Build from a global position and momentum.
    ///
    /// The frame is rotated so that the position lies on the local x axis.
    pub fn from_global(position: Vec3, momentum: Vec3, charge: i32) -> Self {
        let alpha = position.phi();
        let (sa, ca) = alpha.sin_cos();
        let pt = momentum.perp();
        let py_local = -momentum.x * sa + momentum.y * ca;
        Self {
            x: position.x * ca + position.y * sa,
            alpha,
            y: -position.x * sa + position.y * ca,
            z: position.z,
            snp: if pt > 0.0 { py_local / pt } else { 0.0 },
            tgl: if pt > 0.0 { momentum.z / pt } else { 0.0 },
            q2pt: if pt > 0.0 { charge.signum() as f64 / pt } else { 0.0 },
        }
    }

    /// Every parameter is a finite number
    pub fn is_finite(&self) -> bool {
        [self.x, self.alpha, self.y, self.z, self.snp, self.tgl, self.q2pt]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Return to the neutral state used for absent tracks
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Transverse momentum (GeV)
    pub fn pt(&self) -> f64 {
        1.0 / self.q2pt.abs()
    }

    /// Total momentum squared (GeV²)
    pub fn p2(&self) -> f64 {
        (1.0 + self.tgl * self.tgl) / (self.q2pt * self.q2pt)
    }

    /// Charge sign, zero for a straight track
    pub fn sign(&self) -> i32 {
        if self.q2pt > 0.0 {
            1
        } else if self.q2pt < 0.0 {
            -1
        } else {
            0
        }
    }

    /// Signed curvature (1/cm) in a field of `bz` kG
    pub fn curvature(&self, bz: f64) -> f64 {
        self.q2pt * bz * B2C
    }

    /// Position in the global frame
    pub fn global_position(&self) -> Vec3 {
        let (sa, ca) = self.alpha.sin_cos();
        Vec3::new(self.x * ca - self.y * sa, self.x * sa + self.y * ca, self.z)
    }
}

// ============================================================================
// STUDY CONFIGURATION
// ============================================================================

/// How the minimum daughter |pdg| is compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdgThreshold {
    /// |pdg| equal to the minimum is kept
    #[default]
    Inclusive,
    /// |pdg| equal to the minimum is dropped
    Exclusive,
}

impl PdgThreshold {
    pub fn accepts(&self, abs_pdg: i32, minimum: i32) -> bool {
        match self {
            PdgThreshold::Inclusive => abs_pdg >= minimum,
            PdgThreshold::Exclusive => abs_pdg > minimum,
        }
    }
}

/// Material treatment during reference propagation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCorrection {
    /// Helix transport only
    #[default]
    None,
    /// Mean material from a radial lookup table
    Lut,
    /// Material from discrete detector layers
    Geometry,
}

impl std::str::FromStr for MaterialCorrection {
    type Err = StudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(MaterialCorrection::None),
            "lut" => Ok(MaterialCorrection::Lut),
            "geometry" | "tgeo" => Ok(MaterialCorrection::Geometry),
            other => Err(StudyError::InvalidConfig(format!(
                "unknown material correction '{other}'"
            ))),
        }
    }
}

/// Configuration of a matching study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Name of the preset
    pub name: String,

    // Truth selection
    /// PDG code of the decaying species of interest
    pub mother_pdg: i32,
    /// Production process code of genuine decay products
    pub decay_process: i32,
    /// Minimum |pdg| of an accepted daughter
    pub min_daughter_abs_pdg: i32,
    /// Boundary handling for the |pdg| cut
    pub threshold: PdgThreshold,

    // Reference propagation
    /// Local x all tracks are transported to (cm)
    pub reference_x: f64,
    /// Largest |snp| tolerated during transport
    pub max_snp: f64,
    /// Largest transport step (cm)
    pub max_step: f64,
    /// Material treatment
    pub material: MaterialCorrection,
    /// Mass hypothesis for energy loss (GeV)
    pub track_mass: f64,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self::k0s_pions()
    }
}

impl StudyConfig {
    /// K0S → π⁺π⁻ matching study at the default reference x
    pub fn k0s_pions() -> Self {
        Self {
            name: "K0S-pions".to_string(),
            mother_pdg: PDG_K0S,
            decay_process: PROCESS_DECAY,
            min_daughter_abs_pdg: MIN_DAUGHTER_ABS_PDG,
            threshold: PdgThreshold::Inclusive,
            reference_x: REFERENCE_X,
            max_snp: MAX_SNP,
            max_step: MAX_STEP,
            material: MaterialCorrection::None,
            track_mass: M_PION,
        }
    }

    /// Reject settings that make the study meaningless
    pub fn validate(&self) -> Result<(), StudyError> {
        if !(self.max_snp > 0.0 && self.max_snp < 1.0) {
            return Err(StudyError::InvalidConfig(format!(
                "max_snp must lie in (0, 1), got {}",
                self.max_snp
            )));
        }
        if !(self.max_step > 0.0) {
            return Err(StudyError::InvalidConfig(format!(
                "max_step must be positive, got {}",
                self.max_step
            )));
        }
        if !(self.track_mass > 0.0) {
            return Err(StudyError::InvalidConfig(format!(
                "track_mass must be positive, got {}",
                self.track_mass
            )));
        }
        if !(self.reference_x > 0.0 && self.reference_x <= MAX_TRANSPORT_X) {
            return Err(StudyError::InvalidConfig(format!(
                "reference_x must lie in (0, {MAX_TRANSPORT_X}] cm, got {}",
                self.reference_x
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(3.0, 4.0, 12.0);
        let b = Vec3::new(1.0, 1.0, 1.0);

        assert!(((a + b).x - 4.0).abs() < 1e-12);
        assert!(((a - b).z - 11.0).abs() < 1e-12);
        assert!((a.perp() - 5.0).abs() < 1e-12);
        assert!((a.mag() - 13.0).abs() < 1e-12);
        assert!((a.dot(&b) - 19.0).abs() < 1e-12);
    }

    #[test]
    fn test_label_equality_is_per_event() {
        assert_eq!(Label::new(0, 5), Label::new(0, 5));
        assert_ne!(Label::new(0, 5), Label::new(1, 5));
        assert!(!Label::new(0, -1).is_valid());
    }

    #[test]
    fn test_track_from_global_roundtrip_position() {
        let pos = Vec3::new(3.0, 4.0, 1.5);
        let mom = Vec3::new(0.3, 0.4, 0.2);
        let t = TrackParams::from_global(pos, mom, -1);

        assert!((t.x - 5.0).abs() < 1e-12);
        assert!(t.y.abs() < 1e-12);
        assert!(t.snp.abs() < 1e-12); // radial momentum
        assert!((t.pt() - 0.5).abs() < 1e-12);
        assert_eq!(t.sign(), -1);

        let g = t.global_position();
        assert!((g.x - 3.0).abs() < 1e-12);
        assert!((g.y - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset_state() {
        let mut t = TrackParams::from_global(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 1);
        t.reset();
        assert_eq!(t, TrackParams::default());
        assert_eq!(t.q2pt, RESET_Q2PT);
        assert_eq!(t.x, 0.0);
    }

    #[test]
    fn test_threshold_modes() {
        assert!(PdgThreshold::Inclusive.accepts(120, 120));
        assert!(!PdgThreshold::Exclusive.accepts(120, 120));
        assert!(PdgThreshold::Exclusive.accepts(211, 120));
        assert!(!PdgThreshold::Inclusive.accepts(11, 120));
    }

    #[test]
    fn test_material_correction_parsing() {
        assert_eq!("LUT".parse::<MaterialCorrection>().unwrap(), MaterialCorrection::Lut);
        assert_eq!("tgeo".parse::<MaterialCorrection>().unwrap(), MaterialCorrection::Geometry);
        assert!("bogus".parse::<MaterialCorrection>().is_err());
    }

    #[test]
    fn test_config_preset_is_valid() {
        let cfg = StudyConfig::k0s_pions();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.mother_pdg, 310);

        let bad = StudyConfig { max_snp: 1.2, ..StudyConfig::k0s_pions() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_reference_x_must_be_reachable() {
        for x in [f64::NAN, f64::INFINITY, 0.0, -70.0, 1e9, MAX_TRANSPORT_X + 1.0] {
            let cfg = StudyConfig { reference_x: x, ..StudyConfig::k0s_pions() };
            assert!(cfg.validate().is_err(), "reference_x = {x}");
        }
        let edge = StudyConfig { reference_x: MAX_TRANSPORT_X, ..StudyConfig::k0s_pions() };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_track_finiteness() {
        let mut t = TrackParams::default();
        assert!(t.is_finite());
        t.y = f64::NAN;
        assert!(!t.is_finite());
        t.reset();
        assert!(t.is_finite());
    }
}
