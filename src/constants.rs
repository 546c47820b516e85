//! # Constants
//!
//! Units follow the reconstruction conventions: cm, GeV, kGauss.

// ============================================================================
// FIELD & TRANSPORT
// ============================================================================

/// Conversion from q/pt × Bz to curvature (1/cm per kG per c/GeV)
pub const B2C: f64 = -0.299_792_458e-3;

/// Default reference x in the local frame (cm)
pub const REFERENCE_X: f64 = 70.0;

/// Largest |x| a transport may start from or aim at (cm)
pub const MAX_TRANSPORT_X: f64 = 500.0;

/// Largest |sin(phi)| a track may reach while being transported
pub const MAX_SNP: f64 = 0.9;

/// Largest single transport step (cm)
pub const MAX_STEP: f64 = 2.0;

/// Residual |dx| below which the target is considered reached (cm)
pub const X_EPSILON: f64 = 1e-5;

/// Values closer to ±1 than this are treated as unit sine
pub const ALMOST_ONE: f64 = 1.0 - 1e-6;

/// Values with magnitude below this are treated as zero
pub const ALMOST_ZERO: f64 = 1e-12;

/// Above this |curvature × dx| the arc length is computed exactly
pub const ARC_THRESHOLD: f64 = 0.05;

/// Largest fraction of the energy a single material step may remove
pub const MAX_ELOSS_FRACTION: f64 = 0.3;

/// q/pt of a reset track (c/GeV)
pub const RESET_Q2PT: f64 = 1e-6;

// ============================================================================
// PARTICLES
// ============================================================================

/// PDG code of K0S
pub const PDG_K0S: i32 = 310;

/// PDG code of a positive pion
pub const PDG_PION: i32 = 211;

/// PDG code of an electron
pub const PDG_ELECTRON: i32 = 11;

/// Production process code for decay products
pub const PROCESS_DECAY: i32 = 4;

/// Production process code for delta-ray electrons
pub const PROCESS_DELTA_RAY: i32 = 9;

/// Production process code for primaries
pub const PROCESS_PRIMARY: i32 = 0;

/// Daughters lighter than this |pdg| are dropped
pub const MIN_DAUGHTER_ABS_PDG: i32 = 120;

/// Charged pion mass (GeV)
pub const M_PION: f64 = 0.139_570_39;

/// K0S mass (GeV)
pub const M_K0S: f64 = 0.497_611;

/// Electron mass (GeV)
pub const M_ELECTRON: f64 = 0.510_998_95e-3;

/// K0S proper decay length cτ (cm)
pub const CTAU_K0S: f64 = 2.6844;

// ============================================================================
// HISTOGRAM BINNING
// ============================================================================

/// True transverse momentum axis: bins, low, high (GeV)
pub const PT_AXIS: (usize, f64, f64) = (100, 0.0, 10.0);

/// Production radius axis: bins, low, high (cm)
pub const RADIUS_AXIS: (usize, f64, f64) = (200, 0.0, 50.0);

/// Residual axis shared by all five parameter differences
pub const RESIDUAL_AXIS: (usize, f64, f64) = (1000, -20.0, 20.0);

/// Reco minus true pt axis (GeV)
pub const PT_RESOLUTION_AXIS: (usize, f64, f64) = (40, -1.0, 1.0);

// ============================================================================
// MATERIAL (Bethe-Bloch solid parametrisation)
// ============================================================================

/// Bethe-Bloch K/A for Z/A = 0.5 (GeV cm²/g)
pub const BB_K: f64 = 0.307_075e-3;

/// Density-effect parameters for silicon-like material
pub const BB_RHO: f64 = 2.33;
pub const BB_X0: f64 = 0.20;
pub const BB_X1: f64 = 3.00;
/// Mean excitation energy (GeV)
pub const BB_MEAN_EXCITATION: f64 = 173e-9;
/// Z/A
pub const BB_Z_OVER_A: f64 = 0.49848;
