//! # MATCHSTUDY-RS
//!
//! Track matching study for a two-tracker barrel: how often the decay
//! daughters of a chosen species are reconstructed in the inner tracker, the
//! outer tracker and the combined (merged) stream, and how well the two
//! individual tracks agree at a common reference radius.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                              MATCHSTUDY-RS                                  │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  io           run directory: kinematics, track stores, run parameters       │
//! │  particle     truth filter: mothers → last two decay products               │
//! │  index        label → track lookup per stream and event                     │
//! │  propagation  helix transport to the reference x (+ material)               │
//! │  classifier   per-candidate found / reached / fidelity                      │
//! │  stats        counters, residuals, resolution, efficiencies                 │
//! │  study        event loop driver                                             │
//! │  generator    seeded toy runs                                               │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Units
//!
//! | Quantity  | Unit |
//! |-----------|------|
//! | length    | cm   |
//! | momentum  | GeV  |
//! | field     | kG   |
//!
//! Processing is sequential and deterministic: identical inputs give
//! byte-identical output.

pub mod constants;
pub mod error;
pub mod types;
pub mod particle;
pub mod field;
pub mod geometry;
pub mod materials;
pub mod propagation;
pub mod index;
pub mod classifier;
pub mod stats;
pub mod io;
pub mod study;
pub mod generator;

// Re-exports
pub use constants::*;
pub use error::StudyError;
pub use types::*;
pub use classifier::{ClassificationResult, Classifier};
pub use generator::{EventGenerator, ParticleGun};
pub use propagation::{Propagator, TrackPropagator};
pub use stats::{MatchStatistics, StudyOutput};
pub use study::MatchingStudy;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short description of the tool
pub fn info() -> String {
    format!(
        "MATCHSTUDY-RS v{}\n\
         Inner/outer tracker matching study\n\
         Deterministic, single-threaded",
        VERSION
    )
}
