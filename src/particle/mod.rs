//! # Particle Module
//!
//! Simulated particles and the truth filter that picks the decay products
//! whose reconstruction is studied.
//!
//! ## Daughter window
//!
//! Only the last daughter and its immediate predecessor are inspected. Low
//! energy secondaries (delta rays) produced along the mother's path are
//! stored ahead of the genuine decay products, so anchoring the window at
//! the last index skips them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Label, PdgThreshold, StudyConfig, Vec3};

/// A generator-level particle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedParticle {
    /// PDG species code
    pub pdg: i32,
    /// Production vertex (cm)
    pub vertex: Vec3,
    /// Momentum at production (GeV)
    pub momentum: Vec3,
    /// Production process code
    pub process: i32,
    /// Index of the first daughter, negative if none
    pub first_daughter: i32,
    /// Index of the last daughter, negative if none
    pub last_daughter: i32,
}

impl SimulatedParticle {
    /// Create a particle without daughters
    pub fn new(pdg: i32, vertex: Vec3, momentum: Vec3, process: i32) -> Self {
        Self {
            pdg,
            vertex,
            momentum,
            process,
            first_daughter: -1,
            last_daughter: -1,
        }
    }

    /// Attach a daughter index range
    pub fn with_daughters(mut self, first: i32, last: i32) -> Self {
        self.first_daughter = first;
        self.last_daughter = last;
        self
    }

    /// Transverse momentum (GeV)
    pub fn pt(&self) -> f64 {
        self.momentum.perp()
    }

    /// Transverse production radius (cm)
    pub fn production_radius(&self) -> f64 {
        self.vertex.perp()
    }

    /// Both daughter bounds are set
    pub fn has_daughters(&self) -> bool {
        self.first_daughter >= 0 && self.last_daughter >= 0
    }
}

/// A decay product selected for matching
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Index of the daughter within the event
    pub index: usize,
    /// Index of its mother within the event
    pub mother: usize,
    pub particle: &'a SimulatedParticle,
}

impl Candidate<'_> {
    /// Label a reconstructed track must carry to belong to this candidate
    pub fn label(&self, event: i32) -> Label {
        Label::new(event, self.index as i32)
    }
}

/// Truth-level selection of mothers and their decay products
#[derive(Debug, Clone, Copy)]
pub struct TruthFilter {
    pub mother_pdg: i32,
    pub decay_process: i32,
    pub min_abs_pdg: i32,
    pub threshold: PdgThreshold,
}

impl TruthFilter {
    pub fn new(mother_pdg: i32, decay_process: i32, min_abs_pdg: i32, threshold: PdgThreshold) -> Self {
        Self {
            mother_pdg,
            decay_process,
            min_abs_pdg,
            threshold,
        }
    }

    pub fn from_config(config: &StudyConfig) -> Self {
        Self::new(
            config.mother_pdg,
            config.decay_process,
            config.min_daughter_abs_pdg,
            config.threshold,
        )
    }

    /// Particles of the species of interest, whether or not they decayed
    pub fn mothers<'a>(
        &self,
        particles: &'a [SimulatedParticle],
    ) -> impl Iterator<Item = (usize, &'a SimulatedParticle)> + 'a {
        let pdg = self.mother_pdg;
        particles
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.pdg == pdg)
    }

    /// Whether a daughter passes the process and species cuts
    pub fn accepts_daughter(&self, daughter: &SimulatedParticle) -> bool {
        daughter.process == self.decay_process
            && self.threshold.accepts(daughter.pdg.abs(), self.min_abs_pdg)
    }

    /// Decay products of every mother in the event
    pub fn candidates<'a>(
        &self,
        particles: &'a [SimulatedParticle],
    ) -> impl Iterator<Item = Candidate<'a>> + 'a {
        let filter = *self;
        self.mothers(particles)
            .filter(|(idx, mother)| {
                if !mother.has_daughters() {
                    debug!(mother = idx, "no decay recorded, skipping");
                    return false;
                }
                true
            })
            .flat_map(move |(mother_idx, mother)| {
                let last = mother.last_daughter as i64;
                ((last - 1)..=last).filter_map(move |idau| {
                    if idau < 0 || idau as usize >= particles.len() {
                        debug!(mother = mother_idx, daughter = idau, "daughter index out of range");
                        return None;
                    }
                    let index = idau as usize;
                    let daughter = &particles[index];
                    filter.accepts_daughter(daughter).then_some(Candidate {
                        index,
                        mother: mother_idx,
                        particle: daughter,
                    })
                })
            })
    }
}
