//! # Generator Module
//!
//! Toy Monte Carlo producing complete run directories: simulated K0S decays
//! together with first, second and merged track stores whose labels point
//! back at the simulated daughters.
//!
//! ## Event layout
//!
//! Each mother is followed by its products. An optional delta-ray electron
//! is stored ahead of the two pions, so the pions always occupy the last two
//! daughter slots:
//!
//! ```text
//! [K0S] [e⁻ (delta ray)]? [π⁺] [π⁻]
//! ```
//!
//! ## Decay kinematics
//!
//! Isotropic two-body decay in the rest frame, boosted along the mother's
//! momentum:
//!
//! p = p* + β̂ [(γ - 1)(p*·β̂) + γβE*]
//!
//! The decay length is exponential with mean cτ·βγ.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::*;
use crate::error::{Result, StudyError};
use crate::field::{FieldConfig, MagneticField};
use crate::index::MergedTrack;
use crate::io::{
    kine_file_name, write_json, write_kine, SimEvent, StoreEntry, TrackStore, FIRST_TRACKS_FILE, GRP_FILE,
    MERGED_TRACKS_FILE, SECOND_TRACKS_FILE,
};
use crate::particle::SimulatedParticle;
use crate::propagation::TrackPropagator;
use crate::types::{McLabel, TrackParams, TrackSource, Vec3};

/// Settings of the particle gun and the toy reconstruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GunConfig {
    pub seed: u64,
    /// Solenoid field written to the run parameters (kG)
    pub bz_kgauss: f64,
    /// Mothers per event are drawn uniformly from 1 to this
    pub max_mothers: usize,
    /// Mother pt range (GeV)
    pub pt_min: f64,
    pub pt_max: f64,
    /// Mother pseudorapidity is flat in ±eta_max
    pub eta_max: f64,
    /// Chance of a delta-ray electron ahead of the decay products
    pub delta_ray_probability: f64,

    /// Inner tracker acceptance: production radius below this (cm)
    pub first_max_radius: f64,
    pub first_efficiency: f64,
    /// Outer tracker acceptance: production radius below this (cm)
    pub second_max_radius: f64,
    pub second_efficiency: f64,
    /// Local x at which outer tracks are stored (cm)
    pub second_x: f64,
    /// Tracks below this pt are never reconstructed (GeV)
    pub min_track_pt: f64,

    /// Chance that a track found in both streams is matched
    pub match_efficiency: f64,
    /// Fraction of matches made by the afterburner
    pub afterburner_fraction: f64,
    /// Fraction of matches with a fake label
    pub fake_fraction: f64,
    /// Chance of an unlabelled noise track per event
    pub noise_probability: f64,

    /// Position resolution (cm) of the inner and outer tracker
    pub first_sigma_pos: f64,
    pub second_sigma_pos: f64,
    /// Angular resolution (snp, tgl)
    pub first_sigma_angle: f64,
    pub second_sigma_angle: f64,
    /// Relative q/pt resolution
    pub first_sigma_q2pt: f64,
    pub second_sigma_q2pt: f64,
}

impl Default for GunConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            bz_kgauss: -5.00668,
            max_mothers: 3,
            pt_min: 0.0,
            pt_max: 5.0,
            eta_max: 0.9,
            delta_ray_probability: 0.2,
            first_max_radius: 30.0,
            first_efficiency: 0.95,
            second_max_radius: 150.0,
            second_efficiency: 0.9,
            second_x: 85.0,
            min_track_pt: 0.1,
            match_efficiency: 0.9,
            afterburner_fraction: 0.05,
            fake_fraction: 0.03,
            noise_probability: 0.1,
            first_sigma_pos: 0.002,
            second_sigma_pos: 0.1,
            first_sigma_angle: 0.001,
            second_sigma_angle: 0.005,
            first_sigma_q2pt: 0.02,
            second_sigma_q2pt: 0.03,
        }
    }
}

impl GunConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.pt_max > self.pt_min && self.pt_min >= 0.0) {
            return Err(StudyError::InvalidConfig(format!(
                "empty pt range [{}, {})",
                self.pt_min, self.pt_max
            )));
        }
        if self.max_mothers == 0 {
            return Err(StudyError::InvalidConfig("max_mothers must be at least 1".into()));
        }
        if !(self.eta_max > 0.0) {
            return Err(StudyError::InvalidConfig("eta_max must be positive".into()));
        }
        let probabilities = [
            ("delta_ray_probability", self.delta_ray_probability),
            ("first_efficiency", self.first_efficiency),
            ("second_efficiency", self.second_efficiency),
            ("match_efficiency", self.match_efficiency),
            ("afterburner_fraction", self.afterburner_fraction),
            ("fake_fraction", self.fake_fraction),
            ("noise_probability", self.noise_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(StudyError::InvalidConfig(format!("{name} must lie in [0, 1], got {p}")));
            }
        }
        Ok(())
    }
}

/// One generated event with its reconstructed tracks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedEvent {
    pub sim: SimEvent,
    pub first: StoreEntry<TrackParams>,
    pub second: StoreEntry<TrackParams>,
    pub merged: StoreEntry<MergedTrack>,
}

/// Source of simulated events
pub trait EventGenerator {
    /// Produce event number `event`
    fn generate(&mut self, event: i32) -> GeneratedEvent;
}

/// Seeded K0S → π⁺π⁻ gun with a toy reconstruction
#[derive(Debug)]
pub struct ParticleGun {
    config: GunConfig,
    rng: StdRng,
    propagator: TrackPropagator,
}

impl ParticleGun {
    pub fn new(config: GunConfig) -> Result<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        let propagator = TrackPropagator::new(MagneticField::uniform(config.bz_kgauss));
        Ok(Self {
            config,
            rng,
            propagator,
        })
    }

    pub fn config(&self) -> &GunConfig {
        &self.config
    }

    /// Standard normal via Box-Muller
    fn normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen::<f64>().max(1e-300);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    /// Isotropic unit vector
    fn direction(&mut self) -> Vec3 {
        let cos_theta: f64 = self.rng.gen_range(-1.0..1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
        let phi: f64 = self.rng.gen_range(0.0..2.0 * std::f64::consts::PI);
        Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
    }

    fn mother_momentum(&mut self) -> Vec3 {
        let pt = self.rng.gen_range(self.config.pt_min..self.config.pt_max);
        let phi: f64 = self.rng.gen_range(0.0..2.0 * std::f64::consts::PI);
        let eta = self.rng.gen_range(-self.config.eta_max..self.config.eta_max);
        Vec3::new(pt * phi.cos(), pt * phi.sin(), pt * f64::sinh(eta))
    }

    /// Append one mother and its decay products, returning the pion indices
    fn add_decay(&mut self, particles: &mut Vec<SimulatedParticle>) -> [(usize, i32); 2] {
        let momentum = self.mother_momentum();
        let p = momentum.mag();
        let energy = (p * p + M_K0S * M_K0S).sqrt();
        let u: f64 = self.rng.gen::<f64>().max(1e-300);
        let decay_length = -u.ln() * CTAU_K0S * p / M_K0S;
        let vertex = if p > 0.0 { momentum * (decay_length / p) } else { Vec3::zero() };

        let mother_index = particles.len();
        particles.push(SimulatedParticle::new(PDG_K0S, Vec3::zero(), momentum, PROCESS_PRIMARY));

        let first_daughter = particles.len() as i32;
        if self.chance(self.config.delta_ray_probability) {
            // Knock-on electron somewhere along the flight path
            let along: f64 = self.rng.gen();
            let kick = self.direction() * 0.005;
            particles.push(SimulatedParticle::new(
                PDG_ELECTRON,
                vertex * along,
                kick,
                PROCESS_DELTA_RAY,
            ));
        }

        // Rest-frame momentum of each pion
        let p_star = (0.25 * M_K0S * M_K0S - M_PION * M_PION).sqrt();
        let e_star = 0.5 * M_K0S;
        let q = self.direction() * p_star;
        let beta = momentum * (1.0 / energy);
        let gamma = energy / M_K0S;
        let beta2 = beta.mag_squared();
        let boost = |q: Vec3| -> Vec3 {
            if beta2 == 0.0 {
                return q;
            }
            let bq = beta.dot(&q);
            q + beta * ((gamma - 1.0) * bq / beta2 + gamma * e_star)
        };

        let pos_index = particles.len();
        particles.push(SimulatedParticle::new(PDG_PION, vertex, boost(q), PROCESS_DECAY));
        let neg_index = particles.len();
        particles.push(SimulatedParticle::new(-PDG_PION, vertex, boost(q * -1.0), PROCESS_DECAY));

        let mother = &mut particles[mother_index];
        mother.first_daughter = first_daughter;
        mother.last_daughter = neg_index as i32;

        debug!(
            mother = mother_index,
            pt = momentum.perp(),
            radius = vertex.perp(),
            "K0S generated"
        );
        [(pos_index, 1), (neg_index, -1)]
    }

    fn smear(&mut self, track: &mut TrackParams, sigma_pos: f64, sigma_angle: f64, sigma_q2pt: f64) {
        track.y += sigma_pos * self.normal();
        track.z += sigma_pos * self.normal();
        track.snp = (track.snp + sigma_angle * self.normal()).clamp(-0.99, 0.99);
        track.tgl += sigma_angle * self.normal();
        track.q2pt *= 1.0 + sigma_q2pt * self.normal();
    }

    /// Toy reconstruction of one charged daughter
    fn reconstruct(&mut self, event: i32, index: usize, charge: i32, daughter: &SimulatedParticle, out: &mut GeneratedEvent) {
        let c = self.config.clone();
        let truth = TrackParams::from_global(daughter.vertex, daughter.momentum, charge);
        let radius = daughter.production_radius();
        let label = McLabel::new(event, index as i32, false);
        if daughter.pt() < c.min_track_pt {
            return;
        }

        let mut first = None;
        if radius < c.first_max_radius && self.chance(c.first_efficiency) {
            let mut t = truth;
            self.smear(&mut t, c.first_sigma_pos, c.first_sigma_angle, c.first_sigma_q2pt);
            out.first.push(t, label);
            first = Some(t);
        }

        let mut second = None;
        if radius < c.second_max_radius && self.chance(c.second_efficiency) {
            let x = c.second_x.max(truth.x);
            if let Ok(mut t) = self.propagator.transport(&truth, x) {
                self.smear(&mut t, c.second_sigma_pos, c.second_sigma_angle, c.second_sigma_q2pt);
                out.second.push(t, label);
                second = Some(t);
            }
        }

        if let (Some(t), Some(_)) = (first, second) {
            if self.chance(c.match_efficiency) {
                let source = if self.chance(c.afterburner_fraction) {
                    TrackSource::Afterburner
                } else {
                    TrackSource::Standard
                };
                let fake = self.chance(c.fake_fraction);
                out.merged
                    .push(MergedTrack::new(t, source), McLabel::new(event, index as i32, fake));
            }
        }
    }
}

impl EventGenerator for ParticleGun {
    fn generate(&mut self, event: i32) -> GeneratedEvent {
        let mut out = GeneratedEvent::default();
        let mut particles = Vec::new();
        let n_mothers = self.rng.gen_range(1..=self.config.max_mothers);

        let mut pions = Vec::with_capacity(2 * n_mothers);
        for _ in 0..n_mothers {
            pions.extend(self.add_decay(&mut particles));
        }
        for (index, charge) in pions {
            let daughter = particles[index].clone();
            self.reconstruct(event, index, charge, &daughter, &mut out);
        }

        if self.chance(self.config.noise_probability) {
            let mut noise = TrackParams::from_global(
                Vec3::new(self.rng.gen_range(2.0..20.0), 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                1,
            );
            self.smear(&mut noise, 1.0, 0.1, 0.5);
            out.first.push(noise, McLabel::new(event, -1, false));
        }

        out.sim.particles = particles;
        out
    }
}

/// A complete generated run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToyRun {
    pub bz_kgauss: f64,
    pub events: Vec<SimEvent>,
    pub first: StoreEntry<TrackParams>,
    pub second: StoreEntry<TrackParams>,
    pub merged: StoreEntry<MergedTrack>,
}

impl ToyRun {
    /// Generate `n_events` events
    pub fn generate(generator: &mut impl EventGenerator, bz_kgauss: f64, n_events: usize) -> Self {
        let mut run = Self {
            bz_kgauss,
            ..Self::default()
        };
        for event in 0..n_events {
            let generated = generator.generate(event as i32);
            run.events.push(generated.sim);
            extend(&mut run.first, generated.first);
            extend(&mut run.second, generated.second);
            extend(&mut run.merged, generated.merged);
        }
        info!(
            events = run.events.len(),
            first = run.first.len(),
            second = run.second.len(),
            merged = run.merged.len(),
            "toy run generated"
        );
        run
    }

    /// Write the run directory for simulation `index`
    pub fn write(&self, dir: &Path, index: u32) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        write_kine(&dir.join(kine_file_name(index)), &self.events)?;
        write_json(&dir.join(GRP_FILE), &FieldConfig::new(self.bz_kgauss))?;
        write_json(&dir.join(FIRST_TRACKS_FILE), &TrackStore::from(self.first.clone()))?;
        write_json(&dir.join(SECOND_TRACKS_FILE), &TrackStore::from(self.second.clone()))?;
        write_json(&dir.join(MERGED_TRACKS_FILE), &TrackStore::from(self.merged.clone()))?;
        info!(dir = %dir.display(), index, "run directory written");
        Ok(())
    }
}

fn extend<R>(into: &mut StoreEntry<R>, from: StoreEntry<R>) {
    into.tracks.extend(from.tracks);
    into.labels.extend(from.labels);
}
