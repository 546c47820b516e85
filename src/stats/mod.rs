//! # Statistics Module
//!
//! Accumulates classification results into counting histograms, residual
//! distributions and momentum-resolution maps, one output row per candidate.
//!
//! ## Filling rules
//!
//! | set                         | filled when                               |
//! |-----------------------------|-------------------------------------------|
//! | generated                   | every candidate                           |
//! | first / second / merged     | the stream found the candidate            |
//! | first_and_second            | found in both individual streams          |
//! | merged_fake                 | merged match with fake fidelity           |
//! | residuals both              | found in both individual streams          |
//! | residuals merged_{genuine,fake} | merged match                          |
//! | resolution                  | found and reconstructed pt is finite      |
//!
//! Residuals are always second − first, evaluated on the transported states.
//! An absent individual track contributes its reset state.

pub mod efficiency;
pub mod histogram;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::{ClassificationResult, StreamMatch};
use crate::constants::*;
use crate::types::{Label, Stream, TrackParams, Vec3};

pub use efficiency::{binomial, EfficiencyCurve};
pub use histogram::{Axis, AxisBin, Histogram1D, Histogram2D};

/// Presence counters against true pt and production radius
#[derive(Debug, Clone, PartialEq)]
pub struct StreamCounters {
    pub pt: Histogram1D,
    pub radius: Histogram1D,
    pub pt_radius: Histogram2D,
}

impl StreamCounters {
    pub fn new() -> Self {
        let pt = Axis::from_tuple(PT_AXIS);
        let radius = Axis::from_tuple(RADIUS_AXIS);
        Self {
            pt: Histogram1D::new(pt),
            radius: Histogram1D::new(radius),
            pt_radius: Histogram2D::new(pt, radius),
        }
    }

    pub fn fill(&mut self, pt: f64, radius: f64) {
        self.pt.fill(pt);
        self.radius.fill(radius);
        self.pt_radius.fill(pt, radius);
    }

    pub fn entries(&self) -> u64 {
        self.pt.entries
    }
}

impl Default for StreamCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Distributions of the parameter differences between two tracks
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualSet {
    pub y: Histogram1D,
    pub z: Histogram1D,
    pub tgl: Histogram1D,
    pub snp: Histogram1D,
    pub q2pt: Histogram1D,
}

impl ResidualSet {
    pub fn new() -> Self {
        let h = || Histogram1D::new(Axis::from_tuple(RESIDUAL_AXIS));
        Self {
            y: h(),
            z: h(),
            tgl: h(),
            snp: h(),
            q2pt: h(),
        }
    }

    /// Fill with `b - a`
    pub fn fill(&mut self, a: &TrackParams, b: &TrackParams) {
        self.y.fill(b.y - a.y);
        self.z.fill(b.z - a.z);
        self.tgl.fill(b.tgl - a.tgl);
        self.snp.fill(b.snp - a.snp);
        self.q2pt.fill(b.q2pt - a.q2pt);
    }

    pub fn entries(&self) -> u64 {
        self.y.entries
    }

    fn named(&self) -> [(&'static str, &Histogram1D); 5] {
        [
            ("y", &self.y),
            ("z", &self.z),
            ("tgl", &self.tgl),
            ("snp", &self.snp),
            ("q2pt", &self.q2pt),
        ]
    }
}

impl Default for ResidualSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Reconstructed minus true pt against true pt
fn resolution_map() -> Histogram2D {
    Histogram2D::new(Axis::from_tuple(PT_AXIS), Axis::from_tuple(PT_RESOLUTION_AXIS))
}

/// One output row per candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRow {
    pub label: Label,
    pub pdg: i32,
    pub vertex: Vec3,
    pub momentum: Vec3,
    pub found_first: bool,
    pub found_second: bool,
    pub found_merged: bool,
    pub reference_first: bool,
    pub reference_second: bool,
    pub reference_merged: bool,
    pub merged_fake: bool,
    pub first: TrackParams,
    pub second: TrackParams,
    pub merged: TrackParams,
}

impl From<&ClassificationResult> for ParticleRow {
    fn from(r: &ClassificationResult) -> Self {
        Self {
            label: r.label,
            pdg: r.pdg,
            vertex: r.vertex,
            momentum: r.momentum,
            found_first: r.first.found,
            found_second: r.second.found,
            found_merged: r.merged.found,
            reference_first: r.first.reached_reference,
            reference_second: r.second.reached_reference,
            reference_merged: r.merged.reached_reference,
            merged_fake: r.merged_fake(),
            first: r.first.track,
            second: r.second.track,
            merged: r.merged.track,
        }
    }
}

/// Run-level counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub events: u64,
    pub mothers: u64,
    pub candidates: u64,
    pub found_first: u64,
    pub found_second: u64,
    pub found_both: u64,
    pub found_merged: u64,
    pub reference_first: u64,
    pub reference_second: u64,
    pub reference_merged: u64,
    pub merged_fake: u64,
    pub afterburner_rejected: u64,
}

impl RunSummary {
    fn record(&mut self, r: &ClassificationResult) {
        self.candidates += 1;
        let count = |m: &StreamMatch, found: &mut u64, reached: &mut u64| {
            *found += m.found as u64;
            *reached += m.reached_reference as u64;
        };
        count(&r.first, &mut self.found_first, &mut self.reference_first);
        count(&r.second, &mut self.found_second, &mut self.reference_second);
        count(&r.merged, &mut self.found_merged, &mut self.reference_merged);
        self.found_both += r.found_in_both() as u64;
        self.merged_fake += r.merged_fake() as u64;
        self.afterburner_rejected += r.merged_rejected as u64;
    }

    /// Log the counts and integrated efficiencies
    pub fn log(&self) {
        let eff = |k| binomial(k, self.candidates).0;
        info!(
            events = self.events,
            mothers = self.mothers,
            candidates = self.candidates,
            "run summary"
        );
        info!(
            first = self.found_first,
            second = self.found_second,
            both = self.found_both,
            merged = self.found_merged,
            merged_fake = self.merged_fake,
            afterburner_rejected = self.afterburner_rejected,
            "found per stream"
        );
        info!(
            first = eff(self.found_first),
            second = eff(self.found_second),
            merged = eff(self.found_merged),
            "efficiency"
        );
    }
}

/// Complete study output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyOutput {
    pub summary: RunSummary,
    pub rows: Vec<ParticleRow>,
    pub histograms1d: BTreeMap<String, Histogram1D>,
    pub histograms2d: BTreeMap<String, Histogram2D>,
    pub efficiencies: BTreeMap<String, EfficiencyCurve>,
}

/// Accumulator owned by the study driver
#[derive(Debug, Clone, PartialEq)]
pub struct MatchStatistics {
    pub summary: RunSummary,
    pub event_counter: Histogram1D,
    pub mother_pt: Histogram1D,
    pub generated: StreamCounters,
    pub first: StreamCounters,
    pub second: StreamCounters,
    pub first_and_second: StreamCounters,
    pub merged: StreamCounters,
    pub merged_fake: StreamCounters,
    pub residuals: ResidualSet,
    pub merged_genuine_residuals: ResidualSet,
    pub merged_fake_residuals: ResidualSet,
    pub resolution_first: Histogram2D,
    pub resolution_second: Histogram2D,
    pub resolution_merged: Histogram2D,
    pub resolution_merged_fake: Histogram2D,
    pub rows: Vec<ParticleRow>,
}

impl MatchStatistics {
    pub fn new() -> Self {
        Self {
            summary: RunSummary::default(),
            event_counter: Histogram1D::new(Axis::new(1, 0.0, 1.0)),
            mother_pt: Histogram1D::new(Axis::from_tuple(PT_AXIS)),
            generated: StreamCounters::new(),
            first: StreamCounters::new(),
            second: StreamCounters::new(),
            first_and_second: StreamCounters::new(),
            merged: StreamCounters::new(),
            merged_fake: StreamCounters::new(),
            residuals: ResidualSet::new(),
            merged_genuine_residuals: ResidualSet::new(),
            merged_fake_residuals: ResidualSet::new(),
            resolution_first: resolution_map(),
            resolution_second: resolution_map(),
            resolution_merged: resolution_map(),
            resolution_merged_fake: resolution_map(),
            rows: Vec::new(),
        }
    }

    pub fn record_event(&mut self) {
        self.summary.events += 1;
        self.event_counter.fill(0.5);
    }

    /// A particle of the species of interest, decayed or not
    pub fn record_mother(&mut self, pt: f64) {
        self.summary.mothers += 1;
        self.mother_pt.fill(pt);
    }

    /// Presence counters for one stream
    pub fn counters(&self, stream: Stream) -> &StreamCounters {
        match stream {
            Stream::First => &self.first,
            Stream::Second => &self.second,
            Stream::Merged => &self.merged,
        }
    }

    /// Accumulate one classified candidate
    pub fn record(&mut self, r: &ClassificationResult) {
        let (pt, radius) = (r.pt, r.radius);
        self.summary.record(r);
        self.generated.fill(pt, radius);

        if r.first.found {
            self.first.fill(pt, radius);
        }
        if r.second.found {
            self.second.fill(pt, radius);
        }
        if r.found_in_both() {
            self.first_and_second.fill(pt, radius);
            self.residuals.fill(&r.first.track, &r.second.track);
        }
        if r.merged.found {
            self.merged.fill(pt, radius);
            if r.merged_fake() {
                self.merged_fake.fill(pt, radius);
            }
            let set = if r.merged_fake() {
                &mut self.merged_fake_residuals
            } else {
                &mut self.merged_genuine_residuals
            };
            set.fill(&r.first.track, &r.second.track);
        }

        let resolve = |map: &mut Histogram2D, m: &StreamMatch| {
            if let Some(reco) = m.reco_pt() {
                map.fill(pt, reco - pt);
            }
        };
        resolve(&mut self.resolution_first, &r.first);
        resolve(&mut self.resolution_second, &r.second);
        if r.merged_fake() {
            resolve(&mut self.resolution_merged_fake, &r.merged);
        } else {
            resolve(&mut self.resolution_merged, &r.merged);
        }

        self.rows.push(ParticleRow::from(r));
    }

    /// Named one-dimensional histograms
    pub fn histograms1d(&self) -> BTreeMap<String, Histogram1D> {
        let mut out = BTreeMap::new();
        out.insert("event_counter".to_string(), self.event_counter.clone());
        out.insert("mother_pt".to_string(), self.mother_pt.clone());
        for (name, c) in self.counter_sets() {
            out.insert(format!("{name}_pt"), c.pt.clone());
            out.insert(format!("{name}_radius"), c.radius.clone());
        }
        for (set_name, set) in [
            ("residual", &self.residuals),
            ("residual_merged_genuine", &self.merged_genuine_residuals),
            ("residual_merged_fake", &self.merged_fake_residuals),
        ] {
            for (var, h) in set.named() {
                out.insert(format!("{set_name}_{var}"), h.clone());
            }
        }
        out
    }

    /// Named two-dimensional histograms
    pub fn histograms2d(&self) -> BTreeMap<String, Histogram2D> {
        let mut out = BTreeMap::new();
        for (name, c) in self.counter_sets() {
            out.insert(format!("{name}_pt_radius"), c.pt_radius.clone());
        }
        out.insert("resolution_first".to_string(), self.resolution_first.clone());
        out.insert("resolution_second".to_string(), self.resolution_second.clone());
        out.insert("resolution_merged".to_string(), self.resolution_merged.clone());
        out.insert("resolution_merged_fake".to_string(), self.resolution_merged_fake.clone());
        out
    }

    /// Found over generated, per set and axis
    pub fn efficiencies(&self) -> BTreeMap<String, EfficiencyCurve> {
        let mut out = BTreeMap::new();
        for (name, c) in self.counter_sets() {
            if name == "generated" {
                continue;
            }
            out.insert(
                format!("{name}_vs_pt"),
                EfficiencyCurve::from_histograms(&c.pt, &self.generated.pt),
            );
            out.insert(
                format!("{name}_vs_radius"),
                EfficiencyCurve::from_histograms(&c.radius, &self.generated.radius),
            );
        }
        out
    }

    fn counter_sets(&self) -> Vec<(&'static str, &StreamCounters)> {
        let mut sets = vec![("generated", &self.generated)];
        sets.extend(Stream::ALL.iter().map(|&s| (s.name(), self.counters(s))));
        sets.push(("first_and_second", &self.first_and_second));
        sets.push(("merged_fake", &self.merged_fake));
        sets
    }

    /// Finalise into the output document
    pub fn into_output(self) -> StudyOutput {
        StudyOutput {
            histograms1d: self.histograms1d(),
            histograms2d: self.histograms2d(),
            efficiencies: self.efficiencies(),
            summary: self.summary,
            rows: self.rows,
        }
    }
}

impl Default for MatchStatistics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fidelity;

    fn matched(y: f64, q2pt: f64, reached: bool) -> StreamMatch {
        StreamMatch {
            found: true,
            reached_reference: reached,
            track: TrackParams {
                x: REFERENCE_X,
                y,
                q2pt,
                ..TrackParams::default()
            },
        }
    }

    fn result(first: StreamMatch, second: StreamMatch, merged: StreamMatch, fidelity: Fidelity) -> ClassificationResult {
        ClassificationResult {
            label: Label::new(0, 1),
            pdg: PDG_PION,
            vertex: Vec3::new(3.0, 4.0, 0.0),
            momentum: Vec3::new(1.0, 0.0, 0.0),
            pt: 1.0,
            radius: 5.0,
            first,
            second,
            merged,
            merged_fidelity: fidelity,
            merged_rejected: false,
        }
    }

    #[test]
    fn test_all_found_genuine() {
        let mut stats = MatchStatistics::new();
        let r = result(
            matched(0.1, 1.0 / 1.1, true),
            matched(0.4, 1.0 / 1.05, true),
            matched(0.3, 1.0 / 0.98, true),
            Fidelity::Genuine,
        );
        stats.record(&r);

        for counters in [&stats.generated, &stats.first, &stats.second, &stats.first_and_second, &stats.merged] {
            assert_eq!(counters.entries(), 1);
            assert_eq!(counters.pt_radius.integral(), 1);
        }
        assert_eq!(stats.merged_fake.entries(), 0);
        assert_eq!(stats.residuals.entries(), 1);
        assert!((stats.residuals.y.mean() - 0.3).abs() < 1e-9);
        assert_eq!(stats.merged_genuine_residuals.entries(), 1);
        assert_eq!(stats.merged_fake_residuals.entries(), 0);
        assert_eq!(stats.resolution_first.integral(), 1);
        assert_eq!(stats.resolution_merged.integral(), 1);
        assert_eq!(stats.resolution_merged_fake.entries, 0);
        assert_eq!(stats.rows.len(), 1);
        assert!(!stats.rows[0].merged_fake);
        assert_eq!(stats.summary.found_both, 1);
    }

    #[test]
    fn test_fake_merged_fills_fake_sets() {
        let mut stats = MatchStatistics::new();
        let r = result(
            matched(0.1, 1.0, true),
            matched(0.2, 1.0, true),
            matched(0.2, 1.0, true),
            Fidelity::Fake,
        );
        stats.record(&r);

        assert_eq!(stats.merged.entries(), 1);
        assert_eq!(stats.merged_fake.entries(), 1);
        assert_eq!(stats.merged_fake_residuals.entries(), 1);
        assert_eq!(stats.merged_genuine_residuals.entries(), 0);
        assert_eq!(stats.resolution_merged_fake.entries, 1);
        assert_eq!(stats.resolution_merged.entries, 0);
        assert!(stats.rows[0].merged_fake);
        assert_eq!(stats.summary.merged_fake, 1);
    }

    #[test]
    fn test_both_without_merged() {
        let mut stats = MatchStatistics::new();
        let r = result(
            matched(0.1, 1.0, true),
            matched(0.2, 1.0, false),
            StreamMatch::default(),
            Fidelity::Genuine,
        );
        stats.record(&r);

        assert_eq!(stats.residuals.entries(), 1);
        assert_eq!(stats.merged_genuine_residuals.entries(), 0);
        assert_eq!(stats.merged_fake_residuals.entries(), 0);
        assert_eq!(stats.merged.entries(), 0);
        assert_eq!(stats.summary.reference_second, 0);
        assert_eq!(stats.summary.reference_first, 1);
    }

    #[test]
    fn test_merged_without_second_still_fills_residuals() {
        let mut stats = MatchStatistics::new();
        let r = result(
            matched(0.1, 1.0, true),
            StreamMatch::default(),
            matched(0.2, 1.0, true),
            Fidelity::Genuine,
        );
        stats.record(&r);
        assert_eq!(stats.merged.entries(), 1);
        assert_eq!(stats.residuals.entries(), 0);
        assert_eq!(stats.merged_genuine_residuals.entries(), 1);
        assert_eq!(stats.merged_fake_residuals.entries(), 0);
        // Absent second track sits at the reset state
        assert!((stats.merged_genuine_residuals.y.mean() + 0.1).abs() < 1e-9);
        assert!((stats.merged_genuine_residuals.q2pt.mean() - (RESET_Q2PT - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_fake_merged_without_individual_tracks() {
        let mut stats = MatchStatistics::new();
        let r = result(
            StreamMatch::default(),
            StreamMatch::default(),
            matched(0.2, 1.0, true),
            Fidelity::Fake,
        );
        stats.record(&r);
        assert_eq!(stats.merged_fake_residuals.entries(), 1);
        assert_eq!(stats.merged_fake_residuals.y.mean(), 0.0);
        assert_eq!(stats.merged_genuine_residuals.entries(), 0);
    }

    #[test]
    fn test_resolution_requires_finite_pt() {
        let mut stats = MatchStatistics::new();
        let r = result(
            matched(0.0, 0.0, false),
            StreamMatch::default(),
            StreamMatch::default(),
            Fidelity::Genuine,
        );
        stats.record(&r);
        assert_eq!(stats.first.entries(), 1);
        assert_eq!(stats.resolution_first.entries, 0);
        assert_eq!(stats.resolution_second.entries, 0);
    }

    #[test]
    fn test_output_names_and_efficiency() {
        let mut stats = MatchStatistics::new();
        stats.record_event();
        stats.record_mother(2.0);
        stats.record(&result(
            matched(0.1, 1.0, true),
            StreamMatch::default(),
            StreamMatch::default(),
            Fidelity::Genuine,
        ));
        let out = stats.into_output();

        assert_eq!(out.histograms1d["event_counter"].content(0), 1);
        assert_eq!(out.histograms1d["mother_pt"].entries, 1);
        assert!(out.histograms1d.contains_key("residual_merged_fake_q2pt"));
        assert!(out.histograms2d.contains_key("first_and_second_pt_radius"));
        assert_eq!(out.histograms2d.len(), 10);

        let eff = &out.efficiencies["first_vs_pt"];
        assert_eq!(eff.overall(), (1.0, 0.0));
        assert_eq!(out.efficiencies["second_vs_radius"].overall().0, 0.0);
        assert!(!out.efficiencies.contains_key("generated_vs_pt"));
    }
}
