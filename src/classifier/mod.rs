//! # Classifier Module
//!
//! Resolves each truth candidate against the three reconstruction streams.
//!
//! For every candidate the sequence is fixed:
//! 1. reset all track copies and flags
//! 2. look up the first stream, transport a hit to the reference x
//! 3. the same for the second stream
//! 4. look up the merged stream; afterburner hits are treated as absent
//! 5. emit the result
//!
//! Misses and transport failures are recorded, never raised.

use serde::Serialize;
use tracing::debug;

use crate::index::{LabelIndex, MergedTrack, TrackRecord};
use crate::particle::Candidate;
use crate::propagation::Propagator;
use crate::types::{Fidelity, Label, Stream, TrackParams, Vec3};

/// Per-event lookups for the three streams
#[derive(Debug)]
pub struct EventStreams<'a> {
    pub first: LabelIndex<'a, TrackParams>,
    pub second: LabelIndex<'a, TrackParams>,
    pub merged: LabelIndex<'a, MergedTrack>,
}

/// Outcome for one stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StreamMatch {
    /// A track with the candidate's label exists
    pub found: bool,
    /// The track was transported to the reference x
    pub reached_reference: bool,
    /// Track state after transport, default when not found
    pub track: TrackParams,
}

impl StreamMatch {
    /// Reconstructed pt, if the track exists and has a usable curvature
    pub fn reco_pt(&self) -> Option<f64> {
        if !self.found {
            return None;
        }
        let pt = self.track.pt();
        pt.is_finite().then_some(pt)
    }
}

/// Classification of one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub label: Label,
    pub pdg: i32,
    pub vertex: Vec3,
    pub momentum: Vec3,
    /// True transverse momentum (GeV)
    pub pt: f64,
    /// True production radius (cm)
    pub radius: f64,
    pub first: StreamMatch,
    pub second: StreamMatch,
    pub merged: StreamMatch,
    /// Fidelity of the merged match, genuine when absent
    pub merged_fidelity: Fidelity,
    /// A merged hit existed but came through the afterburner
    pub merged_rejected: bool,
}

impl ClassificationResult {
    pub fn stream(&self, stream: Stream) -> &StreamMatch {
        match stream {
            Stream::First => &self.first,
            Stream::Second => &self.second,
            Stream::Merged => &self.merged,
        }
    }

    pub fn found_in_both(&self) -> bool {
        self.first.found && self.second.found
    }

    pub fn merged_fake(&self) -> bool {
        self.merged.found && self.merged_fidelity.is_fake()
    }
}

/// Per-candidate matching against all streams
#[derive(Debug)]
pub struct Classifier<'p, P: Propagator> {
    propagator: &'p P,
    reference_x: f64,
}

impl<'p, P: Propagator> Classifier<'p, P> {
    pub fn new(propagator: &'p P, reference_x: f64) -> Self {
        Self {
            propagator,
            reference_x,
        }
    }

    /// Look up one stream and transport the hit
    fn resolve<R: TrackRecord>(&self, index: &LabelIndex<'_, R>, label: &Label) -> StreamMatch {
        match index.get(label) {
            Some(hit) => self.found(hit.record.params()),
            None => StreamMatch::default(),
        }
    }

    fn found(&self, params: &TrackParams) -> StreamMatch {
        let mut track = *params;
        let reached_reference = self.propagator.propagate_to_x(&mut track, self.reference_x);
        StreamMatch {
            found: true,
            reached_reference,
            track,
        }
    }

    /// Classify one candidate of `event`
    pub fn classify(&self, event: i32, candidate: &Candidate<'_>, streams: &EventStreams<'_>) -> ClassificationResult {
        let particle = candidate.particle;
        let label = candidate.label(event);

        // Everything starts absent, tracks at the reset state
        let mut merged = StreamMatch::default();
        let mut merged_fidelity = Fidelity::Genuine;
        let mut merged_rejected = false;

        let first = self.resolve(&streams.first, &label);
        let second = self.resolve(&streams.second, &label);

        if let Some(hit) = streams.merged.get(&label) {
            merged.track = *hit.record.params();
            if hit.record.is_afterburner() {
                // Afterburner associations are not counted as combined matches
                debug!(%label, "merged hit from afterburner, treated as absent");
                merged.track.reset();
                merged_rejected = true;
            } else {
                merged = self.found(&merged.track);
                merged_fidelity = hit.fidelity;
            }
        }

        debug!(
            %label,
            first = first.found,
            second = second.found,
            merged = merged.found,
            fake = merged_fidelity.is_fake(),
            "candidate classified"
        );

        ClassificationResult {
            label,
            pdg: particle.pdg,
            vertex: particle.vertex,
            momentum: particle.momentum,
            pt: particle.pt(),
            radius: particle.production_radius(),
            first,
            second,
            merged,
            merged_fidelity,
            merged_rejected,
        }
    }
}
