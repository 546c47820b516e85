//! # Study Module
//!
//! Driver that runs the matching study over a run directory: events outer,
//! candidates inner, single threaded.

use tracing::{debug, info};

use crate::classifier::{Classifier, EventStreams};
use crate::error::Result;
use crate::field::MagneticField;
use crate::index::LabelIndex;
use crate::io::RunInputs;
use crate::particle::{SimulatedParticle, TruthFilter};
use crate::propagation::TrackPropagator;
use crate::stats::{MatchStatistics, StudyOutput};
use crate::types::StudyConfig;

/// Matching study over a sequence of events
#[derive(Debug)]
pub struct MatchingStudy {
    /// Configuration
    pub config: StudyConfig,
    filter: TruthFilter,
    propagator: TrackPropagator,
    stats: MatchStatistics,
}

impl MatchingStudy {
    /// Create a study for a validated configuration
    pub fn new(config: StudyConfig, field: MagneticField) -> Result<Self> {
        config.validate()?;
        let filter = TruthFilter::from_config(&config);
        let propagator = TrackPropagator::from_config(field, &config);
        info!(
            preset = %config.name,
            reference_x = config.reference_x,
            material = ?config.material,
            threshold = ?config.threshold,
            "matching study configured"
        );
        Ok(Self {
            config,
            filter,
            propagator,
            stats: MatchStatistics::new(),
        })
    }

    /// K0S study with the default settings
    pub fn k0s_pions(field: MagneticField) -> Result<Self> {
        Self::new(StudyConfig::k0s_pions(), field)
    }

    /// Classify and accumulate every candidate of one event
    pub fn process_event(&mut self, event: i32, particles: &[SimulatedParticle], streams: &EventStreams<'_>) {
        self.stats.record_event();

        for (_, mother) in self.filter.mothers(particles) {
            self.stats.record_mother(mother.pt());
        }

        let classifier = Classifier::new(&self.propagator, self.config.reference_x);
        let mut n = 0usize;
        for candidate in self.filter.candidates(particles) {
            let result = classifier.classify(event, &candidate, streams);
            self.stats.record(&result);
            n += 1;
        }
        debug!(event, candidates = n, "event processed");
    }

    /// Accumulated statistics so far
    pub fn statistics(&self) -> &MatchStatistics {
        &self.stats
    }

    /// Log the summary and build the output document
    pub fn finish(self) -> StudyOutput {
        self.stats.summary.log();
        self.stats.into_output()
    }

    /// Run over every event of a run directory
    pub fn run(mut self, inputs: &RunInputs) -> Result<StudyOutput> {
        info!(
            dir = %inputs.dir.display(),
            first = inputs.first.len(),
            second = inputs.second.len(),
            merged = inputs.merged.len(),
            "track stores loaded"
        );

        for (i, event) in inputs.events()?.enumerate() {
            let event = event?;
            let id = i as i32;
            info!(event = id, particles = event.particles.len(), "processing event");

            let streams = event_streams(inputs, id)?;
            self.process_event(id, &event.particles, &streams);
        }

        Ok(self.finish())
    }
}

/// Per-event label lookups over the tracks of that event only
pub fn event_streams(inputs: &RunInputs, event: i32) -> Result<EventStreams<'_>> {
    let (first, second, merged) = (
        inputs.first.event(event),
        inputs.second.event(event),
        inputs.merged.event(event),
    );
    Ok(EventStreams {
        first: LabelIndex::build("first", event, &first.tracks, &first.labels)?,
        second: LabelIndex::build("second", event, &second.tracks, &second.labels)?,
        merged: LabelIndex::build("merged", event, &merged.tracks, &merged.labels)?,
    })
}
