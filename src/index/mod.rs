//! # Label Index
//!
//! Per-event lookup from a simulated-particle label to the reconstructed
//! track that carries it, for one reconstruction stream.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::StudyError;
use crate::types::{Fidelity, Label, McLabel, TrackParams, TrackSource};

/// Anything stored in a track collection
pub trait TrackRecord {
    fn params(&self) -> &TrackParams;

    /// Entry from a secondary matching route, which never replaces a
    /// standard entry with the same label
    fn is_secondary(&self) -> bool {
        false
    }
}

impl TrackRecord for TrackParams {
    fn params(&self) -> &TrackParams {
        self
    }
}

/// Merged-stream entry: track state plus the route it was matched through
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedTrack {
    pub params: TrackParams,
    #[serde(default)]
    pub source: TrackSource,
}

impl MergedTrack {
    pub fn new(params: TrackParams, source: TrackSource) -> Self {
        Self { params, source }
    }

    pub fn is_afterburner(&self) -> bool {
        self.source == TrackSource::Afterburner
    }
}

impl TrackRecord for MergedTrack {
    fn params(&self) -> &TrackParams {
        &self.params
    }

    fn is_secondary(&self) -> bool {
        self.is_afterburner()
    }
}

/// Successful lookup
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a, R> {
    pub record: &'a R,
    pub fidelity: Fidelity,
}

/// Kept entry for one label
#[derive(Debug, Clone, Copy)]
struct Slot {
    index: usize,
    fidelity: Fidelity,
}

/// Label lookup over one event of one stream
#[derive(Debug)]
pub struct LabelIndex<'a, R> {
    event: i32,
    records: &'a [R],
    by_label: HashMap<Label, Slot>,
}

impl<'a, R: TrackRecord> LabelIndex<'a, R> {
    /// Index the entries of `event` from a label-aligned collection.
    ///
    /// When several entries carry the same label the last one is kept,
    /// except that a secondary entry never displaces a standard one. A fake
    /// flag on any standard duplicate marks the kept entry fake.
    pub fn build(
        store: &str,
        event: i32,
        records: &'a [R],
        labels: &[McLabel],
    ) -> Result<Self, StudyError> {
        if records.len() != labels.len() {
            return Err(StudyError::LengthMismatch {
                store: store.to_string(),
                tracks: records.len(),
                labels: labels.len(),
            });
        }

        let mut by_label: HashMap<Label, Slot> = HashMap::new();
        for (i, l) in labels.iter().enumerate() {
            if l.event != event || l.track < 0 {
                continue;
            }
            let secondary = records[i].is_secondary();
            match by_label.entry(l.label()) {
                Entry::Vacant(e) => {
                    e.insert(Slot {
                        index: i,
                        fidelity: l.fidelity(),
                    });
                }
                Entry::Occupied(mut e) => {
                    let slot = e.get_mut();
                    let kept_secondary = records[slot.index].is_secondary();
                    if secondary && !kept_secondary {
                        continue;
                    }
                    if kept_secondary || l.fake {
                        slot.fidelity = l.fidelity();
                    }
                    slot.index = i;
                }
            }
        }

        Ok(Self {
            event,
            records,
            by_label,
        })
    }

    /// Look up the track produced by `label`
    pub fn get(&self, label: &Label) -> Option<Hit<'a, R>> {
        if label.event != self.event {
            return None;
        }
        let records = self.records;
        self.by_label.get(label).map(|slot| Hit {
            record: &records[slot.index],
            fidelity: slot.fidelity,
        })
    }

    /// Number of distinct labels indexed
    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }

    pub fn event(&self) -> i32 {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(y: f64) -> TrackParams {
        TrackParams { y, ..TrackParams::default() }
    }

    /// Linear scan with overwrite on every hit
    fn scan<'a>(records: &'a [TrackParams], labels: &[McLabel], target: Label) -> Option<&'a TrackParams> {
        let mut found = None;
        for (r, l) in records.iter().zip(labels) {
            if l.event != target.event {
                continue;
            }
            if l.track == target.track {
                found = Some(r);
            }
        }
        found
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let records = vec![track(1.0), track(2.0), track(3.0)];
        let labels = vec![
            McLabel::new(0, 4, false),
            McLabel::new(0, 7, true),
            McLabel::new(1, 4, false),
        ];
        let idx = LabelIndex::build("first", 0, &records, &labels).unwrap();

        let hit = idx.get(&Label::new(0, 7)).unwrap();
        assert_eq!(hit.record.y, 2.0);
        assert_eq!(hit.fidelity, Fidelity::Fake);

        assert!(idx.get(&Label::new(0, 5)).is_none());
        // Same particle index in another event is a different particle
        assert!(idx.get(&Label::new(1, 4)).is_none());
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_duplicate_label_last_wins() {
        let records = vec![track(1.0), track(2.0)];
        let labels = vec![McLabel::new(0, 3, false), McLabel::new(0, 3, false)];
        let idx = LabelIndex::build("second", 0, &records, &labels).unwrap();
        assert_eq!(idx.get(&Label::new(0, 3)).unwrap().record.y, 2.0);
    }

    #[test]
    fn test_fake_duplicate_stays_fake() {
        let records = vec![track(1.0), track(2.0)];
        let labels = vec![McLabel::new(0, 3, true), McLabel::new(0, 3, false)];
        let idx = LabelIndex::build("merged", 0, &records, &labels).unwrap();
        let hit = idx.get(&Label::new(0, 3)).unwrap();
        assert_eq!(hit.record.y, 2.0);
        assert_eq!(hit.fidelity, Fidelity::Fake);
    }

    #[test]
    fn test_afterburner_duplicate_keeps_standard_entry() {
        let records = vec![
            MergedTrack::new(track(1.0), TrackSource::Standard),
            MergedTrack::new(track(2.0), TrackSource::Afterburner),
        ];
        let labels = vec![McLabel::new(0, 1, false), McLabel::new(0, 1, true)];
        let idx = LabelIndex::build("merged", 0, &records, &labels).unwrap();
        let hit = idx.get(&Label::new(0, 1)).unwrap();
        assert!(!hit.record.is_afterburner());
        assert_eq!(hit.record.params.y, 1.0);
        assert_eq!(hit.fidelity, Fidelity::Genuine);
    }

    #[test]
    fn test_standard_entry_replaces_earlier_afterburner() {
        let records = vec![
            MergedTrack::new(track(1.0), TrackSource::Afterburner),
            MergedTrack::new(track(2.0), TrackSource::Standard),
            MergedTrack::new(track(3.0), TrackSource::Afterburner),
        ];
        let labels = vec![McLabel::new(0, 1, false); 3];
        let idx = LabelIndex::build("merged", 0, &records, &labels).unwrap();
        let hit = idx.get(&Label::new(0, 1)).unwrap();
        assert!(!hit.record.is_afterburner());
        assert_eq!(hit.record.params.y, 2.0);
    }

    #[test]
    fn test_afterburner_only_entries_stay_visible() {
        let records = vec![
            MergedTrack::new(track(1.0), TrackSource::Afterburner),
            MergedTrack::new(track(2.0), TrackSource::Afterburner),
        ];
        let labels = vec![McLabel::new(0, 1, false); 2];
        let idx = LabelIndex::build("merged", 0, &records, &labels).unwrap();
        let hit = idx.get(&Label::new(0, 1)).unwrap();
        assert!(hit.record.is_afterburner());
        assert_eq!(hit.record.params.y, 2.0);
    }

    #[test]
    fn test_matches_linear_scan() {
        let records: Vec<TrackParams> = (0..40).map(|i| track(i as f64)).collect();
        let labels: Vec<McLabel> = (0..40)
            .map(|i| McLabel::new(i % 3, (i * 7) % 11 - 1, false))
            .collect();

        for event in 0..3 {
            let idx = LabelIndex::build("first", event, &records, &labels).unwrap();
            for t in 0..11 {
                let target = Label::new(event, t);
                let fast = idx.get(&target).map(|h| h.record.y);
                let slow = scan(&records, &labels, target).map(|r| r.y);
                assert_eq!(fast, slow, "label {target}");
            }
        }
    }

    #[test]
    fn test_noise_labels_not_indexed() {
        let records = vec![track(1.0)];
        let labels = vec![McLabel::new(0, -1, false)];
        let idx = LabelIndex::build("first", 0, &records, &labels).unwrap();
        assert!(idx.is_empty());
        assert!(idx.get(&Label::new(0, -1)).is_none());
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let records = vec![track(1.0), track(2.0)];
        let labels = vec![McLabel::new(0, 1, false)];
        let err = LabelIndex::build("merged", 0, &records, &labels).unwrap_err();
        assert!(matches!(err, StudyError::LengthMismatch { tracks: 2, labels: 1, .. }));
    }

    #[test]
    fn test_merged_records_expose_source() {
        let records = vec![
            MergedTrack::new(track(1.0), TrackSource::Standard),
            MergedTrack::new(track(2.0), TrackSource::Afterburner),
        ];
        let labels = vec![McLabel::new(2, 1, false), McLabel::new(2, 2, false)];
        let idx = LabelIndex::build("merged", 2, &records, &labels).unwrap();
        assert!(!idx.get(&Label::new(2, 1)).unwrap().record.is_afterburner());
        assert!(idx.get(&Label::new(2, 2)).unwrap().record.is_afterburner());
        assert_eq!(idx.get(&Label::new(2, 2)).unwrap().record.params().y, 2.0);
    }
}
