//! # Run I/O
//!
//! Reading and writing the files of a run directory:
//!
//! | file                     | content                                  |
//! |--------------------------|------------------------------------------|
//! | `sgn_<index>_kine.jsonl` | one simulated event per line             |
//! | `tracks_first.json`      | first-stream tracks and labels           |
//! | `tracks_second.json`     | second-stream tracks and labels          |
//! | `tracks_merged.json`     | merged tracks with source, and labels    |
//! | `grp.json`               | global run parameters (field)            |

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StudyError};
use crate::field::FieldConfig;
use crate::index::MergedTrack;
use crate::particle::SimulatedParticle;
use crate::types::{McLabel, StudyConfig, TrackParams};

pub const FIRST_TRACKS_FILE: &str = "tracks_first.json";
pub const SECOND_TRACKS_FILE: &str = "tracks_second.json";
pub const MERGED_TRACKS_FILE: &str = "tracks_merged.json";
pub const GRP_FILE: &str = "grp.json";

/// Kinematics file of a simulation index
pub fn kine_file_name(index: u32) -> String {
    format!("sgn_{index}_kine.jsonl")
}

/// All particles of one simulated event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub particles: Vec<SimulatedParticle>,
}

/// One entry of a track store: tracks and their labels, aligned by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry<R> {
    pub tracks: Vec<R>,
    pub labels: Vec<McLabel>,
}

impl<R> Default for StoreEntry<R> {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl<R> StoreEntry<R> {
    pub fn push(&mut self, track: R, label: McLabel) {
        self.tracks.push(track);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Track store file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackStore<R> {
    pub entries: Vec<StoreEntry<R>>,
}

impl<R: DeserializeOwned> TrackStore<R> {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Load a store and keep its first entry
    pub fn load_first(path: &Path) -> Result<StoreEntry<R>> {
        let store = Self::load(path)?;
        let n = store.entries.len();
        if n > 1 {
            warn!(path = %path.display(), entries = n, "track store has more than one entry, using the first");
        }
        match store.entries.into_iter().next() {
            Some(entry) => {
                debug!(path = %path.display(), tracks = entry.len(), "track store loaded");
                Ok(entry)
            }
            None => {
                warn!(path = %path.display(), "track store has no entries");
                Ok(StoreEntry::default())
            }
        }
    }
}

/// Store entry split by event id, so each event sees only its own tracks
#[derive(Debug, Clone, PartialEq)]
pub struct EventStore<R> {
    by_event: BTreeMap<i32, StoreEntry<R>>,
    empty: StoreEntry<R>,
    total: usize,
}

impl<R> EventStore<R> {
    /// Group an entry by the event id of each label; tracks and labels must
    /// be aligned
    pub fn group(store: &str, entry: StoreEntry<R>) -> Result<Self> {
        let StoreEntry { tracks, labels } = entry;
        if tracks.len() != labels.len() {
            return Err(StudyError::LengthMismatch {
                store: store.to_string(),
                tracks: tracks.len(),
                labels: labels.len(),
            });
        }

        let total = tracks.len();
        let mut by_event: BTreeMap<i32, StoreEntry<R>> = BTreeMap::new();
        for (track, label) in tracks.into_iter().zip(labels) {
            by_event.entry(label.event).or_default().push(track, label);
        }
        debug!(store, tracks = total, events = by_event.len(), "track store grouped");
        Ok(Self {
            by_event,
            empty: StoreEntry::default(),
            total,
        })
    }

    /// Tracks of one event, empty when it has none
    pub fn event(&self, event: i32) -> &StoreEntry<R> {
        self.by_event.get(&event).unwrap_or(&self.empty)
    }

    /// Number of events with at least one track
    pub fn events(&self) -> usize {
        self.by_event.len()
    }

    /// Tracks over all events
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl<R> From<StoreEntry<R>> for TrackStore<R> {
    fn from(entry: StoreEntry<R>) -> Self {
        Self { entries: vec![entry] }
    }
}

/// Line-by-line reader of a kinematics file
pub struct KineReader<B> {
    path: PathBuf,
    lines: Lines<B>,
    line: usize,
}

impl KineReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| StudyError::MissingInput {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, BufReader::new(file)))
    }
}

impl<B: BufRead> KineReader<B> {
    pub fn new(path: &Path, reader: B) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<B: BufRead> Iterator for KineReader<B> {
    type Item = Result<SimEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(StudyError::Io(e))),
            };
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|source| {
                warn!(path = %self.path.display(), line = self.line, "malformed event");
                StudyError::MalformedInput {
                    path: self.path.clone(),
                    source,
                }
            }));
        }
    }
}

/// Everything a study needs from a run directory, except the events
/// themselves which are streamed
#[derive(Debug)]
pub struct RunInputs {
    pub dir: PathBuf,
    pub index: u32,
    pub field: FieldConfig,
    pub first: EventStore<TrackParams>,
    pub second: EventStore<TrackParams>,
    pub merged: EventStore<MergedTrack>,
}

impl RunInputs {
    /// Load the stores and field parameters; fails if any input is missing
    /// or a store has misaligned tracks and labels
    pub fn open(dir: &Path, index: u32) -> Result<Self> {
        let kine = dir.join(kine_file_name(index));
        if !kine.is_file() {
            return Err(StudyError::MissingInput {
                path: kine,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "kinematics file not found"),
            });
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            index,
            field: FieldConfig::load(&dir.join(GRP_FILE))?,
            first: EventStore::group("first", TrackStore::load_first(&dir.join(FIRST_TRACKS_FILE))?)?,
            second: EventStore::group("second", TrackStore::load_first(&dir.join(SECOND_TRACKS_FILE))?)?,
            merged: EventStore::group("merged", TrackStore::load_first(&dir.join(MERGED_TRACKS_FILE))?)?,
        })
    }

    pub fn kine_path(&self) -> PathBuf {
        self.dir.join(kine_file_name(self.index))
    }

    /// Stream the simulated events
    pub fn events(&self) -> Result<KineReader<BufReader<File>>> {
        KineReader::open(&self.kine_path())
    }
}

/// Study configuration from a JSON file
pub fn load_config(path: &Path) -> Result<StudyConfig> {
    let config: StudyConfig = read_json(path)?;
    config.validate()?;
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|source| StudyError::MissingInput {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| StudyError::MalformedInput {
        path: path.to_path_buf(),
        source,
    })
}

/// Write any serialisable value as pretty JSON
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write events as one JSON document per line
pub fn write_kine<'a>(path: &Path, events: impl IntoIterator<Item = &'a SimEvent>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for event in events {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
