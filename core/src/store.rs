//! On-disk recordings.
//!
//! Each save writes one pretty-printed JSON document to
//! `<recordings_dir>/<session_id>_<YYYYMMDD_HHMMSS>.json`. Every operation
//! that takes a session id runs it through [`validate_session_id`] before
//! touching the file system; only the canonical 36-character UUID form can
//! reach a path.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use domtrace_protocol::EventQuery;
use domtrace_protocol::FilteredRecording;
use domtrace_protocol::RecordedEvent;
use domtrace_protocol::RecordingDocument;
use domtrace_protocol::RecordingId;
use domtrace_protocol::RecordingListEntry;
use domtrace_protocol::RecordingMetadata;
use serde::Deserialize;
use serde::Serialize;
use serde::de::IgnoredAny;
use tempfile::NamedTempFile;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::Config;
use crate::config::DEFAULT_MAX_READ_BYTES;
use crate::config::DEFAULT_MAX_RECORDING_BYTES;
use crate::error::RecorderError;
use crate::error::Result;
use crate::time::file_stamp;
use crate::time::now_timestamp;

/// Returned in place of events when a caller asks for metadata only.
pub const METADATA_ONLY_MESSAGE: &str =
    "Events omitted. Call again with include_events=true, optionally with filters, to fetch them.";

/// Upper bound on `_<n>` suffixes tried when saves land in the same second.
const MAX_NAME_ATTEMPTS: u32 = 1_000;

/// Shared session-id check for every store entry point.
pub fn validate_session_id(id: &str) -> Result<RecordingId> {
    Ok(RecordingId::parse(id)?)
}

/// A finished session handed to [`SessionStore::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Validated on save.
    pub session_id: String,
    pub url: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub events: Vec<RecordedEvent>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    session_id: RecordingId,
    url: Option<&'a str>,
    start_time: Option<&'a str>,
    end_time: Option<&'a str>,
    events: &'a [RecordedEvent],
    metadata: RecordingMetadata,
}

/// Everything but the event payloads.
#[derive(Deserialize)]
struct DocumentOutline {
    session_id: RecordingId,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    events: Vec<EventHeader>,
    metadata: RecordingMetadata,
}

#[derive(Deserialize)]
struct EventHeader {
    #[serde(rename = "type")]
    event_type: String,
}

/// Listing only needs a handful of top-level keys.
#[derive(Deserialize)]
struct ListingHeader {
    session_id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    events: Vec<IgnoredAny>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    max_recording_bytes: u64,
    max_read_bytes: u64,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_recording_bytes: DEFAULT_MAX_RECORDING_BYTES,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.recordings_dir.clone())
            .with_limits(config.max_recording_bytes, config.max_read_bytes)
    }

    pub fn with_limits(mut self, max_recording_bytes: u64, max_read_bytes: u64) -> Self {
        self.max_recording_bytes = max_recording_bytes;
        self.max_read_bytes = max_read_bytes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists `session` and returns the path written. Oversized documents
    /// are refused before anything touches the disk.
    pub fn save(&self, session: &SessionRecord) -> Result<PathBuf> {
        let session_id = validate_session_id(&session.session_id)?;
        let document = DocumentRef {
            session_id,
            url: session.url.as_deref(),
            start_time: session.start_time.as_deref(),
            end_time: session.end_time.as_deref(),
            events: &session.events,
            metadata: RecordingMetadata {
                saved_at: now_timestamp(),
                event_count: session.events.len(),
            },
        };
        let bytes = serde_json::to_vec_pretty(&document)?;
        if bytes.len() as u64 > self.max_recording_bytes {
            return Err(RecorderError::ResourceLimit(format!(
                "recording is {} bytes, limit is {} bytes",
                bytes.len(),
                self.max_recording_bytes
            )));
        }

        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;

        let stem = format!("{session_id}_{}", file_stamp());
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => format!("{stem}.json"),
                n => format!("{stem}_{n}.json"),
            };
            let path = self.dir.join(name);
            match tmp.persist_noclobber(&path) {
                Ok(_) => {
                    info!(
                        "saved recording {session_id} ({} events) to {}",
                        session.events.len(),
                        path.display()
                    );
                    return Ok(path);
                }
                Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    tmp = err.file;
                }
                Err(err) => return Err(err.error.into()),
            }
        }
        Err(RecorderError::ResourceLimit(format!(
            "too many recordings for {session_id} saved within one second"
        )))
    }

    /// Newest document saved for `id`, if any.
    pub fn load(&self, id: &str) -> Result<Option<RecordingDocument>> {
        let session_id = validate_session_id(id)?;
        let Some(path) = self.newest_file_for(session_id)? else {
            return Ok(None);
        };
        let bytes = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Filtered view of the newest document for `id`.
    ///
    /// `event_type_counts` and `total_events` always describe the full,
    /// unfiltered event list. Without `include_events` the event payloads
    /// are never deserialized and the response carries no `events` key.
    pub fn load_filtered(
        &self,
        id: &str,
        query: &EventQuery,
        include_events: bool,
    ) -> Result<Option<FilteredRecording>> {
        let session_id = validate_session_id(id)?;
        query.validate()?;
        let Some(path) = self.newest_file_for(session_id)? else {
            return Ok(None);
        };
        let bytes = std::fs::read(&path)?;

        if !include_events {
            let outline: DocumentOutline = serde_json::from_slice(&bytes)?;
            let mut counts = BTreeMap::new();
            for header in &outline.events {
                *counts.entry(header.event_type.clone()).or_insert(0) += 1;
            }
            return Ok(Some(FilteredRecording {
                session_id: outline.session_id,
                url: outline.url,
                start_time: outline.start_time,
                end_time: outline.end_time,
                metadata: outline.metadata,
                event_type_counts: counts,
                total_events: outline.events.len(),
                returned_events: None,
                filters_applied: None,
                events: None,
                message: Some(METADATA_ONLY_MESSAGE.to_string()),
            }));
        }

        let document: RecordingDocument = serde_json::from_slice(&bytes)?;
        let mut counts = BTreeMap::new();
        for event in &document.events {
            *counts.entry(event.event_type().to_string()).or_insert(0) += 1;
        }
        let selected: Vec<RecordedEvent> = query.apply(&document.events).into_iter().cloned().collect();
        Ok(Some(FilteredRecording {
            session_id: document.session_id,
            url: document.url,
            start_time: document.start_time,
            end_time: document.end_time,
            metadata: document.metadata,
            event_type_counts: counts,
            total_events: document.events.len(),
            returned_events: Some(selected.len()),
            filters_applied: Some(query.applied()),
            events: Some(selected),
            message: None,
        }))
    }

    /// Every readable recording, newest start time first. Files above the
    /// read ceiling or that fail to parse are skipped.
    pub fn list(&self) -> Result<Vec<RecordingListEntry>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match self.read_listing_header(&path) {
                Ok(Some(header)) => entries.push(RecordingListEntry {
                    session_id: header.session_id,
                    url: header.url,
                    start_time: header.start_time,
                    event_count: header.events.len(),
                    filepath: path,
                }),
                Ok(None) => {}
                Err(err) => debug!("skipping {}: {err}", path.display()),
            }
        }
        entries.sort_by(|a, b| {
            let a_start = a.start_time.as_deref().unwrap_or("");
            let b_start = b.start_time.as_deref().unwrap_or("");
            b_start.cmp(a_start)
        });
        Ok(entries)
    }

    /// Removes every file saved for `id`. Returns whether anything was
    /// removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let session_id = validate_session_id(id)?;
        let files = self.files_for(session_id)?;
        for (_, path) in &files {
            std::fs::remove_file(path)?;
            info!("deleted {}", path.display());
        }
        Ok(!files.is_empty())
    }

    fn read_listing_header(&self, path: &Path) -> Result<Option<ListingHeader>> {
        let len = std::fs::metadata(path)?.len();
        if len > self.max_read_bytes {
            warn!(
                "skipping {}: {len} bytes exceeds read limit of {} bytes",
                path.display(),
                self.max_read_bytes
            );
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn newest_file_for(&self, session_id: RecordingId) -> Result<Option<PathBuf>> {
        let files = self.files_for(session_id)?;
        Ok(files.into_iter().max_by(|a, b| a.0.cmp(&b.0)).map(|(_, path)| path))
    }

    /// Files named `<id>_<stamp>[_<n>].json`, keyed for newest-first ordering.
    fn files_for(&self, session_id: RecordingId) -> Result<Vec<(SaveKey, PathBuf)>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let prefix = format!("{session_id}_");
        let mut files = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(key) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(SaveKey::parse)
            else {
                continue;
            };
            files.push((key, entry.path()));
        }
        Ok(files)
    }
}

/// Sort key for `<stamp>[_<n>]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SaveKey {
    stamp: String,
    attempt: u32,
}

impl SaveKey {
    fn parse(rest: &str) -> Option<Self> {
        // The stamp is always `YYYYMMDD_HHMMSS`.
        const STAMP_LEN: usize = 15;
        let stamp = rest.get(..STAMP_LEN)?;
        let attempt = match rest.get(STAMP_LEN..)? {
            "" => 0,
            suffix => suffix.strip_prefix('_')?.parse().ok()?,
        };
        Some(Self {
            stamp: stamp.to_string(),
            attempt,
        })
    }
}
