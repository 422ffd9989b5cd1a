//! The image processing store: entries, settings, and the per-image state
//! machine.
//!
//! The store is an explicit context object — callers construct one and reach
//! everything through its operation API; there is no ambient singleton. It is
//! the single mutable owner of all [`ImageEntry`] records and of the
//! [`CompressionSettings`], and it owns the lifecycle of every display
//! handle: each handle the registry creates is released exactly once, by
//! whichever operation removes or replaces the owning record.
//!
//! State machine per entry:
//!
//! ```text
//! pending ──→ processing ──→ completed
//!                      └───→ error ──(explicit re-process)──→ processing
//! ```
//!
//! `process_all` drives entries strictly sequentially — entry *i+1* does not
//! start until entry *i* reaches a terminal state. Parallelism lives one
//! level down, inside the per-format fan-out of
//! [`transcode_formats`](crate::transcode::transcode_formats).

use crate::formats::FormatTag;
use crate::imaging::Codec;
use crate::settings::{CompressionSettings, Quality, SettingsError, SettingsUpdate, normalize_formats};
use crate::transcode::transcode_formats;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

/// Largest accepted input file: 50 MB.
pub const MAX_INPUT_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no image with id {0:?}")]
    UnknownImage(String),
    #[error("{name}: {size} bytes exceeds the {MAX_INPUT_BYTES} byte input limit")]
    FileTooLarge { name: String, size: u64 },
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Lifecycle status of one entry. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Processing,
    Completed,
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Error => "error",
        })
    }
}

/// A revocable reference that lets a display surface show a blob without
/// duplicating its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayHandle(u64);

/// Explicit acquisition/release of display handles.
///
/// Handles stand in for a scarce OS-level resource (the original system's
/// object URLs), so release is an explicit, testable operation rather than a
/// side effect of dropping the owner.
pub trait HandleRegistry {
    fn create(&mut self, bytes: &[u8]) -> DisplayHandle;
    fn release(&mut self, handle: DisplayHandle);
}

/// In-memory registry. Tracks live handles so tests can assert the
/// exactly-once release invariant.
#[derive(Debug, Default)]
pub struct MemoryHandles {
    next_id: u64,
    live: HashMap<u64, u64>,
    created: u64,
    released: u64,
}

impl MemoryHandles {
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn created_count(&self) -> u64 {
        self.created
    }

    pub fn released_count(&self) -> u64 {
        self.released
    }
}

impl HandleRegistry for MemoryHandles {
    fn create(&mut self, bytes: &[u8]) -> DisplayHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.created += 1;
        self.live.insert(id, bytes.len() as u64);
        DisplayHandle(id)
    }

    fn release(&mut self, handle: DisplayHandle) {
        if self.live.remove(&handle.0).is_some() {
            self.released += 1;
        } else {
            // Double release is a lifecycle bug in the caller
            warn!(handle = handle.0, "release of unknown or already-released handle");
        }
    }
}

/// Output of transcoding one image into one format, as stored on the entry.
#[derive(Debug)]
pub struct FormatResult {
    pub format: FormatTag,
    pub bytes: Vec<u8>,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub within_budget: bool,
    pub handle: DisplayHandle,
}

/// Per-format results in request order. Semantically a map keyed by format;
/// kept as an ordered list because order decides the primary result.
#[derive(Debug, Default)]
pub struct FormatResults(Vec<FormatResult>);

impl FormatResults {
    pub fn get(&self, format: FormatTag) -> Option<&FormatResult> {
        self.0.iter().find(|r| r.format == format)
    }

    pub fn first(&self) -> Option<&FormatResult> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormatResult> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, result: FormatResult) {
        self.0.push(result);
    }

    fn drain(&mut self) -> impl Iterator<Item = FormatResult> + '_ {
        self.0.drain(..)
    }
}

/// One user-submitted image and everything derived from it.
#[derive(Debug)]
pub struct ImageEntry {
    id: String,
    pub name: String,
    pub source: Vec<u8>,
    pub original_size: u64,
    pub original_width: u32,
    pub original_height: u32,
    /// Detected source format; `None` when neither content sniffing nor the
    /// MIME hint recognized it (the decode failure then surfaces at process
    /// time).
    pub source_format: Option<FormatTag>,
    pub original_handle: DisplayHandle,
    pub status: Status,
    pub error: Option<String>,
    pub results: FormatResults,
    primary: Option<FormatTag>,
}

impl ImageEntry {
    /// Opaque id, stable for the entry's lifetime.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The designated primary result: the first requested format that
    /// transcoded successfully in the latest completed run.
    pub fn primary_result(&self) -> Option<&FormatResult> {
        self.primary.and_then(|format| self.results.get(format))
    }
}

/// Process-wide registry of image entries. See the [module docs](self).
pub struct Store<C: Codec, H: HandleRegistry> {
    codec: C,
    handles: H,
    settings: CompressionSettings,
    entries: Vec<ImageEntry>,
    next_id: u64,
    processing: bool,
}

impl<C: Codec, H: HandleRegistry> Store<C, H> {
    pub fn new(codec: C, handles: H) -> Self {
        Self {
            codec,
            handles,
            settings: CompressionSettings::default(),
            entries: Vec::new(),
            next_id: 1,
            processing: false,
        }
    }

    pub fn settings(&self) -> &CompressionSettings {
        &self.settings
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &str) -> Option<&ImageEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Whether a `process_one`/`process_all` call is currently underway.
    /// Always `false` again by the time those calls return, error or not.
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Access the handle registry, e.g. to inspect handle accounting.
    pub fn handles(&self) -> &H {
        &self.handles
    }

    /// Register a new image. Extracts size and format synchronously and
    /// probes dimensions from the header; a failed probe does not reject the
    /// add — the entry starts `pending` with 0×0 dimensions and the decode
    /// error surfaces when processing is attempted.
    pub fn add_image(
        &mut self,
        name: &str,
        mime_hint: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError> {
        let size = bytes.len() as u64;
        if size > MAX_INPUT_BYTES {
            return Err(StoreError::FileTooLarge {
                name: name.to_string(),
                size,
            });
        }

        let source_format = image::guess_format(&bytes)
            .ok()
            .and_then(FormatTag::from_sniffed)
            .or_else(|| mime_hint.and_then(|mime| FormatTag::from_mime(mime).ok()));

        let (width, height) = self.codec.probe_dimensions(&bytes).unwrap_or((0, 0));

        let id = format!("img-{:04}", self.next_id);
        self.next_id += 1;
        let original_handle = self.handles.create(&bytes);

        info!(id, name, size, width, height, "added image");
        self.entries.push(ImageEntry {
            id: id.clone(),
            name: name.to_string(),
            source: bytes,
            original_size: size,
            original_width: width,
            original_height: height,
            source_format,
            original_handle,
            status: Status::Pending,
            error: None,
            results: FormatResults::default(),
            primary: None,
        });
        Ok(id)
    }

    /// Drop an entry, releasing every display handle it owns.
    pub fn remove(&mut self, id: &str) -> Result<(), StoreError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StoreError::UnknownImage(id.to_string()))?;

        let mut entry = self.entries.remove(index);
        self.handles.release(entry.original_handle);
        for result in entry.results.drain() {
            self.handles.release(result.handle);
        }
        Ok(())
    }

    /// Drop every entry, releasing all display handles.
    pub fn clear_all(&mut self) {
        for mut entry in self.entries.drain(..) {
            self.handles.release(entry.original_handle);
            for result in entry.results.drain() {
                self.handles.release(result.handle);
            }
        }
    }

    /// Shallow-merge a partial settings update. Does not retroactively
    /// affect entries that already completed.
    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<(), StoreError> {
        self.settings.apply(update)?;
        Ok(())
    }

    /// Transcode one entry into the requested formats (the settings' target
    /// list unless overridden for this call).
    ///
    /// A previous `error` or `completed` state does not block re-processing:
    /// the attempt restarts from scratch, and on success the replaced
    /// results' handles are released. On failure the prior results are kept
    /// untouched and only the status/error message change.
    pub fn process_one(
        &mut self,
        id: &str,
        formats_override: Option<&[FormatTag]>,
    ) -> Result<(), StoreError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StoreError::UnknownImage(id.to_string()))?;

        let formats = normalize_formats(
            formats_override
                .map(<[FormatTag]>::to_vec)
                .unwrap_or_else(|| self.settings.target_formats.clone()),
        );

        self.processing = true;
        self.entries[index].status = Status::Processing;

        let entry = &self.entries[index];
        let outcome = transcode_formats(
            &self.codec,
            &entry.source,
            (entry.original_width, entry.original_height),
            &formats,
            &self.settings,
        );

        let entry = &mut self.entries[index];
        match outcome {
            Err(decode_error) => {
                // Fatal to the whole job; prior results stay untouched
                warn!(id, %decode_error, "image failed to decode");
                entry.status = Status::Error;
                entry.error = Some(decode_error.to_string());
            }
            Ok(outcome) if outcome.succeeded.is_empty() => {
                warn!(id, "all target formats failed");
                entry.status = Status::Error;
                entry.error = Some(format!(
                    "all {} target formats failed: {}",
                    formats.len(),
                    outcome.failure_summary()
                ));
            }
            Ok(outcome) => {
                for replaced in entry.results.drain() {
                    self.handles.release(replaced.handle);
                }
                for transcoded in outcome.succeeded {
                    let handle = self.handles.create(&transcoded.bytes);
                    entry.results.push(FormatResult {
                        format: transcoded.format,
                        size: transcoded.bytes.len() as u64,
                        bytes: transcoded.bytes,
                        width: transcoded.width,
                        height: transcoded.height,
                        quality: transcoded.quality,
                        within_budget: transcoded.within_budget,
                        handle,
                    });
                }
                entry.primary = entry.results.first().map(|r| r.format);
                entry.status = Status::Completed;
                entry.error = None;
                info!(id, formats = entry.results.len(), "image completed");
            }
        }

        self.processing = false;
        Ok(())
    }

    /// Process every entry not already completed, strictly one at a time.
    pub fn process_all(&mut self) {
        let pending: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.status != Status::Completed)
            .map(|e| e.id.clone())
            .collect();

        for id in pending {
            if let Err(error) = self.process_one(&id, None) {
                warn!(id, %error, "batch item failed outside the transcode path");
            }
        }
    }
}

/// Percentage saved by compression; 0 for an empty original.
pub fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0
}
