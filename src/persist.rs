// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Crash-safe persistence of the clip store.
//!
//! History and pinned clips are kept in two independent JSON documents, each
//! an array of clip records. Keeping them apart lets the daemon write history
//! on its hot path without ever clobbering pin edits that a foreground command
//! made in the meantime.
//!
//! # Atomic Saves
//!
//! Documents are never truncated in place. New content goes to a temporary
//! file in the same directory, gets flushed to disk, and is then renamed over
//! the old document. Another process reading the document at the same time
//! sees either the old content or the new content, never a mix of both. Only
//! when that path fails do we fall back to a plain overwrite.
//!
//! # Tolerant Loading
//!
//! A missing, unreadable, or corrupted document loads as an empty collection.
//! Losing clipboard history is annoying, refusing to run because of it is
//! worse. Older versions stored history as an array of bare strings; such
//! entries, along with bare numbers and booleans, are upgraded to text clips
//! on load.

use crate::{
    clip::Clip,
    image_cache::ImageCache,
    path::StatePaths,
    store::{ClipStore, Limits},
};

use serde::Deserialize;
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

/// Persistence of clip store to state directory.
#[derive(Debug, Clone)]
pub struct Persistence {
    paths: StatePaths,
    images: ImageCache,
}

impl Persistence {
    /// Construct new persistence layer.
    pub fn new(paths: StatePaths, images: ImageCache) -> Self {
        Self { paths, images }
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    /// Load both documents into a clip store.
    pub fn load_store(&self, limits: Limits) -> ClipStore {
        ClipStore::from_parts(self.load_history(), self.load_pinned(), limits)
    }

    pub fn load_history(&self) -> Vec<Clip> {
        load(&self.paths.history)
    }

    pub fn load_pinned(&self) -> Vec<Clip> {
        load(&self.paths.pinned)
    }

    /// Save history document only.
    ///
    /// # Errors
    ///
    /// - Return [`PersistError`] if history cannot be written at all.
    pub fn save_history_only(&self, store: &ClipStore) -> Result<()> {
        save(store.history(), &self.paths.history)
    }

    /// Save both documents, then collect unreferenced images.
    ///
    /// Both documents are attempted even if the first one fails.
    ///
    /// # Errors
    ///
    /// - Return [`PersistError`] of the first document that could not be
    ///   written.
    pub fn save_all(&self, store: &ClipStore) -> Result<()> {
        let history = save(store.history(), &self.paths.history);
        let pinned = save(store.pinned(), &self.paths.pinned);

        match self.images.gc(&store.referenced_images()) {
            Ok(removed) if removed > 0 => debug!("collected {removed} unreferenced images"),
            Ok(_) => {}
            Err(error) => warn!("image garbage collection failed: {error}"),
        }

        history.and(pinned)
    }
}

/// Load collection of clips from JSON document.
///
/// Never fails. Missing or malformed documents yield an empty collection,
/// malformed records inside a valid document are skipped.
#[instrument(skip(path), fields(path = %path.as_ref().display()), level = "debug")]
pub fn load(path: impl AsRef<Path>) -> Vec<Clip> {
    let path = path.as_ref();
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!("no document yet");
            return Vec::new();
        }
        Err(error) => {
            warn!("cannot read {:?}, starting empty: {error}", path.display());
            return Vec::new();
        }
    };

    let entries = match serde_json::from_str::<Vec<serde_json::Value>>(&data) {
        Ok(entries) => entries,
        Err(error) => {
            warn!("corrupted document {:?}, starting empty: {error}", path.display());
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(StoredClip::Record(clip)) => Some(clip),
            Ok(StoredClip::Legacy(text)) if !text.is_empty() => Some(Clip::text(text)),
            Ok(StoredClip::Legacy(_)) => None,
            Ok(StoredClip::LegacyNumber(number)) => Some(Clip::text(number.to_string())),
            Ok(StoredClip::LegacyFlag(flag)) => Some(Clip::text(flag.to_string())),
            Err(error) => {
                warn!("skip malformed entry {index} of {:?}: {error}", path.display());
                None
            }
        })
        .collect()
}

/// Save collection of clips to JSON document atomically.
///
/// Falls back to a direct overwrite if the atomic path fails.
///
/// # Errors
///
/// - Return [`PersistError::Serialize`] if clips cannot be serialized.
/// - Return [`PersistError::Write`] if neither atomic nor direct write works.
#[instrument(skip(clips, path), fields(path = %path.as_ref().display(), len = clips.len()), level = "debug")]
pub fn save(clips: &[Clip], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let data = serde_json::to_string_pretty(clips)?;

    if let Err(error) = write_atomic(path, data.as_bytes()) {
        warn!(
            "atomic write to {:?} failed, overwriting directly: {error}",
            path.display()
        );
        fs::write(path, data.as_bytes()).map_err(|source| PersistError::Write {
            source,
            path: path.to_path_buf(),
        })?;
    }

    Ok(())
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;

    Ok(())
}

/// Any entry shape found in a document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredClip {
    Legacy(String),
    LegacyNumber(serde_json::Number),
    LegacyFlag(bool),
    Record(Clip),
}

/// Persistence error types.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Clips cannot be serialized.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// Document cannot be written.
    #[error("failed to write document {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PersistError> = std::result::Result<T, E>;
