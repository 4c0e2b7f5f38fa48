// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Content-addressed image storage.
//!
//! Image clips do not carry their payload around. Instead the raw bytes that
//! came off the clipboard are hashed, decoded, normalized, and written once as
//! a PNG file named after the hash. Clips then hold an [`ImageRef`] to that
//! file. Storing the same image twice is a no-op, and any number of clips can
//! share the same file.
//!
//! # Garbage Collection
//!
//! Image files are owned collectively by every clip that references them.
//! Once no clip in history or pinned refers to a file anymore, the file is
//! removed by [`ImageCache::gc`]. Files younger than a short grace period are
//! spared, because a concurrently running daemon may have stored an image
//! whose clip has not reached the history document yet.
//!
//! # Capability
//!
//! Image handling can be switched off at runtime through [`ImageSupport`].
//! When disabled, every attempt to store an image fails with
//! [`ImageError::Disabled`] so callers fall back to text-only operation.

use crate::clip::ImageRef;

use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::{
    collections::HashSet,
    fs,
    io::{Cursor, ErrorKind, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

/// Number of hex digits of the content hash used for file names.
const HASH_LEN: usize = 16;

/// Runtime image capability.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ImageSupport {
    #[default]
    Enabled,
    Disabled,
}

impl From<bool> for ImageSupport {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

/// Content-addressed store of PNG images.
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
    support: ImageSupport,
    gc_grace: Duration,
}

impl ImageCache {
    /// Construct new image cache rooted at target directory.
    pub fn new(dir: impl Into<PathBuf>, support: ImageSupport) -> Self {
        Self {
            dir: dir.into(),
            support,
            gc_grace: Duration::from_secs(60),
        }
    }

    /// Set minimum age a file must reach before garbage collection may remove it.
    pub fn with_gc_grace(mut self, grace: Duration) -> Self {
        self.gc_grace = grace;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.support == ImageSupport::Enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path of stored image.
    pub fn path_of(&self, image_ref: &ImageRef) -> PathBuf {
        self.dir.join(image_ref.as_str())
    }

    /// Store raw image bytes.
    ///
    /// Decodes the payload, converts it to 8-bit RGBA when it carries an
    /// alpha channel or 8-bit RGB otherwise, and writes it out as PNG under its
    /// content hash. Returns the existing reference without touching the disk
    /// if that hash is already stored.
    ///
    /// # Errors
    ///
    /// - Return [`ImageError::Disabled`] if image support is turned off.
    /// - Return [`ImageError::Decode`] if bytes are not a decodable image.
    /// - Return [`ImageError::Io`] if the PNG file cannot be written.
    #[instrument(skip(self, bytes), fields(len = bytes.len()), level = "debug")]
    pub fn store(&self, bytes: &[u8]) -> Result<ImageRef> {
        if !self.is_enabled() {
            return Err(ImageError::Disabled);
        }

        let image_ref = ImageRef::new(format!("{}.png", content_hash(bytes)));
        let path = self.path_of(&image_ref);
        if path.exists() {
            debug!("image {image_ref} already stored");
            return Ok(image_ref);
        }

        let decoded = image::load_from_memory(bytes)?;
        let normalized = if decoded.color().has_alpha() {
            DynamicImage::ImageRgba8(decoded.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(decoded.to_rgb8())
        };

        let mut png = Vec::new();
        normalized.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        self.write_atomic(&path, &png)?;
        debug!("stored image {image_ref} ({}x{})", normalized.width(), normalized.height());

        Ok(image_ref)
    }

    /// Read PNG bytes of stored image.
    ///
    /// # Errors
    ///
    /// - Return [`ImageError::Io`] if the file cannot be read.
    pub fn load(&self, image_ref: &ImageRef) -> Result<Vec<u8>> {
        let path = self.path_of(image_ref);
        fs::read(&path).map_err(|source| ImageError::Io { source, path })
    }

    /// Remove every stored image not present in the reference set.
    ///
    /// Files that vanish mid-way, e.g., removed by another clipmgr process, are
    /// not treated as errors. Returns number of files removed.
    ///
    /// # Errors
    ///
    /// - Return [`ImageError::Pattern`] if the image directory cannot be
    ///   turned into a glob pattern.
    #[instrument(skip(self, referenced), level = "debug")]
    pub fn gc(&self, referenced: &HashSet<ImageRef>) -> Result<usize> {
        let pattern = format!(
            "{}/*.png",
            glob::Pattern::escape(self.dir.to_string_lossy().as_ref())
        );

        let mut removed = 0;
        for path in glob::glob(&pattern)?.flatten() {
            let Some(name) = path.file_name().map(|name| name.to_string_lossy()) else {
                continue;
            };

            if referenced.contains(&ImageRef::new(name.as_ref())) || self.is_fresh(&path) {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("removed unreferenced image {:?}", path.display());
                    removed += 1;
                }
                Err(error) if error.kind() == ErrorKind::NotFound => continue,
                Err(error) => warn!("cannot remove image {:?}: {error}", path.display()),
            }
        }

        Ok(removed)
    }

    fn is_fresh(&self, path: &Path) -> bool {
        if self.gc_grace.is_zero() {
            return false;
        }

        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age < self.gc_grace)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let io_error = |source| ImageError::Io {
            source,
            path: path.to_path_buf(),
        };

        mkdirp::mkdirp(&self.dir).map_err(io_error)?;
        let mut file = NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        file.write_all(data).map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(path).map_err(|err| io_error(err.error))?;

        Ok(())
    }
}

/// Stable short hash of raw bytes, as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LEN);
    hash
}

/// Image cache error types.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Image support is switched off.
    #[error("image support is disabled")]
    Disabled,

    /// Payload is not a decodable image.
    #[error(transparent)]
    Decode(#[from] image::ImageError),

    /// Image file cannot be read or written.
    #[error("failed to access image file {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Image directory cannot be expressed as glob pattern.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

/// Friendly result alias :3
pub type Result<T, E = ImageError> = std::result::Result<T, E>;
