// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Clip representation.
//!
//! A __clip__ is one entry of clipboard history. Clips come in two kinds:
//! plain text, or an image whose payload lives in the
//! [image cache](crate::image_cache) and is referenced by a content-addressed
//! handle.
//!
//! # Identity
//!
//! Two clips are considered the same clip if they share the same __identity__,
//! i.e., same kind and same content reference. Timestamps and advisory MIME
//! types never take part in identity. Deduplication in the
//! [clip store](crate::store) is driven entirely by identity.
//!
//! # Persisted Layout
//!
//! Clips serialize to flat JSON records:
//!
//! ```json
//! { "kind": "text", "text": "hello", "timestamp": 1700000000 }
//! { "kind": "image", "image_ref": "9f86d081884c7d65.png", "mime": "image/png", "timestamp": 1700000000 }
//! ```

use chrono::{DateTime, Utc};
use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Single clipboard history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClipRecord", into = "ClipRecord")]
pub struct Clip {
    pub content: ClipContent,

    /// Advisory MIME type of the source content.
    pub mime: Option<String>,

    /// Time clip was last observed.
    pub created_at: DateTime<Utc>,
}

impl Clip {
    /// Construct new text clip stamped with current time.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: ClipContent::Text(text.into()),
            mime: None,
            created_at: Utc::now(),
        }
    }

    /// Construct new image clip stamped with current time.
    pub fn image(image_ref: ImageRef, mime: Option<String>) -> Self {
        Self {
            content: ClipContent::Image(image_ref),
            mime,
            created_at: Utc::now(),
        }
    }

    /// Set advisory MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn kind(&self) -> ClipKind {
        self.content.kind()
    }

    /// Deduplication identity of clip.
    pub fn identity(&self) -> Identity {
        Identity(self.content.clone())
    }

    /// Check if two clips share the same identity.
    pub fn same_as(&self, other: &Clip) -> bool {
        self.content == other.content
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            ClipContent::Text(text) => Some(text),
            ClipContent::Image(_) => None,
        }
    }

    pub fn image_ref(&self) -> Option<&ImageRef> {
        match &self.content {
            ClipContent::Image(image_ref) => Some(image_ref),
            ClipContent::Text(_) => None,
        }
    }

    /// Refresh timestamp to current time.
    pub fn touch(&mut self) {
        self.created_at = Utc::now();
    }
}

/// Content of a clip.
///
/// # Invariant
///
/// - Text content is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClipContent {
    Text(String),
    Image(ImageRef),
}

impl ClipContent {
    pub fn kind(&self) -> ClipKind {
        match self {
            Self::Text(_) => ClipKind::Text,
            Self::Image(_) => ClipKind::Image,
        }
    }
}

/// Kind of clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Text,
    Image,
}

/// Deduplication identity of a clip.
///
/// Owned snapshot of the kind and content reference, so the daemon can
/// remember what it last observed without holding on to the clip itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(ClipContent);

impl Identity {
    pub fn kind(&self) -> ClipKind {
        self.0.kind()
    }
}

/// Content-addressed handle to a stored image.
///
/// Holds the file name of the image inside the image cache directory, e.g.,
/// `9f86d081884c7d65.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Construct new image reference from file name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Content hash portion of reference, i.e., file name sans extension.
    pub fn hash(&self) -> &str {
        self.0.strip_suffix(".png").unwrap_or(&self.0)
    }
}

impl Display for ImageRef {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.0)
    }
}

/// Flat on-disk record of a clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClipRecord {
    kind: ClipKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_ref: Option<ImageRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime: Option<String>,

    #[serde(
        default,
        serialize_with = "chrono::serde::ts_seconds_option::serialize",
        deserialize_with = "lenient_timestamp"
    )]
    timestamp: Option<DateTime<Utc>>,
}

/// Timestamp shapes found in history files written by other tools.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(i64),
    Fractional(f64),
    Unusable(#[allow(dead_code)] IgnoredAny),
}

/// Accept integer or fractional Unix seconds.
///
/// Anything else, including out of range values, yields `None` so the record
/// keeps its content and picks up the current time instead.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let timestamp = match Option::<RawTimestamp>::deserialize(deserializer)? {
        Some(RawTimestamp::Seconds(secs)) => DateTime::from_timestamp(secs, 0),
        Some(RawTimestamp::Fractional(secs)) if secs.is_finite() => {
            DateTime::from_timestamp(secs.floor() as i64, 0)
        }
        _ => None,
    };

    Ok(timestamp)
}

impl TryFrom<ClipRecord> for Clip {
    type Error = InvalidRecord;

    fn try_from(record: ClipRecord) -> Result<Self, Self::Error> {
        let content = match (record.kind, record.text, record.image_ref) {
            (ClipKind::Text, Some(text), None) if !text.is_empty() => ClipContent::Text(text),
            (ClipKind::Image, None, Some(image_ref)) if !image_ref.as_str().is_empty() => {
                ClipContent::Image(image_ref)
            }
            (kind, _, _) => return Err(InvalidRecord(kind)),
        };

        Ok(Self {
            content,
            mime: record.mime,
            created_at: record.timestamp.unwrap_or_else(Utc::now),
        })
    }
}

impl From<Clip> for ClipRecord {
    fn from(clip: Clip) -> Self {
        let (kind, text, image_ref) = match clip.content {
            ClipContent::Text(text) => (ClipKind::Text, Some(text), None),
            ClipContent::Image(image_ref) => (ClipKind::Image, None, Some(image_ref)),
        };

        Self {
            kind,
            text,
            image_ref,
            mime: clip.mime,
            timestamp: Some(clip.created_at),
        }
    }
}

/// Clip record does not carry the content its kind demands.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{0:?} record must carry exactly one non-empty content field matching its kind")]
pub struct InvalidRecord(ClipKind);
