// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of clipmgr's configuration file to simplify the process
//! of serialization and deserialization. Every table and every field is
//! optional, so an empty file, or no file at all, yields the default
//! settings.
//!
//! # General Layout
//!
//! ```toml
//! state_dir = "~/.cache/clipboard"
//!
//! [history]
//! max_text = 50
//! max_image = 10
//! max_pinned = 30
//!
//! [daemon]
//! poll_interval_ms = 500
//! read_timeout_ms = 2000
//!
//! [clipboard]
//! backend = "auto"
//! images = true
//!
//! [menu]
//! frontend = "dmenu"
//! lines = 20
//! preview_max = 60
//! ```

use crate::{path::default_state_dir, store::Limits};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

/// Top-level settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding history, pinned, and image files.
    ///
    /// Falls back to `$XDG_CACHE_HOME/clipboard` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Capacity limits of the clip store.
    pub history: Limits,

    /// Daemon polling settings.
    pub daemon: DaemonSettings,

    /// OS clipboard access settings.
    pub clipboard: ClipboardSettings,

    /// Menu front-end settings.
    pub menu: MenuSettings,
}

impl Settings {
    /// Load settings from file.
    ///
    /// A missing file is not an error, it simply yields default settings.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError`] parse variants if file contents are invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match read_to_string(path) {
            Ok(data) => data.parse(),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(ConfigError::Read {
                source: error.into(),
                path: path.to_path_buf(),
            }),
        }
    }

    /// Resolve state directory.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if no state directory is configured
    ///   and the default one cannot be determined.
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_state_dir()?),
        }
    }

    /// Verify settings are internally consistent.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.daemon.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("daemon.poll_interval_ms must be positive".into()));
        }

        if self.daemon.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid("daemon.read_timeout_ms must be positive".into()));
        }

        // INVARIANT: A freshly pinned clip must always fit into pinned.
        if self.history.max_pinned == 0 {
            return Err(ConfigError::Invalid("history.max_pinned must be positive".into()));
        }

        if self.history.max_text == 0 {
            return Err(ConfigError::Invalid("history.max_text must be positive".into()));
        }

        if self.clipboard.backend == Backend::Custom {
            match &self.clipboard.commands {
                Some(commands)
                    if !commands.types.is_empty()
                        && !commands.read.is_empty()
                        && !commands.write.is_empty() => {}
                _ => {
                    return Err(ConfigError::Invalid(
                        "clipboard.backend = \"custom\" needs non-empty clipboard.commands types, read, and write".into(),
                    ))
                }
            }
        }

        if self.menu.frontend == Frontend::Custom
            && self.menu.command.as_ref().is_none_or(Vec::is_empty)
        {
            return Err(ConfigError::Invalid(
                "menu.frontend = \"custom\" needs a non-empty menu.command".into(),
            ));
        }

        Ok(())
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on state directory field.
        if let Some(dir) = &settings.state_dir {
            settings.state_dir = Some(PathBuf::from(
                shellexpand::full(dir.to_string_lossy().as_ref())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            ));
        }

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Daemon polling settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Time between two clipboard polls.
    pub poll_interval_ms: u64,

    /// Upper bound of any single clipboard read.
    pub read_timeout_ms: u64,
}

impl DaemonSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            read_timeout_ms: 2000,
        }
    }
}

/// OS clipboard access settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClipboardSettings {
    /// Clipboard program family to use.
    pub backend: Backend,

    /// Track images in addition to text.
    pub images: bool,

    /// Command templates for custom backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands: Option<ClipboardCommands>,
}

impl Default for ClipboardSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Auto,
            images: true,
            commands: None,
        }
    }
}

/// Clipboard program family.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Pick wayland if `WAYLAND_DISPLAY` is set, xclip otherwise.
    #[default]
    Auto,
    Xclip,
    Wayland,
    Custom,
}

/// Argument vectors used to talk to a clipboard program.
///
/// Any `{mime}` argument is replaced by the MIME type in question.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ClipboardCommands {
    /// List available MIME types, one per line.
    pub types: Vec<String>,

    /// Print content of given MIME type to stdout.
    pub read: Vec<String>,

    /// Take content of given MIME type from stdin.
    pub write: Vec<String>,
}

/// Menu front-end settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MenuSettings {
    /// Menu program to use.
    pub frontend: Frontend,

    /// Number of lines menu shows at once.
    pub lines: usize,

    /// Maximum number of characters of a clip preview.
    pub preview_max: usize,

    /// Argument vector for custom front-end. Supports `{prompt}` and `{lines}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,

    /// What custom front-end prints for a selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyFormat>,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            frontend: Frontend::Dmenu,
            lines: 20,
            preview_max: 60,
            command: None,
            reply: None,
        }
    }
}

/// Supported menu programs.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frontend {
    #[default]
    Dmenu,
    Rofi,
    Wofi,
    Fuzzel,
    Custom,
}

/// Shape of a menu front-end's reply.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyFormat {
    /// Selected line is echoed back verbatim.
    #[default]
    Label,

    /// Zero-based index of selected line.
    Index,
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file {:?}", path.display())]
    Read {
        #[source]
        source: std::sync::Arc<std::io::Error>,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Configuration values contradict each other.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Default paths cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] crate::path::NoWayHome),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
