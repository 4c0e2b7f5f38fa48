// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! OS clipboard access.
//!
//! Clipmgr never talks to a display server itself. It shells out to the
//! usual clipboard programs, i.e., xclip on X11 or wl-clipboard on Wayland,
//! through a small [`ClipboardProvider`] contract: list available MIME types,
//! read content of one MIME type, write content of one MIME type. Every call
//! is bounded by a timeout, so a hung clipboard owner cannot stall the daemon.
//!
//! [`ClipboardBridge`] sits on top of a provider and speaks in clips instead of
//! bytes. Reading prefers images over text when image support is enabled,
//! routing image payloads through the [image cache](crate::image_cache).
//!
//! # Clipboard Ownership
//!
//! On both X11 and Wayland the clipboard is not a buffer, it is a promise by
//! some process to hand out content on request. Writing to the clipboard
//! therefore leaves a holder process behind (xclip and wl-copy both fork one)
//! that must outlive clipmgr. We spawn the clipboard program in its own
//! process group and stop waiting for it after a short grace period, so the
//! holder keeps serving the selection after clipmgr exits.

use crate::{
    clip::Clip,
    config::{Backend, ClipboardCommands, ClipboardSettings},
    image_cache::{ImageCache, ImageError},
};

use std::{env, process::Stdio, time::Duration};
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};
use tracing::{debug, instrument, warn};

/// MIME type of PNG images.
pub const PNG_MIME: &str = "image/png";

/// Text targets in order of preference.
const TEXT_TARGETS: &[&str] = &[
    "text/plain;charset=utf-8",
    "UTF8_STRING",
    "text/plain",
    "STRING",
    "TEXT",
];

/// Layer of indirection for OS clipboard primitive.
#[allow(async_fn_in_trait)]
pub trait ClipboardProvider {
    /// Name of provider for diagnostics.
    fn name(&self) -> &str;

    /// MIME type used to write plain text, and to read it when the provider
    /// cannot list types.
    fn text_mime(&self) -> &str;

    /// List MIME types currently offered by the clipboard.
    async fn get_types(&self, limit: Duration) -> Result<Vec<String>>;

    /// Read clipboard content of target MIME type.
    async fn read(&self, mime: &str, limit: Duration) -> Result<Vec<u8>>;

    /// Place content of target MIME type on the clipboard.
    async fn write(&self, data: &[u8], mime: &str, limit: Duration) -> Result<()>;
}

/// Clipboard provider backed by external clipboard programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboard {
    name: String,
    commands: ClipboardCommands,
    text_mime: String,
    hold_grace: Duration,
}

impl CommandClipboard {
    /// Provider for X11 through xclip.
    pub fn xclip() -> Self {
        Self {
            name: "xclip".into(),
            commands: ClipboardCommands {
                types: argv(["xclip", "-selection", "clipboard", "-o", "-t", "TARGETS"]),
                read: argv(["xclip", "-selection", "clipboard", "-o", "-t", "{mime}"]),
                write: argv(["xclip", "-selection", "clipboard", "-t", "{mime}", "-i"]),
            },
            text_mime: "UTF8_STRING".into(),
            hold_grace: Duration::from_millis(200),
        }
    }

    /// Provider for Wayland through wl-clipboard.
    pub fn wayland() -> Self {
        Self {
            name: "wl-clipboard".into(),
            commands: ClipboardCommands {
                types: argv(["wl-paste", "--list-types"]),
                read: argv(["wl-paste", "--no-newline", "--type", "{mime}"]),
                write: argv(["wl-copy", "--type", "{mime}"]),
            },
            text_mime: "text/plain;charset=utf-8".into(),
            hold_grace: Duration::from_millis(200),
        }
    }

    /// Provider running user supplied command templates.
    pub fn custom(commands: ClipboardCommands) -> Self {
        Self {
            name: "custom".into(),
            commands,
            text_mime: "text/plain".into(),
            hold_grace: Duration::from_millis(200),
        }
    }

    /// Construct provider from clipboard settings.
    ///
    /// The automatic backend picks Wayland if `WAYLAND_DISPLAY` is set.
    pub fn from_settings(settings: &ClipboardSettings) -> Self {
        match settings.backend {
            Backend::Xclip => Self::xclip(),
            Backend::Wayland => Self::wayland(),
            Backend::Custom => Self::custom(settings.commands.clone().unwrap_or_default()),
            Backend::Auto if env::var_os("WAYLAND_DISPLAY").is_some() => Self::wayland(),
            Backend::Auto => Self::xclip(),
        }
    }

    /// Set how long a write waits on the clipboard program before leaving it
    /// running as holder process.
    pub fn with_hold_grace(mut self, grace: Duration) -> Self {
        self.hold_grace = grace;
        self
    }

    /// Set MIME type used for plain text.
    pub fn with_text_mime(mut self, mime: impl Into<String>) -> Self {
        self.text_mime = mime.into();
        self
    }

    /// Programs this provider needs installed.
    pub fn programs(&self) -> Vec<&str> {
        let mut programs = Vec::new();
        for command in [&self.commands.types, &self.commands.read, &self.commands.write] {
            if let Some(program) = command.first() {
                if !programs.contains(&program.as_str()) {
                    programs.push(program.as_str());
                }
            }
        }
        programs
    }
}

impl ClipboardProvider for CommandClipboard {
    fn name(&self) -> &str {
        &self.name
    }

    fn text_mime(&self) -> &str {
        &self.text_mime
    }

    async fn get_types(&self, limit: Duration) -> Result<Vec<String>> {
        let output = capture(&self.commands.types, limit).await?;
        Ok(String::from_utf8_lossy(&output)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    async fn read(&self, mime: &str, limit: Duration) -> Result<Vec<u8>> {
        capture(&expand(&self.commands.read, mime), limit).await
    }

    async fn write(&self, data: &[u8], mime: &str, limit: Duration) -> Result<()> {
        feed(&expand(&self.commands.write, mime), data, limit, self.hold_grace).await
    }
}

/// Clip level access to the OS clipboard.
#[derive(Debug, Clone)]
pub struct ClipboardBridge<P>
where
    P: ClipboardProvider,
{
    provider: P,
    images: ImageCache,
    limit: Duration,
}

impl<P> ClipboardBridge<P>
where
    P: ClipboardProvider,
{
    /// Construct new clipboard bridge.
    ///
    /// Every clipboard call is bounded by `limit`.
    pub fn new(provider: P, images: ImageCache, limit: Duration) -> Self {
        Self {
            provider,
            images,
            limit,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Read current clipboard content as a clip.
    ///
    /// Images win over text if image support is enabled. An image that cannot
    /// be stored is treated as absent, and reading falls through to text.
    /// Text has trailing newlines stripped and is ignored if blank.
    ///
    /// Returns `None` if the clipboard is empty, unreadable, or too slow.
    #[instrument(skip(self), fields(provider = self.provider.name()), level = "debug")]
    pub async fn read(&self) -> Option<Clip> {
        let types = match self.provider.get_types(self.limit).await {
            Ok(types) => types,
            Err(error) => {
                debug!("cannot list clipboard types: {error}");
                Vec::new()
            }
        };

        if self.images.is_enabled() {
            if let Some(mime) = image_mime(&types) {
                if let Some(clip) = self.read_image(mime).await {
                    return Some(clip);
                }
            }
        }

        let mime = match text_mime(&types) {
            Some(mime) => mime,
            None if types.is_empty() => self.provider.text_mime(),
            None => {
                debug!("no text target among {types:?}");
                return None;
            }
        };

        let bytes = match self.provider.read(mime, self.limit).await {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!("cannot read clipboard text: {error}");
                return None;
            }
        };

        let text = String::from_utf8_lossy(&bytes);
        let text = text.trim_end_matches(['\n', '\r']);
        if text.trim().is_empty() {
            return None;
        }

        Some(Clip::text(text).with_mime(mime))
    }

    /// Place clip back onto the clipboard.
    ///
    /// # Errors
    ///
    /// - Return [`ClipboardError::Image`] if image payload cannot be loaded.
    /// - Return [`ClipboardError`] command variants if the clipboard program
    ///   fails.
    #[instrument(skip(self, clip), fields(provider = self.provider.name()), level = "debug")]
    pub async fn write(&self, clip: &Clip) -> Result<()> {
        if let Some(text) = clip.as_text() {
            return self
                .provider
                .write(text.as_bytes(), self.provider.text_mime(), self.limit)
                .await;
        }

        if let Some(image_ref) = clip.image_ref() {
            let data = self.images.load(image_ref)?;
            return self.provider.write(&data, PNG_MIME, self.limit).await;
        }

        Ok(())
    }

    async fn read_image(&self, mime: &str) -> Option<Clip> {
        let bytes = match self.provider.read(mime, self.limit).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return None,
            Err(error) => {
                debug!("cannot read clipboard image: {error}");
                return None;
            }
        };

        match self.images.store(&bytes) {
            Ok(image_ref) => Some(Clip::image(image_ref, Some(mime.to_owned()))),
            Err(error) => {
                warn!("ignoring clipboard image: {error}");
                None
            }
        }
    }
}

fn image_mime(types: &[String]) -> Option<&str> {
    types
        .iter()
        .find(|mime| mime.as_str() == PNG_MIME)
        .or_else(|| types.iter().find(|mime| mime.starts_with("image/")))
        .map(String::as_str)
}

fn text_mime(types: &[String]) -> Option<&str> {
    TEXT_TARGETS
        .iter()
        .find(|target| types.iter().any(|mime| mime.eq_ignore_ascii_case(target)))
        .copied()
}

fn argv<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.into_iter().map(str::to_owned).collect()
}

fn expand(template: &[String], mime: &str) -> Vec<String> {
    template
        .iter()
        .map(|arg| arg.replace("{mime}", mime))
        .collect()
}

async fn capture(command: &[String], limit: Duration) -> Result<Vec<u8>> {
    let (program, args) = command.split_first().ok_or(ClipboardError::EmptyCommand)?;
    let output = timeout(
        limit,
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| ClipboardError::Timeout {
        program: program.clone(),
        limit,
    })?
    .map_err(|source| ClipboardError::Spawn {
        source,
        program: program.clone(),
    })?;

    if !output.status.success() {
        return Err(ClipboardError::Status {
            program: program.clone(),
            status: output.status,
        });
    }

    Ok(output.stdout)
}

async fn feed(command: &[String], data: &[u8], limit: Duration, grace: Duration) -> Result<()> {
    let (program, args) = command.split_first().ok_or(ClipboardError::EmptyCommand)?;
    let spawn_error = |source| ClipboardError::Spawn {
        source,
        program: program.clone(),
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // INVARIANT: Holder process must not die with our session or terminal.
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(spawn_error)?;
    if let Some(mut stdin) = child.stdin.take() {
        let written = timeout(limit, async {
            stdin.write_all(data).await?;
            stdin.shutdown().await
        })
        .await;

        let failure = match written {
            Ok(Ok(())) => None,
            Ok(Err(source)) => Some(spawn_error(source)),
            Err(_) => Some(ClipboardError::Timeout {
                program: program.clone(),
                limit,
            }),
        };

        // INVARIANT: A holder that never got its full payload must not linger.
        if let Some(error) = failure {
            if let Err(kill_error) = child.start_kill() {
                debug!("cannot kill {program}: {kill_error}");
            }
            return Err(error);
        }
    }

    match timeout(grace, child.wait()).await {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(ClipboardError::Status {
            program: program.clone(),
            status,
        }),
        Ok(Err(source)) => Err(spawn_error(source)),
        Err(_) => {
            debug!("{program} keeps running as clipboard holder");
            Ok(())
        }
    }
}

/// Clipboard access error types.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// Command template has no program.
    #[error("clipboard command is empty")]
    EmptyCommand,

    /// Clipboard program cannot be run, or its pipes fail.
    #[error("failed to run clipboard program {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Clipboard program did not finish in time.
    #[error("clipboard program {program:?} timed out after {limit:?}")]
    Timeout { program: String, limit: Duration },

    /// Clipboard program reported failure.
    #[error("clipboard program {program:?} failed with {status}")]
    Status {
        program: String,
        status: std::process::ExitStatus,
    },

    /// Image payload cannot be loaded.
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Friendly result alias :3
pub type Result<T, E = ClipboardError> = std::result::Result<T, E>;
