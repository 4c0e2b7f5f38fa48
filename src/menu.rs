// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Menu front-end adapter.
//!
//! Interactive commands present their choices through an external dmenu-style
//! program. The contract is tiny: lines go in on stdin, the selection comes
//! back on stdout. Depending on the program the selection is either the
//! chosen line itself, or its zero-based index. Empty output or a non-zero
//! exit status both mean the user cancelled.

use crate::config::{Frontend, MenuSettings, ReplyFormat};

use std::process::Stdio;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, instrument, warn};

/// Selection reported by a menu front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuReply {
    /// Chosen line, verbatim.
    Label(String),

    /// Zero-based index of chosen line.
    Index(usize),
}

/// Layer of indirection for menu front-ends.
#[allow(async_fn_in_trait)]
pub trait MenuFrontEnd {
    /// Present lines to user and wait for a choice.
    ///
    /// Return `None` if user cancelled.
    async fn choose(&self, prompt: &str, lines: &[String]) -> Result<Option<MenuReply>>;
}

/// Menu front-end run as external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMenu {
    command: Vec<String>,
    reply: ReplyFormat,
    lines: usize,
}

impl CommandMenu {
    /// Construct new menu front-end from argument vector template.
    ///
    /// Arguments `{prompt}` and `{lines}` are substituted on every run.
    pub fn new(command: Vec<String>, reply: ReplyFormat, lines: usize) -> Self {
        Self {
            command,
            reply,
            lines,
        }
    }

    /// Construct menu front-end from menu settings.
    pub fn from_settings(settings: &MenuSettings) -> Self {
        let (command, reply): (&[&str], ReplyFormat) = match settings.frontend {
            Frontend::Dmenu => (&["dmenu", "-l", "{lines}", "-p", "{prompt}"], ReplyFormat::Label),
            Frontend::Rofi => (
                &["rofi", "-dmenu", "-i", "-l", "{lines}", "-p", "{prompt}", "-format", "i"],
                ReplyFormat::Index,
            ),
            Frontend::Wofi => (
                &["wofi", "--dmenu", "--prompt", "{prompt}", "--lines", "{lines}"],
                ReplyFormat::Label,
            ),
            Frontend::Fuzzel => (
                &["fuzzel", "--dmenu", "--index", "--prompt", "{prompt} ", "--lines", "{lines}"],
                ReplyFormat::Index,
            ),
            Frontend::Custom => {
                return Self::new(
                    settings.command.clone().unwrap_or_default(),
                    settings.reply.unwrap_or_default(),
                    settings.lines,
                )
            }
        };

        Self::new(
            command.iter().map(|arg| (*arg).to_owned()).collect(),
            reply,
            settings.lines,
        )
    }

    /// Program this front-end runs.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    fn expand(&self, prompt: &str) -> Vec<String> {
        let lines = self.lines.to_string();
        self.command
            .iter()
            .map(|arg| arg.replace("{prompt}", prompt).replace("{lines}", &lines))
            .collect()
    }
}

impl MenuFrontEnd for CommandMenu {
    #[instrument(skip(self, lines), fields(count = lines.len()), level = "debug")]
    async fn choose(&self, prompt: &str, lines: &[String]) -> Result<Option<MenuReply>> {
        let command = self.expand(prompt);
        let (program, args) = command.split_first().ok_or(MenuError::EmptyCommand)?;
        let io_error = |source| MenuError::Io {
            source,
            program: program.clone(),
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(io_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            let mut input = lines.join("\n");
            input.push('\n');

            // INVARIANT: Menu may quit before reading everything, that is a cancel.
            if let Err(error) = stdin.write_all(input.as_bytes()).await {
                debug!("menu stopped reading input: {error}");
            }
        }

        let output = child.wait_with_output().await.map_err(io_error)?;
        if !output.status.success() {
            debug!("menu exited with {}", output.status);
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let selection = stdout.trim_end_matches(['\n', '\r']);
        if selection.is_empty() {
            return Ok(None);
        }

        Ok(match self.reply {
            ReplyFormat::Label => Some(MenuReply::Label(selection.to_owned())),
            ReplyFormat::Index => match selection.trim().parse::<usize>() {
                Ok(index) => Some(MenuReply::Index(index)),
                Err(_) => {
                    warn!("menu replied with {selection:?} instead of an index");
                    None
                }
            },
        })
    }
}

/// Menu front-end error types.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    /// Menu command has no program.
    #[error("menu command is empty")]
    EmptyCommand,

    /// Menu program cannot be run, or its pipes fail.
    #[error("failed to run menu program {program:?}")]
    Io {
        #[source]
        source: std::io::Error,
        program: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = MenuError> = std::result::Result<T, E>;
