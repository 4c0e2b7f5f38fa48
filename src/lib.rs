// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Clipboard history manager.
//!
//! Clipmgr records clipboard contents into a bounded history, lets the user
//! pin clips so they survive history trimming, and restores any recorded
//! clip back onto the clipboard through a dmenu-style menu.
//!
//! A long running [daemon](crate::daemon) polls the clipboard and writes
//! history to disk. Short lived foreground commands, i.e., `select`, `pin`,
//! and `clear`, reload state from disk, act, and exit. Both sides share the
//! same [state directory](crate::path::StatePaths) without any locking.

pub mod clip;
pub mod clipboard;
pub mod config;
pub mod daemon;
pub mod image_cache;
pub mod menu;
pub mod path;
pub mod persist;
pub mod select;
pub mod store;

#[cfg(test)]
mod testing;

use crate::{
    clipboard::{ClipboardBridge, CommandClipboard},
    config::{ConfigError, Settings},
    daemon::{Daemon, IntervalTicker},
    image_cache::ImageCache,
    menu::CommandMenu,
    path::{find_executable, StatePaths},
    persist::Persistence,
    select::Selector,
};

use std::path::PathBuf;
use tracing::debug;

/// Everything a command needs to build its components.
///
/// Built once at startup and handed to whatever the command runs.
#[derive(Debug, Clone)]
pub struct Context {
    settings: Settings,
    paths: StatePaths,
}

impl Context {
    /// Construct new context from settings.
    ///
    /// Validates settings and makes sure the state directory exists.
    ///
    /// # Errors
    ///
    /// - Return [`SetupError::Config`] if settings are invalid, or the state
    ///   directory cannot be determined.
    /// - Return [`SetupError::StateDir`] if the state directory cannot be
    ///   created.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let paths = StatePaths::new(settings.state_dir()?);
        paths.ensure().map_err(|source| SetupError::StateDir {
            source,
            path: paths.dir.clone(),
        })?;
        debug!("using state directory {:?}", paths.dir.display());

        Ok(Self { settings, paths })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    pub fn image_cache(&self) -> ImageCache {
        ImageCache::new(&self.paths.images, self.settings.clipboard.images.into())
    }

    pub fn persistence(&self) -> Persistence {
        Persistence::new(self.paths.clone(), self.image_cache())
    }

    /// Construct clipboard bridge on top of configured clipboard programs.
    ///
    /// # Errors
    ///
    /// - Return [`SetupError::MissingTool`] if a clipboard program is not
    ///   installed.
    pub fn clipboard(&self) -> Result<ClipboardBridge<CommandClipboard>> {
        let provider = CommandClipboard::from_settings(&self.settings.clipboard);
        for program in provider.programs() {
            require(program)?;
        }

        Ok(ClipboardBridge::new(
            provider,
            self.image_cache(),
            self.settings.daemon.read_timeout(),
        ))
    }

    /// Construct configured menu front-end.
    ///
    /// # Errors
    ///
    /// - Return [`SetupError::MissingTool`] if the menu program is not
    ///   installed.
    pub fn menu(&self) -> Result<CommandMenu> {
        let menu = CommandMenu::from_settings(&self.settings.menu);
        require(menu.program().unwrap_or_default())?;
        Ok(menu)
    }

    /// Construct clipboard polling daemon.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - Return [`SetupError::MissingTool`] if a clipboard program is not
    ///   installed.
    pub fn daemon(&self) -> Result<Daemon<CommandClipboard, IntervalTicker>> {
        Ok(Daemon::new(
            self.clipboard()?,
            self.persistence(),
            IntervalTicker::new(self.settings.daemon.poll_interval()),
            self.settings.history,
        ))
    }

    /// Construct menu driven selector.
    ///
    /// # Errors
    ///
    /// - Return [`SetupError::MissingTool`] if a clipboard program or the menu
    ///   program is not installed.
    pub fn selector(&self) -> Result<Selector<CommandClipboard, CommandMenu>> {
        Ok(Selector::new(
            self.clipboard()?,
            self.menu()?,
            self.persistence(),
            self.settings.history,
            self.settings.menu.preview_max,
        ))
    }
}

fn require(program: &str) -> Result<()> {
    match find_executable(program) {
        Some(path) => {
            debug!("found {program} at {:?}", path.display());
            Ok(())
        }
        None => Err(SetupError::MissingTool(program.to_owned())),
    }
}

/// Startup error types.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Settings are unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// State directory cannot be created.
    #[error("failed to create state directory {:?}", path.display())]
    StateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Required external program is not installed.
    #[error("required program {0:?} not found in PATH")]
    MissingTool(String),
}

/// Friendly result alias :3
pub type Result<T, E = SetupError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Backend, ClipboardCommands, Frontend};
    use sealed_test::prelude::*;

    fn settings(dir: &std::path::Path) -> Settings {
        let mut settings = Settings {
            state_dir: Some(dir.to_path_buf()),
            ..Default::default()
        };
        settings.clipboard.backend = Backend::Custom;
        settings.clipboard.commands = Some(ClipboardCommands {
            types: vec!["sh".into(), "-c".into(), "true".into()],
            read: vec!["sh".into(), "-c".into(), "true".into()],
            write: vec!["sh".into(), "-c".into(), "cat > /dev/null".into()],
        });
        settings
    }

    #[sealed_test]
    fn context_creates_state_dir() -> anyhow::Result<()> {
        let dir = std::env::current_dir()?.join("state");
        let context = Context::new(settings(&dir))?;
        assert!(context.paths().dir.is_dir());
        assert!(context.paths().images.is_dir());

        Ok(())
    }

    #[sealed_test]
    fn context_rejects_invalid_settings() -> anyhow::Result<()> {
        let mut settings = settings(&std::env::current_dir()?);
        settings.daemon.poll_interval_ms = 0;
        assert!(matches!(Context::new(settings), Err(SetupError::Config(_))));

        Ok(())
    }

    #[cfg(unix)]
    #[sealed_test]
    fn missing_tools_are_reported() -> anyhow::Result<()> {
        let mut settings = settings(&std::env::current_dir()?);
        settings.menu.frontend = Frontend::Custom;
        settings.menu.command = Some(vec!["clipmgr-no-such-menu".into()]);

        let context = Context::new(settings)?;
        assert!(context.clipboard().is_ok());
        assert!(matches!(
            context.menu(),
            Err(SetupError::MissingTool(program)) if program == "clipmgr-no-such-menu"
        ));
        assert!(context.selector().is_err());

        Ok(())
    }
}
