// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for the files clipmgr reads and
//! writes: its configuration file, and the state directory that houses the
//! history document, the pinned document, and the image cache.
//!
//! # State Directory Layout
//!
//! ```text
//! $XDG_CACHE_HOME/clipboard/
//! ├── history.json
//! ├── pinned.json
//! └── images/
//!     └── <hash>.png
//! ```

use std::{
    env,
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Determine default absolute path to state directory.
///
/// Uses XDG Base Directory path `$XDG_CACHE_HOME/clipboard` as the default
/// absolute path. Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_state_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|path| path.join("clipboard"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to configuration file.
///
/// Uses `$XDG_CONFIG_HOME/clipmgr/config.toml`. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("clipmgr").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Locate an executable through the `PATH` environment variable.
///
/// Programs given as a path (anything containing a separator) are checked
/// directly instead.
pub fn find_executable(program: impl AsRef<OsStr>) -> Option<PathBuf> {
    let program = Path::new(program.as_ref());
    if program.components().count() > 1 {
        return is_executable(program).then(|| program.to_path_buf());
    }

    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Locations of every file clipmgr persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub dir: PathBuf,
    pub history: PathBuf,
    pub pinned: PathBuf,
    pub images: PathBuf,
}

impl StatePaths {
    /// Lay out state files under target directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            history: dir.join("history.json"),
            pinned: dir.join("pinned.json"),
            images: dir.join("images"),
            dir,
        }
    }

    /// Create state directory and image directory if missing.
    ///
    /// # Errors
    ///
    /// - Return [`std::io::Error`] if either directory cannot be created.
    pub fn ensure(&self) -> std::io::Result<()> {
        mkdirp::mkdirp(&self.dir)?;
        mkdirp::mkdirp(&self.images)?;
        Ok(())
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::cache_dir`](https://docs.rs/dirs/latest/dirs/fn.cache_dir.html)
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
