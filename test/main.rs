// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::Result;
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

/// Argument vector running script through `sh -c`.
///
/// Extra arguments show up as `$0`, `$1`, and so on inside the script.
pub(crate) fn sh<const N: usize>(script: impl Into<String>, args: [&str; N]) -> Vec<String> {
    let mut argv = vec!["sh".to_string(), "-c".into(), script.into()];
    argv.extend(args.into_iter().map(str::to_owned));
    argv
}

/// Scratch directory holding files that fake clipboard programs read and
/// write.
pub(crate) struct ScratchFixture {
    dir: tempfile::TempDir,
}

impl ScratchFixture {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub(crate) fn path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    pub(crate) fn write(&self, name: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.path(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

/// Poll until condition holds or deadline passes.
pub(crate) async fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    condition()
}
