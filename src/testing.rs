// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! In-memory stand-ins for external programs.

use crate::{
    clipboard::{ClipboardError, ClipboardProvider, Result as ClipboardResult},
    menu::{MenuFrontEnd, MenuReply, Result as MenuResult},
};

use std::{collections::VecDeque, sync::Mutex, time::Duration};

/// Clipboard held in memory.
///
/// Offers any number of MIME types at once, like a real clipboard owner.
#[derive(Debug, Default)]
pub(crate) struct FakeClipboard {
    offers: Mutex<Vec<(String, Vec<u8>)>>,
    writes: Mutex<usize>,
}

impl FakeClipboard {
    pub(crate) fn set_text(&self, text: &str) {
        self.set("text/plain;charset=utf-8", text.as_bytes().to_vec());
    }

    /// Replace clipboard content with single offer.
    pub(crate) fn set(&self, mime: &str, data: Vec<u8>) {
        *self.offers.lock().unwrap() = vec![(mime.to_owned(), data)];
    }

    /// Add another offer to current clipboard content.
    pub(crate) fn also(&self, mime: &str, data: Vec<u8>) {
        self.offers.lock().unwrap().push((mime.to_owned(), data));
    }

    pub(crate) fn clear(&self) {
        self.offers.lock().unwrap().clear();
    }

    /// First offer of current clipboard content.
    pub(crate) fn content(&self) -> Option<(String, Vec<u8>)> {
        self.offers.lock().unwrap().first().cloned()
    }

    pub(crate) fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl ClipboardProvider for FakeClipboard {
    fn name(&self) -> &str {
        "fake"
    }

    fn text_mime(&self) -> &str {
        "text/plain;charset=utf-8"
    }

    async fn get_types(&self, _limit: Duration) -> ClipboardResult<Vec<String>> {
        Ok(self
            .offers
            .lock()
            .unwrap()
            .iter()
            .map(|(mime, _)| mime.clone())
            .collect())
    }

    async fn read(&self, mime: &str, limit: Duration) -> ClipboardResult<Vec<u8>> {
        self.offers
            .lock()
            .unwrap()
            .iter()
            .find(|(offer, _)| offer == mime)
            .map(|(_, data)| data.clone())
            .ok_or(ClipboardError::Timeout {
                program: "fake".into(),
                limit,
            })
    }

    async fn write(&self, data: &[u8], mime: &str, _limit: Duration) -> ClipboardResult<()> {
        self.set(mime, data.to_vec());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Menu front-end that replays canned replies and records what it was shown.
#[derive(Debug, Default)]
pub(crate) struct ScriptedMenu {
    replies: Mutex<VecDeque<Option<MenuReply>>>,
    shown: Mutex<Vec<Vec<String>>>,
}

impl ScriptedMenu {
    pub(crate) fn new(replies: impl IntoIterator<Item = Option<MenuReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Every line list handed to the menu so far.
    pub(crate) fn shown(&self) -> Vec<Vec<String>> {
        self.shown.lock().unwrap().clone()
    }
}

impl MenuFrontEnd for ScriptedMenu {
    async fn choose(&self, _prompt: &str, lines: &[String]) -> MenuResult<Option<MenuReply>> {
        self.shown.lock().unwrap().push(lines.to_vec());
        Ok(self.replies.lock().unwrap().pop_front().flatten())
    }
}
