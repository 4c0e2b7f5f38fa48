// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Interactive selection of clips.
//!
//! The foreground commands `select`, `pin`, and `clear` all follow the same
//! pattern: reload the clip store from disk, show it to the user through a
//! [menu front-end](crate::menu), then act on the chosen clip.
//!
//! # Labels
//!
//! Every clip shown in a menu carries a tag in front of its preview. Pinned
//! clips are tagged `[P1]`, `[P2]`, and so on, history clips `[1]`, `[2]`,
//! and so on. Previews of two clips may be identical, but tags never are, so a
//! label reply is resolved through its tag alone.

use crate::{
    clip::{Clip, ClipContent},
    clipboard::{ClipboardBridge, ClipboardError, ClipboardProvider},
    menu::{MenuError, MenuFrontEnd, MenuReply},
    persist::Persistence,
    store::{ClipStore, Limits, PinOutcome},
};

use tracing::{debug, error, info, instrument};

const SELECT_PROMPT: &str = "Clipboard History:";
const PIN_PROMPT: &str = "Pin/Unpin:";
const PINNED_HEADER: &str = "=== PINNED (select to unpin) ===";
const HISTORY_HEADER: &str = "=== HISTORY (select to pin) ===";

/// Position of a clip inside the clip store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Zero-based position in pinned.
    Pinned(usize),

    /// Zero-based position in history.
    History(usize),
}

impl Target {
    /// Look up targeted clip.
    pub fn get<'store>(&self, store: &'store ClipStore) -> Option<&'store Clip> {
        match *self {
            Target::Pinned(index) => store.pinned().get(index),
            Target::History(index) => store.history().get(index),
        }
    }
}

/// Single line of a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLine {
    pub label: String,

    /// Clip this line stands for. Headers and separators stand for nothing.
    pub target: Option<Target>,
}

impl MenuLine {
    fn clip(label: String, target: Target) -> Self {
        Self {
            label,
            target: Some(target),
        }
    }

    fn decoration(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: None,
        }
    }
}

/// Display projection of clip store handed to a menu front-end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Menu {
    lines: Vec<MenuLine>,
}

impl Menu {
    /// Flat menu of pinned clips followed by history clips.
    pub fn for_select(store: &ClipStore, preview_max: usize) -> Self {
        let mut lines = Vec::new();
        lines.extend(pinned_lines(store, preview_max));
        lines.extend(history_lines(store, preview_max));
        Self { lines }
    }

    /// Grouped menu with one header per non-empty group.
    pub fn for_pin(store: &ClipStore, preview_max: usize) -> Self {
        let mut lines = Vec::new();
        if !store.pinned().is_empty() {
            lines.push(MenuLine::decoration(PINNED_HEADER));
            lines.extend(pinned_lines(store, preview_max));
            lines.push(MenuLine::decoration(""));
        }

        if !store.history().is_empty() {
            lines.push(MenuLine::decoration(HISTORY_HEADER));
            lines.extend(history_lines(store, preview_max));
        }

        Self { lines }
    }

    pub fn lines(&self) -> &[MenuLine] {
        &self.lines
    }

    pub fn labels(&self) -> Vec<String> {
        self.lines.iter().map(|line| line.label.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Map reply of menu front-end back to clip it stands for.
    ///
    /// Return `None` for headers, separators, out of range indices, and
    /// labels without a known tag.
    pub fn resolve(&self, reply: &MenuReply) -> Option<Target> {
        match reply {
            MenuReply::Index(index) => self.lines.get(*index)?.target,
            MenuReply::Label(label) => {
                let target = parse_tag(label)?;
                self.lines
                    .iter()
                    .any(|line| line.target == Some(target))
                    .then_some(target)
            }
        }
    }
}

fn pinned_lines(store: &ClipStore, preview_max: usize) -> impl Iterator<Item = MenuLine> + '_ {
    store.pinned().iter().enumerate().map(move |(index, clip)| {
        MenuLine::clip(
            format!("[P{}] {}", index + 1, preview(clip, preview_max)),
            Target::Pinned(index),
        )
    })
}

fn history_lines(store: &ClipStore, preview_max: usize) -> impl Iterator<Item = MenuLine> + '_ {
    store.history().iter().enumerate().map(move |(index, clip)| {
        MenuLine::clip(
            format!("[{}] {}", index + 1, preview(clip, preview_max)),
            Target::History(index),
        )
    })
}

/// Render single line preview of a clip.
///
/// Newlines and tabs become spaces. Text longer than `max` characters is cut
/// down to `max` characters followed by an ellipsis.
pub fn preview(clip: &Clip, max: usize) -> String {
    match &clip.content {
        ClipContent::Text(text) => {
            let single: String = text
                .chars()
                .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
                .collect();

            if single.chars().count() > max {
                let mut cut: String = single.chars().take(max).collect();
                cut.push('…');
                cut
            } else {
                single
            }
        }
        ClipContent::Image(image_ref) => match &clip.mime {
            Some(mime) => format!("[image {image_ref}] {mime}"),
            None => format!("[image {image_ref}]"),
        },
    }
}

/// Parse `[P<n>]` or `[<n>]` tag at the start of a label.
pub fn parse_tag(label: &str) -> Option<Target> {
    let rest = label.strip_prefix('[')?;
    let (tag, _) = rest.split_once(']')?;

    let (pinned, number) = match tag.strip_prefix('P') {
        Some(number) => (true, number),
        None => (false, tag),
    };

    // INVARIANT: Tags are one-based, so zero is never valid.
    let index = number.parse::<usize>().ok()?.checked_sub(1)?;
    Some(if pinned {
        Target::Pinned(index)
    } else {
        Target::History(index)
    })
}

/// Foreground clip store actions driven by a menu front-end.
#[derive(Debug)]
pub struct Selector<P, M>
where
    P: ClipboardProvider,
    M: MenuFrontEnd,
{
    bridge: ClipboardBridge<P>,
    frontend: M,
    persistence: Persistence,
    limits: Limits,
    preview_max: usize,
}

impl<P, M> Selector<P, M>
where
    P: ClipboardProvider,
    M: MenuFrontEnd,
{
    /// Construct new selector.
    pub fn new(
        bridge: ClipboardBridge<P>,
        frontend: M,
        persistence: Persistence,
        limits: Limits,
        preview_max: usize,
    ) -> Self {
        Self {
            bridge,
            frontend,
            persistence,
            limits,
            preview_max,
        }
    }

    /// Let user pick a clip and place it back onto the clipboard.
    ///
    /// Return the restored clip, or `None` if there was nothing to pick or
    /// the user cancelled.
    ///
    /// # Errors
    ///
    /// - Return [`SelectError::Menu`] if menu front-end cannot be run.
    /// - Return [`SelectError::Clipboard`] if clip cannot be restored.
    #[instrument(skip(self), level = "debug")]
    pub async fn select(&self) -> Result<Option<Clip>> {
        let store = self.persistence.load_store(self.limits);
        let menu = Menu::for_select(&store, self.preview_max);
        let Some(target) = self.choose(&menu, SELECT_PROMPT).await? else {
            return Ok(None);
        };

        let Some(clip) = target.get(&store) else {
            return Ok(None);
        };

        self.bridge.write(clip).await?;
        info!("restored clip {} to clipboard", preview(clip, self.preview_max));

        Ok(Some(clip.clone()))
    }

    /// Let user pick a clip and toggle its pin state.
    ///
    /// Picking a pinned clip unpins it, picking a history clip pins it.
    /// Failure to persist the result is logged, not returned.
    ///
    /// # Errors
    ///
    /// - Return [`SelectError::Menu`] if menu front-end cannot be run.
    #[instrument(skip(self), level = "debug")]
    pub async fn pin(&self) -> Result<Option<PinOutcome>> {
        let store = self.persistence.load_store(self.limits);
        let menu = Menu::for_pin(&store, self.preview_max);
        let Some(target) = self.choose(&menu, PIN_PROMPT).await? else {
            return Ok(None);
        };

        let Some(clip) = target.get(&store).cloned() else {
            return Ok(None);
        };

        // INVARIANT: Reload right before mutating, the menu may have been open a while.
        let mut store = self.persistence.load_store(self.limits);
        let wants_unpin = matches!(target, Target::Pinned(_));
        if store.is_pinned(&clip) != wants_unpin {
            debug!("pin state of chosen clip changed while menu was open");
            return Ok(None);
        }

        let outcome = store.toggle_pin(clip);
        match outcome {
            PinOutcome::Pinned => info!("pinned clip ({} pinned)", store.pinned().len()),
            PinOutcome::Unpinned => info!("unpinned clip ({} pinned)", store.pinned().len()),
        }

        if let Err(error) = self.persistence.save_all(&store) {
            error!("failed to save clip store: {error}");
        }

        Ok(Some(outcome))
    }

    /// Remove every clip from history, leaving pinned clips alone.
    pub fn clear(&self) {
        clear_history(&self.persistence, self.limits);
    }

    async fn choose(&self, menu: &Menu, prompt: &str) -> Result<Option<Target>> {
        if menu.is_empty() {
            info!("clipboard history is empty");
            return Ok(None);
        }

        let Some(reply) = self.frontend.choose(prompt, &menu.labels()).await? else {
            debug!("menu cancelled");
            return Ok(None);
        };

        let target = menu.resolve(&reply);
        if target.is_none() {
            debug!("menu reply {reply:?} does not name a clip");
        }

        Ok(target)
    }
}

/// Remove every clip from history on disk, leaving pinned clips alone.
///
/// Needs neither clipboard nor menu. Failure to persist the result is logged.
#[instrument(skip(persistence), level = "debug")]
pub fn clear_history(persistence: &Persistence, limits: Limits) {
    let mut store = persistence.load_store(limits);
    let cleared = store.history().len();
    store.clear_history();

    match persistence.save_all(&store) {
        Ok(()) => info!("cleared {cleared} clips from history, pinned clips preserved"),
        Err(error) => error!("failed to save clip store: {error}"),
    }
}

/// Selection error types.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// Menu front-end failed.
    #[error(transparent)]
    Menu(#[from] MenuError),

    /// Clipboard could not be written.
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

/// Friendly result alias :3
pub type Result<T, E = SelectError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clip::ImageRef,
        image_cache::{ImageCache, ImageSupport},
        path::StatePaths,
        persist,
        testing::{FakeClipboard, ScriptedMenu},
    };
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;
    use std::{path::Path, time::Duration};

    fn store_of(history: &[&str], pinned: &[&str]) -> ClipStore {
        ClipStore::from_parts(
            history.iter().map(|text| Clip::text(*text)),
            pinned.iter().map(|text| Clip::text(*text)),
            Limits::default(),
        )
    }

    fn selector(dir: &Path, replies: Vec<Option<MenuReply>>) -> Selector<FakeClipboard, ScriptedMenu> {
        let images = ImageCache::new(dir.join("images"), ImageSupport::Enabled);
        Selector::new(
            ClipboardBridge::new(FakeClipboard::default(), images.clone(), Duration::from_secs(1)),
            ScriptedMenu::new(replies),
            Persistence::new(StatePaths::new(dir), images),
            Limits::default(),
            60,
        )
    }

    fn seed(dir: &Path, history: &[&str], pinned: &[&str]) -> anyhow::Result<()> {
        let store = store_of(history, pinned);
        persist::save(store.history(), dir.join("history.json"))?;
        persist::save(store.pinned(), dir.join("pinned.json"))?;
        Ok(())
    }

    fn texts(clips: &[Clip]) -> Vec<&str> {
        clips.iter().filter_map(Clip::as_text).collect()
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview(&Clip::text("a\nb\tc"), 60), "a b c");
        assert_eq!(preview(&Clip::text("abcdef"), 3), "abc…");
        assert_eq!(preview(&Clip::text("abc"), 3), "abc");
        assert_eq!(preview(&Clip::text("ééééé"), 2), "éé…");
    }

    #[test]
    fn preview_image() {
        let image_ref = ImageRef::new("0123456789abcdef.png");
        assert_eq!(
            preview(&Clip::image(image_ref.clone(), Some("image/png".into())), 60),
            "[image 0123456789abcdef.png] image/png"
        );
        assert_eq!(
            preview(&Clip::image(image_ref, None), 60),
            "[image 0123456789abcdef.png]"
        );
    }

    #[test_case("[P1] foo", Some(Target::Pinned(0)); "pinned tag")]
    #[test_case("[12] bar baz", Some(Target::History(11)); "history tag")]
    #[test_case("[0] zero", None; "zero")]
    #[test_case("[P] nothing", None; "missing number")]
    #[test_case("=== HISTORY (select to pin) ===", None; "header")]
    #[test_case("", None; "blank")]
    #[test_case("[3 unterminated", None; "unterminated")]
    #[test]
    fn parse_label_tag(label: &str, expect: Option<Target>) {
        pretty_assertions::assert_eq!(parse_tag(label), expect);
    }

    #[test]
    fn select_menu_labels() {
        let menu = Menu::for_select(&store_of(&["h1", "h2"], &["p1"]), 60);
        assert_eq!(menu.labels(), vec!["[P1] p1", "[1] h1", "[2] h2"]);
    }

    #[test]
    fn pin_menu_labels() {
        let menu = Menu::for_pin(&store_of(&["h1"], &["p1"]), 60);
        assert_eq!(
            menu.labels(),
            vec![PINNED_HEADER, "[P1] p1", "", HISTORY_HEADER, "[1] h1"]
        );

        let menu = Menu::for_pin(&store_of(&["h1"], &[]), 60);
        assert_eq!(menu.labels(), vec![HISTORY_HEADER, "[1] h1"]);
        assert!(Menu::for_pin(&ClipStore::default(), 60).is_empty());
    }

    #[test]
    fn resolve_replies() {
        let menu = Menu::for_pin(&store_of(&["h1", "h2"], &["p1"]), 60);
        assert_eq!(menu.resolve(&MenuReply::Index(0)), None);
        assert_eq!(menu.resolve(&MenuReply::Index(1)), Some(Target::Pinned(0)));
        assert_eq!(menu.resolve(&MenuReply::Index(2)), None);
        assert_eq!(menu.resolve(&MenuReply::Index(5)), Some(Target::History(1)));
        assert_eq!(menu.resolve(&MenuReply::Index(6)), None);
        assert_eq!(
            menu.resolve(&MenuReply::Label("[2] h2".into())),
            Some(Target::History(1))
        );
        assert_eq!(menu.resolve(&MenuReply::Label("[3] h3".into())), None);
        assert_eq!(menu.resolve(&MenuReply::Label(HISTORY_HEADER.into())), None);
    }

    #[test]
    fn resolve_duplicate_previews_by_tag() {
        let (first, second) = (format!("{}a", "x".repeat(80)), format!("{}b", "x".repeat(80)));
        let store = store_of(&[first.as_str(), second.as_str()], &[]);
        let menu = Menu::for_select(&store, 10);
        let labels = menu.labels();
        assert_eq!(labels[0].trim_start_matches("[1] "), labels[1].trim_start_matches("[2] "));

        let target = menu.resolve(&MenuReply::Label(labels[1].clone())).unwrap();
        assert_eq!(target.get(&store), Some(&store.history()[1]));
    }

    #[tokio::test]
    async fn select_restores_clip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        seed(dir.path(), &["h1", "h2"], &["p1"])?;

        let selector = selector(dir.path(), vec![Some(MenuReply::Label("[2] h2".into()))]);
        let clip = selector.select().await?;
        assert_eq!(clip.as_ref().and_then(Clip::as_text), Some("h2"));
        assert_eq!(
            selector.bridge.provider().content(),
            Some(("text/plain;charset=utf-8".to_string(), b"h2".to_vec()))
        );
        assert_eq!(
            selector.frontend.shown(),
            vec![vec!["[P1] p1".to_string(), "[1] h1".into(), "[2] h2".into()]]
        );

        Ok(())
    }

    #[tokio::test]
    async fn select_cancelled_leaves_clipboard_alone() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        seed(dir.path(), &["h1"], &[])?;

        let selector = selector(dir.path(), vec![None]);
        assert_eq!(selector.select().await?, None);
        assert_eq!(selector.bridge.provider().write_count(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn select_on_empty_store_skips_menu() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let selector = selector(dir.path(), vec![Some(MenuReply::Index(0))]);
        assert_eq!(selector.select().await?, None);
        assert!(selector.frontend.shown().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn pin_then_unpin() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        seed(dir.path(), &["h1", "h2"], &[])?;

        let selector = selector(
            dir.path(),
            vec![
                Some(MenuReply::Label("[2] h2".into())),
                Some(MenuReply::Label("[P1] h2".into())),
            ],
        );

        assert_eq!(selector.pin().await?, Some(PinOutcome::Pinned));
        assert_eq!(texts(&persist::load(dir.path().join("pinned.json"))), vec!["h2"]);
        assert_eq!(texts(&persist::load(dir.path().join("history.json"))), vec!["h1"]);

        assert_eq!(selector.pin().await?, Some(PinOutcome::Unpinned));
        assert!(persist::load(dir.path().join("pinned.json")).is_empty());
        assert_eq!(
            texts(&persist::load(dir.path().join("history.json"))),
            vec!["h2", "h1"]
        );

        Ok(())
    }

    #[tokio::test]
    async fn pin_header_is_noop() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        seed(dir.path(), &["h1"], &["p1"])?;

        let selector = selector(dir.path(), vec![Some(MenuReply::Index(0)), Some(MenuReply::Index(2))]);
        assert_eq!(selector.pin().await?, None);
        assert_eq!(selector.pin().await?, None);
        assert_eq!(texts(&persist::load(dir.path().join("pinned.json"))), vec!["p1"]);
        assert_eq!(texts(&persist::load(dir.path().join("history.json"))), vec!["h1"]);

        Ok(())
    }

    #[test]
    fn clear_keeps_pinned() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        seed(dir.path(), &["h1", "h2"], &["p"])?;

        selector(dir.path(), Vec::new()).clear();
        assert!(persist::load(dir.path().join("history.json")).is_empty());
        assert_eq!(texts(&persist::load(dir.path().join("pinned.json"))), vec!["p"]);

        Ok(())
    }
}
