// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Clip store management and manipulation.
//!
//! Clipmgr groups clips together into one place called the __clip store__.
//! The clip store houses two ordered sequences: __history__, the bounded
//! most-recent-first list of observed clips, and __pinned__, the list of clips
//! the user explicitly asked to keep around.
//!
//! # Invariants
//!
//! - No clip identity appears in both history and pinned.
//! - Neither history nor pinned contain duplicate identities.
//! - History never holds more text clips than [`Limits::max_text`], nor more
//!   image clips than [`Limits::max_image`]. Both kinds are trimmed
//!   independently, so images never push text out of history or vice versa.
//! - Pinned never holds more than [`Limits::max_pinned`] clips. Only an
//!   explicit pin can evict a pinned clip.
//!
//! All operations are in-memory mutations that cannot fail. Persistence is
//! left to the caller, see [`persist`](crate::persist).

use crate::clip::{Clip, ClipKind, ImageRef};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Capacity limits of clip store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum number of text clips kept in history.
    pub max_text: usize,

    /// Maximum number of image clips kept in history.
    pub max_image: usize,

    /// Maximum number of pinned clips.
    pub max_pinned: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_text: 50,
            max_image: 10,
            max_pinned: 30,
        }
    }
}

impl Limits {
    fn max_for(&self, kind: ClipKind) -> usize {
        match kind {
            ClipKind::Text => self.max_text,
            ClipKind::Image => self.max_image,
        }
    }
}

/// Outcome of toggling pin state of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    Pinned,
    Unpinned,
}

/// Ordered collections of clips with deduplication and capacity rules.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClipStore {
    history: Vec<Clip>,
    pinned: Vec<Clip>,
    limits: Limits,
}

impl ClipStore {
    /// Construct new empty clip store.
    pub fn new(limits: Limits) -> Self {
        Self {
            history: Vec::new(),
            pinned: Vec::new(),
            limits,
        }
    }

    /// Construct clip store from existing collections.
    ///
    /// Collections usually come straight from disk, so they are not trusted to
    /// uphold the store's invariants. Duplicates are dropped keeping the first
    /// occurrence, history entries shadowed by a pinned entry are dropped, and
    /// limits are applied.
    pub fn from_parts(
        history: impl IntoIterator<Item = Clip>,
        pinned: impl IntoIterator<Item = Clip>,
        limits: Limits,
    ) -> Self {
        let mut store = Self::new(limits);
        store.replace_pinned(pinned);
        store.history = dedup(history)
            .into_iter()
            .filter(|clip| !store.is_pinned(clip))
            .collect();
        store.trim_history();
        store
    }

    /// Replace pinned collection, keeping history consistent with it.
    ///
    /// Used to pick up pin edits made by another process. Any history entry
    /// that is now pinned gets removed from history.
    pub fn replace_pinned(&mut self, pinned: impl IntoIterator<Item = Clip>) {
        let mut pinned = dedup(pinned);
        pinned.truncate(self.limits.max_pinned);
        self.pinned = pinned;

        let pinned = &self.pinned;
        self.history
            .retain(|clip| !pinned.iter().any(|pin| pin.same_as(clip)));
    }

    /// Add newly observed clip to front of history.
    ///
    /// Does nothing if the clip is currently pinned. Otherwise any older entry
    /// with the same identity is removed first, so the clip moves to the front
    /// instead of appearing twice.
    pub fn add(&mut self, clip: Clip) {
        if self.is_pinned(&clip) {
            return;
        }

        self.push_front_history(clip);
    }

    /// Toggle pin state of a clip.
    ///
    /// A pinned clip is unpinned and placed at the front of history. An
    /// unpinned clip is removed from history and placed at the front of
    /// pinned, evicting the oldest pin if pinned is full.
    pub fn toggle_pin(&mut self, clip: Clip) -> PinOutcome {
        if let Some(index) = position(&self.pinned, &clip) {
            let mut clip = self.pinned.remove(index);
            clip.touch();
            self.push_front_history(clip);
            return PinOutcome::Unpinned;
        }

        self.history.retain(|entry| !entry.same_as(&clip));
        self.pinned.insert(0, clip);
        self.pinned.truncate(self.limits.max_pinned);
        PinOutcome::Pinned
    }

    /// Remove every clip from history. Pinned clips are left alone.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Check if a clip with the same identity is pinned.
    pub fn is_pinned(&self, clip: &Clip) -> bool {
        position(&self.pinned, clip).is_some()
    }

    /// All image references held by history and pinned.
    pub fn referenced_images(&self) -> HashSet<ImageRef> {
        self.history
            .iter()
            .chain(self.pinned.iter())
            .filter_map(Clip::image_ref)
            .cloned()
            .collect()
    }

    pub fn history(&self) -> &[Clip] {
        &self.history
    }

    pub fn pinned(&self) -> &[Clip] {
        &self.pinned
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.pinned.is_empty()
    }

    fn push_front_history(&mut self, clip: Clip) {
        self.history.retain(|entry| !entry.same_as(&clip));
        self.history.insert(0, clip);
        self.trim_history();
    }

    // INVARIANT: Count each kind from the front, dropping whatever overflows.
    fn trim_history(&mut self) {
        let limits = self.limits;
        let (mut texts, mut images) = (0usize, 0usize);
        self.history.retain(|clip| {
            let seen = match clip.kind() {
                ClipKind::Text => &mut texts,
                ClipKind::Image => &mut images,
            };
            *seen += 1;
            *seen <= limits.max_for(clip.kind())
        });
    }
}

fn position(clips: &[Clip], clip: &Clip) -> Option<usize> {
    clips.iter().position(|entry| entry.same_as(clip))
}

fn dedup(clips: impl IntoIterator<Item = Clip>) -> Vec<Clip> {
    let mut seen = HashSet::new();
    clips
        .into_iter()
        .filter(|clip| seen.insert(clip.identity()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn texts(clips: &[Clip]) -> Vec<&str> {
        clips.iter().filter_map(Clip::as_text).collect()
    }

    fn image(name: &str) -> Clip {
        Clip::image(ImageRef::new(format!("{name}.png")), Some("image/png".into()))
    }

    fn limits(max_text: usize, max_image: usize, max_pinned: usize) -> Limits {
        Limits {
            max_text,
            max_image,
            max_pinned,
        }
    }

    #[test]
    fn add_moves_duplicate_to_front() {
        let mut store = ClipStore::default();
        store.add(Clip::text("a"));
        store.add(Clip::text("b"));
        store.add(Clip::text("a"));

        assert_eq!(texts(store.history()), vec!["a", "b"]);
    }

    #[test]
    fn add_evicts_oldest_text() {
        let mut store = ClipStore::new(limits(2, 2, 2));
        store.add(Clip::text("a"));
        store.add(Clip::text("b"));
        store.add(Clip::text("c"));

        assert_eq!(texts(store.history()), vec!["c", "b"]);
    }

    #[test]
    fn add_refreshes_timestamp_of_duplicate() {
        let mut store = ClipStore::default();
        let mut old = Clip::text("a");
        old.created_at = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
        store.add(old);

        let new = Clip::text("a");
        let stamp = new.created_at;
        store.add(new);

        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history()[0].created_at, stamp);
    }

    #[test]
    fn kinds_do_not_compete_for_capacity() {
        let mut store = ClipStore::new(limits(2, 1, 5));
        store.add(Clip::text("t1"));
        store.add(image("i1"));
        store.add(Clip::text("t2"));
        store.add(image("i2"));
        store.add(Clip::text("t3"));

        let kinds = store.history().iter().map(Clip::kind).collect::<Vec<_>>();
        assert_eq!(kinds, vec![ClipKind::Text, ClipKind::Image, ClipKind::Text]);
        assert_eq!(texts(store.history()), vec!["t3", "t2"]);
        assert_eq!(
            store.history()[1].image_ref(),
            Some(&ImageRef::new("i2.png"))
        );
    }

    #[test_case(1, 1, 0; "tiny")]
    #[test_case(3, 2, 10; "small")]
    #[test_case(5, 0, 40; "no images")]
    #[test_case(50, 10, 200; "defaults with many adds")]
    #[test]
    fn history_never_exceeds_limits(max_text: usize, max_image: usize, rounds: usize) {
        let mut store = ClipStore::new(limits(max_text, max_image, 5));
        for round in 0..rounds {
            // Revisit older content now and then to exercise deduplication.
            let key = if round % 3 == 0 { round / 2 } else { round };
            if round % 4 == 0 {
                store.add(image(&format!("img{key}")));
            } else {
                store.add(Clip::text(format!("text{key}")));
            }

            let text_count = store
                .history()
                .iter()
                .filter(|clip| clip.kind() == ClipKind::Text)
                .count();
            let image_count = store.history().len() - text_count;
            assert!(text_count <= max_text);
            assert!(image_count <= max_image);

            let unique = dedup(store.history().iter().cloned());
            pretty_assertions::assert_eq!(unique.len(), store.history().len());
        }
    }

    #[test]
    fn pinned_clip_suppresses_history_add() {
        let mut store = ClipStore::default();
        store.add(Clip::text("x"));
        assert_eq!(store.toggle_pin(Clip::text("x")), PinOutcome::Pinned);

        assert_eq!(texts(store.pinned()), vec!["x"]);
        assert!(store.history().is_empty());

        store.add(Clip::text("x"));
        assert!(store.history().is_empty());
        assert_eq!(texts(store.pinned()), vec!["x"]);
    }

    #[test]
    fn add_matching_pin_leaves_history_unchanged() {
        let mut store = ClipStore::default();
        store.toggle_pin(Clip::text("p"));
        store.add(Clip::text("h1"));
        store.add(Clip::text("h2"));
        let before = store.history().to_vec();

        store.add(Clip::text("p"));
        assert_eq!(store.history(), before.as_slice());
    }

    #[test]
    fn toggle_pin_twice_restores_membership_at_front() {
        let mut store = ClipStore::default();
        store.add(Clip::text("c"));
        store.add(Clip::text("b"));
        store.add(Clip::text("a"));

        assert_eq!(store.toggle_pin(Clip::text("c")), PinOutcome::Pinned);
        assert_eq!(texts(store.history()), vec!["a", "b"]);

        assert_eq!(store.toggle_pin(Clip::text("c")), PinOutcome::Unpinned);
        assert_eq!(texts(store.history()), vec!["c", "a", "b"]);
        assert!(store.pinned().is_empty());
    }

    #[test]
    fn toggle_pin_of_unknown_clip_pins_it() {
        let mut store = ClipStore::default();
        store.toggle_pin(Clip::text("new"));
        assert_eq!(texts(store.pinned()), vec!["new"]);

        store.toggle_pin(Clip::text("new"));
        assert!(store.pinned().is_empty());
        assert_eq!(texts(store.history()), vec!["new"]);
    }

    #[test]
    fn pin_front_inserts_and_evicts_oldest_pin() {
        let mut store = ClipStore::new(limits(10, 10, 2));
        store.toggle_pin(Clip::text("p1"));
        store.toggle_pin(Clip::text("p2"));
        store.toggle_pin(Clip::text("p3"));

        assert_eq!(texts(store.pinned()), vec!["p3", "p2"]);
    }

    #[test]
    fn unpin_respects_history_limits() {
        let mut store = ClipStore::new(limits(2, 1, 5));
        store.toggle_pin(Clip::text("p"));
        store.add(Clip::text("a"));
        store.add(Clip::text("b"));

        store.toggle_pin(Clip::text("p"));
        assert_eq!(texts(store.history()), vec!["p", "b"]);
    }

    #[test]
    fn clear_history_keeps_pinned() {
        let mut store = ClipStore::default();
        store.toggle_pin(Clip::text("p"));
        store.add(Clip::text("h2"));
        store.add(Clip::text("h1"));
        assert_eq!(texts(store.history()), vec!["h1", "h2"]);

        store.clear_history();
        assert!(store.history().is_empty());
        assert_eq!(texts(store.pinned()), vec!["p"]);
    }

    #[test]
    fn from_parts_restores_invariants() {
        let history = vec![
            Clip::text("a"),
            Clip::text("b"),
            Clip::text("a"),
            Clip::text("p"),
            Clip::text("c"),
        ];
        let pinned = vec![Clip::text("p"), Clip::text("p"), Clip::text("q")];
        let store = ClipStore::from_parts(history, pinned, limits(2, 1, 5));

        assert_eq!(texts(store.history()), vec!["a", "b"]);
        assert_eq!(texts(store.pinned()), vec!["p", "q"]);
    }

    #[test]
    fn replace_pinned_drops_shadowed_history() {
        let mut store = ClipStore::default();
        store.add(Clip::text("a"));
        store.add(Clip::text("b"));

        store.replace_pinned(vec![Clip::text("a")]);
        assert_eq!(texts(store.history()), vec!["b"]);
        assert_eq!(texts(store.pinned()), vec!["a"]);
    }

    #[test]
    fn referenced_images_spans_history_and_pinned() {
        let mut store = ClipStore::default();
        store.add(image("one"));
        store.add(Clip::text("text"));
        store.toggle_pin(image("two"));

        let mut result = store.referenced_images().into_iter().collect::<Vec<_>>();
        result.sort();
        assert_eq!(
            result,
            vec![ImageRef::new("one.png"), ImageRef::new("two.png")]
        );
    }
}
