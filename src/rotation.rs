//! Item cursor state machine
//!
//! Owns the current list together with the cursor so that replacing the list
//! and re-anchoring the index happen in one step. Timing lives in
//! [`crate::scheduler`]; everything here is synchronous.

use crate::item::{Item, ItemList};
use crate::screen::{ReanchorPolicy, WrapPolicy};

/// Visible phase of the current item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Showing,
    /// Final part of the dwell; the item is fading out
    Fading,
}

/// Result of a dwell expiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Cursor moved to this index
    Moved(usize),
    /// Cursor is on the last item and the screen refreshes before wrapping
    WrapDeferred,
    /// Nothing to advance (empty, paused, or already waiting on a wrap)
    Idle,
}

/// Cursor over one screen's item list
#[derive(Debug, Clone)]
pub struct Rotation {
    list: ItemList,
    index: usize,
    list_version: u64,
    progress: f32,
    phase: Phase,
    wrap_pending: bool,
    paused: bool,
    reanchor: ReanchorPolicy,
    wrap: WrapPolicy,
}

impl Rotation {
    pub fn new(reanchor: ReanchorPolicy, wrap: WrapPolicy) -> Self {
        Self {
            list: ItemList::default(),
            index: 0,
            list_version: 0,
            progress: 0.0,
            phase: Phase::Showing,
            wrap_pending: false,
            paused: false,
            reanchor,
            wrap,
        }
    }

    /// Swap in a freshly fetched list and re-anchor the cursor
    pub fn replace_list(&mut self, list: ItemList) {
        let previous = self.index;
        self.list = list;
        self.list_version += 1;

        self.index = if self.wrap_pending {
            0
        } else {
            match self.reanchor {
                ReanchorPolicy::ResetToStart => 0,
                ReanchorPolicy::KeepInBounds if previous < self.list.len() => previous,
                ReanchorPolicy::KeepInBounds => 0,
            }
        };
        self.wrap_pending = false;
        self.restart_phase();

        tracing::debug!(
            "List v{} installed ({} items), index {} -> {}",
            self.list_version,
            self.list.len(),
            previous,
            self.index
        );
    }

    /// Dwell expired: move to the next item, or defer the wrap
    pub fn advance(&mut self) -> Advance {
        if self.list.is_empty() || self.paused || self.wrap_pending {
            return Advance::Idle;
        }

        self.normalize();
        let next = self.index + 1;
        if next >= self.list.len() && self.wrap == WrapPolicy::RefreshOnWrap {
            self.wrap_pending = true;
            return Advance::WrapDeferred;
        }

        self.index = next % self.list.len();
        self.restart_phase();
        Advance::Moved(self.index)
    }

    /// Finish a deferred wrap over the list already held
    ///
    /// Used when the refresh that should have preceded the wrap failed.
    pub fn complete_wrap(&mut self) -> bool {
        if !self.wrap_pending {
            return false;
        }
        self.wrap_pending = false;
        self.index = 0;
        self.restart_phase();
        true
    }

    /// Manual navigation; wraps in both directions and restarts the dwell
    pub fn step(&mut self, delta: isize) -> Option<usize> {
        let len = self.list.len();
        if len == 0 {
            return None;
        }

        self.normalize();
        let len = len as isize;
        self.index = (self.index as isize + delta).rem_euclid(len) as usize;
        self.wrap_pending = false;
        self.restart_phase();
        Some(self.index)
    }

    /// Add one progress tick, capped at 100
    pub fn tick_progress(&mut self, step: f32) {
        if self.list.is_empty() || self.paused || !step.is_finite() {
            return;
        }
        self.progress = (self.progress + step).clamp(0.0, 100.0);
    }

    pub fn enter_fade(&mut self) {
        if !self.list.is_empty() && !self.paused {
            self.phase = Phase::Fading;
        }
    }

    pub fn restart_phase(&mut self) {
        self.progress = 0.0;
        self.phase = Phase::Showing;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        self.restart_phase();
    }

    /// Targeted field update; never moves the cursor
    pub fn patch(&mut self, id: &str, update: impl FnOnce(&mut Item)) -> bool {
        self.list.patch(id, update)
    }

    /// Force the index back into bounds
    pub fn normalize(&mut self) {
        if self.index >= self.list.len() {
            self.index = 0;
        }
    }

    pub fn current(&self) -> Option<&Item> {
        self.list.get(self.index).or_else(|| self.list.get(0))
    }

    /// Current index, already normalized against the list
    pub fn index(&self) -> usize {
        if self.index < self.list.len() {
            self.index
        } else {
            0
        }
    }

    pub fn list(&self) -> &ItemList {
        &self.list
    }

    pub fn list_version(&self) -> u64 {
        self.list_version
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn wrap_pending(&self) -> bool {
        self.wrap_pending
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[&str]) -> ItemList {
        ItemList::new(ids.iter().map(|id| Item::new(*id, "")).collect())
    }

    fn current_id(rotation: &Rotation) -> Option<&str> {
        rotation.current().map(|item| item.id.as_str())
    }

    #[test]
    fn test_empty_list_never_advances() {
        let mut rotation = Rotation::new(ReanchorPolicy::ResetToStart, WrapPolicy::Wrap);
        assert_eq!(rotation.advance(), Advance::Idle);
        rotation.tick_progress(50.0);
        assert_eq!(rotation.progress(), 0.0);
        assert_eq!(rotation.index(), 0);
        assert!(rotation.current().is_none());
    }

    #[test]
    fn test_shorter_list_resets_to_start() {
        let mut rotation = Rotation::new(ReanchorPolicy::ResetToStart, WrapPolicy::Wrap);
        rotation.replace_list(list(&["A", "B", "C"]));
        rotation.advance();
        rotation.advance();
        rotation.tick_progress(40.0);
        rotation.enter_fade();
        assert_eq!(current_id(&rotation), Some("C"));

        rotation.replace_list(list(&["A", "B"]));
        assert_eq!(rotation.index(), 0);
        assert_eq!(current_id(&rotation), Some("A"));
        assert_eq!(rotation.progress(), 0.0);
        assert_eq!(rotation.phase(), Phase::Showing);
    }

    #[test]
    fn test_keep_in_bounds_policy() {
        let mut rotation = Rotation::new(ReanchorPolicy::KeepInBounds, WrapPolicy::Wrap);
        rotation.replace_list(list(&["1", "2", "3", "4"]));
        rotation.advance();
        rotation.advance();
        assert_eq!(rotation.index(), 2);

        rotation.replace_list(list(&["5", "6", "7", "8"]));
        assert_eq!(rotation.index(), 2);

        rotation.replace_list(list(&["9", "10"]));
        assert_eq!(rotation.index(), 0);
    }

    #[test]
    fn test_index_stays_in_bounds_under_any_interleaving() {
        let mut rotation = Rotation::new(ReanchorPolicy::KeepInBounds, WrapPolicy::Wrap);
        let lists = [
            list(&["a", "b", "c", "d", "e"]),
            list(&["a"]),
            list(&[]),
            list(&["x", "y", "z"]),
        ];

        for round in 0..40 {
            if round % 3 == 0 {
                rotation.replace_list(lists[round % lists.len()].clone());
            }
            rotation.advance();
            if round % 5 == 0 {
                rotation.step(-1);
            }
            if !rotation.is_empty() {
                assert!(rotation.index() < rotation.list().len());
                assert!(rotation.current().is_some());
            }
        }
    }

    #[test]
    fn test_wraps_to_start() {
        let mut rotation = Rotation::new(ReanchorPolicy::ResetToStart, WrapPolicy::Wrap);
        rotation.replace_list(list(&["A", "B"]));
        assert_eq!(rotation.advance(), Advance::Moved(1));
        assert_eq!(rotation.advance(), Advance::Moved(0));
    }

    #[test]
    fn test_refresh_on_wrap_defers_until_new_list() {
        let mut rotation = Rotation::new(ReanchorPolicy::KeepInBounds, WrapPolicy::RefreshOnWrap);
        rotation.replace_list(list(&["A", "B"]));
        assert_eq!(rotation.advance(), Advance::Moved(1));
        assert_eq!(rotation.advance(), Advance::WrapDeferred);
        assert_eq!(current_id(&rotation), Some("B"));
        // Waiting on the refresh; further dwell expiries do nothing
        assert_eq!(rotation.advance(), Advance::Idle);

        // Even a keep-in-bounds screen starts over after a deferred wrap
        rotation.replace_list(list(&["A", "B", "C"]));
        assert_eq!(rotation.index(), 0);
        assert!(!rotation.wrap_pending());
    }

    #[test]
    fn test_failed_wrap_refresh_still_wraps() {
        let mut rotation = Rotation::new(ReanchorPolicy::ResetToStart, WrapPolicy::RefreshOnWrap);
        rotation.replace_list(list(&["A", "B"]));
        rotation.advance();
        assert_eq!(rotation.advance(), Advance::WrapDeferred);

        assert!(rotation.complete_wrap());
        assert_eq!(current_id(&rotation), Some("A"));
        assert!(!rotation.complete_wrap());
    }

    #[test]
    fn test_manual_step_wraps_both_ways() {
        let mut rotation = Rotation::new(ReanchorPolicy::ResetToStart, WrapPolicy::Wrap);
        rotation.replace_list(list(&["A", "B", "C"]));
        assert_eq!(rotation.step(-1), Some(2));
        assert_eq!(rotation.step(1), Some(0));
        rotation.tick_progress(30.0);
        assert_eq!(rotation.step(1), Some(1));
        assert_eq!(rotation.progress(), 0.0);
    }

    #[test]
    fn test_progress_caps_at_100() {
        let mut rotation = Rotation::new(ReanchorPolicy::ResetToStart, WrapPolicy::Wrap);
        rotation.replace_list(list(&["A"]));
        for _ in 0..500 {
            rotation.tick_progress(1.0 / 3.0);
        }
        assert_eq!(rotation.progress(), 100.0);
        rotation.tick_progress(f32::NAN);
        assert_eq!(rotation.progress(), 100.0);
    }

    #[test]
    fn test_pause_freezes_cursor() {
        let mut rotation = Rotation::new(ReanchorPolicy::ResetToStart, WrapPolicy::Wrap);
        rotation.replace_list(list(&["A", "B"]));
        rotation.set_paused(true);
        assert_eq!(rotation.advance(), Advance::Idle);
        rotation.tick_progress(10.0);
        assert_eq!(rotation.progress(), 0.0);

        rotation.set_paused(false);
        assert_eq!(rotation.advance(), Advance::Moved(1));
    }

    #[test]
    fn test_patch_keeps_cursor_and_order() {
        let mut rotation = Rotation::new(ReanchorPolicy::ResetToStart, WrapPolicy::Wrap);
        rotation.replace_list(list(&["A", "B", "C"]));
        rotation.advance();
        let version = rotation.list_version();

        assert!(rotation.patch("B", |item| item.like_count = Some(5)));
        assert_eq!(rotation.index(), 1);
        assert_eq!(rotation.list_version(), version);
        let ids: Vec<&str> = rotation.list().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(rotation.current().and_then(|i| i.like_count), Some(5));
    }
}
