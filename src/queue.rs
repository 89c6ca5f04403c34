//! Play queue management
//!
//! Tracks the ordered set of tracks under review, the position of the one
//! currently playing, shuffle/repeat modes, and the drag-reorder state
//! machine the queue panel drives.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::track::Track;

/// Repeat mode enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Rotate through the repeat button cycle: Off → All → One → Off
    pub fn cycle(&self) -> RepeatMode {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

impl Default for RepeatMode {
    fn default() -> Self {
        RepeatMode::Off
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatMode::Off => write!(f, "off"),
            RepeatMode::All => write!(f, "all"),
            RepeatMode::One => write!(f, "one"),
        }
    }
}

/// The ordered play queue
///
/// Invariant: `0 <= position < entries.len()`, or `position == 0` when the
/// queue is empty. While shuffled, `original_order` holds the pre-shuffle
/// track ids so disabling shuffle restores the incoming order exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayQueue {
    /// Tracks in visible order (shuffled order while shuffle is on)
    entries: Vec<Track>,

    /// Index of the currently playing track
    position: usize,

    /// Whether the visible order is a shuffle of the original
    shuffled: bool,

    /// Pre-shuffle track ids, retained only while shuffled
    original_order: Vec<Uuid>,

    /// Repeat mode for advance/retreat wraparound and completion handling
    repeat: RepeatMode,
}

impl PlayQueue {
    /// Create a new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue from a track list, clamping the position into range
    pub fn from_tracks(entries: Vec<Track>, position: usize) -> Self {
        let position = if entries.is_empty() {
            0
        } else {
            position.min(entries.len() - 1)
        };
        Self {
            entries,
            position,
            ..Self::default()
        }
    }

    /// Replace the queue contents, resetting any shuffle state
    pub fn replace(&mut self, entries: Vec<Track>, position: usize) {
        *self = Self::from_tracks(entries, position);
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Currently playing track
    pub fn current(&self) -> Option<&Track> {
        self.entries.get(self.position)
    }

    /// Tracks in visible order
    pub fn entries(&self) -> &[Track] {
        &self.entries
    }

    /// Track ids in visible order, for pushing the order to collaborators
    pub fn ids(&self) -> Vec<Uuid> {
        self.entries.iter().map(|t| t.id).collect()
    }

    /// Index of the currently playing track
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    /// Advance the repeat button cycle, returning the new mode
    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.repeat = self.repeat.cycle();
        self.repeat
    }

    /// Point the position at `index` without reordering anything.
    ///
    /// Used when a queued track is selected directly. Returns whether the
    /// position moved.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.entries.len() || index == self.position {
            return false;
        }
        self.position = index;
        true
    }

    /// Advance to the next track for explicit navigation.
    ///
    /// Wraps past the end only in `RepeatMode::All`; otherwise the last
    /// track is a boundary and `None` means "nothing further". `One` only
    /// affects completion handling, a manual skip always moves.
    pub fn advance(&mut self) -> Option<Track> {
        if self.entries.is_empty() {
            return None;
        }
        if self.position + 1 < self.entries.len() {
            self.position += 1;
        } else if self.repeat == RepeatMode::All {
            self.position = 0;
        } else {
            return None;
        }
        self.current().cloned()
    }

    /// Retreat to the previous track for explicit navigation.
    ///
    /// Mirror of `advance`: wraps to the end only in `RepeatMode::All`.
    pub fn retreat(&mut self) -> Option<Track> {
        if self.entries.is_empty() {
            return None;
        }
        if self.position > 0 {
            self.position -= 1;
        } else if self.repeat == RepeatMode::All {
            self.position = self.entries.len() - 1;
        } else {
            return None;
        }
        self.current().cloned()
    }

    /// Move the entry at `old_index` to `new_index`.
    ///
    /// The playing track keeps playing: if it was the moved entry the
    /// position follows it; if the move crossed the position from below the
    /// position decrements; from above it increments. Out-of-range or
    /// equal indices are a no-op. Returns whether anything moved.
    pub fn reorder(&mut self, old_index: usize, new_index: usize) -> bool {
        let len = self.entries.len();
        if old_index == new_index || old_index >= len || new_index >= len {
            return false;
        }

        let entry = self.entries.remove(old_index);
        self.entries.insert(new_index, entry);

        if old_index == self.position {
            self.position = new_index;
        } else if old_index < self.position && new_index >= self.position {
            self.position -= 1;
        } else if old_index > self.position && new_index <= self.position {
            self.position += 1;
        }

        true
    }

    /// Remove the entry at `index`, returning it.
    ///
    /// The position tracks the playing entry: removals before it shift it
    /// down; removing the playing entry itself leaves the position on the
    /// following track (clamped at the new end).
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index >= self.entries.len() {
            return None;
        }

        let removed = self.entries.remove(index);

        if self.entries.is_empty() {
            self.position = 0;
        } else if index < self.position {
            self.position -= 1;
        } else {
            self.position = self.position.min(self.entries.len() - 1);
        }

        Some(removed)
    }

    /// Toggle shuffle, returning the new shuffled flag.
    ///
    /// Enabling pins the playing track to index 0 and shuffles the rest;
    /// the incoming order is retained so disabling restores it exactly and
    /// relocates the position to wherever the playing track sits there.
    pub fn toggle_shuffle(&mut self) -> bool {
        if self.shuffled {
            self.restore_order();
        } else {
            self.enable_shuffle_with(&mut rand::thread_rng());
        }
        self.shuffled
    }

    fn enable_shuffle_with<R: Rng>(&mut self, rng: &mut R) {
        if self.entries.is_empty() {
            self.shuffled = true;
            return;
        }

        self.original_order = self.ids();

        // Pin the playing track to the front, shuffle everything after it
        self.entries.swap(0, self.position);
        self.entries[1..].shuffle(rng);
        self.position = 0;
        self.shuffled = true;
    }

    fn restore_order(&mut self) {
        let current_id = self.current().map(|t| t.id);

        let mut remaining = std::mem::take(&mut self.entries);
        let mut restored = Vec::with_capacity(remaining.len());
        for id in self.original_order.drain(..) {
            if let Some(index) = remaining.iter().position(|t| t.id == id) {
                restored.push(remaining.remove(index));
            }
        }
        // Tracks added while shuffled were never in the original order;
        // they keep their relative order at the end
        restored.append(&mut remaining);
        self.entries = restored;

        self.position = match current_id.and_then(|id| self.entries.iter().position(|t| t.id == id))
        {
            Some(index) => index,
            None => {
                if current_id.is_some() {
                    warn!("playing track missing from restored queue order, resetting to start");
                }
                0
            }
        };
        self.shuffled = false;
    }
}

/// Drag-reorder interaction state for the queue panel
///
/// Two states: settled, or dragging with the source index captured at drag
/// start. Hovering over targets is purely visual and tracked by the view;
/// only the begin/drop/cancel transitions live here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DragReorder {
    dragging_from: Option<usize>,
}

impl DragReorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the source index at drag start
    pub fn begin(&mut self, source: usize) {
        self.dragging_from = Some(source);
    }

    /// Complete the drag on `target`.
    ///
    /// Returns the `(source, target)` move to apply, or `None` when no drag
    /// was in progress or the entry was dropped back on itself. Always
    /// settles the state.
    pub fn drop_on(&mut self, target: usize) -> Option<(usize, usize)> {
        let source = self.dragging_from.take()?;
        if source == target {
            return None;
        }
        Some((source, target))
    }

    /// Abandon the drag without moving anything
    pub fn cancel(&mut self) {
        self.dragging_from = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging_from.is_some()
    }

    pub fn source(&self) -> Option<usize> {
        self.dragging_from
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn create_test_track(id: u8) -> Track {
        Track {
            id: Uuid::from_bytes([id; 16]),
            kind: TrackKind::PitchFile,
            title: format!("Track {}", id),
            artist: "Test Artist".to_string(),
            project_title: String::new(),
            duration: 180.0,
            stream_url: format!("https://cdn.test/stream/{}", id),
            peaks: None,
        }
    }

    fn queue_of(ids: &[u8], position: usize) -> PlayQueue {
        PlayQueue::from_tracks(ids.iter().map(|&id| create_test_track(id)).collect(), position)
    }

    #[test]
    fn test_empty_queue() {
        let queue = PlayQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.position(), 0);
        assert!(queue.current().is_none());
    }

    #[test]
    fn test_from_tracks_clamps_position() {
        let queue = queue_of(&[1, 2, 3], 7);
        assert_eq!(queue.position(), 2);

        let empty = PlayQueue::from_tracks(Vec::new(), 5);
        assert_eq!(empty.position(), 0);
    }

    #[test]
    fn test_advance_stops_at_end_without_repeat() {
        let mut queue = queue_of(&[1, 2, 3], 1);

        let next = queue.advance().unwrap();
        assert_eq!(next.id, Uuid::from_bytes([3; 16]));
        assert_eq!(queue.position(), 2);

        // At the last track: no wraparound in Off
        assert!(queue.advance().is_none());
        assert_eq!(queue.position(), 2);
    }

    #[test]
    fn test_advance_wraps_with_repeat_all() {
        let mut queue = queue_of(&[1, 2, 3], 2);
        queue.cycle_repeat(); // off -> all

        let next = queue.advance().unwrap();
        assert_eq!(next.id, Uuid::from_bytes([1; 16]));
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn test_retreat_mirrors_advance() {
        let mut queue = queue_of(&[1, 2, 3], 0);

        // Off: no wraparound at the front
        assert!(queue.retreat().is_none());
        assert_eq!(queue.position(), 0);

        queue.cycle_repeat(); // off -> all
        let previous = queue.retreat().unwrap();
        assert_eq!(previous.id, Uuid::from_bytes([3; 16]));
        assert_eq!(queue.position(), 2);
    }

    #[test]
    fn test_repeat_one_does_not_wrap_manual_navigation() {
        let mut queue = queue_of(&[1, 2], 1);
        queue.cycle_repeat(); // off -> all
        queue.cycle_repeat(); // all -> one
        assert_eq!(queue.repeat(), RepeatMode::One);

        assert!(queue.advance().is_none());
        assert_eq!(queue.position(), 1);
    }

    #[test]
    fn test_jump_to() {
        let mut queue = queue_of(&[1, 2, 3], 0);

        assert!(queue.jump_to(2));
        assert_eq!(queue.position(), 2);

        // Same index and out-of-range are no-ops
        assert!(!queue.jump_to(2));
        assert!(!queue.jump_to(3));
        assert_eq!(queue.position(), 2);
    }

    #[test]
    fn test_repeat_cycle() {
        let mut queue = PlayQueue::new();
        assert_eq!(queue.repeat(), RepeatMode::Off);
        assert_eq!(queue.cycle_repeat(), RepeatMode::All);
        assert_eq!(queue.cycle_repeat(), RepeatMode::One);
        assert_eq!(queue.cycle_repeat(), RepeatMode::Off);
    }

    #[test]
    fn test_reorder_below_position_keeps_current() {
        // Playing A at index 0; moving B after C must not touch the position
        let mut queue = queue_of(&[1, 2, 3], 0);
        assert!(queue.reorder(1, 2));

        assert_eq!(queue.position(), 0);
        assert_eq!(queue.current().unwrap().id, Uuid::from_bytes([1; 16]));
        assert_eq!(
            queue.ids(),
            vec![
                Uuid::from_bytes([1; 16]),
                Uuid::from_bytes([3; 16]),
                Uuid::from_bytes([2; 16]),
            ]
        );
    }

    #[test]
    fn test_reorder_moves_playing_entry() {
        // Playing A at index 0; dragging A to the end carries the position
        let mut queue = queue_of(&[1, 2, 3], 0);
        assert!(queue.reorder(0, 2));

        assert_eq!(queue.position(), 2);
        assert_eq!(queue.current().unwrap().id, Uuid::from_bytes([1; 16]));
    }

    #[test]
    fn test_reorder_crossing_position_from_below() {
        // Playing C at index 2; moving A past it shifts the position down
        let mut queue = queue_of(&[1, 2, 3], 2);
        assert!(queue.reorder(0, 2));

        assert_eq!(queue.position(), 1);
        assert_eq!(queue.current().unwrap().id, Uuid::from_bytes([3; 16]));
    }

    #[test]
    fn test_reorder_crossing_position_from_above() {
        // Playing A at index 0; moving C to the front shifts the position up
        let mut queue = queue_of(&[1, 2, 3], 0);
        assert!(queue.reorder(2, 0));

        assert_eq!(queue.position(), 1);
        assert_eq!(queue.current().unwrap().id, Uuid::from_bytes([1; 16]));
    }

    #[test]
    fn test_reorder_rejects_invalid_indices() {
        let mut queue = queue_of(&[1, 2, 3], 1);
        assert!(!queue.reorder(1, 1));
        assert!(!queue.reorder(3, 0));
        assert!(!queue.reorder(0, 3));
        assert_eq!(queue.position(), 1);
    }

    #[test]
    fn test_reorder_position_always_in_range() {
        // Exhaustive small-queue sweep of the position recompute rules
        for position in 0..4 {
            for old in 0..4 {
                for new in 0..4 {
                    let mut queue = queue_of(&[1, 2, 3, 4], position);
                    let playing = queue.current().unwrap().id;
                    queue.reorder(old, new);

                    assert!(queue.position() < queue.len());
                    assert_eq!(
                        queue.current().unwrap().id,
                        playing,
                        "playing track changed after reorder({}, {}) at position {}",
                        old,
                        new,
                        position
                    );
                }
            }
        }
    }

    #[test]
    fn test_remove_tracks_position() {
        let mut queue = queue_of(&[1, 2, 3], 1);

        // Removing before the playing entry shifts the position down
        let removed = queue.remove(0).unwrap();
        assert_eq!(removed.id, Uuid::from_bytes([1; 16]));
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.current().unwrap().id, Uuid::from_bytes([2; 16]));

        // Removing the playing entry moves to the following track
        queue.remove(0);
        assert_eq!(queue.current().unwrap().id, Uuid::from_bytes([3; 16]));

        // Removing the last entry clamps
        queue.remove(0);
        assert!(queue.is_empty());
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn test_shuffle_pins_current_to_front() {
        let mut queue = queue_of(&[1, 2, 3, 4, 5], 2);
        let playing = queue.current().unwrap().id;

        queue.enable_shuffle_with(&mut StdRng::seed_from_u64(42));

        assert!(queue.is_shuffled());
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.current().unwrap().id, playing);
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn test_shuffle_round_trip_restores_order() {
        let mut queue = queue_of(&[1, 2, 3, 4, 5], 2);
        let original = queue.ids();
        let playing = queue.current().unwrap().id;

        queue.enable_shuffle_with(&mut StdRng::seed_from_u64(7));
        queue.toggle_shuffle();

        assert!(!queue.is_shuffled());
        assert_eq!(queue.ids(), original);
        assert_eq!(queue.position(), 2);
        assert_eq!(queue.current().unwrap().id, playing);
    }

    #[test]
    fn test_restore_after_removal_while_shuffled() {
        let mut queue = queue_of(&[1, 2, 3], 1);
        queue.enable_shuffle_with(&mut StdRng::seed_from_u64(3));

        // Drop the pinned entry while shuffled; a remaining track takes over
        queue.remove(0);
        let playing = queue.current().unwrap().id;
        queue.toggle_shuffle();

        assert!(!queue.is_shuffled());
        assert_eq!(
            queue.ids(),
            vec![Uuid::from_bytes([1; 16]), Uuid::from_bytes([3; 16])]
        );
        assert_eq!(queue.current().unwrap().id, playing);
        assert!(queue.position() < queue.len());
    }

    #[test]
    fn test_shuffle_toggle_on_empty_queue() {
        let mut queue = PlayQueue::new();
        assert!(queue.toggle_shuffle());
        assert!(!queue.toggle_shuffle());
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn test_drag_reorder_state_machine() {
        let mut drag = DragReorder::new();
        assert!(!drag.is_dragging());

        drag.begin(1);
        assert!(drag.is_dragging());
        assert_eq!(drag.source(), Some(1));

        assert_eq!(drag.drop_on(3), Some((1, 3)));
        assert!(!drag.is_dragging());

        // Drop without a drag in progress
        assert_eq!(drag.drop_on(0), None);

        // Dropping back on the source settles without a move
        drag.begin(2);
        assert_eq!(drag.drop_on(2), None);
        assert!(!drag.is_dragging());

        drag.begin(0);
        drag.cancel();
        assert!(!drag.is_dragging());
    }
}
