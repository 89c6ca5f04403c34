//! A-B loop region control
//!
//! Lets a reviewer pin a start and end boundary inside the track and have
//! playback cycle that slice. Boundary setting is a two-step interaction
//! (arm the button, then click the waveform), so the controller tracks
//! which boundary is being set alongside the region itself.

use serde::{Deserialize, Serialize};

/// Which loop boundary an operation addresses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoopBound {
    Start,
    End,
}

impl std::fmt::Display for LoopBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopBound::Start => write!(f, "start"),
            LoopBound::End => write!(f, "end"),
        }
    }
}

/// The A-B loop region
///
/// Invariant: when both boundaries are set, `start < end`. A set that would
/// violate this keeps the new value and clears the conflicting pre-existing
/// boundary instead of rejecting the input, so the reviewer never loses a
/// click. `enabled` is only ever true while both boundaries are set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct LoopRegion {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub enabled: bool,
}

impl LoopRegion {
    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// Loop controller: region plus the boundary-arming interaction state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct LoopController {
    region: LoopRegion,

    /// Boundary currently being set (armed button awaiting a waveform click)
    arming: Option<LoopBound>,
}

impl LoopController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(&self) -> LoopRegion {
        self.region
    }

    pub fn is_enabled(&self) -> bool {
        self.region.enabled
    }

    /// Boundary awaiting a waveform click, if any
    pub fn arming(&self) -> Option<LoopBound> {
        self.arming
    }

    /// Toggle the setting state for a boundary.
    ///
    /// Arming the other boundary switches to it; arming the same boundary
    /// again cancels the interaction.
    pub fn arm(&mut self, bound: LoopBound) {
        self.arming = match self.arming {
            Some(current) if current == bound => None,
            _ => Some(bound),
        };
    }

    /// Set a boundary to `time`, keeping the region invariant.
    ///
    /// When the new value would invert the region, the conflicting other
    /// boundary is cleared and the loop disabled. Always settles the arming
    /// state.
    pub fn set_bound(&mut self, bound: LoopBound, time: f64) {
        match bound {
            LoopBound::Start => {
                self.region.start = Some(time);
                if matches!(self.region.end, Some(end) if time >= end) {
                    self.region.end = None;
                    self.region.enabled = false;
                }
            }
            LoopBound::End => {
                self.region.end = Some(time);
                if matches!(self.region.start, Some(start) if start >= time) {
                    self.region.start = None;
                    self.region.enabled = false;
                }
            }
        }
        self.arming = None;
    }

    /// Apply an armed boundary to a waveform click at `time`.
    ///
    /// Returns whether a boundary was consumed; an unarmed click is an
    /// ordinary seek and none of the loop state changes.
    pub fn apply_click(&mut self, time: f64) -> bool {
        match self.arming {
            Some(bound) => {
                self.set_bound(bound, time);
                true
            }
            None => false,
        }
    }

    /// Toggle loop enforcement.
    ///
    /// No-op unless both boundaries are set; returns the resulting flag.
    pub fn toggle(&mut self) -> bool {
        if self.region.is_complete() {
            self.region.enabled = !self.region.enabled;
        }
        self.region.enabled
    }

    /// Clear the region and any in-progress boundary interaction
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Per-tick enforcement check.
    ///
    /// Returns the rewind target when the loop is enabled and the playhead
    /// has reached or passed the end boundary. Constant-time; called once
    /// per engine position tick.
    pub fn check(&self, position: f64) -> Option<f64> {
        if !self.region.enabled {
            return None;
        }
        match (self.region.start, self.region.end) {
            (Some(start), Some(end)) if position >= end => Some(start),
            _ => None,
        }
    }
}
