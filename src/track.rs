//! Track, waveform, and comment marker types
//!
//! Core data carried by the playback session: the currently reviewed track,
//! its pre-rendered waveform peaks, and the server-sourced comment markers
//! rendered along the waveform.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of file a track represents
///
/// Pitch files are one-off submissions; project files belong to an ongoing
/// collaboration and carry the project title in the player header.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    PitchFile,
    ProjectFile,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::PitchFile => write!(f, "pitch_file"),
            TrackKind::ProjectFile => write!(f, "project_file"),
        }
    }
}

/// A playable track as handed to the controller on selection
///
/// Immutable once loaded; selecting another track replaces the whole value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Track UUID
    pub id: Uuid,
    /// Pitch vs project file
    pub kind: TrackKind,
    /// Track title
    pub title: String,
    /// Artist display name
    pub artist: String,
    /// Owning project title (empty for standalone pitches)
    pub project_title: String,
    /// Duration in seconds as known at selection time (0.0 when unknown)
    pub duration: f64,
    /// Stream descriptor passed to the media engine's load call
    pub stream_url: String,
    /// Pre-rendered waveform peaks, when the backend has them cached
    pub peaks: Option<WaveformPeaks>,
}

/// Validated pre-rendered waveform peak data
///
/// Peaks arrive from the backend cache as amplitude samples at a fixed rate.
/// Construction validates the data; malformed input yields `None` so callers
/// take the full-decode path instead of rendering garbage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct WaveformPeaks {
    samples: Vec<f32>,
}

impl WaveformPeaks {
    /// Validate raw peak samples.
    ///
    /// Returns `None` for empty input or any non-finite sample.
    pub fn new(samples: Vec<f32>) -> Option<Self> {
        if samples.is_empty() || samples.iter().any(|s| !s.is_finite()) {
            return None;
        }
        Some(Self { samples })
    }

    /// Number of peak samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Raw amplitude samples for handoff to the waveform renderer
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Estimate track duration from the peak count.
    ///
    /// Used when the engine reports no duration at ready time.
    pub fn estimate_duration(&self, peaks_per_second: f64) -> f64 {
        if peaks_per_second <= 0.0 {
            return 0.0;
        }
        self.samples.len() as f64 / peaks_per_second
    }
}

impl TryFrom<Vec<f32>> for WaveformPeaks {
    type Error = String;

    fn try_from(samples: Vec<f32>) -> Result<Self, Self::Error> {
        WaveformPeaks::new(samples).ok_or_else(|| "malformed waveform peaks".to_string())
    }
}

impl From<WaveformPeaks> for Vec<f32> {
    fn from(peaks: WaveformPeaks) -> Self {
        peaks.samples
    }
}

/// Timed comment marker rendered on the waveform
///
/// Markers are server-sourced and read-only here; add/resolve/delete round
/// through the remote session and come back as a refreshed marker set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentMarker {
    /// Comment UUID
    pub id: Uuid,
    /// Position within the track (seconds)
    pub timestamp: f64,
    /// Comment body
    pub text: String,
    /// Whether the comment thread is resolved
    pub resolved: bool,
    /// Author display name
    pub author: String,
}

impl CommentMarker {
    /// Horizontal overlay position as a percentage of the waveform width.
    ///
    /// Clamped to [0, 100]; 0 when the duration is unknown or non-positive
    /// so markers never render off-canvas.
    pub fn overlay_percent(&self, duration: f64) -> f64 {
        if !duration.is_finite() || duration <= 0.0 {
            return 0.0;
        }
        (self.timestamp / duration * 100.0).clamp(0.0, 100.0)
    }
}

/// Playback rate selection
///
/// Closed set matching the player's rate button; serialized as the numeric
/// factor so stored session state stays readable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(into = "f32", try_from = "f32")]
pub enum PlaybackRate {
    ThreeQuarter,
    Normal,
    OneQuarterUp,
    OneHalfUp,
    Double,
}

impl PlaybackRate {
    /// Numeric rate factor passed to the engine
    pub fn factor(&self) -> f32 {
        match self {
            PlaybackRate::ThreeQuarter => 0.75,
            PlaybackRate::Normal => 1.0,
            PlaybackRate::OneQuarterUp => 1.25,
            PlaybackRate::OneHalfUp => 1.5,
            PlaybackRate::Double => 2.0,
        }
    }

    /// Step to the next rate, wrapping back to the slowest after Double
    pub fn cycle(&self) -> PlaybackRate {
        match self {
            PlaybackRate::ThreeQuarter => PlaybackRate::Normal,
            PlaybackRate::Normal => PlaybackRate::OneQuarterUp,
            PlaybackRate::OneQuarterUp => PlaybackRate::OneHalfUp,
            PlaybackRate::OneHalfUp => PlaybackRate::Double,
            PlaybackRate::Double => PlaybackRate::ThreeQuarter,
        }
    }

    /// All selectable rates, in display order
    pub fn all_variants() -> &'static [PlaybackRate] {
        &[
            PlaybackRate::ThreeQuarter,
            PlaybackRate::Normal,
            PlaybackRate::OneQuarterUp,
            PlaybackRate::OneHalfUp,
            PlaybackRate::Double,
        ]
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        PlaybackRate::Normal
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

impl From<PlaybackRate> for f32 {
    fn from(rate: PlaybackRate) -> Self {
        rate.factor()
    }
}

impl TryFrom<f32> for PlaybackRate {
    type Error = String;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        PlaybackRate::all_variants()
            .iter()
            .copied()
            .find(|r| (r.factor() - value).abs() < f32::EPSILON)
            .ok_or_else(|| format!("unsupported playback rate: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_at(timestamp: f64) -> CommentMarker {
        CommentMarker {
            id: Uuid::new_v4(),
            timestamp,
            text: "check the bass here".to_string(),
            resolved: false,
            author: "reviewer".to_string(),
        }
    }

    #[test]
    fn test_peaks_validation() {
        assert!(WaveformPeaks::new(vec![0.1, 0.5, 0.3]).is_some());
        assert!(WaveformPeaks::new(vec![]).is_none());
        assert!(WaveformPeaks::new(vec![0.1, f32::NAN]).is_none());
        assert!(WaveformPeaks::new(vec![f32::INFINITY]).is_none());
    }

    #[test]
    fn test_peaks_duration_estimate() {
        let peaks = WaveformPeaks::new(vec![0.5; 1800]).unwrap();
        assert_eq!(peaks.estimate_duration(10.0), 180.0);
        assert_eq!(peaks.estimate_duration(0.0), 0.0);
    }

    #[test]
    fn test_peaks_serde_rejects_malformed() {
        let ok: Result<WaveformPeaks, _> = serde_json::from_str("[0.1, 0.2]");
        assert!(ok.is_ok());

        let empty: Result<WaveformPeaks, _> = serde_json::from_str("[]");
        assert!(empty.is_err());
    }

    #[test]
    fn test_marker_overlay_percent() {
        let marker = marker_at(30.0);
        assert_eq!(marker.overlay_percent(120.0), 25.0);

        // Past the end clamps rather than overflowing the canvas
        let late = marker_at(150.0);
        assert_eq!(late.overlay_percent(120.0), 100.0);

        // Unknown duration pins markers to the left edge
        assert_eq!(marker.overlay_percent(0.0), 0.0);
        assert_eq!(marker.overlay_percent(f64::NAN), 0.0);
    }

    #[test]
    fn test_rate_cycle_wraps() {
        let mut rate = PlaybackRate::Normal;
        for _ in 0..PlaybackRate::all_variants().len() {
            rate = rate.cycle();
        }
        assert_eq!(rate, PlaybackRate::Normal);
        assert_eq!(PlaybackRate::Double.cycle(), PlaybackRate::ThreeQuarter);
    }

    #[test]
    fn test_rate_serde_round_trip() {
        let json = serde_json::to_string(&PlaybackRate::OneHalfUp).unwrap();
        assert_eq!(json, "1.5");
        let back: PlaybackRate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PlaybackRate::OneHalfUp);

        let bad: Result<PlaybackRate, _> = serde_json::from_str("1.1");
        assert!(bad.is_err());
    }
}
