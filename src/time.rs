//! Clock-style time formatting for player displays
//!
//! Provides the position/duration readout format used by the player bar,
//! waveform hover labels, and comment marker tooltips.

/// Threshold above which the hours field is shown (seconds)
const HOUR_FORMAT_MIN: u64 = 3600;

/// Format seconds as a player clock readout.
///
/// - `M:SS` for values under one hour
/// - `H:MM:SS` for values of one hour or more
/// - `0:00` for NaN, infinite, or negative input (engines report these
///   transiently while a stream is still opening)
///
/// Fractional seconds are truncated, matching what a once-per-second
/// position display expects.
///
/// # Examples
///
/// ```
/// use playdeck::time::format_clock;
///
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(65.0), "1:05");
/// assert_eq!(format_clock(3661.0), "1:01:01");
/// assert_eq!(format_clock(f64::NAN), "0:00");
/// ```
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    if total < HOUR_FORMAT_MIN {
        format!("{}:{:02}", total / 60, total % 60)
    } else {
        let hours = total / 3600;
        let mins = (total % 3600) / 60;
        let secs = total % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}

/// Format an optional duration, rendering `0:00` when unknown.
///
/// Durations are unknown until the engine's ready callback fires; the
/// display stays stable instead of flashing a placeholder.
///
/// # Examples
///
/// ```
/// use playdeck::time::format_clock_opt;
///
/// assert_eq!(format_clock_opt(Some(95.0)), "1:35");
/// assert_eq!(format_clock_opt(None), "0:00");
/// ```
pub fn format_clock_opt(seconds: Option<f64>) -> String {
    match seconds {
        Some(seconds) => format_clock(seconds),
        None => "0:00".to_string(),
    }
}
