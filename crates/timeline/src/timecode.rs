//! Clock-style time labels for the ruler and for CLI input.

/// Format seconds as `MM:SS`, or `H:MM:SS` past the hour. Fractions are truncated.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Format seconds as `MM:SS.t` with one decimal, for segment bounds.
pub fn format_precise(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let tenths = (seconds * 10.0).round() as u64;
    let whole = tenths / 10;
    format!("{}.{}", format_clock(whole as f64), tenths % 10)
}

/// Parse `SS`, `MM:SS` or `H:MM:SS` (each part may carry decimals on the last field).
pub fn parse_clock(input: &str) -> Option<f64> {
    let parts: Vec<&str> = input.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let mut total = 0.0;
    for (i, part) in parts.iter().enumerate() {
        let value: f64 = part.parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        // only the leading field may exceed 59
        if i > 0 && value >= 60.0 {
            return None;
        }
        total = total * 60.0 + value;
    }
    Some(total)
}
