//! Duration formatting for progress frames

/// Format seconds for display: `42.0s`, `3m 05s`, `1h 02m`
///
/// Negative or non-finite input is shown as zero.
#[must_use]
pub fn format_duration(secs: f64) -> String {
    let secs = if secs.is_finite() && secs > 0.0 { secs } else { 0.0 };

    if secs < 60.0 {
        return format!("{secs:.1}s");
    }

    let whole = secs as u64;
    if whole < 3_600 {
        format!("{}m {:02}s", whole / 60, whole % 60)
    } else {
        format!("{}h {:02}m", whole / 3_600, (whole % 3_600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds() {
        assert_eq!(format_duration(0.0), "0.0s");
        assert_eq!(format_duration(42.04), "42.0s");
        assert_eq!(format_duration(59.9), "59.9s");
    }

    #[test]
    fn minutes() {
        assert_eq!(format_duration(60.0), "1m 00s");
        assert_eq!(format_duration(185.7), "3m 05s");
    }

    #[test]
    fn hours() {
        assert_eq!(format_duration(3_600.0), "1h 00m");
        assert_eq!(format_duration(3_725.0), "1h 02m");
    }

    #[test]
    fn bad_input_is_zero() {
        assert_eq!(format_duration(-5.0), "0.0s");
        assert_eq!(format_duration(f64::NAN), "0.0s");
        assert_eq!(format_duration(f64::INFINITY), "0.0s");
    }
}
