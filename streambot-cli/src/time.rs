use chrono::{DateTime, Local};

pub fn format_hm(at: Option<DateTime<Local>>) -> String {
    at.map(|t| t.format("%H:%M").to_string()).unwrap_or_default()
}

pub fn format_hms(at: Option<DateTime<Local>>) -> String {
    at.map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Milliseconds from `start` to `end`; NaN when either is missing.
pub fn elapsed_ms(start: Option<DateTime<Local>>, end: Option<DateTime<Local>>) -> f64 {
    match (start, end) {
        (Some(start), Some(end)) => (end - start).num_milliseconds() as f64,
        _ => f64::NAN,
    }
}

/// `"2m 5s"` / `"42s"`. Negative or non-finite input renders as nothing.
pub fn format_duration_ms(ms: f64) -> String {
    if !ms.is_finite() || ms < 0.0 {
        return String::new();
    }
    let secs = (ms / 1000.0).floor() as u64;
    let (minutes, secs) = (secs / 60, secs % 60);
    if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn duration_under_a_minute() {
        assert_eq!(format_duration_ms(0.0), "0s");
        assert_eq!(format_duration_ms(999.0), "0s");
        assert_eq!(format_duration_ms(1000.0), "1s");
        assert_eq!(format_duration_ms(59_999.0), "59s");
    }

    #[test]
    fn duration_with_minutes() {
        assert_eq!(format_duration_ms(60_000.0), "1m 0s");
        assert_eq!(format_duration_ms(125_000.0), "2m 5s");
    }

    #[test]
    fn duration_rejects_negative_and_non_finite() {
        assert_eq!(format_duration_ms(-1.0), "");
        assert_eq!(format_duration_ms(f64::NAN), "");
        assert_eq!(format_duration_ms(f64::INFINITY), "");
    }

    #[test]
    fn clock_labels() {
        let t = Local.with_ymd_and_hms(2024, 5, 1, 9, 7, 3).unwrap();
        assert_eq!(format_hm(Some(t)), "09:07");
        assert_eq!(format_hms(Some(t)), "09:07:03");
        assert_eq!(format_hm(None), "");
    }

    #[test]
    fn elapsed_needs_both_ends() {
        let t = Local.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(elapsed_ms(Some(t), Some(t + Duration::seconds(3))), 3000.0);
        assert!(elapsed_ms(Some(t), None).is_nan());
        assert_eq!(format_duration_ms(elapsed_ms(None, Some(t))), "");
    }
}
