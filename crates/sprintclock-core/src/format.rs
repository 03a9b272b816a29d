//! Text formatting for timer values.
//!
//! Both formatters truncate to whole seconds before splitting into
//! components, so `59_999` ms still reads as `00:59`.

/// `HH:MM:SS`. Hours keep growing past 99 rather than wrapping.
pub fn format_time(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// `MM:SS`, used for the cooldown countdown.
pub fn format_cooldown(ms: u64) -> String {
    let total_secs = ms / 1000;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    format!("{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_is_zero_padded() {
        assert_eq!(format_time(0), "00:00:00");
        assert_eq!(format_time(61_000), "00:01:01");
        assert_eq!(format_time(3_600_000 + 9_000), "01:00:09");
    }

    #[test]
    fn time_truncates_partial_seconds() {
        assert_eq!(format_time(1_999), "00:00:01");
    }

    #[test]
    fn time_does_not_wrap_long_durations() {
        assert_eq!(format_time(100 * 3_600_000), "100:00:00");
    }

    #[test]
    fn cooldown_shows_minutes_and_seconds() {
        assert_eq!(format_cooldown(15 * 60 * 1000), "15:00");
        assert_eq!(format_cooldown(59_999), "00:59");
        assert_eq!(format_cooldown(0), "00:00");
    }
}
