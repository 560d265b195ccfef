use time::macros::format_description;
use time::OffsetDateTime;

/// Timestamp used in outcome records and log lines: `YYYY-MM-DD HH:MM:SS`.
pub fn record_timestamp() -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_else(|_| String::from("0000-00-00 00:00:00"))
}

/// Filename-safe timestamp used for run logs, reports and relocated
/// artifacts: `YYYYmmdd_HHMMSS`.
pub fn file_timestamp() -> String {
    let format = format_description!("[year][month][day]_[hour][minute][second]");
    OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_else(|_| String::from("00000000_000000"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_timestamp_shape() {
        let stamp = record_timestamp();
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], " ");
        assert_eq!(&stamp[13..14], ":");
    }

    #[test]
    fn file_timestamp_shape() {
        let stamp = file_timestamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "_");
        assert!(stamp[..8].chars().all(|c| c.is_ascii_digit()));
        assert!(stamp[9..].chars().all(|c| c.is_ascii_digit()));
    }
}
