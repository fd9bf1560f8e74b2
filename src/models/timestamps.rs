use chrono::{DateTime, FixedOffset, NaiveDateTime};

/// Layouts the source uses for naive local timestamps.
const NAIVE_LAYOUTS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Normalizes a timezone-aware timestamp to naive UTC.
///
/// This is the single comparison basis for "has this listing changed": the
/// entity derives `last_changed_at` with it and stores compare with it.
pub fn to_naive_utc(ts: &DateTime<FixedOffset>) -> NaiveDateTime {
    ts.naive_utc()
}

/// Parses a timestamp as reported by the source.
///
/// RFC 3339 values keep their own offset; naive values are placed in
/// `source_offset`. Returns `None` for anything else.
pub fn parse_source_timestamp(
    raw: &str,
    source_offset: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .and_then(|naive| naive.and_local_timezone(source_offset).single())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn cet() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    #[test]
    fn test_naive_source_time_uses_source_offset() {
        let ts = parse_source_timestamp("2024-03-01 12:30:00", cet()).unwrap();
        assert_eq!(ts.offset(), &cet());
        assert_eq!(
            to_naive_utc(&ts),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(11, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_rfc3339_keeps_its_own_offset() {
        let ts = parse_source_timestamp("2024-07-10T08:00:00+02:00", cet()).unwrap();
        let expected = FixedOffset::east_opt(7200)
            .unwrap()
            .with_ymd_and_hms(2024, 7, 10, 8, 0, 0)
            .unwrap();
        assert_eq!(ts, expected);
        assert_eq!(to_naive_utc(&ts).to_string(), "2024-07-10 06:00:00");
    }

    #[test]
    fn test_garbage_is_absent() {
        assert!(parse_source_timestamp("yesterday", cet()).is_none());
        assert!(parse_source_timestamp("  ", cet()).is_none());
    }
}
