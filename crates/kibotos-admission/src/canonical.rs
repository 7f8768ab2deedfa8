//! The canonical, versioned byte serialization that miners sign over.
//!
//! A newline-joined, field-ordered ASCII string, versioned so a future
//! miner protocol revision can introduce `kibotos.submission.v2` without
//! breaking old signatures mid-rollout.

use chrono::{DateTime, SecondsFormat, Utc};

const VERSION_TAG: &str = "kibotos.submission.v1";

/// Builds the exact bytes a miner signs over a submission. `submitted_at` is
/// truncated to whole minutes before formatting, so a few seconds of clock
/// skew between miner and gateway can never invalidate an otherwise-valid
/// signature.
pub fn canonical_message(
    video_hash: &str,
    video_key: &str,
    prompt_id: &str,
    miner_uid: i64,
    submitted_at: DateTime<Utc>,
) -> Vec<u8> {
    let truncated = truncate_to_minute(submitted_at);
    format!(
        "{VERSION_TAG}\n{video_hash}\n{video_key}\n{prompt_id}\n{miner_uid}\n{}",
        truncated.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
    .into_bytes()
}

fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts - chrono::Duration::seconds(ts.timestamp() % 60)
        - chrono::Duration::nanoseconds(ts.timestamp_subsec_nanos() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn truncates_seconds_and_nanos_to_the_minute() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 12, 34, 59).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let truncated = truncate_to_minute(ts);
        assert_eq!(truncated, Utc.with_ymd_and_hms(2026, 1, 1, 12, 34, 0).unwrap());
    }

    #[test]
    fn differing_seconds_within_the_same_minute_produce_the_same_message() {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 12, 34, 0).unwrap();
        let a = canonical_message("h", "k", "p", 1, base);
        let b = canonical_message("h", "k", "p", 1, base + chrono::Duration::seconds(59));
        assert_eq!(a, b);
    }

    #[test]
    fn message_is_version_tagged_and_field_ordered() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let msg = canonical_message("abc123", "videos/x.mp4", "prompt-9", 42, ts);
        let expected = "kibotos.submission.v1\nabc123\nvideos/x.mp4\nprompt-9\n42\n2026-01-01T00:00:00Z";
        assert_eq!(String::from_utf8(msg).unwrap(), expected);
    }
}
