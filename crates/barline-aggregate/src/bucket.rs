//! Resolution-aligned time bucketing.

use barline_types::Resolution;

/// Returns the start of the bucket containing `timestamp_ms`, in seconds.
///
/// Floors to a multiple of the resolution interval. Timestamps before the
/// epoch floor towards negative infinity so bucket boundaries stay evenly
/// spaced.
#[must_use]
pub const fn bucket_start(timestamp_ms: i64, resolution: Resolution) -> i64 {
    let interval = resolution.interval_seconds() as i64;
    let seconds = timestamp_ms.div_euclid(1000);
    seconds.div_euclid(interval) * interval
}

/// Returns the start of the bucket containing `timestamp_ms`, in milliseconds.
#[must_use]
pub const fn bucket_start_ms(timestamp_ms: i64, resolution: Resolution) -> i64 {
    bucket_start(timestamp_ms, resolution) * 1000
}

/// Returns the bucket start for a raw resolution code.
///
/// Unknown codes use the one-minute interval.
#[must_use]
pub fn bucket_start_for_code(timestamp_ms: i64, code: &str) -> i64 {
    bucket_start(timestamp_ms, Resolution::parse_or_default(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minute_buckets() {
        assert_eq!(bucket_start(0, Resolution::Minute1), 0);
        assert_eq!(bucket_start(30_000, Resolution::Minute1), 0);
        assert_eq!(bucket_start(59_999, Resolution::Minute1), 0);
        assert_eq!(bucket_start(60_000, Resolution::Minute1), 60);
        assert_eq!(bucket_start(61_000, Resolution::Minute1), 60);
    }

    #[test]
    fn test_coarse_buckets() {
        // 2024-01-15T14:37:45Z
        let ts = 1_705_329_465_000;
        assert_eq!(bucket_start_ms(ts, Resolution::Minute5), 1_705_329_300_000);
        assert_eq!(bucket_start_ms(ts, Resolution::Hour4), 1_705_320_000_000);
        assert_eq!(bucket_start_ms(ts, Resolution::Day1), 1_705_276_800_000);
    }

    #[test]
    fn test_every_resolution_is_aligned() {
        let ts = 1_717_171_717_171;
        for resolution in Resolution::all() {
            let start = bucket_start_ms(ts, *resolution);
            assert_eq!(start % resolution.interval_ms(), 0);
            assert!(start <= ts);
            assert!(ts - start < resolution.interval_ms());
        }
    }

    #[test]
    fn test_negative_timestamps_floor_down() {
        assert_eq!(bucket_start(-1, Resolution::Minute1), -60);
        assert_eq!(bucket_start(-60_000, Resolution::Minute1), -60);
    }

    #[test]
    fn test_unknown_code_uses_one_minute() {
        assert_eq!(bucket_start_for_code(125_000, "unknown"), 120);
        assert_eq!(bucket_start_for_code(125_000, "5"), 0);
    }
}
