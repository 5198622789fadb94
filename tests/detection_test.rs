//! End-to-end tests: raw export bytes through normalization and detection.

use chrono::{DateTime, Duration, TimeZone, Utc};
use heartrate_windows::{detect_windows, normalize, Sample, SourceFormat, WindowConfig};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 7, 0, 0).unwrap()
}

/// CSV with a header and one row per `k` at `t0 + 2min * k`.
fn csv_export(steps: impl IntoIterator<Item = i64>) -> Vec<u8> {
    let mut out = String::from("timestamp,heartrate\n");
    for k in steps {
        let ts = t0() + Duration::minutes(2 * k);
        out.push_str(&format!("{},{}\n", ts.format("%Y-%m-%d %H:%M:%S"), 60 + k % 20));
    }
    out.into_bytes()
}

/// Check every structural property an emitted window must satisfy.
fn assert_windows_valid(windows: &[heartrate_windows::Window], config: &WindowConfig) {
    for window in windows {
        assert!(!window.is_empty());
        assert_eq!(window.end() - window.start(), config.duration());
        for pair in window.samples().windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, config.step());
        }
    }
    for pair in windows.windows(2) {
        assert!(pair[0].start_index() < pair[1].start_index());
        assert!(pair[0].start() <= pair[1].start());
        assert!(pair[0].start_index() + pair[0].len() <= pair[1].start_index());
    }
}

#[test]
fn test_csv_two_hour_window() {
    let samples = normalize(&csv_export(0..61), SourceFormat::DelimitedText).unwrap();
    let config = WindowConfig::default();
    let windows = detect_windows(&samples, &config);

    assert_eq!(samples.len(), 61);
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].len(), 61);
    assert_windows_valid(&windows, &config);
}

#[test]
fn test_csv_gap_recovers_after_missing_sample() {
    let samples = normalize(
        &csv_export((0..92).filter(|&k| k != 30)),
        SourceFormat::DelimitedText,
    )
    .unwrap();
    let config = WindowConfig::default();
    let windows = detect_windows(&samples, &config);

    assert_eq!(windows.len(), 1);
    assert_ne!(windows[0].start(), t0());
    assert_eq!(windows[0].start(), t0() + Duration::minutes(62));
    assert_windows_valid(&windows, &config);
}

#[test]
fn test_csv_header_and_blank_values() {
    let input = b"timestamp,heartrate\n\
                  2024-05-06 07:00:00,\n\
                  2024-05-06 07:02:00,71\n\
                  2024-05-06 07:04:00,\n";
    let samples = normalize(input, SourceFormat::DelimitedText).unwrap();

    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].value, None);
    assert_eq!(samples[1].value, Some(71.0));
    assert_eq!(samples[2].value, None);

    let config = WindowConfig::from_secs(240, 120).unwrap();
    let windows = detect_windows(&samples, &config);
    assert_eq!(windows.len(), 1);

    let summary = windows[0].summary().unwrap();
    assert_eq!(summary.min, 71.0);
    assert_eq!(summary.max, 71.0);
    assert_eq!(summary.absent_count, 2);
}

#[test]
fn test_json_export_without_series_is_empty() {
    let input = br#"[{"calendarDate": "2024-05-06", "restingHeartRate": 52}]"#;
    let samples = normalize(input, SourceFormat::Structured).unwrap();
    assert!(samples.is_empty());
    assert!(detect_windows(&samples, &WindowConfig::default()).is_empty());
}

#[test]
fn test_json_export_split_across_records() {
    // 61 samples split over two records, second record first in the file
    let base = t0().timestamp_millis();
    let pairs = |range: std::ops::Range<i64>| -> String {
        range
            .map(|k| format!("[{}, {}]", base + k * 120_000, 60 + k % 7))
            .collect::<Vec<_>>()
            .join(",")
    };
    let input = format!(
        r#"[{{"heartRateValues": [{}]}}, {{"heartRateValues": [{}]}}]"#,
        pairs(30..61),
        pairs(0..30)
    );

    let samples = normalize(input.as_bytes(), SourceFormat::Structured).unwrap();
    assert_eq!(samples[0].timestamp, t0() + Duration::minutes(60));

    let config = WindowConfig::default();
    let windows = detect_windows(&samples, &config);
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].start(), t0());
    assert_windows_valid(&windows, &config);
}

#[test]
fn test_detection_is_idempotent_on_sorted_input() {
    let mut samples = normalize(
        &csv_export((0..200).filter(|k| k % 47 != 5)),
        SourceFormat::DelimitedText,
    )
    .unwrap();
    let config = WindowConfig::from_secs(1200, 120).unwrap();

    let first = detect_windows(&samples, &config);
    samples.sort_by_key(|s| s.timestamp);
    let second = detect_windows(&samples, &config);

    assert_eq!(first, second);
    assert!(!first.is_empty());
    assert_windows_valid(&first, &config);
}

#[test]
fn test_duplicates_never_inside_a_window() {
    let mut samples: Vec<Sample> = (0..40)
        .map(|k| Sample::new(t0() + Duration::minutes(2 * k), Some(70.0)))
        .collect();
    for k in [3, 17, 18, 31] {
        samples.push(Sample::new(t0() + Duration::minutes(2 * k), Some(0.0)));
    }
    let config = WindowConfig::from_secs(600, 120).unwrap();
    let windows = detect_windows(&samples, &config);

    assert!(!windows.is_empty());
    assert_windows_valid(&windows, &config);
    for window in &windows {
        let mut seen: Vec<_> = window.samples().iter().map(|s| s.timestamp).collect();
        seen.dedup();
        assert_eq!(seen.len(), window.len());
    }
}

#[test]
fn test_mixed_layouts_in_one_file() {
    let input = b"2024-05-06T07:00:00Z,60\n\
                  2024-05-06T07:02:00,61\n\
                  2024-05-06 07:04:00,62\n";
    let samples = normalize(input, SourceFormat::DelimitedText).unwrap();
    let config = WindowConfig::from_secs(240, 120).unwrap();
    let windows = detect_windows(&samples, &config);

    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].start(), t0());
}

#[test]
fn test_minute_precision_and_compact_offsets() {
    let input = b"2024-05-06T07:00,60\n\
                  2024-05-06T07:02,61\n\
                  2024-05-06 07:04,62\n\
                  2024-05-06T09:06:00+0200,63\n";
    let samples = normalize(input, SourceFormat::DelimitedText).unwrap();
    assert_eq!(samples.len(), 4);

    let config = WindowConfig::from_secs(360, 120).unwrap();
    let windows = detect_windows(&samples, &config);
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].start(), t0());
    assert_eq!(windows[0].end(), t0() + Duration::minutes(6));
}
