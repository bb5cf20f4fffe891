use std::time::Duration;

use tcpdrop::cli::Mode;
use tcpdrop::metrics::{Metrics, MetricsReport};

#[test]
fn test_report_json_export() {
    let metrics = Metrics::new();
    metrics.events_read.add(900);
    metrics.events_dropped.add(100);
    metrics.bytes_processed.add(900 * 16);
    for micros in 1..=100 {
        metrics.latency.record(micros);
    }

    let report = MetricsReport::from_metrics("benchmark", &metrics, Duration::from_secs(3))
        .with_kernel_discards(Some(7));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    report.export_json(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(json["mode"], "benchmark");
    assert_eq!(json["events_read"], 900);
    assert_eq!(json["kernel_discards"], 7);
    assert_eq!(json["events_per_second"], 300.0);
    assert!((json["drop_rate_percent"].as_f64().unwrap() - 10.0).abs() < 1e-9);
    assert_eq!(json["latency_us"]["p50"], 51);
    assert_eq!(json["latency_us"]["p99"], 100);
    assert_eq!(json["latency_samples"], 100);
}

#[test]
fn test_empty_run_report_has_no_nan() {
    let report = MetricsReport::from_metrics("busy", &Metrics::new(), Duration::ZERO);

    assert!(report.events_per_second.abs() < f64::EPSILON);
    assert!(report.drop_rate_percent.abs() < f64::EPSILON);
    assert_eq!(report.latency_us.p99, 0);

    let text = report.to_string();
    assert!(text.contains("busy"));
    assert!(!text.contains("NaN"));
}

#[test]
fn test_export_to_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let report = MetricsReport::from_metrics("terminal", &Metrics::new(), Duration::from_secs(1));

    let err = report.export_json(&dir.path().join("nope").join("report.json")).unwrap_err();
    assert!(err.to_string().contains("report.json"));
}

#[test]
fn test_report_titled_like_banner() {
    let metrics = Metrics::new();
    let report = MetricsReport::from_metrics(Mode::Terminal.title(), &metrics, Duration::from_secs(1));

    assert!(report.to_string().contains("TERMINAL MODE"));
    assert_eq!(report.mode, "TERMINAL MODE");
}
