//! Integration tests for the metering pipeline.
//!
//! These tests drive the complete flow:
//! - telemetry bytes → LineReader → Meter → ReportWriter
//! - hour rollover with realistic sample spacing
//! - noise, malformed samples, and clock regressions mixed into the stream
//!
//! Run with: `cargo test --test meter_integration`

use std::io::Cursor;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use fuelwatch::clock::{ClockConfig, ManualClock};
use fuelwatch::integrator::HOUR_MS;
use fuelwatch::meter::{Meter, MeterConfig, MeterError};
use fuelwatch::report::{Report, ReportFormat, ReportWriter};
use fuelwatch::telemetry::LineReader;

// ============================================================================
// Helper Functions
// ============================================================================

/// A PentaEngineStatus line as published upstream.
fn penta_line(rate: &str) -> String {
    format!(
        r#"{{"ts":"2025-05-01T10:00:00Z","msg":{{"PentaEngineStatus":{{"fuel_econ":{{"engine_fuel_rate":{},"engine_instantaneous_fuel_economy":0.0}}}}}}}}"#,
        rate
    )
}

/// An unrelated message on the same bus.
fn odometry_line(distance: f64) -> String {
    format!(r#"{{"msg":{{"Odometry":{{"odometer":{:.1}}}}}}}"#, distance)
}

/// Build a reader over in-memory lines.
fn reader_over(lines: &[String]) -> LineReader {
    let mut bytes = lines.join("\n").into_bytes();
    bytes.push(b'\n');
    LineReader::from_reader(Cursor::new(bytes), CancellationToken::new())
}

/// Read every line, stepping the clock before each one, and collect reports.
async fn drive(
    reader: &mut LineReader,
    meter: &mut Meter,
    clock: &ManualClock,
    step: Duration,
) -> Vec<Report> {
    let mut reports = Vec::new();
    let mut first = true;
    while let Some(line) = reader.next_line().await.unwrap() {
        if !first {
            clock.advance(step);
        }
        first = false;
        if let Ok(Some(report)) = meter.process_line(&line) {
            reports.push(report);
        }
    }
    reports
}

/// Epoch milliseconds for 50 minutes into some hour.
const TEN_TO_THE_HOUR: i64 = 400 * HOUR_MS as i64 + 50 * 60_000;

// ============================================================================
// Integration Tests
// ============================================================================

/// A steady 36 L/h burn sampled once a minute across an hour boundary.
///
/// 36 L/h is 0.6 L per minute. The tenth sample lands exactly on the hour,
/// closing the bucket with the 6 L burned since the first sample.
#[tokio::test]
async fn test_steady_burn_across_hour_boundary() {
    let clock = ManualClock::new(TEN_TO_THE_HOUR);
    let mut meter = Meter::with_clock(MeterConfig::default(), Box::new(clock.clone())).unwrap();

    let lines: Vec<String> = (0..=20).map(|_| penta_line("36")).collect();
    let mut reader = reader_over(&lines);

    let reports = drive(&mut reader, &mut meter, &clock, Duration::from_secs(60)).await;
    assert_eq!(reports.len(), 21);

    // Warm-up reports zero
    assert_eq!(reports[0].total.liters.to_string(), "0.00");
    assert_eq!(reports[0].last_hour.liters.to_string(), "0.00");

    let rollovers: Vec<usize> = reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.rolled_over)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(rollovers, vec![10]);

    assert_eq!(reports[10].total.liters.to_string(), "6.00");
    assert_eq!(reports[10].last_hour.liters.to_string(), "6.00");
    assert_eq!(reports[10].last_hour.gallons.to_string(), "1.58");

    // The completed hour stays reported until the next rollover
    let last = reports.last().unwrap();
    assert_eq!(last.total.liters.to_string(), "12.00");
    assert_eq!(last.last_hour.liters.to_string(), "6.00");

    let stats = meter.stats();
    assert_eq!(stats.reports, 21);
    assert_eq!(stats.rollovers, 1);
}

/// Noise and malformed samples do not disturb the integration.
#[tokio::test]
async fn test_mixed_stream() {
    let clock = ManualClock::new(TEN_TO_THE_HOUR);
    let mut meter = Meter::with_clock(MeterConfig::default(), Box::new(clock.clone())).unwrap();

    let lines = vec![
        penta_line("3600"),
        odometry_line(1200.5),
        penta_line("null"),
        String::new(),
        penta_line("3600"),
        "garbage without structure".to_string(),
        penta_line("3600.0000009"),
    ];
    let mut reader = reader_over(&lines);

    let mut reports = Vec::new();
    let mut malformed = 0;
    while let Some(line) = reader.next_line().await.unwrap() {
        clock.advance(Duration::from_millis(500));
        match meter.process_line(&line) {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => {}
            Err(MeterError::Rate(_)) => malformed += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(reports.len(), 3);
    assert_eq!(malformed, 1);

    // 3600 L/h is 1 L per second; accepted samples 2 s then 1 s apart
    assert_eq!(meter.state().total_micro_l, 3_000_000);
    assert_eq!(reports[2].raw_rate, "3600.0000009");

    let stats = meter.stats();
    assert_eq!(stats.lines_read, 7);
    assert_eq!(stats.relevant_lines, 4);
    assert_eq!(stats.malformed_samples, 1);
    assert_eq!(stats.precision_overflows, 1);
}

/// A clock stepped back by NTP resets the baseline without losing fuel.
#[tokio::test]
async fn test_clock_regression_mid_stream() {
    let clock = ManualClock::new(TEN_TO_THE_HOUR);
    let mut meter = Meter::with_clock(MeterConfig::default(), Box::new(clock.clone())).unwrap();

    let mut reader = reader_over(&[penta_line("3600"), penta_line("3600")]);
    drive(&mut reader, &mut meter, &clock, Duration::from_secs(1)).await;
    let before = meter.state().total_micro_l;
    assert_eq!(before, 1_000_000);

    clock.rewind(Duration::from_secs(30));
    let report = meter.process_line(&penta_line("3600")).unwrap().unwrap();
    assert_eq!(meter.state().total_micro_l, before);
    assert_eq!(report.total.liters.to_string(), "1.00");
    assert_eq!(meter.stats().clock_regressions, 1);

    clock.advance(Duration::from_secs(1));
    meter.process_line(&penta_line("3600")).unwrap();
    assert_eq!(meter.state().total_micro_l, 2_000_000);
}

/// Small backward jitter within tolerance is absorbed.
#[tokio::test]
async fn test_tolerated_jitter() {
    let clock = ManualClock::new(TEN_TO_THE_HOUR);
    let config = MeterConfig {
        clock: ClockConfig::new(Duration::from_millis(100)),
        ..Default::default()
    };
    let mut meter = Meter::with_clock(config, Box::new(clock.clone())).unwrap();

    meter.process_line(&penta_line("3600")).unwrap();
    clock.rewind(Duration::from_millis(50));
    meter.process_line(&penta_line("3600")).unwrap();
    assert_eq!(meter.stats().clock_regressions, 0);

    clock.advance(Duration::from_millis(1_050));
    meter.process_line(&penta_line("3600")).unwrap();
    assert_eq!(meter.state().total_micro_l, 1_000_000);
}

/// Reports stream out as CSV with a single header row.
#[tokio::test]
async fn test_csv_output() {
    let clock = ManualClock::new(TEN_TO_THE_HOUR);
    let mut meter = Meter::with_clock(MeterConfig::default(), Box::new(clock.clone())).unwrap();

    let lines: Vec<String> = (0..3).map(|_| penta_line("7.2")).collect();
    let mut reader = reader_over(&lines);
    let reports = drive(&mut reader, &mut meter, &clock, Duration::from_secs(600)).await;

    let mut writer = ReportWriter::new(Vec::new(), ReportFormat::Csv);
    for report in &reports {
        writer.write(report).unwrap();
    }
    let out = String::from_utf8(writer.into_inner()).unwrap();
    let rows: Vec<&str> = out.lines().collect();

    assert_eq!(rows.len(), 4);
    assert!(rows[0].starts_with("timestamp,raw_rate"));
    // 7.2 L/h over 20 minutes is 2.4 L
    assert!(rows[3].contains(",7.2,2.40,0.63,"));
}

/// JSON output is one parseable object per report.
#[tokio::test]
async fn test_json_output() {
    let clock = ManualClock::new(TEN_TO_THE_HOUR);
    let mut meter = Meter::with_clock(MeterConfig::default(), Box::new(clock.clone())).unwrap();

    let mut reader = reader_over(&[penta_line("12.35"), penta_line("12.35")]);
    let reports = drive(&mut reader, &mut meter, &clock, Duration::from_secs(3600)).await;

    let mut writer = ReportWriter::new(Vec::new(), ReportFormat::Json);
    for report in &reports {
        writer.write(report).unwrap();
    }
    let out = String::from_utf8(writer.into_inner()).unwrap();

    let values: Vec<serde_json::Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(values.len(), 2);
    assert_eq!(values[1]["raw_rate"], "12.35");
    assert_eq!(values[1]["total"]["liters"]["int"], 12);
    assert_eq!(values[1]["total"]["liters"]["frac"], 35);
    assert_eq!(values[1]["rolled_over"], true);
}

/// Cancelling the token ends reading even with input pending.
#[tokio::test]
async fn test_cancelled_reader_stops() {
    let cancel = CancellationToken::new();
    let bytes = format!("{}\n", penta_line("1")).into_bytes();
    let mut reader = LineReader::from_reader(Cursor::new(bytes), cancel.clone());

    cancel.cancel();
    assert_eq!(reader.next_line().await.unwrap(), None);
}
