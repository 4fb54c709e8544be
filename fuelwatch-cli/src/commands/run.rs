//! Run command - meter fuel consumption from a telemetry stream.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use fuelwatch::config::ConfigFile;
use fuelwatch::logging::{init_logging, LoggingConfig};
use fuelwatch::meter::{Meter, MeterStats};
use fuelwatch::report::{ReportFormat, ReportWriter};
use fuelwatch::telemetry::{LineReader, TelemetrySource};
use fuelwatch::units::Volume;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::common::{resolve_format, resolve_meter_config, resolve_source, FormatArg};
use crate::error::CliError;

/// Upper bound on waiting for runtime tasks after the meter loop ends.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Arguments for the run command.
pub struct RunArgs {
    pub file: Option<PathBuf>,
    pub command: Option<String>,
    pub marker: Option<String>,
    pub field: Option<String>,
    pub format: Option<FormatArg>,
    pub tolerance_ms: Option<u64>,
    pub verbose: bool,
}

/// Run the meter until end of input or Ctrl+C.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;

    let _log_guard = init_logging(&LoggingConfig {
        level: config.logging.level.clone(),
        verbose: args.verbose,
        directory: config.logging.directory.clone(),
    })?;

    // Resolve settings: CLI > config > defaults
    let source = resolve_source(args.file, args.command, &config);
    let format = resolve_format(args.format, &config);
    let meter_config = resolve_meter_config(args.marker, args.field, args.tolerance_ms, &config);

    eprintln!("fuelwatch v{}", fuelwatch::VERSION);
    eprintln!("Source: {}", source);
    eprintln!("Marker: {}  Field: {}", meter_config.marker, meter_config.field);
    eprintln!("Format: {}", format);
    eprintln!("Press Ctrl+C to stop");
    eprintln!();

    let meter = Meter::new(meter_config)?;

    // Ctrl+C wakes the line reader so the summary still gets printed
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received shutdown signal, stopping...");
        cancel_on_signal.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let result = runtime.block_on(meter_loop(source, meter, format, cancel));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

async fn meter_loop(
    source: TelemetrySource,
    mut meter: Meter,
    format: ReportFormat,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let mut reader = LineReader::open(&source, cancel.clone())
        .await
        .map_err(|error| CliError::Source {
            source: source.to_string(),
            error,
        })?;
    info!(source = %source, "Metering started");

    let mut writer = ReportWriter::new(io::stdout().lock(), format);

    let result = loop {
        let line = match reader.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(error = %e, "Skipping line that is not valid UTF-8");
                continue;
            }
            Err(e) => break Err(CliError::Io(e)),
        };

        match meter.process_line(&line) {
            Ok(Some(report)) => match writer.write(&report) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    info!("Report output closed");
                    break Ok(());
                }
                Err(e) => break Err(CliError::Io(e)),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Dropped telemetry sample"),
        }
    };

    if let Err(e) = reader.shutdown().await {
        warn!(error = %e, "Failed to stop telemetry producer");
    }
    if let Err(e) = close_output(writer) {
        warn!(error = %e, "Failed to flush report output");
    }

    print_summary(&meter, cancel.is_cancelled());
    result
}

/// Flush whatever the writer still buffers.
fn close_output<W: Write>(writer: ReportWriter<W>) -> io::Result<()> {
    writer.into_inner().flush()
}

fn print_summary(meter: &Meter, cancelled: bool) {
    let stats: MeterStats = meter.stats();
    let total = Volume::from_micro_l(meter.state().total_micro_l);
    let last_hour = Volume::from_micro_l(meter.state().latest_hourly_micro_l);

    info!(
        cancelled,
        lines_read = stats.lines_read,
        relevant_lines = stats.relevant_lines,
        reports = stats.reports,
        malformed_samples = stats.malformed_samples,
        precision_overflows = stats.precision_overflows,
        clock_regressions = stats.clock_regressions,
        clock_errors = stats.clock_errors,
        rollovers = stats.rollovers,
        total = %total,
        "Metering stopped"
    );

    eprintln!();
    eprintln!("Session Summary");
    eprintln!("───────────────");
    eprintln!(
        "  Lines read:      {} ({} relevant)",
        stats.lines_read, stats.relevant_lines
    );
    eprintln!(
        "  Samples:         {} reported, {} malformed",
        stats.reports, stats.malformed_samples
    );
    eprintln!("  Clock resets:    {}", stats.clock_regressions);
    eprintln!("  Hours closed:    {}", stats.rollovers);
    eprintln!("  Total consumed:  {}", total);
    eprintln!("  Last hour:       {}", last_hour);
}
