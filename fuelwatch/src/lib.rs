//! fuelwatch - Fuel consumption metering from engine telemetry
//!
//! This library turns a line-oriented stream of engine telemetry into running
//! fuel consumption totals. Each relevant line carries an instantaneous flow
//! rate in liters per hour; the rate is integrated over wall-clock time with
//! fixed-point micro-liter arithmetic and bucketed into clock hours.
//!
//! The [`meter::Meter`] ties the stages together; [`telemetry::LineReader`]
//! feeds it and [`report::ReportWriter`] prints what it produces.

pub mod clock;
pub mod config;
pub mod integrator;
pub mod logging;
pub mod meter;
pub mod rate;
pub mod report;
pub mod telemetry;
pub mod units;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
