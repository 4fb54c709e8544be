//! Telemetry input adapters.
//!
//! # Architecture
//!
//! ```text
//! TelemetrySource ─────► LineReader ─────► FieldExtractor ─────► raw rate text
//! (stdin/file/cmd)     (cancellable)      (marker + field)
//! ```
//!
//! # Example
//!
//! ```
//! use fuelwatch::telemetry::{Extraction, FieldExtractor};
//!
//! let extractor = FieldExtractor::default();
//! let line = r#"{"msg":{"PentaEngineStatus":{"fuel_econ":{"engine_fuel_rate":8.25}}}}"#;
//! assert_eq!(extractor.extract(line), Extraction::Rate("8.25"));
//! ```

mod extract;
mod source;

pub use extract::{Extraction, FieldExtractor, DEFAULT_FIELD, DEFAULT_MARKER};
pub use source::{LineReader, TelemetrySource};
