//! # AutoFlow Reports
//!
//! [`ReportSink`](autoflow_protocols::ReportSink) implementations.
//!
//! - [`MemoryReportSink`] keeps reports in a map, for tests and embedding
//! - [`FileReportSink`] writes one pretty-printed JSON file per report key

pub mod file;
pub mod memory;

pub use file::FileReportSink;
pub use memory::MemoryReportSink;
