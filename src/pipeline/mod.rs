// Conversion monitoring module
// Traces each conversion pass to an append-only log

pub mod trace;

pub use trace::{read_trace_file, TraceBuilder, TraceEntry, TraceError, TraceWriter};
