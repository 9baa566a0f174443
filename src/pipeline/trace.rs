// Conversion progress tracing
// Append-only JSONL trace file for monitoring conversion passes

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A single trace entry in the conversion log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Conversion this entry belongs to
    pub run_id: Uuid,

    /// ISO 8601 timestamp of when this entry was created
    pub timestamp: String,

    /// Conversion stage name (e.g., "transform", "density", "complete")
    pub stage: String,

    /// Progress percentage [0.0, 1.0]
    pub progress: f32,

    /// Human-readable message describing current operation
    pub message: String,

    /// Optional structured data (e.g., the final conversion report)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    /// Create a new trace entry with current timestamp
    pub fn new(run_id: Uuid, stage: String, progress: f32, message: String) -> Self {
        TraceEntry {
            run_id,
            timestamp: Utc::now().to_rfc3339(),
            stage,
            progress: progress.clamp(0.0, 1.0),
            message,
            data: None,
        }
    }

    /// Attach structured data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Conversion trace writer
/// Manages append-only JSONL trace file
#[derive(Debug, Clone)]
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    /// Create a new trace writer for a specific file
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append a trace entry to the file
    /// Creates file if it doesn't exist
    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        let json_line = entry.to_json_line()?;
        file.write_all(json_line.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Get the trace file path
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Helper builder for creating trace entries of one conversion
pub struct TraceBuilder {
    run_id: Uuid,
    stage: String,
}

impl TraceBuilder {
    /// Start building a trace entry for a stage
    pub fn stage(run_id: Uuid, stage: impl Into<String>) -> Self {
        TraceBuilder {
            run_id,
            stage: stage.into(),
        }
    }

    /// Create a start entry (progress = 0.0)
    pub fn start(self, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run_id, self.stage, 0.0, message.into())
    }

    /// Create a complete entry (progress = 1.0)
    pub fn complete(self, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run_id, self.stage, 1.0, message.into())
    }
}

/// Read trace entries from a JSONL file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let entry: TraceEntry = serde_json::from_str(line)?;
        entries.push(entry);
    }

    Ok(entries)
}
