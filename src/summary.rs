use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single skipped input row with the line number it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowRejection {
    /// 1-based line number in the raw file, counting the header line.
    pub line: u64,
    pub reason: String,
}

/// Accounting for one raw input table: how many rows made it through
/// validation and why the rest were skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows_loaded: usize,
    pub rows_rejected: usize,
    pub rejections: Vec<RowRejection>,
}

impl TableReport {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            rows_loaded: 0,
            rows_rejected: 0,
            rejections: Vec::new(),
        }
    }

    pub fn accept(&mut self) {
        self.rows_loaded += 1;
    }

    pub fn reject(&mut self, line: u64, reason: impl Into<String>) {
        self.rows_rejected += 1;
        self.rejections.push(RowRejection {
            line,
            reason: reason.into(),
        });
    }
}

/// Row count of one published output table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputTable {
    pub table: String,
    pub rows: usize,
}

/// Full accounting of one pipeline run, persisted alongside the processed
/// tables and printed after each invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub inputs: Vec<TableReport>,
    pub outputs: Vec<OutputTable>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn record_output(&mut self, table: &str, rows: usize) {
        self.outputs.push(OutputTable {
            table: table.to_string(),
            rows,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn rows_loaded(&self) -> usize {
        self.inputs.iter().map(|r| r.rows_loaded).sum()
    }

    pub fn rows_rejected(&self) -> usize {
        self.inputs.iter().map(|r| r.rows_rejected).sum()
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
