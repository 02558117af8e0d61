//! Persistence of processed tables.
//!
//! A run writes every table into a staging directory next to the processed
//! directory and only swaps it in on [`ProcessedStore::commit`]. A run that
//! fails at any earlier point leaves the previous output untouched.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::RUN_SUMMARY_FILE;
use crate::error::{EtlError, Result};
use crate::summary::RunSummary;

/// Staged writer for one run's processed tables.
pub struct ProcessedStore {
    processed_dir: PathBuf,
    staging_dir: PathBuf,
    committed: bool,
}

impl ProcessedStore {
    /// Create a fresh staging directory for a run. A stale staging directory
    /// left behind by an aborted run is removed first.
    pub fn stage(processed_dir: &Path) -> Result<Self> {
        let staging_dir = staging_path(processed_dir)?;
        if staging_dir.exists() {
            warn!(staging = %staging_dir.display(), "removing stale staging directory");
            fs::remove_dir_all(&staging_dir)?;
        }
        fs::create_dir_all(&staging_dir)?;

        Ok(Self {
            processed_dir: processed_dir.to_path_buf(),
            staging_dir,
            committed: false,
        })
    }

    /// Serialize rows into `<staging>/<table>.csv`. Returns the row count.
    pub fn write_table<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<usize> {
        let path = self.staging_dir.join(format!("{table}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        debug!(table, rows = rows.len(), "staged table");
        Ok(rows.len())
    }

    /// Persist the run summary alongside the tables.
    pub fn write_summary(&self, summary: &RunSummary) -> Result<()> {
        let path = self.staging_dir.join(RUN_SUMMARY_FILE);
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, summary)?;
        Ok(())
    }

    /// Atomically replace the processed directory with the staged one. The
    /// previous output is renamed out of the way first so the swap is a
    /// single rename, then deleted best-effort.
    pub fn commit(mut self) -> Result<()> {
        let previous = self.staging_dir.with_extension("previous");
        if previous.exists() {
            fs::remove_dir_all(&previous)?;
        }

        let had_previous = self.processed_dir.exists();
        if had_previous {
            fs::rename(&self.processed_dir, &previous)?;
        }

        if let Err(e) = fs::rename(&self.staging_dir, &self.processed_dir) {
            // Put the previous output back before reporting the failure.
            if had_previous {
                let _ = fs::rename(&previous, &self.processed_dir);
            }
            return Err(EtlError::Io(e));
        }
        self.committed = true;

        if had_previous {
            if let Err(e) = fs::remove_dir_all(&previous) {
                warn!(error = %e, "failed to delete previous processed directory");
            }
        }

        info!(processed = %self.processed_dir.display(), "published processed tables");
        Ok(())
    }
}

impl Drop for ProcessedStore {
    fn drop(&mut self) {
        if !self.committed && self.staging_dir.exists() {
            let _ = fs::remove_dir_all(&self.staging_dir);
        }
    }
}

fn staging_path(processed_dir: &Path) -> Result<PathBuf> {
    let name = processed_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            EtlError::Storage(format!(
                "processed directory '{}' has no usable name",
                processed_dir.display()
            ))
        })?;
    let parent = processed_dir.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!(".{name}.staging")))
}

/// Read a processed table back into typed rows. Used by consumers of the
/// processed directory and by the pipeline's own tests.
pub fn read_table<T: DeserializeOwned>(processed_dir: &Path, table: &str) -> Result<Vec<T>> {
    let path = processed_dir.join(format!("{table}.csv"));
    let mut reader = csv::Reader::from_path(&path)?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

/// Load the summary persisted by the last successful run.
pub fn read_summary(processed_dir: &Path) -> Result<RunSummary> {
    let path = processed_dir.join(RUN_SUMMARY_FILE);
    let content = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SatisfactionScore;
    use tempfile::tempdir;

    fn sample_rows() -> Vec<SatisfactionScore> {
        vec![SatisfactionScore {
            employee_id: "E1".to_string(),
            avg_satisfaction: 4.25,
            response_count: 4,
        }]
    }

    #[test]
    fn commit_publishes_staged_tables() {
        let dir = tempdir().unwrap();
        let processed = dir.path().join("processed");

        let store = ProcessedStore::stage(&processed).unwrap();
        store.write_table("employee_satisfaction", &sample_rows()).unwrap();
        store.commit().unwrap();

        let rows: Vec<SatisfactionScore> =
            read_table(&processed, "employee_satisfaction").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].employee_id, "E1");
    }

    #[test]
    fn dropping_without_commit_keeps_previous_output() {
        let dir = tempdir().unwrap();
        let processed = dir.path().join("processed");

        let store = ProcessedStore::stage(&processed).unwrap();
        store.write_table("employee_satisfaction", &sample_rows()).unwrap();
        store.commit().unwrap();

        {
            let store = ProcessedStore::stage(&processed).unwrap();
            store
                .write_table("employee_satisfaction", &Vec::<SatisfactionScore>::new())
                .unwrap();
            // dropped without commit
        }

        let rows: Vec<SatisfactionScore> =
            read_table(&processed, "employee_satisfaction").unwrap();
        assert_eq!(rows.len(), 1, "uncommitted staging must not replace output");
        assert!(!dir.path().join(".processed.staging").exists());
    }

    #[test]
    fn commit_replaces_previous_run_entirely() {
        let dir = tempdir().unwrap();
        let processed = dir.path().join("processed");

        let store = ProcessedStore::stage(&processed).unwrap();
        store.write_table("employee_satisfaction", &sample_rows()).unwrap();
        store.write_table("weekly_time", &sample_rows()).unwrap();
        store.commit().unwrap();

        // Second run publishes fewer tables; leftovers must not survive.
        let store = ProcessedStore::stage(&processed).unwrap();
        store.write_table("employee_satisfaction", &sample_rows()).unwrap();
        store.commit().unwrap();

        assert!(processed.join("employee_satisfaction.csv").exists());
        assert!(!processed.join("weekly_time.csv").exists());
    }
}
