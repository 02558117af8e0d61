//! The ETL pipeline: ingestion feeds transform, transform feeds storage.

pub mod ingestion;
pub mod transform;

use tracing::{info, instrument};

use crate::config::EtlConfig;
use crate::constants::{
    ATTRITION_TABLE, DEPARTMENT_SUMMARY_TABLE, DEPARTMENT_WEEKLY_TABLE,
    EMPLOYEE_SATISFACTION_TABLE, EMPLOYEES_TABLE, PROJECT_DATA_TABLE, SURVEY_RESPONSES_TABLE,
    TIME_TRACKING_TABLE, WEEKLY_TIME_TABLE,
};
use crate::error::Result;
use crate::storage::ProcessedStore;
use crate::summary::RunSummary;

/// Run the whole batch: load and validate the raw tables, compute the
/// derived tables, and atomically publish the processed directory. On any
/// fatal error the previous processed directory is left untouched.
#[instrument(skip(config))]
pub fn run_pipeline(config: &EtlConfig) -> Result<RunSummary> {
    let mut summary = RunSummary::new();
    info!(run_id = %summary.run_id, "starting ETL run");

    let ingestion = ingestion::load_raw_tables(&config.data.raw_dir)?;
    summary.inputs = ingestion.reports;

    let derived = transform::run_transform(&ingestion.tables, config);

    let store = ProcessedStore::stage(&config.data.processed_dir)?;

    // Validated copies of the raw tables, so consumers only ever read the
    // processed directory.
    let tables = &ingestion.tables;
    summary.record_output(
        EMPLOYEES_TABLE,
        store.write_table(EMPLOYEES_TABLE, &tables.employees)?,
    );
    summary.record_output(
        TIME_TRACKING_TABLE,
        store.write_table(TIME_TRACKING_TABLE, &tables.time_records)?,
    );
    summary.record_output(
        PROJECT_DATA_TABLE,
        store.write_table(PROJECT_DATA_TABLE, &tables.assignments)?,
    );
    summary.record_output(
        SURVEY_RESPONSES_TABLE,
        store.write_table(SURVEY_RESPONSES_TABLE, &tables.survey_responses)?,
    );

    // Derived tables.
    summary.record_output(
        EMPLOYEE_SATISFACTION_TABLE,
        store.write_table(EMPLOYEE_SATISFACTION_TABLE, &derived.satisfaction)?,
    );
    summary.record_output(
        WEEKLY_TIME_TABLE,
        store.write_table(WEEKLY_TIME_TABLE, &derived.weekly_time)?,
    );
    summary.record_output(
        ATTRITION_TABLE,
        store.write_table(ATTRITION_TABLE, &derived.attrition)?,
    );
    summary.record_output(
        DEPARTMENT_WEEKLY_TABLE,
        store.write_table(DEPARTMENT_WEEKLY_TABLE, &derived.department_weekly)?,
    );
    summary.record_output(
        DEPARTMENT_SUMMARY_TABLE,
        store.write_table(DEPARTMENT_SUMMARY_TABLE, &derived.department_summary)?,
    );

    summary.finish();
    store.write_summary(&summary)?;
    store.commit()?;

    info!(
        run_id = %summary.run_id,
        rows_loaded = summary.rows_loaded(),
        rows_rejected = summary.rows_rejected(),
        "ETL run complete"
    );
    Ok(summary)
}

/// Ingestion and validation only: report schema violations and row-level
/// rejections without writing anything.
#[instrument(skip(config))]
pub fn validate_only(config: &EtlConfig) -> Result<RunSummary> {
    let mut summary = RunSummary::new();
    let ingestion = ingestion::load_raw_tables(&config.data.raw_dir)?;
    summary.inputs = ingestion.reports;
    summary.finish();
    Ok(summary)
}
