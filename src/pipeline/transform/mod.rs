//! Transform stage: turns validated tables into the derived analytics
//! tables. Every step is a pure function over in-memory data, grouped with
//! ordered maps so identical inputs always produce identically ordered
//! output.

pub mod attrition;
pub mod rollup;
pub mod satisfaction;
pub mod weekly;

use tracing::info;

use crate::config::EtlConfig;
use crate::domain::{
    AttritionRecord, DepartmentSummary, DepartmentWeekly, SatisfactionScore, WeeklyTime,
};
use crate::pipeline::ingestion::ValidatedTables;

/// All derived tables computed in one run.
#[derive(Debug, Clone)]
pub struct DerivedTables {
    pub satisfaction: Vec<SatisfactionScore>,
    pub weekly_time: Vec<WeeklyTime>,
    pub attrition: Vec<AttritionRecord>,
    pub department_weekly: Vec<DepartmentWeekly>,
    pub department_summary: Vec<DepartmentSummary>,
}

/// Run every transform step over the validated tables.
pub fn run_transform(tables: &ValidatedTables, config: &EtlConfig) -> DerivedTables {
    let satisfaction = satisfaction::satisfaction_scores(&tables.survey_responses);
    let weekly_time = weekly::weekly_time(&tables.time_records, &config.workweek);

    // Ingestion guarantees a non-empty time table, but fall back to the most
    // recent hire date so the transform is total over any validated input.
    let as_of = attrition::reference_date(&tables.time_records)
        .or_else(|| tables.employees.iter().map(|e| e.hire_date).max())
        .unwrap_or_default();

    let attrition = attrition::attrition_records(
        &tables.employees,
        &satisfaction,
        &weekly_time,
        &tables.assignments,
        &config.attrition,
        as_of,
    );

    let department_weekly = rollup::department_weekly(&weekly_time, &tables.employees);
    let department_summary =
        rollup::department_summary(&tables.employees, &satisfaction, &attrition);

    info!(
        employees = tables.employees.len(),
        weekly_rows = weekly_time.len(),
        departments = department_summary.len(),
        "transform complete"
    );

    DerivedTables {
        satisfaction,
        weekly_time,
        attrition,
        department_weekly,
        department_summary,
    }
}
