//! Table names and required column sets shared across the pipeline.

// Raw input tables (basename without .csv, matching the files in the raw dir)
pub const EMPLOYEES_TABLE: &str = "employees";
pub const TIME_TRACKING_TABLE: &str = "time_tracking";
pub const PROJECT_DATA_TABLE: &str = "project_data";
pub const SURVEY_RESPONSES_TABLE: &str = "survey_responses";

// Derived output tables
pub const EMPLOYEE_SATISFACTION_TABLE: &str = "employee_satisfaction";
pub const WEEKLY_TIME_TABLE: &str = "weekly_time";
pub const ATTRITION_TABLE: &str = "attrition_data";
pub const DEPARTMENT_WEEKLY_TABLE: &str = "department_weekly";
pub const DEPARTMENT_SUMMARY_TABLE: &str = "department_summary";

/// File name of the persisted run summary inside the processed directory.
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

/// Columns that must be present in each raw table. Extra columns are ignored.
pub const EMPLOYEES_REQUIRED_COLUMNS: &[&str] =
    &["employee_id", "name", "department", "role", "hire_date"];
pub const TIME_TRACKING_REQUIRED_COLUMNS: &[&str] = &["employee_id", "date"];
pub const PROJECT_DATA_REQUIRED_COLUMNS: &[&str] = &["project_id", "employee_id"];
pub const SURVEY_RESPONSES_REQUIRED_COLUMNS: &[&str] =
    &["employee_id", "question_id", "response"];
