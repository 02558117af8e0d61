//! Ingestion and validation of the four raw CSV exports.
//!
//! A missing file, a headers-only file, or a missing required column is
//! fatal for the whole run. Individual malformed rows are skipped and
//! recorded in the table's [`TableReport`] instead of failing the run.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::constants::{
    EMPLOYEES_REQUIRED_COLUMNS, EMPLOYEES_TABLE, PROJECT_DATA_REQUIRED_COLUMNS,
    PROJECT_DATA_TABLE, SURVEY_RESPONSES_REQUIRED_COLUMNS, SURVEY_RESPONSES_TABLE,
    TIME_TRACKING_REQUIRED_COLUMNS, TIME_TRACKING_TABLE,
};
use crate::domain::{Employee, Priority, ProjectAssignment, SurveyResponse, TimeRecord};
use crate::error::{EtlError, Result};
use crate::summary::TableReport;

/// The typed, validated in-memory tables handed to the transform stage.
#[derive(Debug, Clone, Default)]
pub struct ValidatedTables {
    pub employees: Vec<Employee>,
    pub time_records: Vec<TimeRecord>,
    pub assignments: Vec<ProjectAssignment>,
    pub survey_responses: Vec<SurveyResponse>,
}

/// Validated tables plus the per-table row accounting.
#[derive(Debug, Clone)]
pub struct IngestionResult {
    pub tables: ValidatedTables,
    pub reports: Vec<TableReport>,
}

/// Load and validate all four raw tables from `raw_dir`.
pub fn load_raw_tables(raw_dir: &Path) -> Result<IngestionResult> {
    info!(raw_dir = %raw_dir.display(), "loading raw tables");

    let (employees, employees_report) = load_employees(raw_dir)?;
    let known_ids: HashSet<&str> = employees.iter().map(|e| e.employee_id.as_str()).collect();

    let (time_records, time_report) = load_time_tracking(raw_dir, &known_ids)?;
    let (assignments, project_report) = load_project_data(raw_dir, &known_ids)?;
    let (survey_responses, survey_report) = load_survey_responses(raw_dir, &known_ids)?;

    let reports = vec![employees_report, time_report, project_report, survey_report];
    for report in &reports {
        if report.rows_rejected > 0 {
            warn!(
                table = %report.table,
                rejected = report.rows_rejected,
                loaded = report.rows_loaded,
                "skipped malformed rows during validation"
            );
        }
    }

    Ok(IngestionResult {
        tables: ValidatedTables {
            employees,
            time_records,
            assignments,
            survey_responses,
        },
        reports,
    })
}

/// Header-name to field-index lookup for one raw table.
struct ColumnMap {
    table: String,
    index: HashMap<String, usize>,
}

impl ColumnMap {
    fn new(table: &str, headers: &StringRecord, required: &[&str]) -> Result<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_lowercase(), i))
            .collect();

        for column in required {
            if !index.contains_key(*column) {
                return Err(EtlError::MissingColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }

        Ok(Self {
            table: table.to_string(),
            index,
        })
    }

    /// Value of a column for this record, `None` when the column is absent
    /// from the file or the field is blank.
    fn get<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.index
            .get(column)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// A raw record with the line number it started on.
type RawRow = (u64, StringRecord);

/// Open one raw table, enforce required columns, and collect its records.
/// Read-level failures (ragged rows) are pushed into the report.
fn read_table(
    raw_dir: &Path,
    table: &str,
    required: &[&str],
    report: &mut TableReport,
) -> Result<(ColumnMap, Vec<RawRow>)> {
    let path = raw_dir.join(format!("{table}.csv"));
    if !path.exists() {
        return Err(EtlError::MissingTable {
            table: table.to_string(),
            path,
        });
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(&path)?;
    let columns = ColumnMap::new(table, reader.headers()?, required)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                rows.push((line, record));
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                report.reject(line, format!("unreadable row: {e}"));
            }
        }
    }

    debug!(table, records = rows.len(), "read raw table");
    Ok((columns, rows))
}

/// Fail the run when a required table produced no usable rows at all.
fn ensure_not_empty<T>(table: &str, parsed: &[T]) -> Result<()> {
    if parsed.is_empty() {
        return Err(EtlError::EmptyTable {
            table: table.to_string(),
        });
    }
    Ok(())
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .map_err(|_| format!("unparsable date '{raw}'"))
}

fn parse_hours(raw: &str, column: &str) -> std::result::Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("unparsable number '{raw}' in {column}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("hours out of range '{raw}' in {column}"));
    }
    Ok(value)
}

fn parse_flag(raw: &str, column: &str) -> std::result::Result<bool, String> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => Err(format!("unparsable flag '{raw}' in {column}")),
    }
}

fn load_employees(raw_dir: &Path) -> Result<(Vec<Employee>, TableReport)> {
    let mut report = TableReport::new(EMPLOYEES_TABLE);
    let (columns, rows) = read_table(
        raw_dir,
        EMPLOYEES_TABLE,
        EMPLOYEES_REQUIRED_COLUMNS,
        &mut report,
    )?;

    let mut employees: Vec<Employee> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (line, record) in &rows {
        match parse_employee(&columns, record) {
            Ok(employee) => {
                if !seen.insert(employee.employee_id.clone()) {
                    report.reject(*line, format!("duplicate employee_id '{}'", employee.employee_id));
                    continue;
                }
                employees.push(employee);
                report.accept();
            }
            Err(reason) => report.reject(*line, reason),
        }
    }

    ensure_not_empty(EMPLOYEES_TABLE, &employees)?;
    Ok((employees, report))
}

fn parse_employee(
    columns: &ColumnMap,
    record: &StringRecord,
) -> std::result::Result<Employee, String> {
    let employee_id = columns
        .get(record, "employee_id")
        .ok_or("blank employee_id")?
        .to_string();
    let name = columns.get(record, "name").ok_or("blank name")?.to_string();
    let department = columns
        .get(record, "department")
        .ok_or("blank department")?
        .to_string();
    let role = columns.get(record, "role").ok_or("blank role")?.to_string();
    let hire_date = parse_date(columns.get(record, "hire_date").ok_or("blank hire_date")?)?;
    let manager_id = columns.get(record, "manager_id").map(str::to_string);

    Ok(Employee {
        employee_id,
        name,
        department,
        role,
        manager_id,
        hire_date,
    })
}

fn load_time_tracking(
    raw_dir: &Path,
    known_ids: &HashSet<&str>,
) -> Result<(Vec<TimeRecord>, TableReport)> {
    let mut report = TableReport::new(TIME_TRACKING_TABLE);
    let (columns, rows) = read_table(
        raw_dir,
        TIME_TRACKING_TABLE,
        TIME_TRACKING_REQUIRED_COLUMNS,
        &mut report,
    )?;

    let mut parsed: Vec<(u64, TimeRecord)> = Vec::new();
    for (line, record) in &rows {
        match parse_time_record(&columns, record) {
            Ok(time_record) => parsed.push((*line, time_record)),
            Err(reason) => report.reject(*line, reason),
        }
    }
    ensure_not_empty(TIME_TRACKING_TABLE, &parsed)?;

    let records = retain_known_employees(parsed, known_ids, &mut report, |r| &r.employee_id);
    Ok((records, report))
}

fn parse_time_record(
    columns: &ColumnMap,
    record: &StringRecord,
) -> std::result::Result<TimeRecord, String> {
    let employee_id = columns
        .get(record, "employee_id")
        .ok_or("blank employee_id")?
        .to_string();
    let date = parse_date(columns.get(record, "date").ok_or("blank date")?)?;

    // Hour columns are optional; an absent column or blank field means no
    // hours of that kind were logged that day.
    let billable_hours = match columns.get(record, "billable_hours") {
        Some(raw) => parse_hours(raw, "billable_hours")?,
        None => 0.0,
    };
    let non_billable_hours = match columns.get(record, "non_billable_hours") {
        Some(raw) => parse_hours(raw, "non_billable_hours")?,
        None => 0.0,
    };
    let meeting_hours = match columns.get(record, "meeting_hours") {
        Some(raw) => parse_hours(raw, "meeting_hours")?,
        None => 0.0,
    };

    Ok(TimeRecord {
        employee_id,
        date,
        billable_hours,
        non_billable_hours,
        meeting_hours,
    })
}

fn load_project_data(
    raw_dir: &Path,
    known_ids: &HashSet<&str>,
) -> Result<(Vec<ProjectAssignment>, TableReport)> {
    let mut report = TableReport::new(PROJECT_DATA_TABLE);
    let (columns, rows) = read_table(
        raw_dir,
        PROJECT_DATA_TABLE,
        PROJECT_DATA_REQUIRED_COLUMNS,
        &mut report,
    )?;

    let mut parsed: Vec<(u64, ProjectAssignment)> = Vec::new();
    for (line, record) in &rows {
        match parse_assignment(&columns, record) {
            Ok(assignment) => parsed.push((*line, assignment)),
            Err(reason) => report.reject(*line, reason),
        }
    }
    ensure_not_empty(PROJECT_DATA_TABLE, &parsed)?;

    let assignments = retain_known_employees(parsed, known_ids, &mut report, |a| &a.employee_id);
    Ok((assignments, report))
}

fn parse_assignment(
    columns: &ColumnMap,
    record: &StringRecord,
) -> std::result::Result<ProjectAssignment, String> {
    let project_id = columns
        .get(record, "project_id")
        .ok_or("blank project_id")?
        .to_string();
    let employee_id = columns
        .get(record, "employee_id")
        .ok_or("blank employee_id")?
        .to_string();

    let allocation = match columns.get(record, "allocation") {
        Some(raw) => {
            let value: f64 = raw
                .parse()
                .map_err(|_| format!("unparsable number '{raw}' in allocation"))?;
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("allocation '{raw}' outside [0, 1]"));
            }
            value
        }
        None => 1.0,
    };

    let deadline = match columns.get(record, "deadline") {
        Some(raw) => Some(parse_date(raw)?),
        None => None,
    };
    let priority = columns
        .get(record, "priority")
        .map(Priority::parse)
        .unwrap_or(Priority::Medium);

    // The project tracker omits these columns on older exports; assume done
    // and on time, matching the upstream reporting convention.
    let completed = match columns.get(record, "is_completed") {
        Some(raw) => parse_flag(raw, "is_completed")?,
        None => true,
    };
    let on_time = match columns.get(record, "on_time") {
        Some(raw) => parse_flag(raw, "on_time")?,
        None => true,
    };

    Ok(ProjectAssignment {
        project_id,
        employee_id,
        allocation,
        deadline,
        priority,
        completed,
        on_time,
    })
}

fn load_survey_responses(
    raw_dir: &Path,
    known_ids: &HashSet<&str>,
) -> Result<(Vec<SurveyResponse>, TableReport)> {
    let mut report = TableReport::new(SURVEY_RESPONSES_TABLE);
    let (columns, rows) = read_table(
        raw_dir,
        SURVEY_RESPONSES_TABLE,
        SURVEY_RESPONSES_REQUIRED_COLUMNS,
        &mut report,
    )?;

    let mut parsed: Vec<(u64, SurveyResponse)> = Vec::new();
    for (line, record) in &rows {
        match parse_survey_response(&columns, record) {
            Ok(response) => parsed.push((*line, response)),
            Err(reason) => report.reject(*line, reason),
        }
    }
    ensure_not_empty(SURVEY_RESPONSES_TABLE, &parsed)?;

    let responses = retain_known_employees(parsed, known_ids, &mut report, |r| &r.employee_id);
    Ok((responses, report))
}

fn parse_survey_response(
    columns: &ColumnMap,
    record: &StringRecord,
) -> std::result::Result<SurveyResponse, String> {
    let employee_id = columns
        .get(record, "employee_id")
        .ok_or("blank employee_id")?
        .to_string();
    let question_id = columns
        .get(record, "question_id")
        .ok_or("blank question_id")?
        .to_string();

    let raw_response = columns.get(record, "response").ok_or("blank response")?;
    let response: f64 = raw_response
        .parse()
        .map_err(|_| format!("unparsable number '{raw_response}' in response"))?;
    if !(1.0..=5.0).contains(&response) {
        return Err(format!("response '{raw_response}' outside the 1-5 scale"));
    }

    let submitted_at = match columns.get(record, "submitted_at") {
        Some(raw) => Some(parse_date(raw)?),
        None => None,
    };

    Ok(SurveyResponse {
        employee_id,
        question_id,
        response,
        submitted_at,
    })
}

/// Drop rows referencing employees absent from this run's employees table,
/// recording each drop. Derived tables must never see orphaned references.
fn retain_known_employees<T>(
    parsed: Vec<(u64, T)>,
    known_ids: &HashSet<&str>,
    report: &mut TableReport,
    employee_id: impl Fn(&T) -> &str,
) -> Vec<T> {
    let mut kept = Vec::with_capacity(parsed.len());
    for (line, row) in parsed {
        let id = employee_id(&row);
        if known_ids.contains(id) {
            kept.push(row);
            report.accept();
        } else {
            report.reject(line, format!("unknown employee_id '{id}'"));
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_raw(dir: &Path, table: &str, content: &str) {
        fs::write(dir.join(format!("{table}.csv")), content).unwrap();
    }

    fn write_minimal_tables(dir: &Path) {
        write_raw(
            dir,
            EMPLOYEES_TABLE,
            "employee_id,name,department,role,hire_date\n\
             E1,Ada,Engineering,Developer,2022-01-10\n\
             E2,Grace,Sales,Account Exec,2021-06-01\n",
        );
        write_raw(
            dir,
            TIME_TRACKING_TABLE,
            "employee_id,date,billable_hours,non_billable_hours,meeting_hours\n\
             E1,2025-03-10,6,1,1\n",
        );
        write_raw(
            dir,
            PROJECT_DATA_TABLE,
            "project_id,employee_id,is_completed,on_time\nP1,E1,1,1\n",
        );
        write_raw(
            dir,
            SURVEY_RESPONSES_TABLE,
            "employee_id,question_id,response\nE1,Q1,4\n",
        );
    }

    #[test]
    fn loads_well_formed_tables() {
        let dir = tempdir().unwrap();
        write_minimal_tables(dir.path());

        let result = load_raw_tables(dir.path()).unwrap();
        assert_eq!(result.tables.employees.len(), 2);
        assert_eq!(result.tables.time_records.len(), 1);
        assert_eq!(result.tables.assignments.len(), 1);
        assert_eq!(result.tables.survey_responses.len(), 1);
        assert!(result.reports.iter().all(|r| r.rows_rejected == 0));
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempdir().unwrap();
        write_minimal_tables(dir.path());
        fs::remove_file(dir.path().join("survey_responses.csv")).unwrap();

        let err = load_raw_tables(dir.path()).unwrap_err();
        assert!(matches!(err, EtlError::MissingTable { table, .. } if table == "survey_responses"));
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let dir = tempdir().unwrap();
        write_minimal_tables(dir.path());
        write_raw(
            dir.path(),
            EMPLOYEES_TABLE,
            "employee_id,name,department,role\nE1,Ada,Engineering,Developer\n",
        );

        let err = load_raw_tables(dir.path()).unwrap_err();
        assert!(
            matches!(err, EtlError::MissingColumn { ref column, .. } if column == "hire_date"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn headers_only_table_is_fatal() {
        let dir = tempdir().unwrap();
        write_minimal_tables(dir.path());
        write_raw(
            dir.path(),
            TIME_TRACKING_TABLE,
            "employee_id,date,billable_hours,non_billable_hours,meeting_hours\n",
        );

        let err = load_raw_tables(dir.path()).unwrap_err();
        assert!(matches!(err, EtlError::EmptyTable { table } if table == "time_tracking"));
    }

    #[test]
    fn malformed_rows_are_skipped_and_counted() {
        let dir = tempdir().unwrap();
        write_minimal_tables(dir.path());
        write_raw(
            dir.path(),
            TIME_TRACKING_TABLE,
            "employee_id,date,billable_hours,non_billable_hours,meeting_hours\n\
             E1,2025-03-10,6,1,1\n\
             E1,not-a-date,6,1,1\n\
             E1,2025-03-11,lots,1,1\n",
        );

        let result = load_raw_tables(dir.path()).unwrap();
        assert_eq!(result.tables.time_records.len(), 1);
        let report = result
            .reports
            .iter()
            .find(|r| r.table == TIME_TRACKING_TABLE)
            .unwrap();
        assert_eq!(report.rows_rejected, 2);
        assert!(report.rejections.iter().any(|r| r.reason.contains("date")));
    }

    #[test]
    fn orphan_rows_are_dropped() {
        let dir = tempdir().unwrap();
        write_minimal_tables(dir.path());
        write_raw(
            dir.path(),
            SURVEY_RESPONSES_TABLE,
            "employee_id,question_id,response\nE1,Q1,4\nE999,Q1,2\n",
        );

        let result = load_raw_tables(dir.path()).unwrap();
        assert_eq!(result.tables.survey_responses.len(), 1);
        let report = result
            .reports
            .iter()
            .find(|r| r.table == SURVEY_RESPONSES_TABLE)
            .unwrap();
        assert_eq!(report.rows_rejected, 1);
        assert!(report.rejections[0].reason.contains("E999"));
    }

    #[test]
    fn duplicate_employees_keep_first_row() {
        let dir = tempdir().unwrap();
        write_minimal_tables(dir.path());
        write_raw(
            dir.path(),
            EMPLOYEES_TABLE,
            "employee_id,name,department,role,hire_date\n\
             E1,Ada,Engineering,Developer,2022-01-10\n\
             E1,Imposter,Sales,Account Exec,2023-01-01\n",
        );

        let result = load_raw_tables(dir.path()).unwrap();
        assert_eq!(result.tables.employees.len(), 1);
        assert_eq!(result.tables.employees[0].name, "Ada");
    }

    #[test]
    fn negative_hours_reject_the_row() {
        let dir = tempdir().unwrap();
        write_minimal_tables(dir.path());
        write_raw(
            dir.path(),
            TIME_TRACKING_TABLE,
            "employee_id,date,billable_hours,non_billable_hours,meeting_hours\n\
             E1,2025-03-10,-2,0,0\n\
             E1,2025-03-11,4,0,0\n",
        );

        let result = load_raw_tables(dir.path()).unwrap();
        assert_eq!(result.tables.time_records.len(), 1);
    }

    #[test]
    fn unrecognized_columns_are_ignored() {
        let dir = tempdir().unwrap();
        write_minimal_tables(dir.path());
        write_raw(
            dir.path(),
            EMPLOYEES_TABLE,
            "employee_id,favorite_color,name,department,role,hire_date\n\
             E1,teal,Ada,Engineering,Developer,2022-01-10\n",
        );
        write_raw(
            dir.path(),
            SURVEY_RESPONSES_TABLE,
            "employee_id,question_id,response,office_floor\nE1,Q1,4,3\n",
        );

        let result = load_raw_tables(dir.path()).unwrap();
        assert_eq!(result.tables.employees.len(), 1);
        assert_eq!(result.tables.employees[0].name, "Ada");
        assert_eq!(result.tables.survey_responses.len(), 1);
        assert!(result.reports.iter().all(|r| r.rows_rejected == 0));
    }

    #[test]
    fn absent_optional_columns_use_defaults() {
        let dir = tempdir().unwrap();
        write_minimal_tables(dir.path());
        write_raw(dir.path(), PROJECT_DATA_TABLE, "project_id,employee_id\nP1,E1\n");

        let result = load_raw_tables(dir.path()).unwrap();
        let assignment = &result.tables.assignments[0];
        assert!(assignment.completed);
        assert!(assignment.on_time);
        assert!((assignment.allocation - 1.0).abs() < f64::EPSILON);
        assert_eq!(assignment.priority, Priority::Medium);
    }
}
