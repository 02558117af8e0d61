use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An employee as loaded from the raw export. Immutable for the duration of
/// a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: String,
    pub name: String,
    pub department: String,
    pub role: String,
    pub manager_id: Option<String>,
    pub hire_date: NaiveDate,
}

/// One day of logged time for one employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRecord {
    pub employee_id: String,
    pub date: NaiveDate,
    pub billable_hours: f64,
    pub non_billable_hours: f64,
    pub meeting_hours: f64,
}

impl TimeRecord {
    /// Total hours logged for the day across all buckets.
    pub fn total_hours(&self) -> f64 {
        self.billable_hours + self.non_billable_hours + self.meeting_hours
    }
}

/// Assignment priority as exported by the project tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Lenient parse of the raw column value. Unrecognised values map to
    /// `Medium` rather than rejecting the row.
    pub fn parse(raw: &str) -> Priority {
        match raw.trim().to_lowercase().as_str() {
            "low" | "l" | "1" => Priority::Low,
            "high" | "h" | "3" | "critical" => Priority::High,
            _ => Priority::Medium,
        }
    }
}

/// A project assignment linking an employee to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAssignment {
    pub project_id: String,
    pub employee_id: String,
    /// Fraction of the employee's capacity allocated to the project (0-1).
    pub allocation: f64,
    pub deadline: Option<NaiveDate>,
    pub priority: Priority,
    pub completed: bool,
    pub on_time: bool,
}

/// A single survey answer from one employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub employee_id: String,
    pub question_id: String,
    /// Numeric score on the 1-5 scale.
    pub response: f64,
    pub submitted_at: Option<NaiveDate>,
}

/// Attrition risk bucket for an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a probability using the configured thresholds. A probability
    /// exactly on a threshold falls in the lower-risk bucket.
    pub fn bucket(probability: f64, medium_threshold: f64, high_threshold: f64) -> RiskLevel {
        if probability > high_threshold {
            RiskLevel::High
        } else if probability > medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-employee mean survey score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatisfactionScore {
    pub employee_id: String,
    pub avg_satisfaction: f64,
    pub response_count: u32,
}

/// Per-employee, per-ISO-week time aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyTime {
    pub employee_id: String,
    pub year: i32,
    pub week: u32,
    pub hours_logged: f64,
    pub billable_hours: f64,
    pub meeting_hours: f64,
    /// Billable share of logged hours. `None` when no hours were logged,
    /// never coerced to zero.
    pub productivity_ratio: Option<f64>,
    /// Logged hours relative to the standard workweek, as a percentage.
    pub activity_pct: f64,
}

/// Per-employee attrition risk row, the main output of the transform stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttritionRecord {
    pub employee_id: String,
    pub name: String,
    pub department: String,
    pub role: String,
    pub tenure_days: i64,
    pub avg_satisfaction: f64,
    pub avg_weekly_hours: f64,
    pub avg_productivity: Option<f64>,
    pub total_projects: u32,
    pub completion_rate: f64,
    pub on_time_rate: f64,
    pub attrition_probability: f64,
    pub risk_level: RiskLevel,
}

/// Department-level weekly rollup of the per-employee weekly rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentWeekly {
    pub department: String,
    pub year: i32,
    pub week: u32,
    pub hours_logged: f64,
    pub billable_hours: f64,
    pub active_employees: u32,
    pub avg_productivity: Option<f64>,
}

/// Department-level summary across the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub department: String,
    pub headcount: u32,
    pub avg_satisfaction: Option<f64>,
    pub avg_attrition_probability: f64,
    pub high_risk_count: u32,
}
