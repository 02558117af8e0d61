use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::config::AttritionConfig;
use crate::domain::{
    AttritionRecord, Employee, ProjectAssignment, RiskLevel, SatisfactionScore, TimeRecord,
    WeeklyTime,
};

/// The date tenure is measured against: the latest day of logged time in the
/// run. Derived from the inputs rather than the wall clock so that identical
/// inputs always score identically.
pub fn reference_date(records: &[TimeRecord]) -> Option<NaiveDate> {
    records.iter().map(|r| r.date).max()
}

#[derive(Default)]
struct ProjectStats {
    projects: HashSet<String>,
    assignments: u32,
    completed: u32,
    on_time: u32,
}

/// Score every employee with the configured heuristic and bucket the result.
///
/// Components are each normalized to 0-1, weighted, and divided by the
/// weight sum, so the probability always lands in [0, 1] before rounding.
pub fn attrition_records(
    employees: &[Employee],
    satisfaction: &[SatisfactionScore],
    weekly: &[WeeklyTime],
    assignments: &[ProjectAssignment],
    config: &AttritionConfig,
    as_of: NaiveDate,
) -> Vec<AttritionRecord> {
    let satisfaction_by_employee: HashMap<&str, &SatisfactionScore> = satisfaction
        .iter()
        .map(|s| (s.employee_id.as_str(), s))
        .collect();

    let mut weekly_by_employee: HashMap<&str, Vec<&WeeklyTime>> = HashMap::new();
    for row in weekly {
        weekly_by_employee.entry(row.employee_id.as_str()).or_default().push(row);
    }

    let mut projects_by_employee: HashMap<&str, ProjectStats> = HashMap::new();
    for assignment in assignments {
        let stats = projects_by_employee
            .entry(assignment.employee_id.as_str())
            .or_default();
        stats.projects.insert(assignment.project_id.clone());
        stats.assignments += 1;
        if assignment.completed {
            stats.completed += 1;
        }
        if assignment.on_time {
            stats.on_time += 1;
        }
    }

    let mut sorted: Vec<&Employee> = employees.iter().collect();
    sorted.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));

    sorted
        .into_iter()
        .map(|employee| {
            score_employee(
                employee,
                satisfaction_by_employee.get(employee.employee_id.as_str()).copied(),
                weekly_by_employee
                    .get(employee.employee_id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]),
                projects_by_employee.get(employee.employee_id.as_str()),
                config,
                as_of,
            )
        })
        .collect()
}

fn score_employee(
    employee: &Employee,
    satisfaction: Option<&SatisfactionScore>,
    weekly: &[&WeeklyTime],
    projects: Option<&ProjectStats>,
    config: &AttritionConfig,
    as_of: NaiveDate,
) -> AttritionRecord {
    let defaults = &config.defaults;

    let avg_satisfaction = satisfaction
        .map(|s| s.avg_satisfaction)
        .unwrap_or(defaults.satisfaction);

    let avg_weekly_hours = if weekly.is_empty() {
        defaults.weekly_hours
    } else {
        weekly.iter().map(|w| w.hours_logged).sum::<f64>() / weekly.len() as f64
    };

    // Undefined (no logged hours at all) stays undefined in the output row;
    // only the risk component falls back to the neutral default.
    let defined_ratios: Vec<f64> = weekly.iter().filter_map(|w| w.productivity_ratio).collect();
    let avg_productivity = if defined_ratios.is_empty() {
        None
    } else {
        Some(defined_ratios.iter().sum::<f64>() / defined_ratios.len() as f64)
    };

    let (total_projects, completion_rate, on_time_rate) = match projects {
        Some(stats) if stats.assignments > 0 => (
            stats.projects.len() as u32,
            f64::from(stats.completed) / f64::from(stats.assignments),
            f64::from(stats.on_time) / f64::from(stats.assignments),
        ),
        _ => (0, defaults.completion_rate, defaults.on_time_rate),
    };

    let tenure_days = (as_of - employee.hire_date).num_days().max(0);

    let satisfaction_component = ((5.0 - avg_satisfaction) / 4.0).clamp(0.0, 1.0);
    let overwork_component = ((avg_weekly_hours - config.overwork_start_hours)
        / config.overwork_span_hours)
        .clamp(0.0, 1.0);
    let low_productivity_component =
        (1.0 - avg_productivity.unwrap_or(defaults.productivity)).clamp(0.0, 1.0);
    let completion_component = (1.0 - completion_rate).clamp(0.0, 1.0);
    let on_time_component = (1.0 - on_time_rate).clamp(0.0, 1.0);
    let tenure_component =
        (1.0 - tenure_days as f64 / config.tenure_ramp_days as f64).clamp(0.0, 1.0);

    let w = &config.weights;
    let weight_sum =
        w.satisfaction + w.overwork + w.low_productivity + w.completion + w.on_time + w.tenure;
    let weighted = w.satisfaction * satisfaction_component
        + w.overwork * overwork_component
        + w.low_productivity * low_productivity_component
        + w.completion * completion_component
        + w.on_time * on_time_component
        + w.tenure * tenure_component;

    let attrition_probability = round3((weighted / weight_sum).clamp(0.0, 1.0));
    let risk_level = RiskLevel::bucket(
        attrition_probability,
        config.thresholds.medium,
        config.thresholds.high,
    );

    debug!(
        employee = %employee.employee_id,
        probability = attrition_probability,
        risk = %risk_level,
        "scored employee"
    );

    AttritionRecord {
        employee_id: employee.employee_id.clone(),
        name: employee.name.clone(),
        department: employee.department.clone(),
        role: employee.role.clone(),
        tenure_days,
        avg_satisfaction,
        avg_weekly_hours,
        avg_productivity,
        total_projects,
        completion_rate,
        on_time_rate,
        attrition_probability,
        risk_level,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
