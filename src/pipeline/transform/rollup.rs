use std::collections::{BTreeMap, HashMap};

use crate::domain::{
    AttritionRecord, DepartmentSummary, DepartmentWeekly, Employee, RiskLevel, SatisfactionScore,
    WeeklyTime,
};

#[derive(Default)]
struct DeptWeekAccumulator {
    hours_logged: f64,
    billable_hours: f64,
    active_employees: u32,
}

/// Roll the per-employee weekly rows up to department level. Hour sums are
/// plain sums of the member rows, so a department's weekly total always
/// equals the sum of its employees' totals for that week.
pub fn department_weekly(weekly: &[WeeklyTime], employees: &[Employee]) -> Vec<DepartmentWeekly> {
    let department_of: HashMap<&str, &str> = employees
        .iter()
        .map(|e| (e.employee_id.as_str(), e.department.as_str()))
        .collect();

    let mut grouped: BTreeMap<(String, i32, u32), DeptWeekAccumulator> = BTreeMap::new();
    for row in weekly {
        // Weekly rows are built from validated time records, so the lookup
        // cannot miss; skip defensively all the same.
        let Some(department) = department_of.get(row.employee_id.as_str()) else {
            continue;
        };
        let acc = grouped
            .entry((department.to_string(), row.year, row.week))
            .or_default();
        acc.hours_logged += row.hours_logged;
        acc.billable_hours += row.billable_hours;
        acc.active_employees += 1;
    }

    grouped
        .into_iter()
        .map(|((department, year, week), acc)| {
            let avg_productivity = if acc.hours_logged > 0.0 {
                Some(acc.billable_hours / acc.hours_logged)
            } else {
                None
            };
            DepartmentWeekly {
                department,
                year,
                week,
                hours_logged: acc.hours_logged,
                billable_hours: acc.billable_hours,
                active_employees: acc.active_employees,
                avg_productivity,
            }
        })
        .collect()
}

#[derive(Default)]
struct DeptSummaryAccumulator {
    headcount: u32,
    satisfaction_sum: f64,
    satisfaction_count: u32,
    probability_sum: f64,
    high_risk: u32,
}

/// Department-level snapshot across the whole run: headcount, mean
/// satisfaction (undefined when nobody answered a survey), mean attrition
/// probability, and how many employees sit in the high-risk bucket.
pub fn department_summary(
    employees: &[Employee],
    satisfaction: &[SatisfactionScore],
    attrition: &[AttritionRecord],
) -> Vec<DepartmentSummary> {
    let satisfaction_by_employee: HashMap<&str, f64> = satisfaction
        .iter()
        .map(|s| (s.employee_id.as_str(), s.avg_satisfaction))
        .collect();
    let attrition_by_employee: HashMap<&str, &AttritionRecord> = attrition
        .iter()
        .map(|a| (a.employee_id.as_str(), a))
        .collect();

    let mut grouped: BTreeMap<&str, DeptSummaryAccumulator> = BTreeMap::new();
    for employee in employees {
        let acc = grouped.entry(employee.department.as_str()).or_default();
        acc.headcount += 1;
        if let Some(score) = satisfaction_by_employee.get(employee.employee_id.as_str()) {
            acc.satisfaction_sum += score;
            acc.satisfaction_count += 1;
        }
        if let Some(record) = attrition_by_employee.get(employee.employee_id.as_str()) {
            acc.probability_sum += record.attrition_probability;
            if record.risk_level == RiskLevel::High {
                acc.high_risk += 1;
            }
        }
    }

    grouped
        .into_iter()
        .map(|(department, acc)| DepartmentSummary {
            department: department.to_string(),
            headcount: acc.headcount,
            avg_satisfaction: (acc.satisfaction_count > 0)
                .then(|| acc.satisfaction_sum / f64::from(acc.satisfaction_count)),
            avg_attrition_probability: if acc.headcount > 0 {
                acc.probability_sum / f64::from(acc.headcount)
            } else {
                0.0
            },
            high_risk_count: acc.high_risk,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn employee(id: &str, department: &str) -> Employee {
        Employee {
            employee_id: id.to_string(),
            name: id.to_string(),
            department: department.to_string(),
            role: "Developer".to_string(),
            manager_id: None,
            hire_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        }
    }

    fn week_row(id: &str, week: u32, hours: f64, billable: f64) -> WeeklyTime {
        WeeklyTime {
            employee_id: id.to_string(),
            year: 2025,
            week,
            hours_logged: hours,
            billable_hours: billable,
            meeting_hours: 0.0,
            productivity_ratio: (hours > 0.0).then(|| billable / hours),
            activity_pct: hours / 40.0 * 100.0,
        }
    }

    #[test]
    fn department_hours_equal_sum_of_member_hours() {
        let employees = vec![
            employee("E1", "Engineering"),
            employee("E2", "Engineering"),
            employee("E3", "Sales"),
        ];
        let weekly = vec![
            week_row("E1", 11, 40.0, 30.0),
            week_row("E2", 11, 35.0, 20.0),
            week_row("E3", 11, 38.0, 38.0),
        ];

        let rollup = department_weekly(&weekly, &employees);
        assert_eq!(rollup.len(), 2);

        let engineering = rollup.iter().find(|r| r.department == "Engineering").unwrap();
        assert!((engineering.hours_logged - 75.0).abs() < 1e-9);
        assert!((engineering.billable_hours - 50.0).abs() < 1e-9);
        assert_eq!(engineering.active_employees, 2);
        assert!((engineering.avg_productivity.unwrap() - 50.0 / 75.0).abs() < 1e-9);
    }

    #[test]
    fn summary_counts_high_risk_members() {
        let employees = vec![employee("E1", "Sales"), employee("E2", "Sales")];
        let satisfaction = vec![SatisfactionScore {
            employee_id: "E1".to_string(),
            avg_satisfaction: 4.0,
            response_count: 2,
        }];
        let attrition = vec![
            attrition_row("E1", "Sales", 0.2, RiskLevel::Low),
            attrition_row("E2", "Sales", 0.8, RiskLevel::High),
        ];

        let summary = department_summary(&employees, &satisfaction, &attrition);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].headcount, 2);
        assert_eq!(summary[0].high_risk_count, 1);
        assert!((summary[0].avg_attrition_probability - 0.5).abs() < 1e-9);
        assert!((summary[0].avg_satisfaction.unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn department_without_surveys_has_undefined_satisfaction() {
        let employees = vec![employee("E1", "Support")];
        let summary = department_summary(&employees, &[], &[]);
        assert!(summary[0].avg_satisfaction.is_none());
    }

    fn attrition_row(
        id: &str,
        department: &str,
        probability: f64,
        risk_level: RiskLevel,
    ) -> AttritionRecord {
        AttritionRecord {
            employee_id: id.to_string(),
            name: id.to_string(),
            department: department.to_string(),
            role: "Developer".to_string(),
            tenure_days: 500,
            avg_satisfaction: 3.5,
            avg_weekly_hours: 40.0,
            avg_productivity: Some(0.7),
            total_projects: 1,
            completion_rate: 1.0,
            on_time_rate: 1.0,
            attrition_probability: probability,
            risk_level,
        }
    }
}
