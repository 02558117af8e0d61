use std::collections::BTreeMap;

use chrono::Datelike;

use crate::config::WorkweekConfig;
use crate::domain::{TimeRecord, WeeklyTime};

#[derive(Default)]
struct WeekAccumulator {
    hours_logged: f64,
    billable_hours: f64,
    meeting_hours: f64,
}

/// Aggregate daily time records into per-employee ISO-week rows.
///
/// The productivity ratio stays `None` for weeks with zero logged hours;
/// downstream consumers must treat it as undefined, not as zero.
pub fn weekly_time(records: &[TimeRecord], workweek: &WorkweekConfig) -> Vec<WeeklyTime> {
    let mut grouped: BTreeMap<(String, i32, u32), WeekAccumulator> = BTreeMap::new();

    for record in records {
        let iso_week = record.date.iso_week();
        let key = (record.employee_id.clone(), iso_week.year(), iso_week.week());
        let acc = grouped.entry(key).or_default();
        acc.hours_logged += record.total_hours();
        acc.billable_hours += record.billable_hours;
        acc.meeting_hours += record.meeting_hours;
    }

    grouped
        .into_iter()
        .map(|((employee_id, year, week), acc)| {
            let productivity_ratio = if acc.hours_logged > 0.0 {
                Some(acc.billable_hours / acc.hours_logged)
            } else {
                None
            };
            let activity_pct = (acc.hours_logged / workweek.standard_hours * 100.0)
                .clamp(0.0, workweek.max_activity_pct);

            WeeklyTime {
                employee_id,
                year,
                week,
                hours_logged: acc.hours_logged,
                billable_hours: acc.billable_hours,
                meeting_hours: acc.meeting_hours,
                productivity_ratio,
                activity_pct,
            }
        })
        .collect()
}
