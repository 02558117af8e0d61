use std::collections::BTreeMap;

use crate::domain::{SatisfactionScore, SurveyResponse};

/// Mean survey score per employee. Employees without any responses are
/// simply absent from the output; the attrition step substitutes its
/// configured neutral default for them.
pub fn satisfaction_scores(responses: &[SurveyResponse]) -> Vec<SatisfactionScore> {
    let mut grouped: BTreeMap<&str, (f64, u32)> = BTreeMap::new();
    for response in responses {
        let entry = grouped.entry(response.employee_id.as_str()).or_insert((0.0, 0));
        entry.0 += response.response;
        entry.1 += 1;
    }

    grouped
        .into_iter()
        .map(|(employee_id, (sum, count))| SatisfactionScore {
            employee_id: employee_id.to_string(),
            avg_satisfaction: sum / f64::from(count),
            response_count: count,
        })
        .collect()
}
