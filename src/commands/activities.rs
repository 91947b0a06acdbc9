use anyhow::Result;

use crate::commands::CommandReport;
use crate::lunar::activities::{ActivityCategory, CATALOG, by_category};

pub fn run(category: Option<&str>) -> Result<CommandReport> {
    let mut report = CommandReport::new("activities");

    let entries = match category {
        Some(raw) => match ActivityCategory::from_key(raw) {
            Some(category) => by_category(category),
            None => {
                let known = ActivityCategory::ALL
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                report.issue(format!("unknown category `{raw}`; use one of {known}"));
                return Ok(report);
            }
        },
        None => CATALOG.iter().collect(),
    };

    report.detail(format!("count={}", entries.len()));
    for activity in entries {
        report.detail(format!(
            "{} {} ({}) [{}]",
            activity.id,
            activity.name,
            activity.name_en,
            activity.category.display_name()
        ));
    }
    Ok(report)
}
