pub mod activities;
pub mod cross_check;
pub mod days;
pub mod export;
pub mod scrape;
pub mod status;
pub mod validate;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// January 1st through December 31st.
pub fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .with_context(|| format!("invalid year {year}"))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .with_context(|| format!("invalid year {year}"))?;
    Ok((start, end))
}

pub fn write_json_report<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", path.display()))
}
