use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{non_empty, CandidateRecord};

pub const EXPORT_FILE_NAME: &str = "supervisors_export.csv";
pub const NOTHING_TO_EXPORT: &str = "Nothing to export";

pub const CSV_HEADER: [&str; 13] = [
    "Name",
    "Title",
    "School",
    "Country",
    "Rank",
    "Wealth",
    "Scholarship",
    "Profile Link",
    "Hook Paper",
    "Paper Link",
    "Tech Fit",
    "Hiring",
    "Term",
];

// Fallbacks for absent optional fields.
const DEFAULT_TITLE: &str = "Professor";
const DEFAULT_COUNTRY: &str = "Unknown";
const DEFAULT_RANK: &str = "N/A";
const DEFAULT_FUNDING: &str = "Unknown";
const NO_SCHOLARSHIP: &str = "No/Unclear";
const DEFAULT_HOOK_PAPER: &str = "N/A";
const DEFAULT_HIRING: &str = "Unknown";

/// Always quoted; embedded quotes are doubled.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn row(record: &CandidateRecord) -> [String; 13] {
    let hook = record.hook_paper();
    [
        record.name.clone(),
        non_empty(&record.title).unwrap_or(DEFAULT_TITLE).to_string(),
        record.university.clone(),
        non_empty(&record.country).unwrap_or(DEFAULT_COUNTRY).to_string(),
        non_empty(&record.university_rank).unwrap_or(DEFAULT_RANK).to_string(),
        non_empty(&record.funding_estimate).unwrap_or(DEFAULT_FUNDING).to_string(),
        if record.has_scholarship() { "Yes" } else { NO_SCHOLARSHIP }.to_string(),
        non_empty(&record.website).unwrap_or_default().to_string(),
        hook.map(|h| h.title).unwrap_or(DEFAULT_HOOK_PAPER).to_string(),
        hook.and_then(|h| h.url).unwrap_or_default().to_string(),
        record.match_reason.clone(),
        non_empty(&record.hiring_status).unwrap_or(DEFAULT_HIRING).to_string(),
        non_empty(&record.intake_term).unwrap_or_default().to_string(),
    ]
}

/// Serialises the records as CSV. `None` when there is nothing to export.
pub fn export_csv(records: &[&CandidateRecord]) -> Option<String> {
    if records.is_empty() {
        return None;
    }

    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for record in records {
        let fields: Vec<String> = row(record).iter().map(|f| quote(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    Some(out)
}

/// Writes `supervisors_export.csv` into `dir`. Returns the path written, or
/// `None` without touching the disk when `records` is empty.
pub fn write_export(records: &[&CandidateRecord], dir: &Path) -> Result<Option<PathBuf>> {
    let Some(csv) = export_csv(records) else {
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;
    let path = dir.join(EXPORT_FILE_NAME);
    fs::write(&path, csv).with_context(|| format!("Failed to write to {}", path.display()))?;

    tracing::info!(path = %path.display(), rows = records.len(), "exported supervisors");
    Ok(Some(path))
}

/// Writes the export and returns the line to show the user.
pub fn export_summary(records: &[&CandidateRecord], dir: &Path) -> Result<String> {
    Ok(match write_export(records, dir)? {
        Some(path) => format!(
            "Exported {} supervisor(s) to {}",
            records.len(),
            path.display()
        ),
        None => NOTHING_TO_EXPORT.to_string(),
    })
}
