//! Plain-text rendering for the terminal. Absent fields get explicit
//! fallback text so no card has empty slots.

use crate::models::{non_empty, CandidateRecord, Citation};

pub const NO_RESULTS: &str = "No specific supervisors found. Try broadening your research topic.";
pub const SOURCES_DISCLAIMER: &str =
    "* Information retrieved via web-grounded search. Please verify specific details on university websites.";

const WRAP_WIDTH: usize = 76;

pub fn hiring_label(record: &CandidateRecord) -> String {
    let status = non_empty(&record.hiring_status);
    match (record.is_hiring(), status) {
        (true, Some(status)) => match non_empty(&record.intake_term) {
            Some(term) => format!("{} ({})", status, term),
            None => status.to_string(),
        },
        (_, Some(status)) => status.to_string(),
        (_, None) => "Status Unknown".to_string(),
    }
}

pub fn department_label(record: &CandidateRecord) -> &str {
    non_empty(&record.department).unwrap_or("Department not listed")
}

pub fn profile_label(record: &CandidateRecord) -> &str {
    non_empty(&record.website).unwrap_or("Profile Not Linked")
}

pub fn keywords_label(record: &CandidateRecord) -> String {
    let tags: Vec<String> = record
        .research_keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| format!("#{}", k))
        .collect();
    if tags.is_empty() {
        "No keywords listed".to_string()
    } else {
        tags.join(" ")
    }
}

/// "University [Country] · Rank", omitting the parts that are absent.
pub fn institution_line(record: &CandidateRecord) -> String {
    let mut line = record.university.clone();
    if let Some(country) = non_empty(&record.country) {
        line.push_str(&format!(" [{}]", country));
    }
    if let Some(rank) = non_empty(&record.university_rank) {
        line.push_str(&format!(" · {}", rank));
    }
    line
}

pub fn hook_paper_line(record: &CandidateRecord) -> Option<String> {
    record.hook_paper().map(|hook| match hook.url {
        Some(url) => format!("2024-25 Hook Paper: {} ↗ {}", hook.title, url),
        None => format!("2024-25 Hook Paper: {}", hook.title),
    })
}

pub fn render_card(position: usize, record: &CandidateRecord) -> String {
    let mut out = String::new();

    match non_empty(&record.title) {
        Some(title) => out.push_str(&format!("{:>3}. {} ({})\n", position, record.name, title)),
        None => out.push_str(&format!("{:>3}. {}\n", position, record.name)),
    }
    out.push_str(&format!("     {}\n", institution_line(record)));
    out.push_str(&format!("     {}\n", department_label(record)));

    let mut badges = format!("[{}]", hiring_label(record));
    if record.has_scholarship() {
        badges.push_str(" [Scholarship Avail.]");
    }
    out.push_str(&format!("     {}\n", badges));

    let fit = textwrap::fill(&format!("Fit: \"{}\"", record.match_reason.trim()), WRAP_WIDTH);
    for line in fit.lines() {
        out.push_str(&format!("     {}\n", line));
    }

    if let Some(hook) = hook_paper_line(record) {
        out.push_str(&format!("     {}\n", hook));
    }
    out.push_str(&format!("     {}\n", keywords_label(record)));
    out.push_str(&format!("     Profile: {}\n", profile_label(record)));
    out
}

/// `None` when there is no citation to show.
pub fn render_sources(citations: &[Citation]) -> Option<String> {
    if citations.is_empty() {
        return None;
    }

    let mut out = String::from("Verified Sources\n");
    for citation in citations {
        out.push_str(&format!("  - {} <{}>\n", citation.title, citation.uri));
    }
    out.push_str(SOURCES_DISCLAIMER);
    out.push('\n');
    Some(out)
}

pub fn render_results(records: &[&CandidateRecord], total: usize, citations: &[Citation]) -> String {
    let mut out = if records.len() == total {
        format!("Recommended Supervisors ({} found)\n\n", total)
    } else {
        format!(
            "Recommended Supervisors ({} of {} shown)\n\n",
            records.len(),
            total
        )
    };

    if records.is_empty() {
        out.push_str(NO_RESULTS);
        out.push('\n');
    } else {
        for (i, record) in records.iter().enumerate() {
            out.push_str(&render_card(i + 1, record));
            out.push('\n');
        }
    }

    if let Some(sources) = render_sources(citations) {
        out.push('\n');
        out.push_str(&sources);
    }
    out
}
