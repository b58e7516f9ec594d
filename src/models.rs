use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_COUNTRIES: &str = "Global";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("research topic must not be empty")]
    EmptyTopic,
    #[error("invalid rank ceiling '{0}': expected 'Any' or a positive number such as 50, 100, 200")]
    InvalidRankCeiling(String),
}

/// Upper bound on institution ranking (QS style). `Any` disables the clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankCeiling {
    #[default]
    Any,
    Top(u32),
}

impl FromStr for RankCeiling {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("any") {
            return Ok(RankCeiling::Any);
        }

        // Accept "top 100" as well as "100"
        let lower = trimmed.to_lowercase();
        let digits = lower.strip_prefix("top").unwrap_or(&lower).trim();

        match digits.parse::<u32>() {
            Ok(n) if n > 0 => Ok(RankCeiling::Top(n)),
            _ => Err(CriteriaError::InvalidRankCeiling(s.to_string())),
        }
    }
}

impl fmt::Display for RankCeiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankCeiling::Any => write!(f, "Any"),
            RankCeiling::Top(n) => write!(f, "{}", n),
        }
    }
}

/// What the student asked for. Lives for one search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub topic: String,
    pub countries: String,
    pub max_rank: RankCeiling,
    pub require_scholarship: bool,
    pub background: String,
}

impl SearchCriteria {
    pub fn new(topic: impl Into<String>) -> Result<Self, CriteriaError> {
        let criteria = Self {
            topic: topic.into(),
            countries: DEFAULT_COUNTRIES.to_string(),
            max_rank: RankCeiling::Any,
            require_scholarship: false,
            background: String::new(),
        };
        criteria.validate()?;
        Ok(criteria)
    }

    pub fn with_countries(mut self, countries: impl Into<String>) -> Self {
        let countries = countries.into();
        self.countries = if countries.trim().is_empty() {
            DEFAULT_COUNTRIES.to_string()
        } else {
            countries
        };
        self
    }

    pub fn with_max_rank(mut self, max_rank: RankCeiling) -> Self {
        self.max_rank = max_rank;
        self
    }

    pub fn with_scholarship(mut self, require_scholarship: bool) -> Self {
        self.require_scholarship = require_scholarship;
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    pub fn validate(&self) -> Result<(), CriteriaError> {
        if self.topic.trim().is_empty() {
            return Err(CriteriaError::EmptyTopic);
        }
        Ok(())
    }
}

/// One suggested supervisor as returned by the collaborator.
///
/// Keys follow the camelCase names the prompt asks for. Only `name`,
/// `university` and `matchReason` are required; `null` on any optional
/// key is read as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    pub university: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub country: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub university_rank: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub research_keywords: Vec<String>,
    pub match_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub funding_estimate: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub scholarship_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_paper_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_paper_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub hiring_status: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub intake_term: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Label fields are free text; numbers and booleans are kept as their text.
fn lenient_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accepts a boolean or a yes/no style string. Anything else is unknown.
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// A recent publication used as a conversation opener with the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookPaper<'a> {
    pub title: &'a str,
    pub url: Option<&'a str>,
}

/// Trimmed value of an optional text field, `None` when absent or blank.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CandidateRecord {
    /// Hiring status counts as hiring when it mentions "hiring" in any case.
    /// "Not Hiring" matches too; the status text is free-form and untrusted.
    pub fn is_hiring(&self) -> bool {
        self.hiring_status
            .as_deref()
            .is_some_and(|status| status.to_lowercase().contains("hiring"))
    }

    pub fn hook_paper(&self) -> Option<HookPaper<'_>> {
        non_empty(&self.hook_paper_title).map(|title| HookPaper {
            title,
            url: non_empty(&self.hook_paper_url),
        })
    }

    pub fn has_scholarship(&self) -> bool {
        self.scholarship_available == Some(true)
    }
}

/// A web source the collaborator attached to its answer. Both parts are
/// required; see [`Citation::from_parts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

impl Citation {
    pub fn from_parts(uri: Option<&str>, title: Option<&str>) -> Option<Self> {
        let uri = uri.map(str::trim).filter(|u| !u.is_empty())?;
        let title = title.map(str::trim).filter(|t| !t.is_empty())?;
        Some(Self {
            uri: uri.to_string(),
            title: title.to_string(),
        })
    }
}

/// One search response: candidates in collaborator order plus citations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultBundle {
    pub candidates: Vec<CandidateRecord>,
    pub citations: Vec<Citation>,
}

impl ResultBundle {
    pub fn new(candidates: Vec<CandidateRecord>, citations: Vec<Citation>) -> Self {
        Self {
            candidates,
            citations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn sample_record(name: &str, university: &str) -> CandidateRecord {
    CandidateRecord {
        name: name.to_string(),
        title: None,
        university: university.to_string(),
        department: None,
        country: None,
        university_rank: None,
        research_keywords: Vec::new(),
        match_reason: "fit".to_string(),
        website: None,
        funding_estimate: None,
        scholarship_available: None,
        hook_paper_title: None,
        hook_paper_url: None,
        hiring_status: None,
        intake_term: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ceiling_parse() {
        assert_eq!("Any".parse::<RankCeiling>().unwrap(), RankCeiling::Any);
        assert_eq!("any".parse::<RankCeiling>().unwrap(), RankCeiling::Any);
        assert_eq!("".parse::<RankCeiling>().unwrap(), RankCeiling::Any);
        assert_eq!("100".parse::<RankCeiling>().unwrap(), RankCeiling::Top(100));
        assert_eq!("Top 50".parse::<RankCeiling>().unwrap(), RankCeiling::Top(50));
        assert!("0".parse::<RankCeiling>().is_err());
        assert!("best".parse::<RankCeiling>().is_err());
    }

    #[test]
    fn test_rank_ceiling_display() {
        assert_eq!(RankCeiling::Any.to_string(), "Any");
        assert_eq!(RankCeiling::Top(200).to_string(), "200");
    }

    #[test]
    fn test_criteria_rejects_blank_topic() {
        assert_eq!(SearchCriteria::new("   ").unwrap_err(), CriteriaError::EmptyTopic);
        assert_eq!(SearchCriteria::new("").unwrap_err(), CriteriaError::EmptyTopic);
    }

    #[test]
    fn test_criteria_defaults() {
        let criteria = SearchCriteria::new("robotics").unwrap();
        assert_eq!(criteria.countries, "Global");
        assert_eq!(criteria.max_rank, RankCeiling::Any);
        assert!(!criteria.require_scholarship);
        assert!(criteria.background.is_empty());

        let criteria = criteria.with_countries("  ");
        assert_eq!(criteria.countries, "Global");
    }

    #[test]
    fn test_record_decodes_camel_case_and_nulls() {
        let json = r#"{
            "name": "A. Lee",
            "university": "UBC",
            "department": null,
            "researchKeywords": null,
            "matchReason": "fit",
            "scholarshipAvailable": true,
            "hookPaperTitle": "Graphs 2025",
            "hiringStatus": "Likely Hiring"
        }"#;
        let record: CandidateRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "A. Lee");
        assert!(record.department.is_none());
        assert!(record.research_keywords.is_empty());
        assert!(record.has_scholarship());
        assert!(record.is_hiring());
        assert_eq!(
            record.hook_paper(),
            Some(HookPaper {
                title: "Graphs 2025",
                url: None
            })
        );
    }

    #[test]
    fn test_record_requires_match_reason() {
        let json = r#"{"name": "A. Lee", "university": "UBC"}"#;
        assert!(serde_json::from_str::<CandidateRecord>(json).is_err());
    }

    #[test]
    fn test_is_hiring_is_substring_match() {
        let mut record = sample_record("A", "U");
        assert!(!record.is_hiring());

        record.hiring_status = Some("HIRING".to_string());
        assert!(record.is_hiring());

        record.hiring_status = Some("Not Hiring".to_string());
        assert!(record.is_hiring());

        record.hiring_status = Some("Unknown".to_string());
        assert!(!record.is_hiring());
    }

    #[test]
    fn test_citation_requires_both_parts() {
        assert!(Citation::from_parts(Some("https://a.edu"), None).is_none());
        assert!(Citation::from_parts(None, Some("A")).is_none());
        assert!(Citation::from_parts(Some(" "), Some("A")).is_none());

        let citation = Citation::from_parts(Some("https://a.edu"), Some("Lab page")).unwrap();
        assert_eq!(citation.uri, "https://a.edu");
        assert_eq!(citation.title, "Lab page");
    }
}
