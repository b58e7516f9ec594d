//! Recovers the supervisor list from the collaborator's free-text answer.
//!
//! The answer is expected to hold a JSON array inside a markdown code
//! fence. The payload is picked in priority order (a `json`-tagged fence,
//! then any fence, then the whole text) and decoded exactly once.

use regex::Regex;
use std::fmt;

use crate::models::CandidateRecord;

const TAGGED_FENCE: &str = r"(?s)```[ \t]*(?i:json)\b\s*(.*?)\s*```";
const ANY_FENCE: &str = r"(?s)```\s*(.*?)\s*```";

/// Where the decoded payload was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    TaggedFence,
    UntaggedFence,
    RawText,
}

impl fmt::Display for PayloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PayloadSource::TaggedFence => "json code block",
            PayloadSource::UntaggedFence => "code block",
            PayloadSource::RawText => "raw text",
        };
        write!(f, "{}", label)
    }
}

/// Result of one parse attempt. `Decoded` with an empty list is a real
/// "no matches" answer; `Unparseable` means nothing could be decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Decoded {
        source: PayloadSource,
        candidates: Vec<CandidateRecord>,
    },
    Unparseable {
        source: PayloadSource,
        reason: String,
    },
}

impl ParseOutcome {
    pub fn source(&self) -> PayloadSource {
        match self {
            ParseOutcome::Decoded { source, .. } | ParseOutcome::Unparseable { source, .. } => {
                *source
            }
        }
    }

    /// Collapses both outcomes into a plain list; unparseable becomes empty.
    pub fn into_candidates(self) -> Vec<CandidateRecord> {
        match self {
            ParseOutcome::Decoded { candidates, .. } => candidates,
            ParseOutcome::Unparseable { .. } => Vec::new(),
        }
    }
}

fn first_capture<'a>(text: &'a str, pattern: &str) -> Option<&'a str> {
    let re = Regex::new(pattern).ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Picks the text that should hold the JSON array.
pub fn locate_payload(raw: &str) -> (PayloadSource, &str) {
    if let Some(inner) = first_capture(raw, TAGGED_FENCE) {
        return (PayloadSource::TaggedFence, inner);
    }
    if let Some(inner) = first_capture(raw, ANY_FENCE) {
        return (PayloadSource::UntaggedFence, inner);
    }
    (PayloadSource::RawText, raw.trim())
}

pub fn parse_outcome(raw: &str) -> ParseOutcome {
    let (source, payload) = locate_payload(raw);

    match serde_json::from_str::<Vec<CandidateRecord>>(payload) {
        Ok(candidates) => {
            tracing::debug!(%source, count = candidates.len(), "decoded supervisor list");
            ParseOutcome::Decoded { source, candidates }
        }
        Err(e) => {
            tracing::warn!(%source, error = %e, "could not decode supervisor list");
            ParseOutcome::Unparseable {
                source,
                reason: e.to_string(),
            }
        }
    }
}

/// Never fails: an undecodable answer yields an empty list.
pub fn parse(raw: &str) -> Vec<CandidateRecord> {
    parse_outcome(raw).into_candidates()
}
