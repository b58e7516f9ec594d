use crate::models::{RankCeiling, SearchCriteria};

pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

const SCHOLARSHIP_CLAUSE: &str = "Prioritize supervisors with explicitly advertised scholarships or fully funded PhD positions, \
and set scholarshipAvailable to true only when funding is explicitly mentioned.";

/// Field list the collaborator must fill for every supervisor. Keys match
/// the serde names on `CandidateRecord`.
const RECORD_SCHEMA: &str = "\
The JSON object for each supervisor must have these fields:\n\
- name: Full name of the professor.\n\
- title: (Optional) Academic title, e.g. \"Associate Professor\", \"Chair\".\n\
- university: Name of the university.\n\
- department: Specific department or lab.\n\
- country: Country of the university.\n\
- universityRank: (Optional) Latest QS World University Ranking, e.g. \"QS #42\".\n\
- researchKeywords: An array of 3-4 specific research keywords.\n\
- matchReason: A brief 1-sentence explanation of why they are a good match.\n\
- website: (Optional) Link to their lab or profile page if found.\n\
- fundingEstimate: (Optional) Short label for the lab's funding situation, e.g. \"Well funded (ERC grant)\".\n\
- scholarshipAvailable: (Optional) true if a scholarship or funded position is explicitly mentioned, otherwise false.\n\
- hookPaperTitle: (Optional) Title of one recent (2024-2025) paper relevant to the topic.\n\
- hookPaperUrl: (Optional) Link to that paper.\n\
- hiringStatus: One of \"Hiring\", \"Likely Hiring\", \"Not Hiring\", \"Unknown\".\n\
- intakeTerm: (Optional) Next intake the position targets, e.g. \"Fall 2026\".\n";

const OUTPUT_RULES: &str = "\
Provide the output strictly as a JSON array of objects inside a markdown code block (```json ... ```).\n\
Do not include any text outside the JSON block.";

/// Instruction sent to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPayload {
    pub prompt: String,
    pub web_search: bool,
    pub max_output_tokens: u32,
}

/// Turns search criteria into collaborator instructions. Pure: no I/O.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    max_output_tokens: u32,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_TOKENS)
    }
}

impl QueryBuilder {
    pub fn new(max_output_tokens: u32) -> Self {
        Self { max_output_tokens }
    }

    /// Primary supervisor search. Callers validate the criteria first; a
    /// blank topic never reaches this point.
    pub fn search(&self, criteria: &SearchCriteria) -> QueryPayload {
        let mut constraints = String::new();
        if let RankCeiling::Top(n) = criteria.max_rank {
            constraints.push_str(&format!(
                "- Institution rank: only include universities ranked within the top {} of the QS World University Rankings.\n",
                n
            ));
        }
        if criteria.require_scholarship {
            constraints.push_str(&format!("- Funding: {}\n", SCHOLARSHIP_CLAUSE));
        }

        let background = if criteria.background.trim().is_empty() {
            "Not specified"
        } else {
            criteria.background.trim()
        };

        let prompt = format!(
            "Act as an expert academic consultant for PhD applicants.\n\
            Task: Find roughly 20 currently active PhD supervisors/professors who are a great match for the following student profile:\n\
            - Research Interest: \"{topic}\"\n\
            - Target Countries/Region: \"{countries}\"\n\
            - Student Background: \"{background}\"\n\
            {constraints}\n\
            Instructions:\n\
            1. Use Google Search to find REAL, currently active professors. Aim for a comprehensive list of 20 candidates.\n\
            2. Verify they are still at the listed university.\n\
            3. Look for recent publications (2024-2025) relevant to the topic and pick one as the hook paper.\n\
            4. Check lab pages and news for open PhD positions to judge the hiring status and intake term.\n\
            5. {output_rules}\n\n\
            {schema}",
            topic = criteria.topic.trim(),
            countries = criteria.countries.trim(),
            background = background,
            constraints = constraints,
            output_rules = OUTPUT_RULES,
            schema = RECORD_SCHEMA,
        );

        tracing::debug!(prompt_len = prompt.len(), "built supervisor search query");
        self.payload(prompt)
    }

    /// Co-author and peer expansion seeded from one supervisor.
    pub fn network(&self, seed_name: &str, seed_institution: &str, topic: &str) -> QueryPayload {
        let topic = if topic.trim().is_empty() {
            "their main research area"
        } else {
            topic.trim()
        };

        let prompt = format!(
            "Act as an expert academic consultant for PhD applicants.\n\
            Task: Find roughly 10-15 currently active professors who frequently co-author with, \
            collaborate with, or work in the same research network as {seed_name} ({seed_institution}).\n\
            - Research Interest: \"{topic}\"\n\n\
            Instructions:\n\
            1. Use Google Search to find REAL co-authors, former students now in faculty positions, and frequent collaborators.\n\
            2. Do not include {seed_name} in the list.\n\
            3. Verify each professor is still at the listed university.\n\
            4. In matchReason, describe the connection to {seed_name} and the relevance to the research interest.\n\
            5. {output_rules}\n\n\
            {schema}",
            seed_name = seed_name.trim(),
            seed_institution = seed_institution.trim(),
            topic = topic,
            output_rules = OUTPUT_RULES,
            schema = RECORD_SCHEMA,
        );

        tracing::debug!(prompt_len = prompt.len(), seed = seed_name, "built network query");
        self.payload(prompt)
    }

    fn payload(&self, prompt: String) -> QueryPayload {
        QueryPayload {
            prompt,
            web_search: true,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> SearchCriteria {
        SearchCriteria::new("graph neural networks")
            .unwrap()
            .with_countries("Canada")
            .with_max_rank(RankCeiling::Top(100))
            .with_scholarship(true)
    }

    #[test]
    fn test_search_query_includes_all_requested_clauses() {
        let payload = QueryBuilder::default().search(&criteria());

        assert!(payload.prompt.contains("graph neural networks"));
        assert!(payload.prompt.contains("\"Canada\""));
        assert!(payload.prompt.contains("within the top 100"));
        assert!(payload.prompt.contains(SCHOLARSHIP_CLAUSE));
        assert!(payload.web_search);
        assert_eq!(payload.max_output_tokens, DEFAULT_MAX_OUTPUT_TOKENS);
    }

    #[test]
    fn test_search_query_omits_optional_clauses() {
        let criteria = SearchCriteria::new("protein folding").unwrap();
        let payload = QueryBuilder::default().search(&criteria);

        assert!(!payload.prompt.contains("Institution rank"));
        assert!(!payload.prompt.contains(SCHOLARSHIP_CLAUSE));
        assert!(payload.prompt.contains("\"Global\""));
        assert!(payload.prompt.contains("Student Background: \"Not specified\""));
    }

    #[test]
    fn test_search_query_carries_background() {
        let criteria = SearchCriteria::new("protein folding")
            .unwrap()
            .with_background("MSc CS, 3.8 GPA");
        let payload = QueryBuilder::default().search(&criteria);
        assert!(payload.prompt.contains("MSc CS, 3.8 GPA"));
    }

    #[test]
    fn test_queries_always_demand_structured_output() {
        let builder = QueryBuilder::new(2048);
        let search = builder.search(&criteria());
        let network = builder.network("A. Lee", "UBC", "graph neural networks");

        for payload in [&search, &network] {
            assert!(payload.prompt.contains("```json"));
            for key in [
                "name:",
                "title:",
                "university:",
                "department:",
                "country:",
                "universityRank:",
                "researchKeywords:",
                "matchReason:",
                "website:",
                "fundingEstimate:",
                "scholarshipAvailable:",
                "hookPaperTitle:",
                "hookPaperUrl:",
                "hiringStatus:",
                "intakeTerm:",
            ] {
                assert!(payload.prompt.contains(key), "missing {}", key);
            }
            assert_eq!(payload.max_output_tokens, 2048);
        }
    }

    #[test]
    fn test_network_query_names_seed() {
        let payload = QueryBuilder::default().network("A. Lee", "UBC", "graph neural networks");
        assert!(payload.prompt.contains("A. Lee (UBC)"));
        assert!(payload.prompt.contains("graph neural networks"));
        assert!(payload.web_search);
    }

    #[test]
    fn test_network_query_without_topic() {
        let payload = QueryBuilder::default().network("A. Lee", "UBC", "  ");
        assert!(payload.prompt.contains("their main research area"));
    }
}
