use thiserror::Error;

use crate::ai::{Collaborator, CollaboratorResponse};
use crate::models::{Citation, CriteriaError, ResultBundle, SearchCriteria};
use crate::parser::{self, ParseOutcome};
use crate::query::{QueryBuilder, QueryPayload};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Rejected before any call was made.
    #[error("invalid search request: {0}")]
    InvalidCriteria(String),

    /// The collaborator call failed; no partial result exists.
    #[error("request to {model} failed")]
    RequestFailed {
        model: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<CriteriaError> for GatewayError {
    fn from(err: CriteriaError) -> Self {
        GatewayError::InvalidCriteria(err.to_string())
    }
}

/// Runs searches against an injected collaborator. One call per search,
/// no caching, no retries.
pub struct SearchGateway<'a> {
    collaborator: &'a dyn Collaborator,
    queries: QueryBuilder,
}

impl<'a> SearchGateway<'a> {
    pub fn new(collaborator: &'a dyn Collaborator, queries: QueryBuilder) -> Self {
        Self {
            collaborator,
            queries,
        }
    }

    pub fn search(&self, criteria: &SearchCriteria) -> Result<ResultBundle, GatewayError> {
        criteria.validate()?;
        let payload = self.queries.search(criteria);
        tracing::info!(
            model = self.collaborator.model_name(),
            topic = %criteria.topic.trim(),
            "searching for supervisors"
        );
        self.run(&payload)
    }

    pub fn search_network(
        &self,
        seed_name: &str,
        seed_institution: &str,
        topic: &str,
    ) -> Result<ResultBundle, GatewayError> {
        if seed_name.trim().is_empty() {
            return Err(GatewayError::InvalidCriteria(
                "seed supervisor name must not be empty".to_string(),
            ));
        }
        if seed_institution.trim().is_empty() {
            return Err(GatewayError::InvalidCriteria(
                "seed supervisor institution must not be empty".to_string(),
            ));
        }

        let payload = self.queries.network(seed_name, seed_institution, topic);
        tracing::info!(
            model = self.collaborator.model_name(),
            seed = seed_name,
            "searching supervisor network"
        );
        self.run(&payload)
    }

    fn run(&self, payload: &QueryPayload) -> Result<ResultBundle, GatewayError> {
        let response = self
            .collaborator
            .generate(payload)
            .map_err(|source| GatewayError::RequestFailed {
                model: self.collaborator.model_name().to_string(),
                source,
            })?;

        Ok(bundle_from_response(response))
    }
}

/// Parses the answer text and keeps only citations with both URI and title.
pub fn bundle_from_response(response: CollaboratorResponse) -> ResultBundle {
    let outcome = parser::parse_outcome(&response.text);
    if let ParseOutcome::Unparseable { source, reason } = &outcome {
        tracing::warn!(%source, %reason, "collaborator answer held no usable supervisor list");
    }

    let citations: Vec<Citation> = response
        .sources
        .iter()
        .filter_map(|s| Citation::from_parts(s.uri.as_deref(), s.title.as_deref()))
        .collect();

    let source = outcome.source();
    let candidates = outcome.into_candidates();
    tracing::debug!(
        %source,
        candidates = candidates.len(),
        citations = citations.len(),
        "built result bundle"
    );
    ResultBundle::new(candidates, citations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::SourceRef;
    use crate::models::RankCeiling;
    use anyhow::anyhow;
    use std::cell::RefCell;

    struct FakeCollaborator {
        reply: Option<CollaboratorResponse>,
        seen: RefCell<Vec<QueryPayload>>,
    }

    impl FakeCollaborator {
        fn answering(text: &str, sources: Vec<SourceRef>) -> Self {
            Self {
                reply: Some(CollaboratorResponse {
                    text: text.to_string(),
                    sources,
                }),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Collaborator for FakeCollaborator {
        fn generate(&self, payload: &QueryPayload) -> anyhow::Result<CollaboratorResponse> {
            self.seen.borrow_mut().push(payload.clone());
            self.reply
                .clone()
                .ok_or_else(|| anyhow!("quota exceeded"))
        }

        fn model_name(&self) -> &str {
            "fake-model"
        }
    }

    const LEE_RESPONSE: &str = "```json\n[{\"name\":\"A. Lee\",\"university\":\"UBC\",\"department\":\"CS\",\"researchKeywords\":[\"GNN\"],\"matchReason\":\"fit\"}]\n```";

    fn source(uri: Option<&str>, title: Option<&str>) -> SourceRef {
        SourceRef {
            uri: uri.map(String::from),
            title: title.map(String::from),
        }
    }

    #[test]
    fn test_search_end_to_end() {
        let fake = FakeCollaborator::answering(LEE_RESPONSE, Vec::new());
        let gateway = SearchGateway::new(&fake, QueryBuilder::default());
        let criteria = SearchCriteria::new("graph neural networks")
            .unwrap()
            .with_countries("Canada")
            .with_max_rank(RankCeiling::Top(100))
            .with_scholarship(true);

        let bundle = gateway.search(&criteria).unwrap();
        assert_eq!(bundle.candidates.len(), 1);
        assert_eq!(bundle.candidates[0].name, "A. Lee");

        let seen = fake.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].prompt.contains("graph neural networks"));
        assert!(seen[0].prompt.contains("top 100"));
        assert!(seen[0].web_search);
    }

    #[test]
    fn test_search_keeps_only_complete_citations() {
        let fake = FakeCollaborator::answering(
            LEE_RESPONSE,
            vec![
                source(Some("https://ubc.ca/lee"), Some("Lee Lab")),
                source(Some("https://nowhere.org"), None),
                source(None, Some("Orphan title")),
                source(Some("https://cs.ubc.ca"), Some("UBC CS")),
            ],
        );
        let gateway = SearchGateway::new(&fake, QueryBuilder::default());
        let bundle = gateway
            .search(&SearchCriteria::new("graphs").unwrap())
            .unwrap();

        let titles: Vec<_> = bundle.citations.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Lee Lab", "UBC CS"]);
    }

    #[test]
    fn test_unparseable_answer_is_empty_bundle_not_error() {
        let fake = FakeCollaborator::answering(
            "Sorry, I could not find anyone.",
            vec![source(Some("https://a.edu"), Some("A"))],
        );
        let gateway = SearchGateway::new(&fake, QueryBuilder::default());
        let bundle = gateway
            .search(&SearchCriteria::new("graphs").unwrap())
            .unwrap();

        assert!(bundle.is_empty());
        assert_eq!(bundle.citations.len(), 1);
    }

    #[test]
    fn test_request_failure_is_signalled() {
        let fake = FakeCollaborator::failing();
        let gateway = SearchGateway::new(&fake, QueryBuilder::default());

        let err = gateway
            .search(&SearchCriteria::new("graphs").unwrap())
            .unwrap_err();
        match err {
            GatewayError::RequestFailed { model, source } => {
                assert_eq!(model, "fake-model");
                assert!(source.to_string().contains("quota"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_topic_never_reaches_collaborator() {
        let fake = FakeCollaborator::answering(LEE_RESPONSE, Vec::new());
        let gateway = SearchGateway::new(&fake, QueryBuilder::default());
        let mut criteria = SearchCriteria::new("graphs").unwrap();
        criteria.topic = "   ".to_string();

        let err = gateway.search(&criteria).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCriteria(_)));
        assert!(fake.seen.borrow().is_empty());
    }

    #[test]
    fn test_search_network_uses_seed() {
        let fake = FakeCollaborator::answering(LEE_RESPONSE, Vec::new());
        let gateway = SearchGateway::new(&fake, QueryBuilder::default());

        let bundle = gateway
            .search_network("B. Chen", "MIT", "graph neural networks")
            .unwrap();
        assert_eq!(bundle.candidates.len(), 1);

        let seen = fake.seen.borrow();
        assert!(seen[0].prompt.contains("B. Chen (MIT)"));
    }

    #[test]
    fn test_search_network_rejects_blank_seed() {
        let fake = FakeCollaborator::answering(LEE_RESPONSE, Vec::new());
        let gateway = SearchGateway::new(&fake, QueryBuilder::default());

        assert!(matches!(
            gateway.search_network(" ", "MIT", "graphs"),
            Err(GatewayError::InvalidCriteria(_))
        ));
        assert!(matches!(
            gateway.search_network("B. Chen", "", "graphs"),
            Err(GatewayError::InvalidCriteria(_))
        ));
        assert!(fake.seen.borrow().is_empty());
    }
}
