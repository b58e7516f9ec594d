use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::query::QueryPayload;

// --- Collaborator trait ---

/// A hosted model that answers an instruction, optionally grounded with
/// live web search.
pub trait Collaborator {
    fn generate(&self, payload: &QueryPayload) -> Result<CollaboratorResponse>;
    fn model_name(&self) -> &str;
}

/// A web source as reported by the provider. Either part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRef {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollaboratorResponse {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Anthropic,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    match name {
        // Gemini with Google Search grounding (requires GEMINI_API_KEY)
        "gemini-flash" | "flash" => Ok(ModelSpec {
            provider: ProviderKind::Gemini,
            model_id: "gemini-3-flash-preview".to_string(),
            short_name: "gemini-flash".to_string(),
        }),
        "gemini-pro" | "pro" => Ok(ModelSpec {
            provider: ProviderKind::Gemini,
            model_id: "gemini-2.5-pro".to_string(),
            short_name: "gemini-pro".to_string(),
        }),
        // Anthropic with the web search server tool (requires ANTHROPIC_API_KEY)
        "claude-sonnet" | "sonnet" => Ok(ModelSpec {
            provider: ProviderKind::Anthropic,
            model_id: "claude-sonnet-4-5-20250929".to_string(),
            short_name: "claude-sonnet".to_string(),
        }),
        "claude-haiku" | "haiku" => Ok(ModelSpec {
            provider: ProviderKind::Anthropic,
            model_id: "claude-haiku-4-5-20251001".to_string(),
            short_name: "claude-haiku".to_string(),
        }),
        _ => Err(anyhow!(
            "Unknown model '{}'. Available: gemini-flash (default), gemini-pro, claude-sonnet, claude-haiku",
            name
        )),
    }
}

pub fn create_provider(spec: &ModelSpec, timeout: Duration) -> Result<Box<dyn Collaborator>> {
    match spec.provider {
        ProviderKind::Gemini => {
            let provider = GeminiProvider::new(spec.model_id.clone(), timeout)?;
            Ok(Box::new(provider))
        }
        ProviderKind::Anthropic => {
            let provider = AnthropicProvider::new(spec.model_id.clone(), timeout)?;
            Ok(Box::new(provider))
        }
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

// --- Gemini provider ---

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    google_search: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiWebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiGroundingChunk {
    #[serde(default)]
    web: Option<GeminiWebChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    fn into_collaborator_response(self) -> Result<CollaboratorResponse> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No candidates in Gemini API response"))?;

        let text = candidate
            .content
            .unwrap_or_default()
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        let sources = candidate
            .grounding_metadata
            .unwrap_or_default()
            .grounding_chunks
            .into_iter()
            .filter_map(|chunk| chunk.web)
            .map(|web| SourceRef {
                uri: web.uri,
                title: web.title,
            })
            .collect();

        Ok(CollaboratorResponse { text, sources })
    }
}

#[derive(Debug)]
pub struct GeminiProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl GeminiProvider {
    pub fn new(model_id: String, timeout: Duration) -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .context("GEMINI_API_KEY environment variable not set. Set it with: export GEMINI_API_KEY=your-key-here")?;
        let client = http_client(timeout)?;
        Ok(Self { api_key, model_id, client })
    }
}

impl Collaborator for GeminiProvider {
    fn generate(&self, payload: &QueryPayload) -> Result<CollaboratorResponse> {
        // No JSON response mode here: it switches off the search tool, so
        // the answer comes back as markdown and is parsed afterwards.
        let tools = if payload.web_search {
            vec![GeminiTool {
                google_search: serde_json::json!({}),
            }]
        } else {
            Vec::new()
        };

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: payload.prompt.clone(),
                }],
            }],
            tools,
            generation_config: GeminiGenerationConfig {
                max_output_tokens: payload.max_output_tokens,
            },
        };

        let url = format!("{}/models/{}:generateContent", GEMINI_API_BASE, self.model_id);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: GeminiResponse = response
            .json()
            .context("Failed to parse Gemini API response")?;

        api_response.into_collaborator_response()
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_WEB_SEARCH_MAX_USES: u32 = 5;

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    #[serde(rename = "type")]
    tool_type: String,
    name: String,
    max_uses: u32,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
}

#[derive(Debug, Deserialize)]
struct AnthropicCitation {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
        #[serde(default)]
        citations: Option<Vec<AnthropicCitation>>,
    },
    // server_tool_use, web_search_tool_result, ...
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

impl AnthropicResponse {
    fn into_collaborator_response(self) -> Result<CollaboratorResponse> {
        let mut text = String::new();
        let mut sources: Vec<SourceRef> = Vec::new();
        let mut saw_text = false;

        for block in self.content {
            if let AnthropicContentBlock::Text { text: chunk, citations } = block {
                saw_text = true;
                text.push_str(&chunk);
                for citation in citations.unwrap_or_default() {
                    let duplicate = citation.url.is_some()
                        && sources.iter().any(|s| s.uri == citation.url);
                    if !duplicate {
                        sources.push(SourceRef {
                            uri: citation.url,
                            title: citation.title,
                        });
                    }
                }
            }
        }

        if !saw_text {
            return Err(anyhow!("No text content in Anthropic API response"));
        }

        Ok(CollaboratorResponse { text, sources })
    }
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(model_id: String, timeout: Duration) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set. Set it with: export ANTHROPIC_API_KEY=your-key-here")?;
        let client = http_client(timeout)?;
        Ok(Self { api_key, model_id, client })
    }
}

impl Collaborator for AnthropicProvider {
    fn generate(&self, payload: &QueryPayload) -> Result<CollaboratorResponse> {
        let tools = if payload.web_search {
            vec![AnthropicTool {
                tool_type: "web_search_20250305".to_string(),
                name: "web_search".to_string(),
                max_uses: ANTHROPIC_WEB_SEARCH_MAX_USES,
            }]
        } else {
            Vec::new()
        };

        let request = AnthropicRequest {
            model: self.model_id.clone(),
            max_tokens: payload.max_output_tokens,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: payload.prompt.clone(),
            }],
            tools,
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Anthropic API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: AnthropicResponse = response
            .json()
            .context("Failed to parse Anthropic API response")?;

        api_response.into_collaborator_response()
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
