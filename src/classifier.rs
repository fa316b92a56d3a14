//! LLM classifier client.
//!
//! Defines the [`ClassifierClient`] seam the worker depends on, plus the
//! production [`GroqClient`] implementation that calls Groq's
//! OpenAI-compatible chat-completions API in JSON mode.
//!
//! Failures are classified into [`ClassifierError`] variants so the worker
//! can attach a backoff policy to each kind instead of matching on message
//! substrings. A rate limit (HTTP 429) is distinguished from other API
//! errors; malformed response bodies are their own kind.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::ClassifierConfig;
use crate::models::Classification;

const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Closed set of classifier failure kinds.
#[derive(Debug)]
pub enum ClassifierError {
    /// HTTP 429 — back off long, the batch stays queued.
    RateLimited,
    /// Non-retryable or unexpected API status.
    Api(String),
    /// Network-level failure (connect, timeout).
    Http(String),
    /// Body was not the requested structure.
    MalformedResponse(String),
}

impl std::fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierError::RateLimited => write!(f, "classifier rate limited"),
            ClassifierError::Api(e) => write!(f, "classifier API error: {}", e),
            ClassifierError::Http(e) => write!(f, "classifier request failed: {}", e),
            ClassifierError::MalformedResponse(e) => {
                write!(f, "malformed classifier response: {}", e)
            }
        }
    }
}

impl std::error::Error for ClassifierError {}

/// Request/response classification capability: given N codes, return a
/// mapping code → brand/type metadata, possibly failing with a
/// distinguishable rate-limit signal.
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    /// Model identifier, recorded as classification provenance.
    fn agent(&self) -> &str;

    /// Classify a batch of codes in one request. The response may cover only
    /// a subset of the requested codes; entries with missing required fields
    /// are dropped during parsing.
    async fn classify(&self, codes: &[String]) -> Result<Vec<Classification>, ClassifierError>;
}

/// Classifier backed by the Groq chat-completions API.
///
/// Requires the `GROQ_API_KEY` environment variable. The request pins
/// `response_format: json_object` and a system prompt that fixes the output
/// shape, so parsing can be strict about the envelope while staying lenient
/// about individual entries.
pub struct GroqClient {
    client: reqwest::Client,
    model: String,
    agent: String,
    api_key: String,
}

impl GroqClient {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("classifier.model required for Groq provider"))?;

        let api_key = match std::env::var("GROQ_API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => bail!("GROQ_API_KEY environment variable not set"),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let agent = format!("groq/{}", model);
        Ok(Self {
            client,
            model,
            agent,
            api_key,
        })
    }
}

const SYSTEM_PROMPT: &str = "You are a classifier of industrial filter part numbers. \
Input: a list of part-number codes. \
Output: a JSON object of this exact shape: \
{\"results\": [{\"input\": \"P550440\", \"brand\": \"DONALDSON\", \"type\": \"OIL\", \"application\": \"HEAVY DUTY\"}]}. \
Rules: every result must echo one input code exactly as given; \"brand\" is the \
manufacturer the code belongs to; \"type\" is the filter type (OIL, FUEL, AIR, \
HYDRAULIC, COOLANT, CABIN); \"application\" is optional. Omit a code entirely if \
you cannot identify it.";

#[async_trait]
impl ClassifierClient for GroqClient {
    fn agent(&self) -> &str {
        &self.agent
    }

    async fn classify(&self, codes: &[String]) -> Result<Vec<Classification>, ClassifierError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": format!("Classify these codes: {}", codes.join(", ")) }
            ],
            "temperature": 0,
            "response_format": { "type": "json_object" }
        });

        let response = self
            .client
            .post(GROQ_ENDPOINT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::Http(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ClassifierError::RateLimited);
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(format!("{}: {}", status, body_text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

        let content = json
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                ClassifierError::MalformedResponse("missing choices[0].message.content".to_string())
            })?;

        parse_classifications(content)
    }
}

/// Parse the model's JSON payload into classification entries.
///
/// The envelope (`{"results": [...]}`) must be present; individual entries
/// missing `input`, `brand`, or `type` are skipped rather than failing the
/// batch — their codes simply stay queued for a later cycle.
pub fn parse_classifications(content: &str) -> Result<Vec<Classification>, ClassifierError> {
    let payload: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

    let results = payload
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| ClassifierError::MalformedResponse("missing results array".to_string()))?;

    let mut parsed = Vec::with_capacity(results.len());
    for entry in results {
        let input = entry.get("input").and_then(|v| v.as_str());
        let brand = entry.get("brand").and_then(|v| v.as_str());
        let category = entry.get("type").and_then(|v| v.as_str());

        let (Some(input), Some(brand), Some(category)) = (input, brand, category) else {
            eprintln!("Warning: skipping classifier entry with missing fields: {}", entry);
            continue;
        };
        if input.is_empty() || brand.is_empty() || category.is_empty() {
            continue;
        }

        let application = entry
            .get("application")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        parsed.push(Classification {
            input: input.to_string(),
            brand: brand.to_string(),
            category: category.to_string(),
            application,
        });
    }

    Ok(parsed)
}
