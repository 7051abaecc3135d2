//! Optional analyst narrative attached to dossiers.
//!
//! Generation is best effort: [`NarrativeWriter`] always yields text, substituting a readable
//! placeholder when no generator is configured or every attempt failed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::risk::AggregationResult;

const TIMEOUT: Duration = Duration::from_secs(30);
pub const FALLBACK_MODELS: [&str; 2] = ["gemini-2.0-flash", "gemini-1.5-flash"];

/// External text-generation collaborator.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, NarrativeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("model {model} returned status {status}: {detail}")]
    Upstream {
        model: String,
        status: u16,
        detail: String,
    },
    #[error("model {model} returned an empty response")]
    EmptyResponse { model: String },
    #[error("model {model} returned an unreadable payload: {detail}")]
    Decode { model: String, detail: String },
    #[error("text generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("no text generation model configured")]
    NoModels,
}

/// Fixed analyst prompt embedding the identifier, name, status, risk, and sanctions count.
pub fn build_prompt(result: &AggregationResult) -> String {
    let status = match result.registration_status() {
        "" => "N/A",
        status => status,
    };

    format!(
        "You are a compliance analyst. Write a short, objective analysis (4-6 lines).\n\
         Document: {document} ({kind})\n\
         Entity: {name}\n\
         Registration status: {status}\n\
         Computed risk level: {risk}\n\
         Sanctions found: {sanctions}\n\
         Finish with a simple recommendation (Approve / Review / Reject) based on the data.\n",
        document = result.document,
        kind = result.kind,
        name = result.entity_name(),
        risk = result.risk_level(),
        sanctions = result.sanctions_total(),
    )
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini `generateContent` client trying the configured model first, then the fallbacks.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    models: Vec<String>,
}

impl GeminiClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let preferred = model.into();
        let mut models = vec![preferred.clone()];
        models.extend(
            FALLBACK_MODELS
                .iter()
                .filter(|fallback| **fallback != preferred)
                .map(|fallback| fallback.to_string()),
        );

        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            models,
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    async fn generate_with(&self, model: &str, prompt: &str) -> Result<String, NarrativeError> {
        let url = format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Upstream {
                model: model.to_string(),
                status: status.as_u16(),
                detail,
            });
        }

        let payload = response
            .json::<GenerateResponse>()
            .await
            .map_err(|err| NarrativeError::Decode {
                model: model.to_string(),
                detail: err.to_string(),
            })?;

        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(NarrativeError::EmptyResponse {
                model: model.to_string(),
            });
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl NarrativeGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, NarrativeError> {
        let mut last_error = NarrativeError::NoModels;
        for model in &self.models {
            match self.generate_with(model, prompt).await {
                Ok(text) => {
                    debug!(model = %model, "narrative generated");
                    return Ok(text);
                }
                Err(err) => {
                    warn!(model = %model, error = %err, "narrative model failed; trying next");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

/// Wraps an optional generator so callers always receive text.
#[derive(Clone, Default)]
pub struct NarrativeWriter {
    generator: Option<Arc<dyn NarrativeGenerator>>,
}

impl NarrativeWriter {
    pub fn new(generator: Arc<dyn NarrativeGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn write(&self, result: &AggregationResult) -> String {
        let Some(generator) = &self.generator else {
            return "Narrative unavailable: set NARRATIVE_API_KEY to enable analysis.".to_string();
        };

        match generator.generate(&build_prompt(result)).await {
            Ok(text) => {
                info!(document = %result.document, "narrative attached");
                text
            }
            Err(err) => {
                warn!(document = %result.document, error = %err, "narrative generation failed");
                format!("Narrative generation failed: {err}")
            }
        }
    }
}
