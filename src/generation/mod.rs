//! Answer generation through a hosted generative model
//!
//! The question and the retrieved verses are folded into one prompt and sent
//! to a `:predict` endpoint. Failures are returned to the caller as an
//! `{"error": ...}` payload rather than as an `Err`, and nothing is retried.


use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::retrieval::RetrievedVerse;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_NAME_VAR: &str = "MODEL_NAME";
pub const PROJECT_ID_VAR: &str = "PROJECT_ID";
pub const LOCATION_VAR: &str = "LOCATION";
pub const BASE_URL_VAR: &str = "GENERATION_BASE_URL";

const NO_CONTEXT: &str = "No relevant context found.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{0} environment variable not set.")]
    MissingVariable(&'static str),

    #[error("Invalid generation endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to call Gemini API: {0}")]
    Request(String),

    #[error("Failed to parse Gemini response: {0}")]
    InvalidResponse(String),
}

/// Credentials and endpoint coordinates for the prediction API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub api_key: String,
    pub model_name: String,
    pub project_id: String,
    pub location: String,
    pub base_url: String,
}

impl GenerationConfig {
    /// Read the configuration from process environment variables
    #[inline]
    pub fn from_env() -> Result<Self, GenerationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`; blank values count as unset
    #[inline]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GenerationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(GenerationError::MissingVariable(name))
        };

        let api_key = require(API_KEY_VAR)?;
        let model_name = require(MODEL_NAME_VAR)?;
        let project_id = require(PROJECT_ID_VAR)?;
        let location = require(LOCATION_VAR)?;
        let base_url = lookup(BASE_URL_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", location));

        Ok(Self {
            api_key,
            model_name,
            project_id,
            location,
            base_url,
        })
    }

    /// Full URL of the model's prediction endpoint
    #[inline]
    pub fn predict_url(&self) -> Result<Url, GenerationError> {
        let url = format!(
            "{}/v1/projects/{}/locations/{}/endpoints/{}:predict",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.location,
            self.model_name
        );
        Url::parse(&url).map_err(|e| GenerationError::InvalidUrl(format!("{}: {}", url, e)))
    }
}

/// Outcome of an answer request as it is reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationReply {
    Answer(String),
    Error { error: String },
}

impl GenerationReply {
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl From<GenerationError> for GenerationReply {
    #[inline]
    fn from(err: GenerationError) -> Self {
        Self::Error {
            error: err.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    text: String,
}

/// Render the question and its supporting verses as a single prompt
#[inline]
pub fn build_prompt(question: &str, verses: &[RetrievedVerse]) -> String {
    let context = if verses.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        verses
            .iter()
            .map(|v| match &v.record.meaning {
                Some(meaning) => format!("{} - {}: {}", v.record.book, v.record.verse, meaning),
                None => format!("{} - {}", v.record.book, v.record.verse),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "Answer the question based on the provided context from the holy books:\n\n\
         Question: {}\n\n\
         Context:\n{}\n\n\
         Answer:",
        question, context
    )
}

/// Client for the prediction endpoint
#[derive(Debug, Clone)]
pub struct AnswerGenerator {
    config: Result<GenerationConfig, GenerationError>,
    agent: ureq::Agent,
}

impl AnswerGenerator {
    #[inline]
    pub fn new(config: Result<GenerationConfig, GenerationError>) -> Self {
        match &config {
            Ok(c) => info!("Answer generation enabled with model {}", c.model_name),
            Err(e) => warn!("Answer generation unavailable: {}", e),
        }

        Self {
            config,
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    #[inline]
    pub fn from_env() -> Self {
        Self::new(GenerationConfig::from_env())
    }

    #[inline]
    pub fn is_configured(&self) -> bool {
        self.config.is_ok()
    }

    /// Ask the model; never fails, errors come back as [`GenerationReply::Error`]
    #[inline]
    pub fn generate(&self, question: &str, verses: &[RetrievedVerse]) -> GenerationReply {
        match self.request_answer(question, verses) {
            Ok(text) => GenerationReply::Answer(text),
            Err(e) => {
                error!("Answer generation failed: {}", e);
                e.into()
            }
        }
    }

    fn request_answer(
        &self,
        question: &str,
        verses: &[RetrievedVerse],
    ) -> Result<String, GenerationError> {
        let config = self.config.as_ref().map_err(Clone::clone)?;
        let url = config.predict_url()?;
        let prompt = build_prompt(question, verses);

        let body = json!({
            "instances": [{"prompt": prompt}],
            "parameters": {}
        })
        .to_string();

        debug!(
            "Calling prediction endpoint {} with {} context verses",
            url,
            verses.len()
        );

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", config.api_key))
            .header("Content-Type", "application/json")
            .send(&body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let response: PredictResponse = serde_json::from_str(&response_text)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        response
            .predictions
            .into_iter()
            .next()
            .map(|prediction| prediction.text)
            .ok_or_else(|| GenerationError::InvalidResponse("no predictions returned".to_string()))
    }
}
