//! Gemini `generateContent` gateway.
//!
//! One non-streaming POST per generation call. Request building is pure so
//! the wire shape is testable without the network.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use couch_core::errors::GatewayError;
use couch_core::turns::Turn;

use crate::gateway::ModelGateway;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GoogleGateway {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GoogleGateway {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API endpoint (integration tests against a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ModelGateway for GoogleGateway {
    fn name(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model, prior_turns = prior_turns.len()))]
    async fn generate(
        &self,
        system_instruction: &str,
        prior_turns: &[Turn],
        final_user_text: &str,
    ) -> Result<String, GatewayError> {
        let request = build_request(system_instruction, prior_turns, final_user_text);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let text = extract_text(&body)?;
        debug!(chars = text.len(), "generation complete");
        Ok(text)
    }
}

/// Build the `generateContent` request body. The prior turns become the
/// `contents` list in exact order, the final user text its last entry.
pub fn build_request(
    system_instruction: &str,
    prior_turns: &[Turn],
    final_user_text: &str,
) -> GenerateRequest {
    let mut contents: Vec<Content> = prior_turns
        .iter()
        .map(|turn| Content {
            role: turn.tag.wire_name().to_string(),
            parts: vec![Part {
                text: turn.text.clone(),
            }],
        })
        .collect();

    contents.push(Content {
        role: "user".to_string(),
        parts: vec![Part {
            text: final_user_text.to_string(),
        }],
    });

    GenerateRequest {
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: system_instruction.to_string(),
            }],
        },
        contents,
    }
}

fn extract_text(response: &GenerateResponse) -> Result<String, GatewayError> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| GatewayError::MalformedResponse("no candidates in response".into()))?;

    let text: String = candidate
        .content
        .parts
        .iter()
        .map(|part| part.text.as_str())
        .collect();

    if text.is_empty() {
        return Err(GatewayError::MalformedResponse(
            "candidate contained no text parts".into(),
        ));
    }
    Ok(text)
}

// --- Wire types ---

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    #[serde(rename = "system_instruction")]
    pub system_instruction: SystemInstruction,
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}
