//! Client for the image generation API.
//!
//! A job talks to the outside world through [`AssetSource`]: one call turns a
//! prompt into a hosted image URL, a second fetches the bytes behind it.
//! [`IdeogramClient`] is the HTTP implementation used by the binary.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::Config;

const ASPECT_RATIO: &str = "16x9";
const STYLE_TYPE: &str = "DESIGN";
const RENDERING_SPEED: &str = "TURBO";
const MAGIC_PROMPT: &str = "OFF";
const NEGATIVE_PROMPT: &str = "text words letters numbers logos writing typography";

/// Longest raw body kept in an error message.
const ERROR_BODY_LIMIT: usize = 400;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("response has no data[0].url")]
    MissingUrl,
}

/// Generation plus download, the two remote steps of a job.
pub trait AssetSource: Sync {
    /// Returns the URL of the generated image.
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    fn download(&self, url: &str) -> Result<Vec<u8>, GenerationError>;
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    pub aspect_ratio: &'static str,
    pub style_type: &'static str,
    pub rendering_speed: &'static str,
    pub magic_prompt: &'static str,
    pub negative_prompt: &'static str,
}

impl<'a> GenerateRequest<'a> {
    pub fn for_prompt(prompt: &'a str) -> Self {
        Self {
            prompt,
            aspect_ratio: ASPECT_RATIO,
            style_type: STYLE_TYPE,
            rendering_speed: RENDERING_SPEED,
            magic_prompt: MAGIC_PROMPT,
            negative_prompt: NEGATIVE_PROMPT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    #[serde(default)]
    url: Option<String>,
}

/// Pulls `data[0].url` out of a generation response body.
pub fn extract_url(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

    parsed
        .data
        .into_iter()
        .next()
        .and_then(|img| img.url)
        .filter(|url| !url.trim().is_empty())
        .ok_or(GenerationError::MissingUrl)
}

/// Prefers `error.message` or `message` from a JSON body, falls back to the
/// raw body cut at [`ERROR_BODY_LIMIT`] bytes.
fn extract_error_message(body_text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }

    let trimmed = body_text.trim();
    if trimmed.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !trimmed.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &trimmed[..cut])
    } else {
        trimmed.to_string()
    }
}

fn api_error(status: StatusCode, body_text: &str) -> GenerationError {
    GenerationError::Api {
        status: status.as_u16(),
        body: extract_error_message(body_text),
    }
}

pub struct IdeogramClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl IdeogramClient {
    pub fn new(cfg: &Config) -> Result<Self, GenerationError> {
        let mut builder = Client::builder();
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self::with_client(builder.build()?, cfg))
    }

    /// Uses an already configured [`Client`] instead of building one.
    pub fn with_client(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            endpoint: cfg.api_url.clone(),
            api_key: cfg.api_key.clone(),
        }
    }
}

impl AssetSource for IdeogramClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Api-Key", &self.api_key)
            .json(&GenerateRequest::for_prompt(prompt))
            .send()?;

        let status = resp.status();
        // Read as text first so a failed parse still has the body for the error.
        let text = resp.text()?;

        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        extract_url(&text)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, GenerationError> {
        let resp = self.client.get(url).send()?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(api_error(status, &text));
        }

        Ok(resp.bytes()?.to_vec())
    }
}
