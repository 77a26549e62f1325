use crate::config::{SummarizerOptions, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS};
use crate::message::MessageHeader;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// What the digest reports when the day had no mail. Distinct from a
/// failure: an empty day is a valid answer.
pub const NO_MESSAGES_TEXT: &str = "No emails were found for the requested date.";

/// The inference endpoint is an opaque text-completion service; anything
/// that turns a day's headers into prose can stand in for it.
pub trait Summarizer {
    fn summarize(&self, headers: &[MessageHeader]) -> Result<String>;
}

#[derive(Serialize, Debug)]
struct InferenceRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct InferenceResponse {
    output: InferenceOutput,
}

#[derive(Deserialize, Debug)]
struct InferenceOutput {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    text: String,
}

/// Blocking client for a bearer-token text-completion endpoint. The API key
/// lives in the options handed to the constructor; there is no process-wide
/// key anywhere.
pub struct InferenceClient {
    http: reqwest::blocking::Client,
    opts: SummarizerOptions,
}

impl InferenceClient {
    pub fn new(opts: SummarizerOptions) -> Result<InferenceClient> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(
                opts.timeout_secs
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()?;
        Ok(InferenceClient { http, opts })
    }
}

pub fn build_prompt(headers: &[MessageHeader]) -> String {
    let blocks: Vec<String> = headers
        .iter()
        .map(|h| h.prompt_block())
        .collect();
    format!(
        "Concisely summarize the following emails:\n\n{}",
        blocks.join("\n")
    )
}

impl Summarizer for InferenceClient {
    fn summarize(&self, headers: &[MessageHeader]) -> Result<String> {
        if headers.is_empty() {
            return Ok(NO_MESSAGES_TEXT.to_string());
        }

        let request = InferenceRequest {
            model: &self.opts.model,
            prompt: build_prompt(headers),
            max_tokens: self
                .opts
                .max_tokens
                .unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self
                .opts
                .temperature
                .unwrap_or(DEFAULT_TEMPERATURE),
        };
        debug!("summarizing {} headers with {}", headers.len(), request.model);

        let response = self
            .http
            .post(&self.opts.endpoint)
            .bearer_auth(&self.opts.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!(
                "inference endpoint returned {} - {}",
                status.as_u16(),
                body
            ));
        }

        let parsed: InferenceResponse = response.json()?;
        let choice = parsed
            .output
            .choices
            .first()
            .ok_or_else(|| anyhow!("inference response contained no choices"))?;

        Ok(choice
            .text
            .trim()
            .to_string())
    }
}
