//! OpenAI Chat Completions client.
use async_trait::async_trait;
use log::*;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    advisor::{ChatCompletion, MAX_TOKENS, SYSTEM_PROMPT, TEMPERATURE},
    error::{DepsaurusError, Result},
    registry::USER_AGENT,
};

pub const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const MODEL_ID: &str = "gpt-4-turbo";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

pub struct OpenAi {
    client: Client,
    api_key: SecretString,
}

impl OpenAi {
    pub fn new(api_key: SecretString, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, api_key })
    }
}

/// System message first, then the prompt.
fn request_body(prompt: &str) -> CompletionRequest<'_> {
    CompletionRequest {
        model: MODEL_ID,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

fn response_text(response: CompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            DepsaurusError::NetworkError(
                "OpenAI response had no message content".into(),
            )
        })
}

#[async_trait]
impl ChatCompletion for OpenAi {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!("sending {} byte prompt to {MODEL_ID}", prompt.len());

        let request = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request_body(prompt))
            .build()?;
        let response = self.client.execute(request).await?;
        let result = response.error_for_status()?;
        let body: CompletionResponse = result.json().await?;

        response_text(body)
    }
}
