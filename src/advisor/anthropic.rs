//! Anthropic Messages API client.
use async_trait::async_trait;
use log::*;
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    advisor::{ChatCompletion, MAX_TOKENS, SYSTEM_PROMPT, TEMPERATURE},
    error::{DepsaurusError, Result},
    registry::USER_AGENT,
};

pub const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL_ID: &str = "claude-3-opus-20240229";

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

pub struct Anthropic {
    client: Client,
}

impl Anthropic {
    pub fn new(api_key: SecretString, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.expose_secret())?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }
}

fn request_body(prompt: &str) -> MessagesRequest<'_> {
    MessagesRequest {
        model: MODEL_ID,
        system: SYSTEM_PROMPT,
        messages: vec![Message {
            role: "user",
            content: prompt,
        }],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    }
}

fn response_text(response: MessagesResponse) -> Result<String> {
    response
        .content
        .into_iter()
        .find_map(|block| block.text)
        .ok_or_else(|| {
            DepsaurusError::NetworkError(
                "Anthropic response had no text content".into(),
            )
        })
}

#[async_trait]
impl ChatCompletion for Anthropic {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!("sending {} byte prompt to {MODEL_ID}", prompt.len());

        let request = self
            .client
            .post(MESSAGES_URL)
            .json(&request_body(prompt))
            .build()?;
        let response = self.client.execute(request).await?;
        let result = response.error_for_status()?;
        let body: MessagesResponse = result.json().await?;

        response_text(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_system_prompt_and_limits() {
        let body = serde_json::to_value(request_body("hello")).unwrap();
        assert_eq!(body["model"], MODEL_ID);
        assert_eq!(body["system"], SYSTEM_PROMPT);
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn extracts_first_text_block() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"id":"msg_1","content":[{"type":"text","text":"Upgrade now."}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(response).unwrap(), "Upgrade now.");

        let empty: MessagesResponse =
            serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(response_text(empty).is_err());
    }

    #[test]
    fn rejects_key_with_invalid_header_characters() {
        let result = Anthropic::new(
            SecretString::from("bad\nkey".to_string()),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(DepsaurusError::AuthenticationError(_))));
    }
}
