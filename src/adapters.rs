//! Reasoning service adapter for OpenAI-compatible chat completion APIs.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use autoflow_config::ReasoningConfig;
use autoflow_protocols::{ReasoningError, ReasoningFallback};

const SYSTEM_PROMPT: &str =
    "You execute workflow steps. Always answer with a single JSON object describing the result.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Asks a chat completion endpoint to perform steps that have no
/// registered executor.
pub(crate) struct HttpReasoning {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl HttpReasoning {
    pub(crate) fn new(config: &ReasoningConfig, api_key: String) -> Result<Self, ReasoningError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ReasoningError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
        })
    }
}

/// Pull the JSON document out of a chat completion response.
fn parse_completion(response: ChatResponse) -> Result<serde_json::Value, ReasoningError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ReasoningError::InvalidResponse("response has no content".to_string()))?;
    serde_json::from_str(&content).map_err(|e| ReasoningError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl ReasoningFallback for HttpReasoning {
    async fn complete(&self, prompt: &str) -> Result<serde_json::Value, ReasoningError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ReasoningError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Request(format!("HTTP {}: {}", status, text)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::InvalidResponse(e.to_string()))?;
        parse_completion(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(content: Option<&str>) -> ChatResponse {
        serde_json::from_value(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_completion() {
        let value = parse_completion(response(Some(r#"{"status":"completed"}"#))).unwrap();
        assert_eq!(value["status"], "completed");
    }

    #[test]
    fn test_parse_completion_rejects_bad_content() {
        assert!(matches!(
            parse_completion(response(None)),
            Err(ReasoningError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_completion(response(Some("not json"))),
            Err(ReasoningError::InvalidResponse(_))
        ));
        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(parse_completion(empty).is_err());
    }

    #[test]
    fn test_endpoint_url() {
        let config = ReasoningConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..ReasoningConfig::default()
        };
        let reasoning = HttpReasoning::new(&config, "key".to_string()).unwrap();
        assert_eq!(reasoning.url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(reasoning.model, "gpt-4o");
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            response_format: ResponseFormat { kind: "json_object" },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "user");
    }
}
