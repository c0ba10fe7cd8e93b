//! HTTP implementation of [`ModelCapability`].
//!
//! Posts an OpenAI-compatible chat request and returns the message content.
//! Endpoints that answer with a bare body are supported too: when the body is
//! not a chat completion it is returned unchanged.

use std::{env, time::Duration};

use log::{debug, trace};
use serde::Serialize;
use ureq::Agent;

use super::{ModelCapability, ModelError, ModelRequest, ModelTier};
use crate::config::ExtractorConfig;

/// Retry hint used when a 429 response carries none we can read
const DEFAULT_RETRY_AFTER_MS: u64 = 1_000;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

/// Model capability reached over HTTP
pub struct HttpModelCapability {
    agent: Agent,
    endpoint: String,
    api_key: Option<String>,
    light_model: String,
    heavy_model: String,
}

impl HttpModelCapability {
    /// Build the capability from the extractor configuration.
    ///
    /// The API key is read from the environment variable named by
    /// `api_key_env`; a missing key is allowed for local endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotConfigured`] when no endpoint is set.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ModelError> {
        let endpoint = config
            .endpoint
            .clone()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .ok_or_else(|| ModelError::NotConfigured("no endpoint configured".to_string()))?;

        let api_key = env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            debug!(variable = config.api_key_env.as_str(); "No API key in environment");
        }

        // Calls override this with their own timeout.
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_millis(config.timeout_ms)))
            .build();

        Ok(Self {
            agent: Agent::new_with_config(agent_config),
            endpoint,
            api_key,
            light_model: config.light_model.clone(),
            heavy_model: config.heavy_model.clone(),
        })
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Light => &self.light_model,
            ModelTier::Heavy => &self.heavy_model,
        }
    }
}

impl ModelCapability for HttpModelCapability {
    fn name(&self) -> &str {
        "http"
    }

    fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let body = ChatRequest {
            model: self.model_for(request.tier),
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.context,
                },
            ],
            temperature: 0.0,
        };
        let payload = serde_json::to_string(&body)
            .map_err(|err| ModelError::RequestFailed(format!("cannot encode request: {err}")))?;

        debug!(
            endpoint = self.endpoint.as_str(),
            model = body.model,
            timeout_ms = request.timeout_ms;
            "Sending model request",
        );

        let mut call = self
            .agent
            .post(&self.endpoint)
            .config()
            .timeout_global(Some(request_timeout(request)))
            .build()
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            call = call.header("Authorization", &format!("Bearer {key}"));
        }

        let mut response = call
            .send(payload.as_str())
            .map_err(|err| map_transport_error(err, request.timeout_ms))?;
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|err| map_transport_error(err, request.timeout_ms))?;

        trace!(body = text.as_str(); "Model response body");
        Ok(message_content(text))
    }
}

/// Deadline for the whole HTTP exchange of one call
fn request_timeout(request: &ModelRequest) -> Duration {
    Duration::from_millis(request.timeout_ms.max(1))
}

fn map_transport_error(err: ureq::Error, timeout_ms: u64) -> ModelError {
    match err {
        ureq::Error::StatusCode(429) => ModelError::RateLimited {
            retry_after_ms: DEFAULT_RETRY_AFTER_MS,
        },
        ureq::Error::StatusCode(code) => ModelError::RequestFailed(format!("HTTP status {code}")),
        ureq::Error::Timeout(_) => ModelError::Timeout(timeout_ms),
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            ModelError::Timeout(timeout_ms)
        }
        other => ModelError::RequestFailed(other.to_string()),
    }
}

/// Content of the first chat choice, or the body itself
fn message_content(body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/choices/0/message/content")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use std::{net::TcpListener, time::Instant};

    use super::*;

    fn request(timeout_ms: u64) -> ModelRequest {
        ModelRequest {
            prompt: "Return JSON.".to_string(),
            context: "First, collect data.".to_string(),
            timeout_ms,
            tier: ModelTier::Light,
        }
    }

    #[test]
    fn test_message_content_unwraps_chat_completion() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"type\":\"flow\"}"}}]}"#;
        assert_eq!(message_content(body.to_string()), r#"{"type":"flow"}"#);
    }

    #[test]
    fn test_message_content_passes_other_bodies_through() {
        let body = r#"{"type":"tree","nodes":[]}"#;
        assert_eq!(message_content(body.to_string()), body);
        assert_eq!(message_content("plain text".to_string()), "plain text");
    }

    #[test]
    fn test_missing_endpoint_is_not_configured() {
        let config = ExtractorConfig::default();
        assert!(matches!(
            HttpModelCapability::from_config(&config),
            Err(ModelError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_model_per_tier() {
        let config = ExtractorConfig {
            endpoint: Some("http://localhost:9/v1/chat/completions".to_string()),
            light_model: "small".to_string(),
            heavy_model: "large".to_string(),
            ..Default::default()
        };
        let capability = HttpModelCapability::from_config(&config).expect("endpoint set");
        assert_eq!(capability.model_for(ModelTier::Light), "small");
        assert_eq!(capability.model_for(ModelTier::Heavy), "large");
    }

    #[test]
    fn test_call_timeout_overrides_configured_timeout() {
        // Accepts connections but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let address = listener.local_addr().expect("address");
        let config = ExtractorConfig {
            endpoint: Some(format!("http://{address}/v1/chat/completions")),
            timeout_ms: 30_000,
            ..Default::default()
        };
        let capability = HttpModelCapability::from_config(&config).expect("endpoint set");

        let started = Instant::now();
        let result = capability.complete(&request(200));

        assert_eq!(result, Err(ModelError::Timeout(200)));
        assert!(started.elapsed() < Duration::from_secs(10));
        drop(listener);
    }

    #[test]
    fn test_request_timeout_is_never_zero() {
        assert_eq!(request_timeout(&request(0)), Duration::from_millis(1));
        assert_eq!(request_timeout(&request(750)), Duration::from_millis(750));
    }
}
