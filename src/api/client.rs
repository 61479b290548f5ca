use crate::condenser::config::ApiConfig;
use crate::condenser::scheduler::CompletionApi;
use crate::error::CondenserError;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

/// Normalize a user-supplied base URL into a chat-completions URL.
/// Accepts a bare host, a `/v1` base, or the full completions path.
pub fn completions_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        return base.to_string();
    }
    if base.ends_with("/v1") {
        return format!("{base}/chat/completions");
    }
    format!("{base}/v1/chat/completions")
}

/// Models URL derived from the same base the completions URL uses.
pub fn models_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.ends_with("/models") {
        return base.to_string();
    }
    if base.contains("/chat/completions") {
        return base.replace("/chat/completions", "/models");
    }
    if base.ends_with("/v1") {
        return format!("{base}/models");
    }
    format!("{base}/v1/models")
}

fn extract_completion_text(json: &Value) -> Option<String> {
    let choices = json.get("choices").and_then(Value::as_array)?;
    let first = choices.first()?;
    let content = first.get("message")?.get("content")?;
    match content {
        Value::String(s) => Some(s.to_string()),
        Value::Array(parts) => {
            let mut chunks = Vec::new();
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    chunks.push(text.to_string());
                }
            }
            if chunks.is_empty() {
                None
            } else {
                Some(chunks.join("\n"))
            }
        }
        _ => None,
    }
}

/// Accept either a `data` or `models` array; entries are string ids or
/// objects carrying `id`/`name`.
fn extract_model_ids(json: &Value) -> Vec<String> {
    let items = json
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| json.get("models").and_then(Value::as_array));
    let Some(items) = items else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for item in items {
        let id = match item {
            Value::String(s) => Some(s.clone()),
            _ => item
                .get("id")
                .and_then(Value::as_str)
                .or_else(|| item.get("name").and_then(Value::as_str))
                .map(str::to_string),
        };
        if let Some(id) = id {
            if !id.trim().is_empty() {
                out.push(id);
            }
        }
    }
    out
}

/// Blocking client for an OpenAI-compatible completions endpoint.
pub struct CompletionClient {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    client: Client,
}

impl CompletionClient {
    /// Build a client, rejecting incomplete configuration before any
    /// network call is attempted.
    pub fn new(config: &ApiConfig) -> Result<Self, CondenserError> {
        if config.endpoint.trim().is_empty()
            || config.api_key.trim().is_empty()
            || config.model.trim().is_empty()
        {
            return Err(CondenserError::Configuration(
                "api endpoint, key, and model are all required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| CondenserError::Network(err.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn post_completion(&self, payload: &Value) -> Result<Value, CondenserError> {
        let url = completions_url(&self.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .map_err(|err| CondenserError::Network(err.to_string()))?;
        if !response.status().is_success() {
            return Err(CondenserError::Network(format!(
                "completion call failed with status {}",
                response.status()
            )));
        }
        response
            .json()
            .map_err(|err| CondenserError::Network(err.to_string()))
    }

    pub fn list_models(&self) -> Result<Vec<String>, CondenserError> {
        let url = models_url(&self.endpoint);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|err| CondenserError::Network(err.to_string()))?;
        if !response.status().is_success() {
            return Err(CondenserError::Network(format!(
                "models call failed with status {}",
                response.status()
            )));
        }
        let json: Value = response
            .json()
            .map_err(|err| CondenserError::Network(err.to_string()))?;
        Ok(extract_model_ids(&json))
    }

    /// Minimal 1-message completion used to verify endpoint, key, and
    /// model without spending real tokens.
    pub fn test_connection(&self) -> Result<(), CondenserError> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 5
        });
        let json = self.post_completion(&payload)?;
        if json.get("choices").and_then(Value::as_array).is_some() {
            Ok(())
        } else {
            Err(CondenserError::Network(
                "response has no choices array".to_string(),
            ))
        }
    }
}

impl CompletionApi for CompletionClient {
    fn complete(&self, prompt: &str) -> Result<String, CondenserError> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });
        let json = self.post_completion(&payload)?;
        extract_completion_text(&json)
            .ok_or_else(|| CondenserError::Network("response missing message content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_handles_all_base_shapes() {
        assert_eq!(
            completions_url("https://api.example.com"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://api.example.com/v1/"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://api.example.com/v1/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn models_url_mirrors_completions_base() {
        assert_eq!(
            models_url("https://api.example.com"),
            "https://api.example.com/v1/models"
        );
        assert_eq!(
            models_url("https://api.example.com/v1"),
            "https://api.example.com/v1/models"
        );
        assert_eq!(
            models_url("https://api.example.com/v1/chat/completions"),
            "https://api.example.com/v1/models"
        );
        assert_eq!(
            models_url("https://api.example.com/v1/models"),
            "https://api.example.com/v1/models"
        );
    }

    #[test]
    fn completion_text_handles_string_and_parts() {
        let json: Value = serde_json::json!({
            "choices": [{"message": {"content": "hello"}}]
        });
        assert_eq!(extract_completion_text(&json).unwrap(), "hello");

        let json: Value = serde_json::json!({
            "choices": [{"message": {"content": [{"text": "a"}, {"text": "b"}]}}]
        });
        assert_eq!(extract_completion_text(&json).unwrap(), "a\nb");

        let json: Value = serde_json::json!({"choices": []});
        assert!(extract_completion_text(&json).is_none());
    }

    #[test]
    fn model_ids_accept_data_or_models_arrays() {
        let json: Value = serde_json::json!({
            "data": [{"id": "m1"}, {"name": "m2"}, "m3"]
        });
        assert_eq!(extract_model_ids(&json), vec!["m1", "m2", "m3"]);

        let json: Value = serde_json::json!({"models": ["a", {"id": "b"}]});
        assert_eq!(extract_model_ids(&json), vec!["a", "b"]);

        let json: Value = serde_json::json!({"unexpected": true});
        assert!(extract_model_ids(&json).is_empty());
    }

    #[test]
    fn client_rejects_incomplete_config() {
        let config = ApiConfig::default();
        assert!(matches!(
            CompletionClient::new(&config),
            Err(CondenserError::Configuration(_))
        ));
    }
}
