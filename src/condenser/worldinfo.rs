use crate::condenser::config::WorldInfoConfig;
use crate::condenser::scheduler::MemorySink;
use crate::error::CondenserError;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 45;

/// HTTP client for the host's world-info store. Writes are
/// read-modify-append: a retried write can duplicate a paragraph but
/// never loses prior content.
pub struct WorldInfoClient {
    base_url: String,
    api_key: String,
    book_name: String,
    client: Client,
}

impl WorldInfoClient {
    pub fn new(config: &WorldInfoConfig) -> Result<Self, CondenserError> {
        if config.endpoint.trim().is_empty() || config.book_name.trim().is_empty() {
            return Err(CondenserError::Configuration(
                "world info endpoint and book name are required".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| CondenserError::Network(err.to_string()))?;
        Ok(Self {
            base_url: config.endpoint.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            book_name: config.book_name.clone(),
            client,
        })
    }

    fn get_json(&self, url: &str) -> Result<Option<Value>, CondenserError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|err| CondenserError::Persistence(err.to_string()))?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CondenserError::Persistence(format!(
                "world info GET {url} failed with status {}",
                response.status()
            )));
        }
        let json = response
            .json()
            .map_err(|err| CondenserError::Persistence(err.to_string()))?;
        Ok(Some(json))
    }

    fn post_json(&self, url: &str, payload: &Value) -> Result<Value, CondenserError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .map_err(|err| CondenserError::Persistence(err.to_string()))?;
        if !response.status().is_success() {
            return Err(CondenserError::Persistence(format!(
                "world info POST {url} failed with status {}",
                response.status()
            )));
        }
        response
            .json()
            .map_err(|err| CondenserError::Persistence(err.to_string()))
    }

    fn ensure_book(&self) -> Result<(), CondenserError> {
        let url = format!("{}/books/{}", self.base_url, self.book_name);
        if self.get_json(&url)?.is_some() {
            return Ok(());
        }
        let create_url = format!("{}/books", self.base_url);
        self.post_json(&create_url, &serde_json::json!({ "name": self.book_name }))?;
        Ok(())
    }

    /// Find the entry with the given name, or create it empty. Returns
    /// the entry's current content.
    fn find_or_create_entry(&self, entry_key: &str) -> Result<String, CondenserError> {
        let url = format!(
            "{}/books/{}/entries/{}",
            self.base_url,
            self.book_name,
            urlencode(entry_key)
        );
        if let Some(entry) = self.get_json(&url)? {
            let content = entry
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Ok(content.to_string());
        }

        let create_url = format!("{}/books/{}/entries", self.base_url, self.book_name);
        self.post_json(
            &create_url,
            &serde_json::json!({ "name": entry_key, "content": "" }),
        )?;
        Ok(String::new())
    }

    fn write_entry(&self, entry_key: &str, content: &str) -> Result<(), CondenserError> {
        let url = format!(
            "{}/books/{}/entries/{}",
            self.base_url,
            self.book_name,
            urlencode(entry_key)
        );
        self.post_json(
            &url,
            &serde_json::json!({ "name": entry_key, "content": content }),
        )?;
        Ok(())
    }

    /// Bind the book to a chat so the host injects its entries into
    /// future prompts.
    pub fn bind_to_chat(&self, chat_id: &str) -> Result<(), CondenserError> {
        let url = format!("{}/books/{}/bindings", self.base_url, self.book_name);
        self.post_json(&url, &serde_json::json!({ "chat_id": chat_id }))?;
        Ok(())
    }
}

impl MemorySink for WorldInfoClient {
    fn append(&self, entry_key: &str, text: &str) -> Result<(), CondenserError> {
        self.ensure_book()?;
        let existing = self.find_or_create_entry(entry_key)?;
        let merged = if existing.trim().is_empty() {
            text.to_string()
        } else {
            format!("{existing}\n\n{text}")
        };
        self.write_entry(entry_key, &merged)
    }
}

fn urlencode(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_requires_endpoint_and_book() {
        let config = WorldInfoConfig::default();
        assert!(matches!(
            WorldInfoClient::new(&config),
            Err(CondenserError::Configuration(_))
        ));
    }
}
