//! `api` sources: one HTTP request, JSON response body.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use super::SourceFetcher;
use crate::api::logs::log_info;
use crate::error::{ConfigError, FetchError, FetchResult};
use crate::models::{SourceDescriptor, SourceType};
use crate::validation::check_source_config;

const CONTEXT: &str = "api source config";

fn default_method() -> String {
    "GET".to_string()
}

/// Connection part of an `api` source config. Shape hints are read separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSourceConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl ApiSourceConfig {
    /// Validate and parse a raw config.
    pub fn from_config(config: &Value) -> Result<Self, ConfigError> {
        check_source_config(SourceType::Api, config)?;
        serde_json::from_value(config.clone()).map_err(|e| ConfigError::invalid(CONTEXT, e.to_string()))
    }

    pub fn parsed_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.url).map_err(|e| ConfigError::invalid(CONTEXT, format!("url '{}': {}", self.url, e)))
    }

    /// The method, upper-cased. Anything that is not an HTTP token is rejected.
    pub fn parsed_method(&self) -> Result<Method, ConfigError> {
        let name = self.method.trim().to_uppercase();
        if name.is_empty() {
            return Err(ConfigError::invalid(CONTEXT, "method must not be empty"));
        }
        Method::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::invalid(CONTEXT, format!("'{}' is not a valid HTTP method", self.method)))
    }

    pub fn header_map(&self) -> Result<HeaderMap, ConfigError> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConfigError::invalid(CONTEXT, format!("header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(&plain_text(value))
                .map_err(|e| ConfigError::invalid(CONTEXT, format!("header '{}': {}", name, e)))?;
            map.insert(header, value);
        }
        Ok(map)
    }

    /// Query pairs. Array values repeat the parameter once per element.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (name, value) in &self.params {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    pairs.extend(items.iter().map(|item| (name.clone(), plain_text(item))));
                }
                other => pairs.push((name.clone(), plain_text(other))),
            }
        }
        pairs
    }
}

/// Strings without their JSON quotes; everything else as JSON text.
fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fetches `api` sources with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Config(ConfigError::invalid("http client", e.to_string())))?;
        Ok(Self { client })
    }

}

/// `err` followed by each of its `source()` causes, joined with `": "`.
/// A cause whose text is already part of the message is skipped.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(e) = cause {
        let text = e.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        cause = e.source();
    }
    message
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Value, FetchError> {
        let config = ApiSourceConfig::from_config(&source.config)?;
        let url = config.parsed_url()?;
        let method = config.parsed_method()?;
        let headers = config.header_map()?;

        log_info(format!("{} {}", method, url));

        let response = self
            .client
            .request(method, url)
            .headers(headers)
            .query(&config.query_pairs())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: config.url.clone(),
                message: error_chain(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: config.url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            url: config.url.clone(),
            message: error_chain(&e),
        })?;

        serde_json::from_slice(&body)
            .map_err(|e| FetchError::Parse(format!("response from {} is not valid JSON: {}", config.url, e)))
    }
}
