//! Common types and utilities for the Cascade control-plane API

use serde::Deserialize;

/// Error envelope returned by the control plane for 4xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub errors: Option<Vec<ApiErrorDetails>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetails {
    pub code: Option<String>,
    pub detail: Option<String>,
}

impl ApiErrorDetails {
    pub fn render(self) -> String {
        match (self.code, self.detail) {
            (Some(code), Some(detail)) => format!("{}: {}", code, detail),
            (None, Some(detail)) => detail,
            (Some(code), None) => code,
            (None, None) => "unknown error".to_string(),
        }
    }
}

/// Envelope for list endpoints; `metadata` carries the pagination cursor.
#[derive(Debug, Deserialize)]
pub struct ApiListResponse<T> {
    pub data: Vec<T>,
    pub metadata: Option<ListMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct ListMetadata {
    pub next: Option<String>,
    pub total_size: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}
