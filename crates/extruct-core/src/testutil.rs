//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::error::AppError;
use crate::models::{FetchResponse, MetadataOptions};
use crate::traits::{Extractor, Fetcher};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    responses: Arc<Mutex<Vec<Result<FetchResponse, AppError>>>>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    /// Responds once with the given status and body.
    pub fn new(status: u16, reason: &str, body: &str) -> Self {
        Self::with_responses(vec![Ok(FetchResponse {
            status,
            reason: reason.to_string(),
            final_url: String::new(),
            content_type: Some("text/html".to_string()),
            body: body.as_bytes().to_vec(),
        })])
    }

    /// Responds with 200 OK, recording `final_url` as the post-redirect URL.
    pub fn redirected(final_url: &str, body: &str) -> Self {
        Self::with_responses(vec![Ok(FetchResponse {
            status: 200,
            reason: "OK".to_string(),
            final_url: final_url.to_string(),
            content_type: Some("text/html".to_string()),
            body: body.as_bytes().to_vec(),
        })])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<FetchResponse, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(FetchResponse {
                status: 200,
                reason: "OK".to_string(),
                final_url: url.to_string(),
                content_type: Some("text/html".to_string()),
                body: b"<html><body>default</body></html>".to_vec(),
            })
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// One recorded call to [`MockExtractor::extract`].
#[derive(Debug, Clone)]
pub struct ExtractCall {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub base_url: String,
    pub options: MetadataOptions,
}

/// Mock extractor that returns configurable JSON and records its inputs.
#[derive(Clone)]
pub struct MockExtractor {
    responses: Arc<Mutex<Vec<Result<Map<String, Value>, AppError>>>>,
    pub calls: Arc<Mutex<Vec<ExtractCall>>>,
}

impl MockExtractor {
    /// Returns `data`, which must be a JSON object.
    pub fn new(data: Value) -> Self {
        let map = match data {
            Value::Object(map) => map,
            other => panic!("MockExtractor expects a JSON object, got {other}"),
        };
        Self::with_responses(vec![Ok(map)])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<Map<String, Value>, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Extractor for MockExtractor {
    fn extract(
        &self,
        body: &[u8],
        content_type: Option<&str>,
        base_url: &str,
        options: &MetadataOptions,
    ) -> Result<Map<String, Value>, AppError> {
        self.calls.lock().unwrap().push(ExtractCall {
            body: body.to_vec(),
            content_type: content_type.map(str::to_string),
            base_url: base_url.to_string(),
            options: options.clone(),
        });
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(Map::new())
        } else {
            responses.remove(0)
        }
    }
}
