use std::future::Future;

use serde_json::{Map, Value};

use crate::error::AppError;
use crate::models::{FetchResponse, MetadataOptions};

/// Fetches a page over HTTP.
///
/// Implementations return the response whatever its status code; only
/// transport-level failures (DNS, connect, timeout) are errors.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchResponse, AppError>> + Send;
}

/// Extracts structured metadata from an HTML document.
pub trait Extractor: Send + Sync + Clone {
    /// Returns one entry per extracted syntax, keyed by the syntax name.
    ///
    /// `body` is the raw document; `content_type` is the response header,
    /// used as a charset hint when decoding it. `base_url` resolves relative
    /// references. `options.errors` decides whether a failing syntax aborts
    /// the call, is logged, or is dropped.
    fn extract(
        &self,
        body: &[u8],
        content_type: Option<&str>,
        base_url: &str,
        options: &MetadataOptions,
    ) -> Result<Map<String, Value>, AppError>;
}
