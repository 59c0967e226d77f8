pub mod error;
pub mod metadata;
pub mod models;
pub mod output;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use error::AppError;
pub use metadata::MetadataService;
pub use models::{
    DEFAULT_SCHEMA_CONTEXT, ErrorMode, FetchResponse, MetadataOptions, MetadataRecord, Syntax,
};
pub use output::{emit, render_json};
pub use traits::{Extractor, Fetcher};
