//! Structured-metadata extraction from HTML.

mod dom;
mod encoding;
mod jsonld;
mod microdata;
mod microformat;
mod opengraph;
mod rdfa;
mod uniform;

use extruct_core::error::AppError;
use extruct_core::models::{ErrorMode, MetadataOptions, Syntax};
use extruct_core::traits::Extractor;
use scraper::Html;
use serde_json::{Map, Value};
use url::Url;

/// Extractor for microdata, OpenGraph, microformats2, JSON-LD and RDFa,
/// built on the `scraper` HTML parser.
///
/// Every requested syntax yields one key holding a list of items (empty
/// when the page has no such markup). A syntax that fails is handled per
/// [`ErrorMode`]: `Strict` aborts, `Log` logs and drops the key, `Ignore`
/// drops the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for HtmlExtractor {
    fn extract(
        &self,
        body: &[u8],
        content_type: Option<&str>,
        base_url: &str,
        options: &MetadataOptions,
    ) -> Result<Map<String, Value>, AppError> {
        let html = encoding::decode(body, content_type);
        let doc = Html::parse_document(&html);
        let base = dom::effective_base(&doc, base_url);
        if base.is_none() {
            tracing::debug!(base_url, "Base URL is not absolute; relative links stay as-is");
        }

        let mut out = Map::new();
        for syntax in Syntax::ALL.into_iter().filter(|s| options.wants(*s)) {
            match extract_syntax(syntax, &doc, base.as_ref(), options) {
                Ok(items) => {
                    tracing::debug!(%syntax, count = items.len(), "Extracted items");
                    out.insert(syntax.as_str().to_string(), Value::Array(items));
                }
                Err(message) => match options.errors {
                    ErrorMode::Strict => {
                        return Err(AppError::ExtractionError {
                            syntax: syntax.to_string(),
                            message,
                        });
                    }
                    ErrorMode::Log => {
                        tracing::error!(%syntax, error = %message, "Failed to extract");
                    }
                    ErrorMode::Ignore => {}
                },
            }
        }

        Ok(out)
    }
}

fn extract_syntax(
    syntax: Syntax,
    doc: &Html,
    base: Option<&Url>,
    options: &MetadataOptions,
) -> Result<Vec<Value>, String> {
    let items = match syntax {
        Syntax::Microdata => microdata::extract(doc, base),
        Syntax::Opengraph => opengraph::extract(doc),
        Syntax::Microformat => microformat::extract(doc, base),
        Syntax::JsonLd => jsonld::extract(doc)?,
        Syntax::Rdfa => rdfa::extract(doc, base),
    };

    if !options.uniform {
        return Ok(items);
    }
    Ok(match syntax {
        Syntax::Microdata => uniform::microdata(items, &options.schema_context),
        Syntax::Opengraph => uniform::opengraph(items),
        Syntax::Microformat => uniform::microformat(items),
        Syntax::JsonLd | Syntax::Rdfa => items,
    })
}
