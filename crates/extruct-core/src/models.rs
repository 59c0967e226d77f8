use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Default vocabulary used to interpret untyped property names.
pub const DEFAULT_SCHEMA_CONTEXT: &str = "http://schema.org";

/// A structured-metadata encoding that can be extracted from HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Syntax {
    Microdata,
    Opengraph,
    Microformat,
    JsonLd,
    Rdfa,
}

impl Syntax {
    /// Every supported syntax, in extraction order. This is the default
    /// selection when the caller does not narrow it down.
    pub const ALL: [Syntax; 5] = [
        Syntax::Microdata,
        Syntax::Opengraph,
        Syntax::Microformat,
        Syntax::JsonLd,
        Syntax::Rdfa,
    ];

    /// Canonical name, also used as the key in the result record.
    pub fn as_str(&self) -> &'static str {
        match self {
            Syntax::Microdata => "microdata",
            Syntax::Opengraph => "opengraph",
            Syntax::Microformat => "microformat",
            Syntax::JsonLd => "json-ld",
            Syntax::Rdfa => "rdfa",
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Syntax {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Syntax::ALL
            .into_iter()
            .find(|syntax| syntax.as_str() == s)
            .ok_or_else(|| format!("unknown syntax '{s}'"))
    }
}

/// How the extractor reacts when a single syntax fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Abort the whole extraction with the first failure.
    #[default]
    Strict,
    /// Log the failure and leave that syntax out of the result.
    Log,
    /// Leave the failing syntax out of the result silently.
    Ignore,
}

impl ErrorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorMode::Strict => "strict",
            ErrorMode::Log => "log",
            ErrorMode::Ignore => "ignore",
        }
    }
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(ErrorMode::Strict),
            "log" => Ok(ErrorMode::Log),
            "ignore" => Ok(ErrorMode::Ignore),
            other => Err(format!("unknown error mode '{other}'")),
        }
    }
}

/// Options for a single metadata request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataOptions {
    /// Syntaxes to extract.
    pub syntaxes: Vec<Syntax>,
    /// Reshape every item into `@context` / `@type` / flattened properties.
    pub uniform: bool,
    /// Vocabulary namespace URI (e.g. `http://schema.org`).
    pub schema_context: String,
    /// Failure policy for individual syntaxes.
    pub errors: ErrorMode,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            syntaxes: Syntax::ALL.to_vec(),
            uniform: false,
            schema_context: DEFAULT_SCHEMA_CONTEXT.to_string(),
            errors: ErrorMode::default(),
        }
    }
}

impl MetadataOptions {
    pub fn wants(&self, syntax: Syntax) -> bool {
        self.syntaxes.contains(&syntax)
    }
}

/// Raw outcome of an HTTP GET, whatever its status.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`; empty when the code has none.
    pub reason: String,
    /// URL of the final response, after any redirects.
    pub final_url: String,
    /// `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
    /// Undecoded response body; the extractor sniffs its encoding.
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human-readable status, e.g. `"404 Not Found"`.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.reason)
        }
    }
}

/// Result of one metadata request.
///
/// `extracted` is only ever populated for a successful fetch, so a record
/// for a failed request carries exactly `url` and `status`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    pub url: String,
    pub status: String,
    pub extracted: Option<Map<String, Value>>,
}

impl MetadataRecord {
    pub fn failed(url: &str, status: String) -> Self {
        Self {
            url: url.to_string(),
            status,
            extracted: None,
        }
    }

    pub fn succeeded(url: &str, status: String, extracted: Map<String, Value>) -> Self {
        Self {
            url: url.to_string(),
            status,
            extracted: Some(extracted),
        }
    }

    /// Flatten into a single JSON object. `url` and `status` take precedence
    /// over extractor keys of the same name.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.extracted.clone().unwrap_or_default();
        map.insert("url".to_string(), Value::String(self.url.clone()));
        map.insert("status".to_string(), Value::String(self.status.clone()));
        map
    }
}

impl Serialize for MetadataRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_syntax_names_round_trip() {
        for syntax in Syntax::ALL {
            assert_eq!(syntax.as_str().parse::<Syntax>().unwrap(), syntax);
        }
        assert_eq!(Syntax::JsonLd.to_string(), "json-ld");
        assert!("jsonld".parse::<Syntax>().is_err());
    }

    #[test]
    fn test_error_mode_parse() {
        assert_eq!("log".parse::<ErrorMode>().unwrap(), ErrorMode::Log);
        assert_eq!("ignore".parse::<ErrorMode>().unwrap(), ErrorMode::Ignore);
        assert!("bogus".parse::<ErrorMode>().is_err());
    }

    #[test]
    fn test_default_options() {
        let opts = MetadataOptions::default();
        assert_eq!(opts.syntaxes, Syntax::ALL.to_vec());
        assert!(!opts.uniform);
        assert_eq!(opts.schema_context, "http://schema.org");
        assert_eq!(opts.errors, ErrorMode::Strict);
        assert!(opts.wants(Syntax::Rdfa));
    }

    #[test]
    fn test_status_line() {
        let mut resp = FetchResponse {
            status: 404,
            reason: "Not Found".into(),
            final_url: "https://example.com/".into(),
            content_type: None,
            body: Vec::new(),
        };
        assert_eq!(resp.status_line(), "404 Not Found");
        assert!(!resp.is_success());

        resp.status = 599;
        resp.reason.clear();
        assert_eq!(resp.status_line(), "599");
    }

    #[test]
    fn test_success_range() {
        let resp = |status| FetchResponse {
            status,
            reason: String::new(),
            final_url: String::new(),
            content_type: None,
            body: Vec::new(),
        };
        assert!(resp(200).is_success());
        assert!(resp(204).is_success());
        assert!(!resp(199).is_success());
        assert!(!resp(301).is_success());
        assert!(!resp(500).is_success());
    }

    #[test]
    fn test_failed_record_has_only_url_and_status() {
        let record = MetadataRecord::failed("https://example.com", "404 Not Found".into());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"url": "https://example.com", "status": "404 Not Found"})
        );
    }

    #[test]
    fn test_record_fields_win_over_extracted_keys() {
        let mut extracted = Map::new();
        extracted.insert("url".into(), json!("https://elsewhere.example"));
        extracted.insert("json-ld".into(), json!([]));
        let record = MetadataRecord::succeeded("https://example.com", "200 OK".into(), extracted);

        let map = record.to_map();
        assert_eq!(map["url"], "https://example.com");
        assert_eq!(map["json-ld"], json!([]));
        assert_eq!(map.len(), 3);
    }
}
