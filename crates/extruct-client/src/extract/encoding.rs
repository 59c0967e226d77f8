//! Character encoding detection for fetched documents.
//!
//! Precedence: byte order mark, then the `charset` of the `Content-Type`
//! header, then a `<meta>` declaration in the first 1024 bytes, then UTF-8.

use std::borrow::Cow;
use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;

/// How far into the body to look for a `<meta>` charset declaration.
const PRESCAN_BYTES: usize = 1024;

/// `charset=` parameter of a `Content-Type` value.
#[allow(clippy::expect_used)]
static HEADER_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).expect("valid regex")
});

/// `<meta charset="...">`
#[allow(clippy::expect_used)]
static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s/>]+)"#).expect("valid regex")
});

/// `<meta http-equiv="Content-Type" content="...; charset=...">`
#[allow(clippy::expect_used)]
static META_CONTENT_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+http-equiv\s*=\s*["']?content-type["']?[^>]+content\s*=\s*["']?[^"'>]*;\s*charset\s*=\s*([^"'\s>]+)"#)
        .expect("valid regex")
});

/// Decode `body` to text. Malformed sequences become U+FFFD.
pub(crate) fn decode<'a>(body: &'a [u8], content_type: Option<&str>) -> Cow<'a, str> {
    let declared = declared_encoding(body, content_type);
    // `Encoding::decode` lets a byte order mark override `declared`.
    let (text, used, had_errors) = declared.decode(body);
    if had_errors {
        tracing::debug!(
            encoding = used.name(),
            "Document contains bytes invalid for its encoding"
        );
    }
    text
}

/// Encoding from the header or a `<meta>` prescan, ignoring any BOM.
fn declared_encoding(body: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some(encoding) = content_type.and_then(header_charset) {
        return encoding;
    }
    meta_charset(body).unwrap_or(UTF_8)
}

fn header_charset(content_type: &str) -> Option<&'static Encoding> {
    let label = HEADER_CHARSET_RE.captures(content_type)?.get(1)?;
    Encoding::for_label(label.as_str().as_bytes())
}

fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&body[..body.len().min(PRESCAN_BYTES)]);
    let label = META_CHARSET_RE
        .captures(&head)
        .or_else(|| META_CONTENT_TYPE_RE.captures(&head))?
        .get(1)?;
    // An ASCII prescan cannot have found this in a UTF-16 document, so a
    // UTF-16 label here means UTF-8.
    Encoding::for_label(label.as_str().as_bytes()).map(Encoding::output_encoding)
}
