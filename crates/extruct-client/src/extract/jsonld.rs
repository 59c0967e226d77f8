//! JSON-LD `<script type="application/ld+json">` blocks.

use scraper::Html;
use serde_json::Value;

use super::dom::elements;

const JSON_LD_TYPE: &str = "application/ld+json";

/// Parse every JSON-LD block in `doc`. Top-level arrays are flattened into
/// the result; any other value, scalars included, becomes one entry. Any
/// block that is not valid JSON, even after cleanup, fails the whole syntax.
pub(crate) fn extract(doc: &Html) -> Result<Vec<Value>, String> {
    let mut items = Vec::new();

    let scripts = elements(doc.root_element()).filter(|e| {
        e.value().name() == "script"
            && e.value()
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case(JSON_LD_TYPE))
    });

    for script in scripts {
        let raw: String = script.text().collect();
        if raw.trim().is_empty() {
            continue;
        }
        match parse_block(&raw)? {
            Value::Array(values) => items.extend(values),
            other => items.push(other),
        }
    }

    Ok(items)
}

fn parse_block(raw: &str) -> Result<Value, String> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(first) => {
            let cleaned = escape_control_chars(&strip_comment_lines(raw));
            serde_json::from_str(&cleaned).map_err(|_| first.to_string())
        }
    }
}

/// Drop lines that are only an HTML or JS comment marker, which some CMSes
/// wrap around JSON-LD.
fn strip_comment_lines(raw: &str) -> String {
    raw.lines()
        .filter(|line| {
            let line = line.trim_start();
            !(line.starts_with("//")
                || line.starts_with("<!--")
                || line.starts_with("-->"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape raw control characters inside string literals, which JSON forbids
/// but browsers tolerate.
fn escape_control_chars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in raw.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if c.is_control() {
                match c {
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    other => out.push_str(&format!("\\u{:04x}", other as u32)),
                }
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }

    out
}
