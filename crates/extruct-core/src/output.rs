use std::io::{self, Write};

use crate::error::AppError;
use crate::models::MetadataRecord;

/// Render a record as pretty JSON: keys sorted at every level, two-space
/// indentation.
pub fn render_json(record: &MetadataRecord) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Write rendered JSON to `out`, followed by a newline.
pub fn emit<W: Write>(json: &str, out: &mut W) -> io::Result<()> {
    writeln!(out, "{json}")?;
    out.flush()
}
