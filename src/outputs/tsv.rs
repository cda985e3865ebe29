//! The TSV index connecting cached HTML files to their source URIs.
//!
//! Columns are positional: `doc_id, ja_filename, en_filename, ja_uri, en_uri`.
//! Header spelling has varied between sites over time, so the header row is
//! skipped rather than interpreted.

use crate::error::{Error, Result};
use crate::models::MetadataRow;
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::path::Path;
use tracing::{debug, info};

pub const HEADER: [&str; 5] = ["doc_id", "ja_filename", "en_filename", "ja_uri", "en_uri"];

/// Reads every well-formed row. Rows with fewer than five columns are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn read_metadata(path: &Path) -> Result<Vec<MetadataRow>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() < HEADER.len() {
            debug!(line = line + 2, "Skipping short TSV row");
            continue;
        }
        let field = |i: usize| record[i].trim().to_string();
        rows.push(MetadataRow {
            doc_id: field(0),
            ja_file: field(1),
            en_file: field(2),
            ja_uri: field(3),
            en_uri: field(4),
        });
    }
    info!(path = %path.display(), rows = rows.len(), "Read metadata");
    Ok(rows)
}

/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_metadata(path: &Path, rows: &[MetadataRow]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .from_path(path)?;

    writer.write_record(HEADER)?;
    for row in rows {
        writer.write_record([
            &row.doc_id,
            &row.ja_file,
            &row.en_file,
            &row.ja_uri,
            &row.en_uri,
        ])?;
    }
    writer.flush().map_err(|e| Error::io(path, e))?;
    info!(path = %path.display(), rows = rows.len(), "Wrote metadata");
    Ok(())
}
