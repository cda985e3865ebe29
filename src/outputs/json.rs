//! JSON output of accepted document pairs.
//!
//! The file is a single array, pretty-printed with one tab per indent level.
//! Japanese text is written as-is rather than `\u` escaped.

use crate::error::{Error, Result};
use crate::models::DocumentPairRecord;
use serde::Serialize;
use serde_json::Serializer;
use serde_json::ser::PrettyFormatter;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serializes `value` as tab-indented JSON.
pub fn to_tab_indented<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Write all accepted records to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns an error if serialization fails or the file cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_records(records: &[DocumentPairRecord], path: &Path) -> Result<()> {
    let json = to_tab_indented(records)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, json).await.map_err(|e| Error::io(path, e))?;
    info!("Wrote JSON output");
    Ok(())
}
