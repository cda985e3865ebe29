//! Small helpers for logging, file system checks, URL resolution and
//! year-month ranges.

use chrono::{Datelike, Months, NaiveDate};
use std::error::Error as StdError;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

use crate::error::{Error, Result};

/// Truncate a string for logging purposes.
///
/// Long strings are cut after `max` characters and get an ellipsis plus a
/// count of the omitted bytes. Cuts always fall on a character boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("日本語です", 2), "日本…(+9 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> std::result::Result<(), Box<dyn StdError>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Directory is writable");
    Ok(())
}

/// Reads a cached page. Cache files are UTF-8; stray invalid bytes are
/// replaced rather than failing the record.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read.
pub async fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).await.map_err(|e| Error::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Resolve `href` against `base`, the way a browser would.
///
/// # Errors
///
/// Returns [`Error::Url`] if `base` is not an absolute URL or the join fails.
pub fn resolve_uri(base: &str, href: &str) -> Result<String> {
    let url_error = |source| Error::Url {
        url: base.to_string(),
        source,
    };
    let base = Url::parse(base).map_err(url_error)?;
    let joined = base.join(href).map_err(url_error)?;
    Ok(joined.to_string())
}

/// Last path segment of `uri` up to its first dot (`.../20240401-1.html` →
/// `20240401-1`).
pub fn uri_stem(uri: &str) -> &str {
    let name = uri.rsplit('/').next().unwrap_or(uri);
    name.split('.').next().unwrap_or(name)
}

fn parse_yearmonth(yearmonth: u32) -> Result<NaiveDate> {
    let (year, month) = (yearmonth / 100, yearmonth % 100);
    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, 1))
        .ok_or_else(|| Error::InvalidRange(format!("{yearmonth} is not a YYYYMM value")))
}

/// Every `YYYYMM` from `from` to `to`, inclusive, rolling over year ends.
///
/// # Errors
///
/// Returns [`Error::InvalidRange`] if either bound is not a valid `YYYYMM`
/// or `from` is after `to`.
pub fn yearmonths(from: u32, to: u32) -> Result<Vec<u32>> {
    let start = parse_yearmonth(from)?;
    let end = parse_yearmonth(to)?;
    if start > end {
        return Err(Error::InvalidRange(format!("{from} is after {to}")));
    }

    let mut months = Vec::new();
    let mut current = start;
    while current <= end {
        let year = u32::try_from(current.year()).unwrap_or_default();
        months.push(year * 100 + current.month());
        current = match current.checked_add_months(Months::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(months)
}
