//! The extraction stage: TSV index + HTML cache → aligned JSON records.
//!
//! Pairs are processed strictly one at a time. For each row both pages are
//! read from the cache, segmented independently, checked for alignment, and
//! dated from the Japanese page. Rejected pairs are logged and skipped; only
//! a duplicate identifier aborts the run.

use scraper::Html;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::models::{Document, DocumentPairRecord, Lang, MetadataRow, Site};
use crate::outputs::{json, tsv};
use crate::scrapers::{DatePolicy, SiteScraper};
use crate::utils::{read_text, truncate_for_log};
use crate::validate::{Rejection, validate_pair};

/// `<site>_<first 8 hex digits of SHA-256(en_uri)>`.
pub fn record_id(site: Site, en_uri: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(en_uri.as_bytes()));
    format!("{}_{}", site.tag(), &digest[..8])
}

/// State accumulated over one run.
#[derive(Debug, Default)]
pub struct RunContext {
    seen_en_uris: HashSet<String>,
    ids: HashSet<String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first row for each English URI and drops rows whose two
    /// URIs are identical.
    pub fn dedup_rows(&mut self, rows: Vec<MetadataRow>) -> Vec<MetadataRow> {
        rows.into_iter()
            .filter(|row| {
                if row.en_uri == row.ja_uri {
                    debug!(en_uri = %row.en_uri, "Same URI for both languages; skipping");
                    return false;
                }
                self.seen_en_uris.insert(row.en_uri.clone())
            })
            .collect()
    }

    /// Claims `id` for an accepted record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if `id` was already claimed this run.
    pub fn claim_id(&mut self, id: &str) -> Result<()> {
        if self.ids.insert(id.to_string()) {
            Ok(())
        } else {
            Err(Error::DuplicateId(id.to_string()))
        }
    }
}

/// Extracts, aligns and dates one pair.
pub fn assemble(
    scraper: &dyn SiteScraper,
    en: &Document,
    ja: &Document,
) -> std::result::Result<DocumentPairRecord, Rejection> {
    let en_body = scraper.extract_body(en);
    let ja_body = scraper.extract_body(ja);

    if let Err(rejection) = validate_pair(&en_body, &ja_body) {
        if let Rejection::NewlineMismatch { index, .. } = rejection {
            debug!(
                en = %truncate_for_log(&en_body[index], 80),
                ja = %truncate_for_log(&ja_body[index], 80),
                "Mismatched paragraph"
            );
        }
        return Err(rejection);
    }

    let ja_date = match (scraper.extract_date(&Html::parse_document(&ja.markup)), scraper.date_policy()) {
        (Some(date), _) => date,
        (None, DatePolicy::Optional) => String::new(),
        (None, DatePolicy::Required) => return Err(Rejection::MissingDate),
    };

    Ok(DocumentPairRecord {
        id: record_id(scraper.site(), &en.uri),
        en_uri: en.uri.clone(),
        ja_uri: ja.uri.clone(),
        en_body,
        ja_body,
        ja_date,
    })
}

async fn load(site: Site, lang: Lang, uri: &str, path: &Path) -> std::result::Result<Document, Rejection> {
    match read_text(path).await {
        Ok(markup) => Ok(Document::new(site, lang, uri, markup)),
        Err(e) => Err(Rejection::Unreadable {
            lang,
            reason: e.to_string(),
        }),
    }
}

/// Runs extraction over `rows` and returns the accepted records.
///
/// # Errors
///
/// Returns [`Error::DuplicateId`] if two accepted records share an id.
pub async fn extract_records(
    site: Site,
    rows: Vec<MetadataRow>,
    html_directory: &Path,
    ctx: &mut RunContext,
) -> Result<Vec<DocumentPairRecord>> {
    let scraper = site.scraper();
    let rows = ctx.dedup_rows(rows);
    let total = rows.len();
    let mut records = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        info!(progress = %format!("{}/{}", i + 1, total), id = %row.doc_id, "Processing");

        let pair = match (
            load(site, Lang::En, &row.en_uri, &html_directory.join(&row.en_file)).await,
            load(site, Lang::Ja, &row.ja_uri, &html_directory.join(&row.ja_file)).await,
        ) {
            (Ok(en), Ok(ja)) => assemble(scraper, &en, &ja),
            (Err(rejection), _) | (_, Err(rejection)) => Err(rejection),
        };

        match pair {
            Ok(record) => {
                ctx.claim_id(&record.id)?;
                debug!(id = %record.id, paragraphs = record.en_body.len(), "Accepted");
                records.push(record);
            }
            Err(rejection) => warn!(id = %row.doc_id, reason = %rejection, "Rejected"),
        }
    }
    Ok(records)
}

/// The full `extract` stage for one site.
///
/// # Errors
///
/// Returns an error if the TSV index cannot be read, two records collide on
/// an id, or the output cannot be written.
#[instrument(level = "info", skip_all, fields(%site, input = %input_tsv.display()))]
pub async fn run_extract(
    site: Site,
    input_tsv: &Path,
    output_json: &Path,
    html_directory: &Path,
) -> Result<usize> {
    let rows = tsv::read_metadata(input_tsv)?;
    let mut ctx = RunContext::new();
    let records = extract_records(site, rows, html_directory, &mut ctx).await?;

    if let Err(e) = json::write_records(&records, output_json).await {
        error!(path = %output_json.display(), error = %e, accepted = records.len(), "Failed to write JSON output");
        return Err(e);
    }
    info!(accepted = records.len(), "Extraction complete");
    Ok(records.len())
}
