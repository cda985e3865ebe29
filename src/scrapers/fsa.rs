//! Financial Services Agency scraper.
//!
//! # Download
//!
//! The English news index (`/en/news/index.html`) links every English
//! release. Release file names carry their date (`20240401.html`,
//! `20240401-2.html`), which is used to keep only recent releases. Each
//! English page links its Japanese original with a `target="_blank"` anchor
//! labelled "Japanese". Pages are cached as `<stem>.en` and `<stem>.ja`.
//!
//! # Extraction
//!
//! The body lives in `div#main div.inner`. Share buttons, contact boxes,
//! right-aligned blocks (dates, signatures) and notice/caution boxes are
//! removed before segmenting. The date is looked up on the Japanese page
//! in three places, in order: the `mb0 mt0` date line, any right-aligned
//! block, any centred block.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{error, info, instrument, warn};

use crate::cli::FsaDownloadArgs;
use crate::dates::{canonical, parse_japanese_date};
use crate::dom::{self, has_class, is_right_aligned, stripped_text};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::models::{Lang, MetadataRow, Site};
use crate::pipeline::record_id;
use crate::scrapers::{DatePolicy, SiteScraper};
use crate::segment;
use crate::utils::{read_text, resolve_uri, uri_stem};

static INDEX_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<a href="(.+?)""#).unwrap());
static DATED_PAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(20[0-9]{6})(-[0-9]+)?\.html").unwrap());
static JAPANESE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a target="_blank" href="(.+?)">Japanese(<img.+?)?</a>"#).unwrap()
});

static CONTENT_ROOT: Lazy<Selector> = Lazy::new(|| Selector::parse("div#main div.inner").unwrap());
static DATE_LINE: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"p[class="mb0 mt0"]"#).unwrap());
static BLOCKS: Lazy<Selector> = Lazy::new(|| Selector::parse("p, div").unwrap());

pub struct Fsa;

impl SiteScraper for Fsa {
    fn site(&self) -> Site {
        Site::Fsa
    }

    fn locate_content<'a>(&self, document: &'a mut Html, _lang: Lang) -> Option<ElementRef<'a>> {
        let root = document.select(&CONTENT_ROOT).next()?.id();
        dom::prune(document, root, is_boilerplate)
    }

    fn segment(&self, root: ElementRef<'_>, _lang: Lang) -> Vec<String> {
        segment::segment(root)
    }

    fn extract_date(&self, document: &Html) -> Option<String> {
        find_date(document).map(canonical)
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::Required
    }
}

fn is_boilerplate(element: ElementRef<'_>) -> bool {
    match dom::name(element) {
        "dl" => has_class(element, "contact_box"),
        "p" if has_class(element, "share-button") => true,
        "p" | "div" => {
            is_right_aligned(element)
                || has_class(element, "notice")
                || has_class(element, "caution")
        }
        _ => false,
    }
}

fn date_in(element: ElementRef<'_>) -> Option<NaiveDate> {
    parse_japanese_date(&stripped_text(element))
}

fn find_date(document: &Html) -> Option<NaiveDate> {
    document
        .select(&DATE_LINE)
        .next()
        .and_then(date_in)
        .or_else(|| {
            document
                .select(&BLOCKS)
                .filter(|e| is_right_aligned(*e))
                .find_map(date_in)
        })
        .or_else(|| {
            document
                .select(&BLOCKS)
                .filter(|e| has_class(*e, "a-center"))
                .find_map(date_in)
        })
}

/// Downloads every English release dated at or after the oldest month, and
/// its Japanese original.
///
/// # Errors
///
/// Returns an error only if the news index itself cannot be fetched or read;
/// failures on individual releases are logged and skipped.
#[instrument(level = "info", skip_all, fields(oldest = args.oldest_yearmonth))]
pub async fn download(fetcher: &Fetcher, args: &FsaDownloadArgs) -> Result<Vec<MetadataRow>> {
    fetcher.fetch_to_cache(&args.index_uri, &args.index_file).await?;
    let index = read_text(&args.index_file).await?;

    let mut rows = Vec::new();
    for line in index.lines() {
        let Some(caps) = INDEX_LINK.captures(line) else {
            continue;
        };
        let en_uri = match resolve_uri(&args.base_uri, &caps[1]) {
            Ok(uri) => uri,
            Err(e) => {
                warn!(href = &caps[1], error = %e, "Unresolvable link");
                continue;
            }
        };
        let Some(yearmonth) = release_yearmonth(&en_uri) else {
            continue;
        };
        if yearmonth < args.oldest_yearmonth {
            continue;
        }

        info!(%en_uri, "Extracted");
        match download_pair(fetcher, args, &en_uri).await {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => warn!(%en_uri, "No Japanese link found"),
            Err(e) => error!(%en_uri, error = %e, "Download failed; skipping"),
        }
    }

    info!(count = rows.len(), "Downloaded FSA pairs");
    Ok(rows)
}

/// `YYYYMM` from a release file name such as `20240401-2.html`.
fn release_yearmonth(uri: &str) -> Option<u32> {
    let caps = DATED_PAGE.captures(uri)?;
    caps[1][..6].parse().ok()
}

async fn download_pair(
    fetcher: &Fetcher,
    args: &FsaDownloadArgs,
    en_uri: &str,
) -> Result<Option<MetadataRow>> {
    let stem = uri_stem(en_uri);
    let en_file = format!("{stem}.en");
    let ja_file = format!("{stem}.ja");
    let en_path = args.cache.html_directory.join(&en_file);

    fetcher.fetch_to_cache(en_uri, &en_path).await?;
    let en_html = read_text(&en_path).await?;

    let Some(href) = en_html
        .lines()
        .find_map(|line| JAPANESE_LINK.captures(line).map(|caps| caps[1].to_string()))
    else {
        return Ok(None);
    };
    let ja_uri = resolve_uri(&args.base_uri, &href)?;
    info!(%ja_uri, "Extracted");
    fetcher
        .fetch_to_cache(&ja_uri, &args.cache.html_directory.join(&ja_file))
        .await?;

    Ok(Some(MetadataRow {
        doc_id: record_id(Site::Fsa, en_uri),
        ja_file,
        en_file,
        ja_uri,
        en_uri: en_uri.to_string(),
    }))
}
