//! Prime Minister's Office of Japan scraper.
//!
//! Kantei has no machine-readable archive. Its English index pages are saved
//! by hand; `uris` lists the press releases they link to, `download` caches
//! each English page together with the Japanese page it points at.
//!
//! English pages come in two templates. The current one has a `div#top`
//! header and keeps the article in `div.section.has-detail-more`; older
//! pages keep it in `div#format`. In both, paragraphs are blank-line separated
//! blocks of the raw text. Japanese pages keep the article in `div.section`,
//! one or more paragraphs per `<p>`.

use ego_tree::NodeId;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument, warn};

use crate::cli::KanteiDownloadArgs;
use crate::dates::{canonical, parse_japanese_date};
use crate::dom::{self, P, raw_text};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::models::{Lang, MetadataRow, Site};
use crate::pipeline::record_id;
use crate::scrapers::{DatePolicy, SiteScraper};
use crate::utils::{read_text, resolve_uri};

pub const EN_BASE_URI: &str = "https://japan.kantei.go.jp";
pub const JA_BASE_URI: &str = "https://www.kantei.go.jp/";

static ACTION_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(/([0-9]+(_[a-z]+?)?/actions/[0-9]{6}/.+?\.html))""#).unwrap()
});
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s+\n").unwrap());

static TOP: Lazy<Selector> = Lazy::new(|| Selector::parse("div#top").unwrap());
static NEW_ROOT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[class="section has-detail-more"]"#).unwrap());
static OLD_ROOT: Lazy<Selector> = Lazy::new(|| Selector::parse("div#format").unwrap());
static JA_ROOT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.section").unwrap());
static ALY_TX_RIGHT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.aly_tx_right").unwrap());
static RIGHT_P: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"p[align="right"]"#).unwrap());
static BUTTON: Lazy<Selector> = Lazy::new(|| Selector::parse("button").unwrap());
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("span.date").unwrap());
static OG_URL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:url"]"#).unwrap());
static JA_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="www.kantei.go.jp/jp/"]"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Template {
    New,
    Old,
}

impl Template {
    fn of(document: &Html) -> Self {
        if document.select(&TOP).next().is_some() {
            Template::New
        } else {
            Template::Old
        }
    }

    fn root(self) -> &'static Selector {
        match self {
            Template::New => &NEW_ROOT,
            Template::Old => &OLD_ROOT,
        }
    }
}

pub struct Kantei;

impl SiteScraper for Kantei {
    fn site(&self) -> Site {
        Site::Kantei
    }

    fn locate_content<'a>(&self, document: &'a mut Html, lang: Lang) -> Option<ElementRef<'a>> {
        if lang == Lang::Ja {
            return document.select(&JA_ROOT).next();
        }

        let root = document.select(Template::of(document).root()).next()?;
        let doomed: Vec<NodeId> = root
            .select(&ALY_TX_RIGHT)
            .take(1)
            .chain(root.select(&RIGHT_P))
            .chain(root.select(&BUTTON))
            .map(|element| element.id())
            .collect();
        let root = root.id();

        dom::detach_all(document, doomed);
        let document: &'a Html = document;
        dom::element_by_id(document, root)
    }

    fn segment(&self, root: ElementRef<'_>, lang: Lang) -> Vec<String> {
        match lang {
            Lang::En => english_paragraphs(root),
            Lang::Ja => japanese_paragraphs(root),
        }
    }

    fn extract_date(&self, document: &Html) -> Option<String> {
        let span = document.select(&DATE).next()?;
        parse_japanese_date(&raw_text(span)).map(canonical)
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::Required
    }
}

fn non_empty_trimmed<'a>(pieces: impl Iterator<Item = &'a str>) -> impl Iterator<Item = String> {
    pieces
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
}

fn english_paragraphs(root: ElementRef<'_>) -> Vec<String> {
    let text = raw_text(root);
    // Some pages were saved through a latin-1 round trip.
    let text = text.trim().replace("\u{c2}\u{a0}", " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    non_empty_trimmed(text.split("\n\n")).collect()
}

fn japanese_paragraphs(root: ElementRef<'_>) -> Vec<String> {
    root.select(&P)
        .flat_map(|p| {
            let text = raw_text(p).trim().replace('\t', "");
            non_empty_trimmed(text.split("\n\u{3000}")).collect::<Vec<_>>()
        })
        .collect()
}

/// Press release URIs linked from every `*.html` page in `directory`,
/// absolute, sorted and deduplicated.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory cannot be listed or a page cannot
/// be read.
#[instrument(level = "info", skip_all, fields(directory = %directory.display()))]
pub async fn collect_uris(directory: &Path) -> Result<Vec<String>> {
    let mut entries = fs::read_dir(directory)
        .await
        .map_err(|e| Error::io(directory, e))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io(directory, e))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "html") {
            paths.push(path);
        }
    }

    let mut found = Vec::new();
    for path in &paths {
        let html = read_text(path).await?;
        found.extend(
            html.lines()
                .filter_map(|line| ACTION_LINK.captures(line))
                .map(|caps| caps[1].to_string()),
        );
    }

    let uris: Vec<String> = found
        .into_iter()
        .sorted()
        .dedup()
        .map(|path| format!("{EN_BASE_URI}{path}"))
        .collect();
    info!(pages = paths.len(), uris = uris.len(), "Collected press release URIs");
    Ok(uris)
}

/// Writes `uris` one per line to `output`, or to standard output.
///
/// # Errors
///
/// Returns [`Error::Io`] if `output` cannot be written.
pub async fn write_uri_list(uris: &[String], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let mut body = uris.join("\n");
            body.push('\n');
            fs::write(path, body).await.map_err(|e| Error::io(path, e))
        }
        None => {
            for uri in uris {
                println!("{uri}");
            }
            Ok(())
        }
    }
}

/// Self URI (`og:url`) and Japanese counterpart of a cached English page.
fn page_links(html: &str, listed_uri: &str) -> (String, Option<String>) {
    let document = Html::parse_document(html);
    let en_uri = document
        .select(&OG_URL)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|uri| !uri.is_empty())
        .unwrap_or(listed_uri)
        .to_string();
    let ja_uri = document
        .select(&JA_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| match resolve_uri(JA_BASE_URI, href) {
            Ok(uri) => Some(uri),
            Err(e) => {
                warn!(href, error = %e, "Unresolvable Japanese link");
                None
            }
        });
    (en_uri, ja_uri)
}

/// Downloads every English page listed in the URI list, and its Japanese
/// counterpart.
///
/// # Errors
///
/// Returns an error only if the URI list cannot be read; failures on
/// individual pages are logged and skipped.
#[instrument(level = "info", skip_all, fields(list = %args.uri_list.display()))]
pub async fn download(fetcher: &Fetcher, args: &KanteiDownloadArgs) -> Result<Vec<MetadataRow>> {
    let list = read_text(&args.uri_list).await?;

    let mut rows = Vec::new();
    for listed_uri in list.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match download_pair(fetcher, args, listed_uri).await {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => warn!(%listed_uri, "No Japanese link found"),
            Err(e) => error!(%listed_uri, error = %e, "Download failed; skipping"),
        }
    }

    info!(count = rows.len(), "Downloaded Kantei pairs");
    Ok(rows)
}

async fn download_pair(
    fetcher: &Fetcher,
    args: &KanteiDownloadArgs,
    listed_uri: &str,
) -> Result<Option<MetadataRow>> {
    // Cache names follow the listed URI so reruns hit the cache before the
    // page's own og:url is known.
    let stem = record_id(Site::Kantei, listed_uri);
    let en_file = format!("{stem}.en.html");
    let ja_file = format!("{stem}.ja.html");
    let en_path = args.cache.html_directory.join(&en_file);

    fetcher.fetch_to_cache(listed_uri, &en_path).await?;
    let (en_uri, ja_uri) = page_links(&read_text(&en_path).await?, listed_uri);
    let Some(ja_uri) = ja_uri else {
        return Ok(None);
    };

    info!(%ja_uri, "Extracted");
    fetcher
        .fetch_to_cache(&ja_uri, &args.cache.html_directory.join(&ja_file))
        .await?;

    Ok(Some(MetadataRow {
        doc_id: record_id(Site::Kantei, &en_uri),
        ja_file,
        en_file,
        ja_uri,
        en_uri,
    }))
}
