//! Ministry of Finance scraper.
//!
//! Releases are discovered from the monthly "What's New" pages. Recurring
//! statistical releases (JGB auctions, trade statistics, reserves and so on)
//! are skipped: their English and Japanese editions are tables, not prose.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{error, info, instrument, warn};

use crate::cli::MofDownloadArgs;
use crate::dates::{canonical, parse_any_date};
use crate::dom::{self, LI, stripped_text};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::models::{Lang, MetadataRow, Site};
use crate::pipeline::record_id;
use crate::scrapers::{DatePolicy, SiteScraper};
use crate::utils::{read_text, resolve_uri, yearmonths};

const INDEX_URI_PREFIX: &str = "https://www.mof.go.jp/english/public_relations/whats_new/";
const INFORMATION_ITEM: &str = r#"<li class="information-item">"#;

/// Index entries mentioning any of these are statistical series.
const STATISTICAL_SERIES: [&str; 8] = [
    "JGBs",
    "PRI",
    "Trade Statistics",
    "FILP",
    "Exchequer",
    "Currency",
    "Balance of",
    "International Reserves/Foreign Currency Liquidity",
];

static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<a href="(.+?)""#).unwrap());
static JAPANESE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div class="text-right"><a href="(.+?)" class="button -arrow-r -sm">Japanese</a></div>"#)
        .unwrap()
});

static CONTENT_SECTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section.content-section").unwrap());
static UNIQUE_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("div.unique-block").unwrap());
static BLOCKS: Lazy<Selector> = Lazy::new(|| Selector::parse("p, h2, ol, ul").unwrap());
static META_DATE: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"meta[name="date"]"#).unwrap());

pub struct Mof;

impl SiteScraper for Mof {
    fn site(&self) -> Site {
        Site::Mof
    }

    fn locate_content<'a>(&self, document: &'a mut Html, _lang: Lang) -> Option<ElementRef<'a>> {
        let document: &'a Html = document;
        document
            .select(&CONTENT_SECTION)
            .next()
            .or_else(|| document.select(&UNIQUE_BLOCK).next())
    }

    fn segment(&self, root: ElementRef<'_>, _lang: Lang) -> Vec<String> {
        let paragraphs = block_paragraphs(root);
        if !paragraphs.is_empty() {
            return paragraphs;
        }
        stripped_text(root)
            .split("\n\n")
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn extract_date(&self, document: &Html) -> Option<String> {
        let content = document.select(&META_DATE).next()?.value().attr("content")?;
        parse_any_date(content).map(canonical)
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::Optional
    }
}

/// Every `p`, `h2`, `ol` and `ul` under `root` in document order. Each list
/// item is its own paragraph; a `p` wrapping list items is left to the items.
fn block_paragraphs(root: ElementRef<'_>) -> Vec<String> {
    let mut paragraphs = Vec::new();
    for element in root.select(&BLOCKS) {
        match dom::name(element) {
            "ol" | "ul" => paragraphs.extend(
                element
                    .select(&LI)
                    .map(stripped_text)
                    .filter(|text| !text.is_empty()),
            ),
            "p" if dom::contains(element, &LI) => {}
            _ => {
                let text = stripped_text(element);
                if !text.is_empty() {
                    paragraphs.push(text);
                }
            }
        }
    }
    paragraphs
}

/// The English page behind one "What's New" line, unless the line is not an
/// information item or belongs to a statistical series.
fn release_href(line: &str) -> Option<&str> {
    if !line.contains(INFORMATION_ITEM)
        || STATISTICAL_SERIES.iter().any(|series| line.contains(series))
    {
        return None;
    }
    let href = LINK.captures(line)?.get(1)?.as_str();
    (href.ends_with(".htm") || href.ends_with(".html")).then_some(href)
}

/// Downloads the "What's New" pages for every month in range, then every
/// English release they list and its Japanese original.
///
/// # Errors
///
/// Returns an error if the month range is invalid. Index and release
/// failures are logged and skipped.
#[instrument(level = "info", skip_all, fields(from = args.from_yearmonth, to = args.to_yearmonth))]
pub async fn download(fetcher: &Fetcher, args: &MofDownloadArgs) -> Result<Vec<MetadataRow>> {
    download_from(fetcher, args, INDEX_URI_PREFIX).await
}

async fn download_from(
    fetcher: &Fetcher,
    args: &MofDownloadArgs,
    index_prefix: &str,
) -> Result<Vec<MetadataRow>> {
    let mut rows = Vec::new();

    for yearmonth in yearmonths(args.from_yearmonth, args.to_yearmonth)? {
        let index_uri = format!("{index_prefix}{yearmonth}.html");
        let index_path = args.index_directory.join(format!("index_{yearmonth}.html"));
        let index = match fetcher.fetch_to_cache(&index_uri, &index_path).await {
            Ok(_) => read_text(&index_path).await,
            Err(e) => Err(e),
        };
        let index = match index {
            Ok(index) => index,
            Err(e) => {
                error!(%index_uri, error = %e, "Index unavailable; skipping month");
                continue;
            }
        };

        for href in index.lines().filter_map(release_href) {
            let en_uri = match resolve_uri(&index_uri, href) {
                Ok(uri) => uri,
                Err(e) => {
                    warn!(href, error = %e, "Unresolvable link");
                    continue;
                }
            };
            match download_pair(fetcher, args, &en_uri).await {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => warn!(%en_uri, "No Japanese link found"),
                Err(e) => error!(%en_uri, error = %e, "Download failed; skipping"),
            }
        }
    }

    info!(count = rows.len(), "Downloaded MOF pairs");
    Ok(rows)
}

async fn download_pair(
    fetcher: &Fetcher,
    args: &MofDownloadArgs,
    en_uri: &str,
) -> Result<Option<MetadataRow>> {
    let id = record_id(Site::Mof, en_uri);
    let en_file = format!("{id}.en.html");
    let ja_file = format!("{id}.ja.html");
    let en_path = args.cache.html_directory.join(&en_file);

    info!(%en_uri, "Processing");
    fetcher.fetch_to_cache(en_uri, &en_path).await?;
    let en_html = read_text(&en_path).await?;

    let Some(caps) = en_html.lines().find_map(|line| JAPANESE_LINK.captures(line)) else {
        return Ok(None);
    };
    let ja_uri = resolve_uri(en_uri, &caps[1])?;
    fetcher
        .fetch_to_cache(&ja_uri, &args.cache.html_directory.join(&ja_file))
        .await?;

    Ok(Some(MetadataRow {
        doc_id: id,
        ja_file,
        en_file,
        ja_uri,
        en_uri: en_uri.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CacheArgs;
    use crate::models::Document;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn body(markup: &str) -> Vec<String> {
        Mof.extract_body(&Document::new(Site::Mof, Lang::En, "https://www.mof.go.jp/", markup))
    }

    #[test]
    fn test_blocks_in_document_order() {
        let markup = r#"<section class="content-section">
            <h2>Statement by the Minister</h2>
            <p>The Minister   made a statement.</p>
            <ul><li>First point</li><li> </li><li>Second <b>point</b></li></ul>
            <ol><li>Third point</li></ol>
            <h3>Not collected</h3>
        </section>"#;
        assert_eq!(
            body(markup),
            vec![
                "Statement by the Minister",
                "The Minister   made a statement.",
                "First point",
                "Secondpoint",
                "Third point"
            ]
        );
    }

    #[test]
    fn test_unique_block_fallback_root() {
        let markup = r#"<div class="unique-block"><p>Only paragraph</p></div>"#;
        assert_eq!(body(markup), vec!["Only paragraph"]);
    }

    #[test]
    fn test_plain_text_fallback() {
        let markup = r#"<section class="content-section"><div>Loose text only</div></section>"#;
        assert_eq!(body(markup), vec!["Loose text only"]);
    }

    #[test]
    fn test_meta_date_forms() {
        let iso = Html::parse_document(r#"<html><head><meta name="date" content="2024-01-05"></head></html>"#);
        assert_eq!(Mof.extract_date(&iso).as_deref(), Some("2024-01-05"));

        let japanese =
            Html::parse_document(r#"<html><head><meta name="date" content="令和6年1月5日"></head></html>"#);
        assert_eq!(Mof.extract_date(&japanese).as_deref(), Some("2024-01-05"));

        let missing = Html::parse_document("<html><head></head></html>");
        assert_eq!(Mof.extract_date(&missing), None);
        assert_eq!(Mof.date_policy(), DatePolicy::Optional);
    }

    #[test]
    fn test_release_href_filters_statistics() {
        assert_eq!(
            release_href(r#"<li class="information-item"><a href="/english/policy/budget/20240105.html">Budget</a></li>"#),
            Some("/english/policy/budget/20240105.html")
        );
        assert_eq!(
            release_href(r#"<li class="information-item"><a href="/english/jgbs/auction/20240105.htm">Auction Results of JGBs</a></li>"#),
            None
        );
        assert_eq!(
            release_href(r#"<li class="information-item"><a href="/english/policy/doc.pdf">PDF</a></li>"#),
            None
        );
        assert_eq!(release_href(r#"<li><a href="/english/x.html">x</a></li>"#), None);
    }

    #[tokio::test]
    async fn test_download_resolves_japanese_link_against_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/whats_new/202401.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<ul>\n<li class=\"information-item\"><a href=\"../policy/budget/20240105.html\">Budget</a></li>\n\
                 <li class=\"information-item\"><a href=\"../trade/20240105.html\">Trade Statistics</a></li>\n</ul>\n",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/policy/budget/20240105.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<div class=\"text-right\"><a href=\"ja.html\" class=\"button -arrow-r -sm\">Japanese</a></div>\n",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/policy/budget/ja.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>予算</p>"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let args = MofDownloadArgs {
            from_yearmonth: 202401,
            to_yearmonth: 202401,
            output_tsv: dir.path().join("mof.tsv"),
            cache: CacheArgs {
                html_directory: dir.path().join("html"),
                delay: Duration::ZERO,
            },
            index_directory: dir.path().join("indices"),
        };
        let fetcher = Fetcher::new("test-agent", Duration::ZERO).unwrap();

        let rows = download_from(&fetcher, &args, &format!("{}/whats_new/", server.uri()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].en_uri, format!("{}/policy/budget/20240105.html", server.uri()));
        assert_eq!(rows[0].ja_uri, format!("{}/policy/budget/ja.html", server.uri()));
        assert!(args.index_directory.join("index_202401.html").exists());
    }
}
