//! Ministry of Economy, Trade and Industry scraper.
//!
//! METI publishes a monthly back-issue index of English releases
//! (`nBackIssueYYYYMM.html`). Each English release links its Japanese
//! original with a plain "Japanese" anchor.
//!
//! Both editions keep the article directly under `div.main`. The body is read
//! child by child and ends at the first trailer heading ("Related
//! Materials", "担当" and the like).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{error, info, instrument, warn};

use crate::cli::MetiDownloadArgs;
use crate::dates::{canonical, parse_japanese_date};
use crate::dom::{self, LI, stripped_text};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::models::{Lang, MetadataRow, Site};
use crate::pipeline::record_id;
use crate::scrapers::{DatePolicy, SiteScraper};
use crate::utils::{read_text, resolve_uri, yearmonths};

static PRESS_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="(/english/press/.+?)""#).unwrap());
static JAPANESE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="(/press/.*?\.html)">Japanese</a>"#).unwrap());
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").unwrap());

static INDENTED_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s+").unwrap());
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \x{3000}\t]{2,}").unwrap());
static MULTI_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").unwrap());

static MAIN: Lazy<Selector> = Lazy::new(|| Selector::parse("div.main").unwrap());
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.main p.b-g").unwrap());

/// Headings that open the trailer (materials, links, contacts).
const TRAILER_HEADINGS: [&str; 7] = [
    "関連資料",
    "関連リンク",
    "担当",
    "division in charge",
    "related materials",
    "reference links",
    "related link",
];

pub struct Meti;

impl SiteScraper for Meti {
    fn site(&self) -> Site {
        Site::Meti
    }

    fn locate_content<'a>(&self, document: &'a mut Html, _lang: Lang) -> Option<ElementRef<'a>> {
        document.select(&MAIN).next()
    }

    fn segment(&self, root: ElementRef<'_>, _lang: Lang) -> Vec<String> {
        main_paragraphs(root)
    }

    fn extract_date(&self, document: &Html) -> Option<String> {
        let line = document.select(&DATE).next()?;
        parse_japanese_date(&line.text().collect::<String>()).map(canonical)
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::Optional
    }
}

fn is_trailer_heading(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRAILER_HEADINGS.contains(&lower.as_str()) || lower.contains("related link")
}

/// `class="border_box"` and nothing else.
fn is_border_box(element: ElementRef<'_>) -> bool {
    let mut classes = element.value().classes();
    classes.next() == Some("border_box") && classes.next().is_none()
}

fn loose_text(text: &str) -> String {
    let text = INDENTED_LINE.replace_all(text.trim(), "\n");
    SPACE_RUN.replace_all(&text, " ").into_owned()
}

/// Walks the direct children of `div.main`.
///
/// Block children (`p`, `div.border_box`, `figure`, lists, `h2`) give one
/// paragraph each. Loose text and bare links between blocks are glued into a
/// single run paragraph, emitted just before the next block paragraph.
fn main_paragraphs(main: ElementRef<'_>) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut run: Vec<String> = Vec::new();

    for child in main.children() {
        let text = match child.value() {
            Node::Text(text) => {
                let text = loose_text(text);
                if !text.is_empty() {
                    run.push(text);
                }
                continue;
            }
            Node::Element(_) => {
                let Some(element) = ElementRef::wrap(child) else {
                    continue;
                };
                match dom::name(element) {
                    "p" | "figure" => stripped_text(element),
                    "div" if is_border_box(element) => stripped_text(element),
                    "ul" | "ol" => element
                        .select(&LI)
                        .map(|li| format!("{}\n", stripped_text(li)))
                        .collect(),
                    "h2" => {
                        let text = stripped_text(element);
                        if is_trailer_heading(&text) {
                            break;
                        }
                        text
                    }
                    "a" => {
                        let text = stripped_text(element);
                        if !text.is_empty() {
                            run.push(text);
                        }
                        continue;
                    }
                    _ => continue,
                }
            }
            _ => continue,
        };

        let text = MULTI_NEWLINE.replace_all(&text, "\n");
        let text = text.trim();
        if !text.is_empty() {
            if !run.is_empty() {
                paragraphs.push(run.concat());
                run.clear();
            }
            paragraphs.push(text.to_string());
        }
    }
    if !run.is_empty() {
        paragraphs.push(run.concat());
    }
    paragraphs
}

/// Downloads the monthly indexes from `oldest_yearmonth` to
/// `newest_yearmonth`, then every English release they list and its
/// Japanese original.
///
/// # Errors
///
/// Returns an error if the month range is invalid. Index and release
/// failures are logged and skipped.
#[instrument(level = "info", skip_all, fields(from = args.oldest_yearmonth, to = args.newest_yearmonth))]
pub async fn download(fetcher: &Fetcher, args: &MetiDownloadArgs) -> Result<Vec<MetadataRow>> {
    let mut rows = Vec::new();

    for yearmonth in yearmonths(args.oldest_yearmonth, args.newest_yearmonth)? {
        let index_uri = format!("{}{yearmonth}.html", args.index_uri);
        let index_path = args.index_directory.join(format!("{yearmonth}.html"));
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

        for caps in PRESS_LINK.captures_iter(&index) {
            let en_uri = match resolve_uri(&args.base_uri, &caps[1]) {
                Ok(uri) => uri,
                Err(e) => {
                    warn!(href = &caps[1], error = %e, "Unresolvable link");
                    continue;
                }
            };
            if !DIGIT.is_match(&caps[1]) {
                continue;
            }

            match download_pair(fetcher, args, &en_uri).await {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => warn!(%en_uri, "No Japanese link found"),
                Err(e) => error!(%en_uri, error = %e, "Download failed; skipping"),
            }
        }
    }

    info!(count = rows.len(), "Downloaded METI pairs");
    Ok(rows)
}

async fn download_pair(
    fetcher: &Fetcher,
    args: &MetiDownloadArgs,
    en_uri: &str,
) -> Result<Option<MetadataRow>> {
    let id = record_id(Site::Meti, en_uri);
    let en_file = format!("{id}.en.html");
    let ja_file = format!("{id}.ja.html");
    let en_path = args.cache.html_directory.join(&en_file);

    info!(%en_uri, "Processing");
    fetcher.fetch_to_cache(en_uri, &en_path).await?;
    let en_html = read_text(&en_path).await?;

    let Some(caps) = JAPANESE_LINK.captures(&en_html) else {
        return Ok(None);
    };
    let ja_uri = resolve_uri(&args.base_uri, &caps[1])?;
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
        Meti.extract_body(&Document::new(Site::Meti, Lang::En, "https://www.meti.go.jp/", markup))
    }

    #[test]
    fn test_block_children_and_trailer_cutoff() {
        let markup = r#"<div class="main">
            <h1>Not walked</h1>
            <p class="b-g">June 20, 2024</p>
            <h2>Outline</h2>
            <p>METI released   the report.</p>
            <div class="border_box"><p>Boxed note</p></div>
            <div class="border_box wide"><p>Ignored box</p></div>
            <ul><li>One</li><li></li><li>Two</li></ul>
            <figure><figcaption>Figure 1</figcaption></figure>
            <h2>Related Materials</h2>
            <p>After the trailer</p>
        </div>"#;
        assert_eq!(
            body(markup),
            vec![
                "June 20, 2024",
                "Outline",
                "METI released   the report.",
                "Boxed note",
                "One\nTwo",
                "Figure 1"
            ]
        );
    }

    #[test]
    fn test_loose_text_and_links_form_a_run() {
        let markup = "<div class=\"main\">Loose   text\n    continues <a href=\"/x\">with link</a><!-- note --><p>Block</p>tail\u{3000}\u{3000}end</div>";
        assert_eq!(
            body(markup),
            vec!["Loose text\ncontinueswith link", "Block", "tail end"]
        );
    }

    #[test]
    fn test_trailer_headings() {
        assert!(is_trailer_heading("関連資料"));
        assert!(is_trailer_heading("Division in Charge"));
        assert!(is_trailer_heading("Related Links"));
        assert!(is_trailer_heading("Reference Links"));
        assert!(!is_trailer_heading("Outline"));
    }

    #[test]
    fn test_date_is_optional() {
        let dated = Html::parse_document(r#"<div class="main"><p class="b-g">2024年6月20日</p></div>"#);
        assert_eq!(Meti.extract_date(&dated).as_deref(), Some("2024-06-20"));

        let undated = Html::parse_document(r#"<div class="main"><p>本文</p></div>"#);
        assert_eq!(Meti.extract_date(&undated), None);
        assert_eq!(Meti.date_policy(), DatePolicy::Optional);
    }

    #[tokio::test]
    async fn test_download_follows_index_and_japanese_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/english/press/nBackIssue202406.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<li><a href=\"/english/press/2024/0620_001.html\">Report</a></li>\n\
                 <li><a href=\"/english/press/index.html\">Index</a></li>\n",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/english/press/2024/0620_001.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<p><a href=\"/press/2024/06/20240620001/20240620001.html\">Japanese</a></p>",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/press/2024/06/20240620001/20240620001.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>日本語</p>"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let base = format!("{}/", server.uri());
        let args = MetiDownloadArgs {
            oldest_yearmonth: 202406,
            newest_yearmonth: 202406,
            output_tsv: dir.path().join("meti.tsv"),
            cache: CacheArgs {
                html_directory: dir.path().join("html"),
                delay: Duration::ZERO,
            },
            base_uri: base.clone(),
            index_uri: format!("{base}english/press/nBackIssue"),
            index_directory: dir.path().join("indices"),
        };
        let fetcher = Fetcher::new("test-agent", Duration::ZERO).unwrap();

        let rows = download(&fetcher, &args).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.en_uri, format!("{base}english/press/2024/0620_001.html"));
        assert_eq!(row.ja_uri, format!("{base}press/2024/06/20240620001/20240620001.html"));
        assert_eq!(row.doc_id, record_id(Site::Meti, &row.en_uri));
        assert_eq!(row.en_file, format!("{}.en.html", row.doc_id));
        assert!(args.cache.html_directory.join(&row.ja_file).exists());
        assert!(args.index_directory.join("202406.html").exists());
    }
}
