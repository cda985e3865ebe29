//! Paragraph segmentation of a located content root.
//!
//! Two modes:
//!
//! - **Block mode** ([`block_paragraphs`]) walks block elements: headings and
//!   `<p>` give one paragraph each, lists and definition lists collapse into
//!   one multi-line paragraph, `<div>`s are transparent.
//! - **Run mode** ([`plain_text_runs`]) treats the content as a stream of
//!   inline text broken by `<br>` and headings. It is used when a root has no
//!   `<p>` at all, and for any `<p>` that uses `<br>` as a paragraph break.
//!
//! Paragraph order always follows document order. English and Japanese pages
//! are aligned positionally afterwards, so every rule here must produce the
//! same paragraph boundaries for both languages of a page.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node, Selector};
use tracing::debug;

use crate::dom::{self, BR, LIST, P, child_elements, is_heading, stripped_text};

static PROVISIONAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([Pp]rovisional translation.*?\)").unwrap());
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"  +").unwrap());
static NEWLINE_INDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n +").unwrap());
static MULTI_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").unwrap());

static DT: Lazy<Selector> = Lazy::new(|| Selector::parse("dt").unwrap());
static DD: Lazy<Selector> = Lazy::new(|| Selector::parse("dd").unwrap());
static TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").unwrap());

/// Tables containing one of these are contact boxes.
pub const CONTACT_MARKERS: [&str; 2] = ["問い合わせ先", "Contact"];

/// Segments `root`, choosing run mode when it holds no `<p>` at all.
pub fn segment(root: ElementRef<'_>) -> Vec<String> {
    if dom::contains(root, &P) {
        block_paragraphs(root)
    } else {
        plain_text_runs(root)
    }
}

pub fn block_paragraphs(container: ElementRef<'_>) -> Vec<String> {
    let mut paragraphs = Vec::new();

    for element in child_elements(container) {
        let text = match dom::name(element) {
            "div" => {
                paragraphs.extend(block_paragraphs(element));
                continue;
            }
            "p" if dom::contains(element, &BR) => {
                paragraphs.extend(plain_text_runs(element));
                continue;
            }
            "p" => stripped_text(element),
            name if is_heading(name) => stripped_text(element),
            "ul" | "ol" => list_text(element),
            "dl" => definition_list_text(element),
            "table" => {
                discard_table(element);
                continue;
            }
            _ => continue,
        };

        let text = normalize_paragraph(&text);
        if !text.is_empty() {
            paragraphs.push(text);
        }
    }
    paragraphs
}

/// One line per leaf list item. An item holding a nested list is replaced by
/// the nested list's own lines.
pub fn list_text(list: ElementRef<'_>) -> String {
    let mut lines = Vec::new();
    collect_list_lines(list, &mut lines);
    lines.join("\n")
}

fn collect_list_lines(list: ElementRef<'_>, lines: &mut Vec<String>) {
    for item in child_elements(list).filter(|e| dom::name(*e) == "li") {
        if dom::contains(item, &LIST) {
            for nested in outermost_lists(item) {
                collect_list_lines(nested, lines);
            }
        } else {
            let text = stripped_text(item);
            if !text.is_empty() {
                lines.push(text);
            }
        }
    }
}

/// Lists under `element` that are not themselves inside another such list.
fn outermost_lists(element: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    element
        .select(&LIST)
        .filter(|list| {
            !list
                .ancestors()
                .take_while(|ancestor| ancestor.id() != element.id())
                .filter_map(ElementRef::wrap)
                .any(|ancestor| matches!(dom::name(ancestor), "ul" | "ol"))
        })
        .collect()
}

/// All `<dt>` lines, then all `<dd>` lines.
pub fn definition_list_text(list: ElementRef<'_>) -> String {
    let terms: Vec<String> = list.select(&DT).map(stripped_text).collect();
    let descriptions: Vec<String> = list.select(&DD).map(stripped_text).collect();
    format!("{}\n{}", terms.join("\n"), descriptions.join("\n"))
        .trim()
        .to_string()
}

/// Rows of space-joined cells, one row per line.
pub fn render_table(table: ElementRef<'_>) -> String {
    table
        .select(&TR)
        .map(|row| {
            row.select(&CELL)
                .map(stripped_text)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn is_contact_table(rendered: &str) -> bool {
    CONTACT_MARKERS.iter().any(|marker| rendered.contains(marker))
}

/// Tables never become paragraphs: table layouts differ too much between the
/// English and Japanese editions to align. Contact boxes are only told apart
/// for the log.
fn discard_table(table: ElementRef<'_>) {
    let rendered = render_table(table);
    if is_contact_table(&rendered) {
        debug!("Skipping contact table");
    } else {
        debug!(rows = rendered.lines().count(), "Discarding table");
    }
}

/// Cleans one candidate paragraph from block mode.
pub fn normalize_paragraph(text: &str) -> String {
    let text = PROVISIONAL.replace_all(text, "");
    let text = MULTI_SPACE.replace_all(&text, " ");
    let text = NEWLINE_INDENT.replace_all(&text, "\n");
    let text = MULTI_NEWLINE.replace_all(&text, "\n");
    text.trim().to_string()
}

/// Appends a space when `text` ends in a letter so that adjacent inline runs
/// do not glue words together.
fn with_word_gap(text: &str) -> String {
    match text.chars().last() {
        Some(c) if c.is_alphabetic() => format!("{text} "),
        _ => text.to_string(),
    }
}

pub fn plain_text_runs(container: ElementRef<'_>) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut run: Vec<String> = Vec::new();

    fn flush(run: &mut Vec<String>, paragraphs: &mut Vec<String>) {
        if !run.is_empty() {
            paragraphs.push(run.concat().trim().to_string());
            run.clear();
        }
    }

    for child in container.children() {
        match child.value() {
            Node::Text(text) => run.push(with_word_gap(text.trim())),
            Node::Element(_) => {
                let Some(element) = ElementRef::wrap(child) else {
                    continue;
                };
                match dom::name(element) {
                    "br" => flush(&mut run, &mut paragraphs),
                    name if dom::is_hidden(name) => {}
                    "div" => {
                        let inner = plain_text_runs(element);
                        flush(&mut run, &mut paragraphs);
                        paragraphs.extend(inner);
                    }
                    name if is_heading(name) => {
                        flush(&mut run, &mut paragraphs);
                        paragraphs.push(stripped_text(element));
                    }
                    _ => run.push(with_word_gap(&stripped_text(element))),
                }
            }
            _ => {}
        }
    }
    flush(&mut run, &mut paragraphs);

    paragraphs.retain(|p| !p.is_empty());
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn root(document: &Html) -> ElementRef<'_> {
        let selector = Selector::parse("#root").unwrap();
        document.select(&selector).next().unwrap()
    }

    fn segment_html(html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        segment(root(&document))
    }

    #[test]
    fn test_nested_list_flattens_into_one_paragraph() {
        let paragraphs = segment_html(
            "<div id=root><p>Intro</p><ul><li>A</li><li><ul><li>B</li><li>C</li></ul></li></ul></div>",
        );
        assert_eq!(paragraphs, vec!["Intro", "A\nB\nC"]);
    }

    #[test]
    fn test_list_item_text_is_suppressed_by_nested_list() {
        let document = Html::parse_document(
            "<ul id=root><li>A</li><li>Parent<ol><li>B</li></ol></li><li>D</li></ul>",
        );
        assert_eq!(list_text(root(&document)), "A\nB\nD");
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let paragraphs = segment_html(
            "<div id=root><h2>  Title  </h2><p>First <a href='#'>link</a> text.</p><h4>Sub</h4></div>",
        );
        assert_eq!(paragraphs, vec!["Title", "Firstlinktext.", "Sub"]);
    }

    #[test]
    fn test_divs_are_transparent() {
        let paragraphs = segment_html(
            "<div id=root><div><p>One</p><div><p>Two</p></div></div><p>Three</p></div>",
        );
        assert_eq!(paragraphs, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_definition_list() {
        let paragraphs = segment_html(
            "<div id=root><p>x</p><dl><dt>T1</dt><dd>D1</dd><dt>T2</dt><dd>D2</dd></dl></div>",
        );
        assert_eq!(paragraphs, vec!["x", "T1\nT2\nD1\nD2"]);
    }

    #[test]
    fn test_tables_never_produce_paragraphs() {
        let paragraphs = segment_html(
            "<div id=root><p>Before</p>\
             <table><tr><th>Contact</th><td>Desk</td></tr></table>\
             <table><tr><td>Plain</td><td>data</td></tr><tr><td>more</td></tr></table>\
             <table><tr><td>お問い合わせ先</td></tr></table>\
             <p>After</p></div>",
        );
        assert_eq!(paragraphs, vec!["Before", "After"]);
    }

    #[test]
    fn test_render_table_and_contact_marker() {
        let document = Html::parse_document(
            "<table id=root><tr><th>Name</th><td>Value</td></tr><tr><td>a</td><td>b</td></tr></table>",
        );
        let rendered = render_table(root(&document));
        assert_eq!(rendered, "Name Value\na b");
        assert!(!is_contact_table(&rendered));
        assert!(is_contact_table("本件に関する問い合わせ先"));
        assert!(is_contact_table("Contact: Foo"));
    }

    #[test]
    fn test_paragraph_with_br_switches_to_runs() {
        let paragraphs = segment_html(
            "<div id=root><p>Line one<br>Line <span>two</span><br><br>Line three</p></div>",
        );
        assert_eq!(paragraphs, vec!["Line one", "Line two", "Line three"]);
    }

    #[test]
    fn test_run_mode_without_paragraph_tags() {
        let paragraphs = segment_html(
            "<div id=root><h1>Head</h1>Some <a href='#'>linked</a> words<br>Next line\
             <div>Inner block</div>tail</div>",
        );
        assert_eq!(
            paragraphs,
            vec!["Head", "Some linked words", "Next line", "Inner block", "tail"]
        );
    }

    #[test]
    fn test_run_mode_word_gap_only_after_letters() {
        let paragraphs = segment_html("<div id=root>Total: <strong>100</strong>yen</div>");
        assert_eq!(paragraphs, vec!["Total:100yen"]);
    }

    #[test]
    fn test_script_and_style_text_is_not_content() {
        let paragraphs = segment_html(
            "<div id=root><p>Release text.<script>var tracker = 1;</script></p>\
             <style>p { margin: 0 }</style><p>Two</p></div>",
        );
        assert_eq!(paragraphs, vec!["Release text.", "Two"]);
    }

    #[test]
    fn test_run_mode_skips_script_and_noscript() {
        let paragraphs = segment_html(
            "<div id=root>Alpha<script>track()</script><br>Beta<noscript>Enable scripts</noscript></div>",
        );
        assert_eq!(paragraphs, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_normalize_paragraph() {
        assert_eq!(
            normalize_paragraph("Press release (Provisional translation by the Ministry) about  things"),
            "Press release about things"
        );
        assert_eq!(
            normalize_paragraph("(provisional translation)\n\n\n   Line\n  next"),
            "Line\nnext"
        );
        assert_eq!(normalize_paragraph("   "), "");
    }

    #[test]
    fn test_empty_paragraphs_dropped() {
        let paragraphs = segment_html("<div id=root><p> </p><h3></h3><ul><li> </li></ul><p>ok</p></div>");
        assert_eq!(paragraphs, vec!["ok"]);
    }
}
