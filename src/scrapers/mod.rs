//! Per-agency scrapers.
//!
//! Each submodule covers one website and has two halves:
//!
//! 1. **Download**: discover English press releases from the site's index
//!    pages, cache each English page and its Japanese counterpart, and write
//!    the TSV index
//! 2. **Extraction**: a [`SiteScraper`] implementation that knows where that
//!    site keeps the article body, which boilerplate to strip, how to cut the
//!    body into paragraphs, and where the Japanese page states its date
//!
//! # Supported Sources
//!
//! | Site | Module | Content root | Date source |
//! |------|--------|--------------|-------------|
//! | FSA | [`fsa`] | `div#main div.inner` | `p.mb0.mt0`, right-aligned or centred blocks |
//! | Kantei | [`kantei`] | `div.section` (template dependent) | `span.date` |
//! | METI | [`meti`] | `div.main` | `div.main p.b-g` |
//! | MOF | [`mof`] | `section.content-section` / `div.unique-block` | `<meta name="date">` |

use scraper::{ElementRef, Html};
use tracing::debug;

use crate::models::{Document, Lang, Site};

pub mod fsa;
pub mod kantei;
pub mod meti;
pub mod mof;

/// What to do with an aligned pair whose Japanese page has no usable date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePolicy {
    /// Reject the pair.
    Required,
    /// Emit the pair with an empty date.
    Optional,
}

/// Extraction rules for one website.
pub trait SiteScraper {
    fn site(&self) -> Site;

    /// Finds the article body of `document` and strips the site's boilerplate
    /// from it. `document` is a private working copy.
    fn locate_content<'a>(&self, document: &'a mut Html, lang: Lang) -> Option<ElementRef<'a>>;

    /// Cuts a located content root into paragraphs.
    fn segment(&self, root: ElementRef<'_>, lang: Lang) -> Vec<String>;

    /// Publication date of a Japanese page as `YYYY-MM-DD`.
    fn extract_date(&self, document: &Html) -> Option<String>;

    fn date_policy(&self) -> DatePolicy;

    /// Paragraphs of `document`, empty when no content root is found.
    fn extract_body(&self, document: &Document) -> Vec<String> {
        let mut html = Html::parse_document(&document.markup);
        match self.locate_content(&mut html, document.lang) {
            Some(root) => self.segment(root, document.lang),
            None => {
                debug!(site = %document.site, lang = %document.lang, uri = %document.uri, "No content root");
                Vec::new()
            }
        }
    }
}

impl Site {
    pub fn scraper(self) -> &'static dyn SiteScraper {
        match self {
            Site::Fsa => &fsa::Fsa,
            Site::Kantei => &kantei::Kantei,
            Site::Meti => &meti::Meti,
            Site::Mof => &mof::Mof,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scraper_dispatch_matches_site() {
        for site in [Site::Fsa, Site::Kantei, Site::Meti, Site::Mof] {
            assert_eq!(site.scraper().site(), site);
        }
    }

    #[test]
    fn test_missing_root_gives_empty_body() {
        let document = Document::new(Site::Fsa, Lang::En, "https://www.fsa.go.jp/", "<p>stray</p>");
        for site in [Site::Fsa, Site::Kantei, Site::Meti, Site::Mof] {
            assert!(site.scraper().extract_body(&document).is_empty(), "{site}");
        }
    }
}
