//! Data models shared by the download and extraction stages.
//!
//! - [`Site`]: the agency a document pair comes from
//! - [`Lang`]: the language variant of one page
//! - [`Document`]: one cached HTML page, ready for extraction
//! - [`MetadataRow`]: one row of the download-stage TSV index
//! - [`DocumentPairRecord`]: one accepted, aligned document pair

use serde::{Deserialize, Serialize};
use std::fmt;

/// Government agency websites with a dedicated scraper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    /// Financial Services Agency (fsa.go.jp)
    Fsa,
    /// Prime Minister's Office (kantei.go.jp)
    Kantei,
    /// Ministry of Economy, Trade and Industry (meti.go.jp)
    Meti,
    /// Ministry of Finance (mof.go.jp)
    Mof,
}

impl Site {
    /// Short tag used as identifier prefix and in logs.
    pub fn tag(self) -> &'static str {
        match self {
            Site::Fsa => "fsa",
            Site::Kantei => "kantei",
            Site::Meti => "meti",
            Site::Mof => "mof",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    En,
    Ja,
}

impl Lang {
    pub fn tag(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ja => "ja",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One fetched HTML page. Never mutated once loaded; extraction parses its
/// own working copy of the markup.
#[derive(Debug, Clone)]
pub struct Document {
    pub site: Site,
    pub lang: Lang,
    pub uri: String,
    pub markup: String,
}

impl Document {
    pub fn new(site: Site, lang: Lang, uri: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            site,
            lang,
            uri: uri.into(),
            markup: markup.into(),
        }
    }
}

/// One row of the TSV index written by a download stage.
///
/// File names are relative to the HTML cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    pub doc_id: String,
    pub ja_file: String,
    pub en_file: String,
    pub ja_uri: String,
    pub en_uri: String,
}

/// An accepted English/Japanese document pair.
///
/// The JSON field names are part of the output format consumed downstream,
/// hence the renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPairRecord {
    pub id: String,
    #[serde(rename = "en_URI")]
    pub en_uri: String,
    #[serde(rename = "ja_URI")]
    pub ja_uri: String,
    pub en_body: Vec<String>,
    pub ja_body: Vec<String>,
    /// `YYYY-MM-DD`, or empty when the site tolerates a missing date.
    pub ja_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_tags() {
        assert_eq!(Site::Fsa.tag(), "fsa");
        assert_eq!(Site::Kantei.to_string(), "kantei");
        assert_eq!(Site::Meti.tag(), "meti");
        assert_eq!(Site::Mof.tag(), "mof");
    }

    #[test]
    fn test_record_serializes_with_uri_field_names() {
        let record = DocumentPairRecord {
            id: "fsa_0123abcd".to_string(),
            en_uri: "https://www.fsa.go.jp/en/news/2024/20240401.html".to_string(),
            ja_uri: "https://www.fsa.go.jp/news/r5/20240401.html".to_string(),
            en_body: vec!["Hello".to_string()],
            ja_body: vec!["こんにちは".to_string()],
            ja_date: "2024-04-01".to_string(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"en_URI\""));
        assert!(json.contains("\"ja_URI\""));
        assert!(json.contains("こんにちは"));

        let back: DocumentPairRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_document_new() {
        let doc = Document::new(Site::Mof, Lang::Ja, "https://www.mof.go.jp/", "<html></html>");
        assert_eq!(doc.lang, Lang::Ja);
        assert_eq!(doc.site, Site::Mof);
        assert_eq!(doc.uri, "https://www.mof.go.jp/");
    }
}
