//! Structural alignment checks for an English/Japanese paragraph pair.

use crate::models::Lang;

/// Marker of an error page served with a success status.
pub const NOT_FOUND_MARKER: &str = "404 Not Found";

/// Why a document pair was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("page not found marker in {lang} body")]
    NotFoundPage { lang: Lang },

    #[error("no {lang} body extracted")]
    EmptyBody { lang: Lang },

    #[error("paragraph count mismatch (en: {en}, ja: {ja})")]
    LengthMismatch { en: usize, ja: usize },

    #[error("newline count mismatch at paragraph {index} (en: {en}, ja: {ja})")]
    NewlineMismatch { index: usize, en: usize, ja: usize },

    #[error("no publication date found")]
    MissingDate,

    #[error("cannot read {lang} page: {reason}")]
    Unreadable { lang: Lang, reason: String },
}

pub fn newline_count(paragraph: &str) -> usize {
    paragraph.matches('\n').count()
}

pub fn contains_not_found(paragraphs: &[String]) -> bool {
    paragraphs.iter().any(|p| p.contains(NOT_FOUND_MARKER))
}

/// Accepts the pair only if both sides are non-empty real pages with the
/// same number of paragraphs and the same line structure in each paragraph.
pub fn validate_pair(en: &[String], ja: &[String]) -> Result<(), Rejection> {
    if contains_not_found(en) {
        return Err(Rejection::NotFoundPage { lang: Lang::En });
    }
    if contains_not_found(ja) {
        return Err(Rejection::NotFoundPage { lang: Lang::Ja });
    }
    if en.is_empty() {
        return Err(Rejection::EmptyBody { lang: Lang::En });
    }
    if ja.is_empty() {
        return Err(Rejection::EmptyBody { lang: Lang::Ja });
    }
    if en.len() != ja.len() {
        return Err(Rejection::LengthMismatch {
            en: en.len(),
            ja: ja.len(),
        });
    }
    for (index, (en_para, ja_para)) in en.iter().zip(ja).enumerate() {
        let (en_lines, ja_lines) = (newline_count(en_para), newline_count(ja_para));
        if en_lines != ja_lines {
            return Err(Rejection::NewlineMismatch {
                index,
                en: en_lines,
                ja: ja_lines,
            });
        }
    }
    Ok(())
}
