//! Publication date parsing.
//!
//! Dates on the Japanese pages are written either with a Gregorian year
//! (`2010年6月30日`) or with an era-relative year (`平成22年6月30日`,
//! `令和元年5月1日`, where 元 is the first year of the era). Full-width digits
//! are common, so every input is NFKC-normalized before matching.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// `(era)(era-year)年(month)月(day)日` or `(yyyy)年(month)月(day)日`. The
/// year/month markers are lenient because some pages mix up 年 and 月.
static JAPANESE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(平成|令和)([0-9]{1,2}|元)|([0-9]{4}))[年月]([0-9]+)[月年]([0-9]+)日").unwrap()
});

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{4})[-/.]([0-9]{1,2})[-/.]([0-9]{1,2})").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Era {
    Heisei,
    Reiwa,
}

impl Era {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "平成" => Some(Era::Heisei),
            "令和" => Some(Era::Reiwa),
            _ => None,
        }
    }

    /// Gregorian year of era-year zero.
    pub fn offset(self) -> i32 {
        match self {
            Era::Heisei => 1988,
            Era::Reiwa => 2018,
        }
    }
}

pub fn nfkc(text: &str) -> String {
    text.nfkc().collect()
}

/// Finds the first Japanese-style date in `text`.
///
/// Returns `None` when no date is present or the date does not exist on the
/// calendar (`令和元年2月30日`).
pub fn parse_japanese_date(text: &str) -> Option<NaiveDate> {
    let normalized = nfkc(text);
    let caps = JAPANESE_DATE.captures(&normalized)?;

    let year = match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(era), Some(era_year), _) => {
            let era = Era::from_name(era.as_str())?;
            let era_year: i32 = match era_year.as_str() {
                "元" => 1,
                digits => digits.parse().ok()?,
            };
            era.offset() + era_year
        }
        (_, _, Some(year)) => year.as_str().parse().ok()?,
        _ => return None,
    };
    let month: u32 = caps[4].parse().ok()?;
    let day: u32 = caps[5].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Finds the first `YYYY-MM-DD` (or `/`, `.` separated) date in `text`.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let normalized = nfkc(text);
    let caps = ISO_DATE.captures(&normalized)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

/// ISO first, then the Japanese forms.
pub fn parse_any_date(text: &str) -> Option<NaiveDate> {
    parse_iso_date(text).or_else(|| parse_japanese_date(text))
}

pub fn canonical(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ja(text: &str) -> Option<String> {
        parse_japanese_date(text).map(canonical)
    }

    #[test]
    fn test_era_dates() {
        assert_eq!(ja("令和元年5月1日").as_deref(), Some("2019-05-01"));
        assert_eq!(ja("平成22年6月30日").as_deref(), Some("2010-06-30"));
        assert_eq!(ja("令和6年12月3日").as_deref(), Some("2024-12-03"));
    }

    #[test]
    fn test_gregorian_date() {
        assert_eq!(ja("2010年6月30日").as_deref(), Some("2010-06-30"));
        assert_eq!(ja("公表日：2023年1月5日（木）").as_deref(), Some("2023-01-05"));
    }

    #[test]
    fn test_full_width_digits_are_folded() {
        assert_eq!(ja("令和５年１０月２日").as_deref(), Some("2023-10-02"));
        assert_eq!(ja("２０１０年６月３０日").as_deref(), Some("2010-06-30"));
    }

    #[test]
    fn test_mixed_up_markers() {
        assert_eq!(ja("2010月6月30日").as_deref(), Some("2010-06-30"));
        assert_eq!(ja("2010年6年30日").as_deref(), Some("2010-06-30"));
    }

    #[test]
    fn test_invalid_calendar_date_is_none() {
        assert_eq!(ja("令和元年2月30日"), None);
        assert_eq!(ja("2023年13月1日"), None);
    }

    #[test]
    fn test_no_date() {
        assert_eq!(ja("お知らせ"), None);
        assert_eq!(ja(""), None);
    }

    #[test]
    fn test_iso_and_any() {
        assert_eq!(parse_iso_date("2024-06-20").map(canonical).as_deref(), Some("2024-06-20"));
        assert_eq!(parse_any_date("2024/6/2").map(canonical).as_deref(), Some("2024-06-02"));
        assert_eq!(parse_any_date("令和6年6月20日").map(canonical).as_deref(), Some("2024-06-20"));
        assert_eq!(parse_any_date("June"), None);
    }
}
