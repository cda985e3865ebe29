//! Polite, cached page downloads.
//!
//! Every request is followed by a fixed delay. Pages are cached on disk under
//! a deterministic path and never fetched twice; a download is written to a
//! `.part` file first and renamed into place only once the whole body has
//! been received, so an interrupted run leaves no truncated cache entries.

use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";

static META_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s;/>]+)"#).unwrap());
static HEADER_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The file was already on disk; no request was made.
    Cached,
    Downloaded,
}

pub struct Fetcher {
    client: Client,
    delay: Duration,
}

impl Fetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(user_agent: &str, delay: Duration) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client, delay })
    }

    /// GETs `uri`, decodes the body to a string and waits out the delay.
    /// The delay is served whether the request succeeds or not.
    ///
    /// # Errors
    ///
    /// Network failures and non-2xx statuses.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_text(&self, uri: &str) -> Result<String> {
        let received = async {
            let response = self.client.get(uri).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Status {
                    status: status.as_u16(),
                    url: uri.to_string(),
                });
            }
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let bytes = response.bytes().await?;
            Ok::<_, Error>((bytes, content_type))
        }
        .await;
        tokio::time::sleep(self.delay).await;
        let (bytes, content_type) = received?;

        let text = decode_body(&bytes, content_type.as_deref());
        debug!(bytes = bytes.len(), "Fetched page");
        Ok(text)
    }

    /// Downloads `uri` into `path` unless `path` already exists.
    ///
    /// # Errors
    ///
    /// Network failures, non-2xx statuses and file system errors. Nothing is
    /// left at `path` when an error is returned.
    #[instrument(level = "info", skip(self, path), fields(path = %path.display()))]
    pub async fn fetch_to_cache(&self, uri: &str, path: &Path) -> Result<FetchOutcome> {
        if fs::try_exists(path).await.map_err(|e| Error::io(path, e))? {
            debug!("Already cached");
            return Ok(FetchOutcome::Cached);
        }

        let text = self.fetch_text(uri).await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        let partial = partial_path(path);
        fs::write(&partial, text)
            .await
            .map_err(|e| Error::io(&partial, e))?;
        fs::rename(&partial, path)
            .await
            .map_err(|e| Error::io(path, e))?;

        info!("Saved");
        Ok(FetchOutcome::Downloaded)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Picks the body's encoding from the `Content-Type` header, then from an
/// HTML `<meta>` declaration, then UTF-8 if the bytes are valid UTF-8, and
/// finally Shift_JIS, the usual legacy encoding on these sites.
pub fn detect_encoding(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    let declared = content_type
        .and_then(|ct| HEADER_CHARSET.captures(ct))
        .and_then(|caps| Encoding::for_label(caps[1].as_bytes()));
    if let Some(encoding) = declared {
        return encoding;
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(2048)]);
    let meta = META_CHARSET
        .captures(&head)
        .and_then(|caps| Encoding::for_label(caps[1].as_bytes()));
    if let Some(encoding) = meta {
        return encoding;
    }

    if std::str::from_utf8(bytes).is_ok() {
        UTF_8
    } else {
        SHIFT_JIS
    }
}

pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = detect_encoding(bytes, content_type);
    let (decoded, _, _) = encoding.decode(bytes);
    decoded.into_owned()
}
