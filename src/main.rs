//! # jpgov_bitext
//!
//! Builds a Japanese–English parallel corpus from the press releases of four
//! Japanese government websites: the Financial Services Agency, the Prime
//! Minister's Office (Kantei), the Ministry of Economy, Trade and Industry and
//! the Ministry of Finance.
//!
//! ## Usage
//!
//! ```sh
//! jpgov_bitext fsa download 202301 fsa.tsv --html-directory html/fsa
//! jpgov_bitext fsa extract fsa.tsv fsa.json -d html/fsa
//! ```
//!
//! ## Architecture
//!
//! Every site runs in two stages:
//! 1. **Download**: discover English releases from the site's indexes, cache
//!    each English page and its Japanese original, write a TSV index
//! 2. **Extract**: for each TSV row, cut both pages into paragraphs, keep the
//!    pair only if the paragraphs align one-to-one, date it from the Japanese
//!    page, and write all accepted pairs as one JSON array

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod dates;
mod dom;
mod error;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod segment;
mod utils;
mod validate;

use cli::{CacheArgs, Cli, ExtractArgs, FsaStage, KanteiStage, MetiStage, MofStage, SiteCommand};
use fetch::Fetcher;
use models::{MetadataRow, Site};
use outputs::tsv;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    // Logs go to stderr; stdout is reserved for `kantei uris`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    match args.site {
        SiteCommand::Fsa { stage } => match stage {
            FsaStage::Download(stage) => {
                let fetcher = prepare_cache(&stage.cache, &args.user_agent).await?;
                let rows = scrapers::fsa::download(&fetcher, &stage).await?;
                write_index(&stage.output_tsv, &rows)?;
            }
            FsaStage::Extract(stage) => extract(Site::Fsa, &stage).await?,
        },
        SiteCommand::Kantei { stage } => match stage {
            KanteiStage::Uris(stage) => {
                let uris = scrapers::kantei::collect_uris(&stage.index_directory).await?;
                scrapers::kantei::write_uri_list(&uris, stage.output.as_deref()).await?;
            }
            KanteiStage::Download(stage) => {
                let fetcher = prepare_cache(&stage.cache, &args.user_agent).await?;
                let rows = scrapers::kantei::download(&fetcher, &stage).await?;
                write_index(&stage.output_tsv, &rows)?;
            }
            KanteiStage::Extract(stage) => extract(Site::Kantei, &stage).await?,
        },
        SiteCommand::Meti { stage } => match stage {
            MetiStage::Download(stage) => {
                let fetcher = prepare_cache(&stage.cache, &args.user_agent).await?;
                let rows = scrapers::meti::download(&fetcher, &stage).await?;
                write_index(&stage.output_tsv, &rows)?;
            }
            MetiStage::Extract(stage) => extract(Site::Meti, &stage).await?,
        },
        SiteCommand::Mof { stage } => match stage {
            MofStage::Download(stage) => {
                let fetcher = prepare_cache(&stage.cache, &args.user_agent).await?;
                let rows = scrapers::mof::download(&fetcher, &stage).await?;
                write_index(&stage.output_tsv, &rows)?;
            }
            MofStage::Extract(stage) => extract(Site::Mof, &stage).await?,
        },
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Checks the cache directory before any request is made, then builds the
/// shared HTTP client.
async fn prepare_cache(cache: &CacheArgs, user_agent: &str) -> Result<Fetcher, Box<dyn Error>> {
    if let Err(e) = ensure_writable_dir(&cache.html_directory).await {
        error!(
            path = %cache.html_directory.display(),
            error = %e,
            "HTML cache directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    info!(delay = ?cache.delay, "Fetching with polite delay");
    Ok(Fetcher::new(user_agent, cache.delay)?)
}

fn write_index(path: &Path, rows: &[MetadataRow]) -> Result<(), Box<dyn Error>> {
    if let Err(e) = tsv::write_metadata(path, rows) {
        error!(path = %path.display(), error = %e, "Failed to write TSV index");
        return Err(e.into());
    }
    Ok(())
}

async fn extract(site: Site, stage: &ExtractArgs) -> Result<(), Box<dyn Error>> {
    let accepted = pipeline::run_extract(
        site,
        &stage.input_tsv,
        &stage.output_json,
        &stage.html_directory,
    )
    .await?;
    info!(%site, accepted, output = %stage.output_json.display(), "Wrote aligned pairs");
    Ok(())
}
