//! Command-line interface definitions.
//!
//! Commands are nested as `<site> <stage>`: each site has a `download` stage
//! that fills the HTML cache and writes a TSV index, and an `extract` stage
//! that turns the TSV index plus the cache into aligned JSON records. Kantei
//! has an extra `uris` stage that lists press releases from saved index pages.
//!
//! # Examples
//!
//! ```sh
//! jpgov_bitext fsa download 202301 fsa.tsv --html-directory html/fsa
//! jpgov_bitext fsa extract fsa.tsv fsa.json -d html/fsa
//!
//! jpgov_bitext meti download 202301 202412 meti.tsv
//! jpgov_bitext mof download 202301 202412 mof.tsv --delay 2
//!
//! jpgov_bitext kantei uris saved_indices/ --output kantei_uris.txt
//! jpgov_bitext kantei download kantei_uris.txt kantei.tsv
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::DEFAULT_USER_AGENT;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// User-Agent header sent with every request
    #[arg(long, global = true, env = "JPGOV_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    #[command(subcommand)]
    pub site: SiteCommand,
}

#[derive(Subcommand, Debug)]
pub enum SiteCommand {
    /// Financial Services Agency (www.fsa.go.jp)
    Fsa {
        #[command(subcommand)]
        stage: FsaStage,
    },
    /// Prime Minister's Office of Japan (japan.kantei.go.jp)
    Kantei {
        #[command(subcommand)]
        stage: KanteiStage,
    },
    /// Ministry of Economy, Trade and Industry (www.meti.go.jp)
    Meti {
        #[command(subcommand)]
        stage: MetiStage,
    },
    /// Ministry of Finance (www.mof.go.jp)
    Mof {
        #[command(subcommand)]
        stage: MofStage,
    },
}

#[derive(Subcommand, Debug)]
pub enum FsaStage {
    /// Download press releases listed on the English news index
    Download(FsaDownloadArgs),
    /// Extract aligned paragraphs from downloaded pairs
    Extract(ExtractArgs),
}

#[derive(Subcommand, Debug)]
pub enum KanteiStage {
    /// List press release URIs found in saved index pages
    Uris(KanteiUrisArgs),
    /// Download listed English pages and their Japanese counterparts
    Download(KanteiDownloadArgs),
    /// Extract aligned paragraphs from downloaded pairs
    Extract(ExtractArgs),
}

#[derive(Subcommand, Debug)]
pub enum MetiStage {
    /// Download press releases from the monthly back-issue indexes
    Download(MetiDownloadArgs),
    /// Extract aligned paragraphs from downloaded pairs
    Extract(ExtractArgs),
}

#[derive(Subcommand, Debug)]
pub enum MofStage {
    /// Download press releases from the monthly "what's new" indexes
    Download(MofDownloadArgs),
    /// Extract aligned paragraphs from downloaded pairs
    Extract(ExtractArgs),
}

/// Options shared by every download stage.
#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    /// Directory holding the cached HTML pages
    #[arg(long, default_value = "html")]
    pub html_directory: PathBuf,

    /// Seconds to wait after every request
    #[arg(long, default_value = "1.0", value_parser = parse_delay)]
    pub delay: Duration,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// TSV index written by the download stage
    pub input_tsv: PathBuf,

    /// Output JSON file
    pub output_json: PathBuf,

    /// Directory holding the cached HTML pages
    #[arg(short = 'd', long, default_value = "html")]
    pub html_directory: PathBuf,
}

#[derive(Args, Debug)]
pub struct FsaDownloadArgs {
    /// Oldest release month to keep, as YYYYMM
    pub oldest_yearmonth: u32,

    /// Output TSV index
    pub output_tsv: PathBuf,

    #[command(flatten)]
    pub cache: CacheArgs,

    #[arg(long, default_value = "https://www.fsa.go.jp/")]
    pub base_uri: String,

    #[arg(long, default_value = "https://www.fsa.go.jp/en/news/index.html")]
    pub index_uri: String,

    /// Where the news index is cached
    #[arg(long, default_value = "index.html")]
    pub index_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct MetiDownloadArgs {
    /// First index month, as YYYYMM
    pub oldest_yearmonth: u32,

    /// Last index month, as YYYYMM
    pub newest_yearmonth: u32,

    /// Output TSV index
    pub output_tsv: PathBuf,

    #[command(flatten)]
    pub cache: CacheArgs,

    #[arg(long, default_value = "https://www.meti.go.jp/")]
    pub base_uri: String,

    /// Index URI prefix; `YYYYMM.html` is appended
    #[arg(long, default_value = "https://www.meti.go.jp/english/press/nBackIssue")]
    pub index_uri: String,

    /// Where the monthly indexes are cached
    #[arg(long, default_value = "indices")]
    pub index_directory: PathBuf,
}

#[derive(Args, Debug)]
pub struct MofDownloadArgs {
    /// First index month, as YYYYMM
    pub from_yearmonth: u32,

    /// Last index month, as YYYYMM
    pub to_yearmonth: u32,

    /// Output TSV index
    pub output_tsv: PathBuf,

    #[command(flatten)]
    pub cache: CacheArgs,

    /// Where the monthly indexes are cached
    #[arg(long, default_value = "indices")]
    pub index_directory: PathBuf,
}

#[derive(Args, Debug)]
pub struct KanteiUrisArgs {
    /// Directory of saved `*.html` index pages
    pub index_directory: PathBuf,

    /// Write the list here instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct KanteiDownloadArgs {
    /// File with one English press release URI per line
    pub uri_list: PathBuf,

    /// Output TSV index
    pub output_tsv: PathBuf,

    #[command(flatten)]
    pub cache: CacheArgs,
}

fn parse_delay(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid delay {s}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_extract_parsing() {
        let cli = Cli::parse_from([
            "jpgov_bitext",
            "fsa",
            "extract",
            "fsa.tsv",
            "fsa.json",
            "-d",
            "cache/fsa",
        ]);

        let SiteCommand::Fsa {
            stage: FsaStage::Extract(args),
        } = cli.site
        else {
            panic!("expected fsa extract");
        };
        assert_eq!(args.input_tsv, PathBuf::from("fsa.tsv"));
        assert_eq!(args.output_json, PathBuf::from("fsa.json"));
        assert_eq!(args.html_directory, PathBuf::from("cache/fsa"));
    }

    #[test]
    fn test_cli_download_defaults() {
        let cli = Cli::parse_from(["jpgov_bitext", "meti", "download", "202301", "202312", "meti.tsv"]);

        assert_eq!(cli.user_agent, DEFAULT_USER_AGENT);
        let SiteCommand::Meti {
            stage: MetiStage::Download(args),
        } = cli.site
        else {
            panic!("expected meti download");
        };
        assert_eq!(args.oldest_yearmonth, 202301);
        assert_eq!(args.newest_yearmonth, 202312);
        assert_eq!(args.cache.html_directory, PathBuf::from("html"));
        assert_eq!(args.cache.delay, Duration::from_secs(1));
        assert_eq!(args.index_directory, PathBuf::from("indices"));
        assert_eq!(args.index_uri, "https://www.meti.go.jp/english/press/nBackIssue");
    }

    #[test]
    fn test_cli_delay_and_user_agent() {
        let cli = Cli::parse_from([
            "jpgov_bitext",
            "mof",
            "download",
            "202401",
            "202402",
            "mof.tsv",
            "--delay",
            "0.5",
            "--user-agent",
            "corpus-bot/1.0",
        ]);

        assert_eq!(cli.user_agent, "corpus-bot/1.0");
        let SiteCommand::Mof {
            stage: MofStage::Download(args),
        } = cli.site
        else {
            panic!("expected mof download");
        };
        assert_eq!(args.cache.delay, Duration::from_millis(500));
    }

    #[test]
    fn test_cli_rejects_negative_delay() {
        let result = Cli::try_parse_from([
            "jpgov_bitext",
            "kantei",
            "download",
            "uris.txt",
            "kantei.tsv",
            "--delay",
            "-1",
        ]);
        assert!(result.is_err());
    }
}
