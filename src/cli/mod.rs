pub mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::CookieImport;
use crate::download::DEFAULT_WORKERS;
use crate::listing::{BookshelfKind, EpisodeSort, SearchFilter, SeriesSort};

#[derive(Parser)]
#[command(name = "comici-dl")]
#[command(about = "Browse and download from comic sites running the Comici viewer", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/comici-dl/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cookie-Editor JSON export to log in with
    #[arg(long, global = true)]
    pub cookies: Option<PathBuf>,

    /// Accept cookies that have already expired
    #[arg(long, global = true)]
    pub ignore_expired: bool,

    /// Accept cookies exported from a different domain than the host
    #[arg(long, global = true)]
    pub skip_domain_check: bool,

    /// Raise log verbosity to debug
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn cookie_import(&self) -> CookieImport {
        CookieImport {
            ignore_expired: self.ignore_expired,
            check_domain: !self.skip_domain_check,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search series, authors or episodes
    Search {
        keyword: String,
        #[arg(long, value_enum, default_value_t = SearchFilter::Series)]
        filter: SearchFilter,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 30)]
        size: u32,
    },
    /// List every series on the site
    SeriesList {
        #[arg(long, value_enum, default_value_t = SeriesSort::Updated)]
        sort: SeriesSort,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// List the series of one author
    Author {
        author_id: String,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Show your bookshelf (needs cookies)
    Bookshelf {
        #[arg(long, value_enum, default_value_t = BookshelfKind::All)]
        kind: BookshelfKind,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// List the episodes of a series
    Episodes {
        /// Series id (13 chars) or series URL
        series: String,
        #[arg(long, value_enum, default_value_t = EpisodeSort::OldestFirst)]
        sort: EpisodeSort,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 50)]
        limit: u32,
        /// Also show episodes this account cannot read
        #[arg(long)]
        all: bool,
    },
    /// Show metadata of every episode in the series an episode belongs to
    DetailedEpisodes {
        /// Episode id (13 chars), viewer id (32 chars) or episode URL
        episode: String,
    },
    /// Download one episode
    DownloadEpisode {
        /// Episode id (13 chars), viewer id (32 chars) or episode URL
        episode: String,
        /// First page, zero-based
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        page_from: i64,
        /// Last page; negative means the whole episode
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        page_to: i64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Download every readable episode of a series
    DownloadSeries {
        /// Series id (13 chars) or series URL
        series: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Read or change the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Directory to save into
    #[arg(long, default_value = ".")]
    pub save_dir: PathBuf,

    /// Pack each episode into a .cbz archive
    #[arg(long)]
    pub cbz: bool,

    /// Replace pages that already exist on disk
    #[arg(long)]
    pub overwrite: bool,

    /// Seconds to wait between page fetches
    #[arg(long, default_value = "0.5", value_parser = parse_wait_interval)]
    pub wait_interval: Duration,

    /// Save lossless WebP instead of PNG
    #[arg(long)]
    pub webp: bool,

    /// PNG compression level
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub compression: u8,

    /// Pages fetched and descrambled at once
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,
}

fn parse_wait_interval(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", raw))?;
    if secs < 0.0 {
        return Err("wait interval cannot be negative".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid wait interval: {}", e))
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Store settings in the config file
    Set {
        /// Cookie-Editor JSON export used when --cookies is not given
        #[arg(long)]
        cookie_file: Option<PathBuf>,
        #[arg(long)]
        proxy: Option<String>,
        #[arg(long)]
        user_agent: Option<String>,
        /// Any site powered by the Comici viewer
        #[arg(long)]
        host: Option<String>,
    },
    /// Delete the config file
    Reset,
    /// Print the config file
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_download_episode() {
        let cli = Cli::try_parse_from([
            "comici-dl",
            "download-episode",
            "abcdef1234567",
            "--page-to",
            "-1",
            "--cbz",
            "--compression",
            "9",
        ])
        .unwrap();
        match cli.command {
            Commands::DownloadEpisode {
                episode,
                page_to,
                output,
                ..
            } => {
                assert_eq!(episode, "abcdef1234567");
                assert_eq!(page_to, -1);
                assert!(output.cbz);
                assert_eq!(output.compression, 9);
                assert_eq!(output.workers, DEFAULT_WORKERS);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_cookie_import_flags() {
        let cli = Cli::try_parse_from(["comici-dl", "bookshelf"]).unwrap();
        let import = cli.cookie_import();
        assert!(import.check_domain);
        assert!(!import.ignore_expired);

        let cli = Cli::try_parse_from([
            "comici-dl",
            "bookshelf",
            "--skip-domain-check",
            "--ignore-expired",
        ])
        .unwrap();
        let import = cli.cookie_import();
        assert!(!import.check_domain);
        assert!(import.ignore_expired);
    }

    #[test]
    fn test_wait_interval_bounds() {
        assert_eq!(parse_wait_interval("0.5"), Ok(Duration::from_millis(500)));
        assert!(parse_wait_interval("-1").is_err());
        assert!(parse_wait_interval("inf").is_err());
        assert!(parse_wait_interval("NaN").is_err());
        assert!(parse_wait_interval("soon").is_err());

        let parsed = Cli::try_parse_from([
            "comici-dl",
            "download-series",
            "abcdef1234567",
            "--wait-interval",
            "inf",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_compression_out_of_range() {
        let parsed = Cli::try_parse_from([
            "comici-dl",
            "download-series",
            "abcdef1234567",
            "--compression",
            "12",
        ]);
        assert!(parsed.is_err());
    }
}
