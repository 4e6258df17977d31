//! # comici-dl
//!
//! Browse and download episodes from comic sites running the Comici viewer.
//!
//! ## Architecture
//!
//! A download flows through a short pipeline:
//!
//! ```text
//! Probe → Listing → Resolver → Pool (fetch → descramble → encode) → Sink
//! ```
//!
//! - [`site`]: protocol detection and the per-run [`Session`](site::Session)
//! - [`listing`]: paged series, episode and bookshelf listings
//! - [`resolver`]: episode identifiers to signed page URLs
//! - [`descramble`]: tile reassembly of scrambled page images
//! - [`download`]: bounded page pool and loose or `.cbz` output
//!
//! ## Quick Start
//!
//! ```bash
//! # Point at a site and log in with a Cookie-Editor export
//! comici-dl config set --host comic-growl.com --cookie-file cookies.json
//!
//! # List the readable episodes of a series
//! comici-dl episodes https://comic-growl.com/series/0123456789abc
//!
//! # Download one episode into a .cbz
//! comici-dl download-episode 0123456789abc --cbz --save-dir comics
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the HTTP
/// fetcher and the detected site session.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration file and cookie import.
///
/// Loads from `~/.config/comici-dl/config.toml`.
pub mod config;

/// Tile reassembly for scrambled page images.
pub mod descramble;

/// Core domain models.
///
/// - [`SeriesSummary`](domain::SeriesSummary) and [`EpisodeRef`](domain::EpisodeRef): listing entries
/// - [`BookInfo`](domain::BookInfo) and [`EpisodeInfo`](domain::EpisodeInfo): viewer metadata
/// - [`ContentPage`](domain::ContentPage): one signed, scrambled page
pub mod domain;

/// Episode and series downloads.
pub mod download;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait over page and image requests
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Paged listings for both site generations.
pub mod listing;

/// Episode identifiers, viewer handles and signed page URLs.
pub mod resolver;

/// Site generation detection and shared session state.
pub mod site;
