use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use comici_dl::app::AppContext;
use comici_dl::cli::{commands, Cli, Commands};
use comici_dl::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let import = cli.cookie_import();
    if let Commands::Config { action } = cli.command {
        commands::config(cli.config.as_deref(), action)?;
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let ctx = AppContext::connect(&config, cli.cookies.as_deref(), import).await?;

    match cli.command {
        Commands::Search {
            keyword,
            filter,
            page,
            size,
        } => {
            commands::search(&ctx, &keyword, filter, page, size).await?;
        }
        Commands::SeriesList { sort, page } => {
            commands::series_list(&ctx, sort, page).await?;
        }
        Commands::Author { author_id, page } => {
            commands::author(&ctx, &author_id, page).await?;
        }
        Commands::Bookshelf { kind, page } => {
            commands::bookshelf(&ctx, kind, page).await?;
        }
        Commands::Episodes {
            series,
            sort,
            page,
            limit,
            all,
        } => {
            commands::episodes(&ctx, &series, sort, page, limit, all).await?;
        }
        Commands::DetailedEpisodes { episode } => {
            commands::detailed_episodes(&ctx, &episode).await?;
        }
        Commands::DownloadEpisode {
            episode,
            page_from,
            page_to,
            output,
        } => {
            commands::download_episode(&ctx, &episode, page_from, page_to, &output).await?;
        }
        Commands::DownloadSeries { series, output } => {
            commands::download_series(&ctx, &series, &output).await?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
