//! NFL fantasy data CLI
//!
//! Each pipeline stage is a subcommand; `pipeline` runs them all.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nfl_fantasy::{
    error::Result,
    models::Config,
    pipeline,
    services::{FantasyService, Fetcher},
    storage::SqliteStorage,
};

/// NFL statistics scraper and fantasy points calculator
#[derive(Parser, Debug)]
#[command(name = "nfl-fantasy", version, about = "NFL data pipeline")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the database path from the configuration
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Season to process (repeatable, default: configured seasons)
    #[arg(short, long = "season", global = true)]
    seasons: Vec<i32>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema
    Init,

    /// Extract and store the 32 teams
    Teams,

    /// Extract and store season schedules
    Games,

    /// Extract and store team rosters
    Players,

    /// Extract season totals from the league leaderboards
    SeasonStats,

    /// Extract boxscore statistics for completed games
    Stats,

    /// Calculate fantasy points for new player-games
    Fantasy {
        /// Recompute and replace every stored total
        #[arg(long)]
        recalculate: bool,
    },

    /// Run all stages: teams → games → players → season totals → stats → fantasy
    Pipeline,

    /// Validate configuration and report database completeness
    Validate,

    /// Show the season's top fantasy performers
    Top {
        /// Restrict to one position (QB, RB, WR, TE, ...)
        #[arg(short, long)]
        position: Option<String>,

        /// Number of players to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env_overrides();
    if let Some(database) = cli.database {
        config.storage.database = database;
    }
    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    let seasons = if cli.seasons.is_empty() {
        config.season.seasons.clone()
    } else {
        cli.seasons
    };

    let mut storage = SqliteStorage::open(&config.storage.database)?;
    log::info!("Using database {}", config.storage.database.display());

    match cli.command {
        Command::Init => {
            storage.initialize_schema()?;
        }

        Command::Teams => {
            let mut fetcher = Fetcher::from_config(&config)?;
            pipeline::run_teams(&config, &mut fetcher, &mut storage)?;
        }

        Command::Games => {
            let mut fetcher = Fetcher::from_config(&config)?;
            pipeline::run_games(&config, &mut fetcher, &mut storage, &seasons)?;
        }

        Command::Players => {
            let mut fetcher = Fetcher::from_config(&config)?;
            pipeline::run_players(&config, &mut fetcher, &mut storage, &seasons)?;
        }

        Command::SeasonStats => {
            let mut fetcher = Fetcher::from_config(&config)?;
            pipeline::run_season_stats(&config, &mut fetcher, &mut storage, &seasons)?;
        }

        Command::Stats => {
            let mut fetcher = Fetcher::from_config(&config)?;
            pipeline::run_stats(&config, &mut fetcher, &mut storage, &seasons)?;
        }

        Command::Fantasy { recalculate } => {
            if recalculate {
                let mut service = FantasyService::new(
                    &mut storage,
                    config.scoring.clone(),
                    config.storage.batch_size,
                );
                for &season in &seasons {
                    let run = service.recalculate(Some(season))?;
                    log::info!(
                        "Season {}: {} pairs, {} stored, {} zero, {} failed",
                        season,
                        run.pairs,
                        run.stored,
                        run.zero_totals,
                        run.failed
                    );
                }
            } else {
                pipeline::run_fantasy(&config, &mut storage, &seasons)?;
            }
        }

        Command::Pipeline => {
            let mut fetcher = Fetcher::from_config(&config)?;
            pipeline::run_pipeline(&config, &mut fetcher, &mut storage, &seasons)?;
            log::info!("Pipeline complete!");
        }

        Command::Validate => {
            let report = pipeline::run_validate(&config, &storage)?;
            if report.is_complete() {
                log::info!("All validations passed!");
            } else {
                log::warn!("Database is incomplete, run the pipeline first");
            }
        }

        Command::Top { position, limit } => {
            let service =
                FantasyService::new(&mut storage, config.scoring.clone(), config.storage.batch_size);
            for &season in &seasons {
                let top = service.top_performers(position.as_deref(), Some(season), limit)?;
                nfl_fantasy::utils::log::header(&format!("Top performers {season}"));
                for (rank, p) in top.iter().enumerate() {
                    log::info!(
                        "{:>3}. {:<25} {:<3} {:>3} games  {:>7.2} total  {:>6.2} avg  {:>6.2} best",
                        rank + 1,
                        p.name,
                        p.position,
                        p.games_played,
                        p.total_fantasy_points,
                        p.avg_fantasy_points,
                        p.best_game
                    );
                }
            }
        }
    }

    Ok(())
}
