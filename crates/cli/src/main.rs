//! clan-sync — roster and war-log sync for tracked clans
//!
//! Usage:
//!   clan-sync sync 2PPYLVLL            — sync one clan by tag (without #)
//!   clan-sync sync                     — sync every clan already in the store
//!   clan-sync report 2PPYLVLL          — per-player stats for one clan

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use engine::{metrics, sync_all, SyncConfig};
use persistence::repository::{ClanRepository, PlayerRecord, PlayerRepository, WarRepository};
use persistence::Database;
use std::path::PathBuf;
use tracing::{info, warn};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "clan-sync")]
#[command(about = "Clan roster and war-log sync with per-player stats", long_about = None)]
#[command(version = APP_VERSION)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull roster and warlog from the remote API and reconcile the store
    Sync {
        /// Clan tag without # (default: every clan already in the store)
        clan_tag: Option<String>,
        /// Ignore cached payloads and re-fetch everything
        #[arg(long)]
        no_cache: bool,
    },
    /// Print per-player derived stats
    Report {
        /// Clan tag without # (default: every known player)
        clan_tag: Option<String>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,clan_sync=debug")
    } else {
        EnvFilter::new("info,engine=info,clan_sync=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

async fn open_db() -> anyhow::Result<Database> {
    let db_path = env_or("CLAN_SYNC_DB_PATH", "data/clans.db");
    let db = Database::new(&db_path)
        .await
        .with_context(|| format!("Failed to open database at {db_path}"))?;
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Sync { clan_tag, no_cache } => cmd_sync(clan_tag, no_cache).await?,
        Commands::Report { clan_tag, json } => cmd_report(clan_tag, json).await?,
    }

    Ok(())
}

// ============================================================================
// Sync command
// ============================================================================

async fn cmd_sync(clan_tag: Option<String>, no_cache: bool) -> anyhow::Result<()> {
    let api_token =
        std::env::var("ROYALE_API_TOKEN").context("ROYALE_API_TOKEN is not set")?;

    let config = SyncConfig {
        api_token,
        base_url: env_or("ROYALE_API_URL", engine::DEFAULT_BASE_URL),
        cache_dir: PathBuf::from(env_or("CLAN_SYNC_CACHE_DIR", ".cache")),
        use_cache: !no_cache,
    };

    let db = open_db().await?;

    let tags: Vec<String> = match clan_tag {
        Some(tag) => vec![tag.trim_start_matches('#').to_string()],
        None => {
            let clans = ClanRepository::new(db.pool()).all().await?;
            if clans.is_empty() {
                warn!("No clans in the store yet; pass a clan tag to add one");
                return Ok(());
            }
            clans.into_iter().map(|c| c.tag).collect()
        }
    };

    info!(clans = tags.len(), "Starting sync run");
    let (summaries, failures) = sync_all(db.pool(), &config, &tags).await;

    for summary in &summaries {
        println!(
            "{}: {} members ({} departed), {} wars, {} new war stats",
            summary.clan_tag, summary.members, summary.departed, summary.wars,
            summary.new_war_stats
        );
    }

    if !failures.is_empty() {
        for (tag, err) in &failures {
            eprintln!("{tag}: {err}");
        }
        anyhow::bail!("{} of {} clan(s) failed to sync", failures.len(), tags.len());
    }

    Ok(())
}

// ============================================================================
// Report command
// ============================================================================

fn fmt_ratio(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}%"))
}

fn fmt_decimal(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

async fn cmd_report(clan_tag: Option<String>, json: bool) -> anyhow::Result<()> {
    let db = open_db().await?;
    let clans = ClanRepository::new(db.pool());
    let players = PlayerRepository::new(db.pool());
    let wars = WarRepository::new(db.pool());

    let roster: Vec<PlayerRecord> = match clan_tag {
        Some(tag) => {
            let tag = tag.trim_start_matches('#');
            let clan = clans
                .get_by_tag(tag)
                .await?
                .with_context(|| format!("Unknown clan tag {tag}"))?;
            players.list_by_clan(clan.id).await?
        }
        None => players.list_all().await?,
    };

    let now = Utc::now();
    let mut reports = Vec::with_capacity(roster.len());
    for player in &roster {
        let stats = wars.stats_for_player(player.id).await?;
        reports.push(metrics::build_report(player, &stats, now));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!(
        "{:<18} {:<10} {:>4} {:>8} {:>5} {:>7} {:>6} {:>5} {:>6} {:>5} {:>8}",
        "name", "role", "rank", "trophies", "win", "collect", "misses", "wars", "dons", "idle",
        "age"
    );
    for r in &reports {
        println!(
            "{:<18} {:<10} {:>4} {:>8} {:>5} {:>7} {:>6} {:>5} {:>6} {:>5} {:>8}",
            r.name,
            r.role,
            r.clan_rank.map_or_else(|| "-".to_string(), |v| v.to_string()),
            r.trophies,
            fmt_ratio(r.win_ratio),
            fmt_decimal(r.collect_ratio),
            r.total_misses,
            r.war_count,
            r.donation_ratio,
            r.idle_days,
            r.age_label,
        );
    }

    Ok(())
}
