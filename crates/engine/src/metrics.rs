//! Derived per-player metrics
//!
//! All values are computed on read from the player row plus its loaded war
//! stats; nothing here is stored back. Ratios that are undefined (no battles,
//! no wars) come back as None and render as "-".

use chrono::{DateTime, Utc};
use persistence::repository::{PlayerRecord, WarStatsRecord};
use serde::Serialize;

/// Idle days reported when a player has never been seen
pub const IDLE_DAYS_UNKNOWN: i64 = 999;

/// 100 × total wins / total battles across all stored war stats.
/// None when the player has no recorded battles.
pub fn win_ratio(stats: &[WarStatsRecord]) -> Option<i64> {
    let battles: i64 = stats.iter().map(|s| s.number_of_battles).sum();
    if battles == 0 {
        return None;
    }
    let wins: i64 = stats.iter().map(|s| s.wins).sum();
    Some(100 * wins / battles)
}

/// Average collection-day battles per war, truncated to one decimal.
/// None when the player has no recorded wars.
pub fn collect_ratio(stats: &[WarStatsRecord]) -> Option<f64> {
    if stats.is_empty() {
        return None;
    }
    let collected: i64 = stats.iter().map(|s| s.collection_day_battles_played).sum();
    Some((10.0 * collected as f64 / stats.len() as f64).trunc() / 10.0)
}

/// Total battles handed to the player but never played
pub fn total_misses(stats: &[WarStatsRecord]) -> i64 {
    stats
        .iter()
        .map(|s| s.number_of_battles - s.battles_played)
        .sum()
}

/// Whole days since the player was last observed active
pub fn idle_days(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match last_seen {
        Some(seen) => (now - seen).num_days(),
        None => IDLE_DAYS_UNKNOWN,
    }
}

/// Account age in fractional days, truncated to one decimal
pub fn account_age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - created_at).num_seconds() as f64;
    (10.0 * seconds / 86_400.0).trunc() / 10.0
}

/// Short human label for account age: "12d", or "2d 5h" for fresh accounts
pub fn age_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now - created_at;
    let days = delta.num_days();
    if days > 3 {
        return format!("{days}d");
    }
    let hours = (delta.num_seconds() - days * 86_400) / 3600;
    format!("{days}d {hours}h")
}

/// Net donation balance; negative means the player receives more than they give
pub fn donation_ratio(donations: i64, donations_received: i64) -> i64 {
    donations - donations_received
}

/// Everything the report view needs for one player
#[derive(Debug, Clone, Serialize)]
pub struct PlayerReport {
    pub tag: String,
    pub name: String,
    pub membership: String,
    pub role: String,
    pub clan_rank: Option<i64>,
    pub trophies: i64,
    pub win_ratio: Option<i64>,
    pub collect_ratio: Option<f64>,
    pub total_misses: i64,
    pub war_count: i64,
    pub donation_ratio: i64,
    pub idle_days: i64,
    pub age_days: f64,
    pub age_label: String,
}

pub fn build_report(
    player: &PlayerRecord,
    stats: &[WarStatsRecord],
    now: DateTime<Utc>,
) -> PlayerReport {
    PlayerReport {
        tag: player.tag.clone(),
        name: player.name.clone(),
        membership: player.membership.clone(),
        role: player.role.clone(),
        clan_rank: player.clan_rank,
        trophies: player.trophies,
        win_ratio: win_ratio(stats),
        collect_ratio: collect_ratio(stats),
        total_misses: total_misses(stats),
        war_count: player.war_count,
        donation_ratio: donation_ratio(player.donations, player.donations_received),
        idle_days: idle_days(player.last_seen, now),
        age_days: account_age_days(player.created_at, now),
        age_label: age_label(player.created_at, now),
    }
}
