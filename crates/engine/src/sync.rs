//! Sync orchestration
//!
//! One run processes clans sequentially: fetch members, fetch warlog,
//! reconcile roster, reconcile warlog, apply batch totals. A failure aborts
//! the clan being processed but not the run; remaining clans still sync.

use chrono::Utc;
use persistence::repository::ClanRepository;
use persistence::SqlitePool;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::aggregator::{apply_totals, WarBatch};
use crate::api::{Resource, RoyaleClient};
use crate::cache::PayloadCache;
use crate::reconciler::{reconcile_roster, reconcile_warlog};
use crate::types::{parse_members, parse_warlog};
use crate::{SyncError, SyncResult};

/// Explicit configuration for a sync run; no ambient settings
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_token: String,
    pub base_url: String,
    pub cache_dir: PathBuf,
    /// When false, cached payloads are ignored and everything is re-fetched
    pub use_cache: bool,
}

/// What one clan's sync did
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub clan_tag: String,
    pub members: usize,
    pub departed: u64,
    pub wars: usize,
    pub new_war_stats: usize,
    pub players_updated: usize,
}

async fn fetch_payload(
    client: &RoyaleClient,
    cache: &PayloadCache,
    use_cache: bool,
    clan_tag: &str,
    resource: Resource,
) -> SyncResult<String> {
    if use_cache {
        if let Some(body) = cache.load(clan_tag, resource) {
            debug!(clan_tag, resource = resource.as_str(), "Using cached payload");
            return Ok(body);
        }
    }

    debug!(clan_tag, resource = resource.as_str(), "Downloading payload");
    let body = client.fetch(clan_tag, resource).await?;
    cache.store(clan_tag, resource, &body)?;
    Ok(body)
}

/// Sync a single clan end to end
pub async fn sync_clan(
    pool: &SqlitePool,
    client: &RoyaleClient,
    cache: &PayloadCache,
    use_cache: bool,
    clan_tag: &str,
) -> SyncResult<SyncSummary> {
    let clan = ClanRepository::new(pool).get_or_create(clan_tag).await?;
    info!(clan = %clan.tag, "Syncing clan");

    let members_raw = fetch_payload(client, cache, use_cache, clan_tag, Resource::Members).await?;
    let warlog_raw = fetch_payload(client, cache, use_cache, clan_tag, Resource::Warlog).await?;

    let roster = parse_members(&members_raw)?;
    let warlog = parse_warlog(&warlog_raw)?;

    // Roster first: warlog reconciliation relies on the fresh
    // player-to-clan mapping to tell active from departed participants
    let mut outcome = reconcile_roster(pool, &clan, &roster, Utc::now()).await?;

    let mut batch = WarBatch::new();
    let new_war_stats =
        reconcile_warlog(pool, &clan, &warlog, &mut outcome.players, &mut batch).await?;
    let players_updated = apply_totals(pool, &batch, &outcome.players).await?;

    let summary = SyncSummary {
        clan_tag: clan.tag,
        members: roster.items.len(),
        departed: outcome.departed,
        wars: warlog.items.len(),
        new_war_stats,
        players_updated,
    };
    info!(
        clan = %summary.clan_tag,
        members = summary.members,
        wars = summary.wars,
        new_war_stats = summary.new_war_stats,
        "Clan sync complete"
    );

    Ok(summary)
}

/// Sync a list of clans sequentially.
///
/// Failures are isolated per clan: a clan whose fetch or reconciliation
/// fails is reported and skipped, and the loop continues.
pub async fn sync_all(
    pool: &SqlitePool,
    config: &SyncConfig,
    clan_tags: &[String],
) -> (Vec<SyncSummary>, Vec<(String, SyncError)>) {
    let client = RoyaleClient::new(&config.base_url, &config.api_token);
    let cache = PayloadCache::new(&config.cache_dir);

    let mut summaries = Vec::new();
    let mut failures = Vec::new();

    for tag in clan_tags {
        match sync_clan(pool, &client, &cache, config.use_cache, tag).await {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                error!(clan = %tag, error = %e, "Clan sync failed, continuing with next clan");
                failures.push((tag.clone(), e));
            }
        }
    }

    (summaries, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::repository::{PlayerRepository, WarRepository};
    use persistence::Database;

    const MEMBERS: &str = r##"{
        "items": [
            {"tag": "#AAA", "name": "alice", "role": "leader", "clanRank": 1,
             "donations": 120, "donationsReceived": 40, "expLevel": 13,
             "trophies": 5200, "lastSeen": "20240310T120000.000Z"},
            {"tag": "#BBB", "name": "bob", "role": "member", "clanRank": 2,
             "donations": 20, "donationsReceived": 90, "expLevel": 11,
             "trophies": 4100, "lastSeen": "20240309T080000.000Z"}
        ]
    }"##;

    const WARLOG: &str = r##"{
        "items": [
            {"seasonId": 42, "createdDate": "20240304T090000.000Z", "participants": [
                {"tag": "#AAA", "name": "alice", "numberOfBattles": 10,
                 "battlesPlayed": 8, "wins": 5, "collectionDayBattlesPlayed": 3},
                {"tag": "#ZZZ", "name": "zed", "numberOfBattles": 10,
                 "battlesPlayed": 10, "wins": 7, "collectionDayBattlesPlayed": 3}
            ]},
            {"seasonId": 42, "createdDate": "20240306T090000.000Z", "participants": [
                {"tag": "#AAA", "name": "alice", "numberOfBattles": 10,
                 "battlesPlayed": 9, "wins": 6, "collectionDayBattlesPlayed": 2}
            ]}
        ]
    }"##;

    fn offline_setup(dir: &std::path::Path) -> (RoyaleClient, PayloadCache) {
        let cache = PayloadCache::new(dir);
        cache.store("2PP", Resource::Members, MEMBERS).unwrap();
        cache.store("2PP", Resource::Warlog, WARLOG).unwrap();
        // Unroutable base URL: every payload must come from the cache
        let client = RoyaleClient::new("http://127.0.0.1:9", "test-token");
        (client, cache)
    }

    #[tokio::test]
    async fn full_sync_from_cached_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().await.unwrap();
        let (client, cache) = offline_setup(dir.path());

        let summary = sync_clan(db.pool(), &client, &cache, true, "2PP").await.unwrap();
        assert_eq!(summary.members, 2);
        assert_eq!(summary.wars, 2);
        assert_eq!(summary.new_war_stats, 3);
        assert_eq!(summary.players_updated, 2); // AAA and ZZZ fought, BBB did not

        let players = PlayerRepository::new(db.pool());
        let alice = players.get_by_tag("#AAA").await.unwrap().unwrap();
        assert_eq!(alice.war_count, 2);
        assert_eq!(alice.war_misses, 3);
        // created_at pulled back to the earliest war touching her
        assert_eq!(
            alice.created_at,
            crate::types::game_time::parse("20240304T090000.000Z").unwrap()
        );
        // last_seen from the roster is later than any war date and wins
        assert_eq!(
            alice.last_seen,
            Some(crate::types::game_time::parse("20240310T120000.000Z").unwrap())
        );
    }

    #[tokio::test]
    async fn second_identical_sync_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().await.unwrap();
        let (client, cache) = offline_setup(dir.path());

        sync_clan(db.pool(), &client, &cache, true, "2PP").await.unwrap();
        let players = PlayerRepository::new(db.pool());
        let before = players.list_all().await.unwrap();

        let summary = sync_clan(db.pool(), &client, &cache, true, "2PP").await.unwrap();
        assert_eq!(summary.new_war_stats, 0);
        assert_eq!(summary.departed, 0);

        let after = players.list_all().await.unwrap();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.created_at, b.created_at, "created_at drifted for {}", a.tag);
            assert_eq!(a.war_misses, b.war_misses);
            assert_eq!(a.war_count, b.war_count);
            assert_eq!(a.trophies, b.trophies);
        }

        let alice = players.get_by_tag("#AAA").await.unwrap().unwrap();
        let stats = WarRepository::new(db.pool())
            .stats_for_player(alice.id)
            .await
            .unwrap();
        assert_eq!(stats.len(), 2);
    }

    #[tokio::test]
    async fn malformed_cached_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().await.unwrap();
        let cache = PayloadCache::new(dir.path());
        cache.store("2PP", Resource::Members, r#"{"items": "nope"}"#).unwrap();
        cache.store("2PP", Resource::Warlog, WARLOG).unwrap();
        let client = RoyaleClient::new("http://127.0.0.1:9", "test-token");

        let err = sync_clan(db.pool(), &client, &cache, true, "2PP")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::MalformedPayload { resource: "members", .. }
        ));
    }

    #[tokio::test]
    async fn sync_all_isolates_per_clan_failures() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().await.unwrap();
        // 2PP has cached payloads; BAD has none and the API is unreachable
        let _ = offline_setup(dir.path());

        let config = SyncConfig {
            api_token: "test-token".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            cache_dir: dir.path().to_path_buf(),
            use_cache: true,
        };

        let tags = vec!["BAD".to_string(), "2PP".to_string()];
        let (summaries, failures) = sync_all(db.pool(), &config, &tags).await;

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].clan_tag, "2PP");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "BAD");
    }
}
