//! Reconciler — brings local rows in line with a fetched remote snapshot
//!
//! Roster reconciliation runs first and is authoritative on every sync:
//! remote attributes overwrite local ones, and active members missing from
//! the snapshot are marked departed. Warlog reconciliation runs second (it
//! needs the updated player-to-clan mapping) and is authoritative only on
//! first observation: wars and war stats are append-only historical facts.

use chrono::{DateTime, Utc};
use persistence::repository::{
    ClanRecord, Membership, PlayerRecord, PlayerRepository, RosterEntry, WarRepository,
};
use persistence::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::aggregator::WarBatch;
use crate::types::{Member, MemberList, WarLog};
use crate::SyncResult;

/// Result of one roster reconciliation pass
pub struct RosterOutcome {
    /// Players touched by this sync so far, by tag. Starts as the active
    /// roster; warlog reconciliation adds participants as it meets them.
    pub players: HashMap<String, PlayerRecord>,
    /// Number of members marked departed
    pub departed: u64,
}

fn roster_entry(member: &Member) -> RosterEntry {
    RosterEntry {
        tag: member.tag.clone(),
        name: member.name.clone(),
        role: member.role.clone(),
        clan_rank: member.clan_rank,
        trophies: member.trophies,
        donations: member.donations,
        donations_received: member.donations_received,
        exp_level: member.exp_level,
        last_seen: Some(member.last_seen),
    }
}

/// Upsert every remote roster member, then mark the leftovers departed
pub async fn reconcile_roster(
    pool: &SqlitePool,
    clan: &ClanRecord,
    roster: &MemberList,
    observed_at: DateTime<Utc>,
) -> SyncResult<RosterOutcome> {
    let repo = PlayerRepository::new(pool);
    let mut players = HashMap::new();

    for member in &roster.items {
        let record = repo
            .upsert_member(clan.id, &roster_entry(member), observed_at)
            .await?;
        players.insert(record.tag.clone(), record);
    }

    let tags: Vec<String> = players.keys().cloned().collect();
    let departed = repo.mark_departed_except(clan.id, &tags).await?;
    if departed > 0 {
        info!(clan = %clan.tag, departed, "Members left since last sync");
    }

    Ok(RosterOutcome { players, departed })
}

/// Walk the fetched war log: create unseen wars, create or demote
/// participants unknown to the roster, insert first-observation war stats,
/// and feed every observation into the batch accumulator.
///
/// Returns the number of war_stats rows actually inserted.
pub async fn reconcile_warlog(
    pool: &SqlitePool,
    clan: &ClanRecord,
    warlog: &WarLog,
    players: &mut HashMap<String, PlayerRecord>,
    batch: &mut WarBatch,
) -> SyncResult<usize> {
    let player_repo = PlayerRepository::new(pool);
    let war_repo = WarRepository::new(pool);
    let mut inserted = 0;

    for entry in &warlog.items {
        let war = war_repo
            .get_or_create(entry.season_id, entry.created_date.date_naive(), clan.id)
            .await?;
        debug!(season = war.season_id, date = %war.created_date, "Processing war");

        for participant in &entry.participants {
            if !players.contains_key(&participant.tag) {
                let record = match player_repo.get_by_tag(&participant.tag).await? {
                    None => {
                        player_repo
                            .insert_warlog_only(
                                &participant.tag,
                                &participant.name,
                                entry.created_date,
                            )
                            .await?
                    }
                    Some(existing) if existing.status() == Membership::Active => {
                        // Active in another tracked clan; leave its roster state alone
                        existing
                    }
                    Some(existing) => {
                        // Used to be a member, now known only from war history
                        player_repo.demote_to_warlog_only(&existing.tag).await?;
                        player_repo
                            .get_by_tag(&existing.tag)
                            .await?
                            .unwrap_or(existing)
                    }
                };
                players.insert(record.tag.clone(), record);
            }

            let player = &players[&participant.tag];
            if war_repo
                .insert_stats_if_absent(
                    player.id,
                    war.id,
                    participant.number_of_battles,
                    participant.battles_played,
                    participant.wins,
                    participant.collection_day_battles_played,
                )
                .await?
            {
                inserted += 1;
            }

            batch.record(
                &participant.tag,
                entry.created_date,
                participant.number_of_battles,
                participant.battles_played,
            );
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{WarLogEntry, WarParticipant};
    use chrono::TimeZone;
    use persistence::repository::ClanRepository;
    use persistence::Database;

    fn member(tag: &str, rank: i64) -> Member {
        Member {
            tag: tag.to_string(),
            name: format!("player {tag}"),
            role: "member".to_string(),
            clan_rank: rank,
            donations: 100,
            donations_received: 50,
            exp_level: 12,
            trophies: 4500,
            last_seen: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    fn participant(tag: &str, battles: i64, played: i64) -> WarParticipant {
        WarParticipant {
            tag: tag.to_string(),
            name: format!("player {tag}"),
            number_of_battles: battles,
            battles_played: played,
            wins: played.min(3),
            collection_day_battles_played: 3,
        }
    }

    fn warlog(entries: Vec<WarLogEntry>) -> WarLog {
        WarLog { items: entries }
    }

    fn war_entry(season: i64, day: u32, participants: Vec<WarParticipant>) -> WarLogEntry {
        WarLogEntry {
            season_id: season,
            created_date: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
            participants,
        }
    }

    async fn setup() -> (Database, ClanRecord) {
        let db = Database::in_memory().await.unwrap();
        let clan = ClanRepository::new(db.pool())
            .get_or_create("2PP")
            .await
            .unwrap();
        (db, clan)
    }

    #[tokio::test]
    async fn roster_sync_is_idempotent() {
        let (db, clan) = setup().await;
        let roster = MemberList {
            items: vec![member("AAA", 1), member("BBB", 2)],
        };
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();

        let first = reconcile_roster(db.pool(), &clan, &roster, t0).await.unwrap();
        let second = reconcile_roster(db.pool(), &clan, &roster, t1).await.unwrap();

        assert_eq!(second.departed, 0);
        for tag in ["AAA", "BBB"] {
            let a = &first.players[tag];
            let b = &second.players[tag];
            assert_eq!(a.id, b.id);
            assert_eq!(a.created_at, b.created_at, "created_at must not move");
            assert_eq!(a.trophies, b.trophies);
        }
    }

    #[tokio::test]
    async fn departed_member_loses_clan_fields() {
        let (db, clan) = setup().await;
        let now = Utc::now();

        let full = MemberList {
            items: vec![member("AAA", 1), member("BBB", 2)],
        };
        reconcile_roster(db.pool(), &clan, &full, now).await.unwrap();

        let shrunk = MemberList {
            items: vec![member("AAA", 1)],
        };
        let outcome = reconcile_roster(db.pool(), &clan, &shrunk, now).await.unwrap();
        assert_eq!(outcome.departed, 1);

        let gone = PlayerRepository::new(db.pool())
            .get_by_tag("BBB")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(gone.status(), Membership::Departed);
        assert_eq!(gone.clan_id, None);
        assert_eq!(gone.role, "");
        assert_eq!(gone.clan_rank, None);
    }

    #[tokio::test]
    async fn unknown_participant_becomes_warlog_only() {
        let (db, clan) = setup().await;
        let mut players = HashMap::new();
        let mut batch = WarBatch::new();

        let log = warlog(vec![war_entry(42, 4, vec![participant("ZZZ", 10, 8)])]);
        let inserted = reconcile_warlog(db.pool(), &clan, &log, &mut players, &mut batch)
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let stranger = &players["ZZZ"];
        assert_eq!(stranger.status(), Membership::WarlogOnly);
        assert_eq!(stranger.clan_id, None);
        assert_eq!(stranger.name, "player ZZZ");
    }

    #[tokio::test]
    async fn former_member_in_warlog_is_demoted() {
        let (db, clan) = setup().await;
        let now = Utc::now();

        // AAA joins, then leaves
        let full = MemberList { items: vec![member("AAA", 1)] };
        reconcile_roster(db.pool(), &clan, &full, now).await.unwrap();
        let mut outcome = reconcile_roster(db.pool(), &clan, &MemberList { items: vec![] }, now)
            .await
            .unwrap();

        let log = warlog(vec![war_entry(42, 4, vec![participant("AAA", 10, 10)])]);
        reconcile_warlog(db.pool(), &clan, &log, &mut outcome.players, &mut empty_batch())
            .await
            .unwrap();

        let demoted = PlayerRepository::new(db.pool())
            .get_by_tag("AAA")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(demoted.status(), Membership::WarlogOnly);
        assert_eq!(demoted.clan_id, None);
    }

    fn empty_batch() -> WarBatch {
        WarBatch::new()
    }

    #[tokio::test]
    async fn warlog_sync_is_idempotent_and_first_write_wins() {
        let (db, clan) = setup().await;
        let mut players = HashMap::new();

        let log = warlog(vec![war_entry(42, 4, vec![participant("AAA", 10, 8)])]);
        let first = reconcile_warlog(db.pool(), &clan, &log, &mut players, &mut empty_batch())
            .await
            .unwrap();
        assert_eq!(first, 1);

        // Same war, different numbers: no new rows, stored stats untouched
        let changed = warlog(vec![war_entry(42, 4, vec![participant("AAA", 10, 10)])]);
        let second = reconcile_warlog(db.pool(), &clan, &changed, &mut players, &mut empty_batch())
            .await
            .unwrap();
        assert_eq!(second, 0);

        let stats = WarRepository::new(db.pool())
            .stats_for_player(players["AAA"].id)
            .await
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].battles_played, 8);
    }
}
