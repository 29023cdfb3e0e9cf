//! Rolling war totals per player
//!
//! One sync run folds every war observation in the fetched window into a
//! WarBatch, then writes the resulting totals back onto the player rows.
//! The counters deliberately reflect the fetched window only, not lifetime
//! totals: callers fetch a consistent window (the API returns the most
//! recent seasons) on every sync, so the rolling stats stay comparable.

use chrono::{DateTime, Utc};
use persistence::repository::{PlayerRecord, PlayerRepository};
use persistence::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::SyncResult;

/// Totals for one player across one batch of war entries
#[derive(Debug, Clone)]
pub struct PlayerWarTotals {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub misses: i64,
    pub war_count: i64,
}

/// Accumulator over all war observations of one sync run
#[derive(Debug, Default)]
pub struct WarBatch {
    totals: HashMap<String, PlayerWarTotals>,
}

impl WarBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one player's participation in one war entry
    pub fn record(
        &mut self,
        tag: &str,
        war_date: DateTime<Utc>,
        number_of_battles: i64,
        battles_played: i64,
    ) {
        let totals = self
            .totals
            .entry(tag.to_string())
            .or_insert_with(|| PlayerWarTotals {
                earliest: war_date,
                latest: war_date,
                misses: 0,
                war_count: 0,
            });

        totals.earliest = totals.earliest.min(war_date);
        totals.latest = totals.latest.max(war_date);
        totals.misses += number_of_battles - battles_played;
        totals.war_count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn get(&self, tag: &str) -> Option<&PlayerWarTotals> {
        self.totals.get(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PlayerWarTotals)> {
        self.totals.iter()
    }
}

/// Write batch totals back to the store.
///
/// created_at only ever moves backwards (earliest observation wins) and
/// last_seen only forwards. Returns the number of players updated.
pub async fn apply_totals(
    pool: &SqlitePool,
    batch: &WarBatch,
    players: &HashMap<String, PlayerRecord>,
) -> SyncResult<usize> {
    let repo = PlayerRepository::new(pool);
    let mut updated = 0;

    for (tag, totals) in batch.iter() {
        // Every batch entry comes from a participant the reconciler has
        // already loaded or created
        let Some(player) = players.get(tag) else {
            continue;
        };

        let created_at = player.created_at.min(totals.earliest);
        let last_seen = match player.last_seen {
            Some(seen) => seen.max(totals.latest),
            None => totals.latest,
        };

        repo.apply_war_totals(tag, created_at, last_seen, totals.misses, totals.war_count)
            .await?;
        updated += 1;
    }

    debug!(players = updated, "Applied war totals");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn misses_and_count_accumulate_over_batch() {
        let mut batch = WarBatch::new();
        batch.record("AAA", day(1), 10, 10);
        batch.record("AAA", day(3), 10, 8);
        batch.record("AAA", day(5), 10, 9);

        let totals = batch.get("AAA").unwrap();
        assert_eq!(totals.misses, 3);
        assert_eq!(totals.war_count, 3);
    }

    #[test]
    fn earliest_and_latest_track_war_dates() {
        let mut batch = WarBatch::new();
        batch.record("AAA", day(3), 10, 10);
        batch.record("AAA", day(1), 10, 10);
        batch.record("AAA", day(5), 10, 10);

        let totals = batch.get("AAA").unwrap();
        assert_eq!(totals.earliest, day(1));
        assert_eq!(totals.latest, day(5));
    }

    #[test]
    fn players_are_tracked_independently() {
        let mut batch = WarBatch::new();
        batch.record("AAA", day(1), 10, 8);
        batch.record("BBB", day(1), 10, 10);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.get("AAA").unwrap().misses, 2);
        assert_eq!(batch.get("BBB").unwrap().misses, 0);
    }
}
