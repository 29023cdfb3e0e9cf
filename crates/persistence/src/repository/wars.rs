//! Wars and per-war battle stats repository
//!
//! Both tables are append-only history: wars are keyed by
//! (season_id, created_date) and war_stats by (player_id, war_id), and an
//! existing row is never overwritten by a later sync.

use crate::DbResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// One recorded clan war
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WarRecord {
    pub id: i64,
    pub season_id: i64,
    pub created_date: NaiveDate,
    pub clan_id: Option<i64>,
}

/// One player's battle results within one war
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WarStatsRecord {
    pub id: i64,
    pub player_id: i64,
    pub war_id: i64,
    pub number_of_battles: i64,
    pub battles_played: i64,
    pub wins: i64,
    pub collection_day_battles_played: i64,
}

pub struct WarRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> WarRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the war identified by (season_id, created_date), creating it on
    /// first observation. The clan reference is set only at creation.
    pub async fn get_or_create(
        &self,
        season_id: i64,
        created_date: NaiveDate,
        clan_id: i64,
    ) -> DbResult<WarRecord> {
        sqlx::query(
            "INSERT OR IGNORE INTO wars (season_id, created_date, clan_id) VALUES (?, ?, ?)",
        )
        .bind(season_id)
        .bind(created_date)
        .bind(clan_id)
        .execute(self.pool)
        .await?;

        let war = sqlx::query_as::<_, WarRecord>(
            r#"
            SELECT id, season_id, created_date, clan_id
            FROM wars
            WHERE season_id = ? AND created_date = ?
            "#,
        )
        .bind(season_id)
        .bind(created_date)
        .fetch_one(self.pool)
        .await?;

        Ok(war)
    }

    /// Insert a (player, war) stats row unless one already exists.
    /// First write wins: historical battle results do not change, so a later
    /// sync carrying different numbers must not touch the stored row.
    /// Returns true if a row was inserted.
    pub async fn insert_stats_if_absent(
        &self,
        player_id: i64,
        war_id: i64,
        number_of_battles: i64,
        battles_played: i64,
        wins: i64,
        collection_day_battles_played: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO war_stats (
                player_id, war_id, number_of_battles, battles_played,
                wins, collection_day_battles_played
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(player_id)
        .bind(war_id)
        .bind(number_of_battles)
        .bind(battles_played)
        .bind(wins)
        .bind(collection_day_battles_played)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All stored battle stats for one player, oldest war first
    pub async fn stats_for_player(&self, player_id: i64) -> DbResult<Vec<WarStatsRecord>> {
        let stats = sqlx::query_as::<_, WarStatsRecord>(
            r#"
            SELECT s.id, s.player_id, s.war_id, s.number_of_battles,
                   s.battles_played, s.wins, s.collection_day_battles_played
            FROM war_stats s
            JOIN wars w ON w.id = s.war_id
            WHERE s.player_id = ?
            ORDER BY w.created_date
            "#,
        )
        .bind(player_id)
        .fetch_all(self.pool)
        .await?;

        Ok(stats)
    }
}
