//! Players repository
//!
//! A player row is long-lived: its roster attributes are overwritten on every
//! sync while the row itself survives clan departures and re-joins.

use crate::DbResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Membership status of a player relative to the clans we track.
///
/// Stored as its own column rather than encoded into the rank field, so the
/// rank can stay NULL for anyone not on a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    /// Currently on a clan's roster
    Active,
    /// Was on a roster in an earlier sync, no longer present
    Departed,
    /// Only ever observed as a war participant
    WarlogOnly,
}

impl Membership {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Departed => "departed",
            Self::WarlogOnly => "warlog_only",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "departed" => Self::Departed,
            _ => Self::WarlogOnly,
        }
    }
}

/// A player row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlayerRecord {
    pub id: i64,
    pub tag: String,
    pub name: String,
    pub clan_id: Option<i64>,
    pub membership: String,
    pub role: String,
    pub clan_rank: Option<i64>,
    pub trophies: i64,
    pub donations: i64,
    pub donations_received: i64,
    pub exp_level: i64,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub war_misses: i64,
    pub war_count: i64,
}

impl PlayerRecord {
    pub fn status(&self) -> Membership {
        Membership::from_db(&self.membership)
    }
}

/// Roster attributes for one member, as reported by the remote API
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub tag: String,
    pub name: String,
    pub role: String,
    pub clan_rank: i64,
    pub trophies: i64,
    pub donations: i64,
    pub donations_received: i64,
    pub exp_level: i64,
    pub last_seen: Option<DateTime<Utc>>,
}

const SELECT_PLAYER: &str = r#"
SELECT id, tag, name, clan_id, membership, role, clan_rank,
       trophies, donations, donations_received, exp_level,
       last_seen, created_at, war_misses, war_count
FROM players
"#;

pub struct PlayerRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PlayerRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_tag(&self, tag: &str) -> DbResult<Option<PlayerRecord>> {
        let sql = format!("{SELECT_PLAYER} WHERE tag = ?");
        let player = sqlx::query_as::<_, PlayerRecord>(&sql)
            .bind(tag)
            .fetch_optional(self.pool)
            .await?;

        Ok(player)
    }

    /// Upsert a roster member: insert with defaults on first sight, otherwise
    /// overwrite every remote-owned attribute. `created_at` is written only
    /// on insert and never touched afterwards.
    pub async fn upsert_member(
        &self,
        clan_id: i64,
        entry: &RosterEntry,
        observed_at: DateTime<Utc>,
    ) -> DbResult<PlayerRecord> {
        sqlx::query(
            r#"
            INSERT INTO players (
                tag, name, clan_id, membership, role, clan_rank,
                trophies, donations, donations_received, exp_level,
                last_seen, created_at
            ) VALUES (?, ?, ?, 'active', ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tag) DO UPDATE SET
                name = excluded.name,
                clan_id = excluded.clan_id,
                membership = 'active',
                role = excluded.role,
                clan_rank = excluded.clan_rank,
                trophies = excluded.trophies,
                donations = excluded.donations,
                donations_received = excluded.donations_received,
                exp_level = excluded.exp_level,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(&entry.tag)
        .bind(&entry.name)
        .bind(clan_id)
        .bind(&entry.role)
        .bind(entry.clan_rank)
        .bind(entry.trophies)
        .bind(entry.donations)
        .bind(entry.donations_received)
        .bind(entry.exp_level)
        .bind(entry.last_seen)
        .bind(observed_at)
        .execute(self.pool)
        .await?;

        let sql = format!("{SELECT_PLAYER} WHERE tag = ?");
        let player = sqlx::query_as::<_, PlayerRecord>(&sql)
            .bind(&entry.tag)
            .fetch_one(self.pool)
            .await?;

        Ok(player)
    }

    /// Mark every active member of this clan whose tag is not in `tags` as
    /// departed, clearing its clan reference, role, and rank. Returns the
    /// number of players departed.
    pub async fn mark_departed_except(&self, clan_id: i64, tags: &[String]) -> DbResult<u64> {
        let mut sql = String::from(
            r#"
            UPDATE players
            SET clan_id = NULL, membership = 'departed', role = '', clan_rank = NULL
            WHERE clan_id = ? AND membership = 'active'
            "#,
        );

        if !tags.is_empty() {
            let placeholders = vec!["?"; tags.len()].join(", ");
            sql.push_str(&format!(" AND tag NOT IN ({placeholders})"));
        }

        let mut query = sqlx::query(&sql).bind(clan_id);
        for tag in tags {
            query = query.bind(tag);
        }

        let result = query.execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Create a minimal row for a player known only from war history
    pub async fn insert_warlog_only(
        &self,
        tag: &str,
        name: &str,
        observed_at: DateTime<Utc>,
    ) -> DbResult<PlayerRecord> {
        sqlx::query(
            r#"
            INSERT INTO players (tag, name, membership, created_at)
            VALUES (?, ?, 'warlog_only', ?)
            "#,
        )
        .bind(tag)
        .bind(name)
        .bind(observed_at)
        .execute(self.pool)
        .await?;

        let sql = format!("{SELECT_PLAYER} WHERE tag = ?");
        let player = sqlx::query_as::<_, PlayerRecord>(&sql)
            .bind(tag)
            .fetch_one(self.pool)
            .await?;

        Ok(player)
    }

    /// Demote a known player to warlog-only status (used when a war
    /// participant turns out to be a former member)
    pub async fn demote_to_warlog_only(&self, tag: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE players
            SET clan_id = NULL, membership = 'warlog_only', role = '', clan_rank = NULL
            WHERE tag = ?
            "#,
        )
        .bind(tag)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Write the rolling war totals computed for one sync batch
    pub async fn apply_war_totals(
        &self,
        tag: &str,
        created_at: DateTime<Utc>,
        last_seen: DateTime<Utc>,
        war_misses: i64,
        war_count: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE players
            SET created_at = ?, last_seen = ?, war_misses = ?, war_count = ?
            WHERE tag = ?
            "#,
        )
        .bind(created_at)
        .bind(last_seen)
        .bind(war_misses)
        .bind(war_count)
        .bind(tag)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Active roster of one clan, in rank order
    pub async fn list_by_clan(&self, clan_id: i64) -> DbResult<Vec<PlayerRecord>> {
        let sql = format!("{SELECT_PLAYER} WHERE clan_id = ? ORDER BY clan_rank");
        let players = sqlx::query_as::<_, PlayerRecord>(&sql)
            .bind(clan_id)
            .fetch_all(self.pool)
            .await?;

        Ok(players)
    }

    /// Every known player, members or not, in name order
    pub async fn list_all(&self) -> DbResult<Vec<PlayerRecord>> {
        let sql = format!("{SELECT_PLAYER} ORDER BY name COLLATE NOCASE");
        let players = sqlx::query_as::<_, PlayerRecord>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(players)
    }
}
