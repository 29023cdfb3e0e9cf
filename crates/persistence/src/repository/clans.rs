//! Clans repository

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A clan row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClanRecord {
    pub id: i64,
    pub tag: String,
    pub name: String,
}

pub struct ClanRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ClanRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the clan with this tag, creating it on first reference
    pub async fn get_or_create(&self, tag: &str) -> DbResult<ClanRecord> {
        sqlx::query("INSERT OR IGNORE INTO clans (tag) VALUES (?)")
            .bind(tag)
            .execute(self.pool)
            .await?;

        let clan = sqlx::query_as::<_, ClanRecord>("SELECT id, tag, name FROM clans WHERE tag = ?")
            .bind(tag)
            .fetch_one(self.pool)
            .await?;

        Ok(clan)
    }

    pub async fn get_by_tag(&self, tag: &str) -> DbResult<Option<ClanRecord>> {
        let clan = sqlx::query_as::<_, ClanRecord>("SELECT id, tag, name FROM clans WHERE tag = ?")
            .bind(tag)
            .fetch_optional(self.pool)
            .await?;

        Ok(clan)
    }

    /// All known clans, in tag order
    pub async fn all(&self) -> DbResult<Vec<ClanRecord>> {
        let clans =
            sqlx::query_as::<_, ClanRecord>("SELECT id, tag, name FROM clans ORDER BY tag")
                .fetch_all(self.pool)
                .await?;

        Ok(clans)
    }
}
