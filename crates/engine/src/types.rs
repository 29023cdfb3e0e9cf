//! Typed payloads for the Royale API
//!
//! Every endpoint gets an explicit response struct validated on parse;
//! a payload missing required fields is rejected as MalformedPayload
//! instead of surfacing later as a partial write.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SyncError, SyncResult};

/// `GET /clans/{tag}/members` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberList {
    pub items: Vec<Member>,
}

/// One roster member as reported by the remote API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub tag: String,
    pub name: String,
    pub role: String,
    pub clan_rank: i64,
    pub donations: i64,
    pub donations_received: i64,
    pub exp_level: i64,
    pub trophies: i64,
    #[serde(with = "game_time")]
    pub last_seen: DateTime<Utc>,
}

/// `GET /clans/{tag}/warlog` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarLog {
    pub items: Vec<WarLogEntry>,
}

/// One recorded war with its participant results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarLogEntry {
    pub season_id: i64,
    #[serde(with = "game_time")]
    pub created_date: DateTime<Utc>,
    pub participants: Vec<WarParticipant>,
}

/// One player's results within one war entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarParticipant {
    pub tag: String,
    pub name: String,
    pub number_of_battles: i64,
    pub battles_played: i64,
    pub wins: i64,
    pub collection_day_battles_played: i64,
}

/// Parse a raw members payload, rejecting unexpected JSON shapes
pub fn parse_members(raw: &str) -> SyncResult<MemberList> {
    serde_json::from_str(raw).map_err(|source| SyncError::MalformedPayload {
        resource: "members",
        source,
    })
}

/// Parse a raw warlog payload, rejecting unexpected JSON shapes
pub fn parse_warlog(raw: &str) -> SyncResult<WarLog> {
    serde_json::from_str(raw).map_err(|source| SyncError::MalformedPayload {
        resource: "warlog",
        source,
    })
}

/// Game timestamp format: `YYYYMMDDThhmmss.ffffff±zzzz`, where the zone is
/// either a numeric offset or a literal `Z`.
pub mod game_time {
    use super::*;
    use serde::{de, Deserializer, Serializer};

    const FORMAT: &str = "%Y%m%dT%H%M%S%.f";

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        if let Some(naive) = s.strip_suffix('Z') {
            let dt = NaiveDateTime::parse_from_str(naive, FORMAT)?;
            return Ok(dt.and_utc());
        }
        let dt = DateTime::parse_from_str(s, &format!("{FORMAT}%z"))?;
        Ok(dt.with_timezone(&Utc))
    }

    pub fn format(dt: &DateTime<Utc>) -> String {
        format!("{}Z", dt.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(|e| de::Error::custom(format!("invalid game timestamp {s:?}: {e}")))
    }

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(dt))
    }
}
