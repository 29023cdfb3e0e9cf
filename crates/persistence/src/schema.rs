//! Database schema definitions

/// SQL to create all tables
/// NOTE: Timestamps stored as TEXT (RFC 3339, always UTC) so that SQLite
/// MIN/MAX comparisons stay correct lexicographically.
pub const CREATE_TABLES: &str = r#"
-- Clans, created on first reference by tag
CREATE TABLE IF NOT EXISTS clans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT ''
);

-- Players, keyed by their game-wide tag.
-- membership: 'active' | 'departed' | 'warlog_only'
-- clan_id and clan_rank are NULL for anything but active members.
CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    clan_id INTEGER REFERENCES clans(id) ON DELETE SET NULL,
    membership TEXT NOT NULL DEFAULT 'warlog_only',
    role TEXT NOT NULL DEFAULT '',
    clan_rank INTEGER,
    trophies INTEGER NOT NULL DEFAULT 0,
    donations INTEGER NOT NULL DEFAULT 0,
    donations_received INTEGER NOT NULL DEFAULT 0,
    exp_level INTEGER NOT NULL DEFAULT 0,
    last_seen TEXT,
    created_at TEXT NOT NULL,
    war_misses INTEGER NOT NULL DEFAULT 0,
    war_count INTEGER NOT NULL DEFAULT 0
);

-- Wars are append-only historical facts, one row per (season, date)
CREATE TABLE IF NOT EXISTS wars (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    season_id INTEGER NOT NULL,
    created_date TEXT NOT NULL,
    clan_id INTEGER REFERENCES clans(id) ON DELETE SET NULL,
    UNIQUE(season_id, created_date)
);

-- One player's results within one war. Written once, never updated
CREATE TABLE IF NOT EXISTS war_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(id) ON DELETE CASCADE,
    war_id INTEGER NOT NULL REFERENCES wars(id) ON DELETE CASCADE,
    number_of_battles INTEGER NOT NULL,
    battles_played INTEGER NOT NULL,
    wins INTEGER NOT NULL,
    collection_day_battles_played INTEGER NOT NULL,
    UNIQUE(player_id, war_id)
);

-- ========== INDEXES ==========

CREATE INDEX IF NOT EXISTS idx_players_clan ON players(clan_id);
CREATE INDEX IF NOT EXISTS idx_players_membership ON players(membership);
CREATE INDEX IF NOT EXISTS idx_war_stats_player ON war_stats(player_id);
CREATE INDEX IF NOT EXISTS idx_wars_clan ON wars(clan_id)
"#;
