//! SQL schema for the Rinkside SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS principals (
    principal_id  TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    full_name     TEXT NOT NULL,
    category      TEXT NOT NULL,   -- 'coach' | 'athlete' | 'guardian' | 'observer'
    is_superuser  INTEGER NOT NULL DEFAULT 0,
    password_hash TEXT,            -- argon2 PHC string; NULL cannot log in
    created_at    TEXT NOT NULL
);

-- Subjects are never deleted; `archived` soft-retires them.
CREATE TABLE IF NOT EXISTS athletes (
    athlete_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name     TEXT NOT NULL,
    account       TEXT UNIQUE REFERENCES principals(principal_id),
    date_of_birth TEXT,            -- YYYY-MM-DD
    archived      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS partner_teams (
    team_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    primary_id   INTEGER NOT NULL REFERENCES athletes(athlete_id),
    secondary_id INTEGER REFERENCES athletes(athlete_id),
    archived     INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    CHECK (secondary_id IS NULL OR secondary_id != primary_id)
);

CREATE TABLE IF NOT EXISTS group_teams (
    team_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    archived   INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS group_roster (
    team_id    INTEGER NOT NULL REFERENCES group_teams(team_id),
    athlete_id INTEGER NOT NULL REFERENCES athletes(athlete_id),
    PRIMARY KEY (team_id, athlete_id)
);

-- The grant ledger. At most one row per (principal, subject, role).
CREATE TABLE IF NOT EXISTS access_grants (
    grant_id     TEXT PRIMARY KEY,
    principal_id TEXT NOT NULL REFERENCES principals(principal_id),
    subject_kind TEXT NOT NULL,    -- 'athlete' | 'partner_team' | 'group_team'
    subject_id   INTEGER NOT NULL,
    role         TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE (principal_id, subject_kind, subject_id, role)
);

CREATE TABLE IF NOT EXISTS invitations (
    token        TEXT PRIMARY KEY,
    email        TEXT NOT NULL COLLATE NOCASE,
    sender       TEXT NOT NULL REFERENCES principals(principal_id),
    role         TEXT NOT NULL,
    subject_kind TEXT NOT NULL,
    subject_id   INTEGER NOT NULL,
    created_at   TEXT NOT NULL,
    expires_at   TEXT NOT NULL,
    accepted_at  TEXT
);

CREATE INDEX IF NOT EXISTS grants_subject_idx   ON access_grants(subject_kind, subject_id);
CREATE INDEX IF NOT EXISTS roster_athlete_idx   ON group_roster(athlete_id);
CREATE INDEX IF NOT EXISTS partner_primary_idx  ON partner_teams(primary_id);
CREATE INDEX IF NOT EXISTS partner_second_idx   ON partner_teams(secondary_id);

PRAGMA user_version = 1;
";
