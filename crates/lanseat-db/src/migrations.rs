use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 2;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE events (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                name                TEXT NOT NULL,
                location            TEXT NOT NULL DEFAULT '',
                start_at            TEXT NOT NULL,
                end_at              TEXT NOT NULL,
                total_seats         INTEGER NOT NULL CHECK (total_seats >= 0),
                entry_fee           INTEGER NOT NULL DEFAULT 0,
                participant_channel TEXT,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            -- id is the chat platform's user id
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                nickname    TEXT NOT NULL UNIQUE,
                firstname   TEXT NOT NULL,
                lastname    TEXT NOT NULL,
                country     TEXT NOT NULL DEFAULT '',
                email       TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            -- user_id has no foreign key: a seat hold is written before the
            -- profile exists. Profile deletion removes registrations itself.
            CREATE TABLE registrations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id    INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                seat        INTEGER CHECK (seat IS NULL OR seat >= 1),
                has_paid    INTEGER NOT NULL DEFAULT 0,
                paid_at     TEXT,
                reserve     INTEGER NOT NULL DEFAULT 0,
                status      TEXT NOT NULL DEFAULT 'reserved',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE (event_id, user_id)
            );

            -- One live main-list row per seat. Expired holds ('available')
            -- keep their number but no longer block it.
            CREATE UNIQUE INDEX idx_registrations_seat
                ON registrations(event_id, seat)
                WHERE reserve = 0 AND seat IS NOT NULL AND status != 'available';

            CREATE INDEX idx_registrations_user ON registrations(user_id);

            CREATE TABLE registration_sessions (
                user_id             TEXT PRIMARY KEY,
                stage               TEXT NOT NULL,
                event_id            INTEGER NOT NULL,
                nickname            TEXT,
                firstname           TEXT,
                lastname            TEXT,
                email               TEXT,
                country             TEXT,
                unconfirmed_country TEXT,
                seat                INTEGER,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE TABLE settings (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT ''
            );

            INSERT INTO settings (key, value, description) VALUES
                ('adminRole', '', 'Role whose members may run admin commands'),
                ('logChannel', '', 'Channel receiving the activity log');

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (pending seat holds)");
        // A confirmed entrant who picks a new seat gets a second row with
        // pending = 1 until they confirm. The seat index guards it like any
        // other hold.
        conn.execute_batch(
            "
            CREATE TABLE registrations_v2 (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id    INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                seat        INTEGER CHECK (seat IS NULL OR seat >= 1),
                has_paid    INTEGER NOT NULL DEFAULT 0,
                paid_at     TEXT,
                reserve     INTEGER NOT NULL DEFAULT 0,
                status      TEXT NOT NULL DEFAULT 'reserved',
                pending     INTEGER NOT NULL DEFAULT 0 CHECK (pending IN (0, 1)),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE (event_id, user_id, pending)
            );

            INSERT INTO registrations_v2
                (id, event_id, user_id, seat, has_paid, paid_at, reserve, status, created_at, updated_at)
            SELECT id, event_id, user_id, seat, has_paid, paid_at, reserve, status, created_at, updated_at
            FROM registrations;

            DROP TABLE registrations;
            ALTER TABLE registrations_v2 RENAME TO registrations;

            CREATE UNIQUE INDEX idx_registrations_seat
                ON registrations(event_id, seat)
                WHERE reserve = 0 AND seat IS NOT NULL AND status != 'available';

            CREATE INDEX idx_registrations_user ON registrations(user_id);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
