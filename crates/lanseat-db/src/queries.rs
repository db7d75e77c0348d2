use crate::models::{EventFields, EventRow, RegistrationRow, RosterEntry, SettingRow, UserRow};
use crate::{Database, OptionalExt, now_ts};
use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};

/// Profile columns as written by registration completion or by an admin.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFields {
    pub nickname: String,
    pub firstname: String,
    pub lastname: String,
    pub country: String,
    pub email: String,
}

impl From<&UserRow> for UserFields {
    fn from(row: &UserRow) -> Self {
        Self {
            nickname: row.nickname.clone(),
            firstname: row.firstname.clone(),
            lastname: row.lastname.clone(),
            country: row.country.clone(),
            email: row.email.clone(),
        }
    }
}

const EVENT_COLUMNS: &str =
    "id, name, location, start_at, end_at, total_seats, entry_fee, participant_channel, created_at";
const USER_COLUMNS: &str = "id, nickname, firstname, lastname, country, email, created_at";
const REGISTRATION_COLUMNS: &str =
    "id, event_id, user_id, seat, has_paid, paid_at, reserve, status, created_at, updated_at";

impl Database {
    // -- Events --

    pub fn create_event(&self, fields: &EventFields) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let now = now_ts();
            conn.execute(
                "INSERT INTO events (name, location, start_at, end_at, total_seats, entry_fee, participant_channel, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    fields.name,
                    fields.location,
                    fields.start_at,
                    fields.end_at,
                    fields.total_seats,
                    fields.entry_fee,
                    fields.participant_channel,
                    now
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_event(&self, id: i64) -> Result<Option<EventRow>> {
        self.with_conn(|conn| query_event(conn, id))
    }

    /// All events ordered by start date.
    pub fn list_events(&self) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events ORDER BY start_at, id"
            ))?;
            let rows = stmt
                .query_map([], event_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrite the editable columns. Returns false when the event is gone.
    pub fn update_event(&self, id: i64, fields: &EventFields) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE events SET name = ?2, location = ?3, start_at = ?4, end_at = ?5,
                        total_seats = ?6, entry_fee = ?7, participant_channel = ?8, updated_at = ?9
                 WHERE id = ?1",
                params![
                    id,
                    fields.name,
                    fields.location,
                    fields.start_at,
                    fields.end_at,
                    fields.total_seats,
                    fields.entry_fee,
                    fields.participant_channel,
                    now_ts()
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the event; its registrations and sessions go with it.
    pub fn delete_event(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM registration_sessions WHERE event_id = ?1", [id])?;
            let changed = tx.execute("DELETE FROM events WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(changed > 0)
        })
    }

    /// Highest seat number still held in the event, used to refuse shrinking
    /// an event below its occupied seats.
    pub fn max_held_seat(&self, event_id: i64) -> Result<Option<u32>> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT MAX(seat) FROM registrations
                 WHERE event_id = ?1 AND reserve = 0 AND seat IS NOT NULL AND status != 'available'",
                [event_id],
                |r| r.get(0),
            )?)
        })
    }

    // -- Users --

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn get_user_by_nickname(&self, nickname: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE nickname = ?1"),
                [nickname],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY nickname COLLATE NOCASE"))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Whether `nickname` belongs to another user's profile or another user's
    /// in-flight registration.
    pub fn nickname_taken(&self, nickname: &str, excluding_user: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE nickname = ?1 AND id != ?2)
                     OR EXISTS(SELECT 1 FROM registration_sessions WHERE nickname = ?1 AND user_id != ?2)",
                params![nickname, excluding_user],
                |r| r.get(0),
            )?)
        })
    }

    pub fn email_taken(&self, email: &str, excluding_user: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 COLLATE NOCASE AND id != ?2)",
                params![email, excluding_user],
                |r| r.get(0),
            )?)
        })
    }

    pub fn create_user(&self, id: &str, fields: &UserFields) -> Result<()> {
        self.with_conn_mut(|conn| {
            let now = now_ts();
            conn.execute(
                "INSERT INTO users (id, nickname, firstname, lastname, country, email, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![id, fields.nickname, fields.firstname, fields.lastname, fields.country, fields.email, now],
            )?;
            Ok(())
        })
    }

    pub fn update_user(&self, id: &str, fields: &UserFields) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET nickname = ?2, firstname = ?3, lastname = ?4, country = ?5, email = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![id, fields.nickname, fields.firstname, fields.lastname, fields.country, fields.email, now_ts()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Removes the profile together with every registration and any
    /// in-flight session of that user.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM registrations WHERE user_id = ?1", [id])?;
            tx.execute("DELETE FROM registration_sessions WHERE user_id = ?1", [id])?;
            let changed = tx.execute("DELETE FROM users WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(changed > 0)
        })
    }

    // -- Registrations --

    pub fn get_registration(&self, event_id: i64, user_id: &str) -> Result<Option<RegistrationRow>> {
        self.with_conn(|conn| query_registration(conn, event_id, user_id))
    }

    /// Events the user holds a confirmed registration for, by start date.
    pub fn events_for_user(&self, user_id: &str) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT e.id, e.name, e.location, e.start_at, e.end_at, e.total_seats, e.entry_fee,
                        e.participant_channel, e.created_at
                 FROM events e
                 JOIN registrations r ON r.event_id = e.id
                 WHERE r.user_id = ?1 AND r.status = 'confirmed'
                 ORDER BY e.start_at, e.id",
            )?;
            let rows = stmt
                .query_map([user_id], event_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Insert a confirmed registration directly (admin path). A taken seat
    /// or an existing registration surfaces as a constraint violation.
    pub fn add_registration(
        &self,
        event_id: i64,
        user_id: &str,
        seat: Option<u32>,
        reserve: bool,
        has_paid: bool,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let now = now_ts();
            let paid_at = has_paid.then(|| now.clone());
            conn.execute(
                "INSERT INTO registrations (event_id, user_id, seat, has_paid, paid_at, reserve, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'confirmed', ?7, ?7)",
                params![event_id, user_id, seat, has_paid, paid_at, reserve, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn delete_registration(&self, event_id: i64, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM registrations WHERE event_id = ?1 AND user_id = ?2",
                params![event_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Flip the paid flag. Marking paid stamps `paid_at` (once); clearing it
    /// drops the stamp so the participant leaves the published list.
    pub fn set_paid(&self, event_id: i64, user_id: &str, has_paid: bool) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let now = now_ts();
            let changed = conn.execute(
                "UPDATE registrations
                 SET has_paid = ?3,
                     paid_at = CASE WHEN ?3 THEN COALESCE(paid_at, ?4) ELSE NULL END,
                     updated_at = ?4
                 WHERE event_id = ?1 AND user_id = ?2 AND pending = 0",
                params![event_id, user_id, has_paid, now],
            )?;
            Ok(changed > 0)
        })
    }

    /// Paid main-list participants in order of payment.
    pub fn paid_participants(&self, event_id: i64) -> Result<Vec<RosterEntry>> {
        self.roster_query(
            event_id,
            "r.reserve = 0 AND r.has_paid = 1 AND r.status = 'confirmed'",
            "r.paid_at, r.id",
        )
    }

    /// Reserve entries, first come first served.
    pub fn reserves(&self, event_id: i64) -> Result<Vec<RosterEntry>> {
        self.roster_query(event_id, "r.reserve = 1 AND r.status = 'confirmed'", "r.created_at, r.id")
    }

    /// Every confirmed registration of the event: main list by seat, then
    /// reserves in FIFO order.
    pub fn event_entries(&self, event_id: i64) -> Result<Vec<RosterEntry>> {
        self.roster_query(
            event_id,
            "r.status = 'confirmed'",
            "r.reserve, r.seat, r.created_at, r.id",
        )
    }

    fn roster_query(&self, event_id: i64, filter: &str, order: &str) -> Result<Vec<RosterEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT r.user_id, u.nickname, u.firstname, u.lastname, u.email, u.country,
                        r.seat, r.has_paid, r.paid_at, r.reserve, r.created_at
                 FROM registrations r
                 JOIN users u ON u.id = r.user_id
                 WHERE r.event_id = ?1 AND {filter}
                 ORDER BY {order}"
            ))?;
            let rows = stmt
                .query_map([event_id], |row| {
                    Ok(RosterEntry {
                        user_id: row.get(0)?,
                        nickname: row.get(1)?,
                        firstname: row.get(2)?,
                        lastname: row.get(3)?,
                        email: row.get(4)?,
                        country: row.get(5)?,
                        seat: row.get(6)?,
                        has_paid: row.get(7)?,
                        paid_at: row.get(8)?,
                        reserve: row.get(9)?,
                        created_at: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Settings --

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |r| r.get(0))
                .optional()
        })
    }

    /// Only keys seeded by the migrations exist; writing any other key is
    /// refused and reported as `false`.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE settings SET value = ?2 WHERE key = ?1",
                params![key, value],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn list_settings(&self) -> Result<Vec<SettingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value, description FROM settings ORDER BY key")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(SettingRow {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        description: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn query_event(conn: &Connection, id: i64) -> Result<Option<EventRow>> {
    conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
        [id],
        event_from_row,
    )
    .optional()
}

pub(crate) fn query_user(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        user_from_row,
    )
    .optional()
}

pub(crate) fn query_registration(
    conn: &Connection,
    event_id: i64,
    user_id: &str,
) -> Result<Option<RegistrationRow>> {
    conn.query_row(
        &format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = ?1 AND user_id = ?2 AND pending = 0"),
        params![event_id, user_id],
        registration_from_row,
    )
    .optional()
}

/// The seat a confirmed entrant picked while editing, held apart from their
/// committed row until they confirm.
pub(crate) fn query_pending_hold(
    conn: &Connection,
    event_id: i64,
    user_id: &str,
) -> Result<Option<RegistrationRow>> {
    conn.query_row(
        &format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = ?1 AND user_id = ?2 AND pending = 1"),
        params![event_id, user_id],
        registration_from_row,
    )
    .optional()
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        start_at: row.get(3)?,
        end_at: row.get(4)?,
        total_seats: row.get(5)?,
        entry_fee: row.get(6)?,
        participant_channel: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        nickname: row.get(1)?,
        firstname: row.get(2)?,
        lastname: row.get(3)?,
        country: row.get(4)?,
        email: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn registration_from_row(row: &Row<'_>) -> rusqlite::Result<RegistrationRow> {
    let status: String = row.get(7)?;
    Ok(RegistrationRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        user_id: row.get(2)?,
        seat: row.get(3)?,
        has_paid: row.get(4)?,
        paid_at: row.get(5)?,
        reserve: row.get(6)?,
        status: status
            .parse()
            .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.into()))?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
