//! Registration sessions: one row per platform user holding the in-progress
//! answers of the direct-message conversation.
//!
//! Every stage transition is a conditional update on the stage the caller
//! read, so a second reply that raced the first finds zero rows changed and
//! can tell the user the conversation already moved on.

use crate::models::SessionRow;
use crate::queries::{query_pending_hold, query_registration};
use crate::seats::{availability, drop_pending_hold, seat_taken_by_other};
use crate::{Database, OptionalExt, now_ts};
use anyhow::Result;
use lanseat_types::models::{RegistrationStatus, Stage};
use rusqlite::types::Value;
use rusqlite::{Connection, params};
use tracing::debug;

/// Fields preloaded into a session when it starts or is rewound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionDraft {
    pub nickname: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub seat: Option<u32>,
}

/// The single field write that accompanies a stage transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    None,
    Nickname(String),
    Firstname(String),
    Lastname(String),
    Email(String),
    /// Matched country code awaiting the user's yes/no
    UnconfirmedCountry(String),
    /// Promote the unconfirmed code to the country field
    ConfirmCountry,
    /// Drop the unconfirmed code, keep the country as it was
    RejectCountry,
    /// Blank country, no confirmation pending
    ClearCountry,
    Seat(Option<u32>),
    /// Reload every profile field and the seat
    Draft(SessionDraft),
}

impl SessionChange {
    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let text = |s: &String| Value::Text(s.clone());
        let opt_text = |s: &Option<String>| s.clone().map(Value::Text).unwrap_or(Value::Null);
        match self {
            Self::None => vec![],
            Self::Nickname(v) => vec![("nickname", text(v))],
            Self::Firstname(v) => vec![("firstname", text(v))],
            Self::Lastname(v) => vec![("lastname", text(v))],
            Self::Email(v) => vec![("email", text(v))],
            Self::UnconfirmedCountry(v) => vec![("unconfirmed_country", text(v))],
            Self::ConfirmCountry => vec![],
            Self::RejectCountry => vec![("unconfirmed_country", Value::Null)],
            Self::ClearCountry => vec![
                ("country", Value::Text(String::new())),
                ("unconfirmed_country", Value::Null),
            ],
            Self::Seat(seat) => vec![("seat", seat_value(*seat))],
            Self::Draft(d) => vec![
                ("nickname", opt_text(&d.nickname)),
                ("firstname", opt_text(&d.firstname)),
                ("lastname", opt_text(&d.lastname)),
                ("email", opt_text(&d.email)),
                ("country", opt_text(&d.country)),
                ("unconfirmed_country", Value::Null),
                ("seat", seat_value(d.seat)),
            ],
        }
    }
}

fn seat_value(seat: Option<u32>) -> Value {
    seat.map(|s| Value::Integer(i64::from(s))).unwrap_or(Value::Null)
}

/// Result of committing a session into a registration.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed {
        event_id: i64,
        seat: Option<u32>,
        reserve: bool,
        /// The profile existed before with a different nickname
        nickname_changed: bool,
    },
    /// The held seat was released and someone else took it; the session is
    /// back at seat collection.
    SeatLost { seat: u32 },
    /// The event was full when the reserve notice was shown but has room
    /// now; the session is back at seat collection.
    SeatsFreed,
    /// The session is gone or no longer awaiting confirmation.
    Stale,
    /// The target event was deleted meanwhile.
    EventGone,
    /// A required profile field is missing from the session.
    Incomplete,
    /// The session's stage is not one this version knows.
    Corrupted(String),
}

impl Database {
    pub fn get_session(&self, user_id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| query_session(conn, user_id))
    }

    /// Create the user's session, or restart the existing one, at `stage`.
    /// There is never more than one row per user.
    pub fn start_session(
        &self,
        user_id: &str,
        event_id: i64,
        stage: Stage,
        draft: &SessionDraft,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let now = now_ts();
            conn.execute(
                "INSERT INTO registration_sessions
                    (user_id, stage, event_id, nickname, firstname, lastname, email, country,
                     unconfirmed_country, seat, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?10, ?10)
                 ON CONFLICT(user_id) DO UPDATE SET
                    stage = excluded.stage,
                    event_id = excluded.event_id,
                    nickname = excluded.nickname,
                    firstname = excluded.firstname,
                    lastname = excluded.lastname,
                    email = excluded.email,
                    country = excluded.country,
                    unconfirmed_country = NULL,
                    seat = excluded.seat,
                    updated_at = excluded.updated_at",
                params![
                    user_id,
                    stage.as_str(),
                    event_id,
                    draft.nickname,
                    draft.firstname,
                    draft.lastname,
                    draft.email,
                    draft.country,
                    draft.seat,
                    now
                ],
            )?;
            debug!("Session for {} started at {}", user_id, stage);
            Ok(())
        })
    }

    /// Move the session from `from` to `to`, writing `change` in the same
    /// statement. Returns false when the session is not at `from` anymore.
    pub fn advance_session(
        &self,
        user_id: &str,
        from: Stage,
        to: Stage,
        change: &SessionChange,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| advance(conn, user_id, from, to, change))
    }

    pub fn delete_session(&self, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM registration_sessions WHERE user_id = ?1", [user_id])?;
            Ok(changed > 0)
        })
    }

    /// Delete the session only if it is still at `stage`.
    pub fn delete_session_at(&self, user_id: &str, stage: Stage) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM registration_sessions WHERE user_id = ?1 AND stage = ?2",
                params![user_id, stage.as_str()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Turn a confirmed session into a profile plus registration, in one
    /// transaction. A unique-index failure on the profile (nickname or email
    /// claimed meanwhile) is returned as an error; callers check it with
    /// [`crate::is_constraint_violation`]. Nothing is written in that case.
    pub fn commit_session(&self, user_id: &str) -> Result<CommitOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(session) = query_session(&tx, user_id)? else {
                return Ok(CommitOutcome::Stale);
            };
            match session.stage() {
                Ok(Stage::ShowingConfirmation) => {}
                Ok(_) => return Ok(CommitOutcome::Stale),
                Err(unknown) => return Ok(CommitOutcome::Corrupted(unknown.0)),
            }
            let event_id = session.event_id;
            let event_exists: bool =
                tx.query_row("SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)", [event_id], |r| r.get(0))?;
            if !event_exists {
                return Ok(CommitOutcome::EventGone);
            }
            let (Some(nickname), Some(firstname), Some(lastname), Some(email)) = (
                session.nickname.as_ref(),
                session.firstname.as_ref(),
                session.lastname.as_ref(),
                session.email.as_ref(),
            ) else {
                return Ok(CommitOutcome::Incomplete);
            };
            let country = session.country.clone().unwrap_or_default();
            let now = now_ts();

            let existing = query_registration(&tx, event_id, user_id)?;
            let pending = query_pending_hold(&tx, event_id, user_id)?;

            if let Some(seat) = session.seat {
                let still_held = existing
                    .iter()
                    .chain(pending.iter())
                    .any(|r| r.holds_seat() && r.seat == Some(seat));
                if !still_held && seat_taken_by_other(&tx, event_id, seat, user_id)? {
                    drop_pending_hold(&tx, event_id, user_id)?;
                    advance(
                        &tx,
                        user_id,
                        Stage::ShowingConfirmation,
                        Stage::CollectingPreferredSeats,
                        &SessionChange::Seat(None),
                    )?;
                    tx.commit()?;
                    return Ok(CommitOutcome::SeatLost { seat });
                }
            } else if !existing.as_ref().is_some_and(|r| r.reserve && r.status == RegistrationStatus::Confirmed) {
                // Reserve only while the event is still full
                let capacity = availability(&tx, event_id, Some(user_id))?;
                if capacity.is_some_and(|c| c.available > 0) {
                    advance(
                        &tx,
                        user_id,
                        Stage::ShowingConfirmation,
                        Stage::CollectingPreferredSeats,
                        &SessionChange::Seat(None),
                    )?;
                    tx.commit()?;
                    return Ok(CommitOutcome::SeatsFreed);
                }
            }

            let previous_nickname: Option<String> = tx
                .query_row("SELECT nickname FROM users WHERE id = ?1", [user_id], |r| r.get(0))
                .optional()?;

            tx.execute(
                "INSERT INTO users (id, nickname, firstname, lastname, country, email, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    nickname = excluded.nickname,
                    firstname = excluded.firstname,
                    lastname = excluded.lastname,
                    country = excluded.country,
                    email = excluded.email,
                    updated_at = excluded.updated_at",
                params![user_id, nickname, firstname, lastname, country, email, now],
            )?;

            // Frees the seat index before a pending pick moves onto the
            // committed row
            drop_pending_hold(&tx, event_id, user_id)?;

            let reserve = session.seat.is_none();
            match existing {
                Some(row) => {
                    tx.execute(
                        "UPDATE registrations SET seat = ?2, reserve = ?3, status = 'confirmed', updated_at = ?4
                         WHERE id = ?1",
                        params![row.id, session.seat, reserve, now],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO registrations (event_id, user_id, seat, has_paid, reserve, status, created_at, updated_at)
                         VALUES (?1, ?2, ?3, 0, ?4, 'confirmed', ?5, ?5)",
                        params![event_id, user_id, session.seat, reserve, now],
                    )?;
                }
            }

            tx.execute("DELETE FROM registration_sessions WHERE user_id = ?1", [user_id])?;
            tx.commit()?;

            Ok(CommitOutcome::Committed {
                event_id,
                seat: session.seat,
                reserve,
                nickname_changed: previous_nickname.is_some_and(|prev| &prev != nickname),
            })
        })
    }
}

pub(crate) fn query_session(conn: &Connection, user_id: &str) -> Result<Option<SessionRow>> {
    conn.query_row(
        "SELECT user_id, stage, event_id, nickname, firstname, lastname, email, country,
                unconfirmed_country, seat, updated_at
         FROM registration_sessions WHERE user_id = ?1",
        [user_id],
        |row| {
            Ok(SessionRow {
                user_id: row.get(0)?,
                stage: row.get(1)?,
                event_id: row.get(2)?,
                nickname: row.get(3)?,
                firstname: row.get(4)?,
                lastname: row.get(5)?,
                email: row.get(6)?,
                country: row.get(7)?,
                unconfirmed_country: row.get(8)?,
                seat: row.get(9)?,
                updated_at: row.get(10)?,
            })
        },
    )
    .optional()
}

pub(crate) fn advance(
    conn: &Connection,
    user_id: &str,
    from: Stage,
    to: Stage,
    change: &SessionChange,
) -> Result<bool> {
    let mut sets = vec!["stage = ?3".to_string(), "updated_at = ?4".to_string()];
    let mut values: Vec<Value> = vec![
        Value::Text(user_id.to_string()),
        Value::Text(from.as_str().to_string()),
        Value::Text(to.as_str().to_string()),
        Value::Text(now_ts()),
    ];
    if *change == SessionChange::ConfirmCountry {
        sets.push("country = unconfirmed_country".into());
        sets.push("unconfirmed_country = NULL".into());
    }
    for (column, value) in change.assignments() {
        values.push(value);
        sets.push(format!("{} = ?{}", column, values.len()));
    }

    let sql = format!(
        "UPDATE registration_sessions SET {} WHERE user_id = ?1 AND stage = ?2",
        sets.join(", ")
    );
    let changed = conn.execute(&sql, rusqlite::params_from_iter(values))?;
    if changed == 0 {
        debug!("Session for {} is not at {}; transition to {} skipped", user_id, from, to);
    }
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tests::{event_fields, user_fields};

    fn draft(nickname: &str) -> SessionDraft {
        SessionDraft {
            nickname: Some(nickname.into()),
            firstname: Some("Ada".into()),
            lastname: Some("Lovelace".into()),
            email: Some(format!("{}@example.com", nickname.to_lowercase())),
            country: Some("SE".into()),
            seat: None,
        }
    }

    #[test]
    fn restarting_keeps_one_row() {
        let db = Database::open_in_memory().unwrap();
        let e1 = db.create_event(&event_fields(4)).unwrap();
        let e2 = db.create_event(&event_fields(4)).unwrap();

        db.start_session("u1", e1, Stage::CollectingNickname, &SessionDraft::default()).unwrap();
        db.start_session("u1", e2, Stage::CollectingPreferredSeats, &draft("Nova")).unwrap();

        let count: i64 = db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM registration_sessions", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
        let session = db.get_session("u1").unwrap().unwrap();
        assert_eq!(session.event_id, e2);
        assert_eq!(session.stage(), Ok(Stage::CollectingPreferredSeats));
    }

    #[test]
    fn advance_requires_expected_stage() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(4)).unwrap();
        db.start_session("u1", e, Stage::CollectingNickname, &SessionDraft::default()).unwrap();

        let change = SessionChange::Nickname("Nova".into());
        assert!(db.advance_session("u1", Stage::CollectingNickname, Stage::CollectingFirstname, &change).unwrap());
        // Same reply delivered twice: second one finds the session moved on
        assert!(!db.advance_session("u1", Stage::CollectingNickname, Stage::CollectingFirstname, &change).unwrap());

        let session = db.get_session("u1").unwrap().unwrap();
        assert_eq!(session.nickname.as_deref(), Some("Nova"));
        assert_eq!(session.stage(), Ok(Stage::CollectingFirstname));
    }

    #[test]
    fn country_confirmation_changes() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(4)).unwrap();
        db.start_session("u1", e, Stage::CollectingCountry, &SessionDraft::default()).unwrap();

        db.advance_session(
            "u1",
            Stage::CollectingCountry,
            Stage::ConfirmingCountry,
            &SessionChange::UnconfirmedCountry("SE".into()),
        )
        .unwrap();
        let s = db.get_session("u1").unwrap().unwrap();
        assert_eq!(s.unconfirmed_country.as_deref(), Some("SE"));
        assert!(s.country.is_none());

        db.advance_session("u1", Stage::ConfirmingCountry, Stage::CollectingPreferredSeats, &SessionChange::ConfirmCountry)
            .unwrap();
        let s = db.get_session("u1").unwrap().unwrap();
        assert_eq!(s.country.as_deref(), Some("SE"));
        assert!(s.unconfirmed_country.is_none());
    }

    #[test]
    fn commit_creates_profile_and_registration() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(4)).unwrap();
        let mut d = draft("Nova");
        d.seat = Some(3);
        db.start_session("u1", e, Stage::CollectingPreferredSeats, &d).unwrap();
        assert_eq!(db.allocate_seat_for_session("u1", &[3]).unwrap(), crate::seats::SeatOutcome::Allocated(3));

        let outcome = db.commit_session("u1").unwrap();
        assert_eq!(
            outcome,
            CommitOutcome::Committed { event_id: e, seat: Some(3), reserve: false, nickname_changed: false }
        );
        assert!(db.get_session("u1").unwrap().is_none());
        assert_eq!(db.get_user("u1").unwrap().unwrap().nickname, "Nova");
        let reg = db.get_registration(e, "u1").unwrap().unwrap();
        assert_eq!(reg.status, lanseat_types::models::RegistrationStatus::Confirmed);

        // A second confirmation of the same session is a no-op
        assert_eq!(db.commit_session("u1").unwrap(), CommitOutcome::Stale);
    }

    #[test]
    fn commit_rejects_claimed_nickname_without_writing() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(4)).unwrap();
        db.create_user("u2", &user_fields("Nova")).unwrap();
        db.start_session("u1", e, Stage::ShowingConfirmation, &draft("Nova")).unwrap();

        let err = db.commit_session("u1").unwrap_err();
        assert!(crate::is_constraint_violation(&err));
        assert!(db.get_session("u1").unwrap().is_some());
        assert!(db.get_registration(e, "u1").unwrap().is_none());
    }

    #[test]
    fn commit_reports_lost_seat() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(4)).unwrap();
        let mut d = draft("Nova");
        d.seat = Some(2);
        // Session claims seat 2 but its hold was swept and taken by u2
        db.start_session("u1", e, Stage::ShowingConfirmation, &d).unwrap();
        db.create_user("u2", &user_fields("Orion")).unwrap();
        db.add_registration(e, "u2", Some(2), false, false).unwrap();

        assert_eq!(db.commit_session("u1").unwrap(), CommitOutcome::SeatLost { seat: 2 });
        let s = db.get_session("u1").unwrap().unwrap();
        assert_eq!(s.stage(), Ok(Stage::CollectingPreferredSeats));
        assert!(s.seat.is_none());
        assert!(db.get_user("u1").unwrap().is_none());
    }

    #[test]
    fn reserve_commit_has_no_seat() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(1)).unwrap();
        db.create_user("u2", &user_fields("Orion")).unwrap();
        db.add_registration(e, "u2", Some(1), false, false).unwrap();
        db.start_session("u1", e, Stage::ShowingConfirmation, &draft("Nova")).unwrap();

        match db.commit_session("u1").unwrap() {
            CommitOutcome::Committed { seat, reserve, .. } => {
                assert_eq!(seat, None);
                assert!(reserve);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let reserves = db.reserves(e).unwrap();
        assert_eq!(reserves.len(), 1);
        assert_eq!(reserves[0].nickname, "Nova");
    }

    #[test]
    fn reserve_commit_rechecks_capacity() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(1)).unwrap();
        db.create_user("u2", &user_fields("Orion")).unwrap();
        db.add_registration(e, "u2", Some(1), false, false).unwrap();
        db.start_session("u1", e, Stage::ShowingConfirmation, &draft("Nova")).unwrap();

        // The only seat frees up between the reserve notice and the confirm
        db.delete_registration(e, "u2").unwrap();

        assert_eq!(db.commit_session("u1").unwrap(), CommitOutcome::SeatsFreed);
        let s = db.get_session("u1").unwrap().unwrap();
        assert_eq!(s.stage(), Ok(Stage::CollectingPreferredSeats));
        assert!(db.get_registration(e, "u1").unwrap().is_none());
        assert!(db.get_user("u1").unwrap().is_none());
    }

    #[test]
    fn confirmed_seat_moves_only_on_commit() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(6)).unwrap();
        db.create_user("u1", &user_fields("Nova")).unwrap();
        db.add_registration(e, "u1", Some(5), false, true).unwrap();

        db.start_session("u1", e, Stage::CollectingPreferredSeats, &draft("Nova")).unwrap();
        assert_eq!(db.allocate_seat_for_session("u1", &[3]).unwrap(), crate::seats::SeatOutcome::Allocated(3));

        // Both seats stay blocked while the change awaits confirmation
        let reg = db.get_registration(e, "u1").unwrap().unwrap();
        assert_eq!(reg.seat, Some(5));
        assert_eq!(db.occupied_seats(e).unwrap(), vec![3, 5]);
        assert_eq!(db.allocate_seat(e, "u2", &[5, 3]).unwrap(), None);

        match db.commit_session("u1").unwrap() {
            CommitOutcome::Committed { seat, reserve, .. } => {
                assert_eq!(seat, Some(3));
                assert!(!reserve);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let reg = db.get_registration(e, "u1").unwrap().unwrap();
        assert_eq!(reg.seat, Some(3));
        assert!(reg.has_paid);
        assert_eq!(db.occupied_seats(e).unwrap(), vec![3]);
        assert_eq!(db.event_entries(e).unwrap().len(), 1);
    }
}
