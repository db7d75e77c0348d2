//! Seat allocation and the main/reserve list primitives.
//!
//! A seat number is held by at most one row per event: the partial unique
//! index `idx_registrations_seat` covers every non-reserve row with a seat
//! that is not an expired hold. Allocation runs inside a transaction on the
//! single writer connection and still treats a constraint failure as "seat
//! taken, try the next one".

use crate::queries::{query_event, query_pending_hold, query_registration};
use crate::sessions::{SessionChange, advance, query_session};
use crate::{Database, OptionalExt, is_constraint_violation, now_ts};
use anyhow::Result;
use lanseat_types::models::{RegistrationStatus, Stage};
use rusqlite::{Connection, params};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    /// May be negative when an admin shrank the event below its occupancy
    pub available: i64,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatOutcome {
    Allocated(u32),
    /// None of the candidates is free
    AllTaken,
    /// The session was not waiting for seats anymore
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoteOutcome {
    Promoted { user_id: String, seat: u32 },
    NotRegistered,
    NotReserve,
    EventFull,
    NoReserves,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoteOutcome {
    /// The seat the user gave up, if they had one
    Demoted { freed_seat: Option<u32> },
    NotRegistered,
    AlreadyReserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned,
    NotRegistered,
    OutOfRange,
    Taken,
}

/// Lowest seat number in `1..=total` missing from `occupied`.
pub fn lowest_free_seat(occupied: &[u32], total: u32) -> Option<u32> {
    let mut taken = occupied.to_vec();
    taken.sort_unstable();
    taken.dedup();

    let mut candidate = 1;
    for seat in taken {
        if seat == candidate {
            candidate += 1;
        } else if seat > candidate {
            break;
        }
    }
    (candidate <= total).then_some(candidate)
}

impl Database {
    pub fn is_seat_taken(&self, event_id: i64, seat: u32) -> Result<bool> {
        self.with_conn(|conn| seat_taken(conn, event_id, seat))
    }

    /// Seat numbers currently held in the event, ascending.
    pub fn occupied_seats(&self, event_id: i64) -> Result<Vec<u32>> {
        self.with_conn(|conn| occupied(conn, event_id))
    }

    /// Free capacity of the event, not counting `excluding_user`'s own seat.
    /// `None` when the event does not exist.
    pub fn available_seats(&self, event_id: i64, excluding_user: Option<&str>) -> Result<Option<Availability>> {
        self.with_conn(|conn| availability(conn, event_id, excluding_user))
    }

    /// Give `user_id` the first free seat among `candidates`, in the caller's
    /// order. The user's own current seat always counts as free for them.
    pub fn allocate_seat(&self, event_id: i64, user_id: &str, candidates: &[u32]) -> Result<Option<u32>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let seat = allocate(&tx, event_id, user_id, candidates)?;
            tx.commit()?;
            Ok(seat)
        })
    }

    /// Allocation driven by a registration session: checks that the session
    /// is collecting seats, allocates, and moves it to confirmation with the
    /// seat, all in one transaction.
    pub fn allocate_seat_for_session(&self, user_id: &str, candidates: &[u32]) -> Result<SeatOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(session) = query_session(&tx, user_id)? else {
                return Ok(SeatOutcome::Stale);
            };
            if session.stage().ok() != Some(Stage::CollectingPreferredSeats) {
                return Ok(SeatOutcome::Stale);
            }

            let Some(seat) = allocate(&tx, session.event_id, user_id, candidates)? else {
                return Ok(SeatOutcome::AllTaken);
            };
            advance(
                &tx,
                user_id,
                Stage::CollectingPreferredSeats,
                Stage::ShowingConfirmation,
                &SessionChange::Seat(Some(seat)),
            )?;
            tx.commit()?;
            Ok(SeatOutcome::Allocated(seat))
        })
    }

    /// Drop a seat hold that was never confirmed, including a pending move
    /// of a confirmed registration. Confirmed rows keep their seat.
    pub fn release_hold(&self, event_id: i64, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM registrations
                 WHERE event_id = ?1 AND user_id = ?2 AND (status != 'confirmed' OR pending = 1)",
                params![event_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Expire holds last touched strictly before `cutoff`. Idempotent.
    pub fn release_expired_holds(&self, cutoff: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE registrations SET status = 'available'
                 WHERE status = 'reserved' AND updated_at < ?1",
                [cutoff],
            )?;
            if changed > 0 {
                info!("Released {} expired seat hold(s)", changed);
            }
            Ok(changed)
        })
    }

    /// Move a reserve entrant onto the main list at the lowest free seat.
    pub fn promote(&self, event_id: i64, user_id: &str) -> Result<PromoteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(row) = query_registration(&tx, event_id, user_id)? else {
                return Ok(PromoteOutcome::NotRegistered);
            };
            if !row.reserve {
                return Ok(PromoteOutcome::NotReserve);
            }
            let outcome = promote_row(&tx, event_id, row.id, user_id)?;
            tx.commit()?;
            Ok(outcome)
        })
    }

    /// Promote whoever has waited longest on the reserve list.
    pub fn promote_next(&self, event_id: i64) -> Result<PromoteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let next: Option<(i64, String)> = tx
                .query_row(
                    "SELECT id, user_id FROM registrations
                     WHERE event_id = ?1 AND reserve = 1 AND status = 'confirmed'
                     ORDER BY created_at, id LIMIT 1",
                    [event_id],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()?;
            let Some((row_id, user_id)) = next else {
                return Ok(PromoteOutcome::NoReserves);
            };
            let outcome = promote_row(&tx, event_id, row_id, &user_id)?;
            tx.commit()?;
            Ok(outcome)
        })
    }

    /// Clear the user's seat and put them on the reserve list. Other seats
    /// are not renumbered.
    ///
    /// The row is written anew, so a demoted entrant queues behind everyone
    /// already waiting; payment state carries over.
    pub fn demote(&self, event_id: i64, user_id: &str) -> Result<DemoteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(row) = query_registration(&tx, event_id, user_id)? else {
                return Ok(DemoteOutcome::NotRegistered);
            };
            if row.reserve {
                return Ok(DemoteOutcome::AlreadyReserve);
            }
            let now = now_ts();
            drop_pending_hold(&tx, event_id, user_id)?;
            tx.execute("DELETE FROM registrations WHERE id = ?1", [row.id])?;
            tx.execute(
                "INSERT INTO registrations (event_id, user_id, seat, has_paid, paid_at, reserve, status, created_at, updated_at)
                 VALUES (?1, ?2, NULL, ?3, ?4, 1, 'confirmed', ?5, ?5)",
                params![event_id, user_id, row.has_paid, row.paid_at, now],
            )?;
            tx.commit()?;
            info!("Demoted {} in event {} (freed seat {:?})", user_id, event_id, row.seat);
            Ok(DemoteOutcome::Demoted { freed_seat: row.seat })
        })
    }

    /// Admin seat change for an existing main-list registration.
    pub fn assign_seat(&self, event_id: i64, user_id: &str, seat: u32) -> Result<AssignOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(row) = query_registration(&tx, event_id, user_id)? else {
                return Ok(AssignOutcome::NotRegistered);
            };
            let total = query_event(&tx, event_id)?.map(|e| e.total_seats).unwrap_or(0);
            if seat == 0 || seat > total {
                return Ok(AssignOutcome::OutOfRange);
            }
            if seat_taken_by_other(&tx, event_id, seat, user_id)? {
                return Ok(AssignOutcome::Taken);
            }
            // The user's own pending pick of this seat gives way
            tx.execute(
                "DELETE FROM registrations WHERE event_id = ?1 AND user_id = ?2 AND pending = 1 AND seat = ?3",
                params![event_id, user_id, seat],
            )?;
            tx.execute(
                "UPDATE registrations SET seat = ?2, reserve = 0, status = 'confirmed', updated_at = ?3 WHERE id = ?1",
                params![row.id, seat, now_ts()],
            )?;
            tx.commit()?;
            Ok(AssignOutcome::Assigned)
        })
    }
}

fn seat_taken(conn: &Connection, event_id: i64, seat: u32) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM registrations
                       WHERE event_id = ?1 AND seat = ?2 AND reserve = 0 AND status != 'available')",
        params![event_id, seat],
        |r| r.get(0),
    )?)
}

pub(crate) fn seat_taken_by_other(conn: &Connection, event_id: i64, seat: u32, user_id: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM registrations
                       WHERE event_id = ?1 AND seat = ?2 AND reserve = 0 AND status != 'available'
                         AND user_id != ?3)",
        params![event_id, seat, user_id],
        |r| r.get(0),
    )?)
}

fn occupied(conn: &Connection, event_id: i64) -> Result<Vec<u32>> {
    let mut stmt = conn.prepare(
        "SELECT seat FROM registrations
         WHERE event_id = ?1 AND reserve = 0 AND seat IS NOT NULL AND status != 'available'
         ORDER BY seat",
    )?;
    let seats = stmt
        .query_map([event_id], |r| r.get(0))?
        .collect::<std::result::Result<Vec<u32>, _>>()?;
    Ok(seats)
}

pub(crate) fn availability(conn: &Connection, event_id: i64, excluding_user: Option<&str>) -> Result<Option<Availability>> {
    let Some(event) = query_event(conn, event_id)? else {
        return Ok(None);
    };
    let used: i64 = conn.query_row(
        "SELECT COUNT(*) FROM registrations
         WHERE event_id = ?1 AND reserve = 0 AND seat IS NOT NULL AND status != 'available'
           AND (?2 IS NULL OR user_id != ?2)",
        params![event_id, excluding_user],
        |r| r.get(0),
    )?;
    Ok(Some(Availability {
        available: i64::from(event.total_seats) - used,
        total: event.total_seats,
    }))
}

fn allocate(conn: &Connection, event_id: i64, user_id: &str, candidates: &[u32]) -> Result<Option<u32>> {
    let own = query_registration(conn, event_id, user_id)?;
    if own.as_ref().is_some_and(|r| r.reserve && r.status == RegistrationStatus::Confirmed) {
        // Confirmed reserve entrants only move up through promotion
        return Ok(None);
    }
    // A confirmed row keeps its seat until the user confirms the change, so
    // a new pick goes into a separate pending hold.
    let (committed, hold) = match own {
        Some(row) if row.status == RegistrationStatus::Confirmed => {
            let pending = query_pending_hold(conn, event_id, user_id)?;
            (Some(row), pending)
        }
        other => (None, other),
    };
    let now = now_ts();

    for &seat in candidates {
        if committed.as_ref().is_some_and(|r| r.holds_seat() && r.seat == Some(seat)) {
            drop_pending_hold(conn, event_id, user_id)?;
            debug!("{} re-affirmed seat {} in event {}", user_id, seat, event_id);
            return Ok(Some(seat));
        }
        if let Some(row) = hold.as_ref().filter(|r| r.holds_seat() && r.seat == Some(seat)) {
            conn.execute("UPDATE registrations SET updated_at = ?2 WHERE id = ?1", params![row.id, now])?;
            debug!("{} re-affirmed held seat {} in event {}", user_id, seat, event_id);
            return Ok(Some(seat));
        }
        if seat_taken(conn, event_id, seat)? {
            continue;
        }

        let written = match &hold {
            Some(row) => conn.execute(
                "UPDATE registrations SET seat = ?2, reserve = 0, status = 'reserved', updated_at = ?3 WHERE id = ?1",
                params![row.id, seat, now],
            ),
            None => conn.execute(
                "INSERT INTO registrations (event_id, user_id, seat, has_paid, reserve, status, pending, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, 0, 'reserved', ?4, ?5, ?5)",
                params![event_id, user_id, seat, committed.is_some(), now],
            ),
        };
        match written.map_err(anyhow::Error::from) {
            Ok(_) => {
                debug!("{} holds seat {} in event {}", user_id, seat, event_id);
                return Ok(Some(seat));
            }
            Err(e) if is_constraint_violation(&e) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

pub(crate) fn drop_pending_hold(conn: &Connection, event_id: i64, user_id: &str) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM registrations WHERE event_id = ?1 AND user_id = ?2 AND pending = 1",
        params![event_id, user_id],
    )?;
    Ok(changed > 0)
}

fn promote_row(conn: &Connection, event_id: i64, row_id: i64, user_id: &str) -> Result<PromoteOutcome> {
    let Some(capacity) = availability(conn, event_id, None)? else {
        return Ok(PromoteOutcome::NotRegistered);
    };
    if capacity.available <= 0 {
        return Ok(PromoteOutcome::EventFull);
    }
    let Some(seat) = lowest_free_seat(&occupied(conn, event_id)?, capacity.total) else {
        return Ok(PromoteOutcome::EventFull);
    };
    conn.execute(
        "UPDATE registrations SET seat = ?2, reserve = 0, status = 'confirmed', updated_at = ?3 WHERE id = ?1",
        params![row_id, seat, now_ts()],
    )?;
    info!("Promoted {} in event {} to seat {}", user_id, event_id, seat);
    Ok(PromoteOutcome::Promoted {
        user_id: user_id.to_string(),
        seat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tests::{event_fields, user_fields};
    use crate::{TIMESTAMP_FORMAT, format_ts};
    use chrono::{Duration, Utc};

    fn seated(db: &Database, event: i64, user: &str, nick: &str, seat: Option<u32>, reserve: bool) {
        db.create_user(user, &user_fields(nick)).unwrap();
        db.add_registration(event, user, seat, reserve, false).unwrap();
    }

    #[test]
    fn gap_fill_takes_lowest_hole() {
        assert_eq!(lowest_free_seat(&[], 4), Some(1));
        assert_eq!(lowest_free_seat(&[1, 2, 4], 4), Some(3));
        assert_eq!(lowest_free_seat(&[4, 2, 1, 2], 5), Some(3));
        assert_eq!(lowest_free_seat(&[2, 3], 3), Some(1));
        assert_eq!(lowest_free_seat(&[1, 2], 2), None);
        assert_eq!(lowest_free_seat(&[], 0), None);
    }

    #[test]
    fn first_free_candidate_in_preference_order() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(10)).unwrap();
        seated(&db, e, "u9", "Taken", Some(7), false);

        assert_eq!(db.allocate_seat(e, "u1", &[7, 9, 3]).unwrap(), Some(9));
        assert!(db.is_seat_taken(e, 9).unwrap());
        assert_eq!(db.allocate_seat(e, "u2", &[7, 9]).unwrap(), None);
    }

    #[test]
    fn reaffirming_own_seat_is_a_noop() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(10)).unwrap();
        seated(&db, e, "u1", "Nova", Some(4), false);
        seated(&db, e, "u2", "Orion", Some(5), false);

        assert_eq!(db.allocate_seat(e, "u1", &[4, 1]).unwrap(), Some(4));
        assert_eq!(db.get_registration(e, "u2").unwrap().unwrap().seat, Some(5));
        let own = db.get_registration(e, "u1").unwrap().unwrap();
        assert_eq!(own.seat, Some(4));
        assert_eq!(own.status, RegistrationStatus::Confirmed);
    }

    #[test]
    fn moving_keeps_single_row() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(10)).unwrap();

        assert_eq!(db.allocate_seat(e, "u1", &[2]).unwrap(), Some(2));
        assert_eq!(db.allocate_seat(e, "u1", &[6]).unwrap(), Some(6));
        assert!(!db.is_seat_taken(e, 2).unwrap());
        assert_eq!(db.occupied_seats(e).unwrap(), vec![6]);
    }

    #[test]
    fn confirmed_seat_survives_a_released_edit() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(10)).unwrap();
        seated(&db, e, "u1", "Nova", Some(5), false);

        assert_eq!(db.allocate_seat(e, "u1", &[3]).unwrap(), Some(3));
        assert_eq!(db.get_registration(e, "u1").unwrap().unwrap().seat, Some(5));
        assert_eq!(db.occupied_seats(e).unwrap(), vec![3, 5]);
        assert_eq!(db.allocate_seat(e, "u2", &[5]).unwrap(), None);

        // A second pick replaces the pending one instead of adding another
        assert_eq!(db.allocate_seat(e, "u1", &[3, 7]).unwrap(), Some(3));
        assert_eq!(db.allocate_seat(e, "u1", &[8]).unwrap(), Some(8));
        assert_eq!(db.occupied_seats(e).unwrap(), vec![5, 8]);

        assert!(db.release_hold(e, "u1").unwrap());
        let own = db.get_registration(e, "u1").unwrap().unwrap();
        assert_eq!(own.seat, Some(5));
        assert_eq!(own.status, RegistrationStatus::Confirmed);
        assert_eq!(db.occupied_seats(e).unwrap(), vec![5]);

        // Picking the committed seat again drops any pending pick
        db.allocate_seat(e, "u1", &[9]).unwrap();
        assert_eq!(db.allocate_seat(e, "u1", &[5]).unwrap(), Some(5));
        assert_eq!(db.occupied_seats(e).unwrap(), vec![5]);
    }

    #[test]
    fn racing_threads_never_share_a_seat() {
        let db = std::sync::Arc::new(Database::open_in_memory().unwrap());
        let e = db.create_event(&event_fields(3)).unwrap();

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || db.allocate_seat(e, &format!("u{}", i), &[1, 2, 3]).unwrap())
            })
            .collect();
        let mut won: Vec<u32> = handles.into_iter().filter_map(|h| h.join().unwrap()).collect();
        won.sort_unstable();
        assert_eq!(won, vec![1, 2, 3]);
    }

    #[test]
    fn availability_can_exclude_editor() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(2)).unwrap();
        seated(&db, e, "u1", "Nova", Some(1), false);
        seated(&db, e, "u2", "Orion", None, true);

        assert_eq!(db.available_seats(e, None).unwrap(), Some(Availability { available: 1, total: 2 }));
        assert_eq!(db.available_seats(e, Some("u1")).unwrap().unwrap().available, 2);
        assert!(db.available_seats(e + 100, None).unwrap().is_none());
    }

    #[test]
    fn promotion_and_demotion_scenario() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(2)).unwrap();

        assert_eq!(db.allocate_seat(e, "a", &[2, 1]).unwrap(), Some(2));
        assert_eq!(db.allocate_seat(e, "b", &[2, 1]).unwrap(), Some(1));
        assert_eq!(db.allocate_seat(e, "c", &[1]).unwrap(), None);
        assert_eq!(db.available_seats(e, None).unwrap().unwrap().available, 0);
        seated(&db, e, "c", "Charlie", None, true);
        seated(&db, e, "d", "Delta", None, true);

        assert_eq!(db.promote(e, "c").unwrap(), PromoteOutcome::EventFull);

        assert_eq!(db.demote(e, "a").unwrap(), DemoteOutcome::Demoted { freed_seat: Some(2) });
        assert_eq!(db.get_registration(e, "b").unwrap().unwrap().seat, Some(1));

        assert_eq!(
            db.promote_next(e).unwrap(),
            PromoteOutcome::Promoted { user_id: "c".into(), seat: 2 }
        );
        assert_eq!(db.demote(e, "a").unwrap(), DemoteOutcome::AlreadyReserve);
        assert_eq!(db.promote(e, "b").unwrap(), PromoteOutcome::NotReserve);
        assert_eq!(db.promote(e, "zz").unwrap(), PromoteOutcome::NotRegistered);
    }

    #[test]
    fn promotion_fills_lowest_gap() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(5)).unwrap();
        seated(&db, e, "u1", "One", Some(1), false);
        seated(&db, e, "u2", "Two", Some(2), false);
        seated(&db, e, "u4", "Four", Some(4), false);
        seated(&db, e, "r1", "Res", None, true);

        assert_eq!(
            db.promote(e, "r1").unwrap(),
            PromoteOutcome::Promoted { user_id: "r1".into(), seat: 3 }
        );
    }

    #[test]
    fn promote_next_without_reserves() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(5)).unwrap();
        assert_eq!(db.promote_next(e).unwrap(), PromoteOutcome::NoReserves);
    }

    #[test]
    fn expired_holds_free_their_seat() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(4)).unwrap();
        seated(&db, e, "u1", "Nova", Some(1), false);
        assert_eq!(db.allocate_seat(e, "u2", &[2]).unwrap(), Some(2));

        // Nothing is old enough yet
        let cutoff = format_ts((Utc::now() - Duration::minutes(10)).naive_utc());
        assert_eq!(db.release_expired_holds(&cutoff).unwrap(), 0);

        let future = (Utc::now() + Duration::seconds(1)).naive_utc().format(TIMESTAMP_FORMAT).to_string();
        assert_eq!(db.release_expired_holds(&future).unwrap(), 1);
        assert_eq!(db.release_expired_holds(&future).unwrap(), 0);

        assert!(!db.is_seat_taken(e, 2).unwrap());
        assert!(db.is_seat_taken(e, 1).unwrap());
        assert_eq!(db.allocate_seat(e, "u3", &[2]).unwrap(), Some(2));
    }

    #[test]
    fn releasing_hold_spares_confirmed_rows() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(4)).unwrap();
        seated(&db, e, "u1", "Nova", Some(1), false);
        db.allocate_seat(e, "u2", &[2]).unwrap();

        assert!(!db.release_hold(e, "u1").unwrap());
        assert!(db.release_hold(e, "u2").unwrap());
        assert_eq!(db.occupied_seats(e).unwrap(), vec![1]);
    }

    #[test]
    fn admin_seat_assignment() {
        let db = Database::open_in_memory().unwrap();
        let e = db.create_event(&event_fields(4)).unwrap();
        seated(&db, e, "u1", "Nova", Some(1), false);
        seated(&db, e, "u2", "Orion", Some(2), false);

        assert_eq!(db.assign_seat(e, "u1", 2).unwrap(), AssignOutcome::Taken);
        assert_eq!(db.assign_seat(e, "u1", 5).unwrap(), AssignOutcome::OutOfRange);
        assert_eq!(db.assign_seat(e, "u1", 3).unwrap(), AssignOutcome::Assigned);
        assert_eq!(db.assign_seat(e, "nobody", 4).unwrap(), AssignOutcome::NotRegistered);
        assert_eq!(db.occupied_seats(e).unwrap(), vec![2, 3]);
    }
}
