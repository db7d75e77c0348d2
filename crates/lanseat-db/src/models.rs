//! Database row types. These map directly to SQLite rows and are kept apart
//! from the wire types in lanseat-types.

use chrono::NaiveDateTime;
use lanseat_types::models::{RegistrationStatus, Stage, UnknownStage};

use crate::EVENT_DATE_FORMAT;

#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub id: i64,
    pub name: String,
    pub location: String,
    /// `YYYY-MM-DD HH:MM`
    pub start_at: String,
    pub end_at: String,
    pub total_seats: u32,
    pub entry_fee: i64,
    pub participant_channel: Option<String>,
    pub created_at: String,
}

impl EventRow {
    /// An event is archived once its end date has passed.
    pub fn is_archived(&self, now: NaiveDateTime) -> bool {
        match NaiveDateTime::parse_from_str(&self.end_at, EVENT_DATE_FORMAT) {
            Ok(end) => end < now,
            Err(_) => false,
        }
    }
}

/// Fields used to create an event or overwrite all of its editable columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFields {
    pub name: String,
    pub location: String,
    pub start_at: String,
    pub end_at: String,
    pub total_seats: u32,
    pub entry_fee: i64,
    pub participant_channel: Option<String>,
}

impl From<&EventRow> for EventFields {
    fn from(row: &EventRow) -> Self {
        Self {
            name: row.name.clone(),
            location: row.location.clone(),
            start_at: row.start_at.clone(),
            end_at: row.end_at.clone(),
            total_seats: row.total_seats,
            entry_fee: row.entry_fee,
            participant_channel: row.participant_channel.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    /// Platform user id
    pub id: String,
    pub nickname: String,
    pub firstname: String,
    pub lastname: String,
    /// ISO alpha-2 code, or empty when the user opted out
    pub country: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRow {
    pub id: i64,
    pub event_id: i64,
    pub user_id: String,
    pub seat: Option<u32>,
    pub has_paid: bool,
    pub paid_at: Option<String>,
    pub reserve: bool,
    pub status: RegistrationStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl RegistrationRow {
    /// Whether this row currently blocks its seat number for other users.
    pub fn holds_seat(&self) -> bool {
        !self.reserve && self.seat.is_some() && self.status != RegistrationStatus::Available
    }
}

/// A registration joined with the profile it belongs to, for rosters and
/// admin listings.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub user_id: String,
    pub nickname: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub country: String,
    pub seat: Option<u32>,
    pub has_paid: bool,
    pub paid_at: Option<String>,
    pub reserve: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub user_id: String,
    /// Raw stored stage; parse with [`SessionRow::stage`]
    pub stage: String,
    pub event_id: i64,
    pub nickname: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub unconfirmed_country: Option<String>,
    pub seat: Option<u32>,
    pub updated_at: String,
}

impl SessionRow {
    pub fn stage(&self) -> Result<Stage, UnknownStage> {
        self.stage.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingRow {
    pub key: String,
    pub value: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(end_at: &str) -> EventRow {
        EventRow {
            id: 1,
            name: "LAN".into(),
            location: "Hall".into(),
            start_at: "2024-01-01 10:00".into(),
            end_at: end_at.into(),
            total_seats: 10,
            entry_fee: 0,
            participant_channel: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn archived_after_end_date() {
        let now = NaiveDateTime::parse_from_str("2024-06-01 12:00", EVENT_DATE_FORMAT).unwrap();
        assert!(event("2024-05-31 23:59").is_archived(now));
        assert!(!event("2024-06-02 00:00").is_archived(now));
        assert!(!event("garbage").is_archived(now));
    }
}
