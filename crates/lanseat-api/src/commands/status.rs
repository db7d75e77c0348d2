use chrono::{NaiveDateTime, Utc};

use lanseat_db::EVENT_DATE_FORMAT;
use lanseat_db::models::{EventRow, RegistrationRow};
use lanseat_db::seats::Availability;
use lanseat_types::api::{CommandSchema, Embed, Reply};
use lanseat_types::events::Invoker;
use lanseat_types::models::RegistrationStatus;

use crate::error::ApiError;
use crate::replies::{self, colors};
use crate::state::AppState;

pub const SCHEMA: CommandSchema = CommandSchema {
    name: "status",
    description: "Display upcoming or running events and your registration status",
    options: &[],
    subcommands: &[],
};

pub async fn run(state: &AppState, invoker: &Invoker) -> Result<Reply, ApiError> {
    let uid = invoker.user_id.clone();
    let now = Utc::now().naive_utc();
    let rows = state
        .db(move |db| {
            let mut rows = Vec::new();
            for event in db.list_events()?.into_iter().filter(|e| !e.is_archived(now)) {
                let availability = db.available_seats(event.id, None)?;
                let registration = db
                    .get_registration(event.id, &uid)?
                    .filter(|r| r.status == RegistrationStatus::Confirmed);
                rows.push((event, availability, registration));
            }
            Ok(rows)
        })
        .await?;

    if rows.is_empty() {
        return Ok(replies::info("Event & User Status", "There are no upcoming events right now.").ephemeral());
    }

    let mut reply = Reply::default().ephemeral();
    for (event, availability, registration) in &rows {
        reply = reply.with_embed(status_embed(event, availability.as_ref(), registration.as_ref()));
    }
    Ok(reply)
}

pub fn status_embed(event: &EventRow, availability: Option<&Availability>, registration: Option<&RegistrationRow>) -> Embed {
    let seats = availability
        .map(|a| format!("{} / {}", a.available.max(0), a.total))
        .unwrap_or_else(|| "-".into());

    let mut embed = Embed::new("Event & User Status", colors::INFO)
        .field(&event.name, &event.location)
        .inline_field(":calendar:  Starts", display_date(&event.start_at))
        .inline_field(":calendar:  Ends", display_date(&event.end_at))
        .inline_field(":chair:  Seats available", seats)
        .inline_field(":moneybag:  Entry Fee", format!("€{}", event.entry_fee));

    if let Some(registration) = registration {
        let list = if registration.reserve { "Reserve" } else { "Registered" };
        let payment = if registration.has_paid { "Paid" } else { "Pending" };
        let seat = match registration.seat {
            Some(seat) if !registration.reserve => format!("#{}", seat),
            _ => "Not assigned".to_string(),
        };
        embed = embed
            .inline_field(":pencil:  Registration status", format!("{} ({})", list, payment))
            .inline_field(":seat:  Seat", seat);
    }
    embed
}

/// `2030-03-01 18:00` -> `Friday 1 March 2030, 18:00`
pub(crate) fn display_date(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw, EVENT_DATE_FORMAT) {
        Ok(at) => at.format("%A %-d %B %Y, %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}
