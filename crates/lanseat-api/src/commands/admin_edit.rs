use tracing::info;

use lanseat_db::is_constraint_violation;
use lanseat_db::models::{EventFields, EventRow, UserRow};
use lanseat_db::queries::UserFields;
use lanseat_db::seats::{AssignOutcome, DemoteOutcome, PromoteOutcome};
use lanseat_types::api::{CommandSchema, OptionKind, OptionSpec, Reply, SubcommandSchema};
use lanseat_types::events::Invoker;
use lanseat_types::models::RegistrationStatus;

use super::admin_add::{channel_id, seat_count};
use super::{EVENT, change_lines, country_code, full_event_error, unknown_subcommand};
use crate::activity::log_activity;
use crate::error::ApiError;
use crate::options::{Options, autocomplete, opt, required};
use crate::parse::{is_valid_email, parse_event_date};
use crate::permissions::require_admin;
use crate::reconciler;
use crate::replies;
use crate::state::AppState;

const NAME: OptionSpec = opt("name", "New name for the event", OptionKind::String);
const LOCATION: OptionSpec = opt("location", "Location of the event", OptionKind::String);
const START: OptionSpec = opt(
    "startdate",
    "Start date and time of the event (Format: YYYY-MM-DD HH:mm)",
    OptionKind::String,
);
const END: OptionSpec = opt(
    "enddate",
    "End date and time of the event (Format: YYYY-MM-DD HH:mm)",
    OptionKind::String,
);
const SEATS: OptionSpec = opt("seatsavailable", "Number of available seats", OptionKind::Integer);
const FEE: OptionSpec = opt("entryfee", "Entry fee for the event", OptionKind::Integer);
const CHANNEL: OptionSpec = opt(
    "participantchannel",
    "Participant channel for the event ('none' to clear)",
    OptionKind::String,
);

const NICKNAME: OptionSpec = required(opt("nickname", "Nickname of the user to edit", OptionKind::String));
const NEW_NICKNAME: OptionSpec = opt("newnickname", "New nickname for the user", OptionKind::String);
const FIRSTNAME: OptionSpec = opt("firstname", "First name for the user", OptionKind::String);
const LASTNAME: OptionSpec = opt("lastname", "Last name for the user", OptionKind::String);
const COUNTRY: OptionSpec = autocomplete(opt(
    "country",
    "Country for the user (two-letter country code)",
    OptionKind::String,
));
const EMAIL: OptionSpec = opt("email", "Email for the user", OptionKind::String);

const SEAT: OptionSpec = opt("seat", "Seat number for the user", OptionKind::Integer);
const HAS_PAID: OptionSpec = opt("haspaid", "Has the user paid?", OptionKind::Boolean);
const RESERVE: OptionSpec = opt("reserve", "Set the user as reserve", OptionKind::Boolean);

pub const SCHEMA: CommandSchema = CommandSchema {
    name: "adminedit",
    description: "Edit events, users, or event-specific user properties",
    options: &[],
    subcommands: &[
        SubcommandSchema {
            name: "event",
            description: "Edit event properties",
            options: &[EVENT, NAME, LOCATION, START, END, SEATS, FEE, CHANNEL],
        },
        SubcommandSchema {
            name: "user",
            description: "Edit general user properties",
            options: &[NICKNAME, NEW_NICKNAME, FIRSTNAME, LASTNAME, COUNTRY, EMAIL],
        },
        SubcommandSchema {
            name: "eventuser",
            description: "Edit event-specific user properties",
            options: &[EVENT, NICKNAME, SEAT, HAS_PAID, RESERVE],
        },
        SubcommandSchema {
            name: "promotenext",
            description: "Promote the longest waiting reserve into the lowest free seat",
            options: &[EVENT],
        },
    ],
};

pub async fn run(
    state: &AppState,
    invoker: &Invoker,
    subcommand: Option<&str>,
    options: &Options<'_>,
) -> Result<Reply, ApiError> {
    require_admin(state, invoker).await?;
    match subcommand {
        Some("event") => edit_event(state, invoker, options).await,
        Some("user") => edit_user(state, invoker, options).await,
        Some("eventuser") => edit_event_user(state, invoker, options).await,
        Some("promotenext") => promote_next(state, invoker, options).await,
        other => Err(unknown_subcommand("adminedit", other)),
    }
}

async fn load_event(state: &AppState, event_id: i64) -> Result<EventRow, ApiError> {
    state
        .db(move |db| db.get_event(event_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No event found with the ID: **{}**.", event_id)))
}

async fn load_user(state: &AppState, nickname: &str) -> Result<UserRow, ApiError> {
    let nick = nickname.to_string();
    state
        .db(move |db| db.get_user_by_nickname(&nick))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user found with the nickname: **{}**.", nickname)))
}

/// Apply the given options on top of `current`. Returns the new fields and
/// the `(option, value)` pairs that were set.
pub(crate) fn apply_event_changes(
    current: &EventRow,
    options: &Options<'_>,
) -> Result<(EventFields, Vec<(&'static str, String)>), ApiError> {
    let mut fields = EventFields::from(current);
    let mut changes = Vec::new();

    if let Some(name) = options.string(&NAME)?.filter(|n| !n.is_empty()) {
        changes.push((NAME.name, name.clone()));
        fields.name = name;
    }
    if let Some(location) = options.string(&LOCATION)? {
        changes.push((LOCATION.name, location.clone()));
        fields.location = location;
    }
    if let Some(start) = options.string(&START)? {
        parse_event_date(&start, START.name)?;
        changes.push((START.name, start.clone()));
        fields.start_at = start;
    }
    if let Some(end) = options.string(&END)? {
        parse_event_date(&end, END.name)?;
        changes.push((END.name, end.clone()));
        fields.end_at = end;
    }
    if parse_event_date(&fields.start_at, START.name)? > parse_event_date(&fields.end_at, END.name)? {
        return Err(ApiError::Validation(
            "Start date cannot be after end date. Please correct the dates.".into(),
        ));
    }
    if let Some(seats) = options.integer(&SEATS)? {
        fields.total_seats = seat_count(seats)?;
        changes.push((SEATS.name, seats.to_string()));
    }
    if let Some(fee) = options.integer(&FEE)? {
        if fee < 0 {
            return Err(ApiError::Validation("The entry fee cannot be negative.".into()));
        }
        fields.entry_fee = fee;
        changes.push((FEE.name, fee.to_string()));
    }
    if let Some(channel) = options.string(&CHANNEL)? {
        if channel.is_empty() || channel.eq_ignore_ascii_case("none") {
            fields.participant_channel = None;
            changes.push((CHANNEL.name, "none".into()));
        } else {
            let id = channel_id(&channel)?;
            changes.push((CHANNEL.name, format!("<#{}>", id)));
            fields.participant_channel = Some(id);
        }
    }
    Ok((fields, changes))
}

async fn edit_event(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let event_id = options.require_event_id(&EVENT)?;
    let event = load_event(state, event_id).await?;
    let (fields, changes) = apply_event_changes(&event, options)?;
    if changes.is_empty() {
        return Err(ApiError::Validation("Nothing to update. Provide at least one field.".into()));
    }

    if fields.total_seats < event.total_seats {
        let highest = state.db(move |db| db.max_held_seat(event_id)).await?;
        if let Some(highest) = highest.filter(|h| *h > fields.total_seats) {
            return Err(ApiError::Validation(format!(
                "Seat {} is still occupied. Move that participant before reducing the seats below {}.",
                highest, highest
            )));
        }
    }

    let updated = state.db(move |db| db.update_event(event_id, &fields)).await?;
    if !updated {
        return Err(ApiError::NotFound(format!("No event found with the ID: **{}**.", event_id)));
    }

    info!("{} updated event {}", invoker.username, event_id);
    state.publisher.schedule(event_id);
    log_activity(
        state,
        format!(
            "Event **{}** was updated by [ **{}** ].\n{}",
            event.name,
            invoker.username,
            change_lines(&changes)
        ),
    );
    Ok(replies::success(
        "Event Updated",
        &format!("Event **{}** has been updated successfully!", event.name),
    )
    .ephemeral())
}

async fn edit_user(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let nickname = options.require_string(&NICKNAME)?;
    let user = load_user(state, &nickname).await?;

    let mut fields = UserFields::from(&user);
    let mut changes: Vec<(&str, String)> = Vec::new();
    if let Some(new_nickname) = options.string(&NEW_NICKNAME)?.filter(|n| !n.is_empty()) {
        changes.push((NEW_NICKNAME.name, new_nickname.clone()));
        fields.nickname = new_nickname;
    }
    if let Some(firstname) = options.string(&FIRSTNAME)? {
        changes.push((FIRSTNAME.name, firstname.clone()));
        fields.firstname = firstname;
    }
    if let Some(lastname) = options.string(&LASTNAME)? {
        changes.push((LASTNAME.name, lastname.clone()));
        fields.lastname = lastname;
    }
    if let Some(country) = options.string(&COUNTRY)? {
        fields.country = country_code(&country)?;
        changes.push((COUNTRY.name, fields.country.clone()));
    }
    if let Some(email) = options.string(&EMAIL)? {
        if !is_valid_email(&email) {
            return Err(ApiError::Validation(
                "You have entered an email-address in an invalid format. Please provide a valid email.".into(),
            ));
        }
        changes.push((EMAIL.name, email.clone()));
        fields.email = email;
    }
    if changes.is_empty() {
        return Err(ApiError::Validation("Nothing to update. Provide at least one field.".into()));
    }

    let roster_changed = fields.nickname != user.nickname || fields.country != user.country;
    let uid = user.id.clone();
    let (nick, email) = (fields.nickname.clone(), fields.email.clone());
    let (nickname_taken, email_taken) = state
        .db(move |db| Ok((db.nickname_taken(&nick, &uid)?, db.email_taken(&email, &uid)?)))
        .await?;
    if nickname_taken {
        return Err(ApiError::Conflict(format!("The nickname **{}** is already taken.", fields.nickname)));
    }
    if email_taken {
        return Err(ApiError::Conflict("A user with this email already exists.".into()));
    }

    let uid = user.id.clone();
    let written = state
        .db(move |db| {
            db.update_user(&uid, &fields)?;
            db.events_for_user(&uid)
        })
        .await;
    let events = match written {
        Err(ApiError::Storage(e)) if is_constraint_violation(&e) => {
            return Err(ApiError::Conflict(
                "The nickname or e-mail address was taken in the meantime.".into(),
            ));
        }
        other => other?,
    };

    if roster_changed {
        for event in &events {
            state.publisher.schedule(event.id);
        }
    }
    info!("{} updated user {}", invoker.username, user.id);
    log_activity(
        state,
        format!(
            "User **{}** was updated by [ **{}** ].\n{}",
            nickname,
            invoker.username,
            change_lines(&changes)
        ),
    );
    Ok(replies::success(
        "User Updated",
        &format!("User **{}** has been updated successfully!", nickname),
    )
    .ephemeral())
}

async fn edit_event_user(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let event_id = options.require_event_id(&EVENT)?;
    let nickname = options.require_string(&NICKNAME)?;
    let seat = options.integer(&SEAT)?;
    let has_paid = options.boolean(&HAS_PAID)?;
    let reserve = options.boolean(&RESERVE)?;
    if seat.is_none() && has_paid.is_none() && reserve.is_none() {
        return Err(ApiError::Validation("Nothing to update. Provide at least one field.".into()));
    }

    let event = load_event(state, event_id).await?;
    let user = load_user(state, &nickname).await?;
    let uid = user.id.clone();
    let registration = state
        .db(move |db| db.get_registration(event_id, &uid))
        .await?
        .filter(|r| r.status == RegistrationStatus::Confirmed)
        .ok_or_else(|| {
            ApiError::NotFound(format!("**{}** is not registered for **{}**.", nickname, event.name))
        })?;

    let seat = seat
        .map(|s| {
            u32::try_from(s).map_err(|_| {
                ApiError::Validation(format!(
                    "The seat number exceeds the available seats for this event. Maximum seat number is {}.",
                    event.total_seats
                ))
            })
        })
        .transpose()?;
    let actor = invoker.username.as_str();
    let mut changes: Vec<(&str, String)> = Vec::new();

    match (registration.reserve, reserve, seat) {
        // Off the reserve list into a chosen seat
        (true, Some(false), Some(seat)) => {
            let available = state
                .db(move |db| db.available_seats(event_id, None))
                .await?
                .map_or(0, |a| a.available);
            if available <= 0 {
                return Err(full_event_error(&event.name));
            }
            assign(state, &event, &user.id, seat).await?;
            reconciler::announce_promotion(state, event_id, &user.id, seat, actor).await?;
            changes.push((RESERVE.name, "false".into()));
            changes.push((SEAT.name, seat.to_string()));
        }
        (true, Some(false), None) => match reconciler::promote(state, event_id, &user.id, actor).await? {
            PromoteOutcome::Promoted { seat, .. } => {
                changes.push((RESERVE.name, "false".into()));
                changes.push((SEAT.name, seat.to_string()));
            }
            PromoteOutcome::EventFull => return Err(full_event_error(&event.name)),
            _ => {
                return Err(ApiError::Conflict(format!(
                    "**{}** is no longer on the reserves list.",
                    nickname
                )));
            }
        },
        (false, Some(true), _) => match reconciler::demote(state, event_id, &user.id, actor).await? {
            DemoteOutcome::Demoted { .. } => changes.push((RESERVE.name, "true".into())),
            _ => {
                return Err(ApiError::Conflict(format!("**{}** is already a reserve.", nickname)));
            }
        },
        (true, _, Some(_)) => {
            return Err(ApiError::Validation(
                "Reserves have no seat. Set `reserve` to false to move them to the main list.".into(),
            ));
        }
        (false, _, Some(seat)) => {
            assign(state, &event, &user.id, seat).await?;
            changes.push((SEAT.name, seat.to_string()));
        }
        _ => {}
    }

    if let Some(has_paid) = has_paid {
        let uid = user.id.clone();
        state.db(move |db| db.set_paid(event_id, &uid, has_paid)).await?;
        changes.push((HAS_PAID.name, has_paid.to_string()));
    }

    if changes.is_empty() {
        return Ok(replies::info("No Changes", &format!("**{}** already has these settings.", nickname)).ephemeral());
    }
    state.publisher.schedule(event_id);
    log_activity(
        state,
        format!(
            "User **{}** was updated by [ **{}** ].\n{}",
            nickname,
            actor,
            change_lines(&changes)
        ),
    );
    Ok(replies::success(
        "User Updated",
        &format!("User **{}** has been updated successfully!", nickname),
    )
    .ephemeral())
}

async fn assign(state: &AppState, event: &EventRow, user_id: &str, seat: u32) -> Result<(), ApiError> {
    let (event_id, uid) = (event.id, user_id.to_string());
    match state.db(move |db| db.assign_seat(event_id, &uid, seat)).await? {
        AssignOutcome::Assigned => Ok(()),
        AssignOutcome::OutOfRange => Err(ApiError::Validation(format!(
            "The seat number exceeds the available seats for this event. Maximum seat number is {}.",
            event.total_seats
        ))),
        AssignOutcome::Taken => Err(ApiError::Conflict(format!(
            "Seat {} is already taken for this event. Please choose a different seat.",
            seat
        ))),
        AssignOutcome::NotRegistered => Err(ApiError::NotFound("The registration no longer exists.".into())),
    }
}

async fn promote_next(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let event_id = options.require_event_id(&EVENT)?;
    let event = load_event(state, event_id).await?;

    match reconciler::promote_next(state, event_id, &invoker.username).await? {
        PromoteOutcome::Promoted { user_id, seat } => {
            let uid = user_id.clone();
            let nickname = state
                .db(move |db| db.get_user(&uid))
                .await?
                .map(|u| u.nickname)
                .unwrap_or(user_id);
            Ok(replies::success(
                "Reserve Promoted",
                &format!("**{}** was promoted to seat **{}** at **{}**.", nickname, seat, event.name),
            )
            .ephemeral())
        }
        PromoteOutcome::EventFull => Err(full_event_error(&event.name)),
        _ => Err(ApiError::NotFound(format!(
            "There is no one on the reserves list of **{}**.",
            event.name
        ))),
    }
}
