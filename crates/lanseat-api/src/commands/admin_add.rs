use tracing::info;

use lanseat_db::is_constraint_violation;
use lanseat_db::models::EventFields;
use lanseat_db::queries::UserFields;
use lanseat_db::seats::lowest_free_seat;
use lanseat_types::api::{CommandSchema, OptionKind, OptionSpec, Reply, SubcommandSchema};
use lanseat_types::events::Invoker;

use super::{EVENT, country_code, full_event_error, unknown_subcommand};
use crate::activity::log_activity;
use crate::error::ApiError;
use crate::options::{Options, autocomplete, opt, required};
use crate::parse::{is_valid_email, parse_event_date, parse_id};
use crate::permissions::require_admin;
use crate::replies;
use crate::state::AppState;

const NAME: OptionSpec = required(opt("name", "Name of the event", OptionKind::String));
const LOCATION: OptionSpec = required(opt("location", "Location of the event", OptionKind::String));
const START: OptionSpec = required(opt(
    "startdate",
    "Start date and time of the event (Format: YYYY-MM-DD HH:mm)",
    OptionKind::String,
));
const END: OptionSpec = required(opt(
    "enddate",
    "End date and time of the event (Format: YYYY-MM-DD HH:mm)",
    OptionKind::String,
));
const SEATS: OptionSpec = required(opt("seatsavailable", "Number of seats available", OptionKind::Integer));
const FEE: OptionSpec = required(opt("entryfee", "Entry fee for the event", OptionKind::Integer));
const CHANNEL: OptionSpec = opt("participantchannel", "Channel for the participant list", OptionKind::String);

const USER: OptionSpec = required(opt("user", "Platform user to add", OptionKind::User));
const NICKNAME: OptionSpec = required(opt("nickname", "Gaming nickname of the user", OptionKind::String));
const FIRSTNAME: OptionSpec = required(opt("firstname", "Firstname of the user", OptionKind::String));
const LASTNAME: OptionSpec = required(opt("lastname", "Lastname of the user", OptionKind::String));
const COUNTRY: OptionSpec = required(autocomplete(opt("country", "Country of residence", OptionKind::String)));
const EMAIL: OptionSpec = required(opt("email", "E-mail address", OptionKind::String));
const HAS_PAID: OptionSpec = required(opt(
    "haspaid",
    "Specify if the user has paid the entry fee or not",
    OptionKind::Boolean,
));
const SEAT: OptionSpec = opt("seat", "Assigned seat for the user", OptionKind::Integer);
const RESERVE: OptionSpec = opt("reserve", "Specify if the user is a reserve", OptionKind::Boolean);

pub const SCHEMA: CommandSchema = CommandSchema {
    name: "adminadd",
    description: "Add an event or a user",
    options: &[],
    subcommands: &[
        SubcommandSchema {
            name: "event",
            description: "Add a new event",
            options: &[NAME, LOCATION, START, END, SEATS, FEE, CHANNEL],
        },
        SubcommandSchema {
            name: "user",
            description: "Add a user to an event",
            options: &[
                EVENT, USER, NICKNAME, FIRSTNAME, LASTNAME, COUNTRY, EMAIL, HAS_PAID, SEAT, RESERVE,
            ],
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
        Some("event") => add_event(state, invoker, options).await,
        Some("user") => add_user(state, invoker, options).await,
        other => Err(unknown_subcommand("adminadd", other)),
    }
}

/// Validated event fields from the `adminadd event` options.
pub(crate) fn event_fields(options: &Options<'_>) -> Result<EventFields, ApiError> {
    let name = options.require_string(&NAME)?;
    if name.is_empty() {
        return Err(ApiError::Validation("The event name cannot be empty.".into()));
    }
    let start_raw = options.require_string(&START)?;
    let end_raw = options.require_string(&END)?;
    let start = parse_event_date(&start_raw, START.name)?;
    let end = parse_event_date(&end_raw, END.name)?;
    if start > end {
        return Err(ApiError::Validation(
            "Start date cannot be after end date. Please correct the dates.".into(),
        ));
    }
    let total_seats = seat_count(options.require_integer(&SEATS)?)?;
    let entry_fee = options.require_integer(&FEE)?;
    if entry_fee < 0 {
        return Err(ApiError::Validation("The entry fee cannot be negative.".into()));
    }
    let participant_channel = options.string(&CHANNEL)?.map(|raw| channel_id(&raw)).transpose()?;

    Ok(EventFields {
        name,
        location: options.require_string(&LOCATION)?,
        start_at: start_raw.trim().to_string(),
        end_at: end_raw.trim().to_string(),
        total_seats,
        entry_fee,
        participant_channel,
    })
}

pub(crate) fn seat_count(raw: i64) -> Result<u32, ApiError> {
    u32::try_from(raw)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ApiError::Validation("The number of seats must be a positive number.".into()))
}

pub(crate) fn channel_id(raw: &str) -> Result<String, ApiError> {
    parse_id(raw).ok_or_else(|| {
        ApiError::Validation("The participant channel must be a channel id or a #channel mention.".into())
    })
}

async fn add_event(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let fields = event_fields(options)?;
    let name = fields.name.clone();
    let id = state.db(move |db| db.create_event(&fields)).await?;

    info!("{} created event {} ({})", invoker.username, id, name);
    log_activity(state, format!("Event **{}** was added by {}", name, invoker.username));
    Ok(replies::success("Event Added", &format!("Event **{}** added successfully! (ID {})", name, id)).ephemeral())
}

async fn add_user(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let event_id = options.require_event_id(&EVENT)?;
    let user_id = options.require_user(&USER)?;
    let fields = UserFields {
        nickname: options.require_string(&NICKNAME)?,
        firstname: options.require_string(&FIRSTNAME)?,
        lastname: options.require_string(&LASTNAME)?,
        country: country_code(&options.require_string(&COUNTRY)?)?,
        email: options.require_string(&EMAIL)?,
    };
    if fields.nickname.is_empty() {
        return Err(ApiError::Validation("The nickname cannot be empty.".into()));
    }
    if !is_valid_email(&fields.email) {
        return Err(ApiError::Validation(
            "You have entered an email-address in an invalid format. Please provide a valid email.".into(),
        ));
    }
    let has_paid = options.require_boolean(&HAS_PAID)?;
    let seat = options.integer(&SEAT)?;
    let reserve = options.boolean(&RESERVE)?;

    let uid = user_id.clone();
    let (event, registration, availability, occupied, nickname_taken, email_taken) = {
        let nickname = fields.nickname.clone();
        let email = fields.email.clone();
        state
            .db(move |db| {
                Ok((
                    db.get_event(event_id)?,
                    db.get_registration(event_id, &uid)?,
                    db.available_seats(event_id, None)?,
                    db.occupied_seats(event_id)?,
                    db.nickname_taken(&nickname, &uid)?,
                    db.email_taken(&email, &uid)?,
                ))
            })
            .await?
    };

    let Some(event) = event else {
        return Err(ApiError::NotFound("The specified event does not exist.".into()));
    };
    if registration.is_some() {
        return Err(ApiError::Conflict(format!(
            "User {} is already registered for event **{}**.",
            user_id, event.name
        )));
    }
    if nickname_taken {
        return Err(ApiError::Conflict(format!("The nickname **{}** is already taken.", fields.nickname)));
    }
    if email_taken {
        return Err(ApiError::Conflict("A user with this email already exists.".into()));
    }

    let full = availability.is_none_or(|a| a.available <= 0);
    let reserve = match reserve {
        Some(false) if full => return Err(full_event_error(&event.name)),
        Some(reserve) => reserve,
        None => full,
    };
    let seat = if reserve {
        None
    } else {
        match seat {
            Some(seat) => {
                let seat = u32::try_from(seat)
                    .ok()
                    .filter(|s| (1..=event.total_seats).contains(s))
                    .ok_or_else(|| {
                        ApiError::Validation(format!(
                            "The seat number exceeds the available seats for this event. Maximum seat number is {}.",
                            event.total_seats
                        ))
                    })?;
                if occupied.contains(&seat) {
                    return Err(ApiError::Conflict(
                        "The specified seat is already taken for this event. Please choose a different seat.".into(),
                    ));
                }
                Some(seat)
            }
            None => Some(lowest_free_seat(&occupied, event.total_seats).ok_or_else(|| full_event_error(&event.name))?),
        }
    };

    let uid = user_id.clone();
    let profile = fields.clone();
    let written = state
        .db(move |db| {
            if db.get_user(&uid)?.is_some() {
                db.update_user(&uid, &profile)?;
            } else {
                db.create_user(&uid, &profile)?;
            }
            db.add_registration(event_id, &uid, seat, reserve, has_paid)
        })
        .await;
    match written {
        Err(ApiError::Storage(e)) if is_constraint_violation(&e) => {
            return Err(ApiError::Conflict(
                "The seat, nickname or e-mail address was taken in the meantime. Please try again.".into(),
            ));
        }
        other => {
            other?;
        }
    }

    let display_name = state.dispatcher.username(&user_id).await.unwrap_or_else(|| user_id.clone());
    let placement = match seat {
        Some(seat) => format!("seat {}", seat),
        None => "the reserves list".to_string(),
    };
    info!("{} added {} to event {} on {}", invoker.username, user_id, event_id, placement);
    state.publisher.schedule(event_id);
    log_activity(
        state,
        format!(
            "User **{}** ({}) was added to event **{}** on {} by {}",
            display_name, fields.nickname, event.name, placement, invoker.username
        ),
    );

    Ok(replies::success(
        "User Added",
        &format!(
            "User **{}** ({}) was added successfully to event **{}** on {}!",
            display_name, fields.nickname, event.name, placement
        ),
    )
    .ephemeral())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanseat_types::events::{CommandOption, OptionValue};

    fn string(name: &str, value: &str) -> CommandOption {
        CommandOption {
            name: name.into(),
            value: OptionValue::String(value.into()),
        }
    }

    fn event_options(start: &str, end: &str, seats: i64) -> Vec<CommandOption> {
        vec![
            string("name", "Winter LAN"),
            string("location", "Gothenburg"),
            string("startdate", start),
            string("enddate", end),
            CommandOption {
                name: "seatsavailable".into(),
                value: OptionValue::Integer(seats),
            },
            CommandOption {
                name: "entryfee".into(),
                value: OptionValue::Integer(30),
            },
            string("participantchannel", "<#555>"),
        ]
    }

    #[test]
    fn event_fields_from_options() {
        let values = event_options("2030-03-01 18:00", "2030-03-03 12:00", 40);
        let fields = event_fields(&Options::new(&values)).unwrap();
        assert_eq!(fields.total_seats, 40);
        assert_eq!(fields.participant_channel.as_deref(), Some("555"));
    }

    #[test]
    fn start_after_end_is_rejected() {
        let values = event_options("2030-03-04 18:00", "2030-03-03 12:00", 40);
        assert!(matches!(
            event_fields(&Options::new(&values)),
            Err(ApiError::Validation(msg)) if msg.contains("Start date")
        ));
    }

    #[test]
    fn seat_count_must_be_positive() {
        let values = event_options("2030-03-01 18:00", "2030-03-03 12:00", 0);
        assert!(event_fields(&Options::new(&values)).is_err());
    }
}
