//! The direct-message registration conversation.
//!
//! Every function here runs under the user's lock (see [`crate::router`]),
//! and every stage transition is a conditional update on the stage that was
//! read. A reply that raced an earlier one finds the session already moved
//! and gets [`stale`] instead of a second transition.

use chrono::Utc;
use tracing::{debug, info};

use lanseat_db::is_constraint_violation;
use lanseat_db::models::{EventRow, RegistrationRow, SessionRow, UserRow};
use lanseat_db::seats::SeatOutcome;
use lanseat_db::sessions::{CommitOutcome, SessionChange, SessionDraft};
use lanseat_types::api::{Button, ButtonStyle, Embed, Reply};
use lanseat_types::countries;
use lanseat_types::events::Invoker;
use lanseat_types::models::{RegistrationStatus, Stage};

use crate::activity::log_activity;
use crate::error::ApiError;
use crate::parse::{is_valid_email, parse_seat_list};
use crate::replies::{self, colors};
use crate::state::AppState;

pub const CANCEL_COMMANDS: [&str; 2] = ["!cancel", "!abort"];

pub const MAX_NICKNAME_LEN: usize = 32;
pub const MAX_NAME_LEN: usize = 64;

const EVENT_GONE: &str = "The event you were registering for no longer exists. Type **!cancel** and pick another event.";

pub fn is_cancel(text: &str) -> bool {
    let text = text.trim();
    CANCEL_COMMANDS.iter().any(|c| text.eq_ignore_ascii_case(c))
}

/// Handle one free-text DM from `user_id`. The cancel words are checked by
/// the router before this is called.
pub async fn handle_message(state: &AppState, user_id: &str, content: &str) -> Result<Reply, ApiError> {
    let text = content.trim();
    let uid = user_id.to_string();
    let Some(session) = state.db(move |db| db.get_session(&uid)).await? else {
        return Ok(replies::info(
            "No Registration In Progress",
            "Use **/register** to sign up for an event.",
        ));
    };
    let stage = session
        .stage()
        .map_err(|e| ApiError::CorruptedSession(e.0))?;
    debug!("DM from {} at stage {}", user_id, stage);

    match stage {
        Stage::CollectingNickname => collect_nickname(state, user_id, text).await,
        Stage::CollectingFirstname => {
            let Some(name) = valid_name(text) else {
                return Ok(invalid_name("firstname"));
            };
            step(
                state,
                user_id,
                stage,
                Stage::CollectingLastname,
                SessionChange::Firstname(name),
                Reply::embed(prompt_lastname()),
            )
            .await
        }
        Stage::CollectingLastname => {
            let Some(name) = valid_name(text) else {
                return Ok(invalid_name("lastname"));
            };
            step(
                state,
                user_id,
                stage,
                Stage::CollectingEmail,
                SessionChange::Lastname(name),
                Reply::embed(prompt_email()),
            )
            .await
        }
        Stage::CollectingEmail => collect_email(state, user_id, text).await,
        Stage::CollectingCountry => collect_country(state, user_id, text).await,
        Stage::ConfirmingCountry => {
            if text.eq_ignore_ascii_case("null") {
                enter_seat_stage(state, user_id, stage, SessionChange::ClearCountry).await
            } else {
                Ok(replies::info(
                    "Confirm Your Country",
                    "Please respond using the provided buttons or type 'null' if you wish to set a blank country code.",
                ))
            }
        }
        Stage::CollectingPreferredSeats => collect_seats(state, user_id, &session, text).await,
        Stage::ShowingConfirmation => Ok(replies::info(
            "Use The Buttons",
            "Please use the provided buttons to continue with the registration. If you want to cancel the registration, click the 'Cancel' button.",
        )),
        Stage::EditingExistingRegistration => Ok(replies::info(
            "Use The Buttons",
            "Please use the buttons provided in the previous message to manage your registration.",
        )),
    }
}

/// `/register`: start or restart the user's session for `event_id` and DM
/// the first question. Returns the ephemeral reply to the command.
pub async fn start(state: &AppState, invoker: &Invoker, event_id: i64) -> Result<Reply, ApiError> {
    let uid = invoker.user_id.clone();
    let (event, profile, registration, previous) = state
        .db(move |db| {
            Ok((
                db.get_event(event_id)?,
                db.get_user(&uid)?,
                db.get_registration(event_id, &uid)?,
                db.get_session(&uid)?,
            ))
        })
        .await?;

    let Some(event) = event else {
        return Err(ApiError::NotFound(
            "Invalid event. Please select a valid event to register for.".into(),
        ));
    };
    if event.is_archived(Utc::now().naive_utc()) {
        return Err(ApiError::Validation(format!(
            "The event **{}** has already ended.",
            event.name
        )));
    }

    // A restart discards the previous conversation and whatever it held
    if let Some(previous) = previous {
        let uid = invoker.user_id.clone();
        state
            .db(move |db| db.release_hold(previous.event_id, &uid))
            .await?;
    }

    let user_id = invoker.user_id.as_str();
    let registration = registration.filter(|r| r.status == RegistrationStatus::Confirmed);
    let dm = match (profile, registration) {
        (Some(user), Some(registration)) => {
            open_session(state, user_id, event_id, Stage::EditingExistingRegistration, draft_from(&user, registration.seat)).await?;
            current_registration(&event, &user, &registration)
        }
        (Some(user), None) => {
            open_session(state, user_id, event_id, Stage::CollectingPreferredSeats, draft_from(&user, None)).await?;
            let next = seat_stage_followup(state, user_id).await?;
            prepend(account_exists(&event, &user), next)
        }
        (None, _) => {
            open_session(state, user_id, event_id, Stage::CollectingNickname, SessionDraft::default()).await?;
            Reply::embed(
                Embed::new(
                    format!("You are now registering for the event **__{}__**", event.name),
                    colors::INFO,
                )
                .description(
                    "Please fill in the user and event registration details below. \n\nYou can stop/abort your registration at any time by typing **!abort**. \nYou will also be able to edit your responses at the end of the registration phase before you submit your registration.",
                ),
            )
            .with_embed(prompt_nickname(None))
        }
    };

    info!("{} started registration for event {}", invoker.username, event_id);
    state.dispatcher.send_dm(user_id, dm);
    Ok(Reply::embed(Embed::new("Please check your DMs to manage your registration", colors::SUCCESS)).ephemeral())
}

/// Drop the session and any unconfirmed seat hold. Always answers "Aborted",
/// with or without a session.
pub async fn abort(state: &AppState, user_id: &str) -> Result<Reply, ApiError> {
    let uid = user_id.to_string();
    let released = state
        .db(move |db| {
            let Some(session) = db.get_session(&uid)? else {
                return Ok(false);
            };
            db.delete_session(&uid)?;
            db.release_hold(session.event_id, &uid)
        })
        .await?;
    if released {
        info!("Released the seat hold of {} after abort", user_id);
    }
    Ok(replies::error("Aborted", "Your registration has been aborted!"))
}

/// Yes/No answer to "You've selected X. Is this correct?".
pub async fn confirm_country(state: &AppState, user_id: &str, accepted: bool) -> Result<Reply, ApiError> {
    if accepted {
        enter_seat_stage(state, user_id, Stage::ConfirmingCountry, SessionChange::ConfirmCountry).await
    } else {
        step(
            state,
            user_id,
            Stage::ConfirmingCountry,
            Stage::CollectingCountry,
            SessionChange::RejectCountry,
            Reply::embed(prompt_country()),
        )
        .await
    }
}

/// Rewind to the nickname question, preloading the committed profile when
/// there is one. The target event and the chosen seat are kept.
pub async fn edit(state: &AppState, user_id: &str) -> Result<Reply, ApiError> {
    let uid = user_id.to_string();
    let (session, profile) = state
        .db(move |db| Ok((db.get_session(&uid)?, db.get_user(&uid)?)))
        .await?;
    let Some(session) = session else {
        return Ok(stale());
    };
    let stage = session
        .stage()
        .map_err(|e| ApiError::CorruptedSession(e.0))?;
    if !stage.awaits_buttons() {
        return Ok(stale());
    }

    let draft = match &profile {
        Some(user) => draft_from(user, session.seat),
        None => SessionDraft {
            nickname: session.nickname.clone(),
            firstname: session.firstname.clone(),
            lastname: session.lastname.clone(),
            email: session.email.clone(),
            country: session.country.clone(),
            seat: session.seat,
        },
    };
    let current_nickname = draft.nickname.clone();
    if !advance(state, user_id, stage, Stage::CollectingNickname, SessionChange::Draft(draft)).await? {
        return Ok(stale());
    }

    Ok(Reply::embed(
        Embed::new("Edit Registration", colors::INFO)
            .description("Let's go through your details again. You can stop at any time by typing **!abort**."),
    )
    .with_embed(prompt_nickname(current_nickname.as_deref())))
}

/// "No Changes" on the current-registration summary.
pub async fn keep_existing(state: &AppState, user_id: &str) -> Result<Reply, ApiError> {
    let uid = user_id.to_string();
    let closed = state
        .db(move |db| {
            let Some(session) = db.get_session(&uid)? else {
                return Ok(false);
            };
            if !db.delete_session_at(&uid, Stage::EditingExistingRegistration)? {
                return Ok(false);
            }
            db.release_hold(session.event_id, &uid)?;
            Ok(true)
        })
        .await?;
    if closed {
        Ok(replies::success("No Changes", "Your registration is unchanged. See you at the event!"))
    } else {
        Ok(stale())
    }
}

/// "Continue": commit the session into a profile and registration.
pub async fn complete(state: &AppState, user_id: &str, username: &str) -> Result<Reply, ApiError> {
    let uid = user_id.to_string();
    let outcome = match state.db(move |db| db.commit_session(&uid)).await {
        Err(ApiError::Storage(e)) if is_constraint_violation(&e) => {
            return Err(ApiError::Conflict(
                "Your nickname or e-mail address was registered by someone else in the meantime. Click **Edit responses** to change it.".into(),
            ));
        }
        other => other?,
    };

    match outcome {
        CommitOutcome::Committed {
            event_id,
            seat,
            reserve,
            nickname_changed,
        } => {
            let uid = user_id.to_string();
            let (event, user, events) = state
                .db(move |db| {
                    let events = if nickname_changed { db.events_for_user(&uid)? } else { Vec::new() };
                    Ok((db.get_event(event_id)?, db.get_user(&uid)?, events))
                })
                .await?;

            state.publisher.schedule(event_id);
            for other in events.iter().filter(|e| e.id != event_id) {
                state.publisher.schedule(other.id);
            }

            let event_name = event.map(|e| e.name).unwrap_or_else(|| format!("#{}", event_id));
            let Some(user) = user else {
                return Err(ApiError::Storage(anyhow::anyhow!("profile of {} missing after commit", user_id)));
            };
            let placement = match seat {
                Some(seat) => format!("seat {}", seat),
                None => "the reserves list".to_string(),
            };
            info!("{} ({}) registered for event {} on {}", user.nickname, user_id, event_id, placement);
            log_activity(
                state,
                format!("User **{}** ({}) registered for **{}** on {}", user.nickname, username, event_name, placement),
            );

            Ok(registration_complete(state, username, &event_name, &user, seat, reserve))
        }
        CommitOutcome::SeatLost { seat } => Ok(replies::error(
            "Seat Taken",
            &format!(
                "Seat {} was given to someone else while you were confirming. Please provide a new list of preferred seats.",
                seat
            ),
        )),
        CommitOutcome::SeatsFreed => {
            let uid = user_id.to_string();
            let availability = state
                .db(move |db| {
                    let Some(session) = db.get_session(&uid)? else {
                        return Ok(None);
                    };
                    db.available_seats(session.event_id, Some(&uid))
                })
                .await?;
            let Some(availability) = availability else {
                return Ok(stale());
            };
            Ok(Reply::embed(
                Embed::new("A Seat Became Available", colors::SUCCESS)
                    .description("The event is no longer full, so you don't have to join the reserves list."),
            )
            .with_embed(prompt_seats(availability.total)))
        }
        CommitOutcome::Stale => Ok(stale()),
        CommitOutcome::EventGone => {
            let uid = user_id.to_string();
            state.db(move |db| db.delete_session(&uid)).await?;
            Err(ApiError::NotFound(EVENT_GONE.into()))
        }
        CommitOutcome::Incomplete => Err(ApiError::CorruptedSession("required fields missing".into())),
        CommitOutcome::Corrupted(stage) => Err(ApiError::CorruptedSession(stage)),
    }
}

// -- Stage handlers --

async fn collect_nickname(state: &AppState, user_id: &str, text: &str) -> Result<Reply, ApiError> {
    if text.is_empty() || text.chars().count() > MAX_NICKNAME_LEN {
        return Ok(replies::error(
            "Invalid Nickname",
            &format!("Your nickname must be between 1 and {} characters long.", MAX_NICKNAME_LEN),
        ));
    }

    let (uid, nickname) = (user_id.to_string(), text.to_string());
    if state.db(move |db| db.nickname_taken(&nickname, &uid)).await? {
        return Ok(replies::error(
            "Nickname Taken",
            "This nickname is already taken or in the process of being registered. Please choose a different nickname.",
        ));
    }

    step(
        state,
        user_id,
        Stage::CollectingNickname,
        Stage::CollectingFirstname,
        SessionChange::Nickname(text.to_string()),
        Reply::embed(prompt_firstname()),
    )
    .await
}

async fn collect_email(state: &AppState, user_id: &str, text: &str) -> Result<Reply, ApiError> {
    if !is_valid_email(text) {
        return Ok(replies::error(
            "Invalid E-mail Format",
            "You have entered an email-address in an invalid format. Please provide a valid email.",
        ));
    }

    let (uid, email) = (user_id.to_string(), text.to_string());
    if state.db(move |db| db.email_taken(&email, &uid)).await? {
        return Ok(replies::error(
            "E-mail Taken",
            "This e-mail address is already used by another account. Please provide a different one.",
        ));
    }

    step(
        state,
        user_id,
        Stage::CollectingEmail,
        Stage::CollectingCountry,
        SessionChange::Email(text.to_string()),
        Reply::embed(prompt_country()),
    )
    .await
}

async fn collect_country(state: &AppState, user_id: &str, text: &str) -> Result<Reply, ApiError> {
    let Some(country) = countries::find(text) else {
        return Ok(replies::error(
            "Invalid Country-code",
            &format!(
                "The country-code {} is incorrect or not available in my list. Please try again.",
                text.to_uppercase()
            ),
        ));
    };

    let question = Reply::embed(Embed::new(
        format!("You've selected __{}__. Is this correct?", country.name),
        colors::INFO,
    ))
    .with_button(Button::new("country_yes", "Yes", ButtonStyle::Primary))
    .with_button(Button::new("country_no", "No", ButtonStyle::Danger));

    step(
        state,
        user_id,
        Stage::CollectingCountry,
        Stage::ConfirmingCountry,
        SessionChange::UnconfirmedCountry(country.code.to_string()),
        question,
    )
    .await
}

async fn collect_seats(state: &AppState, user_id: &str, session: &SessionRow, text: &str) -> Result<Reply, ApiError> {
    let event_id = session.event_id;
    let Some(event) = state.db(move |db| db.get_event(event_id)).await? else {
        return Err(ApiError::NotFound(EVENT_GONE.into()));
    };

    let seats = parse_seat_list(text, event.total_seats);
    if seats.is_empty() {
        return Ok(replies::error(
            "Invalid Preferred Seats List",
            &format!(
                "None of the seat numbers you provided exist. Seats are numbered 1 to {}. Please provide a valid list of preferred seats.",
                event.total_seats
            ),
        ));
    }

    let uid = user_id.to_string();
    match state.db(move |db| db.allocate_seat_for_session(&uid, &seats)).await? {
        SeatOutcome::Allocated(seat) => {
            info!("{} holds seat {} in event {}", user_id, seat, event_id);
            confirmation(state, user_id).await
        }
        SeatOutcome::AllTaken => {
            let uid = user_id.to_string();
            let availability = state
                .db(move |db| db.available_seats(event_id, Some(&uid)))
                .await?;
            if availability.is_some_and(|a| a.available <= 0) {
                return offer_reserve(state, user_id).await;
            }
            Ok(replies::error(
                "Seats Taken",
                "All preferred seats are taken. Please provide a different list of preferred seats.",
            ))
        }
        SeatOutcome::Stale => Ok(stale()),
    }
}

// -- Transitions --

async fn open_session(
    state: &AppState,
    user_id: &str,
    event_id: i64,
    stage: Stage,
    draft: SessionDraft,
) -> Result<(), ApiError> {
    let uid = user_id.to_string();
    state
        .db(move |db| db.start_session(&uid, event_id, stage, &draft))
        .await
}

async fn advance(state: &AppState, user_id: &str, from: Stage, to: Stage, change: SessionChange) -> Result<bool, ApiError> {
    let uid = user_id.to_string();
    state
        .db(move |db| db.advance_session(&uid, from, to, &change))
        .await
}

async fn step(
    state: &AppState,
    user_id: &str,
    from: Stage,
    to: Stage,
    change: SessionChange,
    next: Reply,
) -> Result<Reply, ApiError> {
    if advance(state, user_id, from, to, change).await? {
        Ok(next)
    } else {
        Ok(stale())
    }
}

async fn enter_seat_stage(state: &AppState, user_id: &str, from: Stage, change: SessionChange) -> Result<Reply, ApiError> {
    if !advance(state, user_id, from, Stage::CollectingPreferredSeats, change).await? {
        return Ok(stale());
    }
    seat_stage_followup(state, user_id).await
}

/// The session just reached seat collection. Ask for seats, or go straight
/// to a reserve-list confirmation when no seat is free for this user or the
/// user already waits on the reserve list.
async fn seat_stage_followup(state: &AppState, user_id: &str) -> Result<Reply, ApiError> {
    let uid = user_id.to_string();
    let found = state
        .db(move |db| {
            let Some(session) = db.get_session(&uid)? else {
                return Ok(None);
            };
            let event_id = session.event_id;
            Ok(Some((
                db.available_seats(event_id, Some(&uid))?,
                db.get_registration(event_id, &uid)?,
            )))
        })
        .await?;

    let Some((availability, registration)) = found else {
        return Ok(stale());
    };
    let Some(availability) = availability else {
        return Err(ApiError::NotFound(EVENT_GONE.into()));
    };

    let waiting = registration.is_some_and(|r| r.reserve && r.status == RegistrationStatus::Confirmed);
    if waiting || availability.available <= 0 {
        return offer_reserve(state, user_id).await;
    }
    Ok(Reply::embed(prompt_seats(availability.total)))
}

async fn offer_reserve(state: &AppState, user_id: &str) -> Result<Reply, ApiError> {
    if !advance(
        state,
        user_id,
        Stage::CollectingPreferredSeats,
        Stage::ShowingConfirmation,
        SessionChange::Seat(None),
    )
    .await?
    {
        return Ok(stale());
    }
    confirmation(state, user_id).await
}

async fn confirmation(state: &AppState, user_id: &str) -> Result<Reply, ApiError> {
    let uid = user_id.to_string();
    let found = state
        .db(move |db| {
            let Some(session) = db.get_session(&uid)? else {
                return Ok(None);
            };
            let event = db.get_event(session.event_id)?;
            Ok(Some((session, event)))
        })
        .await?;
    match found {
        Some((session, event)) => Ok(confirmation_reply(&session, event.as_ref())),
        None => Ok(stale()),
    }
}

// -- Replies --

pub fn stale() -> Reply {
    replies::info(
        "Registration Already Updated",
        "This step was already answered. Please continue from the latest message, or type **!cancel** to start over.",
    )
}

fn prepend(embed: Embed, mut reply: Reply) -> Reply {
    reply.embeds.insert(0, embed);
    reply
}

fn valid_name(text: &str) -> Option<String> {
    (!text.is_empty() && text.chars().count() <= MAX_NAME_LEN).then(|| text.to_string())
}

fn invalid_name(field: &str) -> Reply {
    replies::error(
        "Invalid Input",
        &format!("Please provide your {} (at most {} characters).", field, MAX_NAME_LEN),
    )
}

fn draft_from(user: &UserRow, seat: Option<u32>) -> SessionDraft {
    SessionDraft {
        nickname: Some(user.nickname.clone()),
        firstname: Some(user.firstname.clone()),
        lastname: Some(user.lastname.clone()),
        email: Some(user.email.clone()),
        country: Some(user.country.clone()),
        seat,
    }
}

fn prompt_nickname(current: Option<&str>) -> Embed {
    let mut embed = Embed::new("Nickname", colors::INFO).description("Please provide your nickname.");
    if let Some(current) = current {
        embed = embed.field("Current", current);
    }
    embed
}

fn prompt_firstname() -> Embed {
    Embed::new("Firstname", colors::INFO).description("Please provide your firstname.")
}

fn prompt_lastname() -> Embed {
    Embed::new("Lastname", colors::INFO).description("Please provide your lastname.")
}

fn prompt_email() -> Embed {
    Embed::new("E-mail address", colors::INFO).description("Please provide your e-mail address.")
}

fn prompt_country() -> Embed {
    Embed::new("Country", colors::INFO).description(
        "Please provide your country of residence.\n\nUse a two letter country code [alpha-2-code] \nhttps://www.iban.com/country-codes",
    )
}

fn prompt_seats(total: u32) -> Embed {
    Embed::new("Preferred Seats", colors::INFO).description(format!(
        "Please provide your preferred seats for the event (1 to {}).\nFormatted as a comma-separated list e.g. 3,11,29,...",
        total
    ))
}

fn display(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

/// Summary with Cancel / Edit / Continue. A session without a seat is a
/// reserve-list confirmation.
pub fn confirmation_reply(session: &SessionRow, event: Option<&EventRow>) -> Reply {
    let description = match session.seat {
        Some(_) => "You are registering the following information.\nConfirm your registration by clicking on **Continue**.",
        None => "The event is currently full. Confirm with **Continue** to join the reserves list; we'll notify you if a seat becomes available.",
    };
    let mut embed = Embed::new("Registration Confirmation", colors::CONFIRM).description(description);
    if let Some(event) = event {
        embed = embed.field("Event", &event.name);
    }
    let embed = embed
        .field("Nickname", display(session.nickname.as_deref()))
        .field("Firstname", display(session.firstname.as_deref()))
        .field("Lastname", display(session.lastname.as_deref()))
        .field("Email", display(session.email.as_deref()))
        .field("Country", countries::flag(session.country.as_deref().unwrap_or_default()))
        .field(
            "Assigned Seat",
            session
                .seat
                .map(|s| s.to_string())
                .unwrap_or_else(|| "Reserve list".into()),
        )
        .footer("Please ensure all details are correct.");

    Reply::embed(embed)
        .with_button(Button::new("registration_cancel", "Cancel", ButtonStyle::Danger))
        .with_button(Button::new("registration_edit", "Edit responses", ButtonStyle::Primary))
        .with_button(Button::new("registration_continue", "Continue", ButtonStyle::Success))
}

fn current_registration(event: &EventRow, user: &UserRow, registration: &RegistrationRow) -> Reply {
    let seat = match registration.seat {
        Some(seat) if !registration.reserve => seat.to_string(),
        _ => "Reserve list".to_string(),
    };
    Reply::embed(
        Embed::new("Current Event Registration", colors::CURRENT)
            .description(format!("**Event:** {}", event.name))
            .field("Nickname", &user.nickname)
            .field("Firstname", &user.firstname)
            .field("Lastname", &user.lastname)
            .field("Email", &user.email)
            .field("Country", countries::flag(&user.country))
            .field("Seat", seat)
            .footer("Please confirm or edit your details."),
    )
    .with_button(Button::new("registration_confirm", "No Changes", ButtonStyle::Success))
    .with_button(Button::new("registration_edit", "Edit Registration", ButtonStyle::Primary))
}

fn account_exists(event: &EventRow, user: &UserRow) -> Embed {
    Embed::new("Account Already Exists", colors::SUCCESS)
        .description(format!(
            "You already have your account registered in the bot database, but are __not yet signed up__ for the event **{}**.",
            event.name
        ))
        .inline_field("Nickname", &user.nickname)
        .inline_field("Firstname", &user.firstname)
        .inline_field("Lastname", &user.lastname)
        .inline_field("Email", &user.email)
        .inline_field("Country", countries::flag(&user.country))
}

fn registration_complete(
    state: &AppState,
    username: &str,
    event_name: &str,
    user: &UserRow,
    seat: Option<u32>,
    reserve: bool,
) -> Reply {
    let title = if reserve {
        format!("Thank you {}! You are on the reserves list for **__{}__**", username, event_name)
    } else {
        format!(
            "Congratulations {}!  :partying_face: :tada: \n\nYou have received a spot at **__{}__**",
            username, event_name
        )
    };
    let mut embed = Embed::new(title, colors::CONGRATS)
        .inline_field("Nickname", &user.nickname)
        .inline_field(
            "Assigned seat",
            seat.map(|s| s.to_string()).unwrap_or_else(|| "Not Assigned".into()),
        )
        .inline_field("Country", countries::flag(&user.country))
        .inline_field("Firstname", &user.firstname)
        .inline_field("Lastname", &user.lastname)
        .inline_field("E-mail address", &user.email);
    if reserve {
        embed = embed.description("The event is currently full. We'll notify you if a seat becomes available.");
    }

    let mut reply = Reply::embed(embed);
    if !reserve {
        if let Some(info) = &state.config.payment_info {
            reply = reply.with_embed(
                Embed::new("Payment details", colors::CONGRATS)
                    .description(format!(
                        ":moneybag: You will **not** be added to the event's participant list until you have paid the entry fee.\n\n{}",
                        info
                    )),
            );
        }
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(seat: Option<u32>) -> SessionRow {
        SessionRow {
            user_id: "42".into(),
            stage: Stage::ShowingConfirmation.as_str().into(),
            event_id: 1,
            nickname: Some("Nova".into()),
            firstname: Some("Ada".into()),
            lastname: Some("Lovelace".into()),
            email: Some("ada@example.com".into()),
            country: Some("SE".into()),
            unconfirmed_country: None,
            seat,
            updated_at: String::new(),
        }
    }

    #[test]
    fn cancel_words_ignore_case_and_padding() {
        assert!(is_cancel("!cancel"));
        assert!(is_cancel("  !ABORT "));
        assert!(!is_cancel("cancel"));
        assert!(!is_cancel("!cancel please"));
    }

    #[test]
    fn confirmation_lists_seat_and_buttons() {
        let reply = confirmation_reply(&session(Some(7)), None);
        let text = reply.plain_text();
        assert!(text.contains("Assigned Seat: 7"));
        assert!(text.contains("Country: :flag_se:"));
        let ids: Vec<_> = reply.buttons.iter().map(|b| b.custom_id.as_str()).collect();
        assert_eq!(ids, ["registration_cancel", "registration_edit", "registration_continue"]);
    }

    #[test]
    fn confirmation_without_seat_is_a_reserve_notice() {
        let text = confirmation_reply(&session(None), None).plain_text();
        assert!(text.contains("reserves list"));
        assert!(text.contains("Assigned Seat: Reserve list"));
    }

    #[test]
    fn names_are_length_checked() {
        assert_eq!(valid_name("Ada").as_deref(), Some("Ada"));
        assert!(valid_name("").is_none());
        assert!(valid_name(&"x".repeat(MAX_NAME_LEN + 1)).is_none());
    }
}
