use tracing::info;

use lanseat_types::api::{CommandSchema, OptionKind, OptionSpec, Reply, SubcommandSchema};
use lanseat_types::events::Invoker;

use super::{EVENT, unknown_subcommand};
use crate::activity::log_activity;
use crate::error::ApiError;
use crate::options::{Options, opt, required};
use crate::permissions::require_admin;
use crate::replies;
use crate::state::AppState;

const NICKNAME: OptionSpec = required(opt("nickname", "Nickname of the user", OptionKind::String));

pub const SCHEMA: CommandSchema = CommandSchema {
    name: "admindel",
    description: "Delete events, users from an event, or user accounts",
    options: &[],
    subcommands: &[
        SubcommandSchema {
            name: "event",
            description: "Delete an event and all of its registrations",
            options: &[EVENT],
        },
        SubcommandSchema {
            name: "user",
            description: "Remove a user from an event",
            options: &[NICKNAME, EVENT],
        },
        SubcommandSchema {
            name: "account",
            description: "Delete a user account and all of its registrations",
            options: &[NICKNAME],
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
        Some("event") => delete_event(state, invoker, options).await,
        Some("user") => remove_from_event(state, invoker, options).await,
        Some("account") => delete_account(state, invoker, options).await,
        other => Err(unknown_subcommand("admindel", other)),
    }
}

async fn delete_event(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let event_id = options.require_event_id(&EVENT)?;
    let event = state
        .db(move |db| {
            let event = db.get_event(event_id)?;
            if event.is_some() {
                db.delete_event(event_id)?;
            }
            Ok(event)
        })
        .await?
        .ok_or_else(|| ApiError::NotFound("The specified event does not exist.".into()))?;

    info!("{} deleted event {} ({})", invoker.username, event_id, event.name);
    log_activity(
        state,
        format!("Event **{}** has been deleted by {}", event.name, invoker.username),
    );
    Ok(replies::success("Event Deleted", &format!("Event **{}** has been deleted.", event.name)).ephemeral())
}

async fn remove_from_event(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let nickname = options.require_string(&NICKNAME)?;
    let event_id = options.require_event_id(&EVENT)?;

    let nick = nickname.clone();
    let (event, user, removed) = state
        .db(move |db| {
            let event = db.get_event(event_id)?;
            let user = db.get_user_by_nickname(&nick)?;
            let removed = match (&event, &user) {
                (Some(_), Some(user)) => db.delete_registration(event_id, &user.id)?,
                _ => false,
            };
            Ok((event, user, removed))
        })
        .await?;

    let Some(event) = event else {
        return Err(ApiError::NotFound("The specified event does not exist.".into()));
    };
    let Some(user) = user else {
        return Err(ApiError::NotFound(format!("No user found with the nickname: **{}**.", nickname)));
    };
    if !removed {
        return Err(ApiError::NotFound(format!(
            "**{}** is not registered for **{}**.",
            nickname, event.name
        )));
    }

    info!("{} removed {} from event {}", invoker.username, user.id, event_id);
    state.publisher.schedule(event_id);
    log_activity(
        state,
        format!(
            "User **{}** has been removed from the event **{}** by {}",
            nickname, event.name, invoker.username
        ),
    );
    Ok(replies::success(
        "User Removed",
        &format!("User **{}** has been removed from the event **{}**.", nickname, event.name),
    )
    .ephemeral())
}

async fn delete_account(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let nickname = options.require_string(&NICKNAME)?;

    let nick = nickname.clone();
    let deleted = state
        .db(move |db| {
            let Some(user) = db.get_user_by_nickname(&nick)? else {
                return Ok(None);
            };
            let events = db.events_for_user(&user.id)?;
            db.delete_user(&user.id)?;
            Ok(Some((user, events)))
        })
        .await?;
    let Some((user, events)) = deleted else {
        return Err(ApiError::NotFound(format!("No user found with the nickname: **{}**.", nickname)));
    };

    for event in &events {
        state.publisher.schedule(event.id);
    }
    info!("{} deleted account {} ({})", invoker.username, user.id, nickname);
    log_activity(
        state,
        format!(
            "Account **{}** and {} registration(s) were deleted by {}",
            nickname,
            events.len(),
            invoker.username
        ),
    );
    Ok(replies::success(
        "Account Deleted",
        &format!("The account **{}** has been deleted.", nickname),
    )
    .ephemeral())
}
