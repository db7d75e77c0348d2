//! Button presses, routed by custom id.

use tracing::{info, warn};

use lanseat_types::api::Reply;
use lanseat_types::events::Invoker;

use crate::activity::log_activity;
use crate::error::ApiError;
use crate::registration;
use crate::replies;
use crate::state::AppState;

pub const CONFIRM_UNREGISTRATION: &str = "confirm_unregistration-";
pub const CANCEL_UNREGISTRATION: &str = "cancel_unregistration-";

/// Runs under the invoker's lock.
pub async fn handle(state: &AppState, invoker: &Invoker, custom_id: &str) -> Result<Reply, ApiError> {
    let user_id = invoker.user_id.as_str();
    match custom_id {
        "country_yes" => registration::confirm_country(state, user_id, true).await,
        "country_no" => registration::confirm_country(state, user_id, false).await,
        "registration_continue" => registration::complete(state, user_id, &invoker.username).await,
        "registration_edit" => registration::edit(state, user_id).await,
        "registration_cancel" => registration::abort(state, user_id).await,
        "registration_confirm" => registration::keep_existing(state, user_id).await,
        other => {
            if let Some(raw) = other.strip_prefix(CONFIRM_UNREGISTRATION) {
                unregister(state, invoker, parse_event_id(raw)?).await
            } else if other.starts_with(CANCEL_UNREGISTRATION) {
                Ok(replies::info("Unregistration Cancelled", "Your registration was kept.").ephemeral())
            } else {
                warn!("Unknown button '{}' pressed by {}", other, user_id);
                Err(ApiError::NotFound("This button is no longer active.".into()))
            }
        }
    }
}

fn parse_event_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("This button is no longer active.".into()))
}

async fn unregister(state: &AppState, invoker: &Invoker, event_id: i64) -> Result<Reply, ApiError> {
    let uid = invoker.user_id.clone();
    let (event, removed) = state
        .db(move |db| {
            let Some(event) = db.get_event(event_id)? else {
                return Ok((None, false));
            };
            let removed = db.delete_registration(event_id, &uid)?;
            Ok((Some(event), removed))
        })
        .await?;

    let Some(event) = event else {
        return Err(ApiError::NotFound("This event no longer exists.".into()));
    };
    if !removed {
        return Err(ApiError::NotFound(format!(
            "You are not registered for the event \"{}\".",
            event.name
        )));
    }

    info!("{} unregistered from event {}", invoker.user_id, event_id);
    state.publisher.schedule(event_id);
    log_activity(
        state,
        format!("User **{}** unregistered from **{}**", invoker.username, event.name),
    );
    Ok(replies::success(
        "Unregistered",
        &format!("You have been removed from **{}**.", event.name),
    )
    .ephemeral())
}
