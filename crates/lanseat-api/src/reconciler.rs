//! Moves between the main list and the reserve list, with the side effects
//! every move carries: a DM to the affected user, a roster republish and an
//! audit line.

use tracing::info;

use lanseat_db::seats::{DemoteOutcome, PromoteOutcome};
use lanseat_types::api::{Embed, Reply};
use lanseat_types::countries;

use crate::activity::log_activity;
use crate::error::ApiError;
use crate::replies::colors;
use crate::state::AppState;

/// Promote a specific reserve entrant into the lowest free seat.
pub async fn promote(state: &AppState, event_id: i64, user_id: &str, actor: &str) -> Result<PromoteOutcome, ApiError> {
    let uid = user_id.to_string();
    let outcome = state.db(move |db| db.promote(event_id, &uid)).await?;
    after_promotion(state, event_id, &outcome, actor).await?;
    Ok(outcome)
}

/// Promote whoever has waited longest on the reserve list.
pub async fn promote_next(state: &AppState, event_id: i64, actor: &str) -> Result<PromoteOutcome, ApiError> {
    let outcome = state.db(move |db| db.promote_next(event_id)).await?;
    after_promotion(state, event_id, &outcome, actor).await?;
    Ok(outcome)
}

pub async fn demote(state: &AppState, event_id: i64, user_id: &str, actor: &str) -> Result<DemoteOutcome, ApiError> {
    let uid = user_id.to_string();
    let outcome = state.db(move |db| db.demote(event_id, &uid)).await?;

    if let DemoteOutcome::Demoted { freed_seat } = outcome {
        let event_name = event_name(state, event_id).await?;
        state.dispatcher.send_dm(
            user_id,
            Reply::embed(
                Embed::new("You have been moved to the reserves list!", colors::CONFIRM).description(format!(
                    "Event: **{}**\n\nWe'll notify you if a seat becomes available again.",
                    event_name
                )),
            ),
        );
        state.publisher.schedule(event_id);
        let seat = freed_seat.map(|s| format!(" (seat {} freed)", s)).unwrap_or_default();
        log_activity(
            state,
            format!("{} was moved to the reserves of **{}** by {}{}", user_id, event_name, actor, seat),
        );
    }
    Ok(outcome)
}

async fn after_promotion(state: &AppState, event_id: i64, outcome: &PromoteOutcome, actor: &str) -> Result<(), ApiError> {
    match outcome {
        PromoteOutcome::Promoted { user_id, seat } => announce_promotion(state, event_id, user_id, *seat, actor).await,
        _ => Ok(()),
    }
}

/// DM the promoted user, republish the roster and log the move.
pub(crate) async fn announce_promotion(
    state: &AppState,
    event_id: i64,
    user_id: &str,
    seat: u32,
    actor: &str,
) -> Result<(), ApiError> {
    info!("{} promoted {} to seat {} in event {}", actor, user_id, seat, event_id);

    let uid = user_id.to_string();
    let (event, user) = state
        .db(move |db| Ok((db.get_event(event_id)?, db.get_user(&uid)?)))
        .await?;
    let event_name = event.map(|e| e.name).unwrap_or_else(|| format!("#{}", event_id));
    let username = state
        .dispatcher
        .username(user_id)
        .await
        .unwrap_or_else(|| user_id.to_string());

    let mut embed = Embed::new(
        format!(
            "Congratulations {}!  :partying_face: :tada: \n\nYou have received a spot at **__{}__**",
            username, event_name
        ),
        colors::CONGRATS,
    )
    .inline_field("Assigned seat", seat.to_string());
    if let Some(user) = &user {
        embed = embed
            .inline_field("Nickname", &user.nickname)
            .inline_field("Country", countries::flag(&user.country))
            .inline_field("Firstname", &user.firstname)
            .inline_field("Lastname", &user.lastname)
            .inline_field("E-mail address", &user.email);
    }
    let mut reply = Reply::embed(embed);
    if let Some(info) = &state.config.payment_info {
        reply = reply.with_embed(Embed::new("Payment details", colors::CONGRATS).description(info));
    }
    state.dispatcher.send_dm(user_id, reply);

    state.publisher.schedule(event_id);
    let nickname = user.map(|u| u.nickname).unwrap_or_else(|| user_id.to_string());
    log_activity(
        state,
        format!("**{}** was promoted to seat {} at **{}** by {}", nickname, seat, event_name, actor),
    );
    Ok(())
}

pub(crate) async fn event_name(state: &AppState, event_id: i64) -> Result<String, ApiError> {
    let event = state.db(move |db| db.get_event(event_id)).await?;
    Ok(event.map(|e| e.name).unwrap_or_else(|| format!("#{}", event_id)))
}
