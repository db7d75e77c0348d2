use lanseat_types::api::{Button, ButtonStyle, CommandSchema, Embed, Reply};
use lanseat_types::events::Invoker;
use lanseat_types::models::RegistrationStatus;

use super::EVENT;
use crate::buttons::{CANCEL_UNREGISTRATION, CONFIRM_UNREGISTRATION};
use crate::error::ApiError;
use crate::options::Options;
use crate::replies::colors;
use crate::state::AppState;

pub const SCHEMA: CommandSchema = CommandSchema {
    name: "unregister",
    description: "Unregister from an event",
    options: &[EVENT],
    subcommands: &[],
};

/// Asks for confirmation; the registration is removed by the "Yes" button.
pub async fn run(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let event_id = options.require_event_id(&EVENT)?;
    let uid = invoker.user_id.clone();
    let (event, registration) = state
        .db(move |db| Ok((db.get_event(event_id)?, db.get_registration(event_id, &uid)?)))
        .await?;

    let Some(event) = event else {
        return Err(ApiError::NotFound("This event does not exist.".into()));
    };
    if !registration.is_some_and(|r| r.status == RegistrationStatus::Confirmed) {
        return Err(ApiError::NotFound(format!(
            "You are not registered for the event \"{}\".",
            event.name
        )));
    }

    Ok(Reply::embed(
        Embed::new("Unregister Confirmation", colors::CONFIRM).description(format!(
            "Are you sure you want to remove your registration for **{}**?",
            event.name
        )),
    )
    .with_button(Button::new(
        format!("{}{}", CONFIRM_UNREGISTRATION, event.id),
        "Yes",
        ButtonStyle::Danger,
    ))
    .with_button(Button::new(
        format!("{}{}", CANCEL_UNREGISTRATION, event.id),
        "No",
        ButtonStyle::Secondary,
    ))
    .ephemeral())
}
