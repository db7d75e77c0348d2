//! Suggestions for options declared with `autocomplete`.

use chrono::Utc;

use lanseat_db::models::EventRow;
use lanseat_types::api::Choice;
use lanseat_types::countries::COUNTRIES;
use lanseat_types::events::Invoker;

use crate::error::ApiError;
use crate::state::AppState;

pub const MAX_CHOICES: usize = 25;

pub async fn suggest(
    state: &AppState,
    invoker: &Invoker,
    command: &str,
    focused: &str,
    partial: &str,
) -> Result<Vec<Choice>, ApiError> {
    let candidates = match focused {
        "event" => event_choices(state, invoker, command).await?,
        "country" => COUNTRIES
            .iter()
            .map(|c| Choice {
                label: format!("{} ({})", c.name, c.code),
                value: c.code.to_string(),
            })
            .collect(),
        "setting" => state
            .db(|db| db.list_settings())
            .await?
            .into_iter()
            .map(|s| Choice {
                label: s.key.clone(),
                value: s.key,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(filter_choices(candidates, partial))
}

/// `register` offers upcoming events, `unregister` the caller's own upcoming
/// registrations, and admin commands every event.
async fn event_choices(state: &AppState, invoker: &Invoker, command: &str) -> Result<Vec<Choice>, ApiError> {
    let now = Utc::now().naive_utc();
    let events: Vec<EventRow> = match command {
        "register" => state
            .db(|db| db.list_events())
            .await?
            .into_iter()
            .filter(|e| !e.is_archived(now))
            .collect(),
        "unregister" => {
            let uid = invoker.user_id.clone();
            state
                .db(move |db| db.events_for_user(&uid))
                .await?
                .into_iter()
                .filter(|e| !e.is_archived(now))
                .collect()
        }
        _ => state.db(|db| db.list_events()).await?,
    };

    Ok(events
        .into_iter()
        .map(|e| Choice {
            label: e.name,
            value: e.id.to_string(),
        })
        .collect())
}

/// Case-insensitive substring match on the label, capped at [`MAX_CHOICES`].
pub fn filter_choices(candidates: Vec<Choice>, partial: &str) -> Vec<Choice> {
    let needle = partial.trim().to_lowercase();
    candidates
        .into_iter()
        .filter(|c| needle.is_empty() || c.label.to_lowercase().contains(&needle))
        .take(MAX_CHOICES)
        .collect()
}
