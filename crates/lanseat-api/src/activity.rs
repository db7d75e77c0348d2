//! Audit trail of admin and user actions, posted to the `logChannel` setting.

use tracing::{debug, warn};

use lanseat_types::api::Reply;
use lanseat_types::events::ChannelKind;

use crate::state::AppState;

pub const LOG_CHANNEL_SETTING: &str = "logChannel";

/// Post `message` to the log channel in the background. Failures are only
/// logged; the caller never waits on this.
pub fn log_activity(state: &AppState, message: impl Into<String>) {
    let state = state.clone();
    let message = message.into();
    tokio::spawn(async move {
        let channel_id = match state.db(|db| db.get_setting(LOG_CHANNEL_SETTING)).await {
            Ok(Some(id)) if !id.is_empty() => id,
            Ok(_) => {
                debug!("Log channel not set, activity not posted: {}", message);
                return;
            }
            Err(e) => {
                warn!("Could not read log channel setting: {}", e);
                return;
            }
        };

        match state.dispatcher.channel(&channel_id).await {
            Some(channel) if channel.kind == ChannelKind::Text => {
                state.dispatcher.send_to_channel(&channel_id, Reply::text(message));
            }
            Some(_) => warn!("Log channel {} is not a text channel", channel_id),
            None => warn!("Log channel {} not found", channel_id),
        }
    });
}
