//! `adminset` / `adminget`: the persisted bot settings.

use tracing::info;

use lanseat_types::api::{CommandSchema, OptionKind, OptionSpec, Reply};
use lanseat_types::events::{ChannelKind, Invoker};

use crate::activity::{LOG_CHANNEL_SETTING, log_activity};
use crate::error::ApiError;
use crate::options::{Options, autocomplete, opt, required};
use crate::parse::parse_id;
use crate::permissions::{ADMIN_ROLE_SETTING, require_admin};
use crate::replies;
use crate::state::AppState;

const SETTING: OptionSpec = required(autocomplete(opt("setting", "Name of the setting", OptionKind::String)));
const VALUE: OptionSpec = required(opt("value", "Role or channel id, or a mention", OptionKind::String));

pub const SET_SCHEMA: CommandSchema = CommandSchema {
    name: "adminset",
    description: "Sets a specific admin setting",
    options: &[SETTING, VALUE],
    subcommands: &[],
};

pub const GET_SCHEMA: CommandSchema = CommandSchema {
    name: "adminget",
    description: "Retrieves the current value of a specific admin setting",
    options: &[SETTING],
    subcommands: &[],
};

/// What a stored id resolved to in the bridge's directory.
enum Resolved {
    Role(String),
    Channel { name: String, kind: ChannelKind },
    User(String),
}

impl Resolved {
    fn display(&self) -> String {
        match self {
            Self::Role(name) => format!("@{}", name),
            Self::Channel { name, .. } => format!("#{}", name),
            Self::User(name) => name.clone(),
        }
    }
}

async fn resolve(state: &AppState, id: &str) -> Option<Resolved> {
    if let Some(role) = state.dispatcher.role(id).await {
        return Some(Resolved::Role(role.name));
    }
    if let Some(channel) = state.dispatcher.channel(id).await {
        return Some(Resolved::Channel {
            name: channel.name,
            kind: channel.kind,
        });
    }
    state.dispatcher.username(id).await.map(Resolved::User)
}

async fn known_setting(state: &AppState, options: &Options<'_>) -> Result<String, ApiError> {
    let key = options.require_string(&SETTING)?;
    let settings = state.db(|db| db.list_settings()).await?;
    if settings.iter().any(|s| s.key == key) {
        return Ok(key);
    }
    let known: Vec<_> = settings.iter().map(|s| s.key.as_str()).collect();
    Err(ApiError::Validation(format!(
        "Unknown setting `{}`. Available settings: {}.",
        key,
        known.join(", ")
    )))
}

pub async fn set(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    require_admin(state, invoker).await?;
    let key = known_setting(state, options).await?;
    let raw = options.require_string(&VALUE)?;

    let Some(id) = parse_id(&raw) else {
        return Err(ApiError::Validation(
            "The provided value is not a recognized format. Please provide a valid ID or mention.".into(),
        ));
    };
    let Some(resolved) = resolve(state, &id).await else {
        return Err(ApiError::Validation(
            "The ID provided is neither a valid user, role, nor a channel. Please provide a valid ID.".into(),
        ));
    };
    match (key.as_str(), &resolved) {
        (ADMIN_ROLE_SETTING, Resolved::Role(_)) => {}
        (ADMIN_ROLE_SETTING, _) => {
            return Err(ApiError::Validation(format!("`{}` must be a role.", key)));
        }
        (LOG_CHANNEL_SETTING, Resolved::Channel { kind: ChannelKind::Text, .. }) => {}
        (LOG_CHANNEL_SETTING, _) => {
            return Err(ApiError::Validation(format!("`{}` must be a text channel.", key)));
        }
        _ => {}
    }

    let (k, v) = (key.clone(), id.clone());
    if !state.db(move |db| db.set_setting(&k, &v)).await? {
        return Err(ApiError::Validation(format!("Unknown setting `{}`.", key)));
    }

    let shown = resolved.display();
    info!("{} set {} to {}", invoker.username, key, id);
    log_activity(
        state,
        format!("Bot setting **{}** changed to {} by [ **{}** ]", key, shown, invoker.username),
    );
    Ok(replies::success(
        "Setting Updated",
        &format!("Setting **{}** has been updated to: {}", key, shown),
    )
    .ephemeral())
}

pub async fn get(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    require_admin(state, invoker).await?;
    let key = known_setting(state, options).await?;

    let k = key.clone();
    let value = state.db(move |db| db.get_setting(&k)).await?.unwrap_or_default();
    if value.is_empty() {
        return Ok(replies::info("Setting", &format!("The setting **{}** has not been set yet.", key)).ephemeral());
    }

    let shown = match resolve(state, &value).await {
        Some(resolved) => resolved.display(),
        None => format!("`{}` (not found in the server)", value),
    };
    Ok(replies::info(
        "Setting",
        &format!("Current value for setting **{}**: {}", key, shown),
    )
    .ephemeral())
}
