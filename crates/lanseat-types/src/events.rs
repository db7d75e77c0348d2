use serde::{Deserialize, Serialize};

use crate::api::{Choice, Reply};

/// Events sent from the bot to connected platform bridges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful bridge authentication
    Ready { bridge: String, session_id: String },

    /// Answer to a slash command or button press
    InteractionReply { interaction_id: String, reply: Reply },

    /// Suggestions for a focused autocomplete option
    AutocompleteResult {
        interaction_id: String,
        choices: Vec<Choice>,
    },

    /// Send a direct message to a platform user
    DirectMessage { user_id: String, reply: Reply },

    /// Delete the bot's prior output in a channel
    ChannelPurge { channel_id: String },

    /// Post a message in a channel
    ChannelMessage { channel_id: String, reply: Reply },

    /// Post an image attachment in a channel; `data` is base64
    ChannelImage {
        channel_id: String,
        filename: String,
        data: String,
    },
}

/// Commands sent FROM a bridge TO the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the bridge connection
    Identify { token: String },

    /// Replace the known channels, roles and user names of the guild
    GuildSync {
        #[serde(default)]
        channels: Vec<ChannelInfo>,
        #[serde(default)]
        roles: Vec<RoleInfo>,
        #[serde(default)]
        users: Vec<UserInfo>,
    },

    /// A slash command, button press or autocomplete request
    Interaction(Interaction),

    /// A free-text message a user sent the bot in private
    DirectMessage {
        user_id: String,
        username: String,
        content: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub invoker: Invoker,
    pub kind: InteractionKind,
}

/// Who triggered an interaction, with the role ids they carry in the guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoker {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub role_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionKind {
    Command {
        name: String,
        #[serde(default)]
        subcommand: Option<String>,
        #[serde(default)]
        options: Vec<CommandOption>,
    },
    Button {
        custom_id: String,
    },
    Autocomplete {
        name: String,
        #[serde(default)]
        subcommand: Option<String>,
        focused: String,
        #[serde(default)]
        partial: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub value: OptionValue,
}

/// A typed option value as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    /// Platform user id
    User(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
}
