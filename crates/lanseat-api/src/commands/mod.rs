//! Slash commands. [`COMMANDS`] is what bridges register with the platform;
//! [`dispatch`] maps a command name to its handler.

pub mod admin_add;
pub mod admin_del;
pub mod admin_edit;
pub mod admin_list;
pub mod admin_settings;
pub mod register;
pub mod status;
pub mod unregister;

use lanseat_types::api::{CommandSchema, OptionKind, OptionSpec, Reply};
use lanseat_types::countries;
use lanseat_types::events::{CommandOption, Invoker};

use crate::error::ApiError;
use crate::options::{Options, autocomplete, opt, required};
use crate::state::AppState;

pub const COMMANDS: &[CommandSchema] = &[
    register::SCHEMA,
    unregister::SCHEMA,
    status::SCHEMA,
    admin_add::SCHEMA,
    admin_edit::SCHEMA,
    admin_del::SCHEMA,
    admin_list::SCHEMA,
    admin_settings::SET_SCHEMA,
    admin_settings::GET_SCHEMA,
];

/// Required `event` option filled by autocomplete with the event id.
pub(crate) const EVENT: OptionSpec = required(autocomplete(opt("event", "The event", OptionKind::String)));

pub async fn dispatch(
    state: &AppState,
    invoker: &Invoker,
    name: &str,
    subcommand: Option<&str>,
    values: &[CommandOption],
) -> Result<Reply, ApiError> {
    let options = Options::new(values);
    match name {
        "register" => register::run(state, invoker, &options).await,
        "unregister" => unregister::run(state, invoker, &options).await,
        "status" => status::run(state, invoker).await,
        "adminadd" => admin_add::run(state, invoker, subcommand, &options).await,
        "adminedit" => admin_edit::run(state, invoker, subcommand, &options).await,
        "admindel" => admin_del::run(state, invoker, subcommand, &options).await,
        "adminlist" => admin_list::run(state, invoker, subcommand, &options).await,
        "adminset" => admin_settings::set(state, invoker, &options).await,
        "adminget" => admin_settings::get(state, invoker, &options).await,
        other => Err(ApiError::NotFound(format!("Unknown command `/{}`.", other))),
    }
}

pub(crate) fn unknown_subcommand(command: &str, subcommand: Option<&str>) -> ApiError {
    ApiError::Validation(format!(
        "Unknown subcommand `{}` for `/{}`.",
        subcommand.unwrap_or("-"),
        command
    ))
}

/// Country option value: an alpha-2 code, or `null`/empty for none.
pub(crate) fn country_code(input: &str) -> Result<String, ApiError> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("null") {
        return Ok(String::new());
    }
    countries::find(input)
        .map(|c| c.code.to_string())
        .ok_or_else(|| ApiError::Validation(format!("The country-code {} is not in the country list.", input.to_uppercase())))
}

pub(crate) fn full_event_error(event_name: &str) -> ApiError {
    ApiError::Validation(format!(
        "The event **{}** is already full. Please remove a user from the main list before adding another.",
        event_name
    ))
}

/// `:white_small_square: key = value` lines for the activity log.
pub(crate) fn change_lines(changes: &[(&str, String)]) -> String {
    changes
        .iter()
        .map(|(key, value)| format!(":white_small_square: {} = {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_are_unique() {
        let mut names: Vec<_> = COMMANDS.iter().map(|c| c.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), COMMANDS.len());
    }

    #[test]
    fn schemas_serialize_without_empty_lists() {
        let json = serde_json::to_value(status::SCHEMA).unwrap();
        assert!(json.get("options").is_none());
        assert!(json.get("subcommands").is_none());

        let json = serde_json::to_value(admin_edit::SCHEMA).unwrap();
        let subcommands = json["subcommands"].as_array().unwrap();
        assert!(subcommands.iter().any(|s| s["name"] == "promotenext"));
    }

    #[test]
    fn country_codes() {
        assert_eq!(country_code("se").unwrap(), "SE");
        assert_eq!(country_code("NULL").unwrap(), "");
        assert!(matches!(country_code("zz"), Err(ApiError::Validation(_))));
    }
}
