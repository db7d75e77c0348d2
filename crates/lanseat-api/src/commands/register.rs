use lanseat_types::api::{CommandSchema, Reply};
use lanseat_types::events::Invoker;

use super::EVENT;
use crate::error::ApiError;
use crate::options::Options;
use crate::registration;
use crate::state::AppState;

pub const SCHEMA: CommandSchema = CommandSchema {
    name: "register",
    description: "Register for an event",
    options: &[EVENT],
    subcommands: &[],
};

pub async fn run(state: &AppState, invoker: &Invoker, options: &Options<'_>) -> Result<Reply, ApiError> {
    let event_id = options.require_event_id(&EVENT)?;
    registration::start(state, invoker, event_id).await
}
