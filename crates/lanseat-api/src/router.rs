//! Drains the gateway's inbound queue and hands each item to its handler.
//!
//! Direct messages, button presses and commands from one user are chained:
//! each task waits for the user's previous one, so their input is handled
//! strictly in arrival order while different users proceed in parallel.
//! Every item gets a reply, errors included.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use lanseat_gateway::Inbound;
use lanseat_types::api::Reply;
use lanseat_types::events::{Interaction, InteractionKind};

use crate::autocomplete;
use crate::buttons;
use crate::commands;
use crate::error::ApiError;
use crate::registration;
use crate::state::AppState;

pub async fn run(state: AppState, mut inbound: mpsc::UnboundedReceiver<Inbound>) {
    info!("Router started");
    // Last task spawned per user
    let mut tails: HashMap<String, JoinHandle<()>> = HashMap::new();
    while let Some(item) = inbound.recv().await {
        tails.retain(|_, task| !task.is_finished());
        let state = state.clone();
        let Some(user_id) = ordering_key(&item) else {
            tokio::spawn(async move { handle_inbound(&state, item).await });
            continue;
        };

        let previous = tails.remove(&user_id);
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                // Runs even if the predecessor panicked
                let _ = previous.await;
            }
            handle_inbound(&state, item).await;
        });
        tails.insert(user_id, task);
    }
    info!("Inbound queue closed, router stopped");
}

/// The user whose queue `item` joins. Autocomplete reads nothing a session
/// writes, so it skips the queue.
fn ordering_key(item: &Inbound) -> Option<String> {
    match item {
        Inbound::DirectMessage { user_id, .. } => Some(user_id.clone()),
        Inbound::Interaction(Interaction {
            kind: InteractionKind::Autocomplete { .. },
            ..
        }) => None,
        Inbound::Interaction(interaction) => Some(interaction.invoker.user_id.clone()),
    }
}

pub async fn handle_inbound(state: &AppState, inbound: Inbound) {
    match inbound {
        Inbound::DirectMessage {
            user_id,
            username,
            content,
        } => {
            let _guard = state.user_locks.lock(&user_id).await;
            debug!("DM from {} ({})", username, user_id);
            let result = if registration::is_cancel(&content) {
                registration::abort(state, &user_id).await
            } else {
                registration::handle_message(state, &user_id, &content).await
            };
            let reply = result.unwrap_or_else(|e| failure_reply("direct message", &user_id, &e));
            state.dispatcher.send_dm(&user_id, reply);
        }
        Inbound::Interaction(interaction) => handle_interaction(state, interaction).await,
    }
}

async fn handle_interaction(state: &AppState, interaction: Interaction) {
    let Interaction { id, invoker, kind } = interaction;
    match kind {
        InteractionKind::Autocomplete {
            name,
            focused,
            partial,
            ..
        } => {
            let choices = match autocomplete::suggest(state, &invoker, &name, &focused, &partial).await {
                Ok(choices) => choices,
                Err(e) => {
                    warn!("Autocomplete for /{} {} failed: {}", name, focused, e);
                    Vec::new()
                }
            };
            state.dispatcher.autocomplete(&id, choices);
        }
        InteractionKind::Command {
            name,
            subcommand,
            options,
        } => {
            let _guard = state.user_locks.lock(&invoker.user_id).await;
            debug!("/{} {:?} from {}", name, subcommand, invoker.username);
            let reply = commands::dispatch(state, &invoker, &name, subcommand.as_deref(), &options)
                .await
                .unwrap_or_else(|e| failure_reply(&format!("/{}", name), &invoker.user_id, &e));
            state.dispatcher.reply(&id, reply);
        }
        InteractionKind::Button { custom_id } => {
            let _guard = state.user_locks.lock(&invoker.user_id).await;
            debug!("Button {} from {}", custom_id, invoker.username);
            let reply = buttons::handle(state, &invoker, &custom_id)
                .await
                .unwrap_or_else(|e| failure_reply(&custom_id, &invoker.user_id, &e));
            state.dispatcher.reply(&id, reply);
        }
    }
}

fn failure_reply(context: &str, user_id: &str, err: &ApiError) -> Reply {
    match err {
        ApiError::Storage(e) => error!("{} from {} failed: {:#}", context, user_id, e),
        ApiError::CorruptedSession(stage) => warn!("Corrupted session of {}: {}", user_id, stage),
        other => debug!("{} from {} rejected: {}", context, user_id, other),
    }
    err.to_reply()
}
