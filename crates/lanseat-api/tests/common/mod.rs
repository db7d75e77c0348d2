//! Shared harness: an in-memory bot wired to a dispatcher whose outbound
//! events the tests read back.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use lanseat_api::seatmap::GridRenderer;
use lanseat_api::{AppState, AppStateInner, BotConfig, router};
use lanseat_db::Database;
use lanseat_db::models::EventFields;
use lanseat_gateway::{Dispatcher, Inbound};
use lanseat_types::api::Reply;
use lanseat_types::events::{CommandOption, GatewayEvent, Interaction, InteractionKind, Invoker, OptionValue};

pub struct Harness {
    pub state: AppState,
    pub events: broadcast::Receiver<GatewayEvent>,
    /// What bridges submit; tests that run the router take it
    pub inbound: Option<mpsc::UnboundedReceiver<Inbound>>,
    /// Events received but not yet claimed by a helper
    backlog: Vec<GatewayEvent>,
}

impl Harness {
    pub fn new(roster_delay: Duration) -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (dispatcher, inbound) = Dispatcher::new();
        let events = dispatcher.subscribe();
        let config = BotConfig {
            roster_delay,
            ..BotConfig::default()
        };
        let state = AppStateInner::new(db, dispatcher, config, Arc::new(GridRenderer::default()));
        Self {
            state,
            events,
            inbound: Some(inbound),
            backlog: Vec::new(),
        }
    }

    pub fn create_event(&self, name: &str, total_seats: u32, participant_channel: Option<&str>) -> i64 {
        self.state
            .db
            .create_event(&EventFields {
                name: name.into(),
                location: "Gothenburg".into(),
                start_at: "2099-03-01 18:00".into(),
                end_at: "2099-03-03 12:00".into(),
                total_seats,
                entry_fee: 30,
                participant_channel: participant_channel.map(String::from),
            })
            .unwrap()
    }

    /// Send a DM as `user_id` and return the bot's answer to it.
    pub async fn dm(&mut self, user_id: &str, content: &str) -> Reply {
        router::handle_inbound(
            &self.state,
            Inbound::DirectMessage {
                user_id: user_id.into(),
                username: user_id.into(),
                content: content.into(),
            },
        )
        .await;
        self.last_dm(user_id)
    }

    pub async fn button(&mut self, user_id: &str, custom_id: &str) -> Reply {
        let interaction = Interaction {
            id: format!("btn-{}-{}", user_id, custom_id),
            invoker: invoker(user_id),
            kind: InteractionKind::Button {
                custom_id: custom_id.into(),
            },
        };
        self.interact(interaction).await
    }

    /// `/register event:<id>`; returns the ephemeral command reply.
    pub async fn register(&mut self, user_id: &str, event_id: i64) -> Reply {
        let interaction = Interaction {
            id: format!("cmd-{}-{}", user_id, event_id),
            invoker: invoker(user_id),
            kind: InteractionKind::Command {
                name: "register".into(),
                subcommand: None,
                options: vec![CommandOption {
                    name: "event".into(),
                    value: OptionValue::String(event_id.to_string()),
                }],
            },
        };
        self.interact(interaction).await
    }

    async fn interact(&mut self, interaction: Interaction) -> Reply {
        let id = interaction.id.clone();
        router::handle_inbound(&self.state, Inbound::Interaction(interaction)).await;
        self.drain();
        let position = self
            .backlog
            .iter()
            .position(|e| matches!(e, GatewayEvent::InteractionReply { interaction_id, .. } if *interaction_id == id))
            .unwrap_or_else(|| panic!("no reply to interaction {}", id));
        match self.backlog.remove(position) {
            GatewayEvent::InteractionReply { reply, .. } => reply,
            _ => unreachable!(),
        }
    }

    fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.backlog.push(event);
        }
    }

    /// Take every buffered event matching `keep`, in arrival order.
    pub fn take(&mut self, keep: impl Fn(&GatewayEvent) -> bool) -> Vec<GatewayEvent> {
        self.drain();
        let (taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.backlog).into_iter().partition(|e| keep(e));
        self.backlog = rest;
        taken
    }

    /// The most recent DM already sent to `user_id`; older ones are dropped.
    pub fn last_dm(&mut self, user_id: &str) -> Reply {
        self.take(|e| matches!(e, GatewayEvent::DirectMessage { user_id: to, .. } if to == user_id))
            .into_iter()
            .filter_map(|e| match e {
                GatewayEvent::DirectMessage { reply, .. } => Some(reply),
                _ => None,
            })
            .last()
            .unwrap_or_else(|| panic!("no DM sent to {}", user_id))
    }

    /// Walk a new user through the whole conversation up to the confirmation
    /// summary. `seats` is only sent when the bot asks for seats.
    pub async fn fill_in(&mut self, user_id: &str, event_id: i64, nickname: &str, seats: &str) -> Reply {
        self.register(user_id, event_id).await;
        self.last_dm(user_id);
        self.dm(user_id, nickname).await;
        self.dm(user_id, "Ada").await;
        self.dm(user_id, "Lovelace").await;
        self.dm(user_id, &format!("{}@example.com", nickname.to_lowercase())).await;
        self.dm(user_id, "se").await;
        let reply = self.button(user_id, "country_yes").await;
        if title(&reply) == "Preferred Seats" {
            return self.dm(user_id, seats).await;
        }
        reply
    }

    /// Full registration, ending with the Continue button.
    pub async fn sign_up(&mut self, user_id: &str, event_id: i64, nickname: &str, seats: &str) -> Reply {
        let confirmation = self.fill_in(user_id, event_id, nickname, seats).await;
        assert_eq!(title(&confirmation), "Registration Confirmation");
        self.button(user_id, "registration_continue").await
    }
}

pub fn invoker(user_id: &str) -> Invoker {
    Invoker {
        user_id: user_id.into(),
        username: user_id.into(),
        role_ids: Vec::new(),
    }
}

/// Title of the first embed.
pub fn title(reply: &Reply) -> String {
    reply
        .embeds
        .first()
        .and_then(|e| e.title.clone())
        .unwrap_or_default()
}

pub fn field<'a>(reply: &'a Reply, name: &str) -> Option<&'a str> {
    reply
        .embeds
        .iter()
        .flat_map(|e| e.fields.iter())
        .find(|f| f.name == name)
        .map(|f| f.value.as_str())
}
