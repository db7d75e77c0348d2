//! Public participant roster: the seat map plus the paid-participant and
//! reserve lists, rewritten in the event's participant channel.
//!
//! Seat changes tend to come in bursts, so callers go through
//! [`RosterPublisher::schedule`], which keeps at most one pending publish per
//! event and runs it after a fixed delay.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lanseat_db::Database;
use lanseat_db::models::RosterEntry;
use lanseat_gateway::Dispatcher;
use lanseat_types::api::{Embed, Reply};
use lanseat_types::countries;
use lanseat_types::events::{ChannelKind, GatewayEvent};

use crate::error::ApiError;
use crate::replies::colors;
use crate::seatmap::{SeatMapRenderer, SeatMarker};
use crate::state::run_blocking;

/// Nicknames are padded to this width in the participant list.
const NICKNAME_COLUMN: usize = 18;
/// Braille blank used as a footer to stretch embeds to full width.
const WIDE_FOOTER: &str = "⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    EventGone,
    NoChannel,
    UnresolvedChannel,
    NotTextChannel,
}

#[derive(Clone)]
pub struct RosterPublisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    renderer: Arc<dyn SeatMapRenderer>,
    delay: Duration,
    /// event_id -> the pending publish
    pending: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl RosterPublisher {
    pub fn new(
        db: Arc<Database>,
        dispatcher: Dispatcher,
        renderer: Arc<dyn SeatMapRenderer>,
        delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                db,
                dispatcher,
                renderer,
                delay,
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Publish the event's roster after the debounce delay. Calls made while
    /// a publish is pending for the same event are absorbed by it.
    pub fn schedule(&self, event_id: i64) {
        let mut pending = self.inner.pending.lock().unwrap_or_else(|p| p.into_inner());
        if pending.get(&event_id).is_some_and(|handle| !handle.is_finished()) {
            debug!("Roster publish for event {} already pending", event_id);
            return;
        }

        let publisher = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(publisher.inner.delay).await;
            // Clear the window first so a change made during the publish
            // schedules a fresh one.
            publisher
                .inner
                .pending
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .remove(&event_id);
            if let Err(e) = publisher.publish(event_id).await {
                warn!("Roster publish for event {} failed: {}", event_id, e);
            }
        });
        pending.insert(event_id, handle);
    }

    pub fn is_pending(&self, event_id: i64) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&event_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Clear the participant channel and post the seat map, the paid list
    /// and, when there are any, the reserves.
    pub async fn publish(&self, event_id: i64) -> Result<PublishOutcome, ApiError> {
        let inner = &self.inner;
        let data = run_blocking(&inner.db, move |db| {
            let Some(event) = db.get_event(event_id)? else {
                return Ok(None);
            };
            let paid = db.paid_participants(event_id)?;
            let reserves = db.reserves(event_id)?;
            let seated = db.event_entries(event_id)?;
            Ok(Some((event, paid, reserves, seated)))
        })
        .await?;

        let Some((event, paid, reserves, seated)) = data else {
            return Ok(PublishOutcome::EventGone);
        };

        let Some(channel_id) = event.participant_channel.clone().filter(|c| !c.is_empty()) else {
            warn!("Event {} has no participant channel; roster not published", event.id);
            return Ok(PublishOutcome::NoChannel);
        };
        let Some(channel) = inner.dispatcher.channel(&channel_id).await else {
            warn!("Participant channel {} of event {} not found; roster not published", channel_id, event.id);
            return Ok(PublishOutcome::UnresolvedChannel);
        };
        if channel.kind != ChannelKind::Text {
            warn!("Participant channel {} of event {} is not a text channel", channel_id, event.id);
            return Ok(PublishOutcome::NotTextChannel);
        }

        inner.dispatcher.broadcast(GatewayEvent::ChannelPurge {
            channel_id: channel_id.clone(),
        });

        let markers = seat_markers(&seated);
        let renderer = inner.renderer.clone();
        let total_seats = event.total_seats;
        match tokio::task::spawn_blocking(move || renderer.render(total_seats, &markers)).await {
            Ok(Ok(png)) => inner.dispatcher.broadcast(GatewayEvent::ChannelImage {
                channel_id: channel_id.clone(),
                filename: "seating-map.png".into(),
                data: B64.encode(png),
            }),
            Ok(Err(e)) => warn!("Seat map for event {} not rendered: {:#}", event.id, e),
            Err(e) => warn!("Seat map renderer panicked for event {}: {}", event.id, e),
        }

        inner
            .dispatcher
            .send_to_channel(&channel_id, Reply::embed(participants_embed(&paid)));
        if !reserves.is_empty() {
            inner
                .dispatcher
                .send_to_channel(&channel_id, Reply::embed(reserves_embed(&reserves)));
        }

        info!(
            "Published roster for event {} ({} paid, {} reserves)",
            event.id,
            paid.len(),
            reserves.len()
        );
        Ok(PublishOutcome::Published)
    }
}

fn seat_markers(entries: &[RosterEntry]) -> Vec<SeatMarker> {
    entries
        .iter()
        .filter(|e| !e.reserve)
        .filter_map(|e| {
            e.seat.map(|seat| SeatMarker {
                seat,
                nickname: e.nickname.clone(),
                paid: e.has_paid,
            })
        })
        .collect()
}

/// Paid participants, numbered in payment order.
pub fn participants_embed(paid: &[RosterEntry]) -> Embed {
    let mut description = String::from(
        "\\* *Only participants who have paid the entry fee are included in this list.*\n\n**#** **| Country | Nick | Seat**\n",
    );
    for (index, entry) in paid.iter().enumerate() {
        let seat = entry.seat.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
        description.push_str(&format!(
            "` {:02} ` {} ` {:<width$} ` (**{}**)\n",
            index + 1,
            countries::flag(&entry.country),
            entry.nickname,
            seat,
            width = NICKNAME_COLUMN
        ));
    }
    Embed::new("**PARTICIPANT LIST**", colors::PARTICIPANTS)
        .description(description)
        .footer(WIDE_FOOTER)
}

/// Reserve entrants, first come first served.
pub fn reserves_embed(reserves: &[RosterEntry]) -> Embed {
    let mut description = String::from("**#** **| Country | Nick**\n");
    for (index, entry) in reserves.iter().enumerate() {
        description.push_str(&format!(
            "`{:02}. ` {} ` {} `\n",
            index + 1,
            countries::flag(&entry.country),
            entry.nickname
        ));
    }
    Embed::new("**RESERVES LIST**", colors::RESERVES)
        .description(description)
        .footer(WIDE_FOOTER)
}
