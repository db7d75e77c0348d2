use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use lanseat_types::api::{Choice, Reply};
use lanseat_types::events::{ChannelInfo, GatewayEvent, Interaction, RoleInfo, UserInfo};

/// Work delivered by a bridge for the bot core to handle.
#[derive(Debug, Clone)]
pub enum Inbound {
    Interaction(Interaction),
    DirectMessage {
        user_id: String,
        username: String,
        content: String,
    },
}

/// Snapshot of the guild as last pushed by a bridge.
#[derive(Debug, Default)]
struct Directory {
    channels: HashMap<String, ChannelInfo>,
    roles: HashMap<String, RoleInfo>,
    usernames: HashMap<String, String>,
}

/// Connects bridges and the bot core: inbound work goes through an mpsc
/// queue, outbound events are broadcast to every connected bridge.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for gateway events; every connected bridge receives all events
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    inbound_tx: mpsc::UnboundedSender<Inbound>,

    /// Connected bridges: conn_id -> bridge name
    bridges: RwLock<HashMap<Uuid, String>>,

    directory: RwLock<Directory>,
}

impl Dispatcher {
    /// Returns the dispatcher and the receiving end of the inbound queue,
    /// which the bot core drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Inbound>) {
        let (broadcast_tx, _) = broadcast::channel(1024);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                inbound_tx,
                bridges: RwLock::new(HashMap::new()),
                directory: RwLock::new(Directory::default()),
            }),
        };
        (dispatcher, inbound_rx)
    }

    /// Subscribe to gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected bridges. Dropped silently when no
    /// bridge is connected.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Queue work for the bot core.
    pub fn submit(&self, inbound: Inbound) {
        if self.inner.inbound_tx.send(inbound).is_err() {
            tracing::warn!("Inbound queue closed; dropping bridge message");
        }
    }

    // -- Bridges --

    pub async fn bridge_connected(&self, name: &str) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.inner.bridges.write().await.insert(conn_id, name.to_string());
        conn_id
    }

    pub async fn bridge_disconnected(&self, conn_id: Uuid) {
        self.inner.bridges.write().await.remove(&conn_id);
    }

    pub async fn connected_bridges(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.bridges.read().await.values().cloned().collect();
        names.sort();
        names
    }

    // -- Directory --

    /// Replace the directory with a bridge's full snapshot.
    pub async fn sync_directory(&self, channels: Vec<ChannelInfo>, roles: Vec<RoleInfo>, users: Vec<UserInfo>) {
        let mut directory = self.inner.directory.write().await;
        directory.channels = channels.into_iter().map(|c| (c.id.clone(), c)).collect();
        directory.roles = roles.into_iter().map(|r| (r.id.clone(), r)).collect();
        directory.usernames = users.into_iter().map(|u| (u.id, u.username)).collect();
    }

    pub async fn channel(&self, id: &str) -> Option<ChannelInfo> {
        self.inner.directory.read().await.channels.get(id).cloned()
    }

    pub async fn role(&self, id: &str) -> Option<RoleInfo> {
        self.inner.directory.read().await.roles.get(id).cloned()
    }

    pub async fn username(&self, user_id: &str) -> Option<String> {
        self.inner.directory.read().await.usernames.get(user_id).cloned()
    }

    // -- Outbound helpers --

    pub fn reply(&self, interaction_id: &str, reply: Reply) {
        self.broadcast(GatewayEvent::InteractionReply {
            interaction_id: interaction_id.to_string(),
            reply,
        });
    }

    pub fn autocomplete(&self, interaction_id: &str, choices: Vec<Choice>) {
        self.broadcast(GatewayEvent::AutocompleteResult {
            interaction_id: interaction_id.to_string(),
            choices,
        });
    }

    pub fn send_dm(&self, user_id: &str, reply: Reply) {
        self.broadcast(GatewayEvent::DirectMessage {
            user_id: user_id.to_string(),
            reply,
        });
    }

    pub fn send_to_channel(&self, channel_id: &str, reply: Reply) {
        self.broadcast(GatewayEvent::ChannelMessage {
            channel_id: channel_id.to_string(),
            reply,
        });
    }
}
