use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, info, warn};

use lanseat_types::api::Claims;
use lanseat_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::{Dispatcher, Inbound};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// A bridge must identify within this window after the upgrade.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle one bridge connection: `Identify` handshake, `Ready`, then relay
/// events out and commands in until either side goes away.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, bridge_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    let Some(bridge) = wait_for_identify(&mut receiver, &bridge_secret).await else {
        warn!("Bridge failed to identify, closing");
        return;
    };

    let conn_id = dispatcher.bridge_connected(&bridge).await;
    info!("Bridge {} connected ({})", bridge, conn_id);

    let ready = GatewayEvent::Ready {
        bridge: bridge.clone(),
        session_id: conn_id.to_string(),
    };
    if let Some(msg) = encode(&ready) {
        if sender.send(msg).await.is_ok() {
            run_connection_loop(sender, receiver, dispatcher.clone(), bridge.clone()).await;
        }
    }

    dispatcher.bridge_disconnected(conn_id).await;
    info!("Bridge {} disconnected ({})", bridge, conn_id);
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: Dispatcher,
    bridge: String,
) {
    let mut broadcast_rx = dispatcher.subscribe();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward events -> bridge, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };
                    let Some(msg) = encode(&event) else { continue };
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping bridge", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from the bridge
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(&dispatcher, &bridge, cmd).await,
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            bridge,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

async fn handle_command(dispatcher: &Dispatcher, bridge: &str, cmd: GatewayCommand) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::GuildSync { channels, roles, users } => {
            info!(
                "{} synced directory: {} channels, {} roles, {} users",
                bridge,
                channels.len(),
                roles.len(),
                users.len()
            );
            dispatcher.sync_directory(channels, roles, users).await;
        }

        GatewayCommand::Interaction(interaction) => {
            debug!("{} interaction {} from {}", bridge, interaction.id, interaction.invoker.user_id);
            dispatcher.submit(Inbound::Interaction(interaction));
        }

        GatewayCommand::DirectMessage { user_id, username, content } => {
            debug!("{} direct message from {}", bridge, user_id);
            dispatcher.submit(Inbound::DirectMessage { user_id, username, content });
        }
    }
}

async fn wait_for_identify(receiver: &mut SplitStream<WebSocket>, secret: &str) -> Option<String> {
    let timeout = tokio::time::timeout(IDENTIFY_TIMEOUT, async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) = serde_json::from_str::<GatewayCommand>(&text) {
                    return verify_token(&token, secret);
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}

/// Validate a bridge token and return the bridge name it was minted for.
pub fn verify_token(token: &str, secret: &str) -> Option<String> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .ok()
        .map(|data| data.claims.sub)
}

fn encode(event: &GatewayEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode as encode_jwt};

    fn token(secret: &str, exp: usize) -> String {
        let claims = Claims { sub: "discord".into(), exp };
        encode_jwt(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn accepts_tokens_signed_with_the_secret() {
        let exp = exp_in_an_hour();
        assert_eq!(verify_token(&token("s3cret", exp), "s3cret").as_deref(), Some("discord"));
        assert!(verify_token(&token("other", exp), "s3cret").is_none());
        assert!(verify_token("not-a-token", "s3cret").is_none());
    }

    #[test]
    fn rejects_expired_tokens() {
        assert!(verify_token(&token("s3cret", 1), "s3cret").is_none());
    }

    fn exp_in_an_hour() -> usize {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize;
        now + 3600
    }
}
