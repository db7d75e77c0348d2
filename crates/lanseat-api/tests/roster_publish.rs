mod common;

use std::time::Duration;

use common::Harness;
use lanseat_api::roster::PublishOutcome;
use lanseat_db::queries::UserFields;
use lanseat_types::events::{ChannelInfo, ChannelKind, GatewayEvent};

const CHANNEL: &str = "900";

async fn with_channel(h: &Harness, kind: ChannelKind) {
    h.state
        .dispatcher
        .sync_directory(
            vec![ChannelInfo {
                id: CHANNEL.into(),
                name: "participants".into(),
                kind,
            }],
            vec![],
            vec![],
        )
        .await;
}

fn add_entrant(h: &Harness, event_id: i64, user_id: &str, nickname: &str, seat: Option<u32>, paid: bool) {
    let db = &h.state.db;
    db.create_user(
        user_id,
        &UserFields {
            nickname: nickname.into(),
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            country: "SE".into(),
            email: format!("{}@example.com", user_id),
        },
    )
    .unwrap();
    db.add_registration(event_id, user_id, seat, seat.is_none(), paid).unwrap();
}

#[tokio::test]
async fn publish_replaces_the_channel_contents() {
    let mut h = Harness::new(Duration::from_secs(5));
    let event = h.create_event("Winter LAN", 4, Some(CHANNEL));
    with_channel(&h, ChannelKind::Text).await;
    add_entrant(&h, event, "a", "Nova", Some(2), true);
    add_entrant(&h, event, "b", "Orion", Some(1), false);
    add_entrant(&h, event, "c", "Vega", None, false);

    let outcome = h.state.publisher.publish(event).await.unwrap();
    assert_eq!(outcome, PublishOutcome::Published);

    let posted = h.take(|e| {
        matches!(
            e,
            GatewayEvent::ChannelPurge { channel_id }
                | GatewayEvent::ChannelImage { channel_id, .. }
                | GatewayEvent::ChannelMessage { channel_id, .. } if channel_id == CHANNEL
        )
    });
    assert_eq!(posted.len(), 4);
    assert!(matches!(posted[0], GatewayEvent::ChannelPurge { .. }));
    assert!(matches!(&posted[1], GatewayEvent::ChannelImage { filename, .. } if filename == "seating-map.png"));

    let GatewayEvent::ChannelMessage { reply, .. } = &posted[2] else {
        panic!("expected the participant list, got {:?}", posted[2]);
    };
    let participants = reply.plain_text();
    assert!(participants.contains("Nova"));
    assert!(!participants.contains("Orion"));

    let GatewayEvent::ChannelMessage { reply, .. } = &posted[3] else {
        panic!("expected the reserve list, got {:?}", posted[3]);
    };
    assert!(reply.plain_text().contains("Vega"));
}

#[tokio::test]
async fn publish_skips_missing_or_unusable_channels() {
    let h = Harness::new(Duration::from_secs(5));
    let no_channel = h.create_event("Winter LAN", 4, None);
    let with = h.create_event("Summer LAN", 4, Some(CHANNEL));
    let publisher = &h.state.publisher;

    assert_eq!(publisher.publish(no_channel).await.unwrap(), PublishOutcome::NoChannel);
    assert_eq!(publisher.publish(with).await.unwrap(), PublishOutcome::UnresolvedChannel);
    with_channel(&h, ChannelKind::Voice).await;
    assert_eq!(publisher.publish(with).await.unwrap(), PublishOutcome::NotTextChannel);
    assert_eq!(publisher.publish(9999).await.unwrap(), PublishOutcome::EventGone);
}

#[tokio::test(start_paused = true)]
async fn bursts_of_changes_publish_once() {
    let mut h = Harness::new(Duration::from_secs(5));
    let event = h.create_event("Winter LAN", 4, Some(CHANNEL));
    with_channel(&h, ChannelKind::Text).await;
    add_entrant(&h, event, "a", "Nova", Some(1), true);

    for _ in 0..3 {
        h.state.publisher.schedule(event);
    }
    assert!(h.state.publisher.is_pending(event));

    tokio::time::sleep(Duration::from_secs(6)).await;
    // Wait for the participant list, the last message of a publish without
    // reserves.
    let mut purges = 0;
    loop {
        match h.events.recv().await.unwrap() {
            GatewayEvent::ChannelPurge { .. } => purges += 1,
            GatewayEvent::ChannelMessage { .. } => break,
            _ => {}
        }
    }
    assert_eq!(purges, 1);
    assert!(!h.state.publisher.is_pending(event));

    // A change after the window closed opens a new one
    h.state.publisher.schedule(event);
    assert!(h.state.publisher.is_pending(event));
}
