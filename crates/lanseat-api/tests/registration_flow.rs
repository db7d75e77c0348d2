mod common;

use std::time::Duration;

use common::{Harness, field, title};
use lanseat_api::{reconciler, router};
use lanseat_db::seats::{DemoteOutcome, PromoteOutcome};
use lanseat_gateway::Inbound;
use lanseat_types::events::GatewayEvent;
use lanseat_types::models::{RegistrationStatus, Stage};

fn harness() -> Harness {
    Harness::new(Duration::from_secs(5))
}

#[tokio::test]
async fn new_user_registers_through_direct_messages() {
    let mut h = harness();
    let event = h.create_event("Winter LAN", 40, None);

    let ack = h.register("u1", event).await;
    assert!(ack.ephemeral);
    assert_eq!(title(&ack), "Please check your DMs to manage your registration");
    let intro = h.last_dm("u1");
    assert!(title(&intro).contains("Winter LAN"));
    assert_eq!(intro.embeds[1].title.as_deref(), Some("Nickname"));

    assert_eq!(title(&h.dm("u1", "Nova").await), "Firstname");
    assert_eq!(title(&h.dm("u1", "Ada").await), "Lastname");
    assert_eq!(title(&h.dm("u1", "Lovelace").await), "E-mail address");
    assert_eq!(title(&h.dm("u1", "not-an-email").await), "Invalid E-mail Format");
    assert_eq!(title(&h.dm("u1", "nova@example.com").await), "Country");

    let rejected = h.dm("u1", "zz").await;
    assert_eq!(title(&rejected), "Invalid Country-code");
    assert!(rejected.plain_text().contains("ZZ"));

    let question = h.dm("u1", "se").await;
    assert_eq!(title(&question), "You've selected __Sweden__. Is this correct?");
    assert!(question.buttons.iter().any(|b| b.custom_id == "country_yes"));
    assert_eq!(title(&h.button("u1", "country_yes").await), "Preferred Seats");

    assert_eq!(title(&h.dm("u1", "99, abc").await), "Invalid Preferred Seats List");
    let confirmation = h.dm("u1", "12").await;
    assert_eq!(title(&confirmation), "Registration Confirmation");
    assert_eq!(field(&confirmation, "Assigned Seat"), Some("12"));
    assert_eq!(field(&confirmation, "Country"), Some(":flag_se:"));

    let done = h.button("u1", "registration_continue").await;
    assert!(title(&done).starts_with("Congratulations u1!"));

    let db = h.state.db.clone();
    let user = db.get_user("u1").unwrap().unwrap();
    assert_eq!(user.nickname, "Nova");
    assert_eq!(user.country, "SE");
    let registration = db.get_registration(event, "u1").unwrap().unwrap();
    assert_eq!(registration.seat, Some(12));
    assert!(!registration.reserve);
    assert_eq!(registration.status, RegistrationStatus::Confirmed);
    assert!(db.get_session("u1").unwrap().is_none());
    assert!(h.state.publisher.is_pending(event));
}

#[tokio::test]
async fn null_clears_the_country_only_while_confirming_it() {
    let mut h = harness();
    let event = h.create_event("Winter LAN", 40, None);

    h.register("u1", event).await;
    for answer in ["Nova", "Ada", "Lovelace", "nova@example.com"] {
        h.dm("u1", answer).await;
    }
    let rejected = h.dm("u1", "null").await;
    assert_eq!(title(&rejected), "Invalid Country-code");
    assert!(rejected.plain_text().contains("NULL"));
    let session = h.state.db.get_session("u1").unwrap().unwrap();
    assert_eq!(session.stage(), Ok(Stage::CollectingCountry));

    h.dm("u1", "se").await;
    assert_eq!(title(&h.dm("u1", "NULL").await), "Preferred Seats");
    let confirmation = h.dm("u1", "1").await;
    assert_eq!(field(&confirmation, "Country"), Some(":flag_white:"));
}

#[tokio::test]
async fn cancel_ends_the_conversation() {
    let mut h = harness();
    let event = h.create_event("Winter LAN", 40, None);

    h.register("u1", event).await;
    h.dm("u1", "Nova").await;
    assert_eq!(title(&h.dm("u1", " !Cancel ").await), "Aborted");
    assert!(h.state.db.get_session("u1").unwrap().is_none());
    assert_eq!(title(&h.dm("u1", "Ada").await), "No Registration In Progress");
    assert_eq!(title(&h.dm("u1", "!abort").await), "Aborted");
}

#[tokio::test]
async fn nicknames_are_unique_across_profiles_and_open_sessions() {
    let mut h = harness();
    let event = h.create_event("Winter LAN", 40, None);
    h.sign_up("a", event, "Nova", "1").await;

    h.register("b", event).await;
    assert_eq!(title(&h.dm("b", "Nova").await), "Nickname Taken");
    assert_eq!(title(&h.dm("b", "Orion").await), "Firstname");

    h.register("c", event).await;
    assert_eq!(title(&h.dm("c", "Orion").await), "Nickname Taken");
}

#[tokio::test]
async fn full_event_fills_the_reserve_list_in_order() {
    let mut h = harness();
    let event = h.create_event("Tiny LAN", 2, None);

    h.sign_up("a", event, "Nova", "2,1").await;
    h.sign_up("b", event, "Orion", "1").await;
    let db = h.state.db.clone();
    assert_eq!(db.get_registration(event, "a").unwrap().unwrap().seat, Some(2));
    assert_eq!(db.get_registration(event, "b").unwrap().unwrap().seat, Some(1));

    // No seat question once the event is full
    let confirmation = h.fill_in("c", event, "Vega", "1").await;
    assert_eq!(title(&confirmation), "Registration Confirmation");
    assert_eq!(field(&confirmation, "Assigned Seat"), Some("Reserve list"));
    let done = h.button("c", "registration_continue").await;
    assert!(title(&done).starts_with("Thank you c!"));
    let c = db.get_registration(event, "c").unwrap().unwrap();
    assert!(c.reserve);
    assert_eq!(c.seat, None);

    let demoted = reconciler::demote(&h.state, event, "a", "admin").await.unwrap();
    assert_eq!(demoted, DemoteOutcome::Demoted { freed_seat: Some(2) });
    assert_eq!(
        title(&h.last_dm("a")),
        "You have been moved to the reserves list!"
    );

    let promoted = reconciler::promote_next(&h.state, event, "admin").await.unwrap();
    assert_eq!(
        promoted,
        PromoteOutcome::Promoted {
            user_id: "c".into(),
            seat: 2
        }
    );
    assert!(title(&h.last_dm("c")).starts_with("Congratulations c!"));

    let reserves: Vec<_> = db.reserves(event).unwrap().into_iter().map(|r| r.user_id).collect();
    assert_eq!(reserves, vec!["a".to_string()]);
}

#[tokio::test]
async fn taken_preferences_are_refused_while_seats_remain() {
    let mut h = harness();
    let event = h.create_event("Small LAN", 3, None);
    h.sign_up("a", event, "Nova", "1").await;

    h.register("b", event).await;
    for answer in ["Orion", "Grace", "Hopper", "orion@example.com", "de"] {
        h.dm("b", answer).await;
    }
    assert_eq!(title(&h.button("b", "country_yes").await), "Preferred Seats");
    assert_eq!(title(&h.dm("b", "1").await), "Seats Taken");
    let confirmation = h.dm("b", "1, 3").await;
    assert_eq!(field(&confirmation, "Assigned Seat"), Some("3"));
}

#[tokio::test]
async fn repeated_answers_do_not_advance_twice() {
    let mut h = harness();
    let event = h.create_event("Winter LAN", 10, None);

    let confirmation = h.fill_in("u1", event, "Nova", "3").await;
    assert_eq!(field(&confirmation, "Assigned Seat"), Some("3"));
    assert_eq!(title(&h.dm("u1", "4").await), "Use The Buttons");
    assert_eq!(
        h.state.db.get_registration(event, "u1").unwrap().unwrap().seat,
        Some(3)
    );

    assert!(title(&h.button("u1", "registration_continue").await).starts_with("Congratulations"));
    assert_eq!(
        title(&h.button("u1", "registration_continue").await),
        "Registration Already Updated"
    );
    assert_eq!(h.state.db.event_entries(event).unwrap().len(), 1);
}

#[tokio::test]
async fn returning_users_skip_the_profile_questions() {
    let mut h = harness();
    let first = h.create_event("Winter LAN", 10, None);
    let second = h.create_event("Summer LAN", 10, None);
    h.sign_up("u1", first, "Nova", "1").await;

    h.register("u1", first).await;
    let current = h.last_dm("u1");
    assert_eq!(title(&current), "Current Event Registration");
    assert_eq!(field(&current, "Seat"), Some("1"));
    assert_eq!(title(&h.button("u1", "registration_confirm").await), "No Changes");

    h.register("u1", second).await;
    let dm = h.last_dm("u1");
    assert_eq!(title(&dm), "Account Already Exists");
    assert_eq!(dm.embeds[1].title.as_deref(), Some("Preferred Seats"));
    let confirmation = h.dm("u1", "5").await;
    assert_eq!(field(&confirmation, "Nickname"), Some("Nova"));
    assert!(title(&h.button("u1", "registration_continue").await).starts_with("Congratulations"));
    assert_eq!(h.state.db.events_for_user("u1").unwrap().len(), 2);
}

/// Rewind a confirmed registration and walk back to the seat question,
/// keeping the profile as it was.
async fn edit_to_seats(h: &mut Harness, user_id: &str, event: i64, nickname: &str) {
    h.register(user_id, event).await;
    assert_eq!(title(&h.last_dm(user_id)), "Current Event Registration");
    let rewound = h.button(user_id, "registration_edit").await;
    assert_eq!(title(&rewound), "Edit Registration");
    assert_eq!(field(&rewound, "Current"), Some(nickname));

    let email = format!("{}@example.com", nickname.to_lowercase());
    for answer in [nickname, "Ada", "Lovelace", email.as_str(), "se"] {
        h.dm(user_id, answer).await;
    }
    assert_eq!(title(&h.button(user_id, "country_yes").await), "Preferred Seats");
}

#[tokio::test]
async fn cancelled_edit_keeps_the_confirmed_seat() {
    let mut h = harness();
    let event = h.create_event("Winter LAN", 10, None);
    h.sign_up("u1", event, "Nova", "5").await;

    edit_to_seats(&mut h, "u1", event, "Nova").await;
    let confirmation = h.dm("u1", "3").await;
    assert_eq!(field(&confirmation, "Assigned Seat"), Some("3"));
    let db = h.state.db.clone();
    assert_eq!(db.get_registration(event, "u1").unwrap().unwrap().seat, Some(5));

    // Neither the old nor the new seat is up for grabs meanwhile
    assert_eq!(title(&h.fill_in("u2", event, "Orion", "5, 3").await), "Seats Taken");

    assert_eq!(title(&h.button("u1", "registration_cancel").await), "Aborted");
    let own = db.get_registration(event, "u1").unwrap().unwrap();
    assert_eq!(own.seat, Some(5));
    assert_eq!(own.status, RegistrationStatus::Confirmed);
    assert_eq!(db.occupied_seats(event).unwrap(), vec![5]);

    let other = h.dm("u2", "5, 3").await;
    assert_eq!(field(&other, "Assigned Seat"), Some("3"));
}

#[tokio::test]
async fn edited_registration_moves_the_seat_on_continue() {
    let mut h = harness();
    let event = h.create_event("Winter LAN", 10, None);
    h.sign_up("u1", event, "Nova", "5").await;

    h.register("u1", event).await;
    h.last_dm("u1");
    h.button("u1", "registration_edit").await;
    for answer in ["Supernova", "Ada", "Lovelace", "nova@example.com", "se"] {
        h.dm("u1", answer).await;
    }
    h.button("u1", "country_yes").await;
    let confirmation = h.dm("u1", "2, 3").await;
    assert_eq!(field(&confirmation, "Nickname"), Some("Supernova"));
    assert_eq!(field(&confirmation, "Assigned Seat"), Some("2"));

    assert!(title(&h.button("u1", "registration_continue").await).starts_with("Congratulations"));
    let db = h.state.db.clone();
    assert_eq!(db.get_user("u1").unwrap().unwrap().nickname, "Supernova");
    let own = db.get_registration(event, "u1").unwrap().unwrap();
    assert_eq!(own.seat, Some(2));
    assert_eq!(db.occupied_seats(event).unwrap(), vec![2]);
    assert_eq!(db.event_entries(event).unwrap().len(), 1);
}

#[tokio::test]
async fn edit_from_the_summary_keeps_the_target_event() {
    let mut h = harness();
    let _other = h.create_event("Winter LAN", 10, None);
    let event = h.create_event("Summer LAN", 10, None);

    let confirmation = h.fill_in("u1", event, "Nova", "4").await;
    assert_eq!(field(&confirmation, "Event"), Some("Summer LAN"));
    let rewound = h.button("u1", "registration_edit").await;
    assert_eq!(field(&rewound, "Current"), Some("Nova"));
    let session = h.state.db.get_session("u1").unwrap().unwrap();
    assert_eq!(session.stage(), Ok(Stage::CollectingNickname));
    assert_eq!(session.event_id, event);
    assert_eq!(session.firstname.as_deref(), Some("Ada"));

    for answer in ["Vega", "Ada", "Lovelace", "vega@example.com", "se"] {
        h.dm("u1", answer).await;
    }
    h.button("u1", "country_yes").await;
    let confirmation = h.dm("u1", "4").await;
    assert_eq!(field(&confirmation, "Event"), Some("Summer LAN"));
    assert_eq!(field(&confirmation, "Nickname"), Some("Vega"));
    assert!(title(&h.button("u1", "registration_continue").await).starts_with("Congratulations"));

    let events: Vec<_> = h.state.db.events_for_user("u1").unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(events, vec![event]);
    assert_eq!(h.state.db.occupied_seats(event).unwrap(), vec![4]);
}

#[tokio::test]
async fn unknown_stage_is_reported_and_never_advanced() {
    let mut h = harness();
    let event = h.create_event("Winter LAN", 10, None);
    h.register("u1", event).await;
    h.dm("u1", "Nova").await;

    let db = h.state.db.clone();
    db.with_conn(|c| Ok(c.execute("UPDATE registration_sessions SET stage = 'bogus' WHERE user_id = 'u1'", [])?))
        .unwrap();

    let reply = h.dm("u1", "Ada").await;
    assert_eq!(title(&reply), "Registration Error");
    assert!(reply.plain_text().contains("!cancel"));
    assert_eq!(title(&h.button("u1", "registration_continue").await), "Registration Error");
    assert_eq!(title(&h.button("u1", "registration_edit").await), "Registration Error");

    let session = db.get_session("u1").unwrap().unwrap();
    assert_eq!(session.stage, "bogus");
    assert!(session.firstname.is_none());
    assert!(db.get_registration(event, "u1").unwrap().is_none());

    assert_eq!(title(&h.dm("u1", "!cancel").await), "Aborted");
    assert!(db.get_session("u1").unwrap().is_none());
}

#[tokio::test]
async fn reserve_notice_gives_way_to_a_freed_seat() {
    let mut h = harness();
    let event = h.create_event("Tiny LAN", 1, None);
    h.sign_up("a", event, "Nova", "1").await;

    let confirmation = h.fill_in("b", event, "Orion", "1").await;
    assert_eq!(field(&confirmation, "Assigned Seat"), Some("Reserve list"));
    h.state.db.delete_registration(event, "a").unwrap();

    let freed = h.button("b", "registration_continue").await;
    assert_eq!(title(&freed), "A Seat Became Available");
    assert_eq!(freed.embeds[1].title.as_deref(), Some("Preferred Seats"));
    assert!(h.state.db.reserves(event).unwrap().is_empty());

    assert_eq!(field(&h.dm("b", "1").await, "Assigned Seat"), Some("1"));
    assert!(title(&h.button("b", "registration_continue").await).starts_with("Congratulations"));
    assert_eq!(h.state.db.get_registration(event, "b").unwrap().unwrap().seat, Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_users_messages_are_handled_in_arrival_order() {
    let mut h = harness();
    let event = h.create_event("Winter LAN", 10, None);
    h.register("u1", event).await;
    h.last_dm("u1");

    let inbound = h.inbound.take().unwrap();
    tokio::spawn(router::run(h.state.clone(), inbound));
    for answer in ["Nova", "Ada", "Lovelace", "nova@example.com"] {
        h.state.dispatcher.submit(Inbound::DirectMessage {
            user_id: "u1".into(),
            username: "u1".into(),
            content: answer.into(),
        });
    }

    let mut answered = 0;
    while answered < 4 {
        let sent = tokio::time::timeout(Duration::from_secs(5), h.events.recv())
            .await
            .expect("router went quiet")
            .unwrap();
        if matches!(&sent, GatewayEvent::DirectMessage { user_id, .. } if user_id == "u1") {
            answered += 1;
        }
    }

    let session = h.state.db.get_session("u1").unwrap().unwrap();
    assert_eq!(session.stage(), Ok(Stage::CollectingCountry));
    assert_eq!(session.nickname.as_deref(), Some("Nova"));
    assert_eq!(session.firstname.as_deref(), Some("Ada"));
    assert_eq!(session.lastname.as_deref(), Some("Lovelace"));
    assert_eq!(session.email.as_deref(), Some("nova@example.com"));
}
