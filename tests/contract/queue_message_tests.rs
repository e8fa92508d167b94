//! Contract tests for the queue message JSON shape.
//!
//! Producers and consumers may run different builds, so the field names
//! and the type discriminator are part of the contract.

use chrono::{TimeZone, Utc};
use insta_unfurl::models::slack_event::SharedLink;
use insta_unfurl::models::work_item::{
    CommandPayload, LinkEventPayload, WorkItem, WorkKind, WorkPayload,
};
use slack_morphism::prelude::{SlackChannelId, SlackTs, SlackUserId};

fn at() -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_714_564_800, 0).single().expect("valid time")
}

#[test]
fn slash_command_message_shape() {
    let item = WorkItem::at(
        at(),
        WorkPayload::Command(CommandPayload {
            reply_target: "https://hooks.slack.com/commands/1".into(),
            requester_id: SlackUserId("U1".into()),
            content_url: "https://www.instagram.com/p/ABC/".into(),
            selected_index: 1,
        }),
    );

    let json: serde_json::Value =
        serde_json::from_str(&item.encode().expect("encode")).expect("json");

    assert_eq!(
        json,
        serde_json::json!({
            "request_timestamp": 1_714_564_800,
            "type": "slash_command",
            "slash_message": {
                "instagram_url": "https://www.instagram.com/p/ABC/",
                "response_url": "https://hooks.slack.com/commands/1",
                "user_id": "U1",
                "selected_index": 1
            }
        })
    );
}

#[test]
fn unfurl_message_carries_the_event_callback() {
    let item = WorkItem::at(
        at(),
        WorkPayload::LinkEvent(LinkEventPayload {
            tenant_token: "tok-acme".into(),
            event_id: "Ev1".into(),
            event_time: 1_714_564_799,
            channel: SlackChannelId("C1".into()),
            user: SlackUserId("U1".into()),
            message_ts: SlackTs("1714564799.000100".into()),
            thread_ts: Some(SlackTs("1714564000.000001".into())),
            links: vec![SharedLink {
                domain: "instagram.com".into(),
                url: "https://www.instagram.com/p/ABC/".into(),
            }],
        }),
    );

    let json: serde_json::Value =
        serde_json::from_str(&item.encode().expect("encode")).expect("json");

    assert_eq!(json["type"], "unfurl_event");
    assert!(json.get("slash_message").is_none());
    let callback = &json["unfurl_message"];
    assert_eq!(callback["token"], "tok-acme");
    assert_eq!(callback["type"], "event_callback");
    assert_eq!(callback["event_id"], "Ev1");
    assert_eq!(callback["event"]["type"], "link_shared");
    assert_eq!(callback["event"]["channel"], "C1");
    assert_eq!(callback["event"]["message_ts"], "1714564799.000100");
    assert_eq!(callback["event"]["thread_ts"], "1714564000.000001");
    assert_eq!(callback["event"]["links"][0]["domain"], "instagram.com");
}

#[test]
fn message_from_another_producer_decodes() {
    let body = r#"{
        "request_timestamp": 1714564800,
        "type": "unfurl_event",
        "unfurl_message": {
            "token": "tok-acme",
            "team_id": "T1",
            "api_app_id": "A1",
            "type": "event_callback",
            "event_id": "Ev9",
            "event_time": 1714564800,
            "event": {
                "type": "link_shared",
                "channel": "C9",
                "user": "U9",
                "message_ts": "1714564800.000200",
                "links": [{"domain": "instagram.com", "url": "https://www.instagram.com/p/Q/"}]
            }
        }
    }"#;

    let item = WorkItem::decode(body).expect("decodes");

    assert_eq!(item.kind(), WorkKind::LinkEvent);
    assert_eq!(item.created_at.timestamp(), 1_714_564_800);
    match item.payload {
        WorkPayload::LinkEvent(evt) => {
            assert_eq!(evt.tenant_token, "tok-acme");
            assert_eq!(evt.channel.0, "C9");
            assert_eq!(evt.links[0].url, "https://www.instagram.com/p/Q/");
            assert!(evt.thread_ts.is_none());
        }
        WorkPayload::Command(_) => panic!("expected link event"),
    }
}

#[test]
fn missing_selected_index_defaults_to_first_part() {
    let body = r#"{
        "request_timestamp": 1714564800,
        "type": "slash_command",
        "slash_message": {
            "instagram_url": "https://www.instagram.com/p/ABC/",
            "response_url": "https://hooks.slack.com/commands/1",
            "user_id": "U1"
        }
    }"#;

    let item = WorkItem::decode(body).expect("decodes");
    match item.payload {
        WorkPayload::Command(cmd) => assert_eq!(cmd.selected_index, 0),
        WorkPayload::LinkEvent(_) => panic!("expected command"),
    }
}
