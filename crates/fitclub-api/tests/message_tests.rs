//! Messages, replies, reactions and read markers.

use axum::http::StatusCode;
use serde_json::{Value, json};

mod common;
use common::{Account, TestApp};

async fn group_of(app: &TestApp, owner: &Account, members: &[&Account]) -> String {
    let users: Vec<_> = members.iter().map(|m| m.id).collect();
    let (status, group) = app
        .post("/messages/groups", &owner.token, json!({ "name": "G", "users": users }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    group["id"].as_str().unwrap().to_string()
}

async fn say(app: &TestApp, who: &Account, channel: &str, body: Value) -> (StatusCode, Value) {
    app.post(&format!("/messages/channels/{}/messages", channel), &who.token, body)
        .await
}

#[tokio::test]
async fn sender_comes_from_the_session() {
    let app = TestApp::new();
    let owner = app.register("owner", "MEMBER").await;
    let member = app.register("member", "MEMBER").await;
    let channel = group_of(&app, &owner, &[&member]).await;

    let (status, message) = say(&app, &member, &channel, json!({ "message": "hi all" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["fromId"], member.id_str());
    assert_eq!(message["fromName"], "member");
    assert_eq!(message["channelId"], channel);
    assert_eq!(message["reactions"], json!([]));

    let (status, fetched) = app
        .get(&format!("/messages/{}", message["id"].as_str().unwrap()), &owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["message"], "hi all");
}

#[tokio::test]
async fn outsiders_cannot_read_or_post() {
    let app = TestApp::new();
    let owner = app.register("owner", "MEMBER").await;
    let outsider = app.register("outsider", "MEMBER").await;
    let channel = group_of(&app, &owner, &[]).await;
    let (_, message) = say(&app, &owner, &channel, json!({ "message": "private" })).await;

    let (status, _) = say(&app, &outsider, &channel, json!({ "message": "let me in" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .get(&format!("/messages/channels/{}/messages", channel), &outsider.token)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .get(&format!("/messages/{}", message["id"].as_str().unwrap()), &outsider.token)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = app.admin().await;
    let (status, _) = app
        .get(&format!("/messages/channels/{}/messages", channel), &admin.token)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn replies_stay_in_their_channel() {
    let app = TestApp::new();
    let owner = app.register("owner", "MEMBER").await;
    let first = group_of(&app, &owner, &[]).await;
    let second = group_of(&app, &owner, &[]).await;

    let (_, parent) = say(&app, &owner, &first, json!({ "message": "question?" })).await;
    let parent_id = parent["id"].as_str().unwrap();

    let (status, reply) = say(
        &app,
        &owner,
        &first,
        json!({ "message": "answer", "messageRefId": parent_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["messageRefId"], parent_id);

    let (status, _) = say(
        &app,
        &owner,
        &second,
        json!({ "message": "cross-channel", "messageRefId": parent_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = say(
        &app,
        &owner,
        &first,
        json!({ "message": "dangling", "messageRefId": uuid::Uuid::new_v4() }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = say(&app, &owner, &first, json!({ "message": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pages_grow_by_twenty_newest_first() {
    let app = TestApp::new();
    let owner = app.register("owner", "MEMBER").await;
    let channel = group_of(&app, &owner, &[]).await;
    for i in 0..25 {
        say(&app, &owner, &channel, json!({ "message": format!("m{}", i) })).await;
    }
    let uri = format!("/messages/channels/{}/messages", channel);

    let (_, page) = app.get(&uri, &owner.token).await;
    let messages = page["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 20);
    assert_eq!(messages[0]["message"], "m24");
    assert_eq!(messages[19]["message"], "m5");

    let (_, page) = app.get(&format!("{}?page=2", uri), &owner.token).await;
    assert_eq!(page["messages"].as_array().unwrap().len(), 25);

    let (status, _) = app.get(&format!("{}?page=0", uri), &owner.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn last_view_defaults_to_epoch_until_marked() {
    let app = TestApp::new();
    let owner = app.register("owner", "MEMBER").await;
    let channel = group_of(&app, &owner, &[]).await;
    let uri = format!("/messages/channels/{}/messages", channel);

    let (_, page) = app.get(&uri, &owner.token).await;
    let epoch: chrono::DateTime<chrono::Utc> = page["lastView"].as_str().unwrap().parse().unwrap();
    assert_eq!(epoch.timestamp(), 0);

    let (status, view) = app
        .put(&format!("/messages/channels/{}/view", channel), &owner.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, page) = app.get(&uri, &owner.token).await;
    assert_eq!(page["lastView"], view["lastView"]);
    assert_ne!(page["lastView"], json!(epoch));
}

#[tokio::test]
async fn reactions_toggle() {
    let app = TestApp::new();
    let owner = app.register("owner", "MEMBER").await;
    let member = app.register("member", "MEMBER").await;
    let channel = group_of(&app, &owner, &[&member]).await;
    let (_, message) = say(&app, &owner, &channel, json!({ "message": "PR today" })).await;
    let uri = format!("/messages/{}/reactions", message["id"].as_str().unwrap());

    let (status, reactions) = app.post(&uri, &member.token, json!({ "reaction": "STRENGTH" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reactions.as_array().unwrap().len(), 1);
    assert_eq!(reactions[0]["reaction"], "STRENGTH");
    assert_eq!(reactions[0]["fromId"], member.id_str());

    let (_, reactions) = app.post(&uri, &owner.token, json!({ "reaction": "LOVE" })).await;
    assert_eq!(reactions.as_array().unwrap().len(), 2);

    // Same reaction again removes it
    let (_, reactions) = app.post(&uri, &member.token, json!({ "reaction": "STRENGTH" })).await;
    assert_eq!(reactions.as_array().unwrap().len(), 1);
    assert_eq!(reactions[0]["reaction"], "LOVE");

    let (status, _) = app.post(&uri, &member.token, json!({ "reaction": "THUMBS" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, page) = app
        .get(&format!("/messages/channels/{}/messages", channel), &member.token)
        .await;
    assert_eq!(page["messages"][0]["reactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_channel_is_not_found_even_for_admins() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let member = app.register("member", "MEMBER").await;
    let channel = uuid::Uuid::new_v4().to_string();

    for who in [&admin, &member] {
        let (status, _) = say(&app, who, &channel, json!({ "message": "anyone?" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .put(&format!("/messages/channels/{}/view", channel), &who.token, json!({}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .get(&format!("/messages/channels/{}/messages", channel), &who.token)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
