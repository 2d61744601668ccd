//! Notifications and the request/response exchange.

use axum::http::StatusCode;
use serde_json::{Value, json};

mod common;
use common::{Account, TestApp, details};

async fn notify(app: &TestApp, from: &Account, to: &Account, extra: Value) -> (StatusCode, Value) {
    let mut body = json!({ "from": from.id, "to": to.id });
    for (k, v) in extra.as_object().unwrap() {
        body[k] = v.clone();
    }
    app.post("/notifications", &from.token, body).await
}

fn subscription() -> Value {
    json!({
        "subscriptionId": uuid::Uuid::new_v4(),
        "monthly": true,
        "online": false,
    })
}

#[tokio::test]
async fn create_and_read() {
    let app = TestApp::new();
    let member = app.register("member", "MEMBER").await;
    let coach = app.register("coach", "COACH").await;

    let (status, n) = notify(
        &app,
        &member,
        &coach,
        json!({ "type": "NEW_REQUEST", "data": { "email": "m@example.com" }, "message": "Hi coach" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(n["type"], "NEW_REQUEST");
    assert_eq!(n["data"]["email"], "m@example.com");
    assert_eq!(n["userFromId"], member.id_str());
    assert!(n["viewDate"].is_null());
    let uri = format!("/notifications/{}", n["id"].as_str().unwrap());

    let (_, fetched) = app.get(&uri, &coach.token).await;
    assert!(fetched["viewDate"].is_null());
    let (_, fetched) = app.get(&format!("{}?updateViewDate=true", uri), &coach.token).await;
    assert!(fetched["viewDate"].is_string());

    let (_, inbox) = app.get(&format!("/notifications/to/{}", coach.id), &coach.token).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    let (_, outbox) = app.get(&format!("/notifications/from/{}", member.id), &member.token).await;
    assert_eq!(outbox[0]["id"], n["id"]);

    let (status, _) = app.get(&format!("/notifications/to/{}", coach.id), &member.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let stranger = app.register("stranger", "MEMBER").await;
    let (status, _) = app.get(&uri, &stranger.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn payload_must_match_its_type() {
    let app = TestApp::new();
    let a = app.register("anna", "MEMBER").await;
    let b = app.register("bruno", "COACH").await;

    for extra in [
        json!({ "type": "NEW_SUBSCRIPTION", "data": { "monthly": true } }),
        json!({ "type": "NEW_MESSAGE" }),
        json!({ "type": "FRIEND_REQUEST" }),
        json!({ "data": {} }),
    ] {
        let (status, _) = notify(&app, &a, &b, extra).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, n) = notify(&app, &a, &b, json!({ "type": "SEARCH_COACH" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(n.get("data").is_none_or(Value::is_null));
}

#[tokio::test]
async fn sender_must_be_the_caller() {
    let app = TestApp::new();
    let a = app.register("anna", "MEMBER").await;
    let b = app.register("bruno", "COACH").await;

    let (status, _) = app
        .post(
            "/notifications",
            &a.token,
            json!({ "from": b.id, "to": a.id, "type": "SEARCH_COACH" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = app.admin().await;
    let (status, _) = app
        .post(
            "/notifications",
            &admin.token,
            json!({ "from": b.id, "to": a.id, "type": "SEARCH_COACH" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn linking_a_response_gives_a_symmetric_pair() {
    let app = TestApp::new();
    let member = app.register("member", "MEMBER").await;
    let coach = app.register("coach", "COACH").await;

    let (_, request) = notify(&app, &member, &coach, json!({ "type": "SEARCH_COACH" })).await;
    let request_id = request["id"].as_str().unwrap();

    let (status, response) = notify(
        &app,
        &coach,
        &member,
        json!({ "type": "COACH_ACCEPT", "linkedNotification": request_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, updated) = app
        .patch(
            &format!("/notifications/{}", request_id),
            &coach.token,
            json!({
                "answered": chrono::Utc::now(),
                "answer": "common:api.accepted",
                "linkedNotification": response["id"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(updated["linkedNotification"], response["id"]);
    assert_eq!(response["linkedNotification"], request["id"]);
    assert!(updated["answered"].is_string());
    assert_eq!(updated["answer"], "common:api.accepted");
}

#[tokio::test]
async fn answering_a_subscription_copies_its_payload() {
    let app = TestApp::new();
    let member = app.register("member", "MEMBER").await;
    let coach = app.register("coach", "COACH").await;
    let data = subscription();

    let (_, request) = notify(
        &app,
        &member,
        &coach,
        json!({ "type": "NEW_SUBSCRIPTION", "data": data, "message": "sign me up" }),
    )
    .await;
    let uri = format!("/notifications/{}/answer", request["id"].as_str().unwrap());

    let (status, pair) = app.post(&uri, &coach.token, json!({ "answer": "ACCEPT" })).await;
    assert_eq!(status, StatusCode::OK);

    let (request, response) = (&pair["request"], &pair["response"]);
    assert_eq!(response["type"], "SUBSCRIPTION_VALIDATED");
    assert_eq!(response["data"], data);
    assert_eq!(response["userFromId"], coach.id_str());
    assert_eq!(response["userToId"], member.id_str());
    assert_eq!(response["linkedNotification"], request["id"]);
    assert_eq!(request["linkedNotification"], response["id"]);
    assert_eq!(request["answer"], "common:api.accept");
    assert!(request["answered"].is_string());

    // Single shot
    let (status, body) = app.post(&uri, &coach.token, json!({ "answer": "REJECT" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(details(&body).contains("already answered"));

    let (_, inbox) = app.get(&format!("/notifications/to/{}", member.id), &member.token).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn refusing_a_coach_request_quotes_it() {
    let app = TestApp::new();
    let member = app.register("member", "MEMBER").await;
    let coach = app.register("coach", "COACH").await;

    let (_, request) = notify(
        &app,
        &member,
        &coach,
        json!({ "type": "NEW_REQUEST", "data": {}, "message": "Can you train me for a marathon?" }),
    )
    .await;
    let (status, pair) = app
        .post(
            &format!("/notifications/{}/answer", request["id"].as_str().unwrap()),
            &coach.token,
            json!({ "answer": "REJECT" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pair["response"]["type"], "COACH_REFUSE");
    assert_eq!(pair["response"]["message"], ">Can you train m...");
    assert_eq!(pair["request"]["answer"], "common:api.refused");
}

#[tokio::test]
async fn only_the_recipient_answers_requests() {
    let app = TestApp::new();
    let member = app.register("member", "MEMBER").await;
    let coach = app.register("coach", "COACH").await;

    let (_, request) = notify(&app, &member, &coach, json!({ "type": "SEARCH_COACH" })).await;
    let uri = format!("/notifications/{}/answer", request["id"].as_str().unwrap());

    let (status, _) = app.post(&uri, &member.token, json!({ "answer": "ACCEPT" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, message) = notify(
        &app,
        &member,
        &coach,
        json!({ "type": "NEW_MESSAGE", "data": { "channelId": uuid::Uuid::new_v4() } }),
    )
    .await;
    let (status, _) = app
        .post(
            &format!("/notifications/{}/answer", message["id"].as_str().unwrap()),
            &coach.token,
            json!({ "answer": "ACCEPT" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &format!("/notifications/{}/answer", uuid::Uuid::new_v4()),
            &coach.token,
            json!({ "answer": "ACCEPT" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
