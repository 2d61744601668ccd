//! Pricing CRUD, soft delete and subscriptions.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

mod common;
use common::{Account, TestApp, details};

fn base(role: &str, title: &str, monthly: f64) -> Value {
    json!({
        "roleTarget": role,
        "title": title,
        "description": format!("{} plan", title),
        "monthly": monthly,
        "yearly": monthly * 10.0,
    })
}

async fn create(app: &TestApp, admin: &Account, base: Value, options: Value) -> Value {
    let (status, body) = app
        .post(
            "/pricings",
            &admin.token,
            json!({ "base": base, "options": options, "features": ["COACH_PLAN", "COACH_OFFER"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn admin_only_mutations_name_the_operation() {
    let app = TestApp::new();
    let coach = app.register("coach", "COACH").await;
    let admin = app.admin().await;
    let pricing = create(&app, &admin, base("COACH", "Pro", 20.0), json!([])).await;
    let id = pricing["id"].as_str().unwrap();

    let cases = [
        (Method::GET, "/pricings".to_string(), None, "query pricing"),
        (
            Method::POST,
            "/pricings".to_string(),
            Some(json!({ "base": base("COACH", "x", 1.0), "options": [], "features": [] })),
            "create a pricing",
        ),
        (
            Method::PUT,
            "/pricings".to_string(),
            Some(json!({ "base": { "id": id }, "options": [], "features": [] })),
            "modify a pricing",
        ),
        (Method::DELETE, format!("/pricings/{}", id), None, "delete a pricing"),
        (Method::POST, format!("/pricings/{}/undelete", id), None, "undelete a pricing"),
        (Method::DELETE, "/pricings/options/Sauna".to_string(), None, "delete a pricing option"),
    ];
    for (method, uri, body, action) in cases {
        let (status, body) = app.call(method, &uri, Some(&coach.token), body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(details(&body), format!("You are not authorized to {}", action));
    }

    // Nothing changed
    let (_, fetched) = app.call(Method::GET, &format!("/pricings/{}", id), None, None).await;
    assert_eq!(fetched, pricing);
}

#[tokio::test]
async fn reads_are_public() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let pricing = create(&app, &admin, base("MEMBER", "Basic", 9.0), json!(["Gym", "Pool"])).await;

    let (status, fetched) = app
        .call(Method::GET, &format!("/pricings/{}", pricing["id"].as_str().unwrap()), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = fetched["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Gym", "Pool"]);
    assert_eq!(fetched["options"][1]["weight"], 1);
    assert_eq!(fetched["features"].as_array().unwrap().len(), 2);

    let (status, missing) = app
        .call(Method::GET, &format!("/pricings/{}", uuid::Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(missing.is_null());

    let (status, _) = app.call(Method::GET, "/pricings/role/WIZARD", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn role_listing_is_cheapest_first() {
    let app = TestApp::new();
    let admin = app.admin().await;
    create(&app, &admin, base("COACH", "Premium", 50.0), json!([])).await;
    create(&app, &admin, base("COACH", "Starter", 10.0), json!([])).await;
    create(&app, &admin, base("MEMBER", "Member", 5.0), json!([])).await;

    let (_, list) = app.call(Method::GET, "/pricings/role/COACH", None, None).await;
    let titles: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Starter", "Premium"]);

    let (status, all) = app.get("/pricings", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    let order: Vec<(&str, &str)> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|p| (p["roleTarget"].as_str().unwrap(), p["title"].as_str().unwrap()))
        .collect();
    // Admin listing: by role, then by monthly amount
    assert_eq!(
        order,
        vec![("MEMBER", "Member"), ("COACH", "Starter"), ("COACH", "Premium")]
    );
}

#[tokio::test]
async fn update_replaces_options_and_features() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let pricing = create(&app, &admin, base("COACH", "Pro", 20.0), json!(["A", "B"])).await;
    let id = pricing["id"].as_str().unwrap();

    let (status, updated) = app
        .put(
            "/pricings",
            &admin.token,
            json!({
                "base": { "id": id, "title": "Pro+", "highlighted": true },
                "options": [],
                "features": ["MANAGER_ROOMS"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Pro+");
    assert_eq!(updated["highlighted"], true);
    assert_eq!(updated["monthly"], 20.0);
    assert_eq!(updated["options"], json!([]));
    assert_eq!(updated["features"], json!(["MANAGER_ROOMS"]));

    let (status, _) = app
        .put(
            "/pricings",
            &admin.token,
            json!({ "base": { "id": uuid::Uuid::new_v4() }, "options": [], "features": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .put(
            "/pricings",
            &admin.token,
            json!({ "base": { "id": id, "monthly": -1.0 }, "options": [], "features": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn soft_delete_and_restore() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let pricing = create(&app, &admin, base("MEMBER", "Basic", 9.0), json!([])).await;
    let id = pricing["id"].as_str().unwrap();
    assert_eq!(pricing["deleted"], false);
    assert!(pricing["deletionDate"].is_null());

    let (status, deleted) = app.delete(&format!("/pricings/{}", id), &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], true);
    assert!(deleted["deletionDate"].is_string());

    let (_, listed) = app.call(Method::GET, "/pricings/role/MEMBER", None, None).await;
    assert_eq!(listed, json!([]));
    // Still readable by id and in the admin listing
    let (_, by_id) = app.call(Method::GET, &format!("/pricings/{}", id), None, None).await;
    assert_eq!(by_id["deleted"], true);
    let (_, all) = app.get("/pricings", &admin.token).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, restored) = app
        .call(Method::POST, &format!("/pricings/{}/undelete", id), Some(&admin.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["deleted"], false);
    assert!(restored["deletionDate"].is_null());

    let (_, listed) = app.call(Method::GET, "/pricings/role/MEMBER", None, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app
        .delete(&format!("/pricings/{}", uuid::Uuid::new_v4()), &admin.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_option_by_name_everywhere() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let a = create(&app, &admin, base("MEMBER", "A", 1.0), json!(["Sauna", "Gym"])).await;
    let b = create(&app, &admin, base("COACH", "B", 2.0), json!(["Sauna"])).await;

    let (status, body) = app.delete("/pricings/options/Sauna", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, a) = app
        .call(Method::GET, &format!("/pricings/{}", a["id"].as_str().unwrap()), None, None)
        .await;
    assert_eq!(a["options"].as_array().unwrap().len(), 1);
    let (_, b) = app
        .call(Method::GET, &format!("/pricings/{}", b["id"].as_str().unwrap()), None, None)
        .await;
    assert_eq!(b["options"], json!([]));
}

#[tokio::test]
async fn subscription_must_fit_the_user() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let member = app.register("member", "MEMBER").await;
    let for_members = create(&app, &admin, base("MEMBER", "Basic", 9.0), json!([])).await;
    let for_coaches = create(&app, &admin, base("COACH", "Pro", 20.0), json!([])).await;
    let uri = format!("/users/{}/pricing", member.id);

    let (status, _) = app
        .put(&uri, &member.token, json!({ "pricingId": for_coaches["id"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, profile) = app
        .put(&uri, &member.token, json!({ "pricingId": for_members["id"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["pricingId"], for_members["id"]);

    app.delete(&format!("/pricings/{}", for_members["id"].as_str().unwrap()), &admin.token)
        .await;
    let (status, _) = app
        .put(&uri, &member.token, json!({ "pricingId": for_members["id"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
