pub mod auth;
pub mod channels;
pub mod clubs;
pub mod convert;
pub mod documents;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod policy;
pub mod pricing;
pub mod reactions;
pub mod users;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{MethodRouter, delete, get, post, put},
};
use serde_json::{Value, json};

use fitclub_db::Database;

use crate::documents::DocumentStore;
use crate::error::ApiError;
use crate::policy::Requirement;

/// Settings the handlers need at request time.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub token_days: i64,
    /// Registering with one of these addresses grants ADMIN.
    pub admin_emails: Vec<String>,
}

pub struct AppStateInner {
    pub db: Database,
    pub documents: Arc<dyn DocumentStore>,
    pub config: ApiConfig,
}

pub type AppState = Arc<AppStateInner>;

/// Run blocking DB work off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
        .map_err(ApiError::from)
}

fn require(requirement: Requirement, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(requirement, policy::enforce))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Every procedure, with session and role requirements attached. Transport
/// layers (tracing, CORS) are added by the server.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/pricings/{id}", get(pricing::get_pricing_by_id))
        .route("/pricings/role/{role}", get(pricing::get_pricing_for_role));

    let protected_routes = Router::new()
        // Users
        .route(
            "/users/{id}",
            get(users::get_user_by_id).patch(users::update_user),
        )
        .route(
            "/users/{id}/role",
            require(policy::UPDATE_USER_ROLE, put(users::update_user_role)),
        )
        .route("/users/{id}/pricing", put(users::subscribe_to_pricing))
        // Clubs & coaches
        .route("/clubs", require(policy::CREATE_CLUB, post(clubs::create_club)))
        .route("/clubs/{id}", get(clubs::get_club_by_id))
        .route("/coachs", require(policy::CREATE_COACH, post(clubs::create_coach)))
        // Documents
        .route(
            "/documents",
            post(documents::upload_document)
                .layer(DefaultBodyLimit::max(documents::MAX_DOCUMENT_SIZE)),
        )
        .route(
            "/documents/{user_id}/{document_id}",
            get(documents::download_document).delete(documents::delete_user_document),
        )
        .route(
            "/documents/{user_id}/{document_id}/url",
            get(documents::get_document_url_by_id),
        )
        // Messages
        .route("/messages/channels", get(channels::get_channel_list))
        .route(
            "/messages/channels/{channel_id}/messages",
            get(messages::get_messages_for_user).post(messages::create_message),
        )
        .route(
            "/messages/channels/{channel_id}/view",
            put(messages::mark_channel_viewed),
        )
        .route("/messages/{message_id}", get(messages::get_message_by_id))
        .route(
            "/messages/{message_id}/reactions",
            post(reactions::add_reaction),
        )
        .route("/messages/groups", post(channels::create_group))
        .route("/messages/private", post(channels::create_private_channel))
        .route(
            "/messages/groups/{id}",
            get(channels::get_group_by_id)
                .patch(channels::update_group)
                .delete(channels::delete_group),
        )
        // Notifications
        .route("/notifications", post(notifications::create_notification_to_user))
        .route(
            "/notifications/{id}",
            get(notifications::get_notification_by_id).patch(notifications::update_notification),
        )
        .route(
            "/notifications/{id}/answer",
            post(notifications::answer_notification),
        )
        .route(
            "/notifications/to/{user_id}",
            get(notifications::get_notification_to_user),
        )
        .route(
            "/notifications/from/{user_id}",
            get(notifications::get_notification_from_user),
        )
        // Pricing
        .route(
            "/pricings",
            require(policy::GET_ALL_PRICING, get(pricing::get_all_pricing))
                .merge(require(policy::CREATE_PRICING, post(pricing::create_pricing)))
                .merge(require(policy::UPDATE_PRICING, put(pricing::update_pricing))),
        )
        .route(
            "/pricings/{id}",
            require(policy::DELETE_PRICING, delete(pricing::delete_pricing)),
        )
        .route(
            "/pricings/{id}/undelete",
            require(policy::UNDELETE_PRICING, post(pricing::undelete_pricing)),
        )
        .route(
            "/pricings/options/{name}",
            require(policy::DELETE_PRICING_OPTION, delete(pricing::delete_pricing_option)),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
