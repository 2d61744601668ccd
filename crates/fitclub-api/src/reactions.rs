use axum::{Extension, Json, extract::State};
use tracing::debug;
use uuid::Uuid;

use fitclub_types::api::{AddReactionRequest, Claims, ReactionResponse};

use crate::channels::ensure_participant;
use crate::error::{ApiError, Result};
use crate::extract::{ValidJson, ValidPath};
use crate::messages::load_message;
use crate::{AppState, run_db};

/// POST /messages/{message_id}/reactions: toggles the caller's reaction and
/// returns the message's reactions afterwards.
pub async fn add_reaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(message_id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<AddReactionRequest>,
) -> Result<Json<Vec<ReactionResponse>>> {
    let message = load_message(&state, message_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("message {}", message_id)))?;
    ensure_participant(&state, &claims, message.channel_id, "react in this channel").await?;

    let reaction_id = Uuid::new_v4().to_string();
    let (mid, uid) = (message_id.to_string(), claims.sub.to_string());
    let added = run_db(&state, move |db| {
        db.toggle_reaction(&reaction_id, &mid, &uid, req.reaction)
    })
    .await?;
    debug!(%message_id, user = %claims.sub, reaction = %req.reaction, added, "Reaction toggled");

    let message = load_message(&state, message_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("message {}", message_id)))?;
    Ok(Json(message.reactions))
}
