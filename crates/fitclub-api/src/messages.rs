use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use fitclub_types::api::{
    Claims, CreateMessageRequest, MessageResponse, MessageViewResponse, MessagesQuery,
    MessagesResponse,
};

use crate::channels::ensure_participant;
use crate::error::{ApiError, Result};
use crate::extract::{ValidJson, ValidPath, ValidQuery, require_text};
use crate::{AppState, convert, run_db};

/// Messages returned per page; page `n` returns the newest `n * PAGE_SIZE`.
pub const PAGE_SIZE: u32 = 20;

/// GET /messages/channels/{channel_id}/messages?page=1
pub async fn get_messages_for_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(channel_id): ValidPath<Uuid>,
    ValidQuery(query): ValidQuery<MessagesQuery>,
) -> Result<Json<MessagesResponse>> {
    if query.page == 0 {
        return Err(ApiError::Validation("page starts at 1".into()));
    }
    ensure_participant(&state, &claims, channel_id, "read this channel").await?;

    let cid = channel_id.to_string();
    let uid = claims.sub.to_string();
    let limit = query.page.saturating_mul(PAGE_SIZE);

    let (rows, reaction_rows, last_view) = run_db(&state, move |db| {
        let rows = db.get_messages(&cid, limit)?;
        let message_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let reactions = db.get_reactions_for_messages(&message_ids)?;
        let last_view = db.get_last_view(&cid, &uid)?;
        Ok((rows, reactions, last_view))
    })
    .await?;

    let messages = rows
        .into_iter()
        .map(|row| convert::message_response(row, &reaction_rows))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let last_view = match last_view {
        Some(raw) => convert::parse_timestamp(&raw)?,
        None => DateTime::<Utc>::UNIX_EPOCH,
    };

    Ok(Json(MessagesResponse {
        messages,
        last_view,
    }))
}

/// GET /messages/{message_id}: `null` when there is no such message.
pub async fn get_message_by_id(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(message_id): ValidPath<Uuid>,
) -> Result<Json<Option<MessageResponse>>> {
    let Some(message) = load_message(&state, message_id).await? else {
        return Ok(Json(None));
    };
    ensure_participant(&state, &claims, message.channel_id, "read this channel").await?;
    Ok(Json(Some(message)))
}

pub(crate) async fn load_message(state: &AppState, message_id: Uuid) -> Result<Option<MessageResponse>> {
    let mid = message_id.to_string();
    let found = run_db(state, move |db| {
        let Some(row) = db.get_message(&mid)? else {
            return Ok(None);
        };
        let reactions = db.get_reactions_for_messages(std::slice::from_ref(&mid))?;
        Ok(Some((row, reactions)))
    })
    .await?;

    match found {
        Some((row, reactions)) => Ok(Some(convert::message_response(row, &reactions)?)),
        None => Ok(None),
    }
}

/// POST /messages/channels/{channel_id}/messages: the sender is the caller.
pub async fn create_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(channel_id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<CreateMessageRequest>,
) -> Result<impl IntoResponse> {
    require_text("message", &req.message)?;
    ensure_participant(&state, &claims, channel_id, "post in this channel").await?;

    let message_id = Uuid::new_v4();
    let (mid, cid, uid) = (message_id.to_string(), channel_id.to_string(), claims.sub.to_string());
    let reply_to = req.message_ref_id.map(|id| id.to_string());
    let body = req.message;

    let inserted = run_db(&state, move |db| {
        // A reply must point at a message of the same channel
        if let Some(ref_id) = &reply_to {
            match db.get_message(ref_id)? {
                Some(parent) if parent.channel_id == cid => {}
                _ => return Ok(None),
            }
        }
        db.insert_message(&mid, &cid, &uid, &body, reply_to.as_deref())?;
        db.get_message(&mid)
    })
    .await?;

    let row = inserted.ok_or_else(|| {
        ApiError::Validation("messageRefId must reference a message of the same channel".into())
    })?;

    Ok((StatusCode::CREATED, Json(convert::message_response(row, &[])?)))
}

/// PUT /messages/channels/{channel_id}/view
pub async fn mark_channel_viewed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(channel_id): ValidPath<Uuid>,
) -> Result<Json<MessageViewResponse>> {
    ensure_participant(&state, &claims, channel_id, "read this channel").await?;

    let (cid, uid) = (channel_id.to_string(), claims.sub.to_string());
    let at = fitclub_db::now();
    let stored = at.clone();
    run_db(&state, move |db| db.upsert_last_view(&cid, &uid, &stored)).await?;

    Ok(Json(MessageViewResponse {
        channel_id,
        last_view: convert::parse_timestamp(&at)?,
    }))
}
