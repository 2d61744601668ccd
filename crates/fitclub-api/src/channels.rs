use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};
use tracing::{error, info, warn};
use uuid::Uuid;

use fitclub_db::Database;
use fitclub_db::models::{ChannelListRow, ChannelRow, DocRef};
use fitclub_types::api::{
    ChannelListItem, ChannelListQuery, ChannelResponse, Claims, CreateGroupRequest,
    CreatePrivateChannelRequest, GroupResponse, UpdateGroupRequest,
};
use fitclub_types::models::ChannelType;

use crate::documents::DocumentStore;
use crate::error::{ApiError, Result};
use crate::extract::{ValidJson, ValidPath, ValidQuery, require_text};
use crate::{AppState, convert, policy, run_db};

/// Shown for any channel whose image cannot be resolved.
pub const FALLBACK_CHANNEL_IMAGE: &str = "/images/channel.png";

async fn document_url(store: &dyn DocumentStore, doc: &DocRef, channel_id: &str) -> Option<String> {
    match store.url(&doc.user_id, &doc.document_id).await {
        Ok(Some(url)) => Some(url),
        Ok(None) => {
            warn!(channel_id, document_id = %doc.document_id, "Channel image has no stored bytes");
            None
        }
        Err(e) => {
            warn!(channel_id, document_id = %doc.document_id, error = %e, "Channel image lookup failed");
            None
        }
    }
}

/// Display image of one channel. A document reference that does not resolve
/// falls straight back to [`FALLBACK_CHANNEL_IMAGE`]; the provider image is
/// only used when there is no document reference at all.
pub async fn channel_image(store: &dyn DocumentStore, row: &ChannelListRow) -> String {
    let (document, provider) = match row.channel.channel_type {
        ChannelType::Club => (row.club_logo.as_ref(), None),
        ChannelType::Coach => (row.coach_profile_image.as_ref(), row.coach_image.as_deref()),
        ChannelType::Group => (row.group_image.as_ref(), None),
        ChannelType::Private => (row.owner_profile_image.as_ref(), row.owner_image.as_deref()),
    };

    let resolved = match (document, provider) {
        (Some(doc), _) => document_url(store, doc, &row.channel.id).await,
        (None, Some(image)) if !image.trim().is_empty() => Some(image.to_string()),
        _ => None,
    };
    resolved.unwrap_or_else(|| FALLBACK_CHANNEL_IMAGE.to_string())
}

/// Channel list entries for `user_id`, in the order of `rows`. Image lookups
/// run one after another.
pub async fn resolve_channel_list(
    store: &dyn DocumentStore,
    user_id: &str,
    rows: Vec<ChannelListRow>,
) -> anyhow::Result<Vec<ChannelListItem>> {
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let image_url = channel_image(store, &row).await;
        let channel = row.channel;
        items.push(ChannelListItem {
            id: convert::parse_id(&channel.id)?,
            owner: channel.owner_id == user_id,
            name: channel.name,
            image_url,
            channel_type: channel.channel_type,
        });
    }
    Ok(items)
}

/// The channel must exist, and callers other than admins must own or belong
/// to it.
pub(crate) async fn ensure_participant(
    state: &AppState,
    claims: &Claims,
    channel_id: Uuid,
    action: &str,
) -> Result<()> {
    let (cid, uid) = (channel_id.to_string(), claims.sub.to_string());
    let admin = claims.role.is_admin();
    let access = run_db(state, move |db| {
        if db.get_channel(&cid)?.is_none() {
            return Ok(None);
        }
        Ok(Some(admin || db.is_channel_participant(&cid, &uid)?))
    })
    .await?;
    match access {
        None => Err(ApiError::NotFound(format!("channel {}", channel_id))),
        Some(true) => Ok(()),
        Some(false) => Err(ApiError::unauthorized(action)),
    }
}

/// GET /messages/channels?userId=...
pub async fn get_channel_list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidQuery(query): ValidQuery<ChannelListQuery>,
) -> Result<Json<Vec<ChannelListItem>>> {
    policy::require_self_or_admin(&claims, query.user_id, "list these channels")?;

    let user_id = query.user_id.to_string();
    let uid = user_id.clone();
    let rows = run_db(&state, move |db| db.list_channels_for_user(&uid)).await?;

    let items = resolve_channel_list(state.documents.as_ref(), &user_id, rows).await?;
    Ok(Json(items))
}

/// Member ids in request order, without duplicates and without the owner.
fn member_ids(users: &[Uuid], owner_id: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(users.len());
    for user in users {
        let id = user.to_string();
        if id != owner_id && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// First id in `ids` with no user row.
fn first_missing_user(db: &Database, ids: &[String]) -> anyhow::Result<Option<String>> {
    for id in ids {
        if db.get_user_by_id(id)?.is_none() {
            return Ok(Some(id.clone()));
        }
    }
    Ok(None)
}

/// A group image must be an existing document of `owner`.
async fn check_group_image(state: &AppState, image_id: Uuid, owner: Uuid) -> Result<()> {
    let did = image_id.to_string();
    let doc = run_db(state, move |db| db.get_document(&did)).await?;
    match doc {
        Some(doc) if doc.user_id == owner.to_string() => Ok(()),
        _ => Err(ApiError::Validation(format!(
            "image {} is not a document of the group owner",
            image_id
        ))),
    }
}

async fn load_group(state: &AppState, id: Uuid) -> Result<Option<(ChannelRow, Vec<(String, String)>)>> {
    let cid = id.to_string();
    run_db(state, move |db| {
        let Some(channel) = db.get_channel(&cid)? else {
            return Ok(None);
        };
        if channel.channel_type != ChannelType::Group {
            return Ok(None);
        }
        let members = db.get_channel_members(&cid)?;
        Ok(Some((channel, members)))
    })
    .await
}

/// POST /messages/groups
pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidJson(req): ValidJson<CreateGroupRequest>,
) -> Result<impl IntoResponse> {
    require_text("name", &req.name)?;
    if let Some(image_id) = req.image_id {
        check_group_image(&state, image_id, claims.sub).await?;
    }

    let owner_id = claims.sub.to_string();
    let members = member_ids(&req.users, &owner_id);
    let group_id = Uuid::new_v4();

    let gid = group_id.to_string();
    let name = req.name.trim().to_string();
    let image = req.image_id.map(|id| id.to_string());
    let missing = run_db(&state, move |db| {
        if let Some(missing) = first_missing_user(db, &members)? {
            return Ok(Some(missing));
        }
        db.create_channel(&gid, &name, ChannelType::Group, &owner_id, image.as_deref(), &members)?;
        Ok(None)
    })
    .await?;
    if let Some(missing) = missing {
        return Err(ApiError::Validation(format!("unknown user {}", missing)));
    }
    info!(%group_id, owner = %claims.sub, "Group created");

    let (channel, members) = load_group(&state, group_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("group {} vanished after insert", group_id))?;
    Ok((StatusCode::CREATED, Json(convert::group_response(channel, members)?)))
}

/// POST /messages/private: reuses the existing channel between the two users.
pub async fn create_private_channel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidJson(req): ValidJson<CreatePrivateChannelRequest>,
) -> Result<Json<ChannelResponse>> {
    if req.user_id == claims.sub {
        return Err(ApiError::Validation("cannot open a private channel with yourself".into()));
    }

    let (me, other) = (claims.sub.to_string(), req.user_id.to_string());
    let channel = run_db(&state, move |db| {
        let Some(peer) = db.get_user_by_id(&other)? else {
            return Ok(None);
        };
        if let Some(existing) = db.find_private_channel(&me, &other)? {
            return Ok(Some(existing));
        }
        let id = Uuid::new_v4().to_string();
        db.create_channel(&id, &peer.name, ChannelType::Private, &me, None, &[other.clone()])?;
        db.get_channel(&id)
    })
    .await?
    .ok_or_else(|| ApiError::Validation(format!("unknown user {}", req.user_id)))?;

    Ok(Json(convert::channel_response(channel)?))
}

/// GET /messages/groups/{id}: `null` when there is no such group.
pub async fn get_group_by_id(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Option<GroupResponse>>> {
    let Some((channel, members)) = load_group(&state, id).await? else {
        return Ok(Json(None));
    };
    ensure_participant(&state, &claims, id, "view this group").await?;
    Ok(Json(Some(convert::group_response(channel, members)?)))
}

/// PATCH /messages/groups/{id}: `"imageId": null` removes the group image.
pub async fn update_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateGroupRequest>,
) -> Result<Json<GroupResponse>> {
    let (channel, _) = load_group(&state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("group {}", id)))?;
    policy::require_owner_or_admin(&claims, &channel.owner_id, "modify this group")?;

    if let Some(name) = &req.name {
        require_text("name", name)?;
    }
    if let Some(Some(image_id)) = req.image_id {
        let owner = convert::parse_id(&channel.owner_id)?;
        check_group_image(&state, image_id, owner).await?;
    }

    let members = req.users.as_deref().map(|users| member_ids(users, &channel.owner_id));
    let gid = id.to_string();
    let name = req.name.map(|n| n.trim().to_string());
    let image = req.image_id.map(|i| i.map(|i| i.to_string()));
    let missing = run_db(&state, move |db| {
        if let Some(members) = &members {
            if let Some(missing) = first_missing_user(db, members)? {
                return Ok(Some(missing));
            }
        }
        db.update_group(
            &gid,
            name.as_deref(),
            image.as_ref().map(Option::as_deref),
            members.as_deref(),
        )?;
        Ok(None)
    })
    .await?;
    if let Some(missing) = missing {
        return Err(ApiError::Validation(format!("unknown user {}", missing)));
    }

    let (channel, members) = load_group(&state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("group {}", id)))?;
    Ok(Json(convert::group_response(channel, members)?))
}

/// DELETE /messages/groups/{id}: removes the channel and its group image.
/// Ownership is checked before anything is deleted.
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Value>> {
    let (channel, _) = load_group(&state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("group {}", id)))?;
    policy::require_owner_or_admin(&claims, &channel.owner_id, "delete this group")?;

    let gid = id.to_string();
    let image = run_db(&state, move |db| db.delete_group(&gid))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("group {}", id)))?;

    let image_deleted = match &image {
        Some(doc) => match state.documents.delete(&doc.user_id, &doc.id).await {
            Ok(()) => true,
            Err(e) => {
                error!(group_id = %id, document_id = %doc.id, error = %e, "Failed to delete group image bytes");
                false
            }
        },
        None => false,
    };
    info!(group_id = %id, by = %claims.sub, image_deleted, "Group deleted");

    Ok(Json(json!({ "deleted": true, "imageDeleted": image_deleted })))
}
