use axum::{Extension, Json, extract::State};
use tracing::info;
use uuid::Uuid;

use fitclub_types::api::{
    Claims, SubscribePricingRequest, UpdateRoleRequest, UpdateUserRequest, UserProfile,
};

use crate::error::{ApiError, Result};
use crate::extract::{ValidJson, ValidPath, require_text};
use crate::{AppState, convert, policy, run_db};

async fn load(state: &AppState, id: Uuid) -> Result<Option<UserProfile>> {
    let uid = id.to_string();
    let row = run_db(state, move |db| db.get_user_by_id(&uid)).await?;
    Ok(row.map(convert::user_profile).transpose()?)
}

async fn load_existing(state: &AppState, id: Uuid) -> Result<UserProfile> {
    load(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {}", id)))
}

/// GET /users/{id}: `null` when missing.
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Option<UserProfile>>> {
    Ok(Json(load(&state, id).await?))
}

/// PATCH /users/{id}: an explicit `null` clears `image` or `profileImageId`.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Json<UserProfile>> {
    policy::require_self_or_admin(&claims, id, "modify this user")?;
    if let Some(name) = &req.name {
        require_text("name", name)?;
    }

    if let Some(Some(image_id)) = req.profile_image_id {
        let did = image_id.to_string();
        let doc = run_db(&state, move |db| db.get_document(&did)).await?;
        if !doc.is_some_and(|d| d.user_id == id.to_string()) {
            return Err(ApiError::Validation(format!(
                "profile image {} is not a document of this user",
                image_id
            )));
        }
    }

    let uid = id.to_string();
    let name = req.name.map(|n| n.trim().to_string());
    let image = req.image;
    let profile_image_id = req.profile_image_id.map(|i| i.map(|i| i.to_string()));
    let updated = run_db(&state, move |db| {
        db.update_user_profile(
            &uid,
            name.as_deref(),
            image.as_ref().map(Option::as_deref),
            profile_image_id.as_ref().map(Option::as_deref),
        )
    })
    .await?;
    if !updated {
        return Err(ApiError::NotFound(format!("user {}", id)));
    }

    Ok(Json(load_existing(&state, id).await?))
}

/// PUT /users/{id}/role: admin. Sessions issued before the change keep the
/// old role until they expire.
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateRoleRequest>,
) -> Result<Json<UserProfile>> {
    let uid = id.to_string();
    let role = req.role;
    if !run_db(&state, move |db| db.set_user_role(&uid, role)).await? {
        return Err(ApiError::NotFound(format!("user {}", id)));
    }
    info!(user_id = %id, %role, by = %claims.sub, "User role changed");

    Ok(Json(load_existing(&state, id).await?))
}

/// PUT /users/{id}/pricing: the pricing must be live and meant for the
/// user's role.
pub async fn subscribe_to_pricing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<SubscribePricingRequest>,
) -> Result<Json<UserProfile>> {
    policy::require_self_or_admin(&claims, id, "change this subscription")?;

    let user = load_existing(&state, id).await?;
    let pid = req.pricing_id.to_string();
    let pricing = run_db(&state, move |db| db.get_pricing(&pid))
        .await?
        .map(|detail| detail.pricing);

    match pricing {
        None => {
            return Err(ApiError::Validation(format!("unknown pricing {}", req.pricing_id)));
        }
        Some(p) if p.deleted => {
            return Err(ApiError::Validation(format!("pricing {} is no longer offered", req.pricing_id)));
        }
        Some(p) if p.role_target != user.role => {
            return Err(ApiError::Validation(format!(
                "pricing {} targets {}, not {}",
                req.pricing_id, p.role_target, user.role
            )));
        }
        Some(_) => {}
    }

    let (uid, pid) = (id.to_string(), req.pricing_id.to_string());
    run_db(&state, move |db| db.set_user_pricing(&uid, &pid)).await?;
    info!(user_id = %id, pricing_id = %req.pricing_id, "Subscribed to pricing");

    Ok(Json(load_existing(&state, id).await?))
}
