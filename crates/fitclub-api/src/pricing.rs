use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use fitclub_types::api::{
    CreatePricingRequest, DeletedResponse, PricingResponse, UpdatePricingRequest,
};
use fitclub_types::models::Role;

use crate::error::{ApiError, Result};
use crate::extract::{ValidJson, ValidPath, require_text};
use crate::{AppState, convert, run_db};

fn check_amount(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ApiError::Validation(format!(
            "{field} must be a non-negative amount"
        ))),
        _ => Ok(()),
    }
}

fn check_options(options: &[String]) -> Result<()> {
    options.iter().try_for_each(|name| require_text("option name", name))
}

async fn load(state: &AppState, id: Uuid) -> Result<Option<PricingResponse>> {
    let pid = id.to_string();
    let detail = run_db(state, move |db| db.get_pricing(&pid)).await?;
    Ok(detail.map(convert::pricing_response).transpose()?)
}

async fn load_existing(state: &AppState, id: Uuid) -> Result<PricingResponse> {
    load(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("pricing {}", id)))
}

/// GET /pricings/{id}: public, `null` when missing.
pub async fn get_pricing_by_id(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Option<PricingResponse>>> {
    Ok(Json(load(&state, id).await?))
}

/// GET /pricings/role/{role}: public, deleted pricings hidden.
pub async fn get_pricing_for_role(
    State(state): State<AppState>,
    ValidPath(role): ValidPath<Role>,
) -> Result<Json<Vec<PricingResponse>>> {
    let rows = run_db(&state, move |db| db.list_pricing_for_role(role)).await?;
    let list = rows
        .into_iter()
        .map(convert::pricing_response)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(list))
}

/// GET /pricings: admin, deleted pricings included.
pub async fn get_all_pricing(State(state): State<AppState>) -> Result<Json<Vec<PricingResponse>>> {
    let rows = run_db(&state, |db| db.list_all_pricing()).await?;
    let list = rows
        .into_iter()
        .map(convert::pricing_response)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(list))
}

/// POST /pricings
pub async fn create_pricing(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<CreatePricingRequest>,
) -> Result<impl IntoResponse> {
    require_text("title", &req.base.title)?;
    check_amount("monthly", Some(req.base.monthly))?;
    check_amount("yearly", Some(req.base.yearly))?;
    check_options(&req.options)?;

    let id = Uuid::new_v4();
    let pid = id.to_string();
    run_db(&state, move |db| {
        db.create_pricing(&pid, &req.base, &req.options, &req.features)
    })
    .await?;
    info!(pricing_id = %id, "Pricing created");

    Ok((StatusCode::CREATED, Json(load_existing(&state, id).await?)))
}

/// PUT /pricings: `base.id` selects the pricing; options and features are
/// replaced as given.
pub async fn update_pricing(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<UpdatePricingRequest>,
) -> Result<Json<PricingResponse>> {
    if let Some(title) = &req.base.title {
        require_text("title", title)?;
    }
    check_amount("monthly", req.base.monthly)?;
    check_amount("yearly", req.base.yearly)?;
    check_options(&req.options)?;

    let id = req.base.id;
    let updated = run_db(&state, move |db| {
        db.update_pricing(&req.base, &req.options, &req.features)
    })
    .await?;
    if !updated {
        return Err(ApiError::NotFound(format!("pricing {}", id)));
    }
    info!(pricing_id = %id, "Pricing updated");

    Ok(Json(load_existing(&state, id).await?))
}

async fn set_deleted(state: &AppState, id: Uuid, deleted: bool) -> Result<PricingResponse> {
    let pid = id.to_string();
    let deletion_date = deleted.then(fitclub_db::now);
    let found = run_db(state, move |db| {
        db.set_pricing_deleted(&pid, deletion_date.as_deref())
    })
    .await?;
    if !found {
        return Err(ApiError::NotFound(format!("pricing {}", id)));
    }
    info!(pricing_id = %id, deleted, "Pricing deletion flag changed");
    load_existing(state, id).await
}

/// DELETE /pricings/{id}: soft delete.
pub async fn delete_pricing(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<PricingResponse>> {
    Ok(Json(set_deleted(&state, id, true).await?))
}

/// POST /pricings/{id}/undelete
pub async fn undelete_pricing(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<PricingResponse>> {
    Ok(Json(set_deleted(&state, id, false).await?))
}

/// DELETE /pricings/options/{name}: removes the option from every pricing.
pub async fn delete_pricing_option(
    State(state): State<AppState>,
    ValidPath(name): ValidPath<String>,
) -> Result<Json<DeletedResponse>> {
    require_text("option name", &name)?;
    let count = run_db(&state, move |db| db.delete_pricing_options_by_name(&name)).await?;
    Ok(Json(DeletedResponse { count }))
}
