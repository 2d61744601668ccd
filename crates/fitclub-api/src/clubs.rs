use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use fitclub_types::api::{Claims, ClubResponse, CoachResponse, CreateClubRequest};

use crate::error::{ApiError, Result};
use crate::extract::{ValidJson, ValidPath, require_text};
use crate::{AppState, convert, run_db};

async fn load_club(state: &AppState, id: Uuid) -> Result<Option<ClubResponse>> {
    let cid = id.to_string();
    let found = run_db(state, move |db| {
        let Some(club) = db.get_club(&cid)? else {
            return Ok(None);
        };
        let channel_id = db
            .get_club_channel_id(&cid)?
            .ok_or_else(|| anyhow::anyhow!("club {} has no channel", cid))?;
        Ok(Some((club, channel_id)))
    })
    .await?;

    match found {
        Some((club, channel_id)) => Ok(Some(convert::club_response(club, &channel_id)?)),
        None => Ok(None),
    }
}

/// POST /clubs: the caller manages the club and owns its channel.
pub async fn create_club(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidJson(req): ValidJson<CreateClubRequest>,
) -> Result<impl IntoResponse> {
    require_text("name", &req.name)?;

    let manager_id = claims.sub.to_string();
    if let Some(logo_id) = req.logo_id {
        let did = logo_id.to_string();
        let doc = run_db(&state, move |db| db.get_document(&did)).await?;
        if !doc.is_some_and(|d| d.user_id == manager_id) {
            return Err(ApiError::Validation(format!(
                "logo {} is not a document of the manager",
                logo_id
            )));
        }
    }

    let club_id = Uuid::new_v4();
    let (cid, chid, mid) = (
        club_id.to_string(),
        Uuid::new_v4().to_string(),
        claims.sub.to_string(),
    );
    let name = req.name.trim().to_string();
    let logo = req.logo_id.map(|l| l.to_string());
    run_db(&state, move |db| {
        db.create_club(&cid, &name, &mid, logo.as_deref(), &chid)
    })
    .await?;
    info!(%club_id, manager = %claims.sub, "Club created");

    let club = load_club(&state, club_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("club {} vanished after insert", club_id))?;
    Ok((StatusCode::CREATED, Json(club)))
}

/// GET /clubs/{id}: `null` when missing.
pub async fn get_club_by_id(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Option<ClubResponse>>> {
    Ok(Json(load_club(&state, id).await?))
}

/// POST /coachs: the caller's coach profile and its channel. Calling it
/// again returns the existing profile.
pub async fn create_coach(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CoachResponse>> {
    let uid = claims.sub.to_string();
    let name = claims.name.clone();

    let (coach, channel_id) = run_db(&state, move |db| {
        if db.get_coach_by_user(&uid)?.is_none() {
            let (coach_id, channel_id) = (Uuid::new_v4().to_string(), Uuid::new_v4().to_string());
            db.create_coach(&coach_id, &uid, &channel_id, &name)?;
        }
        let coach = db
            .get_coach_by_user(&uid)?
            .ok_or_else(|| anyhow::anyhow!("coach profile of {} vanished", uid))?;
        let channel_id = db
            .get_coach_channel_id(&coach.id)?
            .ok_or_else(|| anyhow::anyhow!("coach {} has no channel", coach.id))?;
        Ok((coach, channel_id))
    })
    .await?;

    Ok(Json(CoachResponse {
        id: convert::parse_id(&coach.id)?,
        user_id: convert::parse_id(&coach.user_id)?,
        channel_id: convert::parse_id(&channel_id)?,
    }))
}
