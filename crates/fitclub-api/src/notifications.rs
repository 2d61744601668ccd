//! Notifications between users, and the request/response exchange.
//!
//! A request (coach contact, coach search, subscription) is answered with a
//! response notification sent back to its sender. The two are linked to each
//! other through `linkedNotification`, and the request records the answer key
//! and the time it was answered.

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use fitclub_db::models::NotificationRow;
use fitclub_db::queries::NewNotification;
use fitclub_types::api::{
    AnswerNotificationRequest, AnswerNotificationResponse, Claims, CreateNotificationRequest,
    GetNotificationQuery, NotificationResponse, UpdateNotificationRequest,
};
use fitclub_types::notifications::{Answer, NotificationPayload};

use crate::error::{ApiError, Result};
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::{AppState, convert, policy, run_db};

/// Message of a refused coach request: the start of the request message.
pub fn refusal_message(request_message: &str) -> String {
    let head: String = request_message.chars().take(15).collect();
    format!(">{}...", head)
}

fn response_message(request: &NotificationPayload, answer: Answer, request_message: &str) -> String {
    match (request, answer) {
        (NotificationPayload::NewRequest(_) | NotificationPayload::SearchCoach, Answer::Reject) => {
            refusal_message(request_message)
        }
        _ => String::new(),
    }
}

fn require_party(claims: &Claims, row: &NotificationRow, action: &str) -> Result<()> {
    if policy::is_user(claims, &row.user_from_id)
        || policy::is_user(claims, &row.user_to_id)
        || claims.role.is_admin()
    {
        Ok(())
    } else {
        Err(ApiError::unauthorized(action))
    }
}

async fn load(state: &AppState, id: Uuid) -> Result<Option<NotificationRow>> {
    let nid = id.to_string();
    run_db(state, move |db| db.get_notification(&nid)).await
}

async fn load_response(state: &AppState, id: Uuid) -> Result<NotificationResponse> {
    let row = load(state, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("notification {} vanished", id))?;
    Ok(convert::notification_response(row)?)
}

/// POST /notifications
pub async fn create_notification_to_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidJson(req): ValidJson<CreateNotificationRequest>,
) -> Result<impl IntoResponse> {
    policy::require_self_or_admin(&claims, req.from, "send a notification for this user")?;

    let id = Uuid::new_v4();
    let (nid, from, to) = (id.to_string(), req.from.to_string(), req.to.to_string());
    let linked = req.linked_notification.map(|l| l.to_string());
    let notification_type = req.payload.type_tag();
    let data = req.payload.data_json().map_err(anyhow::Error::from)?;
    let message = req.message;

    let problem = run_db(&state, move |db| {
        if db.get_user_by_id(&from)?.is_none() {
            return Ok(Some(format!("unknown user {}", from)));
        }
        if db.get_user_by_id(&to)?.is_none() {
            return Ok(Some(format!("unknown user {}", to)));
        }
        if let Some(linked) = &linked {
            if db.get_notification(linked)?.is_none() {
                return Ok(Some(format!("unknown notification {}", linked)));
            }
        }
        db.insert_notification(&NewNotification {
            id: &nid,
            user_from_id: &from,
            user_to_id: &to,
            notification_type,
            data: data.as_deref(),
            message: &message,
            linked_notification: linked.as_deref(),
        })?;
        Ok(None)
    })
    .await?;
    if let Some(problem) = problem {
        return Err(ApiError::Validation(problem));
    }
    info!(notification_id = %id, kind = notification_type, from = %req.from, to = %req.to, "Notification created");

    Ok((StatusCode::CREATED, Json(load_response(&state, id).await?)))
}

/// GET /notifications/{id}?updateViewDate=true: `null` when missing.
pub async fn get_notification_by_id(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(query): ValidQuery<GetNotificationQuery>,
) -> Result<Json<Option<NotificationResponse>>> {
    let Some(row) = load(&state, id).await? else {
        return Ok(Json(None));
    };
    require_party(&claims, &row, "view this notification")?;

    if !query.update_view_date {
        return Ok(Json(Some(convert::notification_response(row)?)));
    }

    let nid = id.to_string();
    run_db(&state, move |db| db.set_notification_view_date(&nid, &fitclub_db::now())).await?;
    Ok(Json(Some(load_response(&state, id).await?)))
}

/// GET /notifications/to/{user_id}: newest first.
pub async fn get_notification_to_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(user_id): ValidPath<Uuid>,
) -> Result<Json<Vec<NotificationResponse>>> {
    policy::require_self_or_admin(&claims, user_id, "read these notifications")?;
    let uid = user_id.to_string();
    let rows = run_db(&state, move |db| db.list_notifications_to(&uid)).await?;
    let list = rows
        .into_iter()
        .map(convert::notification_response)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(list))
}

/// GET /notifications/from/{user_id}: newest first.
pub async fn get_notification_from_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(user_id): ValidPath<Uuid>,
) -> Result<Json<Vec<NotificationResponse>>> {
    policy::require_self_or_admin(&claims, user_id, "read these notifications")?;
    let uid = user_id.to_string();
    let rows = run_db(&state, move |db| db.list_notifications_from(&uid)).await?;
    let list = rows
        .into_iter()
        .map(convert::notification_response)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(list))
}

/// PATCH /notifications/{id}
pub async fn update_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateNotificationRequest>,
) -> Result<Json<NotificationResponse>> {
    let row = load(&state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("notification {}", id)))?;
    require_party(&claims, &row, "modify this notification")?;

    if req.linked_notification == Some(id) {
        return Err(ApiError::Validation("a notification cannot link to itself".into()));
    }

    let nid = id.to_string();
    let answered = req
        .answered
        .map(|at| at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true));
    let answer = req.answer;
    let linked = req.linked_notification.map(|l| l.to_string());
    let linked_missing = run_db(&state, move |db| {
        if let Some(linked) = &linked {
            if db.get_notification(linked)?.is_none() {
                return Ok(true);
            }
        }
        db.update_notification(&nid, answered.as_deref(), answer.as_deref(), linked.as_deref())?;
        Ok(false)
    })
    .await?;
    if linked_missing {
        return Err(ApiError::Validation("linkedNotification does not exist".into()));
    }

    Ok(Json(load_response(&state, id).await?))
}

/// POST /notifications/{id}/answer: send the response and close the request
/// in one transaction.
pub async fn answer_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<AnswerNotificationRequest>,
) -> Result<Json<AnswerNotificationResponse>> {
    let row = load(&state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("notification {}", id)))?;

    let recipient = convert::parse_id(&row.user_to_id)?;
    policy::require_self_or_admin(&claims, recipient, "answer this notification")?;
    if row.answered.is_some() {
        return Err(ApiError::Validation("notification was already answered".into()));
    }

    let request = convert::notification_response(row)?;
    let plan = request.payload.answer_with(req.answer).ok_or_else(|| {
        ApiError::Validation(format!(
            "notifications of type {} cannot be answered",
            request.payload.type_tag()
        ))
    })?;

    let response_id = Uuid::new_v4();
    let message = response_message(&request.payload, req.answer, &request.message);
    let (rid, nid) = (response_id.to_string(), id.to_string());
    // The response travels back from the recipient to the sender
    let (from, to) = (request.user_to_id.to_string(), request.user_from_id.to_string());
    let data = plan.response.data_json().map_err(anyhow::Error::from)?;
    let response_type = plan.response.type_tag();
    let (answer_key, joins) = (plan.answer_key, plan.joins);

    let answered = run_db(&state, move |db| {
        db.answer_notification(
            &nid,
            answer_key,
            &NewNotification {
                id: &rid,
                user_from_id: &from,
                user_to_id: &to,
                notification_type: response_type,
                data: data.as_deref(),
                message: &message,
                linked_notification: Some(&nid),
            },
            joins,
        )
    })
    .await?;
    if !answered {
        return Err(ApiError::Validation("notification was already answered".into()));
    }
    info!(notification_id = %id, %response_id, answer = answer_key, "Notification answered");

    Ok(Json(AnswerNotificationResponse {
        request: load_response(&state, id).await?,
        response: load_response(&state, response_id).await?,
    }))
}
