use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use fitclub_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use fitclub_types::models::Role;

use crate::error::{ApiError, Result};
use crate::extract::ValidJson;
use crate::{AppState, run_db};

pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() || name.chars().count() > 64 {
        return Err(ApiError::Validation("name must be 1 to 64 characters".into()));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("email is invalid".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation("password must be at least 8 characters".into()));
    }

    let role = if state.config.admin_emails.iter().any(|e| e.eq_ignore_ascii_case(&email)) {
        Role::Admin
    } else {
        match req.role.unwrap_or(Role::Member) {
            Role::Admin => return Err(ApiError::Validation("role ADMIN cannot be requested".into())),
            role => role,
        }
    };

    let lookup = email.clone();
    if run_db(&state, move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(ApiError::Conflict("email already registered".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();

    let user_id = Uuid::new_v4();
    {
        let (id, name, email) = (user_id.to_string(), name.clone(), email.clone());
        run_db(&state, move |db| db.create_user(&id, &name, &email, &password_hash, role)).await?;
    }
    info!(%user_id, %role, "User registered");

    let token = create_token(&state.config.jwt_secret, state.config.token_days, user_id, &name, role)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id,
            role,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let denied = || ApiError::Unauthorized("Invalid email or password".into());

    let email = req.email.trim().to_lowercase();
    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(denied)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored password hash is invalid: {e}"))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| denied())?;

    let user_id: Uuid = crate::convert::parse_id(&user.id)?;
    let token = create_token(
        &state.config.jwt_secret,
        state.config.token_days,
        user_id,
        &user.name,
        user.role,
    )?;

    Ok(Json(AuthResponse {
        user_id,
        role: user.role,
        token,
    }))
}

pub fn create_token(
    secret: &str,
    days: i64,
    user_id: Uuid,
    name: &str,
    role: Role,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
