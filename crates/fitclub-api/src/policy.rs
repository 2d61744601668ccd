//! Authorization policy.
//!
//! Role requirements are declared per route with [`Requirement`] constants
//! and enforced by [`enforce`] before the handler runs. Checks that depend on
//! the addressed row (owner, self, notification party) use the helpers at the
//! bottom of this module from inside the handler.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use fitclub_types::api::Claims;
use fitclub_types::models::Role;
use uuid::Uuid;

use crate::error::ApiError;

/// Roles allowed to call one operation, and the action named in the denial.
#[derive(Debug, Clone, Copy)]
pub struct Requirement {
    roles: &'static [Role],
    action: &'static str,
}

impl Requirement {
    pub const fn admin(action: &'static str) -> Self {
        Self {
            roles: &[Role::Admin],
            action,
        }
    }

    pub const fn roles(roles: &'static [Role], action: &'static str) -> Self {
        Self { roles, action }
    }

    pub fn check(&self, claims: &Claims) -> Result<(), ApiError> {
        if self.roles.contains(&claims.role) {
            Ok(())
        } else {
            Err(ApiError::unauthorized(self.action))
        }
    }
}

// -- Pricing --
pub const GET_ALL_PRICING: Requirement = Requirement::admin("query pricing");
pub const CREATE_PRICING: Requirement = Requirement::admin("create a pricing");
pub const UPDATE_PRICING: Requirement = Requirement::admin("modify a pricing");
pub const DELETE_PRICING: Requirement = Requirement::admin("delete a pricing");
pub const UNDELETE_PRICING: Requirement = Requirement::admin("undelete a pricing");
pub const DELETE_PRICING_OPTION: Requirement = Requirement::admin("delete a pricing option");

// -- Users --
pub const UPDATE_USER_ROLE: Requirement = Requirement::admin("change a user role");

// -- Clubs & coaches --
pub const CREATE_CLUB: Requirement = Requirement::roles(
    &[Role::Manager, Role::ManagerCoach, Role::Admin],
    "create a club",
);
pub const CREATE_COACH: Requirement = Requirement::roles(
    &[Role::Coach, Role::ManagerCoach, Role::Admin],
    "create a coach profile",
);

/// Route middleware: runs after `require_auth` and rejects callers whose
/// role is not in the requirement.
pub async fn enforce(
    State(requirement): State<Requirement>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
    requirement.check(claims)?;
    Ok(next.run(req).await)
}

// -- Row-relative checks --

pub fn require_self_or_admin(claims: &Claims, user_id: Uuid, action: &str) -> Result<(), ApiError> {
    if claims.sub == user_id || claims.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::unauthorized(action))
    }
}

/// `owner_id` comes from a DB row, hence the string comparison.
pub fn require_owner_or_admin(claims: &Claims, owner_id: &str, action: &str) -> Result<(), ApiError> {
    if is_user(claims, owner_id) || claims.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::unauthorized(action))
    }
}

pub fn is_user(claims: &Claims, user_id: &str) -> bool {
    claims.sub.to_string() == user_id
}
