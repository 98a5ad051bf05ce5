use axum::{http::StatusCode, Json};
use crate::models::ErrorResponse;

const ADMIN_ROLE: &str = "admin";

/// Caller identity extracted from a validated JWT.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub user_id: String,
    pub group_id: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.user_id.clone())
    }
}

pub fn is_admin(identity: &Identity) -> bool {
    identity.roles.iter().any(|r| r == ADMIN_ROLE)
}

pub fn is_group_member(identity: &Identity, group_id: &str) -> bool {
    identity.group_id.as_deref() == Some(group_id)
}

fn forbidden(error: &str) -> (StatusCode, Json<ErrorResponse>) {
    let status = StatusCode::FORBIDDEN;
    (status, Json(ErrorResponse::new(status, error)))
}

pub fn ensure_group_member(identity: &Identity, group_id: &str) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if is_group_member(identity, group_id) || is_admin(identity) {
        return Ok(());
    }
    Err(forbidden("User is not a member of the group"))
}

pub fn ensure_admin(identity: &Identity) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if is_admin(identity) {
        return Ok(());
    }
    Err(forbidden("Admin access required"))
}
