//! Account signup and credential checks.
//!
//! Session bookkeeping lives in [`session`]; the HTTP side (cookies,
//! extractors) is in `server`.

pub mod password;
pub mod session;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::UserInfo;
use crate::users::{self, CreateUserRequest};
use crate::validate;

pub use session::{SessionStore, SESSION_COOKIE};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl LoginResponse {
    pub fn for_user(user: UserInfo, message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            id: user.id,
            email: user.email,
            name: user.name,
            phone: Some(user.phone),
        }
    }
}

/// Register a new account.
pub fn signup(conn: &Connection, req: &SignupRequest) -> AppResult<SignupResponse> {
    validate::mobile_phone(&req.phone)?;
    if req.password != req.confirm_password {
        return Err(AppError::bad_request(
            "Password and password confirmation do not match",
        ));
    }

    let user = users::create_user(
        conn,
        &CreateUserRequest {
            email: req.email.clone(),
            name: req.name.clone(),
            phone: req.phone.clone(),
            password: req.password.clone(),
        },
    )?;
    tracing::info!(user_id = user.id, "user signed up");

    Ok(SignupResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        phone: user.phone,
        created_at: user.created_at,
        message: "Signup completed successfully".to_string(),
    })
}

/// Resolve email + password to a user, or 401.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> AppResult<UserInfo> {
    let invalid = || AppError::unauthorized("Invalid email or password");
    let (user, hash) = users::find_credentials(conn, email)?.ok_or_else(invalid)?;
    if !password::verify_password(password, &hash) {
        return Err(invalid());
    }
    Ok(user)
}
