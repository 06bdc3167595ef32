//! Login, logout, registration and the session check.

use amitybot_common::Role;
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::session::UserSession;
use crate::state::SharedState;
use crate::users::UserError;

/// `username` / `password`, sent as multipart or urlencoded form data.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl<S: Send + Sync> FromRequest<S> for Credentials {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(creds) = Form::<Credentials>::from_request(req, state)
                .await
                .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;
            return Ok(creds);
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;
        let (mut username, mut password) = (None, None);
        while let Some(field) = multipart.next_field().await? {
            match field.name() {
                Some("username") => username = Some(field.text().await?),
                Some("password") => password = Some(field.text().await?),
                _ => {}
            }
        }
        match (username, password) {
            (Some(username), Some(password)) => Ok(Self { username, password }),
            _ => Err(ApiError::BadRequest("username and password are required".to_string())),
        }
    }
}

/// GET /check-session
pub async fn check_session(State(state): State<SharedState>, jar: CookieJar) -> Json<Value> {
    let role: Role = state.sessions.role(&jar).await;
    Json(json!({ "role": role }))
}

/// POST /login
pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    creds: Credentials,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let role = state
        .users
        .verify(&creds.username, &creds.password)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let jar = start_session(&state, jar, creds.username, role).await;
    Ok((jar, Json(json!({ "message": "Login successful", "role": role }))))
}

/// POST /logout
pub async fn logout(State(state): State<SharedState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    if let Some(token) = state.sessions.token(&jar).map(str::to_string) {
        state.sessions.remove(&token).await;
    }
    let jar = jar.remove(state.sessions.removal_cookie());
    (jar, Json(json!({ "message": "Logged out" })))
}

/// POST /register. Creates a `logged_in` user and logs it in.
pub async fn register(
    State(state): State<SharedState>,
    jar: CookieJar,
    creds: Credentials,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    if !state.config.auth.allow_registration {
        return Err(ApiError::BadRequest("Registration is disabled".to_string()));
    }
    let role = state
        .users
        .register(&creds.username, &creds.password)
        .await
        .map_err(|e| match e {
            UserError::AlreadyExists | UserError::MissingCredentials => {
                ApiError::BadRequest(e.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        })?;

    let jar = start_session(&state, jar, creds.username, role).await;
    Ok((jar, Json(json!({ "message": "User registered", "role": role }))))
}

/// Replace any existing session with a fresh one for `username`.
async fn start_session(state: &SharedState, jar: CookieJar, username: String, role: Role) -> CookieJar {
    if let Some(old) = state.sessions.token(&jar).map(str::to_string) {
        state.sessions.remove(&old).await;
    }
    info!(username = %username, role = %role, "Session started");
    let token = state.sessions.create(UserSession { username, role }).await;
    jar.add(state.sessions.session_cookie(token))
}
