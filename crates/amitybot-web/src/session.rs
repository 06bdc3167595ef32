//! Cookie sessions.
//!
//! The cookie only carries a random token; everything else lives in the
//! server-side map and expires after the configured TTL.

use std::collections::HashMap;

use amitybot_common::Role;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::SharedState;

const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSession {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user: Option<UserSession>,
    /// Chat session reused when a request carries no `session_id`.
    pub chat_session_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn role(&self) -> Role {
        self.user.as_ref().map(|u| u.role).unwrap_or_default()
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
    ttl: Duration,
    cookie_name: String,
}

impl SessionStore {
    pub fn new(cookie_name: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Start a session for `user` and return its token.
    pub async fn create(&self, user: UserSession) -> String {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let data = SessionData {
            user: Some(user),
            chat_session_id: None,
            expires_at: Utc::now() + self.ttl,
        };
        let mut sessions = self.sessions.write().await;
        Self::sweep(&mut sessions);
        sessions.insert(token.clone(), data);
        token
    }

    /// Drop every expired session and return how many went.
    pub async fn purge_expired(&self) -> usize {
        Self::sweep(&mut *self.sessions.write().await)
    }

    fn sweep(sessions: &mut HashMap<String, SessionData>) -> usize {
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, d| d.expires_at > now);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Purged expired sessions");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Live session for `token`; an expired one is purged and treated as absent.
    pub async fn get(&self, token: &str) -> Option<SessionData> {
        let data = self.sessions.read().await.get(token).cloned()?;
        if data.expires_at > Utc::now() {
            return Some(data);
        }
        debug!("Session expired");
        self.sessions.write().await.remove(token);
        None
    }

    pub async fn remove(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn set_chat_session(&self, token: &str, chat_session_id: &str) {
        if let Some(data) = self.sessions.write().await.get_mut(token) {
            data.chat_session_id = Some(chat_session_id.to_string());
        }
    }

    /// Token from the request cookie, if any.
    pub fn token<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(&self.cookie_name).map(|c| c.value())
    }

    /// Session attached to the request cookie.
    pub async fn from_jar(&self, jar: &CookieJar) -> Option<(String, SessionData)> {
        let token = self.token(jar)?.to_string();
        let data = self.get(&token).await?;
        Some((token, data))
    }

    /// `general` unless the cookie belongs to a live session.
    pub async fn role(&self, jar: &CookieJar) -> Role {
        self.from_jar(jar).await.map(|(_, d)| d.role()).unwrap_or_default()
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), "")).path("/").build()
    }
}

/// Extractor for endpoints that need a `logged_in` session.
///
/// Rejects with 401 `Not authenticated` unless `server.require_admin_session`
/// is turned off.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub user: Option<UserSession>,
}

impl FromRequestParts<SharedState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let user = state.sessions.from_jar(&jar).await.and_then(|(_, d)| d.user);

        if !state.config.server.require_admin_session {
            return Ok(Self { user });
        }
        match user {
            Some(u) if u.role.is_privileged() => Ok(Self { user: Some(u) }),
            _ => Err(ApiError::Unauthorized("Not authenticated".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> UserSession {
        UserSession { username: "admin".into(), role: Role::LoggedIn }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new("amitybot_session", 60);
        let token = store.create(admin()).await;
        assert_eq!(token.len(), 64);
        let data = store.get(&token).await.unwrap();
        assert_eq!(data.role(), Role::LoggedIn);
        assert!(store.get("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_purged() {
        let store = SessionStore::new("amitybot_session", 0);
        let token = store.create(admin()).await;
        assert!(store.get(&token).await.is_none());
        assert!(!store.remove(&token).await);
    }

    #[tokio::test]
    async fn test_abandoned_sessions_are_swept() {
        let store = SessionStore::new("amitybot_session", 0);
        for _ in 0..10 {
            store.create(admin()).await;
        }
        // each login sweeps the expired ones before it
        assert_eq!(store.len().await, 1);
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_role_from_cookie_jar() {
        let store = SessionStore::new("amitybot_session", 60);
        let token = store.create(admin()).await;

        let jar = CookieJar::new().add(store.session_cookie(token.clone()));
        assert_eq!(store.role(&jar).await, Role::LoggedIn);
        assert_eq!(store.role(&CookieJar::new()).await, Role::General);

        store.remove(&token).await;
        assert_eq!(store.role(&jar).await, Role::General);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let store = SessionStore::new("amitybot_session", 60);
        let cookie = store.session_cookie("abc".into());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
