//! Admin credential check and session tokens.
//!
//! The password lives in server-side configuration only. A successful login
//! yields an opaque token that expires after the configured TTL. When no
//! password is configured the admin surface is open.
use crate::core::cache::Cache;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct AdminAuth {
    password: Option<String>,
    session_ttl: Duration,
    sessions: Cache<String, ()>,
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl AdminAuth {
    pub fn new(password: Option<String>, session_ttl_secs: u64) -> Self {
        Self {
            password: password.filter(|p| !p.is_empty()),
            session_ttl: Duration::from_secs(session_ttl_secs),
            sessions: Cache::new(),
        }
    }

    /// Whether a credential is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        match &self.password {
            Some(password) => constant_time_eq(password.as_bytes(), candidate.as_bytes()),
            None => true,
        }
    }

    /// Issues a session token if `candidate` is the admin password. No token
    /// is issued while auth is disabled.
    pub async fn login(&self, candidate: &str) -> Option<String> {
        if !self.is_enabled() || !self.verify_password(candidate) {
            return None;
        }
        let token = Uuid::new_v4().to_string();
        self.sessions
            .put(token.clone(), (), Some(self.session_ttl))
            .await;
        info!("Issued admin session");
        Some(token)
    }

    /// True for a live session token, or for anyone when auth is disabled.
    pub async fn authorize(&self, token: Option<&str>) -> bool {
        if !self.is_enabled() {
            return true;
        }
        match token {
            Some(token) => self.sessions.get(&token.to_string()).await.is_some(),
            None => {
                debug!("Missing admin token");
                false
            }
        }
    }

    pub async fn logout(&self, token: &str) {
        self.sessions.remove(&token.to_string()).await;
    }
}
