use std::{collections::HashMap, path::PathBuf};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::types::{Credential, PendingLogin};

/// User credentials keyed by session id.
///
/// Always held in memory; with a persist directory every write is also saved
/// to `<dir>/<session>.json` and misses are looked up there.
pub struct CredentialStore {
    sessions: RwLock<HashMap<String, Credential>>,
    persist_dir: Option<PathBuf>,
}

impl CredentialStore {
    pub fn in_memory() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            persist_dir: None,
        }
    }

    pub fn persistent(dir: PathBuf) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            persist_dir: Some(dir),
        }
    }

    pub async fn get(&self, session: &str) -> Option<Credential> {
        if !is_valid_session_id(session) {
            return None;
        }
        if let Some(credential) = self.sessions.read().await.get(session) {
            return Some(credential.clone());
        }

        let credential = self.load(session).await.ok()?;
        self.sessions
            .write()
            .await
            .insert(session.to_string(), credential.clone());
        Some(credential)
    }

    pub async fn store(&self, session: &str, credential: Credential) {
        if !is_valid_session_id(session) {
            return;
        }
        if let Err(e) = self.persist(session, &credential).await {
            tracing::warn!(error = %e, "failed to persist session credential");
        }
        self.sessions
            .write()
            .await
            .insert(session.to_string(), credential);
    }

    pub async fn remove(&self, session: &str) {
        self.sessions.write().await.remove(session);
        if let Some(path) = self.session_path(session) {
            let _ = async_fs::remove_file(path).await;
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn load(&self, session: &str) -> Result<Credential, String> {
        let path = self
            .session_path(session)
            .ok_or_else(|| "session persistence disabled".to_string())?;
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }

    async fn persist(&self, session: &str, credential: &Credential) -> Result<(), String> {
        let Some(path) = self.session_path(session) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(credential).map_err(|e| e.to_string())?;
        async_fs::write(&path, json)
            .await
            .map_err(|e| e.to_string())
    }

    fn session_path(&self, session: &str) -> Option<PathBuf> {
        let dir = self.persist_dir.as_ref()?;
        is_valid_session_id(session).then(|| dir.join(format!("{session}.json")))
    }
}

fn is_valid_session_id(session: &str) -> bool {
    !session.is_empty() && session.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Logins between `/login` and `/callback`, keyed by OAuth `state`.
pub struct PendingLogins {
    pending: Mutex<HashMap<String, PendingLogin>>,
    ttl: Duration,
}

impl Default for PendingLogins {
    fn default() -> Self {
        Self::new(Duration::minutes(10))
    }
}

impl PendingLogins {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn insert(&self, state: String, code_verifier: String, now: DateTime<Utc>) {
        let mut pending = self.pending.lock().await;
        pending.retain(|_, login| now - login.created_at <= self.ttl);
        pending.insert(
            state,
            PendingLogin {
                code_verifier,
                created_at: now,
            },
        );
    }

    /// Removes and returns the login for `state` unless it has expired.
    pub async fn take(&self, state: &str, now: DateTime<Utc>) -> Option<PendingLogin> {
        let login = self.pending.lock().await.remove(state)?;
        (now - login.created_at <= self.ttl).then_some(login)
    }
}
