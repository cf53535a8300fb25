//! Session - who is signed in, and the login redirect dance
//!
//! The root initializer resolves the session once per start and hands the
//! resulting `SessionContext` down read-only. Descendants change it only via
//! `login` (persist return path, go to the backend login flow) and `logout`.

use helpdesk_common::{ApiError, Identity};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::api_client::ApiClient;

const STATE_FILE: &str = "client_state.json";

/// Where the client should go next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// In-app route path, e.g. `/agent/workspace`
    Route(String),
    /// Page outside the client, e.g. the backend login flow
    External(String),
}

/// Persisted client state: a single pending post-login redirect
#[derive(Debug, Default, Serialize, Deserialize)]
struct ClientState {
    #[serde(
        rename = "redirectUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    redirect_url: Option<String>,
}

/// File-backed store for the pending redirect
#[derive(Debug, Clone)]
pub struct ClientStateStore {
    path: PathBuf,
}

impl ClientStateStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(STATE_FILE),
        }
    }

    pub fn set_redirect(&self, target: &str) -> io::Result<()> {
        let mut state = self.load();
        state.redirect_url = Some(target.to_string());
        self.save(&state)
    }

    pub fn peek_redirect(&self) -> Option<String> {
        self.load().redirect_url
    }

    /// Read and clear the pending redirect
    pub fn take_redirect(&self) -> io::Result<Option<String>> {
        let mut state = self.load();
        let target = state.redirect_url.take();
        if target.is_some() {
            self.save(&state)?;
        }
        Ok(target)
    }

    pub fn clear_redirect(&self) -> io::Result<()> {
        self.take_redirect().map(|_| ())
    }

    /// Missing or corrupt state reads as empty
    fn load(&self) -> ClientState {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    fn save(&self, state: &ClientState) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // Write-then-rename so a crash never leaves half a file
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)
    }
}

/// How the identity check ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    SignedIn,
    /// Backend answered 401/403
    Anonymous,
    /// Identity check failed for another reason; treated as anonymous
    Unavailable,
}

/// Read-only session handed down from the root initializer
#[derive(Debug, Clone)]
pub struct SessionContext {
    identity: Option<Identity>,
    login_url: String,
    store: ClientStateStore,
}

impl SessionContext {
    pub fn new(identity: Option<Identity>, login_url: String, store: ClientStateStore) -> Self {
        Self {
            identity,
            login_url,
            store,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Remember `return_to` and send the user to the backend login flow
    pub fn login(&self, return_to: &str) -> Navigation {
        if let Err(e) = self.store.set_redirect(return_to) {
            tracing::warn!("Could not persist post-login redirect: {}", e);
        }
        tracing::info!("Login required, returning to {} afterwards", return_to);
        Navigation::External(self.login_url.clone())
    }

    /// Forget the identity and any pending redirect
    pub fn logout(&mut self) {
        self.identity = None;
        if let Err(e) = self.store.clear_redirect() {
            tracing::warn!("Could not clear post-login redirect: {}", e);
        }
    }
}

/// Result of resolving the session at start-up
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub context: SessionContext,
    pub outcome: SessionOutcome,
    /// Pending post-login redirect, consumed on successful sign-in
    pub redirect: Option<Navigation>,
}

/// Issue the single identity check and settle the session
pub async fn resolve(api: &ApiClient, store: ClientStateStore) -> ResolvedSession {
    let result = api.current_identity().await;
    settle(result, api.login_url(), store)
}

/// Turn the identity check result into a session
pub fn settle(
    result: Result<Identity, ApiError>,
    login_url: String,
    store: ClientStateStore,
) -> ResolvedSession {
    match result {
        Ok(identity) => {
            tracing::info!(
                "Signed in as {} ({})",
                identity.display_name(),
                identity.role
            );
            let redirect = match store.take_redirect() {
                Ok(target) => target.map(Navigation::Route),
                Err(e) => {
                    tracing::warn!("Could not consume post-login redirect: {}", e);
                    None
                }
            };
            ResolvedSession {
                context: SessionContext::new(Some(identity), login_url, store),
                outcome: SessionOutcome::SignedIn,
                redirect,
            }
        }
        Err(e) => {
            let outcome = if e.is_unauthorized() {
                SessionOutcome::Anonymous
            } else {
                tracing::debug!("Identity check failed: {}", e);
                SessionOutcome::Unavailable
            };
            ResolvedSession {
                context: SessionContext::new(None, login_url, store),
                outcome,
                redirect: None,
            }
        }
    }
}
