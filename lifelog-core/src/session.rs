//! Active-session collaborator
//!
//! There is no credential check: any sign-in or sign-up succeeds after an
//! artificial delay and synthesizes a user. The user is persisted under its
//! own key so it survives a restart. Entries only ever see `User::id`, as the
//! opaque owner id.

use std::sync::LazyLock;
use std::time::Duration;

use parking_lot::RwLock;
use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::error::Result;
use crate::storage::Persistence;
use crate::types::{UNKNOWN_OWNER, User};

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[._]").expect("valid regex"));
static WORD_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w").expect("valid regex"));

/// Holds the signed-in user, if any
pub struct SessionManager {
    persistence: Box<dyn Persistence>,
    user: RwLock<Option<User>>,
    delay: Duration,
}

impl SessionManager {
    /// Restore the stored session, if one exists
    pub fn open(persistence: impl Persistence + 'static, delay: Duration) -> Result<Self> {
        let user = match persistence.load()? {
            Some(bytes) => {
                let user: User = serde_json::from_slice(&bytes)?;
                info!("Restored session for {}", user.email);
                Some(user)
            }
            None => None,
        };

        Ok(Self {
            persistence: Box::new(persistence),
            user: RwLock::new(user),
            delay,
        })
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }

    /// Owner id for new entries: the user's id, or `"unknown"` when signed out
    pub fn owner_id(&self) -> String {
        self.user
            .read()
            .as_ref()
            .map(|u| u.id.clone())
            .unwrap_or_else(|| UNKNOWN_OWNER.to_string())
    }

    /// Sign in with any credentials; the name is derived from the email
    pub async fn sign_in(&self, email: &str, _password: &str) -> Result<User> {
        tokio::time::sleep(self.delay).await;

        let user = User::new(display_name_from_email(email), email.to_string());
        self.set_user(user)
    }

    /// Register with any credentials
    pub async fn sign_up(&self, name: &str, email: &str, _password: &str) -> Result<User> {
        tokio::time::sleep(self.delay).await;

        let user = User::new(name.to_string(), email.to_string());
        self.set_user(user)
    }

    /// Forget the active user and its stored record
    pub fn sign_out(&self) -> Result<()> {
        self.persistence.clear()?;
        if let Some(user) = self.user.write().take() {
            info!("Signed out {}", user.email);
        }
        Ok(())
    }

    fn set_user(&self, user: User) -> Result<User> {
        let bytes = serde_json::to_vec(&user)?;
        self.persistence.save(&bytes)?;
        *self.user.write() = Some(user.clone());
        debug!("Session started for {}", user.email);
        Ok(user)
    }
}

/// `jane.doe_smith@example.com` → `Jane Doe Smith`
pub fn display_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let spaced = SEPARATORS.replace_all(local, " ");
    WORD_START
        .replace_all(&spaced, |caps: &Captures| caps[0].to_uppercase())
        .into_owned()
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("user", &*self.user.read())
            .field("delay", &self.delay)
            .finish()
    }
}
