//! Process-lifetime session state: colour theme and the signed-in identity.
//!
//! Authentication itself lives outside this crate; whoever owns it calls
//! [`Session::sign_in`] / [`Session::sign_out`] and the sync layer reads the
//! identity to build per-user cache keys.

use std::sync::Arc;

use async_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::SyncError;
use crate::network::DEFAULT_PLATFORM;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(SyncError::Config(format!("unknown theme: {}", other))),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the signed-in user, as supplied by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub email: String,
    pub user_type: String,
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_platform() -> String {
    DEFAULT_PLATFORM.to_string()
}

impl UserIdentity {
    pub fn new(email: impl Into<String>, user_type: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            user_type: user_type.into(),
            platform: default_platform(),
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }
}

#[derive(Debug, Default)]
struct SessionState {
    theme: Theme,
    identity: Option<UserIdentity>,
}

/// Shared session handle. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
}

impl Session {
    /// Start a session with the persisted theme preference, falling back to
    /// `system_default` when nothing (or something unreadable) was persisted.
    pub fn init(persisted: Option<&str>, system_default: Theme) -> Self {
        let theme = match persisted.map(Theme::from_str) {
            Some(Ok(theme)) => theme,
            Some(Err(e)) => {
                tracing::warn!("Ignoring persisted theme: {}", e);
                system_default
            }
            None => system_default,
        };
        Self {
            state: Arc::new(RwLock::new(SessionState {
                theme,
                identity: None,
            })),
        }
    }

    pub async fn theme(&self) -> Theme {
        self.state.read().await.theme
    }

    pub async fn set_theme(&self, theme: Theme) {
        self.state.write().await.theme = theme;
    }

    pub async fn toggle_theme(&self) -> Theme {
        let mut state = self.state.write().await;
        state.theme = state.theme.toggled();
        state.theme
    }

    pub async fn identity(&self) -> Option<UserIdentity> {
        self.state.read().await.identity.clone()
    }

    /// The signed-in identity, or [`SyncError::NotSignedIn`].
    pub async fn require_identity(&self) -> Result<UserIdentity, SyncError> {
        self.identity().await.ok_or(SyncError::NotSignedIn)
    }

    pub async fn is_signed_in(&self) -> bool {
        self.state.read().await.identity.is_some()
    }

    pub async fn sign_in(&self, identity: UserIdentity) {
        tracing::info!(email = %identity.email, user_type = %identity.user_type, "Signed in");
        self.state.write().await.identity = Some(identity);
    }

    /// Forget the identity. Returns the previous one, if any.
    pub async fn sign_out(&self) -> Option<UserIdentity> {
        let previous = self.state.write().await.identity.take();
        if let Some(identity) = &previous {
            tracing::info!(email = %identity.email, "Signed out");
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_prefers_persisted_theme() {
        let session = Session::init(Some("Dark"), Theme::Light);
        assert_eq!(tokio_test::block_on(session.theme()), Theme::Dark);

        let session = Session::init(Some("sepia"), Theme::Dark);
        assert_eq!(tokio_test::block_on(session.theme()), Theme::Dark);

        let session = Session::init(None, Theme::Light);
        assert_eq!(tokio_test::block_on(session.theme()), Theme::Light);
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let session = Session::init(None, Theme::Light);
        assert!(matches!(
            session.require_identity().await,
            Err(SyncError::NotSignedIn)
        ));

        session
            .sign_in(UserIdentity::new("trader@example.com", "client"))
            .await;
        let identity = session.require_identity().await.unwrap();
        assert_eq!(identity.platform, "web");

        assert_eq!(session.toggle_theme().await, Theme::Dark);
        assert_eq!(session.sign_out().await, Some(identity));
        assert!(!session.is_signed_in().await);
        assert_eq!(session.theme().await, Theme::Dark);
    }

    #[test]
    fn test_identity_deserializes_without_platform() {
        let identity: UserIdentity =
            serde_json::from_str(r#"{"email":"a@b.c","user_type":"admin"}"#).unwrap();
        assert_eq!(identity.platform, DEFAULT_PLATFORM);
    }
}
