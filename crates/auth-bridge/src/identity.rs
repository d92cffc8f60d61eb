//! The external identity provider seam.

use crate::AuthResult;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

/// User as known to the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl ExternalIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Device class used to choose the sign-in flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

const MOBILE_MARKERS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
    "mobile",
];

impl DeviceClass {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if MOBILE_MARKERS.iter().any(|marker| ua.contains(marker)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

/// Failure of the inline popup flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PopupError {
    #[error("popup blocked")]
    Blocked,
    #[error("popup closed by user")]
    ClosedByUser,
    #[error("popup request cancelled")]
    Cancelled,
    #[error("popup not supported in this environment")]
    UnsupportedEnvironment,
    #[error("{0}")]
    Other(String),
}

impl PopupError {
    /// Popup failures that switch to the redirect flow instead of surfacing.
    pub fn falls_back_to_redirect(&self) -> bool {
        !matches!(self, PopupError::Other(_))
    }
}

/// External identity provider.
///
/// `subscribe` yields the provider's current identity snapshot and every
/// later change.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Inline popup sign-in.
    async fn sign_in_with_popup(&self) -> Result<ExternalIdentity, PopupError>;

    /// Start the redirect flow. Control leaves the app.
    async fn sign_in_with_redirect(&self) -> AuthResult<()>;

    /// Result of a redirect flow that completed before this page load, if any.
    /// Consumes the result.
    async fn take_redirect_result(&self) -> AuthResult<Option<ExternalIdentity>>;

    /// Short-lived identity token for the backend exchange.
    async fn mint_identity_token(
        &self,
        identity: &ExternalIdentity,
        force_refresh: bool,
    ) -> AuthResult<String>;

    /// Revoke the external session.
    async fn sign_out(&self) -> AuthResult<()>;

    fn subscribe(&self) -> watch::Receiver<Option<ExternalIdentity>>;
}
