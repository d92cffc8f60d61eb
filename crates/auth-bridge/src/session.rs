//! The session record observed by everything above the bridge.

use crate::{ExternalIdentity, SessionState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque backend-issued credential.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// User record returned by the backend auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendProfile {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

/// External identity, bearer token and backend profile.
///
/// A profile is only ever held together with a bearer token, and clearing
/// the token clears the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    external_identity: Option<ExternalIdentity>,
    bearer_token: Option<BearerToken>,
    backend_profile: Option<BackendProfile>,
}

impl AuthSession {
    /// No identity and no backend session.
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// External identity only; the backend session is missing or failed.
    pub fn external_only(identity: ExternalIdentity) -> Self {
        Self {
            external_identity: Some(identity),
            ..Self::default()
        }
    }

    /// A confirmed backend session.
    pub fn fully_authenticated(
        identity: Option<ExternalIdentity>,
        token: BearerToken,
        profile: BackendProfile,
    ) -> Self {
        Self {
            external_identity: identity,
            bearer_token: Some(token),
            backend_profile: Some(profile),
        }
    }

    pub fn external_identity(&self) -> Option<&ExternalIdentity> {
        self.external_identity.as_ref()
    }

    pub fn bearer_token(&self) -> Option<&BearerToken> {
        self.bearer_token.as_ref()
    }

    pub fn backend_profile(&self) -> Option<&BackendProfile> {
        self.backend_profile.as_ref()
    }

    /// Stable state implied by the record.
    pub fn stable_state(&self) -> SessionState {
        if self.backend_profile.is_some() {
            SessionState::FullyAuthenticated
        } else if self.external_identity.is_some() {
            SessionState::ExternallyAuthenticatedOnly
        } else {
            SessionState::Unauthenticated
        }
    }

    /// True when the remote store is reachable with a confirmed token.
    pub fn is_fully_authenticated(&self) -> bool {
        self.backend_profile.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.backend_profile
            .as_ref()
            .map(|p| p.uid.as_str())
            .or_else(|| self.external_identity.as_ref().map(|i| i.uid.as_str()))
    }

    pub fn email(&self) -> Option<&str> {
        self.backend_profile
            .as_ref()
            .and_then(|p| p.email.as_deref())
            .or_else(|| {
                self.external_identity
                    .as_ref()
                    .and_then(|i| i.email.as_deref())
            })
    }

    pub(crate) fn set_external_identity(&mut self, identity: Option<ExternalIdentity>) {
        self.external_identity = identity;
    }

    pub(crate) fn set_backend_session(&mut self, token: BearerToken, profile: BackendProfile) {
        self.bearer_token = Some(token);
        self.backend_profile = Some(profile);
    }

    /// Token read back from storage. The profile waits for revalidation.
    pub(crate) fn restore_token(&mut self, token: BearerToken) {
        self.bearer_token = Some(token);
        self.backend_profile = None;
    }

    /// Attach a profile to the current token. Returns false without a token.
    pub(crate) fn confirm_profile(&mut self, profile: BackendProfile) -> bool {
        if self.bearer_token.is_none() {
            return false;
        }
        self.backend_profile = Some(profile);
        true
    }

    pub(crate) fn clear_backend_session(&mut self) {
        self.bearer_token = None;
        self.backend_profile = None;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
