//! Bridges the external identity provider to the backend bearer-token
//! session.
//!
//! Every public operation runs under one operation lock, moves the FSM into a
//! transitioning state, works on a draft [`AuthSession`], and publishes the
//! draft once at the end. Observers on [`AuthSessionBridge::subscribe`] never see a
//! half-applied session.

use crate::session_fsm::{
    SessionMachine, SessionMachineInput, SessionState, SessionStateChangedPayload,
};
use crate::{
    AuthError, AuthResult, AuthSession, BackendAuth, BackendProfile, BearerToken, DeviceClass,
    ExternalIdentity, IdentityProvider, IdentitySubscription,
};
use parking_lot::Mutex;
use plant_config_and_utils::DeploymentMode;
use plant_local_storage::LocalStore;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Callback type for session state change notifications.
pub type SessionStateCallback = Box<dyn Fn(SessionStateChangedPayload) + Send + Sync>;

/// How `begin_sign_in` finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// Control left for the redirect flow; the result arrives through
    /// identity notifications after reload.
    RedirectStarted,
    /// Popup succeeded. `backend_session` reports whether the exchange did.
    PopupCompleted { backend_session: bool },
}

/// Point-in-time auth status for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSnapshot {
    pub state: SessionState,
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

pub struct AuthSessionBridge {
    identity: Arc<dyn IdentityProvider>,
    backend: Arc<dyn BackendAuth>,
    local: LocalStore,
    mode: DeploymentMode,
    device: DeviceClass,
    session_tx: watch::Sender<AuthSession>,
    fsm: Mutex<SessionMachine>,
    state_callback: Mutex<Option<SessionStateCallback>>,
    op_lock: tokio::sync::Mutex<()>,
}

impl AuthSessionBridge {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        backend: Arc<dyn BackendAuth>,
        local: LocalStore,
        mode: DeploymentMode,
        device: DeviceClass,
    ) -> Self {
        let (session_tx, _) = watch::channel(AuthSession::default());
        Self {
            identity,
            backend,
            local,
            mode,
            device,
            session_tx,
            fsm: Mutex::new(SessionMachine::new()),
            state_callback: Mutex::new(None),
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// Set a callback to be notified of every state transition.
    pub fn set_state_callback(&self, callback: SessionStateCallback) {
        *self.state_callback.lock() = Some(callback);
    }

    pub fn fsm_state(&self) -> SessionState {
        SessionState::from(self.fsm.lock().state())
    }

    /// Current session snapshot.
    pub fn session(&self) -> AuthSession {
        self.session_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSession> {
        self.session_tx.subscribe()
    }

    /// Production accepts an external-only session; development requires a
    /// confirmed backend session.
    pub fn is_authenticated(&self) -> bool {
        let state = self.session_tx.borrow().stable_state();
        if self.mode.is_production() {
            matches!(
                state,
                SessionState::ExternallyAuthenticatedOnly | SessionState::FullyAuthenticated
            )
        } else {
            state == SessionState::FullyAuthenticated
        }
    }

    pub fn status(&self) -> AuthSnapshot {
        let session = self.session();
        AuthSnapshot {
            state: self.fsm_state(),
            authenticated: self.is_authenticated(),
            user_id: session.user_id().map(str::to_string),
            email: session.email().map(str::to_string),
        }
    }

    // ==========================================
    // Operations
    // ==========================================

    /// Load a previously stored bearer token into the session. The profile
    /// stays empty until the token is revalidated.
    pub async fn restore(&self) -> AuthResult<bool> {
        let _op = self.op_lock.lock().await;
        let Some(raw) = self.local.bearer_token()? else {
            debug!("No stored bearer token");
            return Ok(false);
        };

        let mut draft = self.session();
        draft.restore_token(BearerToken::new(raw));
        self.publish(draft);
        info!("Restored stored bearer token");
        Ok(true)
    }

    /// Start sign-in with the flow suited to the device class.
    pub async fn begin_sign_in(&self) -> AuthResult<SignInOutcome> {
        let _op = self.op_lock.lock().await;
        let _settle = self.begin(&SessionMachineInput::SignInStarted)?;

        let mut draft = self.session();
        let result = self.sign_in_flow(&mut draft).await;
        self.publish(draft);
        result
    }

    /// Exchange an external identity token for a backend session.
    ///
    /// On failure the deployment-mode fallback has already been applied when
    /// `ExchangeFailed` is returned.
    pub async fn exchange_for_backend_session(&self, id_token: &str) -> AuthResult<BackendProfile> {
        let _op = self.op_lock.lock().await;
        let _settle = self.begin(&SessionMachineInput::SignInStarted)?;

        let mut draft = self.session();
        let result = self.exchange(&mut draft, id_token).await;
        self.publish(draft);
        result
    }

    /// Follow the identity provider. Each snapshot is handled by
    /// [`Self::handle_identity_notification`] before the next is read.
    pub fn observe_external_identity_changes(self: &Arc<Self>) -> IdentitySubscription {
        let mut identities = self.identity.subscribe();
        let bridge = Arc::clone(self);

        let task = tokio::spawn(async move {
            loop {
                let snapshot = identities.borrow_and_update().clone();
                if let Err(e) = bridge.handle_identity_notification(snapshot).await {
                    warn!(error = %e, "Identity notification handling failed");
                }
                if identities.changed().await.is_err() {
                    debug!("Identity provider stream closed");
                    break;
                }
            }
        });

        IdentitySubscription::new(task, self.subscribe())
    }

    /// Handle one identity snapshot.
    ///
    /// A pending redirect result is processed to completion first, and when
    /// one exists the snapshot itself is not evaluated.
    pub async fn handle_identity_notification(
        &self,
        snapshot: Option<ExternalIdentity>,
    ) -> AuthResult<()> {
        let _op = self.op_lock.lock().await;
        let _settle = self.begin(&SessionMachineInput::RevalidationStarted)?;

        let mut draft = self.session();
        let result = self.notification_flow(&mut draft, snapshot).await;
        self.publish(draft);
        result
    }

    /// Check the stored bearer token with the backend.
    ///
    /// Returns whether a confirmed backend session exists afterwards. A
    /// rejected token clears the backend session and, when an external
    /// identity is present, triggers a re-exchange. Network failures keep
    /// the current session and are returned.
    pub async fn revalidate(&self) -> AuthResult<bool> {
        let _op = self.op_lock.lock().await;
        if self.session_tx.borrow().bearer_token().is_none() {
            return Ok(false);
        }
        let _settle = self.begin(&SessionMachineInput::RevalidationStarted)?;

        let mut draft = self.session();
        let result = self.revalidate_flow(&mut draft).await;
        self.publish(draft);
        result
    }

    /// Revalidate every `interval` until the bridge is dropped or the handle
    /// is aborted.
    pub fn spawn_periodic_revalidation(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let bridge: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(bridge) = bridge.upgrade() else {
                    break;
                };
                if let Err(e) = bridge.revalidate().await {
                    debug!(error = %e, "Periodic revalidation failed");
                }
            }
        })
    }

    /// Best-effort sign-out. Every step is attempted and the session is
    /// cleared regardless; the first failure is returned.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let _op = self.op_lock.lock().await;
        let _settle = self.begin(&SessionMachineInput::SignOutStarted)?;

        let revoked = self.identity.sign_out().await;
        if let Err(e) = &revoked {
            warn!(error = %e, "Failed to revoke external session");
        }
        let cleared = self.local.clear_bearer_token();
        if let Err(e) = &cleared {
            warn!(error = %e, "Failed to clear stored bearer token");
        }

        self.publish(AuthSession::unauthenticated());
        info!("Signed out");

        revoked?;
        cleared?;
        Ok(())
    }

    // ==========================================
    // Flows (operate on a draft session)
    // ==========================================

    async fn sign_in_flow(&self, draft: &mut AuthSession) -> AuthResult<SignInOutcome> {
        if self.device == DeviceClass::Mobile {
            info!("Starting redirect sign-in");
            self.identity.sign_in_with_redirect().await?;
            return Ok(SignInOutcome::RedirectStarted);
        }

        match self.identity.sign_in_with_popup().await {
            Ok(identity) => {
                info!(uid = %identity.uid, "Popup sign-in succeeded");
                let backend_session = self
                    .establish_backend_session(draft, identity, false)
                    .await
                    .is_ok();
                Ok(SignInOutcome::PopupCompleted { backend_session })
            }
            Err(e) if e.falls_back_to_redirect() => {
                info!(reason = %e, "Popup unavailable, falling back to redirect sign-in");
                self.identity.sign_in_with_redirect().await?;
                Ok(SignInOutcome::RedirectStarted)
            }
            Err(e) => Err(AuthError::Popup(e)),
        }
    }

    async fn notification_flow(
        &self,
        draft: &mut AuthSession,
        snapshot: Option<ExternalIdentity>,
    ) -> AuthResult<()> {
        match self.identity.take_redirect_result().await {
            Ok(Some(identity)) => {
                info!(uid = %identity.uid, "Processing redirect sign-in result");
                return self
                    .establish_backend_session(draft, identity, false)
                    .await
                    .map(|_| ());
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read redirect result"),
        }

        let Some(identity) = snapshot else {
            debug!("No external identity, clearing session");
            self.forget_stored_token();
            draft.clear();
            return Ok(());
        };

        draft.set_external_identity(Some(identity.clone()));

        let stored = match draft.bearer_token().cloned() {
            Some(token) => Some(token),
            None => self.local.bearer_token().ok().flatten().map(BearerToken::new),
        };
        if let Some(token) = stored {
            match self.backend.whoami(&token).await {
                Ok(profile) => {
                    debug!(uid = %profile.uid, "Reusing stored bearer token");
                    draft.restore_token(token);
                    draft.confirm_profile(profile);
                    return Ok(());
                }
                Err(e) => {
                    info!(error = %e, "Stored bearer token unusable, re-exchanging");
                    self.forget_stored_token();
                    draft.clear_backend_session();
                }
            }
        }

        self.establish_backend_session(draft, identity, true)
            .await
            .map(|_| ())
    }

    async fn revalidate_flow(&self, draft: &mut AuthSession) -> AuthResult<bool> {
        let Some(token) = draft.bearer_token().cloned() else {
            return Ok(false);
        };

        match self.backend.whoami(&token).await {
            Ok(profile) => {
                debug!(uid = %profile.uid, "Bearer token still valid");
                draft.confirm_profile(profile);
                Ok(true)
            }
            Err(AuthError::SessionInvalid(reason)) => {
                info!(reason = %reason, "Bearer token rejected during revalidation");
                self.forget_stored_token();
                draft.clear_backend_session();

                let Some(identity) = draft.external_identity().cloned() else {
                    return Ok(false);
                };
                match self.establish_backend_session(draft, identity, true).await {
                    Ok(_) => Ok(true),
                    Err(e) => {
                        warn!(error = %e, "Re-exchange after revalidation failed");
                        Ok(false)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Session revalidation failed, keeping session");
                Err(e)
            }
        }
    }

    /// Record the identity, mint a token for it, and exchange.
    async fn establish_backend_session(
        &self,
        draft: &mut AuthSession,
        identity: ExternalIdentity,
        force_refresh: bool,
    ) -> AuthResult<BackendProfile> {
        draft.set_external_identity(Some(identity.clone()));

        let id_token = match self
            .identity
            .mint_identity_token(&identity, force_refresh)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                let err = AuthError::ExchangeFailed(format!("could not mint identity token: {}", e));
                self.apply_exchange_failure(draft, &err).await;
                return Err(err);
            }
        };

        self.exchange(draft, &id_token).await
    }

    async fn exchange(&self, draft: &mut AuthSession, id_token: &str) -> AuthResult<BackendProfile> {
        match self.backend.exchange(id_token).await {
            Ok(session) => {
                if let Err(e) = self.local.set_bearer_token(session.access_token.as_str()) {
                    warn!(error = %e, "Failed to persist bearer token");
                }
                info!(uid = %session.profile.uid, "Backend session established");
                let profile = session.profile.clone();
                draft.set_backend_session(session.access_token, session.profile);
                Ok(profile)
            }
            Err(e) => {
                let err = if matches!(e, AuthError::ExchangeFailed(_)) {
                    e
                } else {
                    AuthError::ExchangeFailed(e.to_string())
                };
                self.apply_exchange_failure(draft, &err).await;
                Err(err)
            }
        }
    }

    /// Production keeps the external identity; development signs out fully.
    async fn apply_exchange_failure(&self, draft: &mut AuthSession, err: &AuthError) {
        self.forget_stored_token();

        if self.mode.is_production() {
            warn!(error = %err, "Backend exchange failed, continuing with external identity only");
            draft.clear_backend_session();
            return;
        }

        warn!(error = %err, "Backend exchange failed, clearing all session state");
        draft.clear();
        if let Err(e) = self.identity.sign_out().await {
            warn!(error = %e, "Failed to revoke external session after exchange failure");
        }
    }

    fn forget_stored_token(&self) {
        if let Err(e) = self.local.clear_bearer_token() {
            warn!(error = %e, "Failed to clear stored bearer token");
        }
    }

    // ==========================================
    // State bookkeeping
    // ==========================================

    fn publish(&self, session: AuthSession) {
        self.session_tx.send_replace(session);
    }

    /// Open a transition that settles when the returned guard drops, so a
    /// cancelled operation never leaves the machine transient.
    fn begin(&self, input: &SessionMachineInput) -> AuthResult<Settle<'_>> {
        self.transition(input)?;
        Ok(Settle { bridge: self })
    }

    /// Transition the FSM and notify the callback if the state changed.
    fn transition(&self, input: &SessionMachineInput) -> AuthResult<SessionState> {
        let mut fsm = self.fsm.lock();
        let old_state = SessionState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = SessionState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Session state transition"
            );
            self.notify_state_change(new_state);
        }

        Ok(new_state)
    }

    /// Move the FSM to the stable state implied by the published session.
    fn settle(&self) {
        let target = self.session_tx.borrow().stable_state();
        let mut current = self.fsm_state();

        if current == SessionState::TransitioningOut && target != SessionState::Unauthenticated {
            if let Err(e) = self.transition(&SessionMachineInput::SettledUnauthenticated) {
                warn!(error = %e, "Failed to settle sign-out");
                return;
            }
            current = SessionState::Unauthenticated;
        }
        if current == target {
            return;
        }
        if !current.is_transient() {
            if let Err(e) = self.transition(&SessionMachineInput::RevalidationStarted) {
                warn!(error = %e, "Failed to reopen session transition");
                return;
            }
        }
        if let Some(input) = target.settle_input() {
            if let Err(e) = self.transition(&input) {
                warn!(error = %e, "Failed to settle session state");
            }
        }
    }

    fn notify_state_change(&self, state: SessionState) {
        let callback = self.state_callback.lock();
        if let Some(callback) = callback.as_ref() {
            let session = self.session_tx.borrow().clone();
            callback(SessionStateChangedPayload {
                state,
                user_id: session.user_id().map(str::to_string),
                email: session.email().map(str::to_string),
            });
        }
    }
}

/// Settles the bridge's FSM on drop.
struct Settle<'a> {
    bridge: &'a AuthSessionBridge,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.bridge.settle();
    }
}
