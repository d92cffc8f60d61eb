//! Authentication session bridge for the plant collection.
//!
//! This crate provides:
//! - The [`IdentityProvider`] seam over the external identity provider
//! - The [`BackendAuth`] seam and its reqwest implementation
//! - [`AuthSession`], the record every collection operation re-reads
//! - An explicit FSM-based session state with transitioning markers for the UI
//! - [`AuthSessionBridge`], which reconciles the two sessions

mod backend;
mod bridge;
mod error;
mod identity;
mod session;
mod session_fsm;
mod subscription;

#[cfg(test)]
mod tests;

pub use backend::{BackendAuth, BackendSession, HttpBackendAuth};
pub use bridge::{AuthSessionBridge, AuthSnapshot, SessionStateCallback, SignInOutcome};
pub use error::{AuthError, AuthResult};
pub use identity::{DeviceClass, ExternalIdentity, IdentityProvider, PopupError};
pub use session::{AuthSession, BackendProfile, BearerToken};
pub use session_fsm::session_machine;
pub use session_fsm::{
    SessionMachine, SessionMachineInput, SessionMachineState, SessionState,
    SessionStateChangedPayload,
};
pub use subscription::IdentitySubscription;
