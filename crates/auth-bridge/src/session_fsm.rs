//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!  Unauthenticated ───┐   ExternallyAuthenticatedOnly ───┐   FullyAuthenticated ───┐
//!        ▲            │              ▲                   │            ▲            │
//!        │            │ SignInStarted / RevalidationStarted           │            │
//!        │            ▼              │                   ▼            │            ▼
//!        │     ┌──────────────────────────────────────────────────────────────┐
//!        │     │                       TransitioningIn                        │
//!        │     └──────────────────────────────────────────────────────────────┘
//!        │        SettledUnauthenticated / SettledExternalOnly / SettledFull
//!        │
//!        │ SettledUnauthenticated      SignOutStarted (from any stable state
//!        └──────────────────────── TransitioningOut ◄──── or TransitioningIn) ───
//! ```
//!
//! `TransitioningIn` and `TransitioningOut` are busy markers for the UI. They
//! only exist while a bridge operation is in flight and are never persisted.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Unauthenticated)

    Unauthenticated => {
        SignInStarted => TransitioningIn,
        RevalidationStarted => TransitioningIn,
        SignOutStarted => TransitioningOut
    },
    ExternallyAuthenticatedOnly => {
        SignInStarted => TransitioningIn,
        RevalidationStarted => TransitioningIn,
        SignOutStarted => TransitioningOut
    },
    FullyAuthenticated => {
        SignInStarted => TransitioningIn,
        RevalidationStarted => TransitioningIn,
        SignOutStarted => TransitioningOut
    },
    TransitioningIn => {
        SettledUnauthenticated => Unauthenticated,
        SettledExternalOnly => ExternallyAuthenticatedOnly,
        SettledFull => FullyAuthenticated,
        SignOutStarted => TransitioningOut
    },
    TransitioningOut => {
        SettledUnauthenticated => Unauthenticated
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session state for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    /// External identity present, no backend bearer token.
    ExternallyAuthenticatedOnly,
    /// External identity (or restored token) plus a confirmed backend profile.
    FullyAuthenticated,
    TransitioningIn,
    TransitioningOut,
}

impl SessionState {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::TransitioningIn | SessionState::TransitioningOut
        )
    }

    /// The FSM input that settles a transition into this stable state.
    pub(crate) fn settle_input(&self) -> Option<SessionMachineInput> {
        match self {
            SessionState::Unauthenticated => Some(SessionMachineInput::SettledUnauthenticated),
            SessionState::ExternallyAuthenticatedOnly => {
                Some(SessionMachineInput::SettledExternalOnly)
            }
            SessionState::FullyAuthenticated => Some(SessionMachineInput::SettledFull),
            SessionState::TransitioningIn | SessionState::TransitioningOut => None,
        }
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Unauthenticated => SessionState::Unauthenticated,
            SessionMachineState::ExternallyAuthenticatedOnly => {
                SessionState::ExternallyAuthenticatedOnly
            }
            SessionMachineState::FullyAuthenticated => SessionState::FullyAuthenticated,
            SessionMachineState::TransitioningIn => SessionState::TransitioningIn,
            SessionMachineState::TransitioningOut => SessionState::TransitioningOut,
        }
    }
}

/// Payload for session state change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateChangedPayload {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
