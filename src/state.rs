//! Sign-in state machine.
//!
//! Every change to the session goes through [`reduce`], which applies one
//! [`AuthEvent`] and may ask the caller to perform an [`Effect`]. The reducer
//! does no I/O.

use crate::types::{Profile, ProviderOutcome};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "profile", rename_all = "snake_case")]
pub enum AuthPhase {
    SignedOut,
    Authenticating,
    Authenticated(Profile),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    #[serde(flatten)]
    pub phase: AuthPhase,
    /// User-facing error slot shown by the sign-in screen.
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: AuthPhase::SignedOut,
            error: None,
        }
    }
}

impl SessionState {
    /// `Authenticating` doubles as the in-flight flag for profile mutations.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, AuthPhase::Authenticating)
    }

    pub fn profile(&self) -> Option<&Profile> {
        match &self.phase {
            AuthPhase::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// A stored profile was found at startup.
    Restored(Profile),
    SignInStarted,
    /// A pending sign-in was abandoned without a provider response.
    SignInAbandoned,
    ProviderResponded(ProviderOutcome),
    ProfileFetched(Profile),
    ProfileFetchFailed(String),
    SignedOut { storage_error: Option<String> },
    /// An error that does not change the phase.
    Failed(String),
    ErrorDismissed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchProfile { access_token: String },
}

pub fn reduce(state: &mut SessionState, event: AuthEvent) -> Option<Effect> {
    match event {
        AuthEvent::Restored(profile) => {
            if state.phase == AuthPhase::SignedOut {
                state.phase = AuthPhase::Authenticated(profile);
            }
            None
        }
        AuthEvent::SignInStarted => {
            if state.phase == AuthPhase::SignedOut {
                state.phase = AuthPhase::Authenticating;
                state.error = None;
            }
            None
        }
        AuthEvent::SignInAbandoned => {
            if state.is_busy() {
                state.phase = AuthPhase::SignedOut;
            }
            None
        }
        AuthEvent::ProviderResponded(outcome) => {
            if !state.is_busy() {
                return None;
            }
            match outcome {
                ProviderOutcome::Success { access_token } => {
                    Some(Effect::FetchProfile { access_token })
                }
                ProviderOutcome::Cancelled => {
                    state.phase = AuthPhase::SignedOut;
                    None
                }
                ProviderOutcome::Failed { reason } => {
                    state.phase = AuthPhase::SignedOut;
                    state.error = Some(format!("Sign-in error: {}", reason));
                    None
                }
            }
        }
        AuthEvent::ProfileFetched(profile) => {
            state.phase = AuthPhase::Authenticated(profile);
            state.error = None;
            None
        }
        AuthEvent::ProfileFetchFailed(message) => {
            if state.is_busy() {
                state.phase = AuthPhase::SignedOut;
            }
            state.error = Some(message);
            None
        }
        AuthEvent::SignedOut { storage_error } => {
            state.phase = AuthPhase::SignedOut;
            state.error = storage_error;
            None
        }
        AuthEvent::Failed(message) => {
            state.error = Some(message);
            None
        }
        AuthEvent::ErrorDismissed => {
            state.error = None;
            None
        }
    }
}
