use crate::{
    auth::generate_pkce,
    config::Config,
    error::{AppError, Result},
    google,
    state::{reduce, AuthEvent, AuthPhase, Effect, SessionState},
    store::{KvStore, USER_INFO_KEY},
    types::{OAuthCallback, PendingSignIn, Profile, ProviderOutcome},
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    pending: Option<PendingSignIn>,
}

impl Inner {
    fn is_current(&self, flow_id: &str) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| pending.flow_id == flow_id)
    }
}

/// The sign-in screen's view-model.
///
/// Owns the session state, the pending consent flow and the persistent store.
/// The lock is never held across provider calls; `Authenticating` keeps other
/// sign-in and sign-out attempts out while one is running.
#[derive(Debug)]
pub struct Session {
    config: Arc<Config>,
    http_client: reqwest::Client,
    store: KvStore,
    inner: Mutex<Inner>,
}

impl Session {
    /// Builds the session, rehydrating a stored profile if there is one.
    pub fn restore(config: Arc<Config>, http_client: reqwest::Client, store: KvStore) -> Self {
        let mut inner = Inner::default();

        match store.get(USER_INFO_KEY) {
            Ok(Some(json_value)) => match serde_json::from_str::<Profile>(&json_value) {
                Ok(profile) => {
                    info!("Restored stored user info for {}", profile.email);
                    reduce(&mut inner.state, AuthEvent::Restored(profile));
                }
                Err(e) => {
                    error!("Failed to parse stored user info: {}", e);
                    reduce(
                        &mut inner.state,
                        AuthEvent::Failed("Failed to load user info from storage".to_string()),
                    );
                }
            },
            Ok(None) => debug!("No stored user info"),
            Err(e) => {
                error!("Failed to load user info from storage: {}", e);
                reduce(
                    &mut inner.state,
                    AuthEvent::Failed("Failed to load user info from storage".to_string()),
                );
            }
        }

        Self {
            config,
            http_client,
            store,
            inner: Mutex::new(inner),
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.inner.lock().await.state.clone()
    }

    /// Starts a consent flow and returns the URL to send the browser to.
    pub async fn begin_sign_in(&self) -> Result<String> {
        if !self.config.is_request_ready() {
            warn!("Sign-in requested but GOOGLE_CLIENT_ID is not set");
            return Err(AppError::RequestNotReady);
        }

        let mut inner = self.inner.lock().await;
        self.expire_stale_pending(&mut inner);

        match inner.state.phase {
            AuthPhase::Authenticating => return Err(AppError::SignInInFlight),
            AuthPhase::Authenticated(_) => return Err(AppError::AlreadySignedIn),
            AuthPhase::SignedOut => {}
        }

        let pending = PendingSignIn {
            flow_id: Uuid::new_v4().to_string(),
            pkce: generate_pkce(),
            started_at: Utc::now(),
            exchanging: false,
        };
        let auth_url = google::build_auth_url(&self.config, &pending.pkce)?;

        info!("Starting sign-in flow {}", pending.flow_id);
        debug!("Consent URL: {}", auth_url);

        inner.pending = Some(pending);
        reduce(&mut inner.state, AuthEvent::SignInStarted);

        Ok(auth_url)
    }

    /// Handles the provider redirect for the pending sign-in.
    ///
    /// The exchange and profile fetch run on their own task, so a dropped
    /// request still finishes (or fails) the flow instead of leaving it
    /// `Authenticating`.
    pub async fn complete_sign_in(self: &Arc<Self>, params: OAuthCallback) -> Result<()> {
        let (flow_id, pkce) = {
            let mut inner = self.inner.lock().await;
            self.expire_stale_pending(&mut inner);

            let Some(pending) = inner.pending.as_mut() else {
                warn!("Callback received with no sign-in pending, ignoring it");
                return Err(AppError::InvalidState);
            };
            if params.state.as_deref() != Some(pending.pkce.state.as_str()) {
                warn!("Callback state does not match pending flow {}", pending.flow_id);
                reduce(
                    &mut inner.state,
                    AuthEvent::Failed(AppError::InvalidState.to_string()),
                );
                return Err(AppError::InvalidState);
            }
            if pending.exchanging {
                debug!("Flow {} is already being exchanged", pending.flow_id);
                return Err(AppError::SignInInFlight);
            }

            pending.exchanging = true;
            (pending.flow_id.clone(), pending.pkce.clone())
        };

        debug!("Provider responded for flow {}", flow_id);
        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome =
                google::resolve_callback(&session.config, &session.http_client, params, &pkce)
                    .await;
            session.handle_provider_response(&flow_id, outcome).await
        });

        task.await.map_err(|e| AppError::InternalError(e.into()))?
    }

    /// Feeds a provider outcome for `flow_id` through the reducer and runs the
    /// profile fetch it asks for. Outcomes for a flow that has since expired
    /// are dropped.
    pub async fn handle_provider_response(
        &self,
        flow_id: &str,
        outcome: ProviderOutcome,
    ) -> Result<()> {
        let result = match &outcome {
            ProviderOutcome::Cancelled => Err(AppError::ProviderCancelled),
            ProviderOutcome::Failed { reason } => Err(AppError::ProviderError(reason.clone())),
            ProviderOutcome::Success { .. } => Ok(()),
        };

        let effect = {
            let mut inner = self.inner.lock().await;
            if !inner.is_current(flow_id) {
                warn!("Discarding provider response for expired flow {}", flow_id);
                return Err(AppError::InvalidState);
            }
            let effect = reduce(&mut inner.state, AuthEvent::ProviderResponded(outcome));
            if effect.is_none() {
                inner.pending = None;
            }
            effect
        };

        match effect {
            Some(Effect::FetchProfile { access_token }) => {
                self.fetch_profile(flow_id, &access_token).await
            }
            None => result,
        }
    }

    async fn fetch_profile(&self, flow_id: &str, access_token: &str) -> Result<()> {
        let fetched = google::fetch_profile(&self.config, &self.http_client, access_token).await;

        let mut inner = self.inner.lock().await;
        if !inner.is_current(flow_id) {
            warn!("Discarding profile for expired flow {}", flow_id);
            return Err(AppError::InvalidState);
        }
        inner.pending = None;

        let profile = match fetched {
            Ok(profile) => profile,
            Err(e) => {
                reduce(&mut inner.state, AuthEvent::ProfileFetchFailed(e.to_string()));
                return Err(e);
            }
        };
        reduce(&mut inner.state, AuthEvent::ProfileFetched(profile.clone()));

        let persisted = serde_json::to_string(&profile)
            .map_err(|e| AppError::StorageError(e.to_string()))
            .and_then(|json_value| self.store.set(USER_INFO_KEY, &json_value));
        if let Err(e) = persisted {
            error!("Failed to store user info: {}", e);
            reduce(
                &mut inner.state,
                AuthEvent::Failed(
                    "Signed in, but your profile could not be saved on this device".to_string(),
                ),
            );
            return Err(e);
        }

        info!("Signed in as {}", profile.email);
        Ok(())
    }

    /// Clears the profile from memory and from the store.
    ///
    /// Storage failures land in the error slot and do not fail the call; the
    /// returned flag says whether the stored record is really gone.
    pub async fn sign_out(&self) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        self.expire_stale_pending(&mut inner);

        if inner.state.is_busy() {
            return Err(AppError::SignInInFlight);
        }
        if let Some(profile) = inner.state.profile() {
            debug!("Signing out {}", profile.email);
        }

        let storage_error = match self.store.remove(USER_INFO_KEY) {
            Ok(()) => None,
            Err(e) => {
                error!("Error signing out: {}", e);
                Some("Signed out, but the stored profile could not be removed".to_string())
            }
        };
        let removed = storage_error.is_none();
        reduce(&mut inner.state, AuthEvent::SignedOut { storage_error });

        info!("Signed out");
        Ok(removed)
    }

    pub async fn dismiss_error(&self) {
        let mut inner = self.inner.lock().await;
        reduce(&mut inner.state, AuthEvent::ErrorDismissed);
    }

    /// Drops a sign-in that has been `Authenticating` for longer than
    /// `signin_timeout_secs`, or that has lost its pending flow.
    fn expire_stale_pending(&self, inner: &mut Inner) {
        if !inner.state.is_busy() {
            return;
        }

        match &inner.pending {
            Some(pending) => {
                let age = Utc::now() - pending.started_at;
                if age < Duration::seconds(self.config.signin_timeout_secs) {
                    return;
                }
                warn!(
                    "Sign-in flow {} did not finish after {}s, discarding it",
                    pending.flow_id,
                    age.num_seconds()
                );
            }
            None => warn!("Sign-in in progress with no pending flow, resetting"),
        }

        inner.pending = None;
        reduce(&mut inner.state, AuthEvent::SignInAbandoned);
    }
}
