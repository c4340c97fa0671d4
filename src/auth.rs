use crate::{
    error::{AppError, Result},
    types::{OAuthCallback, PkceChallenge},
    AppState,
};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// One-shot acknowledgment shown on the sign-in screen after a sign-out.
pub const NOTICE_COOKIE_NAME: &str = "signin_notice";
pub const SIGNED_OUT_NOTICE: &str = "signed_out";

// Generate PKCE verifier (64 random bytes)
pub fn generate_code_verifier() -> String {
    let random_bytes: Vec<u8> = (0..64).map(|_| rand::thread_rng().gen()).collect();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

// Generate PKCE challenge from verifier
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let result = hasher.finalize();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(result)
}

// Generate random state parameter
pub fn generate_state() -> String {
    let random_bytes: Vec<u8> = (0..32).map(|_| rand::thread_rng().gen()).collect();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

pub fn generate_pkce() -> PkceChallenge {
    let verifier = generate_code_verifier();
    let challenge = generate_code_challenge(&verifier);
    PkceChallenge {
        verifier,
        challenge,
        state: generate_state(),
    }
}

// Initiate Google sign-in
pub async fn sign_in(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let auth_url = state.session.begin_sign_in().await?;
    info!("Redirecting to Google consent screen");
    Ok(Redirect::to(&auth_url))
}

// Handle the redirect back from Google
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallback>,
) -> impl IntoResponse {
    debug!(
        "OAuth callback received: code={}, state={:?}, error={:?}",
        params.code.is_some(),
        params.state,
        params.error
    );

    // Failures are already in the error slot; the screen shows them
    match state.session.complete_sign_in(params).await {
        Ok(()) => {}
        Err(AppError::ProviderCancelled) => debug!("Sign-in cancelled, back to signed out"),
        Err(e) => warn!("Sign-in did not complete: {}", e),
    }

    Redirect::to("/")
}

// Sign out and acknowledge it on the next render
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse> {
    let removed = state.session.sign_out().await?;

    let jar = if removed {
        let cookie = Cookie::build((NOTICE_COOKIE_NAME, SIGNED_OUT_NOTICE))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .build();
        jar.add(cookie)
    } else {
        jar
    };

    Ok((jar, Redirect::to("/")))
}

pub async fn dismiss_error(State(state): State<AppState>) -> impl IntoResponse {
    state.session.dismiss_error().await;
    Redirect::to("/")
}

// Check authentication status
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.snapshot().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{app, state::SessionState, test_state};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    #[test]
    fn challenge_is_sha256_of_verifier() {
        // RFC 7636 appendix B
        let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn pkce_values_are_url_safe_and_fresh() {
        let first = generate_pkce();
        let second = generate_pkce();

        assert_ne!(first.state, second.state);
        assert_ne!(first.verifier, second.verifier);
        assert!(first
            .verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(first.challenge, generate_code_challenge(&first.verifier));
    }

    #[tokio::test]
    async fn sign_in_redirects_to_consent_screen() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("https://accounts.example", dir.path());
        let session = state.session.clone();

        let response = app(state)
            .oneshot(
                Request::post("/auth/signin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://accounts.example/o/oauth2/v2/auth?"));
        assert!(session.snapshot().await.is_busy());
    }

    #[tokio::test]
    async fn second_sign_in_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("https://accounts.example", dir.path());
        state.session.begin_sign_in().await.unwrap();

        let response = app(state)
            .oneshot(
                Request::post("/auth/signin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn stray_callback_redirects_home_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://127.0.0.1:1", dir.path());
        let session = state.session.clone();

        let response = app(state)
            .oneshot(
                Request::get("/auth/callback?code=abc&state=nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert_eq!(session.snapshot().await, SessionState::default());
    }

    #[tokio::test]
    async fn unmatched_callback_redirects_home_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://127.0.0.1:1", dir.path());
        let session = state.session.clone();
        session.begin_sign_in().await.unwrap();

        let response = app(state)
            .oneshot(
                Request::get("/auth/callback?code=abc&state=nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert_eq!(
            session.snapshot().await.error.as_deref(),
            Some("Invalid OAuth state")
        );
    }

    #[tokio::test]
    async fn sign_out_sets_acknowledgment_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://127.0.0.1:1", dir.path());

        let response = app(state)
            .oneshot(
                Request::post("/auth/signout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("signin_notice=signed_out"));
    }

    #[tokio::test]
    async fn status_reports_phase() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://127.0.0.1:1", dir.path());

        let response = app(state)
            .oneshot(Request::get("/auth/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["state"], "signed_out");
    }
}
