//! Google OAuth endpoints: consent URL, code exchange and userinfo.

use crate::{
    config::{Config, SCOPES},
    error::{AppError, Result},
    types::{
        GoogleErrorBody, OAuthCallback, PkceChallenge, Profile, ProviderOutcome, TokenRequest,
        TokenResponse,
    },
};
use axum::http::header;
use tracing::{debug, error, info, warn};

/// Error code Google sends when the user declines the consent screen.
const ACCESS_DENIED: &str = "access_denied";

pub fn build_auth_url(config: &Config, pkce: &PkceChallenge) -> Result<String> {
    let auth_params = vec![
        ("response_type", "code"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("scope", SCOPES),
        ("state", pkce.state.as_str()),
        ("code_challenge", pkce.challenge.as_str()),
        ("code_challenge_method", "S256"),
    ];

    let query = serde_urlencoded::to_string(auth_params)
        .map_err(|e| AppError::InternalError(e.into()))?;

    Ok(format!("{}?{}", config.authorize_url, query))
}

/// Turns the redirect query into a provider outcome, exchanging the code
/// for an access token when there is one.
pub async fn resolve_callback(
    config: &Config,
    client: &reqwest::Client,
    params: OAuthCallback,
    pkce: &PkceChallenge,
) -> ProviderOutcome {
    if let Some(error) = params.error {
        if error == ACCESS_DENIED {
            info!("Sign-in cancelled by user");
            return ProviderOutcome::Cancelled;
        }
        let reason = match params.error_description {
            Some(description) if !description.is_empty() => {
                format!("{}: {}", error, description)
            }
            _ => error,
        };
        error!("Google auth error: {}", reason);
        return ProviderOutcome::Failed { reason };
    }

    let Some(code) = params.code else {
        warn!("Callback carried neither a code nor an error");
        return ProviderOutcome::Failed {
            reason: "Missing authorization code".to_string(),
        };
    };

    match exchange_code(config, client, &code, pkce).await {
        Ok(TokenResponse {
            access_token: Some(access_token),
            ..
        }) if !access_token.is_empty() => ProviderOutcome::Success { access_token },
        Ok(_) => {
            warn!("Authentication successful but no access token received");
            ProviderOutcome::Failed {
                reason: "No access token received".to_string(),
            }
        }
        Err(e) => ProviderOutcome::Failed {
            reason: e.to_string(),
        },
    }
}

pub async fn exchange_code(
    config: &Config,
    client: &reqwest::Client,
    code: &str,
    pkce: &PkceChallenge,
) -> Result<TokenResponse> {
    let request = TokenRequest {
        grant_type: "authorization_code".to_string(),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        code: code.to_string(),
        redirect_uri: config.redirect_uri.clone(),
        code_verifier: pkce.verifier.clone(),
    };

    debug!("Exchanging authorization code at: {}", config.token_url);

    let response = client
        .post(&config.token_url)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .form(&request)
        .send()
        .await
        .map_err(|e| AppError::ProviderError(format!("Token exchange failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        error!("Token exchange failed (HTTP {}): {}", status, error_text);
        return Err(AppError::ProviderError(format!(
            "Token exchange failed (HTTP {})",
            status.as_u16()
        )));
    }

    let token_response: TokenResponse = response.json().await.map_err(|e| {
        AppError::ProviderError(format!("Failed to parse token response: {}", e))
    })?;

    debug!(
        "Token exchange succeeded: token_type={:?}, expires_in={:?}, scope={:?}",
        token_response.token_type, token_response.expires_in, token_response.scope
    );

    Ok(token_response)
}

pub async fn fetch_profile(
    config: &Config,
    client: &reqwest::Client,
    access_token: &str,
) -> Result<Profile> {
    debug!(
        "Fetching user info with token {}...",
        access_token.chars().take(8).collect::<String>()
    );

    let response = client
        .get(&config.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| {
            error!("Error fetching user info: {}", e);
            AppError::ProfileFetchNetwork(e.to_string())
        })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        error!("Error reading user info response: {}", e);
        AppError::ProfileFetchNetwork(e.to_string())
    })?;

    if !status.is_success() {
        let message = serde_json::from_str::<GoogleErrorBody>(&body)
            .ok()
            .and_then(|body| body.error)
            .and_then(|detail| detail.message)
            .unwrap_or_else(|| "Unknown error".to_string());
        error!("User info fetch error (HTTP {}): {}", status, body);
        return Err(AppError::ProfileFetchHttp {
            status: status.as_u16(),
            message,
        });
    }

    let profile: Profile = serde_json::from_str(&body).map_err(|e| {
        error!("User info response was not a usable profile: {}", e);
        AppError::InvalidProfile(e.to_string())
    })?;

    info!("Fetched user info for {}", profile.email);
    Ok(profile)
}
