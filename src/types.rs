use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Profile as returned by the userinfo endpoint.
///
/// Fields beyond `name`, `email` and `picture` are carried in `extra` so the
/// stored record mirrors the provider response verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Outcome of the provider consent flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Success { access_token: String },
    Cancelled,
    Failed { reason: String },
}

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub code: String,
    pub redirect_uri: String,
    pub code_verifier: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

/// Google API error body, e.g. `{"error": {"code": 401, "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct GoogleErrorBody {
    pub error: Option<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleErrorDetail {
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

/// A consent flow that has been started but not yet answered.
#[derive(Debug, Clone)]
pub struct PendingSignIn {
    pub flow_id: String,
    pub pkce: PkceChallenge,
    pub started_at: DateTime<Utc>,
    /// Set once Google has redirected back and the code is being exchanged.
    pub exchanging: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_keeps_unknown_fields() {
        let raw = r#"{"id":"1234","name":"Ada Lovelace","email":"ada@example.com","verified_email":true}"#;
        let profile: Profile = serde_json::from_str(raw).unwrap();

        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.picture, None);
        assert_eq!(profile.extra["id"], "1234");

        let round: serde_json::Value = serde_json::to_value(&profile).unwrap();
        assert_eq!(round["verified_email"], true);
        assert!(round.get("picture").is_none());
    }

    #[test]
    fn profile_requires_name_and_email() {
        assert!(serde_json::from_str::<Profile>(r#"{"name":"Ada"}"#).is_err());
        assert!(serde_json::from_str::<Profile>(r#"{"email":"ada@example.com"}"#).is_err());
    }

    #[test]
    fn token_request_omits_missing_secret() {
        let request = TokenRequest {
            grant_type: "authorization_code".into(),
            client_id: "client".into(),
            client_secret: None,
            code: "abc".into(),
            redirect_uri: "http://localhost:4000/auth/callback".into(),
            code_verifier: "verifier".into(),
        };
        let encoded = serde_urlencoded::to_string(&request).unwrap();
        assert!(!encoded.contains("client_secret"));
        assert!(encoded.contains("grant_type=authorization_code"));
    }
}
