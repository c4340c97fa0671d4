use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/userinfo/v2/me";
pub const SCOPES: &str = "profile email";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub store_path: PathBuf,
    pub signin_timeout_secs: i64,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .context("Invalid PORT")?;

        let store_path = match std::env::var("STORE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => dirs::data_local_dir()
                .map(|dir| dir.join("google-signin").join("store.json"))
                .context("Could not determine a local data directory, set STORE_PATH")?,
        };

        let config = Self {
            port,

            // An empty client id leaves the sign-in request uninitialized
            client_id: std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),

            client_secret: std::env::var("GOOGLE_CLIENT_SECRET")
                .ok()
                .filter(|secret| !secret.is_empty()),

            redirect_uri: std::env::var("REDIRECT_URI")
                .unwrap_or_else(|_| format!("http://localhost:{}/auth/callback", port)),

            authorize_url: std::env::var("GOOGLE_AUTHORIZE_URL")
                .unwrap_or_else(|_| DEFAULT_AUTHORIZE_URL.to_string()),

            token_url: std::env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),

            userinfo_url: std::env::var("GOOGLE_USERINFO_URL")
                .unwrap_or_else(|_| DEFAULT_USERINFO_URL.to_string()),

            store_path,

            signin_timeout_secs: std::env::var("SIGNIN_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid SIGNIN_TIMEOUT_SECS")?,

            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECS")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("REDIRECT_URI", &self.redirect_uri),
            ("GOOGLE_AUTHORIZE_URL", &self.authorize_url),
            ("GOOGLE_TOKEN_URL", &self.token_url),
            ("GOOGLE_USERINFO_URL", &self.userinfo_url),
        ] {
            url::Url::parse(value).with_context(|| format!("Invalid {}: {}", name, value))?;
        }
        Ok(())
    }

    /// Whether the OAuth request can be built at all.
    pub fn is_request_ready(&self) -> bool {
        !self.client_id.trim().is_empty()
    }

    pub fn server_address(&self) -> SocketAddr {
        ([127, 0, 0, 1], self.port).into()
    }
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str, store_path: PathBuf) -> Config {
    Config {
        port: 4000,
        client_id: "test-client.apps.googleusercontent.com".to_string(),
        client_secret: None,
        redirect_uri: "http://localhost:4000/auth/callback".to_string(),
        authorize_url: format!("{}/o/oauth2/v2/auth", base_url),
        token_url: format!("{}/token", base_url),
        userinfo_url: format!("{}/userinfo/v2/me", base_url),
        store_path,
        signin_timeout_secs: 300,
        request_timeout_secs: 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_not_ready_without_client_id() {
        let mut config = test_config("http://127.0.0.1:1", PathBuf::from("store.json"));
        assert!(config.is_request_ready());

        config.client_id = "  ".to_string();
        assert!(!config.is_request_ready());
    }

    #[test]
    fn validate_rejects_malformed_urls() {
        let mut config = test_config("http://127.0.0.1:1", PathBuf::from("store.json"));
        assert!(config.validate().is_ok());

        config.userinfo_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("GOOGLE_USERINFO_URL"));
    }

    #[test]
    fn binds_to_loopback() {
        let config = test_config("http://127.0.0.1:1", PathBuf::from("store.json"));
        assert_eq!(config.server_address().to_string(), "127.0.0.1:4000");
    }
}
