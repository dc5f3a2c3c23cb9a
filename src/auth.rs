use std::sync::Arc;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::Config;

const IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Refresh the ID token this long before it actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Tokens issued by either the Identity Toolkit (camelCase) or the
/// Secure Token endpoint (snake_case).
#[derive(Debug, Deserialize)]
struct TokenGrant {
    #[serde(alias = "idToken")]
    id_token: String,
    #[serde(alias = "refreshToken")]
    refresh_token: String,
    #[serde(alias = "expiresIn")]
    expires_in: String,
    #[serde(default, alias = "localId")]
    user_id: Option<String>,
}

#[derive(Debug, Clone)]
struct IdToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl IdToken {
    fn is_fresh(&self) -> bool {
        self.expires_at > Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

#[derive(Debug)]
struct Session {
    refresh_token: String,
    id_token: Option<IdToken>,
}

impl Session {
    fn apply(&mut self, grant: TokenGrant) -> String {
        let secs: i64 = grant.expires_in.parse().unwrap_or(3600);
        self.refresh_token = grant.refresh_token;
        self.id_token = Some(IdToken {
            token: grant.id_token.clone(),
            expires_at: Utc::now() + Duration::seconds(secs),
        });
        grant.id_token
    }
}

/// Firebase email/password session, refreshing its ID token as needed.
#[derive(Clone)]
pub struct FirebaseAuth {
    client: Client,
    api_key: String,
    session: Arc<Mutex<Session>>,
}

impl FirebaseAuth {
    /// Resume a session from a stored refresh token.
    pub fn new(config: &Config, refresh_token: String) -> Self {
        Self::from_session(
            config,
            Session {
                refresh_token,
                id_token: None,
            },
        )
    }

    fn from_session(config: &Config, session: Session) -> Self {
        Self {
            client: Client::new(),
            api_key: config.firebase_api_key.clone(),
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub async fn sign_in_with_email(config: &Config, email: &str, password: &str) -> Result<Self> {
        Self::password_grant(config, "accounts:signInWithPassword", email, password).await
    }

    /// Create a new account. The returned session is signed in as that account.
    pub async fn sign_up_with_email(config: &Config, email: &str, password: &str) -> Result<Self> {
        Self::password_grant(config, "accounts:signUp", email, password).await
    }

    async fn password_grant(
        config: &Config,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<Self> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(anyhow!("Please enter email and password"));
        }

        let auth = Self::new(config, String::new());
        let url = format!("{}/{}?key={}", IDENTITY_URL, endpoint, auth.api_key);
        let resp = auth
            .client
            .post(&url)
            .json(&json!({
                "email": email.trim(),
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        let grant: TokenGrant = checked(resp, endpoint).await?.json().await?;
        info!(uid = grant.user_id.as_deref().unwrap_or_default(), endpoint, "Firebase session started");
        auth.session.lock().await.apply(grant);
        Ok(auth)
    }

    /// Current refresh token, for persisting the session.
    pub async fn refresh_token(&self) -> String {
        self.session.lock().await.refresh_token.clone()
    }

    pub async fn get_id_token(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.id_token.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.token.clone());
        }

        debug!("Refreshing Firebase ID token");
        let url = format!("{}?key={}", SECURE_TOKEN_URL, self.api_key);
        let resp = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await?;

        // The refresh token may be rotated along with the ID token.
        let grant: TokenGrant = checked(resp, "token refresh").await?.json().await?;
        Ok(session.apply(grant))
    }

    pub async fn get_user_id(&self) -> Result<String> {
        let token = self.get_id_token().await?;
        user_id_from_jwt(&token)
    }
}

async fn checked(resp: Response, action: &str) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!("{} failed: {} - {}", action, status, firebase_error_message(&body)))
}

/// Firebase wraps failures as `{"error": {"message": "EMAIL_EXISTS", ...}}`.
/// Falls back to the raw body.
fn firebase_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Pull the Firebase user ID out of an ID token's claims.
fn user_id_from_jwt(token: &str) -> Result<String> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(anyhow!("Invalid JWT format"));
    };

    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let claims: Value = serde_json::from_slice(&decoded)?;
    ["user_id", "sub"]
        .iter()
        .find_map(|claim| claims[claim].as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No user_id or sub claim in token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_claims(claims: &Value) -> String {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("eyJhbGciOiJSUzI1NiJ9.{payload}.signature")
    }

    #[test]
    fn user_id_claim() {
        let token = jwt_with_claims(&json!({"user_id": "u-123", "sub": "other"}));
        assert_eq!(user_id_from_jwt(&token).unwrap(), "u-123");
    }

    #[test]
    fn falls_back_to_sub() {
        let token = jwt_with_claims(&json!({"sub": "s-9"}));
        assert_eq!(user_id_from_jwt(&token).unwrap(), "s-9");
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(user_id_from_jwt("not-a-jwt").is_err());
        assert!(user_id_from_jwt("a.b.c.d").is_err());
        let token = jwt_with_claims(&json!({"email": "x@y.z"}));
        assert!(user_id_from_jwt(&token).is_err());
    }

    #[test]
    fn grant_parses_both_endpoint_shapes() {
        let sign_in: TokenGrant = serde_json::from_value(json!({
            "idToken": "id", "refreshToken": "r", "expiresIn": "3600", "localId": "u1"
        }))
        .unwrap();
        assert_eq!(sign_in.user_id.as_deref(), Some("u1"));

        let refresh: TokenGrant = serde_json::from_value(json!({
            "id_token": "id2", "refresh_token": "r2", "expires_in": "3600", "user_id": "u1"
        }))
        .unwrap();
        assert_eq!(refresh.id_token, "id2");
        assert_eq!(refresh.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn session_rotates_refresh_token() {
        let mut session = Session {
            refresh_token: "old".to_string(),
            id_token: None,
        };
        let token = session.apply(TokenGrant {
            id_token: "fresh".to_string(),
            refresh_token: "new".to_string(),
            expires_in: "3600".to_string(),
            user_id: None,
        });
        assert_eq!(token, "fresh");
        assert_eq!(session.refresh_token, "new");
        assert!(session.id_token.unwrap().is_fresh());
    }

    #[test]
    fn error_message_extraction() {
        let body = r#"{"error": {"code": 400, "message": "EMAIL_EXISTS"}}"#;
        assert_eq!(firebase_error_message(body), "EMAIL_EXISTS");
        assert_eq!(firebase_error_message("gateway timeout"), "gateway timeout");
    }
}
