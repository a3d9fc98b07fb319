//! Google sign-in over OAuth 2.0 / `OpenID` Connect.
//!
//! # Flow
//!
//! 1. Redirect to [`AUTHORIZE_URL`] with `scope=openid email profile`
//! 2. Google redirects back with an authorization code
//! 3. POST the code to [`TOKEN_URL`] for an access token
//! 4. GET [`USERINFO_URL`] with the access token

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{AuthError, IdentityProvider, ProviderIdentity};
use crate::config::OAuthProviderConfig;

pub const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

/// Google identity provider.
#[derive(Clone)]
pub struct GoogleProvider {
    inner: Arc<GoogleProviderInner>,
}

struct GoogleProviderInner {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    callback_url: String,
}

impl GoogleProvider {
    /// Create a provider for the registered OAuth client.
    #[must_use]
    pub fn new(config: &OAuthProviderConfig) -> Self {
        Self {
            inner: Arc::new(GoogleProviderInner {
                client: reqwest::Client::new(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                callback_url: config.callback_url.clone(),
            }),
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{AUTHORIZE_URL}?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope=openid%20email%20profile&\
            state={}",
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(&self.inner.callback_url),
            urlencoding::encode(state)
        )
    }

    async fn exchange(&self, code: &str) -> Result<ProviderIdentity, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", self.inner.callback_url.as_str()),
        ];

        let response = self.inner.client.post(TOKEN_URL).form(&params).send().await?;
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!("Token exchange failed: {text}")));
        }
        let token: TokenResponse = response.json().await?;

        let response = self
            .inner
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(AuthError::Provider(format!("Userinfo request failed: {status}")));
        }
        let info: UserInfo = response.json().await?;

        into_identity(info)
    }
}

fn into_identity(info: UserInfo) -> Result<ProviderIdentity, AuthError> {
    let email = info
        .email
        .ok_or_else(|| AuthError::Provider("no email in userinfo".to_owned()))?;
    if info.email_verified == Some(false) {
        return Err(AuthError::Provider(format!("email {email} is not verified")));
    }

    Ok(ProviderIdentity {
        name: info.name.unwrap_or_else(|| email.clone()),
        email,
        avatar_url: info.picture,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn provider() -> GoogleProvider {
        GoogleProvider::new(&OAuthProviderConfig {
            client_id: "1234.apps.googleusercontent.com".to_owned(),
            client_secret: SecretString::from("GOCSPX-aB3xY9mK2nL5pQ7rT0uW4zC6"),
            callback_url: "http://localhost:8080/auth/google/callback".to_owned(),
        })
    }

    #[test]
    fn test_authorization_url() {
        let url = url::Url::parse(&provider().authorization_url("abc123")).unwrap();
        assert_eq!(url.host_str(), Some("accounts.google.com"));

        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query["client_id"], "1234.apps.googleusercontent.com");
        assert_eq!(query["response_type"], "code");
        assert_eq!(
            query["redirect_uri"],
            "http://localhost:8080/auth/google/callback"
        );
        assert_eq!(query["scope"], "openid email profile");
        assert_eq!(query["state"], "abc123");
    }

    #[test]
    fn test_userinfo_to_identity() {
        let info: UserInfo = serde_json::from_str(
            r#"{"sub":"1","email":"pat@objectcomputing.com","email_verified":true,
                "name":"Pat Doe","picture":"https://lh3.googleusercontent.com/a/pat"}"#,
        )
        .unwrap();

        let identity = into_identity(info).unwrap();
        assert_eq!(identity.name, "Pat Doe");
        assert_eq!(identity.email, "pat@objectcomputing.com");
        assert_eq!(
            identity.avatar_url.as_deref(),
            Some("https://lh3.googleusercontent.com/a/pat")
        );
    }

    #[test]
    fn test_unverified_email_rejected() {
        let info: UserInfo =
            serde_json::from_str(r#"{"email":"pat@objectcomputing.com","email_verified":false}"#)
                .unwrap();
        assert!(matches!(into_identity(info), Err(AuthError::Provider(_))));
    }

    #[test]
    fn test_missing_name_falls_back_to_email() {
        let info: UserInfo = serde_json::from_str(r#"{"email":"pat@objectcomputing.com"}"#).unwrap();
        let identity = into_identity(info).unwrap();
        assert_eq!(identity.name, "pat@objectcomputing.com");
        assert!(identity.avatar_url.is_none());
    }
}
