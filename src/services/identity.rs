//! Account creation through the identity provider's admin API.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::SupabaseConfig;
use crate::{Error, Result};

/// Sign-up request body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Validated sign-up fields.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub username: String,
}

impl SignupRequest {
    pub fn validate(self) -> Result<NewAccount> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (present(self.email), present(self.password), present(self.username)) {
            (Some(email), Some(password), Some(username)) => Ok(NewAccount {
                email: email.trim().to_string(),
                password,
                username: username.trim().to_string(),
            }),
            _ => Err(Error::Validation(
                "Email, password, and username are required.".to_string(),
            )),
        }
    }
}

/// Admin client for the identity API.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    config: SupabaseConfig,
}

impl IdentityClient {
    pub fn new(client: Client, config: SupabaseConfig) -> Self {
        Self { client, config }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.config.url.as_deref(), self.config.service_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url.trim_end_matches('/'), key)),
            _ => Err(Error::not_configured(
                "Identity service is not configured",
                "Please add SUPABASE_URL and SUPABASE_SERVICE_KEY to your backend .env file.",
            )),
        }
    }

    /// Fail early when the admin credentials are missing.
    pub fn ensure_configured(&self) -> Result<()> {
        self.credentials().map(|_| ())
    }

    /// Create a confirmed user. Returns the provider's user object.
    pub async fn create_user(&self, account: &NewAccount) -> Result<Value> {
        let (url, key) = self.credentials()?;

        let response = self
            .client
            .post(format!("{}/auth/v1/admin/users", url))
            .header("apikey", key)
            .bearer_auth(key)
            .json(&json!({
                "email": account.email,
                "password": account.password,
                "email_confirm": true,
                "user_metadata": { "username": account.username }
            }))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Identity request failed");
                Error::Internal("Internal server error during signup.".to_string())
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|k| body.get(*k).and_then(Value::as_str))
                .unwrap_or("Failed to create user")
                .to_string();
            error!(%status, %message, "Identity provider rejected signup");
            return Err(Error::Identity(message));
        }

        // The admin API returns the user either bare or wrapped in `user`.
        let user = body.get("user").cloned().unwrap_or(body);
        info!(user_id = ?user.get("id"), "User created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_requires_every_field() {
        let full = SignupRequest {
            email: Some(" a@b.test ".into()),
            password: Some("secret".into()),
            username: Some("ada".into()),
        };
        let account = full.clone().validate().unwrap();
        assert_eq!(account.email, "a@b.test");

        let missing = SignupRequest {
            username: Some("   ".into()),
            ..full
        };
        assert!(matches!(missing.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_unconfigured_client() {
        let client = IdentityClient::new(Client::new(), SupabaseConfig::default());
        assert!(matches!(
            client.ensure_configured(),
            Err(Error::NotConfigured { .. })
        ));
    }
}
