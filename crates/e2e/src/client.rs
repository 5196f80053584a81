use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use iou_api::{AuthTokenResponse, SignupRequest};
use iou_api_client::ApiClient;

use crate::fixtures;

/// Holds connection info for a test run.
pub struct TestContext {
    pub api: ApiClient,
}

/// A signed-up test user with credentials.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl TestContext {
    pub fn new(base_url: String) -> Self {
        Self {
            api: ApiClient::with_client(reqwest::Client::new(), &base_url),
        }
    }

    /// Build a full API URL from a path like `/health`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.api.base_url(), path)
    }

    /// Sign up a fresh user with a unique username.
    pub async fn signup_user(&self) -> Result<TestUser> {
        let username = fixtures::unique_username();
        let display_name = format!("E2E {username}");
        let password = fixtures::PASSWORD.to_string();

        let resp = self
            .api
            .post_json_raw(
                "/auth/signup",
                &SignupRequest {
                    username: username.clone(),
                    display_name: display_name.clone(),
                    password: password.clone(),
                    device_name: Some("e2e".into()),
                },
            )
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("signup failed ({status}): {body}"));
        }
        let tokens: AuthTokenResponse = resp.json().await.context("signup response")?;
        tracing::debug!(%username, "signed up e2e user");

        Ok(TestUser {
            username,
            display_name,
            password,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// A typed client authenticated as `user`.
    pub fn client_for(&self, user: &TestUser) -> Result<ApiClient> {
        let mut api = ApiClient::new(self.api.base_url(), Duration::from_secs(30))?;
        api.set_auth(user.access_token.clone());
        Ok(api)
    }

    // ── HTTP convenience methods (delegate to ApiClient) ──────────────

    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self.api.reqwest_client().get(self.url(path)).send().await?)
    }

    pub async fn get_authed(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self.api.get_with_auth(path, token).await?)
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        Ok(self.api.post_json_raw(path, body).await?)
    }

    pub async fn post_json_authed<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self.api.post_json_with_auth(path, token, body).await?)
    }

    pub async fn put_json_authed<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self.api.put_json_with_auth(path, token, body).await?)
    }

    pub async fn delete_authed(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self.api.delete_with_auth(path, token).await?)
    }
}
