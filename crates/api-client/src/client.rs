use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use iou_api::signup::SignupForm;
use iou_api::*;

use crate::error::{ClientError, Result};
use crate::retry::{RetryConfig, retry_post};

/// Typed HTTP client for the IOU tracker API.
///
/// Provides high-level methods for each API endpoint (using the stored auth
/// token) and low-level `*_with_auth` methods for callers that need per-request
/// auth (e.g. E2E tests exercising multiple users).
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ApiClient {
    /// Create a new client with the given base URL and timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    pub fn set_auth(&mut self, token: String) {
        self.auth_token = Some(token);
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Access the underlying `reqwest::Client`.
    pub fn reqwest_client(&self) -> &reqwest::Client {
        &self.client
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn token(&self) -> Result<&str> {
        self.auth_token.as_deref().ok_or(ClientError::MissingAuth)
    }

    // ── Health ────────────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(self.url("/health")).send().await?;
        parse_response(resp).await
    }

    // ── Auth ──────────────────────────────────────────────────────────────

    pub async fn signup(&self, req: &SignupRequest) -> Result<AuthTokenResponse> {
        let resp = self.post_json_raw("/auth/signup", req).await?;
        parse_response(resp).await
    }

    /// Submit a signup form, recording the outcome on the form.
    ///
    /// On success the new access token becomes this client's auth token.
    pub async fn signup_with_form(&mut self, form: &mut SignupForm) -> Result<AuthTokenResponse> {
        let req = form.submit()?;
        match self.signup(&req).await {
            Ok(tokens) => {
                form.succeed();
                self.set_auth(tokens.access_token.clone());
                Ok(tokens)
            }
            Err(e) => {
                let message = match &e {
                    ClientError::Api { errors, .. } if !errors.is_empty() => errors.join("\n"),
                    other => other.to_string(),
                };
                form.fail(message);
                Err(e)
            }
        }
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<AuthTokenResponse> {
        let resp = self.post_json_raw("/auth/login", req).await?;
        parse_response(resp).await
    }

    pub async fn refresh(&self, req: &RefreshRequest) -> Result<AuthTokenResponse> {
        let resp = self.post_json_raw("/auth/refresh", req).await?;
        parse_response(resp).await
    }

    pub async fn logout(&self, req: &LogoutRequest) -> Result<OkResponse> {
        let resp = self.post_json_raw("/auth/logout", req).await?;
        parse_response(resp).await
    }

    pub async fn logout_all(&self) -> Result<OkResponse> {
        let resp = self.post_with_auth("/auth/logout-all", self.token()?).await?;
        parse_response(resp).await
    }

    pub async fn me(&self) -> Result<UserResponse> {
        let resp = self.get_with_auth("/auth/me", self.token()?).await?;
        parse_response(resp).await
    }

    pub async fn devices(&self) -> Result<ListDevicesResponse> {
        let resp = self.get_with_auth("/auth/devices", self.token()?).await?;
        parse_response(resp).await
    }

    // ── Users & items ─────────────────────────────────────────────────────

    pub async fn get_user(&self, username: &str) -> Result<BasicUser> {
        let resp = self
            .get_with_auth(&format!("/users/{username}"), self.token()?)
            .await?;
        parse_response(resp).await
    }

    pub async fn list_items(&self) -> Result<ListItemsResponse> {
        let resp = self.client.get(self.url("/items")).send().await?;
        parse_response(resp).await
    }

    // ── IOUs ──────────────────────────────────────────────────────────────

    /// Unclaimed IOUs owed to the caller.
    pub async fn list_owed(&self, query: &IouListQuery) -> Result<IouListResponse> {
        let resp = self
            .client
            .get(self.url("/iou/owed"))
            .query(query)
            .bearer_auth(self.token()?)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn create_owed(&self, req: &CreateIouOwedRequest) -> Result<IouCreatedResponse> {
        let resp = self
            .post_json_with_auth("/iou/owed", self.token()?, req)
            .await?;
        parse_response(resp).await
    }

    pub async fn complete_owed(&self, iou_id: &str) -> Result<()> {
        let resp = self
            .client
            .put(self.url(&format!("/iou/owed/{iou_id}/complete")))
            .bearer_auth(self.token()?)
            .send()
            .await?;
        check_status(resp).await
    }

    /// Unclaimed IOUs the caller owes.
    pub async fn list_owe(&self, query: &IouListQuery) -> Result<IouListResponse> {
        let resp = self
            .client
            .get(self.url("/iou/owe"))
            .query(query)
            .bearer_auth(self.token()?)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn create_owe(&self, req: &CreateIouOweRequest) -> Result<IouCreatedResponse> {
        let resp = self
            .post_json_with_auth("/iou/owe", self.token()?, req)
            .await?;
        parse_response(resp).await
    }

    pub async fn complete_owe(&self, iou_id: &str, req: &CompleteIouOweRequest) -> Result<()> {
        let resp = self
            .put_json_with_auth(&format!("/iou/owe/{iou_id}/complete"), self.token()?, req)
            .await?;
        check_status(resp).await
    }

    // ── Requests ──────────────────────────────────────────────────────────

    pub async fn list_requests(&self, query: &RequestListQuery) -> Result<RequestListResponse> {
        let resp = self
            .client
            .get(self.url("/requests"))
            .query(query)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn get_request(&self, id: &str) -> Result<IouRequest> {
        let resp = self
            .client
            .get(self.url(&format!("/requests/{id}")))
            .send()
            .await?;
        parse_response(resp).await
    }

    /// Open a request, retrying only failures that precede server processing
    /// (connection errors, 502/503/504).
    pub async fn create_request(
        &self,
        req: &RequestDetailsBody,
        retry: &RetryConfig,
    ) -> Result<IouRequest> {
        let body = serde_json::to_value(req)?;
        let resp = retry_post(
            &self.client,
            &self.url("/requests"),
            Some(self.token()?),
            &body,
            retry,
        )
        .await?;
        parse_response(resp).await
    }

    pub async fn update_request(&self, id: &str, req: &RequestDetailsBody) -> Result<IouRequest> {
        let resp = self
            .put_json_with_auth(&format!("/requests/{id}"), self.token()?, req)
            .await?;
        parse_response(resp).await
    }

    pub async fn complete_request(
        &self,
        id: &str,
        req: &CompleteRequestBody,
    ) -> Result<IouRequest> {
        let resp = self
            .put_json_with_auth(&format!("/requests/{id}/complete"), self.token()?, req)
            .await?;
        parse_response(resp).await
    }

    pub async fn delete_request(&self, id: &str) -> Result<OkResponse> {
        let resp = self
            .delete_with_auth(&format!("/requests/{id}"), self.token()?)
            .await?;
        parse_response(resp).await
    }

    // ── Raw helpers (for E2E / advanced usage) ────────────────────────────

    /// Authenticated GET returning the raw response.
    pub async fn get_with_auth(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Authenticated POST (no body) returning the raw response.
    pub async fn post_with_auth(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Authenticated POST with JSON body returning the raw response.
    pub async fn post_json_with_auth<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    /// Authenticated PUT with JSON body returning the raw response.
    pub async fn put_json_with_auth<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    /// Authenticated DELETE returning the raw response.
    pub async fn delete_with_auth(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Unauthenticated POST with JSON body returning the raw response.
    pub async fn post_json_raw<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }
}

/// Turn a non-2xx response into [`ClientError::Api`].
async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::from_body(status.as_u16(), &body))
}

/// Parse an HTTP response: return the deserialized body on 2xx,
/// or the API error otherwise.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    Ok(error_for_status(resp).await?.json().await?)
}

/// Accept any 2xx response, ignoring its (empty) body.
async fn check_status(resp: reqwest::Response) -> Result<()> {
    error_for_status(resp).await.map(drop)
}
