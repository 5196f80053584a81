//! Shared API types, validation, crypto, and SQL builders for the IOU tracker.
//!
//! This crate is the **single source of truth** for all API request/response types.
//! The Axum server, the typed client, and the E2E suite all import them from here.
//! TypeScript types can be generated via `ts-rs` for the web frontend.
//!
//! To regenerate TypeScript types:
//!   cargo test -p iou-api --features ts -- export_typescript --nocapture

use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
pub mod crypto;
#[cfg(feature = "backend")]
pub mod db;
#[cfg(feature = "backend")]
pub mod service;
pub mod signup;

// ─── Auth ────────────────────────────────────────────────────────────────────

/// Username + password registration (`POST /api/auth/signup`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SignupRequest {
    pub username: String,
    pub display_name: String,
    pub password: String,
    /// Label for the refresh token issued to this device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

/// Username + password login.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

/// Returned on successful signup / login / refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub username: String,
    pub display_name: String,
}

/// Refresh token request.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request (invalidate refresh token).
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Full profile of the authenticated user, returned by `GET /api/auth/me`.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct UserResponse {
    pub username: String,
    pub display_name: String,
    pub created_time: String,
}

/// Public view of a user, embedded in IOU listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct BasicUser {
    pub username: String,
    pub display_name: String,
}

/// One refresh token (logged-in device) of the authenticated user.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct DeviceResponse {
    pub device_name: String,
    pub created_time: String,
    pub expiry_time: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ListDevicesResponse {
    pub devices: Vec<DeviceResponse>,
}

/// Generic success response for operations that don't return data.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct OkResponse {
    pub ok: bool,
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// Something that can be owed (coffee, cake, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Item {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ListItemsResponse {
    pub items: Vec<Item>,
}

// ─── IOUs ────────────────────────────────────────────────────────────────────

/// Body of `POST /api/iou/owed` — record that `username` owes the caller.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CreateIouOwedRequest {
    pub username: String,
    pub item: String,
    pub proof: String,
}

/// Body of `POST /api/iou/owe` — record that the caller owes `username`.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CreateIouOweRequest {
    pub username: String,
    pub item: String,
}

/// Body of `PUT /api/iou/owe/:iouID/complete`.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CompleteIouOweRequest {
    pub proof: String,
}

/// Pagination for IOU listings. Defaults: `start = 0`, `limit = 25`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct IouListQuery {
    pub start: Option<u64>,
    pub limit: Option<u64>,
}

/// An IOU with item and user details expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Iou {
    pub id: String,
    pub item: Item,
    pub giver: BasicUser,
    pub receiver: BasicUser,
    pub parent_request: Option<String>,
    pub proof_of_debt: Option<String>,
    pub proof_of_completion: Option<String>,
    pub created_time: String,
    pub claimed_time: Option<String>,
    pub is_claimed: bool,
}

/// Returned by `GET /api/iou/owed` and `GET /api/iou/owe`.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct IouListResponse {
    pub iou: Vec<Iou>,
}

/// Returned by `POST /api/iou/owed` and `POST /api/iou/owe` — the new IOU id.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct IouCreatedResponse {
    pub iou: String,
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Body of `POST /api/requests` and `PUT /api/requests/:id`.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RequestDetailsBody {
    pub details: String,
}

/// Body of `PUT /api/requests/:id/complete`.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CompleteRequestBody {
    pub proof: String,
}

/// Query for `GET /api/requests`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RequestListQuery {
    pub author: Option<String>,
    /// Substring match on `details`.
    pub search: Option<String>,
    pub start: Option<u64>,
    pub limit: Option<u64>,
}

/// A standing ask, fulfillable by any user other than its author.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct IouRequest {
    pub id: String,
    pub author: String,
    pub completed_by: Option<String>,
    pub proof_of_completion: Option<String>,
    pub details: String,
    pub created_time: String,
    pub completion_time: Option<String>,
    pub is_completed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RequestListResponse {
    pub requests: Vec<IouRequest>,
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Framework-agnostic service error.
///
/// Validation failures may carry several messages (e.g. every unmet password
/// requirement); the other variants carry exactly one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("{}", .0.join("; "))]
    BadRequest(Vec<String>),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Single-message validation failure.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(vec![msg.into()])
    }

    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// All messages carried by the error.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::BadRequest(msgs) => msgs.clone(),
            Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Internal(m) => vec![m.clone()],
        }
    }
}

/// JSON error shape `{ "errors": [...] }` returned by all error responses.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ApiError {
    pub errors: Vec<String>,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        Self {
            errors: e.messages(),
        }
    }
}


// ─── TypeScript generation ───────────────────────────────────────────────────

#[cfg(all(test, feature = "ts"))]
mod ts_export {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use ts_rs::TS;

    /// Run with: cargo test -p iou-api --features ts -- export_typescript --nocapture
    #[test]
    fn export_typescript() {
        let out_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../web/src/api-types.generated.ts");

        let cfg = ts_rs::Config::new().with_large_int("number");
        let mut parts: Vec<String> = Vec::new();
        parts.push("// AUTO-GENERATED by iou-api — DO NOT EDIT".to_string());
        parts.push(
            "// Regenerate with: cargo test -p iou-api --features ts -- export_typescript"
                .to_string(),
        );
        parts.push(String::new());

        // Structs: `type X = {...}` → `export interface X {...}`
        macro_rules! collect_ts {
            ($($t:ty),+ $(,)?) => {
                $(
                    let decl = <$t>::decl(&cfg);
                    let decl = if decl.contains(" = {") {
                        decl
                            .replacen("type ", "export interface ", 1)
                            .replace(" = {", " {")
                            .trim_end_matches(';')
                            .to_string()
                    } else {
                        decl
                            .replacen("type ", "export type ", 1)
                            .trim_end_matches(';')
                            .to_string()
                    };
                    parts.push(decl);
                    parts.push(String::new());
                )+
            };
        }

        collect_ts!(
            // Auth
            SignupRequest,
            LoginRequest,
            AuthTokenResponse,
            RefreshRequest,
            LogoutRequest,
            UserResponse,
            BasicUser,
            DeviceResponse,
            ListDevicesResponse,
            OkResponse,
            // Items
            Item,
            ListItemsResponse,
            // IOUs
            CreateIouOwedRequest,
            CreateIouOweRequest,
            CompleteIouOweRequest,
            IouListQuery,
            Iou,
            IouListResponse,
            IouCreatedResponse,
            // Requests
            RequestDetailsBody,
            CompleteRequestBody,
            RequestListQuery,
            IouRequest,
            RequestListResponse,
            // Signup form
            signup::PasswordRequirements,
            // Health
            HealthResponse,
            ApiError,
        );

        let content = parts.join("\n");

        if let Some(parent) = out_dir.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let mut file = std::fs::File::create(&out_dir)
            .unwrap_or_else(|e| panic!("Failed to create {}: {}", out_dir.display(), e));
        file.write_all(content.as_bytes())
            .unwrap_or_else(|e| panic!("Failed to write {}: {}", out_dir.display(), e));

        println!("Generated TypeScript types at: {}", out_dir.display());
    }
}
