//! Shared business logic — framework-agnostic pure functions.
//!
//! Route handlers stay thin adapters: they extract, call these validators,
//! run the matching `db` builder, and shape the response.

use crate::signup::PasswordRequirements;
use crate::{AuthTokenResponse, ServiceError};

// ─── Validation ─────────────────────────────────────────────────────────────

pub const USERNAME_MAX_LEN: usize = 16;
pub const DISPLAY_NAME_MAX_LEN: usize = 32;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const DEVICE_NAME_MAX_LEN: usize = 30;
pub const DEFAULT_DEVICE_NAME: &str = "unknown";
pub const PROOF_MAX_LEN: usize = 255;
pub const REQUEST_PROOF_MAX_LEN: usize = 200;
pub const DETAILS_MAX_LEN: usize = 50;

pub const DEFAULT_PAGE_LIMIT: u64 = 25;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Validate and normalize a username. Returns the trimmed username.
pub fn validate_username(username: &str) -> Result<String, ServiceError> {
    let trimmed = username.trim();
    if trimmed.is_empty() || trimmed.chars().count() > USERNAME_MAX_LEN {
        return Err(ServiceError::bad_request(format!(
            "username must be 1-{USERNAME_MAX_LEN} characters"
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ServiceError::bad_request(
            "username may only contain letters, digits, '_', '-' and '.'",
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate and normalize a display name. Returns the trimmed name.
pub fn validate_display_name(display_name: &str) -> Result<String, ServiceError> {
    let trimmed = display_name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > DISPLAY_NAME_MAX_LEN {
        return Err(ServiceError::bad_request(format!(
            "display_name must be 1-{DISPLAY_NAME_MAX_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate a new password. Reports every unmet requirement at once.
pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    let mut errors: Vec<String> = PasswordRequirements::check(password)
        .unmet()
        .iter()
        .map(|r| r.message().to_string())
        .collect();
    if password.chars().count() > PASSWORD_MAX_LEN {
        errors.push(format!(
            "Needs to be at most {PASSWORD_MAX_LEN} characters"
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(errors))
    }
}

/// Validate an optional device label, falling back to `"unknown"`.
pub fn validate_device_name(device_name: Option<&str>) -> Result<String, ServiceError> {
    let trimmed = device_name.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(DEFAULT_DEVICE_NAME.to_string());
    }
    if trimmed.chars().count() > DEVICE_NAME_MAX_LEN {
        return Err(ServiceError::bad_request(format!(
            "device_name must be at most {DEVICE_NAME_MAX_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_text(field: &str, value: &str, max: usize) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::bad_request(format!(
            "\"{field}\" is not allowed to be empty"
        )));
    }
    if trimmed.chars().count() > max {
        return Err(ServiceError::bad_request(format!(
            "\"{field}\" must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate proof of a debt or of an IOU's completion.
pub fn validate_proof(proof: &str) -> Result<String, ServiceError> {
    validate_text("proof", proof, PROOF_MAX_LEN)
}

/// Validate proof that a request was fulfilled.
pub fn validate_request_proof(proof: &str) -> Result<String, ServiceError> {
    validate_text("proof", proof, REQUEST_PROOF_MAX_LEN)
}

/// Validate request details.
pub fn validate_details(details: &str) -> Result<String, ServiceError> {
    validate_text("details", details, DETAILS_MAX_LEN)
}

/// Validate an item id (existence is checked against the catalogue separately).
pub fn validate_item_id(item: &str) -> Result<String, ServiceError> {
    validate_text("item", item, 64)
}

/// Validate the other party of an IOU: a well-formed username that isn't the caller.
pub fn validate_counterparty(username: &str, caller: &str) -> Result<String, ServiceError> {
    if username.trim().is_empty() {
        return Err(ServiceError::bad_request(
            "\"username\" is not allowed to be empty",
        ));
    }
    let username = validate_username(username)?;
    if username == caller {
        return Err(ServiceError::bad_request(
            "cannot create an IOU with yourself",
        ));
    }
    Ok(username)
}

/// Resolve paging parameters: `start` defaults to 0, `limit` to 25 and is clamped to 1-100.
pub fn page(start: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    (start.unwrap_or(0), limit)
}

// ─── Timestamps ─────────────────────────────────────────────────────────────

/// Storage format for every timestamp column (UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a unix timestamp in [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(unix: u64) -> Result<String, ServiceError> {
    let dt = i64::try_from(unix)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| ServiceError::Internal("invalid timestamp".into()))?;
    Ok(dt.format(TIMESTAMP_FORMAT).to_string())
}

// ─── Auth Token Resolution ──────────────────────────────────────────────────

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn resolve_bearer(header: Option<&str>) -> Result<&str, ServiceError> {
    header
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("Not authenticated".into()))
}

// ─── Token Bundle ───────────────────────────────────────────────────────────

/// Pre-computed token bundle returned by [`prepare_token_bundle`].
///
/// The caller only needs to insert the refresh token row and return
/// `response`.
pub struct TokenBundle {
    /// SHA-256 hash of the refresh token (stored in DB).
    pub token_hash: String,
    /// Creation time column value.
    pub created_time: String,
    /// Expiry time column value.
    pub expiry_time: String,
    /// Ready-to-return API response.
    pub response: AuthTokenResponse,
}

/// Build a [`TokenBundle`] containing a JWT, refresh token, and the auth response.
pub fn prepare_token_bundle(
    jwt_secret: &str,
    username: &str,
    display_name: &str,
    now_unix: u64,
) -> Result<TokenBundle, ServiceError> {
    use crate::crypto;

    let access_token = crypto::sign_jwt(username, jwt_secret, now_unix);
    let refresh_token = crypto::generate_token()?;
    let token_hash = crypto::hash_token(&refresh_token);

    Ok(TokenBundle {
        token_hash,
        created_time: format_timestamp(now_unix)?,
        expiry_time: format_timestamp(now_unix + crypto::REFRESH_EXPIRY_SECS)?,
        response: AuthTokenResponse {
            access_token,
            refresh_token,
            expires_in: crypto::JWT_EXPIRY_SECS,
            username: username.to_string(),
            display_name: display_name.to_string(),
        },
    })
}

/// Fresh UUID v4 for IOU and request ids.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("  alice ").unwrap(), "alice");
        assert!(validate_username("a.b-c_1").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(16)).is_ok());
        assert!(validate_username(&"x".repeat(17)).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert_eq!(validate_display_name(" Alice A. ").unwrap(), "Alice A.");
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(&"x".repeat(33)).is_err());
    }

    #[test]
    fn password_errors_list_every_unmet_requirement() {
        assert!(validate_password("Secret!pw").is_ok());
        match validate_password("abc") {
            Err(ServiceError::BadRequest(errors)) => {
                assert_eq!(errors.len(), 3);
                assert_eq!(errors[0], "Needs to be at least 8 characters");
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
        match validate_password("abcdefgh!") {
            Err(ServiceError::BadRequest(errors)) => {
                assert_eq!(errors, vec!["Needs to have one upper-case character"]);
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
        assert!(validate_password(&format!("A!{}", "x".repeat(127))).is_err());
    }

    #[test]
    fn device_name_defaults_and_bounds() {
        assert_eq!(validate_device_name(None).unwrap(), "unknown");
        assert_eq!(validate_device_name(Some("  ")).unwrap(), "unknown");
        assert_eq!(validate_device_name(Some(" laptop ")).unwrap(), "laptop");
        assert!(validate_device_name(Some(&"d".repeat(31))).is_err());
    }

    #[test]
    fn text_fields_reject_empty_and_long() {
        assert!(validate_proof("").is_err());
        assert_eq!(validate_proof(" photo.jpg ").unwrap(), "photo.jpg");
        assert!(validate_request_proof(&"p".repeat(201)).is_err());
        assert!(validate_details(&"d".repeat(50)).is_ok());
        assert!(validate_details(&"d".repeat(51)).is_err());
        assert!(validate_item_id("").is_err());
    }

    #[test]
    fn counterparty_cannot_be_the_caller() {
        assert_eq!(validate_counterparty("bob", "alice").unwrap(), "bob");
        assert!(validate_counterparty("alice", "alice").is_err());
        assert!(validate_counterparty("", "alice").is_err());
    }

    #[test]
    fn paging_defaults_and_clamps() {
        assert_eq!(page(None, None), (0, 25));
        assert_eq!(page(Some(50), Some(10)), (50, 10));
        assert_eq!(page(None, Some(0)), (0, 1));
        assert_eq!(page(None, Some(1_000)), (0, 100));
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(resolve_bearer(Some("Bearer abc")).unwrap(), "abc");
        assert!(resolve_bearer(None).is_err());
        assert!(resolve_bearer(Some("Basic abc")).is_err());
        assert!(resolve_bearer(Some("Bearer ")).is_err());
    }

    #[test]
    fn timestamps_use_storage_format() {
        assert_eq!(format_timestamp(0).unwrap(), "1970-01-01 00:00:00");
    }

    #[test]
    fn token_bundle_expires_after_seven_days() {
        let bundle = prepare_token_bundle("secret", "alice", "Alice", 0).unwrap();
        assert_eq!(bundle.created_time, "1970-01-01 00:00:00");
        assert_eq!(bundle.expiry_time, "1970-01-08 00:00:00");
        assert_eq!(bundle.response.expires_in, 3600);
        assert_eq!(
            bundle.token_hash,
            crate::crypto::hash_token(&bundle.response.refresh_token)
        );
        assert_eq!(
            crate::crypto::verify_jwt(&bundle.response.access_token, "secret", 0).unwrap(),
            "alice"
        );
    }
}
