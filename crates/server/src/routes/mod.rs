pub mod auth;
pub mod health;
pub mod ious;
pub mod items;
pub mod requests;
pub mod users;

use iou_api::{ServiceError, service};

use crate::error::ApiErr;

/// Current unix time in seconds.
pub fn now_unix() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Current time in the storage timestamp format.
pub(crate) fn now_timestamp() -> Result<String, ApiErr> {
    service::format_timestamp(now_unix()).map_err(ApiErr::from)
}

/// Keep the value of a successful validation, or record its messages.
pub(crate) fn collect<T>(errors: &mut Vec<String>, result: Result<T, ServiceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.extend(e.messages());
            None
        }
    }
}
