//! Typed HTTP client for the IOU tracker API.

pub mod client;
pub mod error;
pub mod retry;

pub use client::ApiClient;
pub use error::ClientError;
pub use iou_api;
pub use retry::RetryConfig;
