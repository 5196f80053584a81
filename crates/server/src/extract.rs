//! Body and query extractors whose rejections use the `{"errors": [...]}` shape.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiErr;

/// `axum::Json` with malformed bodies reported as `400` [`ApiErr`]s.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiErr))]
pub struct ValidJson<T>(pub T);

/// `axum::extract::Query` with bad parameters reported as `400` [`ApiErr`]s.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiErr))]
pub struct ValidQuery<T>(pub T);
