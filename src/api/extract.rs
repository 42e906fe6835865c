//! Request extractors whose rejections go through `ApiError`, so malformed
//! bodies and query strings get the same `{"detail": ...}` shape as every
//! other failure.

use axum::extract::{FromRequest, FromRequestParts};

use crate::api::error::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);
