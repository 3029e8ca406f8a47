//! Request extractors that reject with `AppError`
//!
//! axum's stock `Json`, `Path` and `Query` answer bad input with a plain-text
//! body. These wrappers run the same extraction but turn the rejection into
//! the API's `{"error":{code,message}}` body with a 400 status.

use axum::extract::{FromRequest, FromRequestParts};
use pagemark_common::errors::AppError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
