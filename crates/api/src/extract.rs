//! Request body extractor with the API's error shape.
//!
//! Axum's own `Json` rejects with plain-text 400/415/422 responses. [`AppJson`]
//! routes every rejection through [`AppError`] so malformed bodies, wrong
//! content types and missing fields all come back as `400 BAD_REQUEST`
//! in the usual `{ error, code }` envelope.

use axum::extract::FromRequest;

use crate::error::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
