pub mod analytics;
pub mod calendar;
pub mod diagnostics;
pub mod files;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod tasks;

pub use analytics::*;
pub use calendar::*;
pub use diagnostics::*;
pub use files::*;
pub use health::*;
pub use messages::*;
pub use notifications::*;
pub use tasks::*;

use axum::{http::StatusCode, Json};
use tracing::error;

use crate::db::StoreError;
use crate::models::ErrorResponse;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(status, error)))
}

pub(crate) fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::InvalidInput(msg) => api_error(StatusCode::BAD_REQUEST, msg),
        other => {
            error!("Store operation failed: {}", other);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}
