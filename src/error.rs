use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("scrape error: {0}")]
    Scrape(#[from] vlr_scraper::ScrapeError),

    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("settlement error: {0}")]
    Settlement(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Scrape(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Settlement(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        // Internals stay in the log; the envelope carries a generic message.
        let message = match &self {
            AppError::Store(e) => {
                tracing::error!("store error: {}", e);
                "internal storage error".to_string()
            }
            AppError::Settlement(e) => {
                tracing::error!("settlement error: {}", e);
                "settlement error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_per_error_kind() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::BadRequest("matchUrl is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Scrape(vlr_scraper::ScrapeError::Status {
                url: "https://vlr.test/matches".into(),
                status: reqwest::StatusCode::FORBIDDEN,
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Settlement("endpoint unreachable".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn bad_request_keeps_its_message() {
        let err = AppError::BadRequest("matchUrl is required".into());
        assert_eq!(err.to_string(), "matchUrl is required");
    }
}
