use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{AppError, ErrorReport};
use crate::application::repos::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const UPSTREAM: &str = "upstream_error";
    pub const UPSTREAM_TIMEOUT: &str = "upstream_timeout";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
}

/// JSON error for the content read routes.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: &'static str) -> Self {
        Self {
            status,
            code,
            message,
            report: ErrorReport::from_message("infra::http::content", status, message),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, "Document not found")
    }

    fn with_report(mut self, report: ErrorReport) -> Self {
        self.report = report;
        self
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        let (status, code, message) = match &error {
            AppError::UpstreamQuery(RepoError::Timeout) => (
                StatusCode::GATEWAY_TIMEOUT,
                codes::UPSTREAM_TIMEOUT,
                "Content store timed out",
            ),
            AppError::UpstreamQuery(_) => (
                StatusCode::BAD_GATEWAY,
                codes::UPSTREAM,
                "Content store request failed",
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL,
                "Unexpected error occurred",
            ),
        };
        let report = ErrorReport::from_error("infra::http::content", status, &error);
        Self::new(status, code, message).with_report(report)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_map_to_gateway_statuses() {
        let timeout = ApiError::from(AppError::UpstreamQuery(RepoError::Timeout));
        assert_eq!(timeout.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.code, codes::UPSTREAM_TIMEOUT);

        let status = ApiError::from(AppError::UpstreamQuery(RepoError::Status {
            status: 503,
            message: "unavailable".to_string(),
        }));
        assert_eq!(status.status, StatusCode::BAD_GATEWAY);
        assert_eq!(status.code, codes::UPSTREAM);
        assert_eq!(status.report.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn other_errors_are_internal() {
        let err = ApiError::from(AppError::unexpected("boom"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, codes::INTERNAL);
        assert!(err.report.messages[0].contains("boom"));
    }

    #[test]
    fn not_found_body_carries_code() {
        let response = ApiError::not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }
}
