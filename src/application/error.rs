use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use geographer_api_types::RevalidationResponse;
use thiserror::Error;

use crate::{application::repos::RepoError, domain::error::DomainError, infra::error::InfraError};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("revalidation secret is not configured")]
    Misconfigured,
    #[error("invalid revalidation secret")]
    Unauthorized,
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("reference lookup failed")]
    UpstreamQuery(#[source] RepoError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<RepoError> for AppError {
    fn from(error: RepoError) -> Self {
        Self::UpstreamQuery(error)
    }
}

impl AppError {
    pub fn invalid_json(err: impl std::fmt::Display) -> Self {
        Self::InvalidJson(err.to_string())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Domain(DomainError::MalformedPayload { .. }) | AppError::InvalidJson(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::UpstreamQuery(_) | AppError::Infra(_) | AppError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message returned to the caller. Never includes upstream detail.
    pub fn presentation_message(&self) -> String {
        match self {
            AppError::Misconfigured => {
                "Missing SANITY_REVALIDATE_SECRET environment variable".to_string()
            }
            AppError::Unauthorized => "Invalid revalidation secret".to_string(),
            AppError::InvalidJson(_) => "Invalid JSON payload".to_string(),
            AppError::Domain(DomainError::MalformedPayload { message }) => message.clone(),
            AppError::UpstreamQuery(_) => "Failed to query content store".to_string(),
            AppError::Infra(_) | AppError::Unexpected(_) => {
                "Unexpected error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = RevalidationResponse::rejected(self.presentation_message());
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
