use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub issue: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, issue: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            issue: issue.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SharpError {
    #[error("question {question_id:?} has unsupported type {tag:?}")]
    UnsupportedVariant { question_id: String, tag: String },
    #[error("{} field(s) incomplete", .0.len())]
    ValidationIncomplete(Vec<ValidationIssue>),
    #[error("request failed: {message}")]
    NetworkFailure { status: Option<u16>, message: String },
    #[error("no bearer token available")]
    Unauthenticated,
    #[error("operation cancelled")]
    Cancelled,
    #[error("question index {index} out of range for {len} question(s)")]
    QuestionOutOfRange { index: usize, len: usize },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SharpError {
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            SharpError::ValidationIncomplete(issues) => issues,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for SharpError {
    fn from(err: reqwest::Error) -> Self {
        SharpError::NetworkFailure {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

pub type Result<T, E = SharpError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ValidationIssue>,
    pub request_id: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Vec<ValidationIssue>,
    pub request_id: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: Vec::new(),
            request_id: request_id.into(),
        }
    }

    pub fn with_details(mut self, details: Vec<ValidationIssue>) -> Self {
        self.details = details;
        self
    }

    pub fn unauthorized(request_id: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "missing or invalid bearer token", request_id)
    }

    pub fn forbidden(request_id: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", "access denied", request_id)
    }

    pub fn not_found(what: &str, request_id: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{what} not found"), request_id)
    }

    pub fn from_model(err: SharpError, request_id: impl Into<String>) -> Self {
        match err {
            SharpError::ValidationIncomplete(issues) => Self::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "quiz validation failed",
                request_id,
            )
            .with_details(issues),
            SharpError::UnsupportedVariant { question_id, tag } => Self::new(
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_VARIANT",
                format!("question {question_id} has unsupported type {tag:?}"),
                request_id,
            ),
            other => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                other.to_string(),
                request_id,
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let payload = ErrorBody {
            error: ErrorPayload {
                code: self.code.to_string(),
                message: self.message,
                details: self.details,
                request_id: self.request_id,
            },
        };
        (self.status, Json(payload)).into_response()
    }
}
