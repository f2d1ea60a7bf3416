use std::error::Error as StdError;

use actix_web::error::ResponseError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use thiserror::Error;

use crate::errors::{DomainError, ErrorCode};

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Text sent to a client when its command failed for infrastructure reasons.
pub const GENERIC_CLIENT_FAILURE: &str = "Server error, please retry";

#[derive(Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {detail}")]
    Validation { code: ErrorCode, detail: String },
    #[error("Conflict: {detail}")]
    Conflict { code: ErrorCode, detail: String },
    #[error("Not found: {detail}")]
    NotFound { code: ErrorCode, detail: String },
    #[error("Store unavailable: {detail}")]
    StoreUnavailable { detail: String, source: BoxedSource },
    #[error("Data corruption: {detail}")]
    DataCorruption { detail: String, source: BoxedSource },
    #[error("Internal error: {detail}")]
    Internal {
        code: ErrorCode,
        detail: String,
        source: BoxedSource,
    },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { code, .. } => *code,
            AppError::Conflict { code, .. } => *code,
            AppError::NotFound { code, .. } => *code,
            AppError::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
            AppError::DataCorruption { .. } => ErrorCode::DataCorruption,
            AppError::Internal { code, .. } => *code,
            AppError::Config { .. } => ErrorCode::ConfigError,
        }
    }

    fn detail(&self) -> String {
        match self {
            AppError::Validation { detail, .. }
            | AppError::Conflict { detail, .. }
            | AppError::NotFound { detail, .. }
            | AppError::StoreUnavailable { detail, .. }
            | AppError::DataCorruption { detail, .. }
            | AppError::Internal { detail, .. }
            | AppError::Config { detail } => detail.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DataCorruption { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure is the client's fault and safe to echo back verbatim.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. } | AppError::Conflict { .. } | AppError::NotFound { .. }
        )
    }

    /// Text for an `error` event addressed to the issuing connection only.
    pub fn client_message(&self) -> String {
        if self.is_client_error() {
            self.detail()
        } else {
            GENERIC_CLIENT_FAILURE.to_string()
        }
    }

    pub fn invalid(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Validation {
            code,
            detail: detail.into(),
        }
    }

    pub fn not_your_turn() -> Self {
        Self::invalid(ErrorCode::NotYourTurn, "Not your turn!")
    }

    pub fn invalid_card_index() -> Self {
        Self::invalid(ErrorCode::InvalidCardIndex, "Invalid card index")
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::invalid(ErrorCode::BadRequest, detail)
    }

    pub fn conflict(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            detail: detail.into(),
        }
    }

    pub fn not_found(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            detail: detail.into(),
        }
    }

    pub fn store_unavailable(
        detail: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::StoreUnavailable {
            detail: detail.into(),
            source: Box::new(source),
        }
    }

    pub fn internal(
        code: ErrorCode,
        detail: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Internal {
            code,
            detail: detail.into(),
            source: Box::new(source),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    fn humanize_code(code: &str) -> String {
        code.split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::DuplicatePlayer(_) => {
                AppError::conflict(ErrorCode::DuplicatePlayer, err.to_string())
            }
            DomainError::UnknownPlayer(_) => {
                AppError::not_found(ErrorCode::UnknownPlayer, err.to_string())
            }
            DomainError::NoPlayers => AppError::invalid(ErrorCode::NoPlayers, err.to_string()),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::store_unavailable(format!("redis error: {err}"), err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::DataCorruption {
            detail: format!("json error: {err}"),
            source: Box::new(err),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        let code = self.code().as_str();

        let problem_details = ProblemDetails {
            type_: format!("https://dealroom.local/errors/{code}"),
            title: Self::humanize_code(code),
            status: status.as_u16(),
            detail: self.detail(),
            code: code.to_string(),
        };

        HttpResponse::build(status)
            .content_type("application/problem+json")
            .json(problem_details)
    }
}
