//! HTTP-facing error type. Domain modules keep their own `thiserror` enums;
//! this one wraps them and decides status codes and the JSON error body.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::chat::ChatError;
use crate::disease::DiseaseError;
use crate::input::InputError;
use crate::market::MarketError;
use crate::weather::WeatherError;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Disease(#[from] DiseaseError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    /// Request could not be extracted (bad JSON, query or path).
    #[error("{message}")]
    Rejected {
        status: StatusCode,
        code: &'static str,
        message: String,
    },

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AdvisorError {
    fn from(r: JsonRejection) -> Self {
        let (status, code) = match &r {
            JsonRejection::MissingJsonContentType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            JsonRejection::JsonSyntaxError(_) => (StatusCode::BAD_REQUEST, "MALFORMED_JSON"),
            _ if r.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE")
            }
            _ => (StatusCode::BAD_REQUEST, "MALFORMED_BODY"),
        };
        AdvisorError::Rejected {
            status,
            code,
            message: r.body_text(),
        }
    }
}

impl From<QueryRejection> for AdvisorError {
    fn from(r: QueryRejection) -> Self {
        AdvisorError::Rejected {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_QUERY",
            message: r.body_text(),
        }
    }
}

impl From<PathRejection> for AdvisorError {
    fn from(r: PathRejection) -> Self {
        AdvisorError::Rejected {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_PATH",
            message: r.body_text(),
        }
    }
}

pub type AdvisorResult<T> = Result<T, AdvisorError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AdvisorError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AdvisorError::Input(InputError::OutOfRange { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INPUT_OUT_OF_RANGE")
            }
            AdvisorError::Input(InputError::NotFinite { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INPUT_NOT_FINITE")
            }
            AdvisorError::Market(MarketError::UnknownCrop(_)) => {
                (StatusCode::NOT_FOUND, "UNKNOWN_CROP")
            }
            AdvisorError::Market(MarketError::BadPeriod(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_PERIOD")
            }
            AdvisorError::Weather(WeatherError::UnknownCity(_)) => {
                (StatusCode::NOT_FOUND, "UNKNOWN_CITY")
            }
            AdvisorError::Weather(WeatherError::Provider(_)) => {
                (StatusCode::BAD_GATEWAY, "WEATHER_UNAVAILABLE")
            }
            AdvisorError::Disease(DiseaseError::InvalidImage(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_IMAGE")
            }
            AdvisorError::Disease(DiseaseError::Backend(_)) => {
                (StatusCode::BAD_GATEWAY, "CLASSIFIER_ERROR")
            }
            AdvisorError::Chat(_) => (StatusCode::BAD_REQUEST, "BAD_MESSAGE"),
            AdvisorError::Rejected { status, code, .. } => (*status, *code),
            AdvisorError::Disease(DiseaseError::NoTemplates) | AdvisorError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for AdvisorError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, code, "request failed");
        }

        let field = match &self {
            AdvisorError::Input(e) => Some(e.field().to_string()),
            _ => None,
        };
        // Don't leak internals in 500 bodies.
        let message = match &self {
            AdvisorError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code,
                message,
                field,
            },
        };
        (status, Json(body)).into_response()
    }
}
