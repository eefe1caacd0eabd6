//! Error handling for the Ant Defoliation Monitor
//!
//! Provides consistent error responses in Portuguese and English

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::PipelineError;
use thiserror::Error;

use crate::ingest::IngestError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_pt: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The selection matched no observations
    #[error("No data for selection: {0}")]
    NoData(String),

    // Pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_pt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::Validation {
                field,
                message,
                message_pt,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_pt: message_pt.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_pt: format!("Dados inválidos: {}", msg),
                    field: None,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_pt: format!("{} não encontrado", resource),
                    field: None,
                },
            ),
            AppError::NoData(selection) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NO_DATA".to_string(),
                    message_en: format!("No observations for {}", selection),
                    message_pt: format!("Sem observações para {}", selection),
                    field: None,
                },
            ),
            AppError::Pipeline(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "PIPELINE_ERROR".to_string(),
                    message_en: err.to_string(),
                    message_pt: format!("Erro no processamento: {}", err),
                    field: None,
                },
            ),
            AppError::Ingest(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INGEST_ERROR".to_string(),
                    message_en: err.to_string(),
                    message_pt: format!("Erro ao carregar dados: {}", err),
                    field: None,
                },
            ),
            AppError::Export(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "EXPORT_ERROR".to_string(),
                    message_en: format!("Export failed: {}", msg),
                    message_pt: format!("Falha na exportação: {}", msg),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message_en: format!("Configuration error: {}", msg),
                    message_pt: format!("Erro de configuração: {}", msg),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_pt: "Erro interno do servidor".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_pt: "Erro interno do servidor".to_string(),
                    field: None,
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: format!("Invalid query parameters: {}", errors),
            message_pt: format!("Parâmetros inválidos: {}", field),
            field,
        }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
