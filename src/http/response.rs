//! Error-to-response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, ModuleError};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotRunning | AppError::AlreadyRunning | AppError::InstanceConflict => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

impl IntoResponse for ModuleError {
    fn into_response(self) -> Response {
        let status = match &self {
            ModuleError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ModuleError::Inactive(_) => StatusCode::SERVICE_UNAVAILABLE,
            ModuleError::Transport(_) => StatusCode::BAD_GATEWAY,
            ModuleError::AlreadyInitialized(_) | ModuleError::Settings { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
