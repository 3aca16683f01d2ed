use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed identifier: {0}")]
    MalformedId(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Forbidden access")]
    Forbidden,

    #[error("Store error: {0}")]
    Store(#[from] mongodb::error::Error),

    #[error("Document encoding error: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("Document decoding error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            // same status as a failed id cast inside the driver
            AppError::MalformedId { .. }
            | AppError::Store { .. }
            | AppError::Encode { .. }
            | AppError::Decode { .. }
            | AppError::InternalError { .. } => {
                error!("{self}");

                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        let message: String = message.into();

        AppError::InternalError(message.into())
    }
}
