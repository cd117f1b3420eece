use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hydromap_core::error::{ErrorCategory, HydroError};
use serde::Serialize;

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<HydroError> for ApiError {
    fn from(err: HydroError) -> Self {
        match err.category() {
            ErrorCategory::MissingData => {
                Self::unavailable(format!("Required data files not found: {}", err))
                    .with_details("Please run preprocessing scripts.")
            }
            ErrorCategory::InvalidInput => Self::bad_request(err.to_string()),
            ErrorCategory::Processing | ErrorCategory::Cache => {
                Self::internal("Delineation failed").with_details(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        let missing = HydroError::RasterNotFound {
            name: "flow_direction".to_string(),
            path: PathBuf::from("/data/flow_direction.tif"),
        };
        let api: ApiError = missing.into();
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(api.message.contains("flow_direction"));

        let api: ApiError = HydroError::OutOfBounds { row: -3, col: 7, rows: 10, cols: 10 }.into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);

        let api: ApiError = HydroError::EmptyWatershed.into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "Delineation failed");
        assert!(api.details.unwrap().contains("no contributing area"));
    }
}
