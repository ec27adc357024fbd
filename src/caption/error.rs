//! Caption 服务错误类型

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::gemini::GenerationError;

use super::types::{CaptionErrorResponse, ValidationErrors};

#[derive(Debug, Error)]
pub enum CaptionError {
    /// 生成客户端未初始化（如缺少凭据）
    #[error("Caption generation service is not available. Please check server configuration.")]
    ServiceUnavailable { elapsed: Duration },

    /// 字段校验失败
    #[error("Invalid input data provided")]
    Validation {
        errors: ValidationErrors,
        elapsed: Duration,
    },

    /// 外部调用失败或输出质量不足
    #[error("{source}")]
    Generation {
        source: GenerationError,
        request_id: Option<String>,
        elapsed: Duration,
    },

    /// 兜底错误
    #[error("Unexpected error: {cause:#}")]
    Unexpected {
        cause: anyhow::Error,
        elapsed: Duration,
    },
}

impl CaptionError {
    pub fn unexpected(cause: anyhow::Error, elapsed: Duration) -> Self {
        Self::Unexpected { cause, elapsed }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Generation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::ServiceUnavailable { elapsed }
            | Self::Validation { elapsed, .. }
            | Self::Generation { elapsed, .. }
            | Self::Unexpected { elapsed, .. } => *elapsed,
        }
    }

    /// 给客户端的排查提示
    pub fn debug_message(&self) -> String {
        match self {
            Self::ServiceUnavailable { .. } => "Gemini API not properly configured".to_string(),
            Self::Validation { .. } => {
                "Please check all required fields and their formats".to_string()
            }
            Self::Generation { elapsed, .. } => {
                format!("Error occurred after {:.2}s", elapsed.as_secs_f64())
            }
            Self::Unexpected { .. } => "An unexpected server error occurred".to_string(),
        }
    }

    pub fn to_body(&self) -> CaptionErrorResponse {
        let (request_id, validation_errors) = match self {
            Self::Generation { request_id, .. } => (request_id.clone(), None),
            Self::Validation { errors, .. } => (None, Some(errors.clone())),
            _ => (None, None),
        };
        CaptionErrorResponse {
            success: false,
            error: self.to_string(),
            processing_time: self.elapsed().as_secs_f64(),
            request_id,
            validation_errors,
            debug_message: self.debug_message(),
        }
    }
}

impl IntoResponse for CaptionError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}
