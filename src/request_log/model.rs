//! 生成请求记录数据模型

use serde::Serialize;

use crate::caption::types::CaptionInput;

/// 单次生成的结果
///
/// 成功与错误信息互斥：成功时无错误信息，失败时错误信息非空。
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { caption: String },
    Failure { error: String },
}

impl Outcome {
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        if error.trim().is_empty() {
            Self::Failure {
                error: "Unknown error occurred".to_string(),
            }
        } else {
            Self::Failure { error }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn caption(&self) -> &str {
        match self {
            Self::Success { caption } => caption,
            Self::Failure { .. } => "",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// 待写入的生成请求
#[derive(Debug, Clone)]
pub struct NewCaptionRecord {
    pub input: CaptionInput,
    pub outcome: Outcome,
    /// 处理耗时（秒，非负）
    pub processing_time: f64,
    pub ip_address: Option<String>,
}

impl NewCaptionRecord {
    pub fn new(
        input: CaptionInput,
        outcome: Outcome,
        processing_time: f64,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            input,
            outcome,
            processing_time: processing_time.max(0.0),
            ip_address,
        }
    }
}

/// 已持久化的生成请求
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRecord {
    pub id: String,
    pub created_at: String,
    pub event_name: String,
    pub event_type: String,
    pub location: String,
    pub speakers: String,
    pub key_learnings: String,
    pub length: String,
    pub vibe: i64,
    pub language: String,
    pub generated_caption: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub processing_time: f64,
    pub ip_address: Option<String>,
}
