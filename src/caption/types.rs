//! Caption API 类型定义

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============ 枚举字段 ============

/// 文案长度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl CaptionLength {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "short" => Some(Self::Short),
            "medium" => Some(Self::Medium),
            "long" => Some(Self::Long),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

/// 输出语言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    /// 英语与泰米尔语混合
    Tanglish,
}

impl Language {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "english" => Some(Self::English),
            "tanglish" => Some(Self::Tanglish),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Tanglish => "tanglish",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Tanglish => "Tanglish",
        }
    }
}

/// 由 vibe 分数推导的语气类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibeCategory {
    /// [0, 33]
    Formal,
    /// [34, 66]
    Conversational,
    /// [67, 100]
    HighEnergy,
}

impl VibeCategory {
    pub fn from_score(vibe: u8) -> Self {
        match vibe {
            0..=33 => Self::Formal,
            34..=66 => Self::Conversational,
            _ => Self::HighEnergy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Formal => "formal",
            Self::Conversational => "conversational",
            Self::HighEnergy => "high-energy",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Formal => "Formal",
            Self::Conversational => "Conversational",
            Self::HighEnergy => "High-Energy",
        }
    }
}

/// 领域上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldContext {
    Technology,
    Business,
    Academic,
    /// 无关键词命中
    General,
}

impl FieldContext {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Technology => "technology/innovation",
            Self::Business => "business/entrepreneurship",
            Self::Academic => "academic/research",
            Self::General => "professional development",
        }
    }
}

// ============ 输入 ============

/// 外部请求体（camelCase）到内部字段的显式映射
///
/// 字段保持原始 JSON 值，类型与范围校验交给 validator，
/// 以便所有字段错误可以一次性返回。
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawCaptionRequest {
    #[serde(rename = "eventName", default)]
    pub event_name: Option<Value>,
    #[serde(rename = "eventType", default)]
    pub event_type: Option<Value>,
    #[serde(rename = "location", default)]
    pub location: Option<Value>,
    #[serde(rename = "speakers", default)]
    pub speakers: Option<Value>,
    #[serde(rename = "keyLearnings", default)]
    pub key_learnings: Option<Value>,
    #[serde(rename = "length", default)]
    pub length: Option<Value>,
    #[serde(rename = "vibe", default)]
    pub vibe: Option<Value>,
    #[serde(rename = "language", default)]
    pub language: Option<Value>,
}

impl RawCaptionRequest {
    /// 从 JSON 请求体构建，非对象请求体返回字段无关错误
    pub fn from_json(body: Value) -> Result<Self, ValidationErrors> {
        if !body.is_object() {
            let mut errors = ValidationErrors::default();
            errors.add(
                NON_FIELD_ERRORS,
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(&body)
                ),
            );
            return Err(errors);
        }
        serde_json::from_value(body).map_err(|e| {
            let mut errors = ValidationErrors::default();
            errors.add(NON_FIELD_ERRORS, format!("Invalid data: {}", e));
            errors
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// 通过校验的请求字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionInput {
    pub event_name: String,
    pub event_type: String,
    pub location: String,
    pub speakers: String,
    pub key_learnings: String,
    pub length: CaptionLength,
    /// 0..=100
    pub vibe: u8,
    pub language: Language,
}

impl CaptionInput {
    pub fn vibe_category(&self) -> VibeCategory {
        VibeCategory::from_score(self.vibe)
    }
}

// ============ 校验错误 ============

/// 请求体整体错误使用的字段名
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// 按字段分组的校验错误（字段名为外部 camelCase 名称）
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

// ============ 响应 ============

/// POST /generate-caption 成功响应
#[derive(Debug, Serialize)]
pub struct CaptionResponse {
    pub success: bool,
    pub caption: String,
    pub processing_time: f64,
    pub request_id: Option<String>,
    pub debug_message: String,
}

/// 失败响应（所有错误出口共用）
#[derive(Debug, Serialize)]
pub struct CaptionErrorResponse {
    pub success: bool,
    pub error: String,
    pub processing_time: f64,
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<ValidationErrors>,
    pub debug_message: String,
}

/// GET /health 统计部分
#[derive(Debug, Serialize)]
pub struct HealthStatistics {
    pub total_requests: u64,
    pub successful_requests: u64,
    /// 形如 "87.5%"
    pub success_rate: String,
}

/// GET /health 响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: String,
    pub timestamp: String,
    pub version: &'static str,
    pub gemini_api_configured: bool,
    pub gemini_api_healthy: bool,
    pub database_accessible: bool,
    pub statistics: HealthStatistics,
}
