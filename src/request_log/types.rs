//! 请求记录查询与统计类型

use serde::{Deserialize, Serialize};

use super::model::CaptionRecord;

/// 列表查询过滤器
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub success: Option<bool>,
    pub event_type: Option<String>,
    pub language: Option<String>,
    pub length: Option<String>,
}

/// 分页响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestListResponse {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub records: Vec<CaptionRecord>,
}

/// 全量计数（用于健康检查）
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RequestStats {
    pub total_requests: u64,
    pub successful_requests: u64,
}

impl RequestStats {
    /// 成功率百分比
    pub fn success_rate(&self) -> f64 {
        if self.total_requests > 0 {
            self.successful_requests as f64 / self.total_requests as f64 * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTypeCount {
    pub event_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VibeCount {
    pub vibe: i64,
    pub count: u64,
}

/// 滚动窗口统计
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_processing_time: f64,
    pub popular_event_types: Vec<EventTypeCount>,
    pub popular_vibes: Vec<VibeCount>,
    pub period: String,
}

/// 按日聚合统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAnalytics {
    /// YYYY-MM-DD（UTC）
    pub date: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_processing_time: f64,
    pub most_popular_event_type: String,
    pub most_popular_vibe_range: String,
}

/// 日统计查询参数
#[derive(Debug, Default, Deserialize)]
pub struct DailyQuery {
    pub days: Option<u32>,
}
