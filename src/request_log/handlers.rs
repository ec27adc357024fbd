//! 请求记录 Admin API 处理器

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use super::router::RequestLogState;
use super::types::{DailyQuery, RequestQuery};

/// GET /api/admin/requests
pub async fn get_requests(
    State(state): State<RequestLogState>,
    Query(query): Query<RequestQuery>,
) -> impl IntoResponse {
    match state.log.query(query).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("查询请求记录失败: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("Failed to query requests: {}", e)
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/admin/analytics/daily
pub async fn get_daily_analytics(
    State(state): State<RequestLogState>,
    Query(query): Query<DailyQuery>,
) -> impl IntoResponse {
    let days = query.days.unwrap_or(30).clamp(1, 365);
    match state.log.daily(days).await {
        Ok(rows) => Json(serde_json::json!({
            "success": true,
            "days": rows
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("获取日统计失败: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("Failed to load daily analytics: {}", e)
                })),
            )
                .into_response()
        }
    }
}
