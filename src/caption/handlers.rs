//! Caption API HTTP 处理器

use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::{Extensions, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::router::CaptionState;

/// POST /generate-caption
pub async fn generate_caption(
    State(state): State<CaptionState>,
    headers: HeaderMap,
    extensions: Extensions,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let client_ip = client_ip(&headers, &extensions);
    let body = payload.map(|Json(v)| v).map_err(|e| e.body_text());

    match state.service.generate(body, client_ip).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /health
pub async fn health_check(State(state): State<CaptionState>) -> impl IntoResponse {
    Json(state.service.health().await)
}

/// GET /analytics
pub async fn analytics_summary(State(state): State<CaptionState>) -> Response {
    match state.service.analytics().await {
        Ok(analytics) => Json(serde_json::json!({
            "success": true,
            "analytics": analytics
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// 客户端地址：优先 X-Forwarded-For 的第一项，否则取连接对端地址
fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}
