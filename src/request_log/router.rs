//! 请求记录 Admin API 路由

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json},
    routing::get,
};

use crate::common::auth;

use super::handlers::{get_daily_analytics, get_requests};
use super::store::CaptionLog;

/// Admin API 状态
#[derive(Clone)]
pub struct RequestLogState {
    pub admin_api_key: String,
    pub log: Arc<CaptionLog>,
}

/// Admin 认证中间件
async fn admin_auth_middleware(
    State(state): State<RequestLogState>,
    request: Request<Body>,
    next: Next,
) -> axum::response::Response {
    match auth::extract_api_key(&request) {
        Some(key) if auth::constant_time_eq(&key, &state.admin_api_key) => {
            next.run(request).await
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "success": false,
                "error": "Invalid API key"
            })),
        )
            .into_response(),
    }
}

/// 创建 Admin API 路由
///
/// 返回 Router<()>，可直接 nest 到主应用
///
/// # 端点
/// - `GET /requests` - 分页查询生成记录
/// - `GET /analytics/daily` - 按日聚合统计
pub fn create_admin_router(admin_api_key: impl Into<String>, log: Arc<CaptionLog>) -> Router {
    let state = RequestLogState {
        admin_api_key: admin_api_key.into(),
        log,
    };

    Router::new()
        .route("/requests", get(get_requests))
        .route("/analytics/daily", get(get_daily_analytics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
