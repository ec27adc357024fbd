//! Caption API 路由配置

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{analytics_summary, generate_caption, health_check};
use super::service::CaptionService;

/// Caption API 共享状态
#[derive(Clone)]
pub struct CaptionState {
    pub service: Arc<CaptionService>,
}

/// 创建 Caption API 路由
///
/// # 端点
/// - `POST /generate-caption` - 生成文案
/// - `GET /health` - 健康检查
/// - `GET /analytics` - 最近 30 天统计
pub fn create_caption_router(service: Arc<CaptionService>) -> Router {
    let state = CaptionState { service };

    Router::new()
        .route("/generate-caption", post(generate_caption))
        .route("/health", get(health_check))
        .route("/analytics", get(analytics_summary))
        .with_state(state)
}

/// CORS 中间件层
///
/// 允许所有来源，供浏览器前端直接调用。
pub fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{Any, CorsLayer};

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::caption::service::tests::{FailingStore, MemoryStore, service_with, valid_body};
    use crate::gemini::generation::tests::{MockBackend, long_caption};
    use crate::request_log::CaptionLog;

    fn app(service: CaptionService) -> Router {
        create_caption_router(Arc::new(service))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/generate-caption")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_caption_ok() {
        let service = service_with(
            Some(MockBackend::replying(&long_caption())),
            Arc::new(MemoryStore::default()),
        );
        let response = app(service)
            .oneshot(post_json(&valid_body().to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["caption"], long_caption());
        assert_eq!(json["request_id"], "mem-1");
        assert!(json["processing_time"].is_number());
        assert!(json["debug_message"].is_string());
    }

    #[tokio::test]
    async fn test_generate_caption_validation_error() {
        let service = service_with(
            Some(MockBackend::replying(&long_caption())),
            Arc::new(MemoryStore::default()),
        );
        let mut body = valid_body();
        body["keyLearnings"] = json!("ok ok");
        body["vibe"] = json!(150);

        let response = app(service)
            .oneshot(post_json(&body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid input data provided");
        assert!(json["validation_errors"]["keyLearnings"].is_array());
        assert!(json["validation_errors"]["vibe"].is_array());
    }

    #[tokio::test]
    async fn test_generate_caption_malformed_json() {
        let service = service_with(
            Some(MockBackend::replying(&long_caption())),
            Arc::new(MemoryStore::default()),
        );
        let response = app(service).oneshot(post_json("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["validation_errors"]["non_field_errors"].is_array());
    }

    #[tokio::test]
    async fn test_generate_caption_service_unavailable() {
        let service = service_with(None, Arc::new(MemoryStore::default()));
        let response = app(service)
            .oneshot(post_json(&valid_body().to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["debug_message"], "Gemini API not properly configured");
    }

    #[tokio::test]
    async fn test_generate_caption_too_short_is_500() {
        let service = service_with(
            Some(MockBackend::replying("0123456789")),
            Arc::new(MemoryStore::default()),
        );
        let response = app(service)
            .oneshot(post_json(&valid_body().to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["request_id"], "mem-1");
        assert!(json["error"].as_str().unwrap().contains("too short"));
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_change_status() {
        let service = service_with(
            Some(MockBackend::replying(&long_caption())),
            Arc::new(FailingStore),
        );
        let response = app(service)
            .oneshot(post_json(&valid_body().to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["request_id"].is_null());
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let service = service_with(None, Arc::new(MemoryStore::default()));
        let response = app(service).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["gemini_api_configured"], false);
        assert_eq!(json["database_accessible"], true);
        assert_eq!(json["statistics"]["success_rate"], "0.0%");
    }

    #[tokio::test]
    async fn test_analytics_endpoint() {
        let log = Arc::new(CaptionLog::in_memory().unwrap());
        let service = Arc::new(service_with(
            Some(MockBackend::replying(&long_caption())),
            log,
        ));
        service.generate(Ok(valid_body()), None).await.unwrap();

        let response = create_caption_router(service)
            .oneshot(get("/analytics"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["analytics"]["total_requests"], 1);
        assert_eq!(json["analytics"]["popular_event_types"][0]["event_type"], "Conference");
        assert_eq!(json["analytics"]["period"], "30 days");
    }
}
