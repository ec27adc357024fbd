//! Caption 生成编排
//!
//! 单个请求的处理顺序：
//! Received -> Validated -> Generated -> Persisted -> Responded，
//! 任一阶段出错都直接进入 Responded 返回失败体；
//! 生成失败时仍会尝试持久化这次失败的尝试。

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::common::truncate_chars;
use crate::gemini::GenerationClient;
use crate::request_log::{NewCaptionRecord, Outcome, RequestStore};
use crate::request_log::types::{AnalyticsSummary, RequestStats};

use super::error::CaptionError;
use super::prompt::PromptBuilder;
use super::types::{
    CaptionInput, CaptionResponse, HealthResponse, HealthStatistics, NON_FIELD_ERRORS,
    RawCaptionRequest, ValidationErrors,
};
use super::validator;

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Caption 服务
///
/// 生成客户端为 None 表示初始化失败（如缺少凭据），此时生成请求直接返回 503。
pub struct CaptionService {
    generator: Option<Arc<GenerationClient>>,
    prompts: PromptBuilder,
    store: Arc<dyn RequestStore>,
    analytics_window_days: u32,
}

impl CaptionService {
    pub fn new(
        generator: Option<Arc<GenerationClient>>,
        prompts: PromptBuilder,
        store: Arc<dyn RequestStore>,
        analytics_window_days: u32,
    ) -> Self {
        Self {
            generator,
            prompts,
            store,
            analytics_window_days,
        }
    }

    pub fn is_available(&self) -> bool {
        self.generator.is_some()
    }

    /// 处理一次生成请求
    ///
    /// `body` 为请求体 JSON，解析失败时为错误描述
    pub async fn generate(
        &self,
        body: Result<Value, String>,
        client_ip: Option<String>,
    ) -> Result<CaptionResponse, CaptionError> {
        let start = Instant::now();

        let Some(generator) = self.generator.as_ref() else {
            tracing::warn!("生成服务未初始化，拒绝请求");
            return Err(CaptionError::ServiceUnavailable {
                elapsed: start.elapsed(),
            });
        };

        // Received -> Validated
        let input = match parse_input(body) {
            Ok(input) => input,
            Err(errors) => {
                tracing::warn!("请求参数校验失败: {}", errors);
                return Err(CaptionError::Validation {
                    errors,
                    elapsed: start.elapsed(),
                });
            }
        };

        tracing::info!(
            event_type = %input.event_type,
            vibe = input.vibe,
            length = input.length.as_str(),
            "开始生成文案: {}",
            truncate_chars(&input.event_name, 80)
        );

        // Validated -> Generated
        let prompt = self.prompts.build(&input);
        #[cfg(feature = "sensitive-logs")]
        tracing::debug!("prompt:\n{}", prompt);
        let generation = generator.generate(&prompt).await;

        let outcome = match &generation {
            Ok(g) => Outcome::Success {
                caption: g.text.clone(),
            },
            Err(e) => Outcome::failure(e.to_string()),
        };

        // -> Persisted（成功与失败都写入，写入失败只记录日志）
        let processing_time = start.elapsed().as_secs_f64();
        let request_id = self
            .persist(NewCaptionRecord::new(
                input.clone(),
                outcome,
                processing_time,
                client_ip,
            ))
            .await;

        // -> Responded
        let elapsed = start.elapsed();
        match generation {
            Ok(g) => {
                #[cfg(feature = "sensitive-logs")]
                tracing::debug!("caption:\n{}", g.text);
                tracing::info!("文案生成完成，总耗时 {:.2}s", elapsed.as_secs_f64());
                Ok(CaptionResponse {
                    success: true,
                    caption: g.text,
                    processing_time: elapsed.as_secs_f64(),
                    request_id,
                    debug_message: format!(
                        "Generated using {} vibe",
                        input.vibe_category().as_str()
                    ),
                })
            }
            Err(source) => Err(CaptionError::Generation {
                source,
                request_id,
                elapsed,
            }),
        }
    }

    async fn persist(&self, record: NewCaptionRecord) -> Option<String> {
        match self.store.record(record).await {
            Ok(id) => {
                tracing::info!("请求已保存: {}", id);
                Some(id)
            }
            Err(e) => {
                tracing::error!("保存请求记录失败: {:#}", e);
                None
            }
        }
    }

    /// 健康检查
    ///
    /// 生成客户端未初始化时恒为 unhealthy，与数据库状态无关。
    pub async fn health(&self) -> HealthResponse {
        let (configured, healthy) = match &self.generator {
            Some(generator) => {
                let status = generator.status().await;
                if let Some(err) = &status.error {
                    tracing::warn!("生成 API 连通性探测失败: {}", err);
                }
                (status.configured, status.responsive)
            }
            None => (false, false),
        };

        let (database_accessible, stats) = match self.store.stats().await {
            Ok(stats) => (true, stats),
            Err(e) => {
                tracing::warn!("读取请求统计失败: {:#}", e);
                (false, RequestStats::default())
            }
        };

        let is_healthy = self.generator.is_some() && healthy;
        let status = if is_healthy { "healthy" } else { "unhealthy" };
        tracing::info!("健康检查: {}", status);

        HealthResponse {
            status,
            message: if is_healthy {
                "Service is operational".to_string()
            } else {
                "Service has issues".to_string()
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: SERVICE_VERSION,
            gemini_api_configured: configured,
            gemini_api_healthy: healthy,
            database_accessible,
            statistics: HealthStatistics {
                total_requests: stats.total_requests,
                successful_requests: stats.successful_requests,
                success_rate: format!("{:.1}%", stats.success_rate()),
            },
        }
    }

    /// 滚动窗口统计
    pub async fn analytics(&self) -> Result<AnalyticsSummary, CaptionError> {
        let start = Instant::now();
        self.store
            .analytics(self.analytics_window_days)
            .await
            .map_err(|e| {
                tracing::error!("统计查询失败: {:#}", e);
                CaptionError::unexpected(e.context("Failed to generate analytics"), start.elapsed())
            })
    }
}

fn parse_input(body: Result<Value, String>) -> Result<CaptionInput, ValidationErrors> {
    let body = body.map_err(|message| {
        let mut errors = ValidationErrors::default();
        errors.add(NON_FIELD_ERRORS, message);
        errors
    })?;
    let raw = RawCaptionRequest::from_json(body)?;
    validator::validate(&raw)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::caption::prompt::FixedNonce;
    use crate::gemini::generation::tests::{MockBackend, long_caption};
    use crate::request_log::CaptionLog;

    /// 内存记录（检查写入内容）
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub(crate) records: Mutex<Vec<NewCaptionRecord>>,
    }

    #[async_trait]
    impl RequestStore for MemoryStore {
        async fn record(&self, record: NewCaptionRecord) -> anyhow::Result<String> {
            let mut records = self.records.lock();
            records.push(record);
            Ok(format!("mem-{}", records.len()))
        }

        async fn stats(&self) -> anyhow::Result<RequestStats> {
            let records = self.records.lock();
            Ok(RequestStats {
                total_requests: records.len() as u64,
                successful_requests: records.iter().filter(|r| r.outcome.is_success()).count()
                    as u64,
            })
        }

        async fn analytics(&self, _window_days: u32) -> anyhow::Result<AnalyticsSummary> {
            anyhow::bail!("not supported")
        }
    }

    /// 所有操作都失败的存储
    pub(crate) struct FailingStore;

    #[async_trait]
    impl RequestStore for FailingStore {
        async fn record(&self, _record: NewCaptionRecord) -> anyhow::Result<String> {
            anyhow::bail!("disk full")
        }

        async fn stats(&self) -> anyhow::Result<RequestStats> {
            anyhow::bail!("database is locked")
        }

        async fn analytics(&self, _window_days: u32) -> anyhow::Result<AnalyticsSummary> {
            anyhow::bail!("database is locked")
        }
    }

    pub(crate) fn service_with(
        backend: Option<MockBackend>,
        store: Arc<dyn RequestStore>,
    ) -> CaptionService {
        let generator = backend.map(|b| {
            Arc::new(GenerationClient::new(Arc::new(b), Duration::from_secs(5)))
        });
        CaptionService::new(
            generator,
            PromptBuilder::new(Arc::new(FixedNonce(1234))),
            store,
            30,
        )
    }

    pub(crate) fn valid_body() -> Value {
        json!({
            "eventName": "AI Summit",
            "eventType": "Conference",
            "location": "Chennai",
            "speakers": "Dr. Rao, Priya",
            "keyLearnings": "Agents need evaluation harnesses before production",
            "vibe": 80
        })
    }

    #[tokio::test]
    async fn test_success_path_persists_and_responds() {
        let store = Arc::new(MemoryStore::default());
        let service = service_with(Some(MockBackend::replying(&long_caption())), store.clone());

        let response = service
            .generate(Ok(valid_body()), Some("10.0.0.1".to_string()))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.caption, long_caption());
        assert_eq!(response.request_id.as_deref(), Some("mem-1"));
        assert_eq!(response.debug_message, "Generated using high-energy vibe");
        assert!(response.processing_time >= 0.0);

        let records = store.records.lock();
        assert_eq!(records.len(), 1);
        assert!(records[0].outcome.is_success());
        assert_eq!(records[0].ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_still_persisted() {
        let store = Arc::new(MemoryStore::default());
        let service = service_with(Some(MockBackend::replying("0123456789")), store.clone());

        let err = service.generate(Ok(valid_body()), None).await.unwrap_err();
        match &err {
            CaptionError::Generation { request_id, .. } => {
                assert_eq!(request_id.as_deref(), Some("mem-1"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let records = store.records.lock();
        assert_eq!(records.len(), 1);
        let message = records[0].outcome.error_message().unwrap();
        assert!(message.contains("too short"));
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_success_outcome() {
        let service = service_with(
            Some(MockBackend::replying(&long_caption())),
            Arc::new(FailingStore),
        );
        let response = service.generate(Ok(valid_body()), None).await.unwrap();
        assert!(response.success);
        assert!(response.request_id.is_none());
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_failure_outcome() {
        let service = service_with(Some(MockBackend::failing()), Arc::new(FailingStore));
        let err = service.generate(Ok(valid_body()), None).await.unwrap_err();
        assert!(matches!(
            err,
            CaptionError::Generation {
                request_id: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unavailable_short_circuits_before_validation() {
        let store = Arc::new(MemoryStore::default());
        let service = service_with(None, store.clone());

        // 即使请求体无效也返回 503
        let err = service.generate(Ok(json!({})), None).await.unwrap_err();
        assert!(matches!(err, CaptionError::ServiceUnavailable { .. }));
        assert!(store.records.lock().is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_skips_generation_and_storage() {
        let store = Arc::new(MemoryStore::default());
        let service = service_with(Some(MockBackend::replying(&long_caption())), store.clone());

        let mut body = valid_body();
        body["eventName"] = json!("Hi");
        let err = service.generate(Ok(body), None).await.unwrap_err();
        match err {
            CaptionError::Validation { errors, .. } => {
                assert!(errors.get("eventName").is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(store.records.lock().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let service = service_with(
            Some(MockBackend::replying(&long_caption())),
            Arc::new(MemoryStore::default()),
        );
        let err = service
            .generate(Err("EOF while parsing".to_string()), None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_unhealthy_without_generator() {
        let store = Arc::new(MemoryStore::default());
        let health = service_with(None, store).health().await;
        assert_eq!(health.status, "unhealthy");
        assert!(health.database_accessible);
        assert!(!health.gemini_api_configured);
        assert!(!health.gemini_api_healthy);
    }

    #[tokio::test]
    async fn test_health_unhealthy_without_generator_and_database() {
        let health = service_with(None, Arc::new(FailingStore)).health().await;
        assert_eq!(health.status, "unhealthy");
        assert!(!health.database_accessible);
        assert!(!health.gemini_api_configured);
        assert_eq!(health.statistics.total_requests, 0);
    }

    #[tokio::test]
    async fn test_health_reports_statistics() {
        let store = Arc::new(MemoryStore::default());
        let service = service_with(Some(MockBackend::replying(&long_caption())), store.clone());
        service.generate(Ok(valid_body()), None).await.unwrap();

        let health = service.health().await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.statistics.total_requests, 1);
        assert_eq!(health.statistics.success_rate, "100.0%");
        assert_eq!(health.version, SERVICE_VERSION);
    }

    #[tokio::test]
    async fn test_health_with_broken_database() {
        let service = service_with(Some(MockBackend::replying("OK")), Arc::new(FailingStore));
        let health = service.health().await;
        assert_eq!(health.status, "healthy");
        assert!(!health.database_accessible);
        assert_eq!(health.statistics.success_rate, "0.0%");
    }

    #[tokio::test]
    async fn test_analytics_against_sqlite() {
        let log = Arc::new(CaptionLog::in_memory().unwrap());
        let service = service_with(Some(MockBackend::replying(&long_caption())), log);
        service.generate(Ok(valid_body()), None).await.unwrap();

        let summary = service.analytics().await.unwrap();
        assert_eq!(summary.total_requests, 1);
        assert_eq!(summary.popular_vibes[0].vibe, 80);
    }

    #[tokio::test]
    async fn test_analytics_failure_is_unexpected_error() {
        let service = service_with(None, Arc::new(FailingStore));
        let err = service.analytics().await.unwrap_err();
        assert!(matches!(err, CaptionError::Unexpected { .. }));
    }
}
