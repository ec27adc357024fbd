//! 文本生成客户端
//!
//! 包装一次外部调用：计时、超时、空响应与过短输出检查。不做内部重试。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

/// 低于该字符数的输出视为低质量
pub const MIN_CAPTION_CHARS: usize = 50;

/// 连通性探测 prompt
const STATUS_PROBE_PROMPT: &str = "Test connectivity - respond with 'OK'";

/// 外部文本生成后端（prompt 进，文本出）
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// 发起一次生成调用，后端未返回文本时为 `Ok(None)`
    async fn complete(&self, prompt: &str) -> anyhow::Result<Option<String>>;

    /// 是否配置了凭据
    fn is_configured(&self) -> bool;
}

/// 生成失败原因
#[derive(Debug, Error)]
pub enum GenerationErrorKind {
    #[error("{0}")]
    Upstream(String),
    #[error("Empty response from generation API")]
    Empty,
    #[error("Generated caption too short ({0} characters)")]
    TooShort(usize),
    #[error("Generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// 生成失败，附带已耗时间
#[derive(Debug, Error)]
#[error("Caption generation failed: {kind}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub elapsed: Duration,
}

/// 生成成功
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub elapsed: Duration,
}

/// 连通性探测结果（仅用于健康检查）
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub configured: bool,
    pub responsive: bool,
    pub error: Option<String>,
}

/// 生成客户端
pub struct GenerationClient {
    backend: Arc<dyn TextBackend>,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn TextBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// 生成文本
    pub async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.backend.complete(prompt)).await;

        let fail = |kind: GenerationErrorKind| {
            let err = GenerationError {
                kind,
                elapsed: start.elapsed(),
            };
            tracing::error!(elapsed_ms = err.elapsed.as_millis() as u64, "{}", err);
            err
        };

        let text = match result {
            Err(_) => return Err(fail(GenerationErrorKind::Timeout(self.timeout))),
            Ok(Err(e)) => return Err(fail(GenerationErrorKind::Upstream(format!("{:#}", e)))),
            Ok(Ok(None)) => return Err(fail(GenerationErrorKind::Empty)),
            Ok(Ok(Some(text))) => text.trim().to_string(),
        };

        if text.is_empty() {
            return Err(fail(GenerationErrorKind::Empty));
        }
        let chars = text.chars().count();
        if chars < MIN_CAPTION_CHARS {
            return Err(fail(GenerationErrorKind::TooShort(chars)));
        }

        let elapsed = start.elapsed();
        tracing::info!("文案生成成功，耗时 {:.2}s", elapsed.as_secs_f64());
        Ok(Generation { text, elapsed })
    }

    /// 连通性探测，不参与生成路径的判定
    pub async fn status(&self) -> ServiceStatus {
        let configured = self.backend.is_configured();
        match tokio::time::timeout(self.timeout, self.backend.complete(STATUS_PROBE_PROMPT)).await
        {
            Ok(Ok(text)) => ServiceStatus {
                configured,
                responsive: text.is_some_and(|t| !t.trim().is_empty()),
                error: None,
            },
            Ok(Err(e)) => ServiceStatus {
                configured,
                responsive: false,
                error: Some(format!("{:#}", e)),
            },
            Err(_) => ServiceStatus {
                configured,
                responsive: false,
                error: Some(format!("timed out after {}s", self.timeout.as_secs())),
            },
        }
    }
}
