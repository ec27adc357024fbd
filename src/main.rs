mod caption;
mod common;
mod gemini;
mod model;
mod request_log;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use caption::{CaptionService, PromptBuilder, cors_layer, create_caption_router};
use gemini::{GeminiBackend, GenerationClient};
use model::arg::Args;
use model::config::Config;
use request_log::{CaptionLog, RequestStore, create_admin_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在时忽略
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let config = Config::load(&config_path)?;
    if let Some(path) = config.config_path() {
        tracing::info!("已加载配置: {}", path.display());
    }

    // 生成客户端初始化失败不阻止启动，生成请求将返回 503
    let generator = match GeminiBackend::from_config(&config) {
        Ok(backend) => {
            tracing::info!("Gemini 客户端已初始化，模型: {}", backend.model());
            Some(Arc::new(GenerationClient::new(
                Arc::new(backend),
                Duration::from_secs(config.generation_timeout_secs),
            )))
        }
        Err(e) => {
            tracing::error!("Gemini 客户端初始化失败: {:#}", e);
            None
        }
    };

    let log = Arc::new(CaptionLog::open(&config.db_path)?);
    tracing::info!("请求记录数据库: {}", config.db_path);

    let store: Arc<dyn RequestStore> = log.clone();
    let service = Arc::new(CaptionService::new(
        generator,
        PromptBuilder::default(),
        store,
        config.analytics_window_days,
    ));

    if !service.is_available() {
        tracing::warn!("生成服务不可用，POST /generate-caption 将返回 503");
    }

    let mut app = create_caption_router(service);

    if let Some(admin_key) = config
        .admin_api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        app = app.nest("/api/admin", create_admin_router(admin_key.to_string(), log));
        tracing::info!("Admin API 已启用: /api/admin");
    } else {
        tracing::info!("未配置 adminApiKey，Admin API 未启用");
    }

    let app = app.layer(cors_layer());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("启动 HTTP 服务器: {}", addr);
    tracing::info!("可用端点:");
    tracing::info!("  POST /generate-caption");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /analytics");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
