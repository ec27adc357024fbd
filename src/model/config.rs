use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Gemini API Key 的环境变量名（优先于配置文件）
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Gemini API Key（可选，可由 GEMINI_API_KEY 环境变量覆盖）
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    /// 单次生成调用的超时时间（秒）
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// SQLite 数据库路径
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// HTTP 代理地址（可选）
    /// 支持格式: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Admin API 密钥（可选，启用 Admin API 功能）
    #[serde(default)]
    pub admin_api_key: Option<String>,

    /// /analytics 统计窗口（天）
    #[serde(default = "default_analytics_window_days")]
    pub analytics_window_days: u32,

    /// 配置文件路径（运行时元数据，不写入 JSON）
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    30
}

fn default_db_path() -> String {
    "captions.db".to_string()
}

fn default_analytics_window_days() -> u32 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            gemini_base_url: default_gemini_base_url(),
            generation_timeout_secs: default_generation_timeout_secs(),
            db_path: default_db_path(),
            proxy_url: None,
            admin_api_key: None,
            analytics_window_days: default_analytics_window_days(),
            config_path: None,
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// 获取配置文件路径（如果有）
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// 获取有效的 Gemini API Key
    /// 优先使用环境变量，未设置时回退到配置文件
    pub fn effective_gemini_api_key(&self) -> Option<String> {
        Self::pick_api_key(std::env::var(GEMINI_API_KEY_ENV).ok(), self.gemini_api_key.clone())
    }

    fn pick_api_key(from_env: Option<String>, from_file: Option<String>) -> Option<String> {
        from_env
            .filter(|k| !k.trim().is_empty())
            .or(from_file.filter(|k| !k.trim().is_empty()))
    }

    /// 监听地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.generation_timeout_secs, 30);
        assert_eq!(config.analytics_window_days, 30);
        assert!(config.admin_api_key.is_none());
    }

    #[test]
    fn test_camel_case_keys() {
        let json = r#"{
            "port": 9000,
            "geminiApiKey": "file-key",
            "dbPath": "/tmp/captions.db",
            "generationTimeoutSecs": 5
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.gemini_api_key.as_deref(), Some("file-key"));
        assert_eq!(config.db_path, "/tmp/captions.db");
        assert_eq!(config.generation_timeout_secs, 5);
    }

    #[test]
    fn test_env_key_takes_precedence() {
        let key = Config::pick_api_key(Some("env-key".into()), Some("file-key".into()));
        assert_eq!(key.as_deref(), Some("env-key"));
    }

    #[test]
    fn test_blank_env_key_falls_back_to_file() {
        let key = Config::pick_api_key(Some("  ".into()), Some("file-key".into()));
        assert_eq!(key.as_deref(), Some("file-key"));
        assert!(Config::pick_api_key(None, Some(String::new())).is_none());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let config = Config::load("/nonexistent/caption-rs/config.json").unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.config_path().is_some());
    }
}
