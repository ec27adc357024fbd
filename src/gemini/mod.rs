//! Gemini 文本生成模块
//!
//! 提供外部生成 API 的调用封装、计时与输出质量检查

pub mod client;
pub mod generation;
pub mod types;

pub use client::GeminiBackend;
pub use generation::{GenerationClient, GenerationError};
