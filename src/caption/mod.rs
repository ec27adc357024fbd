//! Caption 生成模块
//!
//! 请求校验、prompt 构建、生成编排和 HTTP 接口

pub mod error;
pub mod prompt;
pub mod service;
pub mod types;
pub mod validator;
mod handlers;
mod router;

pub use prompt::PromptBuilder;
pub use router::{cors_layer, create_caption_router};
pub use service::CaptionService;
