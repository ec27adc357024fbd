//! 生成请求记录模块
//!
//! 提供请求持久化、统计聚合和只读查询

pub mod model;
pub mod store;
pub mod types;
mod handlers;
mod router;

pub use model::{NewCaptionRecord, Outcome};
pub use router::create_admin_router;
pub use store::{CaptionLog, RequestStore};
