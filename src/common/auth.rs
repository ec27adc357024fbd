//! API Key 提取与比较

use axum::{body::Body, http::Request};
use subtle::ConstantTimeEq;

/// 从请求头提取 API Key
///
/// 支持 `x-api-key` 和 `Authorization: Bearer <key>`
pub fn extract_api_key(request: &Request<Body>) -> Option<String> {
    let headers = request.headers();
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(key.to_string());
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
}

/// 常量时间字符串比较
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(name: &str, value: &str) -> Request<Body> {
        Request::builder()
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_x_api_key() {
        let req = request_with("x-api-key", "secret");
        assert_eq!(extract_api_key(&req).as_deref(), Some("secret"));
    }

    #[test]
    fn test_extract_bearer() {
        let req = request_with("authorization", "Bearer secret");
        assert_eq!(extract_api_key(&req).as_deref(), Some("secret"));

        let req = request_with("authorization", "Basic abc");
        assert!(extract_api_key(&req).is_none());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
