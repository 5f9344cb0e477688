//! # 成功レスポンス
//!
//! 承認サービスの成功レスポンスはすべて `{ "data": ... }` で包む。

use serde::{Deserialize, Serialize};

/// `{ "data": T }` エンベロープ
///
/// ```
/// use invoiceflow_shared::ApiResponse;
///
/// let body = serde_json::to_string(&ApiResponse::new(["step-1"])).unwrap();
/// assert_eq!(body, r#"{"data":["step-1"]}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
