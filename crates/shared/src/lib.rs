//! # InvoiceFlow 共有ユーティリティ
//!
//! 承認サービスとインフラ層で共通して使うレスポンス型・ログ規約・
//! トレーシング初期化を提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum には依存しない（`IntoResponse` 変換は各サービスの責務）
//! - トレーシング関連の依存は `observability` feature の背後に置く

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::{ErrorResponse, ProblemType};
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
