//! # 承認サービスのエラー定義
//!
//! ユースケースで発生するエラーと、HTTP レスポンス（RFC 9457）への変換を定義する。
//!
//! | バリアント | HTTP ステータス |
//! |-----------|----------------|
//! | `BadRequest` / `ChainResolution` | 400 |
//! | `Forbidden` | 403 |
//! | `NotFound` | 404 |
//! | `Conflict` | 409 |
//! | `Database` / `Internal` | 500 |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use invoiceflow_domain::{
    DomainError,
    approval::{ChainResolutionError, StepSelectionError},
};
use invoiceflow_infra::InfraError;
use invoiceflow_shared::{
    ErrorResponse,
    event_log::error::{category, kind},
};
use thiserror::Error;

/// 承認サービスで発生するエラー
#[derive(Debug, Error)]
pub enum ServiceError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 権限不足
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 競合（状態ガード付き更新の失敗）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 承認チェーンの設定不備
    #[error(transparent)]
    ChainResolution(#[from] ChainResolutionError),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(#[from] InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) | ServiceError::ChainResolution(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => ServiceError::BadRequest(msg),
            DomainError::NotFound { entity_type, id } => {
                ServiceError::NotFound(format!("{entity_type} が見つかりません: {id}"))
            }
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::Forbidden(msg) => ServiceError::Forbidden(msg),
        }
    }
}

impl From<StepSelectionError> for ServiceError {
    fn from(e: StepSelectionError) -> Self {
        match e {
            StepSelectionError::NoPendingStep => ServiceError::Conflict(e.to_string()),
            StepSelectionError::NotEligible => ServiceError::Forbidden(e.to_string()),
            StepSelectionError::AmbiguousScope => ServiceError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ServiceError::NotFound(msg) => ErrorResponse::not_found(msg),
            ServiceError::BadRequest(msg) => ErrorResponse::bad_request(msg),
            ServiceError::ChainResolution(e) => ErrorResponse::approval_chain(e.to_string()),
            ServiceError::Forbidden(msg) => ErrorResponse::forbidden(msg),
            ServiceError::Conflict(msg) => ErrorResponse::conflict(msg),
            ServiceError::Database(e) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::DATABASE,
                    "データベースエラー: {:?}",
                    e
                );
                ErrorResponse::internal_error()
            }
            ServiceError::Internal(msg) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::INTERNAL,
                    "内部エラー: {}",
                    msg
                );
                ErrorResponse::internal_error()
            }
        };

        (status, Json(body)).into_response()
    }
}
