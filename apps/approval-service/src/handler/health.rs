//! # ヘルスチェック
//!
//! `/health` はプロセスの生存、`/health/ready` は PostgreSQL への疎通を返す。

use std::{sync::Arc, time::Duration};

use axum::{Json, extract::State, http::StatusCode};
use invoiceflow_infra::db;
use invoiceflow_shared::{CheckStatus, HealthResponse, ReadinessResponse};
use sqlx::PgPool;

const DATABASE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}

pub struct ReadinessState {
    pub pool: PgPool,
}

/// 全チェック成功で 200、それ以外は 503
#[tracing::instrument(skip_all)]
pub async fn readiness_check(
    State(state): State<Arc<ReadinessState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let database = database_status(&state.pool).await;
    let response = ReadinessResponse::from_checks([("database", database)]);
    let status = if response.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

async fn database_status(pool: &PgPool) -> CheckStatus {
    match tokio::time::timeout(DATABASE_CHECK_TIMEOUT, db::ping(pool)).await {
        Ok(Ok(())) => CheckStatus::Ok,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "データベースに接続できません");
            CheckStatus::Error
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = DATABASE_CHECK_TIMEOUT.as_secs(),
                "データベースの疎通確認がタイムアウトしました"
            );
            CheckStatus::Error
        }
    }
}
