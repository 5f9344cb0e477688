//! # アプリケーション構築
//!
//! ルーターとミドルウェアの構築を担当する。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use invoiceflow_shared::observability::{MakeRequestUuidV7, make_request_span};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::handler::{
    ApprovalState,
    ReadinessState,
    act_on_approval,
    ensure_approval_plan,
    get_approval_plan,
    health_check,
    list_approval_history,
    list_pending_approvals,
    readiness_check,
};

/// ルーターを構築する
pub fn build_app(approval_state: Arc<ApprovalState>, readiness_state: Arc<ReadinessState>) -> Router {
    let health = Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .with_state(readiness_state);

    let approval = Router::new()
        .route(
            "/internal/invoices/{invoice_id}/approval-plan",
            get(get_approval_plan).post(ensure_approval_plan),
        )
        .route(
            "/internal/invoices/{invoice_id}/approval-actions",
            post(act_on_approval),
        )
        .route(
            "/internal/invoices/{invoice_id}/approval-history",
            get(list_approval_history),
        )
        .route("/internal/approvals/pending", get(list_pending_approvals))
        .with_state(approval_state);

    // レイヤーは後に追加したものほど外側で実行される
    // 1. SetRequestIdLayer（最外）: UUID v7 を生成（またはクライアント提供値を使用）
    // 2. TraceLayer: スパンに request_id を含める
    // 3. PropagateRequestIdLayer: レスポンスヘッダーに X-Request-Id をコピー
    health
        .merge(approval)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
