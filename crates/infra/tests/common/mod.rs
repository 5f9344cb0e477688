//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するシードデータ投入・
//! エンティティ生成ヘルパー。 Rust の統合テスト規約に従い `tests/common/mod.rs`
//! に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use invoiceflow_domain::{
    approval::{ApprovalChain, ApprovalPlanId, ApprovalPlanWithScopes, NewApprovalPlanTree},
    firm::FirmId,
    invoice::{InvoiceId, InvoiceStatus},
    user::UserId,
    value_objects::CurrencyCode,
};
use invoiceflow_infra::{
    db::{PgTransactionManager, TransactionManager},
    repository::{
        ApprovalPlanRepository,
        ApprovalScopeRepository,
        ApprovalStepRepository,
        PostgresApprovalPlanRepository,
        PostgresApprovalScopeRepository,
        PostgresApprovalStepRepository,
    },
};
use rust_decimal::Decimal;
use sqlx::PgPool;

/// テスト用の固定日時
pub fn test_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn jpy() -> CurrencyCode {
    CurrencyCode::new("JPY").unwrap()
}

// =============================================================================
// シードデータ投入
// =============================================================================

/// 請求書を直接 INSERT する
///
/// 請求書の作成は周辺システムの責務のため、リポジトリには INSERT がない。
pub async fn seed_invoice(
    pool: &PgPool,
    firm_id: &FirmId,
    status: InvoiceStatus,
    total_amount: Decimal,
) -> InvoiceId {
    let id = InvoiceId::new();
    let status: &str = status.into();
    sqlx::query(
        r#"
        INSERT INTO invoices (id, firm_id, status, total_amount, currency_code)
        VALUES ($1, $2, $3, $4, 'JPY')
        "#,
    )
    .bind(id.as_uuid())
    .bind(firm_id.as_uuid())
    .bind(status)
    .bind(total_amount)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// 承認設定を直接 INSERT する
pub async fn seed_setup(
    pool: &PgPool,
    firm_id: &FirmId,
    user_id: &UserId,
    approver: Option<&UserId>,
    approval_limit: Option<Decimal>,
) {
    sqlx::query(
        r#"
        INSERT INTO approval_setups (firm_id, user_id, approver_user_id, approval_limit)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(firm_id.as_uuid())
    .bind(user_id.as_uuid())
    .bind(approver.map(|a| *a.as_uuid()))
    .bind(approval_limit)
    .execute(pool)
    .await
    .unwrap();
}

// =============================================================================
// エンティティ生成ヘルパー
// =============================================================================

/// 承認者の並びからプラン一式を組み立てる
pub fn build_plan_tree(
    firm_id: &FirmId,
    invoice_id: &InvoiceId,
    requester: &UserId,
    approvers: Vec<UserId>,
) -> ApprovalPlanWithScopes {
    let chain = ApprovalChain::new(approvers).unwrap();
    ApprovalPlanWithScopes::from_chain(NewApprovalPlanTree {
        plan_id: ApprovalPlanId::new(),
        firm_id: firm_id.clone(),
        invoice_id: invoice_id.clone(),
        requester_user_id: requester.clone(),
        amount: Decimal::new(1_000, 0),
        currency_code: jpy(),
        chain: &chain,
        now: test_now(),
    })
    .unwrap()
}

/// プラン一式を 1 トランザクションで保存する
pub async fn insert_plan_tree(pool: &PgPool, tree: &ApprovalPlanWithScopes) {
    let tx_manager = PgTransactionManager::new(pool.clone());
    let plan_repo = PostgresApprovalPlanRepository::new(pool.clone());
    let scope_repo = PostgresApprovalScopeRepository::new(pool.clone());
    let step_repo = PostgresApprovalStepRepository::new(pool.clone());

    let mut tx = tx_manager.begin().await.unwrap();
    plan_repo.insert(&mut tx, &tree.plan).await.unwrap();
    for scope in &tree.scopes {
        scope_repo.insert(&mut tx, &scope.scope).await.unwrap();
        step_repo.insert_all(&mut tx, &scope.steps).await.unwrap();
    }
    tx.commit().await.unwrap();
}
