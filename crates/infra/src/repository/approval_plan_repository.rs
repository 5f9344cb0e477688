//! ApprovalPlanRepository: 承認プランの永続化
//!
//! 請求書ごとの進行中プランは `uq_approval_plans_active_invoice`
//! （部分ユニークインデックス）で 1 件に制限する。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoiceflow_domain::{
    approval::{ApprovalPlan, ApprovalPlanId, ApprovalPlanRecord, ApprovalPlanStatus},
    firm::FirmId,
    invoice::InvoiceId,
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// ApprovalPlanRepository トレイト
#[async_trait]
pub trait ApprovalPlanRepository: Send + Sync {
    /// 新規プランを作成する
    ///
    /// 同じ請求書に進行中のプランが既にある場合は `InfraError::Conflict` を返す。
    async fn insert(&self, tx: &mut TxContext, plan: &ApprovalPlan) -> Result<(), InfraError>;

    /// ステータス条件付きでプランを更新する
    ///
    /// DB 上のステータスが `expected` と一致する場合のみ更新する。
    /// 不一致の場合は `InfraError::Conflict` を返す。
    async fn update_with_status_check(
        &self,
        tx: &mut TxContext,
        plan: &ApprovalPlan,
        expected: ApprovalPlanStatus,
    ) -> Result<(), InfraError>;

    /// 請求書の進行中プランを取得する
    async fn find_active_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        firm_id: &FirmId,
    ) -> Result<Option<ApprovalPlan>, InfraError>;
}

/// DB の approval_plans テーブルの行
#[derive(sqlx::FromRow)]
struct ApprovalPlanRow {
    id: Uuid,
    firm_id: Uuid,
    invoice_id: Uuid,
    requester_user_id: Uuid,
    status: String,
    completed_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApprovalPlanRow> for ApprovalPlan {
    type Error = InfraError;

    fn try_from(row: ApprovalPlanRow) -> Result<Self, Self::Error> {
        Ok(ApprovalPlan::from_db(ApprovalPlanRecord {
            id: ApprovalPlanId::from_uuid(row.id),
            firm_id: FirmId::from_uuid(row.firm_id),
            invoice_id: InvoiceId::from_uuid(row.invoice_id),
            requester_user_id: UserId::from_uuid(row.requester_user_id),
            status: row
                .status
                .parse::<ApprovalPlanStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            completed_at: row.completed_at,
            rejected_at: row.rejected_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

/// PostgreSQL 実装
pub struct PostgresApprovalPlanRepository {
    pool: PgPool,
}

impl PostgresApprovalPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApprovalPlanRepository for PostgresApprovalPlanRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(plan_id = %plan.id(), invoice_id = %plan.invoice_id()))]
    async fn insert(&self, tx: &mut TxContext, plan: &ApprovalPlan) -> Result<(), InfraError> {
        let status: &str = plan.status().into();
        sqlx::query(
            r#"
            INSERT INTO approval_plans (
                id, firm_id, invoice_id, requester_user_id, status,
                completed_at, rejected_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(plan.id().as_uuid())
        .bind(plan.firm_id().as_uuid())
        .bind(plan.invoice_id().as_uuid())
        .bind(plan.requester_user_id().as_uuid())
        .bind(status)
        .bind(plan.completed_at())
        .bind(plan.rejected_at())
        .bind(plan.created_at())
        .bind(plan.updated_at())
        .execute(tx.conn()?)
        .await
        .map_err(|e| InfraError::from_insert(e, "ApprovalPlan", plan.invoice_id().to_string()))?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(plan_id = %plan.id(), %expected))]
    async fn update_with_status_check(
        &self,
        tx: &mut TxContext,
        plan: &ApprovalPlan,
        expected: ApprovalPlanStatus,
    ) -> Result<(), InfraError> {
        let status: &str = plan.status().into();
        let expected: &str = expected.into();
        let result = sqlx::query(
            r#"
            UPDATE approval_plans SET
                status = $1,
                completed_at = $2,
                rejected_at = $3,
                updated_at = $4
            WHERE id = $5 AND firm_id = $6 AND status = $7
            "#,
        )
        .bind(status)
        .bind(plan.completed_at())
        .bind(plan.rejected_at())
        .bind(plan.updated_at())
        .bind(plan.id().as_uuid())
        .bind(plan.firm_id().as_uuid())
        .bind(expected)
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("ApprovalPlan", plan.id().to_string()));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%invoice_id, %firm_id))]
    async fn find_active_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        firm_id: &FirmId,
    ) -> Result<Option<ApprovalPlan>, InfraError> {
        let row = sqlx::query_as::<_, ApprovalPlanRow>(
            r#"
            SELECT
                id, firm_id, invoice_id, requester_user_id, status,
                completed_at, rejected_at, created_at, updated_at
            FROM approval_plans
            WHERE invoice_id = $1 AND firm_id = $2 AND status = 'active'
            "#,
        )
        .bind(invoice_id.as_uuid())
        .bind(firm_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ApprovalPlan::try_from).transpose()
    }
}
