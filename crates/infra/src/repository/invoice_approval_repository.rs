//! InvoiceApprovalRepository: 承認履歴の永続化
//!
//! 追記専用。更新・削除のメソッドは持たない。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoiceflow_domain::{
    approval::{
        ApprovalPlanId,
        InvoiceApproval,
        InvoiceApprovalId,
        InvoiceApprovalRecord,
        InvoiceApprovalStatus,
    },
    firm::FirmId,
    invoice::InvoiceId,
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// InvoiceApprovalRepository トレイト
#[async_trait]
pub trait InvoiceApprovalRepository: Send + Sync {
    /// 履歴を追記する
    async fn insert(
        &self,
        tx: &mut TxContext,
        approval: &InvoiceApproval,
    ) -> Result<(), InfraError>;

    /// 請求書の履歴を古い順に取得する
    async fn find_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        firm_id: &FirmId,
    ) -> Result<Vec<InvoiceApproval>, InfraError>;
}

/// DB の invoice_approvals テーブルの行
#[derive(sqlx::FromRow)]
struct InvoiceApprovalRow {
    id: Uuid,
    firm_id: Uuid,
    invoice_id: Uuid,
    plan_id: Uuid,
    user_id: Uuid,
    status: String,
    comment: Option<String>,
    acted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvoiceApprovalRow> for InvoiceApproval {
    type Error = InfraError;

    fn try_from(row: InvoiceApprovalRow) -> Result<Self, Self::Error> {
        Ok(InvoiceApproval::from_db(InvoiceApprovalRecord {
            id: InvoiceApprovalId::from_uuid(row.id),
            firm_id: FirmId::from_uuid(row.firm_id),
            invoice_id: InvoiceId::from_uuid(row.invoice_id),
            plan_id: ApprovalPlanId::from_uuid(row.plan_id),
            user_id: UserId::from_uuid(row.user_id),
            status: row
                .status
                .parse::<InvoiceApprovalStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            comment: row.comment,
            acted_at: row.acted_at,
            created_at: row.created_at,
        }))
    }
}

/// PostgreSQL 実装
pub struct PostgresInvoiceApprovalRepository {
    pool: PgPool,
}

impl PostgresInvoiceApprovalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceApprovalRepository for PostgresInvoiceApprovalRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(invoice_id = %approval.invoice_id(), status = %approval.status()))]
    async fn insert(
        &self,
        tx: &mut TxContext,
        approval: &InvoiceApproval,
    ) -> Result<(), InfraError> {
        let status: &str = approval.status().into();
        sqlx::query(
            r#"
            INSERT INTO invoice_approvals (
                id, firm_id, invoice_id, plan_id, user_id, status,
                comment, acted_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(approval.id().as_uuid())
        .bind(approval.firm_id().as_uuid())
        .bind(approval.invoice_id().as_uuid())
        .bind(approval.plan_id().as_uuid())
        .bind(approval.user_id().as_uuid())
        .bind(status)
        .bind(approval.comment())
        .bind(approval.acted_at())
        .bind(approval.created_at())
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%invoice_id, %firm_id))]
    async fn find_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        firm_id: &FirmId,
    ) -> Result<Vec<InvoiceApproval>, InfraError> {
        let rows = sqlx::query_as::<_, InvoiceApprovalRow>(
            r#"
            SELECT
                id, firm_id, invoice_id, plan_id, user_id, status,
                comment, acted_at, created_at
            FROM invoice_approvals
            WHERE invoice_id = $1 AND firm_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(invoice_id.as_uuid())
        .bind(firm_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InvoiceApproval::try_from).collect()
    }
}
