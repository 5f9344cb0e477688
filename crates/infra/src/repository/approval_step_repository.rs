//! ApprovalStepRepository: 承認ステップの永続化
//!
//! 承認・却下はステータス条件付き UPDATE（`WHERE status = 'pending'`）で行う。
//! 対象行がなければ他の操作者が先に処理したものとして `Conflict` を返す。
//! これが同一ステップへの同時操作に対する唯一の排他手段になる。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoiceflow_domain::{
    approval::{
        ApprovalPlanId,
        ApprovalScopeId,
        ApprovalStep,
        ApprovalStepId,
        ApprovalStepRecord,
        ApprovalStepStatus,
    },
    firm::FirmId,
    invoice::InvoiceId,
    user::UserId,
    value_objects::{ApprovalComment, StepIndex},
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// 承認待ちステップと対象の請求書
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStepWithInvoice {
    pub invoice_id: InvoiceId,
    pub step: ApprovalStep,
}

/// ApprovalStepRepository トレイト
#[async_trait]
pub trait ApprovalStepRepository: Send + Sync {
    /// ステップをまとめて作成する
    async fn insert_all(
        &self,
        tx: &mut TxContext,
        steps: &[ApprovalStep],
    ) -> Result<(), InfraError>;

    /// ステータス条件付きでステップを更新する
    ///
    /// DB 上のステータスが `expected` と一致する場合のみ更新する。
    /// 不一致の場合は `InfraError::Conflict` を返す。
    async fn update_with_status_check(
        &self,
        tx: &mut TxContext,
        step: &ApprovalStep,
        expected: ApprovalStepStatus,
    ) -> Result<(), InfraError>;

    /// プランのステップ一覧を取得する（スコープ・順序順）
    async fn find_by_plan(
        &self,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalStep>, InfraError>;

    /// トランザクション内でプランのステップ一覧を取得する
    async fn find_by_plan_in_tx(
        &self,
        tx: &mut TxContext,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalStep>, InfraError>;

    /// 指定した承認者の承認待ちステップを取得する
    ///
    /// 進行中のプラン・スコープに属するものに限る。
    async fn find_pending_by_approvers(
        &self,
        firm_id: &FirmId,
        approvers: &[UserId],
    ) -> Result<Vec<PendingStepWithInvoice>, InfraError>;
}

/// DB の approval_steps テーブルの行
#[derive(sqlx::FromRow)]
struct ApprovalStepRow {
    id: Uuid,
    plan_id: Uuid,
    scope_id: Uuid,
    step_index: i32,
    approver_user_id: Uuid,
    status: String,
    acted_by_user_id: Option<Uuid>,
    acted_at: Option<DateTime<Utc>>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApprovalStepRow> for ApprovalStep {
    type Error = InfraError;

    fn try_from(row: ApprovalStepRow) -> Result<Self, Self::Error> {
        Ok(ApprovalStep::from_db(ApprovalStepRecord {
            id: ApprovalStepId::from_uuid(row.id),
            plan_id: ApprovalPlanId::from_uuid(row.plan_id),
            scope_id: ApprovalScopeId::from_uuid(row.scope_id),
            step_index: StepIndex::new(row.step_index)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            approver_user_id: UserId::from_uuid(row.approver_user_id),
            status: row
                .status
                .parse::<ApprovalStepStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            acted_by_user_id: row.acted_by_user_id.map(UserId::from_uuid),
            acted_at: row.acted_at,
            comment: ApprovalComment::parse_optional(row.comment)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

/// 承認待ち一覧の行（ステップ + 請求書 ID）
#[derive(sqlx::FromRow)]
struct PendingStepRow {
    invoice_id: Uuid,
    #[sqlx(flatten)]
    step: ApprovalStepRow,
}

const SELECT_BY_PLAN: &str = r#"
    SELECT
        id, plan_id, scope_id, step_index, approver_user_id, status,
        acted_by_user_id, acted_at, comment, created_at, updated_at
    FROM approval_steps
    WHERE plan_id = $1
    ORDER BY scope_id ASC, step_index ASC
"#;

/// PostgreSQL 実装
pub struct PostgresApprovalStepRepository {
    pool: PgPool,
}

impl PostgresApprovalStepRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApprovalStepRepository for PostgresApprovalStepRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(count = steps.len()))]
    async fn insert_all(
        &self,
        tx: &mut TxContext,
        steps: &[ApprovalStep],
    ) -> Result<(), InfraError> {
        if steps.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO approval_steps (id, plan_id, scope_id, step_index, approver_user_id, \
             status, acted_by_user_id, acted_at, comment, created_at, updated_at) ",
        );
        builder.push_values(steps, |mut row, step| {
            let status: &str = step.status().into();
            row.push_bind(*step.id().as_uuid())
                .push_bind(*step.plan_id().as_uuid())
                .push_bind(*step.scope_id().as_uuid())
                .push_bind(step.step_index().as_i32())
                .push_bind(*step.approver_user_id().as_uuid())
                .push_bind(status)
                .push_bind(step.acted_by_user_id().map(|u| *u.as_uuid()))
                .push_bind(step.acted_at())
                .push_bind(step.comment().map(|c| c.as_str().to_string()))
                .push_bind(step.created_at())
                .push_bind(step.updated_at());
        });
        builder.build().execute(tx.conn()?).await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(step_id = %step.id(), %expected))]
    async fn update_with_status_check(
        &self,
        tx: &mut TxContext,
        step: &ApprovalStep,
        expected: ApprovalStepStatus,
    ) -> Result<(), InfraError> {
        let status: &str = step.status().into();
        let expected: &str = expected.into();
        let result = sqlx::query(
            r#"
            UPDATE approval_steps SET
                status = $1,
                acted_by_user_id = $2,
                acted_at = $3,
                comment = $4,
                updated_at = $5
            WHERE id = $6 AND status = $7
            "#,
        )
        .bind(status)
        .bind(step.acted_by_user_id().map(|u| u.as_uuid()))
        .bind(step.acted_at())
        .bind(step.comment().map(|c| c.as_str()))
        .bind(step.updated_at())
        .bind(step.id().as_uuid())
        .bind(expected)
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("ApprovalStep", step.id().to_string()));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%plan_id))]
    async fn find_by_plan(
        &self,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalStep>, InfraError> {
        let rows = sqlx::query_as::<_, ApprovalStepRow>(SELECT_BY_PLAN)
            .bind(plan_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ApprovalStep::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%plan_id))]
    async fn find_by_plan_in_tx(
        &self,
        tx: &mut TxContext,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalStep>, InfraError> {
        let rows = sqlx::query_as::<_, ApprovalStepRow>(SELECT_BY_PLAN)
            .bind(plan_id.as_uuid())
            .fetch_all(tx.conn()?)
            .await?;

        rows.into_iter().map(ApprovalStep::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%firm_id, approvers = approvers.len()))]
    async fn find_pending_by_approvers(
        &self,
        firm_id: &FirmId,
        approvers: &[UserId],
    ) -> Result<Vec<PendingStepWithInvoice>, InfraError> {
        let approver_ids: Vec<Uuid> = approvers.iter().map(|u| *u.as_uuid()).collect();
        let rows = sqlx::query_as::<_, PendingStepRow>(
            r#"
            SELECT
                p.invoice_id,
                s.id, s.plan_id, s.scope_id, s.step_index, s.approver_user_id, s.status,
                s.acted_by_user_id, s.acted_at, s.comment, s.created_at, s.updated_at
            FROM approval_steps s
            INNER JOIN approval_plans p ON p.id = s.plan_id
            INNER JOIN approval_scopes sc ON sc.id = s.scope_id
            WHERE p.firm_id = $1
              AND p.status = 'active'
              AND sc.status = 'active'
              AND s.status = 'pending'
              AND s.approver_user_id = ANY($2)
            ORDER BY s.updated_at ASC, s.id ASC
            "#,
        )
        .bind(firm_id.as_uuid())
        .bind(&approver_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PendingStepWithInvoice {
                    invoice_id: InvoiceId::from_uuid(row.invoice_id),
                    step: ApprovalStep::try_from(row.step)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        assert_send_sync::<Box<dyn ApprovalStepRepository>>();
    }
}
