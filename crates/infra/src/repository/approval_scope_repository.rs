//! ApprovalScopeRepository: 承認スコープの永続化

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoiceflow_domain::{
    approval::{
        ApprovalPlanId,
        ApprovalScope,
        ApprovalScopeId,
        ApprovalScopeRecord,
        ApprovalScopeStatus,
        ApprovalScopeType,
    },
    value_objects::CurrencyCode,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// ApprovalScopeRepository トレイト
#[async_trait]
pub trait ApprovalScopeRepository: Send + Sync {
    /// 新規スコープを作成する
    async fn insert(&self, tx: &mut TxContext, scope: &ApprovalScope) -> Result<(), InfraError>;

    /// ステータス条件付きでスコープを更新する
    ///
    /// DB 上のステータスが `expected` と一致しない場合は `InfraError::Conflict` を返す。
    async fn update_with_status_check(
        &self,
        tx: &mut TxContext,
        scope: &ApprovalScope,
        expected: ApprovalScopeStatus,
    ) -> Result<(), InfraError>;

    /// プランのスコープ一覧を取得する
    async fn find_by_plan(
        &self,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalScope>, InfraError>;

    /// トランザクション内でプランのスコープ一覧を取得する
    ///
    /// 承認操作中に他のトランザクションの結果と混ざらないよう、
    /// 書き込みと同じトランザクションで読む。
    async fn find_by_plan_in_tx(
        &self,
        tx: &mut TxContext,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalScope>, InfraError>;
}

/// DB の approval_scopes テーブルの行
#[derive(sqlx::FromRow)]
struct ApprovalScopeRow {
    id: Uuid,
    plan_id: Uuid,
    scope_type: String,
    scope_key: Option<String>,
    amount: Decimal,
    currency_code: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApprovalScopeRow> for ApprovalScope {
    type Error = InfraError;

    fn try_from(row: ApprovalScopeRow) -> Result<Self, Self::Error> {
        Ok(ApprovalScope::from_db(ApprovalScopeRecord {
            id: ApprovalScopeId::from_uuid(row.id),
            plan_id: ApprovalPlanId::from_uuid(row.plan_id),
            scope_type: row
                .scope_type
                .parse::<ApprovalScopeType>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            scope_key: row.scope_key,
            amount: row.amount,
            currency_code: CurrencyCode::new(row.currency_code)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            status: row
                .status
                .parse::<ApprovalScopeStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

const SELECT_BY_PLAN: &str = r#"
    SELECT
        id, plan_id, scope_type, scope_key, amount, currency_code,
        status, created_at, updated_at
    FROM approval_scopes
    WHERE plan_id = $1
    ORDER BY created_at ASC, id ASC
"#;

/// PostgreSQL 実装
pub struct PostgresApprovalScopeRepository {
    pool: PgPool,
}

impl PostgresApprovalScopeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApprovalScopeRepository for PostgresApprovalScopeRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(scope_id = %scope.id(), plan_id = %scope.plan_id()))]
    async fn insert(&self, tx: &mut TxContext, scope: &ApprovalScope) -> Result<(), InfraError> {
        let scope_type: &str = scope.scope_type().into();
        let status: &str = scope.status().into();
        sqlx::query(
            r#"
            INSERT INTO approval_scopes (
                id, plan_id, scope_type, scope_key, amount, currency_code,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(scope.id().as_uuid())
        .bind(scope.plan_id().as_uuid())
        .bind(scope_type)
        .bind(scope.scope_key())
        .bind(scope.amount())
        .bind(scope.currency_code().as_str())
        .bind(status)
        .bind(scope.created_at())
        .bind(scope.updated_at())
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(scope_id = %scope.id(), %expected))]
    async fn update_with_status_check(
        &self,
        tx: &mut TxContext,
        scope: &ApprovalScope,
        expected: ApprovalScopeStatus,
    ) -> Result<(), InfraError> {
        let status: &str = scope.status().into();
        let expected: &str = expected.into();
        let result = sqlx::query(
            r#"
            UPDATE approval_scopes SET
                status = $1,
                updated_at = $2
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(status)
        .bind(scope.updated_at())
        .bind(scope.id().as_uuid())
        .bind(expected)
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("ApprovalScope", scope.id().to_string()));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%plan_id))]
    async fn find_by_plan(
        &self,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalScope>, InfraError> {
        let rows = sqlx::query_as::<_, ApprovalScopeRow>(SELECT_BY_PLAN)
            .bind(plan_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ApprovalScope::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%plan_id))]
    async fn find_by_plan_in_tx(
        &self,
        tx: &mut TxContext,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalScope>, InfraError> {
        let rows = sqlx::query_as::<_, ApprovalScopeRow>(SELECT_BY_PLAN)
            .bind(plan_id.as_uuid())
            .fetch_all(tx.conn()?)
            .await?;

        rows.into_iter().map(ApprovalScope::try_from).collect()
    }
}
