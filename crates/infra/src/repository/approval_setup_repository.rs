//! ApprovalSetupRepository: 承認設定の参照
//!
//! 承認設定は事業所の管理者が登録する。承認エンジンは読み取りのみ行い、
//! リクエストごとに事業所分をまとめて読み込んでチェーン解決と代理人判定に使う。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoiceflow_domain::{
    approval_setup::{ApprovalSetup, ApprovalSetupRecord},
    firm::FirmId,
    user::UserId,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// ApprovalSetupRepository トレイト
#[async_trait]
pub trait ApprovalSetupRepository: Send + Sync {
    /// 事業所の承認設定をすべて取得する
    async fn find_all_by_firm(&self, firm_id: &FirmId) -> Result<Vec<ApprovalSetup>, InfraError>;
}

/// DB の approval_setups テーブルの行
#[derive(sqlx::FromRow)]
struct ApprovalSetupRow {
    firm_id: Uuid,
    user_id: Uuid,
    approver_user_id: Option<Uuid>,
    approval_limit: Option<Decimal>,
    substitute_user_id: Option<Uuid>,
    substitute_from: Option<DateTime<Utc>>,
    substitute_to: Option<DateTime<Utc>>,
    active: bool,
}

impl From<ApprovalSetupRow> for ApprovalSetup {
    fn from(row: ApprovalSetupRow) -> Self {
        ApprovalSetup::from_db(ApprovalSetupRecord {
            firm_id: FirmId::from_uuid(row.firm_id),
            user_id: UserId::from_uuid(row.user_id),
            approver_user_id: row.approver_user_id.map(UserId::from_uuid),
            approval_limit: row.approval_limit,
            substitute_user_id: row.substitute_user_id.map(UserId::from_uuid),
            substitute_from: row.substitute_from,
            substitute_to: row.substitute_to,
            active: row.active,
        })
    }
}

/// PostgreSQL 実装
pub struct PostgresApprovalSetupRepository {
    pool: PgPool,
}

impl PostgresApprovalSetupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApprovalSetupRepository for PostgresApprovalSetupRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%firm_id))]
    async fn find_all_by_firm(&self, firm_id: &FirmId) -> Result<Vec<ApprovalSetup>, InfraError> {
        let rows = sqlx::query_as::<_, ApprovalSetupRow>(
            r#"
            SELECT
                firm_id, user_id, approver_user_id, approval_limit,
                substitute_user_id, substitute_from, substitute_to, active
            FROM approval_setups
            WHERE firm_id = $1
            "#,
        )
        .bind(firm_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ApprovalSetup::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        assert_send_sync::<Box<dyn ApprovalSetupRepository>>();
    }
}
