//! InvoiceRepository: 請求書の参照とステータス更新
//!
//! 請求書本体は周辺システムが管理する。承認エンジンは合計金額・通貨・
//! ステータスを読み、ステータスのみを書き換える。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoiceflow_domain::{
    firm::FirmId,
    invoice::{Invoice, InvoiceId, InvoiceRecord, InvoiceStatus},
    value_objects::CurrencyCode,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// InvoiceRepository トレイト
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// ID で請求書を検索する
    async fn find_by_id(
        &self,
        id: &InvoiceId,
        firm_id: &FirmId,
    ) -> Result<Option<Invoice>, InfraError>;

    /// 請求書のステータスを更新する
    ///
    /// 転記済み（`posted`）の請求書は更新しない。対象行がない場合は
    /// `InfraError::Conflict` を返す。
    async fn update_status(
        &self,
        tx: &mut TxContext,
        id: &InvoiceId,
        firm_id: &FirmId,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InfraError>;
}

/// DB の invoices テーブルの行
#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    firm_id: Uuid,
    status: String,
    total_amount: Decimal,
    currency_code: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = InfraError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice::from_db(InvoiceRecord {
            id: InvoiceId::from_uuid(row.id),
            firm_id: FirmId::from_uuid(row.firm_id),
            status: row
                .status
                .parse::<InvoiceStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            total_amount: row.total_amount,
            currency_code: CurrencyCode::new(row.currency_code)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            updated_at: row.updated_at,
        }))
    }
}

/// PostgreSQL 実装
pub struct PostgresInvoiceRepository {
    pool: PgPool,
}

impl PostgresInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%id, %firm_id))]
    async fn find_by_id(
        &self,
        id: &InvoiceId,
        firm_id: &FirmId,
    ) -> Result<Option<Invoice>, InfraError> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, firm_id, status, total_amount, currency_code, updated_at
            FROM invoices
            WHERE id = $1 AND firm_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(firm_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Invoice::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id, %firm_id, %status))]
    async fn update_status(
        &self,
        tx: &mut TxContext,
        id: &InvoiceId,
        firm_id: &FirmId,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        let status: &str = status.into();
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status = $1,
                updated_at = $2
            WHERE id = $3 AND firm_id = $4 AND status <> 'posted'
            "#,
        )
        .bind(status)
        .bind(now)
        .bind(id.as_uuid())
        .bind(firm_id.as_uuid())
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("Invoice", id.to_string()));
        }

        Ok(())
    }
}
