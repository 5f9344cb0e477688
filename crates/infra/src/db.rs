//! # データベース接続
//!
//! 接続プールとマイグレーション、書き込み用トランザクションを扱う。
//!
//! 書き込み系のリポジトリメソッドは `&mut TxContext` を引数に取る。
//! 承認・却下の波及（ステップ、スコープ、プラン、請求書、履歴）は
//! 同じ `TxContext` に積み、最後に一度だけ `commit()` する。
//!
//! ```rust,ignore
//! let mut tx = tx_manager.begin().await?;
//! step_repo.update_with_status_check(&mut tx, &step, ApprovalStepStatus::Pending).await?;
//! approval_repo.insert(&mut tx, &history).await?;
//! tx.commit().await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction, postgres::PgPoolOptions};

use crate::error::InfraError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// `migrations/` の未適用分を流す
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// 接続プールを作る
///
/// 起動時に一度だけ呼び、各リポジトリへ clone して渡す。
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// `SELECT 1` で疎通を確認する
pub async fn ping(pool: &PgPool) -> Result<(), InfraError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// 進行中のトランザクション
///
/// `commit()` せずにドロップするとロールバックされる。
pub struct TxContext {
    inner: Inner,
}

enum Inner {
    Pg(Transaction<'static, Postgres>),
    #[cfg(any(test, feature = "test-utils"))]
    Mock,
}

impl TxContext {
    /// インメモリリポジトリ用
    #[cfg(any(test, feature = "test-utils"))]
    pub fn mock() -> Self {
        Self { inner: Inner::Mock }
    }

    pub async fn commit(self) -> Result<(), InfraError> {
        match self.inner {
            Inner::Pg(tx) => Ok(tx.commit().await?),
            #[cfg(any(test, feature = "test-utils"))]
            Inner::Mock => Ok(()),
        }
    }

    /// SQL を流すためのコネクション
    ///
    /// モックでは接続を持たないため `Unexpected` を返す。
    pub(crate) fn conn(&mut self) -> Result<&mut PgConnection, InfraError> {
        match &mut self.inner {
            Inner::Pg(tx) => Ok(&mut **tx),
            #[cfg(any(test, feature = "test-utils"))]
            Inner::Mock => Err(InfraError::unexpected(
                "モックのトランザクションでは SQL を実行できません",
            )),
        }
    }
}

/// トランザクションの開始口
///
/// ユースケース層は `PgPool` を持たず、これ経由で `TxContext` を得る。
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> Result<TxContext, InfraError>;
}

pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        let tx = self.pool.begin().await?;
        Ok(TxContext { inner: Inner::Pg(tx) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InfraErrorKind;

    fn is_send<T: Send>() {}
    fn is_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_トランザクション関連の型はスレッド間で受け渡せる() {
        is_send::<TxContext>();
        is_send_sync::<PgTransactionManager>();
        is_send_sync::<std::sync::Arc<dyn TransactionManager>>();
    }

    #[tokio::test]
    async fn test_モックのトランザクションはコミットできる() {
        assert!(TxContext::mock().commit().await.is_ok());
    }

    #[test]
    fn test_モックのトランザクションからはコネクションを取れない() {
        let mut tx = TxContext::mock();

        let err = tx.conn().unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::Unexpected(_)));
    }
}
