//! ユースケース層の共通ヘルパー
//!
//! リポジトリ呼び出し結果の変換など、繰り返されるパターンを共通化する。

use invoiceflow_infra::InfraError;

use crate::error::ServiceError;

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, ServiceError>` に変換する
///
/// ```ignore
/// let invoice = self.deps.invoice_repo.find_by_id(&invoice_id, &firm_id).await
///     .or_not_found("請求書")?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `ServiceError::NotFound`、`InfraError` の場合は `ServiceError::Database` を返す
    fn or_not_found(self, entity_name: &str) -> Result<T, ServiceError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity_name: &str) -> Result<T, ServiceError> {
        self?
            .ok_or_else(|| ServiceError::NotFound(format!("{}が見つかりません", entity_name)))
    }
}

/// 状態ガード付き更新の競合を 409 に変換する
///
/// 競合以外の `InfraError` は `ServiceError::Database` のまま返す。
pub(crate) fn conflict_as(message: &str) -> impl FnOnce(InfraError) -> ServiceError + '_ {
    move |e| {
        if e.as_conflict().is_some() {
            ServiceError::Conflict(message.to_string())
        } else {
            ServiceError::Database(e)
        }
    }
}
