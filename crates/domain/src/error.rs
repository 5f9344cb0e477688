//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗、許可されない状態遷移 |
//! | `NotFound` | 404 Not Found | エンティティが存在しない |
//! | `Conflict` | 409 Conflict | 状態ガード付き更新の失敗 |
//! | `Forbidden` | 403 Forbidden | 権限不足 |
//!
//! 承認チェーン解決と操作対象ステップの選択には、より細かい型付きエラー
//! （[`ChainResolutionError`](crate::approval::ChainResolutionError),
//! [`StepSelectionError`](crate::approval::StepSelectionError)）を用意している。
//!
//! ## 使用例
//!
//! ```rust
//! use invoiceflow_domain::DomainError;
//!
//! fn validate_amount(amount: i64) -> Result<(), DomainError> {
//!     if amount < 0 {
//!         return Err(DomainError::Validation("金額は 0 以上である必要があります".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// サービス層でこのエラーを受け取り、適切な HTTP レスポンスに変換する。
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合、または現在の状態から
    /// 許可されない遷移を要求された場合に使用する。
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"Invoice", "ApprovalPlan" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 競合エラー
    ///
    /// 同時更新により、期待した状態が既に変わっていた場合に使用する。
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 権限エラー
    ///
    /// 認証（Authentication）ではなく認可（Authorization）の失敗を表す。
    #[error("権限がありません: {0}")]
    Forbidden(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_not_foundのメッセージにエンティティ種別とidが含まれる() {
        let error = DomainError::NotFound {
            entity_type: "Invoice",
            id:          "inv-1".to_string(),
        };

        assert_eq!(error.to_string(), "Invoice が見つかりません: inv-1");
    }

    #[test]
    fn test_validationのメッセージ() {
        let error = DomainError::Validation("金額が不正です".to_string());

        assert_eq!(error.to_string(), "バリデーションエラー: 金額が不正です");
    }
}
