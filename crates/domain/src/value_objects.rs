//! # 値オブジェクト
//!
//! 承認ワークフローで共通に使う、識別子を持たない不変オブジェクト。
//!
//! - [`CurrencyCode`]: ISO 4217 通貨コード
//! - [`StepIndex`]: スコープ内の承認順序（1 始まり）
//! - [`ApprovalComment`]: 承認・却下時のコメント

use serde::{Deserialize, Serialize};

use crate::DomainError;

// =========================================================================
// CurrencyCode（通貨コード）
// =========================================================================

/// 通貨コード（ISO 4217）
///
/// 英大文字 3 文字。小文字で渡された場合は大文字に正規化する。
/// 通貨換算は行わないため、承認スコープは請求書の通貨をそのまま引き継ぐ。
///
/// ```rust
/// use invoiceflow_domain::value_objects::CurrencyCode;
///
/// let jpy = CurrencyCode::new("jpy").unwrap();
/// assert_eq!(jpy.as_str(), "JPY");
/// assert!(CurrencyCode::new("YEN!").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_ascii_uppercase();

        if value.len() != 3 || !value.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::Validation(format!(
                "通貨コードは英字 3 文字である必要があります: {}",
                value
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =========================================================================
// StepIndex（承認順序）
// =========================================================================

/// スコープ内の承認順序
///
/// 1 始まり。値が小さいほど先に承認する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepIndex(i32);

impl StepIndex {
    /// 先頭ステップ
    pub fn first() -> Self {
        Self(1)
    }

    pub fn new(value: i32) -> Result<Self, DomainError> {
        if value < 1 {
            return Err(DomainError::Validation(format!(
                "ステップ順序は 1 以上である必要があります: {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// チェーン上の位置（0 始まり）から作成する
    pub fn from_position(position: usize) -> Result<Self, DomainError> {
        let value = i32::try_from(position + 1).map_err(|_| {
            DomainError::Validation(format!("ステップ順序が範囲外です: {}", position))
        })?;
        Self::new(value)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for StepIndex {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::fmt::Display for StepIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =========================================================================
// ApprovalComment（承認コメント）
// =========================================================================

/// コメントの最大文字数
pub const MAX_COMMENT_CHARS: usize = 2000;

/// 承認・却下時のコメント
///
/// 前後の空白を除いた値を保持する。空にはならない（空のコメントは
/// 「コメントなし」として `Option` の外側で表す）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApprovalComment(String);

impl ApprovalComment {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(DomainError::Validation("コメントが空です".to_string()));
        }
        let chars = trimmed.chars().count();
        if chars > MAX_COMMENT_CHARS {
            return Err(DomainError::Validation(format!(
                "コメントは {MAX_COMMENT_CHARS} 文字以内で入力してください（{chars} 文字）"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// 任意入力のコメントを正規化する
    ///
    /// 未指定・空白のみの場合は `None` を返す。
    pub fn parse_optional(value: Option<String>) -> Result<Option<Self>, DomainError> {
        value
            .filter(|v| !v.trim().is_empty())
            .map(Self::new)
            .transpose()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApprovalComment {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApprovalComment> for String {
    fn from(comment: ApprovalComment) -> Self {
        comment.0
    }
}

impl std::fmt::Display for ApprovalComment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
