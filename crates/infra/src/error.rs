//! # インフラ層エラー
//!
//! [`InfraError`] は種別（[`InfraErrorKind`]）と、生成時点のスパン階層
//! （[`SpanTrace`]）を持つ。ユースケース層はスパンを意識せず `?` で伝播し、
//! 500 としてログに出す時点でどのリポジトリ呼び出しで失敗したかを辿れる。

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層エラー
///
/// 種別ごとの分岐は [`kind()`](InfraError::kind)、状態ガードの競合判定は
/// [`as_conflict()`](InfraError::as_conflict) を使う。
#[derive(Debug, Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// SQL の実行失敗・接続断など
    #[error("データベースエラー: {0}")]
    Database(#[source] sqlx::Error),

    /// 状態ガード付き UPDATE の対象行なし、または一意制約違反
    #[error("競合が発生しました: {entity}(id={id})")]
    Conflict { entity: String, id: String },

    /// DB の値をドメインモデルに復元できない
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

impl InfraError {
    fn new(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(InfraErrorKind::Conflict {
            entity: entity.into(),
            id:     id.into(),
        })
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(InfraErrorKind::Unexpected(message.into()))
    }

    /// INSERT の失敗を変換する
    ///
    /// 一意制約違反は `Conflict`、それ以外は `Database`。
    pub fn from_insert(source: sqlx::Error, entity: &str, id: impl Into<String>) -> Self {
        match source.as_database_error() {
            Some(db) if db.is_unique_violation() => Self::conflict(entity, id),
            _ => source.into(),
        }
    }

    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// 競合なら `(entity, id)` を返す
    pub fn as_conflict(&self) -> Option<(&str, &str)> {
        match &self.kind {
            InfraErrorKind::Conflict { entity, id } => Some((entity, id)),
            _ => None,
        }
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self::new(InfraErrorKind::Database(source))
    }
}
