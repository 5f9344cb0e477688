//! # エラーレスポンス
//!
//! RFC 9457 Problem Details 形式のエラーボディ。
//! `type` は [`ProblemType`] ごとに固定の URI を持つ。
//! HTTP レスポンスへの変換は承認サービス側で行う。

use serde::{Deserialize, Serialize};

const PROBLEM_TYPE_BASE: &str = "https://invoiceflow.example.com/errors";

/// 承認サービスが返すエラーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemType {
    BadRequest,
    /// 承認者・上限額の設定から承認者列を組み立てられない
    ApprovalChain,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ProblemType {
    fn slug(self) -> &'static str {
        match self {
            Self::BadRequest => "bad-request",
            Self::ApprovalChain => "approval-chain",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not-found",
            Self::Conflict => "conflict",
            Self::Internal => "internal-error",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request",
            Self::ApprovalChain => "Approval Chain Misconfigured",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::Conflict => "Conflict",
            Self::Internal => "Internal Server Error",
        }
    }

    pub fn status(self) -> u16 {
        match self {
            Self::BadRequest | Self::ApprovalChain => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

/// Problem Details ボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

impl ErrorResponse {
    pub fn of(problem: ProblemType, detail: impl Into<String>) -> Self {
        Self {
            error_type: format!("{PROBLEM_TYPE_BASE}/{}", problem.slug()),
            title:      problem.title().to_string(),
            status:     problem.status(),
            detail:     detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::of(ProblemType::BadRequest, detail)
    }

    pub fn approval_chain(detail: impl Into<String>) -> Self {
        Self::of(ProblemType::ApprovalChain, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::of(ProblemType::Forbidden, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::of(ProblemType::NotFound, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::of(ProblemType::Conflict, detail)
    }

    /// 500 の detail は内部事情を漏らさない固定文言にする
    pub fn internal_error() -> Self {
        Self::of(ProblemType::Internal, "内部エラーが発生しました")
    }
}
