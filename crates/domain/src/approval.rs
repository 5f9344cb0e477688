//! # 承認ワークフロー
//!
//! 請求書の承認プラン（プラン → スコープ → ステップ）と、その状態遷移を扱う。
//!
//! - [`resolve_chain`]: 申請者と金額から承認者の並びを求める
//! - [`allowed_actors`]: ステップを操作できるユーザー（承認者・代理人）を求める
//! - [`select_actionable_step`]: 操作者が操作するステップを選ぶ
//! - [`cascade_approval`] / [`cascade_rejection`]: 承認・却下の波及を計算する
//!
//! いずれも副作用を持たない。現在時刻は呼び出し元から受け取る。

mod actor;
mod cascade;
mod chain;
#[cfg(test)]
mod chain_props;
mod history;
mod plan;
mod scope;
mod selection;
mod step;

pub use actor::allowed_actors;
pub use cascade::{ApprovalCascade, RejectionCascade, cascade_approval, cascade_rejection};
pub use chain::{ApprovalChain, ChainResolutionError, MAX_CHAIN_DEPTH, resolve_chain};
pub use history::{
    InvoiceApproval,
    InvoiceApprovalId,
    InvoiceApprovalRecord,
    InvoiceApprovalStatus,
    SENT_FOR_APPROVAL_COMMENT,
};
pub use plan::{
    ApprovalPlan,
    ApprovalPlanId,
    ApprovalPlanRecord,
    ApprovalPlanStatus,
    ApprovalPlanWithScopes,
    ApprovalScopeWithSteps,
    NewApprovalPlan,
    NewApprovalPlanTree,
};
pub use scope::{
    ApprovalScope,
    ApprovalScopeId,
    ApprovalScopeRecord,
    ApprovalScopeStatus,
    ApprovalScopeType,
    NewApprovalScope,
};
pub use selection::{PendingStepCandidate, StepSelectionError, select_actionable_step};
pub use step::{
    ApprovalStep,
    ApprovalStepId,
    ApprovalStepRecord,
    ApprovalStepStatus,
    NewApprovalStep,
};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

/// 承認操作
///
/// 承認と却下の 2 種類のみ。波及処理は `match` で網羅する。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalAction {
    /// 承認
    Approve,
    /// 却下
    Reject,
}

impl std::str::FromStr for ApprovalAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(DomainError::Validation(format!(
                "不正な承認操作: {}",
                s
            ))),
        }
    }
}
