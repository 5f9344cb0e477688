//! # 操作対象ステップの選択
//!
//! 進行中スコープの承認待ちステップから、操作者が操作できるものを 1 件選ぶ。
//! スコープが複数ある場合に備え、呼び出し元は `scope_id` で対象を絞り込める。

use std::collections::HashSet;

use thiserror::Error;

use super::{scope::ApprovalScopeId, step::ApprovalStep};
use crate::user::UserId;

/// 操作対象の候補となる承認待ちステップ
#[derive(Debug, Clone)]
pub struct PendingStepCandidate {
    pub step: ApprovalStep,
    /// 操作時点で操作可能なユーザー
    pub allowed_actors: HashSet<UserId>,
}

/// 操作対象ステップの選択エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepSelectionError {
    /// 承認待ちのステップが残っていない（409）
    #[error("承認待ちのステップがありません")]
    NoPendingStep,

    /// 操作者が操作できるステップがない（403）
    #[error("この承認ステップを操作する権限がありません")]
    NotEligible,

    /// 複数スコープで操作可能なため対象を特定できない（400）
    #[error("複数の承認待ちがあるため scope_id の指定が必要です")]
    AmbiguousScope,
}

/// 操作者が操作する承認ステップを選ぶ
///
/// `scope_id` が指定された場合はそのスコープのステップに限定する。
/// 指定がない場合、操作可能なステップが複数スコープにまたがると特定できない。
pub fn select_actionable_step(
    candidates: Vec<PendingStepCandidate>,
    actor: &UserId,
    scope_id: Option<&ApprovalScopeId>,
) -> Result<ApprovalStep, StepSelectionError> {
    if candidates.is_empty() {
        return Err(StepSelectionError::NoPendingStep);
    }

    let mut eligible: Vec<ApprovalStep> = candidates
        .into_iter()
        .filter(|c| c.allowed_actors.contains(actor))
        .map(|c| c.step)
        .collect();

    if let Some(scope_id) = scope_id {
        return eligible
            .into_iter()
            .find(|step| step.scope_id() == scope_id)
            .ok_or(StepSelectionError::NotEligible);
    }

    let scopes: HashSet<&ApprovalScopeId> = eligible.iter().map(|s| s.scope_id()).collect();
    if scopes.len() > 1 {
        return Err(StepSelectionError::AmbiguousScope);
    }

    eligible.sort_by_key(|s| s.step_index());
    eligible
        .into_iter()
        .next()
        .ok_or(StepSelectionError::NotEligible)
}
