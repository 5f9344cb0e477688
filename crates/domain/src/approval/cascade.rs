//! # 承認・却下の波及
//!
//! ステップが承認・却下されたあと、同じプラン内のステップ・スコープ・プランに
//! 及ぶ状態遷移を計算する。永続化は行わず、更新後のエンティティと
//! 更新前のステータス（条件付き更新の期待値）を返す。
//!
//! - 承認: 同じスコープの次の待機中ステップを承認待ちに進める。
//!   残っていなければスコープを完了し、進行中のスコープが他になければ
//!   プランを完了する
//! - 却下: プランを却下し、進行中のスコープと未判断のステップを
//!   プラン全体で取り消す

use chrono::{DateTime, Utc};

use super::{
    plan::{ApprovalPlan, ApprovalPlanStatus},
    scope::ApprovalScope,
    step::{ApprovalStep, ApprovalStepStatus},
};
use crate::{DomainError, invoice::InvoiceStatus};

/// 承認の波及結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalCascade {
    /// 承認待ちに進めたステップ（更新前は `blocked`）
    pub promoted_step: Option<ApprovalStep>,
    /// 完了したスコープ（更新前は `active`）
    pub completed_scope: Option<ApprovalScope>,
    /// 完了したプラン（更新前は `active`）
    pub completed_plan: Option<ApprovalPlan>,
}

impl ApprovalCascade {
    pub fn invoice_status(&self) -> InvoiceStatus {
        if self.completed_plan.is_some() {
            InvoiceStatus::Approved
        } else {
            InvoiceStatus::PendingApproval
        }
    }

    pub fn plan_status(&self) -> ApprovalPlanStatus {
        if self.completed_plan.is_some() {
            ApprovalPlanStatus::Completed
        } else {
            ApprovalPlanStatus::Active
        }
    }
}

/// 却下の波及結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionCascade {
    /// 却下したプラン（更新前は `active`）
    pub rejected_plan: ApprovalPlan,
    /// 取り消したスコープ（更新前は `active`）
    pub canceled_scopes: Vec<ApprovalScope>,
    /// 取り消したステップと更新前のステータス
    pub canceled_steps: Vec<(ApprovalStep, ApprovalStepStatus)>,
}

impl RejectionCascade {
    pub fn invoice_status(&self) -> InvoiceStatus {
        InvoiceStatus::Rejected
    }

    pub fn plan_status(&self) -> ApprovalPlanStatus {
        self.rejected_plan.status()
    }
}

/// 承認されたステップからの波及を計算する
///
/// `scopes` / `steps` には承認操作前のプラン全体を渡す。
///
/// # Errors
///
/// - `DomainError::NotFound`: 承認されたステップのスコープが `scopes` にない場合
/// - `DomainError::Validation`: 既に終了したスコープ・プランを更新しようとした場合
pub fn cascade_approval(
    plan: ApprovalPlan,
    scopes: &[ApprovalScope],
    steps: &[ApprovalStep],
    approved: &ApprovalStep,
    now: DateTime<Utc>,
) -> Result<ApprovalCascade, DomainError> {
    let scope_id = approved.scope_id();

    let next_blocked = steps
        .iter()
        .filter(|s| s.scope_id() == scope_id && s.status() == ApprovalStepStatus::Blocked)
        .min_by_key(|s| s.step_index());

    if let Some(next) = next_blocked {
        return Ok(ApprovalCascade {
            promoted_step: Some(next.clone().promoted(now)?),
            completed_scope: None,
            completed_plan: None,
        });
    }

    let scope = scopes
        .iter()
        .find(|s| s.id() == scope_id)
        .ok_or_else(|| DomainError::NotFound {
            entity_type: "承認スコープ",
            id: scope_id.to_string(),
        })?;
    let completed_scope = scope.clone().completed(now)?;

    let other_active_scopes = scopes
        .iter()
        .filter(|s| s.id() != scope_id && s.is_active())
        .count();
    let completed_plan = if other_active_scopes == 0 {
        Some(plan.completed(now)?)
    } else {
        None
    };

    Ok(ApprovalCascade {
        promoted_step: None,
        completed_scope: Some(completed_scope),
        completed_plan,
    })
}

/// 却下されたステップからの波及を計算する
///
/// `scopes` / `steps` には却下操作前のプラン全体を渡す。
///
/// # Errors
///
/// - `DomainError::Validation`: 既に終了したプランを却下しようとした場合
pub fn cascade_rejection(
    plan: ApprovalPlan,
    scopes: &[ApprovalScope],
    steps: &[ApprovalStep],
    rejected: &ApprovalStep,
    now: DateTime<Utc>,
) -> Result<RejectionCascade, DomainError> {
    let rejected_plan = plan.rejected(now)?;

    let canceled_scopes = scopes
        .iter()
        .filter(|s| s.is_active())
        .map(|s| s.clone().canceled(now))
        .collect::<Result<Vec<_>, _>>()?;

    let canceled_steps = steps
        .iter()
        .filter(|s| s.id() != rejected.id() && s.status().is_undecided())
        .map(|s| {
            let previous = s.status();
            s.clone().canceled(now).map(|canceled| (canceled, previous))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RejectionCascade {
        rejected_plan,
        canceled_scopes,
        canceled_steps,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        approval::{
            ApprovalChain,
            ApprovalPlanWithScopes,
            ApprovalScopeStatus,
            NewApprovalPlanTree,
            plan::ApprovalPlanId,
            scope::{ApprovalScopeId, ApprovalScopeType, NewApprovalScope},
            step::{ApprovalStepId, NewApprovalStep},
        },
        firm::FirmId,
        invoice::InvoiceId,
        user::UserId,
        value_objects::{CurrencyCode, StepIndex},
    };

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn three_step_plan(now: DateTime<Utc>) -> ApprovalPlanWithScopes {
        let chain = ApprovalChain::new(vec![UserId::new(), UserId::new(), UserId::new()]).unwrap();
        ApprovalPlanWithScopes::from_chain(NewApprovalPlanTree {
            plan_id: ApprovalPlanId::new(),
            firm_id: FirmId::new(),
            invoice_id: InvoiceId::new(),
            requester_user_id: UserId::new(),
            amount: dec!(5000),
            currency_code: CurrencyCode::new("JPY").unwrap(),
            chain: &chain,
            now,
        })
        .unwrap()
    }

    fn scopes_of(tree: &ApprovalPlanWithScopes) -> Vec<ApprovalScope> {
        tree.scopes.iter().map(|s| s.scope.clone()).collect()
    }

    fn steps_of(tree: &ApprovalPlanWithScopes) -> Vec<ApprovalStep> {
        tree.scopes.iter().flat_map(|s| s.steps.clone()).collect()
    }

    #[rstest]
    fn test_次の待機中ステップを承認待ちに進める(now: DateTime<Utc>) {
        // Arrange
        let tree = three_step_plan(now);
        let steps = steps_of(&tree);
        let approved = steps[0].clone().approve(UserId::new(), None, now).unwrap();

        // Act
        let sut = cascade_approval(tree.plan.clone(), &scopes_of(&tree), &steps, &approved, now)
            .unwrap();

        // Assert
        let promoted = sut.promoted_step.clone().unwrap();
        assert_eq!(promoted.id(), steps[1].id());
        assert_eq!(promoted.status(), ApprovalStepStatus::Pending);
        assert_eq!(sut.completed_scope, None);
        assert_eq!(sut.completed_plan, None);
        assert_eq!(sut.invoice_status(), InvoiceStatus::PendingApproval);
        assert_eq!(sut.plan_status(), ApprovalPlanStatus::Active);
    }

    #[rstest]
    fn test_最後のステップの承認でスコープとプランが完了する(now: DateTime<Utc>) {
        // Arrange: ステップ 1, 2 が承認済みで 3 が承認待ち
        let tree = three_step_plan(now);
        let mut steps = steps_of(&tree);
        steps[0] = steps[0].clone().approve(UserId::new(), None, now).unwrap();
        steps[1] = steps[1]
            .clone()
            .promoted(now)
            .unwrap()
            .approve(UserId::new(), None, now)
            .unwrap();
        steps[2] = steps[2].clone().promoted(now).unwrap();
        let approved = steps[2].clone().approve(UserId::new(), None, now).unwrap();

        // Act
        let sut = cascade_approval(tree.plan.clone(), &scopes_of(&tree), &steps, &approved, now)
            .unwrap();

        // Assert
        assert_eq!(sut.promoted_step, None);
        assert_eq!(
            sut.completed_scope.as_ref().map(|s| s.status()),
            Some(ApprovalScopeStatus::Completed)
        );
        assert_eq!(
            sut.completed_plan.as_ref().map(|p| p.status()),
            Some(ApprovalPlanStatus::Completed)
        );
        assert_eq!(sut.invoice_status(), InvoiceStatus::Approved);
        assert_eq!(sut.plan_status(), ApprovalPlanStatus::Completed);
    }

    #[rstest]
    fn test_他に進行中のスコープがあればプランは完了しない(now: DateTime<Utc>) {
        // Arrange: 1 ステップのスコープに加え、進行中のスコープがもう 1 つある
        let chain = ApprovalChain::new(vec![UserId::new()]).unwrap();
        let tree = ApprovalPlanWithScopes::from_chain(NewApprovalPlanTree {
            plan_id: ApprovalPlanId::new(),
            firm_id: FirmId::new(),
            invoice_id: InvoiceId::new(),
            requester_user_id: UserId::new(),
            amount: dec!(100),
            currency_code: CurrencyCode::new("JPY").unwrap(),
            chain: &chain,
            now,
        })
        .unwrap();
        let other_scope = ApprovalScope::new(NewApprovalScope {
            id: ApprovalScopeId::new(),
            plan_id: tree.plan.id().clone(),
            scope_type: ApprovalScopeType::InvoiceTotal,
            scope_key: Some("line-2".to_string()),
            amount: dec!(50),
            currency_code: CurrencyCode::new("JPY").unwrap(),
            now,
        });
        let mut scopes = scopes_of(&tree);
        scopes.push(other_scope);
        let steps = steps_of(&tree);
        let approved = steps[0].clone().approve(UserId::new(), None, now).unwrap();

        // Act
        let sut = cascade_approval(tree.plan.clone(), &scopes, &steps, &approved, now).unwrap();

        // Assert
        assert!(sut.completed_scope.is_some());
        assert_eq!(sut.completed_plan, None);
        assert_eq!(sut.invoice_status(), InvoiceStatus::PendingApproval);
    }

    #[rstest]
    fn test_スコープが見つからない場合はエラー(now: DateTime<Utc>) {
        let tree = three_step_plan(now);
        let orphan = ApprovalStep::new(NewApprovalStep {
            id: ApprovalStepId::new(),
            plan_id: tree.plan.id().clone(),
            scope_id: ApprovalScopeId::new(),
            step_index: StepIndex::first(),
            approver_user_id: UserId::new(),
            now,
        })
        .approve(UserId::new(), None, now)
        .unwrap();

        let result = cascade_approval(tree.plan.clone(), &scopes_of(&tree), &[], &orphan, now);

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    fn test_却下はどのステップでもプラン全体を取り消す(
        now: DateTime<Utc>,
        #[case] rejected_position: usize,
    ) {
        // Arrange: rejected_position より前は承認済み、そのステップが承認待ち
        let tree = three_step_plan(now);
        let mut steps = steps_of(&tree);
        for i in 0..rejected_position {
            let step = if i == 0 {
                steps[i].clone()
            } else {
                steps[i].clone().promoted(now).unwrap()
            };
            steps[i] = step.approve(UserId::new(), None, now).unwrap();
        }
        if rejected_position > 0 {
            steps[rejected_position] = steps[rejected_position].clone().promoted(now).unwrap();
        }
        let rejected = steps[rejected_position]
            .clone()
            .reject(UserId::new(), None, now)
            .unwrap();

        // Act
        let sut =
            cascade_rejection(tree.plan.clone(), &scopes_of(&tree), &steps, &rejected, now)
                .unwrap();

        // Assert
        assert_eq!(sut.rejected_plan.status(), ApprovalPlanStatus::Rejected);
        assert_eq!(sut.rejected_plan.rejected_at(), Some(now));
        assert_eq!(sut.canceled_scopes.len(), 1);
        assert_eq!(sut.canceled_scopes[0].status(), ApprovalScopeStatus::Canceled);

        let canceled: Vec<_> = sut
            .canceled_steps
            .iter()
            .map(|(step, previous)| (step.step_index().as_i32(), step.status(), *previous))
            .collect();
        let expected: Vec<_> = ((rejected_position + 2)..=3)
            .map(|index| {
                (
                    index as i32,
                    ApprovalStepStatus::Canceled,
                    ApprovalStepStatus::Blocked,
                )
            })
            .collect();
        assert_eq!(canceled, expected);
        assert_eq!(sut.invoice_status(), InvoiceStatus::Rejected);
        assert_eq!(sut.plan_status(), ApprovalPlanStatus::Rejected);
    }

    #[rstest]
    fn test_却下で他スコープの承認待ちステップも取り消す(now: DateTime<Utc>) {
        let tree = three_step_plan(now);
        let other_scope_id = ApprovalScopeId::new();
        let other_pending = ApprovalStep::new(NewApprovalStep {
            id: ApprovalStepId::new(),
            plan_id: tree.plan.id().clone(),
            scope_id: other_scope_id,
            step_index: StepIndex::first(),
            approver_user_id: UserId::new(),
            now,
        });
        let mut steps = steps_of(&tree);
        steps.push(other_pending.clone());
        let rejected = steps[0].clone().reject(UserId::new(), None, now).unwrap();

        let sut = cascade_rejection(tree.plan.clone(), &scopes_of(&tree), &steps, &rejected, now)
            .unwrap();

        let canceled_other = sut
            .canceled_steps
            .iter()
            .find(|(step, _)| step.id() == other_pending.id())
            .unwrap();
        assert_eq!(canceled_other.0.status(), ApprovalStepStatus::Canceled);
        assert_eq!(canceled_other.1, ApprovalStepStatus::Pending);
    }
}
