//! # 承認ステップ
//!
//! スコープ内の承認者 1 人分の順番を表す。
//!
//! ## 状態遷移
//!
//! ```text
//! blocked ──(前のステップが承認された)──→ pending ──(承認)──→ approved
//!    │                                      │
//!    │                                      └──(却下)──→ rejected
//!    └────────(プラン内のいずれかが却下された)───────→ canceled ←── pending
//! ```
//!
//! 終端状態は `approved` / `rejected` / `canceled`。
//! スコープ内で `pending` は高々 1 件で、それより前は `approved`、
//! 後ろは `blocked` になる。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::{ApprovalAction, plan::ApprovalPlanId, scope::ApprovalScopeId};
use crate::{
    DomainError,
    user::UserId,
    value_objects::{ApprovalComment, StepIndex},
};

define_uuid_id! {
    /// 承認ステップ ID
    pub struct ApprovalStepId;
}

/// 承認ステップステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStepStatus {
    /// 前のステップの承認待ち
    Blocked,
    /// 承認待ち（操作可能）
    Pending,
    /// 承認済み
    Approved,
    /// 却下
    Rejected,
    /// 取消（プラン却下による）
    Canceled,
}

impl ApprovalStepStatus {
    /// まだ判断されていない（取消対象となる）状態か
    pub fn is_undecided(self) -> bool {
        matches!(self, Self::Blocked | Self::Pending)
    }
}

impl std::str::FromStr for ApprovalStepStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blocked" => Ok(Self::Blocked),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "canceled" => Ok(Self::Canceled),
            _ => Err(DomainError::Validation(format!(
                "不正な承認ステップステータス: {}",
                s
            ))),
        }
    }
}

/// 承認ステップエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalStep {
    id: ApprovalStepId,
    plan_id: ApprovalPlanId,
    scope_id: ApprovalScopeId,
    step_index: StepIndex,
    approver_user_id: UserId,
    status: ApprovalStepStatus,
    acted_by_user_id: Option<UserId>,
    acted_at: Option<DateTime<Utc>>,
    comment: Option<ApprovalComment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 承認ステップの新規作成パラメータ
pub struct NewApprovalStep {
    pub id: ApprovalStepId,
    pub plan_id: ApprovalPlanId,
    pub scope_id: ApprovalScopeId,
    pub step_index: StepIndex,
    pub approver_user_id: UserId,
    pub now: DateTime<Utc>,
}

/// 承認ステップの DB 復元パラメータ
pub struct ApprovalStepRecord {
    pub id: ApprovalStepId,
    pub plan_id: ApprovalPlanId,
    pub scope_id: ApprovalScopeId,
    pub step_index: StepIndex,
    pub approver_user_id: UserId,
    pub status: ApprovalStepStatus,
    pub acted_by_user_id: Option<UserId>,
    pub acted_at: Option<DateTime<Utc>>,
    pub comment: Option<ApprovalComment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalStep {
    /// 新しい承認ステップを作成する
    ///
    /// 先頭ステップは `pending`、それ以外は `blocked` で作成される。
    pub fn new(params: NewApprovalStep) -> Self {
        let status = if params.step_index == StepIndex::first() {
            ApprovalStepStatus::Pending
        } else {
            ApprovalStepStatus::Blocked
        };

        Self {
            id: params.id,
            plan_id: params.plan_id,
            scope_id: params.scope_id,
            step_index: params.step_index,
            approver_user_id: params.approver_user_id,
            status,
            acted_by_user_id: None,
            acted_at: None,
            comment: None,
            created_at: params.now,
            updated_at: params.now,
        }
    }

    /// 既存のデータから復元する
    pub fn from_db(record: ApprovalStepRecord) -> Self {
        Self {
            id: record.id,
            plan_id: record.plan_id,
            scope_id: record.scope_id,
            step_index: record.step_index,
            approver_user_id: record.approver_user_id,
            status: record.status,
            acted_by_user_id: record.acted_by_user_id,
            acted_at: record.acted_at,
            comment: record.comment,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &ApprovalStepId {
        &self.id
    }

    pub fn plan_id(&self) -> &ApprovalPlanId {
        &self.plan_id
    }

    pub fn scope_id(&self) -> &ApprovalScopeId {
        &self.scope_id
    }

    pub fn step_index(&self) -> StepIndex {
        self.step_index
    }

    pub fn approver_user_id(&self) -> &UserId {
        &self.approver_user_id
    }

    pub fn status(&self) -> ApprovalStepStatus {
        self.status
    }

    pub fn acted_by_user_id(&self) -> Option<&UserId> {
        self.acted_by_user_id.as_ref()
    }

    pub fn acted_at(&self) -> Option<DateTime<Utc>> {
        self.acted_at
    }

    pub fn comment(&self) -> Option<&ApprovalComment> {
        self.comment.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// 承認または却下を適用した新しいインスタンスを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: Pending 以外の状態で呼び出した場合
    pub fn act(
        self,
        action: ApprovalAction,
        actor: UserId,
        comment: Option<ApprovalComment>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        match action {
            ApprovalAction::Approve => self.approve(actor, comment, now),
            ApprovalAction::Reject => self.reject(actor, comment, now),
        }
    }

    /// ステップを承認する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: Pending 以外の状態で呼び出した場合
    pub fn approve(
        self,
        actor: UserId,
        comment: Option<ApprovalComment>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.decide(ApprovalStepStatus::Approved, actor, comment, now)
    }

    /// ステップを却下する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: Pending 以外の状態で呼び出した場合
    pub fn reject(
        self,
        actor: UserId,
        comment: Option<ApprovalComment>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.decide(ApprovalStepStatus::Rejected, actor, comment, now)
    }

    fn decide(
        self,
        decision: ApprovalStepStatus,
        actor: UserId,
        comment: Option<ApprovalComment>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if self.status != ApprovalStepStatus::Pending {
            return Err(DomainError::Validation(format!(
                "承認・却下は承認待ち状態でのみ可能です（現在: {}）",
                self.status
            )));
        }

        Ok(Self {
            status: decision,
            acted_by_user_id: Some(actor),
            acted_at: Some(now),
            comment,
            updated_at: now,
            ..self
        })
    }

    /// 前のステップが承認されたため、承認待ちに進めた新しいインスタンスを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: Blocked 以外の状態で呼び出した場合
    pub fn promoted(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status != ApprovalStepStatus::Blocked {
            return Err(DomainError::Validation(format!(
                "承認待ちへの昇格は待機中状態でのみ可能です（現在: {}）",
                self.status
            )));
        }

        Ok(Self {
            status: ApprovalStepStatus::Pending,
            updated_at: now,
            ..self
        })
    }

    /// プラン却下に伴い取り消した新しいインスタンスを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 既に判断済み（承認・却下・取消）の場合
    pub fn canceled(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !self.status.is_undecided() {
            return Err(DomainError::Validation(format!(
                "取消は未判断のステップでのみ可能です（現在: {}）",
                self.status
            )));
        }

        Ok(Self {
            status: ApprovalStepStatus::Canceled,
            updated_at: now,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn new_step(index: i32, now: DateTime<Utc>) -> ApprovalStep {
        ApprovalStep::new(NewApprovalStep {
            id: ApprovalStepId::new(),
            plan_id: ApprovalPlanId::new(),
            scope_id: ApprovalScopeId::new(),
            step_index: StepIndex::new(index).unwrap(),
            approver_user_id: UserId::new(),
            now,
        })
    }

    #[fixture]
    fn pending_step(now: DateTime<Utc>) -> ApprovalStep {
        new_step(1, now)
    }

    #[fixture]
    fn blocked_step(now: DateTime<Utc>) -> ApprovalStep {
        new_step(2, now)
    }

    #[rstest]
    fn test_先頭ステップは承認待ちで作成される(pending_step: ApprovalStep) {
        assert_eq!(pending_step.status(), ApprovalStepStatus::Pending);
    }

    #[rstest]
    fn test_2番目以降のステップは待機中で作成される(blocked_step: ApprovalStep) {
        assert_eq!(blocked_step.status(), ApprovalStepStatus::Blocked);
    }

    #[rstest]
    fn test_承認後の状態(pending_step: ApprovalStep, now: DateTime<Utc>) {
        let before = pending_step.clone();
        let actor = UserId::new();
        let comment = ApprovalComment::new("確認しました").unwrap();

        let sut = pending_step
            .approve(actor.clone(), Some(comment.clone()), now)
            .unwrap();

        let expected = ApprovalStep::from_db(ApprovalStepRecord {
            id: before.id().clone(),
            plan_id: before.plan_id().clone(),
            scope_id: before.scope_id().clone(),
            step_index: before.step_index(),
            approver_user_id: before.approver_user_id().clone(),
            status: ApprovalStepStatus::Approved,
            acted_by_user_id: Some(actor),
            acted_at: Some(now),
            comment: Some(comment),
            created_at: before.created_at(),
            updated_at: now,
        });
        assert_eq!(sut, expected);
    }

    #[rstest]
    fn test_却下後の状態(pending_step: ApprovalStep, now: DateTime<Utc>) {
        let actor = UserId::new();

        let sut = pending_step.reject(actor.clone(), None, now).unwrap();

        assert_eq!(sut.status(), ApprovalStepStatus::Rejected);
        assert_eq!(sut.acted_by_user_id(), Some(&actor));
        assert_eq!(sut.acted_at(), Some(now));
        assert_eq!(sut.comment(), None);
    }

    #[rstest]
    #[case(ApprovalAction::Approve, ApprovalStepStatus::Approved)]
    #[case(ApprovalAction::Reject, ApprovalStepStatus::Rejected)]
    fn test_actはアクションに応じた状態に遷移する(
        pending_step: ApprovalStep,
        now: DateTime<Utc>,
        #[case] action: ApprovalAction,
        #[case] expected: ApprovalStepStatus,
    ) {
        let sut = pending_step.act(action, UserId::new(), None, now).unwrap();

        assert_eq!(sut.status(), expected);
    }

    #[rstest]
    fn test_待機中のステップは承認できない(blocked_step: ApprovalStep, now: DateTime<Utc>) {
        let result = blocked_step.approve(UserId::new(), None, now);

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[rstest]
    fn test_承認済みのステップは再度却下できない(
        pending_step: ApprovalStep,
        now: DateTime<Utc>,
    ) {
        let approved = pending_step.approve(UserId::new(), None, now).unwrap();

        let result = approved.reject(UserId::new(), None, now);

        assert!(result.is_err());
    }

    #[rstest]
    fn test_待機中から承認待ちに昇格できる(blocked_step: ApprovalStep, now: DateTime<Utc>) {
        let sut = blocked_step.promoted(now).unwrap();

        assert_eq!(sut.status(), ApprovalStepStatus::Pending);
        assert_eq!(sut.updated_at(), now);
    }

    #[rstest]
    fn test_承認待ちは昇格できない(pending_step: ApprovalStep, now: DateTime<Utc>) {
        assert!(pending_step.promoted(now).is_err());
    }

    #[rstest]
    fn test_未判断のステップは取り消せる(
        pending_step: ApprovalStep,
        blocked_step: ApprovalStep,
        now: DateTime<Utc>,
    ) {
        assert_eq!(
            pending_step.canceled(now).unwrap().status(),
            ApprovalStepStatus::Canceled
        );
        assert_eq!(
            blocked_step.canceled(now).unwrap().status(),
            ApprovalStepStatus::Canceled
        );
    }

    #[rstest]
    fn test_判断済みのステップは取り消せない(pending_step: ApprovalStep, now: DateTime<Utc>) {
        let rejected = pending_step.reject(UserId::new(), None, now).unwrap();

        assert!(rejected.canceled(now).is_err());
    }

    #[rstest]
    #[case("blocked", ApprovalStepStatus::Blocked)]
    #[case("pending", ApprovalStepStatus::Pending)]
    #[case("approved", ApprovalStepStatus::Approved)]
    #[case("rejected", ApprovalStepStatus::Rejected)]
    #[case("canceled", ApprovalStepStatus::Canceled)]
    fn test_ステータス文字列のパース(#[case] text: &str, #[case] expected: ApprovalStepStatus) {
        assert_eq!(ApprovalStepStatus::from_str(text).unwrap(), expected);
        let as_str: &str = expected.into();
        assert_eq!(as_str, text);
    }
}
