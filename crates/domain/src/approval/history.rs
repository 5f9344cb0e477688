//! # 承認履歴
//!
//! 承認依頼・承認・却下の操作ごとに 1 行追記する監査ログ。
//! プラン・ステップの状態とは独立しており、更新・削除はしない。
//! 制御フローには使わず、履歴表示のためだけに読み出す。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::{ApprovalAction, plan::ApprovalPlanId};
use crate::{
    DomainError,
    firm::FirmId,
    invoice::InvoiceId,
    user::UserId,
    value_objects::ApprovalComment,
};

/// 承認依頼時に記録するコメント
pub const SENT_FOR_APPROVAL_COMMENT: &str = "Sent for approval";

define_uuid_id! {
    /// 承認履歴 ID
    pub struct InvoiceApprovalId;
}

/// 承認履歴ステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvoiceApprovalStatus {
    /// 承認依頼
    Pending,
    /// 承認
    Approved,
    /// 却下
    Rejected,
}

impl From<ApprovalAction> for InvoiceApprovalStatus {
    fn from(action: ApprovalAction) -> Self {
        match action {
            ApprovalAction::Approve => Self::Approved,
            ApprovalAction::Reject => Self::Rejected,
        }
    }
}

impl std::str::FromStr for InvoiceApprovalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!(
                "不正な承認履歴ステータス: {}",
                s
            ))),
        }
    }
}

/// 承認履歴エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceApproval {
    id: InvoiceApprovalId,
    firm_id: FirmId,
    invoice_id: InvoiceId,
    plan_id: ApprovalPlanId,
    user_id: UserId,
    status: InvoiceApprovalStatus,
    comment: Option<String>,
    acted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// 承認履歴の DB 復元パラメータ
pub struct InvoiceApprovalRecord {
    pub id: InvoiceApprovalId,
    pub firm_id: FirmId,
    pub invoice_id: InvoiceId,
    pub plan_id: ApprovalPlanId,
    pub user_id: UserId,
    pub status: InvoiceApprovalStatus,
    pub comment: Option<String>,
    pub acted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InvoiceApproval {
    /// 承認依頼の履歴を作成する
    ///
    /// `user_id` には最初に承認を依頼した承認者を記録する。`acted_at` は持たない。
    pub fn requested(
        firm_id: FirmId,
        invoice_id: InvoiceId,
        plan_id: ApprovalPlanId,
        first_approver: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InvoiceApprovalId::new(),
            firm_id,
            invoice_id,
            plan_id,
            user_id: first_approver,
            status: InvoiceApprovalStatus::Pending,
            comment: Some(SENT_FOR_APPROVAL_COMMENT.to_string()),
            acted_at: None,
            created_at: now,
        }
    }

    /// 承認・却下の履歴を作成する
    pub fn decided(
        firm_id: FirmId,
        invoice_id: InvoiceId,
        plan_id: ApprovalPlanId,
        actor: UserId,
        action: ApprovalAction,
        comment: Option<&ApprovalComment>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InvoiceApprovalId::new(),
            firm_id,
            invoice_id,
            plan_id,
            user_id: actor,
            status: action.into(),
            comment: comment.map(|c| c.as_str().to_string()),
            acted_at: Some(now),
            created_at: now,
        }
    }

    pub fn from_db(record: InvoiceApprovalRecord) -> Self {
        Self {
            id: record.id,
            firm_id: record.firm_id,
            invoice_id: record.invoice_id,
            plan_id: record.plan_id,
            user_id: record.user_id,
            status: record.status,
            comment: record.comment,
            acted_at: record.acted_at,
            created_at: record.created_at,
        }
    }

    pub fn id(&self) -> &InvoiceApprovalId {
        &self.id
    }

    pub fn firm_id(&self) -> &FirmId {
        &self.firm_id
    }

    pub fn invoice_id(&self) -> &InvoiceId {
        &self.invoice_id
    }

    pub fn plan_id(&self) -> &ApprovalPlanId {
        &self.plan_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn status(&self) -> InvoiceApprovalStatus {
        self.status
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn acted_at(&self) -> Option<DateTime<Utc>> {
        self.acted_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 表示用の発生日時（操作日時、なければ作成日時）
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.acted_at.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_承認依頼の履歴は操作日時を持たない() {
        let approver = UserId::new();

        let sut = InvoiceApproval::requested(
            FirmId::new(),
            InvoiceId::new(),
            ApprovalPlanId::new(),
            approver.clone(),
            now(),
        );

        assert_eq!(sut.status(), InvoiceApprovalStatus::Pending);
        assert_eq!(sut.user_id(), &approver);
        assert_eq!(sut.comment(), Some(SENT_FOR_APPROVAL_COMMENT));
        assert_eq!(sut.acted_at(), None);
        assert_eq!(sut.occurred_at(), now());
    }

    #[rstest]
    #[case(ApprovalAction::Approve, InvoiceApprovalStatus::Approved)]
    #[case(ApprovalAction::Reject, InvoiceApprovalStatus::Rejected)]
    fn test_承認と却下の履歴はアクションに対応するステータスになる(
        #[case] action: ApprovalAction,
        #[case] expected: InvoiceApprovalStatus,
    ) {
        let comment = ApprovalComment::new("金額を確認").unwrap();

        let sut = InvoiceApproval::decided(
            FirmId::new(),
            InvoiceId::new(),
            ApprovalPlanId::new(),
            UserId::new(),
            action,
            Some(&comment),
            now(),
        );

        assert_eq!(sut.status(), expected);
        assert_eq!(sut.comment(), Some("金額を確認"));
        assert_eq!(sut.acted_at(), Some(now()));
    }
}
