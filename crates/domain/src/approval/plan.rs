//! # 承認プラン
//!
//! 1 件の請求書に対する承認ワークフローのインスタンス。
//! プランはスコープを、スコープはステップを子に持つ。
//!
//! ```text
//! ApprovalPlan (active → completed | rejected)
//!  └── ApprovalScope (invoice_total)
//!       ├── ApprovalStep #1 (pending)
//!       ├── ApprovalStep #2 (blocked)
//!       └── ApprovalStep #3 (blocked)
//! ```
//!
//! 請求書ごとに `active` なプランは高々 1 件。DB の部分ユニーク制約で保証し、
//! 作成の競合時は勝者のプランを読み直して返す。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::{
    chain::ApprovalChain,
    scope::{ApprovalScope, ApprovalScopeId, ApprovalScopeType, NewApprovalScope},
    step::{ApprovalStep, ApprovalStepId, NewApprovalStep},
};
use crate::{
    DomainError,
    firm::FirmId,
    invoice::InvoiceId,
    user::UserId,
    value_objects::{CurrencyCode, StepIndex},
};

define_uuid_id! {
    /// 承認プラン ID
    pub struct ApprovalPlanId;
}

/// 承認プランステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalPlanStatus {
    /// 承認進行中
    Active,
    /// 承認完了
    Completed,
    /// 却下
    Rejected,
}

impl std::str::FromStr for ApprovalPlanStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!(
                "不正な承認プランステータス: {}",
                s
            ))),
        }
    }
}

/// 承認プランエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPlan {
    id: ApprovalPlanId,
    firm_id: FirmId,
    invoice_id: InvoiceId,
    requester_user_id: UserId,
    status: ApprovalPlanStatus,
    completed_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 承認プランの新規作成パラメータ
pub struct NewApprovalPlan {
    pub id: ApprovalPlanId,
    pub firm_id: FirmId,
    pub invoice_id: InvoiceId,
    pub requester_user_id: UserId,
    pub now: DateTime<Utc>,
}

/// 承認プランの DB 復元パラメータ
pub struct ApprovalPlanRecord {
    pub id: ApprovalPlanId,
    pub firm_id: FirmId,
    pub invoice_id: InvoiceId,
    pub requester_user_id: UserId,
    pub status: ApprovalPlanStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalPlan {
    pub fn new(params: NewApprovalPlan) -> Self {
        Self {
            id: params.id,
            firm_id: params.firm_id,
            invoice_id: params.invoice_id,
            requester_user_id: params.requester_user_id,
            status: ApprovalPlanStatus::Active,
            completed_at: None,
            rejected_at: None,
            created_at: params.now,
            updated_at: params.now,
        }
    }

    pub fn from_db(record: ApprovalPlanRecord) -> Self {
        Self {
            id: record.id,
            firm_id: record.firm_id,
            invoice_id: record.invoice_id,
            requester_user_id: record.requester_user_id,
            status: record.status,
            completed_at: record.completed_at,
            rejected_at: record.rejected_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &ApprovalPlanId {
        &self.id
    }

    pub fn firm_id(&self) -> &FirmId {
        &self.firm_id
    }

    pub fn invoice_id(&self) -> &InvoiceId {
        &self.invoice_id
    }

    pub fn requester_user_id(&self) -> &UserId {
        &self.requester_user_id
    }

    pub fn status(&self) -> ApprovalPlanStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == ApprovalPlanStatus::Active
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn rejected_at(&self) -> Option<DateTime<Utc>> {
        self.rejected_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// 更新日時のみを進めた新しいインスタンスを返す
    ///
    /// 承認操作の開始時にプラン行をステータス条件付きで更新し、
    /// 同一プランへの操作を直列化するために使う。
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: Active 以外の状態で呼び出した場合
    pub fn touched(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.ensure_active()?;
        Ok(Self {
            updated_at: now,
            ..self
        })
    }

    /// プランを完了した新しいインスタンスを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: Active 以外の状態で呼び出した場合
    pub fn completed(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.ensure_active()?;
        Ok(Self {
            status: ApprovalPlanStatus::Completed,
            completed_at: Some(now),
            updated_at: now,
            ..self
        })
    }

    /// プランを却下した新しいインスタンスを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: Active 以外の状態で呼び出した場合
    pub fn rejected(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.ensure_active()?;
        Ok(Self {
            status: ApprovalPlanStatus::Rejected,
            rejected_at: Some(now),
            updated_at: now,
            ..self
        })
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::Validation(format!(
                "承認プランは既に終了しています（現在: {}）",
                self.status
            )));
        }
        Ok(())
    }
}

/// スコープとその配下のステップ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalScopeWithSteps {
    pub scope: ApprovalScope,
    /// `step_index` の昇順
    pub steps: Vec<ApprovalStep>,
}

/// プランとその配下のスコープ・ステップ一式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPlanWithScopes {
    pub plan: ApprovalPlan,
    pub scopes: Vec<ApprovalScopeWithSteps>,
}

/// 承認チェーンからプランを組み立てるためのパラメータ
pub struct NewApprovalPlanTree<'a> {
    pub plan_id: ApprovalPlanId,
    pub firm_id: FirmId,
    pub invoice_id: InvoiceId,
    pub requester_user_id: UserId,
    pub amount: Decimal,
    pub currency_code: CurrencyCode,
    pub chain: &'a ApprovalChain,
    pub now: DateTime<Utc>,
}

impl ApprovalPlanWithScopes {
    /// 承認チェーンから新しいプランを組み立てる
    ///
    /// 請求書合計のスコープを 1 件作り、チェーンの順にステップを並べる。
    /// 先頭ステップのみ `pending`、残りは `blocked` になる。
    pub fn from_chain(params: NewApprovalPlanTree<'_>) -> Result<Self, DomainError> {
        let plan = ApprovalPlan::new(NewApprovalPlan {
            id: params.plan_id,
            firm_id: params.firm_id,
            invoice_id: params.invoice_id,
            requester_user_id: params.requester_user_id,
            now: params.now,
        });

        let scope = ApprovalScope::new(NewApprovalScope {
            id: ApprovalScopeId::new(),
            plan_id: plan.id().clone(),
            scope_type: ApprovalScopeType::InvoiceTotal,
            scope_key: None,
            amount: params.amount,
            currency_code: params.currency_code,
            now: params.now,
        });

        let steps = params
            .chain
            .approvers()
            .iter()
            .enumerate()
            .map(|(position, approver)| {
                Ok(ApprovalStep::new(NewApprovalStep {
                    id: ApprovalStepId::new(),
                    plan_id: plan.id().clone(),
                    scope_id: scope.id().clone(),
                    step_index: StepIndex::from_position(position)?,
                    approver_user_id: approver.clone(),
                    now: params.now,
                }))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(Self {
            plan,
            scopes: vec![ApprovalScopeWithSteps { scope, steps }],
        })
    }

    /// 個別に読み込んだスコープ・ステップをプラン単位に組み立てる
    ///
    /// ステップはスコープごとに `step_index` の昇順に並べ替える。
    /// どのスコープにも属さないステップは無視する。
    pub fn assemble(
        plan: ApprovalPlan,
        scopes: Vec<ApprovalScope>,
        steps: Vec<ApprovalStep>,
    ) -> Self {
        let mut steps_by_scope: HashMap<ApprovalScopeId, Vec<ApprovalStep>> = HashMap::new();
        for step in steps {
            steps_by_scope
                .entry(step.scope_id().clone())
                .or_default()
                .push(step);
        }

        let scopes = scopes
            .into_iter()
            .map(|scope| {
                let mut steps = steps_by_scope.remove(scope.id()).unwrap_or_default();
                steps.sort_by_key(|s| s.step_index());
                ApprovalScopeWithSteps { scope, steps }
            })
            .collect();

        Self { plan, scopes }
    }

    /// 先頭ステップの承認者
    pub fn first_approver(&self) -> Option<&UserId> {
        self.scopes
            .first()
            .and_then(|s| s.steps.first())
            .map(|step| step.approver_user_id())
    }
}
