//! # 承認ユースケース
//!
//! 請求書の承認依頼（プラン作成）、承認・却下、照会を実装する。
//!
//! - [`ensure`](ApprovalUseCaseImpl::ensure_active_plan): 進行中プランを返す。なければ作成する（冪等）
//! - [`act`](ApprovalUseCaseImpl::act_on_approval): 承認待ちステップを承認・却下し、波及を反映する
//! - 照会: 進行中プラン、承認履歴、操作者の承認待ち一覧

mod act;
mod ensure;
mod helpers;
mod query;

use std::sync::Arc;

use invoiceflow_domain::{
    approval::{ApprovalAction, ApprovalPlanStatus, ApprovalScopeId},
    clock::Clock,
    invoice::InvoiceStatus,
};
use invoiceflow_infra::{
    db::TransactionManager,
    repository::{
        ApprovalPlanRepository,
        ApprovalScopeRepository,
        ApprovalSetupRepository,
        ApprovalStepRepository,
        InvoiceApprovalRepository,
        InvoiceRepository,
    },
};
use serde::Serialize;

/// 承認・却下の入力
#[derive(Debug, Clone)]
pub struct ActOnApprovalInput {
    pub action:   ApprovalAction,
    /// コメント（任意、前後空白を除いて空なら未指定扱い）
    pub comment:  Option<String>,
    /// 複数スコープで操作可能な場合の対象スコープ
    pub scope_id: Option<ApprovalScopeId>,
}

/// 承認・却下の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApprovalOutcome {
    pub invoice_status: InvoiceStatus,
    pub plan_status:    ApprovalPlanStatus,
}

/// 承認ユースケースの依存コンポーネント
pub struct ApprovalUseCaseDeps {
    pub invoice_repo:  Arc<dyn InvoiceRepository>,
    pub setup_repo:    Arc<dyn ApprovalSetupRepository>,
    pub plan_repo:     Arc<dyn ApprovalPlanRepository>,
    pub scope_repo:    Arc<dyn ApprovalScopeRepository>,
    pub step_repo:     Arc<dyn ApprovalStepRepository>,
    pub approval_repo: Arc<dyn InvoiceApprovalRepository>,
    pub clock:         Arc<dyn Clock>,
    pub tx_manager:    Arc<dyn TransactionManager>,
}

/// 承認ユースケース実装
pub struct ApprovalUseCaseImpl {
    deps: ApprovalUseCaseDeps,
}

impl ApprovalUseCaseImpl {
    pub fn new(deps: ApprovalUseCaseDeps) -> Self {
        Self { deps }
    }
}
