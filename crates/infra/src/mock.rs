//! # テスト用モックリポジトリ
//!
//! ユースケーステストで使用するインメモリモックリポジトリ。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! invoiceflow-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! ステータス条件付き更新と進行中プランの一意制約は PostgreSQL 実装と同じく
//! `InfraError::conflict` を返す。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoiceflow_domain::{
    approval::{
        ApprovalPlan,
        ApprovalPlanId,
        ApprovalPlanStatus,
        ApprovalScope,
        ApprovalScopeStatus,
        ApprovalStep,
        ApprovalStepStatus,
        InvoiceApproval,
    },
    approval_setup::ApprovalSetup,
    firm::FirmId,
    invoice::{Invoice, InvoiceId, InvoiceRecord, InvoiceStatus},
    user::UserId,
};

use crate::{
    db::{TransactionManager, TxContext},
    error::InfraError,
    repository::{
        ApprovalPlanRepository,
        ApprovalScopeRepository,
        ApprovalSetupRepository,
        ApprovalStepRepository,
        InvoiceApprovalRepository,
        InvoiceRepository,
        PendingStepWithInvoice,
    },
};

// ===== MockTransactionManager =====

pub struct MockTransactionManager;

#[async_trait]
impl TransactionManager for MockTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        Ok(TxContext::mock())
    }
}

// ===== MockInvoiceRepository =====

#[derive(Clone, Default)]
pub struct MockInvoiceRepository {
    invoices: Arc<Mutex<Vec<Invoice>>>,
}

impl MockInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_invoice(&self, invoice: Invoice) {
        self.invoices.lock().unwrap().push(invoice);
    }

    pub fn status_of(&self, id: &InvoiceId) -> Option<InvoiceStatus> {
        self.invoices
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id() == id)
            .map(|i| i.status())
    }
}

#[async_trait]
impl InvoiceRepository for MockInvoiceRepository {
    async fn find_by_id(
        &self,
        id: &InvoiceId,
        firm_id: &FirmId,
    ) -> Result<Option<Invoice>, InfraError> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id() == id && i.firm_id() == firm_id)
            .cloned())
    }

    async fn update_status(
        &self,
        _tx: &mut TxContext,
        id: &InvoiceId,
        firm_id: &FirmId,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        let mut invoices = self.invoices.lock().unwrap();
        let Some(slot) = invoices.iter_mut().find(|i| {
            i.id() == id && i.firm_id() == firm_id && i.status() != InvoiceStatus::Posted
        }) else {
            return Err(InfraError::conflict("Invoice", id.to_string()));
        };
        *slot = Invoice::from_db(InvoiceRecord {
            id: slot.id().clone(),
            firm_id: slot.firm_id().clone(),
            status,
            total_amount: slot.total_amount(),
            currency_code: slot.currency_code().clone(),
            updated_at: now,
        });
        Ok(())
    }
}

// ===== MockApprovalSetupRepository =====

#[derive(Clone, Default)]
pub struct MockApprovalSetupRepository {
    setups: Arc<Mutex<Vec<ApprovalSetup>>>,
}

impl MockApprovalSetupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同じユーザーの設定があれば置き換える
    pub fn add_setup(&self, setup: ApprovalSetup) {
        let mut setups = self.setups.lock().unwrap();
        setups.retain(|s| !(s.firm_id() == setup.firm_id() && s.user_id() == setup.user_id()));
        setups.push(setup);
    }
}

#[async_trait]
impl ApprovalSetupRepository for MockApprovalSetupRepository {
    async fn find_all_by_firm(&self, firm_id: &FirmId) -> Result<Vec<ApprovalSetup>, InfraError> {
        Ok(self
            .setups
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.firm_id() == firm_id)
            .cloned()
            .collect())
    }
}

// ===== MockApprovalPlanRepository =====

#[derive(Clone, Default)]
pub struct MockApprovalPlanRepository {
    plans: Arc<Mutex<Vec<ApprovalPlan>>>,
}

impl MockApprovalPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<ApprovalPlan> {
        self.plans.lock().unwrap().clone()
    }

    fn status_of(&self, id: &ApprovalPlanId) -> Option<ApprovalPlanStatus> {
        self.plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id() == id)
            .map(|p| p.status())
    }
}

#[async_trait]
impl ApprovalPlanRepository for MockApprovalPlanRepository {
    async fn insert(&self, _tx: &mut TxContext, plan: &ApprovalPlan) -> Result<(), InfraError> {
        let mut plans = self.plans.lock().unwrap();
        let duplicated = plan.is_active()
            && plans.iter().any(|p| {
                p.is_active() && p.firm_id() == plan.firm_id() && p.invoice_id() == plan.invoice_id()
            });
        if duplicated {
            return Err(InfraError::conflict(
                "ApprovalPlan",
                plan.invoice_id().to_string(),
            ));
        }
        plans.push(plan.clone());
        Ok(())
    }

    async fn update_with_status_check(
        &self,
        _tx: &mut TxContext,
        plan: &ApprovalPlan,
        expected: ApprovalPlanStatus,
    ) -> Result<(), InfraError> {
        let mut plans = self.plans.lock().unwrap();
        let Some(slot) = plans
            .iter_mut()
            .find(|p| p.id() == plan.id() && p.status() == expected)
        else {
            return Err(InfraError::conflict("ApprovalPlan", plan.id().to_string()));
        };
        *slot = plan.clone();
        Ok(())
    }

    async fn find_active_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        firm_id: &FirmId,
    ) -> Result<Option<ApprovalPlan>, InfraError> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.is_active() && p.invoice_id() == invoice_id && p.firm_id() == firm_id)
            .cloned())
    }
}

// ===== MockApprovalScopeRepository =====

#[derive(Clone, Default)]
pub struct MockApprovalScopeRepository {
    scopes: Arc<Mutex<Vec<ApprovalScope>>>,
}

impl MockApprovalScopeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<ApprovalScope> {
        self.scopes.lock().unwrap().clone()
    }

    fn contains_active(&self, step: &ApprovalStep) -> bool {
        self.scopes
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.id() == step.scope_id() && s.is_active())
    }
}

#[async_trait]
impl ApprovalScopeRepository for MockApprovalScopeRepository {
    async fn insert(&self, _tx: &mut TxContext, scope: &ApprovalScope) -> Result<(), InfraError> {
        self.scopes.lock().unwrap().push(scope.clone());
        Ok(())
    }

    async fn update_with_status_check(
        &self,
        _tx: &mut TxContext,
        scope: &ApprovalScope,
        expected: ApprovalScopeStatus,
    ) -> Result<(), InfraError> {
        let mut scopes = self.scopes.lock().unwrap();
        let Some(slot) = scopes
            .iter_mut()
            .find(|s| s.id() == scope.id() && s.status() == expected)
        else {
            return Err(InfraError::conflict("ApprovalScope", scope.id().to_string()));
        };
        *slot = scope.clone();
        Ok(())
    }

    async fn find_by_plan(
        &self,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalScope>, InfraError> {
        Ok(self
            .scopes
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.plan_id() == plan_id)
            .cloned()
            .collect())
    }

    async fn find_by_plan_in_tx(
        &self,
        _tx: &mut TxContext,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalScope>, InfraError> {
        self.find_by_plan(plan_id).await
    }
}

// ===== MockApprovalStepRepository =====

/// 承認待ち一覧の結合のため、プランとスコープのモックと状態を共有する
#[derive(Clone)]
pub struct MockApprovalStepRepository {
    steps:  Arc<Mutex<Vec<ApprovalStep>>>,
    plans:  MockApprovalPlanRepository,
    scopes: MockApprovalScopeRepository,
}

impl MockApprovalStepRepository {
    pub fn new(plans: &MockApprovalPlanRepository, scopes: &MockApprovalScopeRepository) -> Self {
        Self {
            steps:  Arc::new(Mutex::new(Vec::new())),
            plans:  plans.clone(),
            scopes: scopes.clone(),
        }
    }

    pub fn all(&self) -> Vec<ApprovalStep> {
        self.steps.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalStepRepository for MockApprovalStepRepository {
    async fn insert_all(
        &self,
        _tx: &mut TxContext,
        steps: &[ApprovalStep],
    ) -> Result<(), InfraError> {
        self.steps.lock().unwrap().extend_from_slice(steps);
        Ok(())
    }

    async fn update_with_status_check(
        &self,
        _tx: &mut TxContext,
        step: &ApprovalStep,
        expected: ApprovalStepStatus,
    ) -> Result<(), InfraError> {
        let mut steps = self.steps.lock().unwrap();
        let Some(slot) = steps
            .iter_mut()
            .find(|s| s.id() == step.id() && s.status() == expected)
        else {
            return Err(InfraError::conflict("ApprovalStep", step.id().to_string()));
        };
        *slot = step.clone();
        Ok(())
    }

    async fn find_by_plan(
        &self,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalStep>, InfraError> {
        let mut steps: Vec<ApprovalStep> = self
            .steps
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.plan_id() == plan_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.step_index());
        Ok(steps)
    }

    async fn find_by_plan_in_tx(
        &self,
        _tx: &mut TxContext,
        plan_id: &ApprovalPlanId,
    ) -> Result<Vec<ApprovalStep>, InfraError> {
        self.find_by_plan(plan_id).await
    }

    async fn find_pending_by_approvers(
        &self,
        firm_id: &FirmId,
        approvers: &[UserId],
    ) -> Result<Vec<PendingStepWithInvoice>, InfraError> {
        let plans = self.plans.all();
        let steps = self.all();
        Ok(steps
            .into_iter()
            .filter(|s| {
                s.status() == ApprovalStepStatus::Pending
                    && approvers.contains(s.approver_user_id())
                    && self.plans.status_of(s.plan_id()) == Some(ApprovalPlanStatus::Active)
                    && self.scopes.contains_active(s)
            })
            .filter_map(|step| {
                plans
                    .iter()
                    .find(|p| p.id() == step.plan_id() && p.firm_id() == firm_id)
                    .map(|p| PendingStepWithInvoice {
                        invoice_id: p.invoice_id().clone(),
                        step,
                    })
            })
            .collect())
    }
}

// ===== MockInvoiceApprovalRepository =====

#[derive(Clone, Default)]
pub struct MockInvoiceApprovalRepository {
    approvals: Arc<Mutex<Vec<InvoiceApproval>>>,
}

impl MockInvoiceApprovalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<InvoiceApproval> {
        self.approvals.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvoiceApprovalRepository for MockInvoiceApprovalRepository {
    async fn insert(
        &self,
        _tx: &mut TxContext,
        approval: &InvoiceApproval,
    ) -> Result<(), InfraError> {
        self.approvals.lock().unwrap().push(approval.clone());
        Ok(())
    }

    async fn find_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        firm_id: &FirmId,
    ) -> Result<Vec<InvoiceApproval>, InfraError> {
        Ok(self
            .approvals
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.invoice_id() == invoice_id && a.firm_id() == firm_id)
            .cloned()
            .collect())
    }
}
