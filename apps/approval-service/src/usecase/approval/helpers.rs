//! 承認ユースケース共通のヘルパー
//!
//! トランザクション操作、状態ガード付き更新、プラン一式の読み込みを共通化する。

use invoiceflow_domain::{
    approval::{
        ApprovalPlan,
        ApprovalPlanStatus,
        ApprovalPlanWithScopes,
        ApprovalScope,
        ApprovalScopeStatus,
        ApprovalStep,
        ApprovalStepStatus,
    },
    approval_setup::ApprovalSetupDirectory,
    firm::FirmId,
};
use invoiceflow_infra::db::TxContext;

use super::ApprovalUseCaseImpl;
use crate::{error::ServiceError, usecase::helpers::conflict_as};

impl ApprovalUseCaseImpl {
    /// トランザクションを開始する
    pub(super) async fn begin_tx(&self) -> Result<TxContext, ServiceError> {
        Ok(self.deps.tx_manager.begin().await?)
    }

    /// トランザクションをコミットする
    pub(super) async fn commit_tx(&self, tx: TxContext) -> Result<(), ServiceError> {
        Ok(tx.commit().await?)
    }

    /// 事業所の承認設定を読み込む
    pub(super) async fn load_directory(
        &self,
        firm_id: &FirmId,
    ) -> Result<ApprovalSetupDirectory, ServiceError> {
        let setups = self.deps.setup_repo.find_all_by_firm(firm_id).await?;
        Ok(ApprovalSetupDirectory::new(setups))
    }

    /// プラン配下のスコープ・ステップを読み込んで組み立てる
    pub(super) async fn load_plan_tree(
        &self,
        plan: ApprovalPlan,
    ) -> Result<ApprovalPlanWithScopes, ServiceError> {
        let scopes = self.deps.scope_repo.find_by_plan(plan.id()).await?;
        let steps = self.deps.step_repo.find_by_plan(plan.id()).await?;
        Ok(ApprovalPlanWithScopes::assemble(plan, scopes, steps))
    }

    /// プランをステータス条件付きで更新する
    pub(super) async fn save_plan(
        &self,
        tx: &mut TxContext,
        plan: &ApprovalPlan,
        expected: ApprovalPlanStatus,
    ) -> Result<(), ServiceError> {
        self.deps
            .plan_repo
            .update_with_status_check(tx, plan, expected)
            .await
            .map_err(conflict_as("承認プランは既に更新されています"))
    }

    /// スコープをステータス条件付きで更新する
    pub(super) async fn save_scope(
        &self,
        tx: &mut TxContext,
        scope: &ApprovalScope,
        expected: ApprovalScopeStatus,
    ) -> Result<(), ServiceError> {
        self.deps
            .scope_repo
            .update_with_status_check(tx, scope, expected)
            .await
            .map_err(conflict_as("承認スコープは既に更新されています"))
    }

    /// ステップをステータス条件付きで更新する
    pub(super) async fn save_step(
        &self,
        tx: &mut TxContext,
        step: &ApprovalStep,
        expected: ApprovalStepStatus,
    ) -> Result<(), ServiceError> {
        self.deps
            .step_repo
            .update_with_status_check(tx, step, expected)
            .await
            .map_err(conflict_as("承認ステップは既に処理されています"))
    }
}
