//! 承認状況の照会

use invoiceflow_domain::{
    approval::{ApprovalPlanWithScopes, InvoiceApproval},
    firm::FirmId,
    invoice::InvoiceId,
    user::UserId,
};
use invoiceflow_infra::repository::PendingStepWithInvoice;
use itertools::Itertools;

use super::ApprovalUseCaseImpl;
use crate::{error::ServiceError, usecase::helpers::FindResultExt};

impl ApprovalUseCaseImpl {
    /// 請求書の進行中プランを取得する
    #[tracing::instrument(skip_all, fields(%firm_id, %invoice_id))]
    pub async fn get_active_plan(
        &self,
        firm_id: FirmId,
        invoice_id: InvoiceId,
    ) -> Result<ApprovalPlanWithScopes, ServiceError> {
        let plan = self
            .deps
            .plan_repo
            .find_active_by_invoice(&invoice_id, &firm_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("承認依頼中のプランが見つかりません".to_string())
            })?;
        self.load_plan_tree(plan).await
    }

    /// 請求書の承認履歴を古い順に取得する
    #[tracing::instrument(skip_all, fields(%firm_id, %invoice_id))]
    pub async fn list_approval_history(
        &self,
        firm_id: FirmId,
        invoice_id: InvoiceId,
    ) -> Result<Vec<InvoiceApproval>, ServiceError> {
        self.deps
            .invoice_repo
            .find_by_id(&invoice_id, &firm_id)
            .await
            .or_not_found("請求書")?;

        Ok(self
            .deps
            .approval_repo
            .find_by_invoice(&invoice_id, &firm_id)
            .await?)
    }

    /// 操作者が現在操作できる承認待ちステップの一覧
    ///
    /// 自分が承認者のステップに加え、代理期間内の代理人として操作できる
    /// ステップも含める。
    #[tracing::instrument(skip_all, fields(%firm_id, %actor))]
    pub async fn list_pending_approvals(
        &self,
        firm_id: FirmId,
        actor: UserId,
    ) -> Result<Vec<PendingStepWithInvoice>, ServiceError> {
        let directory = self.load_directory(&firm_id).await?;
        let now = self.deps.clock.now();

        let approvers: Vec<UserId> = std::iter::once(actor.clone())
            .chain(directory.delegators_of(&actor, now))
            .unique()
            .collect();

        Ok(self
            .deps
            .step_repo
            .find_pending_by_approvers(&firm_id, &approvers)
            .await?)
    }
}
