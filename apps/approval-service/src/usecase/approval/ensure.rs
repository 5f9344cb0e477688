//! 承認依頼（進行中プランの確保）

use invoiceflow_domain::{
    approval::{
        ApprovalPlanId,
        ApprovalPlanWithScopes,
        InvoiceApproval,
        NewApprovalPlanTree,
        resolve_chain,
    },
    firm::FirmId,
    invoice::{InvoiceId, InvoiceStatus},
    user::UserId,
};
use invoiceflow_shared::{event_log::event, log_business_event};

use super::ApprovalUseCaseImpl;
use crate::{
    error::ServiceError,
    usecase::helpers::{FindResultExt, conflict_as},
};

impl ApprovalUseCaseImpl {
    /// 請求書の進行中プランを返す。なければ作成する
    ///
    /// 何度呼んでも進行中プランは 1 件に保たれる。
    ///
    /// ## 処理フロー
    ///
    /// 1. 進行中プランがあればそのまま返す（副作用なし）
    /// 2. 請求書を取得し、承認に回せる状態か確認
    /// 3. 承認設定から承認チェーンを解決
    /// 4. プラン → スコープ → ステップを組み立てる
    /// 5. 単一トランザクションで保存し、請求書を承認待ちにして履歴を追記
    ///
    /// 並行リクエストが先にプランを作成した場合（一意制約違反）は、
    /// 自分のトランザクションを破棄して勝者のプランを返す。
    ///
    /// ## エラー
    ///
    /// - 請求書が見つからない場合（404）
    /// - 請求書が転記済みの場合（400）
    /// - 承認チェーンを解決できない場合（400）
    #[tracing::instrument(skip_all, fields(%firm_id, %invoice_id))]
    pub async fn ensure_active_plan(
        &self,
        firm_id: FirmId,
        invoice_id: InvoiceId,
        requester: UserId,
    ) -> Result<ApprovalPlanWithScopes, ServiceError> {
        // 1. 既存の進行中プラン
        if let Some(plan) = self
            .deps
            .plan_repo
            .find_active_by_invoice(&invoice_id, &firm_id)
            .await?
        {
            return self.load_plan_tree(plan).await;
        }

        // 2. 請求書
        let invoice = self
            .deps
            .invoice_repo
            .find_by_id(&invoice_id, &firm_id)
            .await
            .or_not_found("請求書")?;
        invoice.ensure_routable()?;

        // 3. 承認チェーン
        let directory = self.load_directory(&firm_id).await?;
        let chain = resolve_chain(&directory, &requester, invoice.total_amount())?;

        // 4. プラン一式
        let now = self.deps.clock.now();
        let tree = ApprovalPlanWithScopes::from_chain(NewApprovalPlanTree {
            plan_id: ApprovalPlanId::new(),
            firm_id: firm_id.clone(),
            invoice_id: invoice_id.clone(),
            requester_user_id: requester.clone(),
            amount: invoice.total_amount(),
            currency_code: invoice.currency_code().clone(),
            chain: &chain,
            now,
        })?;
        let first_approver = tree
            .first_approver()
            .cloned()
            .ok_or_else(|| ServiceError::Internal("承認ステップが作成されていません".to_string()))?;

        // 5. 保存
        let mut tx = self.begin_tx().await?;

        if let Err(e) = self.deps.plan_repo.insert(&mut tx, &tree.plan).await {
            if e.as_conflict().is_none() {
                return Err(e.into());
            }
            // 一意制約違反でトランザクションは中断済み。ロールバックして勝者を読む
            drop(tx);
            tracing::debug!("並行リクエストが作成した承認プランを返します");
            let winner = self
                .deps
                .plan_repo
                .find_active_by_invoice(&invoice_id, &firm_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::Conflict("承認プランの作成が競合しました".to_string())
                })?;
            return self.load_plan_tree(winner).await;
        }

        for scoped in &tree.scopes {
            self.deps.scope_repo.insert(&mut tx, &scoped.scope).await?;
            self.deps
                .step_repo
                .insert_all(&mut tx, &scoped.steps)
                .await?;
        }

        self.deps
            .invoice_repo
            .update_status(
                &mut tx,
                &invoice_id,
                &firm_id,
                InvoiceStatus::PendingApproval,
                now,
            )
            .await
            .map_err(conflict_as("請求書は既に転記済みです"))?;

        let requested = InvoiceApproval::requested(
            firm_id.clone(),
            invoice_id.clone(),
            tree.plan.id().clone(),
            first_approver,
            now,
        );
        self.deps.approval_repo.insert(&mut tx, &requested).await?;

        self.commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::APPROVAL,
            event.action = event::action::PLAN_CREATED,
            event.entity_type = event::entity_type::APPROVAL_PLAN,
            event.entity_id = %tree.plan.id(),
            event.actor_id = %requester,
            event.firm_id = %firm_id,
            event.chain_length = chain.len(),
            event.result = event::result::SUCCESS,
            "承認プラン作成"
        );

        Ok(tree)
    }
}
