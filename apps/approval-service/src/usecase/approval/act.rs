//! 承認・却下

use std::collections::HashSet;

use invoiceflow_domain::{
    approval::{
        ApprovalAction,
        ApprovalPlanStatus,
        ApprovalScopeId,
        ApprovalScopeStatus,
        ApprovalStepStatus,
        InvoiceApproval,
        PendingStepCandidate,
        allowed_actors,
        cascade_approval,
        cascade_rejection,
        select_actionable_step,
    },
    firm::FirmId,
    invoice::InvoiceId,
    user::UserId,
    value_objects::ApprovalComment,
};
use invoiceflow_shared::{event_log::event, log_business_event};

use super::{ActOnApprovalInput, ApprovalOutcome, ApprovalUseCaseImpl};
use crate::{error::ServiceError, usecase::helpers::conflict_as};

impl ApprovalUseCaseImpl {
    /// 操作者の承認待ちステップを承認または却下する
    ///
    /// ## 処理フロー
    ///
    /// 1. 進行中プランを取得
    /// 2. 操作可能なステップを選ぶ
    /// 3. `pending` を条件にステップを更新し、承認・却下を記録
    /// 4. プランの行をロックし、波及（次ステップの昇格・スコープ/プランの完了、
    ///    または却下による取消）を反映
    /// 5. プランが完了・却下された場合のみ請求書のステータスを更新
    ///
    /// 3 以降は単一トランザクションで行い、途中で失敗した場合は何も反映しない。
    /// 同じステップへの同時操作は 3 の条件付き更新で一方が 409 になる。
    ///
    /// ## エラー
    ///
    /// - 進行中プランがない場合（400）
    /// - 操作者に権限がない場合（403）
    /// - 並行操作で既に処理されていた場合（409）
    #[tracing::instrument(skip_all, fields(%firm_id, %invoice_id, action = %input.action))]
    pub async fn act_on_approval(
        &self,
        input: ActOnApprovalInput,
        firm_id: FirmId,
        invoice_id: InvoiceId,
        actor: UserId,
    ) -> Result<ApprovalOutcome, ServiceError> {
        let comment = ApprovalComment::parse_optional(input.comment)?;

        // 1. 進行中プラン
        let plan = self
            .deps
            .plan_repo
            .find_active_by_invoice(&invoice_id, &firm_id)
            .await?
            .ok_or_else(|| ServiceError::BadRequest("承認依頼中のプランがありません".to_string()))?;

        let directory = self.load_directory(&firm_id).await?;
        let now = self.deps.clock.now();

        // 2. 操作対象ステップ（ロックなしで読み、確定は条件付き更新に任せる）
        let scopes = self.deps.scope_repo.find_by_plan(plan.id()).await?;
        let steps = self.deps.step_repo.find_by_plan(plan.id()).await?;
        let active_scopes: HashSet<&ApprovalScopeId> = scopes
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.id())
            .collect();
        let candidates: Vec<PendingStepCandidate> = steps
            .iter()
            .filter(|s| {
                s.status() == ApprovalStepStatus::Pending && active_scopes.contains(s.scope_id())
            })
            .map(|s| PendingStepCandidate {
                step: s.clone(),
                allowed_actors: allowed_actors(&directory, s.approver_user_id(), now),
            })
            .collect();
        let target = select_actionable_step(candidates, &actor, input.scope_id.as_ref())?;
        let decided = target.act(input.action, actor.clone(), comment, now)?;

        let mut tx = self.begin_tx().await?;

        // 3. 承認待ちのままなら確定。先に処理されていれば 409
        self.save_step(&mut tx, &decided, ApprovalStepStatus::Pending)
            .await?;

        // 4. プランの行をロックし、波及の判断に使う最新の状態を読み直す
        let plan = plan.touched(now)?;
        self.save_plan(&mut tx, &plan, ApprovalPlanStatus::Active)
            .await?;
        let scopes = self
            .deps
            .scope_repo
            .find_by_plan_in_tx(&mut tx, plan.id())
            .await?;
        let steps = self
            .deps
            .step_repo
            .find_by_plan_in_tx(&mut tx, plan.id())
            .await?;

        let history = InvoiceApproval::decided(
            firm_id.clone(),
            invoice_id.clone(),
            plan.id().clone(),
            actor.clone(),
            input.action,
            decided.comment(),
            now,
        );
        self.deps.approval_repo.insert(&mut tx, &history).await?;

        let outcome = match input.action {
            ApprovalAction::Approve => {
                let cascade = cascade_approval(plan, &scopes, &steps, &decided, now)?;
                if let Some(promoted) = &cascade.promoted_step {
                    self.save_step(&mut tx, promoted, ApprovalStepStatus::Blocked)
                        .await?;
                }
                if let Some(scope) = &cascade.completed_scope {
                    self.save_scope(&mut tx, scope, ApprovalScopeStatus::Active)
                        .await?;
                }
                if let Some(completed) = &cascade.completed_plan {
                    self.save_plan(&mut tx, completed, ApprovalPlanStatus::Active)
                        .await?;
                }
                ApprovalOutcome {
                    invoice_status: cascade.invoice_status(),
                    plan_status:    cascade.plan_status(),
                }
            }
            ApprovalAction::Reject => {
                let cascade = cascade_rejection(plan, &scopes, &steps, &decided, now)?;
                self.save_plan(&mut tx, &cascade.rejected_plan, ApprovalPlanStatus::Active)
                    .await?;
                for scope in &cascade.canceled_scopes {
                    self.save_scope(&mut tx, scope, ApprovalScopeStatus::Active)
                        .await?;
                }
                for (step, previous) in &cascade.canceled_steps {
                    self.save_step(&mut tx, step, *previous).await?;
                }
                ApprovalOutcome {
                    invoice_status: cascade.invoice_status(),
                    plan_status:    cascade.plan_status(),
                }
            }
        };

        // 5. 請求書
        if outcome.plan_status != ApprovalPlanStatus::Active {
            self.deps
                .invoice_repo
                .update_status(
                    &mut tx,
                    &invoice_id,
                    &firm_id,
                    outcome.invoice_status,
                    now,
                )
                .await
                .map_err(conflict_as("請求書は既に転記済みです"))?;
        }

        self.commit_tx(tx).await?;

        let step_action = match input.action {
            ApprovalAction::Approve => event::action::STEP_APPROVED,
            ApprovalAction::Reject => event::action::STEP_REJECTED,
        };
        log_business_event!(
            event.category = event::category::APPROVAL,
            event.action = step_action,
            event.entity_type = event::entity_type::APPROVAL_STEP,
            event.entity_id = %decided.id(),
            event.actor_id = %actor,
            event.firm_id = %firm_id,
            event.result = event::result::SUCCESS,
            "承認ステップ処理"
        );

        let plan_action = match outcome.plan_status {
            ApprovalPlanStatus::Completed => Some(event::action::PLAN_COMPLETED),
            ApprovalPlanStatus::Rejected => Some(event::action::PLAN_REJECTED),
            ApprovalPlanStatus::Active => None,
        };
        if let Some(plan_action) = plan_action {
            log_business_event!(
                event.category = event::category::APPROVAL,
                event.action = plan_action,
                event.entity_type = event::entity_type::APPROVAL_PLAN,
                event.entity_id = %decided.plan_id(),
                event.actor_id = %actor,
                event.firm_id = %firm_id,
                event.result = event::result::SUCCESS,
                "承認プラン終了"
            );
        }

        Ok(outcome)
    }
}
