//! # 承認 API ハンドラ
//!
//! 請求書の承認依頼・承認/却下・照会の内部エンドポイントを実装する。
//!
//! | メソッド | パス | 処理 |
//! |---------|------|------|
//! | POST | `/internal/invoices/{invoice_id}/approval-plan` | 承認依頼（進行中プランを確保） |
//! | GET | `/internal/invoices/{invoice_id}/approval-plan` | 進行中プランの取得 |
//! | POST | `/internal/invoices/{invoice_id}/approval-actions` | 承認・却下 |
//! | GET | `/internal/invoices/{invoice_id}/approval-history` | 承認履歴 |
//! | GET | `/internal/approvals/pending` | 操作者の承認待ち一覧 |

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use invoiceflow_domain::{
    approval::{
        ApprovalAction,
        ApprovalPlanWithScopes,
        ApprovalScopeId,
        ApprovalScopeWithSteps,
        ApprovalStep,
        InvoiceApproval,
    },
    firm::FirmId,
    invoice::InvoiceId,
    user::UserId,
};
use invoiceflow_infra::repository::PendingStepWithInvoice;
use invoiceflow_shared::ApiResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    usecase::{ActOnApprovalInput, ApprovalOutcome, ApprovalUseCaseImpl},
};

/// 承認 API の State
pub struct ApprovalState {
    pub usecase: ApprovalUseCaseImpl,
}

// =============================================================================
// リクエスト
// =============================================================================

/// 承認依頼リクエスト
#[derive(Debug, Deserialize)]
pub struct EnsurePlanRequest {
    /// 事業所 ID (内部 API 用)
    pub firm_id:           Uuid,
    /// 申請者のユーザー ID (内部 API 用)
    pub requester_user_id: Uuid,
}

/// 承認・却下リクエスト
#[derive(Debug, Deserialize)]
pub struct ApprovalActionRequest {
    /// 事業所 ID (内部 API 用)
    pub firm_id:       Uuid,
    /// 操作するユーザー ID (内部 API 用)
    pub actor_user_id: Uuid,
    pub action:        ApprovalAction,
    /// コメント（任意）
    #[serde(default)]
    pub comment:       Option<String>,
    /// 対象スコープ（複数スコープで操作可能な場合のみ必要）
    #[serde(default)]
    pub scope_id:      Option<Uuid>,
}

/// 事業所指定クエリパラメータ
#[derive(Debug, Deserialize)]
pub struct FirmQuery {
    pub firm_id: Uuid,
}

/// ユーザー指定クエリパラメータ
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub firm_id: Uuid,
    pub user_id: Uuid,
}

// =============================================================================
// レスポンス DTO
// =============================================================================

/// 承認ステップ DTO
#[derive(Debug, Serialize)]
pub struct ApprovalStepDto {
    pub id:               String,
    pub step_index:       i32,
    pub approver_user_id: String,
    pub status:           String,
    pub acted_by_user_id: Option<String>,
    pub acted_at:         Option<String>,
    pub comment:          Option<String>,
}

impl From<&ApprovalStep> for ApprovalStepDto {
    fn from(step: &ApprovalStep) -> Self {
        Self {
            id:               step.id().to_string(),
            step_index:       step.step_index().as_i32(),
            approver_user_id: step.approver_user_id().to_string(),
            status:           step.status().to_string(),
            acted_by_user_id: step.acted_by_user_id().map(|u| u.to_string()),
            acted_at:         step.acted_at().map(|t| t.to_rfc3339()),
            comment:          step.comment().map(|c| c.as_str().to_string()),
        }
    }
}

/// 承認スコープ DTO
#[derive(Debug, Serialize)]
pub struct ApprovalScopeDto {
    pub id:            String,
    pub scope_type:    String,
    pub scope_key:     Option<String>,
    pub amount:        Decimal,
    pub currency_code: String,
    pub status:        String,
    pub steps:         Vec<ApprovalStepDto>,
}

impl From<&ApprovalScopeWithSteps> for ApprovalScopeDto {
    fn from(scoped: &ApprovalScopeWithSteps) -> Self {
        let scope = &scoped.scope;
        Self {
            id:            scope.id().to_string(),
            scope_type:    scope.scope_type().to_string(),
            scope_key:     scope.scope_key().map(str::to_string),
            amount:        scope.amount(),
            currency_code: scope.currency_code().as_str().to_string(),
            status:        scope.status().to_string(),
            steps:         scoped.steps.iter().map(ApprovalStepDto::from).collect(),
        }
    }
}

/// 承認プラン DTO
#[derive(Debug, Serialize)]
pub struct ApprovalPlanDto {
    pub id:                String,
    pub invoice_id:        String,
    pub requester_user_id: String,
    pub status:            String,
    pub completed_at:      Option<String>,
    pub rejected_at:       Option<String>,
    pub created_at:        String,
    pub updated_at:        String,
    pub scopes:            Vec<ApprovalScopeDto>,
}

impl From<&ApprovalPlanWithScopes> for ApprovalPlanDto {
    fn from(tree: &ApprovalPlanWithScopes) -> Self {
        let plan = &tree.plan;
        Self {
            id:                plan.id().to_string(),
            invoice_id:        plan.invoice_id().to_string(),
            requester_user_id: plan.requester_user_id().to_string(),
            status:            plan.status().to_string(),
            completed_at:      plan.completed_at().map(|t| t.to_rfc3339()),
            rejected_at:       plan.rejected_at().map(|t| t.to_rfc3339()),
            created_at:        plan.created_at().to_rfc3339(),
            updated_at:        plan.updated_at().to_rfc3339(),
            scopes:            tree.scopes.iter().map(ApprovalScopeDto::from).collect(),
        }
    }
}

/// 承認履歴 DTO
#[derive(Debug, Serialize)]
pub struct ApprovalHistoryDto {
    pub id:         String,
    pub plan_id:    String,
    pub user_id:    String,
    pub status:     String,
    pub comment:    Option<String>,
    pub acted_at:   Option<String>,
    pub created_at: String,
}

impl From<&InvoiceApproval> for ApprovalHistoryDto {
    fn from(history: &InvoiceApproval) -> Self {
        Self {
            id:         history.id().to_string(),
            plan_id:    history.plan_id().to_string(),
            user_id:    history.user_id().to_string(),
            status:     history.status().to_string(),
            comment:    history.comment().map(str::to_string),
            acted_at:   history.acted_at().map(|t| t.to_rfc3339()),
            created_at: history.created_at().to_rfc3339(),
        }
    }
}

/// 承認待ち DTO
#[derive(Debug, Serialize)]
pub struct PendingApprovalDto {
    pub invoice_id:       String,
    pub plan_id:          String,
    pub scope_id:         String,
    pub step_id:          String,
    pub step_index:       i32,
    pub approver_user_id: String,
}

impl From<&PendingStepWithInvoice> for PendingApprovalDto {
    fn from(pending: &PendingStepWithInvoice) -> Self {
        Self {
            invoice_id:       pending.invoice_id.to_string(),
            plan_id:          pending.step.plan_id().to_string(),
            scope_id:         pending.step.scope_id().to_string(),
            step_id:          pending.step.id().to_string(),
            step_index:       pending.step.step_index().as_i32(),
            approver_user_id: pending.step.approver_user_id().to_string(),
        }
    }
}

// =============================================================================
// ハンドラ
// =============================================================================

/// 承認を依頼する（進行中プランがあればそれを返す）
///
/// ## エンドポイント
/// POST /internal/invoices/{invoice_id}/approval-plan
#[tracing::instrument(skip_all, fields(%invoice_id))]
pub async fn ensure_approval_plan(
    State(state): State<Arc<ApprovalState>>,
    Path(invoice_id): Path<Uuid>,
    Json(req): Json<EnsurePlanRequest>,
) -> Result<Response, ServiceError> {
    let tree = state
        .usecase
        .ensure_active_plan(
            FirmId::from_uuid(req.firm_id),
            InvoiceId::from_uuid(invoice_id),
            UserId::from_uuid(req.requester_user_id),
        )
        .await?;

    Ok(Json(ApiResponse::new(ApprovalPlanDto::from(&tree))).into_response())
}

/// 進行中プランを取得する
///
/// ## エンドポイント
/// GET /internal/invoices/{invoice_id}/approval-plan?firm_id={firm_id}
#[tracing::instrument(skip_all, fields(%invoice_id))]
pub async fn get_approval_plan(
    State(state): State<Arc<ApprovalState>>,
    Path(invoice_id): Path<Uuid>,
    Query(query): Query<FirmQuery>,
) -> Result<Response, ServiceError> {
    let tree = state
        .usecase
        .get_active_plan(
            FirmId::from_uuid(query.firm_id),
            InvoiceId::from_uuid(invoice_id),
        )
        .await?;

    Ok(Json(ApiResponse::new(ApprovalPlanDto::from(&tree))).into_response())
}

/// 承認待ちステップを承認・却下する
///
/// ## エンドポイント
/// POST /internal/invoices/{invoice_id}/approval-actions
#[tracing::instrument(skip_all, fields(%invoice_id))]
pub async fn act_on_approval(
    State(state): State<Arc<ApprovalState>>,
    Path(invoice_id): Path<Uuid>,
    Json(req): Json<ApprovalActionRequest>,
) -> Result<Response, ServiceError> {
    let input = ActOnApprovalInput {
        action:   req.action,
        comment:  req.comment,
        scope_id: req.scope_id.map(ApprovalScopeId::from_uuid),
    };

    let outcome: ApprovalOutcome = state
        .usecase
        .act_on_approval(
            input,
            FirmId::from_uuid(req.firm_id),
            InvoiceId::from_uuid(invoice_id),
            UserId::from_uuid(req.actor_user_id),
        )
        .await?;

    Ok(Json(ApiResponse::new(outcome)).into_response())
}

/// 承認履歴を取得する
///
/// ## エンドポイント
/// GET /internal/invoices/{invoice_id}/approval-history?firm_id={firm_id}
#[tracing::instrument(skip_all, fields(%invoice_id))]
pub async fn list_approval_history(
    State(state): State<Arc<ApprovalState>>,
    Path(invoice_id): Path<Uuid>,
    Query(query): Query<FirmQuery>,
) -> Result<Response, ServiceError> {
    let history = state
        .usecase
        .list_approval_history(
            FirmId::from_uuid(query.firm_id),
            InvoiceId::from_uuid(invoice_id),
        )
        .await?;

    let dtos: Vec<ApprovalHistoryDto> = history.iter().map(ApprovalHistoryDto::from).collect();
    Ok(Json(ApiResponse::new(dtos)).into_response())
}

/// 操作者の承認待ち一覧を取得する
///
/// ## エンドポイント
/// GET /internal/approvals/pending?firm_id={firm_id}&user_id={user_id}
#[tracing::instrument(skip_all)]
pub async fn list_pending_approvals(
    State(state): State<Arc<ApprovalState>>,
    Query(query): Query<UserQuery>,
) -> Result<Response, ServiceError> {
    let pending = state
        .usecase
        .list_pending_approvals(
            FirmId::from_uuid(query.firm_id),
            UserId::from_uuid(query.user_id),
        )
        .await?;

    let dtos: Vec<PendingApprovalDto> = pending.iter().map(PendingApprovalDto::from).collect();
    Ok(Json(ApiResponse::new(dtos)).into_response())
}
