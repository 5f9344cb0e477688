//! # 承認スコープ
//!
//! プラン内で独立して承認される単位。現在は請求書合計（`invoice_total`）の
//! 1 スコープのみを作成するが、明細単位の承認などに備えて
//! `scope_type` / `scope_key` を保持する。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::plan::ApprovalPlanId;
use crate::{DomainError, value_objects::CurrencyCode};

define_uuid_id! {
    /// 承認スコープ ID
    pub struct ApprovalScopeId;
}

/// スコープ種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalScopeType {
    /// 請求書合計
    InvoiceTotal,
}

impl std::str::FromStr for ApprovalScopeType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoice_total" => Ok(Self::InvoiceTotal),
            _ => Err(DomainError::Validation(format!(
                "不正なスコープ種別: {}",
                s
            ))),
        }
    }
}

/// 承認スコープステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalScopeStatus {
    /// 承認進行中
    Active,
    /// 全ステップ承認済み
    Completed,
    /// プラン却下により取消
    Canceled,
}

impl std::str::FromStr for ApprovalScopeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "canceled" => Ok(Self::Canceled),
            _ => Err(DomainError::Validation(format!(
                "不正な承認スコープステータス: {}",
                s
            ))),
        }
    }
}

/// 承認スコープエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalScope {
    id: ApprovalScopeId,
    plan_id: ApprovalPlanId,
    scope_type: ApprovalScopeType,
    scope_key: Option<String>,
    amount: Decimal,
    currency_code: CurrencyCode,
    status: ApprovalScopeStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 承認スコープの新規作成パラメータ
pub struct NewApprovalScope {
    pub id: ApprovalScopeId,
    pub plan_id: ApprovalPlanId,
    pub scope_type: ApprovalScopeType,
    pub scope_key: Option<String>,
    pub amount: Decimal,
    pub currency_code: CurrencyCode,
    pub now: DateTime<Utc>,
}

/// 承認スコープの DB 復元パラメータ
pub struct ApprovalScopeRecord {
    pub id: ApprovalScopeId,
    pub plan_id: ApprovalPlanId,
    pub scope_type: ApprovalScopeType,
    pub scope_key: Option<String>,
    pub amount: Decimal,
    pub currency_code: CurrencyCode,
    pub status: ApprovalScopeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalScope {
    pub fn new(params: NewApprovalScope) -> Self {
        Self {
            id: params.id,
            plan_id: params.plan_id,
            scope_type: params.scope_type,
            scope_key: params.scope_key,
            amount: params.amount,
            currency_code: params.currency_code,
            status: ApprovalScopeStatus::Active,
            created_at: params.now,
            updated_at: params.now,
        }
    }

    pub fn from_db(record: ApprovalScopeRecord) -> Self {
        Self {
            id: record.id,
            plan_id: record.plan_id,
            scope_type: record.scope_type,
            scope_key: record.scope_key,
            amount: record.amount,
            currency_code: record.currency_code,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &ApprovalScopeId {
        &self.id
    }

    pub fn plan_id(&self) -> &ApprovalPlanId {
        &self.plan_id
    }

    pub fn scope_type(&self) -> ApprovalScopeType {
        self.scope_type
    }

    pub fn scope_key(&self) -> Option<&str> {
        self.scope_key.as_deref()
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency_code(&self) -> &CurrencyCode {
        &self.currency_code
    }

    pub fn status(&self) -> ApprovalScopeStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == ApprovalScopeStatus::Active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// スコープを完了した新しいインスタンスを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: Active 以外の状態で呼び出した場合
    pub fn completed(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.finish(ApprovalScopeStatus::Completed, now)
    }

    /// スコープを取り消した新しいインスタンスを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: Active 以外の状態で呼び出した場合
    pub fn canceled(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.finish(ApprovalScopeStatus::Canceled, now)
    }

    fn finish(self, status: ApprovalScopeStatus, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !self.is_active() {
            return Err(DomainError::Validation(format!(
                "スコープは既に終了しています（現在: {}）",
                self.status
            )));
        }

        Ok(Self {
            status,
            updated_at: now,
            ..self
        })
    }
}
