//! # 請求書
//!
//! 請求書本体（取込・OCR・仕訳）は周辺システムが管理する。承認エンジンが
//! 参照するのはステータス・合計金額・通貨のみで、書き込むのはステータスのみ。
//!
//! ## ステータス遷移（承認エンジンが関与する範囲）
//!
//! ```text
//! draft ──申請──→ pending_approval ──承認完了──→ approved ──→ posted
//!                         │
//!                         └──却下──→ rejected ──再申請──→ pending_approval
//! ```
//!
//! `posted`（会計システムへ転記済み）は終端状態であり、承認に回せない。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, firm::FirmId, value_objects::CurrencyCode};

define_uuid_id! {
    /// 請求書 ID
    pub struct InvoiceId;
}

/// 請求書ステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvoiceStatus {
    /// 下書き（取込済み・未申請）
    Draft,
    /// 承認待ち
    PendingApproval,
    /// 承認済み
    Approved,
    /// 却下
    Rejected,
    /// 転記済み
    Posted,
}

impl std::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending_approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "posted" => Ok(Self::Posted),
            _ => Err(DomainError::Validation(format!(
                "不正な請求書ステータス: {}",
                s
            ))),
        }
    }
}

/// 請求書エンティティ（承認エンジンから見た射影）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    firm_id: FirmId,
    status: InvoiceStatus,
    total_amount: Decimal,
    currency_code: CurrencyCode,
    updated_at: DateTime<Utc>,
}

/// 請求書の DB 復元パラメータ
pub struct InvoiceRecord {
    pub id: InvoiceId,
    pub firm_id: FirmId,
    pub status: InvoiceStatus,
    pub total_amount: Decimal,
    pub currency_code: CurrencyCode,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn from_db(record: InvoiceRecord) -> Self {
        Self {
            id: record.id,
            firm_id: record.firm_id,
            status: record.status,
            total_amount: record.total_amount,
            currency_code: record.currency_code,
            updated_at: record.updated_at,
        }
    }

    pub fn id(&self) -> &InvoiceId {
        &self.id
    }

    pub fn firm_id(&self) -> &FirmId {
        &self.firm_id
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn currency_code(&self) -> &CurrencyCode {
        &self.currency_code
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 承認に回せる状態か検証する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 転記済みの場合
    pub fn ensure_routable(&self) -> Result<(), DomainError> {
        if self.status == InvoiceStatus::Posted {
            return Err(DomainError::Validation(
                "転記済みの請求書は承認に回せません".to_string(),
            ));
        }
        Ok(())
    }
}
