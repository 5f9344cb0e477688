//! # リポジトリ実装
//!
//! 承認エンジンが使うテーブルごとのリポジトリトレイトと PostgreSQL 実装。
//!
//! - 書き込みは [`TxContext`](crate::db::TxContext) を必須引数に取る
//! - 状態遷移の更新はステータス条件付き UPDATE で行い、
//!   対象行がなければ `InfraErrorKind::Conflict` を返す

pub mod approval_plan_repository;
pub mod approval_scope_repository;
pub mod approval_setup_repository;
pub mod approval_step_repository;
pub mod invoice_approval_repository;
pub mod invoice_repository;

pub use approval_plan_repository::{ApprovalPlanRepository, PostgresApprovalPlanRepository};
pub use approval_scope_repository::{ApprovalScopeRepository, PostgresApprovalScopeRepository};
pub use approval_setup_repository::{ApprovalSetupRepository, PostgresApprovalSetupRepository};
pub use approval_step_repository::{
    ApprovalStepRepository,
    PendingStepWithInvoice,
    PostgresApprovalStepRepository,
};
pub use invoice_approval_repository::{
    InvoiceApprovalRepository,
    PostgresInvoiceApprovalRepository,
};
pub use invoice_repository::{InvoiceRepository, PostgresInvoiceRepository};
