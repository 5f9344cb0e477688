//! # ユースケース層
//!
//! 承認エンジンの操作（承認依頼・承認/却下・照会）を実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・時刻・トランザクション管理を `Arc<dyn Trait>` で注入
//! - **薄いハンドラ**: ハンドラは入出力の変換のみ行い、ロジックはユースケースに集約
//! - **1 操作 1 トランザクション**: 書き込みを伴う操作は単一トランザクションで確定する

pub(crate) mod helpers;

pub mod approval;

pub use approval::{
    ActOnApprovalInput,
    ApprovalOutcome,
    ApprovalUseCaseDeps,
    ApprovalUseCaseImpl,
};
