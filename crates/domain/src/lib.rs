//! # InvoiceFlow ドメイン層
//!
//! 請求書承認ワークフローの中核となるドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（例: ApprovalPlan, ApprovalStep）
//! - **値オブジェクト**: 識別子を持たない不変オブジェクト（例: FirmId, CurrencyCode）
//! - **ドメインサービス**: エンティティに属さない純粋関数（承認チェーン解決、
//!   操作対象ステップの選択、カスケード計算）
//! - **ドメインエラー**: ビジネスルール違反を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! approval-service → infra → domain
//! ```
//!
//! ドメイン層は DB や外部サービスに一切依存しない。現在時刻も
//! 引数として受け取り、状態遷移を決定的に保つ。
//!
//! ## モジュール構成
//!
//! - [`approval`] - 承認プラン / スコープ / ステップ、チェーン解決、監査ログ
//! - [`approval_setup`] - 承認設定（承認者・承認限度額・代理人）
//! - [`invoice`] - 請求書（エンジンが参照・更新する外部エンティティ）
//! - [`firm`] - テナント（事業所）識別子
//! - [`clock`] - 時刻プロバイダ
//!
//! ## 使用例
//!
//! ```rust
//! use invoiceflow_domain::{DomainError, firm::FirmId};
//!
//! let firm_id = FirmId::new();
//!
//! let error = DomainError::NotFound {
//!     entity_type: "Invoice",
//!     id:          "inv-123".to_string(),
//! };
//! ```

#[macro_use]
mod macros;

pub mod approval;
pub mod approval_setup;
pub mod clock;
pub mod error;
pub mod firm;
pub mod invoice;
pub mod user;
pub mod value_objects;

pub use error::DomainError;
