//! # 事業所（テナント）
//!
//! InvoiceFlow はマルチテナント SaaS であり、請求書・承認設定・承認プランは
//! すべて事業所（Firm）に属する。リポジトリ呼び出しには必ず `FirmId` を渡し、
//! 事業所をまたいだ参照を防ぐ。
//!
//! ```rust
//! use invoiceflow_domain::firm::FirmId;
//!
//! let firm_id = FirmId::new();
//! println!("事業所: {}", firm_id);
//! ```

define_uuid_id! {
    /// 事業所の一意識別子
    pub struct FirmId;
}
