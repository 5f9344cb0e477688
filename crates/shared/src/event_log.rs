//! # 構造化ログの規約
//!
//! 承認の業務イベントは [`log_business_event!`] で出す。
//! `event.kind = "business_event"` が必ず付くので、JSON ログを
//! `jq 'select(.["event.kind"] == "business_event")'` で絞り込める。
//!
//! 500 を返すエラーは `tracing::error!` に `error.category` と
//! `error.kind` を付けて出す。値は [`error`] の定数を使う。

/// 業務イベントを info レベルで出力する
///
/// 呼び出し側で付けるフィールド:
///
/// - `event.category` / `event.action` / `event.result`: [`event`] の定数
/// - `event.firm_id`
/// - `event.entity_type` / `event.entity_id` / `event.actor_id`: 分かる範囲で
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

pub mod event {
    pub mod category {
        pub const APPROVAL: &str = "approval";
    }

    pub mod action {
        /// 承認依頼（プラン作成）
        pub const PLAN_CREATED: &str = "approval.plan_created";
        pub const STEP_APPROVED: &str = "approval.step_approved";
        pub const STEP_REJECTED: &str = "approval.step_rejected";
        /// 最終承認者まで承認された
        pub const PLAN_COMPLETED: &str = "approval.plan_completed";
        pub const PLAN_REJECTED: &str = "approval.plan_rejected";
    }

    pub mod entity_type {
        pub const APPROVAL_PLAN: &str = "approval_plan";
        pub const APPROVAL_STEP: &str = "approval_step";
    }

    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

pub mod error {
    pub mod category {
        pub const INFRASTRUCTURE: &str = "infrastructure";
    }

    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const INTERNAL: &str = "internal";
    }
}
