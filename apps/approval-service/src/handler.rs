//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! - 各ハンドラはサブモジュールに配置し、ここで re-export する
//! - ハンドラは薄く保ち、ビジネスロジックはユースケース層に委譲する

pub mod approval;
pub mod health;

pub use approval::{
    ApprovalState,
    act_on_approval,
    ensure_approval_plan,
    get_approval_plan,
    list_approval_history,
    list_pending_approvals,
};
pub use health::{ReadinessState, health_check, readiness_check};
