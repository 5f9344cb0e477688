//! # ユーザー
//!
//! 申請者・承認者・代理人を識別するユーザー ID。
//! ユーザー本体（氏名、認証情報）は外部の認証基盤が管理するため、
//! 承認エンジンは ID のみを扱う。

define_uuid_id! {
    /// ユーザー ID
    pub struct UserId;
}
