//! # 承認設定
//!
//! ユーザーごとの承認者・承認限度額・代理人の設定。事業所の管理者が
//! 登録し、承認エンジンからは読み取り専用で参照する。
//!
//! ## 承認者グラフ
//!
//! 各ユーザーの `approver_user_id` をたどると、申請者から上位承認者への
//! 連鎖（承認者グラフ）ができる。設定ミスにより循環しうるため、
//! たどる側（[`resolve_chain`](crate::approval::resolve_chain)）で
//! 深さ上限と訪問済み集合による検出を行う。
//!
//! ## 代理人
//!
//! `substitute_user_id` が設定され、現在時刻が
//! `[substitute_from, substitute_to]`（両端含む、未設定は無限）に収まり、
//! かつ設定自体が有効な場合に限り、代理人は承認者に代わって操作できる。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{firm::FirmId, user::UserId};

/// 承認設定エンティティ
///
/// (firm_id, user_id) ごとに 1 件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalSetup {
    firm_id: FirmId,
    user_id: UserId,
    approver_user_id: Option<UserId>,
    approval_limit: Option<Decimal>,
    substitute_user_id: Option<UserId>,
    substitute_from: Option<DateTime<Utc>>,
    substitute_to: Option<DateTime<Utc>>,
    active: bool,
}

/// 承認設定の DB 復元パラメータ
pub struct ApprovalSetupRecord {
    pub firm_id: FirmId,
    pub user_id: UserId,
    pub approver_user_id: Option<UserId>,
    pub approval_limit: Option<Decimal>,
    pub substitute_user_id: Option<UserId>,
    pub substitute_from: Option<DateTime<Utc>>,
    pub substitute_to: Option<DateTime<Utc>>,
    pub active: bool,
}

impl ApprovalSetup {
    pub fn from_db(record: ApprovalSetupRecord) -> Self {
        Self {
            firm_id: record.firm_id,
            user_id: record.user_id,
            approver_user_id: record.approver_user_id,
            approval_limit: record.approval_limit,
            substitute_user_id: record.substitute_user_id,
            substitute_from: record.substitute_from,
            substitute_to: record.substitute_to,
            active: record.active,
        }
    }

    // Getter メソッド

    pub fn firm_id(&self) -> &FirmId {
        &self.firm_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn approver_user_id(&self) -> Option<&UserId> {
        self.approver_user_id.as_ref()
    }

    pub fn approval_limit(&self) -> Option<Decimal> {
        self.approval_limit
    }

    pub fn substitute_user_id(&self) -> Option<&UserId> {
        self.substitute_user_id.as_ref()
    }

    pub fn substitute_from(&self) -> Option<DateTime<Utc>> {
        self.substitute_from
    }

    pub fn substitute_to(&self) -> Option<DateTime<Utc>> {
        self.substitute_to
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    // ビジネスロジックメソッド

    /// 承認限度額が金額をカバーするか
    ///
    /// 限度額が未設定（無制限）の場合は常に `true`。
    pub fn covers(&self, amount: Decimal) -> bool {
        self.approval_limit.is_none_or(|limit| limit >= amount)
    }

    /// 指定時刻に代理人が有効か
    ///
    /// 設定が無効、代理人が未設定、または期間外の場合は `None` を返す。
    pub fn active_substitute(&self, now: DateTime<Utc>) -> Option<&UserId> {
        if !self.active {
            return None;
        }
        let substitute = self.substitute_user_id.as_ref()?;
        let started = self.substitute_from.is_none_or(|from| from <= now);
        let not_ended = self.substitute_to.is_none_or(|to| now <= to);
        (started && not_ended).then_some(substitute)
    }
}

/// 事業所の承認設定一覧
///
/// チェーン解決と代理人判定のために、事業所の承認設定をユーザー ID で
/// 引けるようにしたもの。リクエストごとにリポジトリから読み込んで構築する。
#[derive(Debug, Clone, Default)]
pub struct ApprovalSetupDirectory {
    setups: HashMap<UserId, ApprovalSetup>,
}

impl ApprovalSetupDirectory {
    pub fn new(setups: impl IntoIterator<Item = ApprovalSetup>) -> Self {
        Self {
            setups: setups
                .into_iter()
                .map(|setup| (setup.user_id().clone(), setup))
                .collect(),
        }
    }

    pub fn get(&self, user_id: &UserId) -> Option<&ApprovalSetup> {
        self.setups.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.setups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.setups.is_empty()
    }

    /// 指定ユーザーを有効な代理人としている承認者の一覧
    pub fn delegators_of(&self, substitute: &UserId, now: DateTime<Utc>) -> Vec<UserId> {
        self.setups
            .values()
            .filter(|setup| setup.active_substitute(now) == Some(substitute))
            .map(|setup| setup.user_id().clone())
            .collect()
    }
}
