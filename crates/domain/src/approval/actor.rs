//! # 操作可能ユーザーの解決
//!
//! ステップに指名された承認者に加え、承認者の設定で有効期間内の代理人も
//! 操作できる。判定は操作時点の時刻と設定で毎回行い、ステップ作成時には
//! 固定しない。

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{approval_setup::ApprovalSetupDirectory, user::UserId};

/// 承認者に代わって操作できるユーザーを含めた、操作可能ユーザーの集合
///
/// 承認者本人は常に含まれる。承認者の設定が有効で、代理人が設定され、
/// `now` が代理期間内の場合に限り代理人も含まれる。
pub fn allowed_actors(
    directory: &ApprovalSetupDirectory,
    approver: &UserId,
    now: DateTime<Utc>,
) -> HashSet<UserId> {
    let mut actors = HashSet::from([approver.clone()]);
    if let Some(substitute) = directory
        .get(approver)
        .and_then(|setup| setup.active_substitute(now))
    {
        actors.insert(substitute.clone());
    }
    actors
}
