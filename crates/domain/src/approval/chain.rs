//! # 承認チェーン解決
//!
//! 申請者から承認設定の `approver_user_id` をたどり、承認限度額が金額を
//! カバーする承認者に到達するまでの承認者の並びを求める。
//!
//! ## アルゴリズム
//!
//! 1. 現在のユーザー（最初は申請者）の承認設定から承認者を取得する
//! 2. 承認者の承認設定が存在し、かつ有効であることを確認する
//! 3. 承認者の限度額が未設定または金額以上なら完了
//! 4. そうでなければ承認者を現在のユーザーとして 1 に戻る
//!
//! 設定ミスによる循環は訪問済み集合で、異常に長い連鎖は
//! [`MAX_CHAIN_DEPTH`] で打ち切る。いずれも再試行しても解消しない
//! 設定エラーとして扱う。

use std::collections::HashSet;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{DomainError, approval_setup::ApprovalSetupDirectory, user::UserId};

/// 承認チェーンの最大長
pub const MAX_CHAIN_DEPTH: usize = 50;

/// 承認チェーン解決エラー
///
/// いずれも承認設定の不備を表し、呼び出し元には 400 として返す。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainResolutionError {
    /// 申請者自身に承認者が設定されていない
    #[error("申請者に承認者が設定されていません")]
    RequesterHasNoApprover,

    /// チェーン途中のユーザーに承認者が設定されていない
    #[error("承認者が設定されていません: {user_id}")]
    NoApproverConfigured { user_id: UserId },

    /// 承認者の承認設定が存在しない
    #[error("承認者の承認設定が存在しません: {approver_id}")]
    ApproverSetupMissing { approver_id: UserId },

    /// 承認者の承認設定が無効
    #[error("承認者の承認設定が無効です: {approver_id}")]
    ApproverInactive { approver_id: UserId },

    /// 承認チェーンが循環している
    #[error("承認チェーンが循環しています: {user_id}")]
    Loop { user_id: UserId },

    /// 承認チェーンが長すぎる
    #[error("承認チェーンが長すぎます（上限: {max_depth}）")]
    TooDeep { max_depth: usize },
}

/// 承認チェーン
///
/// 承認順に並んだ承認者。空にはならない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalChain(Vec<UserId>);

impl ApprovalChain {
    /// # Errors
    ///
    /// - `DomainError::Validation`: 承認者が 1 人もいない場合
    pub fn new(approvers: Vec<UserId>) -> Result<Self, DomainError> {
        if approvers.is_empty() {
            return Err(DomainError::Validation(
                "承認チェーンには 1 人以上の承認者が必要です".to_string(),
            ));
        }
        Ok(Self(approvers))
    }

    pub fn approvers(&self) -> &[UserId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<UserId> {
        self.0
    }
}

/// 申請者と金額から承認チェーンを解決する
///
/// # Errors
///
/// [`ChainResolutionError`] の各バリアントを参照。
pub fn resolve_chain(
    directory: &ApprovalSetupDirectory,
    requester: &UserId,
    amount: Decimal,
) -> Result<ApprovalChain, ChainResolutionError> {
    let mut chain = Vec::new();
    let mut visited = HashSet::from([requester.clone()]);
    let mut current = requester.clone();

    for _ in 0..MAX_CHAIN_DEPTH {
        let approver = directory
            .get(&current)
            .and_then(|setup| setup.approver_user_id())
            .cloned()
            .ok_or_else(|| {
                if chain.is_empty() {
                    ChainResolutionError::RequesterHasNoApprover
                } else {
                    ChainResolutionError::NoApproverConfigured {
                        user_id: current.clone(),
                    }
                }
            })?;

        if !visited.insert(approver.clone()) {
            return Err(ChainResolutionError::Loop { user_id: approver });
        }

        let setup = directory
            .get(&approver)
            .ok_or_else(|| ChainResolutionError::ApproverSetupMissing {
                approver_id: approver.clone(),
            })?;
        if !setup.is_active() {
            return Err(ChainResolutionError::ApproverInactive {
                approver_id: approver,
            });
        }

        let covered = setup.covers(amount);
        chain.push(approver.clone());
        if covered {
            return Ok(ApprovalChain(chain));
        }

        current = approver;
    }

    Err(ChainResolutionError::TooDeep {
        max_depth: MAX_CHAIN_DEPTH,
    })
}
