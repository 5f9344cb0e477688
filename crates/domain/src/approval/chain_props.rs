//! 承認チェーン解決のプロパティベーステスト

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::chain::{ChainResolutionError, resolve_chain};
use crate::{
    approval_setup::{ApprovalSetup, ApprovalSetupDirectory, ApprovalSetupRecord},
    firm::FirmId,
    user::UserId,
};

/// 正の金額（小数点以下 2 桁）
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// 承認限度額（`None` は無制限）
fn arb_limit() -> impl Strategy<Value = Option<Decimal>> {
    prop::option::weighted(0.8, (0i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2)))
}

fn setup(user: &UserId, approver: Option<&UserId>, limit: Option<Decimal>) -> ApprovalSetup {
    ApprovalSetup::from_db(ApprovalSetupRecord {
        firm_id: FirmId::new(),
        user_id: user.clone(),
        approver_user_id: approver.cloned(),
        approval_limit: limit,
        substitute_user_id: None,
        substitute_from: None,
        substitute_to: None,
        active: true,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// 循環のない承認者グラフでは、最後の承認者だけが金額をカバーする
    #[test]
    fn prop_resolved_chain_is_covered_only_by_last_approver(
        limits in prop::collection::vec(arb_limit(), 1..20),
        amount in arb_amount(),
    ) {
        // users[0] が申請者、users[i] の承認者は users[i + 1]
        let users: Vec<UserId> = (0..=limits.len()).map(|_| UserId::new()).collect();
        let setups = users.iter().enumerate().map(|(i, user)| {
            let limit = if i == 0 { None } else { limits[i - 1] };
            setup(user, users.get(i + 1), limit)
        });
        let directory = ApprovalSetupDirectory::new(setups);

        match resolve_chain(&directory, &users[0], amount) {
            Ok(chain) => {
                let (last, intermediates) = chain.approvers().split_last().unwrap();
                prop_assert!(directory.get(last).unwrap().covers(amount));
                for approver in intermediates {
                    let limit = directory.get(approver).unwrap().approval_limit();
                    prop_assert!(limit.is_some_and(|l| l < amount));
                }
            }
            Err(e) => {
                // 最上位まで誰もカバーできなかった場合のみ
                let last = users.last().unwrap().clone();
                prop_assert_eq!(e, ChainResolutionError::NoApproverConfigured { user_id: last });
                prop_assert!(limits.iter().all(|l| l.is_some_and(|l| l < amount)));
            }
        }
    }

    /// 限度額が金額に届かない循環は必ず循環エラーになる
    #[test]
    fn prop_cyclic_graph_always_fails_with_loop(
        size in 1usize..15,
        amount in arb_amount(),
    ) {
        let users: Vec<UserId> = (0..size).map(|_| UserId::new()).collect();
        let setups = users
            .iter()
            .enumerate()
            .map(|(i, user)| setup(user, Some(&users[(i + 1) % size]), Some(Decimal::ZERO)));
        let directory = ApprovalSetupDirectory::new(setups);

        let result = resolve_chain(&directory, &users[0], amount);

        let is_loop = matches!(result, Err(ChainResolutionError::Loop { .. }));
        prop_assert!(is_loop);
    }
}
