//! # ヘルスチェックのレスポンス型
//!
//! Liveness（`/health`）は常に 200、Readiness（`/health/ready`）は
//! 依存先ごとのチェック結果を集約して返す。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status:  String,
    pub version: String,
}

impl HealthResponse {
    /// プロセスが応答できる状態
    pub fn healthy(version: impl Into<String>) -> Self {
        Self {
            status:  "healthy".to_string(),
            version: version.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    Ready,
    NotReady,
}

/// Readiness の集約結果
///
/// `checks` はチェック名順に並ぶ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: ReadinessStatus,
    pub checks: BTreeMap<String, CheckStatus>,
}

impl ReadinessResponse {
    /// すべて `Ok` のときだけ `Ready`
    pub fn from_checks<I, K>(checks: I) -> Self
    where
        I: IntoIterator<Item = (K, CheckStatus)>,
        K: Into<String>,
    {
        let checks: BTreeMap<String, CheckStatus> =
            checks.into_iter().map(|(name, s)| (name.into(), s)).collect();
        let status = if checks.values().any(|s| *s == CheckStatus::Error) {
            ReadinessStatus::NotReady
        } else {
            ReadinessStatus::Ready
        };
        Self { status, checks }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ReadinessStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_livenessはバージョンを含む() {
        let json = serde_json::to_value(HealthResponse::healthy("1.2.3")).unwrap();

        assert_eq!(json, serde_json::json!({ "status": "healthy", "version": "1.2.3" }));
    }

    #[rstest]
    #[case::全て成功(vec![("database", CheckStatus::Ok)], true)]
    #[case::一つでも失敗(vec![("database", CheckStatus::Error), ("cache", CheckStatus::Ok)], false)]
    #[case::チェックなし(vec![], true)]
    fn test_readinessの集約(#[case] checks: Vec<(&str, CheckStatus)>, #[case] ready: bool) {
        let response = ReadinessResponse::from_checks(checks);

        assert_eq!(response.is_ready(), ready);
    }

    #[test]
    fn test_not_readyのjson形状() {
        let response = ReadinessResponse::from_checks([("database", CheckStatus::Error)]);

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "status": "not_ready", "checks": { "database": "error" } })
        );
    }
}
