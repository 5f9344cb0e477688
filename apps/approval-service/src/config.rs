//! # 承認サービス設定
//!
//! 環境変数から承認サービスの設定を読み込む。
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `APPROVAL_SERVICE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `APPROVAL_SERVICE_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `DATABASE_MAX_CONNECTIONS` | No | 接続プールの最大接続数（デフォルト: `10`） |
//! | `RUN_MIGRATIONS` | No | 起動時にマイグレーションを実行するか（デフォルト: `false`） |

use std::env;

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// 承認サービスの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalServiceConfig {
    /// バインドアドレス
    pub host:            String,
    /// ポート番号
    pub port:            u16,
    /// データベース接続 URL
    pub database_url:    String,
    /// 接続プールの最大接続数
    pub max_connections: u32,
    /// 起動時にマイグレーションを実行するか
    pub run_migrations:  bool,
}

impl ApprovalServiceConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// テストではプロセスの環境変数を書き換えずに HashMap から読み込む。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let port = parse("APPROVAL_SERVICE_PORT", required("APPROVAL_SERVICE_PORT")?)?;
        let database_url = required("DATABASE_URL")?;
        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .map(|v| parse("DATABASE_MAX_CONNECTIONS", v))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let run_migrations = lookup("RUN_MIGRATIONS")
            .map(|v| parse_bool("RUN_MIGRATIONS", v))
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            host: lookup("APPROVAL_SERVICE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database_url,
            max_connections,
            run_migrations,
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ApprovalServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApprovalServiceConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_必須項目のみでデフォルト値が入る() {
        let config = load(&[
            ("APPROVAL_SERVICE_PORT", "3002"),
            ("DATABASE_URL", "postgres://localhost/invoiceflow"),
        ])
        .unwrap();

        assert_eq!(
            config,
            ApprovalServiceConfig {
                host:            "0.0.0.0".to_string(),
                port:            3002,
                database_url:    "postgres://localhost/invoiceflow".to_string(),
                max_connections: 10,
                run_migrations:  false,
            }
        );
    }

    #[test]
    fn test_任意項目を上書きできる() {
        let config = load(&[
            ("APPROVAL_SERVICE_HOST", "127.0.0.1"),
            ("APPROVAL_SERVICE_PORT", "8080"),
            ("DATABASE_URL", "postgres://db/invoiceflow"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("RUN_MIGRATIONS", "true"),
        ])
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_connections, 25);
        assert!(config.run_migrations);
    }

    #[rstest]
    #[case(&[("DATABASE_URL", "postgres://db")], ConfigError::Missing("APPROVAL_SERVICE_PORT"))]
    #[case(&[("APPROVAL_SERVICE_PORT", "3002")], ConfigError::Missing("DATABASE_URL"))]
    fn test_必須項目がないとエラー(
        #[case] vars: &[(&str, &str)],
        #[case] expected: ConfigError,
    ) {
        assert_eq!(load(vars).unwrap_err(), expected);
    }

    #[rstest]
    #[case("APPROVAL_SERVICE_PORT", "not-a-port")]
    #[case("DATABASE_MAX_CONNECTIONS", "-1")]
    #[case("RUN_MIGRATIONS", "maybe")]
    fn test_不正な値はinvalidになる(#[case] name: &str, #[case] value: &str) {
        let mut vars = vec![
            ("APPROVAL_SERVICE_PORT", "3002"),
            ("DATABASE_URL", "postgres://db"),
        ];
        vars.retain(|(k, _)| *k != name);
        vars.push((name, value));

        let err = load(&vars).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { .. }), "{err:?}");
    }
}
