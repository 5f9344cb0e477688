//! # トレーシングとリクエスト ID
//!
//! - `LOG_FORMAT=json` で 1 行 1 JSON、それ以外は人間向けの整形出力
//! - `RUST_LOG` 未設定時は `info,invoiceflow=debug`
//! - リクエスト ID は UUID v7 で採番し、`x-request-id` で受け渡す
//!
//! 初期化関数とミドルウェア部品は `observability` feature 有効時のみ。

use std::str::FromStr;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[cfg(feature = "observability")]
const DEFAULT_FILTER: &str = "info,invoiceflow=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("不明な LOG_FORMAT です: {other:?}")),
        }
    }
}

impl LogFormat {
    /// `LOG_FORMAT` を読む
    ///
    /// 不明な値は stderr に警告して `Pretty` にする。subscriber 登録前なので
    /// `tracing` では出せない。
    pub fn from_env() -> Self {
        let Ok(raw) = std::env::var("LOG_FORMAT") else {
            return Self::default();
        };
        raw.parse().unwrap_or_else(|e| {
            eprintln!("WARNING: {e}。pretty で出力します");
            Self::Pretty
        })
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub service_name: String,
    pub log_format:   LogFormat,
}

impl TracingConfig {
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_format:   LogFormat::from_env(),
        }
    }
}

/// グローバル subscriber を登録する
///
/// `ErrorLayer` を含むので、`InfraError` の `SpanTrace` に
/// 失敗したリポジトリ呼び出しまでのスパンが残る。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{
        EnvFilter,
        Layer as _,
        layer::SubscriberExt,
        util::SubscriberInitExt,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt = tracing_subscriber::fmt::layer();
    let fmt = match config.log_format {
        LogFormat::Json => fmt
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => fmt.boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .with(ErrorLayer::default())
        .init();

    tracing::info!(
        service = %config.service_name,
        log_format = ?config.log_format,
        "トレーシングを初期化しました"
    );
}

/// `SetRequestIdLayer` 用の UUID v7 採番器
///
/// 時刻順に並ぶので、ログをリクエスト ID でソートすると受付順になる。
#[cfg(feature = "observability")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV7;

#[cfg(feature = "observability")]
impl tower_http::request_id::MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(
        &mut self,
        _request: &http::Request<B>,
    ) -> Option<tower_http::request_id::RequestId> {
        let value = http::HeaderValue::try_from(uuid::Uuid::now_v7().to_string()).ok()?;
        Some(tower_http::request_id::RequestId::new(value))
    }
}

/// `TraceLayer::make_span_with` 用
///
/// `SetRequestIdLayer` の内側で呼ばれる前提。ヘッダーがなければ `-`。
#[cfg(feature = "observability")]
pub fn make_request_span<B>(request: &http::Request<B>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id,
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("pretty", LogFormat::Pretty)]
    fn test_既知のlog_formatをパースできる(#[case] raw: &str, #[case] expected: LogFormat) {
        assert_eq!(raw.parse::<LogFormat>(), Ok(expected));
    }

    #[rstest]
    #[case("JSON")]
    #[case("")]
    #[case("yaml")]
    fn test_不明なlog_formatはエラー(#[case] raw: &str) {
        assert!(raw.parse::<LogFormat>().is_err());
    }

    #[cfg(feature = "observability")]
    #[test]
    fn test_リクエストidはuuid_v7() {
        use tower_http::request_id::MakeRequestId;

        let request = http::Request::builder().body(()).unwrap();
        let id = MakeRequestUuidV7.make_request_id(&request).unwrap();

        let parsed = uuid::Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[cfg(feature = "observability")]
    #[test]
    fn test_連続採番したリクエストidは昇順() {
        use tower_http::request_id::MakeRequestId;

        let request = http::Request::builder().body(()).unwrap();
        let mut make = MakeRequestUuidV7;
        let first = make.make_request_id(&request).unwrap();
        let second = make.make_request_id(&request).unwrap();

        assert!(first.header_value().as_bytes() < second.header_value().as_bytes());
    }
}
