//! # Observability 基盤
//!
//! バッチコマンドのトレーシング初期化を提供する。
//!
//! 標準出力はレポート（JSON）の出力先なので、ログは常に標準エラー出力に書く。
//! `tracing_error::ErrorLayer` を必ず登録し、infra 層のエラーが生成時点の
//! `SpanTrace`（どのコレクションの処理中だったか）を保持できるようにする。

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（ログ収集基盤向け）
    Json,
    /// 人間が読みやすい形式（手動実行向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// `json` / `pretty` を解釈する（大文字小文字は区別しない）
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// `RUST_LOG` 未設定時のフィルタ
#[cfg(feature = "observability")]
const DEFAULT_FILTER: &str = "info,ledgerkeep=debug";

/// トレーシングを初期化する
///
/// `RUST_LOG` 環境変数でログレベルを制御できる。
/// 未設定の場合は `"info,ledgerkeep=debug"` を使う。
///
/// JSON モードではイベントのフィールドをトップレベルに展開し、現在のスパン
/// （`service` など）を `span` に出力する。サービス名は呼び出し元で
/// `tracing::info_span!("app", service = "...")` を設定して付与する。
#[cfg(feature = "observability")]
pub fn init_tracing(log_format: LogFormat) {
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    subscriber(env_filter, log_format, std::io::stderr).init();

    tracing::debug!(log_format = ?log_format, "トレーシングを初期化しました");
}

/// フィルタ、出力形式、出力先からサブスクライバを組み立てる
#[cfg(feature = "observability")]
fn subscriber<W>(
    env_filter: tracing_subscriber::EnvFilter,
    log_format: LogFormat,
    writer: W,
) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::{Layer as _, layer::SubscriberExt};

    let fmt_layer = match log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
}
