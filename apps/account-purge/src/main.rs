//! # account-purge
//!
//! 1 テナント分の業務データを削除し、アカウントレコードを初期状態に戻す
//! バッチコマンド。
//!
//! ## 処理の流れ
//!
//! ```text
//! 設定読み込み → DB 接続・マイグレーション → 対象テナントの解決
//!   → 直接参照の削除 → 埋め込み参照の除去 → アカウントのリセット
//!   → レポート出力（JSON）
//! ```
//!
//! Ctrl-C を受け取ると、未着手の削除を開始せずにキャンセルする。
//! 実行中の削除は完了まで待つ。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `PURGE_TENANT_ID` | どちらか | 削除対象のテナント ID |
//! | `PURGE_ACCOUNT_EMAIL` | どちらか | 削除対象のアカウントのメールアドレス |
//! | `PURGE_REGISTRY_PATH` | No | コレクション定義（JSON）。未指定なら組み込みの定義 |
//! | `PURGE_CONCURRENCY` | No | ステージ内の最大同時実行数（デフォルト: 逐次） |
//! | `PURGE_DRY_RUN` | No | `true` なら削除せず件数のみ出力 |
//! | `PURGE_OPERATOR_ROLE` | No | 実行者のロール。指定時は権限表で `account:delete` を確認 |
//! | `LOG_FORMAT` | No | `json` または `pretty`（デフォルト: `pretty`） |
//!
//! ログは標準エラー出力に書き、標準出力にはレポートだけを出す。
//!
//! ## 終了コード
//!
//! 失敗したコレクションがある場合、またはキャンセルされた場合は 1 を返す。
//! 同じテナントで再実行すれば残りが削除される。

mod config;
mod resolve;

use std::{process::ExitCode, sync::Arc};

use anyhow::Context as _;
use config::PurgeConfig;
use ledgerkeep_domain::account_purge::{AccountResetSpec, CountMeaning, PurgeReport};
use ledgerkeep_infra::{
    db,
    purge::{AccountPurgeOrchestrator, CancellationSignal, CollectionRegistry, PurgeConcurrency},
    store::{DocumentStore, PostgresDocumentStore},
};
use ledgerkeep_shared::observability::init_tracing;
use resolve::resolve_tenant;
use tracing::Instrument as _;

/// アカウントレコードを保持するコレクション
const IDENTITY_COLLECTION: &str = "users";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    let config = PurgeConfig::from_env().context("設定の読み込みに失敗しました")?;

    init_tracing(config.log_format);

    execute(config)
        .instrument(tracing::info_span!("app", service = "account-purge"))
        .await
}

async fn execute(config: PurgeConfig) -> anyhow::Result<ExitCode> {
    if !config.is_authorized() {
        anyhow::bail!(
            "ロール {} にはアカウント削除の権限がありません",
            config
                .operator_role
                .map_or_else(String::new, |role| role.to_string())
        );
    }

    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベースへの接続に失敗しました")?;
    db::run_migrations(&pool)
        .await
        .context("マイグレーションの適用に失敗しました")?;
    let store: Arc<dyn DocumentStore> = Arc::new(PostgresDocumentStore::new(pool));

    let registry = match &config.registry_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("{} を読み込めません", path.display()))?;
            CollectionRegistry::from_json_str(&json)
                .with_context(|| format!("{} のコレクション定義が不正です", path.display()))?
        }
        None => CollectionRegistry::accounting_default(),
    };

    let orchestrator = AccountPurgeOrchestrator::new(
        store.clone(),
        registry,
        IDENTITY_COLLECTION,
        AccountResetSpec::accounting_default(),
    )?
    .with_concurrency(PurgeConcurrency::from_limit(config.concurrency));

    let tenant_id = resolve_tenant(store.as_ref(), IDENTITY_COLLECTION, &config.target).await?;

    let report = if config.dry_run {
        tracing::info!(tenant.id = %tenant_id, "ドライランのため件数のみ確認します");
        orchestrator.preview(&tenant_id).await?
    } else {
        let cancel = CancellationSignal::new();
        let listener = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
        let report = orchestrator.run(&tenant_id, &cancel).await;
        listener.abort();
        report?
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(exit_code(&report))
}

async fn cancel_on_ctrl_c(cancel: CancellationSignal) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("中断を受け付けました。実行中の削除の完了を待ちます");
        cancel.cancel();
    }
}

fn exit_code(report: &PurgeReport) -> ExitCode {
    tracing::info!(
        deleted = report.total(CountMeaning::DocumentsDeleted),
        parents_updated = report.total(CountMeaning::ParentsUpdated),
        cancelled = report.is_cancelled(),
        "アカウント削除の結果"
    );

    for (label, reason) in report.failures() {
        tracing::error!(collection.label = label, reason, "削除に失敗したコレクション");
    }

    if report.has_failures() || report.is_cancelled() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
