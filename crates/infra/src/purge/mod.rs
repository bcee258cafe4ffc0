//! # テナントデータ削除
//!
//! アカウント退会時に、テナントが所有するデータを全コレクションから削除し、
//! アカウントレコード自体はリセットのみ行う。
//!
//! ## 構成
//!
//! ```text
//! CollectionRegistry ─→ purge_direct   （直接参照: 一括削除）
//!                    └→ prune_embedded （埋め込み配列: 親ドキュメントを更新）
//!                                ↓
//!                       reset_account  （アカウントレコード: 削除しない）
//!                                ↓
//!                       aggregate → PurgeReport
//! ```
//!
//! 各ステップの失敗は記述子の境界で [`PurgeOutcome::Failed`] に変換され、
//! 他の記述子の実行を止めない。オーケストレーターが致命的エラーを返すのは
//! 開始前（ストアが使えない場合）のみ。
//!
//! 自動リトライは行わない。回復手段は全体の再実行で、各操作の冪等性に依存する。

mod cancellation;
mod direct;
mod embedded;
mod orchestrator;
mod registry;
mod reset;

pub use cancellation::CancellationSignal;
pub use direct::{count_direct, direct_filter, purge_direct};
pub use embedded::{PrunedArray, count_embedded, prune_elements, prune_embedded};
use ledgerkeep_domain::{account_purge::PurgeOutcome, tenant::TenantId};
use ledgerkeep_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};
pub use orchestrator::{AccountPurgeOrchestrator, OrchestratorError, PurgeConcurrency};
pub use registry::{CollectionRegistry, RegistryError};
pub use reset::{identity_filter, preview_reset, reset_account};
use thiserror::Error;

use crate::error::InfraError;

/// 記述子単位の削除エラー
///
/// オーケストレーターの外には出ず、[`PurgeOutcome::Failed`] のメッセージになる。
#[derive(Debug, Error)]
pub enum PurgeError {
    /// ドキュメントストアの一時的なエラー（タイムアウト、接続断など）
    #[error("コレクション {collection} にアクセスできません: {source}")]
    CollectionUnavailable {
        collection: String,
        source:     InfraError,
    },

    /// 埋め込み参照をテナント ID と比較できず、更新できた親ドキュメントがない
    #[error(
        "コレクション {collection} の参照値をテナント ID と比較できませんでした（{parents} 件の親ドキュメント）"
    )]
    ReferenceTypeMismatch { collection: String, parents: u64 },

    /// リセット対象のアカウントレコードが存在しない
    #[error("テナント {tenant_id} のアカウントレコードが見つかりません")]
    IdentityNotFound { tenant_id: TenantId },

    /// 記述子がこのステップでは使えない
    #[error("記述子 {collection} を使用できません: {reason}")]
    InvalidDescriptor {
        collection: String,
        reason:     &'static str,
    },
}

impl PurgeError {
    pub(crate) fn unavailable(collection: &str, source: InfraError) -> Self {
        Self::CollectionUnavailable {
            collection: collection.to_string(),
            source,
        }
    }

    /// ログ用のエラーカテゴリ
    pub fn category(&self) -> &'static str {
        match self {
            Self::CollectionUnavailable { .. } => log_error::category::INFRASTRUCTURE,
            Self::ReferenceTypeMismatch { .. } => log_error::category::DATA_INTEGRITY,
            Self::IdentityNotFound { .. } | Self::InvalidDescriptor { .. } => {
                log_error::category::PRECONDITION
            }
        }
    }

    /// ログ用のエラー種別
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CollectionUnavailable { .. } => log_error::kind::COLLECTION_UNAVAILABLE,
            Self::ReferenceTypeMismatch { .. } => log_error::kind::REFERENCE_TYPE_MISMATCH,
            Self::IdentityNotFound { .. } => log_error::kind::IDENTITY_NOT_FOUND,
            Self::InvalidDescriptor { .. } => log_error::kind::INVALID_DESCRIPTOR,
        }
    }
}

/// 記述子の処理結果を記録用の結果に変換する
///
/// 成功・失敗ともにビジネスイベントとして出力する。失敗はここで
/// `Failed` に変換され、呼び出し元へは伝播しない。
pub(crate) fn record_outcome(
    action: &'static str,
    entity_type: &'static str,
    label: &str,
    tenant_id: &TenantId,
    result: Result<u64, PurgeError>,
) -> PurgeOutcome {
    match result {
        Ok(count) => {
            log_business_event!(
                event.category = event::category::ACCOUNT,
                event.action = action,
                event.entity_type = entity_type,
                event.collection = label,
                event.tenant_id = %tenant_id,
                event.count = count,
                event.result = event::result::SUCCESS,
                "コレクションの処理が完了"
            );
            PurgeOutcome::Deleted(count)
        }
        Err(error) => {
            tracing::error!(
                error.category = error.category(),
                error.kind = error.kind(),
                collection = label,
                error = %error,
                "コレクションの処理に失敗"
            );
            log_business_event!(
                event.category = event::category::ACCOUNT,
                event.action = action,
                event.entity_type = entity_type,
                event.collection = label,
                event.tenant_id = %tenant_id,
                event.result = event::result::FAILURE,
                "コレクションの処理に失敗"
            );
            PurgeOutcome::failed(&error)
        }
    }
}
