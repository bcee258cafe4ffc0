//! # 直接参照コレクションの一括削除
//!
//! 参照フィールドがテナント ID と一致するドキュメントを 1 回の一括削除で消す。
//! 条件付き削除なので、2 回目以降の実行は `Deleted(0)` になる。

use ledgerkeep_domain::{
    account_purge::{CollectionDescriptor, PurgeOutcome, ReferenceKind},
    tenant::TenantId,
};
use ledgerkeep_shared::event_log::event;
use serde_json::Value;

use super::{PurgeError, record_outcome};
use crate::store::{DocumentStore, Filter};

/// 直接参照の検索条件を作る
///
/// 直接参照フィールドには正規表現の ID が書き込まれる前提で、
/// 正規表現との完全一致で検索する。埋め込み配列参照には `None`。
pub fn direct_filter(tenant_id: &TenantId, reference: &ReferenceKind) -> Option<Filter> {
    let value = Value::String(tenant_id.canonical());
    match reference {
        ReferenceKind::DirectField { field } => Some(Filter::eq(field.as_str(), value)),
        ReferenceKind::OrFields { fields: [a, b] } => Some(Filter::Any(vec![
            Filter::eq(a.as_str(), value.clone()),
            Filter::eq(b.as_str(), value),
        ])),
        ReferenceKind::EmbeddedArray { .. } => None,
    }
}

/// 直接参照コレクションからテナントのドキュメントを削除する
///
/// 結果は削除したドキュメント数。失敗はこのコレクションの `Failed` になる。
#[tracing::instrument(skip_all, fields(collection = %descriptor.name, %tenant_id))]
pub async fn purge_direct(
    store: &dyn DocumentStore,
    tenant_id: &TenantId,
    descriptor: &CollectionDescriptor,
) -> PurgeOutcome {
    let result = try_purge(store, tenant_id, descriptor).await;

    record_outcome(
        event::action::COLLECTION_PURGED,
        event::entity_type::COLLECTION,
        &descriptor.name,
        tenant_id,
        result,
    )
}

/// 削除されるドキュメント数を数える（ドライラン）
#[tracing::instrument(skip_all, level = "debug", fields(collection = %descriptor.name, %tenant_id))]
pub async fn count_direct(
    store: &dyn DocumentStore,
    tenant_id: &TenantId,
    descriptor: &CollectionDescriptor,
) -> PurgeOutcome {
    match try_count(store, tenant_id, descriptor).await {
        Ok(count) => PurgeOutcome::Deleted(count),
        Err(error) => {
            tracing::warn!(error.kind = error.kind(), error = %error, "件数の取得に失敗");
            PurgeOutcome::failed(&error)
        }
    }
}

async fn try_purge(
    store: &dyn DocumentStore,
    tenant_id: &TenantId,
    descriptor: &CollectionDescriptor,
) -> Result<u64, PurgeError> {
    let filter = filter_for(tenant_id, descriptor)?;
    store
        .delete_many(&descriptor.collection, &filter)
        .await
        .map_err(|e| PurgeError::unavailable(&descriptor.name, e))
}

async fn try_count(
    store: &dyn DocumentStore,
    tenant_id: &TenantId,
    descriptor: &CollectionDescriptor,
) -> Result<u64, PurgeError> {
    let filter = filter_for(tenant_id, descriptor)?;
    store
        .count(&descriptor.collection, &filter)
        .await
        .map_err(|e| PurgeError::unavailable(&descriptor.name, e))
}

fn filter_for(
    tenant_id: &TenantId,
    descriptor: &CollectionDescriptor,
) -> Result<Filter, PurgeError> {
    direct_filter(tenant_id, &descriptor.reference).ok_or_else(|| PurgeError::InvalidDescriptor {
        collection: descriptor.name.clone(),
        reason:     "埋め込み配列参照は一括削除に使用できません",
    })
}
