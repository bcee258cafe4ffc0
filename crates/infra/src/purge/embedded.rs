//! # 埋め込み配列参照の除去
//!
//! テナント ID が、無関係な親ドキュメントの配列要素の中に現れるコレクション
//! （例: 端末の利用者一覧）を扱う。親ドキュメント自体は削除しない。
//!
//! ## 手順
//!
//! 1. 配列フィールドが空でない親ドキュメントをすべて取得する
//! 2. 配列をメモリ上でフィルタし、テナントを指す要素を取り除く
//! 3. 配列の長さが変わった親だけ、配列フィールドを丸ごと置き換える
//!
//! ストアの「配列から要素を取り除く」操作には依存しない。要素単位の更新は
//! 同じ配列への並行書き込みと競合するため、常にフィールド全体を置き換える。
//!
//! ## 参照値の比較
//!
//! 要素の参照値は文字列表現が揃っていない（大文字の混在、ハイフンなし、波括弧など）
//! ことがあるため、ストア側では文字列で絞り込まない。要素の判定はすべてメモリ上で
//! UUID として解釈して値で比較する。
//!
//! 比較できない値だけを持ち、1 件も更新できなかった場合は
//! [`PurgeError::ReferenceTypeMismatch`] として失敗にする。

use ledgerkeep_domain::{
    account_purge::{CollectionDescriptor, PurgeOutcome, ReferenceKind},
    document::Document,
    tenant::TenantId,
};
use ledgerkeep_shared::event_log::event;
use serde_json::Value;

use super::{PurgeError, record_outcome};
use crate::store::{DocumentStore, Filter};

/// 配列のフィルタ結果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrunedArray {
    /// 残す要素（元の相対順序のまま）
    pub kept:       Vec<Value>,
    /// 取り除いた要素数
    pub removed:    usize,
    /// テナント ID と比較できなかった要素数（残す側に含まれる）
    pub mismatches: usize,
}

/// 配列からテナントを指す要素を取り除く
///
/// 参照フィールドがない要素、`null` の要素は残す。比較できない値の要素も
/// 残し、`mismatches` に数える。
pub fn prune_elements(
    tenant_id: &TenantId,
    elements: &[Value],
    element_field: &str,
) -> PrunedArray {
    let mut pruned = PrunedArray::default();
    for element in elements {
        let matched = element
            .get(element_field)
            .map_or(Ok(false), |reference| tenant_id.matches_reference(reference));
        match matched {
            Ok(true) => pruned.removed += 1,
            Ok(false) => pruned.kept.push(element.clone()),
            Err(mismatch) => {
                tracing::debug!(%mismatch, "参照値をテナント ID と比較できない要素を残す");
                pruned.mismatches += 1;
                pruned.kept.push(element.clone());
            }
        }
    }
    pruned
}

/// 埋め込み配列からテナントの要素を取り除く
///
/// 結果の件数は**更新した親ドキュメント数**（取り除いた要素数ではない）。
/// 途中で失敗した場合、それまでに更新した親はそのまま残る。
#[tracing::instrument(skip_all, fields(collection = %descriptor.name, %tenant_id))]
pub async fn prune_embedded(
    store: &dyn DocumentStore,
    tenant_id: &TenantId,
    descriptor: &CollectionDescriptor,
) -> PurgeOutcome {
    let result = try_prune(store, tenant_id, descriptor).await;

    record_outcome(
        event::action::COLLECTION_PRUNED,
        event::entity_type::COLLECTION,
        &descriptor.name,
        tenant_id,
        result,
    )
}

/// 更新される親ドキュメント数を数える（ドライラン）
#[tracing::instrument(skip_all, level = "debug", fields(collection = %descriptor.name, %tenant_id))]
pub async fn count_embedded(
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

async fn try_prune(
    store: &dyn DocumentStore,
    tenant_id: &TenantId,
    descriptor: &CollectionDescriptor,
) -> Result<u64, PurgeError> {
    let (array_field, element_field) = array_fields(descriptor)?;
    let parents = find_candidates(store, descriptor, array_field).await?;

    let mut updated = 0;
    let mut mismatched_parents = 0;
    for parent in parents {
        let Some(elements) = parent.array(array_field) else {
            continue;
        };
        let pruned = prune_elements(tenant_id, elements, element_field);
        if pruned.mismatches > 0 {
            mismatched_parents += 1;
            tracing::warn!(
                parent_id = %parent.id,
                mismatches = pruned.mismatches,
                "比較できない参照値を含む親ドキュメント"
            );
        }
        if pruned.removed == 0 {
            continue;
        }

        let replaced = store
            .replace_field(
                &descriptor.collection,
                &parent.id,
                array_field,
                Value::Array(pruned.kept),
            )
            .await
            .map_err(|e| PurgeError::unavailable(&descriptor.name, e))?;
        if replaced {
            updated += 1;
        }
    }

    if updated == 0 && mismatched_parents > 0 {
        return Err(PurgeError::ReferenceTypeMismatch {
            collection: descriptor.name.clone(),
            parents:    mismatched_parents,
        });
    }

    Ok(updated)
}

async fn try_count(
    store: &dyn DocumentStore,
    tenant_id: &TenantId,
    descriptor: &CollectionDescriptor,
) -> Result<u64, PurgeError> {
    let (array_field, element_field) = array_fields(descriptor)?;
    let parents = find_candidates(store, descriptor, array_field).await?;

    let count = parents
        .iter()
        .filter_map(|parent| parent.array(array_field))
        .filter(|elements| prune_elements(tenant_id, elements, element_field).removed > 0)
        .count();
    Ok(count as u64)
}

/// 配列フィールドに要素を持つ親ドキュメントを取得する
async fn find_candidates(
    store: &dyn DocumentStore,
    descriptor: &CollectionDescriptor,
    array_field: &str,
) -> Result<Vec<Document>, PurgeError> {
    store
        .find(&descriptor.collection, &Filter::array_not_empty(array_field))
        .await
        .map_err(|e| PurgeError::unavailable(&descriptor.name, e))
}

fn array_fields(descriptor: &CollectionDescriptor) -> Result<(&str, &str), PurgeError> {
    match &descriptor.reference {
        ReferenceKind::EmbeddedArray {
            array_field,
            element_field,
        } => Ok((array_field.as_str(), element_field.as_str())),
        ReferenceKind::DirectField { .. } | ReferenceKind::OrFields { .. } => {
            Err(PurgeError::InvalidDescriptor {
                collection: descriptor.name.clone(),
                reason:     "直接参照は埋め込み配列の除去に使用できません",
            })
        }
    }
}
