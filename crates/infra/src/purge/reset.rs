//! # アカウントリセット
//!
//! テナント自身のアカウントレコードからセッション系のフィールドを除去し、
//! 一部を既定値に戻す。レコードは削除しない（退会後も再有効化できる状態を保つ）。

use ledgerkeep_domain::{
    account_purge::{AccountResetSpec, PurgeOutcome},
    document::DocumentId,
    tenant::TenantId,
};
use ledgerkeep_shared::event_log::event;

use super::{PurgeError, record_outcome};
use crate::store::{DocumentStore, FieldUpdate, Filter};

/// アカウントレコードの検索条件
///
/// アカウントレコードの主キーはテナント ID と同じ値。
pub fn identity_filter(tenant_id: &TenantId) -> Filter {
    Filter::Id(DocumentId::from_uuid(*tenant_id.as_uuid()))
}

/// アカウントレコードをリセットする
///
/// 結果の件数は変更したアカウントレコード数（0 または 1）。既にリセット済みで
/// 内容が変わらない場合は 0。レコードが存在しない場合は `IdentityNotFound` の
/// 失敗になる。
#[tracing::instrument(skip_all, fields(%identity_collection, %tenant_id))]
pub async fn reset_account(
    store: &dyn DocumentStore,
    identity_collection: &str,
    tenant_id: &TenantId,
    spec: &AccountResetSpec,
) -> PurgeOutcome {
    let result = try_reset(store, identity_collection, tenant_id, spec).await;

    record_outcome(
        event::action::ACCOUNT_RESET,
        event::entity_type::IDENTITY,
        identity_collection,
        tenant_id,
        result,
    )
}

/// リセットで変更されるアカウントレコード数を数える（ドライラン）
#[tracing::instrument(skip_all, level = "debug", fields(%identity_collection, %tenant_id))]
pub async fn preview_reset(
    store: &dyn DocumentStore,
    identity_collection: &str,
    tenant_id: &TenantId,
    spec: &AccountResetSpec,
) -> PurgeOutcome {
    match try_preview(store, identity_collection, tenant_id, spec).await {
        Ok(count) => PurgeOutcome::Deleted(count),
        Err(error) => {
            tracing::warn!(error.kind = error.kind(), error = %error, "リセット対象の確認に失敗");
            PurgeOutcome::failed(&error)
        }
    }
}

async fn try_reset(
    store: &dyn DocumentStore,
    identity_collection: &str,
    tenant_id: &TenantId,
    spec: &AccountResetSpec,
) -> Result<u64, PurgeError> {
    let result = store
        .update_many(
            identity_collection,
            &identity_filter(tenant_id),
            &FieldUpdate::from(spec),
        )
        .await
        .map_err(|e| PurgeError::unavailable(identity_collection, e))?;

    if result.matched == 0 {
        return Err(PurgeError::IdentityNotFound {
            tenant_id: *tenant_id,
        });
    }
    Ok(result.modified)
}

async fn try_preview(
    store: &dyn DocumentStore,
    identity_collection: &str,
    tenant_id: &TenantId,
    spec: &AccountResetSpec,
) -> Result<u64, PurgeError> {
    let identities = store
        .find(identity_collection, &identity_filter(tenant_id))
        .await
        .map_err(|e| PurgeError::unavailable(identity_collection, e))?;
    if identities.is_empty() {
        return Err(PurgeError::IdentityNotFound {
            tenant_id: *tenant_id,
        });
    }

    let update = FieldUpdate::from(spec);
    let modified = identities
        .into_iter()
        .filter(|identity| {
            let mut body = identity.body.clone();
            update.apply(&mut body);
            body != identity.body
        })
        .count();
    Ok(modified as u64)
}
