//! # 削除対象テナントの解決
//!
//! メールアドレスで指定された場合はアカウントレコードを検索し、
//! その主キーをテナント ID として使う。

use ledgerkeep_domain::tenant::TenantId;
use ledgerkeep_infra::{
    InfraError,
    store::{DocumentStore, Filter},
};
use thiserror::Error;

use crate::config::PurgeTarget;

/// テナント解決のエラー
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("メールアドレス {email} のアカウントが見つかりません")]
    NotFound { email: String },

    #[error("メールアドレス {email} のアカウントが {count} 件あります")]
    Ambiguous { email: String, count: usize },

    #[error("アカウントの検索に失敗しました")]
    Store(#[from] InfraError),
}

/// 削除対象をテナント ID に解決する
#[tracing::instrument(skip_all, fields(identity.collection = %identity_collection))]
pub async fn resolve_tenant(
    store: &dyn DocumentStore,
    identity_collection: &str,
    target: &PurgeTarget,
) -> Result<TenantId, ResolveError> {
    let email = match target {
        PurgeTarget::Tenant(tenant_id) => return Ok(*tenant_id),
        PurgeTarget::Email(email) => email,
    };

    let found = store
        .find(identity_collection, &Filter::eq("email", email.as_str()))
        .await?;

    match found.as_slice() {
        [] => Err(ResolveError::NotFound {
            email: email.clone(),
        }),
        [account] => {
            let tenant_id = TenantId::from_uuid(*account.id.as_uuid());
            tracing::info!(tenant.id = %tenant_id, "メールアドレスからテナントを解決しました");
            Ok(tenant_id)
        }
        accounts => Err(ResolveError::Ambiguous {
            email: email.clone(),
            count: accounts.len(),
        }),
    }
}
