//! # AccountPurgeOrchestrator
//!
//! レジストリの全記述子に対して削除・除去を行い、最後にアカウントをリセットして
//! 結果レポートを返す。
//!
//! ## 実行順序
//!
//! ```text
//! ping → 直接参照（一括削除） → 埋め込み配列（除去） → アカウントリセット → 集約
//! ```
//!
//! 各ステージは前のステージの成否に関係なく実行される。アカウントリセットは
//! 全ての削除操作が発行され、完了した後に 1 回だけ実行する。
//!
//! ## 並行実行
//!
//! [`PurgeConcurrency::Concurrent`] では、ステージ内の記述子を最大 `max_in_flight`
//! 件まで同時に実行する。記述子同士は独立したコレクションなので順序の制約はない。
//! 完了順は不定だが、レポートの並びは集約時にレジストリ順へ戻る。
//!
//! ## キャンセル
//!
//! 記述子の操作を発行する直前に [`CancellationSignal`] を確認する。キャンセル後は
//! 新しい操作を発行せず、発行済みの操作の完了を待って記録する。未発行のラベルは
//! [`PurgeReport::not_started`] に入り、アカウントリセットは実行しない。

use std::sync::Arc;

use ledgerkeep_domain::{
    account_purge::{
        ACCOUNT_RESET_LABEL,
        AccountResetSpec,
        CollectionDescriptor,
        PurgeOutcome,
        PurgeReport,
        PurgeStage,
        StageOutcome,
        aggregate,
    },
    tenant::TenantId,
};
use ledgerkeep_shared::{event_log::event, log_business_event};
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::Instrument;

use super::{
    CancellationSignal,
    CollectionRegistry,
    RegistryError,
    count_direct,
    count_embedded,
    preview_reset,
    prune_embedded,
    purge_direct,
    reset_account,
};
use crate::{error::InfraError, store::DocumentStore};

/// 実行開始前の致命的エラー
///
/// 開始後の記述子単位の失敗はこのエラーにならず、レポートの `Failed` になる。
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("ドキュメントストアを利用できません: {0}")]
    StoreUnavailable(#[source] InfraError),
}

/// ステージ内の記述子の実行方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PurgeConcurrency {
    /// 1 件ずつ登録順に実行する
    #[default]
    Sequential,
    /// 最大 `max_in_flight` 件を同時に実行する（0 は 1 として扱う）
    Concurrent { max_in_flight: usize },
}

impl PurgeConcurrency {
    /// 同時実行数から作成する（0 または 1 は逐次実行）
    pub fn from_limit(limit: usize) -> Self {
        if limit <= 1 {
            Self::Sequential
        } else {
            Self::Concurrent {
                max_in_flight: limit,
            }
        }
    }
}

/// 記述子に対して行う操作
#[derive(Debug, Clone, Copy)]
enum DescriptorOp {
    Purge,
    Prune,
    CountDirect,
    CountEmbedded,
}

impl DescriptorOp {
    async fn execute(
        self,
        store: &dyn DocumentStore,
        tenant_id: &TenantId,
        descriptor: &CollectionDescriptor,
    ) -> PurgeOutcome {
        match self {
            Self::Purge => purge_direct(store, tenant_id, descriptor).await,
            Self::Prune => prune_embedded(store, tenant_id, descriptor).await,
            Self::CountDirect => count_direct(store, tenant_id, descriptor).await,
            Self::CountEmbedded => count_embedded(store, tenant_id, descriptor).await,
        }
    }
}

/// 1 回の実行中に蓄積される結果
#[derive(Debug, Default)]
struct RunState {
    outcomes:    Vec<StageOutcome>,
    not_started: Vec<String>,
}

/// テナントデータ削除のオーケストレーター
pub struct AccountPurgeOrchestrator {
    store:               Arc<dyn DocumentStore>,
    registry:            CollectionRegistry,
    identity_collection: String,
    reset_spec:          AccountResetSpec,
    concurrency:         PurgeConcurrency,
}

impl AccountPurgeOrchestrator {
    /// オーケストレーターを作成する
    ///
    /// アカウントレコードのコレクションを直接参照の削除対象にしているレジストリと、
    /// 不正なリセット定義は拒否する。
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: CollectionRegistry,
        identity_collection: impl Into<String>,
        reset_spec: AccountResetSpec,
    ) -> Result<Self, RegistryError> {
        let identity_collection = identity_collection.into();
        if registry
            .direct()
            .any(|d| d.collection == identity_collection)
        {
            return Err(RegistryError::TargetsIdentity {
                collection: identity_collection,
            });
        }
        reset_spec.validate()?;

        Ok(Self {
            store,
            registry,
            identity_collection,
            reset_spec,
            concurrency: PurgeConcurrency::default(),
        })
    }

    /// ステージ内の実行方法を設定する
    pub fn with_concurrency(mut self, concurrency: PurgeConcurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// テナントのデータを削除し、アカウントをリセットする
    ///
    /// ストアが使えない場合のみエラーを返す。それ以外の失敗はレポートに含まれる。
    #[tracing::instrument(skip_all, fields(%tenant_id))]
    pub async fn run(
        &self,
        tenant_id: &TenantId,
        cancel: &CancellationSignal,
    ) -> Result<PurgeReport, OrchestratorError> {
        self.store
            .ping()
            .await
            .map_err(OrchestratorError::StoreUnavailable)?;

        log_business_event!(
            event.category = event::category::ACCOUNT,
            event.action = event::action::PURGE_STARTED,
            event.tenant_id = %tenant_id,
            event.count = self.registry.len(),
            event.result = event::result::SUCCESS,
            "テナントデータ削除を開始"
        );

        let mut stage = PurgeStage::Initialized;
        let mut state = RunState::default();

        enter(&mut stage, PurgeStage::PurgingDirect);
        self.run_stage(
            stage,
            DescriptorOp::Purge,
            self.registry.direct(),
            tenant_id,
            cancel,
            &mut state,
        )
        .await;

        if !cancel.is_cancelled() {
            enter(&mut stage, PurgeStage::PurgingEmbedded);
        }
        self.run_stage(
            PurgeStage::PurgingEmbedded,
            DescriptorOp::Prune,
            self.registry.embedded(),
            tenant_id,
            cancel,
            &mut state,
        )
        .await;

        if cancel.is_cancelled() {
            enter(&mut stage, PurgeStage::Cancelled);
            state.not_started.push(ACCOUNT_RESET_LABEL.to_string());
            let report = aggregate(state.outcomes).with_cancellation(state.not_started);

            log_business_event!(
                event.category = event::category::ACCOUNT,
                event.action = event::action::PURGE_CANCELLED,
                event.tenant_id = %tenant_id,
                event.count = report.not_started().len(),
                event.result = event::result::FAILURE,
                "テナントデータ削除がキャンセルされた"
            );
            return Ok(report);
        }

        enter(&mut stage, PurgeStage::Resetting);
        let outcome = reset_account(
            self.store.as_ref(),
            &self.identity_collection,
            tenant_id,
            &self.reset_spec,
        )
        .await;
        state
            .outcomes
            .push(StageOutcome::new(stage, 0, ACCOUNT_RESET_LABEL, outcome));

        enter(&mut stage, PurgeStage::Completed);
        let report = aggregate(state.outcomes);

        let result = if report.has_failures() {
            event::result::FAILURE
        } else {
            event::result::SUCCESS
        };
        log_business_event!(
            event.category = event::category::ACCOUNT,
            event.action = event::action::PURGE_COMPLETED,
            event.tenant_id = %tenant_id,
            event.count = report.failures().len(),
            event.result = result,
            "テナントデータ削除が完了"
        );

        Ok(report)
    }

    /// 削除・更新される件数を数える（ドライラン）
    ///
    /// ストアを変更しない。各エントリの件数の意味は [`run`](Self::run) と同じ。
    #[tracing::instrument(skip_all, fields(%tenant_id))]
    pub async fn preview(&self, tenant_id: &TenantId) -> Result<PurgeReport, OrchestratorError> {
        self.store
            .ping()
            .await
            .map_err(OrchestratorError::StoreUnavailable)?;

        let never = CancellationSignal::new();
        let mut state = RunState::default();

        self.run_stage(
            PurgeStage::PurgingDirect,
            DescriptorOp::CountDirect,
            self.registry.direct(),
            tenant_id,
            &never,
            &mut state,
        )
        .await;
        self.run_stage(
            PurgeStage::PurgingEmbedded,
            DescriptorOp::CountEmbedded,
            self.registry.embedded(),
            tenant_id,
            &never,
            &mut state,
        )
        .await;

        let outcome = preview_reset(
            self.store.as_ref(),
            &self.identity_collection,
            tenant_id,
            &self.reset_spec,
        )
        .await;
        state.outcomes.push(StageOutcome::new(
            PurgeStage::Resetting,
            0,
            ACCOUNT_RESET_LABEL,
            outcome,
        ));

        Ok(aggregate(state.outcomes))
    }

    /// 1 ステージ分の記述子を実行する
    async fn run_stage<'a>(
        &self,
        stage: PurgeStage,
        op: DescriptorOp,
        descriptors: impl Iterator<Item = &'a CollectionDescriptor>,
        tenant_id: &TenantId,
        cancel: &CancellationSignal,
        state: &mut RunState,
    ) {
        match self.concurrency {
            PurgeConcurrency::Sequential => {
                for (position, descriptor) in descriptors.enumerate() {
                    if cancel.is_cancelled() {
                        state.not_started.push(descriptor.name.clone());
                        continue;
                    }
                    let outcome = op
                        .execute(self.store.as_ref(), tenant_id, descriptor)
                        .await;
                    state.outcomes.push(StageOutcome::new(
                        stage,
                        position,
                        descriptor.name.as_str(),
                        outcome,
                    ));
                }
            }
            PurgeConcurrency::Concurrent { max_in_flight } => {
                self.run_concurrent(
                    stage,
                    op,
                    descriptors,
                    *tenant_id,
                    cancel,
                    state,
                    max_in_flight,
                )
                .await;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_concurrent<'a>(
        &self,
        stage: PurgeStage,
        op: DescriptorOp,
        descriptors: impl Iterator<Item = &'a CollectionDescriptor>,
        tenant_id: TenantId,
        cancel: &CancellationSignal,
        state: &mut RunState,
        max_in_flight: usize,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
        let mut tasks = JoinSet::new();
        let mut issued: Vec<(usize, String)> = Vec::new();

        for (position, descriptor) in descriptors.enumerate() {
            // 空きを待ってから確認し、待機中のキャンセルも反映する
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                state.not_started.push(descriptor.name.clone());
                continue;
            };
            if cancel.is_cancelled() {
                state.not_started.push(descriptor.name.clone());
                continue;
            }

            issued.push((position, descriptor.name.clone()));
            let store = Arc::clone(&self.store);
            let descriptor = descriptor.clone();
            tasks.spawn(
                async move {
                    let _permit = permit;
                    let outcome = op.execute(store.as_ref(), &tenant_id, &descriptor).await;
                    StageOutcome::new(stage, position, descriptor.name, outcome)
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => state.outcomes.push(outcome),
                Err(error) => {
                    tracing::error!(error = %error, "記述子のタスクが異常終了");
                }
            }
        }

        // 異常終了したタスクも結果なしにはしない
        for (position, label) in issued {
            let recorded = state
                .outcomes
                .iter()
                .any(|o| o.stage == stage && o.label == label);
            if !recorded {
                state.outcomes.push(StageOutcome::new(
                    stage,
                    position,
                    label,
                    PurgeOutcome::failed("タスクが完了前に終了しました"),
                ));
            }
        }
    }
}

/// 状態を遷移させる
///
/// 遷移は実行順序から常に正しいはずだが、誤っていても削除は止めずに記録する。
fn enter(current: &mut PurgeStage, next: PurgeStage) {
    match current.transition(next) {
        Ok(stage) => {
            tracing::debug!(from = %current, to = %stage, "ステージを遷移");
            *current = stage;
        }
        Err(error) => {
            tracing::error!(error = %error, "ステージの遷移に失敗");
        }
    }
}
