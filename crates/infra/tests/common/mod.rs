//! テスト共通フィクスチャ
//!
//! オーケストレーターの統合テストで共通利用するシードデータと、
//! 実行の様子を観測するためのストアのラッパー。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use ledgerkeep_domain::{
    account_purge::{AccountResetSpec, CollectionDescriptor},
    document::{Document, DocumentId},
    tenant::TenantId,
};
use ledgerkeep_infra::{
    InfraError,
    purge::{AccountPurgeOrchestrator, CancellationSignal, CollectionRegistry},
    store::{DocumentStore, FieldUpdate, Filter, InMemoryDocumentStore, UpdateResult},
};
use serde_json::{Value, json};

pub const IDENTITY_COLLECTION: &str = "users";

/// 受け入れシナリオのレジストリ（Sales / Purchases / DeviceRegistry）
pub fn scenario_registry() -> CollectionRegistry {
    CollectionRegistry::new(vec![
        CollectionDescriptor::direct("Sales", "sales", "userId"),
        CollectionDescriptor::direct("Purchases", "purchases", "userId"),
        CollectionDescriptor::embedded("DeviceRegistry", "devices", "usedDevices", "userId"),
    ])
    .unwrap()
}

pub fn orchestrator(
    store: Arc<dyn DocumentStore>,
    registry: CollectionRegistry,
) -> AccountPurgeOrchestrator {
    AccountPurgeOrchestrator::new(
        store,
        registry,
        IDENTITY_COLLECTION,
        AccountResetSpec::accounting_default(),
    )
    .unwrap()
}

pub fn identity_id(tenant_id: &TenantId) -> DocumentId {
    DocumentId::from_uuid(*tenant_id.as_uuid())
}

/// ログイン中でパスワードリセット途中のアカウントレコードを作成する
pub async fn seed_identity(store: &dyn DocumentStore, tenant_id: &TenantId) {
    let body = json!({
        "email": "owner@example.com",
        "name": "Owner",
        "token": "session-token",
        "resetPasswordToken": "reset-token",
        "resetPasswordExpires": 1_760_000_000,
        "activatedLicense": "LIC-0001",
        "isVerified": true,
        "joinedOrganizations": ["org-1", "org-2"]
    });
    let document = Document::from_value(identity_id(tenant_id), body).unwrap();
    store.insert(IDENTITY_COLLECTION, document).await.unwrap();
}

pub async fn seed(store: &dyn DocumentStore, collection: &str, body: Value) -> DocumentId {
    let id = DocumentId::new();
    let document = Document::from_value(id, body).unwrap();
    store.insert(collection, document).await.unwrap();
    id
}

/// 受け入れシナリオのデータを作成する
///
/// - Sales: T1 が 3 件、他テナントが 1 件
/// - Purchases: 他テナントのみ 1 件
/// - DeviceRegistry: 5 要素中 2 要素が T1、2 つの親ドキュメントに分散
///
/// 戻り値は DeviceRegistry の親ドキュメントの主キー。
pub async fn seed_scenario(
    store: &dyn DocumentStore,
    tenant_id: &TenantId,
    other: &TenantId,
) -> (DocumentId, DocumentId) {
    for amount in [100, 200, 300] {
        seed(
            store,
            "sales",
            json!({"userId": tenant_id.canonical(), "amount": amount}),
        )
        .await;
    }
    seed(store, "sales", json!({"userId": other.canonical(), "amount": 50})).await;
    seed(store, "purchases", json!({"userId": other.canonical(), "amount": 70})).await;

    let reception = seed(
        store,
        "devices",
        json!({"name": "reception", "usedDevices": [
            {"userId": tenant_id.canonical(), "device": "pos-1"},
            {"userId": other.canonical(), "device": "pos-2"},
            {"userId": "0190a3c4-5b6d-7e8f-9a0b-1c2d3e4f5a6b", "device": "pos-3"}
        ]}),
    )
    .await;
    let warehouse = seed(
        store,
        "devices",
        json!({"name": "warehouse", "usedDevices": [
            {"userId": other.canonical(), "device": "scanner-1"},
            {"userId": tenant_id.canonical(), "device": "scanner-2"}
        ]}),
    )
    .await;

    seed_identity(store, tenant_id).await;
    (reception, warehouse)
}

/// 指定コレクションへの最初の操作でキャンセルを要求するストア
pub struct CancellingStore {
    inner:   InMemoryDocumentStore,
    trigger: &'static str,
    signal:  CancellationSignal,
}

impl CancellingStore {
    pub fn new(
        inner: InMemoryDocumentStore,
        trigger: &'static str,
        signal: CancellationSignal,
    ) -> Self {
        Self {
            inner,
            trigger,
            signal,
        }
    }

    fn observe(&self, collection: &str) {
        if collection == self.trigger {
            self.signal.cancel();
        }
    }
}

#[async_trait]
impl DocumentStore for CancellingStore {
    async fn ping(&self) -> Result<(), InfraError> {
        self.inner.ping().await
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), InfraError> {
        self.inner.insert(collection, document).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, InfraError> {
        self.observe(collection);
        self.inner.delete_many(collection, filter).await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, InfraError> {
        self.inner.count(collection, filter).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, InfraError> {
        self.observe(collection);
        self.inner.find(collection, filter).await
    }

    async fn replace_field(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        value: Value,
    ) -> Result<bool, InfraError> {
        self.inner.replace_field(collection, id, field, value).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &FieldUpdate,
    ) -> Result<UpdateResult, InfraError> {
        self.observe(collection);
        self.inner.update_many(collection, filter, update).await
    }
}

/// コレクションごとに遅延を入れ、同時実行数と完了順を記録するストア
#[derive(Clone)]
pub struct SlowStore {
    inner:      InMemoryDocumentStore,
    delays:     Arc<HashMap<&'static str, Duration>>,
    in_flight:  Arc<AtomicUsize>,
    peak:       Arc<AtomicUsize>,
    completion: Arc<Mutex<Vec<String>>>,
}

impl SlowStore {
    pub fn new(inner: InMemoryDocumentStore, delays: &[(&'static str, u64)]) -> Self {
        Self {
            inner,
            delays: Arc::new(
                delays
                    .iter()
                    .map(|(collection, ms)| (*collection, Duration::from_millis(*ms)))
                    .collect(),
            ),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            completion: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 観測された最大同時実行数
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// 一括削除・検索が完了したコレクション（完了順）
    pub fn completion_order(&self) -> Vec<String> {
        self.completion.lock().unwrap().clone()
    }

    async fn slow<T>(
        &self,
        collection: &str,
        call: impl Future<Output = Result<T, InfraError>>,
    ) -> Result<T, InfraError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(collection) {
            tokio::time::sleep(*delay).await;
        }
        let result = call.await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completion
            .lock()
            .unwrap()
            .push(collection.to_string());
        result
    }
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn ping(&self) -> Result<(), InfraError> {
        self.inner.ping().await
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), InfraError> {
        self.inner.insert(collection, document).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, InfraError> {
        self.slow(collection, self.inner.delete_many(collection, filter))
            .await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, InfraError> {
        self.inner.count(collection, filter).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, InfraError> {
        self.slow(collection, self.inner.find(collection, filter))
            .await
    }

    async fn replace_field(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        value: Value,
    ) -> Result<bool, InfraError> {
        self.inner.replace_field(collection, id, field, value).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &FieldUpdate,
    ) -> Result<UpdateResult, InfraError> {
        self.inner.update_many(collection, filter, update).await
    }
}
