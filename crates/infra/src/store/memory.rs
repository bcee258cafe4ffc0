//! # インメモリ DocumentStore
//!
//! プロセス内のマップにドキュメントを保持する実装。テストとドライランで使用する。
//! コレクション単位の障害注入（[`fail_collection`](InMemoryDocumentStore::fail_collection)）
//! により、失敗の分離を検証できる。

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use ledgerkeep_domain::document::{Document, DocumentId};
use serde_json::Value;

use super::{DocumentStore, FieldUpdate, Filter, UpdateResult};
use crate::error::InfraError;

#[derive(Default)]
struct State {
    collections: HashMap<String, Vec<Document>>,
    failing:     HashSet<String>,
    offline:     bool,
}

/// インメモリ実装の DocumentStore
///
/// `Clone` したインスタンスは同じデータを共有する。
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON オブジェクトを新しい主キーで保存し、主キーを返す
    ///
    /// オブジェクト以外の値は保存せず `None` を返す。
    pub fn seed(&self, collection: &str, value: Value) -> Option<DocumentId> {
        let document = Document::from_value(DocumentId::new(), value)?;
        let id = document.id;
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Some(id)
    }

    /// コレクション内の全ドキュメント（保存順）
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// 主キーでドキュメントを取得する
    pub fn get(&self, collection: &str, id: &DocumentId) -> Option<Document> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == *id).cloned())
    }

    /// 指定コレクションへの操作をすべて失敗させる
    pub fn fail_collection(&self, collection: &str) {
        self.lock().failing.insert(collection.to_string());
    }

    /// 障害注入を解除する
    pub fn restore_collection(&self, collection: &str) {
        self.lock().failing.remove(collection);
    }

    /// ストア全体を利用不可にする（`ping` が失敗する）
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 障害注入を確認したうえでロックを取得する
    fn checked(&self, collection: &str) -> Result<MutexGuard<'_, State>, InfraError> {
        let state = self.lock();
        if state.offline {
            return Err(InfraError::unavailable("ストアがオフラインです"));
        }
        if state.failing.contains(collection) {
            return Err(InfraError::unavailable(format!(
                "コレクション {collection} への接続がタイムアウトしました"
            )));
        }
        Ok(state)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ping(&self) -> Result<(), InfraError> {
        if self.lock().offline {
            return Err(InfraError::unavailable("ストアがオフラインです"));
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), InfraError> {
        let mut state = self.checked(collection)?;
        let documents = state.collections.entry(collection.to_string()).or_default();
        match documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
        Ok(())
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, InfraError> {
        let mut state = self.checked(collection)?;
        let Some(documents) = state.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|d| !filter.matches(d));
        Ok((before - documents.len()) as u64)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, InfraError> {
        let state = self.checked(collection)?;
        Ok(state
            .collections
            .get(collection)
            .map_or(0, |docs| docs.iter().filter(|d| filter.matches(d)).count()) as u64)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, InfraError> {
        let state = self.checked(collection)?;
        Ok(state
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn replace_field(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        value: Value,
    ) -> Result<bool, InfraError> {
        let mut state = self.checked(collection)?;
        let target = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == *id));
        match target {
            Some(document) => {
                document.body.insert(field.to_string(), value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &FieldUpdate,
    ) -> Result<UpdateResult, InfraError> {
        let mut state = self.checked(collection)?;
        let mut result = UpdateResult::default();
        let Some(documents) = state.collections.get_mut(collection) else {
            return Ok(result);
        };

        for document in documents.iter_mut().filter(|d| filter.matches(d)) {
            result.matched += 1;
            let mut body = document.body.clone();
            update.apply(&mut body);
            if body != document.body {
                document.body = body;
                result.modified += 1;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_delete_manyは一致したドキュメントのみ削除し件数を返す() {
        let store = InMemoryDocumentStore::new();
        store.seed("sales", json!({"userId": "a"}));
        store.seed("sales", json!({"userId": "a"}));
        store.seed("sales", json!({"userId": "b"}));

        let deleted = store
            .delete_many("sales", &Filter::eq("userId", "a"))
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.documents("sales").len(), 1);
    }

    #[tokio::test]
    async fn test_存在しないコレクションの削除は0件を返す() {
        let store = InMemoryDocumentStore::new();

        let deleted = store
            .delete_many("missing", &Filter::eq("userId", "a"))
            .await
            .unwrap();

        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_fail_collectionで指定コレクションのみ失敗する() {
        let store = InMemoryDocumentStore::new();
        store.seed("sales", json!({"userId": "a"}));
        store.fail_collection("sales");

        assert!(store.count("sales", &Filter::eq("userId", "a")).await.is_err());
        assert!(store.count("purchases", &Filter::eq("userId", "a")).await.is_ok());

        store.restore_collection("sales");
        assert_eq!(
            store.count("sales", &Filter::eq("userId", "a")).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_manyは内容が変わらないドキュメントをmodifiedに数えない() {
        let store = InMemoryDocumentStore::new();
        store.seed("users", json!({"email": "a@example.com", "isVerified": false}));
        let update = FieldUpdate {
            unset: vec!["token".to_string()],
            set:   json!({"isVerified": false}).as_object().cloned().unwrap(),
        };

        let result = store
            .update_many("users", &Filter::eq("email", "a@example.com"), &update)
            .await
            .unwrap();

        assert_eq!(
            result,
            UpdateResult {
                matched:  1,
                modified: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_replace_fieldはフィールド全体を置き換える() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .seed("devices", json!({"usedDevices": [{"userId": "a"}, {"userId": "b"}]}))
            .unwrap();

        let replaced = store
            .replace_field("devices", &id, "usedDevices", json!([{"userId": "b"}]))
            .await
            .unwrap();

        assert!(replaced);
        assert_eq!(
            store.get("devices", &id).unwrap().field("usedDevices"),
            Some(&json!([{"userId": "b"}]))
        );
        assert!(
            !store
                .replace_field("devices", &DocumentId::new(), "usedDevices", json!([]))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_set_offlineでpingが失敗する() {
        let store = InMemoryDocumentStore::new();
        assert!(store.ping().await.is_ok());

        store.set_offline(true);
        assert!(store.ping().await.is_err());
    }
}
