//! # ドキュメントストア
//!
//! テナント所有データを保持するドキュメントストアへのアクセスを抽象化する。
//!
//! ## 必要な操作
//!
//! | 操作 | 用途 |
//! |------|------|
//! | `delete_many` | 直接参照コレクションの一括削除 |
//! | `count` | 削除前の件数確認（ドライラン） |
//! | `find` | 埋め込み配列を持つ親ドキュメントの取得 |
//! | `replace_field` | 親ドキュメントの配列フィールドの丸ごと置き換え |
//! | `update_many` | アカウントレコードのフィールド除去・既定値設定 |
//!
//! 接続やプールの管理は実装側の責務。トレイトオブジェクトは `Arc` で
//! 共有され、並行実行中の複数の呼び出しから同時に使われる。

mod memory;
mod postgres;

use async_trait::async_trait;
use ledgerkeep_domain::{
    account_purge::AccountResetSpec,
    document::{Document, DocumentId},
};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
use serde_json::{Map, Value};

use crate::error::InfraError;

/// ドキュメントの検索条件
///
/// フィールド名はトップレベルのみ。値の比較は JSON 値の完全一致
/// （スカラー値を想定）で、表現の正規化は行わない。表現が揃っていない値は
/// [`Filter::ArrayNotEmpty`] などで広く取得し、呼び出し側で判定する。
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// フィールドが値と一致する
    Eq { field: String, value: Value },
    /// いずれかの条件に一致する（空なら何にも一致しない）
    Any(Vec<Filter>),
    /// 配列フィールドが空でない配列である
    ArrayNotEmpty { array_field: String },
    /// 主キーが一致する
    Id(DocumentId),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn array_not_empty(array_field: impl Into<String>) -> Self {
        Self::ArrayNotEmpty {
            array_field: array_field.into(),
        }
    }

    /// ドキュメントが条件に一致するか判定する
    ///
    /// インメモリ実装の検索と、PostgreSQL 実装の意味の基準になる。
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::Eq { field, value } => document.field(field) == Some(value),
            Self::Any(filters) => filters.iter().any(|f| f.matches(document)),
            Self::ArrayNotEmpty { array_field } => document
                .array(array_field)
                .is_some_and(|elements| !elements.is_empty()),
            Self::Id(id) => document.id == *id,
        }
    }
}

/// フィールドの除去と設定
///
/// 除去を先に適用し、その後に設定を適用する。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldUpdate {
    pub unset: Vec<String>,
    pub set:   Map<String, Value>,
}

impl FieldUpdate {
    /// ドキュメント本体に適用する
    pub fn apply(&self, body: &mut Map<String, Value>) {
        for field in &self.unset {
            body.remove(field);
        }
        for (field, value) in &self.set {
            body.insert(field.clone(), value.clone());
        }
    }
}

impl From<&AccountResetSpec> for FieldUpdate {
    fn from(spec: &AccountResetSpec) -> Self {
        Self {
            unset: spec.clear.clone(),
            set:   spec.defaults.clone(),
        }
    }
}

/// 更新結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    /// 条件に一致したドキュメント数
    pub matched:  u64,
    /// 実際に内容が変わったドキュメント数
    pub modified: u64,
}

/// ドキュメントストアトレイト
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// ストアが利用可能か確認する
    async fn ping(&self) -> Result<(), InfraError>;

    /// ドキュメントを保存する（同じ主キーがあれば置き換える）
    async fn insert(&self, collection: &str, document: Document) -> Result<(), InfraError>;

    /// 条件に一致するドキュメントを一括削除し、削除件数を返す
    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, InfraError>;

    /// 条件に一致するドキュメント数を返す
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, InfraError>;

    /// 条件に一致するドキュメントを返す
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, InfraError>;

    /// 1 ドキュメントのトップレベルフィールドを丸ごと置き換える
    ///
    /// ドキュメントが存在しない場合は `false`。
    async fn replace_field(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        value: Value,
    ) -> Result<bool, InfraError>;

    /// 条件に一致するドキュメントにフィールド更新を適用する
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &FieldUpdate,
    ) -> Result<UpdateResult, InfraError>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        Document::from_value(DocumentId::new(), value).unwrap()
    }

    #[test]
    fn test_eqはフィールド値の完全一致で判定する() {
        let document = doc(json!({"userId": "a", "total": 10}));

        assert!(Filter::eq("userId", "a").matches(&document));
        assert!(!Filter::eq("userId", "A").matches(&document));
        assert!(!Filter::eq("missing", "a").matches(&document));
    }

    #[test]
    fn test_anyは空なら何にも一致しない() {
        let document = doc(json!({"userId": "a"}));

        assert!(!Filter::Any(vec![]).matches(&document));
        assert!(
            Filter::Any(vec![Filter::eq("payerId", "a"), Filter::eq("userId", "a")])
                .matches(&document)
        );
    }

    #[test]
    fn test_array_not_emptyは要素を持つ配列にだけ一致する() {
        let filter = Filter::array_not_empty("usedDevices");

        assert!(filter.matches(&doc(json!({"usedDevices": [{"userId": 42}]}))));
        assert!(!filter.matches(&doc(json!({"usedDevices": []}))));
        assert!(!filter.matches(&doc(json!({"usedDevices": "a"}))));
        assert!(!filter.matches(&doc(json!({"name": "reception"}))));
    }

    #[test]
    fn test_field_updateは除去してから設定する() {
        let mut body = doc(json!({"token": "t", "isVerified": true, "name": "n"})).body;
        let update = FieldUpdate::from(
            &AccountResetSpec::new()
                .clear("token")
                .set_default("isVerified", json!(false)),
        );

        update.apply(&mut body);

        assert_eq!(Value::Object(body), json!({"isVerified": false, "name": "n"}));
    }
}
