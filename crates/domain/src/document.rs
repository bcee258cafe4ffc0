//! # ドキュメント
//!
//! ドキュメントストアに保存される 1 件のレコード。本体はスキーマを持たない
//! JSON オブジェクトで、主キーのみ型付きで保持する。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

define_uuid_id! {
    /// ドキュメントの主キー
    pub struct DocumentId;
}

/// ドキュメントストア上の 1 ドキュメント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 主キー
    pub id:   DocumentId,
    /// ドキュメント本体（トップレベルのフィールド集合）
    pub body: Map<String, Value>,
}

impl Document {
    pub fn new(id: DocumentId, body: Map<String, Value>) -> Self {
        Self { id, body }
    }

    /// JSON 値からドキュメントを作成する
    ///
    /// オブジェクト以外の値は `None`。
    pub fn from_value(id: DocumentId, value: Value) -> Option<Self> {
        match value {
            Value::Object(body) => Some(Self { id, body }),
            _ => None,
        }
    }

    /// トップレベルのフィールド値を取得する
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// 配列フィールドを取得する
    ///
    /// フィールドが存在しない、または配列でない場合は `None`。
    pub fn array(&self, name: &str) -> Option<&Vec<Value>> {
        self.body.get(name).and_then(Value::as_array)
    }
}
