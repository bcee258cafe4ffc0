//! # コレクション記述子
//!
//! テナントのデータを保持しうるコレクションと、テナントを参照するフィールドの
//! 宣言的な定義。削除ロジックはコレクションごとに書かず、この記述子を
//! 汎用の実行器が解釈する。

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// テナント参照の種類
///
/// 1 つの記述子は必ず 1 つの種類を持つ。`EmbeddedArray` は一括削除には
/// 使われず、配列要素の除去（親ドキュメントの更新）のみに使われる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceKind {
    /// トップレベルのフィールドがテナント ID と一致する
    DirectField { field: String },
    /// 2 つのフィールドのいずれかがテナント ID と一致する
    OrFields { fields: [String; 2] },
    /// 配列フィールドの要素のフィールドがテナント ID と一致する
    EmbeddedArray {
        array_field:   String,
        element_field: String,
    },
}

impl ReferenceKind {
    /// 埋め込み配列参照かどうか
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::EmbeddedArray { .. })
    }

    /// 参照に関わるフィールド名の一覧
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            Self::DirectField { field } => vec![field.as_str()],
            Self::OrFields { fields } => fields.iter().map(String::as_str).collect(),
            Self::EmbeddedArray {
                array_field,
                element_field,
            } => vec![array_field.as_str(), element_field.as_str()],
        }
    }
}

/// テナント所有データを持つコレクションの記述子
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// レポート用のラベル
    pub name:       String,
    /// ドキュメントストア上のコレクション名
    pub collection: String,
    /// テナント参照の種類
    pub reference:  ReferenceKind,
}

impl CollectionDescriptor {
    /// 単一フィールド参照の記述子を作成する
    pub fn direct(
        name: impl Into<String>,
        collection: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            name:       name.into(),
            collection: collection.into(),
            reference:  ReferenceKind::DirectField {
                field: field.into(),
            },
        }
    }

    /// 2 フィールド OR 参照の記述子を作成する
    pub fn or_fields(
        name: impl Into<String>,
        collection: impl Into<String>,
        field_a: impl Into<String>,
        field_b: impl Into<String>,
    ) -> Self {
        Self {
            name:       name.into(),
            collection: collection.into(),
            reference:  ReferenceKind::OrFields {
                fields: [field_a.into(), field_b.into()],
            },
        }
    }

    /// 埋め込み配列参照の記述子を作成する
    pub fn embedded(
        name: impl Into<String>,
        collection: impl Into<String>,
        array_field: impl Into<String>,
        element_field: impl Into<String>,
    ) -> Self {
        Self {
            name:       name.into(),
            collection: collection.into(),
            reference:  ReferenceKind::EmbeddedArray {
                array_field:   array_field.into(),
                element_field: element_field.into(),
            },
        }
    }

    /// 記述子単体の整合性を検証する
    ///
    /// - ラベルとコレクション名は空でない
    /// - フィールド名は空でなく、`.` を含まず、`$` で始まらない
    /// - `OrFields` の 2 フィールドは異なる
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::Validation(format!(
                "コレクション {} のラベルが空です",
                self.collection
            )));
        }
        if self.collection.trim().is_empty() {
            return Err(DomainError::Validation(format!(
                "{} のコレクション名が空です",
                self.name
            )));
        }

        for field in self.reference.field_names() {
            validate_field_name(field).map_err(|reason| {
                DomainError::Validation(format!(
                    "{} のフィールド {field:?} が不正です: {reason}",
                    self.name
                ))
            })?;
        }

        let duplicated_or_field = match &self.reference {
            ReferenceKind::OrFields { fields: [a, b] } if a == b => Some(a),
            _ => None,
        };
        if let Some(field) = duplicated_or_field {
            return Err(DomainError::Validation(format!(
                "{} の OR 参照フィールドが重複しています: {field}",
                self.name
            )));
        }

        Ok(())
    }
}

/// フィールド名の書式を検証する
///
/// ドット記法のパスはサポートしない（トップレベルのみ）。
pub fn validate_field_name(field: &str) -> Result<(), &'static str> {
    if field.trim().is_empty() {
        return Err("空のフィールド名");
    }
    if field.contains('.') {
        return Err("ドットを含むフィールド名");
    }
    if field.starts_with('$') {
        return Err("$ で始まるフィールド名");
    }
    Ok(())
}
