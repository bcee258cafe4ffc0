//! # CollectionRegistry
//!
//! テナント所有データを持つ全コレクションの記述子を、順序付きで保持する。
//!
//! コレクションの追加はレジストリの編集で行い、実行器のコードは変更しない。
//! 起動時に整合性を検証し、不正な定義では開始しない。
//!
//! ## JSON 定義
//!
//! ```json
//! [
//!   { "name": "Sales", "collection": "sales",
//!     "reference": { "kind": "direct_field", "field": "userId" } },
//!   { "name": "DeviceRegistry", "collection": "devices",
//!     "reference": { "kind": "embedded_array", "array_field": "usedDevices", "element_field": "userId" } }
//! ]
//! ```

use std::collections::HashMap;

use ledgerkeep_domain::{
    DomainError,
    account_purge::{ACCOUNT_RESET_LABEL, CollectionDescriptor},
};
use thiserror::Error;

/// レジストリ定義のエラー
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("レジストリにコレクションが登録されていません")]
    Empty,

    #[error("記述子が不正です: {0}")]
    InvalidDescriptor(#[from] DomainError),

    #[error("コレクション {collection} に異なる参照定義が登録されています")]
    ConflictingDescriptor { collection: String },

    #[error("コレクション {collection} が重複して登録されています")]
    DuplicateCollection { collection: String },

    #[error("ラベル {label} が重複しています")]
    DuplicateLabel { label: String },

    #[error("ラベル {label} はアカウントリセット用に予約されています")]
    ReservedLabel { label: String },

    #[error("アカウントレコードのコレクション {collection} は一括削除の対象にできません")]
    TargetsIdentity { collection: String },

    #[error("レジストリ定義を読み込めません: {0}")]
    Parse(#[from] serde_json::Error),
}

/// コレクションレジストリ
#[derive(Debug, Clone)]
pub struct CollectionRegistry {
    descriptors: Vec<CollectionDescriptor>,
}

impl CollectionRegistry {
    /// 記述子の一覧からレジストリを作成する
    ///
    /// 検証内容:
    /// - 1 件以上ある
    /// - 各記述子が単体で正しい
    /// - ラベルが重複せず、予約ラベルを使っていない
    /// - 同じコレクションを 2 つの記述子が対象にしていない
    pub fn new(descriptors: Vec<CollectionDescriptor>) -> Result<Self, RegistryError> {
        if descriptors.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut by_collection: HashMap<&str, &CollectionDescriptor> = HashMap::new();
        let mut labels: Vec<&str> = Vec::with_capacity(descriptors.len());

        for descriptor in &descriptors {
            descriptor.validate()?;

            if descriptor.name == ACCOUNT_RESET_LABEL {
                return Err(RegistryError::ReservedLabel {
                    label: descriptor.name.clone(),
                });
            }
            if labels.contains(&descriptor.name.as_str()) {
                return Err(RegistryError::DuplicateLabel {
                    label: descriptor.name.clone(),
                });
            }
            labels.push(&descriptor.name);

            if let Some(existing) = by_collection.insert(&descriptor.collection, descriptor) {
                let collection = descriptor.collection.clone();
                return Err(if existing.reference == descriptor.reference {
                    RegistryError::DuplicateCollection { collection }
                } else {
                    RegistryError::ConflictingDescriptor { collection }
                });
            }
        }

        Ok(Self { descriptors })
    }

    /// JSON 配列の定義からレジストリを作成する
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let descriptors: Vec<CollectionDescriptor> = serde_json::from_str(json)?;
        Self::new(descriptors)
    }

    /// 会計アプリケーションのテナント所有コレクション
    pub fn accounting_default() -> Self {
        Self {
            descriptors: accounting_descriptors(),
        }
    }

    /// 期待されるラベルの一覧を返す（登録漏れ検出テスト用）
    pub fn expected_collection_names() -> Vec<&'static str> {
        vec![
            "Sales",
            "Purchases",
            "Expenses",
            "Inventory",
            "StockAdjustments",
            "Customers",
            "Suppliers",
            "Organizations",
            "Invitations",
            "DeviceRegistry",
            "LicenseActivations",
        ]
    }

    /// 全記述子（登録順）
    pub fn descriptors(&self) -> &[CollectionDescriptor] {
        &self.descriptors
    }

    /// 直接参照（一括削除）の記述子（登録順）
    pub fn direct(&self) -> impl Iterator<Item = &CollectionDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| !d.reference.is_embedded())
    }

    /// 埋め込み配列参照の記述子（登録順）
    pub fn embedded(&self) -> impl Iterator<Item = &CollectionDescriptor> {
        self.descriptors.iter().filter(|d| d.reference.is_embedded())
    }

    /// 登録済みラベルの一覧（登録順）
    pub fn labels(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn accounting_descriptors() -> Vec<CollectionDescriptor> {
    vec![
        CollectionDescriptor::direct("Sales", "sales", "userId"),
        CollectionDescriptor::direct("Purchases", "purchases", "userId"),
        CollectionDescriptor::direct("Expenses", "expenses", "userId"),
        CollectionDescriptor::direct("Inventory", "items", "userId"),
        CollectionDescriptor::direct("StockAdjustments", "stock_adjustments", "userId"),
        CollectionDescriptor::direct("Customers", "customers", "userId"),
        CollectionDescriptor::direct("Suppliers", "suppliers", "userId"),
        CollectionDescriptor::direct("Organizations", "organizations", "ownerId"),
        // 招待した側・された側のどちらでもテナントのデータとみなす
        CollectionDescriptor::or_fields("Invitations", "invitations", "invitedBy", "invitedUser"),
        CollectionDescriptor::embedded("DeviceRegistry", "devices", "usedDevices", "userId"),
        CollectionDescriptor::embedded("LicenseActivations", "licenses", "activations", "userId"),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_accounting_defaultは起動時検証を通過する() {
        let registry = CollectionRegistry::new(accounting_descriptors());

        assert!(registry.is_ok());
    }

    #[test]
    fn test_accounting_defaultのラベルが期待される一覧と一致する() {
        let registry = CollectionRegistry::accounting_default();

        assert_eq!(
            registry.labels(),
            CollectionRegistry::expected_collection_names()
        );
    }

    #[test]
    fn test_directとembeddedは参照の種類で分かれ登録順を保つ() {
        let registry = CollectionRegistry::accounting_default();

        let direct: Vec<&str> = registry.direct().map(|d| d.name.as_str()).collect();
        let embedded: Vec<&str> = registry.embedded().map(|d| d.name.as_str()).collect();

        assert_eq!(direct.len(), 9);
        assert_eq!(direct[0], "Sales");
        assert_eq!(direct[8], "Invitations");
        assert_eq!(embedded, vec!["DeviceRegistry", "LicenseActivations"]);
    }

    #[test]
    fn test_空のレジストリは拒否される() {
        let result = CollectionRegistry::new(vec![]);

        assert!(matches!(result, Err(RegistryError::Empty)));
    }

    #[test]
    fn test_同じコレクションに異なる参照定義があると拒否される() {
        let result = CollectionRegistry::new(vec![
            CollectionDescriptor::direct("Organizations", "organizations", "ownerId"),
            CollectionDescriptor::embedded("Members", "organizations", "members", "userId"),
        ]);

        assert!(matches!(
            result,
            Err(RegistryError::ConflictingDescriptor { collection }) if collection == "organizations"
        ));
    }

    #[test]
    fn test_同じ定義の重複登録は拒否される() {
        let result = CollectionRegistry::new(vec![
            CollectionDescriptor::direct("Sales", "sales", "userId"),
            CollectionDescriptor::direct("Sales2", "sales", "userId"),
        ]);

        assert!(matches!(
            result,
            Err(RegistryError::DuplicateCollection { .. })
        ));
    }

    #[test]
    fn test_ラベルの重複は拒否される() {
        let result = CollectionRegistry::new(vec![
            CollectionDescriptor::direct("Sales", "sales", "userId"),
            CollectionDescriptor::direct("Sales", "sales_archive", "userId"),
        ]);

        assert!(matches!(result, Err(RegistryError::DuplicateLabel { label }) if label == "Sales"));
    }

    #[test]
    fn test_予約ラベルは拒否される() {
        let result = CollectionRegistry::new(vec![CollectionDescriptor::direct(
            "AccountReset",
            "resets",
            "userId",
        )]);

        assert!(matches!(result, Err(RegistryError::ReservedLabel { .. })));
    }

    #[rstest]
    #[case::ドットを含む(CollectionDescriptor::direct("Sales", "sales", "owner.id"))]
    #[case::演算子(CollectionDescriptor::direct("Sales", "sales", "$where"))]
    #[case::空の配列フィールド(CollectionDescriptor::embedded("Devices", "devices", "", "userId"))]
    #[case::空のラベル(CollectionDescriptor::direct("", "sales", "userId"))]
    fn test_不正な記述子は拒否される(#[case] descriptor: CollectionDescriptor) {
        let result = CollectionRegistry::new(vec![descriptor]);

        assert!(matches!(result, Err(RegistryError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_from_json_strで定義を読み込める() {
        let json = r#"[
            {"name": "Sales", "collection": "sales",
             "reference": {"kind": "direct_field", "field": "userId"}},
            {"name": "Payments", "collection": "payments",
             "reference": {"kind": "or_fields", "fields": ["payerId", "payeeId"]}},
            {"name": "DeviceRegistry", "collection": "devices",
             "reference": {"kind": "embedded_array", "array_field": "usedDevices", "element_field": "userId"}}
        ]"#;

        let registry = CollectionRegistry::from_json_str(json).unwrap();

        assert_eq!(registry.labels(), vec!["Sales", "Payments", "DeviceRegistry"]);
        assert_eq!(registry.embedded().count(), 1);
    }

    #[test]
    fn test_from_json_strは不正なjsonを拒否する() {
        let result = CollectionRegistry::from_json_str(r#"[{"name": "Sales"}]"#);

        assert!(matches!(result, Err(RegistryError::Parse(_))));
    }
}
