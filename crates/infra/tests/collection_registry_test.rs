//! CollectionRegistry 登録漏れ検出テスト
//!
//! `accounting_default` に登録される記述子と期待リストが完全一致することを検証する。
//! DB 接続不要。
//!
//! 実行方法:
//! ```bash
//! cargo test -p ledgerkeep-infra --test collection_registry_test
//! ```

use std::collections::HashSet;

use ledgerkeep_infra::purge::CollectionRegistry;
use pretty_assertions::assert_eq;

#[test]
fn test_期待リストに重複がない() {
    let expected = CollectionRegistry::expected_collection_names();

    assert!(!expected.is_empty(), "期待リストが空です");

    let unique: HashSet<&&str> = expected.iter().collect();
    assert_eq!(
        expected.len(),
        unique.len(),
        "期待リストに重複があります: {:?}",
        expected
    );
}

#[test]
fn test_期待リストとlabelsが順序も含めて一致する() {
    let registry = CollectionRegistry::accounting_default();

    assert_eq!(
        registry.labels(),
        CollectionRegistry::expected_collection_names()
    );
}

#[test]
fn test_期待リストの具体的な内容() {
    let expected: HashSet<&str> = CollectionRegistry::expected_collection_names()
        .into_iter()
        .collect();

    let required = HashSet::from([
        "Sales",
        "Purchases",
        "Inventory",
        "Customers",
        "Suppliers",
        "DeviceRegistry",
    ]);

    let missing: Vec<_> = required.difference(&expected).collect();
    assert!(
        missing.is_empty(),
        "必須コレクションが期待リストにありません: {:?}",
        missing
    );
}

#[test]
fn test_直接参照と埋め込み参照の両方が登録されている() {
    let registry = CollectionRegistry::accounting_default();

    assert!(registry.direct().count() > 0);
    assert!(registry.embedded().count() > 0);
    assert_eq!(
        registry.direct().count() + registry.embedded().count(),
        registry.len()
    );
}

#[test]
fn test_同じコレクションを対象にする記述子がない() {
    let registry = CollectionRegistry::accounting_default();

    let collections: HashSet<&str> = registry
        .descriptors()
        .iter()
        .map(|d| d.collection.as_str())
        .collect();

    assert_eq!(collections.len(), registry.len());
}
