//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! 監査ログとして `jq` で効率的に調査できるよう、ログフィールドの命名規約と
//! ヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## エラーコンテキスト
//!
//! 既存の `tracing::error!` に `error.category` + `error.kind` フィールドを直接追加する。
//! 定数は [`error`] モジュールで提供。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）を使用。tracing の
//! `$($field:ident).+` パターンでサポートされ、JSON 出力でフラットなキーになる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.tenant_id`: テナント ID
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.entity_type`: エンティティ種別（[`event::entity_type`] の定数を使用）
/// - `event.collection`: 対象コレクションのラベル
/// - `event.count`: 件数
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const ACCOUNT: &str = "account";
    }

    /// イベントアクション
    pub mod action {
        pub const PURGE_STARTED: &str = "account.purge_started";
        pub const PURGE_COMPLETED: &str = "account.purge_completed";
        pub const PURGE_CANCELLED: &str = "account.purge_cancelled";
        pub const COLLECTION_PURGED: &str = "collection.purged";
        pub const COLLECTION_PRUNED: &str = "collection.pruned";
        pub const ACCOUNT_RESET: &str = "account.reset";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const COLLECTION: &str = "collection";
        pub const IDENTITY: &str = "identity";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（ドキュメントストア）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// データ不整合（参照値の型不一致など）
        pub const DATA_INTEGRITY: &str = "data_integrity";
        /// 呼び出し元の前提条件違反
        pub const PRECONDITION: &str = "precondition";
    }

    /// エラー種別
    pub mod kind {
        pub const COLLECTION_UNAVAILABLE: &str = "collection_unavailable";
        pub const REFERENCE_TYPE_MISMATCH: &str = "reference_type_mismatch";
        pub const IDENTITY_NOT_FOUND: &str = "identity_not_found";
        pub const INVALID_DESCRIPTOR: &str = "invalid_descriptor";
    }
}
