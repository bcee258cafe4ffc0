//! # Ledgerkeep インフラ層
//!
//! ドキュメントストアへのアクセスと、テナントデータ削除のオーケストレーションを担当する。
//!
//! ## 設計方針
//!
//! 削除・除去・リセットのロジックはドメイン層の記述子（[`CollectionDescriptor`]）を
//! 解釈する汎用の実行器として実装し、コレクションごとの分岐を書かない。
//! ストアの詳細は [`store::DocumentStore`] トレイトの背後に隠す。
//!
//! ## 依存関係
//!
//! ```text
//! account-purge → infra → domain
//!                   ↓
//!                 shared
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL 接続プールとマイグレーション
//! - [`error`] - インフラ層エラー定義
//! - [`store`] - ドキュメントストアの抽象と実装
//! - [`purge`] - レジストリ、各ステージの実行器、オーケストレーター
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use ledgerkeep_infra::{
//!     db,
//!     purge::{AccountPurgeOrchestrator, CancellationSignal, CollectionRegistry},
//!     store::PostgresDocumentStore,
//! };
//!
//! let pool = db::create_pool("postgres://localhost/ledgerkeep").await?;
//! let store = Arc::new(PostgresDocumentStore::new(pool));
//! let orchestrator = AccountPurgeOrchestrator::new(
//!     store,
//!     CollectionRegistry::accounting_default(),
//!     "users",
//!     AccountResetSpec::accounting_default(),
//! )?;
//! let report = orchestrator.run(&tenant_id, &CancellationSignal::new()).await?;
//! ```
//!
//! [`CollectionDescriptor`]: ledgerkeep_domain::account_purge::CollectionDescriptor

pub mod db;
pub mod error;
pub mod purge;
pub mod store;

pub use error::InfraError;
