//! # Ledgerkeep ドメイン層
//!
//! アカウントデータのライフサイクル（削除・リセット）に関するドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - I/O を一切持たない純粋な型と関数のみを置く
//! - ドキュメントストアへのアクセスは infra 層が担当する
//!
//! ## 依存関係の方向
//!
//! ```text
//! apps → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`account_purge`] - 削除対象コレクションの記述子、結果レポート、リセット定義
//! - [`access`] - ロール別のページ権限表
//! - [`document`] - ドキュメントストア上のレコード
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`tenant`] - テナント識別子と参照値の正規化
//!
//! ## 使用例
//!
//! ```rust
//! use ledgerkeep_domain::{
//!     account_purge::{PurgeOutcome, PurgeStage, StageOutcome, aggregate},
//!     tenant::TenantId,
//! };
//!
//! let tenant_id = TenantId::new();
//! let report = aggregate(vec![StageOutcome::new(
//!     PurgeStage::PurgingDirect,
//!     0,
//!     "Sales",
//!     PurgeOutcome::Deleted(3),
//! )]);
//!
//! assert_eq!(report.get("Sales"), Some(&PurgeOutcome::Deleted(3)));
//! # let _ = tenant_id;
//! ```

#[macro_use]
mod macros;

pub mod access;
pub mod account_purge;
pub mod document;
pub mod error;
pub mod tenant;

pub use error::DomainError;
