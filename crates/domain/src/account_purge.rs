//! # アカウントデータ削除のドメインモデル
//!
//! テナント（アカウント）退会・初期化時に、独立した複数のコレクションから
//! テナントのデータを削除し、アカウントレコードをリセットするための型を定義する。
//!
//! ## 概要
//!
//! - [`CollectionDescriptor`]: どのコレクションのどのフィールドがテナントを参照するか
//! - [`PurgeOutcome`]: コレクション単位の結果（件数 or エラー）
//! - [`PurgeReport`] / [`aggregate`]: 結果の順序付き集約
//! - [`AccountResetSpec`]: アカウントレコードに適用するリセット内容
//! - [`PurgeStage`]: オーケストレーターの状態遷移
//!
//! 実際の削除処理（ドキュメントストアへの I/O）は infra 層が担当する。

mod descriptor;
mod outcome;
mod report;
mod reset_spec;
mod stage;

pub use descriptor::{CollectionDescriptor, ReferenceKind, validate_field_name};
pub use outcome::{CountMeaning, PurgeOutcome};
pub use report::{ACCOUNT_RESET_LABEL, PurgeReport, ReportEntry, StageOutcome, aggregate};
pub use reset_spec::AccountResetSpec;
pub use stage::PurgeStage;
