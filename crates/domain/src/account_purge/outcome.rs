//! # コレクション単位の結果

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// 1 コレクション（または 1 ステップ）の処理結果
///
/// JSON では `{"deleted": 3}` / `{"failed": "..."}` として出力され、
/// 値を解析しなくても成功と失敗を区別できる。
///
/// `Deleted` の件数が何を数えたものかはステージによって異なる。
/// [`CountMeaning`] を参照。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeOutcome {
    /// 成功（件数。0 件も成功）
    Deleted(u64),
    /// 失敗（エラーメッセージ）
    Failed(String),
}

impl PurgeOutcome {
    /// エラーから失敗結果を作成する
    pub fn failed(error: impl Display) -> Self {
        Self::Failed(error.to_string())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// 成功時の件数
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Deleted(count) => Some(*count),
            Self::Failed(_) => None,
        }
    }
}

/// `Deleted` の件数が数えているもの
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMeaning {
    /// 削除したドキュメント数（直接参照コレクション）
    DocumentsDeleted,
    /// 更新した親ドキュメント数（埋め込み配列。除去した要素数ではない）
    ParentsUpdated,
    /// 変更したアカウントレコード数（0 または 1）
    IdentityModified,
}
