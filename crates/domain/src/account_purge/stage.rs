//! # オーケストレーターの状態遷移
//!
//! ```text
//! Initialized → PurgingDirect → PurgingEmbedded → Resetting → Completed
//!                     │                 │
//!                     └──────┬──────────┘
//!                            ↓
//!                        Cancelled
//! ```
//!
//! リトライ状態は存在しない。失敗したコレクションは実行中ずっと失敗のままで、
//! 回復手段はオーケストレーター全体の再実行のみ。

use serde::Serialize;
use strum::Display;

use super::CountMeaning;
use crate::DomainError;

/// オーケストレーターの実行段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PurgeStage {
    Initialized,
    PurgingDirect,
    PurgingEmbedded,
    Resetting,
    Completed,
    Cancelled,
}

impl PurgeStage {
    /// 通常の次の段階（終端では `None`）
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Initialized => Some(Self::PurgingDirect),
            Self::PurgingDirect => Some(Self::PurgingEmbedded),
            Self::PurgingEmbedded => Some(Self::Resetting),
            Self::Resetting => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }

    /// 指定の段階へ遷移する
    ///
    /// 許可されるのは [`next`](Self::next) と、削除中の段階からの `Cancelled` のみ。
    pub fn transition(self, to: Self) -> Result<Self, DomainError> {
        let allowed = self.next() == Some(to)
            || (to == Self::Cancelled
                && matches!(self, Self::PurgingDirect | Self::PurgingEmbedded));
        if allowed {
            Ok(to)
        } else {
            Err(DomainError::Validation(format!(
                "不正な状態遷移です: {self} → {to}"
            )))
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// この段階で記録される件数の意味
    ///
    /// 結果を記録しない段階では `None`。
    pub fn count_meaning(self) -> Option<CountMeaning> {
        match self {
            Self::PurgingDirect => Some(CountMeaning::DocumentsDeleted),
            Self::PurgingEmbedded => Some(CountMeaning::ParentsUpdated),
            Self::Resetting => Some(CountMeaning::IdentityModified),
            Self::Initialized | Self::Completed | Self::Cancelled => None,
        }
    }
}
