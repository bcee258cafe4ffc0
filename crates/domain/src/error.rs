//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## 設計方針
//!
//! - **型による分類**: エラーの種類を列挙型で明示し、パターンマッチで処理可能に
//! - **thiserror 活用**: `#[error(...)]` マクロでエラーメッセージを自動生成
//!
//! ## 使用例
//!
//! ```rust
//! use ledgerkeep_domain::DomainError;
//!
//! fn validate_label(label: &str) -> Result<(), DomainError> {
//!     if label.is_empty() {
//!         return Err(DomainError::Validation("ラベルは必須です".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    ///
    /// # 例
    ///
    /// - 必須フィールドが未入力
    /// - フィールドパスの書式不正
    /// - 未知のロール名
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    ///
    /// `entity_type` にはエンティティの種類（"User", "Collection" など）を指定し、
    /// エラーメッセージを具体的にする。
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validationのメッセージに詳細が含まれる() {
        let error = DomainError::Validation("フィールド名が空です".to_string());
        assert_eq!(error.to_string(), "バリデーションエラー: フィールド名が空です");
    }

    #[test]
    fn test_not_foundのメッセージに種類とidが含まれる() {
        let error = DomainError::NotFound {
            entity_type: "User",
            id:          "u-1".to_string(),
        };
        assert_eq!(error.to_string(), "User が見つかりません: u-1");
    }
}
