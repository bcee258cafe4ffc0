//! # アカウントリセット定義
//!
//! テナント自身のアカウントレコードに対して「削除せずに」適用する変更。
//! セッション・パスワードリセット関連のフィールドを除去し、
//! 一部のフィールドを既定値に戻す。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::descriptor::validate_field_name;
use crate::DomainError;

/// アカウントリセットの宣言的な定義
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountResetSpec {
    /// 完全に除去するフィールド
    #[serde(default)]
    pub clear:    Vec<String>,
    /// 既定値を設定するフィールド
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

impl AccountResetSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// 除去するフィールドを追加する
    pub fn clear(mut self, field: impl Into<String>) -> Self {
        self.clear.push(field.into());
        self
    }

    /// 既定値を設定するフィールドを追加する
    pub fn set_default(mut self, field: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(field.into(), value);
        self
    }

    /// 会計アプリケーションの既定のリセット内容
    ///
    /// - 除去: `token`, `resetPasswordToken`, `resetPasswordExpires`, `activatedLicense`
    /// - 既定値: `isVerified = false`, `joinedOrganizations = []`
    pub fn accounting_default() -> Self {
        Self::new()
            .clear("token")
            .clear("resetPasswordToken")
            .clear("resetPasswordExpires")
            .clear("activatedLicense")
            .set_default("isVerified", json!(false))
            .set_default("joinedOrganizations", json!([]))
    }

    /// 定義の整合性を検証する
    ///
    /// - フィールド名の書式
    /// - 同じフィールドを除去と既定値の両方に指定していない
    pub fn validate(&self) -> Result<(), DomainError> {
        for field in self.clear.iter().chain(self.defaults.keys()) {
            validate_field_name(field).map_err(|reason| {
                DomainError::Validation(format!(
                    "リセット対象のフィールド {field:?} が不正です: {reason}"
                ))
            })?;
        }

        if let Some(field) = self.clear.iter().find(|f| self.defaults.contains_key(*f)) {
            return Err(DomainError::Validation(format!(
                "フィールド {field} が除去と既定値の両方に指定されています"
            )));
        }

        Ok(())
    }

    /// 変更するフィールドが 1 つもないかどうか
    pub fn is_empty(&self) -> bool {
        self.clear.is_empty() && self.defaults.is_empty()
    }
}
