//! # テナント
//!
//! データ削除・リセットの対象となるアカウント（テナント）の識別子。
//!
//! ## 設計判断
//!
//! ### Newtype パターンの採用
//!
//! `TenantId` は `Uuid` をラップした Newtype である。オーケストレーターは
//! この値を呼び出し元から受け取るだけで、生成・検証は行わない。
//!
//! ### 参照値の正規化
//!
//! 埋め込み配列の要素に格納された参照値は、同じテナントを指していても
//! 表現が異なることがある（大文字/小文字の混在、ハイフンの有無、波括弧、
//! 前後の空白）。文字列のままでは比較せず、必ず [`TenantId::matches_reference`]
//! で UUID に戻してから比較する。
//!
//! ```rust
//! use ledgerkeep_domain::tenant::TenantId;
//! use serde_json::json;
//! use uuid::Uuid;
//!
//! let uuid = Uuid::parse_str("0190a3c4-5b6d-7e8f-9a0b-1c2d3e4f5a6b").unwrap();
//! let tenant_id = TenantId::from_uuid(uuid);
//!
//! assert!(tenant_id.matches_reference(&json!("0190A3C45B6D7E8F9A0B1C2D3E4F5A6B")).unwrap());
//! ```

use serde_json::Value;
use thiserror::Error;

define_uuid_id! {
    /// テナント（アカウント）の一意識別子
    ///
    /// 削除対象データの所属先を識別する。値は不変で、
    /// オーケストレーターの実行中に変化することはない。
    pub struct TenantId;
}

/// 参照値をテナント ID と比較できなかった
///
/// 要素の参照フィールドに値はあるが、UUID として解釈できない場合に返す。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceMismatch {
    /// 文字列だが UUID として解釈できない
    #[error("UUID として解釈できない参照値: {0:?}")]
    Unparseable(String),

    /// 文字列以外の型
    #[error("比較できない参照値の型: {0}")]
    UnsupportedType(&'static str),
}

impl TenantId {
    /// 正規表現（ハイフン付き小文字）の文字列を返す
    ///
    /// 直接参照フィールドへの書き込み・検索にはこの表現を使う。
    pub fn canonical(&self) -> String {
        self.as_uuid().hyphenated().to_string()
    }

    /// 参照値がこのテナントを指しているか判定する
    ///
    /// - `null` は一致しない（`Ok(false)`）
    /// - 文字列は前後の空白を除いて UUID として解釈し、値で比較する
    ///   （`uuid` クレートが受け付ける表現はすべて一致しうる）
    /// - それ以外の型、解釈できない文字列は [`ReferenceMismatch`]
    pub fn matches_reference(&self, value: &Value) -> Result<bool, ReferenceMismatch> {
        match value {
            Value::Null => Ok(false),
            Value::String(raw) => uuid::Uuid::parse_str(raw.trim())
                .map(|parsed| parsed == *self.as_uuid())
                .map_err(|_| ReferenceMismatch::Unparseable(raw.clone())),
            Value::Bool(_) => Err(ReferenceMismatch::UnsupportedType("bool")),
            Value::Number(_) => Err(ReferenceMismatch::UnsupportedType("number")),
            Value::Array(_) => Err(ReferenceMismatch::UnsupportedType("array")),
            Value::Object(_) => Err(ReferenceMismatch::UnsupportedType("object")),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn fixed_tenant() -> TenantId {
        TenantId::from_uuid(Uuid::parse_str("0190a3c4-5b6d-7e8f-9a0b-1c2d3e4f5a6b").unwrap())
    }

    #[test]
    fn test_canonicalはハイフン付き小文字を返す() {
        assert_eq!(
            fixed_tenant().canonical(),
            "0190a3c4-5b6d-7e8f-9a0b-1c2d3e4f5a6b"
        );
    }

    #[rstest]
    #[case(json!("0190a3c4-5b6d-7e8f-9a0b-1c2d3e4f5a6b"))]
    #[case(json!("0190A3C4-5B6D-7E8F-9A0B-1C2D3E4F5A6B"))]
    #[case(json!("0190a3c45b6d7e8f9a0b1c2d3e4f5a6b"))]
    #[case(json!("  0190a3c4-5b6d-7e8f-9a0b-1c2d3e4f5a6b "))]
    #[case(json!("{0190a3c4-5b6d-7e8f-9a0b-1c2d3e4f5a6b}"))]
    #[case(json!("0190A3c4-5b6D-7E8f-9a0B-1c2D3e4F5a6B"))]
    #[case(json!("urn:uuid:0190a3c4-5b6d-7e8f-9a0b-1c2d3e4f5a6b"))]
    fn test_matches_referenceは表現が異なっても同じuuidなら一致する(#[case] value: Value) {
        assert_eq!(fixed_tenant().matches_reference(&value), Ok(true));
    }

    #[test]
    fn test_matches_referenceは別テナントのuuidで一致しない() {
        let other = json!(TenantId::new().canonical());
        assert_eq!(fixed_tenant().matches_reference(&other), Ok(false));
    }

    #[test]
    fn test_matches_referenceはnullで一致しない() {
        assert_eq!(fixed_tenant().matches_reference(&Value::Null), Ok(false));
    }

    #[test]
    fn test_matches_referenceは解釈できない文字列でエラーを返す() {
        assert_eq!(
            fixed_tenant().matches_reference(&json!("not-a-uuid")),
            Err(ReferenceMismatch::Unparseable("not-a-uuid".to_string()))
        );
    }

    #[rstest]
    #[case(json!(42), "number")]
    #[case(json!(true), "bool")]
    #[case(json!({"id": "x"}), "object")]
    #[case(json!(["x"]), "array")]
    fn test_matches_referenceは文字列以外の型でエラーを返す(
        #[case] value: Value,
        #[case] type_name: &'static str,
    ) {
        assert_eq!(
            fixed_tenant().matches_reference(&value),
            Err(ReferenceMismatch::UnsupportedType(type_name))
        );
    }

    #[test]
    fn test_displayはハイフン付き小文字を出力する() {
        assert_eq!(fixed_tenant().to_string(), fixed_tenant().canonical());
    }
}
