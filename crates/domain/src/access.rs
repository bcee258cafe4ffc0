//! # ロール別のページ権限表
//!
//! ロールごとに許可リストと拒否リストを持つ静的な表。
//! 判定は集合の包含チェックのみで、動的なディスパッチは行わない。
//!
//! ## 判定ルール
//!
//! | 条件 | 結果 |
//! |------|------|
//! | 拒否リストに含まれる | false（許可より優先） |
//! | 許可リストに `*` がある | true |
//! | 許可リストに含まれる | true |
//! | それ以外 | false |
//!
//! ```rust
//! use ledgerkeep_domain::access::{Role, is_allowed};
//!
//! assert!(is_allowed(Role::Accountant, "reports"));
//! assert!(!is_allowed(Role::Admin, "account:delete"));
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::DomainError;

/// すべてのページを表す許可リストのワイルドカード
pub const ALL_PAGES: &str = "*";

/// ユーザーのロール
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Accountant,
    Salesperson,
    Viewer,
}

impl Role {
    /// 文字列からロールを取得する
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        Self::from_str(value.trim())
            .map_err(|_| DomainError::Validation(format!("未知のロールです: {value}")))
    }
}

/// 1 ロール分の許可リストと拒否リスト
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePermissions {
    pub allow: &'static [&'static str],
    pub deny:  &'static [&'static str],
}

impl PagePermissions {
    pub fn allows(&self, page: &str) -> bool {
        if self.deny.contains(&page) {
            return false;
        }
        self.allow.contains(&ALL_PAGES) || self.allow.contains(&page)
    }
}

const OWNER: PagePermissions = PagePermissions {
    allow: &[ALL_PAGES],
    deny:  &[],
};

const ADMIN: PagePermissions = PagePermissions {
    allow: &[ALL_PAGES],
    deny:  &["account:delete", "billing"],
};

const ACCOUNTANT: PagePermissions = PagePermissions {
    allow: &[
        "dashboard",
        "sales",
        "purchases",
        "expenses",
        "payments",
        "inventory",
        "reports",
    ],
    deny:  &["users", "roles", "settings", "account:delete", "billing"],
};

const SALESPERSON: PagePermissions = PagePermissions {
    allow: &["dashboard", "sales", "customers", "inventory"],
    deny:  &["purchases", "reports", "users", "roles", "settings", "account:delete"],
};

const VIEWER: PagePermissions = PagePermissions {
    allow: &["dashboard", "reports"],
    deny:  &["users", "roles", "settings", "account:delete", "billing"],
};

/// ロールに対応する権限表
pub fn permissions_for(role: Role) -> &'static PagePermissions {
    match role {
        Role::Owner => &OWNER,
        Role::Admin => &ADMIN,
        Role::Accountant => &ACCOUNTANT,
        Role::Salesperson => &SALESPERSON,
        Role::Viewer => &VIEWER,
    }
}

/// ロールがページ（操作）にアクセスできるか判定する
pub fn is_allowed(role: Role, page: &str) -> bool {
    permissions_for(role).allows(page)
}
