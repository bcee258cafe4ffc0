//! # account-purge 設定
//!
//! 環境変数から削除対象と実行方法を読み込む。

use std::{env, path::PathBuf};

use ledgerkeep_domain::{
    access::{Role, is_allowed},
    tenant::TenantId,
};
use ledgerkeep_shared::observability::LogFormat;
use thiserror::Error;
use uuid::Uuid;

/// 設定の読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値 {value:?} が不正です: {reason}")]
    Invalid {
        name:   &'static str,
        value:  String,
        reason: &'static str,
    },

    #[error("PURGE_TENANT_ID と PURGE_ACCOUNT_EMAIL はどちらか一方だけを指定してください")]
    AmbiguousTarget,
}

/// アカウント削除の操作を表すページタグ
pub const ACCOUNT_DELETE_PAGE: &str = "account:delete";

/// 削除対象のアカウントの指定方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeTarget {
    /// テナント ID を直接指定
    Tenant(TenantId),
    /// メールアドレスからアカウントを検索
    Email(String),
}

/// account-purge の設定
#[derive(Debug, Clone)]
pub struct PurgeConfig {
    /// データベース接続 URL
    pub database_url:  String,
    /// 削除対象
    pub target:        PurgeTarget,
    /// レジストリ定義（JSON）のパス。未指定なら組み込みの定義
    pub registry_path: Option<PathBuf>,
    /// ステージ内の最大同時実行数（0 は逐次実行）
    pub concurrency:   usize,
    /// 件数の確認のみ行う
    pub dry_run:       bool,
    /// 実行者のロール
    pub operator_role: Option<Role>,
    /// ログ出力形式
    pub log_format:    LogFormat,
}

impl PurgeConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let target = match (get("PURGE_TENANT_ID"), get("PURGE_ACCOUNT_EMAIL")) {
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousTarget),
            (Some(raw), None) => {
                let uuid = Uuid::parse_str(&raw).map_err(|_| ConfigError::Invalid {
                    name:   "PURGE_TENANT_ID",
                    value:  raw.clone(),
                    reason: "UUID ではありません",
                })?;
                PurgeTarget::Tenant(TenantId::from_uuid(uuid))
            }
            (None, Some(email)) => PurgeTarget::Email(email),
            (None, None) => {
                return Err(ConfigError::Missing(
                    "PURGE_TENANT_ID または PURGE_ACCOUNT_EMAIL",
                ));
            }
        };

        let concurrency = match get("PURGE_CONCURRENCY") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name:   "PURGE_CONCURRENCY",
                value:  raw.clone(),
                reason: "0 以上の整数である必要があります",
            })?,
            None => 0,
        };

        let dry_run = match get("PURGE_DRY_RUN") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| ConfigError::Invalid {
                name:   "PURGE_DRY_RUN",
                value:  raw.clone(),
                reason: "true または false である必要があります",
            })?,
            None => false,
        };

        let operator_role = match get("PURGE_OPERATOR_ROLE") {
            Some(raw) => Some(Role::parse(&raw).map_err(|_| ConfigError::Invalid {
                name:   "PURGE_OPERATOR_ROLE",
                value:  raw.clone(),
                reason: "未知のロールです",
            })?),
            None => None,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                name:   "LOG_FORMAT",
                value:  raw.clone(),
                reason: "json または pretty である必要があります",
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            database_url,
            target,
            registry_path: get("PURGE_REGISTRY_PATH").map(PathBuf::from),
            concurrency,
            dry_run,
            operator_role,
            log_format,
        })
    }

    /// 実行者のロールで削除が許可されているか
    ///
    /// ロールが未指定なら呼び出し元で認可済みとして扱う。ドライランは常に許可する。
    pub fn is_authorized(&self) -> bool {
        self.dry_run
            || self
                .operator_role
                .is_none_or(|role| is_allowed(role, ACCOUNT_DELETE_PAGE))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
