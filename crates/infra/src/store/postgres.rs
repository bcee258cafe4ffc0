//! # PostgreSQL DocumentStore
//!
//! `documents(collection, id, body JSONB)` テーブル 1 つにすべてのコレクションを保持する。
//!
//! ## 検索条件の変換
//!
//! [`Filter`] の値の一致は JSONB の包含演算子 `@>` に変換し、値はすべてバインド
//! パラメータで渡す。GIN インデックス（`jsonb_path_ops`）が効く形になる。
//!
//! | Filter | SQL |
//! |--------|-----|
//! | `Eq { field, value }` | `body @> {"field": value}` |
//! | `ArrayNotEmpty { a }` | `jsonb_typeof(body -> 'a') = 'array' AND body -> 'a' <> '[]'` |
//! | `Any([..])` | `(.. OR ..)`、空なら `FALSE` |
//! | `Id(id)` | `id = $n` |

use async_trait::async_trait;
use ledgerkeep_domain::document::{Document, DocumentId};
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{DocumentStore, FieldUpdate, Filter, UpdateResult};
use crate::error::InfraError;

/// PostgreSQL 実装の DocumentStore
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `collection = $n AND (<filter>)` を追加する
fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, collection: &str, filter: &Filter) {
    builder.push("collection = ");
    builder.push_bind(collection.to_string());
    builder.push(" AND ");
    push_filter(builder, filter);
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::Eq { field, value } => {
            builder.push("body @> ");
            builder.push_bind(single_field(field, value.clone()));
        }
        Filter::ArrayNotEmpty { array_field } => {
            builder.push("(jsonb_typeof(body -> ");
            builder.push_bind(array_field.clone());
            builder.push(") = 'array' AND body -> ");
            builder.push_bind(array_field.clone());
            builder.push(" <> '[]'::jsonb)");
        }
        Filter::Any(filters) if filters.is_empty() => {
            builder.push("FALSE");
        }
        Filter::Any(filters) => {
            builder.push("(");
            for (i, inner) in filters.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                push_filter(builder, inner);
            }
            builder.push(")");
        }
        Filter::Id(id) => {
            builder.push("id = ");
            builder.push_bind(*id.as_uuid());
        }
    }
}

fn single_field(field: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(field.to_string(), value);
    Value::Object(object)
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn ping(&self) -> Result<(), InfraError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body
            "#,
        )
        .bind(collection)
        .bind(*document.id.as_uuid())
        .bind(Value::Object(document.body))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, InfraError> {
        let mut builder = QueryBuilder::new("DELETE FROM documents WHERE ");
        push_scope(&mut builder, collection, filter);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, InfraError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM documents WHERE ");
        push_scope(&mut builder, collection, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(to_count(count))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, InfraError> {
        let mut builder = QueryBuilder::new("SELECT id, body FROM documents WHERE ");
        push_scope(&mut builder, collection, filter);
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| {
                let id: Uuid = row.try_get("id")?;
                let body: Value = row.try_get("body")?;
                Document::from_value(DocumentId::from_uuid(id), body).ok_or_else(|| {
                    InfraError::unexpected(format!(
                        "{collection}/{id} の本体が JSON オブジェクトではありません"
                    ))
                })
            })
            .collect()
    }

    async fn replace_field(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        value: Value,
    ) -> Result<bool, InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = jsonb_set(body, ARRAY[$1::text], $2, true)
            WHERE collection = $3 AND id = $4
            "#,
        )
        .bind(field)
        .bind(value)
        .bind(collection)
        .bind(*id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &FieldUpdate,
    ) -> Result<UpdateResult, InfraError> {
        let set = Value::Object(update.set.clone());

        // 一致件数と変更件数を 1 文で求める。
        // 内容が変わらない行は target に含まれるが changed には含まれない。
        let mut builder = QueryBuilder::new("WITH target AS (SELECT id FROM documents WHERE ");
        push_scope(&mut builder, collection, filter);
        builder.push("), changed AS (UPDATE documents AS d SET body = (d.body - ");
        builder.push_bind(update.unset.clone());
        builder.push("::text[]) || ");
        builder.push_bind(set.clone());
        builder.push(" FROM target WHERE d.collection = ");
        builder.push_bind(collection.to_string());
        builder.push(" AND d.id = target.id AND d.body IS DISTINCT FROM ((d.body - ");
        builder.push_bind(update.unset.clone());
        builder.push("::text[]) || ");
        builder.push_bind(set);
        builder.push(
            ") RETURNING d.id) \
             SELECT (SELECT COUNT(*) FROM target) AS matched, \
             (SELECT COUNT(*) FROM changed) AS modified",
        );

        let row = builder.build().fetch_one(&self.pool).await?;
        let matched: i64 = row.try_get("matched")?;
        let modified: i64 = row.try_get("modified")?;

        Ok(UpdateResult {
            matched:  to_count(matched),
            modified: to_count(modified),
        })
    }
}
