//! Chart aggregates: per-table counts grouped by a column, merged into
//! one row per distinct key across both record tables.

use axum::Extension;
use serde_json::{json, Map, Value};
use sqlx::{PgPool, Row};
use std::collections::HashMap;

use crate::database::manager::DatabaseManager;
use crate::database::query_builder::{bind_value, quote_ident};
use crate::database::scope::ScopeFilter;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::types::Dataset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedCount {
    pub key: String,
    pub pendataan: i64,
    pub zkup: i64,
}

/// Merge per-table grouped counts into one row per distinct key.
///
/// Entries are seeded from the pendataan rows in order; keys unique to
/// zkup append afterwards with a zero pendataan count. No key from
/// either side is dropped.
pub fn merge_counts(pendataan: Vec<(String, i64)>, zkup: Vec<(String, i64)>) -> Vec<MergedCount> {
    let mut merged: Vec<MergedCount> = Vec::with_capacity(pendataan.len() + zkup.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for (key, count) in pendataan {
        index.insert(key.clone(), merged.len());
        merged.push(MergedCount {
            key,
            pendataan: count,
            zkup: 0,
        });
    }
    for (key, count) in zkup {
        match index.get(&key) {
            Some(&i) => merged[i].zkup = count,
            None => {
                index.insert(key.clone(), merged.len());
                merged.push(MergedCount {
                    key,
                    pendataan: 0,
                    zkup: count,
                });
            }
        }
    }
    merged
}

fn rows_with_key(key_name: &str, merged: Vec<MergedCount>) -> Vec<Value> {
    merged
        .into_iter()
        .map(|m| {
            let mut row = Map::new();
            row.insert(key_name.to_string(), Value::String(m.key));
            row.insert("pendataan".to_string(), Value::from(m.pendataan));
            row.insert("zkup".to_string(), Value::from(m.zkup));
            Value::Object(row)
        })
        .collect()
}

async fn count_table(pool: &PgPool, table: &str, scope: &ScopeFilter) -> Result<i64, ApiError> {
    let sql = format!(
        "SELECT COUNT(*) AS total FROM {} {}",
        table,
        scope.where_clause()
    );
    let mut query = sqlx::query(&sql);
    for param in scope.params() {
        query = bind_value(query, param);
    }
    let row = query.fetch_one(pool).await?;
    Ok(row.try_get("total")?)
}

/// Per-table grouped counts; NULL group keys collapse to the empty string.
async fn grouped_counts(
    pool: &PgPool,
    table: &str,
    column: &str,
    ordered: bool,
    scope: &ScopeFilter,
) -> Result<Vec<(String, i64)>, ApiError> {
    let col = quote_ident(column);
    let order = if ordered {
        format!(" ORDER BY {}", col)
    } else {
        String::new()
    };
    let sql = format!(
        "SELECT {col}, COUNT(*) AS jumlah FROM {table} {where_clause} GROUP BY {col}{order}",
        col = col,
        table = table,
        where_clause = scope.where_clause(),
        order = order,
    );

    let mut query = sqlx::query(&sql);
    for param in scope.params() {
        query = bind_value(query, param);
    }
    let rows = query.fetch_all(pool).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let key: Option<String> = row.try_get(0)?;
        let count: i64 = row.try_get("jumlah")?;
        out.push((key.unwrap_or_default(), count));
    }
    Ok(out)
}

async fn per_column(
    user: &AuthUser,
    pendataan_col: &str,
    zkup_col: &str,
    key_name: &str,
    ordered: bool,
) -> ApiResult<Vec<Value>> {
    let pool = DatabaseManager::pool().await?;
    let scope = ScopeFilter::for_user(user);

    let (pendataan, zkup) = tokio::try_join!(
        grouped_counts(&pool, Dataset::Pendataan.table(), pendataan_col, ordered, &scope),
        grouped_counts(&pool, Dataset::Zkup.table(), zkup_col, ordered, &scope),
    )?;

    Ok(ApiResponse::success(rows_with_key(
        key_name,
        merge_counts(pendataan, zkup),
    )))
}

/// GET /api/grafik/summary
pub async fn summary(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let scope = ScopeFilter::for_user(&user);

    let (pendataan, zkup) = tokio::try_join!(
        count_table(&pool, Dataset::Pendataan.table(), &scope),
        count_table(&pool, Dataset::Zkup.table(), &scope),
    )?;

    Ok(ApiResponse::success(json!({
        "pendataan": pendataan,
        "zkup": zkup,
        "total": pendataan + zkup,
    })))
}

/// GET /api/grafik/perKabupaten
pub async fn per_kabupaten(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Value>> {
    per_column(&user, "kabupaten", "kabupaten", "kabupaten", false).await
}

/// GET /api/grafik/perTahun - realisation year vs periode, merged on
/// the common `tahun` key, each side ordered ascending.
pub async fn per_tahun(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Value>> {
    per_column(&user, "tahun_realisasi", "periode", "tahun", true).await
}

/// GET /api/grafik/perStatus
pub async fn per_status(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Value>> {
    per_column(&user, "status", "status", "status", false).await
}

/// GET /api/grafik/perPengusul
pub async fn per_pengusul(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Value>> {
    per_column(&user, "pengusul", "pengusul", "pengusul", false).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, i64)]) -> Vec<(String, i64)> {
        pairs.iter().map(|(k, n)| (k.to_string(), *n)).collect()
    }

    #[test]
    fn merge_keeps_every_key_from_both_sides() {
        let merged = merge_counts(
            counts(&[("A", 3), ("B", 1)]),
            counts(&[("B", 2), ("C", 4)]),
        );
        assert_eq!(
            merged,
            vec![
                MergedCount { key: "A".into(), pendataan: 3, zkup: 0 },
                MergedCount { key: "B".into(), pendataan: 1, zkup: 2 },
                MergedCount { key: "C".into(), pendataan: 0, zkup: 4 },
            ]
        );
    }

    #[test]
    fn merge_preserves_first_table_order() {
        let merged = merge_counts(
            counts(&[("Z", 1), ("A", 2)]),
            counts(&[("M", 5)]),
        );
        let keys: Vec<&str> = merged.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["Z", "A", "M"]);
    }

    #[test]
    fn merge_of_empty_sides() {
        assert!(merge_counts(vec![], vec![]).is_empty());
        let merged = merge_counts(vec![], counts(&[("A", 1)]));
        assert_eq!(
            merged,
            vec![MergedCount { key: "A".into(), pendataan: 0, zkup: 1 }]
        );
    }

    #[test]
    fn rows_carry_the_requested_key_name() {
        let rows = rows_with_key(
            "tahun",
            vec![MergedCount { key: "2023".into(), pendataan: 2, zkup: 3 }],
        );
        assert_eq!(rows[0]["tahun"], "2023");
        assert_eq!(rows[0]["pendataan"], 2);
        assert_eq!(rows[0]["zkup"], 3);
    }
}
