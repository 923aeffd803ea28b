//! Filterable per-table reports plus the combined cross-table listing.

use axum::extract::Query;
use axum::Extension;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Row};

use crate::database::manager::DatabaseManager;
use crate::database::query_builder::{bind_value, bind_value_as};
use crate::database::scope::ScopeFilter;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::types::Dataset;

const REPORT_COLUMNS: &str = "id, nama, nik, telepon, desa, kecamatan, kabupaten, pengusul";

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub kabupaten: Option<String>,
    pub status: Option<String>,
    pub tahun: Option<String>,
    pub periode: Option<String>,
}

async fn report(user: &AuthUser, dataset: Dataset, q: ReportQuery) -> ApiResult<Vec<Value>> {
    let pool = DatabaseManager::pool().await?;

    let period_filter = match dataset {
        Dataset::Pendataan => q.tahun,
        Dataset::Zkup => q.periode,
    };
    let scope = ScopeFilter::for_user(user)
        .and_eq("kabupaten", q.kabupaten)
        .and_eq("status", q.status)
        .and_eq(dataset.period_column(), period_filter);

    let sql = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT {cols}, {period}, status FROM {table} {where_clause}) t \
         ORDER BY t.{period} DESC, t.kabupaten ASC",
        cols = REPORT_COLUMNS,
        period = dataset.period_column(),
        table = dataset.table(),
        where_clause = scope.where_clause(),
    );

    let mut query = sqlx::query(&sql);
    for param in scope.params() {
        query = bind_value(query, param);
    }
    let rows = query.fetch_all(&pool).await?;
    let data: Vec<Value> = rows
        .iter()
        .filter_map(|r| r.try_get::<Value, _>("row").ok())
        .collect();
    let total = data.len();

    Ok(ApiResponse::success(data)
        .with_source(dataset.source_name())
        .with_total(total))
}

/// GET /api/laporan/pendataan
pub async fn pendataan(
    Extension(user): Extension<AuthUser>,
    Query(q): Query<ReportQuery>,
) -> ApiResult<Vec<Value>> {
    report(&user, Dataset::Pendataan, q).await
}

/// GET /api/laporan/zkup
pub async fn zkup(
    Extension(user): Extension<AuthUser>,
    Query(q): Query<ReportQuery>,
) -> ApiResult<Vec<Value>> {
    report(&user, Dataset::Zkup, q).await
}

/// Row of the combined report; the period of both tables is aliased to
/// `periode` and the originating table is tagged in `sumber`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CombinedRow {
    pub sumber: String,
    pub id: String,
    pub nama: Option<String>,
    pub nik: Option<String>,
    pub telepon: Option<String>,
    pub desa: Option<String>,
    pub kecamatan: Option<String>,
    pub kabupaten: Option<String>,
    pub pengusul: Option<String>,
    pub periode: Option<String>,
    pub status: Option<String>,
}

async fn combined_rows(
    pool: &PgPool,
    dataset: Dataset,
    scope: &ScopeFilter,
) -> Result<Vec<CombinedRow>, ApiError> {
    let sql = format!(
        "SELECT '{label}' AS sumber, {cols}, {period} AS periode, status FROM {table} {where_clause} \
         ORDER BY {period} DESC",
        label = dataset.sumber_label(),
        cols = REPORT_COLUMNS,
        period = dataset.period_column(),
        table = dataset.table(),
        where_clause = scope.where_clause(),
    );

    let mut query = sqlx::query_as::<_, CombinedRow>(&sql);
    for param in scope.params() {
        query = bind_value_as(query, param);
    }
    Ok(query.fetch_all(pool).await?)
}

/// GET /api/laporan/combined
pub async fn combined(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<CombinedRow>> {
    let pool = DatabaseManager::pool().await?;
    let scope = ScopeFilter::for_user(&user);

    let (mut rows, zkup_rows) = tokio::try_join!(
        combined_rows(&pool, Dataset::Pendataan, &scope),
        combined_rows(&pool, Dataset::Zkup, &scope),
    )?;
    rows.extend(zkup_rows);

    // TODO: period strings compare lexicographically here; switch to a
    // numeric sort once the period values are normalized to plain years.
    sort_by_period_desc(&mut rows);
    let total = rows.len();

    Ok(ApiResponse::success(rows).with_total(total))
}

fn sort_by_period_desc(rows: &mut [CombinedRow]) {
    rows.sort_by(|a, b| {
        b.periode
            .as_deref()
            .unwrap_or("")
            .cmp(a.periode.as_deref().unwrap_or(""))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sumber: &str, id: &str, periode: Option<&str>) -> CombinedRow {
        CombinedRow {
            sumber: sumber.to_string(),
            id: id.to_string(),
            nama: None,
            nik: None,
            telepon: None,
            desa: None,
            kecamatan: None,
            kabupaten: None,
            pengusul: None,
            periode: periode.map(str::to_string),
            status: None,
        }
    }

    #[test]
    fn combined_sort_is_descending_by_period_string() {
        let mut rows = vec![
            row("Pendataan", "1", Some("2022")),
            row("ZKUP", "2", Some("2024")),
            row("Pendataan", "3", Some("2023")),
        ];
        sort_by_period_desc(&mut rows);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[test]
    fn missing_periods_sort_last() {
        let mut rows = vec![
            row("ZKUP", "1", None),
            row("Pendataan", "2", Some("2020")),
        ];
        sort_by_period_desc(&mut rows);
        assert_eq!(rows[0].id, "2");
        assert_eq!(rows[1].id, "1");
    }
}
