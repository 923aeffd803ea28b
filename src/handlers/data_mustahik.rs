//! Read-only mustahik listing: a fixed projection of the record tables.

use axum::Extension;
use serde_json::Value;
use sqlx::Row;

use crate::database::manager::DatabaseManager;
use crate::database::query_builder::bind_value;
use crate::database::scope::ScopeFilter;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::types::Dataset;

const MUSTAHIK_COLUMNS: &str = "id, nama, nik, telepon, desa, kecamatan, kabupaten, pengusul";

async fn listing(user: &AuthUser, dataset: Dataset) -> ApiResult<Vec<Value>> {
    let pool = DatabaseManager::pool().await?;
    let scope = ScopeFilter::for_user(user);
    let sql = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT {} FROM {} {}) t",
        MUSTAHIK_COLUMNS,
        dataset.table(),
        scope.where_clause()
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

    Ok(ApiResponse::success(data))
}

pub async fn pendataan(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Value>> {
    listing(&user, Dataset::Pendataan).await
}

pub async fn zkup(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Value>> {
    listing(&user, Dataset::Zkup).await
}
