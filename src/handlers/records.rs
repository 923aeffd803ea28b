//! CRUD over the two record tables. Both datasets share one engine;
//! per-table differences live in [`Dataset`].

use axum::extract::Path;
use axum::{Extension, Json};
use rand::Rng;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

use crate::database::manager::DatabaseManager;
use crate::database::query_builder::{bind_value, build_insert, build_update};
use crate::database::scope::ScopeFilter;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::types::{Dataset, Status};

/// Upper bound on id sampling. 9000 possible ids keep collisions rare
/// at realistic table sizes; the cap only stops a pathological loop.
const MAX_ID_ATTEMPTS: usize = 100;

pub fn random_record_id() -> String {
    rand::rng().random_range(1000..10_000).to_string()
}

/// Sample 4-digit ids until one is unused in the dataset's table.
///
/// Two concurrent creators can still pass this check with the same
/// candidate; the table's primary key turns that race into a retryable
/// conflict at insert time.
async fn generate_record_id(pool: &PgPool, dataset: Dataset) -> Result<String, ApiError> {
    let sql = format!("SELECT id FROM {} WHERE id = $1", dataset.table());
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = random_record_id();
        let taken = sqlx::query(&sql).bind(&candidate).fetch_optional(pool).await?;
        if taken.is_none() {
            return Ok(candidate);
        }
    }
    Err(ApiError::exhausted_id_space(format!(
        "no free 4-digit id in {} after {} attempts",
        dataset.table(),
        MAX_ID_ATTEMPTS
    )))
}

/// Fetch one record as a JSON object, or None when the id is absent.
async fn fetch_record(
    pool: &PgPool,
    dataset: Dataset,
    id: &str,
) -> Result<Option<Map<String, Value>>, ApiError> {
    let sql = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT * FROM {} WHERE id = $1) t",
        dataset.table()
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row
        .and_then(|r| r.try_get::<Value, _>("row").ok())
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        }))
}

fn record_pengusul(record: &Map<String, Value>) -> Option<&str> {
    record.get("pengusul").and_then(Value::as_str)
}

/// Prepare a create payload: reject empty bodies, discard the
/// server-owned fields, then force pengusul and status from the claim.
fn sanitize_create(user: &AuthUser, body: Value) -> Result<Map<String, Value>, ApiError> {
    let mut fields = match body {
        Value::Object(map) if !map.is_empty() => map,
        _ => return Err(ApiError::bad_request("empty payload")),
    };
    fields.remove("id");
    fields.remove("created_at");
    fields.insert(
        "pengusul".to_string(),
        user.pengusul
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    fields.insert(
        "status".to_string(),
        Value::String(Status::Menunggu.as_str().to_string()),
    );
    Ok(fields)
}

/// Prepare an update payload. pengusul is immutable for non-admins.
fn sanitize_update(user: &AuthUser, body: Value) -> Result<Map<String, Value>, ApiError> {
    let mut fields = match body {
        Value::Object(map) => map,
        _ => return Err(ApiError::bad_request("invalid payload")),
    };
    fields.remove("id");
    fields.remove("created_at");
    if !user.is_admin() {
        fields.remove("pengusul");
    }
    if fields.is_empty() {
        return Err(ApiError::bad_request("no fields to update"));
    }
    Ok(fields)
}

async fn list(user: &AuthUser, dataset: Dataset) -> ApiResult<Vec<Value>> {
    let pool = DatabaseManager::pool().await?;
    let scope = ScopeFilter::for_user(user);
    let sql = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT * FROM {} {}) t ORDER BY t.created_at DESC",
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

    Ok(ApiResponse::success(data).no_store())
}

async fn get_by_id(user: &AuthUser, dataset: Dataset, id: &str) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    // Existence is checked before ownership: a foreign id is 403, not 404
    let record = fetch_record(&pool, dataset, id)
        .await?
        .ok_or_else(|| ApiError::not_found("record not found"))?;
    if !user.owns(record_pengusul(&record)) {
        return Err(ApiError::forbidden("access denied"));
    }

    Ok(ApiResponse::success(Value::Object(record)))
}

async fn create(user: &AuthUser, dataset: Dataset, body: Value) -> ApiResult<Value> {
    let mut fields = sanitize_create(user, body)?;

    let pool = DatabaseManager::pool().await?;
    let id = generate_record_id(&pool, dataset).await?;
    fields.insert("id".to_string(), Value::String(id));

    let (sql, params) = build_insert(dataset.table(), &fields)?;
    let mut query = sqlx::query(&sql);
    for param in &params {
        query = bind_value(query, param);
    }
    query.execute(&pool).await?;

    Ok(ApiResponse::created(Value::Object(fields)))
}

async fn update(user: &AuthUser, dataset: Dataset, id: &str, body: Value) -> ApiResult<Value> {
    let mut fields = sanitize_update(user, body)?;

    let pool = DatabaseManager::pool().await?;
    let record = fetch_record(&pool, dataset, id)
        .await?
        .ok_or_else(|| ApiError::not_found("record not found"))?;
    if !user.owns(record_pengusul(&record)) {
        return Err(ApiError::forbidden("access denied"));
    }

    let (sql, params) = build_update(dataset.table(), &fields, Value::String(id.to_string()))?;
    let mut query = sqlx::query(&sql);
    for param in &params {
        query = bind_value(query, param);
    }
    query.execute(&pool).await?;

    // Merged view: the fields this update touched, plus the id
    fields.insert("id".to_string(), Value::String(id.to_string()));
    Ok(ApiResponse::success(Value::Object(fields)))
}

async fn delete(user: &AuthUser, dataset: Dataset, id: &str) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let record = fetch_record(&pool, dataset, id)
        .await?
        .ok_or_else(|| ApiError::not_found("record not found"))?;
    if !user.owns(record_pengusul(&record)) {
        return Err(ApiError::forbidden("access denied"));
    }

    let sql = format!("DELETE FROM {} WHERE id = $1", dataset.table());
    sqlx::query(&sql).bind(id).execute(&pool).await?;

    Ok(ApiResponse::success(Value::Null))
}

pub mod pendataan {
    use super::*;

    pub async fn list(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Value>> {
        super::list(&user, Dataset::Pendataan).await
    }

    pub async fn get(
        Extension(user): Extension<AuthUser>,
        Path(id): Path<String>,
    ) -> ApiResult<Value> {
        super::get_by_id(&user, Dataset::Pendataan, &id).await
    }

    pub async fn create(
        Extension(user): Extension<AuthUser>,
        Json(body): Json<Value>,
    ) -> ApiResult<Value> {
        super::create(&user, Dataset::Pendataan, body).await
    }

    pub async fn update(
        Extension(user): Extension<AuthUser>,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> ApiResult<Value> {
        super::update(&user, Dataset::Pendataan, &id, body).await
    }

    pub async fn delete(
        Extension(user): Extension<AuthUser>,
        Path(id): Path<String>,
    ) -> ApiResult<Value> {
        super::delete(&user, Dataset::Pendataan, &id).await
    }
}

pub mod zkup {
    use super::*;

    pub async fn list(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Value>> {
        super::list(&user, Dataset::Zkup).await
    }

    pub async fn get(
        Extension(user): Extension<AuthUser>,
        Path(id): Path<String>,
    ) -> ApiResult<Value> {
        super::get_by_id(&user, Dataset::Zkup, &id).await
    }

    pub async fn create(
        Extension(user): Extension<AuthUser>,
        Json(body): Json<Value>,
    ) -> ApiResult<Value> {
        super::create(&user, Dataset::Zkup, body).await
    }

    pub async fn update(
        Extension(user): Extension<AuthUser>,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> ApiResult<Value> {
        super::update(&user, Dataset::Zkup, &id, body).await
    }

    pub async fn delete(
        Extension(user): Extension<AuthUser>,
        Path(id): Path<String>,
    ) -> ApiResult<Value> {
        super::delete(&user, Dataset::Zkup, &id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use serde_json::json;

    fn caller(role: Role, pengusul: Option<&str>) -> AuthUser {
        AuthUser {
            id: 1,
            role,
            pengusul: pengusul.map(str::to_string),
        }
    }

    #[test]
    fn generated_ids_are_four_digits() {
        for _ in 0..200 {
            let id = random_record_id();
            assert_eq!(id.len(), 4);
            let n: u32 = id.parse().unwrap();
            assert!((1000..10_000).contains(&n));
        }
    }

    #[test]
    fn create_forces_pengusul_and_status() {
        let user = caller(Role::User, Some("P1"));
        let body = json!({
            "nama": "X",
            "pengusul": "someone-else",
            "status": "Disetujui",
            "id": "9999",
        });
        let fields = sanitize_create(&user, body).unwrap();
        assert_eq!(fields["pengusul"], json!("P1"));
        assert_eq!(fields["status"], json!("Menunggu"));
        assert!(fields.get("id").is_none());
        assert_eq!(fields["nama"], json!("X"));
    }

    #[test]
    fn create_rejects_empty_payload() {
        let user = caller(Role::User, Some("P1"));
        assert!(sanitize_create(&user, json!({})).is_err());
        assert!(sanitize_create(&user, json!(null)).is_err());
        assert!(sanitize_create(&user, json!([1])).is_err());
    }

    #[test]
    fn create_without_claim_pengusul_stores_null() {
        let user = caller(Role::Admin, None);
        let fields = sanitize_create(&user, json!({"nama": "X"})).unwrap();
        assert_eq!(fields["pengusul"], Value::Null);
    }

    #[test]
    fn update_strips_pengusul_for_non_admin() {
        let user = caller(Role::User, Some("P1"));
        let fields =
            sanitize_update(&user, json!({"nama": "Y", "pengusul": "P2"})).unwrap();
        assert!(fields.get("pengusul").is_none());
        assert_eq!(fields["nama"], json!("Y"));
    }

    #[test]
    fn update_keeps_pengusul_for_admin() {
        let user = caller(Role::Admin, None);
        let fields = sanitize_update(&user, json!({"pengusul": "P2"})).unwrap();
        assert_eq!(fields["pengusul"], json!("P2"));
    }

    #[test]
    fn update_rejects_payload_with_nothing_left() {
        let user = caller(Role::User, Some("P1"));
        assert!(sanitize_update(&user, json!({})).is_err());
        assert!(sanitize_update(&user, json!({"id": "1234", "pengusul": "P2"})).is_err());
    }

    #[test]
    fn record_pengusul_reads_string_only() {
        let mut record = Map::new();
        record.insert("pengusul".to_string(), json!("P1"));
        assert_eq!(record_pengusul(&record), Some("P1"));
        record.insert("pengusul".to_string(), Value::Null);
        assert_eq!(record_pengusul(&record), None);
    }
}
