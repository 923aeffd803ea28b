//! Approval workflow: the pending queue and bulk status transitions.

use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};

use crate::database::manager::DatabaseManager;
use crate::database::query_builder::{bind_value_as, in_placeholders};
use crate::database::scope::ScopeFilter;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::types::{Dataset, Status};

/// Row of the pending queue; period aliased to `tahun`, origin table
/// tagged in `sumber`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingRow {
    pub id: String,
    pub nama: Option<String>,
    pub nik: Option<String>,
    pub kabupaten: Option<String>,
    pub pengusul: Option<String>,
    pub status: String,
    pub tahun: Option<String>,
    pub sumber: String,
    pub created_at: DateTime<Utc>,
}

async fn pending_rows(
    pool: &PgPool,
    dataset: Dataset,
    scope: &ScopeFilter,
) -> Result<Vec<PendingRow>, ApiError> {
    let sql = format!(
        "SELECT id, nama, nik, kabupaten, pengusul, status, {period} AS tahun, \
         '{label}' AS sumber, created_at FROM {table} {where_clause}",
        period = dataset.period_column(),
        label = dataset.source_name(),
        table = dataset.table(),
        where_clause = scope.where_clause(),
    );

    let mut query = sqlx::query_as::<_, PendingRow>(&sql);
    for param in scope.params() {
        query = bind_value_as(query, param);
    }
    Ok(query.fetch_all(pool).await?)
}

/// GET /api/verifikasi/menunggu - all rows still waiting for a
/// decision, across both tables, newest first.
pub async fn menunggu(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<PendingRow>> {
    let pool = DatabaseManager::pool().await?;
    let scope =
        ScopeFilter::for_user(&user).and_eq("status", Some(Status::Menunggu.as_str()));

    let (mut rows, zkup_rows) = tokio::try_join!(
        pending_rows(&pool, Dataset::Pendataan, &scope),
        pending_rows(&pool, Dataset::Zkup, &scope),
    )?;
    rows.extend(zkup_rows);
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = rows.len();

    Ok(ApiResponse::success(rows).with_total(total))
}

/// One transition request: which table, which ids, which new status.
/// The legacy single-record form used `id`; both spellings are accepted.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateGroup {
    pub sumber: String,
    #[serde(default)]
    pub ids: Vec<Value>,
    #[serde(default)]
    pub id: Option<Value>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpdateStatusBody {
    Groups(Vec<StatusUpdateGroup>),
    Single(StatusUpdateGroup),
}

impl UpdateStatusBody {
    fn into_groups(self) -> Vec<StatusUpdateGroup> {
        match self {
            UpdateStatusBody::Groups(groups) => groups,
            UpdateStatusBody::Single(group) => vec![group],
        }
    }
}

fn id_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalize a group into executable form; `None` means the group is
/// skipped (unknown source, invalid status, or no usable ids).
pub(crate) fn parse_group(group: &StatusUpdateGroup) -> Option<(Dataset, Vec<String>, Status)> {
    let dataset = Dataset::from_source(&group.sumber)?;
    let status = group.status.parse::<Status>().ok()?;
    let ids: Vec<String> = group
        .ids
        .iter()
        .chain(group.id.iter())
        .filter_map(id_as_string)
        .collect();
    if ids.is_empty() {
        return None;
    }
    Some((dataset, ids, status))
}

async fn apply_group(
    pool: &PgPool,
    dataset: Dataset,
    ids: &[String],
    status: Status,
) -> Result<u64, ApiError> {
    let sql = format!(
        "UPDATE {} SET status = $1 WHERE id IN ({})",
        dataset.table(),
        in_placeholders(2, ids.len())
    );
    let mut query = sqlx::query(&sql).bind(status.as_str());
    for id in ids {
        query = query.bind(id);
    }
    Ok(query.execute(pool).await?.rows_affected())
}

/// PATCH /api/verifikasi/update-status - bulk status transition.
/// Invalid groups are skipped; only a run that touches zero rows fails.
pub async fn update_status(Json(body): Json<UpdateStatusBody>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let mut updated: u64 = 0;
    let mut skipped: usize = 0;
    for group in body.into_groups() {
        let Some((dataset, ids, status)) = parse_group(&group) else {
            tracing::warn!(
                sumber = %group.sumber,
                status = %group.status,
                "skipping invalid status-update group"
            );
            skipped += 1;
            continue;
        };
        updated += apply_group(&pool, dataset, &ids, status).await?;
    }

    if updated == 0 {
        return Err(ApiError::not_found("no matching rows"));
    }

    Ok(
        ApiResponse::success(json!({ "updated": updated, "skipped": skipped }))
            .with_message("verification status updated"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(sumber: &str, ids: Vec<Value>, status: &str) -> StatusUpdateGroup {
        StatusUpdateGroup {
            sumber: sumber.to_string(),
            ids,
            id: None,
            status: status.to_string(),
        }
    }

    #[test]
    fn numeric_and_string_ids_normalize() {
        let g = group("pendataan", vec![json!(12), json!("34")], "Disetujui");
        let (dataset, ids, status) = parse_group(&g).unwrap();
        assert_eq!(dataset, Dataset::Pendataan);
        assert_eq!(ids, vec!["12".to_string(), "34".to_string()]);
        assert_eq!(status, Status::Disetujui);
    }

    #[test]
    fn empty_id_list_is_skipped() {
        let g = group("zkup", vec![], "Ditolak");
        assert!(parse_group(&g).is_none());
    }

    #[test]
    fn unknown_source_is_skipped() {
        let g = group("users", vec![json!("1234")], "Disetujui");
        assert!(parse_group(&g).is_none());
    }

    #[test]
    fn invalid_status_is_skipped() {
        let g = group("pendataan", vec![json!("1234")], "Approved");
        assert!(parse_group(&g).is_none());
    }

    #[test]
    fn legacy_single_id_field_is_accepted() {
        let g = StatusUpdateGroup {
            sumber: "zkup".to_string(),
            ids: vec![],
            id: Some(json!(4321)),
            status: "Menunggu".to_string(),
        };
        let (_, ids, _) = parse_group(&g).unwrap();
        assert_eq!(ids, vec!["4321".to_string()]);
    }

    #[test]
    fn unusable_id_values_are_dropped() {
        let g = group(
            "pendataan",
            vec![json!(null), json!(""), json!({"id": 1}), json!("1234")],
            "Disetujui",
        );
        let (_, ids, _) = parse_group(&g).unwrap();
        assert_eq!(ids, vec!["1234".to_string()]);
    }

    #[test]
    fn body_accepts_single_object_or_sequence() {
        let single: UpdateStatusBody = serde_json::from_value(json!({
            "sumber": "pendataan", "id": 12, "status": "Disetujui"
        }))
        .unwrap();
        assert_eq!(single.into_groups().len(), 1);

        let groups: UpdateStatusBody = serde_json::from_value(json!([
            { "sumber": "pendataan", "ids": [12, 34], "status": "Disetujui" },
            { "sumber": "zkup", "ids": [], "status": "Ditolak" },
        ]))
        .unwrap();
        let groups = groups.into_groups();
        assert_eq!(groups.len(), 2);
        assert!(parse_group(&groups[0]).is_some());
        assert!(parse_group(&groups[1]).is_none());
    }
}
