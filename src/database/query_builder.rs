use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;

use crate::error::ApiError;

/// Validate a SQL identifier before interpolation. Payload keys become
/// column names in dynamic statements, so anything outside
/// `[A-Za-z_][A-Za-z0-9_]*` is rejected.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote SQL identifier to prevent injection
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build a dynamic INSERT from a JSON object. Keys become columns in
/// map order; values bind as `$1..$n`.
pub fn build_insert(table: &str, fields: &Map<String, Value>) -> Result<(String, Vec<Value>), ApiError> {
    if fields.is_empty() {
        return Err(ApiError::bad_request("empty payload"));
    }

    let mut columns = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    let mut params = Vec::with_capacity(fields.len());

    for (index, (key, value)) in fields.iter().enumerate() {
        if !is_valid_identifier(key) {
            return Err(ApiError::bad_request(format!("invalid field name '{}'", key)));
        }
        columns.push(quote_ident(key));
        placeholders.push(format!("${}", index + 1));
        params.push(value.clone());
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok((sql, params))
}

/// Build a dynamic partial UPDATE; the row id binds last.
pub fn build_update(
    table: &str,
    fields: &Map<String, Value>,
    id: Value,
) -> Result<(String, Vec<Value>), ApiError> {
    if fields.is_empty() {
        return Err(ApiError::bad_request("no fields to update"));
    }

    let mut assignments = Vec::with_capacity(fields.len());
    let mut params = Vec::with_capacity(fields.len() + 1);

    for (index, (key, value)) in fields.iter().enumerate() {
        if !is_valid_identifier(key) {
            return Err(ApiError::bad_request(format!("invalid field name '{}'", key)));
        }
        assignments.push(format!("{} = ${}", quote_ident(key), index + 1));
        params.push(value.clone());
    }

    params.push(id);
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ${}",
        quote_ident(table),
        assignments.join(", "),
        params.len()
    );
    Ok((sql, params))
}

/// Render `$n` placeholders for an id list starting at `start`.
pub fn in_placeholders(start: usize, count: usize) -> String {
    (0..count)
        .map(|i| format!("${}", start + i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Bind a JSON value onto a query; nulls bind as SQL NULL, objects and
/// arrays as JSONB.
pub fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

/// Same binding rules for typed `query_as` queries.
pub fn bind_value_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        let mut map = Map::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.clone());
        }
        map
    }

    #[test]
    fn validates_identifiers() {
        assert!(is_valid_identifier("tahun_realisasi"));
        assert!(is_valid_identifier("_hidden"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("4col"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier("id; DROP TABLE users"));
    }

    #[test]
    fn quotes_embedded_quotes() {
        assert_eq!(quote_ident("nama"), "\"nama\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn builds_insert_in_key_order() {
        let map = fields(&[("nama", json!("X")), ("nik", json!("123"))]);
        let (sql, params) = build_insert("pendataan", &map).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"pendataan\" (\"nama\", \"nik\") VALUES ($1, $2)"
        );
        assert_eq!(params, vec![json!("X"), json!("123")]);
    }

    #[test]
    fn insert_rejects_empty_and_bad_keys() {
        assert!(build_insert("pendataan", &Map::new()).is_err());
        let map = fields(&[("bad-key", json!(1))]);
        assert!(build_insert("pendataan", &map).is_err());
    }

    #[test]
    fn builds_update_with_id_bound_last() {
        let map = fields(&[("nama", json!("Y")), ("status", json!("Disetujui"))]);
        let (sql, params) = build_update("zkup", &map, json!("1234")).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"zkup\" SET \"nama\" = $1, \"status\" = $2 WHERE id = $3"
        );
        assert_eq!(params, vec![json!("Y"), json!("Disetujui"), json!("1234")]);
    }

    #[test]
    fn renders_in_placeholders() {
        assert_eq!(in_placeholders(2, 3), "$2, $3, $4");
        assert_eq!(in_placeholders(1, 1), "$1");
    }
}
