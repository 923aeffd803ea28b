use serde_json::Value;

use crate::database::query_builder::quote_ident;
use crate::middleware::auth::AuthUser;

/// Conjunctive WHERE-fragment builder that enforces role visibility.
///
/// Non-admin callers are always pinned to `pengusul = <their claim>`;
/// optional filters only ever narrow the result further. Clauses render
/// in construction order with `$1..$n` placeholders, so the fragment is
/// deterministic for a given claim and filter set.
#[derive(Debug, Default)]
pub struct ScopeFilter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl ScopeFilter {
    /// Seed the filter from the caller's claim. Admins start unfiltered.
    /// A non-admin claim without a pengusul binds SQL NULL, which never
    /// compares equal, so such a caller matches no rows.
    pub fn for_user(user: &AuthUser) -> Self {
        let mut filter = Self::default();
        if !user.is_admin() {
            let value = user
                .pengusul
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null);
            filter.push("pengusul", value);
        }
        filter
    }

    /// Append `column = value` when the filter value is present.
    pub fn and_eq(mut self, column: &str, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            self.push(column, Value::String(value.into()));
        }
        self
    }

    fn push(&mut self, column: &str, value: Value) {
        self.clauses.push(format!(
            "{} = ${}",
            quote_ident(column),
            self.params.len() + 1
        ));
        self.params.push(value);
    }

    /// Render the fragment; empty when no clause applies.
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Parameters in placeholder order. Callers must bind these before
    /// any query-specific parameters.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use serde_json::json;

    fn user(role: Role, pengusul: Option<&str>) -> AuthUser {
        AuthUser {
            id: 1,
            role,
            pengusul: pengusul.map(str::to_string),
        }
    }

    #[test]
    fn admin_is_unscoped() {
        let filter = ScopeFilter::for_user(&user(Role::Admin, Some("P1")));
        assert_eq!(filter.where_clause(), "");
        assert!(filter.params().is_empty());
    }

    #[test]
    fn non_admin_is_always_pinned_to_pengusul() {
        let filter = ScopeFilter::for_user(&user(Role::User, Some("P1")));
        assert_eq!(filter.where_clause(), "WHERE \"pengusul\" = $1");
        assert_eq!(filter.params(), &[json!("P1")]);
    }

    #[test]
    fn optional_filters_narrow_after_the_scope() {
        let filter = ScopeFilter::for_user(&user(Role::User, Some("P1")))
            .and_eq("kabupaten", Some("Aceh Besar"))
            .and_eq("status", Some("Menunggu"));
        assert_eq!(
            filter.where_clause(),
            "WHERE \"pengusul\" = $1 AND \"kabupaten\" = $2 AND \"status\" = $3"
        );
        assert_eq!(
            filter.params(),
            &[json!("P1"), json!("Aceh Besar"), json!("Menunggu")]
        );
    }

    #[test]
    fn admin_filters_apply_without_role_scope() {
        let filter =
            ScopeFilter::for_user(&user(Role::Admin, None)).and_eq("status", Some("Ditolak"));
        assert_eq!(filter.where_clause(), "WHERE \"status\" = $1");
        assert_eq!(filter.params(), &[json!("Ditolak")]);
    }

    #[test]
    fn absent_filters_add_nothing() {
        let filter =
            ScopeFilter::for_user(&user(Role::User, Some("P1"))).and_eq("kabupaten", None::<String>);
        assert_eq!(filter.where_clause(), "WHERE \"pengusul\" = $1");
        assert_eq!(filter.params().len(), 1);
    }

    #[test]
    fn non_admin_without_pengusul_binds_null() {
        let filter = ScopeFilter::for_user(&user(Role::User, None));
        assert_eq!(filter.where_clause(), "WHERE \"pengusul\" = $1");
        assert_eq!(filter.params(), &[Value::Null]);
    }
}
