//! Row scoping filter.
//!
//! Every statement against a tenant-owned table is built through
//! [`ScopedQuery`], which prepends `tenant_id = $tenant_id` to the
//! caller's conditions unless the scope is an admin bypass. Callers
//! must bind [`ScopedQuery::tenant_binding`] alongside their own
//! parameters.

use flockwise_core::tenancy::{QueryScope, TenantOwned};

#[derive(Debug, Clone)]
pub struct ScopedQuery {
    table: &'static str,
    tenant_id: Option<String>,
    conditions: Vec<&'static str>,
}

impl ScopedQuery {
    pub fn new(table: &'static str, scope: &QueryScope) -> Self {
        Self {
            table,
            tenant_id: scope.tenant_id().map(|id| id.to_string()),
            conditions: Vec::new(),
        }
    }

    pub fn for_entity<T: TenantOwned>(scope: &QueryScope) -> Self {
        Self::new(T::TABLE, scope)
    }

    /// Add a caller condition, joined with `AND`.
    pub fn and(mut self, condition: &'static str) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn is_scoped(&self) -> bool {
        self.tenant_id.is_some()
    }

    /// The `("tenant_id", value)` pair to bind, absent for admin scope.
    pub fn tenant_binding(&self) -> Option<(&'static str, String)> {
        self.tenant_id.clone().map(|id| ("tenant_id", id))
    }

    /// ` WHERE ...` including the tenant predicate, or an empty string.
    pub fn where_clause(&self) -> String {
        let mut predicates = Vec::with_capacity(self.conditions.len() + 1);
        if self.is_scoped() {
            predicates.push("tenant_id = $tenant_id");
        }
        predicates.extend(self.conditions.iter().copied());

        if predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", predicates.join(" AND "))
        }
    }

    /// `SELECT` over the whole table, projecting the record id.
    pub fn select(&self) -> String {
        format!(
            "SELECT meta::id(id) AS record_id, * FROM {}{}",
            self.table,
            self.where_clause()
        )
    }

    /// `SELECT` of the single record bound as `$id`.
    pub fn select_record(&self) -> String {
        format!(
            "SELECT meta::id(id) AS record_id, * FROM type::record('{}', $id){}",
            self.table,
            self.where_clause()
        )
    }

    pub fn count(&self) -> String {
        format!(
            "SELECT count() AS total FROM {}{} GROUP ALL",
            self.table,
            self.where_clause()
        )
    }

    /// `UPDATE` of the record bound as `$id` with the given assignments.
    pub fn update_record(&self, sets: &str) -> String {
        format!(
            "UPDATE type::record('{}', $id) SET {}{}",
            self.table,
            sets,
            self.where_clause()
        )
    }

    /// `UPDATE` of every matching row in the table.
    pub fn update_where(&self, sets: &str) -> String {
        format!("UPDATE {} SET {}{}", self.table, sets, self.where_clause())
    }

    /// `DELETE` of every matching row in the table.
    pub fn delete_where(&self) -> String {
        format!("DELETE {}{}", self.table, self.where_clause())
    }

    pub fn delete_record(&self) -> String {
        format!(
            "DELETE type::record('{}', $id){}",
            self.table,
            self.where_clause()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flockwise_core::models::batch::Batch;
    use flockwise_core::tenancy::{AdminBypass, Principal};
    use uuid::Uuid;

    fn admin_scope() -> QueryScope {
        let admin = Principal {
            user_id: Uuid::new_v4(),
            current_team_id: None,
            is_super_admin: true,
        };
        QueryScope::unscoped(AdminBypass::authorize(&admin).unwrap())
    }

    #[test]
    fn tenant_scope_injects_predicate_first() {
        let team = Uuid::new_v4();
        let q = ScopedQuery::for_entity::<Batch>(&QueryScope::explicit_team(team))
            .and("status = $status");

        assert_eq!(
            q.select(),
            "SELECT meta::id(id) AS record_id, * FROM batch \
             WHERE tenant_id = $tenant_id AND status = $status"
        );
        assert_eq!(q.tenant_binding(), Some(("tenant_id", team.to_string())));
    }

    #[test]
    fn admin_scope_has_no_predicate() {
        let q = ScopedQuery::new("batch", &admin_scope());
        assert_eq!(q.select(), "SELECT meta::id(id) AS record_id, * FROM batch");
        assert_eq!(q.tenant_binding(), None);

        let filtered = q.and("status = $status");
        assert_eq!(filtered.where_clause(), " WHERE status = $status");
    }

    #[test]
    fn record_statements_keep_the_filter() {
        let q = ScopedQuery::new("daily_log", &QueryScope::explicit_team(Uuid::new_v4()));
        assert_eq!(
            q.update_record("notes = $notes"),
            "UPDATE type::record('daily_log', $id) SET notes = $notes \
             WHERE tenant_id = $tenant_id"
        );
        assert_eq!(
            q.delete_record(),
            "DELETE type::record('daily_log', $id) WHERE tenant_id = $tenant_id"
        );
        assert_eq!(
            q.count(),
            "SELECT count() AS total FROM daily_log WHERE tenant_id = $tenant_id GROUP ALL"
        );
    }
}
