// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Conditional SQL builder for filtered listings.
//!
//! Every predicate method is "append if non-empty": an unset filter simply
//! emits nothing. Values are always bound as positional parameters; list
//! predicates bind native text arrays.
//!
//! A base statement may embed [`FILTER_TOKEN`] (typically inside a
//! `WITH cnt AS (...)` count CTE). After [`QueryBuilder::add_total_query`]
//! the token is replaced with the accumulated WHERE text so the count and
//! the page share predicates and parameters in a single round trip.

use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use crate::domain::service_request::SortDirection;

pub const FILTER_TOKEN: &str = "{{FILTER}}";

#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    TextArray(Vec<String>),
    Int(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    base: String,
    filter: String,
    group_by: String,
    order: String,
    limit: String,
    offset: String,
    params: Vec<SqlParam>,
    with_total: bool,
}

/// Final statement text and its bind parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Default::default()
        }
    }

    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    fn push_predicate(&mut self, predicate: String) {
        if self.filter.is_empty() {
            self.filter.push_str(" WHERE ");
        } else {
            self.filter.push_str(" AND ");
        }
        self.filter.push_str(&predicate);
    }

    /// `column <op> $n`, skipped when `value` is empty.
    pub fn filter(mut self, column: &str, op: Comparison, value: &str) -> Self {
        if value.is_empty() {
            return self;
        }
        let placeholder = self.bind(SqlParam::Text(value.to_string()));
        self.push_predicate(format!("{} {} {}", column, op.as_sql(), placeholder));
        self
    }

    /// Date-cast comparison: `column::date <op> $n::date`.
    pub fn filter_date(mut self, column: &str, op: Comparison, value: &str) -> Self {
        if value.is_empty() {
            return self;
        }
        let placeholder = self.bind(SqlParam::Text(value.to_string()));
        self.push_predicate(format!("{}::date {} {}::date", column, op.as_sql(), placeholder));
        self
    }

    /// JSON path comparison: `column->>'key' <op> $n`.
    pub fn filter_json(mut self, column: &str, key: &str, op: Comparison, value: &str) -> Self {
        if value.is_empty() || key.is_empty() {
            return self;
        }
        let placeholder = self.bind(SqlParam::Text(value.to_string()));
        self.push_predicate(format!(
            "{}->>'{}' {} {}",
            column,
            key.replace('\'', "''"),
            op.as_sql(),
            placeholder
        ));
        self
    }

    /// Case-insensitive substring match.
    pub fn filter_like(mut self, column: &str, value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return self;
        }
        let escaped = value
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let placeholder = self.bind(SqlParam::Text(format!("%{}%", escaped)));
        self.push_predicate(format!("{} ILIKE {}", column, placeholder));
        self
    }

    /// `column = ANY($n)`, skipped when `values` is empty.
    pub fn any(mut self, column: &str, values: &[String]) -> Self {
        if values.is_empty() {
            return self;
        }
        let placeholder = self.bind(SqlParam::TextArray(values.to_vec()));
        self.push_predicate(format!("{} = ANY({})", column, placeholder));
        self
    }

    /// Excludes a comma-separated value list, bound as a text array.
    pub fn not_in(mut self, column: &str, comma_separated: &str) -> Self {
        let values: Vec<String> = comma_separated
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if values.is_empty() {
            return self;
        }
        let placeholder = self.bind(SqlParam::TextArray(values));
        self.push_predicate(format!("{} <> ALL({})", column, placeholder));
        self
    }

    /// Emitted between the WHERE text and ORDER BY.
    pub fn group_by(mut self, columns: &str) -> Self {
        if !columns.is_empty() {
            self.group_by = format!(" GROUP BY {}", columns);
        }
        self
    }

    /// Appends a sort key. Repeated calls add secondary keys.
    pub fn sort_by_column(mut self, column: &str, direction: Option<SortDirection>) -> Self {
        if column.is_empty() {
            return self;
        }
        let direction = direction.unwrap_or_default();
        if self.order.is_empty() {
            self.order.push_str(" ORDER BY ");
        } else {
            self.order.push_str(", ");
        }
        self.order.push_str(column);
        self.order.push(' ');
        self.order.push_str(direction.as_sql());
        self
    }

    /// Zero means unbounded.
    pub fn limit(mut self, limit: i64) -> Self {
        if limit > 0 {
            let placeholder = self.bind(SqlParam::Int(limit));
            self.limit = format!(" LIMIT {}", placeholder);
        }
        self
    }

    /// Zero means no offset.
    pub fn offset(mut self, offset: i64) -> Self {
        if offset > 0 {
            let placeholder = self.bind(SqlParam::Int(offset));
            self.offset = format!(" OFFSET {}", placeholder);
        }
        self
    }

    /// Share the accumulated predicates with the `{{FILTER}}` count query.
    pub fn add_total_query(mut self) -> Self {
        self.with_total = true;
        self
    }

    pub fn build(self) -> BuiltQuery {
        let base = if self.with_total {
            self.base.replace(FILTER_TOKEN, &self.filter)
        } else {
            self.base.replace(FILTER_TOKEN, "")
        };

        let mut sql = base;
        sql.push_str(&self.filter);
        sql.push_str(&self.group_by);
        sql.push_str(&self.order);
        sql.push_str(&self.limit);
        sql.push_str(&self.offset);

        BuiltQuery {
            sql,
            params: self.params,
        }
    }
}

impl BuiltQuery {
    /// Prepare the statement with every parameter bound in order.
    pub fn query(&self) -> Query<'_, Postgres, PgArguments> {
        let mut query = sqlx::query(&self.sql);
        for param in &self.params {
            query = match param {
                SqlParam::Text(value) => query.bind(value.clone()),
                SqlParam::TextArray(values) => query.bind(values.clone()),
                SqlParam::Int(value) => query.bind(*value),
            };
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filters_emit_nothing() {
        let built = QueryBuilder::new("SELECT * FROM service_requests")
            .filter("org_id", Comparison::Eq, "")
            .any("status", &[])
            .not_in("partner", " , ")
            .filter_like("company_name", "  ")
            .sort_by_column("", None)
            .limit(0)
            .offset(0)
            .build();

        assert_eq!(built.sql, "SELECT * FROM service_requests");
        assert!(built.params.is_empty());
    }

    #[test]
    fn test_where_then_and_with_positional_params() {
        let built = QueryBuilder::new("SELECT * FROM t")
            .filter("org_id", Comparison::Eq, "org-1")
            .any("partner", &["WU".to_string(), "TF".to_string()])
            .filter_date("created", Comparison::Gte, "2026-01-01")
            .build();

        assert_eq!(
            built.sql,
            "SELECT * FROM t WHERE org_id = $1 AND partner = ANY($2) AND created::date >= $3::date"
        );
        assert_eq!(built.params.len(), 3);
        assert_eq!(
            built.params[1],
            SqlParam::TextArray(vec!["WU".to_string(), "TF".to_string()])
        );
    }

    #[test]
    fn test_not_in_binds_array_instead_of_literals() {
        let built = QueryBuilder::new("SELECT * FROM t")
            .not_in("partner", "WU, x' OR '1'='1 ,TF")
            .build();

        assert_eq!(built.sql, "SELECT * FROM t WHERE partner <> ALL($1)");
        assert_eq!(
            built.params,
            vec![SqlParam::TextArray(vec![
                "WU".to_string(),
                "x' OR '1'='1".to_string(),
                "TF".to_string()
            ])]
        );
    }

    #[test]
    fn test_sort_defaults_ascending_and_chains_secondary_keys() {
        let built = QueryBuilder::new("SELECT * FROM t")
            .sort_by_column("created", None)
            .sort_by_column("id", Some(SortDirection::Desc))
            .build();

        assert_eq!(built.sql, "SELECT * FROM t ORDER BY created ASC, id DESC");
    }

    #[test]
    fn test_limit_offset_follow_order() {
        let built = QueryBuilder::new("SELECT * FROM t")
            .filter("svc_name", Comparison::Eq, "REMITTANCE")
            .sort_by_column("created", Some(SortDirection::Asc))
            .limit(2)
            .offset(2)
            .build();

        assert_eq!(
            built.sql,
            "SELECT * FROM t WHERE svc_name = $1 ORDER BY created ASC LIMIT $2 OFFSET $3"
        );
        assert_eq!(built.params[1], SqlParam::Int(2));
        assert_eq!(built.params[2], SqlParam::Int(2));
    }

    #[test]
    fn test_total_query_shares_filter_text() {
        let base = "WITH cnt AS (SELECT count(*) AS total FROM t{{FILTER}}) SELECT t.*, cnt.total FROM t CROSS JOIN cnt";
        let built = QueryBuilder::new(base)
            .any("org_id", &["org-1".to_string()])
            .limit(10)
            .add_total_query()
            .build();

        assert_eq!(
            built.sql,
            "WITH cnt AS (SELECT count(*) AS total FROM t WHERE org_id = ANY($1)) \
             SELECT t.*, cnt.total FROM t CROSS JOIN cnt WHERE org_id = ANY($1) LIMIT $2"
        );
    }

    #[test]
    fn test_token_removed_without_total_query() {
        let built = QueryBuilder::new("SELECT count(*) FROM t{{FILTER}}").build();
        assert_eq!(built.sql, "SELECT count(*) FROM t");
    }

    #[test]
    fn test_like_escapes_wildcards() {
        let built = QueryBuilder::new("SELECT * FROM t")
            .filter_like("company_name", "100%_Sari")
            .build();
        assert_eq!(built.sql, "SELECT * FROM t WHERE company_name ILIKE $1");
        assert_eq!(built.params, vec![SqlParam::Text("%100\\%\\_Sari%".to_string())]);
    }

    #[test]
    fn test_json_key_is_quoted() {
        let built = QueryBuilder::new("SELECT * FROM t")
            .filter_json("meta", "o'brien", Comparison::NotEq, "x")
            .build();
        assert_eq!(built.sql, "SELECT * FROM t WHERE meta->>'o''brien' <> $1");
    }

    #[test]
    fn test_group_by_precedes_order() {
        let built = QueryBuilder::new("SELECT org_id, count(*) FROM t")
            .filter("svc_name", Comparison::Eq, "REMITTANCE")
            .group_by("org_id")
            .sort_by_column("org_id", None)
            .build();
        assert_eq!(
            built.sql,
            "SELECT org_id, count(*) FROM t WHERE svc_name = $1 GROUP BY org_id ORDER BY org_id ASC"
        );
    }
}
