// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Service Request Repository
//!
//! `service_requests` table access. Listings are assembled with
//! [`QueryBuilder`] and return the total matching count from a `cnt` CTE in
//! the same statement.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `ServiceRequestRepository` over PostgreSQL

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, ServiceRequestRepository};
use crate::domain::service_request::{
    Decision, NewServiceRequest, RequestKey, RequestStatus, ServiceRequest, ServiceRequestFilter,
    ServiceRequestPage, ServiceRequestSummary, ServiceRequestSummaryPage, SortColumn,
};
use crate::infrastructure::query_builder::{BuiltQuery, QueryBuilder};

const COLUMNS: &str = "id, org_id, partner, svc_name, company_name, status, enabled, remarks, \
                       updated_by, applied, created, updated";

const LIST_QUERY: &str = "WITH cnt AS (SELECT count(*) AS total FROM service_requests{{FILTER}}) \
     SELECT service_requests.*, cnt.total FROM service_requests CROSS JOIN cnt";

const GROUPED_QUERY: &str = "WITH cnt AS (SELECT count(*) AS total FROM \
     (SELECT 1 FROM service_requests{{FILTER}} GROUP BY org_id, svc_name) g) \
     SELECT org_id, svc_name, \
     max(company_name) AS company_name, \
     array_agg(partner ORDER BY partner) AS partners, \
     count(*) FILTER (WHERE status = 'PENDING') AS pending, \
     count(*) FILTER (WHERE status = 'ACCEPTED') AS accepted, \
     count(*) FILTER (WHERE status = 'REJECTED') AS rejected, \
     count(*) AS partner_count, \
     min(created) AS created, \
     max(updated) AS updated, \
     max(applied) AS applied, \
     max(cnt.total) AS total \
     FROM service_requests CROSS JOIN cnt";

pub struct PostgresServiceRequestRepository {
    pool: PgPool,
}

impl PostgresServiceRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn filtered(base: &str, filter: &ServiceRequestFilter) -> QueryBuilder {
        QueryBuilder::new(base)
            .any("org_id", &filter.org_ids)
            .any("status", &filter.status_values())
            .any("svc_name", &filter.svc_names)
            .any("partner", &filter.partners)
            .filter_like("company_name", &filter.company_name)
    }

    /// Count used when the requested page lies past the last row.
    async fn count(&self, filter: &ServiceRequestFilter) -> Result<i64, RepositoryError> {
        let built = Self::filtered("SELECT count(*) AS total FROM service_requests", filter).build();
        let row = built.query().fetch_one(&self.pool).await?;
        Ok(row.try_get("total")?)
    }

    /// Group count used when the requested summary page lies past the last group.
    async fn count_groups(&self, filter: &ServiceRequestFilter) -> Result<i64, RepositoryError> {
        let built = Self::group_count(filter);
        let row = built.query().fetch_one(&self.pool).await?;
        Ok(row.try_get("total")?)
    }

    fn group_count(filter: &ServiceRequestFilter) -> BuiltQuery {
        let inner = Self::filtered("SELECT 1 FROM service_requests", filter)
            .group_by("org_id, svc_name")
            .build();
        BuiltQuery {
            sql: format!("SELECT count(*) AS total FROM ({}) g", inner.sql),
            params: inner.params,
        }
    }

    async fn update_one(
        &self,
        sql: &str,
        key: &RequestKey,
        bind: impl FnOnce(
            sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
        ) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<ServiceRequest, RepositoryError> {
        require_key(key)?;
        let query = sqlx::query(sql)
            .bind(&key.org_id)
            .bind(&key.partner)
            .bind(&key.svc_name);
        let row = bind(query)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Service request {} not found", key)))?;
        parse_request_row(&row)
    }
}

fn require_key(key: &RequestKey) -> Result<(), RepositoryError> {
    match key.missing_field() {
        Some(field) => Err(RepositoryError::Validation(format!("{} is required", field))),
        None => Ok(()),
    }
}

/// Sort key for grouped listings, expressed against the aggregate aliases.
fn grouped_sort_column(column: SortColumn) -> &'static str {
    match column {
        SortColumn::Created => "created",
        SortColumn::CompanyName => "company_name",
        SortColumn::ServiceName => "svc_name",
        SortColumn::Status => "pending",
        SortColumn::Partner => "partners",
        SortColumn::LastUpdated | SortColumn::UpdatedBy => "updated",
        SortColumn::Applied => "applied",
    }
}

#[async_trait]
impl ServiceRequestRepository for PostgresServiceRequestRepository {
    async fn create(&self, request: &NewServiceRequest) -> Result<ServiceRequest, RepositoryError> {
        require_key(&request.key())?;
        let row = ServiceRequest::new(request);

        sqlx::query(
            r#"
            INSERT INTO service_requests (
                id, org_id, partner, svc_name, company_name, status, enabled,
                remarks, updated_by, applied, created, updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(row.id)
        .bind(&row.org_id)
        .bind(&row.partner)
        .bind(&row.svc_name)
        .bind(&row.company_name)
        .bind(row.status.as_db_str())
        .bind(row.enabled)
        .bind(&row.remarks)
        .bind(&row.updated_by)
        .bind(row.applied)
        .bind(row.created)
        .bind(row.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| match RepositoryError::from(e) {
            RepositoryError::Conflict(_) => {
                RepositoryError::Conflict(format!("Service request {} already exists", request.key()))
            }
            other => other,
        })?;

        Ok(row)
    }

    async fn get(&self, key: &RequestKey) -> Result<Option<ServiceRequest>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM service_requests WHERE org_id = $1 AND partner = $2 AND svc_name = $3",
            COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&key.org_id)
            .bind(&key.partner)
            .bind(&key.svc_name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(parse_request_row).transpose()
    }

    async fn list(&self, filter: &ServiceRequestFilter) -> Result<ServiceRequestPage, RepositoryError> {
        let column = filter.sort_by.unwrap_or(SortColumn::Created);
        let built = Self::filtered(LIST_QUERY, filter)
            .sort_by_column(column.column(), Some(filter.sort_direction))
            .sort_by_column("created", None)
            .sort_by_column("id", None)
            .limit(filter.limit)
            .offset(filter.offset)
            .add_total_query()
            .build();

        let rows = built.query().fetch_all(&self.pool).await?;

        let total = match rows.first() {
            Some(row) => row.try_get("total")?,
            None if filter.offset > 0 => self.count(filter).await?,
            None => 0,
        };

        let requests = rows
            .iter()
            .map(parse_request_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ServiceRequestPage { requests, total })
    }

    async fn list_grouped(&self, filter: &ServiceRequestFilter) -> Result<ServiceRequestSummaryPage, RepositoryError> {
        let column = filter.sort_by.unwrap_or(SortColumn::Created);
        let built = Self::filtered(GROUPED_QUERY, filter)
            .group_by("org_id, svc_name")
            .sort_by_column(grouped_sort_column(column), Some(filter.sort_direction))
            .sort_by_column("org_id", None)
            .sort_by_column("svc_name", None)
            .limit(filter.limit)
            .offset(filter.offset)
            .add_total_query()
            .build();

        let rows = built.query().fetch_all(&self.pool).await?;

        let total = match rows.first() {
            Some(row) => row.try_get("total")?,
            None if filter.offset > 0 => self.count_groups(filter).await?,
            None => 0,
        };

        let summaries = rows
            .iter()
            .map(parse_summary_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ServiceRequestSummaryPage { summaries, total })
    }

    async fn apply(&self, org_id: &str, svc_name: &str, updated_by: &str) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE service_requests
            SET status = 'PENDING', applied = NOW(), updated = NOW(),
                updated_by = $3, notified_at = NULL
            WHERE org_id = $1 AND svc_name = $2 AND status NOT IN ('ACCEPTED', 'PENDING')
            RETURNING {}
            "#,
            COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(org_id)
            .bind(svc_name)
            .bind(updated_by)
            .fetch_all(&self.pool)
            .await?;

        let mut applied = rows
            .iter()
            .map(parse_request_row)
            .collect::<Result<Vec<_>, _>>()?;
        applied.sort_by(|a, b| a.created.cmp(&b.created).then(a.partner.cmp(&b.partner)));
        Ok(applied)
    }

    async fn accept(&self, decision: &Decision) -> Result<ServiceRequest, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE service_requests
            SET status = 'ACCEPTED', enabled = TRUE, remarks = $4, updated_by = $5,
                updated = NOW(),
                notified_at = CASE WHEN status <> 'ACCEPTED' THEN NULL ELSE notified_at END
            WHERE org_id = $1 AND partner = $2 AND svc_name = $3
            RETURNING {}
            "#,
            COLUMNS
        );
        self.update_one(&sql, &decision.key, |q| {
            q.bind(decision.remarks.clone()).bind(decision.updated_by.clone())
        })
        .await
    }

    async fn reject(&self, decision: &Decision) -> Result<ServiceRequest, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE service_requests
            SET status = 'REJECTED', remarks = $4, updated_by = $5,
                updated = NOW(),
                notified_at = CASE WHEN status <> 'REJECTED' THEN NULL ELSE notified_at END
            WHERE org_id = $1 AND partner = $2 AND svc_name = $3
            RETURNING {}
            "#,
            COLUMNS
        );
        self.update_one(&sql, &decision.key, |q| {
            q.bind(decision.remarks.clone()).bind(decision.updated_by.clone())
        })
        .await
    }

    async fn set_enabled(&self, key: &RequestKey, enabled: bool, updated_by: &str) -> Result<ServiceRequest, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE service_requests
            SET enabled = $4, updated_by = $5, updated = NOW()
            WHERE org_id = $1 AND partner = $2 AND svc_name = $3
            RETURNING {}
            "#,
            COLUMNS
        );
        let updated_by = updated_by.to_string();
        self.update_one(&sql, key, move |q| q.bind(enabled).bind(updated_by))
            .await
    }

    async fn set_status(&self, key: &RequestKey, status: RequestStatus, updated_by: &str) -> Result<ServiceRequest, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE service_requests
            SET status = $4, updated_by = $5, updated = NOW(),
                notified_at = CASE WHEN status <> $4 THEN NULL ELSE notified_at END
            WHERE org_id = $1 AND partner = $2 AND svc_name = $3
            RETURNING {}
            "#,
            COLUMNS
        );
        let updated_by = updated_by.to_string();
        self.update_one(&sql, key, move |q| q.bind(status.as_db_str()).bind(updated_by))
            .await
    }

    async fn add_remark(&self, key: &RequestKey, remarks: &str, updated_by: &str) -> Result<ServiceRequest, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE service_requests
            SET remarks = $4, updated_by = $5, updated = NOW()
            WHERE org_id = $1 AND partner = $2 AND svc_name = $3
            RETURNING {}
            "#,
            COLUMNS
        );
        let remarks = remarks.to_string();
        let updated_by = updated_by.to_string();
        self.update_one(&sql, key, move |q| q.bind(remarks).bind(updated_by))
            .await
    }

    async fn remove(&self, key: &RequestKey) -> Result<bool, RepositoryError> {
        require_key(key)?;
        let result = sqlx::query(
            r#"
            DELETE FROM service_requests
            WHERE org_id = $1 AND partner = $2 AND svc_name = $3
              AND status NOT IN ('ACCEPTED', 'PENDING')
            "#,
        )
        .bind(&key.org_id)
        .bind(&key.partner)
        .bind(&key.svc_name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn claim_notification(&self, org_id: &str, svc_name: &str, status: RequestStatus) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            UPDATE service_requests
            SET notified_at = NOW()
            WHERE org_id = $1 AND svc_name = $2 AND status = $3 AND notified_at IS NULL
            RETURNING partner
            "#,
        )
        .bind(org_id)
        .bind(svc_name)
        .bind(status.as_db_str())
        .fetch_all(&self.pool)
        .await?;

        let mut partners = rows
            .iter()
            .map(|row| row.try_get::<String, _>("partner"))
            .collect::<Result<Vec<_>, _>>()?;
        partners.sort();
        Ok(partners)
    }
}

fn parse_status(value: &str) -> Result<RequestStatus, RepositoryError> {
    RequestStatus::from_db_str(value)
        .ok_or_else(|| RepositoryError::Serialization(format!("Unknown request status '{}'", value)))
}

fn parse_request_row(row: &PgRow) -> Result<ServiceRequest, RepositoryError> {
    let status: String = row.try_get("status")?;

    Ok(ServiceRequest {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        partner: row.try_get("partner")?,
        svc_name: row.try_get("svc_name")?,
        company_name: row.try_get("company_name")?,
        status: parse_status(&status)?,
        enabled: row.try_get("enabled")?,
        remarks: row.try_get("remarks")?,
        updated_by: row.try_get("updated_by")?,
        applied: row.try_get("applied")?,
        created: row.try_get("created")?,
        updated: row.try_get("updated")?,
    })
}

fn parse_summary_row(row: &PgRow) -> Result<ServiceRequestSummary, RepositoryError> {
    Ok(ServiceRequestSummary {
        org_id: row.try_get("org_id")?,
        svc_name: row.try_get("svc_name")?,
        company_name: row.try_get("company_name")?,
        partners: row.try_get("partners")?,
        pending: row.try_get("pending")?,
        accepted: row.try_get("accepted")?,
        rejected: row.try_get("rejected")?,
        partner_count: row.try_get("partner_count")?,
        created: row.try_get("created")?,
        updated: row.try_get("updated")?,
        applied: row.try_get("applied")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_statement_shares_predicates_with_count() {
        let filter = ServiceRequestFilter {
            org_ids: vec!["org-1".to_string()],
            statuses: vec![RequestStatus::Pending],
            limit: 2,
            offset: 2,
            ..Default::default()
        };
        let built = PostgresServiceRequestRepository::filtered(LIST_QUERY, &filter)
            .sort_by_column(SortColumn::Created.column(), Some(filter.sort_direction))
            .limit(filter.limit)
            .offset(filter.offset)
            .add_total_query()
            .build();

        assert!(built
            .sql
            .starts_with("WITH cnt AS (SELECT count(*) AS total FROM service_requests WHERE org_id = ANY($1) AND status = ANY($2))"));
        assert!(built
            .sql
            .ends_with("CROSS JOIN cnt WHERE org_id = ANY($1) AND status = ANY($2) ORDER BY created ASC LIMIT $3 OFFSET $4"));
        assert_eq!(built.params.len(), 4);
    }

    #[test]
    fn test_group_count_counts_groups_not_rows() {
        let filter = ServiceRequestFilter {
            org_ids: vec!["org-1".to_string()],
            company_name: "sari".to_string(),
            limit: 10,
            offset: 5,
            ..Default::default()
        };
        let built = PostgresServiceRequestRepository::group_count(&filter);

        assert!(built.sql.starts_with("SELECT count(*) AS total FROM (SELECT 1 FROM service_requests WHERE org_id = ANY($1) AND "));
        assert!(built.sql.ends_with(" GROUP BY org_id, svc_name) g"));
        // Paging never reaches the count
        assert_eq!(built.params.len(), 2);
        assert!(!built.sql.contains("LIMIT"));
    }

    #[test]
    fn test_grouped_statement_groups_before_ordering() {
        let filter = ServiceRequestFilter {
            svc_names: vec!["REMITTANCE".to_string()],
            sort_by: Some(SortColumn::Status),
            ..Default::default()
        };
        let built = PostgresServiceRequestRepository::filtered(GROUPED_QUERY, &filter)
            .group_by("org_id, svc_name")
            .sort_by_column(grouped_sort_column(SortColumn::Status), Some(filter.sort_direction))
            .add_total_query()
            .build();

        assert!(built
            .sql
            .contains("FROM service_requests WHERE svc_name = ANY($1) GROUP BY org_id, svc_name) g)"));
        assert!(built
            .sql
            .ends_with("CROSS JOIN cnt WHERE svc_name = ANY($1) GROUP BY org_id, svc_name ORDER BY pending ASC"));
    }
}
