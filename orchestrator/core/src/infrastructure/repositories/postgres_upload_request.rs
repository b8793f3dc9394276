// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Upload Service Request Repository
//!
//! `upload_service_requests` table access.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, UploadServiceRequestRepository};
use crate::domain::upload_request::{
    NewUploadServiceRequest, UploadKey, UploadServiceRequest, UploadServiceRequestFilter,
    UploadServiceRequestPage, UploadStatus,
};
use crate::infrastructure::query_builder::QueryBuilder;

const COLUMNS: &str = "id, org_id, partner, svc_name, file_type, file_id, status, create_by, \
                       verify_by, verified, created, updated";

const LIST_QUERY: &str = "WITH cnt AS (SELECT count(*) AS total FROM upload_service_requests{{FILTER}}) \
     SELECT upload_service_requests.*, cnt.total FROM upload_service_requests CROSS JOIN cnt";

pub struct PostgresUploadServiceRequestRepository {
    pool: PgPool,
}

impl PostgresUploadServiceRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn filtered(base: &str, filter: &UploadServiceRequestFilter) -> QueryBuilder {
        let statuses: Vec<String> = filter
            .statuses
            .iter()
            .map(|s| s.as_db_str().to_string())
            .collect();

        QueryBuilder::new(base)
            .any("org_id", &filter.org_ids)
            .any("partner", &filter.partners)
            .any("svc_name", &filter.svc_names)
            .any("file_type", &filter.file_types)
            .any("status", &statuses)
    }

    async fn verify(&self, key: &UploadKey, status: UploadStatus, verify_by: &str) -> Result<UploadServiceRequest, RepositoryError> {
        validate(key)?;
        let sql = format!(
            r#"
            UPDATE upload_service_requests
            SET status = $5, verify_by = $6, verified = NOW(), updated = NOW()
            WHERE org_id = $1 AND partner = $2 AND svc_name = $3 AND file_type = $4
            RETURNING {}
            "#,
            COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&key.org_id)
            .bind(&key.partner)
            .bind(&key.svc_name)
            .bind(&key.file_type)
            .bind(status.as_db_str())
            .bind(verify_by)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Upload request {} not found", key)))?;

        parse_upload_row(&row)
    }
}

fn validate(key: &UploadKey) -> Result<(), RepositoryError> {
    match key.missing_field() {
        Some(field) => Err(RepositoryError::Validation(format!("{} is required", field))),
        None => Ok(()),
    }
}

fn validate_new(request: &NewUploadServiceRequest) -> Result<(), RepositoryError> {
    validate(&request.key)?;
    if request.file_id.trim().is_empty() {
        return Err(RepositoryError::Validation("file_id is required".to_string()));
    }
    Ok(())
}

#[async_trait]
impl UploadServiceRequestRepository for PostgresUploadServiceRequestRepository {
    async fn create(&self, request: &NewUploadServiceRequest) -> Result<UploadServiceRequest, RepositoryError> {
        validate_new(request)?;
        let row = UploadServiceRequest::new(request);

        sqlx::query(
            r#"
            INSERT INTO upload_service_requests (
                id, org_id, partner, svc_name, file_type, file_id, status,
                create_by, verify_by, verified, created, updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(row.id)
        .bind(&row.org_id)
        .bind(&row.partner)
        .bind(&row.svc_name)
        .bind(&row.file_type)
        .bind(&row.file_id)
        .bind(row.status.as_db_str())
        .bind(&row.create_by)
        .bind(&row.verify_by)
        .bind(row.verified)
        .bind(row.created)
        .bind(row.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| match RepositoryError::from(e) {
            RepositoryError::Conflict(_) => {
                RepositoryError::Conflict(format!("Upload request {} already exists", request.key))
            }
            other => other,
        })?;

        Ok(row)
    }

    async fn add(&self, request: &NewUploadServiceRequest) -> Result<UploadServiceRequest, RepositoryError> {
        validate_new(request)?;
        let fresh = UploadServiceRequest::new(request);
        let sql = format!(
            r#"
            INSERT INTO upload_service_requests (
                id, org_id, partner, svc_name, file_type, file_id, status,
                create_by, verify_by, verified, created, updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, '', $7, '', NULL, $8, $8)
            ON CONFLICT (org_id, partner, svc_name, file_type) DO UPDATE SET
                file_id = EXCLUDED.file_id,
                create_by = EXCLUDED.create_by,
                status = '',
                verify_by = '',
                verified = NULL,
                updated = NOW()
            RETURNING {}
            "#,
            COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(fresh.id)
            .bind(&fresh.org_id)
            .bind(&fresh.partner)
            .bind(&fresh.svc_name)
            .bind(&fresh.file_type)
            .bind(&fresh.file_id)
            .bind(&fresh.create_by)
            .bind(fresh.created)
            .fetch_one(&self.pool)
            .await?;

        parse_upload_row(&row)
    }

    async fn accept(&self, key: &UploadKey, verify_by: &str) -> Result<UploadServiceRequest, RepositoryError> {
        self.verify(key, UploadStatus::Accepted, verify_by).await
    }

    async fn reject(&self, key: &UploadKey, verify_by: &str) -> Result<UploadServiceRequest, RepositoryError> {
        self.verify(key, UploadStatus::Rejected, verify_by).await
    }

    async fn remove(&self, key: &UploadKey) -> Result<bool, RepositoryError> {
        validate(key)?;
        let result = sqlx::query(
            "DELETE FROM upload_service_requests WHERE org_id = $1 AND partner = $2 AND svc_name = $3 AND file_type = $4",
        )
        .bind(&key.org_id)
        .bind(&key.partner)
        .bind(&key.svc_name)
        .bind(&key.file_type)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &UploadServiceRequestFilter) -> Result<UploadServiceRequestPage, RepositoryError> {
        let built = Self::filtered(LIST_QUERY, filter)
            .sort_by_column("created", Some(filter.sort_direction))
            .sort_by_column("id", None)
            .limit(filter.limit)
            .offset(filter.offset)
            .add_total_query()
            .build();

        let rows = built.query().fetch_all(&self.pool).await?;

        let total = match rows.first() {
            Some(row) => row.try_get("total")?,
            None if filter.offset > 0 => {
                let count = Self::filtered("SELECT count(*) AS total FROM upload_service_requests", filter).build();
                count.query().fetch_one(&self.pool).await?.try_get("total")?
            }
            None => 0,
        };

        let uploads = rows
            .iter()
            .map(parse_upload_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UploadServiceRequestPage { uploads, total })
    }
}

fn parse_upload_row(row: &PgRow) -> Result<UploadServiceRequest, RepositoryError> {
    let status: String = row.try_get("status")?;
    let status = UploadStatus::from_db_str(&status)
        .ok_or_else(|| RepositoryError::Serialization(format!("Unknown upload status '{}'", status)))?;

    Ok(UploadServiceRequest {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        partner: row.try_get("partner")?,
        svc_name: row.try_get("svc_name")?,
        file_type: row.try_get("file_type")?,
        file_id: row.try_get("file_id")?,
        status,
        create_by: row.try_get("create_by")?,
        verify_by: row.try_get("verify_by")?,
        verified: row.try_get("verified")?,
        created: row.try_get("created")?,
        updated: row.try_get("updated")?,
    })
}
