// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0
//! Upload Service Request Service
//!
//! Submit / verify flow for supporting documents attached to a service
//! request. Shares the error taxonomy of the request lifecycle.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::application::service_request::{map_repository_error, ServiceRequestError};
use crate::domain::repository::UploadServiceRequestRepository;
use crate::domain::upload_request::{
    NewUploadServiceRequest, UploadKey, UploadServiceRequest, UploadServiceRequestFilter,
    UploadServiceRequestPage,
};

#[async_trait]
pub trait UploadServiceRequestService: Send + Sync {
    /// Strict create; duplicates are a `Conflict`.
    async fn create(&self, request: NewUploadServiceRequest) -> Result<UploadServiceRequest, ServiceRequestError>;

    /// Create, or replace the file of an existing upload and reset its verification.
    async fn add(&self, request: NewUploadServiceRequest) -> Result<UploadServiceRequest, ServiceRequestError>;

    async fn accept(&self, key: &UploadKey, verify_by: &str) -> Result<UploadServiceRequest, ServiceRequestError>;

    async fn reject(&self, key: &UploadKey, verify_by: &str) -> Result<UploadServiceRequest, ServiceRequestError>;

    async fn remove(&self, key: &UploadKey) -> Result<bool, ServiceRequestError>;

    async fn list(&self, filter: &UploadServiceRequestFilter) -> Result<UploadServiceRequestPage, ServiceRequestError>;
}

pub struct StandardUploadServiceRequestService {
    repository: Arc<dyn UploadServiceRequestRepository>,
}

impl StandardUploadServiceRequestService {
    pub fn new(repository: Arc<dyn UploadServiceRequestRepository>) -> Self {
        Self { repository }
    }
}

fn validate(key: &UploadKey) -> Result<(), ServiceRequestError> {
    match key.missing_field() {
        Some(field) => Err(ServiceRequestError::InvalidArgument(format!("{} is required", field))),
        None => Ok(()),
    }
}

fn validate_new(request: &NewUploadServiceRequest) -> Result<(), ServiceRequestError> {
    validate(&request.key)?;
    if request.file_id.trim().is_empty() {
        return Err(ServiceRequestError::InvalidArgument("file_id is required".to_string()));
    }
    Ok(())
}

#[async_trait]
impl UploadServiceRequestService for StandardUploadServiceRequestService {
    async fn create(&self, request: NewUploadServiceRequest) -> Result<UploadServiceRequest, ServiceRequestError> {
        validate_new(&request)?;
        let key = &request.key;
        self.repository
            .create(&request)
            .await
            .map_err(|e| map_repository_error("create_upload", &key.org_id, &key.partner, &key.svc_name, e))
    }

    async fn add(&self, request: NewUploadServiceRequest) -> Result<UploadServiceRequest, ServiceRequestError> {
        validate_new(&request)?;
        let key = &request.key;
        let upload = self
            .repository
            .add(&request)
            .await
            .map_err(|e| map_repository_error("add_upload", &key.org_id, &key.partner, &key.svc_name, e))?;

        info!(org_id = %key.org_id, partner = %key.partner, svc_name = %key.svc_name, file_type = %key.file_type, "Upload submitted");
        Ok(upload)
    }

    async fn accept(&self, key: &UploadKey, verify_by: &str) -> Result<UploadServiceRequest, ServiceRequestError> {
        validate(key)?;
        let upload = self
            .repository
            .accept(key, verify_by)
            .await
            .map_err(|e| map_repository_error("accept_upload", &key.org_id, &key.partner, &key.svc_name, e))?;
        metrics::counter!("dsa_service_request_transitions_total", "transition" => "accept_upload").increment(1);
        Ok(upload)
    }

    async fn reject(&self, key: &UploadKey, verify_by: &str) -> Result<UploadServiceRequest, ServiceRequestError> {
        validate(key)?;
        let upload = self
            .repository
            .reject(key, verify_by)
            .await
            .map_err(|e| map_repository_error("reject_upload", &key.org_id, &key.partner, &key.svc_name, e))?;
        metrics::counter!("dsa_service_request_transitions_total", "transition" => "reject_upload").increment(1);
        Ok(upload)
    }

    async fn remove(&self, key: &UploadKey) -> Result<bool, ServiceRequestError> {
        validate(key)?;
        self.repository
            .remove(key)
            .await
            .map_err(|e| map_repository_error("remove_upload", &key.org_id, &key.partner, &key.svc_name, e))
    }

    async fn list(&self, filter: &UploadServiceRequestFilter) -> Result<UploadServiceRequestPage, ServiceRequestError> {
        if filter.limit < 0 || filter.offset < 0 {
            return Err(ServiceRequestError::InvalidArgument("limit and offset must not be negative".to_string()));
        }
        self.repository
            .list(filter)
            .await
            .map_err(|e| map_repository_error("list_uploads", &filter.org_ids.join(","), "", &filter.svc_names.join(","), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::upload_request::UploadStatus;
    use crate::infrastructure::repositories::InMemoryUploadServiceRequestRepository;

    fn service() -> StandardUploadServiceRequestService {
        StandardUploadServiceRequestService::new(Arc::new(InMemoryUploadServiceRequestRepository::new()))
    }

    fn upload(file_type: &str, file_id: &str) -> NewUploadServiceRequest {
        NewUploadServiceRequest {
            key: UploadKey::new("org-1", "WU", "REMITTANCE", file_type),
            file_id: file_id.to_string(),
            create_by: "merchant".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_id_is_invalid() {
        let err = service().add(upload("DTI", " ")).await.unwrap_err();
        assert!(matches!(err, ServiceRequestError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_verify_missing_upload_is_not_found() {
        let key = UploadKey::new("org-1", "WU", "REMITTANCE", "DTI");
        let err = service().accept(&key, "reviewer").await.unwrap_err();
        assert!(matches!(err, ServiceRequestError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_filter_by_status() {
        let svc = service();
        svc.add(upload("DTI", "f-1")).await.unwrap();
        svc.add(upload("BIR2303", "f-2")).await.unwrap();
        svc.accept(&UploadKey::new("org-1", "WU", "REMITTANCE", "DTI"), "reviewer")
            .await
            .unwrap();

        let filter = UploadServiceRequestFilter {
            statuses: vec![UploadStatus::Submitted],
            ..Default::default()
        };
        let page = svc.list(&filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.uploads[0].file_type, "BIR2303");
    }
}
