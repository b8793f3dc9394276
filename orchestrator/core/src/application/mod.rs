// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

pub mod repository_factory;
pub mod service_request;
pub mod upload_service_request;

pub use service_request::{
    ServiceRequestError, ServiceRequestService, StandardServiceRequestService, SubmissionOutcome,
    SubmitServiceRequest,
};
pub use upload_service_request::{StandardUploadServiceRequestService, UploadServiceRequestService};
