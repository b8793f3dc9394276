// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

use dsa_enablement_core::application::service_request::{
    ServiceRequestService, StandardServiceRequestService, SubmitServiceRequest,
};
use dsa_enablement_core::domain::events::ServiceRequestEvent;
use dsa_enablement_core::domain::notification::{NotificationSink, ServiceNotification};
use dsa_enablement_core::domain::service_request::{
    Decision, NewServiceRequest, RequestKey, RequestStatus, ServiceRequestFilter, SortColumn,
    SortDirection,
};
use dsa_enablement_core::infrastructure::contact::InMemoryOrgContactResolver;
use dsa_enablement_core::infrastructure::event_bus::EventBus;
use dsa_enablement_core::infrastructure::partner_catalog::StaticPartnerCatalog;
use dsa_enablement_core::infrastructure::repositories::InMemoryServiceRequestRepository;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const ORG: &str = "org-1";
const SVC: &str = "REMITTANCE";

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<ServiceNotification>>,
}

impl NotificationSink for RecordingSink {
    fn dispatch(&self, notification: ServiceNotification) {
        self.sent.lock().push(notification);
    }
}

struct Harness {
    service: StandardServiceRequestService,
    sink: Arc<RecordingSink>,
    event_bus: Arc<EventBus>,
}

fn harness() -> Harness {
    let contacts = InMemoryOrgContactResolver::new();
    contacts.set(ORG, "owner@sari.ph");
    let sink = Arc::new(RecordingSink::default());
    let event_bus = Arc::new(EventBus::new(256));

    let service = StandardServiceRequestService::new(
        Arc::new(InMemoryServiceRequestRepository::new()),
        Arc::new(StaticPartnerCatalog),
        Arc::new(contacts),
        sink.clone(),
        event_bus.clone(),
    );

    Harness {
        service,
        sink,
        event_bus,
    }
}

fn submission(partners: &[&str]) -> SubmitServiceRequest {
    SubmitServiceRequest {
        org_id: ORG.to_string(),
        svc_name: SVC.to_string(),
        company_name: "Sari Store".to_string(),
        partners: partners.iter().map(|p| p.to_string()).collect(),
        all_partners: false,
        updated_by: "merchant".to_string(),
    }
}

fn key(partner: &str) -> RequestKey {
    RequestKey::new(ORG, partner, SVC)
}

fn decision(partner: &str) -> Decision {
    Decision {
        key: key(partner),
        updated_by: "reviewer".to_string(),
        remarks: String::new(),
    }
}

async fn statuses(service: &StandardServiceRequestService) -> Vec<(String, RequestStatus)> {
    let page = service
        .list(&ServiceRequestFilter {
            sort_by: Some(SortColumn::Partner),
            ..ServiceRequestFilter::for_service(ORG, SVC)
        })
        .await
        .unwrap();
    page.requests
        .into_iter()
        .map(|r| (r.partner, r.status))
        .collect()
}

#[tokio::test]
async fn test_resubmitting_same_partner_set_is_idempotent() {
    let h = harness();

    let first = h.service.submit(submission(&["WU", "TF", "RIA"])).await.unwrap();
    let second = h.service.submit(submission(&["WU", "TF", "RIA"])).await.unwrap();

    assert_eq!(first.created.len(), 3);
    assert!(second.created.is_empty());
    assert!(second.removed.is_empty());

    let first_ids: BTreeSet<_> = first.requests.iter().map(|r| r.id).collect();
    let second_ids: BTreeSet<_> = second.requests.iter().map(|r| r.id).collect();
    assert_eq!(first_ids, second_ids);
    assert_eq!(second.requests.len(), 3);
}

#[tokio::test]
async fn test_reconciliation_preserves_in_flight_work() {
    let h = harness();
    h.service.submit(submission(&["WU"])).await.unwrap();
    h.service.apply(ORG, SVC, "ops").await.unwrap();
    h.service.submit(submission(&["WU", "TF"])).await.unwrap();
    assert_eq!(
        statuses(&h.service).await,
        vec![("TF".to_string(), RequestStatus::NoStatus), ("WU".to_string(), RequestStatus::Pending)]
    );

    let outcome = h.service.submit(submission(&["WU"])).await.unwrap();

    assert_eq!(outcome.removed, vec!["TF".to_string()]);
    assert_eq!(statuses(&h.service).await, vec![("WU".to_string(), RequestStatus::Pending)]);
}

#[tokio::test]
async fn test_reconciliation_protects_accepted_work() {
    let h = harness();
    h.service.submit(submission(&["WU"])).await.unwrap();
    h.service.apply(ORG, SVC, "ops").await.unwrap();
    h.service.accept(decision("WU")).await.unwrap();

    let outcome = h.service.submit(submission(&[])).await.unwrap();

    assert!(outcome.removed.is_empty());
    assert_eq!(statuses(&h.service).await, vec![("WU".to_string(), RequestStatus::Accepted)]);
}

#[tokio::test]
async fn test_reconciliation_drops_rejected_and_draft_rows() {
    let h = harness();
    h.service.submit(submission(&["WU", "TF", "RIA"])).await.unwrap();
    h.service.apply(ORG, SVC, "ops").await.unwrap();
    h.service.reject(decision("TF")).await.unwrap();
    h.service
        .set_status(&key("RIA"), RequestStatus::PartnerDraft, "admin")
        .await
        .unwrap();

    let outcome = h.service.submit(submission(&["WU"])).await.unwrap();

    assert_eq!(outcome.removed, vec!["RIA".to_string(), "TF".to_string()]);
    assert_eq!(statuses(&h.service).await, vec![("WU".to_string(), RequestStatus::Pending)]);
}

#[tokio::test]
async fn test_apply_only_advances_advanceable_rows() {
    let h = harness();
    h.service.submit(submission(&["WU", "TF"])).await.unwrap();
    h.service.apply(ORG, SVC, "ops").await.unwrap();
    h.service.accept(decision("WU")).await.unwrap();
    h.service.submit(submission(&["WU", "TF", "RIA"])).await.unwrap();

    let before = h.service.get(&key("TF")).await.unwrap();
    let applied = h.service.apply(ORG, SVC, "ops").await.unwrap();

    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].partner, "RIA");
    assert!(applied[0].applied.is_some());
    assert_eq!(
        statuses(&h.service).await,
        vec![
            ("RIA".to_string(), RequestStatus::Pending),
            ("TF".to_string(), RequestStatus::Pending),
            ("WU".to_string(), RequestStatus::Accepted),
        ]
    );
    assert_eq!(h.service.get(&key("TF")).await.unwrap().applied, before.applied);

    // Nothing eligible the second time
    assert!(h.service.apply(ORG, SVC, "ops").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_completion_notifies_once_per_outcome_group() {
    let h = harness();
    h.service.submit(submission(&["WU", "TF", "RIA"])).await.unwrap();
    h.service.apply(ORG, SVC, "ops").await.unwrap();

    h.service.accept(decision("WU")).await.unwrap();
    assert!(h.sink.sent.lock().is_empty());
    h.service.accept(decision("TF")).await.unwrap();
    assert!(h.sink.sent.lock().is_empty());

    let mut rejection = decision("RIA");
    rejection.remarks = "Missing permit".to_string();
    h.service.reject(rejection).await.unwrap();

    let sent = h.sink.sent.lock().clone();
    assert_eq!(sent.len(), 2);

    let accepted: Vec<_> = sent.iter().filter(|n| n.status == RequestStatus::Accepted).collect();
    let rejected: Vec<_> = sent.iter().filter(|n| n.status == RequestStatus::Rejected).collect();
    assert_eq!(accepted.len(), 1);
    assert_eq!(rejected.len(), 1);

    let accepted_names: BTreeSet<&str> = accepted[0].partner_names.split(", ").collect();
    assert_eq!(accepted_names, BTreeSet::from(["Western Union", "Transfast"]));
    assert_eq!(accepted[0].remark, "Accepted");
    assert_eq!(accepted[0].service_name, SVC);
    assert_eq!(accepted[0].recipient_email, "owner@sari.ph");

    assert_eq!(rejected[0].partner_names, "Ria Money Transfer");
    assert_eq!(rejected[0].remark, "Missing permit");
}

#[tokio::test]
async fn test_repeated_decision_on_complete_set_does_not_renotify() {
    let h = harness();
    h.service.submit(submission(&["WU", "TF"])).await.unwrap();
    h.service.apply(ORG, SVC, "ops").await.unwrap();
    h.service.accept(decision("WU")).await.unwrap();
    h.service.accept(decision("TF")).await.unwrap();
    assert_eq!(h.sink.sent.lock().len(), 1);

    let repeated = h.service.accept(decision("WU")).await.unwrap();
    assert_eq!(repeated.status, RequestStatus::Accepted);
    assert_eq!(h.sink.sent.lock().len(), 1);

    // Same for the rejected group
    h.service.reject(decision("TF")).await.unwrap();
    assert_eq!(h.sink.sent.lock().len(), 2);
    h.service.reject(decision("TF")).await.unwrap();
    assert_eq!(h.sink.sent.lock().len(), 2);
}

#[tokio::test]
async fn test_concurrent_completions_notify_once() {
    let h = Arc::new(harness());
    h.service.submit(submission(&["WU", "TF"])).await.unwrap();
    h.service.apply(ORG, SVC, "ops").await.unwrap();

    let a = {
        let h = h.clone();
        tokio::spawn(async move { h.service.accept(decision("WU")).await })
    };
    let b = {
        let h = h.clone();
        tokio::spawn(async move { h.service.accept(decision("TF")).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Both rows may observe a complete set; the ledger lets only one through
    assert_eq!(h.sink.sent.lock().len(), 1);
}

#[tokio::test]
async fn test_list_filter_sort_and_pagination() {
    let h = harness();
    let rows = [("org-1", "WU"), ("org-2", "WU"), ("org-1", "TF"), ("org-2", "TF"), ("org-1", "RIA")];
    for (org, partner) in rows {
        h.service
            .create(NewServiceRequest {
                org_id: org.to_string(),
                partner: partner.to_string(),
                svc_name: SVC.to_string(),
                company_name: format!("{} Store", org),
                updated_by: "ops".to_string(),
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let by_created = ServiceRequestFilter {
        sort_by: Some(SortColumn::Created),
        sort_direction: SortDirection::Asc,
        ..Default::default()
    };
    let page = h.service.list(&by_created).await.unwrap();
    let order: Vec<(&str, &str)> = page
        .requests
        .iter()
        .map(|r| (r.org_id.as_str(), r.partner.as_str()))
        .collect();
    assert_eq!(order, rows.to_vec());
    assert_eq!(page.total, 5);

    let org1 = h
        .service
        .list(&ServiceRequestFilter {
            org_ids: vec!["org-1".to_string()],
            ..by_created.clone()
        })
        .await
        .unwrap();
    assert_eq!(org1.total, 3);
    assert!(org1.requests.iter().all(|r| r.org_id == "org-1"));

    let window = h
        .service
        .list(&ServiceRequestFilter {
            limit: 2,
            offset: 2,
            ..by_created.clone()
        })
        .await
        .unwrap();
    let window_order: Vec<(&str, &str)> = window
        .requests
        .iter()
        .map(|r| (r.org_id.as_str(), r.partner.as_str()))
        .collect();
    assert_eq!(window_order, vec![rows[2], rows[3]]);
    assert_eq!(window.total, 5);

    let descending = h
        .service
        .list(&ServiceRequestFilter {
            sort_direction: SortDirection::Desc,
            ..by_created
        })
        .await
        .unwrap();
    assert_eq!(descending.requests[0].partner, "RIA");
}

#[tokio::test]
async fn test_company_name_search_is_case_insensitive() {
    let h = harness();
    h.service.submit(submission(&["WU"])).await.unwrap();

    let page = h
        .service
        .list(&ServiceRequestFilter {
            company_name: "sari".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let none = h
        .service
        .list(&ServiceRequestFilter {
            company_name: "bodega".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(none.total, 0);
}

#[tokio::test]
async fn test_remark_round_trip() {
    let h = harness();
    h.service.submit(submission(&["WU"])).await.unwrap();
    h.service.apply(ORG, SVC, "ops").await.unwrap();
    let before = h.service.get(&key("WU")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    h.service
        .add_remark(&key("WU"), "Awaiting bank certificate", "reviewer")
        .await
        .unwrap();

    let page = h.service.list(&ServiceRequestFilter::for_service(ORG, SVC)).await.unwrap();
    let row = &page.requests[0];
    assert_eq!(row.remarks, "Awaiting bank certificate");
    assert_eq!(row.updated_by, "reviewer");
    assert_eq!(row.status, RequestStatus::Pending);
    assert!(row.updated > before.updated);
}

#[tokio::test]
async fn test_enablement_is_independent_of_status() {
    let h = harness();
    h.service.submit(submission(&["WU"])).await.unwrap();

    let enabled = h.service.enable(&key("WU"), "admin").await.unwrap();
    assert!(enabled.enabled);
    assert_eq!(enabled.status, RequestStatus::NoStatus);

    h.service.apply(ORG, SVC, "ops").await.unwrap();
    h.service.accept(decision("WU")).await.unwrap();
    let disabled = h.service.disable(&key("WU"), "admin").await.unwrap();
    assert!(!disabled.enabled);
    assert_eq!(disabled.status, RequestStatus::Accepted);
}

#[tokio::test]
async fn test_transitions_publish_events() {
    let h = harness();
    let mut events = h.event_bus.subscribe_org(ORG);

    h.service.submit(submission(&["WU"])).await.unwrap();
    h.service.apply(ORG, SVC, "ops").await.unwrap();
    h.service.accept(decision("WU")).await.unwrap();

    assert!(matches!(events.recv().await.unwrap(), ServiceRequestEvent::PartnersReconciled { .. }));
    assert!(matches!(events.recv().await.unwrap(), ServiceRequestEvent::RequestsApplied { .. }));
    assert!(matches!(
        events.recv().await.unwrap(),
        ServiceRequestEvent::RequestDecided { status: RequestStatus::Accepted, .. }
    ));
    match events.recv().await.unwrap() {
        ServiceRequestEvent::ResolutionNotified { partners, status, .. } => {
            assert_eq!(status, RequestStatus::Accepted);
            assert_eq!(partners, vec!["WU".to_string()]);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_grouped_summary_reports_counts() {
    let h = harness();
    h.service.submit(submission(&["WU", "TF"])).await.unwrap();
    h.service.apply(ORG, SVC, "ops").await.unwrap();
    h.service.reject(decision("TF")).await.unwrap();

    let page = h
        .service
        .list_grouped(&ServiceRequestFilter::for_service(ORG, SVC))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    let summary = &page.summaries[0];
    assert_eq!(summary.partners, vec!["TF".to_string(), "WU".to_string()]);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.company_name, "Sari Store");
}
