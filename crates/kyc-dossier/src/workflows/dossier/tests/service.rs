use super::common::*;
use crate::auth::TenantContext;
use crate::document::DocumentKind;
use crate::registry::SourceStatus;
use crate::risk::RiskLevel;
use crate::store::{PageRequest, RepositoryError};
use crate::workflows::dossier::{
    BatchItemOutcome, CreateDossier, DecisionRequest, DecisionStatus, DossierId,
    DossierRepository, DossierServiceError,
};

fn analyst(tenant_id: &str) -> TenantContext {
    TenantContext {
        user_id: "analyst-1".to_string(),
        tenant_id: tenant_id.to_string(),
        email: None,
    }
}

fn create_request(document: &str) -> CreateDossier {
    CreateDossier {
        document: document.to_string(),
        ..CreateDossier::default()
    }
}

#[tokio::test]
async fn create_stores_registry_name_and_low_risk_for_active_company() {
    let harness = build_service();

    let summary = harness
        .service
        .create("tenant-a", create_request(COMPANY))
        .await
        .expect("dossier created");

    assert_eq!(summary.entity_name, "ACME INDUSTRIA LTDA");
    assert_eq!(summary.risk_level, RiskLevel::Low);
    assert_eq!(summary.document, COMPANY_DIGITS);
    assert_eq!(summary.doc_type, DocumentKind::Organization);

    let stored = harness
        .repository
        .fetch("tenant-a", &summary.dossier_id)
        .await
        .expect("fetch succeeds")
        .expect("dossier stored");
    assert_eq!(stored.decision_status, DecisionStatus::Pending);
    assert_eq!(stored.report.technical_report.sources.primary_registry, SourceStatus::Ok);
    assert_eq!(
        stored.report.technical_report.sources.postal_lookup,
        SourceStatus::NotQueried
    );
    assert!(stored.report.narrative.is_none());
}

#[tokio::test]
async fn sanctioned_person_is_high_risk_with_placeholder_name() {
    let harness = build_service();
    harness.upstreams.sanctions.set_hits(PERSON_DIGITS, 2);

    let summary = harness
        .service
        .create("tenant-a", create_request(PERSON))
        .await
        .expect("dossier created");

    assert_eq!(summary.risk_level, RiskLevel::High);
    assert_eq!(summary.entity_name, format!("CPF {PERSON_DIGITS}"));
    assert!(
        harness.upstreams.registry.lookups().is_empty(),
        "person checks skip the company registries"
    );

    let dossier = harness
        .service
        .get("tenant-a", &summary.dossier_id)
        .await
        .expect("dossier readable");
    assert_eq!(dossier.report.total_sanctions, 2);
}

#[tokio::test]
async fn enable_ai_attaches_generated_narrative() {
    let harness = build_service();

    let summary = harness
        .service
        .create(
            "tenant-a",
            CreateDossier {
                document: COMPANY.to_string(),
                enable_ai: true,
                cep: None,
            },
        )
        .await
        .expect("dossier created");

    let dossier = harness
        .service
        .get("tenant-a", &summary.dossier_id)
        .await
        .expect("dossier readable");
    assert_eq!(
        dossier.report.narrative.as_deref(),
        Some("Recommendation: Approve")
    );
    let prompts = harness.upstreams.narrative.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(&format!("Document: {COMPANY_DIGITS} (CNPJ)")));
}

#[tokio::test]
async fn invalid_document_fails_before_any_lookup() {
    let harness = build_service();

    match harness.service.create("tenant-a", create_request("123")).await {
        Err(DossierServiceError::AggregationFailed(_)) => {}
        other => panic!("expected aggregation failure, got {other:?}"),
    }
    assert_eq!(harness.upstreams.sanctions.searches(), 0);
}

#[tokio::test]
async fn get_is_scoped_to_the_tenant() {
    let harness = build_service();
    let summary = harness
        .service
        .create("tenant-a", create_request(COMPANY))
        .await
        .expect("dossier created");

    match harness.service.get("tenant-b", &summary.dossier_id).await {
        Err(DossierServiceError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn check_duplicate_matches_on_digits_only() {
    let harness = build_service();
    let summary = harness
        .service
        .create("tenant-a", create_request(COMPANY))
        .await
        .expect("dossier created");

    let existing = harness
        .service
        .check_duplicate("tenant-a", COMPANY_DIGITS)
        .await
        .expect("lookup succeeds");
    assert_eq!(existing, Some(summary.dossier_id));

    let elsewhere = harness
        .service
        .check_duplicate("tenant-b", COMPANY)
        .await
        .expect("lookup succeeds");
    assert_eq!(elsewhere, None);

    let blank = harness
        .service
        .check_duplicate("tenant-a", "--")
        .await
        .expect("lookup succeeds");
    assert_eq!(blank, None);
}

#[tokio::test]
async fn decision_is_recorded_and_can_be_replaced() {
    let harness = build_service();
    let summary = harness
        .service
        .create("tenant-a", create_request(COMPANY))
        .await
        .expect("dossier created");
    let tenant = analyst("tenant-a");

    let rejected = harness
        .service
        .record_decision(
            &tenant,
            &summary.dossier_id,
            DecisionRequest {
                opinion: "Registry data inconsistent".to_string(),
                approved: false,
                justification: Some("Address mismatch".to_string()),
            },
        )
        .await
        .expect("decision recorded");
    assert_eq!(rejected.decision_status, DecisionStatus::Rejected);
    assert_eq!(rejected.decided_by.as_deref(), Some("analyst-1"));
    assert_eq!(
        rejected.rejection_justification.as_deref(),
        Some("Address mismatch")
    );

    let approved = harness
        .service
        .record_decision(
            &tenant,
            &summary.dossier_id,
            DecisionRequest {
                opinion: "Resolved after review".to_string(),
                approved: true,
                justification: Some("   ".to_string()),
            },
        )
        .await
        .expect("decision replaced");
    assert_eq!(approved.decision_status, DecisionStatus::Approved);
    assert!(approved.approved);
    assert_eq!(approved.rejection_justification, None);
    assert_eq!(
        approved.compliance_opinion.as_deref(),
        Some("Resolved after review")
    );
}

#[tokio::test]
async fn decision_on_unknown_dossier_is_not_found() {
    let harness = build_service();

    let result = harness
        .service
        .record_decision(
            &analyst("tenant-a"),
            &DossierId::generate(),
            DecisionRequest {
                opinion: "n/a".to_string(),
                approved: true,
                justification: None,
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(DossierServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[tokio::test]
async fn batch_reports_duplicates_with_existing_id_and_continues() {
    let harness = build_service();
    let existing = harness
        .service
        .create("tenant-a", create_request(COMPANY))
        .await
        .expect("dossier created");

    let report = harness
        .service
        .process_batch(
            "tenant-a",
            vec![
                COMPANY.to_string(),
                "12".to_string(),
                PERSON.to_string(),
            ],
            false,
        )
        .await;

    assert_eq!(report.total, 3);
    assert_eq!(report.success_count, 1);
    assert_eq!(report.error_count, 2);

    match &report.items[0].outcome {
        BatchItemOutcome::Failed { error, existing_id } => {
            assert_eq!(error, "dossier already exists");
            assert_eq!(*existing_id, Some(existing.dossier_id));
        }
        other => panic!("expected duplicate failure, got {other:?}"),
    }
    assert!(matches!(
        report.items[1].outcome,
        BatchItemOutcome::Failed {
            existing_id: None,
            ..
        }
    ));
    assert!(matches!(
        report.items[2].outcome,
        BatchItemOutcome::Created {
            risk_level: RiskLevel::Low,
            ..
        }
    ));

    let page = harness
        .service
        .list("tenant-a", PageRequest::default())
        .await
        .expect("list succeeds");
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn list_pages_newest_first() {
    let harness = build_service();
    for document in [COMPANY, PERSON] {
        harness
            .service
            .create("tenant-a", create_request(document))
            .await
            .expect("dossier created");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let page = harness
        .service
        .list("tenant-a", PageRequest::new(Some(1), Some(1)))
        .await
        .expect("list succeeds");

    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].document, PERSON_DIGITS);
}

#[tokio::test]
async fn batch_pauses_only_between_items_that_query_upstream() {
    let delay = std::time::Duration::from_millis(300);
    let harness = build_service_with_delay(delay);
    harness
        .service
        .create("tenant-a", create_request(COMPANY))
        .await
        .expect("dossier created");

    let started = std::time::Instant::now();
    let report = harness
        .service
        .process_batch(
            "tenant-a",
            vec![COMPANY.to_string(), COMPANY.to_string(), PERSON.to_string()],
            false,
        )
        .await;
    assert_eq!(report.success_count, 1);
    assert_eq!(report.error_count, 2);
    assert!(started.elapsed() < delay, "duplicates should not trigger a pause");

    let started = std::time::Instant::now();
    let report = harness
        .service
        .process_batch(
            "tenant-b",
            vec![COMPANY.to_string(), PERSON.to_string()],
            false,
        )
        .await;
    assert_eq!(report.success_count, 2);
    assert!(started.elapsed() >= delay);
}
