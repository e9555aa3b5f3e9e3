//! Integration tests for the full mutation pipeline.
//!
//! These tests drive `WorkItemEngine` end to end over a seeded
//! `MockRemote`, verifying patch assembly, parent inheritance, relation
//! deduplication, submission addressing, and diagnostic enrichment.

use clevis::{CreateWorkItemRequest, RequiredFieldsPolicy, UpdateWorkItemRequest, WorkItemEngine};
use clevis_remote::{
    MockRemote, PatchOp, PatchOperation, PatchOutcome, PatchTarget, WorkItem,
};
use serde_json::json;
use std::sync::Arc;

fn work_item(id: u64, fields: serde_json::Value) -> WorkItem {
    serde_json::from_value(json!({
        "id": id,
        "url": format!("https://example.test/org/ProjectX/_apis/wit/workItems/{id}"),
        "fields": fields,
    }))
    .unwrap()
}

fn engine_over(remote: Arc<MockRemote>) -> WorkItemEngine {
    WorkItemEngine::new(remote, RequiredFieldsPolicy::builtin())
}

fn create_request(title: &str) -> CreateWorkItemRequest {
    CreateWorkItemRequest {
        project: Some("ProjectX".to_string()),
        work_item_type: "Task".to_string(),
        title: Some(title.to_string()),
        ..Default::default()
    }
}

// ========== Create ==========

#[tokio::test]
async fn test_create_with_title_only_submits_one_op() {
    let remote = Arc::new(MockRemote::new());
    let engine = engine_over(Arc::clone(&remote));

    let response = engine.create(&create_request("Fix bug")).await.unwrap();
    assert!(response.outcome.is_success());
    assert!(response.diagnostic.is_none());

    let submissions = remote.submissions();
    assert_eq!(submissions.len(), 1);
    let (target, ops, _) = &submissions[0];
    assert_eq!(
        *target,
        PatchTarget::New {
            project: "ProjectX".to_string(),
            type_name: "Task".to_string(),
        }
    );
    assert_eq!(
        *ops,
        vec![PatchOperation::add_field("System.Title", json!("Fix bug"))]
    );
}

#[tokio::test]
async fn test_create_inherits_classification_from_parent() {
    let remote = Arc::new(MockRemote::new().with_work_item(work_item(
        123,
        json!({
            "System.AreaPath": "ProjectX\\TeamA",
            "System.IterationPath": "ProjectX\\Sprint1",
        }),
    )));
    let engine = engine_over(Arc::clone(&remote));

    let request = CreateWorkItemRequest {
        parent_id: Some(123),
        project: None,
        ..create_request("Child task")
    };
    let response = engine.create(&request).await.unwrap();
    assert!(response.outcome.is_success());

    let (target, ops, _) = remote.submissions().remove(0);
    // Project derived from the parent's canonical URL.
    assert_eq!(
        target,
        PatchTarget::New {
            project: "ProjectX".to_string(),
            type_name: "Task".to_string(),
        }
    );

    assert!(ops.contains(&PatchOperation::add_field(
        "System.AreaPath",
        json!("ProjectX\\TeamA")
    )));
    assert!(ops.contains(&PatchOperation::add_field(
        "System.IterationPath",
        json!("ProjectX\\Sprint1")
    )));

    let links: Vec<_> = ops
        .iter()
        .filter(|op| op.path == "/relations/-")
        .collect();
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].value,
        Some(json!({
            "rel": "System.LinkTypes.Hierarchy-Reverse",
            "url": "https://example.test/org/ProjectX/_apis/wit/workItems/123",
        }))
    );
}

#[tokio::test]
async fn test_explicit_area_wins_over_parent_inheritance() {
    let remote = Arc::new(MockRemote::new().with_work_item(work_item(
        123,
        json!({"System.AreaPath": "ProjectX\\Y"}),
    )));
    let engine = engine_over(Arc::clone(&remote));

    let request = CreateWorkItemRequest {
        parent_id: Some(123),
        area_path: Some("ProjectX\\X".to_string()),
        ..create_request("Child")
    };
    engine.create(&request).await.unwrap();

    let (_, ops, _) = remote.submissions().remove(0);
    let area_ops: Vec<_> = ops
        .iter()
        .filter(|op| op.path == "/fields/System.AreaPath")
        .collect();
    assert_eq!(area_ops.len(), 1);
    assert_eq!(area_ops[0].value, Some(json!("ProjectX\\X")));
}

#[tokio::test]
async fn test_create_fills_policy_default_and_reports_the_rest() {
    let policy = RequiredFieldsPolicy::from_yaml_str(
        r#"
universal: [System.Title]
types:
  Task: [Custom.Origin, Custom.Squad]
defaults:
  Custom.Origin: backlog
"#,
    )
    .unwrap();
    let remote = Arc::new(MockRemote::new().with_outcome(PatchOutcome::classify(json!({
        "customProperties": {"RuleValidationErrors": [{
            "fieldRefName": "Custom.Squad",
            "errorMessage": "Field is required.",
            "fieldStatusFlags": "required"
        }]}
    }))));
    let engine = WorkItemEngine::new(remote.clone(), policy);

    let response = engine.create(&create_request("t")).await.unwrap();

    // The default was auto-filled into the submitted document.
    let (_, ops, _) = remote.submissions().remove(0);
    assert!(ops.contains(&PatchOperation::add_field("Custom.Origin", json!("backlog"))));

    // The field without a default shows up in both diagnostic passes:
    // the structural scan and the enriched server report.
    let diagnostic = response.diagnostic.unwrap();
    assert!(diagnostic.contains("without a known default: Custom.Squad"));
    assert!(diagnostic.contains("Custom.Squad: Field is required."));
    assert!(diagnostic.contains("Suggested additional fields to supply:"));
}

#[tokio::test]
async fn test_create_flags_are_forwarded() {
    let remote = Arc::new(MockRemote::new());
    let engine = engine_over(Arc::clone(&remote));

    let request = CreateWorkItemRequest {
        validate_only: true,
        suppress_notifications: true,
        ..create_request("t")
    };
    engine.create(&request).await.unwrap();

    let (_, _, flags) = remote.submissions().remove(0);
    assert!(flags.validate_only);
    assert!(flags.suppress_notifications);
    assert!(!flags.bypass_rules);
}

// ========== Relations ==========

#[tokio::test]
async fn test_duplicate_relation_specs_produce_one_op() {
    let remote = Arc::new(
        MockRemote::new().with_work_item(work_item(45, json!({}))),
    );
    let engine = engine_over(Arc::clone(&remote));

    let request = CreateWorkItemRequest {
        relations: Some(vec![
            "Related:45:note".to_string(),
            "Related:45:note".to_string(),
        ]),
        ..create_request("t")
    };
    engine.create(&request).await.unwrap();

    let (_, ops, _) = remote.submissions().remove(0);
    let relation_ops: Vec<_> = ops.iter().filter(|op| op.path == "/relations/-").collect();
    assert_eq!(relation_ops.len(), 1);
    assert_eq!(
        relation_ops[0].value.as_ref().unwrap()["attributes"]["comment"],
        "note"
    );
}

#[tokio::test]
async fn test_unresolvable_relation_degrades_gracefully() {
    let remote = Arc::new(
        MockRemote::new().with_work_item(work_item(45, json!({}))),
    );
    let engine = engine_over(Arc::clone(&remote));

    let request = CreateWorkItemRequest {
        relations: Some(vec!["Related:45".to_string(), "Related:888".to_string()]),
        ..create_request("t")
    };
    let response = engine.create(&request).await.unwrap();
    assert!(response.outcome.is_success());

    let (_, ops, _) = remote.submissions().remove(0);
    let relation_ops: Vec<_> = ops.iter().filter(|op| op.path == "/relations/-").collect();
    assert_eq!(relation_ops.len(), 1);
}

// ========== Update ==========

#[tokio::test]
async fn test_update_addresses_existing_item_and_removes_fields() {
    let remote = Arc::new(MockRemote::new());
    let engine = engine_over(Arc::clone(&remote));

    let request = UpdateWorkItemRequest {
        id: 42,
        state: Some("Active".to_string()),
        remove: Some("System.Tags".to_string()),
        ..Default::default()
    };
    engine.update(&request).await.unwrap();

    let (target, ops, _) = remote.submissions().remove(0);
    assert_eq!(target, PatchTarget::Existing(42));
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0], PatchOperation::add_field("System.State", json!("Active")));
    assert_eq!(ops[1].op, PatchOp::Remove);
    assert!(ops[1].value.is_none());
}

#[tokio::test]
async fn test_update_enrichment_resolves_type_lazily() {
    // The soft failure response carries no type; the enricher fetches it
    // from the entity, once.
    let remote = Arc::new(
        MockRemote::new()
            .with_work_item(work_item(42, json!({"System.WorkItemType": "Bug"})))
            .with_type_fields("Bug", vec![])
            .with_outcome(PatchOutcome::classify(json!({
                "customProperties": {"RuleValidationErrors": [{
                    "fieldRefName": "Custom.Severity",
                    "errorMessage": "Field is required.",
                    "fieldStatusFlags": "required"
                }]}
            }))),
    );
    let engine = engine_over(Arc::clone(&remote));

    let request = UpdateWorkItemRequest {
        id: 42,
        title: Some("t".to_string()),
        ..Default::default()
    };
    let response = engine.update(&request).await.unwrap();

    let diagnostic = response.diagnostic.unwrap();
    assert!(diagnostic.contains("Custom.Severity"));
    assert_eq!(remote.calls().fetch_work_item, 1);
    assert_eq!(remote.calls().fetch_type_fields, 1);
}

// ========== Failure shapes ==========

#[tokio::test]
async fn test_transport_error_passes_through_unenriched() {
    let remote = Arc::new(MockRemote::new().with_outcome(PatchOutcome::TransportError {
        status: 401,
        message: "unauthorized".to_string(),
    }));
    let engine = engine_over(Arc::clone(&remote));

    let response = engine.create(&create_request("t")).await.unwrap();
    assert_eq!(
        response.outcome,
        PatchOutcome::TransportError {
            status: 401,
            message: "unauthorized".to_string(),
        }
    );
    assert!(response.diagnostic.is_none());
    // No metadata lookups happen for transport failures.
    assert_eq!(remote.calls().fetch_type_fields, 0);
    assert_eq!(remote.calls().fetch_global_field, 0);
}

#[tokio::test]
async fn test_soft_failure_keeps_payload_and_adds_diagnostic() {
    let payload = json!({
        "id": 77,
        "rev": 3,
        "customProperties": {"RuleValidationErrors": [{
            "fieldRefName": "Custom.TipoDeHistoria",
            "errorMessage": "Field is required.",
            "fieldStatusFlags": "required"
        }]}
    });
    let remote = Arc::new(
        MockRemote::new().with_outcome(PatchOutcome::classify(payload.clone())),
    );
    let engine = engine_over(Arc::clone(&remote));

    let response = engine.create(&create_request("t")).await.unwrap();

    // The original payload is untouched; diagnostics ride alongside.
    match &response.outcome {
        PatchOutcome::SoftFailure { payload: kept, .. } => assert_eq!(*kept, payload),
        other => panic!("expected soft failure, got {other:?}"),
    }

    let flat = response.into_json();
    assert_eq!(flat["rev"], json!(3));
    assert!(flat["diagnostic"]
        .as_str()
        .unwrap()
        .contains("Custom.TipoDeHistoria"));
}
