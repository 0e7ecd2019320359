//! Integration test: outbound proof requests and serialized updates of one
//! contact's record.

use std::collections::BTreeMap;
use std::sync::Arc;

use vouch_core::{ContactId, ProofResultRecord, VerificationStatus};
use vouch_decision::{
    AgentEffect, Decision, DecisionError, RecordStore, StaticDefinitionSource,
};
use vouch_integration_tests::{
    engine_config, lab_event, now, vaccination_event, Harness, HOUR, NOW_SECS,
};

// =========================================================================
// Requesting presentations
// =========================================================================

#[tokio::test]
async fn test_request_presentations_marks_every_descriptor_pending() {
    let h = Harness::new();

    let mut stale = ProofResultRecord::new(Some("trusted-traveler-v1".into()));
    stale.upsert(
        "Lab_Result",
        Some(false),
        BTreeMap::from([("lab_result".to_string(), "Positive".to_string())]),
    );
    stale.status = VerificationStatus::Rejected;
    h.store.save_results(&h.contact, &stale).await.unwrap();

    let exchanges = h.engine.request_presentations(&h.connection).await.unwrap();
    assert_eq!(exchanges, vec!["pex-1", "pex-2"]);

    let record = h.store.record(&h.contact).unwrap();
    assert_eq!(record.status, VerificationStatus::Pending);
    for name in ["Lab_Result", "Vaccination"] {
        let entry = record.entry(name).unwrap();
        assert_eq!(entry.result, None);
        assert!(entry.presentation.is_empty());
    }

    let requested: Vec<String> = h
        .agent
        .effects()
        .await
        .into_iter()
        .filter_map(|e| match e {
            AgentEffect::ProofRequested { request } => Some(request.proof_request.name),
            _ => None,
        })
        .collect();
    assert_eq!(requested, vec!["Lab_Result", "Vaccination"]);
}

#[tokio::test]
async fn test_request_resets_record_of_previous_definition() {
    let h = Harness::new();
    let mut old = ProofResultRecord::new(Some("older-definition".into()));
    old.mark_requested("Passport");
    h.store.save_results(&h.contact, &old).await.unwrap();

    h.engine.request_presentations(&h.connection).await.unwrap();

    let record = h.store.record(&h.contact).unwrap();
    assert_eq!(record.definition_id.as_deref(), Some("trusted-traveler-v1"));
    assert!(record.entry("Passport").is_none());
    assert_eq!(record.presentations.len(), 2);
}

#[tokio::test]
async fn test_definition_fetch_failure_writes_nothing() {
    let h = Harness::with(engine_config(), Arc::new(StaticDefinitionSource::unavailable()));

    let result = h.engine.request_presentations(&h.connection).await;
    assert!(matches!(result, Err(DecisionError::DefinitionFetch(_))));
    assert!(h.store.record(&h.contact).is_none());
    assert!(h.agent.effects().await.is_empty());
}

#[tokio::test]
async fn test_store_outage_surfaces_as_error_without_effects() {
    let h = Harness::new();
    h.store.set_offline(true);

    let result = h.engine.request_presentations(&h.connection).await;
    assert!(matches!(result, Err(DecisionError::Store(_))));

    let event = lab_event(&h.connection, "Negative", NOW_SECS - HOUR);
    let result = h.engine.process_at(&event, now()).await;
    assert!(matches!(result, Err(DecisionError::Store(_))));
    assert!(h.agent.effects().await.is_empty());
}

#[tokio::test]
async fn test_identity_request_lists_identity_attributes() {
    let h = Harness::new();
    let exchange = h.engine.request_identity(&h.connection).await;
    assert_eq!(exchange.as_deref(), Some("pex-1"));

    let effects = h.agent.effects().await;
    let Some(AgentEffect::ProofRequested { request }) = effects.first() else {
        panic!("expected a proof request, got {:?}", effects);
    };
    assert_eq!(request.proof_request.name, "Proof request");
    assert!(request.proof_request.requested_attributes.contains_key("passport_number"));
    assert!(request.proof_request.requested_predicates.is_empty());
    // Identity requests leave result records alone
    assert!(h.store.record(&h.contact).is_none());
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test]
async fn test_concurrent_proofs_for_one_contact_are_not_lost() {
    let h = Harness::new();
    let lab = lab_event(&h.connection, "Negative", NOW_SECS - HOUR);
    let vaccination = vaccination_event(&h.connection, "true", "ASZ");

    let (a, b) = tokio::join!(
        h.engine.process_at(&lab, now()),
        h.engine.process_at(&vaccination, now())
    );
    assert!(matches!(a.unwrap(), Decision::Verified { .. }));
    assert!(matches!(b.unwrap(), Decision::Verified { .. }));

    let record = h.store.record(&h.contact).unwrap();
    assert_eq!(record.result("Lab_Result"), Some(true));
    assert_eq!(record.result("Vaccination"), Some(true));
}

#[tokio::test]
async fn test_contacts_are_isolated() {
    let h = Harness::new();
    let bob_connection = vouch_core::ConnectionId::new("conn-2");
    let bob = ContactId::new("bob");
    h.store.link(bob_connection.clone(), bob.clone());

    let alice_proof = lab_event(&h.connection, "Negative", NOW_SECS - HOUR);
    let bob_proof = lab_event(&bob_connection, "Positive", NOW_SECS - HOUR);
    let (a, b) = tokio::join!(
        h.engine.process_at(&alice_proof, now()),
        h.engine.process_at(&bob_proof, now())
    );
    assert!(matches!(a.unwrap(), Decision::Verified { .. }));
    assert!(matches!(b.unwrap(), Decision::Inconclusive { .. }));

    assert_eq!(h.store.record(&h.contact).unwrap().result("Lab_Result"), Some(true));
    assert_eq!(h.store.record(&bob).unwrap().result("Lab_Result"), Some(false));
}
