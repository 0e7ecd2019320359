//! Integration test: proof events through triage, descriptor evaluation,
//! business rules and the resulting agent effects.

use std::collections::BTreeMap;
use std::sync::Arc;

use vouch_core::{NoticeCode, ProofResultRecord, VerificationStatus};
use vouch_decision::{
    AgentEffect, Decision, RecordStore, RejectReason, StaticDefinitionSource,
};
use vouch_integration_tests::{
    engine_config, lab_event, now, proof_event, travel_definition, vaccination_event, Harness,
    DAY, HOUR, LAB_SCHEMA, NOW_SECS,
};

// =========================================================================
// Lab result scenario
// =========================================================================

#[tokio::test]
async fn test_negative_recent_lab_result_issues_credential() {
    let h = Harness::new();
    let event = lab_event(&h.connection, "Negative", NOW_SECS - 2 * HOUR);

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    assert!(matches!(decision, Decision::Verified { .. }));

    let record = h.store.record(&h.contact).unwrap();
    assert_eq!(record.status, VerificationStatus::Verified);
    assert_eq!(record.result("Lab_Result"), Some(true));
    assert_eq!(
        record.entry("Lab_Result").unwrap().presentation["lab_result"],
        "Negative"
    );

    let effects = h.agent.effects().await;
    let Some(AgentEffect::CredentialIssued { offer }) = effects.first() else {
        panic!("expected issuance, got {:?}", effects);
    };
    assert_eq!(offer.connection_id, h.connection);
    assert_eq!(offer.schema_name, "Trusted_Traveler");
    assert!(offer
        .attributes
        .iter()
        .any(|a| a.name == "traveler_given_names" && a.value == "Jane"));
}

#[tokio::test]
async fn test_positive_lab_result_leaves_vaccination_open() {
    let h = Harness::new();
    let event = lab_event(&h.connection, "Positive", NOW_SECS - 2 * HOUR);

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    assert!(matches!(decision, Decision::Inconclusive { .. }));

    let record = h.store.record(&h.contact).unwrap();
    assert_eq!(record.result("Lab_Result"), Some(false));
    assert_eq!(record.status, VerificationStatus::Pending);
    // Vaccination can still satisfy the requirement, so no notice yet
    assert!(h.agent.notices().await.is_empty());
}

#[tokio::test]
async fn test_stale_lab_sample_fails_rule() {
    let h = Harness::new();
    let event = lab_event(&h.connection, "Negative", NOW_SECS - 73 * HOUR);

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    assert!(matches!(decision, Decision::Inconclusive { .. }));
    assert_eq!(h.store.record(&h.contact).unwrap().result("Lab_Result"), Some(false));
}

#[tokio::test]
async fn test_failure_with_no_alternative_left_rejects() {
    let h = Harness::new();

    let mut seeded = ProofResultRecord::new(Some("trusted-traveler-v1".into()));
    seeded.upsert(
        "Vaccination",
        Some(false),
        BTreeMap::from([("vaccine_series_complete".to_string(), "false".to_string())]),
    );
    h.store.save_results(&h.contact, &seeded).await.unwrap();

    let event = lab_event(&h.connection, "Positive", NOW_SECS - HOUR);
    let decision = h.engine.process_at(&event, now()).await.unwrap();

    match decision {
        Decision::Rejected {
            reason: RejectReason::DescriptorFailed { descriptor, .. },
        } => assert_eq!(descriptor, "Lab_Result"),
        other => panic!("expected descriptor failure, got {:?}", other),
    }
    assert_eq!(h.agent.notices().await, vec![NoticeCode::InvalidProof]);

    let record = h.store.record(&h.contact).unwrap();
    assert_eq!(record.status, VerificationStatus::Rejected);
    assert_eq!(record.result("Lab_Result"), Some(false));
    // The other descriptor's entry is untouched
    assert_eq!(record.entry("Vaccination"), seeded.entry("Vaccination"));
}

// =========================================================================
// Vaccination scenario
// =========================================================================

#[tokio::test]
async fn test_vaccination_with_predicate_date_verifies() {
    let h = Harness::new();
    let event = vaccination_event(&h.connection, "true", "MOD");

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    assert!(matches!(decision, Decision::Verified { .. }));
    assert_eq!(h.store.record(&h.contact).unwrap().result("Vaccination"), Some(true));
}

#[tokio::test]
async fn test_incomplete_series_fails() {
    let h = Harness::new();
    let event = vaccination_event(&h.connection, "false", "MOD");

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    // Const filter rejects before the rule runs
    assert!(matches!(decision, Decision::Inconclusive { .. }));
    assert_eq!(h.store.record(&h.contact).unwrap().result("Vaccination"), Some(false));
}

#[tokio::test]
async fn test_recent_dose_revealed_fails_maturation() {
    let h = Harness::new();
    let dose = (NOW_SECS - 3 * DAY).to_string();
    let event = proof_event(
        &h.connection,
        "IssuerDid123:2:Vaccination:1.0",
        &[
            ("vaccine_series_complete", "true"),
            ("vaccine_manufacturer_code", "JSN"),
            ("vaccine_administration_date", dose.as_str()),
            ("patient_surnames", "Doe"),
            ("patient_given_names", "Jane"),
        ],
        &[],
    );

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    assert!(matches!(decision, Decision::Inconclusive { .. }));
    assert_eq!(h.store.record(&h.contact).unwrap().result("Vaccination"), Some(false));
}

// =========================================================================
// Triage
// =========================================================================

#[tokio::test]
async fn test_missing_state_sends_unverified() {
    let h = Harness::new();
    let mut event = lab_event(&h.connection, "Negative", NOW_SECS - HOUR);
    event.state = None;

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    assert!(matches!(decision, Decision::Inconclusive { .. }));
    assert_eq!(h.agent.notices().await, vec![NoticeCode::Unverified]);
    assert!(h.store.record(&h.contact).is_none());
}

#[tokio::test]
async fn test_unfinished_exchange_is_ignored() {
    let h = Harness::new();
    let mut event = lab_event(&h.connection, "Negative", NOW_SECS - HOUR);
    event.state = Some("presentation_received".into());

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    assert!(matches!(decision, Decision::Inconclusive { .. }));
    assert!(h.agent.effects().await.is_empty());
}

#[tokio::test]
async fn test_failed_verification_rejects() {
    let h = Harness::new();
    let mut event = lab_event(&h.connection, "Negative", NOW_SECS - HOUR);
    event.verified = Some(false);

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    assert_eq!(
        decision,
        Decision::Rejected {
            reason: RejectReason::ProofNotVerified
        }
    );
    assert_eq!(h.agent.notices().await, vec![NoticeCode::InvalidProof]);
}

#[tokio::test]
async fn test_untrusted_issuer_rejects() {
    let h = Harness::new();
    let event = proof_event(
        &h.connection,
        "RogueDid:2:Lab_Result:1.0",
        &[("lab_result", "Negative")],
        &[],
    );

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    match decision {
        Decision::Rejected {
            reason: RejectReason::UntrustedSource { issuer_did, .. },
        } => assert_eq!(issuer_did, "RogueDid"),
        other => panic!("expected untrusted source, got {:?}", other),
    }
    assert_eq!(h.agent.notices().await, vec![NoticeCode::InvalidProof]);
}

#[tokio::test]
async fn test_trusted_predicate_only_proof_is_not_reported_untrusted() {
    let h = Harness::new();
    let event = proof_event(&h.connection, LAB_SCHEMA, &[], &["lab_specimen_collected_date"]);

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    assert_eq!(
        decision,
        Decision::Rejected {
            reason: RejectReason::NoRevealedAttributes
        }
    );
    assert_eq!(h.agent.notices().await, vec![NoticeCode::InvalidProof]);
    assert!(h.store.record(&h.contact).is_none());
}

#[tokio::test]
async fn test_unrelated_proof_matches_no_descriptor() {
    let h = Harness::new();
    let event = proof_event(&h.connection, LAB_SCHEMA, &[("favourite_colour", "blue")], &[]);

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    assert_eq!(
        decision,
        Decision::Rejected {
            reason: RejectReason::NoMatchingDescriptor
        }
    );
    assert_eq!(h.agent.notices().await, vec![NoticeCode::InvalidProof]);
}

#[tokio::test]
async fn test_missing_privilege_denies_issuance() {
    let mut config = engine_config();
    config.governance.privileges.clear();
    let h = Harness::with(config, Arc::new(StaticDefinitionSource::new(travel_definition())));

    let event = lab_event(&h.connection, "Negative", NOW_SECS - HOUR);
    let decision = h.engine.process_at(&event, now()).await.unwrap();

    assert!(matches!(
        decision,
        Decision::Rejected {
            reason: RejectReason::PrivilegeDenied { .. }
        }
    ));
    assert_eq!(h.agent.notices().await, vec![NoticeCode::InvalidPrivileges]);
    // The descriptor result still stands
    let record = h.store.record(&h.contact).unwrap();
    assert_eq!(record.result("Lab_Result"), Some(true));
    assert_eq!(record.status, VerificationStatus::Pending);
}

#[tokio::test]
async fn test_self_attested_identity_recorded() {
    let h = Harness::new();
    let event: vouch_core::ProofEvent = serde_json::from_value(serde_json::json!({
        "state": "verified",
        "verified": true,
        "connection_id": h.connection.as_str(),
        "presentation": {
            "requested_proof": {
                "self_attested_attrs": {
                    "email": "jane@example.com",
                    "passport_number": "X1234567",
                    "nickname": "JD"
                }
            },
            "identifiers": []
        }
    }))
    .unwrap();

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    let Decision::SelfAttested { identity } = decision else {
        panic!("expected self-attested, got {:?}", decision);
    };
    assert_eq!(identity.demographics["email"], "jane@example.com");
    assert_eq!(identity.passport["passport_number"], "X1234567");
    assert_eq!(h.store.identity(&h.contact), Some(identity));
    assert!(h.agent.effects().await.is_empty());
}

#[tokio::test]
async fn test_unknown_connection_is_an_error() {
    let h = Harness::new();
    let event = lab_event(
        &vouch_core::ConnectionId::new("conn-unknown"),
        "Negative",
        NOW_SECS - HOUR,
    );
    assert!(h.engine.process_at(&event, now()).await.is_err());
}
