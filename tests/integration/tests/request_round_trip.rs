//! Integration test: compiled proof requests, answered by an honest holder,
//! validate against the descriptors they were compiled from and drive the
//! engine to issuance.

use std::collections::BTreeMap;

use vouch_core::{ConnectionId, RangeOp};
use vouch_decision::{AgentEffect, Decision};
use vouch_engine::{compile_definition, eligible, validate};
use vouch_integration_tests::{
    answer, now, travel_definition, Harness, LAB_SCHEMA, NOW_SECS, VACCINATION_SCHEMA,
};

fn holder_values() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("lab_result", "Negative"),
        ("patient_surnames", "Doe"),
        ("patient_given_names", "Jane"),
        ("vaccine_series_complete", "true"),
        ("vaccine_manufacturer_code", "PFR"),
    ])
}

// =========================================================================
// Compilation
// =========================================================================

#[test]
fn test_compile_one_request_per_descriptor() {
    let def = travel_definition();
    let conn = ConnectionId::new("conn-1");
    let specs = compile_definition(&def, &conn, NOW_SECS);

    let names: Vec<&str> = specs.iter().map(|s| s.descriptor_name.as_str()).collect();
    assert_eq!(names, vec!["Lab_Result", "Vaccination"]);

    let lab = &specs[0];
    assert_eq!(lab.comment, "Requesting Presentation for Lab_Result");
    assert_eq!(
        lab.requested_names(),
        vec!["lab_result", "lab_specimen_collected_date", "patient_given_names", "patient_surnames"]
    );

    let predicate = &lab.predicates["lab_specimen_collected_date"];
    assert_eq!(predicate.p_type, RangeOp::Gt);
    assert_eq!(predicate.p_value, NOW_SECS - 259_200);
    assert_eq!(predicate.restrictions[0].schema_id.as_str(), LAB_SCHEMA);

    let vaccination = &specs[1];
    let predicate = &vaccination.predicates["vaccine_administration_date"];
    assert_eq!(predicate.p_type, RangeOp::Lt);
    assert_eq!(predicate.p_value, NOW_SECS - 1_209_600);
    assert!(vaccination.attributes.contains_key("vaccine_manufacturer_code"));
}

#[test]
fn test_send_request_body_shape() {
    let def = travel_definition();
    let specs = compile_definition(&def, &ConnectionId::new("conn-1"), NOW_SECS);
    let body = serde_json::to_value(specs[0].to_send_request(7)).unwrap();

    assert_eq!(body["trace"], false);
    assert_eq!(body["connection_id"], "conn-1");
    assert_eq!(body["proof_request"]["name"], "Lab_Result");
    assert_eq!(body["proof_request"]["version"], "1.0");
    assert_eq!(body["proof_request"]["nonce"], "7");
    assert_eq!(
        body["proof_request"]["requested_predicates"]["lab_specimen_collected_date"]["p_type"],
        ">"
    );
}

// =========================================================================
// Round trip: compile → holder answer → validate
// =========================================================================

#[test]
fn test_answered_requests_validate() {
    let def = travel_definition();
    let conn = ConnectionId::new("conn-1");
    let values = holder_values();

    for spec in compile_definition(&def, &conn, NOW_SECS) {
        let event = answer(&spec.to_send_request(1), &values);
        let proof = vouch_core::ReturnedProof::from_event(&event);
        let descriptor = def.descriptor(&spec.descriptor_name).unwrap();

        let outcome = validate(&proof, descriptor);
        assert!(outcome.passed, "{} failed: {:?}", spec.descriptor_name, outcome.failure);

        // The other descriptor does not recognise this proof at all
        for other in eligible(&def).into_iter().filter(|d| d.name != spec.descriptor_name) {
            assert!(validate(&proof, other).is_mismatch());
        }
    }
}

#[test]
fn test_answer_with_wrong_value_fails_named_field() {
    let def = travel_definition();
    let specs = compile_definition(&def, &ConnectionId::new("conn-1"), NOW_SECS);
    let mut values = holder_values();
    values.insert("vaccine_manufacturer_code", "XYZ");

    let event = answer(&specs[1].to_send_request(1), &values);
    let proof = vouch_core::ReturnedProof::from_event(&event);
    let outcome = validate(&proof, def.descriptor("Vaccination").unwrap());

    assert!(!outcome.passed);
    assert!(!outcome.is_mismatch());
    assert!(!outcome.per_field["vaccine_manufacturer_code"].is_pass());
    assert!(outcome.per_field["vaccine_series_complete"].is_pass());
}

#[tokio::test]
async fn test_answered_request_leads_to_issuance() {
    let h = Harness::new();
    let def = travel_definition();
    let specs = compile_definition(&def, &h.connection, NOW_SECS);

    let event = answer(&specs[1].to_send_request(1), &holder_values());
    assert_eq!(
        event.primary_identifier().unwrap().schema_id.as_str(),
        VACCINATION_SCHEMA
    );

    let decision = h.engine.process_at(&event, now()).await.unwrap();
    let Decision::Verified { attributes } = decision else {
        panic!("expected verified, got {:?}", decision);
    };
    let surname = attributes.iter().find(|a| a.name == "traveler_surnames").unwrap();
    assert_eq!(surname.value, "Doe");

    let effects = h.agent.effects().await;
    assert_eq!(effects.len(), 1);
    assert!(matches!(effects[0], AgentEffect::CredentialIssued { .. }));
}
