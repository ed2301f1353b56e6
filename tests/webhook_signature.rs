use celestia_bookings::service::signature::{SignatureInvalid, WebhookVerifier};

const SECRET: &str = "whsec_test123secret456";
const NOW: i64 = 1_760_000_000;

fn verifier() -> WebhookVerifier {
    WebhookVerifier::new(SECRET, 300)
}

#[test]
fn accepts_gateway_signed_payload() {
    let payload = br#"{"type":"checkout.session.completed"}"#;
    let header = verifier().sign(payload, NOW);
    assert!(verifier().verify_at(payload, &header, NOW + 10).is_ok());
}

#[test]
fn rejects_tampered_payload() {
    let payload = br#"{"data":{"object":{"amount_total":8500}}}"#;
    let header = verifier().sign(payload, NOW);
    let tampered = br#"{"data":{"object":{"amount_total":8501}}}"#;
    assert_eq!(verifier().verify_at(tampered, &header, NOW), Err(SignatureInvalid));
}

#[test]
fn rejects_signature_from_other_secret() {
    let payload = b"{}";
    let header = WebhookVerifier::new("whsec_other", 300).sign(payload, NOW);
    assert_eq!(verifier().verify_at(payload, &header, NOW), Err(SignatureInvalid));
}

#[test]
fn rejects_stale_timestamp() {
    let payload = b"{}";
    let header = verifier().sign(payload, NOW - 600);
    assert_eq!(verifier().verify_at(payload, &header, NOW), Err(SignatureInvalid));
}

#[test]
fn rejects_malformed_headers() {
    let payload = b"{}";
    for header in ["", "garbage", "t=1760000000", "v1=abcdef", "t=notanumber,v1=abcdef"] {
        assert_eq!(
            verifier().verify_at(payload, header, NOW),
            Err(SignatureInvalid),
            "header {header:?} should be rejected"
        );
    }
}

#[test]
fn accepts_when_any_v1_matches() {
    let payload = b"{\"id\":\"evt_1\"}";
    let good = verifier().sign(payload, NOW);
    let sig = good.split("v1=").nth(1).unwrap();
    let header = format!("t={NOW},v1={},v1={sig}", "00".repeat(32));
    assert!(verifier().verify_at(payload, &header, NOW).is_ok());
}

#[test]
fn non_hex_candidate_is_rejected() {
    let payload = b"{}";
    let header = format!("t={NOW},v1=zz-not-hex");
    assert_eq!(verifier().verify_at(payload, &header, NOW), Err(SignatureInvalid));
}

#[test]
fn unconfigured_secret_rejects_everything() {
    let unconfigured = WebhookVerifier::new("", 300);
    let payload = b"{}";
    let header = unconfigured.sign(payload, NOW);
    assert_eq!(unconfigured.verify_at(payload, &header, NOW), Err(SignatureInvalid));
}

#[test]
fn extreme_timestamps_are_rejected() {
    let payload = b"{}";
    for ts in [i64::MIN, i64::MAX, -1] {
        let header = format!("t={ts},v1={}", "00".repeat(32));
        assert_eq!(
            verifier().verify_at(payload, &header, NOW),
            Err(SignatureInvalid),
            "t={ts}"
        );
    }
    let header = verifier().sign(payload, i64::MIN);
    assert_eq!(verifier().verify_at(payload, &header, NOW), Err(SignatureInvalid));
    assert_eq!(verifier().verify_at(payload, &header, i64::MAX), Err(SignatureInvalid));
}
