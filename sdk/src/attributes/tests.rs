// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.


#![allow(clippy::unwrap_used)]

use chrono::{DateTime, Utc};

use super::*;
use crate::{
    crypto::Certificate,
    policy::{decode, SignaturePolicy},
    settings::Settings,
    signature::MemorySignature,
    utils::test::{
        alg_id, attribute, ctx, octets, oid, seq, sha256, time_stamp_token, utc, utc_time,
        PolicyFixture, TestCert, COMMITMENT_PROOF_OF_APPROVAL, ID_CONTENT_TYPE, ID_DATA,
        ID_MESSAGE_DIGEST, POLICY_ID, SHA256,
    },
    validation_codes::{
        ATTRIBUTE_MISSING, POLICY_IDENTIFIER_MISMATCH, POLICY_SIGNING_PERIOD_OUTSIDE,
        REVOCATION_REFERENCES_MATCHED, TIMESTAMP_DELAY_EXCEEDED, TIMESTAMP_VALIDATED,
    },
    Error, StatusTracker,
};

struct Fixture {
    root: TestCert,
    signer: TestCert,
    policy: PolicyFixture,
}

impl Fixture {
    fn new() -> Self {
        let root = TestCert::self_signed("Root CA", 1, 1);
        let signer = root.issue("Signer", 3, 3);
        let policy = PolicyFixture {
            trust_points: vec![root.der.clone()],
            end_mode: 4,
            ca_mode: 4,
            ..PolicyFixture::new()
        };
        Self {
            root,
            signer,
            policy,
        }
    }

    fn policy(&self) -> SignaturePolicy {
        decode(&self.policy.der(), None).unwrap()
    }

    // Carries contentType and messageDigest.
    fn signature(&self) -> MemorySignature {
        let mut sig = MemorySignature::new(b"signature value");
        sig.set_signer_certificate(Certificate::from_der(&self.signer.der).unwrap());
        sig.add_attribute(&attribute(ID_CONTENT_TYPE, &[oid(ID_DATA)]), true)
            .unwrap();
        sig.add_attribute(&attribute(ID_MESSAGE_DIGEST, &[octets(&sha256(b"content"))]), true)
            .unwrap();
        sig
    }
}

fn add(sig: &mut MemorySignature, kind: AttributeKind, value: Vec<u8>, signed: bool) {
    sig.add_attribute(&attribute(kind.oid(), &[value]), signed)
        .unwrap();
}

fn signing_time() -> DateTime<Utc> {
    utc(2024, 1, 10, 0, 0, 0)
}

fn run(
    sig: &MemorySignature,
    policy: &SignaturePolicy,
    log: &mut StatusTracker,
) -> crate::Result<AttributeValidation> {
    let settings = Settings::default();
    AttributeValidationEngine::new(&settings).validate(sig, policy, log)
}

fn errors(validation: &AttributeValidation) -> Vec<&AttributeError> {
    validation
        .outcomes
        .iter()
        .filter_map(|o| o.error.as_ref())
        .collect()
}

#[test]
fn minimal_signature_is_valid() {
    let f = Fixture::new();
    let mut log = StatusTracker::default();

    let validation = run(&f.signature(), &f.policy(), &mut log).unwrap();

    assert_eq!(validation.outcomes.len(), 2);
    assert!(errors(&validation).is_empty());
    assert!(validation.outcomes.iter().all(|o| o.critical && o.mandated));
    assert!(validation.commitment.is_none());
}

#[test]
fn each_missing_mandated_attribute_is_reported_once() {
    let mut f = Fixture::new();
    f.policy.mandated_signed = vec![
        ID_CONTENT_TYPE,
        ID_MESSAGE_DIGEST,
        AttributeKind::SigningTime.oid(),
    ];
    let mut sig = MemorySignature::new(b"signature value");
    sig.add_attribute(&attribute(ID_CONTENT_TYPE, &[oid(ID_DATA)]), true)
        .unwrap();
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    let missing: Vec<_> = validation
        .outcomes
        .iter()
        .filter(|o| matches!(o.error, Some(AttributeError::Missing { .. })))
        .collect();
    assert_eq!(missing.len(), 2);
    assert!(missing.iter().all(|o| o.mandated && o.invalidates()));
    assert_eq!(missing[0].kind, Some(AttributeKind::MessageDigest));
    assert_eq!(missing[1].kind, Some(AttributeKind::SigningTime));
    assert!(log.has_status(ATTRIBUTE_MISSING));
}

#[test]
fn mandated_unsigned_attribute_must_be_unsigned() {
    let mut f = Fixture::new();
    f.policy.mandated_unsigned = vec![AttributeKind::SigningTime.oid()];
    let mut sig = f.signature();
    add(&mut sig, AttributeKind::SigningTime, utc_time(signing_time()), true);
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    assert_eq!(
        errors(&validation),
        vec![&AttributeError::Missing {
            identifier: AttributeKind::SigningTime.oid().to_string()
        }]
    );
}

#[test]
fn duplicated_unique_attribute() {
    let f = Fixture::new();
    let mut sig = f.signature();
    add(&mut sig, AttributeKind::SigningTime, utc_time(signing_time()), true);
    add(&mut sig, AttributeKind::SigningTime, utc_time(signing_time()), true);
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    assert_eq!(
        errors(&validation),
        vec![&AttributeError::Duplicated {
            identifier: AttributeKind::SigningTime.oid().to_string(),
            count: 2
        }]
    );
}

#[test]
fn unknown_unsigned_attribute_is_not_fatal() {
    let f = Fixture::new();
    let mut sig = f.signature();
    sig.add_attribute(&attribute("1.2.3.4.5", &[octets(b"x")]), false)
        .unwrap();
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    let unknown = validation.outcomes.last().unwrap();
    assert_eq!(unknown.kind, None);
    assert!(!unknown.critical);
    assert!(!unknown.invalidates());
    assert!(matches!(unknown.error, Some(AttributeError::Unknown { .. })));
}

#[test]
fn stop_on_first_error() {
    let f = Fixture::new();
    let mut sig = f.signature();
    sig.add_attribute(&attribute("1.2.3.4.5", &[octets(b"x")]), false)
        .unwrap();
    let mut settings = Settings::default();
    settings.verify.stop_on_first_error = true;

    let err = AttributeValidationEngine::new(&settings)
        .verify(&sig, &f.policy())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Attribute(AttributeError::Unknown { .. })
    ));
}

#[test]
fn signed_attribute_failure_is_critical() {
    let f = Fixture::new();
    let mut sig = f.signature();
    add(
        &mut sig,
        AttributeKind::SigningTime,
        utc_time(utc(2031, 1, 1, 0, 0, 0)),
        true,
    );
    let mut log = StatusTracker::default();

    let err = run(&sig, &f.policy(), &mut log).unwrap_err();

    assert!(matches!(
        err,
        Error::Attribute(AttributeError::Critical { .. })
    ));
    assert!(log.has_status(POLICY_SIGNING_PERIOD_OUTSIDE));
}

#[test]
fn unsigned_attribute_failure_is_recorded() {
    let f = Fixture::new();
    let mut sig = f.signature();
    add(
        &mut sig,
        AttributeKind::SigningTime,
        utc_time(utc(2031, 1, 1, 0, 0, 0)),
        false,
    );
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    let outcome = validation.outcomes.last().unwrap();
    assert!(matches!(outcome.error, Some(AttributeError::Invalid { .. })));
    assert!(!outcome.invalidates());
}

fn policy_id(id: &str, hash: &[u8]) -> Vec<u8> {
    seq(&[oid(id), seq(&[alg_id(SHA256), octets(hash)])])
}

#[test]
fn signature_policy_identifier() {
    let f = Fixture::new();
    let policy = f.policy();
    let declared = policy.declared_hash.clone().unwrap();

    let mut sig = f.signature();
    add(
        &mut sig,
        AttributeKind::SignaturePolicyId,
        policy_id(POLICY_ID, &declared),
        true,
    );
    let mut log = StatusTracker::default();
    let validation = run(&sig, &policy, &mut log).unwrap();
    assert!(errors(&validation).is_empty());

    let mut sig = f.signature();
    add(
        &mut sig,
        AttributeKind::SignaturePolicyId,
        policy_id("2.16.76.1.7.1.1.2.4", &declared),
        true,
    );
    let mut log = StatusTracker::default();
    assert!(run(&sig, &policy, &mut log).is_err());
    assert!(log.has_status(POLICY_IDENTIFIER_MISMATCH));

    let mut sig = f.signature();
    add(
        &mut sig,
        AttributeKind::SignaturePolicyId,
        policy_id(POLICY_ID, &sha256(b"another policy")),
        true,
    );
    let mut log = StatusTracker::default();
    assert!(run(&sig, &policy, &mut log).is_err());
}

#[test]
fn signing_certificate_v2() {
    let f = Fixture::new();
    let ess_cert = |hash: Vec<u8>| seq(&[seq(&[seq(&[octets(&hash)])])]);

    let mut sig = f.signature();
    add(
        &mut sig,
        AttributeKind::SigningCertificateV2,
        ess_cert(sha256(&f.signer.der)),
        true,
    );
    let mut log = StatusTracker::default();
    let validation = run(&sig, &f.policy(), &mut log).unwrap();
    assert!(errors(&validation).is_empty());

    let mut sig = f.signature();
    add(
        &mut sig,
        AttributeKind::SigningCertificateV2,
        ess_cert(sha256(&f.root.der)),
        true,
    );
    let mut log = StatusTracker::default();
    assert!(matches!(
        run(&sig, &f.policy(), &mut log),
        Err(Error::Attribute(AttributeError::Critical { .. }))
    ));
}

#[test]
fn commitment_rule_replaces_mandated_attributes() {
    let mut f = Fixture::new();
    f.policy.commitment = Some((
        COMMITMENT_PROOF_OF_APPROVAL,
        vec![
            ID_CONTENT_TYPE,
            ID_MESSAGE_DIGEST,
            AttributeKind::SigningTime.oid(),
        ],
    ));
    let mut sig = f.signature();
    add(
        &mut sig,
        AttributeKind::CommitmentType,
        seq(&[oid(COMMITMENT_PROOF_OF_APPROVAL)]),
        true,
    );
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    assert_eq!(
        validation.commitment.as_deref(),
        Some(COMMITMENT_PROOF_OF_APPROVAL)
    );
    assert_eq!(
        errors(&validation),
        vec![&AttributeError::Missing {
            identifier: AttributeKind::SigningTime.oid().to_string()
        }]
    );
}

#[test]
fn signature_time_stamp_is_verified() {
    let f = Fixture::new();
    let tsa = f.root.issue_tsa("TSA", 5, 5);
    let mut sig = f.signature();
    add(&mut sig, AttributeKind::SigningTime, utc_time(signing_time()), true);
    add(
        &mut sig,
        AttributeKind::SignatureTimeStamp,
        time_stamp_token(&tsa, b"signature value", utc(2024, 1, 10, 0, 5, 0)),
        false,
    );
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    assert!(errors(&validation).is_empty());
    assert_eq!(validation.time_stamps.len(), 1);
    assert!(validation.time_stamps[0].trusted);
    assert!(log.has_status(TIMESTAMP_VALIDATED));
}

#[test]
fn late_signature_time_stamp() {
    let mut f = Fixture::new();
    f.policy.time_stamp_delay_secs = Some(600);
    let tsa = f.root.issue_tsa("TSA", 5, 5);
    let mut sig = f.signature();
    add(&mut sig, AttributeKind::SigningTime, utc_time(signing_time()), true);
    add(
        &mut sig,
        AttributeKind::SignatureTimeStamp,
        time_stamp_token(&tsa, b"signature value", utc(2024, 1, 10, 0, 30, 0)),
        false,
    );
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    let outcome = validation.outcomes.last().unwrap();
    assert_eq!(outcome.kind, Some(AttributeKind::SignatureTimeStamp));
    assert!(matches!(outcome.error, Some(AttributeError::Invalid { .. })));
    assert!(log.has_status(TIMESTAMP_DELAY_EXCEEDED));
}

#[test]
fn time_stamp_over_other_data_is_invalid() {
    let f = Fixture::new();
    let tsa = f.root.issue_tsa("TSA", 5, 5);
    let mut sig = f.signature();
    add(
        &mut sig,
        AttributeKind::SignatureTimeStamp,
        time_stamp_token(&tsa, b"another value", utc(2024, 1, 10, 0, 5, 0)),
        false,
    );
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    assert!(validation.time_stamps.is_empty());
    assert_eq!(errors(&validation).len(), 1);
}

#[test]
fn revocation_references_are_matched() {
    let mut f = Fixture::new();
    f.policy.end_mode = 0;
    let crl = f.root.crl(
        utc(2024, 1, 1, 0, 0, 0),
        utc(2024, 2, 1, 0, 0, 0),
        &[],
    );
    let crl_hash = crate::crypto::hash::sha1(&crl);

    let mut sig = f.signature();
    add(&mut sig, AttributeKind::SigningTime, utc_time(signing_time()), true);
    add(
        &mut sig,
        AttributeKind::RevocationRefs,
        seq(&[seq(&[ctx(0, &seq(&[seq(&[seq(&[octets(&crl_hash)])])]))])]),
        false,
    );
    add(
        &mut sig,
        AttributeKind::RevocationValues,
        seq(&[ctx(0, &seq(&[crl]))]),
        false,
    );
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    assert!(errors(&validation).is_empty());
    let revocation = validation.revocation.unwrap();
    assert_eq!(revocation.crl_references.len(), 1);
    assert!(revocation.ocsp_references.is_empty());
    assert!(log.has_status(REVOCATION_REFERENCES_MATCHED));
}

#[test]
fn unmatched_revocation_reference_is_reported() {
    let mut f = Fixture::new();
    f.policy.end_mode = 0;

    let mut sig = f.signature();
    add(
        &mut sig,
        AttributeKind::RevocationRefs,
        seq(&[seq(&[ctx(
            0,
            &seq(&[seq(&[seq(&[octets(&[0x5a; 20])])])]),
        )])]),
        false,
    );
    let mut log = StatusTracker::default();

    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    let outcome = validation.outcomes.last().unwrap();
    assert_eq!(outcome.kind, Some(AttributeKind::RevocationRefs));
    assert!(outcome.is_error());
    assert!(validation.revocation.is_none());
}

#[test]
fn outcomes_serialize() {
    let f = Fixture::new();
    let mut sig = f.signature();
    sig.add_attribute(&attribute("1.2.3.4.5", &[octets(b"x")]), false)
        .unwrap();
    let mut log = StatusTracker::default();
    let validation = run(&sig, &f.policy(), &mut log).unwrap();

    let json = serde_json::to_value(&validation.outcomes).unwrap();

    assert_eq!(json[2]["identifier"], "1.2.3.4.5");
    assert_eq!(json[2]["error"], "unknown attribute 1.2.3.4.5");
    assert!(json[0]["error"].is_null());
}
