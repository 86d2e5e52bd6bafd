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

use std::time::Duration;

use chrono::{DateTime, Utc};
use web_time::Instant;

use super::*;
use crate::{
    crypto::{Certificate, Crl, DigestAlgorithm, OcspResponse},
    deadline::Deadline,
    policy::{CertRevReq, RevReq},
    utils::test::{utc, TestCert},
};

struct Fixture {
    root: TestCert,
    ca: TestCert,
    end: TestCert,
    path: CertificatePath,
}

impl Fixture {
    fn new() -> Self {
        let root = TestCert::self_signed("Root CA", 1, 1);
        let ca = root.issue_ca("Issuing CA", 2, 2);
        let end = ca.issue("Signer", 3, 3);
        let path = CertificatePath::new(cert(&end), vec![cert(&ca)], Some(cert(&root)));
        Self {
            root,
            ca,
            end,
            path,
        }
    }

    // Evidence for one tier: (CRL DER, OCSP DER), issued by `issuer` for
    // `subject`.
    fn evidence(issuer: &TestCert, subject: &TestCert) -> (Vec<u8>, Vec<u8>) {
        (
            issuer.crl(this_update(), next_update(), &[]),
            issuer.ocsp_response(subject, produced_at(), None),
        )
    }

    fn store(&self) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (crl, ocsp) in [
            Self::evidence(&self.ca, &self.end),
            Self::evidence(&self.root, &self.ca),
        ] {
            store.add_crl(Crl::from_der(&crl).unwrap());
            store.add_ocsp_response(OcspResponse::from_der(&ocsp).unwrap());
        }
        store
    }

    // References to the evidence `mode` requires for issuer → subject.
    fn refs(issuer: &TestCert, subject: &TestCert, mode: RevocationMode) -> Vec<RevocationReference> {
        let (crl, _) = Self::evidence(issuer, subject);
        let mut refs = Vec::new();
        if matches!(mode, RevocationMode::Crl | RevocationMode::Both) {
            refs.push(crl_ref(&crl));
        }
        if matches!(mode, RevocationMode::Ocsp | RevocationMode::Both) {
            refs.push(ocsp_ref(issuer));
        }
        refs
    }

    fn declared(&self, end_mode: RevocationMode, ca_mode: RevocationMode) -> Vec<Vec<RevocationReference>> {
        vec![
            Self::refs(&self.ca, &self.end, end_mode),
            Self::refs(&self.root, &self.ca, ca_mode),
        ]
    }
}

fn cert(t: &TestCert) -> Certificate {
    Certificate::from_der(&t.der).unwrap()
}

fn this_update() -> DateTime<Utc> {
    utc(2024, 1, 1, 0, 0, 0)
}

fn next_update() -> DateTime<Utc> {
    utc(2024, 2, 1, 0, 0, 0)
}

fn produced_at() -> DateTime<Utc> {
    utc(2024, 1, 9, 12, 0, 0)
}

fn reference_time() -> DateTime<Utc> {
    utc(2024, 1, 10, 0, 0, 0)
}

fn crl_ref(der: &[u8]) -> RevocationReference {
    RevocationReference::Crl(CrlReference {
        digest: OtherHash {
            algorithm: DigestAlgorithm::Sha256,
            value: DigestAlgorithm::Sha256.digest(der),
        },
        issuer: None,
        issued_time: None,
        number: None,
    })
}

fn ocsp_ref(responder: &TestCert) -> RevocationReference {
    RevocationReference::Ocsp(OcspReference {
        responder: ResponderRef::ByName(responder.name_der()),
        produced_at: produced_at(),
        digest: None,
    })
}

fn rev_req(end: RevocationMode, ca: RevocationMode) -> CertRevReq {
    CertRevReq {
        end_cert_rev_req: RevReq {
            mode: end,
            extensions: Vec::new(),
        },
        ca_certs: RevReq {
            mode: ca,
            extensions: Vec::new(),
        },
    }
}

fn run(
    fixture: &Fixture,
    store: &MemoryStore,
    req: &CertRevReq,
    groups: Vec<Vec<RevocationReference>>,
) -> Result<MatchResult, CrossRefError> {
    let empty = MemoryStore::new();
    RevocationMatcher::default().match_references(
        &fixture.path,
        req,
        &DeclaredReferences::new(groups),
        EvidenceSources::new(store, &empty),
        reference_time(),
    )
}

const REQUIRED_MODES: [RevocationMode; 3] =
    [RevocationMode::Crl, RevocationMode::Ocsp, RevocationMode::Both];

#[test]
fn mode_matrix_reconciles_exactly() {
    let fixture = Fixture::new();
    let store = fixture.store();

    for end_mode in REQUIRED_MODES {
        for ca_mode in REQUIRED_MODES {
            let req = rev_req(end_mode, ca_mode);
            let groups = fixture.declared(end_mode, ca_mode);
            let total: usize = groups.iter().map(Vec::len).sum();

            let result = run(&fixture, &store, &req, groups.clone()).unwrap();
            assert_eq!(
                result.crl_references.len() + result.ocsp_references.len(),
                total,
                "{end_mode:?}/{ca_mode:?}"
            );
            assert_eq!(result.evidence.len(), 2);

            // Withholding any one required reference must fail.
            for (g, group) in groups.iter().enumerate() {
                for r in 0..group.len() {
                    let mut withheld = groups.clone();
                    withheld[g].remove(r);
                    let err = run(&fixture, &store, &req, withheld).unwrap_err();
                    assert!(
                        matches!(err, CrossRefError::MissingReference { .. }),
                        "{end_mode:?}/{ca_mode:?} without {g}.{r}: {err}"
                    );
                }
            }
        }
    }
}

#[test]
fn unrelated_reference_is_excess() {
    let fixture = Fixture::new();
    let store = fixture.store();
    let req = rev_req(RevocationMode::Crl, RevocationMode::Crl);

    let mut groups = fixture.declared(RevocationMode::Crl, RevocationMode::Crl);
    groups[1].push(crl_ref(b"some other CRL"));

    assert_eq!(
        run(&fixture, &store, &req, groups).unwrap_err(),
        CrossRefError::ExcessReference {
            kind: EvidenceKind::Crl,
            declared: 3,
            consumed: 2,
        }
    );
}

#[test]
fn missing_evidence() {
    let fixture = Fixture::new();
    let req = rev_req(RevocationMode::Crl, RevocationMode::Crl);
    let groups = fixture.declared(RevocationMode::Crl, RevocationMode::Crl);

    let err = run(&fixture, &MemoryStore::new(), &req, groups).unwrap_err();
    assert_eq!(
        err,
        CrossRefError::MissingEvidence {
            tier: Tier::EndEntity,
            kind: EvidenceKind::Crl,
            subject: cert(&fixture.end).subject_name().to_owned(),
        }
    );
}

#[test]
fn expired_crl_is_not_evidence() {
    let fixture = Fixture::new();
    let mut store = MemoryStore::new();
    let stale = fixture
        .ca
        .crl(utc(2023, 1, 1, 0, 0, 0), utc(2023, 2, 1, 0, 0, 0), &[]);
    store.add_crl(Crl::from_der(&stale).unwrap());

    let req = rev_req(RevocationMode::Crl, RevocationMode::None);
    let err = run(&fixture, &store, &req, vec![vec![crl_ref(&stale)]]).unwrap_err();
    assert!(matches!(err, CrossRefError::MissingEvidence { .. }));
}

#[test]
fn newest_crl_supersedes() {
    let fixture = Fixture::new();
    let older = fixture.ca.crl(this_update(), next_update(), &[]);
    let newer = fixture
        .ca
        .crl(utc(2024, 1, 5, 0, 0, 0), next_update(), &[]);

    let mut store = MemoryStore::new();
    store.add_crl(Crl::from_der(&older).unwrap());
    store.add_crl(Crl::from_der(&newer).unwrap());

    let req = rev_req(RevocationMode::Crl, RevocationMode::None);
    run(&fixture, &store, &req, vec![vec![crl_ref(&newer)]]).unwrap();

    let err = run(&fixture, &store, &req, vec![vec![crl_ref(&older)]]).unwrap_err();
    assert!(matches!(err, CrossRefError::MissingReference { .. }));
}

#[test]
fn revoked_before_reference_time() {
    let fixture = Fixture::new();
    let revoked_at = utc(2024, 1, 5, 0, 0, 0);
    let crl = fixture
        .ca
        .crl(this_update(), next_update(), &[(3, revoked_at)]);

    let mut store = MemoryStore::new();
    store.add_crl(Crl::from_der(&crl).unwrap());

    let req = rev_req(RevocationMode::Crl, RevocationMode::None);
    let err = run(&fixture, &store, &req, vec![vec![crl_ref(&crl)]]).unwrap_err();
    assert!(matches!(err, CrossRefError::Revoked { revoked_at: at, .. } if at == revoked_at));
}

#[test]
fn revoked_after_reference_time() {
    let fixture = Fixture::new();
    let crl = fixture
        .ca
        .crl(this_update(), next_update(), &[(3, utc(2024, 1, 20, 0, 0, 0))]);

    let mut store = MemoryStore::new();
    store.add_crl(Crl::from_der(&crl).unwrap());

    let req = rev_req(RevocationMode::Crl, RevocationMode::None);
    run(&fixture, &store, &req, vec![vec![crl_ref(&crl)]]).unwrap();
}

#[test]
fn either_falls_back_to_ocsp() {
    let fixture = Fixture::new();
    let (_, ocsp) = Fixture::evidence(&fixture.ca, &fixture.end);
    let mut store = MemoryStore::new();
    store.add_ocsp_response(OcspResponse::from_der(&ocsp).unwrap());

    let req = rev_req(RevocationMode::Either, RevocationMode::None);
    let result = run(&fixture, &store, &req, vec![vec![ocsp_ref(&fixture.ca)]]).unwrap();

    assert_eq!(result.ocsp_references.len(), 1);
    assert_eq!(result.evidence[0].kinds, vec![EvidenceKind::Ocsp]);
    assert!(result.evidence[1].kinds.is_empty());
}

#[test]
fn either_prefers_crl() {
    let fixture = Fixture::new();
    let store = fixture.store();
    let (crl, _) = Fixture::evidence(&fixture.ca, &fixture.end);

    let req = rev_req(RevocationMode::Either, RevocationMode::None);
    let result = run(&fixture, &store, &req, vec![vec![crl_ref(&crl)]]).unwrap();
    assert_eq!(result.evidence[0].kinds, vec![EvidenceKind::Crl]);
}

#[test]
fn skipped_modes_need_no_references() {
    let fixture = Fixture::new();
    let req = rev_req(RevocationMode::None, RevocationMode::Other);

    let result = run(&fixture, &MemoryStore::new(), &req, Vec::new()).unwrap();
    assert!(result.crl_references.is_empty());
    assert!(result.evidence.iter().all(|e| e.kinds.is_empty()));
}

#[test]
fn cache_store_is_consulted() {
    let fixture = Fixture::new();
    let cache = fixture.store();
    let empty = MemoryStore::new();
    let req = rev_req(RevocationMode::Crl, RevocationMode::Ocsp);
    let declared =
        DeclaredReferences::new(fixture.declared(RevocationMode::Crl, RevocationMode::Ocsp));

    RevocationMatcher::default()
        .match_references(
            &fixture.path,
            &req,
            &declared,
            EvidenceSources::new(&empty, &empty).with_cache(&cache),
            reference_time(),
        )
        .unwrap();
}

#[test]
fn expired_deadline_stops_lookups() {
    let fixture = Fixture::new();
    let store = fixture.store();
    let deadline = Deadline::at(Instant::now());
    std::thread::sleep(Duration::from_millis(2));

    let err = RevocationMatcher::new(&crate::crypto::DefaultDigestProvider, deadline)
        .match_references(
            &fixture.path,
            &rev_req(RevocationMode::Crl, RevocationMode::Crl),
            &DeclaredReferences::default(),
            EvidenceSources::new(&store, &store),
            reference_time(),
        )
        .unwrap_err();
    assert_eq!(err, CrossRefError::DeadlineExceeded);
}

#[test]
fn status_check_reports_revoked_ocsp() {
    let fixture = Fixture::new();
    let revoked = fixture
        .ca
        .ocsp_response(&fixture.end, produced_at(), Some(utc(2024, 1, 2, 0, 0, 0)));
    let mut store = MemoryStore::new();
    store.add_ocsp_response(OcspResponse::from_der(&revoked).unwrap());

    let err = RevocationMatcher::default()
        .check_status(
            &fixture.path,
            &rev_req(RevocationMode::Ocsp, RevocationMode::None),
            EvidenceSources::new(&store, &store),
            reference_time(),
        )
        .unwrap_err();
    assert!(matches!(err, CrossRefError::Revoked { .. }));

    let report = RevocationMatcher::default()
        .check_status(
            &fixture.path,
            &rev_req(RevocationMode::None, RevocationMode::None),
            EvidenceSources::new(&store, &store),
            reference_time(),
        )
        .unwrap();
    assert!(report.skipped());
}

#[test]
fn store_failures_are_lookup_errors() {
    struct Offline;

    impl ValidationStore for Offline {
        fn certificate(
            &self,
            _: &CertSelector,
            _: &Deadline,
        ) -> Result<Option<Certificate>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        fn crls(
            &self,
            _: &CertSelector,
            _: DateTime<Utc>,
            _: &Deadline,
        ) -> Result<Vec<Crl>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        fn ocsp_responses(&self, _: &Deadline) -> Result<Vec<OcspResponse>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    let fixture = Fixture::new();
    let err = RevocationMatcher::default()
        .match_references(
            &fixture.path,
            &rev_req(RevocationMode::Crl, RevocationMode::None),
            &DeclaredReferences::default(),
            EvidenceSources::new(&Offline, &Offline),
            reference_time(),
        )
        .unwrap_err();
    assert_eq!(err, CrossRefError::Lookup("offline".to_string()));
}

#[test]
fn delegated_ocsp_responder_is_evidence() {
    let fixture = Fixture::new();
    let responder = fixture.ca.issue_ocsp_responder("Issuing CA OCSP", 10, 10);
    let ocsp = fixture
        .ca
        .ocsp_response_by(&responder, &fixture.end, produced_at(), None, true);
    let mut store = MemoryStore::new();
    store.add_ocsp_response(OcspResponse::from_der(&ocsp).unwrap());

    let req = rev_req(RevocationMode::Ocsp, RevocationMode::None);
    let result = run(&fixture, &store, &req, vec![vec![ocsp_ref(&responder)]]).unwrap();
    assert_eq!(result.ocsp_references.len(), 1);
}

#[test]
fn forged_ocsp_responder_is_not_evidence() {
    let fixture = Fixture::new();
    let look_alike = TestCert::self_signed("Issuing CA", 99, 77);
    let forged = fixture
        .ca
        .ocsp_response_by(&look_alike, &fixture.end, produced_at(), None, true);
    let mut store = MemoryStore::new();
    store.add_ocsp_response(OcspResponse::from_der(&forged).unwrap());

    let req = rev_req(RevocationMode::Ocsp, RevocationMode::None);
    let err = run(&fixture, &store, &req, vec![vec![ocsp_ref(&fixture.ca)]]).unwrap_err();
    assert!(
        matches!(
            err,
            CrossRefError::MissingEvidence {
                tier: Tier::EndEntity,
                kind: EvidenceKind::Ocsp,
                ..
            }
        ),
        "{err}"
    );
}

#[test]
fn ocsp_response_outside_reference_time_is_not_evidence() {
    let fixture = Fixture::new();
    let req = rev_req(RevocationMode::Ocsp, RevocationMode::None);

    // Stale: current from 2023-06-01 for seven days.
    // Early: current only from 2024-01-31, after the reference time.
    for produced in [utc(2023, 6, 1, 12, 0, 0), utc(2024, 2, 1, 0, 0, 0)] {
        let ocsp = fixture.ca.ocsp_response(&fixture.end, produced, None);
        let mut store = MemoryStore::new();
        store.add_ocsp_response(OcspResponse::from_der(&ocsp).unwrap());

        let declared = vec![vec![RevocationReference::Ocsp(OcspReference {
            responder: ResponderRef::ByName(fixture.ca.name_der()),
            produced_at: produced,
            digest: None,
        })]];
        let err = run(&fixture, &store, &req, declared).unwrap_err();
        assert!(
            matches!(err, CrossRefError::MissingEvidence { kind: EvidenceKind::Ocsp, .. }),
            "{produced}: {err}"
        );
    }
}
