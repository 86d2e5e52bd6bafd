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

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::{
    path::CertificatePath,
    refs::{CrlReference, DeclaredReferences, OcspReference},
    store::CertSelector,
    CrossRefError, EvidenceKind, Tier, ValidationStore,
};
use crate::{
    crypto::{
        ocsp::{CertStatus, SingleResponse},
        Certificate, Crl, DefaultDigestProvider, DigestProvider, OcspResponse,
    },
    deadline::Deadline,
    policy::{CertRevReq, RevocationMode},
};

/// Where revocation evidence is looked up, in order.
#[derive(Clone, Copy)]
pub struct EvidenceSources<'a> {
    /// Evidence carried by the signature itself (`revocationValues`).
    pub available: &'a dyn ValidationStore,

    /// Certificates and evidence collected while reading the signature.
    pub identity: &'a dyn ValidationStore,

    /// Caller-supplied validation data.
    pub cache: Option<&'a dyn ValidationStore>,
}

impl<'a> EvidenceSources<'a> {
    pub fn new(available: &'a dyn ValidationStore, identity: &'a dyn ValidationStore) -> Self {
        Self {
            available,
            identity,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a dyn ValidationStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &'a dyn ValidationStore> {
        [Some(self.available), Some(self.identity), self.cache]
            .into_iter()
            .flatten()
    }
}

/// Evidence found for one certificate of the path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TierEvidence {
    pub tier: Tier,
    pub subject: String,
    pub mode: RevocationMode,

    /// Kinds of evidence that satisfied `mode`. Empty when the mode skips
    /// checking.
    pub kinds: Vec<EvidenceKind>,
}

/// Outcome of a successful reconciliation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MatchResult {
    /// Declared CRL references consumed by required evidence.
    pub crl_references: Vec<CrlReference>,

    /// Declared OCSP references consumed by required evidence.
    pub ocsp_references: Vec<OcspReference>,
    pub evidence: Vec<TierEvidence>,
}

/// Outcome of a status check without references.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StatusReport {
    pub evidence: Vec<TierEvidence>,
}

impl StatusReport {
    /// Returns `true` if no certificate of the path needed checking.
    pub fn skipped(&self) -> bool {
        self.evidence.iter().all(|e| e.kinds.is_empty())
    }
}

/// Finds the revocation evidence a policy requires and reconciles it with
/// the references a signature declares.
pub struct RevocationMatcher<'a> {
    digests: &'a dyn DigestProvider,
    deadline: Deadline,
}

impl Default for RevocationMatcher<'_> {
    fn default() -> Self {
        Self::new(&DefaultDigestProvider, Deadline::none())
    }
}

// Consumed reference indices, per kind.
#[derive(Default)]
struct Consumed {
    crl: BTreeSet<usize>,
    ocsp: BTreeSet<usize>,
}

impl<'a> RevocationMatcher<'a> {
    pub fn new(digests: &'a dyn DigestProvider, deadline: Deadline) -> Self {
        Self { digests, deadline }
    }

    /// Checks every end-entity and CA certificate of `path` against
    /// `rev_req` and requires the declared references to be in exact
    /// correspondence with the evidence used.
    pub fn match_references(
        &self,
        path: &CertificatePath,
        rev_req: &CertRevReq,
        declared: &DeclaredReferences,
        sources: EvidenceSources<'_>,
        reference_time: DateTime<Utc>,
    ) -> Result<MatchResult, CrossRefError> {
        let mut consumed = Consumed::default();
        let mut evidence = Vec::new();

        for (tier, cert, issuer) in path.tiers() {
            let mode = mode_for(rev_req, tier);
            let kinds = self.satisfy(
                mode,
                tier,
                cert,
                issuer,
                sources,
                reference_time,
                Some((declared, &mut consumed)),
            )?;
            evidence.push(TierEvidence {
                tier,
                subject: cert.subject_name().to_owned(),
                mode,
                kinds,
            });
        }

        for (kind, declared_count, used) in [
            (EvidenceKind::Crl, declared.crl_count(), consumed.crl.len()),
            (EvidenceKind::Ocsp, declared.ocsp_count(), consumed.ocsp.len()),
        ] {
            if used != declared_count {
                warn!("{declared_count} {kind} references declared, {used} consumed");
                return Err(CrossRefError::ExcessReference {
                    kind,
                    declared: declared_count,
                    consumed: used,
                });
            }
        }

        Ok(MatchResult {
            crl_references: declared
                .crls()
                .filter(|(i, _)| consumed.crl.contains(i))
                .map(|(_, r)| r.clone())
                .collect(),
            ocsp_references: declared
                .ocsp()
                .filter(|(i, _)| consumed.ocsp.contains(i))
                .map(|(_, r)| r.clone())
                .collect(),
            evidence,
        })
    }

    /// Checks the revocation status of `path` without reconciling
    /// references. Used for time-stamp authority paths.
    pub fn check_status(
        &self,
        path: &CertificatePath,
        rev_req: &CertRevReq,
        sources: EvidenceSources<'_>,
        reference_time: DateTime<Utc>,
    ) -> Result<StatusReport, CrossRefError> {
        let mut evidence = Vec::new();
        for (tier, cert, issuer) in path.tiers() {
            let mode = mode_for(rev_req, tier);
            let kinds = self.satisfy(mode, tier, cert, issuer, sources, reference_time, None)?;
            evidence.push(TierEvidence {
                tier,
                subject: cert.subject_name().to_owned(),
                mode,
                kinds,
            });
        }
        Ok(StatusReport { evidence })
    }

    #[allow(clippy::too_many_arguments)]
    fn satisfy(
        &self,
        mode: RevocationMode,
        tier: Tier,
        cert: &Certificate,
        issuer: Option<&Certificate>,
        sources: EvidenceSources<'_>,
        time: DateTime<Utc>,
        mut refs: Option<(&DeclaredReferences, &mut Consumed)>,
    ) -> Result<Vec<EvidenceKind>, CrossRefError> {
        match mode {
            RevocationMode::None | RevocationMode::Other => {
                debug!("revocation check skipped for {tier} certificate {}", cert.subject_name());
                Ok(Vec::new())
            }
            RevocationMode::Crl => {
                self.crl_evidence(tier, cert, issuer, sources, time, &mut refs)?;
                Ok(vec![EvidenceKind::Crl])
            }
            RevocationMode::Ocsp => {
                self.ocsp_evidence(tier, cert, issuer, sources, time, &mut refs)?;
                Ok(vec![EvidenceKind::Ocsp])
            }
            RevocationMode::Both => {
                self.crl_evidence(tier, cert, issuer, sources, time, &mut refs)?;
                self.ocsp_evidence(tier, cert, issuer, sources, time, &mut refs)?;
                Ok(vec![EvidenceKind::Crl, EvidenceKind::Ocsp])
            }
            RevocationMode::Either => match self
                .crl_evidence(tier, cert, issuer, sources, time, &mut refs)
            {
                Ok(()) => Ok(vec![EvidenceKind::Crl]),
                Err(err @ (CrossRefError::MissingEvidence { .. }
                | CrossRefError::MissingReference { .. })) => {
                    debug!("falling back to OCSP for {}: {err}", cert.subject_name());
                    self.ocsp_evidence(tier, cert, issuer, sources, time, &mut refs)
                        .map_err(|ocsp_err| match ocsp_err {
                            CrossRefError::MissingEvidence { .. } => err,
                            other => other,
                        })?;
                    Ok(vec![EvidenceKind::Ocsp])
                }
                Err(err) => Err(err),
            },
        }
    }

    fn crl_evidence(
        &self,
        tier: Tier,
        cert: &Certificate,
        issuer: Option<&Certificate>,
        sources: EvidenceSources<'_>,
        time: DateTime<Utc>,
        refs: &mut Option<(&DeclaredReferences, &mut Consumed)>,
    ) -> Result<(), CrossRefError> {
        let selector = CertSelector {
            issuer: Some(cert.issuer().to_vec()),
            ..Default::default()
        };

        let mut newest: Option<Crl> = None;
        for store in sources.iter() {
            self.deadline.check()?;
            for crl in store.crls(&selector, time, &self.deadline)? {
                if crl.issuer() != cert.issuer() || !crl.covers(time) {
                    continue;
                }
                if let Some(issuer) = issuer {
                    if let Err(err) = crl.verify_signature(issuer) {
                        warn!("ignoring CRL from {}: {err}", crl.issuer_name());
                        continue;
                    }
                }
                if newest
                    .as_ref()
                    .map_or(true, |n| crl.this_update() > n.this_update())
                {
                    newest = Some(crl);
                }
            }
        }

        let crl = newest.ok_or_else(|| CrossRefError::MissingEvidence {
            tier,
            kind: EvidenceKind::Crl,
            subject: cert.subject_name().to_owned(),
        })?;

        if let Some(revoked_at) = crl.revocation_of(cert.serial()) {
            if revoked_at <= time {
                return Err(CrossRefError::Revoked {
                    subject: cert.subject_name().to_owned(),
                    revoked_at,
                });
            }
        }

        if let Some((declared, consumed)) = refs {
            let (index, _) = declared
                .crls()
                .find(|(_, r)| r.identifies(&crl, self.digests))
                .ok_or_else(|| CrossRefError::MissingReference {
                    tier,
                    kind: EvidenceKind::Crl,
                    subject: cert.subject_name().to_owned(),
                })?;
            consumed.crl.insert(index);
        }
        Ok(())
    }

    fn ocsp_evidence(
        &self,
        tier: Tier,
        cert: &Certificate,
        issuer: Option<&Certificate>,
        sources: EvidenceSources<'_>,
        time: DateTime<Utc>,
        refs: &mut Option<(&DeclaredReferences, &mut Consumed)>,
    ) -> Result<(), CrossRefError> {
        let missing = || CrossRefError::MissingEvidence {
            tier,
            kind: EvidenceKind::Ocsp,
            subject: cert.subject_name().to_owned(),
        };
        let issuer = issuer.ok_or_else(missing)?;

        let mut candidates: Vec<(OcspResponse, SingleResponse)> = Vec::new();
        for store in sources.iter() {
            self.deadline.check()?;
            for response in store.ocsp_responses(&self.deadline)? {
                let Some(single) = response.response_for(cert, issuer).cloned() else {
                    continue;
                };
                if !single.covers(time) {
                    debug!(
                        "OCSP response for {} is not current at {time}",
                        cert.subject_name()
                    );
                    continue;
                }
                if let Err(err) = response.verify_signature(issuer) {
                    warn!("ignoring OCSP response for {}: {err}", cert.subject_name());
                    continue;
                }
                candidates.push((response, single));
            }
        }
        if candidates.is_empty() {
            return Err(missing());
        }

        let chosen = match refs {
            Some((declared, consumed)) => {
                let (index, response, single) = candidates
                    .iter()
                    .filter_map(|(response, single)| {
                        declared
                            .ocsp()
                            .find(|(_, r)| r.identifies(response, self.digests))
                            .map(|(i, _)| (i, response, single))
                    })
                    .max_by_key(|(_, response, _)| response.produced_at())
                    .ok_or_else(|| CrossRefError::MissingReference {
                        tier,
                        kind: EvidenceKind::Ocsp,
                        subject: cert.subject_name().to_owned(),
                    })?;
                consumed.ocsp.insert(index);
                (response, single)
            }
            None => candidates
                .iter()
                .max_by_key(|(response, _)| response.produced_at())
                .map(|(response, single)| (response, single))
                .ok_or_else(missing)?,
        };

        match chosen.1.status {
            CertStatus::Revoked(revoked_at) if revoked_at <= time => Err(CrossRefError::Revoked {
                subject: cert.subject_name().to_owned(),
                revoked_at,
            }),
            CertStatus::Unknown => Err(missing()),
            _ => Ok(()),
        }
    }
}

fn mode_for(rev_req: &CertRevReq, tier: Tier) -> RevocationMode {
    match tier {
        Tier::EndEntity => rev_req.end_cert_rev_req.mode,
        Tier::Ca => rev_req.ca_certs.mode,
    }
}
