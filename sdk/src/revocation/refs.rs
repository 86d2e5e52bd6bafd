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

//! References declared by the `revocationRefs` and `certificateRefs`
//! attributes.

use chrono::{DateTime, Utc};
use rasn_pkix::GeneralName;

use super::{path::CertificatePath, CrossRefError, EvidenceKind, Tier};
use crate::crypto::{
    asn1::{generalized_time_to_utc, integer_content, oid_to_string, rfc5126},
    hash::{DigestAlgorithm, DigestProvider},
    ocsp::ResponderRef,
    Certificate, Crl, OcspResponse,
};

/// Digest of a referenced object, with the algorithm that produced it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OtherHash {
    pub algorithm: DigestAlgorithm,
    pub value: Vec<u8>,
}

impl OtherHash {
    fn from_asn1(hash: &rfc5126::OtherHash) -> Result<Self, CrossRefError> {
        match hash {
            rfc5126::OtherHash::Sha1Hash(value) => Ok(Self {
                algorithm: DigestAlgorithm::Sha1,
                value: value.to_vec(),
            }),
            rfc5126::OtherHash::OtherHash(other) => {
                let oid = oid_to_string(&other.hash_algorithm.algorithm);
                let algorithm = DigestAlgorithm::from_oid(&oid).ok_or_else(|| {
                    CrossRefError::Malformed(format!("unsupported reference digest {oid}"))
                })?;
                Ok(Self {
                    algorithm,
                    value: other.hash_value.to_vec(),
                })
            }
        }
    }

    /// Returns `true` if `data` hashes to this value.
    pub fn matches(&self, data: &[u8], digests: &dyn DigestProvider) -> bool {
        digests.hash(data, self.algorithm) == self.value
    }
}

/// Reference to a CRL.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrlReference {
    /// Digest over the complete `CertificateList`.
    pub digest: OtherHash,

    /// Issuer `Name` in DER.
    pub issuer: Option<Vec<u8>>,
    pub issued_time: Option<DateTime<Utc>>,

    /// CRL number content octets.
    pub number: Option<Vec<u8>>,
}

impl CrlReference {
    pub fn identifies(&self, crl: &Crl, digests: &dyn DigestProvider) -> bool {
        self.digest.matches(crl.der(), digests)
    }
}

/// Reference to an OCSP response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OcspReference {
    pub responder: ResponderRef,
    pub produced_at: DateTime<Utc>,

    /// Digest over the `BasicOCSPResponse`.
    pub digest: Option<OtherHash>,
}

impl OcspReference {
    /// Matches by digest when one is declared, otherwise by responder and
    /// production time.
    pub fn identifies(&self, response: &OcspResponse, digests: &dyn DigestProvider) -> bool {
        match &self.digest {
            Some(digest) => digest.matches(response.der(), digests),
            None => {
                &self.responder == response.responder()
                    && self.produced_at == response.produced_at()
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RevocationReference {
    Crl(CrlReference),
    Ocsp(OcspReference),
}

/// Declared revocation references, one group per certificate in
/// declaration order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeclaredReferences {
    groups: Vec<Vec<RevocationReference>>,
}

impl DeclaredReferences {
    pub fn new(groups: Vec<Vec<RevocationReference>>) -> Self {
        Self { groups }
    }

    /// Reads the value of a `revocationRefs` attribute
    /// (`CompleteRevocationRefs`).
    pub fn from_der(der: &[u8]) -> Result<Self, CrossRefError> {
        let refs: rfc5126::CompleteRevocationRefs = rasn::der::decode(der)
            .map_err(|e| CrossRefError::Malformed(format!("invalid revocation references: {e}")))?;

        let mut groups = Vec::with_capacity(refs.len());
        for crl_ocsp in &refs {
            let mut group = Vec::new();
            for id in crl_ocsp.crlids.iter().flat_map(|l| l.crls.iter()) {
                group.push(RevocationReference::Crl(crl_reference(id)?));
            }
            for id in crl_ocsp.ocspids.iter().flat_map(|l| l.ocsp_responses.iter()) {
                group.push(RevocationReference::Ocsp(OcspReference {
                    responder: ResponderRef::from_rasn(&id.ocsp_identifier.ocsp_responder_id)
                        .map_err(|e| CrossRefError::Malformed(e.to_string()))?,
                    produced_at: generalized_time_to_utc(&id.ocsp_identifier.produced_at),
                    digest: id.ocsp_rep_hash.as_ref().map(OtherHash::from_asn1).transpose()?,
                }));
            }
            groups.push(group);
        }
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[Vec<RevocationReference>] {
        &self.groups
    }

    pub fn crl_count(&self) -> usize {
        self.crls().count()
    }

    pub fn ocsp_count(&self) -> usize {
        self.ocsp().count()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }

    fn indexed(&self) -> impl Iterator<Item = (usize, &RevocationReference)> {
        self.groups.iter().flatten().enumerate()
    }

    /// CRL references with their position among all references.
    pub fn crls(&self) -> impl Iterator<Item = (usize, &CrlReference)> {
        self.indexed().filter_map(|(i, r)| match r {
            RevocationReference::Crl(crl) => Some((i, crl)),
            RevocationReference::Ocsp(_) => None,
        })
    }

    /// OCSP references with their position among all references.
    pub fn ocsp(&self) -> impl Iterator<Item = (usize, &OcspReference)> {
        self.indexed().filter_map(|(i, r)| match r {
            RevocationReference::Ocsp(ocsp) => Some((i, ocsp)),
            RevocationReference::Crl(_) => None,
        })
    }
}

fn crl_reference(id: &rfc5126::CrlValidatedId) -> Result<CrlReference, CrossRefError> {
    let identifier = id.crl_identifier.as_ref();
    let issuer = identifier
        .map(|i| rasn::der::encode(&i.crlissuer))
        .transpose()
        .map_err(|e| CrossRefError::Malformed(e.to_string()))?;

    Ok(CrlReference {
        digest: OtherHash::from_asn1(&id.crl_hash)?,
        issuer,
        issued_time: identifier.map(|i| i.crl_issued_time),
        number: identifier
            .and_then(|i| i.crl_number.as_ref())
            .and_then(integer_content),
    })
}

/// Reference to a certificate from the `certificateRefs` attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateReference {
    pub digest: OtherHash,

    /// Issuer `Name` in DER and serial content octets, when declared.
    pub issuer_serial: Option<(Vec<u8>, Vec<u8>)>,
}

impl CertificateReference {
    pub fn identifies(&self, cert: &Certificate, digests: &dyn DigestProvider) -> bool {
        let serial_ok = self
            .issuer_serial
            .as_ref()
            .map_or(true, |(issuer, serial)| issuer == cert.issuer() && serial == cert.serial());
        serial_ok && self.digest.matches(cert.der(), digests)
    }
}

/// Certificates referenced by a `certificateRefs` attribute.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeclaredCertificates {
    pub refs: Vec<CertificateReference>,
}

impl DeclaredCertificates {
    /// Reads the value of a `certificateRefs` attribute
    /// (`CompleteCertificateRefs`).
    pub fn from_der(der: &[u8]) -> Result<Self, CrossRefError> {
        let ids: rfc5126::CompleteCertificateRefs = rasn::der::decode(der).map_err(|e| {
            CrossRefError::Malformed(format!("invalid certificate references: {e}"))
        })?;

        let refs = ids
            .iter()
            .map(|id| {
                Ok(CertificateReference {
                    digest: OtherHash::from_asn1(&id.other_cert_hash)?,
                    issuer_serial: id.issuer_serial.as_ref().and_then(issuer_serial),
                })
            })
            .collect::<Result<_, CrossRefError>>()?;
        Ok(Self { refs })
    }

    /// Checks that every certificate of `path` above the end-entity is
    /// referenced and that nothing else is.
    pub fn reconcile(
        &self,
        path: &CertificatePath,
        digests: &dyn DigestProvider,
    ) -> Result<(), CrossRefError> {
        let mut consumed = vec![false; self.refs.len()];
        for cert in path.cas().iter().chain(path.anchor()) {
            let hit = self
                .refs
                .iter()
                .position(|r| r.identifies(cert, digests))
                .ok_or_else(|| CrossRefError::MissingReference {
                    tier: Tier::Ca,
                    kind: EvidenceKind::Certificate,
                    subject: cert.subject_name().to_owned(),
                })?;
            consumed[hit] = true;
        }

        let used = consumed.iter().filter(|c| **c).count();
        if used != self.refs.len() {
            return Err(CrossRefError::ExcessReference {
                kind: EvidenceKind::Certificate,
                declared: self.refs.len(),
                consumed: used,
            });
        }
        Ok(())
    }
}

pub(crate) fn issuer_serial(is: &rfc5126::IssuerSerial) -> Option<(Vec<u8>, Vec<u8>)> {
    let name = is.issuer.iter().find_map(|n| match n {
        GeneralName::DirectoryName(name) => rasn::der::encode(name).ok(),
        _ => None,
    })?;
    Some((name, integer_content(&is.serial_number)?))
}
