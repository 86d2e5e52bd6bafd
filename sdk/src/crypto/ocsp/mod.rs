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

//! Parsed view of OCSP responses.

use chrono::{DateTime, Utc};
use log::debug;
use rasn_ocsp::{BasicOcspResponse, CertStatus as RasnCertStatus, OcspResponseStatus};

use crate::crypto::{
    asn1::{generalized_time_to_utc, integer_content, oid_to_string, read_tlv},
    hash::{sha1, DigestAlgorithm},
    raw_signature::{validator_for_sig_and_hash_algs, RawSignatureValidationError},
    Certificate, EvidenceError,
};

/// Identifies an OCSP responder: by the DER encoding of its `Name` or by the
/// SHA-1 hash of its public key bits.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ResponderRef {
    ByName(Vec<u8>),
    ByKey(Vec<u8>),
}

impl ResponderRef {
    pub(crate) fn from_rasn(id: &rasn_ocsp::ResponderId) -> Result<Self, EvidenceError> {
        match id {
            rasn_ocsp::ResponderId::ByName(name) => rasn::der::encode(name)
                .map(ResponderRef::ByName)
                .map_err(|e| EvidenceError::Ocsp(e.to_string())),
            rasn_ocsp::ResponderId::ByKey(hash) => Ok(ResponderRef::ByKey(hash.to_vec())),
        }
    }

    /// Returns `true` if `cert` is the responder this identifies.
    pub fn identifies(&self, cert: &Certificate) -> bool {
        match self {
            ResponderRef::ByName(name) => name == cert.subject(),
            ResponderRef::ByKey(hash) => *hash == sha1(cert.key_bits()),
        }
    }
}

/// Status carried by one `SingleResponse`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CertStatus {
    Good,
    Revoked(DateTime<Utc>),
    Unknown,
}

/// One `SingleResponse` of an OCSP response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SingleResponse {
    pub hash_algorithm: Option<DigestAlgorithm>,
    pub issuer_name_hash: Vec<u8>,
    pub issuer_key_hash: Vec<u8>,
    pub serial: Vec<u8>,
    pub status: CertStatus,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
}

impl SingleResponse {
    /// Returns `true` if the `CertID` names `cert` as issued by `issuer`.
    pub fn matches(&self, cert: &Certificate, issuer: &Certificate) -> bool {
        let Some(alg) = self.hash_algorithm else {
            return false;
        };

        self.serial == cert.serial()
            && self.issuer_name_hash == alg.digest(issuer.subject())
            && self.issuer_key_hash == alg.digest(issuer.key_bits())
    }

    /// Returns `true` if `time` falls within `thisUpdate..=nextUpdate`. A
    /// response without `nextUpdate` stays current after `thisUpdate`.
    pub fn covers(&self, time: DateTime<Utc>) -> bool {
        self.this_update <= time && self.next_update.map_or(true, |next| time <= next)
    }
}

/// Owned view of a `BasicOCSPResponse`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OcspResponse {
    der: Vec<u8>,
    tbs: Vec<u8>,
    responder: ResponderRef,
    produced_at: DateTime<Utc>,
    responses: Vec<SingleResponse>,
    certs: Vec<Certificate>,
    signature_algorithm: String,
    signature: Vec<u8>,
}

impl OcspResponse {
    /// Reads either a complete `OCSPResponse` or a bare `BasicOCSPResponse`.
    ///
    /// An `OCSPResponse` whose status is not `successful` carries no
    /// revocation evidence and is rejected.
    pub fn from_der(der: &[u8]) -> Result<Self, EvidenceError> {
        if let Ok(response) = rasn::der::decode::<rasn_ocsp::OcspResponse>(der) {
            if response.status != OcspResponseStatus::Successful {
                return Err(EvidenceError::Ocsp(format!(
                    "response status is {:?}",
                    response.status
                )));
            }

            let Some(bytes) = response.bytes else {
                return Err(EvidenceError::Ocsp("no response bytes".to_string()));
            };

            return Self::from_basic_der(&bytes.response);
        }

        Self::from_basic_der(der)
    }

    fn from_basic_der(der: &[u8]) -> Result<Self, EvidenceError> {
        let basic = rasn::der::decode::<BasicOcspResponse>(der)
            .map_err(|e| EvidenceError::Ocsp(e.to_string()))?;

        let data = &basic.tbs_response_data;

        // The signature covers the `tbsResponseData` bytes as received.
        let tbs = read_tlv(der)
            .and_then(|(outer, _)| read_tlv(outer.content))
            .map(|(tbs, _)| tbs.raw.to_vec())
            .ok_or_else(|| EvidenceError::Ocsp("cannot locate tbsResponseData".to_string()))?;

        let mut responses = Vec::with_capacity(data.responses.len());
        for single in &data.responses {
            let status = match &single.cert_status {
                RasnCertStatus::Good => CertStatus::Good,
                RasnCertStatus::Revoked(info) => {
                    CertStatus::Revoked(generalized_time_to_utc(&info.revocation_time))
                }
                _ => CertStatus::Unknown,
            };

            responses.push(SingleResponse {
                hash_algorithm: DigestAlgorithm::from_oid(&oid_to_string(
                    &single.cert_id.hash_algorithm.algorithm,
                )),
                issuer_name_hash: single.cert_id.issuer_name_hash.to_vec(),
                issuer_key_hash: single.cert_id.issuer_key_hash.to_vec(),
                serial: integer_content(&single.cert_id.serial_number)
                    .ok_or_else(|| EvidenceError::Ocsp("bad serial number".to_string()))?,
                status,
                this_update: generalized_time_to_utc(&single.this_update),
                next_update: single.next_update.as_ref().map(generalized_time_to_utc),
            });
        }

        let mut certs = Vec::new();
        for cert in basic.certs.iter().flatten() {
            let cert_der = rasn::der::encode(cert).map_err(|e| EvidenceError::Ocsp(e.to_string()))?;
            certs.push(Certificate::from_der(&cert_der)?);
        }

        Ok(Self {
            der: der.to_vec(),
            tbs,
            responder: ResponderRef::from_rasn(&data.responder_id)?,
            produced_at: generalized_time_to_utc(&data.produced_at),
            responses,
            certs,
            signature_algorithm: oid_to_string(&basic.signature_algorithm.algorithm),
            signature: basic.signature.as_raw_slice().to_vec(),
        })
    }

    /// DER encoding of the `BasicOCSPResponse`, the form revocation
    /// references hash.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn responder(&self) -> &ResponderRef {
        &self.responder
    }

    pub fn produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }

    pub fn responses(&self) -> &[SingleResponse] {
        &self.responses
    }

    /// Certificates embedded in the response.
    pub fn certs(&self) -> &[Certificate] {
        &self.certs
    }

    /// The single response for `cert`, if this response covers it.
    pub fn response_for(&self, cert: &Certificate, issuer: &Certificate) -> Option<&SingleResponse> {
        self.responses.iter().find(|r| r.matches(cert, issuer))
    }

    /// Verifies that the response was signed on behalf of `issuer`, the CA
    /// that issued the certificates it covers.
    ///
    /// The responder is either `issuer` itself or a delegated responder
    /// embedded in the response, issued by `issuer` and carrying the
    /// `id-kp-OCSPSigning` extended key usage (RFC 6960, 4.2.2.2).
    pub fn verify_signature(&self, issuer: &Certificate) -> Result<(), RawSignatureValidationError> {
        let validator = validator_for_sig_and_hash_algs(&self.signature_algorithm, "")
            .ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;

        if self.responder.identifies(issuer) {
            return validator.validate(&self.signature, &self.tbs, issuer.spki());
        }

        let mut last_err = RawSignatureValidationError::SignatureMismatch;
        for cert in self.certs.iter().filter(|c| self.responder.identifies(c)) {
            if !cert.has_ocsp_signing_eku() {
                debug!("OCSP responder {} lacks id-kp-OCSPSigning", cert.subject_name());
                continue;
            }
            if let Err(err) = cert.verify_issued_by(issuer) {
                debug!(
                    "OCSP responder {} not issued by {}: {err}",
                    cert.subject_name(),
                    issuer.subject_name()
                );
                continue;
            }

            match validator.validate(&self.signature, &self.tbs, cert.spki()) {
                Ok(()) => return Ok(()),
                Err(err) => last_err = err,
            }
        }

        Err(last_err)
    }
}
