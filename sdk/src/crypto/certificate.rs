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


use chrono::{DateTime, Duration, Utc};
use x509_parser::{extensions::ParsedExtension, prelude::*};

use crate::crypto::{
    asn1::asn1_time_to_utc,
    hash::sha1,
    raw_signature::{validator_for_sig_and_hash_algs, RawSignatureValidationError},
    EvidenceError,
};

/// Owned view of the parts of an X.509 certificate the verifier looks at.
///
/// Names are kept as their DER encoding so issuer/subject comparisons are
/// byte comparisons. Serial numbers are INTEGER content octets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Certificate {
    der: Vec<u8>,
    tbs: Vec<u8>,
    subject: Vec<u8>,
    issuer: Vec<u8>,
    subject_name: String,
    serial: Vec<u8>,
    spki: Vec<u8>,
    key_bits: Vec<u8>,
    signature_algorithm: String,
    signature: Vec<u8>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    subject_key_id: Option<Vec<u8>>,
    is_ca: bool,
    path_len_constraint: Option<u32>,
    time_stamping: bool,
    ocsp_signing: bool,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self, EvidenceError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| EvidenceError::Certificate(e.to_string()))?;

        let validity = cert.validity();
        let not_before = asn1_time_to_utc(validity.not_before)
            .ok_or_else(|| EvidenceError::Certificate("notBefore out of range".to_string()))?;
        let not_after = asn1_time_to_utc(validity.not_after)
            .ok_or_else(|| EvidenceError::Certificate("notAfter out of range".to_string()))?;

        let mut subject_key_id = None;
        let mut is_ca = false;
        let mut path_len_constraint = None;
        let mut time_stamping = false;
        let mut ocsp_signing = false;

        for ext in cert.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::SubjectKeyIdentifier(kid) => {
                    subject_key_id = Some(kid.0.to_vec());
                }
                ParsedExtension::BasicConstraints(bc) => {
                    is_ca = bc.ca;
                    path_len_constraint = bc.path_len_constraint;
                }
                ParsedExtension::ExtendedKeyUsage(eku) => {
                    time_stamping = eku.time_stamping;
                    ocsp_signing = eku.ocsp_signing;
                }
                _ => (),
            }
        }

        let public_key = cert.public_key();

        Ok(Self {
            der: der.to_vec(),
            tbs: cert.tbs_certificate.as_ref().to_vec(),
            subject: cert.subject().as_raw().to_vec(),
            issuer: cert.issuer().as_raw().to_vec(),
            subject_name: cert.subject().to_string(),
            serial: cert.tbs_certificate.raw_serial().to_vec(),
            spki: public_key.raw.to_vec(),
            key_bits: public_key.subject_public_key.data.to_vec(),
            signature_algorithm: cert.signature_algorithm.algorithm.to_id_string(),
            signature: cert.signature_value.data.to_vec(),
            not_before,
            not_after,
            subject_key_id,
            is_ca,
            path_len_constraint,
            time_stamping,
            ocsp_signing,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// DER-encoded subject `Name`.
    pub fn subject(&self) -> &[u8] {
        &self.subject
    }

    /// DER-encoded issuer `Name`.
    pub fn issuer(&self) -> &[u8] {
        &self.issuer
    }

    /// Subject rendered for logs and reports.
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// DER-encoded `SubjectPublicKeyInfo`.
    pub fn spki(&self) -> &[u8] {
        &self.spki
    }

    /// Contents of the `subjectPublicKey` BIT STRING, as hashed into OCSP
    /// `CertID`s.
    pub fn key_bits(&self) -> &[u8] {
        &self.key_bits
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.subject_key_id.as_deref()
    }

    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    pub fn path_len_constraint(&self) -> Option<u32> {
        self.path_len_constraint
    }

    /// Returns `true` if the certificate carries the `id-kp-timeStamping`
    /// extended key usage.
    pub fn has_time_stamping_eku(&self) -> bool {
        self.time_stamping
    }

    /// Returns `true` if the certificate carries the `id-kp-OCSPSigning`
    /// extended key usage.
    pub fn has_ocsp_signing_eku(&self) -> bool {
        self.ocsp_signing
    }

    pub fn sha1_thumbprint(&self) -> Vec<u8> {
        sha1(&self.der)
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Returns `true` if `time` lies within the validity period, widened by
    /// `skew` on both ends.
    pub fn valid_at(&self, time: DateTime<Utc>, skew: Duration) -> bool {
        self.not_before - skew <= time && time <= self.not_after + skew
    }

    /// Checks that this certificate was signed by `issuer`'s key.
    pub fn verify_issued_by(&self, issuer: &Certificate) -> Result<(), RawSignatureValidationError> {
        if self.issuer != issuer.subject {
            return Err(RawSignatureValidationError::SignatureMismatch);
        }

        let validator = validator_for_sig_and_hash_algs(&self.signature_algorithm, "")
            .ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;

        validator.validate(&self.signature, &self.tbs, &issuer.spki)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;

    use super::*;
    use crate::utils::test::TestCert;

    #[test]
    fn parses_issued_certificate() {
        let ca = TestCert::self_signed("Test Root", 1, 1);
        let ee = ca.issue("Test Signer", 42, 2);

        let cert = Certificate::from_der(&ee.der).unwrap();
        assert_eq!(cert.issuer(), Certificate::from_der(&ca.der).unwrap().subject());
        assert_eq!(cert.serial(), &[42]);
        assert!(cert.subject_name().contains("Test Signer"));
        assert!(!cert.is_self_issued());
        assert!(!cert.has_time_stamping_eku());
        assert_eq!(cert.sha1_thumbprint().len(), 20);
    }

    #[test]
    fn signature_chain() {
        let ca = TestCert::self_signed("Test Root", 1, 1);
        let ee = ca.issue("Test Signer", 2, 2);
        let other = TestCert::self_signed("Other Root", 3, 3);

        let ca = Certificate::from_der(&ca.der).unwrap();
        let ee = Certificate::from_der(&ee.der).unwrap();
        let other = Certificate::from_der(&other.der).unwrap();

        ee.verify_issued_by(&ca).unwrap();
        ca.verify_issued_by(&ca).unwrap();
        assert!(ee.verify_issued_by(&other).is_err());
    }

    #[test]
    fn validity_window() {
        let cert = Certificate::from_der(&TestCert::self_signed("Test Root", 1, 1).der).unwrap();

        let inside = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 0).unwrap();

        assert!(cert.valid_at(inside, Duration::zero()));
        assert!(!cert.valid_at(before, Duration::zero()));
        assert!(cert.valid_at(before, Duration::minutes(5)));
    }

    #[test]
    fn time_stamping_eku() {
        let ca = TestCert::self_signed("Test Root", 1, 1);
        let tsa = ca.issue_tsa("Test TSA", 9, 4);

        assert!(Certificate::from_der(&tsa.der).unwrap().has_time_stamping_eku());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Certificate::from_der(&[0x30, 0x03, 0x02, 0x01, 0x01]),
            Err(EvidenceError::Certificate(_))
        ));
    }
}
