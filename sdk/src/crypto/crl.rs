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


use chrono::{DateTime, Utc};
use x509_parser::prelude::*;

use crate::crypto::{
    asn1::asn1_time_to_utc,
    raw_signature::{validator_for_sig_and_hash_algs, RawSignatureValidationError},
    Certificate, EvidenceError,
};

/// Owned view of a certificate revocation list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Crl {
    der: Vec<u8>,
    tbs: Vec<u8>,
    issuer: Vec<u8>,
    issuer_name: String,
    this_update: DateTime<Utc>,
    next_update: Option<DateTime<Utc>>,
    revoked: Vec<(Vec<u8>, DateTime<Utc>)>,
    signature_algorithm: String,
    signature: Vec<u8>,
}

impl Crl {
    pub fn from_der(der: &[u8]) -> Result<Self, EvidenceError> {
        let (_, crl) = CertificateRevocationList::from_der(der)
            .map_err(|e| EvidenceError::Crl(e.to_string()))?;

        let this_update = asn1_time_to_utc(crl.last_update())
            .ok_or_else(|| EvidenceError::Crl("thisUpdate out of range".to_string()))?;
        let next_update = crl.next_update().and_then(asn1_time_to_utc);

        let revoked = crl
            .iter_revoked_certificates()
            .filter_map(|entry| {
                asn1_time_to_utc(entry.revocation_date)
                    .map(|date| (entry.raw_serial().to_vec(), date))
            })
            .collect();

        Ok(Self {
            der: der.to_vec(),
            tbs: crl.tbs_cert_list.as_ref().to_vec(),
            issuer: crl.issuer().as_raw().to_vec(),
            issuer_name: crl.issuer().to_string(),
            this_update,
            next_update,
            revoked,
            signature_algorithm: crl.signature_algorithm.algorithm.to_id_string(),
            signature: crl.signature_value.data.to_vec(),
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// DER-encoded issuer `Name`.
    pub fn issuer(&self) -> &[u8] {
        &self.issuer
    }

    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    pub fn this_update(&self) -> DateTime<Utc> {
        self.this_update
    }

    pub fn next_update(&self) -> Option<DateTime<Utc>> {
        self.next_update
    }

    /// Returns `true` if the CRL is current at `time`. A CRL without
    /// `nextUpdate` stays current once issued.
    pub fn covers(&self, time: DateTime<Utc>) -> bool {
        self.this_update <= time && self.next_update.map_or(true, |next| time <= next)
    }

    /// Revocation date of `serial`, if listed.
    pub fn revocation_of(&self, serial: &[u8]) -> Option<DateTime<Utc>> {
        self.revoked
            .iter()
            .find(|(s, _)| s == serial)
            .map(|(_, date)| *date)
    }

    /// Checks the CRL signature with the issuing certificate's key.
    pub fn verify_signature(&self, issuer: &Certificate) -> Result<(), RawSignatureValidationError> {
        let validator = validator_for_sig_and_hash_algs(&self.signature_algorithm, "")
            .ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;

        validator.validate(&self.signature, &self.tbs, issuer.spki())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;

    use super::*;
    use crate::utils::test::TestCert;

    #[test]
    fn parses_revoked_entries() {
        let ca = TestCert::self_signed("Test Root", 1, 1);
        let this_update = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let next_update = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let revoked_at = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();

        let crl = Crl::from_der(&ca.crl(this_update, next_update, &[(7, revoked_at)])).unwrap();

        assert_eq!(crl.issuer(), Certificate::from_der(&ca.der).unwrap().subject());
        assert_eq!(crl.revocation_of(&[7]), Some(revoked_at));
        assert_eq!(crl.revocation_of(&[8]), None);
        assert!(crl.covers(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()));
        assert!(!crl.covers(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn signature_is_checked() {
        let ca = TestCert::self_signed("Test Root", 1, 1);
        let other = TestCert::self_signed("Other Root", 2, 2);
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let crl = Crl::from_der(&ca.crl(t, t + chrono::Duration::days(30), &[])).unwrap();

        crl.verify_signature(&Certificate::from_der(&ca.der).unwrap())
            .unwrap();
        assert!(crl
            .verify_signature(&Certificate::from_der(&other.der).unwrap())
            .is_err());
    }
}
