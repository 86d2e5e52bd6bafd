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

//! Parsed view of an RFC 3161 time-stamp token.

use chrono::{DateTime, Utc};
use rasn_cms::{CertificateChoices, SignedData, SignerIdentifier};

use super::TimeStampError;
use crate::{
    crypto::{
        asn1::{
            generalized_time_to_utc, integer_content, oid_to_string,
            rfc3161::{TstInfo, ID_CT_TSTINFO},
            rfc5652::{signed_data_from_content_info, signer_info_spans, ID_MESSAGE_DIGEST},
        },
        Certificate, DigestAlgorithm,
    },
    revocation::CertSelector,
};

/// Identifies the certificate that signed a token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignerRef {
    /// Issuer `Name` in DER and serial number content octets.
    IssuerSerial { issuer: Vec<u8>, serial: Vec<u8> },
    SubjectKeyId(Vec<u8>),
}

impl SignerRef {
    pub(crate) fn from_rasn(sid: &SignerIdentifier) -> Option<Self> {
        match sid {
            SignerIdentifier::IssuerAndSerialNumber(is) => Some(Self::IssuerSerial {
                issuer: rasn::der::encode(&is.issuer).ok()?,
                serial: integer_content(&is.serial_number)?,
            }),
            SignerIdentifier::SubjectKeyIdentifier(ski) => Some(Self::SubjectKeyId(ski.to_vec())),
        }
    }

    pub fn matches(&self, cert: &Certificate) -> bool {
        self.selector().matches(cert)
    }

    pub fn selector(&self) -> CertSelector {
        match self {
            Self::IssuerSerial { issuer, serial } => CertSelector::issuer_and_serial(issuer, serial),
            Self::SubjectKeyId(id) => CertSelector::subject_key_id(id),
        }
    }
}

/// A decoded time-stamp token: `ContentInfo` → `SignedData` → `TSTInfo`.
#[derive(Clone, Debug)]
pub struct TimeStampToken {
    econtent: Vec<u8>,
    imprint_algorithm: String,
    message_imprint: Vec<u8>,
    gen_time: DateTime<Utc>,
    serial: Vec<u8>,
    policy: String,
    certificates: Vec<Certificate>,
    signer: SignerRef,
    digest_algorithm: String,
    signature_algorithm: String,
    signature: Vec<u8>,
    signed_attrs: Option<Vec<u8>>,
    message_digest: Option<Vec<u8>>,
}

impl TimeStampToken {
    pub fn from_der(der: &[u8]) -> Result<Self, TimeStampError> {
        let sd = signed_data_from_content_info(der).map_err(TimeStampError::DecodeError)?;

        let content_type = oid_to_string(&sd.encap_content_info.content_type);
        if content_type != ID_CT_TSTINFO {
            return Err(decode_error(format!("unexpected content type {content_type}")));
        }
        let econtent = sd
            .encap_content_info
            .content
            .as_ref()
            .map(|c| c.to_vec())
            .ok_or_else(|| decode_error("time stamp has no TSTInfo"))?;
        let tst: TstInfo = rasn::der::decode(&econtent)
            .map_err(|e| decode_error(format!("invalid TSTInfo: {e}")))?;

        let signer_infos = sd.signer_infos.to_vec();
        let [signer_info] = signer_infos.as_slice() else {
            return Err(decode_error(format!(
                "expected one signer, found {}",
                signer_infos.len()
            )));
        };
        let spans = signer_info_spans(der)
            .and_then(|spans| spans.into_iter().next())
            .ok_or_else(|| decode_error("signer info could not be located"))?;

        let message_digest = match &signer_info.signed_attrs {
            Some(attrs) => message_digest(attrs)?,
            None => None,
        };

        Ok(Self {
            imprint_algorithm: oid_to_string(&tst.message_imprint.hash_algorithm.algorithm),
            message_imprint: tst.message_imprint.hashed_message.to_vec(),
            gen_time: generalized_time_to_utc(&tst.gen_time),
            serial: integer_content(&tst.serial_number).unwrap_or_default(),
            policy: oid_to_string(&tst.policy),
            certificates: certificates(&sd)?,
            signer: SignerRef::from_rasn(&signer_info.sid)
                .ok_or_else(|| decode_error("invalid signer identifier"))?,
            digest_algorithm: oid_to_string(&signer_info.digest_algorithm.algorithm),
            signature_algorithm: oid_to_string(&signer_info.signature_algorithm.algorithm),
            signature: signer_info.signature.to_vec(),
            signed_attrs: spans.signed_attrs_digest_input(),
            message_digest,
            econtent,
        })
    }

    /// Algorithm of the message imprint.
    pub fn hash_algorithm(&self) -> Result<DigestAlgorithm, TimeStampError> {
        DigestAlgorithm::from_oid(&self.imprint_algorithm)
            .ok_or(TimeStampError::UnsupportedAlgorithm)
    }

    pub fn message_imprint(&self) -> &[u8] {
        &self.message_imprint
    }

    pub fn gen_time(&self) -> DateTime<Utc> {
        self.gen_time
    }

    /// Serial number content octets.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// TSA policy under which the token was issued.
    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Certificates carried in the token.
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn signer(&self) -> &SignerRef {
        &self.signer
    }

    pub(crate) fn signature_algorithms(&self) -> (&str, &str) {
        (&self.signature_algorithm, &self.digest_algorithm)
    }

    pub(crate) fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The bytes covered by the signature: the signed attributes when
    /// present, otherwise the `TSTInfo`.
    pub(crate) fn signed_bytes(&self) -> &[u8] {
        self.signed_attrs.as_deref().unwrap_or(&self.econtent)
    }

    /// Checks the `messageDigest` signed attribute against the `TSTInfo`.
    /// Tokens without signed attributes have nothing to check.
    pub(crate) fn message_digest_matches(&self) -> Result<bool, TimeStampError> {
        if self.signed_attrs.is_none() {
            return Ok(true);
        }
        let Some(declared) = &self.message_digest else {
            return Err(decode_error("no message digest attribute"));
        };
        let alg = DigestAlgorithm::from_oid(&self.digest_algorithm)
            .ok_or(TimeStampError::UnsupportedAlgorithm)?;
        Ok(&alg.digest(&self.econtent) == declared)
    }

    /// Returns `true` if the imprint is the hash of `target`.
    pub fn imprint_matches(&self, target: &[u8]) -> Result<bool, TimeStampError> {
        Ok(self.hash_algorithm()?.digest(target) == self.message_imprint)
    }
}

fn decode_error(reason: impl Into<String>) -> TimeStampError {
    TimeStampError::DecodeError(reason.into())
}

fn message_digest(
    attrs: &rasn::types::SetOf<rasn_cms::Attribute>,
) -> Result<Option<Vec<u8>>, TimeStampError> {
    let attrs = attrs.to_vec();
    let Some(attr) = attrs
        .iter()
        .find(|a| oid_to_string(&a.r#type) == ID_MESSAGE_DIGEST)
    else {
        return Ok(None);
    };

    let values = attr.values.to_vec();
    let [value] = values.as_slice() else {
        return Err(decode_error(format!(
            "message digest attribute has {} values, should have one",
            values.len()
        )));
    };
    rasn::der::decode::<rasn::types::OctetString>(value.as_bytes())
        .map(|os| Some(os.to_vec()))
        .map_err(|_| decode_error("unable to decode message digest"))
}

fn certificates(sd: &SignedData) -> Result<Vec<Certificate>, TimeStampError> {
    let Some(certs) = &sd.certificates else {
        return Ok(Vec::new());
    };

    certs
        .to_vec()
        .iter()
        .filter_map(|choice| match choice {
            CertificateChoices::Certificate(c) => Some(c),
            _ => None,
        })
        .map(|c| {
            let der = rasn::der::encode(c).map_err(|e| decode_error(e.to_string()))?;
            Certificate::from_der(&der).map_err(|e| decode_error(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::utils::test::{sha256, time_stamp_token, utc, CmsBuilder, TestCert};

    #[test]
    fn reads_token() {
        let root = TestCert::self_signed("Root", 1, 1);
        let tsa = root.issue_tsa("TSA", 5, 5);
        let gen = utc(2024, 3, 1, 10, 0, 0);
        let token = TimeStampToken::from_der(&time_stamp_token(&tsa, b"data", gen)).unwrap();

        assert_eq!(token.gen_time(), gen);
        assert_eq!(token.hash_algorithm().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!(token.message_imprint(), sha256(b"data").as_slice());
        assert!(token.imprint_matches(b"data").unwrap());
        assert!(!token.imprint_matches(b"dat4").unwrap());
        assert!(token.message_digest_matches().unwrap());
        assert_eq!(token.certificates().len(), 1);
        assert!(token.signer().matches(&token.certificates()[0]));
    }

    #[test]
    fn tampered_message_digest() {
        let root = TestCert::self_signed("Root", 1, 1);
        let tsa = root.issue_tsa("TSA", 5, 5);
        let tst = crate::utils::test::tst_info(b"data", utc(2024, 3, 1, 0, 0, 0), 7);
        let der = CmsBuilder::time_stamp(&tsa, &tst).tamper_digest().build();

        let token = TimeStampToken::from_der(&der).unwrap();
        assert!(!token.message_digest_matches().unwrap());
    }

    #[test]
    fn plain_signed_data_is_not_a_token() {
        let signer = TestCert::self_signed("Signer", 1, 1);
        let der = CmsBuilder::new(&signer, b"content").build();

        assert!(matches!(
            TimeStampToken::from_der(&der),
            Err(TimeStampError::DecodeError(_))
        ));
    }
}
