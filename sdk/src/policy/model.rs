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

//! Decoded signature policy.
//!
//! Every type here is immutable once [`decode`](super::decode) returns it and
//! can be shared across threads.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::extensions::{BrExtension, PdfEntry};
use crate::crypto::{hash::DigestAlgorithm, Certificate};

/// Wire encoding of a policy document.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum PolicyEncoding {
    /// ASN.1 DER, as published for CAdES and PAdES policies.
    Der,
    /// XML, as published for XAdES policies.
    Xml,
}

/// Outcome of the policy's self-integrity check.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum IntegrityStatus {
    /// The declared digest matched the recomputed one.
    Verified,
    /// The digest could not be checked; carries the reason.
    Unverified(String),
}

/// A decoded signature policy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignaturePolicy {
    pub encoding: PolicyEncoding,

    /// Algorithm the policy names for its own digest.
    pub hash_algorithm: DigestAlgorithm,

    pub info: SignPolicyInfo,

    /// Digest the policy declares over itself.
    pub declared_hash: Option<Vec<u8>>,

    pub integrity: IntegrityStatus,
}

impl SignaturePolicy {
    /// Dotted OID identifying this policy.
    pub fn policy_id(&self) -> &str {
        &self.info.policy_id
    }

    /// Every extension in the policy info, the validation policy and the
    /// common rules, in that order.
    pub fn extensions(&self) -> impl Iterator<Item = &PolicyExtension> {
        let validation = &self.info.validation_policy;
        self.info
            .extensions
            .iter()
            .chain(validation.extensions.iter())
            .chain(validation.common_rules.extensions.iter())
    }

    /// PDF signature dictionary entries the policy mandates, if it carries
    /// the mandated-entries extension.
    pub fn mandated_pdf_sig_dic_entries(&self) -> Option<&[PdfEntry]> {
        self.extensions().find_map(|ext| match &ext.decoded {
            Some(BrExtension::MandatedPdfSigDicEntries(entries)) => Some(entries.as_slice()),
            _ => None,
        })
    }

    /// Document time-stamp dictionary entries the policy mandates.
    pub fn mandated_doc_ts_entries(&self) -> Option<&[PdfEntry]> {
        self.extensions().find_map(|ext| match &ext.decoded {
            Some(BrExtension::MandatedDocTsEntries(entries)) => Some(entries.as_slice()),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignPolicyInfo {
    /// Dotted OID of the policy.
    pub policy_id: String,
    pub date_of_issue: DateTime<Utc>,

    /// Issuer names rendered as text.
    pub issuer: String,
    pub field_of_application: String,
    pub validation_policy: SignatureValidationPolicy,
    pub extensions: Vec<PolicyExtension>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignatureValidationPolicy {
    pub signing_period: SigningPeriod,
    pub common_rules: CommonRules,
    pub commitment_rules: Vec<CommitmentRule>,
    pub extensions: Vec<PolicyExtension>,
}

/// Period during which signatures under the policy may be produced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SigningPeriod {
    pub not_before: DateTime<Utc>,
    pub not_after: Option<DateTime<Utc>>,
}

impl SigningPeriod {
    /// Returns `true` if `time` falls inside the period, bounds included.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.not_before && self.not_after.map_or(true, |end| time <= end)
    }
}

/// Rules that apply to every signature regardless of commitment type.
///
/// Also used for the rule part of a [`CommitmentRule`], where a present field
/// overrides the common one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommonRules {
    pub signer_and_verifier_rules: Option<SignerAndVerifierRules>,
    pub signing_cert_trust_condition: Option<SigningCertTrustCondition>,
    pub time_stamp_trust_condition: Option<TimeStampTrustCondition>,
    pub attribute_trust_condition: Option<AttributeTrustCondition>,
    pub algorithm_constraint_set: Option<AlgorithmConstraintSet>,
    pub extensions: Vec<PolicyExtension>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommitmentRule {
    pub commitment_types: Vec<SelectedCommitmentType>,
    pub rules: CommonRules,
}

impl CommitmentRule {
    /// Returns `true` if this rule selects the commitment type `id`.
    pub fn selects(&self, id: &str) -> bool {
        self.commitment_types.iter().any(|t| match t {
            SelectedCommitmentType::Recognized(ct) => ct.identifier == id,
            SelectedCommitmentType::Empty => false,
        })
    }

    /// Returns `true` if this rule applies when no commitment type is
    /// indicated.
    pub fn selects_empty(&self) -> bool {
        self.commitment_types
            .iter()
            .any(|t| matches!(t, SelectedCommitmentType::Empty))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectedCommitmentType {
    Empty,
    Recognized(CommitmentType),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommitmentType {
    pub identifier: String,
    pub field_of_application: Option<String>,
    pub semantics: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignerAndVerifierRules {
    pub signer_rules: SignerRules,
    pub verifier_rules: VerifierRules,
}

/// Whether the signed data is carried inside the signature.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExternalSignedData {
    Internal,
    External,
    #[default]
    Either,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignerRules {
    pub external_signed_data: ExternalSignedData,

    /// Signed attributes that must be present, as dotted OIDs (DER) or
    /// qualifying property names (XML).
    pub mandated_signed_attributes: Vec<String>,
    pub mandated_unsigned_attributes: Vec<String>,
    pub mandated_certificate_ref: CertRefReq,
    pub mandated_certificate_info: CertInfoReq,
    pub extensions: Vec<PolicyExtension>,
}

/// Which certificates must be referenced by the signature.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CertRefReq {
    #[default]
    SignerOnly = 1,
    FullPath = 2,
}

/// Which certificates must be carried by the signature.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CertInfoReq {
    #[default]
    None = 0,
    SignerOnly = 1,
    FullPath = 2,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifierRules {
    pub mandated_unsigned_attributes: Vec<String>,
    pub extensions: Vec<PolicyExtension>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningCertTrustCondition {
    pub signer_trust_trees: Vec<CertificateTrustPoint>,
    pub signer_rev_req: CertRevReq,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeStampTrustCondition {
    pub trust_trees: Vec<CertificateTrustPoint>,
    pub rev_req: Option<CertRevReq>,
    pub name_constraints: Option<Vec<u8>>,

    /// Time to wait after signing before revocation status is final.
    pub caution_period: Option<DeltaTime>,

    /// Longest accepted gap between signing time and the signature
    /// time-stamp.
    pub signature_timestamp_delay: Option<DeltaTime>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeTrustCondition {
    pub attribute_mandated: bool,
    pub how_cert_attribute: HowCertAttribute,
    pub trust_trees: Vec<CertificateTrustPoint>,
    pub rev_req: Option<CertRevReq>,
    pub attribute_constraints: Option<AttributeConstraints>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HowCertAttribute {
    ClaimedAttribute = 0,
    CertifiedAttributes = 1,
    Either = 2,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AttributeConstraints {
    pub attribute_types: Vec<String>,

    /// `AttributeTypeAndValue` entries as found in the policy.
    pub attribute_values: Vec<Vec<u8>>,
}

/// Algorithms and key lengths accepted for each kind of key.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AlgorithmConstraintSet {
    pub signer: Vec<AlgAndLength>,
    pub ee_cert: Vec<AlgAndLength>,
    pub ca_cert: Vec<AlgAndLength>,
    pub aa_cert: Vec<AlgAndLength>,
    pub tsa_cert: Vec<AlgAndLength>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlgAndLength {
    pub algorithm: String,
    pub min_key_length: Option<u32>,
    pub other: Vec<PolicyExtension>,
}

/// Revocation checking required for end-entity and CA certificates.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertRevReq {
    pub end_cert_rev_req: RevReq,
    pub ca_certs: RevReq,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevReq {
    pub mode: RevocationMode,
    pub extensions: Vec<PolicyExtension>,
}

/// Kind of revocation evidence required for a certificate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum RevocationMode {
    Crl = 0,
    Ocsp = 1,
    Both = 2,
    Either = 3,
    None = 4,
    Other = 5,
}

impl RevocationMode {
    pub(crate) const NAMES: &'static [(u8, &'static str)] = &[
        (0, "clrcheck"),
        (0, "crlcheck"),
        (1, "ocspcheck"),
        (2, "bothcheck"),
        (3, "eithercheck"),
        (4, "nocheck"),
        (5, "other"),
    ];

    pub(crate) fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Crl),
            1 => Some(Self::Ocsp),
            2 => Some(Self::Both),
            3 => Some(Self::Either),
            4 => Some(Self::None),
            5 => Some(Self::Other),
            _ => None,
        }
    }

    /// Returns `true` if no revocation evidence is required.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::None | Self::Other)
    }
}

/// A certificate the policy trusts, with the constraints placed on paths
/// ending in it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateTrustPoint {
    pub certificate: Certificate,

    /// SHA-1 thumbprint of `certificate`.
    pub sha1_hash: Vec<u8>,
    pub path_len_constraint: Option<u32>,
    pub acceptable_policy_set: Vec<String>,
    pub name_constraints: Option<Vec<u8>>,
    pub policy_constraints: Option<Vec<u8>>,
}

impl CertificateTrustPoint {
    /// An unconstrained trust point for `certificate`.
    pub fn from_certificate(certificate: Certificate) -> Self {
        Self {
            sha1_hash: certificate.sha1_thumbprint(),
            certificate,
            path_len_constraint: None,
            acceptable_policy_set: Vec::new(),
            name_constraints: None,
            policy_constraints: None,
        }
    }

    /// Returns `true` if this trust point's subject issued `cert`.
    pub fn is_issuer_of(&self, cert: &Certificate) -> bool {
        self.certificate.subject() == cert.issuer()
    }
}

/// Finds the trust point whose subject is `issuer` (a Name in DER).
pub fn find_trust_point<'a>(
    points: &'a [CertificateTrustPoint],
    issuer: &[u8],
) -> Option<&'a CertificateTrustPoint> {
    points.iter().find(|p| p.certificate.subject() == issuer)
}

/// Relative time span.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeltaTime {
    pub seconds: i64,
    pub minutes: i64,
    pub hours: i64,
    pub days: i64,
}

impl DeltaTime {
    /// Total span in seconds, `None` on overflow.
    pub fn total_seconds(&self) -> Option<i64> {
        self.days
            .checked_mul(86_400)?
            .checked_add(self.hours.checked_mul(3_600)?)?
            .checked_add(self.minutes.checked_mul(60)?)?
            .checked_add(self.seconds)
    }

    pub fn to_duration(&self) -> Duration {
        self.total_seconds()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

/// Policy extension, with its value decoded when it is one of the known
/// PDF extensions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PolicyExtension {
    /// Dotted OID.
    pub id: String,

    /// DER value as carried by the policy.
    pub value: Vec<u8>,
    pub decoded: Option<BrExtension>,
}
