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


//! CAdES attribute structures (RFC 5126, ETSI EN 319 122) and the ESS
//! signing-certificate attributes (RFC 2634, RFC 5035).

use rasn::prelude::*;
use rasn_ocsp::ResponderId;
use rasn_pkix::{AlgorithmIdentifier, GeneralName, Name};

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct OtherHashAlgAndValue {
    pub(crate) hash_algorithm: AlgorithmIdentifier,
    pub(crate) hash_value: OctetString,
}

/// A bare OCTET STRING is a SHA-1 hash.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
#[rasn(choice)]
pub(crate) enum OtherHash {
    Sha1Hash(OctetString),
    OtherHash(OtherHashAlgAndValue),
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct IssuerSerial {
    pub(crate) issuer: Vec<GeneralName>,
    pub(crate) serial_number: Integer,
    pub(crate) issuer_uid: Option<BitString>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct OtherCertId {
    pub(crate) other_cert_hash: OtherHash,
    pub(crate) issuer_serial: Option<IssuerSerial>,
}

pub(crate) type CompleteCertificateRefs = SequenceOf<OtherCertId>;

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct CrlIdentifier {
    pub(crate) crlissuer: Name,
    pub(crate) crl_issued_time: UtcTime,
    pub(crate) crl_number: Option<Integer>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct CrlValidatedId {
    pub(crate) crl_hash: OtherHash,
    pub(crate) crl_identifier: Option<CrlIdentifier>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct CrlListId {
    pub(crate) crls: SequenceOf<CrlValidatedId>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct OcspIdentifier {
    pub(crate) ocsp_responder_id: ResponderId,
    pub(crate) produced_at: GeneralizedTime,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct OcspResponsesId {
    pub(crate) ocsp_identifier: OcspIdentifier,
    pub(crate) ocsp_rep_hash: Option<OtherHash>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct OcspListId {
    pub(crate) ocsp_responses: SequenceOf<OcspResponsesId>,
}

/// References for one certificate of the path.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct CrlOcspRef {
    #[rasn(tag(explicit(0)))]
    pub(crate) crlids: Option<CrlListId>,
    #[rasn(tag(explicit(1)))]
    pub(crate) ocspids: Option<OcspListId>,
    #[rasn(tag(explicit(2)))]
    pub(crate) other_rev: Option<Any>,
}

pub(crate) type CompleteRevocationRefs = SequenceOf<CrlOcspRef>;

/// `crlVals` are `CertificateList`s and `ocspVals` are `BasicOCSPResponse`s.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct RevocationValues {
    #[rasn(tag(explicit(0)))]
    pub(crate) crl_vals: Option<SequenceOf<Any>>,
    #[rasn(tag(explicit(1)))]
    pub(crate) ocsp_vals: Option<SequenceOf<Any>>,
    #[rasn(tag(explicit(2)))]
    pub(crate) other_rev_vals: Option<Any>,
}

pub(crate) type CertificateValues = SequenceOf<Any>;

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct EssCertId {
    pub(crate) cert_hash: OctetString,
    pub(crate) issuer_serial: Option<IssuerSerial>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct SigningCertificate {
    pub(crate) certs: SequenceOf<EssCertId>,
    pub(crate) policies: Option<SequenceOf<Any>>,
}

/// An absent hash algorithm means SHA-256.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct EssCertIdV2 {
    pub(crate) hash_algorithm: Option<AlgorithmIdentifier>,
    pub(crate) cert_hash: OctetString,
    pub(crate) issuer_serial: Option<IssuerSerial>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct SigningCertificateV2 {
    pub(crate) certs: SequenceOf<EssCertIdV2>,
    pub(crate) policies: Option<SequenceOf<Any>>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct SignaturePolicyId {
    pub(crate) sig_policy_id: ObjectIdentifier,
    pub(crate) sig_policy_hash: OtherHashAlgAndValue,
    pub(crate) sig_policy_qualifiers: Option<SequenceOf<Any>>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
#[rasn(choice)]
pub(crate) enum SignaturePolicyIdentifier {
    SignaturePolicyId(SignaturePolicyId),
    SignaturePolicyImplied(()),
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct CommitmentTypeIndication {
    pub(crate) commitment_type_id: ObjectIdentifier,
    pub(crate) commitment_type_qualifier: Option<SequenceOf<Any>>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct SignerLocation {
    #[rasn(tag(explicit(0)))]
    pub(crate) country_name: Option<Any>,
    #[rasn(tag(explicit(1)))]
    pub(crate) locality_name: Option<Any>,
    #[rasn(tag(explicit(2)))]
    pub(crate) postal_address: Option<SequenceOf<Any>>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
#[rasn(choice)]
pub(crate) enum SignerAttributeEntry {
    #[rasn(tag(explicit(0)))]
    Claimed(SequenceOf<Any>),
    #[rasn(tag(explicit(1)))]
    Certified(Any),
}

pub(crate) type SignerAttribute = SequenceOf<SignerAttributeEntry>;

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct ContentHints {
    pub(crate) content_description: Option<Utf8String>,
    pub(crate) content_type: ObjectIdentifier,
}
