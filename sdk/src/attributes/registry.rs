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


//! The closed set of attribute types the engine knows how to validate.

use std::fmt;

use serde::Serialize;

use crate::time_stamp::TimeStampKind;

/// A recognized CAdES, CMS or PAdES signature attribute.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum AttributeKind {
    ContentType,
    MessageDigest,
    SigningTime,
    CounterSignature,
    SignaturePolicyId,
    SigningCertificate,
    SigningCertificateV2,
    CommitmentType,
    SignerLocation,
    SignerAttributes,
    ContentHint,
    ContentTimeStamp,
    SignatureTimeStamp,
    CertificateRefs,
    RevocationRefs,
    AttrCertificateRefs,
    AttrRevocationRefs,
    CertValues,
    RevocationValues,
    EscTimeStamp,
    CertCrlTimeStamp,
    ArchiveTimeStamp,
    ArchiveTimeStampV2,
    ArchiveTimeStampV3,
    /// Adobe `adbe-revocationInfoArchival`.
    RevocationInfoArchival,
}

struct Entry {
    kind: AttributeKind,
    oid: &'static str,
    name: &'static str,

    // qualifying property name used by XML policies
    xml_name: Option<&'static str>,
    unique: bool,
}

const fn entry(
    kind: AttributeKind,
    oid: &'static str,
    name: &'static str,
    xml_name: Option<&'static str>,
    unique: bool,
) -> Entry {
    Entry {
        kind,
        oid,
        name,
        xml_name,
        unique,
    }
}

use AttributeKind::*;

#[rustfmt::skip]
const REGISTRY: &[Entry] = &[
    entry(ContentType, "1.2.840.113549.1.9.3", "contentType", None, true),
    entry(MessageDigest, "1.2.840.113549.1.9.4", "messageDigest", None, true),
    entry(SigningTime, "1.2.840.113549.1.9.5", "signingTime", Some("SigningTime"), true),
    entry(CounterSignature, "1.2.840.113549.1.9.6", "counterSignature", Some("CounterSignature"), false),
    entry(SignaturePolicyId, "1.2.840.113549.1.9.16.2.15", "sigPolicyId", Some("SignaturePolicyIdentifier"), true),
    entry(SigningCertificate, "1.2.840.113549.1.9.16.2.12", "signingCertificate", Some("SigningCertificate"), true),
    entry(SigningCertificateV2, "1.2.840.113549.1.9.16.2.47", "signingCertificateV2", Some("SigningCertificateV2"), true),
    entry(CommitmentType, "1.2.840.113549.1.9.16.2.16", "commitmentType", Some("CommitmentTypeIndication"), true),
    entry(SignerLocation, "1.2.840.113549.1.9.16.2.17", "signerLocation", Some("SignatureProductionPlace"), true),
    entry(SignerAttributes, "1.2.840.113549.1.9.16.2.18", "signerAttr", Some("SignerRole"), true),
    entry(ContentHint, "1.2.840.113549.1.9.16.2.4", "contentHint", None, true),
    entry(ContentTimeStamp, "1.2.840.113549.1.9.16.2.20", "contentTimeStamp", Some("AllDataObjectsTimeStamp"), false),
    entry(SignatureTimeStamp, "1.2.840.113549.1.9.16.2.14", "signatureTimeStampToken", Some("SignatureTimeStamp"), false),
    entry(CertificateRefs, "1.2.840.113549.1.9.16.2.21", "certificateRefs", Some("CompleteCertificateRefs"), true),
    entry(RevocationRefs, "1.2.840.113549.1.9.16.2.22", "revocationRefs", Some("CompleteRevocationRefs"), true),
    entry(AttrCertificateRefs, "1.2.840.113549.1.9.16.2.44", "attrCertificateRefs", Some("AttributeCertificateRefs"), true),
    entry(AttrRevocationRefs, "1.2.840.113549.1.9.16.2.45", "attrRevocationRefs", Some("AttributeRevocationRefs"), true),
    entry(CertValues, "1.2.840.113549.1.9.16.2.23", "certValues", Some("CertificateValues"), true),
    entry(RevocationValues, "1.2.840.113549.1.9.16.2.24", "revocationValues", Some("RevocationValues"), true),
    entry(EscTimeStamp, "1.2.840.113549.1.9.16.2.25", "escTimeStamp", Some("SigAndRefsTimeStamp"), false),
    entry(CertCrlTimeStamp, "1.2.840.113549.1.9.16.2.26", "certCRLTimestamp", Some("RefsOnlyTimeStamp"), false),
    entry(ArchiveTimeStamp, "1.2.840.113549.1.9.16.2.27", "archiveTimeStamp", Some("ArchiveTimeStamp"), false),
    entry(ArchiveTimeStampV2, "1.2.840.113549.1.9.16.2.48", "archiveTimeStampV2", None, false),
    entry(ArchiveTimeStampV3, "0.4.0.1733.2.4", "archiveTimeStampV3", None, false),
    entry(RevocationInfoArchival, "1.2.840.113583.1.1.8", "adbe-revocationInfoArchival", None, true),
];

impl AttributeKind {
    /// Looks up an attribute by dotted OID.
    pub fn from_oid(oid: &str) -> Option<Self> {
        REGISTRY.iter().find(|e| e.oid == oid).map(|e| e.kind)
    }

    /// Looks up an attribute by dotted OID or by XML qualifying property
    /// name, the two forms a policy may mandate attributes in.
    pub fn from_identifier(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::from_oid(id).or_else(|| {
            REGISTRY
                .iter()
                .find(|e| e.xml_name == Some(id))
                .map(|e| e.kind)
        })
    }

    fn entry(&self) -> Option<&'static Entry> {
        REGISTRY.iter().find(|e| e.kind == *self)
    }

    pub fn oid(&self) -> &'static str {
        self.entry().map(|e| e.oid).unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        self.entry().map(|e| e.name).unwrap_or_default()
    }

    /// Returns `true` if a signature may carry at most one instance.
    pub fn is_unique(&self) -> bool {
        self.entry().is_some_and(|e| e.unique)
    }

    /// What the time stamp carried by this attribute covers, or `None` if the
    /// attribute does not carry a time stamp.
    pub fn time_stamp_kind(&self) -> Option<TimeStampKind> {
        match self {
            ContentTimeStamp => Some(TimeStampKind::Content),
            SignatureTimeStamp => Some(TimeStampKind::Signature),
            EscTimeStamp | CertCrlTimeStamp => Some(TimeStampKind::SigAndRefs),
            ArchiveTimeStamp | ArchiveTimeStampV2 | ArchiveTimeStampV3 => {
                Some(TimeStampKind::Archive)
            }
            _ => None,
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
