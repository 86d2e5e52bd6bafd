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


//! Read access to the signature being verified.
//!
//! The engine never parses signature containers itself. It asks a
//! [`SignatureReader`] for the attributes, the signature value, the signer
//! certificate and the bytes each time stamp should cover. [`CmsSignature`]
//! reads a CAdES `SignedData` directly; [`MemorySignature`] is filled by
//! callers that extract the pieces from another container.

use std::collections::HashMap;

use crate::{
    crypto::{
        asn1::{
            read_all, read_tlv,
            rfc5652::{
                signed_data_fields, signed_data_from_content_info, signer_info_spans, Attribute,
                SignerInfoSpans,
            },
            Tlv,
        },
        Certificate,
    },
    time_stamp::{SignerRef, TimeStampKind},
    Error, Result,
};

/// One attribute of the signature, in the order it was encoded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeRef {
    /// Dotted OID of the attribute type.
    pub identifier: String,

    /// `true` for attributes covered by the signature value.
    pub signed: bool,
}

/// Signature-structure reader.
pub trait SignatureReader {
    /// Signed attributes followed by unsigned attributes, each set in encoded
    /// order.
    fn attributes(&self) -> Vec<AttributeRef>;

    /// The `index`th attribute with type `identifier`, as a DER `Attribute`.
    fn encoded_attribute(&self, identifier: &str, index: usize) -> Option<&[u8]>;

    /// Content octets of the signature value.
    fn signature_value(&self) -> &[u8];

    fn signer_certificate(&self) -> Option<&Certificate>;

    /// Certificates carried alongside the signature.
    fn certificates(&self) -> &[Certificate];

    /// The bytes a time stamp of `kind` must cover.
    ///
    /// `index` is the position in [`attributes`](Self::attributes) of the
    /// attribute carrying the time stamp; for document time stamps it is the
    /// position of the time stamp in the document.
    fn time_stamp_target(&self, kind: TimeStampKind, index: usize) -> Option<Vec<u8>>;
}

fn nth_attribute<'a>(
    attributes: &'a [(AttributeRef, Vec<u8>)],
    identifier: &str,
    index: usize,
) -> Option<&'a [u8]> {
    attributes
        .iter()
        .filter(|(attr, _)| attr.identifier == identifier)
        .nth(index)
        .map(|(_, der)| der.as_slice())
}

/// Reads the dotted OID of a DER `Attribute`.
pub(crate) fn attribute_id(der: &[u8]) -> Result<String> {
    rasn::der::decode::<Attribute>(der)
        .map(|a| a.id())
        .map_err(|e| Error::SignatureStructure(format!("invalid attribute: {e}")))
}

/// A CAdES signature read from a CMS `ContentInfo`.
#[derive(Clone, Debug)]
pub struct CmsSignature {
    attributes: Vec<(AttributeRef, Vec<u8>)>,
    signature_value: Vec<u8>,
    certificates: Vec<Certificate>,
    signer: Option<usize>,

    // eContent octets, or the detached content once supplied
    content: Option<Vec<u8>>,

    // certificates and crls fields of SignedData, encoded
    validation_fields: Vec<u8>,

    // SignerInfo fields before unsignedAttrs, encoded
    signer_info_fields: Vec<u8>,
}

const ID_AA_SIGNATURE_TIME_STAMP: &str = "1.2.840.113549.1.9.16.2.14";
const ID_AA_CERTIFICATE_REFS: &str = "1.2.840.113549.1.9.16.2.21";
const ID_AA_REVOCATION_REFS: &str = "1.2.840.113549.1.9.16.2.22";

impl CmsSignature {
    /// Reads the first signer of `der`.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_der_at(der, 0)
    }

    /// Reads signer number `signer` of `der`.
    pub fn from_der_at(der: &[u8], signer: usize) -> Result<Self> {
        let sd = signed_data_from_content_info(der).map_err(Error::SignatureStructure)?;
        let fields = signed_data_fields(der).ok_or_else(|| structure("unreadable SignedData"))?;
        let spans = signer_info_spans(der)
            .and_then(|spans| spans.into_iter().nth(signer))
            .ok_or_else(|| structure(format!("no signer number {signer}")))?;

        let mut attributes = Vec::new();
        for (set, signed) in [(spans.signed_attrs, true), (spans.unsigned_attrs, false)] {
            let raw = SignerInfoSpans::attributes(set)
                .ok_or_else(|| structure("unreadable attribute set"))?;
            for der in raw {
                let identifier = attribute_id(der)?;
                attributes.push((AttributeRef { identifier, signed }, der.to_vec()));
            }
        }

        let certificates = fields
            .iter()
            .find(|f| f.context_tag() == Some(0))
            .map(certificates)
            .transpose()?
            .unwrap_or_default();

        let sid = sd
            .signer_infos
            .to_vec()
            .get(signer)
            .and_then(|info| SignerRef::from_rasn(&info.sid));
        let signer_position = sid.and_then(|sid| certificates.iter().position(|c| sid.matches(c)));

        Ok(Self {
            attributes,
            signature_value: spans.signature.content.to_vec(),
            certificates,
            signer: signer_position,
            content: fields.get(2).and_then(econtent),
            validation_fields: fields
                .iter()
                .filter(|f| matches!(f.context_tag(), Some(0 | 1)))
                .flat_map(|f| f.raw.iter().copied())
                .collect(),
            signer_info_fields: spans
                .fields
                .iter()
                .filter(|f| f.context_tag() != Some(1))
                .flat_map(|f| f.raw.iter().copied())
                .collect(),
        })
    }

    /// Supplies the signed content of a detached signature.
    pub fn with_detached_content(mut self, content: &[u8]) -> Self {
        self.content = Some(content.to_vec());
        self
    }

    /// The encapsulated or supplied content.
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    fn all_attributes(&self, identifier: &str) -> impl Iterator<Item = &[u8]> + '_ {
        let identifier = identifier.to_owned();
        self.attributes
            .iter()
            .filter(move |(attr, _)| attr.identifier == identifier)
            .map(|(_, der)| der.as_slice())
    }

    // Signature value, signature time stamps, then the complete references.
    fn sig_and_refs_target(&self) -> Vec<u8> {
        let mut target = self.signature_value.clone();
        for der in self.all_attributes(ID_AA_SIGNATURE_TIME_STAMP) {
            target.extend_from_slice(der);
        }
        target.extend(self.refs_target());
        target
    }

    fn refs_target(&self) -> Vec<u8> {
        let mut target = Vec::new();
        for id in [ID_AA_CERTIFICATE_REFS, ID_AA_REVOCATION_REFS] {
            for der in self.all_attributes(id) {
                target.extend_from_slice(der);
            }
        }
        target
    }

    // Content, certificates and CRLs, the signer info, and every unsigned
    // attribute encoded before the archive time stamp.
    fn archive_target(&self, index: usize) -> Option<Vec<u8>> {
        let mut target = self.content.clone()?;
        target.extend_from_slice(&self.validation_fields);
        target.extend_from_slice(&self.signer_info_fields);
        for (attr, der) in self.attributes.get(..index)? {
            if !attr.signed {
                target.extend_from_slice(der);
            }
        }
        Some(target)
    }
}

impl SignatureReader for CmsSignature {
    fn attributes(&self) -> Vec<AttributeRef> {
        self.attributes.iter().map(|(attr, _)| attr.clone()).collect()
    }

    fn encoded_attribute(&self, identifier: &str, index: usize) -> Option<&[u8]> {
        nth_attribute(&self.attributes, identifier, index)
    }

    fn signature_value(&self) -> &[u8] {
        &self.signature_value
    }

    fn signer_certificate(&self) -> Option<&Certificate> {
        self.signer.and_then(|i| self.certificates.get(i))
    }

    fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    fn time_stamp_target(&self, kind: TimeStampKind, index: usize) -> Option<Vec<u8>> {
        let (attr, _) = self.attributes.get(index)?;
        match kind {
            TimeStampKind::Content => self.content.clone(),
            TimeStampKind::Signature => Some(self.signature_value.clone()),
            TimeStampKind::SigAndRefs if attr.identifier == CERT_CRL_TIME_STAMP => {
                Some(self.refs_target())
            }
            TimeStampKind::SigAndRefs => Some(self.sig_and_refs_target()),
            TimeStampKind::Archive => self.archive_target(index),
            TimeStampKind::Document => None,
        }
    }
}

const CERT_CRL_TIME_STAMP: &str = "1.2.840.113549.1.9.16.2.26";

fn structure(reason: impl Into<String>) -> Error {
    Error::SignatureStructure(reason.into())
}

fn certificates(field: &Tlv<'_>) -> Result<Vec<Certificate>> {
    read_all(field.content)
        .ok_or_else(|| structure("unreadable certificate set"))?
        .iter()
        .filter(|choice| choice.identifier == 0x30)
        .map(|c| Certificate::from_der(c.raw).map_err(|e| structure(e.to_string())))
        .collect()
}

// EncapsulatedContentInfo → [0] EXPLICIT OCTET STRING
fn econtent(encap: &Tlv<'_>) -> Option<Vec<u8>> {
    let fields = read_all(encap.content)?;
    let explicit = fields.get(1)?;
    let (octets, _) = read_tlv(explicit.content)?;
    Some(octets.content.to_vec())
}

/// A signature assembled by the caller.
#[derive(Clone, Debug, Default)]
pub struct MemorySignature {
    attributes: Vec<(AttributeRef, Vec<u8>)>,
    signature_value: Vec<u8>,
    signer: Option<Certificate>,
    certificates: Vec<Certificate>,
    targets: HashMap<(TimeStampKind, usize), Vec<u8>>,
}

impl MemorySignature {
    pub fn new(signature_value: &[u8]) -> Self {
        Self {
            signature_value: signature_value.to_vec(),
            ..Default::default()
        }
    }

    /// Appends a DER `Attribute` to the signed or unsigned set.
    pub fn add_attribute(&mut self, der: &[u8], signed: bool) -> Result<()> {
        let identifier = attribute_id(der)?;
        self.attributes
            .push((AttributeRef { identifier, signed }, der.to_vec()));
        Ok(())
    }

    pub fn set_signer_certificate(&mut self, cert: Certificate) {
        self.signer = Some(cert);
    }

    pub fn add_certificate(&mut self, cert: Certificate) {
        self.certificates.push(cert);
    }

    /// Sets the bytes a time stamp must cover; see
    /// [`SignatureReader::time_stamp_target`].
    pub fn set_time_stamp_target(&mut self, kind: TimeStampKind, index: usize, target: &[u8]) {
        self.targets.insert((kind, index), target.to_vec());
    }
}

impl SignatureReader for MemorySignature {
    fn attributes(&self) -> Vec<AttributeRef> {
        self.attributes.iter().map(|(attr, _)| attr.clone()).collect()
    }

    fn encoded_attribute(&self, identifier: &str, index: usize) -> Option<&[u8]> {
        nth_attribute(&self.attributes, identifier, index)
    }

    fn signature_value(&self) -> &[u8] {
        &self.signature_value
    }

    fn signer_certificate(&self) -> Option<&Certificate> {
        self.signer.as_ref()
    }

    fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    fn time_stamp_target(&self, kind: TimeStampKind, index: usize) -> Option<Vec<u8>> {
        match (kind, self.targets.get(&(kind, index))) {
            (_, Some(target)) => Some(target.clone()),
            (TimeStampKind::Signature, None) => Some(self.signature_value.clone()),
            _ => None,
        }
    }
}
