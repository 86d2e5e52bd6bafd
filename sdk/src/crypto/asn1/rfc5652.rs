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


//! Cryptographic Message Syntax (RFC 5652) wrappers and identifiers.

use rasn::prelude::*;
use rasn_cms::SignedData;

use super::{oid_to_string, read_all, read_tlv, Tlv};

pub(crate) const ID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";

pub(crate) const ID_MESSAGE_DIGEST: &str = "1.2.840.113549.1.9.4";

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct ContentInfo {
    pub(crate) content_type: ObjectIdentifier,

    #[rasn(tag(explicit(0)))]
    pub(crate) content: Any,
}

/// One CMS `Attribute` as carried in signed and unsigned attribute sets.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct Attribute {
    pub(crate) attr_type: ObjectIdentifier,
    pub(crate) attr_values: SetOf<Any>,
}

impl Attribute {
    /// Encoded values in the order they were carried.
    pub(crate) fn values(&self) -> Vec<Vec<u8>> {
        self.attr_values
            .to_vec()
            .iter()
            .map(|value| value.as_bytes().to_vec())
            .collect()
    }

    pub(crate) fn id(&self) -> String {
        oid_to_string(&self.attr_type)
    }
}

/// Decodes a `ContentInfo` that must wrap `SignedData`.
pub(crate) fn signed_data_from_content_info(der: &[u8]) -> Result<SignedData, String> {
    let content_info: ContentInfo =
        rasn::der::decode(der).map_err(|e| format!("invalid ContentInfo: {e}"))?;

    if oid_to_string(&content_info.content_type) != ID_SIGNED_DATA {
        return Err("content type is not signed data".to_string());
    }

    rasn::der::decode(content_info.content.as_bytes())
        .map_err(|e| format!("invalid SignedData: {e}"))
}

/// Encoded spans of one `SignerInfo`, borrowed from the message.
///
/// Attribute sets are kept as found so their order and encoding survive;
/// re-encoding a SET OF would sort it.
#[derive(Clone, Debug)]
pub(crate) struct SignerInfoSpans<'a> {
    /// Every field of the `SignerInfo`, in encoded order.
    pub(crate) fields: Vec<Tlv<'a>>,

    /// `[0] IMPLICIT SignedAttributes`
    pub(crate) signed_attrs: Option<Tlv<'a>>,

    /// `[1] IMPLICIT UnsignedAttributes`
    pub(crate) unsigned_attrs: Option<Tlv<'a>>,

    /// The `signature` OCTET STRING.
    pub(crate) signature: Tlv<'a>,
}

impl SignerInfoSpans<'_> {
    /// The bytes the signer signed: the signed attributes with the SET OF
    /// tag in place of `[0]`.
    pub(crate) fn signed_attrs_digest_input(&self) -> Option<Vec<u8>> {
        let mut der = self.signed_attrs?.raw.to_vec();
        *der.first_mut()? = 0x31;
        Some(der)
    }

    /// Attributes of `set` in encoded order, each as a DER `Attribute`.
    pub(crate) fn attributes(set: Option<Tlv<'_>>) -> Option<Vec<&[u8]>> {
        match set {
            None => Some(Vec::new()),
            Some(set) => Some(read_all(set.content)?.iter().map(|a| a.raw).collect()),
        }
    }
}

/// Fields of the `SignedData` wrapped by a `ContentInfo`, in encoded order.
pub(crate) fn signed_data_fields(content_info: &[u8]) -> Option<Vec<Tlv<'_>>> {
    let (outer, _) = read_tlv(content_info)?;
    let fields = read_all(outer.content)?;
    let explicit = fields.get(1)?;
    let (signed_data, _) = read_tlv(explicit.content)?;
    read_all(signed_data.content)
}

/// Locates the `SignerInfo` spans of a `ContentInfo` wrapping `SignedData`.
pub(crate) fn signer_info_spans(content_info: &[u8]) -> Option<Vec<SignerInfoSpans<'_>>> {
    // signerInfos is the last field of SignedData
    let signer_infos = signed_data_fields(content_info)?.pop()?;
    if signer_infos.identifier != 0x31 {
        return None;
    }

    read_all(signer_infos.content)?
        .into_iter()
        .map(|info| {
            let parts = read_all(info.content)?;
            let signature = parts.iter().copied().find(|p| p.identifier == 0x04)?;
            Some(SignerInfoSpans {
                fields: parts.clone(),
                signed_attrs: parts.iter().copied().find(|p| p.identifier == 0xa0),
                unsigned_attrs: parts.iter().copied().find(|p| p.identifier == 0xa1),
                signature,
            })
        })
        .collect()
}
