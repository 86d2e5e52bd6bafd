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

//! PDF extensions of the Brazilian (ICP-Brasil) policies.

use super::{
    der,
    tree::{Field, TAG_OCTET_STRING},
    PolicyError,
};

/// PDF signature dictionary entries a PAdES signature must carry.
pub const MANDATED_PDF_SIG_DIC_ENTRIES_OID: &str = "2.16.76.1.8.1";

/// Entries the document security store must carry.
pub const DSS_OID: &str = "2.16.76.1.8.2";

/// Entries a document time-stamp dictionary must carry.
pub const MANDATED_DOC_TS_ENTRIES_OID: &str = "2.16.76.1.8.3";

/// Dictionary entry named by a policy, with the value it must have if any.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PdfEntry {
    pub id: String,
    pub value: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DssDictionary {
    pub entries: Vec<PdfEntry>,
    pub vri: Option<Vec<PdfEntry>>,
}

/// Decoded value of a known policy extension.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BrExtension {
    MandatedPdfSigDicEntries(Vec<PdfEntry>),
    Dss(DssDictionary),
    MandatedDocTsEntries(Vec<PdfEntry>),
}

/// Decodes `value` when `id` names a known extension.
pub(crate) fn decode(id: &str, value: &[u8], path: &str) -> Result<Option<BrExtension>, PolicyError> {
    let decoded = match id {
        MANDATED_PDF_SIG_DIC_ENTRIES_OID => {
            BrExtension::MandatedPdfSigDicEntries(entries(value, path)?)
        }
        MANDATED_DOC_TS_ENTRIES_OID => BrExtension::MandatedDocTsEntries(entries(value, path)?),
        DSS_OID => BrExtension::Dss(dss(value, path)?),
        _ => return Ok(None),
    };
    Ok(Some(decoded))
}

fn parse(value: &[u8], path: &str) -> Result<super::tree::Node, PolicyError> {
    der::parse(value).map_err(|e| match e {
        PolicyError::Decoding { reason, .. } => PolicyError::decoding(path, reason),
        other => other,
    })
}

fn entries(value: &[u8], path: &str) -> Result<Vec<PdfEntry>, PolicyError> {
    let root = parse(value, path)?;
    entry_list(&Field::new(&root, path))
}

fn entry_list(field: &Field<'_>) -> Result<Vec<PdfEntry>, PolicyError> {
    field.items("PdfEntry")?.iter().map(entry).collect()
}

fn entry(field: &Field<'_>) -> Result<PdfEntry, PolicyError> {
    let mut fields = field.fields()?;
    let id = fields.required("PdfEntryId")?.text()?;
    let value = fields
        .optional(&["PdfEntryValue"], Some(TAG_OCTET_STRING))
        .map(|f| f.octets())
        .transpose()?;
    fields.finish()?;
    Ok(PdfEntry { id, value })
}

fn dss(value: &[u8], path: &str) -> Result<DssDictionary, PolicyError> {
    let root = parse(value, path)?;
    let mut fields = Field::new(&root, path).fields()?;
    let entries = entry_list(&fields.required("DssEntries")?)?;
    let vri = fields
        .optional(&["VriDictionary"], Some(super::tree::TAG_SEQUENCE))
        .map(|f| entry_list(&f))
        .transpose()?;
    fields.finish()?;
    Ok(DssDictionary { entries, vri })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::utils::test::{octets, seq, utf8};

    #[test]
    fn mandated_entries() {
        let value = seq(&[
            seq(&[utf8("Filter"), octets(b"Adobe.PPKLite")]),
            seq(&[utf8("SubFilter"), octets(b"ETSI.CAdES.detached")]),
            seq(&[utf8("M")]),
        ]);

        let decoded = decode(MANDATED_PDF_SIG_DIC_ENTRIES_OID, &value, "ext").unwrap();
        let Some(BrExtension::MandatedPdfSigDicEntries(entries)) = decoded else {
            unreachable!("expected mandated entries");
        };
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "Filter");
        assert_eq!(entries[0].value.as_deref(), Some(&b"Adobe.PPKLite"[..]));
        assert_eq!(entries[2].value, None);
    }

    #[test]
    fn dss_with_vri() {
        let value = seq(&[
            seq(&[seq(&[utf8("Certs")]), seq(&[utf8("CRLs")])]),
            seq(&[seq(&[utf8("TU")])]),
        ]);

        let Some(BrExtension::Dss(dss)) = decode(DSS_OID, &value, "ext").unwrap() else {
            unreachable!("expected DSS");
        };
        assert_eq!(dss.entries.len(), 2);
        assert_eq!(dss.vri.unwrap()[0].id, "TU");
    }

    #[test]
    fn unknown_extensions_stay_opaque() {
        assert_eq!(decode("1.2.3", &[0x05, 0x00], "ext").unwrap(), None);
    }

    #[test]
    fn malformed_value_names_path() {
        let err = decode(MANDATED_DOC_TS_ENTRIES_OID, &[0x30, 0x03, 0x02], "A/B").unwrap_err();
        assert!(matches!(err, PolicyError::Decoding { path, .. } if path == "A/B"));
    }
}
