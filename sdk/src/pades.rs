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


//! PDF signature dictionary rules.
//!
//! A PAdES signature lives in a PDF signature dictionary. Some keys are
//! never allowed there, and a policy may mandate others through its
//! `2.16.76.1.8.1` extension; document time stamps have their own list under
//! `2.16.76.1.8.3`. Findings are reported as
//! [`AttributeOutcome`]s so they aggregate with the CMS attribute results.

use log::debug;

use crate::{
    attributes::{AttributeError, AttributeKind, AttributeOutcome},
    log_item,
    policy::{
        extensions::{MANDATED_DOC_TS_ENTRIES_OID, MANDATED_PDF_SIG_DIC_ENTRIES_OID},
        PdfEntry, SignaturePolicy,
    },
    signature::SignatureReader,
    validation_codes::{
        SIGNATURE_DICTIONARY_MANDATED_ENTRY, SIGNATURE_DICTIONARY_PROHIBITED_ENTRY,
        SIGNATURE_DICTIONARY_VALIDATED,
    },
    Result, StatusTracker,
};

/// Keys that must not appear in a signature dictionary.
pub const PROHIBITED_SIGNATURE_DICTIONARY_ENTRIES: [&str; 3] = ["Cert", "R", "Prop_AuthType"];

/// Checks the entries of a signature dictionary.
///
/// `entries` holds the dictionary keys, with or without the leading `/`,
/// and the raw bytes of their values. One outcome is returned per
/// prohibited key present and per mandated key that is absent or has a
/// different value. An empty result means the dictionary conforms.
pub fn check_signature_dictionary(
    entries: &[PdfEntry],
    policy: &SignaturePolicy,
    validation_log: &mut StatusTracker,
) -> Result<Vec<AttributeOutcome>> {
    check_entries(
        MANDATED_PDF_SIG_DIC_ENTRIES_OID,
        entries,
        &PROHIBITED_SIGNATURE_DICTIONARY_ENTRIES,
        policy.mandated_pdf_sig_dic_entries().unwrap_or_default(),
        validation_log,
    )
}

/// Checks the dictionary of a document time stamp against the entries the
/// policy mandates through its `2.16.76.1.8.3` extension.
pub fn check_doc_time_stamp_dictionary(
    entries: &[PdfEntry],
    policy: &SignaturePolicy,
    validation_log: &mut StatusTracker,
) -> Result<Vec<AttributeOutcome>> {
    check_entries(
        MANDATED_DOC_TS_ENTRIES_OID,
        entries,
        &[],
        policy.mandated_doc_ts_entries().unwrap_or_default(),
        validation_log,
    )
}

fn check_entries(
    label: &'static str,
    entries: &[PdfEntry],
    prohibited: &[&str],
    mandated: &[PdfEntry],
    validation_log: &mut StatusTracker,
) -> Result<Vec<AttributeOutcome>> {
    let find = |key: &str| entries.iter().find(|e| key_name(&e.id) == key_name(key));
    let mut outcomes = Vec::new();

    for &key in prohibited {
        if find(key).is_some() {
            let reason = format!("the prohibited key /{key} is present");
            outcomes.push(dictionary_failure(
                validation_log,
                label,
                reason,
                SIGNATURE_DICTIONARY_PROHIBITED_ENTRY,
            )?);
        }
    }

    for entry in mandated {
        let key = key_name(&entry.id);
        let reason = match (find(key), &entry.value) {
            (None, _) => format!("the mandated key /{key} is missing"),
            (Some(found), Some(value)) if found.value.as_ref() != Some(value) => {
                format!("the key /{key} does not have the value the policy mandates")
            }
            _ => continue,
        };
        outcomes.push(dictionary_failure(
            validation_log,
            label,
            reason,
            SIGNATURE_DICTIONARY_MANDATED_ENTRY,
        )?);
    }

    if outcomes.is_empty() {
        log_item!(label, "dictionary conforms", "check_entries")
            .validation_status(SIGNATURE_DICTIONARY_VALIDATED)
            .success(validation_log);
    }
    debug!("dictionary {label}: {} findings", outcomes.len());
    Ok(outcomes)
}

/// A PDF signature must name its policy; reports a missing
/// `signaturePolicyIdentifier` when the policy does not already mandate it.
pub fn check_policy_reference(
    signature: &dyn SignatureReader,
    validation_log: &mut StatusTracker,
) -> Result<Option<AttributeOutcome>> {
    let kind = AttributeKind::SignaturePolicyId;
    if signature
        .attributes()
        .iter()
        .any(|a| a.identifier == kind.oid())
    {
        return Ok(None);
    }

    let err = AttributeError::Missing {
        identifier: kind.oid().to_string(),
    };
    let err = log_item!(kind.oid(), err.to_string(), "check_policy_reference")
        .validation_status(err.validation_status())
        .failure(validation_log, err)?;
    Ok(Some(AttributeOutcome {
        identifier: kind.oid().to_string(),
        kind: Some(kind),
        occurrence: 0,
        error: Some(err),
        message: None,
        critical: true,
        mandated: true,
    }))
}

fn key_name(key: &str) -> &str {
    key.trim().trim_start_matches('/')
}

fn dictionary_failure(
    validation_log: &mut StatusTracker,
    label: &'static str,
    reason: String,
    status: &'static str,
) -> Result<AttributeOutcome> {
    let err = AttributeError::Invalid {
        identifier: label.to_string(),
        reason,
    };
    let err = log_item!(label, err.to_string(), "check_entries")
        .validation_status(status)
        .failure(validation_log, err)?;

    Ok(AttributeOutcome {
        identifier: label.to_string(),
        kind: None,
        occurrence: 0,
        error: Some(err),
        message: None,
        critical: false,
        mandated: true,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::{
        policy::decode,
        signature::MemorySignature,
        utils::test::{attribute, octets, oid, seq, utf8, PolicyFixture, ID_CONTENT_TYPE},
        Error, ErrorBehavior,
    };

    fn entry(id: &str, value: Option<&[u8]>) -> PdfEntry {
        PdfEntry {
            id: id.to_string(),
            value: value.map(<[u8]>::to_vec),
        }
    }

    fn policy_mandating(entries: &[(&str, Option<&[u8]>)]) -> SignaturePolicy {
        let list: Vec<Vec<u8>> = entries
            .iter()
            .map(|(id, value)| {
                let mut fields = vec![utf8(id)];
                if let Some(value) = value {
                    fields.push(octets(value));
                }
                seq(&fields)
            })
            .collect();
        let fixture = PolicyFixture {
            extensions: vec![(MANDATED_PDF_SIG_DIC_ENTRIES_OID, seq(&list))],
            ..PolicyFixture::new()
        };
        decode(&fixture.der(), None).unwrap()
    }

    #[test]
    fn prohibited_entries() {
        let policy = decode(&PolicyFixture::new().der(), None).unwrap();
        let dictionary = [
            entry("/Filter", Some(b"Adobe.PPKLite")),
            entry("/Cert", None),
            entry("Prop_AuthType", None),
        ];
        let mut log = StatusTracker::default();

        let outcomes = check_signature_dictionary(&dictionary, &policy, &mut log).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(AttributeOutcome::invalidates));
        assert!(log.has_status(SIGNATURE_DICTIONARY_PROHIBITED_ENTRY));
        assert!(!log.has_status(SIGNATURE_DICTIONARY_VALIDATED));
    }

    #[test]
    fn mandated_entries() {
        let policy = policy_mandating(&[
            ("Filter", Some(b"Adobe.PPKLite")),
            ("SubFilter", Some(b"ETSI.CAdES.detached")),
            ("M", None),
        ]);
        let mut log = StatusTracker::default();

        let conforming = [
            entry("/Filter", Some(b"Adobe.PPKLite")),
            entry("/SubFilter", Some(b"ETSI.CAdES.detached")),
            entry("/M", Some(b"D:20240110000000Z")),
        ];
        let outcomes = check_signature_dictionary(&conforming, &policy, &mut log).unwrap();
        assert!(outcomes.is_empty());
        assert!(log.has_status(SIGNATURE_DICTIONARY_VALIDATED));

        let wrong = [
            entry("/Filter", Some(b"Adobe.PPKLite")),
            entry("/SubFilter", Some(b"adbe.pkcs7.detached")),
        ];
        let outcomes = check_signature_dictionary(&wrong, &policy, &mut log).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(log.has_status(SIGNATURE_DICTIONARY_MANDATED_ENTRY));
    }

    #[test]
    fn doc_time_stamp_entries() {
        let fixture = PolicyFixture {
            extensions: vec![(
                MANDATED_DOC_TS_ENTRIES_OID,
                seq(&[seq(&[utf8("SubFilter"), octets(b"ETSI.RFC3161")])]),
            )],
            ..PolicyFixture::new()
        };
        let policy = decode(&fixture.der(), None).unwrap();
        let mut log = StatusTracker::default();

        let ok = [entry("/SubFilter", Some(b"ETSI.RFC3161")), entry("/Cert", None)];
        assert!(check_doc_time_stamp_dictionary(&ok, &policy, &mut log)
            .unwrap()
            .is_empty());

        let outcomes = check_doc_time_stamp_dictionary(&[], &policy, &mut log).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].identifier, MANDATED_DOC_TS_ENTRIES_OID);
    }

    #[test]
    fn stops_on_first_error() {
        let policy = decode(&PolicyFixture::new().der(), None).unwrap();
        let mut log = StatusTracker::with_error_behavior(ErrorBehavior::StopOnFirstError);

        let err = check_signature_dictionary(&[entry("R", None)], &policy, &mut log).unwrap_err();

        assert!(matches!(err, Error::Attribute(AttributeError::Invalid { .. })));
    }

    #[test]
    fn policy_reference() {
        let mut sig = MemorySignature::new(b"sig");
        sig.add_attribute(&attribute(ID_CONTENT_TYPE, &[oid("1.2.840.113549.1.7.1")]), true)
            .unwrap();
        let mut log = StatusTracker::default();

        let outcome = check_policy_reference(&sig, &mut log).unwrap().unwrap();
        assert_eq!(outcome.kind, Some(AttributeKind::SignaturePolicyId));
        assert!(outcome.invalidates());

        sig.add_attribute(
            &attribute(
                AttributeKind::SignaturePolicyId.oid(),
                &[seq(&[oid("2.16.76.1.7.1.1.2.3")])],
            ),
            true,
        )
        .unwrap();
        assert!(check_policy_reference(&sig, &mut log).unwrap().is_none());
    }
}
