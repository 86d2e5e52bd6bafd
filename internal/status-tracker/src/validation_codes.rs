// Copyright 2022 Adobe. All rights reserved.
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

//! Validation status codes reported while checking a signature against its
//! signature policy.
//!
//! Codes are grouped by the component that emits them: policy decoding,
//! attribute validation, revocation reconciliation, time stamps and PDF
//! signature dictionaries.

use crate::log::LogKind;

// -- success codes --

/// The policy's declared self-hash matches the hash computed over its
/// `hashAlgorithm` and `signPolicyInfo` encodings.
pub const POLICY_INTEGRITY_VALIDATED: &str = "policy.integrity.validated";

/// A signature attribute passed its validator.
pub const ATTRIBUTE_VALIDATED: &str = "attribute.validated";

/// Every revocation reference declared in the signature was consumed by a
/// piece of evidence and no evidence was left without a reference.
pub const REVOCATION_REFERENCES_MATCHED: &str = "revocation.references.matched";

/// Revocation evidence shows the certificate was not revoked at the
/// reference time.
pub const REVOCATION_NOT_REVOKED: &str = "revocation.notRevoked";

/// The time-stamp token is well-formed and its message imprint and signature
/// are correct.
pub const TIMESTAMP_VALIDATED: &str = "timeStamp.validated";

/// The time-stamp signer chains to a time-stamp trust point of the policy.
pub const TIMESTAMP_TRUSTED: &str = "timeStamp.trusted";

/// The PDF signature dictionary satisfies the policy's dictionary rules.
pub const SIGNATURE_DICTIONARY_VALIDATED: &str = "signatureDictionary.validated";

// -- informational codes --

/// The policy carries no integrity digest that could be checked, or it was
/// encoded in a form whose digest is not checked.
pub const POLICY_INTEGRITY_UNVERIFIED: &str = "policy.integrity.unverified";

/// The signing time lies within the policy's signing period.
pub const POLICY_SIGNING_PERIOD_INSIDE: &str = "policy.signingPeriod.inside";

/// The attribute is recognized but carries nothing to validate.
pub const ATTRIBUTE_INFORMATIONAL: &str = "attribute.informational";

/// The revocation requirement for a certificate tier is `none` or `other`,
/// so the tier was skipped.
pub const REVOCATION_CHECK_SKIPPED: &str = "revocation.check.skipped";

// -- failure codes --

/// The policy could not be decoded.
pub const POLICY_MALFORMED: &str = "policy.malformed";

/// The policy's declared self-hash does not match its content.
pub const POLICY_INTEGRITY_MISMATCH: &str = "policy.integrity.mismatch";

/// The signing time lies outside the policy's signing period.
pub const POLICY_SIGNING_PERIOD_OUTSIDE: &str = "policy.signingPeriod.outside";

/// The signature policy identifier attribute names a different policy.
pub const POLICY_IDENTIFIER_MISMATCH: &str = "policy.identifier.mismatch";

/// An attribute mandated by the policy is absent from the signature.
pub const ATTRIBUTE_MISSING: &str = "attribute.missing";

/// An attribute that may occur only once occurs more than once.
pub const ATTRIBUTE_DUPLICATED: &str = "attribute.duplicated";

/// The attribute identifier is not in the attribute registry.
pub const ATTRIBUTE_UNKNOWN: &str = "attribute.unknown";

/// An attribute failed its validator.
pub const ATTRIBUTE_INVALID: &str = "attribute.invalid";

/// No revocation evidence could be found for a certificate.
pub const REVOCATION_EVIDENCE_MISSING: &str = "revocation.evidence.missing";

/// Evidence was found but no declared reference matches it.
pub const REVOCATION_REFERENCE_MISSING: &str = "revocation.reference.missing";

/// More revocation references were declared than evidence consumed.
pub const REVOCATION_REFERENCE_EXCESS: &str = "revocation.reference.excess";

/// A certificate on the path was revoked at the reference time.
pub const REVOCATION_REVOKED: &str = "revocation.revoked";

/// A validation-data lookup failed or ran past its deadline.
pub const REVOCATION_LOOKUP_FAILED: &str = "revocation.lookup.failed";

/// The time-stamp message imprint does not match the time-stamped data, or
/// the token signature does not verify.
pub const TIMESTAMP_MISMATCH: &str = "timeStamp.mismatch";

/// The time-stamp token could not be decoded.
pub const TIMESTAMP_MALFORMED: &str = "timeStamp.malformed";

/// The time-stamp signer does not chain to a trust point of the policy.
pub const TIMESTAMP_UNTRUSTED: &str = "timeStamp.untrusted";

/// The time-stamp signer certificate was not valid at the generation time.
pub const TIMESTAMP_OUTSIDE_VALIDITY: &str = "timeStamp.outsideValidity";

/// Two time stamps compete for the same position in the chain.
pub const TIMESTAMP_CHAIN_AMBIGUOUS: &str = "timeStamp.chain.ambiguous";

/// The time stamp was generated later than the policy's signature time-stamp
/// delay allows.
pub const TIMESTAMP_DELAY_EXCEEDED: &str = "timeStamp.delayExceeded";

/// The PDF signature dictionary carries an entry the policy forbids.
pub const SIGNATURE_DICTIONARY_PROHIBITED_ENTRY: &str = "signatureDictionary.prohibitedEntry";

/// The PDF signature dictionary lacks an entry the policy mandates, or the
/// entry has another value.
pub const SIGNATURE_DICTIONARY_MANDATED_ENTRY: &str = "signatureDictionary.mandatedEntry";

/// Returns `true` if the status code is a known success code.
///
/// Returns `false` if the status code is a known failure code, is
/// informational or is an unknown code.
pub fn is_success(status_code: &str) -> bool {
    matches!(log_kind(status_code), LogKind::Success)
}

/// Returns the [`LogKind`] a status code is reported with.
///
/// Unknown codes are treated as failures.
pub fn log_kind(status_code: &str) -> LogKind {
    match status_code {
        POLICY_INTEGRITY_VALIDATED
        | ATTRIBUTE_VALIDATED
        | REVOCATION_REFERENCES_MATCHED
        | REVOCATION_NOT_REVOKED
        | TIMESTAMP_VALIDATED
        | TIMESTAMP_TRUSTED
        | SIGNATURE_DICTIONARY_VALIDATED => LogKind::Success,

        POLICY_INTEGRITY_UNVERIFIED
        | POLICY_SIGNING_PERIOD_INSIDE
        | ATTRIBUTE_INFORMATIONAL
        | REVOCATION_CHECK_SKIPPED => LogKind::Informational,

        _ => LogKind::Failure,
    }
}
