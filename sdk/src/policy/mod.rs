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

//! Signature policy decoding.
//!
//! [`decode`] accepts a DER (RFC 3125) or XML (ETSI TR 102 038) policy
//! document and returns a [`SignaturePolicy`]. Both encodings are parsed into
//! one intermediate tree that a single set of grammars walks, so they decode
//! to identical models.
//!
//! Decoding is all-or-nothing: any unknown, misplaced or malformed field
//! fails the whole policy with a [`PolicyError::Decoding`] naming the path of
//! the offending node.

mod der;
pub mod extensions;
mod grammar;
mod integrity;
pub mod model;
mod rules;
pub(crate) mod tree;
mod xml;

use log::debug;
use thiserror::Error;

pub use self::{
    extensions::{BrExtension, DssDictionary, PdfEntry},
    model::*,
    rules::EffectiveRules,
};
use crate::{
    settings::Verify,
    validation_codes::{
        POLICY_INTEGRITY_MISMATCH, POLICY_INTEGRITY_UNVERIFIED, POLICY_MALFORMED,
    },
};

/// Describes errors that can occur while decoding a signature policy.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum PolicyError {
    /// The document does not follow the policy grammar.
    #[error("policy decoding failed at {path}: {reason}")]
    Decoding { path: String, reason: String },

    /// The declared policy digest differs from the computed one.
    #[error(
        "policy integrity check failed: declared {}, computed {}",
        hex::encode(.expected),
        hex::encode(.actual)
    )]
    Integrity { expected: Vec<u8>, actual: Vec<u8> },

    /// The policy digest could not be checked and unverified policies are
    /// rejected.
    #[error("policy integrity could not be verified: {0}")]
    UnverifiedIntegrity(String),

    /// The policy names a digest algorithm that is not supported.
    #[error("unsupported policy digest algorithm {0}")]
    UnsupportedAlgorithm(String),

    /// The document is neither DER nor XML.
    #[error("unknown policy encoding")]
    UnknownEncoding,
}

impl PolicyError {
    /// Validation status code logged for this error.
    pub fn validation_status(&self) -> &'static str {
        match self {
            Self::Integrity { .. } => POLICY_INTEGRITY_MISMATCH,
            Self::UnverifiedIntegrity(_) => POLICY_INTEGRITY_UNVERIFIED,
            Self::Decoding { .. } | Self::UnsupportedAlgorithm(_) | Self::UnknownEncoding => {
                POLICY_MALFORMED
            }
        }
    }

    pub(crate) fn decoding(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decoding {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Options controlling the integrity check made while decoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DecodeOptions {
    /// Recompute and compare the policy digest.
    pub check_integrity: bool,

    /// Fail when the digest cannot be checked.
    pub reject_unverified: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            check_integrity: true,
            reject_unverified: false,
        }
    }
}

impl From<&Verify> for DecodeOptions {
    fn from(verify: &Verify) -> Self {
        Self {
            check_integrity: verify.check_policy_integrity,
            reject_unverified: verify.reject_unverified_policies,
        }
    }
}

/// Decodes a policy document with the default [`DecodeOptions`].
///
/// When `hint` is `None` the encoding is detected from the first non-blank
/// byte.
pub fn decode(bytes: &[u8], hint: Option<PolicyEncoding>) -> Result<SignaturePolicy, PolicyError> {
    decode_with_options(bytes, hint, &DecodeOptions::default())
}

/// Decodes a policy document.
pub fn decode_with_options(
    bytes: &[u8],
    hint: Option<PolicyEncoding>,
    options: &DecodeOptions,
) -> Result<SignaturePolicy, PolicyError> {
    let encoding = match hint {
        Some(encoding) => encoding,
        None => detect_encoding(bytes).ok_or(PolicyError::UnknownEncoding)?,
    };

    let root = match encoding {
        PolicyEncoding::Der => der::parse(bytes)?,
        PolicyEncoding::Xml => xml::parse(bytes)?,
    };
    let decoded = grammar::signature_policy(&root)?;

    let integrity = integrity::check(
        encoding,
        decoded.hash_algorithm,
        decoded.signed_bytes.as_deref(),
        decoded.declared_hash.as_deref(),
        options,
    )?;

    debug!(
        "decoded {encoding:?} policy {} ({} commitment rules)",
        decoded.info.policy_id,
        decoded.info.validation_policy.commitment_rules.len()
    );

    Ok(SignaturePolicy {
        encoding,
        hash_algorithm: decoded.hash_algorithm,
        info: decoded.info,
        declared_hash: decoded.declared_hash,
        integrity,
    })
}

/// Picks DER for a leading SEQUENCE tag, XML for a leading `<`.
pub fn detect_encoding(bytes: &[u8]) -> Option<PolicyEncoding> {
    // UTF-8 byte order mark
    let bytes = bytes.strip_prefix(&[0xef, 0xbb, 0xbf]).unwrap_or(bytes);
    match bytes.iter().find(|b| !b.is_ascii_whitespace())? {
        0x30 => Some(PolicyEncoding::Der),
        b'<' => Some(PolicyEncoding::Xml),
        _ => None,
    }
}
