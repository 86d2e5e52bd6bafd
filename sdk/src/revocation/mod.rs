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

//! Revocation reference matching.
//!
//! A CAdES-C signature declares, in its `revocationRefs` attribute, which CRLs
//! and OCSP responses it relied on. [`RevocationMatcher`] finds the evidence
//! the policy's revocation requirements call for, for every certificate of
//! the path, and checks that the declared references and that evidence are
//! in exact correspondence.

mod matcher;
mod path;
mod refs;
mod store;

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use self::{
    matcher::{EvidenceSources, MatchResult, RevocationMatcher, StatusReport, TierEvidence},
    path::CertificatePath,
    refs::{
        CertificateReference, CrlReference, DeclaredCertificates, DeclaredReferences,
        OcspReference, OtherHash, RevocationReference,
    },
    store::{CertSelector, MemoryStore, StoreError, ValidationStore},
};
pub(crate) use self::refs::issuer_serial;
pub use crate::{crypto::ocsp::ResponderRef, policy::RevocationMode};
use crate::{
    deadline::DeadlineExceeded,
    validation_codes::{
        ATTRIBUTE_INVALID, REVOCATION_EVIDENCE_MISSING, REVOCATION_LOOKUP_FAILED,
        REVOCATION_REFERENCE_EXCESS, REVOCATION_REFERENCE_MISSING, REVOCATION_REVOKED,
    },
};

/// Position of a certificate in the path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tier {
    EndEntity,
    Ca,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::EndEntity => "end-entity",
            Tier::Ca => "CA",
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EvidenceKind {
    Certificate,
    Crl,
    Ocsp,
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EvidenceKind::Certificate => "certificate",
            EvidenceKind::Crl => "CRL",
            EvidenceKind::Ocsp => "OCSP response",
        })
    }
}

/// Describes why revocation references could not be reconciled with the
/// available evidence.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CrossRefError {
    /// No evidence of the required kind exists for a certificate.
    #[error("no {kind} found for {tier} certificate {subject}")]
    MissingEvidence {
        tier: Tier,
        kind: EvidenceKind,
        subject: String,
    },

    /// Evidence exists but the signature does not reference it.
    #[error("the {kind} used for {tier} certificate {subject} is not referenced")]
    MissingReference {
        tier: Tier,
        kind: EvidenceKind,
        subject: String,
    },

    /// The signature references evidence that is not required.
    #[error("{declared} {kind} references declared but only {consumed} match required evidence")]
    ExcessReference {
        kind: EvidenceKind,
        declared: usize,
        consumed: usize,
    },

    #[error("certificate {subject} was revoked at {revoked_at}")]
    Revoked {
        subject: String,
        revoked_at: DateTime<Utc>,
    },

    /// A validation store lookup failed.
    #[error("revocation lookup failed: {0}")]
    Lookup(String),

    /// References, evidence or the path could not be read.
    #[error("malformed revocation data: {0}")]
    Malformed(String),

    #[error("revocation lookup deadline exceeded")]
    DeadlineExceeded,
}

impl CrossRefError {
    /// Validation status code logged for this error.
    pub fn validation_status(&self) -> &'static str {
        match self {
            Self::MissingEvidence { .. } => REVOCATION_EVIDENCE_MISSING,
            Self::MissingReference { .. } => REVOCATION_REFERENCE_MISSING,
            Self::ExcessReference { .. } => REVOCATION_REFERENCE_EXCESS,
            Self::Revoked { .. } => REVOCATION_REVOKED,
            Self::Lookup(_) | Self::DeadlineExceeded => REVOCATION_LOOKUP_FAILED,
            Self::Malformed(_) => ATTRIBUTE_INVALID,
        }
    }
}

impl From<DeadlineExceeded> for CrossRefError {
    fn from(_: DeadlineExceeded) -> Self {
        Self::DeadlineExceeded
    }
}

impl From<StoreError> for CrossRefError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => Self::DeadlineExceeded,
            StoreError::Unavailable(reason) => Self::Lookup(reason),
        }
    }
}

#[cfg(test)]
mod tests;
