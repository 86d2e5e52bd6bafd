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

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{deadline::DeadlineExceeded, revocation::CrossRefError, validation_codes::*};

/// Describes errors that can occur when verifying an [RFC 3161] time-stamp
/// token or ordering a chain of them.
///
/// [RFC 3161]: https://www.ietf.org/rfc/rfc3161.txt
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum TimeStampError {
    /// The token could not be decoded.
    #[error("decode error ({0})")]
    DecodeError(String),

    /// The message imprint does not match the time-stamped data.
    #[error("time stamp does not match data")]
    ImprintMismatch,

    /// No certificate for the token signer could be found.
    #[error("time stamp signer certificate not found")]
    SignerNotFound,

    /// The token signature, or its `messageDigest` attribute, does not
    /// verify.
    #[error("time stamp signature is invalid")]
    InvalidSignature,

    /// The time stamp uses a certificate that was not valid at the time of
    /// signing.
    ///
    /// This typically occurs when the certificate is used beyond its period of
    /// validity, but may also occur when the certificate has not yet become
    /// valid.
    #[error("time stamp has an expired certificate")]
    ExpiredCertificate,

    /// The time stamp authority does not chain to a trust point of the
    /// policy, or is not a time-stamping certificate.
    #[error("time stamp authority is untrusted ({0})")]
    Untrusted(String),

    /// The time stamp uses an unsupported signing or hash algorithm.
    #[error("time stamp contains an unsupported algorithm")]
    UnsupportedAlgorithm,

    /// Two time stamps of a chain cannot be ordered.
    #[error("ambiguous time stamp chain ({0})")]
    AmbiguousChain(String),

    /// The time stamp was generated too long after the signing time.
    #[error("time stamp at {gen_time} exceeds the allowed delay after {signing_time}")]
    DelayExceeded {
        gen_time: DateTime<Utc>,
        signing_time: DateTime<Utc>,
    },

    /// Revocation checking of the time stamp authority failed.
    #[error(transparent)]
    Revocation(CrossRefError),

    #[error("time stamp verification deadline exceeded")]
    DeadlineExceeded,

    /// An unexpected internal error occurred while verifying the time stamp.
    #[error("internal error ({0})")]
    InternalError(String),
}

impl TimeStampError {
    /// Validation status code logged for this failure.
    pub fn validation_status(&self) -> &'static str {
        match self {
            Self::ImprintMismatch | Self::InvalidSignature => TIMESTAMP_MISMATCH,
            Self::ExpiredCertificate => TIMESTAMP_OUTSIDE_VALIDITY,
            Self::Untrusted(_) | Self::Revocation(_) | Self::DeadlineExceeded => {
                TIMESTAMP_UNTRUSTED
            }
            Self::AmbiguousChain(_) => TIMESTAMP_CHAIN_AMBIGUOUS,
            Self::DelayExceeded { .. } => TIMESTAMP_DELAY_EXCEEDED,
            Self::DecodeError(_)
            | Self::SignerNotFound
            | Self::UnsupportedAlgorithm
            | Self::InternalError(_) => TIMESTAMP_MALFORMED,
        }
    }
}

impl From<DeadlineExceeded> for TimeStampError {
    fn from(_: DeadlineExceeded) -> Self {
        Self::DeadlineExceeded
    }
}

impl From<CrossRefError> for TimeStampError {
    fn from(err: CrossRefError) -> Self {
        match err {
            CrossRefError::DeadlineExceeded => Self::DeadlineExceeded,
            err => Self::Revocation(err),
        }
    }
}
