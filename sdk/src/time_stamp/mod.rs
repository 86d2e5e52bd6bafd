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

//! Verification and ordering of RFC 3161 time stamps.
//!
//! [`TimeStampVerifier`] checks one token against the data it covers and
//! the time-stamp trust conditions of a policy. Nested archive and document
//! time stamps are put in order with [`order_and_mark_last`] and
//! [`order_by_byte_range`].

mod chain;
mod error;
mod token;
mod verify;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use self::{
    chain::{order_and_mark_last, order_by_byte_range, ChainEntry},
    error::TimeStampError,
    token::{SignerRef, TimeStampToken},
    verify::{check_delay, TimeStampReport, TimeStampVerifier},
};
use crate::crypto::DigestAlgorithm;

/// What a time stamp covers.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum TimeStampKind {
    /// The signed content, before signing.
    Content,
    /// The signature value.
    Signature,
    /// The signature with its certificate and revocation references.
    SigAndRefs,
    /// The signature with all validation data.
    Archive,
    /// A PDF document up to the time stamp.
    Document,
}

impl fmt::Display for TimeStampKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Content => "content",
            Self::Signature => "signature",
            Self::SigAndRefs => "signature and references",
            Self::Archive => "archive",
            Self::Document => "document",
        })
    }
}

/// PDF `/ByteRange`: `[start1 len1 start2 len2]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ByteRange(pub [u64; 4]);

impl ByteRange {
    /// Offset just past the second covered range.
    pub fn end_offset(&self) -> u64 {
        self.0[2].saturating_add(self.0[3])
    }
}

/// Time stamp found in a signature, as used for ordering.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeStampRecord {
    pub kind: TimeStampKind,

    /// Attribute carrying the token; `None` for document time stamps.
    pub attribute_id: Option<String>,

    /// Position among the time stamps of the same attribute.
    pub occurrence: usize,
    pub hash_algorithm: DigestAlgorithm,
    pub message_imprint: Vec<u8>,
    pub gen_time: DateTime<Utc>,
    pub signer: Option<SignerRef>,
    pub byte_range: Option<ByteRange>,
}

impl TimeStampRecord {
    pub fn from_token(
        kind: TimeStampKind,
        attribute_id: Option<&str>,
        occurrence: usize,
        token: &TimeStampToken,
    ) -> Result<Self, TimeStampError> {
        Ok(Self {
            kind,
            attribute_id: attribute_id.map(str::to_owned),
            occurrence,
            hash_algorithm: token.hash_algorithm()?,
            message_imprint: token.message_imprint().to_vec(),
            gen_time: token.gen_time(),
            signer: Some(token.signer().clone()),
            byte_range: None,
        })
    }

    pub fn with_byte_range(mut self, range: ByteRange) -> Self {
        self.byte_range = Some(range);
        self
    }
}
