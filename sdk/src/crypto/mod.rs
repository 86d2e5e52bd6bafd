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

//! Cryptography and PKI building blocks: digests, raw signature
//! validation, ASN.1 structures and parsed views of certificates, CRLs and
//! OCSP responses.

pub(crate) mod asn1;

mod certificate;
pub use certificate::Certificate;

mod crl;
pub use crl::Crl;

pub mod hash;
pub use hash::{DefaultDigestProvider, DigestAlgorithm, DigestProvider};

pub mod ocsp;
pub use ocsp::OcspResponse;

pub mod raw_signature;

use thiserror::Error;

/// Describes why a certificate, CRL or OCSP response could not be read.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EvidenceError {
    #[error("invalid certificate: {0}")]
    Certificate(String),

    #[error("invalid CRL: {0}")]
    Crl(String),

    #[error("invalid OCSP response: {0}")]
    Ocsp(String),
}
