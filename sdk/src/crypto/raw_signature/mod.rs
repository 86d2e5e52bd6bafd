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

//! Validation of raw signature values as found in CMS `SignerInfo`
//! structures, time-stamp tokens and OCSP responses.

use thiserror::Error;

mod ecdsa_validator;
pub(crate) use ecdsa_validator::EcdsaValidator;

pub(crate) mod oids;
use oids::*;

mod rsa_legacy_validator;
pub(crate) use rsa_legacy_validator::RsaLegacyValidator;

/// A `RawSignatureValidator` implementation checks a signature encoded using a
/// specific signature algorithm and a private/public key pair.
///
/// The signature is typically embedded in a wrapper such as a CMS
/// `SignerInfo`; `RawSignatureValidator` does not interpret that wrapper.
pub trait RawSignatureValidator {
    /// Return `Ok(())` if the signature `sig` is valid for the raw content
    /// `data` and the DER-encoded `SubjectPublicKeyInfo` `public_key`.
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError>;
}

/// Describes errors that can be identified when validating a raw signature.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum RawSignatureValidationError {
    /// The signature does not match the provided data or public key.
    #[error("the signature does not match the provided data or public key")]
    SignatureMismatch,

    /// An error was reported by the underlying cryptography implementation.
    #[error("an error was reported by the cryptography library: {0}")]
    CryptoLibraryError(String),

    /// An invalid public key was provided.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// An invalid signature value was provided.
    #[error("invalid signature value")]
    InvalidSignature,

    /// The signature uses an unsupported signing or hash algorithm.
    #[error("signature uses an unsupported algorithm")]
    UnsupportedAlgorithm,

    /// An unexpected internal error occured while validating the signature.
    #[error("internal error ({0})")]
    InternalError(String),
}

/// Select validator based on signing algorithm and hash type.
///
/// Both algorithms are dotted OIDs. `sig_alg` may be a combined signature
/// algorithm (`sha256WithRSAEncryption`) or a bare public key algorithm
/// (`rsaEncryption`, `id-ecPublicKey`), in which case `hash_alg` decides.
pub(crate) fn validator_for_sig_and_hash_algs(
    sig_alg: &str,
    hash_alg: &str,
) -> Option<Box<dyn RawSignatureValidator>> {
    // try signature algs first
    if is(sig_alg, &ECDSA_WITH_SHA256_OID) {
        return Some(Box::new(EcdsaValidator::Es256));
    }
    if is(sig_alg, &ECDSA_WITH_SHA384_OID) {
        return Some(Box::new(EcdsaValidator::Es384));
    }
    if is(sig_alg, &SHA1_WITH_RSAENCRYPTION_OID) {
        return Some(Box::new(RsaLegacyValidator::Sha1));
    }
    if is(sig_alg, &SHA256_WITH_RSAENCRYPTION_OID) {
        return Some(Box::new(RsaLegacyValidator::Rsa256));
    }
    if is(sig_alg, &SHA384_WITH_RSAENCRYPTION_OID) {
        return Some(Box::new(RsaLegacyValidator::Rsa384));
    }
    if is(sig_alg, &SHA512_WITH_RSAENCRYPTION_OID) {
        return Some(Box::new(RsaLegacyValidator::Rsa512));
    }

    // Test for public key algs next

    if is(sig_alg, &RSA_OID) {
        if is(hash_alg, &SHA1_OID) {
            return Some(Box::new(RsaLegacyValidator::Sha1));
        } else if is(hash_alg, &SHA256_OID) {
            return Some(Box::new(RsaLegacyValidator::Rsa256));
        } else if is(hash_alg, &SHA384_OID) {
            return Some(Box::new(RsaLegacyValidator::Rsa384));
        } else if is(hash_alg, &SHA512_OID) {
            return Some(Box::new(RsaLegacyValidator::Rsa512));
        }
    }

    if is(sig_alg, &EC_PUBLICKEY_OID) {
        if is(hash_alg, &SHA256_OID) {
            return Some(Box::new(EcdsaValidator::Es256));
        } else if is(hash_alg, &SHA384_OID) {
            return Some(Box::new(EcdsaValidator::Es384));
        }
    }

    None
}
