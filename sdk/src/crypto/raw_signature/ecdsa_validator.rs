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

use ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature as P256Signature, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{Signature as P384Signature, VerifyingKey as P384VerifyingKey};
use sha2::{Digest, Sha256, Sha384};
use spki::SubjectPublicKeyInfoRef;

use super::oids::{is, PRIME256V1_OID, SECP384R1_OID};
use crate::crypto::raw_signature::{RawSignatureValidationError, RawSignatureValidator};

/// An `EcdsaValidator` can validate raw signatures with one of the ECDSA
/// signature algorithms.
///
/// The variant picks the message digest; the curve is taken from the public
/// key.
pub enum EcdsaValidator {
    /// ECDSA with SHA-256
    Es256,

    /// ECDSA with SHA-384
    Es384,
}

enum EcdsaCurve {
    P256,
    P384,
}

fn ec_curve_from_public_key_der(public_key: &[u8]) -> Option<EcdsaCurve> {
    let spki = SubjectPublicKeyInfoRef::try_from(public_key).ok()?;
    let curve = spki.algorithm.parameters_oid().ok()?.to_string();

    if is(&curve, &PRIME256V1_OID) {
        Some(EcdsaCurve::P256)
    } else if is(&curve, &SECP384R1_OID) {
        Some(EcdsaCurve::P384)
    } else {
        None
    }
}

impl RawSignatureValidator for EcdsaValidator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let digest = match self {
            EcdsaValidator::Es256 => Sha256::digest(data).to_vec(),
            EcdsaValidator::Es384 => Sha384::digest(data).to_vec(),
        };

        // determine curve from public key
        let curve = ec_curve_from_public_key_der(public_key)
            .ok_or(RawSignatureValidationError::InvalidPublicKey)?;

        // CMS carries DER signatures, some producers use fixed size P1363
        let result = match curve {
            EcdsaCurve::P256 => {
                use p256::pkcs8::DecodePublicKey;
                let signature = P256Signature::from_der(sig)
                    .or_else(|_| P256Signature::from_slice(sig))
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

                let vk = P256VerifyingKey::from_public_key_der(public_key)
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

                vk.verify_prehash(&digest, &signature)
            }
            EcdsaCurve::P384 => {
                use p384::pkcs8::DecodePublicKey;
                let signature = P384Signature::from_der(sig)
                    .or_else(|_| P384Signature::from_slice(sig))
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

                let vk = P384VerifyingKey::from_public_key_der(public_key)
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

                vk.verify_prehash(&digest, &signature)
            }
        };

        result.map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::utils::test::TestKey;

    const SAMPLE_DATA: &[u8] = b"some sample content to sign";

    #[test]
    fn es256() {
        let key = TestKey::new(7);
        let sig = key.sign(SAMPLE_DATA);

        EcdsaValidator::Es256
            .validate(&sig, SAMPLE_DATA, &key.spki_der())
            .unwrap();
    }

    #[test]
    fn es256_p1363_signature() {
        let key = TestKey::new(8);
        let sig = key.sign_fixed(SAMPLE_DATA);
        assert_eq!(sig.len(), 64);

        EcdsaValidator::Es256
            .validate(&sig, SAMPLE_DATA, &key.spki_der())
            .unwrap();
    }

    #[test]
    fn bad_data() {
        let key = TestKey::new(9);
        let sig = key.sign(SAMPLE_DATA);

        let mut data = SAMPLE_DATA.to_vec();
        data[5] = 10;

        assert_eq!(
            EcdsaValidator::Es256
                .validate(&sig, &data, &key.spki_der())
                .unwrap_err(),
            RawSignatureValidationError::SignatureMismatch
        );
    }

    #[test]
    fn wrong_key() {
        let sig = TestKey::new(10).sign(SAMPLE_DATA);
        let other = TestKey::new(11);

        assert_eq!(
            EcdsaValidator::Es256
                .validate(&sig, SAMPLE_DATA, &other.spki_der())
                .unwrap_err(),
            RawSignatureValidationError::SignatureMismatch
        );
    }

    #[test]
    fn bad_public_key() {
        let sig = TestKey::new(12).sign(SAMPLE_DATA);

        assert_eq!(
            EcdsaValidator::Es256
                .validate(&sig, SAMPLE_DATA, b"not a key")
                .unwrap_err(),
            RawSignatureValidationError::InvalidPublicKey
        );
    }
}
