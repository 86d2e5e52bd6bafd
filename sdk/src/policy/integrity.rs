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

//! Self-integrity check of a decoded policy.

use log::{debug, warn};

use super::{model::IntegrityStatus, DecodeOptions, PolicyEncoding, PolicyError};
use crate::crypto::hash::{DefaultDigestProvider, DigestAlgorithm, DigestProvider};

/// Checks the policy digest over `DER(signPolicyHashAlg) || DER(signPolicyInfo)`.
///
/// A DER mismatch is fatal. Policies whose digest cannot be checked are
/// `Unverified`, which is itself an error when `options.reject_unverified`
/// is set.
pub(crate) fn check(
    encoding: PolicyEncoding,
    algorithm: DigestAlgorithm,
    signed_bytes: Option<&[u8]>,
    declared: Option<&[u8]>,
    options: &DecodeOptions,
) -> Result<IntegrityStatus, PolicyError> {
    let status = match (encoding, signed_bytes, declared) {
        _ if !options.check_integrity => {
            IntegrityStatus::Unverified("integrity check disabled".to_owned())
        }
        (PolicyEncoding::Xml, _, _) => IntegrityStatus::Unverified(
            "XML policy digests require canonicalization, which is not supported".to_owned(),
        ),
        (PolicyEncoding::Der, _, None) => {
            IntegrityStatus::Unverified("the policy declares no digest".to_owned())
        }
        (PolicyEncoding::Der, None, Some(_)) => {
            return Err(PolicyError::decoding("SignaturePolicy", "missing encoding"))
        }
        (PolicyEncoding::Der, Some(signed), Some(expected)) => {
            let actual = DefaultDigestProvider.hash(signed, algorithm);
            if actual != expected {
                warn!("policy digest mismatch ({algorithm})");
                return Err(PolicyError::Integrity {
                    expected: expected.to_vec(),
                    actual,
                });
            }
            IntegrityStatus::Verified
        }
    };

    if let IntegrityStatus::Unverified(reason) = &status {
        if options.reject_unverified {
            return Err(PolicyError::UnverifiedIntegrity(reason.clone()));
        }
        debug!("policy integrity unverified: {reason}");
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn options(check: bool, reject: bool) -> DecodeOptions {
        DecodeOptions {
            check_integrity: check,
            reject_unverified: reject,
        }
    }

    #[test]
    fn matching_digest_verifies() {
        let signed = b"alg||info";
        let digest = DigestAlgorithm::Sha256.digest(signed);

        let status = check(
            PolicyEncoding::Der,
            DigestAlgorithm::Sha256,
            Some(signed),
            Some(&digest),
            &options(true, true),
        )
        .unwrap();
        assert_eq!(status, IntegrityStatus::Verified);
    }

    #[test]
    fn mismatch_is_fatal() {
        let err = check(
            PolicyEncoding::Der,
            DigestAlgorithm::Sha1,
            Some(b"x"),
            Some(&[0u8; 20]),
            &options(true, false),
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::Integrity { expected, .. } if expected == [0u8; 20]));
    }

    #[test]
    fn xml_is_unverified_unless_rejected() {
        let status = check(
            PolicyEncoding::Xml,
            DigestAlgorithm::Sha256,
            None,
            Some(&[1, 2, 3]),
            &options(true, false),
        )
        .unwrap();
        assert!(matches!(status, IntegrityStatus::Unverified(_)));

        let err = check(
            PolicyEncoding::Xml,
            DigestAlgorithm::Sha256,
            None,
            None,
            &options(true, true),
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::UnverifiedIntegrity(_)));
    }

    #[test]
    fn disabled_check_skips_comparison() {
        let status = check(
            PolicyEncoding::Der,
            DigestAlgorithm::Sha256,
            Some(b"x"),
            Some(&[0u8; 32]),
            &options(false, false),
        )
        .unwrap();
        assert_eq!(
            status,
            IntegrityStatus::Unverified("integrity check disabled".to_owned())
        );
    }
}
