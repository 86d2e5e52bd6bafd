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

//! Digest algorithms and the [`DigestProvider`] seam.

use std::fmt;

use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

/// Digest algorithms recognized in policies, revocation references and
/// time-stamp tokens.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    /// SHA-1
    Sha1,
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

// (dotted OID, XML URIs)
const DIGEST_ALGORITHMS: &[(DigestAlgorithm, &str, &[&str])] = &[
    (
        DigestAlgorithm::Sha1,
        "1.3.14.3.2.26",
        &["http://www.w3.org/2000/09/xmldsig#sha1"],
    ),
    (
        DigestAlgorithm::Sha224,
        "2.16.840.1.101.3.4.2.4",
        &["http://www.w3.org/2001/04/xmldsig-more#sha224"],
    ),
    (
        DigestAlgorithm::Sha256,
        "2.16.840.1.101.3.4.2.1",
        &["http://www.w3.org/2001/04/xmlenc#sha256"],
    ),
    (
        DigestAlgorithm::Sha384,
        "2.16.840.1.101.3.4.2.2",
        &["http://www.w3.org/2001/04/xmldsig-more#sha384"],
    ),
    (
        DigestAlgorithm::Sha512,
        "2.16.840.1.101.3.4.2.3",
        &["http://www.w3.org/2001/04/xmlenc#sha512"],
    ),
];

impl DigestAlgorithm {
    /// Looks up an algorithm by dotted OID.
    pub fn from_oid(oid: &str) -> Option<Self> {
        DIGEST_ALGORITHMS
            .iter()
            .find(|(_, o, _)| *o == oid.trim())
            .map(|(alg, _, _)| *alg)
    }

    /// Looks up an algorithm by XML Signature URI or `urn:oid:` URN.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let uri = uri.trim();
        if let Some(oid) = strip_urn_oid(uri) {
            return Self::from_oid(oid);
        }
        DIGEST_ALGORITHMS
            .iter()
            .find(|(_, _, uris)| uris.contains(&uri))
            .map(|(alg, _, _)| *alg)
    }

    /// Looks up an algorithm by dotted OID, URI or URN.
    pub fn from_identifier(id: &str) -> Option<Self> {
        Self::from_oid(id).or_else(|| Self::from_uri(id))
    }

    /// Dotted OID of this algorithm.
    pub fn oid(&self) -> &'static str {
        DIGEST_ALGORITHMS
            .iter()
            .find(|(alg, _, _)| alg == self)
            .map(|(_, oid, _)| *oid)
            .unwrap_or_default()
    }

    /// Length in bytes of a digest produced by this algorithm.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns an incremental hasher for this algorithm.
    pub fn digester(&self) -> Hasher {
        match self {
            Self::Sha1 => Hasher::Sha1(Sha1::new()),
            Self::Sha224 => Hasher::Sha224(Sha224::new()),
            Self::Sha256 => Hasher::Sha256(Sha256::new()),
            Self::Sha384 => Hasher::Sha384(Sha384::new()),
            Self::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }

    /// Hashes `data` in one step.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut h = self.digester();
        h.update(data);
        h.finish()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        };
        f.write_str(name)
    }
}

pub(crate) fn strip_urn_oid(id: &str) -> Option<&str> {
    let prefix = id.get(..8)?;
    if prefix.eq_ignore_ascii_case("urn:oid:") {
        id.get(8..)
    } else {
        None
    }
}

/// Incremental hasher returned by [`DigestAlgorithm::digester`].
pub enum Hasher {
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl Hasher {
    /// Feeds more data into the hash.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha1(d) => d.update(data),
            Hasher::Sha224(d) => d.update(data),
            Hasher::Sha256(d) => d.update(data),
            Hasher::Sha384(d) => d.update(data),
            Hasher::Sha512(d) => d.update(data),
        }
    }

    /// Consumes the hasher and returns the digest.
    pub fn finish(self) -> Vec<u8> {
        match self {
            Hasher::Sha1(d) => d.finalize().to_vec(),
            Hasher::Sha224(d) => d.finalize().to_vec(),
            Hasher::Sha256(d) => d.finalize().to_vec(),
            Hasher::Sha384(d) => d.finalize().to_vec(),
            Hasher::Sha512(d) => d.finalize().to_vec(),
        }
    }
}

/// Computes digests on behalf of the verification engine.
///
/// Implement this to route hashing through a platform or hardware provider.
pub trait DigestProvider: Send + Sync {
    /// Returns the digest of `data` under `algorithm`.
    fn hash(&self, data: &[u8], algorithm: DigestAlgorithm) -> Vec<u8>;
}

/// [`DigestProvider`] backed by the `sha1` and `sha2` crates.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultDigestProvider;

impl DigestProvider for DefaultDigestProvider {
    fn hash(&self, data: &[u8], algorithm: DigestAlgorithm) -> Vec<u8> {
        algorithm.digest(data)
    }
}

/// Given a byte slice, return the SHA-1 hash of that content.
pub fn sha1(data: &[u8]) -> Vec<u8> {
    DigestAlgorithm::Sha1.digest(data)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn lookup_by_oid_and_uri() {
        assert_eq!(
            DigestAlgorithm::from_oid("2.16.840.1.101.3.4.2.1"),
            Some(DigestAlgorithm::Sha256)
        );
        assert_eq!(
            DigestAlgorithm::from_uri("http://www.w3.org/2001/04/xmlenc#sha512"),
            Some(DigestAlgorithm::Sha512)
        );
        assert_eq!(
            DigestAlgorithm::from_uri("URN:OID:1.3.14.3.2.26"),
            Some(DigestAlgorithm::Sha1)
        );
        assert_eq!(
            DigestAlgorithm::from_identifier("http://www.w3.org/2000/09/xmldsig#sha1"),
            Some(DigestAlgorithm::Sha1)
        );
        assert_eq!(DigestAlgorithm::from_identifier("1.2.3"), None);
    }

    #[test]
    fn oid_round_trips() {
        for (alg, oid, _) in DIGEST_ALGORITHMS {
            assert_eq!(alg.oid(), *oid);
            assert_eq!(DigestAlgorithm::from_oid(oid), Some(*alg));
        }
    }

    #[test]
    fn known_digests() {
        assert_eq!(
            hex::encode(sha1(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            hex::encode(DefaultDigestProvider.hash(b"abc", DigestAlgorithm::Sha256)),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut h = DigestAlgorithm::Sha384.digester();
        h.update(b"hello ");
        h.update(b"world");
        let digest = h.finish();

        assert_eq!(digest, DigestAlgorithm::Sha384.digest(b"hello world"));
        assert_eq!(digest.len(), DigestAlgorithm::Sha384.output_len());
    }
}
