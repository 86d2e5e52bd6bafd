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

use log::debug;

use super::{store::CertSelector, CrossRefError, Tier, ValidationStore};
use crate::{crypto::Certificate, deadline::Deadline, policy::CertificateTrustPoint};

/// Longest chain of CA certificates accepted between a certificate and its
/// anchor.
const MAX_PATH_DEPTH: usize = 10;

/// A certificate path `[end, ca1 … caN, anchor]`.
///
/// The anchor only acts as the issuer of the topmost CA. Revocation is
/// checked for the end-entity and the intermediate CAs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificatePath {
    end: Certificate,
    cas: Vec<Certificate>,
    anchor: Option<Certificate>,
}

impl CertificatePath {
    pub fn new(end: Certificate, cas: Vec<Certificate>, anchor: Option<Certificate>) -> Self {
        Self { end, cas, anchor }
    }

    /// Builds a path from `end` up to one of `trust_points`.
    ///
    /// Issuers are taken from `intermediates` first, then from `stores` in
    /// order. Every link signature is checked, as are the path length
    /// constraints of the CAs and of the trust point. When `trust_points`
    /// is empty, the path ends at the first self-issued certificate.
    pub fn build(
        end: &Certificate,
        intermediates: &[Certificate],
        trust_points: &[CertificateTrustPoint],
        stores: &[&dyn ValidationStore],
        deadline: &Deadline,
    ) -> Result<Self, CrossRefError> {
        let mut cas: Vec<Certificate> = Vec::new();
        let mut current = end.clone();

        loop {
            if let Some(point) = trust_points.iter().find(|p| p.is_issuer_of(&current)) {
                link(&current, &point.certificate)?;
                if let Some(max) = point.path_len_constraint {
                    if cas.len() > max as usize {
                        return Err(CrossRefError::Malformed(format!(
                            "path through {} exceeds the trust point path length of {max}",
                            point.certificate.subject_name()
                        )));
                    }
                }
                debug!(
                    "path for {} anchored at {} with {} CA(s)",
                    end.subject_name(),
                    point.certificate.subject_name(),
                    cas.len()
                );
                return Ok(Self {
                    end: end.clone(),
                    cas,
                    anchor: Some(point.certificate.clone()),
                });
            }

            if current.is_self_issued() {
                if !trust_points.is_empty() {
                    return Err(CrossRefError::Malformed(format!(
                        "{} is not issued by a trust point",
                        current.subject_name()
                    )));
                }
                if cas.last() == Some(&current) {
                    cas.pop();
                }
                return Ok(Self {
                    end: end.clone(),
                    cas,
                    anchor: Some(current),
                });
            }

            if cas.len() >= MAX_PATH_DEPTH {
                return Err(CrossRefError::Malformed(format!(
                    "no trust point within {MAX_PATH_DEPTH} certificates of {}",
                    end.subject_name()
                )));
            }

            let issuer = find_issuer(&current, intermediates, stores, deadline)?.ok_or_else(|| {
                CrossRefError::Malformed(format!("issuer of {} not found", current.subject_name()))
            })?;
            link(&current, &issuer)?;

            if !issuer.is_self_issued() || trust_points.is_empty() {
                if !issuer.is_ca() {
                    return Err(CrossRefError::Malformed(format!(
                        "{} is not a CA certificate",
                        issuer.subject_name()
                    )));
                }
                if let Some(max) = issuer.path_len_constraint() {
                    if cas.len() > max as usize {
                        return Err(CrossRefError::Malformed(format!(
                            "path length constraint of {} exceeded",
                            issuer.subject_name()
                        )));
                    }
                }
            }

            cas.push(issuer.clone());
            current = issuer;
        }
    }

    pub fn end(&self) -> &Certificate {
        &self.end
    }

    pub fn cas(&self) -> &[Certificate] {
        &self.cas
    }

    pub fn anchor(&self) -> Option<&Certificate> {
        self.anchor.as_ref()
    }

    /// Certificates subject to revocation checking, with their issuer.
    pub fn tiers(&self) -> impl Iterator<Item = (Tier, &Certificate, Option<&Certificate>)> {
        let subjects = std::iter::once(&self.end).chain(self.cas.iter());
        let issuers = self.cas.iter().map(Some).chain(std::iter::once(self.anchor()));

        subjects.zip(issuers).enumerate().map(|(i, (cert, issuer))| {
            let tier = if i == 0 { Tier::EndEntity } else { Tier::Ca };
            (tier, cert, issuer)
        })
    }

    pub fn len(&self) -> usize {
        1 + self.cas.len() + usize::from(self.anchor.is_some())
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

fn link(cert: &Certificate, issuer: &Certificate) -> Result<(), CrossRefError> {
    cert.verify_issued_by(issuer).map_err(|e| {
        CrossRefError::Malformed(format!(
            "signature of {} does not verify with {}: {e}",
            cert.subject_name(),
            issuer.subject_name()
        ))
    })
}

// When more than one distinct candidate verifies the link, the path is
// ambiguous. When none verifies, the first candidate is returned so the
// caller reports the broken link.
fn find_issuer(
    cert: &Certificate,
    intermediates: &[Certificate],
    stores: &[&dyn ValidationStore],
    deadline: &Deadline,
) -> Result<Option<Certificate>, CrossRefError> {
    let selector = CertSelector::issuer_of(cert);

    let mut candidates: Vec<Certificate> = Vec::new();
    let mut add = |found: &Certificate| {
        if !candidates.iter().any(|c| c.der() == found.der()) {
            candidates.push(found.clone());
        }
    };
    intermediates
        .iter()
        .filter(|c| selector.matches(c))
        .for_each(&mut add);
    for store in stores {
        deadline.check()?;
        if let Some(found) = store.certificate(&selector, deadline)? {
            add(&found);
        }
    }

    let verified: Vec<&Certificate> = candidates
        .iter()
        .filter(|c| cert.verify_issued_by(c).is_ok())
        .collect();

    match verified.as_slice() {
        [] => Ok(candidates.first().cloned()),
        [issuer] => Ok(Some((*issuer).clone())),
        several => Err(CrossRefError::Malformed(format!(
            "ambiguous issuer for {}: {} certificates verify",
            cert.subject_name(),
            several.len()
        ))),
    }
}
