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

//! Sources of certificates, CRLs and OCSP responses.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    crypto::{Certificate, Crl, OcspResponse},
    deadline::Deadline,
};

/// Selects certificates, or the CRLs issued for them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CertSelector {
    /// Issuer `Name` in DER.
    pub issuer: Option<Vec<u8>>,

    /// Serial number content octets.
    pub serial: Option<Vec<u8>>,

    /// Subject `Name` in DER.
    pub subject: Option<Vec<u8>>,
    pub subject_key_id: Option<Vec<u8>>,
}

impl CertSelector {
    /// Selects the certificate whose subject issued `cert`.
    pub fn issuer_of(cert: &Certificate) -> Self {
        Self {
            subject: Some(cert.issuer().to_vec()),
            ..Default::default()
        }
    }

    pub fn issuer_and_serial(issuer: &[u8], serial: &[u8]) -> Self {
        Self {
            issuer: Some(issuer.to_vec()),
            serial: Some(serial.to_vec()),
            ..Default::default()
        }
    }

    pub fn subject_key_id(id: &[u8]) -> Self {
        Self {
            subject_key_id: Some(id.to_vec()),
            ..Default::default()
        }
    }

    /// Returns `true` if `cert` satisfies every set criterion.
    pub fn matches(&self, cert: &Certificate) -> bool {
        self.issuer.as_deref().map_or(true, |i| i == cert.issuer())
            && self.serial.as_deref().map_or(true, |s| s == cert.serial())
            && self.subject.as_deref().map_or(true, |s| s == cert.subject())
            && self
                .subject_key_id
                .as_deref()
                .map_or(true, |id| Some(id) == cert.subject_key_id())
    }
}

/// Describes a failed store lookup.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store lookup timed out")]
    Timeout,
}

/// Certificate and revocation data source.
///
/// The identity store (evidence embedded in the signature) and the caller's
/// validation-data cache both implement this trait. Implementations that do
/// I/O must stop once `deadline` has passed and return
/// [`StoreError::Timeout`].
pub trait ValidationStore: Send + Sync {
    /// First certificate matching `selector`.
    fn certificate(
        &self,
        selector: &CertSelector,
        deadline: &Deadline,
    ) -> Result<Option<Certificate>, StoreError>;

    /// CRLs issued by `selector.issuer` that could cover `reference_time`.
    fn crls(
        &self,
        selector: &CertSelector,
        reference_time: DateTime<Utc>,
        deadline: &Deadline,
    ) -> Result<Vec<Crl>, StoreError>;

    fn ocsp_responses(&self, deadline: &Deadline) -> Result<Vec<OcspResponse>, StoreError>;
}

/// In-memory [`ValidationStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    certs: Vec<Certificate>,
    crls: Vec<Crl>,
    ocsp: Vec<OcspResponse>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_certificate(&mut self, cert: Certificate) {
        if !self.certs.contains(&cert) {
            self.certs.push(cert);
        }
    }

    pub fn add_crl(&mut self, crl: Crl) {
        if !self.crls.contains(&crl) {
            self.crls.push(crl);
        }
    }

    pub fn add_ocsp_response(&mut self, response: OcspResponse) {
        if !self.ocsp.contains(&response) {
            self.ocsp.push(response);
        }
    }

    /// Adds `other`'s contents to this store.
    pub fn extend(&mut self, other: MemoryStore) {
        other.certs.into_iter().for_each(|c| self.add_certificate(c));
        other.crls.into_iter().for_each(|c| self.add_crl(c));
        other.ocsp.into_iter().for_each(|r| self.add_ocsp_response(r));
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certs
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty() && self.crls.is_empty() && self.ocsp.is_empty()
    }
}

impl ValidationStore for MemoryStore {
    fn certificate(
        &self,
        selector: &CertSelector,
        deadline: &Deadline,
    ) -> Result<Option<Certificate>, StoreError> {
        deadline.check().map_err(|_| StoreError::Timeout)?;
        Ok(self.certs.iter().find(|c| selector.matches(c)).cloned())
    }

    fn crls(
        &self,
        selector: &CertSelector,
        _reference_time: DateTime<Utc>,
        deadline: &Deadline,
    ) -> Result<Vec<Crl>, StoreError> {
        deadline.check().map_err(|_| StoreError::Timeout)?;
        Ok(self
            .crls
            .iter()
            .filter(|crl| selector.issuer.as_deref().map_or(true, |i| i == crl.issuer()))
            .cloned()
            .collect())
    }

    fn ocsp_responses(&self, deadline: &Deadline) -> Result<Vec<OcspResponse>, StoreError> {
        deadline.check().map_err(|_| StoreError::Timeout)?;
        Ok(self.ocsp.clone())
    }
}
