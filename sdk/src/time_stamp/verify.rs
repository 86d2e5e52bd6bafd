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

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Serialize;

use super::{token::TimeStampToken, TimeStampError, TimeStampKind};
use crate::{
    crypto::{
        raw_signature::validator_for_sig_and_hash_algs, Certificate, DefaultDigestProvider,
        DigestAlgorithm, DigestProvider,
    },
    deadline::Deadline,
    log_item,
    policy::{CertRevReq, CertificateTrustPoint, EffectiveRules},
    revocation::{
        CertificatePath, CrossRefError, EvidenceSources, RevocationMatcher, StatusReport,
        ValidationStore,
    },
    settings::Settings,
    validation_codes::{TIMESTAMP_TRUSTED, TIMESTAMP_VALIDATED},
    StatusTracker,
};

/// Outcome of verifying one time-stamp token.
///
/// A report only exists for a token whose message imprint matched the
/// time-stamped data. A mismatch is [`TimeStampError::ImprintMismatch`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TimeStampReport {
    pub kind: TimeStampKind,
    pub gen_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_algorithm")]
    pub hash_algorithm: DigestAlgorithm,

    /// Subject of the time-stamping certificate.
    pub signer: String,

    /// `true` if the authority was chained to a trust point of the policy.
    pub trusted: bool,

    #[serde(skip)]
    pub revocation: Option<StatusReport>,
}

fn serialize_algorithm<S: serde::Serializer>(alg: &DigestAlgorithm, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(alg)
}

/// Verifies RFC 3161 time-stamp tokens against the data they cover and the
/// time-stamp trust conditions of a policy.
pub struct TimeStampVerifier<'a> {
    trust_points: &'a [CertificateTrustPoint],
    rev_req: Option<&'a CertRevReq>,
    verify_trust: bool,
    clock_skew: Duration,
    digests: &'a dyn DigestProvider,
    deadline: Deadline,
}

impl<'a> TimeStampVerifier<'a> {
    pub fn new(trust_points: &'a [CertificateTrustPoint]) -> Self {
        Self {
            trust_points,
            rev_req: None,
            verify_trust: true,
            clock_skew: Duration::zero(),
            digests: &DefaultDigestProvider,
            deadline: Deadline::none(),
        }
    }

    /// A verifier using the time-stamp trust points and revocation
    /// requirements of `rules`.
    pub fn for_policy(rules: &EffectiveRules<'a>, settings: &Settings, deadline: Deadline) -> Self {
        Self::new(rules.time_stamp_trust_points())
            .with_rev_req(rules.time_stamp_rev_req())
            .with_trust_check(settings.verify.verify_timestamp_trust)
            .with_clock_skew(Duration::seconds(settings.core.clock_skew_secs))
            .with_deadline(deadline)
    }

    pub fn with_rev_req(mut self, rev_req: Option<&'a CertRevReq>) -> Self {
        self.rev_req = rev_req;
        self
    }

    /// Turns path building and revocation checking of the authority on or
    /// off.
    pub fn with_trust_check(mut self, verify_trust: bool) -> Self {
        self.verify_trust = verify_trust;
        self
    }

    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    pub fn with_digest_provider(mut self, digests: &'a dyn DigestProvider) -> Self {
        self.digests = digests;
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Verifies `token` as a time stamp over `target`.
    ///
    /// The signer certificate is looked up in the token first, then in
    /// `cert_store`. Each failed check is logged to `validation_log` and
    /// ends verification.
    pub fn verify(
        &self,
        token: &[u8],
        kind: TimeStampKind,
        target: &[u8],
        cert_store: EvidenceSources<'_>,
        validation_log: &mut StatusTracker,
    ) -> Result<TimeStampReport, TimeStampError> {
        let fail = |log: &mut StatusTracker, err: TimeStampError| {
            log_item!("", format!("{kind} time stamp: {err}"), "verify")
                .validation_status(err.validation_status())
                .failure_as_err(log, err)
        };

        let token = TimeStampToken::from_der(token).map_err(|e| fail(validation_log, e))?;
        let hash_algorithm = token.hash_algorithm().map_err(|e| fail(validation_log, e))?;

        if self.digests.hash(target, hash_algorithm) != token.message_imprint() {
            return Err(fail(validation_log, TimeStampError::ImprintMismatch));
        }

        let signer = self
            .signer_certificate(&token, cert_store)
            .map_err(|e| fail(validation_log, e))?;
        self.check_signature(&token, &signer)
            .map_err(|e| fail(validation_log, e))?;

        if !signer.valid_at(token.gen_time(), self.clock_skew) {
            return Err(fail(validation_log, TimeStampError::ExpiredCertificate));
        }

        log_item!("", format!("{kind} time stamp at {}", token.gen_time()), "verify")
            .validation_status(TIMESTAMP_VALIDATED)
            .success(validation_log);

        let mut report = TimeStampReport {
            kind,
            gen_time: token.gen_time(),
            hash_algorithm,
            signer: signer.subject_name().to_owned(),
            trusted: false,
            revocation: None,
        };

        if self.verify_trust {
            report.revocation = self
                .check_trust(&token, &signer, cert_store)
                .map_err(|e| fail(validation_log, e))?;
            report.trusted = true;

            log_item!("", format!("time stamp authority {} trusted", report.signer), "verify")
                .validation_status(TIMESTAMP_TRUSTED)
                .success(validation_log);
        }

        Ok(report)
    }

    fn signer_certificate(
        &self,
        token: &TimeStampToken,
        cert_store: EvidenceSources<'_>,
    ) -> Result<Certificate, TimeStampError> {
        if let Some(cert) = token
            .certificates()
            .iter()
            .find(|c| token.signer().matches(c))
        {
            return Ok(cert.clone());
        }

        let selector = token.signer().selector();
        for store in cert_store.iter() {
            self.deadline.check()?;
            if let Some(cert) = store
                .certificate(&selector, &self.deadline)
                .map_err(CrossRefError::from)?
            {
                return Ok(cert);
            }
        }
        Err(TimeStampError::SignerNotFound)
    }

    fn check_signature(&self, token: &TimeStampToken, signer: &Certificate) -> Result<(), TimeStampError> {
        if !token.message_digest_matches()? {
            return Err(TimeStampError::InvalidSignature);
        }

        let (sig_alg, hash_alg) = token.signature_algorithms();
        let validator = validator_for_sig_and_hash_algs(sig_alg, hash_alg)
            .ok_or(TimeStampError::UnsupportedAlgorithm)?;

        validator
            .validate(token.signature(), token.signed_bytes(), signer.spki())
            .map_err(|e| {
                debug!("time stamp signature: {e}");
                TimeStampError::InvalidSignature
            })
    }

    fn check_trust(
        &self,
        token: &TimeStampToken,
        signer: &Certificate,
        cert_store: EvidenceSources<'_>,
    ) -> Result<Option<StatusReport>, TimeStampError> {
        if !signer.has_time_stamping_eku() {
            return Err(TimeStampError::Untrusted(format!(
                "{} is not a time-stamping certificate",
                signer.subject_name()
            )));
        }
        if self.trust_points.is_empty() {
            return Err(TimeStampError::Untrusted(
                "the policy names no time-stamp trust points".to_string(),
            ));
        }

        let stores: Vec<&dyn ValidationStore> = cert_store.iter().collect();
        let path = CertificatePath::build(
            signer,
            token.certificates(),
            self.trust_points,
            &stores,
            &self.deadline,
        )
        .map_err(|e| match e {
            CrossRefError::Malformed(reason) => TimeStampError::Untrusted(reason),
            other => other.into(),
        })?;

        let Some(rev_req) = self.rev_req else {
            return Ok(None);
        };
        let report = RevocationMatcher::new(self.digests, self.deadline).check_status(
            &path,
            rev_req,
            cert_store,
            token.gen_time(),
        )?;
        Ok(Some(report))
    }
}

/// Checks that a time stamp was generated no later than `delay` after
/// `signing_time`.
pub fn check_delay(
    gen_time: DateTime<Utc>,
    signing_time: DateTime<Utc>,
    delay: Option<Duration>,
) -> Result<(), TimeStampError> {
    match delay {
        Some(delay) if gen_time - signing_time > delay => Err(TimeStampError::DelayExceeded {
            gen_time,
            signing_time,
        }),
        _ => Ok(()),
    }
}
