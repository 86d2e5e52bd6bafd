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


//! The verification pipeline.
//!
//! [`SignatureVerifier`] decodes a policy, validates the attributes of one
//! signature against it and folds everything into a [`VerificationReport`].

use log::{info, warn};
use serde::Serialize;

use crate::{
    attributes::{AttributeError, AttributeOutcome, AttributeValidationEngine},
    crypto::{DefaultDigestProvider, DigestProvider},
    log_item, pades,
    policy::{self, DecodeOptions, IntegrityStatus, PdfEntry, PolicyEncoding, SignaturePolicy},
    revocation::{EvidenceSources, MatchResult, MemoryStore, ValidationStore},
    settings::Settings,
    signature::SignatureReader,
    time_stamp::{
        order_by_byte_range, ByteRange, ChainEntry, TimeStampError, TimeStampKind,
        TimeStampRecord, TimeStampReport, TimeStampToken, TimeStampVerifier,
    },
    validation_codes::{POLICY_INTEGRITY_UNVERIFIED, POLICY_INTEGRITY_VALIDATED},
    Error, LogItem, Result, StatusTracker,
};

/// Overall result of a verification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Verdict {
    /// Every check passed.
    Valid,

    /// Optional attributes or time stamps failed; nothing the policy
    /// mandates did.
    ValidWithWarnings,

    /// A signed or mandated attribute, or a document time stamp, failed.
    Invalid,
}

/// A document time stamp of a PDF, checked alongside the signature.
#[derive(Clone, Debug)]
pub struct DocumentTimeStamp {
    /// DER `TimeStampToken` from the `/Contents` of the time-stamp
    /// dictionary.
    pub token: Vec<u8>,
    pub byte_range: ByteRange,

    /// The document bytes covered by `byte_range`.
    pub covered: Vec<u8>,

    /// Entries of the time-stamp dictionary.
    pub dictionary: Vec<PdfEntry>,
}

/// What the caller knows about where the signature came from.
#[derive(Default)]
pub struct VerificationContext<'a> {
    /// Encoding of the policy document; detected when `None`.
    pub policy_encoding: Option<PolicyEncoding>,

    /// Validation data cache consulted after the evidence the signature
    /// carries.
    pub cache: Option<&'a dyn ValidationStore>,

    pub digests: Option<&'a dyn DigestProvider>,

    /// Entries of the PDF signature dictionary, for PAdES signatures.
    pub signature_dictionary: Option<&'a [PdfEntry]>,

    pub document_time_stamps: &'a [DocumentTimeStamp],
}

/// A time stamp that could not be verified, outside of any attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeStampFailure {
    pub kind: TimeStampKind,

    /// Position among the document time stamps.
    pub index: usize,
    pub error: TimeStampError,
}

/// Everything a verification found.
#[derive(Clone, Debug)]
pub struct VerificationReport {
    pub policy_id: String,
    pub policy_integrity: IntegrityStatus,

    /// Commitment type the policy rules were resolved for.
    pub commitment: Option<String>,
    pub attribute_outcomes: Vec<AttributeOutcome>,
    pub time_stamp_reports: Vec<TimeStampReport>,
    pub time_stamp_failures: Vec<TimeStampFailure>,

    /// Archive time stamps, innermost first.
    pub archive_chain: Vec<ChainEntry>,

    /// Document time stamps, outermost first.
    pub document_time_stamps: Vec<TimeStampRecord>,
    pub revocation: Option<MatchResult>,
    pub verdict: Verdict,
    pub log: Vec<LogItem>,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.verdict != Verdict::Invalid
    }
}

/// Verifies signatures against signature policies.
///
/// ```no_run
/// # use sigpolicy::Result;
/// use sigpolicy::{
///     settings::Settings,
///     signature::CmsSignature,
///     verifier::{SignatureVerifier, VerificationContext},
/// };
///
/// # fn main() -> Result<()> {
/// let signature = CmsSignature::from_der(&std::fs::read("document.p7s")?)?;
/// let policy = std::fs::read("PA_AD_RB_v2_3.der")?;
///
/// let report = SignatureVerifier::new(Settings::new()).verify(
///     &signature,
///     &policy,
///     &VerificationContext::default(),
/// )?;
/// println!("{:?}", report.verdict);
/// # Ok(())
/// # }
/// ```
pub struct SignatureVerifier {
    settings: Settings,
}

impl SignatureVerifier {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Verifies `signature` against the policy in `policy_bytes`.
    ///
    /// A policy that cannot be decoded, or whose integrity check fails, is
    /// an error rather than a verdict. So is a lookup deadline that passes
    /// and, when `stop_on_first_error` is set, the first failed check.
    pub fn verify(
        &self,
        signature: &dyn SignatureReader,
        policy_bytes: &[u8],
        context: &VerificationContext<'_>,
    ) -> Result<VerificationReport> {
        let mut log = StatusTracker::with_error_behavior(self.settings.verify.error_behavior());
        let policy = self.decode_policy(policy_bytes, context, &mut log)?;
        let digests = context.digests.unwrap_or(&DefaultDigestProvider);
        let deadline = self.settings.verify.lookup_deadline();

        let mut engine = AttributeValidationEngine::new(&self.settings)
            .with_digest_provider(digests)
            .with_deadline(deadline);
        if let Some(cache) = context.cache {
            engine = engine.with_cache(cache);
        }

        let mut report = VerificationReport {
            policy_id: policy.policy_id().to_string(),
            policy_integrity: policy.integrity.clone(),
            commitment: None,
            attribute_outcomes: Vec::new(),
            time_stamp_reports: Vec::new(),
            time_stamp_failures: Vec::new(),
            archive_chain: Vec::new(),
            document_time_stamps: Vec::new(),
            revocation: None,
            verdict: Verdict::Valid,
            log: Vec::new(),
        };

        match engine.validate(signature, &policy, &mut log) {
            Ok(validation) => {
                report.commitment = validation.commitment;
                report.attribute_outcomes = validation.outcomes;
                report.time_stamp_reports = validation.time_stamps;
                report.archive_chain = validation.archive_chain;
                report.revocation = validation.revocation;
            }
            Err(Error::Attribute(err @ AttributeError::Critical { .. })) => {
                warn!("verification ended early: {err}");
                report.attribute_outcomes.push(critical_outcome(err));
                report.verdict = Verdict::Invalid;
                report.log = log.into_logged_items();
                return Ok(report);
            }
            Err(err) => return Err(err),
        }

        if let Some(dictionary) = context.signature_dictionary {
            report
                .attribute_outcomes
                .extend(pades::check_signature_dictionary(dictionary, &policy, &mut log)?);
            report
                .attribute_outcomes
                .extend(pades::check_policy_reference(signature, &mut log)?);
        }

        if !context.document_time_stamps.is_empty() {
            self.verify_document_time_stamps(
                signature,
                &policy,
                context,
                digests,
                &mut report,
                &mut log,
            )?;
        }

        report.verdict = verdict(&report);
        info!(
            "signature verified against policy {}: {:?}",
            report.policy_id, report.verdict
        );
        report.log = log.into_logged_items();
        Ok(report)
    }

    fn decode_policy(
        &self,
        policy_bytes: &[u8],
        context: &VerificationContext<'_>,
        log: &mut StatusTracker,
    ) -> Result<SignaturePolicy> {
        let options = DecodeOptions::from(&self.settings.verify);
        let policy = match policy::decode_with_options(
            policy_bytes,
            context.policy_encoding,
            &options,
        ) {
            Ok(policy) => policy,
            Err(err) => {
                log_item!("policy", err.to_string(), "decode_policy")
                    .validation_status(err.validation_status())
                    .failure_no_throw(log, &err);
                return Err(err.into());
            }
        };

        match &policy.integrity {
            IntegrityStatus::Verified => {
                log_item!("policy", "policy digest matches", "decode_policy")
                    .validation_status(POLICY_INTEGRITY_VALIDATED)
                    .success(log)
            }
            IntegrityStatus::Unverified(reason) => {
                log_item!("policy", reason.clone(), "decode_policy")
                    .validation_status(POLICY_INTEGRITY_UNVERIFIED)
                    .informational(log)
            }
        }
        Ok(policy)
    }

    // Each token is verified on its own; the records are then put in
    // byte-range order.
    fn verify_document_time_stamps(
        &self,
        signature: &dyn SignatureReader,
        policy: &SignaturePolicy,
        context: &VerificationContext<'_>,
        digests: &dyn DigestProvider,
        report: &mut VerificationReport,
        log: &mut StatusTracker,
    ) -> Result<()> {
        let rules = policy.rules(report.commitment.as_deref());
        let verifier = TimeStampVerifier::for_policy(
            &rules,
            &self.settings,
            self.settings.verify.lookup_deadline(),
        )
        .with_digest_provider(digests);

        let mut identity = MemoryStore::new();
        signature
            .certificates()
            .iter()
            .for_each(|c| identity.add_certificate(c.clone()));
        let available = MemoryStore::new();

        let mut records = Vec::new();
        for (index, doc) in context.document_time_stamps.iter().enumerate() {
            report
                .attribute_outcomes
                .extend(pades::check_doc_time_stamp_dictionary(&doc.dictionary, policy, log)?);

            let mut sources = EvidenceSources::new(&available, &identity);
            if let Some(cache) = context.cache {
                sources = sources.with_cache(cache);
            }

            log.push_scope(format!("document[{index}]"));
            let verified = verifier
                .verify(&doc.token, TimeStampKind::Document, &doc.covered, sources, log)
                .and_then(|time_stamp| {
                    let token = TimeStampToken::from_der(&doc.token)?;
                    let record =
                        TimeStampRecord::from_token(TimeStampKind::Document, None, index, &token)?
                            .with_byte_range(doc.byte_range);
                    Ok((time_stamp, record))
                });
            log.pop_scope();

            match verified {
                Ok((time_stamp, record)) => {
                    report.time_stamp_reports.push(time_stamp);
                    records.push(record);
                }
                Err(TimeStampError::DeadlineExceeded) => return Err(Error::DeadlineExceeded),
                Err(error) => report.time_stamp_failures.push(TimeStampFailure {
                    kind: TimeStampKind::Document,
                    index,
                    error,
                }),
            }
        }

        match order_by_byte_range(records) {
            Ok(ordered) => report.document_time_stamps = ordered,
            Err(error) => {
                let error = log_item!("document", error.to_string(), "order_by_byte_range")
                    .validation_status(error.validation_status())
                    .failure(log, error)?;
                report.time_stamp_failures.push(TimeStampFailure {
                    kind: TimeStampKind::Document,
                    index: 0,
                    error,
                });
            }
        }
        Ok(())
    }
}

fn critical_outcome(err: AttributeError) -> AttributeOutcome {
    let identifier = match &err {
        AttributeError::Critical { identifier, .. } => identifier.clone(),
        _ => String::new(),
    };
    AttributeOutcome {
        kind: crate::attributes::AttributeKind::from_oid(&identifier),
        identifier,
        occurrence: 0,
        error: Some(err),
        message: None,
        critical: true,
        mandated: false,
    }
}

fn verdict(report: &VerificationReport) -> Verdict {
    let outcomes = &report.attribute_outcomes;
    if outcomes.iter().any(AttributeOutcome::invalidates)
        || !report.time_stamp_failures.is_empty()
    {
        Verdict::Invalid
    } else if outcomes.iter().any(AttributeOutcome::is_error) {
        Verdict::ValidWithWarnings
    } else {
        Verdict::Valid
    }
}
