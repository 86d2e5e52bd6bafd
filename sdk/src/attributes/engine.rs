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


use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use super::{
    validators::{
        attribute_values, read_certificate_values, read_revocation_values, validate, Failure,
        Occurrence,
    },
    AttributeError, AttributeKind, AttributeOutcome,
};
use crate::{
    crypto::{
        asn1::{oid_to_string, rfc5126, time_to_utc},
        Certificate, DefaultDigestProvider, DigestProvider,
    },
    deadline::Deadline,
    log_item,
    policy::{CertificateTrustPoint, EffectiveRules, SignaturePolicy},
    revocation::{
        CertificatePath, CrossRefError, EvidenceSources, MatchResult, MemoryStore,
        ValidationStore,
    },
    settings::Settings,
    signature::{AttributeRef, SignatureReader},
    time_stamp::{
        order_and_mark_last, ChainEntry, TimeStampKind, TimeStampRecord, TimeStampReport,
        TimeStampToken,
    },
    validation_codes::ATTRIBUTE_INVALID,
    Error, Result, StatusTracker,
};

/// Everything found while validating the attributes of one signature.
#[derive(Clone, Debug, Default)]
pub struct AttributeValidation {
    /// Commitment type the rules were resolved for.
    pub commitment: Option<String>,
    pub outcomes: Vec<AttributeOutcome>,
    pub time_stamps: Vec<TimeStampReport>,

    /// Archive time stamps, innermost first.
    pub archive_chain: Vec<ChainEntry>,

    /// Set when revocation references were reconciled.
    pub revocation: Option<MatchResult>,
}

/// Checks the attributes of a signature against a policy.
///
/// Attributes the policy mandates must be present, unique attributes must
/// occur once and every attribute must pass the validator registered for
/// its kind. A failing signed attribute ends the run with
/// [`AttributeError::Critical`]; every other failure is recorded as an
/// [`AttributeOutcome`] and validation goes on.
pub struct AttributeValidationEngine<'a> {
    settings: &'a Settings,
    digests: &'a dyn DigestProvider,
    deadline: Deadline,
    cache: Option<&'a dyn ValidationStore>,
}

impl<'a> AttributeValidationEngine<'a> {
    /// Creates an engine whose lookup deadline starts now.
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            digests: &DefaultDigestProvider,
            deadline: settings.verify.lookup_deadline(),
            cache: None,
        }
    }

    pub fn with_digest_provider(mut self, digests: &'a dyn DigestProvider) -> Self {
        self.digests = digests;
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Adds a caller-supplied validation-data cache, consulted after the
    /// evidence carried by the signature.
    pub fn with_cache(mut self, cache: &'a dyn ValidationStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Validates the attributes of `signature` and returns one outcome per
    /// attribute occurrence and per missing mandated attribute.
    pub fn verify(
        &self,
        signature: &dyn SignatureReader,
        policy: &SignaturePolicy,
    ) -> Result<Vec<AttributeOutcome>> {
        let mut log = StatusTracker::with_error_behavior(self.settings.verify.error_behavior());
        self.validate(signature, policy, &mut log)
            .map(|validation| validation.outcomes)
    }

    /// Like [`verify`](Self::verify), logging every check to
    /// `validation_log` and returning the time-stamp and revocation results
    /// as well.
    pub fn validate(
        &self,
        signature: &dyn SignatureReader,
        policy: &SignaturePolicy,
        validation_log: &mut StatusTracker,
    ) -> Result<AttributeValidation> {
        let attributes = signature.attributes();
        let commitment =
            commitment_of(signature).or_else(|| self.settings.core.default_commitment.clone());
        let rules = policy.rules(commitment.as_deref());
        let mut ctx = Context::new(self, signature, policy, rules)?;

        let mandated_signed = rules.mandated_signed_attributes();
        let mandated_unsigned = rules.mandated_unsigned_attributes();
        let is_mandated = |attr: &AttributeRef| {
            let mandated = if attr.signed {
                &mandated_signed
            } else {
                &mandated_unsigned
            };
            mandated.iter().any(|id| same_attribute(id, &attr.identifier))
        };

        let mut outcomes = Vec::new();

        for (mandated, signed) in [(&mandated_signed, true), (&mandated_unsigned, false)] {
            for id in mandated.iter() {
                let present = attributes
                    .iter()
                    .any(|a| a.signed == signed && same_attribute(id, &a.identifier));
                if present {
                    continue;
                }
                let err = record(
                    validation_log,
                    id,
                    AttributeError::Missing {
                        identifier: id.to_string(),
                    },
                )?;
                outcomes.push(AttributeOutcome {
                    identifier: id.to_string(),
                    kind: AttributeKind::from_identifier(id),
                    occurrence: 0,
                    error: Some(err),
                    message: None,
                    critical: signed,
                    mandated: true,
                });
            }
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (position, attr) in attributes.iter().enumerate() {
            let counter = seen.entry(attr.identifier.as_str()).or_default();
            let occurrence = *counter;
            *counter += 1;

            let mut outcome = AttributeOutcome {
                identifier: attr.identifier.clone(),
                kind: None,
                occurrence,
                error: None,
                message: None,
                critical: attr.signed,
                mandated: is_mandated(attr),
            };

            let Some(kind) = AttributeKind::from_oid(&attr.identifier) else {
                let err = AttributeError::Unknown {
                    identifier: attr.identifier.clone(),
                };
                outcome.error = Some(record(validation_log, &attr.identifier, err)?);
                outcomes.push(outcome);
                continue;
            };
            outcome.kind = Some(kind);

            // reported once, at the second occurrence
            if kind.is_unique() && occurrence == 1 {
                let count = attributes
                    .iter()
                    .filter(|a| a.identifier == attr.identifier)
                    .count();
                let err = AttributeError::Duplicated {
                    identifier: attr.identifier.clone(),
                    count,
                };
                outcomes.push(AttributeOutcome {
                    error: Some(record(validation_log, &attr.identifier, err)?),
                    ..outcome.clone()
                });
            }

            let result = match signature
                .encoded_attribute(&attr.identifier, occurrence)
                .and_then(attribute_values)
            {
                Some(values) => {
                    let at = Occurrence {
                        identifier: &attr.identifier,
                        kind,
                        position,
                        occurrence,
                        values,
                    };
                    validate(&mut ctx, &at, validation_log)
                }
                None => Err(Failure::Invalid {
                    reason: "the attribute could not be read".to_string(),
                    status: ATTRIBUTE_INVALID,
                }),
            };

            match result {
                Ok(passed) => {
                    let item = log_item!(attr.identifier.clone(), passed.message.clone(), "validate")
                        .validation_status(passed.status);
                    if passed.informational {
                        item.informational(validation_log);
                    } else {
                        item.success(validation_log);
                    }
                    outcome.message = Some(passed.message);
                }
                Err(Failure::Abort(err)) => return Err(err),
                Err(Failure::Invalid { reason, status }) if attr.signed => {
                    let err = AttributeError::Critical {
                        identifier: attr.identifier.clone(),
                        reason,
                    };
                    log_item!(attr.identifier.clone(), err.to_string(), "validate")
                        .validation_status(status)
                        .failure_no_throw(validation_log, &err);
                    return Err(err.into());
                }
                Err(Failure::Invalid { reason, status }) => {
                    let err = AttributeError::Invalid {
                        identifier: attr.identifier.clone(),
                        reason,
                    };
                    let err = log_item!(attr.identifier.clone(), err.to_string(), "validate")
                        .validation_status(status)
                        .failure(validation_log, err)?;
                    outcome.error = Some(err);
                }
            }
            outcomes.push(outcome);
        }

        let archive_chain = archive_chain(&ctx.records, &mut outcomes, validation_log)?;

        info!(
            "validated {} attributes, {} with errors",
            attributes.len(),
            outcomes.iter().filter(|o| o.is_error()).count()
        );

        Ok(AttributeValidation {
            commitment,
            outcomes,
            time_stamps: ctx.time_stamps,
            archive_chain,
            revocation: ctx.revocation,
        })
    }
}

// Logs a failure, returning the error unless the log stops on the first one.
fn record(
    validation_log: &mut StatusTracker,
    label: &str,
    err: AttributeError,
) -> Result<AttributeError> {
    let status = err.validation_status();
    Ok(log_item!(label.to_owned(), err.to_string(), "validate")
        .validation_status(status)
        .failure(validation_log, err)?)
}

// `mandated` is an OID or an XML property name; `present` is an OID.
fn same_attribute(mandated: &str, present: &str) -> bool {
    match AttributeKind::from_identifier(mandated) {
        Some(kind) => AttributeKind::from_oid(present) == Some(kind),
        None => mandated.trim() == present,
    }
}

fn commitment_of(signature: &dyn SignatureReader) -> Option<String> {
    let der = signature.encoded_attribute(AttributeKind::CommitmentType.oid(), 0)?;
    let value = attribute_values(der)?.into_iter().next()?;
    let indication: rfc5126::CommitmentTypeIndication = rasn::der::decode(&value).ok()?;
    Some(oid_to_string(&indication.commitment_type_id))
}

fn archive_chain(
    records: &[TimeStampRecord],
    outcomes: &mut Vec<AttributeOutcome>,
    validation_log: &mut StatusTracker,
) -> Result<Vec<ChainEntry>> {
    let archive: Vec<TimeStampRecord> = records
        .iter()
        .filter(|r| r.kind == TimeStampKind::Archive)
        .cloned()
        .collect();
    let Some(identifier) = archive.first().and_then(|r| r.attribute_id.clone()) else {
        return Ok(Vec::new());
    };

    match order_and_mark_last(archive) {
        Ok(chain) => Ok(chain),
        Err(err) => {
            let status = err.validation_status();
            let err = AttributeError::Invalid {
                identifier: identifier.clone(),
                reason: err.to_string(),
            };
            let err = log_item!(identifier.clone(), err.to_string(), "archive_chain")
                .validation_status(status)
                .failure(validation_log, err)?;
            outcomes.push(AttributeOutcome {
                kind: AttributeKind::from_oid(&identifier),
                identifier,
                occurrence: 0,
                error: Some(err),
                message: None,
                critical: false,
                mandated: false,
            });
            Ok(Vec::new())
        }
    }
}

/// Per-run state shared by the validators.
pub(super) struct Context<'c> {
    pub(super) signature: &'c dyn SignatureReader,
    pub(super) policy: &'c SignaturePolicy,
    pub(super) rules: EffectiveRules<'c>,
    pub(super) settings: &'c Settings,
    pub(super) digests: &'c dyn DigestProvider,
    pub(super) deadline: Deadline,
    pub(super) cache: Option<&'c dyn ValidationStore>,
    pub(super) clock_skew: Duration,

    /// Revocation values carried by the signature.
    pub(super) available: MemoryStore,

    /// Certificates carried by the signature.
    pub(super) identity: MemoryStore,

    pub(super) time_stamp_trust_points: Vec<CertificateTrustPoint>,
    pub(super) signing_time: Option<DateTime<Utc>>,

    /// Time revocation evidence must cover.
    pub(super) reference_time: DateTime<Utc>,

    pub(super) time_stamps: Vec<TimeStampReport>,
    pub(super) records: Vec<TimeStampRecord>,
    pub(super) revocation: Option<MatchResult>,
}

impl<'c> Context<'c> {
    fn new(
        engine: &AttributeValidationEngine<'c>,
        signature: &'c dyn SignatureReader,
        policy: &'c SignaturePolicy,
        rules: EffectiveRules<'c>,
    ) -> Result<Self> {
        let mut identity = MemoryStore::new();
        let mut available = MemoryStore::new();

        signature
            .certificates()
            .iter()
            .chain(signature.signer_certificate())
            .for_each(|c| identity.add_certificate(c.clone()));

        // malformed values are reported by their validators
        for value in first_values(signature, AttributeKind::CertValues) {
            for cert in read_certificate_values(&value).unwrap_or_default() {
                identity.add_certificate(cert);
            }
        }
        for value in first_values(signature, AttributeKind::RevocationValues) {
            if let Ok((crls, responses)) = read_revocation_values(&value) {
                crls.into_iter().for_each(|crl| available.add_crl(crl));
                for response in responses {
                    response
                        .certs()
                        .iter()
                        .for_each(|c| identity.add_certificate(c.clone()));
                    available.add_ocsp_response(response);
                }
            }
        }

        let mut time_stamp_trust_points = rules.time_stamp_trust_points().to_vec();
        for der in engine.settings.trust.user_anchor_ders()? {
            let cert = Certificate::from_der(&der)
                .map_err(|e| Error::Settings(format!("invalid trust anchor: {e}")))?;
            time_stamp_trust_points.push(CertificateTrustPoint::from_certificate(cert));
        }

        let signing_time = first_values(signature, AttributeKind::SigningTime)
            .next()
            .and_then(|value| rasn::der::decode::<rasn_pkix::Time>(&value).ok())
            .map(|time| time_to_utc(&time));

        // earliest signature time stamp, then the claimed signing time
        let reference_time = first_values(signature, AttributeKind::SignatureTimeStamp)
            .filter_map(|token| TimeStampToken::from_der(&token).ok())
            .map(|token| token.gen_time())
            .min()
            .or(signing_time)
            .unwrap_or_else(Utc::now);
        debug!("revocation reference time {reference_time}");

        Ok(Self {
            signature,
            policy,
            rules,
            settings: engine.settings,
            digests: engine.digests,
            deadline: engine.deadline,
            cache: engine.cache,
            clock_skew: Duration::seconds(engine.settings.core.clock_skew_secs),
            available,
            identity,
            time_stamp_trust_points,
            signing_time,
            reference_time,
            time_stamps: Vec::new(),
            records: Vec::new(),
            revocation: None,
        })
    }

    pub(super) fn sources(&self) -> EvidenceSources<'_> {
        let sources = EvidenceSources::new(&self.available, &self.identity);
        match self.cache {
            Some(cache) => sources.with_cache(cache),
            None => sources,
        }
    }

    /// Path from the signer certificate to a signer trust point of the
    /// policy.
    pub(super) fn signer_path(&self) -> std::result::Result<CertificatePath, CrossRefError> {
        let signer = self
            .signature
            .signer_certificate()
            .ok_or_else(|| CrossRefError::Malformed("signer certificate not found".to_string()))?;

        let mut stores: Vec<&dyn ValidationStore> = vec![&self.identity];
        if let Some(cache) = self.cache {
            stores.push(cache);
        }
        CertificatePath::build(
            signer,
            self.identity.certificates(),
            self.rules.signer_trust_points(),
            &stores,
            &self.deadline,
        )
    }
}

// First value of every occurrence of `kind`.
fn first_values(
    signature: &dyn SignatureReader,
    kind: AttributeKind,
) -> impl Iterator<Item = Vec<u8>> + '_ {
    (0..)
        .map_while(move |i| signature.encoded_attribute(kind.oid(), i))
        .filter_map(|der| attribute_values(der)?.into_iter().next())
}
