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


//! One validator per [`AttributeKind`].

use log::debug;
use rasn::types::{ObjectIdentifier, OctetString};

use super::{engine::Context, AttributeKind};
use crate::{
    crypto::{
        asn1::{oid_to_string, rfc5126, rfc5652::Attribute, time_to_utc},
        Certificate, Crl, DigestAlgorithm, OcspResponse,
    },
    policy::CertRefReq,
    revocation::{
        issuer_serial, CertSelector, CrossRefError, DeclaredCertificates, DeclaredReferences,
        EvidenceKind, RevocationMatcher,
    },
    time_stamp::{
        check_delay, TimeStampError, TimeStampKind, TimeStampRecord, TimeStampToken,
        TimeStampVerifier,
    },
    validation_codes::{
        ATTRIBUTE_INFORMATIONAL, ATTRIBUTE_INVALID, ATTRIBUTE_VALIDATED,
        POLICY_IDENTIFIER_MISMATCH, POLICY_SIGNING_PERIOD_INSIDE, POLICY_SIGNING_PERIOD_OUTSIDE,
        REVOCATION_CHECK_SKIPPED, REVOCATION_REFERENCES_MATCHED,
    },
    Error, StatusTracker,
};

/// One occurrence of an attribute in the signature.
pub(super) struct Occurrence<'o> {
    pub(super) identifier: &'o str,
    pub(super) kind: AttributeKind,

    /// Position in `SignatureReader::attributes`.
    pub(super) position: usize,
    pub(super) occurrence: usize,
    pub(super) values: Vec<Vec<u8>>,
}

impl Occurrence<'_> {
    fn single_value(&self) -> Result<&[u8], Failure> {
        match self.values.as_slice() {
            [value] => Ok(value),
            values => Err(Failure::invalid(format!(
                "expected one value, found {}",
                values.len()
            ))),
        }
    }
}

/// What a validator reports when the attribute is acceptable.
pub(super) struct Passed {
    pub(super) message: String,
    pub(super) status: &'static str,
    pub(super) informational: bool,
}

impl Passed {
    fn valid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: ATTRIBUTE_VALIDATED,
            informational: false,
        }
    }

    fn informational(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: ATTRIBUTE_INFORMATIONAL,
            informational: true,
        }
    }

    fn with_status(mut self, status: &'static str) -> Self {
        self.status = status;
        self
    }
}

pub(super) enum Failure {
    /// The attribute is rejected; validation goes on.
    Invalid {
        reason: String,
        status: &'static str,
    },

    /// Validation cannot go on at all.
    Abort(Error),
}

impl Failure {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::with_status(reason, ATTRIBUTE_INVALID)
    }

    fn with_status(reason: impl Into<String>, status: &'static str) -> Self {
        Self::Invalid {
            reason: reason.into(),
            status,
        }
    }
}

impl From<CrossRefError> for Failure {
    fn from(err: CrossRefError) -> Self {
        match err {
            CrossRefError::DeadlineExceeded => Self::Abort(Error::DeadlineExceeded),
            err => Self::with_status(err.to_string(), err.validation_status()),
        }
    }
}

impl From<TimeStampError> for Failure {
    fn from(err: TimeStampError) -> Self {
        match err {
            TimeStampError::DeadlineExceeded => Self::Abort(Error::DeadlineExceeded),
            err => Self::with_status(err.to_string(), err.validation_status()),
        }
    }
}

fn decode<T: rasn::Decode>(der: &[u8], what: &str) -> Result<T, Failure> {
    rasn::der::decode(der).map_err(|e| Failure::invalid(format!("invalid {what}: {e}")))
}

/// Values of a DER `Attribute`, in encoded order.
pub(super) fn attribute_values(der: &[u8]) -> Option<Vec<Vec<u8>>> {
    rasn::der::decode::<Attribute>(der).ok().map(|a| a.values())
}

/// Runs the validator registered for `at.kind`.
pub(super) fn validate(
    ctx: &mut Context<'_>,
    at: &Occurrence<'_>,
    validation_log: &mut StatusTracker,
) -> Result<Passed, Failure> {
    use AttributeKind::*;

    match at.kind {
        ContentType => content_type(at),
        MessageDigest => message_digest(at),
        SigningTime => signing_time(ctx, at),
        CounterSignature => structural::<rasn_cms::SignerInfo>(at, "counter signature"),
        SignaturePolicyId => signature_policy_id(ctx, at),
        SigningCertificate => signing_certificate(ctx, at),
        SigningCertificateV2 => signing_certificate_v2(ctx, at),
        CommitmentType => commitment_type(ctx, at),
        SignerLocation => structural::<rfc5126::SignerLocation>(at, "signer location"),
        SignerAttributes => structural::<rfc5126::SignerAttribute>(at, "signer attributes"),
        ContentHint => structural::<rfc5126::ContentHints>(at, "content hints"),
        CertificateRefs => certificate_refs(ctx, at),
        RevocationRefs => revocation_refs(ctx, at),
        AttrCertificateRefs => attr_certificate_refs(ctx, at),
        AttrRevocationRefs => attr_revocation_refs(ctx, at),
        CertValues => cert_values(ctx, at),
        RevocationValues => revocation_values(at),
        ContentTimeStamp | SignatureTimeStamp | EscTimeStamp | CertCrlTimeStamp
        | ArchiveTimeStamp | ArchiveTimeStampV2 => time_stamp(ctx, at, validation_log),
        ArchiveTimeStampV3 => archive_time_stamp_v3(ctx, at),
        RevocationInfoArchival => Ok(Passed::informational(
            "revocation information archived by the signer",
        )),
    }
}

fn structural<T: rasn::Decode>(at: &Occurrence<'_>, what: &str) -> Result<Passed, Failure> {
    decode::<T>(at.single_value()?, what)?;
    Ok(Passed::valid(format!("{what} is well formed")))
}

fn content_type(at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let oid: ObjectIdentifier = decode(at.single_value()?, "content type")?;
    Ok(Passed::valid(format!("content type {}", oid_to_string(&oid))))
}

fn message_digest(at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let digest: OctetString = decode(at.single_value()?, "message digest")?;
    if digest.is_empty() {
        return Err(Failure::invalid("empty message digest"));
    }
    Ok(Passed::valid(format!("{}-byte message digest", digest.len())))
}

fn signing_time(ctx: &Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let time: rasn_pkix::Time = decode(at.single_value()?, "signing time")?;
    let time = time_to_utc(&time);

    if !ctx.policy.info.validation_policy.signing_period.contains(time) {
        return Err(Failure::with_status(
            format!("signing time {time} is outside the policy signing period"),
            POLICY_SIGNING_PERIOD_OUTSIDE,
        ));
    }
    Ok(Passed::valid(format!("signed at {time}")).with_status(POLICY_SIGNING_PERIOD_INSIDE))
}

fn signature_policy_id(ctx: &Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let id: rfc5126::SignaturePolicyIdentifier =
        decode(at.single_value()?, "signature policy identifier")?;
    let rfc5126::SignaturePolicyIdentifier::SignaturePolicyId(id) = id else {
        return Err(Failure::invalid("the signature does not name its policy"));
    };

    let named = oid_to_string(&id.sig_policy_id);
    if named != ctx.policy.policy_id() {
        return Err(Failure::with_status(
            format!(
                "the signature names policy {named}, not {}",
                ctx.policy.policy_id()
            ),
            POLICY_IDENTIFIER_MISMATCH,
        ));
    }

    match &ctx.policy.declared_hash {
        Some(declared) if declared.as_slice() != &id.sig_policy_hash.hash_value[..] => {
            Err(Failure::with_status(
                "the policy hash in the signature does not match the policy",
                POLICY_IDENTIFIER_MISMATCH,
            ))
        }
        Some(_) => Ok(Passed::valid(format!("policy {named} and its hash match"))),
        None => Ok(Passed::valid(format!(
            "policy {named} matches; the policy declares no hash to compare"
        ))),
    }
}

// (hash algorithm, certificate hash, issuer and serial)
type EssCertRef = (DigestAlgorithm, Vec<u8>, Option<(Vec<u8>, Vec<u8>)>);

fn signing_certificate(ctx: &Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let attr: rfc5126::SigningCertificate = decode(at.single_value()?, "signing certificate")?;
    let refs = attr
        .certs
        .iter()
        .map(|id| {
            (
                DigestAlgorithm::Sha1,
                id.cert_hash.to_vec(),
                id.issuer_serial.as_ref().and_then(issuer_serial),
            )
        })
        .collect();
    check_signing_certificate(ctx, refs)
}

fn signing_certificate_v2(ctx: &Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let attr: rfc5126::SigningCertificateV2 =
        decode(at.single_value()?, "signing certificate v2")?;
    let refs = attr
        .certs
        .iter()
        .map(|id| {
            let alg = match &id.hash_algorithm {
                None => DigestAlgorithm::Sha256,
                Some(alg) => {
                    let oid = oid_to_string(&alg.algorithm);
                    DigestAlgorithm::from_oid(&oid).ok_or_else(|| {
                        Failure::invalid(format!("unsupported certificate hash algorithm {oid}"))
                    })?
                }
            };
            Ok((
                alg,
                id.cert_hash.to_vec(),
                id.issuer_serial.as_ref().and_then(issuer_serial),
            ))
        })
        .collect::<Result<_, Failure>>()?;
    check_signing_certificate(ctx, refs)
}

// The first identifier names the signer certificate.
fn check_signing_certificate(ctx: &Context<'_>, refs: Vec<EssCertRef>) -> Result<Passed, Failure> {
    let Some((alg, hash, issuer_serial)) = refs.first() else {
        return Err(Failure::invalid("no certificate identifiers"));
    };
    let signer = ctx
        .signature
        .signer_certificate()
        .ok_or_else(|| Failure::invalid("signer certificate not found"))?;

    if &ctx.digests.hash(signer.der(), *alg) != hash {
        return Err(Failure::invalid(format!(
            "the {alg} hash does not match the signer certificate"
        )));
    }
    if let Some((issuer, serial)) = issuer_serial {
        if issuer != signer.issuer() || serial != signer.serial() {
            return Err(Failure::invalid(
                "issuer and serial do not match the signer certificate",
            ));
        }
    }

    match ctx.rules.certificate_refs() {
        CertRefReq::SignerOnly if refs.len() != 1 => Err(Failure::invalid(format!(
            "the policy requires the signer certificate only, found {} identifiers",
            refs.len()
        ))),
        CertRefReq::FullPath if refs.len() == 1 => Err(Failure::invalid(
            "the policy requires identifiers for the full certification path",
        )),
        _ => Ok(Passed::valid(format!(
            "identifies signer certificate {}",
            signer.subject_name()
        ))),
    }
}

fn commitment_type(ctx: &Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let indication: rfc5126::CommitmentTypeIndication =
        decode(at.single_value()?, "commitment type indication")?;
    let id = oid_to_string(&indication.commitment_type_id);

    let rules = &ctx.policy.info.validation_policy.commitment_rules;
    if !rules.is_empty() && !rules.iter().any(|r| r.selects(&id) || r.selects_empty()) {
        return Err(Failure::invalid(format!(
            "commitment type {id} is not allowed by the policy"
        )));
    }
    Ok(Passed::valid(format!("commitment type {id}")))
}

fn certificate_refs(ctx: &Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let declared = DeclaredCertificates::from_der(at.single_value()?)?;
    let path = ctx.signer_path()?;
    declared.reconcile(&path, ctx.digests)?;

    Ok(Passed::valid(format!(
        "{} certificate references match the certification path",
        declared.refs.len()
    )))
}

fn revocation_refs(ctx: &mut Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let declared = DeclaredReferences::from_der(at.single_value()?)?;
    let Some(rev_req) = ctx.rules.signer_rev_req() else {
        return Ok(Passed::informational("the policy sets no revocation requirements")
            .with_status(REVOCATION_CHECK_SKIPPED));
    };

    let path = ctx.signer_path()?;
    let result = RevocationMatcher::new(ctx.digests, ctx.deadline).match_references(
        &path,
        rev_req,
        &declared,
        ctx.sources(),
        ctx.reference_time,
    )?;

    let message = format!(
        "{} CRL and {} OCSP references match the revocation evidence",
        result.crl_references.len(),
        result.ocsp_references.len()
    );
    ctx.revocation = Some(result);
    Ok(Passed::valid(message).with_status(REVOCATION_REFERENCES_MATCHED))
}

// Every reference must name a carried attribute certificate.
fn attr_certificate_refs(ctx: &Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let declared = DeclaredCertificates::from_der(at.single_value()?)?;
    let carried = ctx.identity.certificates();

    let matched = declared
        .refs
        .iter()
        .filter(|r| carried.iter().any(|c| r.identifies(c, ctx.digests)))
        .count();
    if matched != declared.refs.len() {
        return Err(CrossRefError::ExcessReference {
            kind: EvidenceKind::Certificate,
            declared: declared.refs.len(),
            consumed: matched,
        }
        .into());
    }
    Ok(Passed::valid(format!(
        "{matched} attribute certificate references"
    )))
}

// Every reference must name evidence that is available.
fn attr_revocation_refs(ctx: &Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let declared = DeclaredReferences::from_der(at.single_value()?)?;

    let mut crls = Vec::new();
    let mut responses = Vec::new();
    for store in ctx.sources().iter() {
        ctx.deadline.check().map_err(CrossRefError::from)?;
        crls.extend(
            store
                .crls(&CertSelector::default(), ctx.reference_time, &ctx.deadline)
                .map_err(CrossRefError::from)?,
        );
        responses.extend(
            store
                .ocsp_responses(&ctx.deadline)
                .map_err(CrossRefError::from)?,
        );
    }

    let crl_hits = declared
        .crls()
        .filter(|(_, r)| crls.iter().any(|crl| r.identifies(crl, ctx.digests)))
        .count();
    if crl_hits != declared.crl_count() {
        return Err(excess(EvidenceKind::Crl, declared.crl_count(), crl_hits));
    }

    let ocsp_hits = declared
        .ocsp()
        .filter(|(_, r)| responses.iter().any(|resp| r.identifies(resp, ctx.digests)))
        .count();
    if ocsp_hits != declared.ocsp_count() {
        return Err(excess(EvidenceKind::Ocsp, declared.ocsp_count(), ocsp_hits));
    }

    Ok(Passed::valid(format!(
        "{crl_hits} CRL and {ocsp_hits} OCSP attribute revocation references"
    )))
}

fn excess(kind: EvidenceKind, declared: usize, consumed: usize) -> Failure {
    CrossRefError::ExcessReference {
        kind,
        declared,
        consumed,
    }
    .into()
}

/// Reads a `CertificateValues` attribute value.
pub(super) fn read_certificate_values(value: &[u8]) -> Result<Vec<Certificate>, String> {
    let values: rfc5126::CertificateValues =
        rasn::der::decode(value).map_err(|e| format!("invalid certificate values: {e}"))?;
    values
        .iter()
        .map(|cert| Certificate::from_der(cert.as_bytes()).map_err(|e| e.to_string()))
        .collect()
}

/// Reads a `RevocationValues` attribute value.
pub(super) fn read_revocation_values(
    value: &[u8],
) -> Result<(Vec<Crl>, Vec<OcspResponse>), String> {
    let values: rfc5126::RevocationValues =
        rasn::der::decode(value).map_err(|e| format!("invalid revocation values: {e}"))?;

    let crls = values
        .crl_vals
        .iter()
        .flatten()
        .map(|crl| Crl::from_der(crl.as_bytes()).map_err(|e| e.to_string()))
        .collect::<Result<_, _>>()?;
    let responses = values
        .ocsp_vals
        .iter()
        .flatten()
        .map(|resp| OcspResponse::from_der(resp.as_bytes()).map_err(|e| e.to_string()))
        .collect::<Result<_, _>>()?;
    Ok((crls, responses))
}

fn cert_values(ctx: &Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let values = read_certificate_values(at.single_value()?).map_err(Failure::invalid)?;

    // certificateRefs, when present, must be backed by these values
    let refs = ctx
        .signature
        .encoded_attribute(AttributeKind::CertificateRefs.oid(), 0)
        .and_then(attribute_values)
        .and_then(|values| values.into_iter().next());
    if let Some(refs) = refs {
        let declared = DeclaredCertificates::from_der(&refs)?;
        let carried: Vec<&Certificate> = values
            .iter()
            .chain(ctx.signature.certificates())
            .collect();
        for (i, r) in declared.refs.iter().enumerate() {
            if !carried.iter().any(|c| r.identifies(c, ctx.digests)) {
                return Err(Failure::invalid(format!(
                    "certificate reference {i} has no certificate value"
                )));
            }
        }
    }
    Ok(Passed::valid(format!("{} certificate values", values.len())))
}

fn revocation_values(at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let (crls, responses) = read_revocation_values(at.single_value()?).map_err(Failure::invalid)?;
    Ok(Passed::valid(format!(
        "{} CRL and {} OCSP revocation values",
        crls.len(),
        responses.len()
    )))
}

fn time_stamp(
    ctx: &mut Context<'_>,
    at: &Occurrence<'_>,
    validation_log: &mut StatusTracker,
) -> Result<Passed, Failure> {
    let kind = at
        .kind
        .time_stamp_kind()
        .ok_or_else(|| Failure::invalid("not a time-stamp attribute"))?;
    let token = at.single_value()?;
    let target = ctx
        .signature
        .time_stamp_target(kind, at.position)
        .ok_or_else(|| {
            Failure::invalid(format!(
                "the data covered by the {kind} time stamp is not available"
            ))
        })?;

    validation_log.push_scope(format!("{}[{}]", at.kind, at.occurrence));
    let verified = TimeStampVerifier::new(&ctx.time_stamp_trust_points)
        .with_rev_req(ctx.rules.time_stamp_rev_req())
        .with_trust_check(ctx.settings.verify.verify_timestamp_trust)
        .with_clock_skew(ctx.clock_skew)
        .with_digest_provider(ctx.digests)
        .with_deadline(ctx.deadline)
        .verify(token, kind, &target, ctx.sources(), validation_log);
    validation_log.pop_scope();
    let report = verified?;

    let parsed = TimeStampToken::from_der(token)?;
    ctx.records.push(TimeStampRecord::from_token(
        kind,
        Some(at.identifier),
        at.occurrence,
        &parsed,
    )?);

    let gen_time = report.gen_time;
    debug!("{kind} time stamp generated at {gen_time}");
    ctx.time_stamps.push(report);

    if let Some(signing_time) = ctx.signing_time {
        match at.kind {
            AttributeKind::SignatureTimeStamp => {
                check_delay(gen_time, signing_time, ctx.rules.signature_timestamp_delay())?;
            }
            AttributeKind::ContentTimeStamp if gen_time > signing_time + ctx.clock_skew => {
                return Err(Failure::invalid(format!(
                    "content time stamp at {gen_time} is later than the signing time {signing_time}"
                )));
            }
            _ => (),
        }
    }

    Ok(Passed::valid(format!("{kind} time stamp generated at {gen_time}")))
}

// The hash-index form is not evaluated; the token is read and ordered.
fn archive_time_stamp_v3(ctx: &mut Context<'_>, at: &Occurrence<'_>) -> Result<Passed, Failure> {
    let token = TimeStampToken::from_der(at.single_value()?)?;
    ctx.records.push(TimeStampRecord::from_token(
        TimeStampKind::Archive,
        Some(at.identifier),
        at.occurrence,
        &token,
    )?);
    Ok(Passed::informational(format!(
        "archive time stamp v3 generated at {}; its hash index was not evaluated",
        token.gen_time()
    )))
}
