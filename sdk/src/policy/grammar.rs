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

//! Policy grammars, written once over the [`tree`](super::tree) and shared by
//! both encodings.

use super::{
    extensions,
    model::*,
    tree::{slots, Field, Fields, Label, Node, TAG_BOOLEAN, TAG_GENERALIZED_TIME, TAG_INTEGER,
        TAG_NULL, TAG_OCTET_STRING, TAG_SEQUENCE},
    PolicyEncoding, PolicyError,
};
use crate::crypto::{
    hash::{strip_urn_oid, DigestAlgorithm},
    Certificate,
};

const EXTENSIONS: &[&str] = &["SignPolExtensions", "SignPolicyExtensions"];

slots! {
    /// Optional parts of `CommonRules` and of a `CommitmentRule`.
    enum RuleSlot {
        SignerAndVerifierRules = 0 => ["SignerAndVerifierRules"],
        SigningCertTrustCondition = 1 => ["SigningCertTrustCondition"],
        TimeStampTrustCondition = 2 => ["TimeStampTrustCondition", "TimestampTrustCondition"],
        AttributeTrustCondition = 3 => ["AttributeTrustCondition", "RoleTrustCondition"],
        AlgorithmConstraintSet = 4 => ["AlgorithmConstraintSet"],
        Extensions = 5 => ["SignPolExtensions", "SignPolicyExtensions"],
    }
}

slots! {
    enum SignerRulesSlot {
        CertificateRef = 0 => ["MandatedCertificateRef"],
        CertificateInfo = 1 => ["MandatedCertificateInfo"],
        Extensions = 2 => ["SignPolExtensions", "SignPolicyExtensions"],
    }
}

slots! {
    enum CommitmentTypeSlot {
        FieldOfApplication = 0 => ["FieldOfApplication"],
        Semantics = 1 => ["Semantics"],
    }
}

slots! {
    enum TrustPointSlot {
        PathLenConstraint = 0 => ["PathLenConstraint"],
        AcceptablePolicySet = 1 => ["AcceptablePolicySet"],
        NameConstraints = 2 => ["NameConstraints"],
        PolicyConstraints = 3 => ["PolicyConstraints"],
    }
}

slots! {
    enum TimeStampTrustSlot {
        TrustTrees = 0 => ["TtsCertificateTrustTrees"],
        RevReq = 1 => ["TtsRevReq"],
        NameConstraints = 2 => ["TtsNameConstraints"],
        CautionPeriod = 3 => ["CautionPeriod"],
        SignatureTimestampDelay = 4 => ["SignatureTimestampDelay", "SignatureTimeStampDelay"],
    }
}

slots! {
    enum AttributeTrustSlot {
        TrustTrees = 0 => ["AttrCertificateTrustTrees"],
        RevReq = 1 => ["AttrRevReq"],
        Constraints = 2 => ["AttributeConstraints"],
    }
}

slots! {
    enum AttributeConstraintsSlot {
        Types = 0 => ["AttributeTypeConstraints"],
        Values = 1 => ["AttributeValueConstraints"],
    }
}

slots! {
    enum AlgorithmConstraintSlot {
        Signer = 0 => ["SignerAlgConstraints", "SignerAlgorithmConstraints"],
        EeCert = 1 => ["EeCertAlgConstraints", "EeCertAlgorithmConstraints"],
        CaCert = 2 => ["CACertAlgConstraints", "CaCertAlgorithmConstraints"],
        AaCert = 3 => ["AaCertAlgConstraints", "AaCertAlgorithmConstraints"],
        TsaCert = 4 => ["TSACertAlgConstraints", "TsaCertAlgorithmConstraints"],
    }
}

const CERT_REF_REQ: &[(u8, &str)] = &[(1, "signerOnly"), (2, "fullPath")];
const CERT_INFO_REQ: &[(u8, &str)] = &[(0, "none"), (1, "signerOnly"), (2, "fullPath")];
const HOW_CERT_ATTRIBUTE: &[(u8, &str)] = &[
    (0, "claimedAttribute"),
    (1, "certifiedAttributes"),
    (1, "certifiedAttribtes"),
    (2, "either"),
];

/// Result of walking the root node.
pub(crate) struct Decoded {
    pub(crate) hash_algorithm: DigestAlgorithm,
    pub(crate) info: SignPolicyInfo,
    pub(crate) declared_hash: Option<Vec<u8>>,

    /// `DER(signPolicyHashAlg) || DER(signPolicyInfo)`; DER only.
    pub(crate) signed_bytes: Option<Vec<u8>>,
}

pub(crate) fn signature_policy(root: &Node) -> Result<Decoded, PolicyError> {
    const ROOT: &str = "SignaturePolicy";

    if let Some(name) = root.element_name() {
        if name != ROOT {
            return Err(PolicyError::decoding(
                name,
                format!("expected <{ROOT}> as the root element"),
            ));
        }
    }

    let mut fields = Field::new(root, ROOT).fields()?;
    let hash_alg = fields.required("SignPolicyDigestAlg")?;
    let hash_algorithm = digest_algorithm(&hash_alg)?;
    fields.optional(&["Transforms"], None);

    let info_field = fields.required("SignPolicyInfo")?;
    let info = sign_policy_info(&info_field)?;

    let declared_hash = fields
        .optional(&["SignPolicyDigest"], Some(TAG_OCTET_STRING))
        .map(|f| f.octets())
        .transpose()?;
    fields.finish()?;

    let signed_bytes = match (&hash_alg.node.raw, &info_field.node.raw) {
        (Some(alg), Some(info)) => Some([alg.as_slice(), info.as_slice()].concat()),
        _ => None,
    };

    Ok(Decoded {
        hash_algorithm,
        info,
        declared_hash,
        signed_bytes,
    })
}

fn digest_algorithm(field: &Field<'_>) -> Result<DigestAlgorithm, PolicyError> {
    let id = match field.node.encoding() {
        PolicyEncoding::Der => {
            let mut fields = field.fields()?;
            let oid = fields.required("Algorithm")?.oid()?;
            // parameters are ignored
            fields.optional(&[], Some(TAG_NULL));
            fields.finish()?;
            oid
        }
        PolicyEncoding::Xml => field
            .attribute("Algorithm")
            .ok_or_else(|| field.error("missing Algorithm attribute"))?
            .to_owned(),
    };
    DigestAlgorithm::from_identifier(&id).ok_or(PolicyError::UnsupportedAlgorithm(id))
}

fn sign_policy_info(field: &Field<'_>) -> Result<SignPolicyInfo, PolicyError> {
    let mut fields = field.fields()?;
    let policy_id = fields.required("SignPolicyIdentifier")?.oid()?;
    let date_of_issue = fields.required("DateOfIssue")?.time()?;
    let issuer = fields.required("PolicyIssuerName")?.general_names()?;
    let field_of_application = fields.required("FieldOfApplication")?.text()?;
    let validation_policy =
        signature_validation_policy(&fields.required("SignatureValidationPolicy")?)?;
    let extensions = optional_extensions(&mut fields)?;
    fields.finish()?;

    Ok(SignPolicyInfo {
        policy_id,
        date_of_issue,
        issuer,
        field_of_application,
        validation_policy,
        extensions,
    })
}

fn signature_validation_policy(field: &Field<'_>) -> Result<SignatureValidationPolicy, PolicyError> {
    let mut fields = field.fields()?;
    let signing_period = signing_period(&fields.required("SigningPeriod")?)?;
    let common_rules = common_rules(&fields.required("CommonRules")?)?;
    let commitment_rules = fields
        .required("CommitmentRules")?
        .items("CommitmentRule")?
        .iter()
        .map(commitment_rule)
        .collect::<Result<_, _>>()?;
    let extensions = optional_extensions(&mut fields)?;
    fields.finish()?;

    Ok(SignatureValidationPolicy {
        signing_period,
        common_rules,
        commitment_rules,
        extensions,
    })
}

fn signing_period(field: &Field<'_>) -> Result<SigningPeriod, PolicyError> {
    let mut fields = field.fields()?;
    let not_before = fields.required("NotBefore")?.time()?;
    let not_after = fields
        .optional(&["NotAfter"], Some(TAG_GENERALIZED_TIME))
        .map(|f| f.time())
        .transpose()?;
    fields.finish()?;

    if not_after.is_some_and(|end| end < not_before) {
        return Err(field.error("NotAfter precedes NotBefore"));
    }
    Ok(SigningPeriod {
        not_before,
        not_after,
    })
}

fn common_rules(field: &Field<'_>) -> Result<CommonRules, PolicyError> {
    let mut fields = field.fields()?;
    let rules = rules(&mut fields)?;
    fields.finish()?;
    Ok(rules)
}

fn commitment_rule(field: &Field<'_>) -> Result<CommitmentRule, PolicyError> {
    let mut fields = field.fields()?;
    let commitment_types = fields
        .required("SelCommitmentTypes")?
        .items("SelCommitmentType")?
        .iter()
        .map(selected_commitment_type)
        .collect::<Result<Vec<_>, _>>()?;
    if commitment_types.is_empty() {
        return Err(field.error("no commitment type selected"));
    }
    let rules = rules(&mut fields)?;
    fields.finish()?;

    Ok(CommitmentRule {
        commitment_types,
        rules,
    })
}

/// Reads the `[0]..[5]` rule slots shared by common and commitment rules.
fn rules(fields: &mut Fields<'_>) -> Result<CommonRules, PolicyError> {
    let mut rules = CommonRules::default();
    while let Some((slot, field)) = fields.next_slot::<RuleSlot>()? {
        match slot {
            RuleSlot::SignerAndVerifierRules => {
                rules.signer_and_verifier_rules = Some(signer_and_verifier_rules(&field)?)
            }
            RuleSlot::SigningCertTrustCondition => {
                rules.signing_cert_trust_condition = Some(signing_cert_trust_condition(&field)?)
            }
            RuleSlot::TimeStampTrustCondition => {
                rules.time_stamp_trust_condition = Some(time_stamp_trust_condition(&field)?)
            }
            RuleSlot::AttributeTrustCondition => {
                rules.attribute_trust_condition = Some(attribute_trust_condition(&field)?)
            }
            RuleSlot::AlgorithmConstraintSet => {
                rules.algorithm_constraint_set = Some(algorithm_constraint_set(&field)?)
            }
            RuleSlot::Extensions => rules.extensions = extension_list(&field)?,
        }
    }
    Ok(rules)
}

fn selected_commitment_type(field: &Field<'_>) -> Result<SelectedCommitmentType, PolicyError> {
    let choice = match field.node.encoding() {
        PolicyEncoding::Der => field.clone(),
        PolicyEncoding::Xml => match field.node.children() {
            [inner] => Field::new(inner, field.path.clone()),
            _ => return Err(field.error("expected <Empty> or <RecognizedCommitmentType>")),
        },
    };

    match &choice.node.label {
        Label::Universal(TAG_NULL) => {
            choice.null()?;
            Ok(SelectedCommitmentType::Empty)
        }
        Label::Element(name) if name == "Empty" => Ok(SelectedCommitmentType::Empty),
        Label::Universal(TAG_SEQUENCE) => Ok(SelectedCommitmentType::Recognized(
            commitment_type(&choice)?,
        )),
        Label::Element(name) if name == "RecognizedCommitmentType" => Ok(
            SelectedCommitmentType::Recognized(commitment_type(&choice)?),
        ),
        _ => Err(choice.error("expected an empty or a recognized commitment type")),
    }
}

fn commitment_type(field: &Field<'_>) -> Result<CommitmentType, PolicyError> {
    let mut fields = field.fields()?;
    let identifier = fields.required("CommitmentIdentifier")?.oid()?;
    let mut commitment = CommitmentType {
        identifier,
        field_of_application: None,
        semantics: None,
    };
    while let Some((slot, field)) = fields.next_slot::<CommitmentTypeSlot>()? {
        match slot {
            CommitmentTypeSlot::FieldOfApplication => {
                commitment.field_of_application = Some(field.text()?)
            }
            CommitmentTypeSlot::Semantics => commitment.semantics = Some(field.text()?),
        }
    }
    fields.finish()?;
    Ok(commitment)
}

fn signer_and_verifier_rules(field: &Field<'_>) -> Result<SignerAndVerifierRules, PolicyError> {
    let mut fields = field.fields()?;
    let signer_rules = signer_rules(&fields.required("SignerRules")?)?;
    let verifier_rules = verifier_rules(&fields.required("VerifierRules")?)?;
    fields.finish()?;

    Ok(SignerAndVerifierRules {
        signer_rules,
        verifier_rules,
    })
}

fn signer_rules(field: &Field<'_>) -> Result<SignerRules, PolicyError> {
    let mut fields = field.fields()?;
    let external_signed_data = match fields.optional(&["ExternalSignedObjects", "ExternalSignedData"], Some(TAG_BOOLEAN)) {
        Some(f) if f.boolean()? => ExternalSignedData::External,
        Some(_) => ExternalSignedData::Internal,
        None => ExternalSignedData::Either,
    };
    let mandated_signed_attributes =
        attribute_ids(&fields.required_any(&["MandatedSignedQProperties", "MandatedSignedAttr"])?)?;
    let mandated_unsigned_attributes = attribute_ids(
        &fields.required_any(&["MandatedUnsignedQProperties", "MandatedUnsignedAttr"])?,
    )?;

    let mut rules = SignerRules {
        external_signed_data,
        mandated_signed_attributes,
        mandated_unsigned_attributes,
        mandated_certificate_ref: CertRefReq::default(),
        mandated_certificate_info: CertInfoReq::default(),
        extensions: Vec::new(),
    };
    while let Some((slot, field)) = fields.next_slot::<SignerRulesSlot>()? {
        match slot {
            SignerRulesSlot::CertificateRef => {
                rules.mandated_certificate_ref = match field.enumerated(CERT_REF_REQ)? {
                    2 => CertRefReq::FullPath,
                    _ => CertRefReq::SignerOnly,
                }
            }
            SignerRulesSlot::CertificateInfo => {
                rules.mandated_certificate_info = match field.enumerated(CERT_INFO_REQ)? {
                    1 => CertInfoReq::SignerOnly,
                    2 => CertInfoReq::FullPath,
                    _ => CertInfoReq::None,
                }
            }
            SignerRulesSlot::Extensions => rules.extensions = extension_list(&field)?,
        }
    }
    fields.finish()?;
    Ok(rules)
}

fn verifier_rules(field: &Field<'_>) -> Result<VerifierRules, PolicyError> {
    let mut fields = field.fields()?;
    let mandated_unsigned_attributes = attribute_ids(&fields.required_any(&[
        "MandatedQUnsignedProperties",
        "MandatedUnsignedQProperties",
        "MandatedUnsignedAttr",
    ])?)?;
    let extensions = optional_extensions(&mut fields)?;
    fields.finish()?;

    Ok(VerifierRules {
        mandated_unsigned_attributes,
        extensions,
    })
}

/// OIDs in DER, qualifying property names (or `urn:oid:` URNs) in XML.
fn attribute_ids(field: &Field<'_>) -> Result<Vec<String>, PolicyError> {
    field
        .items("*")?
        .iter()
        .map(|item| match item.node.encoding() {
            PolicyEncoding::Der => item.oid(),
            PolicyEncoding::Xml => {
                let text = item.text()?;
                match strip_urn_oid(&text) {
                    Some(oid) => Ok(oid.to_owned()),
                    None if text.is_empty() => Err(item.error("empty property identifier")),
                    None => Ok(text),
                }
            }
        })
        .collect()
}

fn signing_cert_trust_condition(
    field: &Field<'_>,
) -> Result<SigningCertTrustCondition, PolicyError> {
    let mut fields = field.fields()?;
    let signer_trust_trees = trust_points(&fields.required("SignerTrustTrees")?)?;
    let signer_rev_req = cert_rev_req(&fields.required("SignerRevReq")?)?;
    fields.finish()?;

    Ok(SigningCertTrustCondition {
        signer_trust_trees,
        signer_rev_req,
    })
}

fn trust_points(field: &Field<'_>) -> Result<Vec<CertificateTrustPoint>, PolicyError> {
    field
        .items("CertificateTrustPoint")?
        .iter()
        .map(trust_point)
        .collect()
}

fn trust_point(field: &Field<'_>) -> Result<CertificateTrustPoint, PolicyError> {
    let mut fields = field.fields()?;
    let cert_field = fields.required("TrustPoint")?;
    let certificate = Certificate::from_der(&cert_field.encoded()?)
        .map_err(|e| cert_field.error(e.to_string()))?;

    let mut point = CertificateTrustPoint {
        sha1_hash: certificate.sha1_thumbprint(),
        certificate,
        path_len_constraint: None,
        acceptable_policy_set: Vec::new(),
        name_constraints: None,
        policy_constraints: None,
    };
    while let Some((slot, field)) = fields.next_slot::<TrustPointSlot>()? {
        match slot {
            TrustPointSlot::PathLenConstraint => {
                point.path_len_constraint = Some(
                    u32::try_from(field.integer()?)
                        .map_err(|_| field.error("path length must not be negative"))?,
                )
            }
            TrustPointSlot::AcceptablePolicySet => {
                point.acceptable_policy_set = field
                    .items("*")?
                    .iter()
                    .map(Field::oid)
                    .collect::<Result<_, _>>()?
            }
            TrustPointSlot::NameConstraints => point.name_constraints = Some(field.opaque()?),
            TrustPointSlot::PolicyConstraints => point.policy_constraints = Some(field.opaque()?),
        }
    }
    fields.finish()?;
    Ok(point)
}

fn cert_rev_req(field: &Field<'_>) -> Result<CertRevReq, PolicyError> {
    let mut fields = field.fields()?;
    let end_cert_rev_req = rev_req(&fields.required_any(&["EndCertRevReq", "EndRevReq"])?)?;
    let ca_certs = rev_req(&fields.required_tagged("CACerts", 0)?)?;
    fields.finish()?;

    Ok(CertRevReq {
        end_cert_rev_req,
        ca_certs,
    })
}

fn rev_req(field: &Field<'_>) -> Result<RevReq, PolicyError> {
    let mut fields = field.fields()?;
    let mode_field = fields.required("EnuRevReq")?;
    let mode = RevocationMode::from_value(mode_field.enumerated(RevocationMode::NAMES)?)
        .ok_or_else(|| mode_field.error("unknown revocation mode"))?;
    let extensions = match fields.optional(&["exRevReq", "ExRevReq"], Some(TAG_SEQUENCE)) {
        Some(f) => extension_list(&f)?,
        None => Vec::new(),
    };
    fields.finish()?;
    Ok(RevReq { mode, extensions })
}

fn time_stamp_trust_condition(field: &Field<'_>) -> Result<TimeStampTrustCondition, PolicyError> {
    let mut fields = field.fields()?;
    let mut condition = TimeStampTrustCondition {
        trust_trees: Vec::new(),
        rev_req: None,
        name_constraints: None,
        caution_period: None,
        signature_timestamp_delay: None,
    };
    while let Some((slot, field)) = fields.next_slot::<TimeStampTrustSlot>()? {
        match slot {
            TimeStampTrustSlot::TrustTrees => condition.trust_trees = trust_points(&field)?,
            TimeStampTrustSlot::RevReq => condition.rev_req = Some(cert_rev_req(&field)?),
            TimeStampTrustSlot::NameConstraints => {
                condition.name_constraints = Some(field.opaque()?)
            }
            TimeStampTrustSlot::CautionPeriod => condition.caution_period = Some(delta_time(&field)?),
            TimeStampTrustSlot::SignatureTimestampDelay => {
                condition.signature_timestamp_delay = Some(delta_time(&field)?)
            }
        }
    }
    fields.finish()?;
    Ok(condition)
}

fn delta_time(field: &Field<'_>) -> Result<DeltaTime, PolicyError> {
    let mut fields = field.fields()?;
    let delta = DeltaTime {
        seconds: fields.required("DeltaSeconds")?.integer()?,
        minutes: fields.required("DeltaMinutes")?.integer()?,
        hours: fields.required("DeltaHours")?.integer()?,
        days: fields.required("DeltaDays")?.integer()?,
    };
    fields.finish()?;

    let parts = [delta.seconds, delta.minutes, delta.hours, delta.days];
    if parts.iter().any(|v| *v < 0) {
        return Err(field.error("negative time span"));
    }
    if delta
        .total_seconds()
        .and_then(chrono::Duration::try_seconds)
        .is_none()
    {
        return Err(field.error("time span out of range"));
    }
    Ok(delta)
}

fn attribute_trust_condition(field: &Field<'_>) -> Result<AttributeTrustCondition, PolicyError> {
    let mut fields = field.fields()?;
    let attribute_mandated = fields.required("AttributeMandated")?.boolean()?;
    let how_cert_attribute = match fields.required("HowCertAttribute")?.enumerated(HOW_CERT_ATTRIBUTE)? {
        0 => HowCertAttribute::ClaimedAttribute,
        1 => HowCertAttribute::CertifiedAttributes,
        _ => HowCertAttribute::Either,
    };

    let mut condition = AttributeTrustCondition {
        attribute_mandated,
        how_cert_attribute,
        trust_trees: Vec::new(),
        rev_req: None,
        attribute_constraints: None,
    };
    while let Some((slot, field)) = fields.next_slot::<AttributeTrustSlot>()? {
        match slot {
            AttributeTrustSlot::TrustTrees => condition.trust_trees = trust_points(&field)?,
            AttributeTrustSlot::RevReq => condition.rev_req = Some(cert_rev_req(&field)?),
            AttributeTrustSlot::Constraints => {
                condition.attribute_constraints = Some(attribute_constraints(&field)?)
            }
        }
    }
    fields.finish()?;
    Ok(condition)
}

fn attribute_constraints(field: &Field<'_>) -> Result<AttributeConstraints, PolicyError> {
    let mut fields = field.fields()?;
    let mut constraints = AttributeConstraints::default();
    while let Some((slot, field)) = fields.next_slot::<AttributeConstraintsSlot>()? {
        let items = field.items("*")?;
        match slot {
            AttributeConstraintsSlot::Types => {
                constraints.attribute_types =
                    items.iter().map(Field::oid).collect::<Result<_, _>>()?
            }
            AttributeConstraintsSlot::Values => {
                constraints.attribute_values =
                    items.iter().map(Field::opaque).collect::<Result<_, _>>()?
            }
        }
    }
    fields.finish()?;
    Ok(constraints)
}

fn algorithm_constraint_set(field: &Field<'_>) -> Result<AlgorithmConstraintSet, PolicyError> {
    let mut fields = field.fields()?;
    let mut set = AlgorithmConstraintSet::default();
    while let Some((slot, field)) = fields.next_slot::<AlgorithmConstraintSlot>()? {
        let constraints = field
            .items("AlgAndLength")?
            .iter()
            .map(alg_and_length)
            .collect::<Result<Vec<_>, _>>()?;
        match slot {
            AlgorithmConstraintSlot::Signer => set.signer = constraints,
            AlgorithmConstraintSlot::EeCert => set.ee_cert = constraints,
            AlgorithmConstraintSlot::CaCert => set.ca_cert = constraints,
            AlgorithmConstraintSlot::AaCert => set.aa_cert = constraints,
            AlgorithmConstraintSlot::TsaCert => set.tsa_cert = constraints,
        }
    }
    fields.finish()?;
    Ok(set)
}

fn alg_and_length(field: &Field<'_>) -> Result<AlgAndLength, PolicyError> {
    let mut fields = field.fields()?;
    let algorithm = fields.required("AlgId")?.oid()?;
    let min_key_length = fields
        .optional(&["MinKeyLength"], Some(TAG_INTEGER))
        .map(|f| {
            u32::try_from(f.integer()?).map_err(|_| f.error("key length out of range"))
        })
        .transpose()?;
    let other = match fields.optional(&["Other"], Some(TAG_SEQUENCE)) {
        Some(f) => extension_list(&f)?,
        None => Vec::new(),
    };
    fields.finish()?;

    Ok(AlgAndLength {
        algorithm,
        min_key_length,
        other,
    })
}

fn optional_extensions(fields: &mut Fields<'_>) -> Result<Vec<PolicyExtension>, PolicyError> {
    match fields.optional(EXTENSIONS, Some(TAG_SEQUENCE)) {
        Some(field) => extension_list(&field),
        None => Ok(Vec::new()),
    }
}

fn extension_list(field: &Field<'_>) -> Result<Vec<PolicyExtension>, PolicyError> {
    field
        .items("SignPolExtn")?
        .iter()
        .map(|item| {
            let mut fields = item.fields()?;
            let id = fields.required("ExtnID")?.oid()?;
            let value = fields.required("ExtnValue")?.octets()?;
            fields.finish()?;

            let decoded = extensions::decode(&id, &value, &item.path)?;
            Ok(PolicyExtension { id, value, decoded })
        })
        .collect()
}
