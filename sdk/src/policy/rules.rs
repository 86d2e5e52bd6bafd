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

//! Resolution of common and commitment rules into the rules that apply to
//! one signature.

use chrono::Duration;

use super::model::*;

/// Rules in force for a given commitment type.
///
/// Each field comes from the selected commitment rule when that rule sets
/// it, otherwise from the common rules.
#[derive(Clone, Copy, Debug)]
pub struct EffectiveRules<'p> {
    /// Commitment rule that was selected, if any.
    pub commitment_rule: Option<&'p CommitmentRule>,
    pub signer_and_verifier_rules: Option<&'p SignerAndVerifierRules>,
    pub signing_cert_trust_condition: Option<&'p SigningCertTrustCondition>,
    pub time_stamp_trust_condition: Option<&'p TimeStampTrustCondition>,
    pub attribute_trust_condition: Option<&'p AttributeTrustCondition>,
    pub algorithm_constraint_set: Option<&'p AlgorithmConstraintSet>,
}

impl SignaturePolicy {
    /// Resolves the rules for `commitment` (a dotted commitment type OID).
    ///
    /// A commitment rule selecting `commitment` wins; failing that, a rule
    /// selecting the empty commitment applies.
    pub fn rules(&self, commitment: Option<&str>) -> EffectiveRules<'_> {
        let validation = &self.info.validation_policy;
        let common = &validation.common_rules;

        let selected = commitment
            .and_then(|id| validation.commitment_rules.iter().find(|r| r.selects(id)))
            .or_else(|| {
                validation
                    .commitment_rules
                    .iter()
                    .find(|r| r.selects_empty())
            });
        let specific = selected.map(|r| &r.rules);

        EffectiveRules {
            commitment_rule: selected,
            signer_and_verifier_rules: pick(specific, common, |r| {
                r.signer_and_verifier_rules.as_ref()
            }),
            signing_cert_trust_condition: pick(specific, common, |r| {
                r.signing_cert_trust_condition.as_ref()
            }),
            time_stamp_trust_condition: pick(specific, common, |r| {
                r.time_stamp_trust_condition.as_ref()
            }),
            attribute_trust_condition: pick(specific, common, |r| {
                r.attribute_trust_condition.as_ref()
            }),
            algorithm_constraint_set: pick(specific, common, |r| {
                r.algorithm_constraint_set.as_ref()
            }),
        }
    }
}

fn pick<'p, T>(
    specific: Option<&'p CommonRules>,
    common: &'p CommonRules,
    field: impl Fn(&'p CommonRules) -> Option<&'p T>,
) -> Option<&'p T> {
    specific.and_then(&field).or_else(|| field(common))
}

impl<'p> EffectiveRules<'p> {
    pub fn signer_rules(&self) -> Option<&'p SignerRules> {
        self.signer_and_verifier_rules.map(|r| &r.signer_rules)
    }

    /// Signed attributes the signer must include.
    pub fn mandated_signed_attributes(&self) -> Vec<&'p str> {
        self.signer_rules()
            .map(|r| r.mandated_signed_attributes.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Unsigned attributes required by the signer and verifier rules, each
    /// listed once.
    pub fn mandated_unsigned_attributes(&self) -> Vec<&'p str> {
        let mut ids: Vec<&'p str> = Vec::new();
        if let Some(rules) = self.signer_and_verifier_rules {
            let all = rules
                .signer_rules
                .mandated_unsigned_attributes
                .iter()
                .chain(rules.verifier_rules.mandated_unsigned_attributes.iter());
            for id in all {
                if !ids.contains(&id.as_str()) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    pub fn certificate_refs(&self) -> CertRefReq {
        self.signer_rules()
            .map(|r| r.mandated_certificate_ref)
            .unwrap_or_default()
    }

    pub fn signer_trust_points(&self) -> &'p [CertificateTrustPoint] {
        self.signing_cert_trust_condition
            .map(|c| c.signer_trust_trees.as_slice())
            .unwrap_or_default()
    }

    pub fn signer_rev_req(&self) -> Option<&'p CertRevReq> {
        self.signing_cert_trust_condition.map(|c| &c.signer_rev_req)
    }

    /// Trust points for time-stamp authorities, falling back to the signer
    /// trust trees.
    pub fn time_stamp_trust_points(&self) -> &'p [CertificateTrustPoint] {
        match self.time_stamp_trust_condition {
            Some(c) if !c.trust_trees.is_empty() => &c.trust_trees,
            _ => self.signer_trust_points(),
        }
    }

    /// Revocation requirements for time-stamp authorities, falling back to
    /// the signer's.
    pub fn time_stamp_rev_req(&self) -> Option<&'p CertRevReq> {
        self.time_stamp_trust_condition
            .and_then(|c| c.rev_req.as_ref())
            .or_else(|| self.signer_rev_req())
    }

    pub fn signature_timestamp_delay(&self) -> Option<Duration> {
        self.time_stamp_trust_condition
            .and_then(|c| c.signature_timestamp_delay)
            .map(|d| d.to_duration())
    }

    pub fn caution_period(&self) -> Option<Duration> {
        self.time_stamp_trust_condition
            .and_then(|c| c.caution_period)
            .map(|d| d.to_duration())
    }
}
