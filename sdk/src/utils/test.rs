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


#![allow(clippy::unwrap_used)]

//! Builders for the certificates, CRLs, OCSP responses, time-stamp tokens
//! and CMS signatures used by unit tests.
//!
//! Certificates are assembled with `rasn-pkix`; the other structures are
//! written TLV by TLV so tests control every byte.

use chrono::{DateTime, Duration, TimeZone, Utc};
use p256::{
    ecdsa::{signature::Signer, Signature, SigningKey},
    pkcs8::EncodePublicKey,
};
use rasn::types::{Any, BitString, Integer, OctetString, PrintableString, SetOf};
use rasn_pkix::{
    AlgorithmIdentifier, AttributeTypeAndValue, BasicConstraints, Certificate, Extension,
    Extensions, Name, RelativeDistinguishedName, SubjectPublicKeyInfo, TbsCertificate, Time,
    Validity, Version,
};

use crate::crypto::{asn1::parse_oid, hash::sha1, DigestAlgorithm};

pub(crate) const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
pub(crate) const SHA1: &str = "1.3.14.3.2.26";
pub(crate) const SHA256: &str = "2.16.840.1.101.3.4.2.1";

pub(crate) const ID_DATA: &str = "1.2.840.113549.1.7.1";
pub(crate) const ID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
pub(crate) const ID_CT_TSTINFO: &str = "1.2.840.113549.1.9.16.1.4";
pub(crate) const ID_CONTENT_TYPE: &str = "1.2.840.113549.1.9.3";
pub(crate) const ID_MESSAGE_DIGEST: &str = "1.2.840.113549.1.9.4";

const ID_CE_SUBJECT_KEY_ID: &str = "2.5.29.14";
const ID_CE_BASIC_CONSTRAINTS: &str = "2.5.29.19";
const ID_CE_EXT_KEY_USAGE: &str = "2.5.29.37";
const ID_KP_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";
const ID_KP_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";
const ID_AT_COMMON_NAME: &str = "2.5.4.3";
const ID_PKIX_OCSP_BASIC: &str = "1.3.6.1.5.5.7.48.1.1";

// -- DER building blocks --

pub(crate) fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
    out.extend_from_slice(content);
    out
}

pub(crate) fn seq(items: &[Vec<u8>]) -> Vec<u8> {
    tlv(0x30, &items.concat())
}

/// DER `SET OF`: elements sorted by their encodings.
pub(crate) fn set(items: &[Vec<u8>]) -> Vec<u8> {
    let mut sorted = items.to_vec();
    sorted.sort();
    tlv(0x31, &sorted.concat())
}

pub(crate) fn oid(dotted: &str) -> Vec<u8> {
    rasn::der::encode(&parse_oid(dotted).unwrap()).unwrap()
}

pub(crate) fn int(value: i64) -> Vec<u8> {
    rasn::der::encode(&Integer::from(value)).unwrap()
}

pub(crate) fn octets(data: &[u8]) -> Vec<u8> {
    tlv(0x04, data)
}

pub(crate) fn utf8(text: &str) -> Vec<u8> {
    tlv(0x0c, text.as_bytes())
}

pub(crate) fn boolean(value: bool) -> Vec<u8> {
    tlv(0x01, &[if value { 0xff } else { 0x00 }])
}

pub(crate) fn null() -> Vec<u8> {
    vec![0x05, 0x00]
}

pub(crate) fn enumerated(value: u8) -> Vec<u8> {
    tlv(0x0a, &[value])
}

pub(crate) fn gen_time(time: DateTime<Utc>) -> Vec<u8> {
    tlv(0x18, time.format("%Y%m%d%H%M%SZ").to_string().as_bytes())
}

pub(crate) fn utc_time(time: DateTime<Utc>) -> Vec<u8> {
    tlv(0x17, time.format("%y%m%d%H%M%SZ").to_string().as_bytes())
}

/// Constructed context-specific tag `[n]`.
pub(crate) fn ctx(n: u8, content: &[u8]) -> Vec<u8> {
    tlv(0xa0 | n, content)
}

/// Primitive context-specific tag `[n]`.
pub(crate) fn ctx_prim(n: u8, content: &[u8]) -> Vec<u8> {
    tlv(0x80 | n, content)
}

pub(crate) fn bit_string(data: &[u8]) -> Vec<u8> {
    let mut content = vec![0x00];
    content.extend_from_slice(data);
    tlv(0x03, &content)
}

pub(crate) fn alg_id(dotted: &str) -> Vec<u8> {
    seq(&[oid(dotted)])
}

pub(crate) fn alg_id_null(dotted: &str) -> Vec<u8> {
    seq(&[oid(dotted), null()])
}

/// A CMS `Attribute`.
pub(crate) fn attribute(dotted: &str, values: &[Vec<u8>]) -> Vec<u8> {
    seq(&[oid(dotted), set(values)])
}

pub(crate) fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub(crate) fn sha256(data: &[u8]) -> Vec<u8> {
    DigestAlgorithm::Sha256.digest(data)
}

// -- keys and certificates --

/// Deterministic P-256 key derived from a one-byte seed.
pub(crate) struct TestKey(SigningKey);

impl TestKey {
    pub(crate) fn new(seed: u8) -> Self {
        Self(SigningKey::from_slice(&[seed; 32]).unwrap())
    }

    pub(crate) fn spki_der(&self) -> Vec<u8> {
        self.0
            .verifying_key()
            .to_public_key_der()
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    /// Uncompressed EC point, the `subjectPublicKey` bits.
    pub(crate) fn key_bits(&self) -> Vec<u8> {
        self.0
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// DER-encoded ECDSA signature over SHA-256 of `data`.
    pub(crate) fn sign(&self, data: &[u8]) -> Vec<u8> {
        let sig: Signature = self.0.sign(data);
        sig.to_der().as_bytes().to_vec()
    }

    /// Fixed-size `r || s` form.
    pub(crate) fn sign_fixed(&self, data: &[u8]) -> Vec<u8> {
        let sig: Signature = self.0.sign(data);
        sig.to_bytes().to_vec()
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum CertKind {
    Ca,
    EndEntity,
    TimeStamping,
    OcspSigning,
}

pub(crate) struct TestCert {
    pub(crate) der: Vec<u8>,
    pub(crate) key: TestKey,
    pub(crate) name: Name,
    pub(crate) issuer: Name,
    pub(crate) serial: u32,
}

fn build_name(cn: &str) -> Name {
    let value = rasn::der::encode(&PrintableString::try_from(cn.to_string()).unwrap()).unwrap();

    let mut set = SetOf::new();
    set.insert(AttributeTypeAndValue {
        r#type: parse_oid(ID_AT_COMMON_NAME).unwrap(),
        value: Any::new(value),
    });

    Name::RdnSequence(vec![RelativeDistinguishedName::from(set)])
}

fn ecdsa_sha256() -> AlgorithmIdentifier {
    AlgorithmIdentifier {
        algorithm: parse_oid(ECDSA_WITH_SHA256).unwrap(),
        parameters: None,
    }
}

fn build_cert(
    subject: &Name,
    serial: u32,
    subject_key: &TestKey,
    issuer: &Name,
    issuer_key: &TestKey,
    kind: CertKind,
) -> Vec<u8> {
    let spki: SubjectPublicKeyInfo = rasn::der::decode(&subject_key.spki_der()).unwrap();

    let mut exts = vec![Extension {
        extn_id: parse_oid(ID_CE_SUBJECT_KEY_ID).unwrap(),
        critical: false,
        extn_value: OctetString::from(octets(&sha1(&subject_key.key_bits()))),
    }];

    match kind {
        CertKind::Ca => exts.push(Extension {
            extn_id: parse_oid(ID_CE_BASIC_CONSTRAINTS).unwrap(),
            critical: true,
            extn_value: rasn::der::encode(&BasicConstraints {
                ca: true,
                path_len_constraint: None,
            })
            .unwrap()
            .into(),
        }),
        CertKind::TimeStamping | CertKind::OcspSigning => {
            let purpose = if kind == CertKind::TimeStamping {
                ID_KP_TIME_STAMPING
            } else {
                ID_KP_OCSP_SIGNING
            };
            let eku: rasn_pkix::ExtKeyUsageSyntax = vec![parse_oid(purpose).unwrap()];
            exts.push(Extension {
                extn_id: parse_oid(ID_CE_EXT_KEY_USAGE).unwrap(),
                critical: true,
                extn_value: rasn::der::encode(&eku).unwrap().into(),
            });
        }
        CertKind::EndEntity => (),
    }

    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: Integer::from(serial as i64),
        signature: ecdsa_sha256(),
        issuer: issuer.clone(),
        validity: Validity {
            not_before: Time::Utc(utc(2000, 1, 1, 0, 0, 0)),
            not_after: Time::Utc(utc(2049, 12, 31, 23, 59, 59)),
        },
        subject: subject.clone(),
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(Extensions::from(exts)),
    };

    let tbs_der = rasn::der::encode(&tbs).unwrap();
    let sig = issuer_key.sign(&tbs_der);

    let cert = Certificate {
        tbs_certificate: tbs,
        signature_algorithm: ecdsa_sha256(),
        signature_value: BitString::from_slice(&sig),
    };

    rasn::der::encode(&cert).unwrap()
}

impl TestCert {
    pub(crate) fn self_signed(cn: &str, serial: u32, seed: u8) -> Self {
        let key = TestKey::new(seed);
        let name = build_name(cn);
        let der = build_cert(&name, serial, &key, &name, &key, CertKind::Ca);

        Self {
            der,
            key,
            issuer: name.clone(),
            name,
            serial,
        }
    }

    fn issue_kind(&self, cn: &str, serial: u32, seed: u8, kind: CertKind) -> Self {
        let key = TestKey::new(seed);
        let name = build_name(cn);
        let der = build_cert(&name, serial, &key, &self.name, &self.key, kind);

        Self {
            der,
            key,
            name,
            issuer: self.name.clone(),
            serial,
        }
    }

    /// End-entity certificate signed by this one.
    pub(crate) fn issue(&self, cn: &str, serial: u32, seed: u8) -> Self {
        self.issue_kind(cn, serial, seed, CertKind::EndEntity)
    }

    /// Intermediate CA certificate signed by this one.
    pub(crate) fn issue_ca(&self, cn: &str, serial: u32, seed: u8) -> Self {
        self.issue_kind(cn, serial, seed, CertKind::Ca)
    }

    /// Time-stamping certificate signed by this one.
    pub(crate) fn issue_tsa(&self, cn: &str, serial: u32, seed: u8) -> Self {
        self.issue_kind(cn, serial, seed, CertKind::TimeStamping)
    }

    /// Delegated OCSP responder certificate signed by this one.
    pub(crate) fn issue_ocsp_responder(&self, cn: &str, serial: u32, seed: u8) -> Self {
        self.issue_kind(cn, serial, seed, CertKind::OcspSigning)
    }

    pub(crate) fn name_der(&self) -> Vec<u8> {
        rasn::der::encode(&self.name).unwrap()
    }

    pub(crate) fn issuer_der(&self) -> Vec<u8> {
        rasn::der::encode(&self.issuer).unwrap()
    }

    /// CRL issued by this certificate listing `(serial, revocation date)`
    /// entries.
    pub(crate) fn crl(
        &self,
        this_update: DateTime<Utc>,
        next_update: DateTime<Utc>,
        revoked: &[(u32, DateTime<Utc>)],
    ) -> Vec<u8> {
        let mut fields = vec![
            int(1),
            alg_id(ECDSA_WITH_SHA256),
            self.name_der(),
            utc_time(this_update),
            utc_time(next_update),
        ];

        if !revoked.is_empty() {
            let entries: Vec<Vec<u8>> = revoked
                .iter()
                .map(|(serial, at)| seq(&[int(*serial as i64), utc_time(*at)]))
                .collect();
            fields.push(seq(&entries));
        }

        let tbs = seq(&fields);
        let sig = self.key.sign(&tbs);

        seq(&[tbs, alg_id(ECDSA_WITH_SHA256), bit_string(&sig)])
    }

    /// `BasicOCSPResponse` for `subject`, signed by this certificate acting
    /// as issuer and responder (responder identified by name).
    pub(crate) fn ocsp_response(
        &self,
        subject: &TestCert,
        produced_at: DateTime<Utc>,
        revoked: Option<DateTime<Utc>>,
    ) -> Vec<u8> {
        self.ocsp_response_by(self, subject, produced_at, revoked, false)
    }

    /// `BasicOCSPResponse` for `subject` as issued by this certificate,
    /// signed by `responder` and identifying it by name. With `embed`, the
    /// responder certificate is carried in the response.
    ///
    /// The single response is current from one hour before `produced_at`
    /// to seven days after.
    pub(crate) fn ocsp_response_by(
        &self,
        responder: &TestCert,
        subject: &TestCert,
        produced_at: DateTime<Utc>,
        revoked: Option<DateTime<Utc>>,
        embed: bool,
    ) -> Vec<u8> {
        let cert_id = seq(&[
            alg_id_null(SHA1),
            octets(&sha1(&self.name_der())),
            octets(&sha1(&self.key.key_bits())),
            int(subject.serial as i64),
        ]);

        let status = match revoked {
            None => ctx_prim(0, &[]),
            Some(at) => ctx(1, &gen_time(at)),
        };

        let single = seq(&[
            cert_id,
            status,
            gen_time(produced_at - Duration::hours(1)),
            ctx(0, &gen_time(produced_at + Duration::days(7))),
        ]);

        let data = seq(&[
            ctx(1, &responder.name_der()),
            gen_time(produced_at),
            seq(&[single]),
        ]);
        let sig = responder.key.sign(&data);

        let mut fields = vec![data, alg_id(ECDSA_WITH_SHA256), bit_string(&sig)];
        if embed {
            fields.push(ctx(0, &seq(&[responder.der.clone()])));
        }
        seq(&fields)
    }
}

/// Wraps a `BasicOCSPResponse` into a successful `OCSPResponse`.
pub(crate) fn ocsp_wrap(basic: &[u8]) -> Vec<u8> {
    seq(&[
        enumerated(0),
        ctx(0, &seq(&[oid(ID_PKIX_OCSP_BASIC), octets(basic)])),
    ])
}

// -- CMS --

/// Builds a CMS `ContentInfo` wrapping `SignedData` with one signer.
///
/// `contentType` and `messageDigest` signed attributes are always added.
/// Unsigned attributes are written in the order given.
pub(crate) struct CmsBuilder<'a> {
    signer: &'a TestCert,
    content_type: &'static str,
    content: Vec<u8>,
    detached: bool,
    version: i64,
    signed: Vec<Vec<u8>>,
    unsigned: Vec<Vec<u8>>,
    certs: Vec<Vec<u8>>,
    tamper_digest: bool,
}

impl<'a> CmsBuilder<'a> {
    pub(crate) fn new(signer: &'a TestCert, content: &[u8]) -> Self {
        Self {
            signer,
            content_type: ID_DATA,
            content: content.to_vec(),
            detached: false,
            version: 1,
            signed: Vec::new(),
            unsigned: Vec::new(),
            certs: vec![signer.der.clone()],
            tamper_digest: false,
        }
    }

    /// A time-stamp token whose encapsulated content is `tst_info`.
    pub(crate) fn time_stamp(signer: &'a TestCert, tst_info: &[u8]) -> Self {
        Self {
            content_type: ID_CT_TSTINFO,
            version: 3,
            ..Self::new(signer, tst_info)
        }
    }

    pub(crate) fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    pub(crate) fn signed_attr(mut self, dotted: &str, value: Vec<u8>) -> Self {
        self.signed.push(attribute(dotted, &[value]));
        self
    }

    pub(crate) fn unsigned_attr(mut self, dotted: &str, value: Vec<u8>) -> Self {
        self.unsigned.push(attribute(dotted, &[value]));
        self
    }

    pub(crate) fn cert(mut self, der: Vec<u8>) -> Self {
        self.certs.push(der);
        self
    }

    pub(crate) fn no_certs(mut self) -> Self {
        self.certs.clear();
        self
    }

    /// Puts a wrong `messageDigest` value in the signed attributes.
    pub(crate) fn tamper_digest(mut self) -> Self {
        self.tamper_digest = true;
        self
    }

    /// The signature value this builder produces.
    pub(crate) fn signature_value(&self) -> Vec<u8> {
        self.signer.key.sign(&self.signed_attrs_set())
    }

    fn signed_attrs_set(&self) -> Vec<u8> {
        let mut digest = sha256(&self.content);
        if self.tamper_digest {
            digest[0] ^= 0xff;
        }

        let mut attrs = vec![
            attribute(ID_CONTENT_TYPE, &[oid(self.content_type)]),
            attribute(ID_MESSAGE_DIGEST, &[octets(&digest)]),
        ];
        attrs.extend(self.signed.iter().cloned());

        set(&attrs)
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let signed_set = self.signed_attrs_set();
        let signature = self.signer.key.sign(&signed_set);

        let mut signed_attrs = signed_set;
        signed_attrs[0] = 0xa0;

        let mut signer_info = vec![
            int(1),
            seq(&[self.signer.issuer_der(), int(self.signer.serial as i64)]),
            alg_id_null(SHA256),
            signed_attrs,
            alg_id(ECDSA_WITH_SHA256),
            octets(&signature),
        ];
        if !self.unsigned.is_empty() {
            signer_info.push(ctx(1, &self.unsigned.concat()));
        }

        let encap = if self.detached {
            seq(&[oid(self.content_type)])
        } else {
            seq(&[oid(self.content_type), ctx(0, &octets(&self.content))])
        };

        let mut signed_data = vec![int(self.version), set(&[alg_id_null(SHA256)]), encap];
        if !self.certs.is_empty() {
            signed_data.push(ctx(0, &self.certs.concat()));
        }
        signed_data.push(set(&[seq(&signer_info)]));

        seq(&[oid(ID_SIGNED_DATA), ctx(0, &seq(&signed_data))])
    }
}

/// `TSTInfo` imprinting SHA-256 of `data`.
pub(crate) fn tst_info(data: &[u8], gen: DateTime<Utc>, serial: i64) -> Vec<u8> {
    seq(&[
        int(1),
        oid("1.2.3.4.1"),
        seq(&[alg_id_null(SHA256), octets(&sha256(data))]),
        int(serial),
        gen_time(gen),
    ])
}

/// Time-stamp token over `data` signed by `tsa`.
pub(crate) fn time_stamp_token(tsa: &TestCert, data: &[u8], gen: DateTime<Utc>) -> Vec<u8> {
    CmsBuilder::time_stamp(tsa, &tst_info(data, gen, 1)).build()
}

// -- policies --

pub(crate) const POLICY_ID: &str = "2.16.76.1.7.1.1.2.3";
pub(crate) const COMMITMENT_PROOF_OF_APPROVAL: &str = "1.2.840.113549.1.9.16.6.5";

/// A policy rendered identically as DER and as XML.
#[derive(Clone)]
pub(crate) struct PolicyFixture {
    pub(crate) policy_id: &'static str,
    pub(crate) not_after: Option<DateTime<Utc>>,
    pub(crate) mandated_signed: Vec<&'static str>,
    pub(crate) mandated_unsigned: Vec<&'static str>,
    pub(crate) verifier_unsigned: Vec<&'static str>,
    pub(crate) full_path_refs: bool,
    pub(crate) trust_points: Vec<Vec<u8>>,
    pub(crate) end_mode: u8,
    pub(crate) ca_mode: u8,
    pub(crate) time_stamp_delay_secs: Option<i64>,

    /// Commitment type and the signed attributes its rule mandates instead.
    pub(crate) commitment: Option<(&'static str, Vec<&'static str>)>,

    /// `(oid, DER value)` extensions of the policy info.
    pub(crate) extensions: Vec<(&'static str, Vec<u8>)>,
}

const MODE_NAMES: [&str; 6] = [
    "clrcheck",
    "ocspcheck",
    "bothcheck",
    "eithercheck",
    "nocheck",
    "other",
];

impl PolicyFixture {
    pub(crate) fn new() -> Self {
        Self {
            policy_id: POLICY_ID,
            not_after: Some(utc(2030, 6, 21, 0, 0, 0)),
            mandated_signed: vec![ID_CONTENT_TYPE, ID_MESSAGE_DIGEST],
            mandated_unsigned: Vec::new(),
            verifier_unsigned: Vec::new(),
            full_path_refs: false,
            trust_points: Vec::new(),
            end_mode: 0,
            ca_mode: 0,
            time_stamp_delay_secs: None,
            commitment: None,
            extensions: Vec::new(),
        }
    }

    fn date_of_issue() -> DateTime<Utc> {
        utc(2012, 3, 20, 0, 0, 0)
    }

    fn not_before() -> DateTime<Utc> {
        utc(2012, 3, 20, 0, 0, 0)
    }

    // -- DER --

    fn signer_and_verifier_rules_der(&self, signed: &[&str]) -> Vec<u8> {
        let oids = |ids: &[&str]| seq(&ids.iter().map(|id| oid(id)).collect::<Vec<_>>());
        let mut signer = vec![
            boolean(false),
            oids(signed),
            oids(&self.mandated_unsigned),
        ];
        if self.full_path_refs {
            signer.push(ctx(0, &enumerated(2)));
        }
        seq(&[seq(&signer), seq(&[oids(&self.verifier_unsigned)])])
    }

    fn common_rules_der(&self) -> Vec<u8> {
        let mut rules = vec![ctx(0, &self.signer_and_verifier_rules_der(&self.mandated_signed))];

        let trust_points: Vec<Vec<u8>> = self
            .trust_points
            .iter()
            .map(|cert| seq(&[cert.clone(), ctx(0, &int(3))]))
            .collect();
        let rev_req = seq(&[
            seq(&[enumerated(self.end_mode)]),
            ctx(0, &seq(&[enumerated(self.ca_mode)])),
        ]);
        rules.push(ctx(1, &seq(&[seq(&trust_points), rev_req])));

        if let Some(delay) = self.time_stamp_delay_secs {
            let delta = seq(&[int(delay), int(0), int(0), int(0)]);
            rules.push(ctx(2, &seq(&[ctx(4, &delta)])));
        }
        seq(&rules)
    }

    fn commitment_rules_der(&self) -> Vec<u8> {
        let rules: Vec<Vec<u8>> = self
            .commitment
            .iter()
            .map(|(id, signed)| {
                seq(&[
                    seq(&[seq(&[oid(id)])]),
                    ctx(0, &self.signer_and_verifier_rules_der(signed)),
                ])
            })
            .collect();
        seq(&rules)
    }

    pub(crate) fn info_der(&self) -> Vec<u8> {
        let mut period = vec![gen_time(Self::not_before())];
        if let Some(end) = self.not_after {
            period.push(gen_time(end));
        }

        let validation = seq(&[
            seq(&period),
            self.common_rules_der(),
            self.commitment_rules_der(),
        ]);

        let mut info = vec![
            oid(self.policy_id),
            gen_time(Self::date_of_issue()),
            seq(&[ctx_prim(6, b"https://policy.example/issuer")]),
            utf8("Test signatures"),
            validation,
        ];
        if !self.extensions.is_empty() {
            let extensions: Vec<Vec<u8>> = self
                .extensions
                .iter()
                .map(|(id, value)| seq(&[oid(id), octets(value)]))
                .collect();
            info.push(seq(&extensions));
        }
        seq(&info)
    }

    /// DER policy declaring its correct SHA-256 digest.
    pub(crate) fn der(&self) -> Vec<u8> {
        let digest = sha256(&[alg_id(SHA256), self.info_der()].concat());
        self.der_with_digest(Some(&digest))
    }

    pub(crate) fn der_with_digest(&self, digest: Option<&[u8]>) -> Vec<u8> {
        let mut policy = vec![alg_id(SHA256), self.info_der()];
        if let Some(digest) = digest {
            policy.push(octets(digest));
        }
        seq(&policy)
    }

    // -- XML --

    fn signer_and_verifier_rules_xml(&self, signed: &[&str]) -> String {
        let ids = |ids: &[&str]| {
            ids.iter()
                .map(|id| format!("<QPropertyID>urn:oid:{id}</QPropertyID>"))
                .collect::<String>()
        };
        let cert_ref = if self.full_path_refs {
            "<MandatedCertificateRef>fullPath</MandatedCertificateRef>"
        } else {
            ""
        };
        format!(
            "<SignerAndVerifierRules>\
               <SignerRules>\
                 <ExternalSignedObjects>false</ExternalSignedObjects>\
                 <MandatedSignedQProperties>{}</MandatedSignedQProperties>\
                 <MandatedUnsignedQProperties>{}</MandatedUnsignedQProperties>\
                 {cert_ref}\
               </SignerRules>\
               <VerifierRules><MandatedQUnsignedProperties>{}</MandatedQUnsignedProperties></VerifierRules>\
             </SignerAndVerifierRules>",
            ids(signed),
            ids(&self.mandated_unsigned),
            ids(&self.verifier_unsigned),
        )
    }

    pub(crate) fn xml(&self) -> String {
        use base64::{engine::general_purpose, Engine as _};

        let trust_points: String = self
            .trust_points
            .iter()
            .map(|cert| {
                format!(
                    "<CertificateTrustPoint>\
                       <TrustPoint>{}</TrustPoint>\
                       <PathLenConstraint>3</PathLenConstraint>\
                     </CertificateTrustPoint>",
                    general_purpose::STANDARD.encode(cert)
                )
            })
            .collect();

        let time_stamp = match self.time_stamp_delay_secs {
            Some(delay) => format!(
                "<TimeStampTrustCondition><SignatureTimeStampDelay>\
                   <DeltaSeconds>{delay}</DeltaSeconds><DeltaMinutes>0</DeltaMinutes>\
                   <DeltaHours>0</DeltaHours><DeltaDays>0</DeltaDays>\
                 </SignatureTimeStampDelay></TimeStampTrustCondition>"
            ),
            None => String::new(),
        };

        let commitments: String = self
            .commitment
            .iter()
            .map(|(id, signed)| {
                format!(
                    "<CommitmentRule>\
                       <SelCommitmentTypes><SelCommitmentType><RecognizedCommitmentType>\
                         <CommitmentIdentifier><Identifier>urn:oid:{id}</Identifier></CommitmentIdentifier>\
                       </RecognizedCommitmentType></SelCommitmentType></SelCommitmentTypes>\
                       {}\
                     </CommitmentRule>",
                    self.signer_and_verifier_rules_xml(signed)
                )
            })
            .collect();

        let not_after = self
            .not_after
            .map(|t| format!("<NotAfter>{}</NotAfter>", t.to_rfc3339()))
            .unwrap_or_default();

        let extensions = if self.extensions.is_empty() {
            String::new()
        } else {
            let items: String = self
                .extensions
                .iter()
                .map(|(id, value)| {
                    format!(
                        "<SignPolExtn><ExtnID>{id}</ExtnID><ExtnValue>{}</ExtnValue></SignPolExtn>",
                        general_purpose::STANDARD.encode(value)
                    )
                })
                .collect();
            format!("<SignPolExtensions>{items}</SignPolExtensions>")
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<pa:SignaturePolicy xmlns:pa="http://uri.etsi.org/2478/v1.1.1#" xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
  <pa:SignPolicyDigestAlg Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
  <pa:SignPolicyInfo>
    <pa:SignPolicyIdentifier><pa:Identifier>urn:oid:{policy_id}</pa:Identifier></pa:SignPolicyIdentifier>
    <pa:DateOfIssue>{date}</pa:DateOfIssue>
    <pa:PolicyIssuerName>https://policy.example/issuer</pa:PolicyIssuerName>
    <pa:FieldOfApplication>Test signatures</pa:FieldOfApplication>
    <pa:SignatureValidationPolicy>
      <pa:SigningPeriod><pa:NotBefore>{not_before}</pa:NotBefore>{not_after}</pa:SigningPeriod>
      <pa:CommonRules>
        {rules}
        <pa:SigningCertTrustCondition>
          <pa:SignerTrustTrees>{trust_points}</pa:SignerTrustTrees>
          <pa:SignerRevReq>
            <pa:EndRevReq><pa:EnuRevReq>{end}</pa:EnuRevReq></pa:EndRevReq>
            <pa:CACerts><pa:EnuRevReq>{ca}</pa:EnuRevReq></pa:CACerts>
          </pa:SignerRevReq>
        </pa:SigningCertTrustCondition>
        {time_stamp}
      </pa:CommonRules>
      <pa:CommitmentRules>{commitments}</pa:CommitmentRules>
    </pa:SignatureValidationPolicy>
    {extensions}
  </pa:SignPolicyInfo>
  <pa:SignPolicyDigest>AAAA</pa:SignPolicyDigest>
</pa:SignaturePolicy>"#,
            policy_id = self.policy_id,
            date = Self::date_of_issue().to_rfc3339(),
            not_before = Self::not_before().to_rfc3339(),
            rules = self.signer_and_verifier_rules_xml(&self.mandated_signed),
            end = MODE_NAMES[self.end_mode as usize],
            ca = MODE_NAMES[self.ca_mode as usize],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::asn1::{read_all, read_tlv};

    #[test]
    fn long_lengths() {
        let content = vec![0u8; 300];
        let encoded = tlv(0x04, &content);
        assert_eq!(&encoded[..4], &[0x04, 0x82, 0x01, 0x2c]);
        assert_eq!(encoded.len(), 304);
    }

    #[test]
    fn set_sorts_elements() {
        let encoded = set(&[int(2), int(1)]);
        let (outer, _) = read_tlv(&encoded).unwrap();
        let items = read_all(outer.content).unwrap();
        assert_eq!(items[0].raw, int(1).as_slice());
    }

    #[test]
    fn keys_are_deterministic() {
        assert_eq!(TestKey::new(3).spki_der(), TestKey::new(3).spki_der());
        assert_ne!(TestKey::new(3).key_bits(), TestKey::new(4).key_bits());
    }
}
