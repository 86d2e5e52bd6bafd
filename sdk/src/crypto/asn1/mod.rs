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


//! ASN.1 structures that are not covered by `rasn-cms`, `rasn-pkix` or
//! `rasn-ocsp`, plus conversions shared by the decoders.

#![allow(missing_docs)]

pub(crate) mod rfc3161;
pub(crate) mod rfc5126;
pub(crate) mod rfc5652;

use asn1_rs::{Any as RawAny, FromDer};
use chrono::{DateTime, Utc};
use rasn::types::{GeneralizedTime, Integer, ObjectIdentifier, Oid};
use x509_parser::time::ASN1Time;

/// Renders an object identifier in dotted form.
pub(crate) fn oid_to_string(oid: &Oid) -> String {
    oid.iter()
        .map(|arc| arc.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Parses a dotted object identifier.
pub(crate) fn parse_oid(dotted: &str) -> Option<ObjectIdentifier> {
    let arcs = dotted
        .trim()
        .split('.')
        .map(|arc| arc.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;
    ObjectIdentifier::new(arcs)
}

pub(crate) fn generalized_time_to_utc(time: &GeneralizedTime) -> DateTime<Utc> {
    time.with_timezone(&Utc)
}

pub(crate) fn time_to_utc(time: &rasn_pkix::Time) -> DateTime<Utc> {
    match time {
        rasn_pkix::Time::Utc(t) => *t,
        rasn_pkix::Time::General(t) => generalized_time_to_utc(t),
    }
}

pub(crate) fn asn1_time_to_utc(time: ASN1Time) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.timestamp(), 0)
}

/// Returns the content octets of a single DER TLV.
pub(crate) fn tlv_content(der: &[u8]) -> Option<Vec<u8>> {
    let (_, any) = RawAny::from_der(der).ok()?;
    Some(any.data.to_vec())
}

/// One DER TLV borrowed from its input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Tlv<'a> {
    /// First identifier octet: class, constructed bit and low tag number.
    pub(crate) identifier: u8,

    /// Complete encoding, header included.
    pub(crate) raw: &'a [u8],

    pub(crate) content: &'a [u8],
}

impl Tlv<'_> {
    pub(crate) fn is_constructed(&self) -> bool {
        self.identifier & 0x20 != 0
    }

    /// Tag number of a context-specific tag, `None` for other classes.
    pub(crate) fn context_tag(&self) -> Option<u8> {
        (self.identifier & 0xc0 == 0x80).then_some(self.identifier & 0x1f)
    }
}

/// Reads one TLV from the front of `input`, returning it and the rest.
pub(crate) fn read_tlv(input: &[u8]) -> Option<(Tlv<'_>, &[u8])> {
    let (rest, any) = RawAny::from_der(input).ok()?;
    let raw = input.get(..input.len() - rest.len())?;
    let content = raw.get(raw.len() - any.data.len()..)?;

    Some((
        Tlv {
            identifier: *raw.first()?,
            raw,
            content,
        },
        rest,
    ))
}

/// Reads every TLV in `content`, in order.
pub(crate) fn read_all(mut content: &[u8]) -> Option<Vec<Tlv<'_>>> {
    let mut items = Vec::new();
    while !content.is_empty() {
        let (tlv, rest) = read_tlv(content)?;
        items.push(tlv);
        content = rest;
    }
    Some(items)
}

/// Content octets of an INTEGER, the form serial numbers are compared in.
pub(crate) fn integer_content(value: &Integer) -> Option<Vec<u8>> {
    let der = rasn::der::encode(value).ok()?;
    tlv_content(&der)
}
