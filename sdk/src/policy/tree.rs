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

//! Encoding-neutral node tree the policy grammars are written against.
//!
//! The DER and XML adapters each produce a [`Node`] tree. Grammars walk it
//! with [`Fields`] cursors: mandatory fields are taken positionally (DER) or
//! by element name (XML), optional fields by explicit context tag (DER) or
//! element name (XML) through a [`Slot`] enum per structure.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::{PolicyEncoding, PolicyError};
use crate::crypto::{asn1, hash::strip_urn_oid};

/// Deepest nesting either adapter accepts.
pub(crate) const MAX_DEPTH: usize = 64;

pub(crate) const TAG_BOOLEAN: u8 = 1;
pub(crate) const TAG_INTEGER: u8 = 2;
pub(crate) const TAG_OCTET_STRING: u8 = 4;
pub(crate) const TAG_NULL: u8 = 5;
pub(crate) const TAG_OID: u8 = 6;
pub(crate) const TAG_ENUMERATED: u8 = 10;
pub(crate) const TAG_UTF8_STRING: u8 = 12;
pub(crate) const TAG_SEQUENCE: u8 = 16;
pub(crate) const TAG_PRINTABLE_STRING: u8 = 19;
pub(crate) const TAG_TELETEX_STRING: u8 = 20;
pub(crate) const TAG_IA5_STRING: u8 = 22;
pub(crate) const TAG_UTC_TIME: u8 = 23;
pub(crate) const TAG_GENERALIZED_TIME: u8 = 24;
pub(crate) const TAG_UNIVERSAL_STRING: u8 = 28;
pub(crate) const TAG_BMP_STRING: u8 = 30;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Label {
    Universal(u8),
    Context(u8),
    /// Application or private class DER tags, never valid in a policy.
    Other(u8),
    Element(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Content {
    Primitive(Vec<u8>),
    Text(String),
    Children(Vec<Node>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Node {
    pub(crate) label: Label,
    pub(crate) content: Content,

    /// Complete DER encoding of this node; `None` for XML.
    pub(crate) raw: Option<Vec<u8>>,

    /// XML attributes by local name.
    pub(crate) attributes: Vec<(String, String)>,
}

impl Node {
    pub(crate) fn encoding(&self) -> PolicyEncoding {
        match self.label {
            Label::Element(_) => PolicyEncoding::Xml,
            _ => PolicyEncoding::Der,
        }
    }

    pub(crate) fn element_name(&self) -> Option<&str> {
        match &self.label {
            Label::Element(name) => Some(name),
            _ => None,
        }
    }

    pub(crate) fn children(&self) -> &[Node] {
        match &self.content {
            Content::Children(children) => children,
            _ => &[],
        }
    }

    /// Concatenated text of this element and its descendants.
    pub(crate) fn text_content(&self) -> String {
        match &self.content {
            Content::Text(text) => text.clone(),
            Content::Primitive(_) => String::new(),
            Content::Children(children) => {
                children.iter().map(Node::text_content).collect::<String>()
            }
        }
    }

    fn describe(&self) -> String {
        match &self.label {
            Label::Universal(tag) => format!("universal tag {tag}"),
            Label::Context(tag) => format!("[{tag}]"),
            Label::Other(id) => format!("tag 0x{id:02x}"),
            Label::Element(name) => format!("<{name}>"),
        }
    }
}

/// Optional-field slots of one structure.
///
/// Each variant carries the context tag number used in DER and the element
/// names accepted in XML. Slots must appear in increasing tag order.
pub(crate) trait Slot: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn tag(self) -> u8;

    fn names(self) -> &'static [&'static str];

    fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|slot| slot.tag() == tag)
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|slot| slot.names().contains(&name))
    }
}

/// Declares a [`Slot`] enum.
macro_rules! slots {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = $tag:literal => [$($xml:literal),+ $(,)?]),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        $vis enum $name {
            $($variant = $tag),+
        }

        impl $crate::policy::tree::Slot for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn tag(self) -> u8 {
                self as u8
            }

            fn names(self) -> &'static [&'static str] {
                match self {
                    $(Self::$variant => &[$($xml),+]),+
                }
            }
        }
    };
}

pub(crate) use slots;

/// Cursor over the fields of one constructed node.
pub(crate) struct Fields<'n> {
    path: String,
    items: &'n [Node],
    pos: usize,
    last_slot: Option<u8>,
}

impl<'n> Fields<'n> {
    pub(crate) fn new(node: &'n Node, path: impl Into<String>) -> Result<Self, PolicyError> {
        let path = path.into();
        match &node.content {
            Content::Children(items) => Ok(Self {
                path,
                items,
                pos: 0,
                last_slot: None,
            }),
            // an empty XML element or an empty SEQUENCE
            Content::Text(text) if text.trim().is_empty() => Ok(Self {
                path,
                items: &[],
                pos: 0,
                last_slot: None,
            }),
            Content::Primitive(bytes) if bytes.is_empty() => Ok(Self {
                path,
                items: &[],
                pos: 0,
                last_slot: None,
            }),
            _ => Err(PolicyError::decoding(&path, "expected a structure")),
        }
    }

    fn peek(&self) -> Option<&'n Node> {
        self.items.get(self.pos)
    }

    fn take(&mut self, node: &'n Node, name: &str) -> Field<'n> {
        self.pos += 1;
        Field {
            node,
            path: format!("{}/{name}", self.path),
        }
    }

    /// Takes the next mandatory field.
    pub(crate) fn required(&mut self, name: &str) -> Result<Field<'n>, PolicyError> {
        self.required_any(&[name])
    }

    /// Takes the next mandatory field, accepting any of `names` in XML.
    pub(crate) fn required_any(&mut self, names: &[&str]) -> Result<Field<'n>, PolicyError> {
        let name = names.first().copied().unwrap_or_default();
        let path = format!("{}/{name}", self.path);
        let Some(node) = self.peek() else {
            return Err(PolicyError::decoding(path, "missing mandatory field"));
        };

        let matches = match &node.label {
            Label::Element(element) => names.contains(&element.as_str()),
            Label::Universal(_) => true,
            Label::Context(_) | Label::Other(_) => false,
        };
        if !matches {
            return Err(PolicyError::decoding(
                path,
                format!("expected mandatory field, found {}", node.describe()),
            ));
        }
        self.pos += 1;
        Ok(Field { node, path })
    }

    /// Takes the next mandatory field carried under explicit tag `[tag]`.
    pub(crate) fn required_tagged(&mut self, name: &str, tag: u8) -> Result<Field<'n>, PolicyError> {
        let path = format!("{}/{name}", self.path);
        let Some(node) = self.peek() else {
            return Err(PolicyError::decoding(path, "missing mandatory field"));
        };

        let node = match &node.label {
            Label::Element(element) if element == name => node,
            Label::Context(t) if *t == tag => match node.children() {
                [inner] => inner,
                _ => {
                    return Err(PolicyError::decoding(
                        path,
                        "explicit tag must wrap exactly one value",
                    ))
                }
            },
            _ => {
                return Err(PolicyError::decoding(
                    path,
                    format!("expected mandatory field, found {}", node.describe()),
                ))
            }
        };
        self.pos += 1;
        Ok(Field { node, path })
    }

    /// Takes the next field if it is an untagged optional field.
    ///
    /// In DER the field is recognized by `universal` (or not at all when
    /// `None`), in XML by any of the element `names`.
    pub(crate) fn optional(&mut self, names: &[&str], universal: Option<u8>) -> Option<Field<'n>> {
        let node = self.peek()?;
        let matches = match &node.label {
            Label::Element(element) => names.contains(&element.as_str()),
            Label::Universal(tag) => Some(*tag) == universal,
            _ => false,
        };
        let name = names.first().copied().unwrap_or_default();
        matches.then(|| self.take(node, name))
    }

    /// Takes the next optional field announced by a slot, unwrapping the
    /// explicit tag in DER.
    pub(crate) fn next_slot<S: Slot>(&mut self) -> Result<Option<(S, Field<'n>)>, PolicyError> {
        let Some(node) = self.peek() else {
            return Ok(None);
        };

        let slot = match &node.label {
            Label::Context(tag) => match S::from_tag(*tag) {
                Some(slot) => slot,
                None => {
                    return Err(PolicyError::decoding(
                        &self.path,
                        format!("unknown field [{tag}]"),
                    ))
                }
            },
            Label::Element(name) => match S::from_name(name) {
                Some(slot) => slot,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };

        let name = slot.names().first().copied().unwrap_or_default();
        let path = format!("{}/{name}", self.path);
        if self.last_slot.is_some_and(|last| last >= slot.tag()) {
            return Err(PolicyError::decoding(path, "field out of order or repeated"));
        }
        self.last_slot = Some(slot.tag());
        self.pos += 1;

        let inner = match &node.label {
            Label::Context(_) => match node.children() {
                [inner] => inner,
                _ => {
                    return Err(PolicyError::decoding(
                        path,
                        "explicit tag must wrap exactly one value",
                    ))
                }
            },
            _ => node,
        };
        Ok(Some((slot, Field { node: inner, path })))
    }

    /// Fails if any field is left unread.
    pub(crate) fn finish(self) -> Result<(), PolicyError> {
        match self.peek() {
            Some(node) => Err(PolicyError::decoding(
                &self.path,
                format!("unexpected field {}", node.describe()),
            )),
            None => Ok(()),
        }
    }
}

/// One field located by a [`Fields`] cursor.
#[derive(Clone, Debug)]
pub(crate) struct Field<'n> {
    pub(crate) node: &'n Node,
    pub(crate) path: String,
}

impl<'n> Field<'n> {
    pub(crate) fn new(node: &'n Node, path: impl Into<String>) -> Self {
        Self {
            node,
            path: path.into(),
        }
    }

    pub(crate) fn error(&self, reason: impl Into<String>) -> PolicyError {
        PolicyError::decoding(&self.path, reason)
    }

    pub(crate) fn fields(&self) -> Result<Fields<'n>, PolicyError> {
        if let Label::Universal(tag) = self.node.label {
            if tag != TAG_SEQUENCE {
                return Err(self.error(format!("expected SEQUENCE, found universal tag {tag}")));
            }
        }
        Fields::new(self.node, self.path.clone())
    }

    /// Elements of a SEQUENCE OF. In XML every child must be named `item`
    /// unless `item` is `"*"`.
    pub(crate) fn items(&self, item: &str) -> Result<Vec<Field<'n>>, PolicyError> {
        self.fields()?;
        self.node
            .children()
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let path = format!("{}/{item}[{i}]", self.path);
                match node.element_name() {
                    Some(name) if item != "*" && name != item => Err(PolicyError::decoding(
                        path,
                        format!("expected <{item}>, found <{name}>"),
                    )),
                    _ => Ok(Field { node, path }),
                }
            })
            .collect()
    }

    fn primitive(&self, tag: u8) -> Result<&'n [u8], PolicyError> {
        match (&self.node.label, &self.node.content) {
            (Label::Universal(t), Content::Primitive(bytes)) if *t == tag => Ok(bytes),
            _ => Err(self.error(format!(
                "expected universal tag {tag}, found {}",
                self.node.describe()
            ))),
        }
    }

    fn raw(&self) -> Result<&'n [u8], PolicyError> {
        self.node
            .raw
            .as_deref()
            .ok_or_else(|| self.error("missing encoding"))
    }

    /// XML text of this element, or of its `Identifier` child.
    fn xml_text(&self) -> String {
        let identifier = self
            .node
            .children()
            .iter()
            .find(|child| child.element_name() == Some("Identifier"));
        identifier.unwrap_or(self.node).text_content().trim().to_owned()
    }

    /// Dotted object identifier.
    pub(crate) fn oid(&self) -> Result<String, PolicyError> {
        match self.node.encoding() {
            PolicyEncoding::Der => {
                self.primitive(TAG_OID)?;
                let oid: rasn::types::ObjectIdentifier = rasn::der::decode(self.raw()?)
                    .map_err(|e| self.error(format!("invalid OBJECT IDENTIFIER: {e}")))?;
                Ok(asn1::oid_to_string(&oid))
            }
            PolicyEncoding::Xml => {
                let text = self.xml_text();
                let dotted = strip_urn_oid(&text).unwrap_or(&text).to_owned();
                asn1::parse_oid(&dotted)
                    .map(|_| dotted.clone())
                    .ok_or_else(|| self.error(format!("invalid object identifier {text:?}")))
            }
        }
    }

    pub(crate) fn time(&self) -> Result<DateTime<Utc>, PolicyError> {
        match self.node.encoding() {
            PolicyEncoding::Der => match self.node.label {
                Label::Universal(TAG_GENERALIZED_TIME) => {
                    let time: rasn::types::GeneralizedTime = rasn::der::decode(self.raw()?)
                        .map_err(|e| self.error(format!("invalid GeneralizedTime: {e}")))?;
                    Ok(asn1::generalized_time_to_utc(&time))
                }
                Label::Universal(TAG_UTC_TIME) => rasn::der::decode::<rasn::types::UtcTime>(
                    self.raw()?,
                )
                .map_err(|e| self.error(format!("invalid UTCTime: {e}"))),
                _ => Err(self.error(format!("expected a time, found {}", self.node.describe()))),
            },
            PolicyEncoding::Xml => {
                let text = self.node.text_content();
                let text = text.trim();
                DateTime::parse_from_rfc3339(text)
                    .map(|t| t.with_timezone(&Utc))
                    .or_else(|_| {
                        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                            .map(|t| t.and_utc())
                    })
                    .map_err(|_| self.error(format!("invalid dateTime {text:?}")))
            }
        }
    }

    pub(crate) fn integer(&self) -> Result<i64, PolicyError> {
        match self.node.encoding() {
            PolicyEncoding::Der => {
                self.primitive(TAG_INTEGER)?;
                rasn::der::decode::<i64>(self.raw()?)
                    .map_err(|e| self.error(format!("invalid INTEGER: {e}")))
            }
            PolicyEncoding::Xml => {
                let text = self.node.text_content();
                text.trim()
                    .parse()
                    .map_err(|_| self.error(format!("invalid integer {:?}", text.trim())))
            }
        }
    }

    pub(crate) fn boolean(&self) -> Result<bool, PolicyError> {
        match self.node.encoding() {
            PolicyEncoding::Der => match self.primitive(TAG_BOOLEAN)? {
                [0x00] => Ok(false),
                [0xff] => Ok(true),
                _ => Err(self.error("invalid BOOLEAN")),
            },
            PolicyEncoding::Xml => match self.node.text_content().trim() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                other => Err(self.error(format!("invalid boolean {other:?}"))),
            },
        }
    }

    /// ENUMERATED value; XML names are matched case-insensitively.
    pub(crate) fn enumerated(&self, table: &[(u8, &str)]) -> Result<u8, PolicyError> {
        let value = match self.node.encoding() {
            PolicyEncoding::Der => match self.primitive(TAG_ENUMERATED)? {
                [value] => *value,
                _ => return Err(self.error("ENUMERATED value out of range")),
            },
            PolicyEncoding::Xml => {
                let text = self.node.text_content();
                let text = text.trim();
                table
                    .iter()
                    .find(|(_, name)| name.eq_ignore_ascii_case(text))
                    .map(|(value, _)| *value)
                    .ok_or_else(|| self.error(format!("unknown value {text:?}")))?
            }
        };
        if table.iter().any(|(v, _)| *v == value) {
            Ok(value)
        } else {
            Err(self.error(format!("unknown value {value}")))
        }
    }

    pub(crate) fn octets(&self) -> Result<Vec<u8>, PolicyError> {
        match self.node.encoding() {
            PolicyEncoding::Der => Ok(self.primitive(TAG_OCTET_STRING)?.to_vec()),
            PolicyEncoding::Xml => self.base64(),
        }
    }

    /// Base64 text of an XML element, whitespace ignored.
    pub(crate) fn base64(&self) -> Result<Vec<u8>, PolicyError> {
        use base64::{engine::general_purpose, Engine as _};

        let text: String = self
            .node
            .text_content()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        general_purpose::STANDARD
            .decode(text)
            .map_err(|e| self.error(format!("invalid base64: {e}")))
    }

    /// DirectoryString or XML text.
    pub(crate) fn text(&self) -> Result<String, PolicyError> {
        let (tag, bytes) = match (&self.node.label, &self.node.content) {
            (Label::Element(_), _) => return Ok(self.node.text_content().trim().to_owned()),
            (Label::Universal(tag), Content::Primitive(bytes)) => (*tag, bytes),
            _ => return Err(self.error(format!("expected a string, found {}", self.node.describe()))),
        };

        match tag {
            TAG_UTF8_STRING | TAG_PRINTABLE_STRING | TAG_TELETEX_STRING | TAG_IA5_STRING => {
                String::from_utf8(bytes.clone()).map_err(|_| self.error("invalid string encoding"))
            }
            TAG_BMP_STRING => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|_| self.error("invalid BMPString"))
            }
            TAG_UNIVERSAL_STRING => bytes
                .chunks_exact(4)
                .map(|quad| char::from_u32(u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]])))
                .collect::<Option<String>>()
                .ok_or_else(|| self.error("invalid UniversalString")),
            _ => Err(self.error(format!("expected a string, found universal tag {tag}"))),
        }
    }

    /// GeneralNames rendered as text; XML holds the text directly.
    pub(crate) fn general_names(&self) -> Result<String, PolicyError> {
        if self.node.encoding() == PolicyEncoding::Xml {
            return Ok(self.node.text_content().trim().to_owned());
        }

        let mut names = Vec::new();
        for (i, name) in self.fields()?.items.iter().enumerate() {
            let field = Field::new(name, format!("{}/GeneralName[{i}]", self.path));
            names.push(field.general_name()?);
        }
        Ok(names.join(", "))
    }

    fn general_name(&self) -> Result<String, PolicyError> {
        use x509_parser::{prelude::FromDer, x509::X509Name};

        match (&self.node.label, &self.node.content) {
            // directoryName is explicitly tagged because Name is a CHOICE
            (Label::Context(4), Content::Children(inner)) => {
                let raw = inner
                    .first()
                    .and_then(|n| n.raw.as_deref())
                    .ok_or_else(|| self.error("empty directoryName"))?;
                let (_, name) = X509Name::from_der(raw)
                    .map_err(|e| self.error(format!("invalid directoryName: {e}")))?;
                Ok(name.to_string())
            }
            (Label::Context(1 | 2 | 6), Content::Primitive(bytes)) => {
                String::from_utf8(bytes.clone()).map_err(|_| self.error("invalid IA5String"))
            }
            _ => Ok(hex::encode(self.raw()?)),
        }
    }

    /// Complete DER encoding of the field, or base64 text in XML.
    pub(crate) fn encoded(&self) -> Result<Vec<u8>, PolicyError> {
        match self.node.encoding() {
            PolicyEncoding::Der => Ok(self.raw()?.to_vec()),
            PolicyEncoding::Xml => self.base64(),
        }
    }

    /// Field kept as found: raw DER, or the element's text in XML.
    pub(crate) fn opaque(&self) -> Result<Vec<u8>, PolicyError> {
        match self.node.encoding() {
            PolicyEncoding::Der => Ok(self.raw()?.to_vec()),
            PolicyEncoding::Xml => Ok(self.node.text_content().trim().as_bytes().to_vec()),
        }
    }

    pub(crate) fn null(&self) -> Result<(), PolicyError> {
        match self.node.encoding() {
            PolicyEncoding::Der => self.primitive(TAG_NULL).map(|_| ()),
            PolicyEncoding::Xml => Ok(()),
        }
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&'n str> {
        self.node
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    slots! {
        enum TestSlot {
            First = 0 => ["First"],
            Second = 2 => ["Second", "SecondAlias"],
        }
    }

    fn element(name: &str, content: Content) -> Node {
        Node {
            label: Label::Element(name.to_owned()),
            content,
            raw: None,
            attributes: Vec::new(),
        }
    }

    fn text(name: &str, value: &str) -> Node {
        element(name, Content::Text(value.to_owned()))
    }

    #[test]
    fn slots_follow_tag_order() {
        let root = element(
            "Root",
            Content::Children(vec![text("Second", "1"), text("First", "2")]),
        );
        let mut fields = Fields::new(&root, "Root").unwrap();

        let (slot, field) = fields.next_slot::<TestSlot>().unwrap().unwrap();
        assert_eq!(slot, TestSlot::Second);
        assert_eq!(field.integer().unwrap(), 1);

        let err = fields.next_slot::<TestSlot>().unwrap_err();
        assert!(matches!(err, PolicyError::Decoding { ref path, .. } if path == "Root/First"));
    }

    #[test]
    fn alias_names_select_slot() {
        assert_eq!(TestSlot::from_name("SecondAlias"), Some(TestSlot::Second));
        assert_eq!(TestSlot::from_tag(0), Some(TestSlot::First));
        assert_eq!(TestSlot::from_tag(1), None);
    }

    #[test]
    fn leftover_fields_fail() {
        let root = element(
            "Root",
            Content::Children(vec![text("A", "x"), text("B", "y")]),
        );
        let mut fields = Fields::new(&root, "Root").unwrap();
        fields.required("A").unwrap();

        let err = fields.finish().unwrap_err();
        assert_eq!(err.to_string(), "policy decoding failed at Root: unexpected field <B>");
    }

    #[test]
    fn xml_values() {
        let oid = text("Id", "urn:oid:2.16.76.1.7.1.1.2.3");
        assert_eq!(Field::new(&oid, "Id").oid().unwrap(), "2.16.76.1.7.1.1.2.3");

        let wrapped = element(
            "Id",
            Content::Children(vec![text("Identifier", " 1.2.3 ")]),
        );
        assert_eq!(Field::new(&wrapped, "Id").oid().unwrap(), "1.2.3");

        let mode = text("EnuRevReq", "BothCheck");
        let table = [(0, "clrcheck"), (2, "bothcheck")];
        assert_eq!(Field::new(&mode, "m").enumerated(&table).unwrap(), 2);

        let time = text("T", "2012-03-20T00:00:00Z");
        assert_eq!(
            Field::new(&time, "T").time().unwrap().to_rfc3339(),
            "2012-03-20T00:00:00+00:00"
        );
        let naive = text("T", "2012-03-20T00:00:00");
        assert!(Field::new(&naive, "T").time().is_ok());

        let bad = text("Id", "not-an-oid");
        assert!(Field::new(&bad, "Id").oid().is_err());
    }
}
