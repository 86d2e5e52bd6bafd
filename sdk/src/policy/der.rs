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

//! DER adapter: builds a [`Node`] tree from BER/DER TLVs.

use super::{
    tree::{Content, Label, Node, MAX_DEPTH},
    PolicyError,
};
use crate::crypto::asn1::{read_all, read_tlv, Tlv};

/// Parses one complete DER value into a tree.
pub(crate) fn parse(der: &[u8]) -> Result<Node, PolicyError> {
    let (tlv, rest) = read_tlv(der).ok_or_else(|| PolicyError::decoding("", "malformed DER"))?;
    if !rest.is_empty() {
        return Err(PolicyError::decoding(
            "",
            format!("{} trailing bytes after the policy", rest.len()),
        ));
    }
    node(&tlv, 0)
}

fn node(tlv: &Tlv<'_>, depth: usize) -> Result<Node, PolicyError> {
    if depth > MAX_DEPTH {
        return Err(PolicyError::decoding("", "nesting too deep"));
    }

    let number = tlv.identifier & 0x1f;
    let label = match tlv.identifier & 0xc0 {
        0x00 => Label::Universal(number),
        0x80 => Label::Context(number),
        _ => Label::Other(tlv.identifier),
    };

    let content = if tlv.is_constructed() {
        let items = read_all(tlv.content)
            .ok_or_else(|| PolicyError::decoding("", "malformed DER inside a structure"))?;
        Content::Children(
            items
                .iter()
                .map(|item| node(item, depth + 1))
                .collect::<Result<_, _>>()?,
        )
    } else {
        Content::Primitive(tlv.content.to_vec())
    };

    Ok(Node {
        label,
        content,
        raw: Some(tlv.raw.to_vec()),
        attributes: Vec::new(),
    })
}
