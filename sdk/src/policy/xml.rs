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

//! XML adapter: builds a [`Node`] tree from element local names.
//!
//! Namespace prefixes are dropped, comments and processing instructions are
//! skipped and mixed content is not supported.

use fast_xml::{events::Event, Reader};

use super::{
    tree::{Content, Label, Node, MAX_DEPTH},
    PolicyError,
};

pub(crate) fn parse(xml: &[u8]) -> Result<Node, PolicyError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    reader.check_end_names(true);

    let mut buf = Vec::new();
    // open elements, innermost last
    let mut stack: Vec<(Node, String)> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader.read_event(&mut buf).map_err(|e| {
            PolicyError::decoding(
                path_of(&stack),
                format!("XML error at {}: {e}", reader.buffer_position()),
            )
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if root.is_some() {
                    return Err(PolicyError::decoding("", "content after the root element"));
                }
                if stack.len() >= MAX_DEPTH {
                    return Err(PolicyError::decoding(path_of(&stack), "nesting too deep"));
                }

                let name = local_name(e.local_name());
                let mut attributes = Vec::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| {
                        PolicyError::decoding(path_of(&stack), format!("bad attribute: {e}"))
                    })?;
                    let value = attr.unescaped_value().map_err(|e| {
                        PolicyError::decoding(path_of(&stack), format!("bad attribute: {e}"))
                    })?;
                    attributes.push((
                        local_name(attr.key),
                        String::from_utf8_lossy(&value).into_owned(),
                    ));
                }

                let node = Node {
                    label: Label::Element(name.clone()),
                    content: Content::Children(Vec::new()),
                    raw: None,
                    attributes,
                };

                if matches!(event, Event::Empty(_)) {
                    close(&mut stack, &mut root, node)?;
                } else {
                    stack.push((node, name));
                }
            }
            Event::Text(ref e) => {
                let text = e.unescaped().map_err(|e| {
                    PolicyError::decoding(path_of(&stack), format!("bad text: {e}"))
                })?;
                append_text(&mut stack, &String::from_utf8_lossy(&text))?;
            }
            Event::CData(e) => {
                let text = e.into_inner();
                append_text(&mut stack, &String::from_utf8_lossy(&text))?;
            }
            Event::End(_) => {
                let (node, _) = stack
                    .pop()
                    .ok_or_else(|| PolicyError::decoding("", "unbalanced end tag"))?;
                close(&mut stack, &mut root, node)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(PolicyError::decoding(path_of(&stack), "unexpected end of document"));
    }
    root.ok_or_else(|| PolicyError::decoding("", "no root element"))
}

fn local_name(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_owned(),
        None => name.into_owned(),
    }
}

fn path_of(stack: &[(Node, String)]) -> String {
    stack
        .iter()
        .map(|(_, name)| name.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

fn append_text(stack: &mut [(Node, String)], text: &str) -> Result<(), PolicyError> {
    let path = path_of(stack);
    let Some((node, _)) = stack.last_mut() else {
        return Ok(());
    };
    match &mut node.content {
        Content::Children(children) if children.is_empty() => {
            node.content = Content::Text(text.to_owned());
            Ok(())
        }
        Content::Text(existing) => {
            existing.push_str(text);
            Ok(())
        }
        _ => Err(PolicyError::decoding(path, "mixed content is not supported")),
    }
}

fn close(
    stack: &mut [(Node, String)],
    root: &mut Option<Node>,
    node: Node,
) -> Result<(), PolicyError> {
    let path = path_of(stack);
    match stack.last_mut() {
        Some((parent, _)) => match &mut parent.content {
            Content::Children(children) => {
                children.push(node);
                Ok(())
            }
            _ => Err(PolicyError::decoding(path, "mixed content is not supported")),
        },
        None => {
            *root = Some(node);
            Ok(())
        }
    }
}
