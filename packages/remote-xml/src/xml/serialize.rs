//! Indented dump of a single subtree.
//!
//! `sxd_document::writer` only writes whole documents, so subtrees used in
//! diagnostics are written through `quick_xml::Writer`. Namespaces are
//! expressed by re-declaring the default namespace wherever an element's
//! namespace differs from its parent's; attribute names are written without
//! prefix.

use std::io;

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Element};
use sxd_xpath::nodeset::Node;

const INDENT_SIZE: usize = 2;

/// Serialize a node and its descendants.
///
/// Whitespace between child elements is replaced by one child per line.
/// Text is never re-indented: a line break is only added after markup.
///
/// # Examples
/// ```
/// use remote_xml::xml::{node_to_string, root_element};
/// use sxd_document::parser;
///
/// let package = parser::parse("<a><b x=\"1\">t</b><c/></a>").unwrap();
/// let doc = package.as_document();
/// let root = root_element(&doc).unwrap();
/// assert_eq!(node_to_string(root.into()), "<a>\n  <b x=\"1\">t</b>\n  <c/>\n</a>");
/// ```
pub fn node_to_string(node: Node<'_>) -> String {
    match node {
        Node::Attribute(attribute) => format!(
            "{}=\"{}\"",
            attribute.name().local_part(),
            escape_attribute(attribute.value())
        ),
        Node::Namespace(namespace) => format!(
            "xmlns:{}=\"{}\"",
            namespace.prefix(),
            escape_attribute(namespace.uri())
        ),
        other => {
            let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE);
            if let Err(e) = write_node(&mut writer, other, None) {
                tracing::warn!(error = %e, "Node dump failed");
            }
            String::from_utf8_lossy(&writer.into_inner()).into_owned()
        }
    }
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    node: Node<'_>,
    parent_ns: Option<&str>,
) -> io::Result<()> {
    match node {
        Node::Element(element) => write_element(writer, element, parent_ns),
        Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text.text()))),
        Node::Comment(comment) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(comment.text())))
        }
        Node::ProcessingInstruction(pi) => {
            let content = match pi.value() {
                Some(value) => format!("{} {value}", pi.target()),
                None => pi.target().to_string(),
            };
            writer.write_event(Event::PI(BytesPI::new(content)))
        }
        Node::Root(root) => {
            for child in root.children() {
                let child = match child {
                    ChildOfRoot::Element(e) => Node::Element(e),
                    ChildOfRoot::Comment(c) => Node::Comment(c),
                    ChildOfRoot::ProcessingInstruction(p) => Node::ProcessingInstruction(p),
                };
                write_node(writer, child, None)?;
            }
            Ok(())
        }
        Node::Attribute(_) | Node::Namespace(_) => writer.write_event(Event::Text(
            BytesText::from_escaped(node_to_string(node)),
        )),
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: Element<'_>,
    parent_ns: Option<&str>,
) -> io::Result<()> {
    let name = element.name();
    let ns = name.namespace_uri();

    let mut start = BytesStart::new(name.local_part());
    if ns != parent_ns {
        start.push_attribute(("xmlns", ns.unwrap_or_default()));
    }
    for attribute in element.attributes() {
        let value = escape_attribute(attribute.value());
        start.push_attribute(Attribute::from((
            attribute.name().local_part().as_bytes(),
            value.as_bytes(),
        )));
    }

    let children: Vec<Node<'_>> = element.children().into_iter().map(child_node).collect();
    if children.is_empty() {
        return writer.write_event(Event::Empty(start));
    }
    writer.write_event(Event::Start(start))?;

    let element_only = children.iter().all(|child| match child {
        Node::Text(text) => text.text().trim().is_empty(),
        _ => true,
    });
    for child in children {
        if element_only && matches!(child, Node::Text(_)) {
            continue;
        }
        write_node(writer, child, ns)?;
    }

    writer.write_event(Event::End(BytesEnd::new(name.local_part())))
}

fn child_node(child: ChildOfElement<'_>) -> Node<'_> {
    match child {
        ChildOfElement::Element(e) => Node::Element(e),
        ChildOfElement::Text(t) => Node::Text(t),
        ChildOfElement::Comment(c) => Node::Comment(c),
        ChildOfElement::ProcessingInstruction(p) => Node::ProcessingInstruction(p),
    }
}

/// Escape markup characters plus the whitespace a parser would normalize
/// inside an attribute value.
fn escape_attribute(value: &str) -> String {
    escape(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}
