//! Helpers for reading XPath result nodes.

use sxd_document::dom::{ChildOfElement, ChildOfRoot, Document, Element, Text};
use sxd_xpath::nodeset::Node;

/// Get the tag name of a node without namespace prefix.
///
/// Non-element nodes get a pseudo-name (`#text`, `#comment`, ...) so log
/// messages always have something to show.
///
/// # Examples
/// ```
/// use remote_xml::xml::get_tag_name;
/// use sxd_document::parser;
///
/// let package = parser::parse("<root><item/></root>").unwrap();
/// let doc = package.as_document();
/// let root = remote_xml::xml::root_element(&doc).unwrap();
/// assert_eq!(get_tag_name(root.into()), "root");
/// ```
pub fn get_tag_name<'d>(node: Node<'d>) -> &'d str {
    match node {
        Node::Element(element) => element.name().local_part(),
        Node::Attribute(attribute) => attribute.name().local_part(),
        Node::Text(_) => "#text",
        Node::Comment(_) => "#comment",
        Node::ProcessingInstruction(pi) => pi.target(),
        Node::Namespace(_) => "#namespace",
        Node::Root(_) => "#document",
    }
}

/// Short description of a node kind, used in error messages.
pub fn node_kind(node: Node<'_>) -> &'static str {
    match node {
        Node::Element(_) => "element",
        Node::Attribute(_) => "attribute",
        Node::Text(_) => "text",
        Node::Comment(_) => "comment",
        Node::ProcessingInstruction(_) => "processing-instruction",
        Node::Namespace(_) => "namespace",
        Node::Root(_) => "root",
    }
}

/// Get an attribute value from a node.
///
/// # Returns
/// Attribute value, or `None` if not found or the node is not an element
pub fn get_attribute<'d>(node: Node<'d>, name: &str) -> Option<&'d str> {
    match node {
        Node::Element(element) => element.attribute_value(name),
        _ => None,
    }
}

/// Get the content of a text or attribute node.
///
/// # Returns
/// Text content, or `None` for any other node kind
pub fn get_content<'d>(node: Node<'d>) -> Option<&'d str> {
    match node {
        Node::Text(text) => Some(text.text()),
        Node::Attribute(attribute) => Some(attribute.value()),
        _ => None,
    }
}

/// Get the text of an element's first child.
///
/// The parser splits character data at entity and character references, so
/// `Tom &amp; Jerry` is several adjacent text nodes. All of them are joined.
///
/// # Returns
/// The leading text, or an empty string when the element has no children or
/// its first child is not a text node
pub fn first_child_text(element: Element<'_>) -> String {
    leading_text(&element.children())
}

/// Get the text of a text node joined with the text nodes right after it.
pub fn text_run(text: Text<'_>) -> String {
    let mut run = text.text().to_string();
    run.push_str(&leading_text(&text.following_siblings()));
    run
}

/// Whether `text` is the first of a run of adjacent text nodes.
pub fn starts_text_run(text: Text<'_>) -> bool {
    !matches!(
        text.preceding_siblings().last(),
        Some(ChildOfElement::Text(_))
    )
}

fn leading_text(children: &[ChildOfElement<'_>]) -> String {
    children
        .iter()
        .map_while(|child| match child {
            ChildOfElement::Text(text) => Some(text.text()),
            _ => None,
        })
        .collect()
}

/// Find the root element of a document.
pub fn root_element<'d>(doc: &Document<'d>) -> Option<Element<'d>> {
    doc.root().children().into_iter().find_map(|child| match child {
        ChildOfRoot::Element(element) => Some(element),
        _ => None,
    })
}
