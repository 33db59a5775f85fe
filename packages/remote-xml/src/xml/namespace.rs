//! Default namespace rewriting.
//!
//! XPath 1.0 has no way to address elements in an unnamed default
//! namespace. Before parsing, every `xmlns=` declaration is turned into a
//! named `xmlns:mio=` declaration, which leaves the unprefixed elements in no
//! namespace so plain expressions like `//entry/title` match them.
//!
//! The rewrite is textual. It also hits `xmlns=` inside comments, CDATA
//! sections and attribute values, and breaks an element that already
//! declares the `mio` prefix next to a default namespace.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::DEFAULT_NAMESPACE_PREFIX;

/// Default namespace declaration: `xmlns` followed by `=`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DEFAULT_NAMESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bxmlns\s*=").expect("valid regex"));

/// Rename every default namespace declaration to the `mio` prefix.
///
/// Returns the input unchanged (borrowed) when there is nothing to rewrite.
///
/// # Examples
/// ```
/// use remote_xml::xml::normalize_default_namespace;
///
/// let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry/></feed>"#;
/// assert_eq!(
///     normalize_default_namespace(xml),
///     r#"<feed xmlns:mio="http://www.w3.org/2005/Atom"><entry/></feed>"#
/// );
/// ```
pub fn normalize_default_namespace(xml: &str) -> Cow<'_, str> {
    DEFAULT_NAMESPACE_PATTERN.replace_all(xml, format!("xmlns:{DEFAULT_NAMESPACE_PREFIX}="))
}
