//! XPath evaluation: error policy, query context and decoded results.

use std::sync::LazyLock;

use regex::Regex;
use sxd_document::dom::Document;
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value};

use crate::config::NamespaceBinding;
use crate::xml::root_element;

/// Whether a queried value must be present.
///
/// `Optional` turns recoverable failures (no match, missing attribute,
/// evaluation error) into an empty value and keeps them out of the error
/// log. `Required` logs and returns the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    #[default]
    Required,
    Optional,
}

impl Presence {
    pub fn is_optional(self) -> bool {
        self == Presence::Optional
    }
}

/// String literal in an expression.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static LITERAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'[^']*'|"[^"]*""#).expect("valid regex"));

/// Prefix of a qualified name (`media:thumbnail`, `@xlink:href`, `m:*`).
/// An axis separator (`child::`) is not a prefix.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PREFIX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w.\-])([\p{L}_][\w.\-]*):[\p{L}_*]").expect("valid regex")
});

/// Result of an XPath expression, borrowing nodes from the loaded document.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<'d> {
    /// Matched nodes in document order.
    Nodes(Vec<Node<'d>>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl<'d> QueryResult<'d> {
    /// Name of the result type, for diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            QueryResult::Nodes(_) => "node-set",
            QueryResult::Boolean(_) => "boolean",
            QueryResult::Number(_) => "number",
            QueryResult::String(_) => "string",
        }
    }

    /// Matched nodes; empty for scalar results.
    pub fn nodes(&self) -> &[Node<'d>] {
        match self {
            QueryResult::Nodes(nodes) => nodes,
            _ => &[],
        }
    }

    pub fn first_node(&self) -> Option<Node<'d>> {
        self.nodes().first().copied()
    }

    pub fn into_nodes(self) -> Vec<Node<'d>> {
        match self {
            QueryResult::Nodes(nodes) => nodes,
            _ => Vec::new(),
        }
    }

    /// `true` for a node-set without nodes.
    pub fn is_empty_node_set(&self) -> bool {
        matches!(self, QueryResult::Nodes(nodes) if nodes.is_empty())
    }
}

impl<'d> From<Value<'d>> for QueryResult<'d> {
    fn from(value: Value<'d>) -> Self {
        match value {
            Value::Nodeset(nodes) => QueryResult::Nodes(nodes.document_order()),
            Value::Boolean(b) => QueryResult::Boolean(b),
            Value::Number(n) => QueryResult::Number(n),
            Value::String(s) => QueryResult::String(s),
        }
    }
}

/// Compiles expressions and evaluates them with the registered prefixes.
///
/// The context owns no document state: the starting node is passed to every
/// [`evaluate`](Self::evaluate) call, so scoping and evaluating cannot be
/// interleaved with another query.
pub struct QueryContext {
    factory: Factory,
    namespaces: Vec<NamespaceBinding>,
}

impl QueryContext {
    /// Create a context for a parsed document.
    ///
    /// # Returns
    /// `None` when the document has no root element to evaluate against
    pub fn for_document(doc: &Document<'_>) -> Option<Self> {
        root_element(doc)?;
        Some(Self {
            factory: Factory::new(),
            namespaces: Vec::new(),
        })
    }

    /// Make `prefix` usable in expressions.
    ///
    /// Best effort: bindings with an empty prefix or URI are skipped.
    ///
    /// # Returns
    /// `true` if the binding was registered
    pub fn register_namespace(&mut self, prefix: &str, uri: &str) -> bool {
        if prefix.is_empty() || uri.is_empty() {
            tracing::warn!(prefix, uri, "Skipping incomplete namespace binding");
            return false;
        }
        self.namespaces.retain(|binding| binding.prefix != prefix);
        self.namespaces.push(NamespaceBinding::new(prefix, uri));
        true
    }

    pub fn namespaces(&self) -> &[NamespaceBinding] {
        &self.namespaces
    }

    /// Compile `expression` and evaluate it with `node` as context node.
    ///
    /// # Returns
    /// The decoded result, or the compiler/evaluator message on failure
    pub fn evaluate<'d>(&self, expression: &str, node: Node<'d>) -> Result<QueryResult<'d>, String> {
        if let Some(prefix) = self.unbound_prefix(expression) {
            return Err(format!("Undefined namespace prefix '{prefix}'"));
        }

        let xpath = self
            .factory
            .build(expression)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "empty expression".to_string())?;

        let mut context = Context::new();
        for binding in &self.namespaces {
            context.set_namespace(&binding.prefix, &binding.uri);
        }

        xpath
            .evaluate(&context, node)
            .map(QueryResult::from)
            .map_err(|e| e.to_string())
    }

    /// First namespace prefix used in `expression` that has no binding.
    ///
    /// The evaluator cannot report an unknown prefix in a name test, so
    /// expressions are checked before they reach it.
    fn unbound_prefix(&self, expression: &str) -> Option<String> {
        let stripped = LITERAL_PATTERN.replace_all(expression, "''");
        for caps in PREFIX_PATTERN.captures_iter(&stripped) {
            let Some(prefix) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if !self.namespaces.iter().any(|binding| binding.prefix == prefix) {
                return Some(prefix.to_string());
            }
        }
        None
    }
}
