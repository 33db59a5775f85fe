//! Remote XML document handle.
//!
//! A [`DocumentHandle`] fetches an XML document over HTTP, keeps the parsed
//! tree together with its query context, and answers extraction queries
//! against it.
//!
//! # Ownership and threading
//!
//! The tree and its query context live in one [`LoadedDocument`] value, so
//! they are created and dropped together. Nodes and query results borrow the
//! handle; `load` and `release` need `&mut self`, so nothing returned by a
//! query can outlive the document it points into. The parsed tree is not
//! `Sync`: use one handle per thread.

use sxd_document::dom::Document;
use sxd_document::{parser, writer, Package};
use sxd_xpath::nodeset::Node;

use crate::config::{validate_url, LoadOptions, NamespaceBinding, IN_MEMORY_BASE};
use crate::error::{Result, XmlError};
use crate::http::{basic_authorization, BlockingFetcher, FetchRequest, HttpFetcher};
use crate::query::{Presence, QueryContext, QueryResult};
use crate::xml::{
    first_child_text, get_attribute, get_content, get_tag_name, node_kind, node_to_string,
    normalize_default_namespace, root_element, starts_text_run, text_run,
};

/// Parsed tree plus the context that evaluates queries against it.
struct LoadedDocument {
    url: String,
    // Declared before `package` so it is dropped first.
    context: QueryContext,
    package: Package,
}

impl LoadedDocument {
    /// Parse normalized text and bind a query context to it.
    fn parse(url: &str, xml: &str, namespaces: &[NamespaceBinding]) -> Result<Self> {
        let package = parser::parse(xml).map_err(|e| XmlError::XmlReadMemory {
            url: url.to_string(),
            message: format!("{IN_MEMORY_BASE}: {e}"),
        })?;

        let mut context = QueryContext::for_document(&package.as_document()).ok_or_else(|| {
            XmlError::ContextCreation {
                url: url.to_string(),
            }
        })?;
        for binding in namespaces {
            context.register_namespace(&binding.prefix, &binding.uri);
        }

        Ok(Self {
            url: url.to_string(),
            context,
            package,
        })
    }
}

/// Owns a fetched XML document and offers XPath-based extraction.
///
/// # Examples
/// ```
/// use remote_xml::{DocumentHandle, Presence};
///
/// let mut doc = DocumentHandle::new().unwrap();
/// doc.load_str(
///     "inline",
///     r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry id="1"><title>Hello</title></entry></feed>"#,
///     &[],
/// )
/// .unwrap();
///
/// assert_eq!(doc.text("//entry/title/text()", None, Presence::Required).unwrap(), "Hello");
/// assert_eq!(doc.attribute_at("//entry", "id", None, Presence::Required).unwrap(), "1");
/// assert!(!doc.exists("//missing", None, Presence::Optional).unwrap());
/// ```
pub struct DocumentHandle<F: HttpFetcher = BlockingFetcher> {
    fetcher: F,
    source_xml: String,
    loaded: Option<LoadedDocument>,
}

impl DocumentHandle<BlockingFetcher> {
    /// Create an empty handle backed by a reqwest client.
    pub fn new() -> Result<Self> {
        let fetcher = BlockingFetcher::new().map_err(XmlError::Client)?;
        Ok(Self::with_fetcher(fetcher))
    }
}

impl<F: HttpFetcher> DocumentHandle<F> {
    /// Create an empty handle that retrieves documents through `fetcher`.
    pub fn with_fetcher(fetcher: F) -> Self {
        Self {
            fetcher,
            source_xml: String::new(),
            loaded: None,
        }
    }

    /// Drop the current tree and query context, if any.
    ///
    /// Safe to call on an empty handle and any number of times.
    pub fn release(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            tracing::debug!(url = %loaded.url, "Releasing XML document");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Raw text of the last fetch, before namespace rewriting.
    ///
    /// Kept even when parsing that text failed.
    pub fn source_xml(&self) -> &str {
        &self.source_xml
    }

    /// URL (or source name) of the loaded document.
    pub fn url(&self) -> Option<&str> {
        self.loaded.as_ref().map(|loaded| loaded.url.as_str())
    }

    /// Fetch, parse and index the document at `url`.
    ///
    /// Any previously loaded document is released first. On failure the
    /// handle is left empty.
    pub fn load(&mut self, url: &str, options: &LoadOptions) -> Result<()> {
        self.release();

        let result = self.fetch_and_parse(url, options);
        if let Err(e) = &result {
            tracing::error!(url, error = %e, "Failed to load XML document");
        }
        result
    }

    fn fetch_and_parse(&mut self, url: &str, options: &LoadOptions) -> Result<()> {
        validate_url(url)?;

        let authorization = basic_authorization(&options.user, &options.password);
        let request = FetchRequest {
            url,
            timeout: options.timeout(),
            authorization: authorization.as_deref(),
            extra_headers: &options.extra_headers,
            body: "",
            max_retries: options.max_retries,
            retry_delay: options.retry_delay(),
        };

        tracing::debug!(url, "Fetching XML document");
        self.source_xml = self.fetcher.get(&request).map_err(|source| XmlError::Fetch {
            url: url.to_string(),
            source,
        })?;

        self.parse_source(url, &options.namespaces)
    }

    /// Parse XML the caller already holds, as if it had been fetched.
    ///
    /// `source` names the document in error messages and logs.
    pub fn load_str(
        &mut self,
        source: &str,
        xml: &str,
        namespaces: &[NamespaceBinding],
    ) -> Result<()> {
        self.release();
        self.source_xml = xml.to_string();

        let result = self.parse_source(source, namespaces);
        if let Err(e) = &result {
            tracing::error!(url = source, error = %e, "Failed to load XML document");
        }
        result
    }

    fn parse_source(&mut self, url: &str, namespaces: &[NamespaceBinding]) -> Result<()> {
        let xml = normalize_default_namespace(&self.source_xml);
        let loaded = LoadedDocument::parse(url, &xml, namespaces)?;
        tracing::debug!(
            url,
            bytes = self.source_xml.len(),
            namespaces = namespaces.len(),
            "Loaded XML document"
        );
        self.loaded = Some(loaded);
        Ok(())
    }

    fn loaded(&self) -> Result<&LoadedDocument> {
        self.loaded.as_ref().ok_or_else(|| {
            tracing::error!("Document not initialized");
            XmlError::NotInitialized
        })
    }

    fn document(&self) -> Result<Document<'_>> {
        Ok(self.loaded()?.package.as_document())
    }

    /// Root element of the loaded document.
    pub fn root_node(&self) -> Result<Node<'_>> {
        let loaded = self.loaded()?;
        // The context is only created for documents with a root element.
        root_element(&loaded.package.as_document())
            .map(Node::from)
            .ok_or_else(|| XmlError::ContextCreation {
                url: loaded.url.clone(),
            })
    }

    /// Evaluate an XPath expression.
    ///
    /// The expression is evaluated relative to `start`, or to the root
    /// element when `start` is `None`. An empty node-set is an error
    /// ([`XmlError::NoMatch`]), as is a compile or evaluation failure
    /// ([`XmlError::QueryFailed`]). Failures are logged unless `presence` is
    /// [`Presence::Optional`]; the error is returned either way.
    ///
    /// `start` must come from this handle. A node of another document is
    /// rejected with [`XmlError::QueryFailed`].
    pub fn query<'d>(
        &'d self,
        expression: &str,
        start: Option<Node<'d>>,
        presence: Presence,
    ) -> Result<QueryResult<'d>> {
        let loaded = self.loaded()?;
        let start = match start {
            Some(node) => node,
            None => self.root_node()?,
        };

        let evaluated = if start.document() == loaded.package.as_document() {
            loaded.context.evaluate(expression, start)
        } else {
            Err("Starting node belongs to another document".to_string())
        };

        let result = match evaluated {
            Ok(result) if result.is_empty_node_set() => Err(XmlError::NoMatch {
                expression: expression.to_string(),
            }),
            Ok(result) => Ok(result),
            Err(reason) => Err(XmlError::QueryFailed {
                expression: expression.to_string(),
                reason,
            }),
        };

        if let Err(e) = &result {
            if !presence.is_optional() {
                tracing::error!(
                    expression,
                    node_dump = %node_to_string(start),
                    error = %e,
                    "XPath query failed"
                );
            }
        }
        result
    }

    /// Read an attribute of an element node.
    ///
    /// A missing attribute resolves to `""` under [`Presence::Optional`];
    /// otherwise it is logged with the node's tag name and returned as
    /// [`XmlError::AttributeNotFound`].
    pub fn attribute(&self, node: Node<'_>, name: &str, presence: Presence) -> Result<String> {
        match get_attribute(node, name) {
            Some(value) => Ok(value.to_string()),
            None if presence.is_optional() => Ok(String::new()),
            None => {
                tracing::error!(
                    node = get_tag_name(node),
                    attribute = name,
                    "Attribute not found"
                );
                Err(missing_attribute(node, name))
            }
        }
    }

    /// Read an attribute of the first node matched by `expression`.
    pub fn attribute_at<'d>(
        &'d self,
        expression: &str,
        name: &str,
        start: Option<Node<'d>>,
        presence: Presence,
    ) -> Result<String> {
        let value = self
            .query(expression, start, presence)
            .and_then(|result| match result.first_node() {
                Some(node) => self.attribute(node, name, presence),
                None => Err(unsupported(expression, &result)),
            });
        resolve(value, presence, String::new)
    }

    /// Read the same attribute from every node matched by `expression`, in
    /// document order.
    ///
    /// A node without the attribute fails the whole list; under
    /// [`Presence::Optional`] the whole list resolves to empty.
    pub fn attributes<'d>(
        &'d self,
        expression: &str,
        name: &str,
        start: Option<Node<'d>>,
        presence: Presence,
    ) -> Result<Vec<String>> {
        let values = self.query(expression, start, presence).and_then(|result| {
            result
                .nodes()
                .iter()
                .map(|&node| {
                    get_attribute(node, name)
                        .map(str::to_string)
                        .ok_or_else(|| missing_attribute(node, name))
                })
                .collect::<Result<Vec<_>>>()
                .inspect_err(|e| {
                    if !presence.is_optional() {
                        tracing::error!(expression, error = %e, "Failed to read attribute list");
                    }
                })
        });
        resolve(values, presence, Vec::new)
    }

    /// Extract text from the result of `expression`.
    ///
    /// A string result is returned as is. For a node-set, the first node must
    /// be a text node (its content, joined with directly following text
    /// nodes) or an attribute (its value). Anything else is
    /// [`XmlError::UnsupportedResultShape`], which is returned even under
    /// [`Presence::Optional`].
    pub fn text<'d>(
        &'d self,
        expression: &str,
        start: Option<Node<'d>>,
        presence: Presence,
    ) -> Result<String> {
        let text = self
            .query(expression, start, presence)
            .and_then(|result| match &result {
                QueryResult::String(s) => Ok(s.clone()),
                QueryResult::Nodes(nodes) => match nodes.first() {
                    Some(&Node::Text(text)) => Ok(text_run(text)),
                    Some(&node) => get_content(node)
                        .map(str::to_string)
                        .ok_or_else(|| unsupported(expression, &result)),
                    None => Err(unsupported(expression, &result)),
                },
                _ => Err(unsupported(expression, &result)),
            });
        resolve(text, presence, String::new)
    }

    /// Extract one text entry per node matched by `expression`, in document
    /// order.
    ///
    /// Text nodes give their content, attributes their value and elements the
    /// text of their first child (empty if that child is not text). Adjacent
    /// text nodes split at entity references count as one entry.
    pub fn texts<'d>(
        &'d self,
        expression: &str,
        start: Option<Node<'d>>,
        presence: Presence,
    ) -> Result<Vec<String>> {
        let texts = self.query(expression, start, presence).map(|result| {
            result
                .nodes()
                .iter()
                .filter_map(|&node| match node {
                    Node::Element(element) => Some(first_child_text(element)),
                    // Later nodes of a split text run are already joined
                    Node::Text(text) if !starts_text_run(text) => None,
                    Node::Text(text) => Some(text_run(text)),
                    other => Some(
                        get_content(other)
                            .map(str::to_string)
                            .unwrap_or_else(|| other.string_value()),
                    ),
                })
                .collect()
        });
        resolve(texts, presence, Vec::new)
    }

    /// Check whether `expression` matches at least one node.
    ///
    /// A match failure is `false` under [`Presence::Optional`] and an error
    /// otherwise. A scalar result is `false`.
    pub fn exists<'d>(
        &'d self,
        expression: &str,
        start: Option<Node<'d>>,
        presence: Presence,
    ) -> Result<bool> {
        let found = self
            .query(expression, start, presence)
            .map(|result| !result.nodes().is_empty());
        resolve(found, presence, || false)
    }

    /// Log every attribute of an element at info level.
    pub fn log_attributes(&self, node: Node<'_>) {
        if let Node::Element(element) = node {
            for attribute in element.attributes() {
                tracing::info!(
                    node = get_tag_name(node),
                    attribute = attribute.name().local_part(),
                    value = attribute.value(),
                    "Attribute"
                );
            }
        }
    }

    /// Serialize the whole document back to text.
    ///
    /// Formatting may differ from the fetched text; element names,
    /// attributes and text content are preserved. A default namespace was
    /// renamed to the `mio` prefix on load and no element uses that prefix,
    /// so its declaration is not written and the dump of
    /// `<feed xmlns="urn:a">` starts with a plain `<feed>`.
    pub fn to_xml_string(&self) -> Result<String> {
        let doc = self.document()?;

        let mut buffer = Vec::new();
        writer::format_document(&doc, &mut buffer).map_err(|e| {
            tracing::error!(error = %e, "Document dump failed");
            XmlError::Serialization(e.to_string())
        })?;
        if buffer.is_empty() {
            tracing::error!("Document dump produced no output");
            return Err(XmlError::Allocation);
        }

        String::from_utf8(buffer).map_err(|e| XmlError::Serialization(e.to_string()))
    }

    /// Serialize a single subtree with indentation.
    ///
    /// Needs no loaded context, only a node borrowed from some document.
    pub fn node_to_string(node: Node<'_>) -> String {
        node_to_string(node)
    }
}

fn missing_attribute(node: Node<'_>, name: &str) -> XmlError {
    XmlError::AttributeNotFound {
        node: get_tag_name(node).to_string(),
        attribute: name.to_string(),
    }
}

/// Error for a result that has no text to offer.
fn unsupported(expression: &str, result: &QueryResult<'_>) -> XmlError {
    let shape = match result.first_node() {
        Some(node) => format!("{} node", node_kind(node)),
        None => result.shape().to_string(),
    };
    tracing::error!(expression, shape = %shape, "Cannot read XPath result as text");
    XmlError::UnsupportedResultShape {
        expression: expression.to_string(),
        shape,
    }
}

/// Apply the caller's policy to a recoverable failure.
fn resolve<T>(result: Result<T>, presence: Presence, empty: impl FnOnce() -> T) -> Result<T> {
    match result {
        Err(e) if presence.is_optional() && e.is_recoverable() => Ok(empty()),
        other => other,
    }
}
