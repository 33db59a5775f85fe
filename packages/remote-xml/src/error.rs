//! Error types for remote XML documents.
//!
//! `XmlError` is what library consumers see. `FetchError` belongs to the
//! HTTP collaborator and is wrapped into `XmlError::Fetch` together with the
//! URL that was being loaded.

use thiserror::Error;

/// Main error type for document loading and extraction.
#[derive(Debug, Error)]
pub enum XmlError {
    /// URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid URL: '{0}'. Expected an absolute http(s) URL")]
    InvalidUrl(String),

    /// HTTP client could not be created.
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] FetchError),

    /// HTTP retrieval failed after the fetcher exhausted its retries.
    #[error("Failed to fetch XML from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// Fetched text is not well-formed XML.
    #[error("The xmlReadMemory failed, url: {url}: {message}")]
    XmlReadMemory { url: String, message: String },

    /// Query context could not be bound to the parsed document.
    #[error("Failed to create XPath context for {url}: document has no root element")]
    ContextCreation { url: String },

    /// A query or serialization was attempted before a successful load.
    #[error("Document not initialized")]
    NotInitialized,

    /// The expression selected no nodes.
    #[error("XPath expression matched no nodes: {expression}")]
    NoMatch { expression: String },

    /// The expression did not compile or failed during evaluation.
    #[error("XPath evaluation failed for '{expression}': {reason}")]
    QueryFailed { expression: String, reason: String },

    /// The node has no attribute with the requested name.
    #[error("Attribute '{attribute}' not found on <{node}>")]
    AttributeNotFound { node: String, attribute: String },

    /// The query result cannot be decoded into text.
    #[error("XPath expression '{expression}' was found but its result ({shape}) cannot be read as text")]
    UnsupportedResultShape { expression: String, shape: String },

    /// The document dump produced no output.
    #[error("Document dump produced no output")]
    Allocation,

    /// Writing the document to text failed.
    #[error("XML serialization failed: {0}")]
    Serialization(String),
}

impl XmlError {
    /// Whether the error describes absent data rather than a broken document
    /// or a programming mistake.
    ///
    /// Only recoverable errors are turned into empty values when a call is
    /// made with [`Presence::Optional`](crate::query::Presence::Optional).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            XmlError::NoMatch { .. }
                | XmlError::QueryFailed { .. }
                | XmlError::AttributeNotFound { .. }
        )
    }
}

/// Errors raised by an [`HttpFetcher`](crate::http::HttpFetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request could not be built or sent, and retrying would not help.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a client error.
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// Every attempt hit a transient failure.
    #[error("Giving up after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// Extra header is not in `Name: value` form.
    #[error("Invalid header '{0}'. Expected 'Name: value'")]
    InvalidHeader(String),
}

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, XmlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XmlError::XmlReadMemory {
            url: "https://example.com/feed.xml".to_string(),
            message: "unexpected end".to_string(),
        };
        assert!(err.to_string().contains("https://example.com/feed.xml"));
        assert!(err.to_string().contains("xmlReadMemory"));
    }

    #[test]
    fn test_attribute_not_found_display() {
        let err = XmlError::AttributeNotFound {
            node: "item".to_string(),
            attribute: "id".to_string(),
        };
        assert_eq!(err.to_string(), "Attribute 'id' not found on <item>");
    }

    #[test]
    fn test_fetch_error_keeps_source() {
        let err = XmlError::Fetch {
            url: "https://example.com".to_string(),
            source: FetchError::Status { status: 404 },
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch XML from https://example.com: HTTP status 404"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(XmlError::NoMatch {
            expression: "//a".to_string()
        }
        .is_recoverable());
        assert!(XmlError::AttributeNotFound {
            node: "a".to_string(),
            attribute: "b".to_string()
        }
        .is_recoverable());
        assert!(!XmlError::NotInitialized.is_recoverable());
        assert!(!XmlError::UnsupportedResultShape {
            expression: "count(//a)".to_string(),
            shape: "number".to_string()
        }
        .is_recoverable());
        assert!(!XmlError::Allocation.is_recoverable());
    }
}
