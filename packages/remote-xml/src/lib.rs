//! Remote XML - fetch XML documents over HTTP and query them with XPath.
//!
//! A [`DocumentHandle`] downloads a document, rewrites its default namespace
//! so XPath can address it, parses it, and answers attribute, text and
//! existence queries. Each extraction takes a [`Presence`]: optional fields
//! resolve to an empty value when absent, required ones fail with an error
//! that names the expression, node or URL involved.
//!
//! # Example
//!
//! ```
//! use remote_xml::{DocumentHandle, Presence};
//!
//! let mut doc = DocumentHandle::new().unwrap();
//! doc.load_str("inline", r#"<rss><item id="7"><title>News</title></item></rss>"#, &[])
//!     .unwrap();
//!
//! assert_eq!(doc.attribute_at("//item", "id", None, Presence::Required).unwrap(), "7");
//! assert_eq!(doc.text("//item/subtitle/text()", None, Presence::Optional).unwrap(), "");
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Defaults, load options and URL validation
//! - [`error`]: Error types and Result alias
//! - [`http`]: HTTP collaborator trait and reqwest implementation
//! - [`xml`]: Namespace rewriting, node helpers and subtree dumps
//! - [`query`]: XPath context, results and the presence policy
//! - [`document`]: The document handle

pub mod config;
pub mod document;
pub mod error;
pub mod http;
pub mod query;
pub mod xml;

pub use config::{LoadOptions, NamespaceBinding};
pub use document::DocumentHandle;
pub use error::{FetchError, Result, XmlError};
pub use http::{BlockingFetcher, FetchRequest, HttpFetcher};
pub use query::{Presence, QueryResult};
pub use sxd_xpath::nodeset::Node;
