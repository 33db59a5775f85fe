//! Configuration constants, load options and validation functions.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{Result, XmlError};

/// HTTP timeout per attempt, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of fetch attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Pause between fetch attempts, in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 1;

/// Base identifier given to documents parsed from memory.
///
/// A fetched document has no file path, so this name stands in for it in
/// parser diagnostics.
pub const IN_MEMORY_BASE: &str = "noname.xml";

/// Prefix that replaces unnamed default namespace declarations.
pub const DEFAULT_NAMESPACE_PREFIX: &str = "mio";

/// A namespace prefix made available to XPath expressions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamespaceBinding {
    pub prefix: String,
    pub uri: String,
}

impl NamespaceBinding {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }
}

/// Options for [`DocumentHandle::load`](crate::document::DocumentHandle::load).
///
/// Every field has a default, so the struct can be embedded in a caller's
/// configuration file and only the relevant keys spelled out.
///
/// # Examples
/// ```
/// use remote_xml::config::{LoadOptions, NamespaceBinding};
///
/// let options = LoadOptions::default()
///     .basic_auth("user", "secret")
///     .header("Accept: application/xml")
///     .namespace(NamespaceBinding::new("atom", "http://www.w3.org/2005/Atom"));
///
/// assert_eq!(options.max_retries, 3);
/// assert_eq!(options.extra_headers.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Timeout per HTTP attempt, in seconds.
    pub timeout_secs: u64,
    /// Basic authentication user. Empty together with the password means no
    /// `Authorization` header.
    pub user: String,
    pub password: String,
    /// Extra request headers in `Name: value` form, sent verbatim.
    pub extra_headers: Vec<String>,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    /// Prefixes registered in the query context after parsing.
    pub namespaces: Vec<NamespaceBinding>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user: String::new(),
            password: String::new(),
            extra_headers: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            namespaces: Vec::new(),
        }
    }
}

impl LoadOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.extra_headers.push(header.into());
        self
    }

    pub fn retries(mut self, max_retries: u32, delay_secs: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_secs = delay_secs;
        self
    }

    pub fn namespace(mut self, binding: NamespaceBinding) -> Self {
        self.namespaces.push(binding);
        self
    }
}

/// Validate that a URL is absolute and uses http or https.
///
/// # Examples
/// ```
/// use remote_xml::config::validate_url;
///
/// assert!(validate_url("https://example.com/feed.xml").is_ok());
/// assert!(validate_url("ftp://example.com/feed.xml").is_err());
/// assert!(validate_url("feed.xml").is_err());
/// ```
pub fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|_| XmlError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(XmlError::InvalidUrl(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = LoadOptions::default();
        assert_eq!(options.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(options.retry_delay(), Duration::from_secs(1));
        assert!(options.user.is_empty());
        assert!(options.namespaces.is_empty());
    }

    #[test]
    fn test_builder() {
        let options = LoadOptions::default()
            .timeout_secs(5)
            .retries(1, 0)
            .basic_auth("user", "pass")
            .namespace(NamespaceBinding::new("a", "urn:a"));

        assert_eq!(options.timeout_secs, 5);
        assert_eq!(options.max_retries, 1);
        assert_eq!(options.retry_delay_secs, 0);
        assert_eq!(options.user, "user");
        assert_eq!(options.namespaces, vec![NamespaceBinding::new("a", "urn:a")]);
    }

    #[test]
    fn test_deserialize_partial_yaml() {
        let yaml = r#"
timeout_secs: 10
extra_headers:
  - "Accept: application/xml"
namespaces:
  - prefix: atom
    uri: http://www.w3.org/2005/Atom
"#;
        let options: LoadOptions = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(options.timeout_secs, 10);
        assert_eq!(options.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(options.extra_headers, vec!["Accept: application/xml"]);
        assert_eq!(options.namespaces[0].prefix, "atom");
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("http://localhost:8080/a.xml").is_ok());
        assert!(validate_url("https://example.com").is_ok());
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(XmlError::InvalidUrl(_))
        ));
        assert!(matches!(validate_url("not a url"), Err(XmlError::InvalidUrl(_))));
    }
}
