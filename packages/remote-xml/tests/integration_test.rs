//! End-to-end tests against a mock HTTP server.
//!
//! The blocking fetcher runs inside `spawn_blocking`, the way async callers
//! are expected to use it.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use remote_xml::{
    DocumentHandle, FetchError, LoadOptions, NamespaceBinding, Presence, XmlError,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Load fixture file content.
fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}

fn media_options() -> LoadOptions {
    LoadOptions::default()
        .retries(3, 0)
        .namespace(NamespaceBinding::new("media", "http://search.yahoo.com/mrss/"))
}

/// Load `url` on a blocking thread and run `extract` against the document.
async fn load_and_extract<T, F>(url: String, options: LoadOptions, extract: F) -> remote_xml::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&DocumentHandle) -> remote_xml::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut doc = DocumentHandle::new()?;
        doc.load(&url, &options)?;
        extract(&doc)
    })
    .await
    .expect("blocking task panicked")
}

#[tokio::test]
async fn test_load_feed_with_auth_and_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("x-api-key", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("feed.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = media_options()
        .basic_auth("user", "pass")
        .header("X-Api-Key: abc123");
    let url = format!("{}/feed.xml", mock_server.uri());

    let (titles, videos, thumbnail) = load_and_extract(url, options, |doc| {
        let titles = doc.texts("//entry/title", None, Presence::Required)?;
        let videos = doc.attributes("//media:content", "url", None, Presence::Required)?;
        let thumbnail = doc.attribute_at(
            "//entry[@id='v2']//media:thumbnail",
            "url",
            None,
            Presence::Optional,
        )?;
        Ok((titles, videos, thumbnail))
    })
    .await
    .expect("load should succeed");

    assert_eq!(
        titles,
        vec!["Opening keynote", "Panel discussion", "Closing remarks"]
    );
    assert_eq!(
        videos,
        vec![
            "https://cdn.example.com/v1.mp4",
            "https://cdn.example.com/v2.mp4"
        ]
    );
    assert_eq!(thumbnail, "");
}

#[tokio::test]
async fn test_retries_after_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("feed.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/feed.xml", mock_server.uri());
    let exists = load_and_extract(url, media_options(), |doc| {
        doc.exists("//entry[@id='v3']", None, Presence::Required)
    })
    .await
    .expect("second attempt should succeed");

    assert!(exists);
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let url = format!("{}/feed.xml", mock_server.uri());
    let options = LoadOptions::default().retries(2, 0);
    let err = load_and_extract(url, options, |_| Ok(()))
        .await
        .expect_err("all attempts fail");

    assert!(matches!(
        err,
        XmlError::Fetch {
            source: FetchError::RetriesExhausted { attempts: 2, .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing.xml", mock_server.uri());
    let err = load_and_extract(url, media_options(), |_| Ok(()))
        .await
        .expect_err("404 should fail");

    assert!(matches!(
        err,
        XmlError::Fetch {
            source: FetchError::Status { status: 404 },
            ..
        }
    ));
}

#[tokio::test]
async fn test_malformed_body_reports_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<feed><entry></feed>"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/broken.xml", mock_server.uri());
    let err = load_and_extract(url.clone(), media_options(), |_| Ok(()))
        .await
        .expect_err("parse should fail");

    assert!(matches!(err, XmlError::XmlReadMemory { .. }));
    assert!(err.to_string().contains(&url));
}

#[tokio::test]
async fn test_round_trip_of_fetched_document() {
    let mock_server = MockServer::start().await;
    let fixture = load_fixture("feed.xml");

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixture.clone()))
        .mount(&mock_server)
        .await;

    let url = format!("{}/feed.xml", mock_server.uri());
    let dumped = load_and_extract(url, media_options(), |doc| doc.to_xml_string())
        .await
        .expect("dump should succeed");

    let original = roxmltree::Document::parse(&fixture).expect("fixture parses");
    let reparsed = roxmltree::Document::parse(&dumped).expect("dump parses");

    let names = |doc: &roxmltree::Document<'_>| -> Vec<String> {
        doc.descendants()
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name().to_string())
            .collect()
    };
    let texts = |doc: &roxmltree::Document<'_>| -> Vec<String> {
        doc.descendants()
            .filter_map(|n| n.text().filter(|_| n.is_text()))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    };
    let urls = |doc: &roxmltree::Document<'_>| -> Vec<String> {
        doc.descendants()
            .filter_map(|n| n.attribute("url"))
            .map(str::to_string)
            .collect()
    };

    assert_eq!(names(&reparsed), names(&original));
    assert_eq!(texts(&reparsed), texts(&original));
    assert_eq!(urls(&reparsed), urls(&original));
}
