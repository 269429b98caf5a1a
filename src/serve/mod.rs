//! Serve-mode content routing over plugin content sources.
//!
//! The router answers development-server requests from the same
//! plugin list a build uses, without touching the output tree. Sources
//! are layered: the router asks every source and the last answer wins,
//! so callers control collision priority purely through source order.
//! [`crate::plugin::PluginPipeline::router`] passes sources in reverse
//! declared order, which makes the earliest-declared plugin win.

use std::sync::Arc;

use percent_encoding::percent_decode_str;

use crate::debug;

/// One piece of servable content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedContent {
    pub body: Vec<u8>,
    /// MIME type for the response, when the source knows it.
    pub content_type: Option<String>,
}

impl ServedContent {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: Some(content_type.into()),
        }
    }
}

/// A plugin's answer table for serve-mode requests.
pub trait ContentSource: Send + Sync {
    /// Content for a normalized request path, if this source has it.
    fn lookup(&self, path: &str) -> Option<ServedContent>;
}

/// What the router decided for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Content(ServedContent),
    /// The path misses but its directory form hits; the client should
    /// re-request at the given location.
    Redirect(String),
    NotFound,
}

/// Layered lookup over an ordered source list.
pub struct ContentRouter {
    sources: Vec<Arc<dyn ContentSource>>,
}

impl ContentRouter {
    /// Router over `sources`; on collisions the last listed source
    /// wins.
    pub fn new(sources: Vec<Arc<dyn ContentSource>>) -> Self {
        Self { sources }
    }

    /// Answer one request.
    ///
    /// The raw path is normalized first (percent-decoding, query and
    /// fragment stripped, leading slash enforced). A miss on a path
    /// without a trailing slash retries the directory form and
    /// redirects on a hit there.
    pub fn route(&self, raw_path: &str) -> RouteOutcome {
        let path = normalize_request_path(raw_path);
        debug!("serve"; "{raw_path} -> {path}");

        if let Some(content) = self.lookup_layered(&path) {
            return RouteOutcome::Content(content);
        }

        if !path.ends_with('/') {
            let directory = format!("{path}/");
            if self.lookup_layered(&directory).is_some() {
                return RouteOutcome::Redirect(directory);
            }
        }

        RouteOutcome::NotFound
    }

    fn lookup_layered(&self, path: &str) -> Option<ServedContent> {
        self.sources
            .iter()
            .filter_map(|source| source.lookup(path))
            .last()
    }
}

/// Decode and strip a raw request path down to a canonical lookup key.
fn normalize_request_path(raw: &str) -> String {
    let trimmed = raw
        .split(['?', '#'])
        .next()
        .unwrap_or(raw);
    let decoded = percent_decode_str(trimmed).decode_utf8_lossy();
    if decoded.starts_with('/') {
        decoded.into_owned()
    } else {
        format!("/{decoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rustc_hash::FxHashMap;

    struct MapSource(FxHashMap<&'static str, &'static str>);

    impl MapSource {
        fn new(entries: &[(&'static str, &'static str)]) -> Arc<Self> {
            Arc::new(Self(entries.iter().copied().collect()))
        }
    }

    impl ContentSource for MapSource {
        fn lookup(&self, path: &str) -> Option<ServedContent> {
            self.0.get(path).map(|body| ServedContent::new(*body))
        }
    }

    #[test]
    fn test_routes_to_matching_source() {
        let router = ContentRouter::new(vec![MapSource::new(&[("/style.css", "body{}")])]);

        assert_eq!(
            router.route("/style.css"),
            RouteOutcome::Content(ServedContent::new("body{}"))
        );
        assert_eq!(router.route("/missing.css"), RouteOutcome::NotFound);
    }

    #[test]
    fn test_last_source_wins_collisions() {
        let router = ContentRouter::new(vec![
            MapSource::new(&[("/app.js", "older layer")]),
            MapSource::new(&[("/app.js", "newer layer")]),
        ]);

        assert_eq!(
            router.route("/app.js"),
            RouteOutcome::Content(ServedContent::new("newer layer"))
        );
    }

    #[test]
    fn test_query_and_fragment_stripped() {
        let router = ContentRouter::new(vec![MapSource::new(&[("/page/", "html")])]);

        assert_eq!(
            router.route("/page/?v=3#section"),
            RouteOutcome::Content(ServedContent::new("html"))
        );
    }

    #[test]
    fn test_percent_decoding() {
        let router = ContentRouter::new(vec![MapSource::new(&[("/hello world/", "spaced")])]);

        assert_eq!(
            router.route("/hello%20world/"),
            RouteOutcome::Content(ServedContent::new("spaced"))
        );
    }

    #[test]
    fn test_trailing_slash_miss_redirects() {
        let router = ContentRouter::new(vec![MapSource::new(&[("/docs/", "index")])]);

        assert_eq!(
            router.route("/docs"),
            RouteOutcome::Redirect("/docs/".to_string())
        );
    }

    #[test]
    fn test_no_redirect_without_directory_form() {
        let router = ContentRouter::new(vec![MapSource::new(&[("/docs/", "index")])]);

        assert_eq!(router.route("/other"), RouteOutcome::NotFound);
    }
}
