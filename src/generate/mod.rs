//! Reachability crawler: render every page the entry set can reach.
//!
//! The crawl maintains two structures. The frontier holds paths
//! discovered but not yet rendered (FIFO, so builds are deterministic
//! and reproducible); the visited set holds every path ever seen and
//! only grows. A path enters the frontier at most once, which is what
//! terminates crawls over cyclic link graphs.
//!
//! Each pending page is rendered through the streaming renderer under
//! the shared deadline and committed atomically; links emitted during
//! rendering are canonicalized against the page's own URL, filtered
//! to unseen internal ones, and enqueued. The first failure of any
//! render, stream, or commit aborts the whole crawl.

mod links;

pub use links::LinkSink;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::commit::commit_stream;
use crate::core::{PagePath, canonicalize_href};
use crate::error::{CommitFailure, GenerateError, RenderError};
use crate::log;
use crate::render::{Markup, render_to_stream};

/// One render call's output: opaque markup plus consumer-defined
/// metadata (e.g. sitemap priority) that is carried through to the
/// generation result untouched.
pub struct RenderedPage {
    pub markup: Markup,
    pub metadata: serde_json::Value,
}

impl RenderedPage {
    pub fn new(markup: Markup) -> Self {
        Self {
            markup,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(markup: Markup, metadata: serde_json::Value) -> Self {
        Self { markup, metadata }
    }
}

/// Record of one committed page. The generation result lists these in
/// render order.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPage {
    pub path: PagePath,
    pub metadata: serde_json::Value,
}

/// Page render callback.
///
/// Called exactly once per discovered path. Links emitted during
/// markup production go through the supplied [`LinkSink`]; the
/// callback must not mutate crawl state in any other way.
pub type RenderFn<'a> =
    dyn Fn(&PagePath, &LinkSink) -> anyhow::Result<RenderedPage> + Send + Sync + 'a;

/// Crawl configuration.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Crawl starting points, rendered in the order given. Must all
    /// resolve internally.
    pub entry_paths: Vec<String>,
    /// Root of the output tree. Expected to be cleared by the
    /// invoking layer before a build.
    pub output_dir: PathBuf,
    /// Per-page wall-clock render deadline.
    pub render_deadline: Option<Duration>,
}

impl GenerateOptions {
    /// Options with the default entry set (`/`) and no deadline.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            entry_paths: vec!["/".to_string()],
            output_dir: output_dir.into(),
            render_deadline: None,
        }
    }
}

/// Map a page path to its output file.
///
/// Paths ending in `.html` map directly; everything else is treated
/// as a directory (with or without its trailing slash) and maps to an
/// `index.html` inside it.
fn output_file(output_dir: &Path, path: &PagePath) -> PathBuf {
    let relative = path.as_str().trim_start_matches('/');
    if relative.is_empty() {
        output_dir.join("index.html")
    } else if path.has_suffix(".html") {
        output_dir.join(relative)
    } else {
        output_dir
            .join(relative.trim_end_matches('/'))
            .join("index.html")
    }
}

/// Render every page reachable from the entry set into
/// `options.output_dir`.
///
/// Returns one [`GeneratedPage`] per committed page, in render order.
/// Each unique canonical path is rendered exactly once; the first
/// failure aborts the crawl with the offending path attached.
pub async fn generate_site(
    render: &RenderFn<'_>,
    options: &GenerateOptions,
) -> Result<Vec<GeneratedPage>, GenerateError> {
    let mut frontier: VecDeque<PagePath> = VecDeque::new();
    let mut visited: FxHashSet<PagePath> = FxHashSet::default();

    for entry in &options.entry_paths {
        let canonical = canonicalize_href(entry, None);
        if !canonical.is_internal {
            return Err(GenerateError::ExternalEntry {
                path: entry.clone(),
            });
        }
        if visited.insert(canonical.path.clone()) {
            frontier.push_back(canonical.path);
        }
    }

    let mut generated = Vec::new();

    while let Some(path) = frontier.pop_front() {
        // Re-resolve so the page's own URL serves as the base for the
        // relative links it emits.
        let page = canonicalize_href(path.as_str(), None);

        let target = output_file(&options.output_dir, &path);
        log!("render"; "{} -> {}", path, target.display());

        let sink = LinkSink::new();
        let rendered = render(&path, &sink).map_err(|error| GenerateError::Render {
            path: path.to_string(),
            cause: error,
        })?;

        let stream = render_to_stream(rendered.markup, options.render_deadline);
        commit_stream(&target, stream)
            .await
            .map_err(|failure| match failure {
                CommitFailure::Render(RenderError::Timeout(deadline)) => {
                    GenerateError::RenderTimeout {
                        path: path.to_string(),
                        deadline,
                    }
                }
                CommitFailure::Render(RenderError::Failed(cause)) => GenerateError::Render {
                    path: path.to_string(),
                    cause,
                },
                CommitFailure::Io(source) => GenerateError::Commit {
                    path: path.to_string(),
                    source,
                },
            })?;

        for href in sink.drain() {
            let link = canonicalize_href(&href, Some(&page.url));
            if !link.is_internal || visited.contains(&link.path) {
                continue;
            }
            visited.insert(link.path.clone());
            frontier.push_back(link.path);
        }

        generated.push(GeneratedPage {
            path,
            metadata: rendered.metadata,
        });
    }

    Ok(generated)
}
