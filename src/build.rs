//! Full-build orchestration: plugin phases around the crawl.
//!
//! A build clears the output tree, runs the pre-build plugin phase,
//! aggregates injectable head content, crawls and commits every
//! reachable page, then runs the post-build phase over the committed
//! page list. Any phase failure aborts the rest of the build.

use std::io;
use std::path::Path;

use crate::core::{PagePath, SiteMeta};
use crate::error::GenerateError;
use crate::generate::{GenerateOptions, GeneratedPage, LinkSink, RenderedPage, generate_site};
use crate::log;
use crate::plugin::{BuildContext, InjectableSet, PluginPipeline, PostBuildContext};

/// Site-level render callback: like [`crate::generate::RenderFn`] but
/// additionally handed the aggregated head content.
pub type SiteRenderFn =
    dyn Fn(&PagePath, &LinkSink, &InjectableSet) -> anyhow::Result<RenderedPage> + Send + Sync;

/// Everything a build needs besides the crawl options.
pub struct Site {
    pub meta: SiteMeta,
    pub render: Box<SiteRenderFn>,
    pub pipeline: PluginPipeline,
}

/// Remove a previous build's output tree, tolerating its absence.
async fn clear_output_dir(output_dir: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(output_dir).await {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

/// Run a full build of `site` into `options.output_dir`.
///
/// Returns the committed page list, in render order.
pub async fn build_site(
    site: &Site,
    options: &GenerateOptions,
) -> Result<Vec<GeneratedPage>, GenerateError> {
    log!("build"; "clearing {}", options.output_dir.display());
    clear_output_dir(&options.output_dir)
        .await
        .and(tokio::fs::create_dir_all(&options.output_dir).await)
        .map_err(|source| GenerateError::Commit {
            path: options.output_dir.display().to_string(),
            source,
        })?;

    let ctx = BuildContext {
        output_dir: &options.output_dir,
        meta: &site.meta,
    };
    let pre_build = site.pipeline.run_pre_build(&ctx)?;
    let injectables = site.pipeline.collect_injectables(Some(&pre_build));

    let render_page = |path: &PagePath, links: &LinkSink| (site.render)(path, links, &injectables);
    let pages = generate_site(&render_page, options).await?;
    log!("build"; "{} page(s) committed", pages.len());

    site.pipeline.run_post_build(&PostBuildContext {
        output_dir: &options.output_dir,
        meta: &site.meta,
        pages: &pages,
        pre_build: &pre_build,
    })?;

    Ok(pages)
}
