//! Plugin pipeline: build-phase hooks and head-content injection.
//!
//! Plugins are an explicit, ordered list; the pipeline never consults
//! global state. Pre- and post-build hooks run in declared order.
//! Serve-mode content sources layer in reverse declared order, so an
//! earlier-declared plugin's files win path collisions (see
//! [`crate::serve::ContentRouter`]).

mod inject;

pub use inject::{InjectableSet, InjectableTag, TagKind};

use std::any::Any;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::SiteMeta;
use crate::debug;
use crate::error::{GenerateError, PluginPhase};
use crate::generate::GeneratedPage;
use crate::serve::{ContentRouter, ContentSource};

/// Opaque per-plugin pre-build output, e.g. a compiled stylesheet's
/// cache-busted name. Downcast by the producing plugin itself.
pub type PreBuildArtifact = Box<dyn Any + Send + Sync>;

/// Context handed to pre-build hooks.
pub struct BuildContext<'a> {
    /// Output tree root, already cleared.
    pub output_dir: &'a Path,
    pub meta: &'a SiteMeta,
}

/// Context handed to post-build hooks, after the crawl committed every
/// page.
pub struct PostBuildContext<'a> {
    pub output_dir: &'a Path,
    pub meta: &'a SiteMeta,
    /// Every committed page, in render order.
    pub pages: &'a [GeneratedPage],
    pub pre_build: &'a PreBuildResults,
}

/// Pre-build artifacts keyed by plugin name.
#[derive(Default)]
pub struct PreBuildResults {
    artifacts: FxHashMap<String, PreBuildArtifact>,
}

impl fmt::Debug for PreBuildResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreBuildResults")
            .field("plugins", &self.artifacts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PreBuildResults {
    /// The named plugin's artifact, if it produced one.
    pub fn artifact(&self, plugin: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.artifacts.get(plugin).map(|boxed| &**boxed)
    }

    /// The named plugin's artifact, downcast to its concrete type.
    pub fn artifact_as<T: 'static>(&self, plugin: &str) -> Option<&T> {
        self.artifact(plugin).and_then(|a| a.downcast_ref())
    }
}

/// One pipeline member. Every hook is optional; the default plugin
/// does nothing.
pub trait Plugin: Send + Sync {
    /// Stable name, used for artifact lookup and error attribution.
    fn name(&self) -> &str;

    /// Runs before the crawl, usually to emit static assets into the
    /// output tree.
    fn build_pre(&self, _ctx: &BuildContext<'_>) -> anyhow::Result<Option<PreBuildArtifact>> {
        Ok(None)
    }

    /// Head tags this plugin contributes, given its own pre-build
    /// artifact (if any).
    fn injectable(&self, _artifact: Option<&(dyn Any + Send + Sync)>) -> Vec<InjectableTag> {
        Vec::new()
    }

    /// Runs after the crawl, usually to derive site-wide outputs such
    /// as sitemaps from the committed page list.
    fn build_post(&self, _ctx: &PostBuildContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Serve-mode content this plugin answers for.
    fn content_source(&self) -> Option<Arc<dyn ContentSource>> {
        None
    }
}

/// An ordered plugin list plus the phase-running machinery.
pub struct PluginPipeline {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginPipeline {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn push(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run every pre-build hook in declared order, collecting
    /// artifacts. The first failure aborts, attributed to its plugin.
    pub fn run_pre_build(
        &self,
        ctx: &BuildContext<'_>,
    ) -> Result<PreBuildResults, GenerateError> {
        let mut results = PreBuildResults::default();
        for plugin in &self.plugins {
            debug!("plugin"; "pre-build: {}", plugin.name());
            let artifact =
                plugin
                    .build_pre(ctx)
                    .map_err(|cause| GenerateError::Plugin {
                        plugin: plugin.name().to_string(),
                        phase: PluginPhase::PreBuild,
                        cause,
                    })?;
            if let Some(artifact) = artifact {
                results.artifacts.insert(plugin.name().to_string(), artifact);
            }
        }
        Ok(results)
    }

    /// Aggregate every plugin's head tags, partitioned critical-first.
    ///
    /// Within each bucket, tags keep plugin declaration order, then
    /// per-plugin emission order.
    pub fn collect_injectables(&self, pre_build: Option<&PreBuildResults>) -> InjectableSet {
        let mut set = InjectableSet::default();
        for plugin in &self.plugins {
            let artifact = pre_build.and_then(|r| r.artifact(plugin.name()));
            for tag in plugin.injectable(artifact) {
                set.push(tag);
            }
        }
        set
    }

    /// Run every post-build hook in declared order.
    pub fn run_post_build(&self, ctx: &PostBuildContext<'_>) -> Result<(), GenerateError> {
        for plugin in &self.plugins {
            debug!("plugin"; "post-build: {}", plugin.name());
            plugin
                .build_post(ctx)
                .map_err(|cause| GenerateError::Plugin {
                    plugin: plugin.name().to_string(),
                    phase: PluginPhase::PostBuild,
                    cause,
                })?;
        }
        Ok(())
    }

    /// Build the serve-mode router over the plugins' content sources.
    ///
    /// Sources are layered in reverse declared order, so on a path
    /// collision the earliest-declared plugin answers.
    pub fn router(&self) -> ContentRouter {
        let sources: Vec<Arc<dyn ContentSource>> = self
            .plugins
            .iter()
            .rev()
            .filter_map(|plugin| plugin.content_source())
            .collect();
        ContentRouter::new(sources)
    }
}
