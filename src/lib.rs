//! ferrite-ssg - a reachability-crawling static site generation engine.
//!
//! Given a set of entry paths and a page-rendering function, the engine
//! discovers every reachable page by following links emitted during
//! rendering, streams each page's markup under an optional deadline,
//! and commits it atomically to an output tree. A plugin pipeline runs
//! around the crawl, contributing build artifacts and head content.
//!
//! # Modules
//!
//! - [`core`] - page paths, href canonicalization, site metadata
//! - [`cache`] - suspendable async memo cell for slow render inputs
//! - [`render`] - streaming markup rendering with deadlines
//! - [`commit`] - atomic temp-write-then-rename page commits
//! - [`generate`] - the reachability crawler
//! - [`plugin`] - plugin pipeline and injectable head content
//! - [`serve`] - serve-mode content routing
//! - [`build`] - full-build orchestration around the crawl
//! - [`utils`] - content hashing and cache-busted filenames

pub mod build;
pub mod cache;
pub mod commit;
pub mod core;
pub mod error;
pub mod generate;
pub mod logger;
pub mod plugin;
pub mod render;
pub mod serve;
pub mod utils;

pub use build::{Site, SiteRenderFn, build_site};
pub use cache::{CacheFailure, SuspendCell};
pub use commit::commit_stream;
pub use crate::core::{CanonicalHref, PagePath, SiteMeta, canonicalize_href};
pub use error::{CommitFailure, GenerateError, PluginPhase, RenderError};
pub use generate::{
    GenerateOptions, GeneratedPage, LinkSink, RenderedPage, generate_site,
};
pub use plugin::{
    BuildContext, InjectableSet, InjectableTag, Plugin, PluginPipeline, PostBuildContext,
    PreBuildArtifact, PreBuildResults, TagKind,
};
pub use render::{Markup, MarkupSink, RenderStream, render_to_stream};
pub use serve::{ContentRouter, ContentSource, RouteOutcome, ServedContent};
